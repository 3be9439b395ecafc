use async_trait::async_trait;

use crate::error::{AtomicError, Result};
use crate::llm::{ChatRequest, ModelCompletion};

/// Observes an agent run. Returning an error from `before_model` or
/// `after_model` aborts the run.
#[async_trait]
pub trait AgentHook: Send + Sync {
    async fn before_model(&self, _request: &ChatRequest) -> Result<()> {
        Ok(())
    }

    async fn after_model(&self, _completion: &ModelCompletion) -> Result<()> {
        Ok(())
    }

    async fn on_model_error(&self, _error: &AtomicError) {}

    async fn on_parse_error(&self, _raw: &str, _error: &AtomicError) {}
}
