use std::marker::PhantomData;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{AtomicError, Result};
use crate::hooks::AgentHook;
use crate::llm::{ChatRequest, LanguageModel};
use crate::memory::ChatHistory;
use crate::message::{ChatMessage, Role};
use crate::prompt::{ContextProvider, SystemPromptGenerator};
use crate::schema::IoSchema;

/// Agent exchanging a typed input `I` for a typed output `O` through one
/// chat-completion call per run.
pub struct Agent<I, O, M>
where
    I: IoSchema,
    O: IoSchema,
    M: LanguageModel,
{
    model: Arc<M>,
    history: ChatHistory,
    initial_history: ChatHistory,
    prompt: SystemPromptGenerator,
    include_system_prompt: bool,
    hooks: Vec<Arc<dyn AgentHook>>,
    _schemas: PhantomData<fn(I) -> O>,
}

impl<I, O, M> Agent<I, O, M>
where
    I: IoSchema,
    O: IoSchema,
    M: LanguageModel,
{
    pub fn new(model: Arc<M>) -> Self {
        Self {
            model,
            history: ChatHistory::default(),
            initial_history: ChatHistory::default(),
            prompt: SystemPromptGenerator::default(),
            include_system_prompt: true,
            hooks: Vec::new(),
            _schemas: PhantomData,
        }
    }

    /// Start from `history`; [`Agent::reset_history`] returns to it.
    pub fn with_history(mut self, history: ChatHistory) -> Self {
        self.initial_history = history.copy();
        self.history = history;
        self
    }

    pub fn with_system_prompt(mut self, prompt: SystemPromptGenerator) -> Self {
        self.prompt = prompt;
        self
    }

    /// Send only the history, e.g. for models without a system role.
    pub fn without_system_prompt(mut self) -> Self {
        self.include_system_prompt = false;
        self
    }

    pub fn with_hook(mut self, hook: Arc<dyn AgentHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn history(&self) -> &ChatHistory {
        &self.history
    }

    /// For appending tool results or other out-of-band messages.
    pub fn history_mut(&mut self) -> &mut ChatHistory {
        &mut self.history
    }

    pub fn reset_history(&mut self) {
        self.history = self.initial_history.copy();
    }

    pub fn system_prompt(&self) -> String {
        self.prompt.generate()
    }

    pub fn register_context_provider(
        &mut self,
        name: impl Into<String>,
        provider: Arc<dyn ContextProvider>,
    ) {
        self.prompt.context_providers_mut().register(name, provider);
    }

    pub fn unregister_context_provider(&mut self, name: &str) -> Result<Arc<dyn ContextProvider>> {
        self.prompt.context_providers_mut().unregister(name)
    }

    pub fn get_context_provider(&self, name: &str) -> Result<Arc<dyn ContextProvider>> {
        self.prompt.context_providers().get(name)
    }

    /// The request the next run would send.
    pub fn build_request(&self) -> Result<ChatRequest> {
        let mut messages = Vec::with_capacity(self.history.message_count() + 1);
        if self.include_system_prompt {
            messages.push(ChatMessage::system(self.prompt.generate()));
        }
        messages.extend(self.history.to_chat_messages()?);
        Ok(ChatRequest {
            messages,
            response_schema: Some(O::schema_value()?),
        })
    }

    /// Run one exchange.
    ///
    /// With `Some(input)` a new turn is opened and the input is appended as a
    /// user message before the model is called; it stays in history even if
    /// the call fails or the future is dropped. With `None` the model answers
    /// the existing history, continuing the open turn if there is one.
    pub async fn run(&mut self, input: Option<I>) -> Result<O> {
        if let Some(input) = input {
            let content = input.to_content()?;
            self.history.begin_turn();
            self.history.add_message(Role::User, content);
        }
        self.complete().await
    }

    async fn complete(&mut self) -> Result<O> {
        let request = self.build_request()?;
        debug!(
            turn = ?self.history.current_turn(),
            messages = request.messages.len(),
            "calling language model"
        );
        for hook in &self.hooks {
            hook.before_model(&request).await?;
        }

        let completion = match self.model.complete_chat(&request).await {
            Ok(completion) => completion,
            Err(err) => {
                warn!(error = %err, "model call failed");
                for hook in &self.hooks {
                    hook.on_model_error(&err).await;
                }
                return Err(err);
            }
        };
        for hook in &self.hooks {
            hook.after_model(&completion).await?;
        }

        let Some(raw) = completion.content else {
            let err = AtomicError::LanguageModel("model returned no content".into());
            warn!(error = %err, "model call failed");
            for hook in &self.hooks {
                hook.on_model_error(&err).await;
            }
            return Err(err);
        };
        let output: O = match serde_json::from_str(&raw) {
            Ok(output) => output,
            Err(err) => {
                let err = AtomicError::validation("$", format!("model output does not match schema: {err}"));
                warn!(error = %err, "failed to parse model output");
                for hook in &self.hooks {
                    hook.on_parse_error(&raw, &err).await;
                }
                return Err(err);
            }
        };

        self.history.add_message(Role::Assistant, output.to_content()?);
        self.history.end_turn();
        Ok(output)
    }
}
