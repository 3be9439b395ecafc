use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::schema::IoSchema;

/// Failure record returned by a tool instead of raising.
///
/// It serializes like any other output, so it can be stored in history as the
/// content of a tool message and shown to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, thiserror::Error)]
#[error("{error}")]
pub struct ToolError {
    /// Human-readable reason the tool could not produce an output.
    pub error: String,
}

impl ToolError {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

impl IoSchema for ToolError {}

pub type ToolOutput = std::result::Result<Value, ToolError>;

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;

    /// Optionally return a JSON Schema-like object describing the expected arguments.
    fn parameters(&self) -> Option<Value> {
        None
    }

    async fn call(&self, input: Value) -> ToolOutput;
}

/// A tool with declared input and output schemas.
#[async_trait]
pub trait TypedTool: Send + Sync + 'static {
    type Input: IoSchema;
    type Output: IoSchema;

    fn name(&self) -> &str;
    fn description(&self) -> &str;

    async fn run(&self, input: Self::Input) -> std::result::Result<Self::Output, ToolError>;
}

struct TypedAdapter<T>(T);

#[async_trait]
impl<T: TypedTool> Tool for TypedAdapter<T> {
    fn name(&self) -> &str {
        self.0.name()
    }

    fn description(&self) -> &str {
        self.0.description()
    }

    fn parameters(&self) -> Option<Value> {
        T::Input::schema_value().ok()
    }

    async fn call(&self, input: Value) -> ToolOutput {
        let parsed: T::Input = serde_json::from_value(input)
            .map_err(|err| ToolError::new(format!("invalid input for `{}`: {err}", self.name())))?;
        let output = self.0.run(parsed).await?;
        serde_json::to_value(output)
            .map_err(|err| ToolError::new(format!("invalid output from `{}`: {err}", self.name())))
    }
}

/// Static description of a tool that can be embedded in prompts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolDescription {
    pub name: String,
    pub description: String,
    pub parameters: Option<Value>,
}

#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        self.tools.insert(tool.name().to_string(), Arc::new(tool));
    }

    pub fn register_typed<T: TypedTool>(&mut self, tool: T) {
        self.register(TypedAdapter(tool));
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn describe(&self) -> Vec<ToolDescription> {
        let mut descriptions: Vec<ToolDescription> = self
            .tools
            .values()
            .map(|tool| ToolDescription {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.parameters(),
            })
            .collect();

        descriptions.sort_by(|a, b| a.name.cmp(&b.name));
        descriptions
    }

    /// Run a tool by name. Unknown names come back as a [`ToolError`] too.
    pub async fn call(&self, name: &str, input: Value) -> ToolOutput {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::new(format!("tool `{name}` not found")))?;
        let output = tool.call(input).await;
        if let Err(err) = &output {
            debug!(tool = name, error = %err.error, "tool returned an error record");
        }
        output
    }
}
