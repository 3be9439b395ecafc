use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::content::Content;
use crate::error::{AtomicError, Result};

/// A typed record exchanged with an agent or a tool.
///
/// The doc comment on the implementing type becomes the schema description,
/// which is what the model sees.
pub trait IoSchema: Serialize + DeserializeOwned + JsonSchema + Send + Sync + 'static {
    fn schema_value() -> Result<Value> {
        serde_json::to_value(schemars::schema_for!(Self)).map_err(AtomicError::from)
    }

    fn to_content(&self) -> Result<Content> {
        Content::from_schema(self)
    }

    fn from_content(content: &Content) -> Result<Self> {
        content.to_schema()
    }
}

/// Plain chat input from a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BasicChatInput {
    /// The chat message sent by the user to the assistant.
    pub chat_message: String,
}

impl BasicChatInput {
    pub fn new(chat_message: impl Into<String>) -> Self {
        Self {
            chat_message: chat_message.into(),
        }
    }
}

impl IoSchema for BasicChatInput {}

/// Plain chat reply from the assistant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BasicChatOutput {
    /// The chat message exchanged between the user and the chat agent.
    pub chat_message: String,
}

impl IoSchema for BasicChatOutput {}
