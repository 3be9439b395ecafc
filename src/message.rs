use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::content::Content;
use crate::error::Result;
use crate::media::Media;
use crate::multimodal::extract_content;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

/// A tool invocation requested by the assistant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

impl ToolCall {
    /// New call with a generated `call_<uuid>` id.
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: Some(format!("call_{}", uuid::Uuid::new_v4().simple())),
            name: name.into(),
            arguments,
        }
    }
}

/// One entry of a conversation. Never mutated once stored in a history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Message {
    pub role: Role,
    pub content: Content,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<Content>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn system(content: impl Into<Content>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<Content>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<Content>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Result of the call identified by `tool_call_id`.
    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<Content>) -> Self {
        Self::new(Role::Tool, content).with_tool_call_id(tool_call_id)
    }

    pub fn with_tool_calls(mut self, calls: Vec<ToolCall>) -> Self {
        self.tool_calls = Some(calls);
        self
    }

    pub fn with_tool_call_id(mut self, id: impl Into<String>) -> Self {
        self.tool_call_id = Some(id.into());
        self
    }

    pub fn has_tool_call(&self, id: &str) -> bool {
        self.tool_calls
            .iter()
            .flatten()
            .any(|call| call.id.as_deref() == Some(id))
    }
}

/// A message rendered for a chat-completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: ChatContent,
    pub tool_calls: Option<Vec<ToolCall>>,
    pub tool_call_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChatContent {
    Text(String),
    /// Residual JSON text first, then media in extraction order.
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ContentPart {
    Text(String),
    Media(Media),
}

impl ChatMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: ChatContent::Text(text.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Structured content is sent as JSON text; any media found inside it is
    /// split out into separate parts.
    pub fn from_message(message: &Message) -> Result<Self> {
        let content = match &message.content {
            Content::Text(text) => ChatContent::Text(text.clone()),
            content => {
                let extraction = extract_content(content);
                let text = extraction.residual_json()?;
                if extraction.has_media() {
                    let mut parts = Vec::with_capacity(extraction.media.len() + 1);
                    if !text.is_empty() {
                        parts.push(ContentPart::Text(text));
                    }
                    parts.extend(extraction.media.into_iter().map(ContentPart::Media));
                    ChatContent::Parts(parts)
                } else {
                    ChatContent::Text(text)
                }
            }
        };
        Ok(Self {
            role: message.role,
            content,
            tool_calls: message.tool_calls.clone(),
            tool_call_id: message.tool_call_id.clone(),
        })
    }

    pub fn text(&self) -> Option<&str> {
        match &self.content {
            ChatContent::Text(text) => Some(text),
            ChatContent::Parts(parts) => parts.iter().find_map(|part| match part {
                ContentPart::Text(text) => Some(text.as_str()),
                ContentPart::Media(_) => None,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_only_present_keys() {
        let value = serde_json::to_value(Message::user("hello")).unwrap();
        assert_eq!(value, json!({"role": "user", "content": "hello"}));

        let call = ToolCall {
            id: Some("call_1".into()),
            name: "calculator".into(),
            arguments: json!({"expression": "1+1"}),
        };
        let value =
            serde_json::to_value(Message::assistant("").with_tool_calls(vec![call])).unwrap();
        assert_eq!(
            value,
            json!({
                "role": "assistant",
                "content": "",
                "tool_calls": [{"id": "call_1", "name": "calculator", "arguments": {"expression": "1+1"}}]
            })
        );
    }

    #[test]
    fn rejects_unknown_roles_and_keys() {
        assert!(serde_json::from_value::<Message>(json!({"role": "robot", "content": "x"})).is_err());
        assert!(serde_json::from_value::<Message>(
            json!({"role": "user", "content": "x", "turn_id": "abc"})
        )
        .is_err());
        assert!(serde_json::from_value::<Message>(json!({"role": "user"})).is_err());
    }

    #[test]
    fn renders_structured_content_with_media_as_parts() {
        let content = Content::from_value(json!({
            "question": "what is this?",
            "photo": {"$media": "image", "source": {"url": "https://img/p.png"}}
        }))
        .unwrap();

        let rendered = ChatMessage::from_message(&Message::user(content)).unwrap();

        assert_eq!(
            rendered.content,
            ChatContent::Parts(vec![
                ContentPart::Text(r#"{"question":"what is this?"}"#.into()),
                ContentPart::Media(Media::image_url("https://img/p.png")),
            ])
        );
    }

    #[test]
    fn renders_structured_content_without_media_as_json_text() {
        let content = Content::from_value(json!({"chat_message": "hi"})).unwrap();
        let rendered = ChatMessage::from_message(&Message::assistant(content)).unwrap();
        assert_eq!(rendered.text(), Some(r#"{"chat_message":"hi"}"#));
    }

    #[test]
    fn generated_ids_are_unique() {
        let a = ToolCall::new("a", Value::Null);
        let b = ToolCall::new("a", Value::Null);
        assert!(a.id.as_deref().unwrap().starts_with("call_"));
        assert_ne!(a.id, b.id);
    }
}
