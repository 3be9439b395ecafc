//! Chat-completion seam and its implementations.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::error::{AtomicError, Result};
use crate::message::ChatMessage;

/// Everything a provider needs for one completion.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    /// JSON schema the reply must follow.
    pub response_schema: Option<Value>,
}

/// Result of a chat completion request.
///
/// `content` is `None` when the provider answered without text, e.g. a
/// refusal or an empty choice.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelCompletion {
    pub content: Option<String>,
}

/// Minimal abstraction around a chat completion provider.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete_chat(&self, request: &ChatRequest) -> Result<ModelCompletion>;
}

/// Replays scripted replies in order and keeps every request it received.
#[derive(Debug, Default)]
pub struct StubModel {
    responses: Mutex<VecDeque<String>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl StubModel {
    pub fn new(responses: Vec<String>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LanguageModel for StubModel {
    async fn complete_chat(&self, request: &ChatRequest) -> Result<ModelCompletion> {
        self.requests
            .lock()
            .map_err(|_| AtomicError::LanguageModel("stub model poisoned".into()))?
            .push(request.clone());
        let raw = self
            .responses
            .lock()
            .map_err(|_| AtomicError::LanguageModel("stub model poisoned".into()))?
            .pop_front()
            .ok_or_else(|| {
                AtomicError::LanguageModel("StubModel ran out of scripted responses".into())
            })?;

        Ok(ModelCompletion { content: Some(raw) })
    }
}

#[cfg(feature = "openai")]
pub use openai::OpenAIClient;

#[cfg(feature = "openai")]
mod openai {
    use std::time::Duration;

    use async_trait::async_trait;
    use serde::{Deserialize, Serialize};
    use serde_json::{json, Value};
    use tracing::debug;

    use super::{ChatRequest, LanguageModel, ModelCompletion};
    use crate::config::{ModelConfig, ModelProvider};
    use crate::error::{AtomicError, Result};
    use crate::media::{Media, MediaKind, MediaSource};
    use crate::message::{ChatContent, ChatMessage, ContentPart};

    const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

    fn coalesce_error(status: reqwest::StatusCode, body: &str) -> AtomicError {
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return AtomicError::LanguageModel(format!("openai rate limit exceeded: {body}"));
        }
        AtomicError::LanguageModel(format!("openai request failed with {status}: {body}"))
    }

    fn serialize_tool_arguments(args: &Value) -> String {
        serde_json::to_string(args).unwrap_or_else(|_| args.to_string())
    }

    /// Client for OpenAI-compatible `/chat/completions` endpoints.
    #[derive(Clone)]
    pub struct OpenAIClient {
        http: reqwest::Client,
        model: String,
        api_key: String,
        base_url: String,
        organization: Option<String>,
        temperature: Option<f32>,
        max_tokens: Option<u32>,
    }

    impl OpenAIClient {
        pub fn from_config(cfg: &ModelConfig) -> Result<Self> {
            if cfg.provider != ModelProvider::OpenAi {
                return Err(AtomicError::Config(format!(
                    "model provider `{}` is not served by the OpenAI client",
                    cfg.provider.as_str()
                )));
            }
            let api_key = cfg.api_key.clone().ok_or_else(|| {
                AtomicError::Config("missing OpenAI API key in model config".into())
            })?;
            Ok(Self {
                http: reqwest::Client::builder()
                    .timeout(Duration::from_secs(60))
                    .build()
                    .map_err(|err| AtomicError::LanguageModel(format!("http client error: {err}")))?,
                model: cfg.model.clone(),
                api_key,
                base_url: cfg
                    .base_url
                    .clone()
                    .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
                organization: cfg.organization.clone(),
                temperature: cfg.temperature,
                max_tokens: cfg.max_tokens,
            })
        }

        fn payload(&self, messages: &[ChatMessage], schema: Option<&Value>) -> Result<Value> {
            let mut payload = json!({
                "model": self.model,
                "messages": to_openai_messages(messages)?,
            });
            if let Some(temperature) = self.temperature {
                payload["temperature"] = json!(temperature);
            }
            if let Some(max_tokens) = self.max_tokens {
                payload["max_tokens"] = json!(max_tokens);
            }
            if let Some(schema) = schema {
                payload["response_format"] = json!({
                    "type": "json_schema",
                    "json_schema": {"name": "response", "schema": schema},
                });
            }
            Ok(payload)
        }
    }

    #[async_trait]
    impl LanguageModel for OpenAIClient {
        async fn complete_chat(&self, request: &ChatRequest) -> Result<ModelCompletion> {
            let messages = resolve_media(&request.messages).await?;
            let payload = self.payload(&messages, request.response_schema.as_ref())?;

            let mut builder = self
                .http
                .post(format!("{}/chat/completions", self.base_url))
                .header(
                    reqwest::header::AUTHORIZATION,
                    format!("Bearer {}", self.api_key),
                );
            if let Some(org) = &self.organization {
                builder = builder.header("OpenAI-Organization", org);
            }
            debug!(model = %self.model, messages = messages.len(), "sending chat completion");
            let resp = builder
                .json(&payload)
                .send()
                .await
                .map_err(|err| AtomicError::LanguageModel(format!("OpenAI request error: {err}")))?;

            if !resp.status().is_success() {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                return Err(coalesce_error(status, &body));
            }

            let body: OpenAiResponse = resp.json().await.map_err(|err| {
                AtomicError::LanguageModel(format!("OpenAI response parse error: {err}"))
            })?;

            completion_from(body)
        }
    }

    fn completion_from(body: OpenAiResponse) -> Result<ModelCompletion> {
        let first = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AtomicError::LanguageModel("OpenAI returned no choices".into()))?;
        Ok(ModelCompletion {
            content: first.message.content,
        })
    }

    async fn resolve_media(messages: &[ChatMessage]) -> Result<Vec<ChatMessage>> {
        let mut resolved = Vec::with_capacity(messages.len());
        for message in messages {
            let mut message = message.clone();
            if let ChatContent::Parts(parts) = &mut message.content {
                for part in parts.iter_mut() {
                    if let ContentPart::Media(media) = part {
                        if matches!(media.source, MediaSource::Path(_)) {
                            *media = media.clone().resolve().await?;
                        }
                    }
                }
            }
            resolved.push(message);
        }
        Ok(resolved)
    }

    pub(super) fn to_openai_messages(messages: &[ChatMessage]) -> Result<Vec<OpenAiMessage>> {
        messages
            .iter()
            .map(|message| {
                let content = match &message.content {
                    ChatContent::Text(text) => OpenAiContent::Text(text.clone()),
                    ChatContent::Parts(parts) => OpenAiContent::Parts(
                        parts.iter().map(to_openai_part).collect::<Result<Vec<_>>>()?,
                    ),
                };
                let tool_calls = message.tool_calls.as_ref().map(|calls| {
                    calls
                        .iter()
                        .map(|call| OpenAiToolCall {
                            id: call.id.clone(),
                            r#type: "function".to_string(),
                            function: OpenAiFunctionCall {
                                name: call.name.clone(),
                                arguments: serialize_tool_arguments(&call.arguments),
                            },
                        })
                        .collect()
                });
                Ok(OpenAiMessage {
                    role: message.role.as_str().to_string(),
                    content: Some(content),
                    tool_call_id: message.tool_call_id.clone(),
                    tool_calls,
                })
            })
            .collect()
    }

    fn to_openai_part(part: &ContentPart) -> Result<Value> {
        let media = match part {
            ContentPart::Text(text) => return Ok(json!({"type": "text", "text": text})),
            ContentPart::Media(media) => media,
        };
        let url = media.data_url().ok_or_else(|| {
            AtomicError::Protocol(format!(
                "{} media must be resolved before it is sent",
                media.kind.as_str()
            ))
        })?;
        match media.kind {
            MediaKind::Image => Ok(json!({"type": "image_url", "image_url": {"url": url}})),
            MediaKind::Audio => audio_part(media),
            MediaKind::Pdf => Ok(json!({
                "type": "file",
                "file": {"filename": "document.pdf", "file_data": url},
            })),
        }
    }

    fn audio_part(media: &Media) -> Result<Value> {
        let MediaSource::Base64(data) = &media.source else {
            return Err(AtomicError::Protocol(
                "audio must be sent as an inline payload".into(),
            ));
        };
        let format = match media.mime_type() {
            "audio/mpeg" | "audio/mp3" => "mp3",
            _ => "wav",
        };
        Ok(json!({"type": "input_audio", "input_audio": {"data": data, "format": format}}))
    }

    #[derive(Debug, Serialize)]
    pub(super) struct OpenAiMessage {
        role: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        content: Option<OpenAiContent>,
        #[serde(skip_serializing_if = "Option::is_none")]
        tool_call_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        tool_calls: Option<Vec<OpenAiToolCall>>,
    }

    #[derive(Debug, Serialize)]
    #[serde(untagged)]
    enum OpenAiContent {
        Text(String),
        Parts(Vec<Value>),
    }

    #[derive(Debug, Serialize)]
    struct OpenAiToolCall {
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        r#type: String,
        function: OpenAiFunctionCall,
    }

    #[derive(Debug, Serialize)]
    struct OpenAiFunctionCall {
        name: String,
        arguments: String,
    }

    #[derive(Debug, Deserialize)]
    struct OpenAiResponse {
        choices: Vec<OpenAiChoice>,
    }

    #[derive(Debug, Deserialize)]
    struct OpenAiChoice {
        message: OpenAiChoiceMessage,
    }

    #[derive(Debug, Deserialize)]
    struct OpenAiChoiceMessage {
        content: Option<String>,
    }

}
