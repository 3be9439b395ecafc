//! Typed building blocks for LLM agents.
//!
//! The crate provides:
//! - A turn-bounded conversation history (`ChatHistory`) whose messages carry
//!   plain text, media, or structured records with media nested anywhere.
//! - A multimodal extractor that splits structured content into media
//!   attachments and a media-free residual (`multimodal::extract`).
//! - A system prompt assembler with pluggable context providers.
//! - Schema-typed agents (`Agent<I, O, M>`) over a `LanguageModel` seam, and a
//!   tool interface with error records instead of panics.

mod agent;
pub mod config;
mod content;
mod error;
mod hooks;
mod llm;
pub mod logging;
mod media;
mod memory;
mod message;
pub mod multimodal;
mod prompt;
mod schema;
mod tool;
pub mod tools;

pub use agent::Agent;
pub use config::{AppConfig, HistoryConfig, LoggingConfig, ModelConfig, ModelProvider};
pub use content::{Content, Node, Structure};
pub use error::{AtomicError, Result};
pub use hooks::AgentHook;
#[cfg(feature = "openai")]
pub use llm::OpenAIClient;
pub use llm::{ChatRequest, LanguageModel, ModelCompletion, StubModel};
pub use media::{Media, MediaKind, MediaSource, MEDIA_TAG};
pub use memory::{ChatHistory, TurnId};
pub use message::{ChatContent, ChatMessage, ContentPart, Message, Role, ToolCall};
pub use multimodal::Extraction;
pub use prompt::{ContextProvider, ContextProviderRegistry, FnContextProvider, SystemPromptGenerator};
pub use schema::{BasicChatInput, BasicChatOutput, IoSchema};
pub use tool::{Tool, ToolDescription, ToolError, ToolOutput, ToolRegistry, TypedTool};
pub use tools::calculator_toolkit;
