use thiserror::Error;

pub type Result<T> = std::result::Result<T, AtomicError>;

#[derive(Debug, Error)]
pub enum AtomicError {
    #[error("validation failed at `{path}`: {message}")]
    Validation { path: String, message: String },

    #[error("unsupported value at `{path}`: {message}")]
    UnsupportedNode { path: String, message: String },

    #[error("turn `{0}` not found in history")]
    TurnNotFound(u64),

    #[error("context provider `{0}` is not registered")]
    ContextProviderNotFound(String),

    #[error("language model error: {0}")]
    LanguageModel(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

impl AtomicError {
    pub(crate) fn validation(path: impl Into<String>, message: impl ToString) -> Self {
        AtomicError::Validation {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub(crate) fn unsupported(path: impl Into<String>, message: impl ToString) -> Self {
        AtomicError::UnsupportedNode {
            path: path.into(),
            message: message.to_string(),
        }
    }
}
