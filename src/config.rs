use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{AtomicError, Result};

/// Which [`crate::LanguageModel`] implementation the model section configures.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ModelProvider {
    /// OpenAI-compatible `/chat/completions` endpoint.
    #[default]
    OpenAi,
    /// Scripted replies, for demos and tests without network access.
    Stub,
}

impl ModelProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelProvider::OpenAi => "openai",
            ModelProvider::Stub => "stub",
        }
    }
}

impl FromStr for ModelProvider {
    type Err = AtomicError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(ModelProvider::OpenAi),
            "stub" => Ok(ModelProvider::Stub),
            other => Err(AtomicError::Config(format!("unknown model provider `{other}`"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelConfig {
    #[serde(default)]
    pub provider: ModelProvider,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: ModelProvider::default(),
            model: default_model(),
            api_key: None,
            base_url: None,
            organization: None,
            temperature: None,
            max_tokens: None,
        }
    }
}

fn default_model() -> String {
    "gpt-4o-mini".into()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct HistoryConfig {
    /// Number of turns kept; unbounded when absent.
    #[serde(default)]
    pub max_turns: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `atomic_agents=debug`.
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let cfg: Self = toml::from_str(&raw)
            .map_err(|err| AtomicError::Config(format!("Failed to parse configuration: {err}")))?;
        Ok(cfg)
    }

    pub fn from_env_or_file(path: impl AsRef<Path>) -> Result<Self> {
        let mut cfg = Self::from_file(path)?;
        cfg.apply_env();
        Ok(cfg)
    }

    /// Defaults plus environment overrides, for setups without a file.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        cfg.apply_env();
        cfg
    }

    fn apply_env(&mut self) {
        if let Ok(provider) = env::var("ATOMIC_PROVIDER") {
            match provider.parse() {
                Ok(parsed) => self.model.provider = parsed,
                Err(err) => warn!(error = %err, "ignoring ATOMIC_PROVIDER"),
            }
        }
        if let Ok(key) = env::var("ATOMIC_API_KEY") {
            self.model.api_key = Some(key);
        }
        if let Ok(model) = env::var("ATOMIC_MODEL") {
            self.model.model = model;
        }
        if let Ok(base_url) = env::var("ATOMIC_BASE_URL") {
            self.model.base_url = Some(base_url);
        }
        if let Ok(org) = env::var("ATOMIC_ORGANIZATION") {
            self.model.organization = Some(org);
        }
        if let Ok(temperature) = env::var("ATOMIC_TEMPERATURE") {
            if let Ok(parsed) = temperature.parse::<f32>() {
                self.model.temperature = Some(parsed.clamp(0.0, 2.0));
            }
        }
        if let Ok(max_tokens) = env::var("ATOMIC_MAX_TOKENS") {
            if let Ok(parsed) = max_tokens.parse::<u32>() {
                self.model.max_tokens = Some(parsed);
            }
        }
        if let Ok(max_turns) = env::var("ATOMIC_MAX_TURNS") {
            if let Ok(parsed) = max_turns.parse::<usize>() {
                self.history.max_turns = Some(parsed);
            }
        }
        if let Ok(level) = env::var("ATOMIC_LOG") {
            self.logging.level = level;
        }
        if let Ok(json) = env::var("ATOMIC_LOG_JSON") {
            if let Ok(parsed) = json.parse::<bool>() {
                self.logging.json = parsed;
            }
        }
    }
}
