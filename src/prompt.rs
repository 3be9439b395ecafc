//! System prompt assembly.

use std::fmt;
use std::sync::Arc;

use crate::error::{AtomicError, Result};

/// Supplies a titled block of dynamic information for the system prompt.
///
/// Called on every prompt generation; cache internally if needed.
pub trait ContextProvider: Send + Sync {
    fn title(&self) -> &str;
    fn info(&self) -> String;
}

/// Context provider backed by a closure.
pub struct FnContextProvider<F> {
    title: String,
    info: F,
}

impl<F> FnContextProvider<F>
where
    F: Fn() -> String + Send + Sync,
{
    pub fn new(title: impl Into<String>, info: F) -> Self {
        Self {
            title: title.into(),
            info,
        }
    }
}

impl<F> ContextProvider for FnContextProvider<F>
where
    F: Fn() -> String + Send + Sync,
{
    fn title(&self) -> &str {
        &self.title
    }

    fn info(&self) -> String {
        (self.info)()
    }
}

/// Name-keyed providers in registration order.
#[derive(Default, Clone)]
pub struct ContextProviderRegistry {
    providers: Vec<(String, Arc<dyn ContextProvider>)>,
}

impl fmt::Debug for ContextProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextProviderRegistry")
            .field("providers", &self.names())
            .finish()
    }
}

impl ContextProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register under `name`. Re-registering a name swaps the provider in place.
    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn ContextProvider>) {
        let name = name.into();
        match self.providers.iter_mut().find(|(key, _)| *key == name) {
            Some(slot) => slot.1 = provider,
            None => self.providers.push((name, provider)),
        }
    }

    pub fn unregister(&mut self, name: &str) -> Result<Arc<dyn ContextProvider>> {
        let index = self
            .providers
            .iter()
            .position(|(key, _)| key == name)
            .ok_or_else(|| AtomicError::ContextProviderNotFound(name.to_string()))?;
        Ok(self.providers.remove(index).1)
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn ContextProvider>> {
        self.providers
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, provider)| provider.clone())
            .ok_or_else(|| AtomicError::ContextProviderNotFound(name.to_string()))
    }

    pub fn names(&self) -> Vec<String> {
        self.providers.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    fn iter(&self) -> impl Iterator<Item = &Arc<dyn ContextProvider>> + '_ {
        self.providers.iter().map(|(_, provider)| provider)
    }
}

#[derive(Debug, Clone)]
pub struct SystemPromptGenerator {
    background: Vec<String>,
    steps: Vec<String>,
    output_instructions: Vec<String>,
    context_providers: ContextProviderRegistry,
}

impl Default for SystemPromptGenerator {
    fn default() -> Self {
        Self {
            background: vec!["This is a conversation with a helpful and friendly AI assistant.".into()],
            steps: Vec::new(),
            output_instructions: Vec::new(),
            context_providers: ContextProviderRegistry::default(),
        }
    }
}

impl SystemPromptGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_background<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.background = lines.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_steps<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.steps = lines.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_output_instructions<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_instructions = lines.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_context_provider(
        mut self,
        name: impl Into<String>,
        provider: Arc<dyn ContextProvider>,
    ) -> Self {
        self.context_providers.register(name, provider);
        self
    }

    pub fn context_providers(&self) -> &ContextProviderRegistry {
        &self.context_providers
    }

    pub fn context_providers_mut(&mut self) -> &mut ContextProviderRegistry {
        &mut self.context_providers
    }

    pub fn generate(&self) -> String {
        let mut output_instructions = self.output_instructions.clone();
        output_instructions.push("Always respond using the proper JSON schema.".into());
        output_instructions
            .push("Always use the available additional information and context to enhance the response.".into());

        let sections = [
            ("IDENTITY and PURPOSE", &self.background),
            ("INTERNAL ASSISTANT STEPS", &self.steps),
            ("OUTPUT INSTRUCTIONS", &output_instructions),
        ];

        let mut lines = Vec::new();
        for (title, items) in sections {
            if items.is_empty() {
                continue;
            }
            lines.push(format!("# {title}"));
            lines.extend(items.iter().map(|item| format!("- {item}")));
            lines.push(String::new());
        }

        if !self.context_providers.is_empty() {
            lines.push("# EXTRA INFORMATION AND CONTEXT".into());
            for provider in self.context_providers.iter() {
                let info = provider.info();
                if info.is_empty() {
                    continue;
                }
                lines.push(format!("## {}", provider.title()));
                lines.push(info);
                lines.push(String::new());
            }
        }

        lines.join("\n").trim().to_string()
    }
}
