//! Text-generation capability
//!
//! The engine never talks to a model provider directly. It hands a
//! [`GenerationRequest`] to a [`TextGenerator`] and treats every failure as
//! recoverable: each call site owns a fallback string.
//!
//! Calls are synchronous and may block for as long as the provider takes.
//! Timeouts, if any, belong to the implementation.

pub mod openai_compatible;
pub mod scripted;

pub use openai_compatible::OpenAICompatibleClient;
pub use scripted::ScriptedGenerator;

use crate::error::GenerationError;
use crate::types::ConversationTurn;

/// A system instruction plus the running conversation
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub system: String,
    pub turns: Vec<ConversationTurn>,
    /// Overrides the generator's default model
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
}

impl GenerationRequest {
    /// System instruction and one user message
    pub fn single(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            turns: vec![ConversationTurn::user(user)],
            model: None,
            temperature: None,
            max_tokens: None,
        }
    }

    /// System instruction, prior turns, then the new user message
    pub fn conversation(
        system: impl Into<String>,
        history: &[ConversationTurn],
        user: impl Into<String>,
    ) -> Self {
        let mut turns = history.to_vec();
        turns.push(ConversationTurn::user(user));
        Self {
            system: system.into(),
            turns,
            model: None,
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Last user message, if any
    pub fn last_user_message(&self) -> Option<&str> {
        self.turns
            .iter()
            .rev()
            .find(|t| t.role == crate::types::Role::User)
            .map(|t| t.content.as_str())
    }
}

/// External collaborator producing natural-language text
pub trait TextGenerator: Send + Sync + std::fmt::Debug {
    /// Generate a completion. An empty completion is an error.
    fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;

    /// Identifier used in logs
    fn name(&self) -> &str {
        "text-generator"
    }
}

impl<G: TextGenerator + ?Sized> TextGenerator for Box<G> {
    fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        (**self).generate(request)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<G: TextGenerator + ?Sized> TextGenerator for std::sync::Arc<G> {
    fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        (**self).generate(request)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;

    #[test]
    fn test_conversation_appends_user_turn() {
        let history = vec![
            ConversationTurn::user("earlier"),
            ConversationTurn::assistant("reply"),
        ];
        let request = GenerationRequest::conversation("sys", &history, "now");

        assert_eq!(request.turns.len(), 3);
        assert_eq!(request.turns[2].role, Role::User);
        assert_eq!(request.last_user_message(), Some("now"));
    }

    #[test]
    fn test_builder_overrides() {
        let request = GenerationRequest::single("sys", "hi")
            .with_model("gpt-4o")
            .with_temperature(0.6)
            .with_max_tokens(20);
        assert_eq!(request.model.as_deref(), Some("gpt-4o"));
        assert_eq!(request.max_tokens, Some(20));
    }
}
