use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{GenerationRequest, TextGenerator};
use crate::config::{EngineConfig, API_KEY_ENV};
use crate::error::GenerationError;

/// Blocking client for any `/chat/completions` endpoint
#[derive(Debug, Clone)]
pub struct OpenAICompatibleClient {
    pub name: String,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f64,
    max_tokens: u32,
    http_client: reqwest::blocking::Client,
}

impl OpenAICompatibleClient {
    pub fn new(
        name: impl Into<String>,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            temperature: 0.65,
            max_tokens: 1000,
            http_client: reqwest::blocking::Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .unwrap_or_else(|_| reqwest::blocking::Client::new()),
        }
    }

    /// Client configured from the engine config. Missing credentials are
    /// fatal for any caller that needs generation.
    pub fn from_config(config: &EngineConfig) -> Result<Self, GenerationError> {
        let key = config
            .api_key
            .clone()
            .ok_or(GenerationError::MissingCredentials(API_KEY_ENV))?;
        Ok(Self::new("openai", key, &config.api_base_url, &config.model)
            .with_temperature(config.temperature)
            .with_max_tokens(config.max_tokens))
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn build_body(&self, request: &GenerationRequest) -> ChatCompletionRequest {
        let mut messages = Vec::with_capacity(request.turns.len() + 1);
        messages.push(ChatMessage {
            role: "system".to_string(),
            content: request.system.clone(),
        });
        messages.extend(request.turns.iter().map(|t| ChatMessage {
            role: t.role.to_string(),
            content: t.content.clone(),
        }));

        ChatCompletionRequest {
            model: request.model.clone().unwrap_or_else(|| self.model.clone()),
            messages,
            max_tokens: Some(request.max_tokens.unwrap_or(self.max_tokens)),
            temperature: Some(request.temperature.unwrap_or(self.temperature)),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Pull the first non-blank completion out of a response
fn first_completion(response: ChatCompletionResponse) -> Result<String, GenerationError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .ok_or(GenerationError::EmptyCompletion)
}

impl TextGenerator for OpenAICompatibleClient {
    fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let body = self.build_body(request);

        let response = self
            .http_client
            .post(self.endpoint())
            .header("Content-Type", "application/json")
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let completion: ChatCompletionResponse = response
            .json()
            .map_err(|e| GenerationError::Malformed(e.to_string()))?;

        first_completion(completion)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ConversationTurn;

    fn client() -> OpenAICompatibleClient {
        OpenAICompatibleClient::new("test", "sk-test", "https://example.invalid/v1/", "gpt-4")
    }

    #[test]
    fn test_missing_key_is_fatal() {
        let config = EngineConfig::default();
        assert!(matches!(
            OpenAICompatibleClient::from_config(&config),
            Err(GenerationError::MissingCredentials(API_KEY_ENV))
        ));
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        assert_eq!(client().endpoint(), "https://example.invalid/v1/chat/completions");
    }

    #[test]
    fn test_body_includes_system_and_history() {
        let history = vec![
            ConversationTurn::user("before"),
            ConversationTurn::assistant("answer"),
        ];
        let request = GenerationRequest::conversation("be brief", &history, "now")
            .with_max_tokens(20)
            .with_model("gpt-4o");
        let body = client().build_body(&request);

        let roles: Vec<_> = body.messages.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
        assert_eq!(body.model, "gpt-4o");
        assert_eq!(body.max_tokens, Some(20));
        assert_eq!(body.temperature, Some(0.65));
    }

    #[test]
    fn test_first_completion_rejects_empty() {
        let parsed: ChatCompletionResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(
            first_completion(parsed),
            Err(GenerationError::EmptyCompletion)
        ));

        let parsed: ChatCompletionResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"  Quiet Storm \n"}}]}"#,
        )
        .unwrap();
        assert_eq!(first_completion(parsed).unwrap(), "Quiet Storm");
    }
}
