// Request/response types shared by every provider implementation

use serde::{Deserialize, Serialize};

use crate::config::constants::DEFAULT_MAX_TOKENS;

/// One chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Unified request format for text generation providers
#[derive(Debug, Clone, Serialize)]
pub struct ProviderRequest {
    pub messages: Vec<Message>,

    /// Model name; empty means the provider's default
    pub model: String,

    pub max_tokens: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl ProviderRequest {
    /// Create a new request from messages
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            model: String::new(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Concatenated content of every message, mostly useful for assertions
    pub fn prompt_text(&self) -> String {
        self.messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Unified response format
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub id: String,
    pub model: String,
    /// Text content of the first choice; may be empty
    pub text: String,
    pub stop_reason: Option<String>,
    pub provider: String,
}

impl ProviderResponse {
    /// Convenience constructor for providers that only produce text
    pub fn text(provider: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            model: String::new(),
            text: text.into(),
            stop_reason: None,
            provider: provider.into(),
        }
    }
}

/// One ranked result from a content research provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub content: String,
}

impl SearchHit {
    pub fn new(title: impl Into<String>, url: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            content: content.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let request = ProviderRequest::new(vec![Message::system("rules"), Message::user("go")])
            .with_model("gpt-4o-mini")
            .with_max_tokens(512)
            .with_temperature(0.0);

        assert_eq!(request.model, "gpt-4o-mini");
        assert_eq!(request.max_tokens, 512);
        assert_eq!(request.temperature, Some(0.0));
        assert_eq!(request.messages[0].role, "system");
        assert_eq!(request.prompt_text(), "rules\ngo");
    }

    #[test]
    fn test_temperature_omitted_when_unset() {
        let request = ProviderRequest::new(vec![Message::user("hi")]);
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("temperature").is_none());
    }
}
