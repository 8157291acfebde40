// Configuration structs

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use super::constants::*;
use crate::errors::ConfigError;

/// Top-level settings, shared read-only by every run in the process.
///
/// Every section is optional in the TOML file; missing values fall back to
/// the defaults below.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub credentials: Credentials,
    pub research: ResearchSettings,
    pub generation: GenerationSettings,
    pub refinement: RefinementSettings,
    pub http: HttpSettings,
}

/// Provider API keys. `Debug` never prints the secrets.
#[derive(Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Credentials {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tavily_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openai_api_key: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn redact(key: &Option<String>) -> &'static str {
            match key {
                Some(_) => "<redacted>",
                None => "<unset>",
            }
        }
        f.debug_struct("Credentials")
            .field("tavily_api_key", &redact(&self.tavily_api_key))
            .field("openai_api_key", &redact(&self.openai_api_key))
            .finish()
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SearchDepth {
    #[default]
    Basic,
    Advanced,
}

impl SearchDepth {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Advanced => "advanced",
        }
    }
}

/// Content research provider (Tavily) settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ResearchSettings {
    pub base_url: String,
    pub max_results_per_query: usize,
    pub search_depth: SearchDepth,
}

impl Default for ResearchSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_TAVILY_BASE_URL.to_string(),
            max_results_per_query: DEFAULT_MAX_RESULTS_PER_QUERY,
            search_depth: SearchDepth::Basic,
        }
    }
}

/// Text generation provider (OpenAI-compatible) settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenerationSettings {
    pub base_url: String,
    pub model: String,
    /// 0.0 keeps candidates as stable as the provider allows
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            model: DEFAULT_GENERATION_MODEL.to_string(),
            temperature: 0.0,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RefinementSettings {
    /// Revision cap for the Generator↔Reviewer cycle. Fixed at 3 unless
    /// overridden; a run never performs more than this many revisions.
    pub max_revisions: u32,
    /// Timeout applied to every individual provider call
    pub call_timeout_secs: u64,
}

impl Default for RefinementSettings {
    fn default() -> Self {
        Self {
            max_revisions: DEFAULT_MAX_REVISIONS,
            call_timeout_secs: DEFAULT_CALL_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HttpSettings {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub request_timeout_secs: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_HTTP_ATTEMPTS,
            base_delay_ms: DEFAULT_HTTP_BASE_DELAY_MS,
            request_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
        }
    }
}

impl Settings {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.refinement.call_timeout_secs)
    }

    /// Check value ranges. Credentials are checked separately by
    /// [`Settings::require_credentials`] so that offline commands still work.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.refinement.max_revisions == 0 {
            return Err(ConfigError::Invalid(
                "refinement.max_revisions must be at least 1".to_string(),
            ));
        }
        if self.refinement.call_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "refinement.call_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.research.max_results_per_query == 0 {
            return Err(ConfigError::Invalid(
                "research.max_results_per_query must be at least 1".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.generation.temperature) {
            return Err(ConfigError::Invalid(format!(
                "generation.temperature must be within 0.0..=2.0, got {}",
                self.generation.temperature
            )));
        }
        if self.http.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "http.max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Both provider keys must be present before a run can start.
    pub fn require_credentials(&self) -> Result<(&str, &str), ConfigError> {
        let tavily = non_empty(&self.credentials.tavily_api_key)
            .ok_or(ConfigError::MissingCredential(ENV_TAVILY_API_KEY))?;
        let openai = non_empty(&self.credentials.openai_api_key)
            .ok_or(ConfigError::MissingCredential(ENV_OPENAI_API_KEY))?;
        Ok((tavily, openai))
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
