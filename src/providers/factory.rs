// Provider factory
//
// Creates the production providers from loaded settings

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

use super::openai::OpenAIProvider;
use super::retry::RetryPolicy;
use super::tavily::TavilyProvider;
use super::{LlmProvider, SearchProvider};
use crate::config::Settings;

/// Create the text generation provider.
///
/// Fails with a `ConfigError` when the OpenAI key is missing.
pub fn create_llm_provider(settings: &Settings) -> Result<Arc<dyn LlmProvider>> {
    let (_, api_key) = settings.require_credentials()?;
    let provider = OpenAIProvider::new(
        api_key.to_string(),
        settings.generation.base_url.clone(),
        Duration::from_secs(settings.http.request_timeout_secs),
    )?
    .with_model(settings.generation.model.clone())
    .with_retry_policy(RetryPolicy::from(&settings.http));

    Ok(Arc::new(provider))
}

/// Create the content research provider.
///
/// Fails with a `ConfigError` when the Tavily key is missing.
pub fn create_search_provider(settings: &Settings) -> Result<Arc<dyn SearchProvider>> {
    let (api_key, _) = settings.require_credentials()?;
    let provider = TavilyProvider::with_base_url(
        api_key.to_string(),
        settings.research.base_url.clone(),
        Duration::from_secs(settings.http.request_timeout_secs),
    )?
    .with_search_depth(settings.research.search_depth)
    .with_retry_policy(RetryPolicy::from(&settings.http));

    Ok(Arc::new(provider))
}
