// External provider abstraction
//
// The pipeline talks to two kinds of collaborators: a text generation
// provider (chat completions) and a content research provider (web search).
// Both sit behind object-safe traits so runs can be driven by stub providers
// in tests and by HTTP clients in production.

use anyhow::Result;
use async_trait::async_trait;

pub mod types;

// Provider implementations
pub mod openai;
pub mod tavily;

// Provider factory
pub mod factory;

// Transport retry shared by the HTTP providers
pub mod retry;

// Re-export commonly used types
pub use factory::{create_llm_provider, create_search_provider};
pub use retry::{with_retry, PermanentFailure, RetryPolicy};
pub use types::{Message, ProviderRequest, ProviderResponse, SearchHit};

/// Trait for text generation providers
///
/// Implementations return whatever text the model produced; callers are
/// responsible for validating it (it may be empty or malformed).
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send a request and wait for the complete response
    async fn send_message(&self, request: &ProviderRequest) -> Result<ProviderResponse>;

    /// Provider name for logging (e.g. "openai")
    fn name(&self) -> &str;

    /// Model used when the request leaves `model` empty
    fn default_model(&self) -> &str;
}

/// Trait for content research providers
///
/// Results are best-effort: ranking is preserved, completeness is not promised.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Run one query, returning at most `max_results` hits in ranked order
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>>;

    /// Provider name for logging (e.g. "tavily")
    fn name(&self) -> &str;
}
