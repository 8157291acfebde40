// Tavily search API provider implementation

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::openai::is_transient;
use super::retry::{with_retry, PermanentFailure, RetryPolicy};
use super::types::SearchHit;
use super::SearchProvider;
use crate::config::constants::{DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_TAVILY_BASE_URL};
use crate::config::SearchDepth;

/// Tavily web search provider
#[derive(Clone)]
pub struct TavilyProvider {
    client: Client,
    api_key: String,
    base_url: String,
    search_depth: SearchDepth,
    retry: RetryPolicy,
}

impl TavilyProvider {
    pub fn new(api_key: String) -> Result<Self> {
        Self::with_base_url(
            api_key,
            DEFAULT_TAVILY_BASE_URL.to_string(),
            Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        )
    }

    pub fn with_base_url(api_key: String, base_url: String, request_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            search_depth: SearchDepth::Basic,
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_search_depth(mut self, depth: SearchDepth) -> Self {
        self.search_depth = depth;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn search_once(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        let url = format!("{}/search", self.base_url);
        let body = TavilyRequest {
            query,
            max_results,
            search_depth: self.search_depth.as_str(),
        };

        tracing::debug!("Sending Tavily search: {:?} (max_results={})", query, max_results);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("Failed to send request to Tavily API")?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            let message = format!(
                "Tavily API request failed\n\nStatus: {}\nBody: {}",
                status, error_body
            );
            if is_transient(status) {
                anyhow::bail!(message);
            }
            return Err(anyhow::Error::new(PermanentFailure(message)));
        }

        let parsed: TavilyResponse = response
            .json()
            .await
            .context("Failed to parse Tavily API response")?;

        tracing::debug!("Tavily returned {} result(s) for {:?}", parsed.results.len(), query);

        Ok(parsed
            .results
            .into_iter()
            .take(max_results)
            .map(|r| SearchHit {
                title: r.title,
                url: r.url,
                content: r.content,
            })
            .collect())
    }
}

#[async_trait]
impl SearchProvider for TavilyProvider {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        with_retry(&self.retry, || self.search_once(query, max_results)).await
    }

    fn name(&self) -> &str {
        "tavily"
    }
}

#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    query: &'a str,
    max_results: usize,
    search_depth: &'a str,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
}
