// Researcher: runs the planned queries once and aggregates a corpus

use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use super::query_planner::QueryPlanner;
use crate::errors::ResearchError;
use crate::providers::{SearchHit, SearchProvider};

/// One snippet of research, tagged with the query that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snippet {
    pub query_index: usize,
    pub title: String,
    pub url: String,
    pub content: String,
}

/// Ordered, deduplicated research results for one run.
///
/// Order is query order first, provider ranking within a query second.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResearchCorpus {
    pub queries: Vec<String>,
    pub snippets: Vec<Snippet>,
    /// Queries that failed, timed out or returned nothing
    pub failed_queries: usize,
}

impl ResearchCorpus {
    /// A corpus with no snippets, kept when research is exhausted.
    pub fn empty(queries: Vec<String>) -> Self {
        let failed_queries = queries.len();
        Self {
            queries,
            snippets: Vec::new(),
            failed_queries,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.snippets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.snippets.len()
    }

    /// Snippet contents separated by blank lines, as fed to the generator
    pub fn joined(&self) -> String {
        self.snippets
            .iter()
            .map(|s| s.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

pub struct Researcher {
    search: Arc<dyn SearchProvider>,
    planner: QueryPlanner,
    max_results: usize,
    call_timeout: Duration,
}

impl Researcher {
    pub fn new(search: Arc<dyn SearchProvider>, max_results: usize, call_timeout: Duration) -> Self {
        Self {
            search,
            planner: QueryPlanner::new(),
            max_results,
            call_timeout,
        }
    }

    /// Plan queries, run each once, and merge the hits.
    ///
    /// A failing query contributes nothing; only when every query comes back
    /// empty is [`ResearchError::Exhausted`] returned. Planning failures are
    /// returned before any search is issued.
    pub async fn research(&self, request: &str) -> Result<ResearchCorpus, ResearchError> {
        let plan = self.planner.plan_queries(request)?;
        let queries = plan.queries().to_vec();

        let mut seen: HashSet<String> = HashSet::new();
        let mut snippets = Vec::new();
        let mut failed_queries = 0;

        for (index, query) in queries.iter().enumerate() {
            let hits = self.run_query(query).await;
            if hits.is_empty() {
                failed_queries += 1;
                continue;
            }

            for hit in hits {
                let content = hit.content.trim();
                if content.is_empty() || !seen.insert(content.to_string()) {
                    continue;
                }
                snippets.push(Snippet {
                    query_index: index,
                    title: hit.title,
                    url: hit.url,
                    content: content.to_string(),
                });
            }
        }

        if snippets.is_empty() {
            tracing::warn!("All {} research queries returned nothing", queries.len());
            return Err(ResearchError::Exhausted { queries });
        }

        tracing::info!(
            snippets = snippets.len(),
            failed_queries,
            "Research complete"
        );

        Ok(ResearchCorpus {
            queries,
            snippets,
            failed_queries,
        })
    }

    /// One query with the per-call timeout; every failure degrades to no hits.
    async fn run_query(&self, query: &str) -> Vec<SearchHit> {
        match timeout(self.call_timeout, self.search.search(query, self.max_results)).await {
            Ok(Ok(hits)) => {
                if hits.is_empty() {
                    tracing::warn!("{} returned no results for {:?}", self.search.name(), query);
                }
                hits.into_iter().take(self.max_results).collect()
            }
            Ok(Err(e)) => {
                tracing::warn!("{} query {:?} failed: {:#}", self.search.name(), query, e);
                Vec::new()
            }
            Err(_) => {
                tracing::warn!(
                    "{} query {:?} timed out after {:?}",
                    self.search.name(),
                    query,
                    self.call_timeout
                );
                Vec::new()
            }
        }
    }
}
