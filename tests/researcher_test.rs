// Integration tests for the research stage

mod common;

use anyhow::Result;
use async_trait::async_trait;
use common::*;
use std::sync::Arc;
use std::time::Duration;

use tfsmith::providers::{SearchHit, SearchProvider};
use tfsmith::research::Researcher;
use tfsmith::{PlanningError, ResearchError};

#[tokio::test]
async fn test_corpus_keeps_query_order_and_drops_duplicates() -> Result<()> {
    let search = StubSearch::new(SearchMode::PerCall(vec![
        Ok(vec![hit("alpha"), hit("beta")]),
        Ok(vec![hit("  beta  "), hit("gamma")]),
        Err("rate limited".to_string()),
    ]));

    let corpus = Researcher::new(search.clone(), 2, TIMEOUT)
        .research(EC2_RDS_REQUEST)
        .await?;

    let contents: Vec<&str> = corpus.snippets.iter().map(|s| s.content.as_str()).collect();
    assert_eq!(contents, vec!["alpha", "beta", "gamma"]);
    let origins: Vec<usize> = corpus.snippets.iter().map(|s| s.query_index).collect();
    assert_eq!(origins, vec![0, 0, 1]);
    assert_eq!(corpus.failed_queries, 1);
    assert_eq!(corpus.queries, search.queries());
    Ok(())
}

#[tokio::test]
async fn test_research_is_idempotent_with_a_deterministic_provider() -> Result<()> {
    let first = Researcher::new(StubSearch::new(SearchMode::Echo), 2, TIMEOUT)
        .research(EC2_RDS_REQUEST)
        .await?;
    let second = Researcher::new(StubSearch::new(SearchMode::Echo), 2, TIMEOUT)
        .research(EC2_RDS_REQUEST)
        .await?;

    assert_eq!(first, second);
    assert_eq!(first.len(), 3);
    Ok(())
}

#[tokio::test]
async fn test_hits_are_capped_per_query() -> Result<()> {
    let many: Vec<SearchHit> = (0..5).map(|n| hit(&format!("snippet {}", n))).collect();
    let search = StubSearch::new(SearchMode::PerCall(vec![Ok(many), Ok(Vec::new()), Ok(Vec::new())]));

    let corpus = Researcher::new(search, 2, TIMEOUT).research("an S3 bucket").await?;

    assert_eq!(corpus.len(), 2);
    assert_eq!(corpus.failed_queries, 2);
    Ok(())
}

#[tokio::test]
async fn test_all_queries_failing_is_exhausted() {
    let search = StubSearch::new(SearchMode::Fail);
    let err = Researcher::new(search.clone(), 2, TIMEOUT)
        .research("an S3 bucket")
        .await
        .unwrap_err();

    let ResearchError::Exhausted { queries } = err else {
        panic!("expected exhaustion, got {err:?}");
    };
    assert_eq!(queries.len(), 3);
    assert_eq!(search.calls(), 3);
}

#[tokio::test]
async fn test_blank_snippets_do_not_count() {
    let search = StubSearch::new(SearchMode::PerCall(vec![Ok(vec![hit("   ")]), Ok(vec![hit("")])]));
    let err = Researcher::new(search, 2, TIMEOUT)
        .research("an S3 bucket")
        .await
        .unwrap_err();
    assert!(matches!(err, ResearchError::Exhausted { .. }));
}

#[tokio::test]
async fn test_planning_failure_issues_no_search() {
    let search = StubSearch::new(SearchMode::Echo);
    let err = Researcher::new(search.clone(), 2, TIMEOUT)
        .research(" ")
        .await
        .unwrap_err();

    assert_eq!(err, ResearchError::Planning(PlanningError::EmptyRequest));
    assert_eq!(search.calls(), 0);
}

struct SlowSearch;

#[async_trait]
impl SearchProvider for SlowSearch {
    async fn search(&self, query: &str, _max_results: usize) -> Result<Vec<SearchHit>> {
        if query.contains("best practices") {
            tokio::time::sleep(Duration::from_secs(600)).await;
        }
        Ok(vec![hit(&format!("result for {}", query))])
    }

    fn name(&self) -> &str {
        "slow"
    }
}

#[tokio::test(start_paused = true)]
async fn test_timed_out_query_contributes_nothing() -> Result<()> {
    let corpus = Researcher::new(Arc::new(SlowSearch), 2, Duration::from_secs(1))
        .research("an S3 bucket")
        .await?;

    assert_eq!(corpus.len(), 2);
    assert_eq!(corpus.failed_queries, 1);
    assert!(corpus.snippets.iter().all(|s| !s.content.contains("best practices")));
    Ok(())
}
