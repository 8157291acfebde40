// Refinement loop runner: research once, then generate + review until
// the reviewer approves or the revision cap is reached

use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::Instrument;

use super::types::{Critique, Issue, LoopState, Outcome, RunEvent, RunReport, RunState, Severity, Stage};
use crate::codegen::{CodeGenerator, Reviewer, Revision};
use crate::config::Settings;
use crate::errors::{ResearchError, ReviewError, RunAborted, RunError};
use crate::providers::{LlmProvider, SearchProvider};
use crate::research::{ResearchCorpus, Researcher};

/// The refinement state machine.
///
/// Drives `Researching → Generating → Reviewing` and loops back to
/// `Generating` while the reviewer asks for changes, until one of the
/// following holds:
/// - the reviewer approves the candidate
/// - `revision_count` reaches the cap
/// - generation fails twice in a row (the run is aborted)
///
/// Holds no per-run state; one instance can serve concurrent runs.
pub struct RefinementLoop {
    researcher: Researcher,
    generator: CodeGenerator,
    reviewer: Reviewer,
    max_revisions: u32,
    events: Option<UnboundedSender<RunEvent>>,
}

impl RefinementLoop {
    pub fn new(researcher: Researcher, generator: CodeGenerator, reviewer: Reviewer, max_revisions: u32) -> Self {
        Self {
            researcher,
            generator,
            reviewer,
            max_revisions,
            events: None,
        }
    }

    /// Wire every component from settings. The same text generation provider
    /// serves generation and review.
    pub fn from_settings(
        settings: &Settings,
        llm: Arc<dyn LlmProvider>,
        search: Arc<dyn SearchProvider>,
    ) -> Self {
        let call_timeout = settings.call_timeout();
        Self::new(
            Researcher::new(search, settings.research.max_results_per_query, call_timeout),
            CodeGenerator::new(llm.clone(), &settings.generation, call_timeout),
            Reviewer::new(llm, &settings.generation, call_timeout),
            settings.refinement.max_revisions,
        )
    }

    /// Send a [`RunEvent`] for every transition to `events`.
    pub fn with_events(mut self, events: UnboundedSender<RunEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Run the loop for one request.
    ///
    /// Both terminal states are `Ok`; a capped run is a partial success and
    /// carries the open critique. Errors are limited to planning failures
    /// (before any provider call) and aborted runs.
    pub async fn run(&self, request: &str) -> Result<RunReport, RunError> {
        let state = RunState::new(request);
        let span = tracing::info_span!("run", run_id = %state.run_id);
        self.execute(state).instrument(span).await
    }

    async fn execute(&self, mut state: RunState) -> Result<RunReport, RunError> {
        let mut current = LoopState::Active(Stage::Researching);

        loop {
            current = match current {
                LoopState::Active(stage) => {
                    tracing::info!(%stage, revision = state.revision_count, "Entering stage");
                    self.emit(RunEvent::StageEntered {
                        stage,
                        revision: state.revision_count,
                    });

                    match stage {
                        Stage::Researching => {
                            self.research(&mut state).await?;
                            LoopState::Active(Stage::Generating)
                        }
                        Stage::Generating => {
                            self.generate(&mut state).await?;
                            LoopState::Active(Stage::Reviewing)
                        }
                        Stage::Reviewing => self.review(&mut state).await,
                    }
                }
                LoopState::DoneApproved => return Ok(self.finish(state, Outcome::Approved)),
                LoopState::DoneCapped => return Ok(self.finish(state, Outcome::Capped)),
            };
        }
    }

    async fn research(&self, state: &mut RunState) -> Result<(), RunError> {
        match self.researcher.research(&state.user_request).await {
            Ok(corpus) => state.research_corpus = corpus,
            Err(ResearchError::Planning(e)) => return Err(RunError::Planning(e)),
            Err(ResearchError::Exhausted { queries }) => {
                tracing::warn!("Research exhausted; generating without a corpus");
                state.research_degraded = true;
                state.research_corpus = ResearchCorpus::empty(queries);
            }
        }

        self.emit(RunEvent::ResearchCompleted {
            snippets: state.research_corpus.len(),
            degraded: state.research_degraded,
        });
        Ok(())
    }

    async fn generate(&self, state: &mut RunState) -> Result<(), RunError> {
        let revision = match (&state.critique, state.candidate_code()) {
            (Some(Critique::NeedsRevision(issues)), Some(previous)) => Some(Revision { previous, issues }),
            _ => None,
        };

        let result = self
            .generator
            .generate(&state.user_request, &state.research_corpus, revision)
            .await;

        match result {
            Ok(code) => {
                self.emit(RunEvent::CandidateGenerated {
                    revision: state.revision_count,
                    bytes: code.len(),
                });
                state.history.push(code);
                Ok(())
            }
            Err(cause) => {
                tracing::error!(revision = state.revision_count, "Generation failed: {}", cause);
                self.emit(RunEvent::Aborted {
                    stage: Stage::Generating,
                    revision_count: state.revision_count,
                    reason: cause.to_string(),
                });
                Err(RunAborted {
                    stage: Stage::Generating,
                    cause,
                    history: std::mem::take(&mut state.history),
                    revision_count: state.revision_count,
                }
                .into())
            }
        }
    }

    async fn review(&self, state: &mut RunState) -> LoopState {
        let candidate = state.candidate_code().unwrap_or_default();
        let critique = match self.reviewer.review(&state.user_request, candidate).await {
            Ok(critique) => critique,
            Err(e) => {
                tracing::warn!("Review failed, requesting a revision: {}", e);
                Critique::from_issues(vec![review_failure_issue(&e)])
            }
        };

        self.emit(RunEvent::Reviewed {
            revision: state.revision_count,
            issues: critique.issues().len(),
        });

        let next = match &critique {
            Critique::Approved => LoopState::DoneApproved,
            Critique::NeedsRevision(_) if state.revision_count < self.max_revisions => {
                state.revision_count += 1;
                LoopState::Active(Stage::Generating)
            }
            Critique::NeedsRevision(issues) => {
                tracing::warn!(
                    open_issues = issues.len(),
                    "Revision cap of {} reached",
                    self.max_revisions
                );
                LoopState::DoneCapped
            }
        };
        state.critique = Some(critique);
        next
    }

    fn finish(&self, state: RunState, outcome: Outcome) -> RunReport {
        tracing::info!(
            ?outcome,
            revisions = state.revision_count,
            candidates = state.history.len(),
            "Run finished"
        );
        self.emit(RunEvent::Finished {
            outcome,
            revision_count: state.revision_count,
        });
        state.into_report(outcome)
    }

    fn emit(&self, event: RunEvent) {
        if let Some(events) = &self.events {
            // A dropped receiver only means nobody is watching
            let _ = events.send(event);
        }
    }
}

/// A review that could not be completed must never pass as an approval.
fn review_failure_issue(error: &ReviewError) -> Issue {
    Issue::new(
        Severity::Correctness,
        format!("The configuration could not be reviewed: {}", error),
        "Regenerate the complete configuration as a single well-formed HCL document",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GenerationSettings;
    use crate::providers::{ProviderRequest, ProviderResponse, SearchHit};
    use anyhow::Result;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::mpsc;

    const BUCKET: &str = r#"```hcl
provider "aws" {
  region = var.aws_region
}

variable "aws_region" {
  default = "us-east-1"
}

resource "aws_s3_bucket" "data" {
  bucket_prefix = "data-"
}

output "bucket_arn" {
  value = aws_s3_bucket.data.arn
}
```"#;

    /// Generates a fixed bucket; reviews with `review_reply`, or fails when `None`.
    struct Llm {
        review_reply: Option<&'static str>,
        reviews: AtomicUsize,
    }

    #[async_trait]
    impl LlmProvider for Llm {
        async fn send_message(&self, request: &ProviderRequest) -> Result<ProviderResponse> {
            if request.messages[0].content.starts_with("You review") {
                self.reviews.fetch_add(1, Ordering::SeqCst);
                return match self.review_reply {
                    Some(reply) => Ok(ProviderResponse::text("stub", reply)),
                    None => anyhow::bail!("review service unavailable"),
                };
            }
            Ok(ProviderResponse::text("stub", BUCKET))
        }

        fn name(&self) -> &str {
            "stub"
        }

        fn default_model(&self) -> &str {
            "stub"
        }
    }

    struct Search;

    #[async_trait]
    impl SearchProvider for Search {
        async fn search(&self, query: &str, _max_results: usize) -> Result<Vec<SearchHit>> {
            Ok(vec![SearchHit::new(query, "https://example.com", format!("notes for {}", query))])
        }

        fn name(&self) -> &str {
            "stub"
        }
    }

    fn runner(llm: Arc<Llm>, max_revisions: u32) -> RefinementLoop {
        let timeout = Duration::from_secs(5);
        RefinementLoop::new(
            Researcher::new(Arc::new(Search), 2, timeout),
            CodeGenerator::new(llm.clone(), &GenerationSettings::default(), timeout),
            Reviewer::new(llm, &GenerationSettings::default(), timeout),
            max_revisions,
        )
    }

    #[tokio::test]
    async fn test_review_failure_never_approves() {
        let llm = Arc::new(Llm {
            review_reply: None,
            reviews: AtomicUsize::new(0),
        });
        let report = runner(llm.clone(), 1).run("an S3 bucket").await.unwrap();

        assert_eq!(report.outcome, Outcome::Capped);
        assert_eq!(report.revision_count, 1);
        assert_eq!(report.history.len(), 2);
        assert_eq!(report.critique.issues()[0].severity, Severity::Correctness);
        assert!(report.critique.issues()[0].issue.contains("could not be reviewed"));
        // two review passes, each retried once
        assert_eq!(llm.reviews.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_events_follow_transitions() {
        let llm = Arc::new(Llm {
            review_reply: Some("The code is valid."),
            reviews: AtomicUsize::new(0),
        });
        let (tx, mut rx) = mpsc::unbounded_channel();
        let report = runner(llm, 3).with_events(tx).run("an S3 bucket").await.unwrap();
        assert!(report.is_approved());

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert_eq!(
            events,
            vec![
                RunEvent::StageEntered { stage: Stage::Researching, revision: 0 },
                RunEvent::ResearchCompleted { snippets: 3, degraded: false },
                RunEvent::StageEntered { stage: Stage::Generating, revision: 0 },
                RunEvent::CandidateGenerated {
                    revision: 0,
                    bytes: report.history[0].len()
                },
                RunEvent::StageEntered { stage: Stage::Reviewing, revision: 0 },
                RunEvent::Reviewed { revision: 0, issues: 0 },
                RunEvent::Finished {
                    outcome: Outcome::Approved,
                    revision_count: 0
                },
            ]
        );
    }

    #[test]
    fn test_review_failure_issue_is_correctness() {
        let issue = review_failure_issue(&ReviewError::Unparseable("hmm".to_string()));
        assert_eq!(issue.severity, Severity::Correctness);
        assert!(issue.issue.contains("hmm"));
    }
}
