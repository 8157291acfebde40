// Error taxonomy for a generation run
//
// Each pipeline component owns its error type; the refinement loop folds the
// unrecoverable ones into `RunError`.

use std::time::Duration;
use thiserror::Error;

use crate::refinement::types::Stage;

/// The request cannot be turned into research queries.
///
/// Raised before any provider call and never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanningError {
    #[error("the request is empty; describe the AWS infrastructure you need")]
    EmptyRequest,

    #[error("no AWS infrastructure could be identified in the request {request:?}")]
    NoInfrastructureIntent { request: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResearchError {
    #[error(transparent)]
    Planning(#[from] PlanningError),

    /// Every query failed or came back empty.
    #[error("all {} research queries returned nothing", queries.len())]
    Exhausted { queries: Vec<String> },
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation provider failed: {0:#}")]
    Provider(anyhow::Error),

    #[error("generation provider did not answer within {0:?}")]
    Timeout(Duration),

    #[error("generation provider returned no configuration")]
    EmptyOutput,

    #[error("generated configuration is not well-formed: {0}")]
    Unparseable(String),
}

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("review provider failed: {0:#}")]
    Provider(anyhow::Error),

    #[error("review provider did not answer within {0:?}")]
    Timeout(Duration),

    #[error("review response could not be understood: {0}")]
    Unparseable(String),
}

/// A run stopped before reaching a terminal state.
///
/// Carries every candidate generated so far so the caller can still offer
/// the best available configuration, flagged as incomplete.
#[derive(Debug, Error)]
#[error("run aborted while {stage} after {revision_count} revision(s): {cause}")]
pub struct RunAborted {
    pub stage: Stage,
    #[source]
    pub cause: GenerationError,
    pub history: Vec<String>,
    pub revision_count: u32,
}

impl RunAborted {
    /// The most recent candidate, if any generation succeeded.
    pub fn best_candidate(&self) -> Option<&str> {
        self.history.last().map(String::as_str)
    }

    /// Aborted runs never produce a reviewed result.
    pub fn is_incomplete(&self) -> bool {
        true
    }

    /// What the kept candidate is. Runs only abort while generating, so the
    /// last candidate was reviewed and sent back with open issues.
    pub fn candidate_note(&self) -> Option<String> {
        self.best_candidate()?;
        Some(format!(
            "last generated candidate (open review issues after {} revision(s))",
            self.revision_count
        ))
    }
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Planning(#[from] PlanningError),

    #[error(transparent)]
    Aborted(#[from] RunAborted),
}

/// Startup-time configuration problems. Never raised from inside a run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("missing credential {0}; export it or add it to the config file")]
    MissingCredential(&'static str),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
