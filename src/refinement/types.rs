// Refinement loop types: Critique, Issue, RunState, RunReport, RunEvent

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::ops::Deref;
use uuid::Uuid;

use crate::research::ResearchCorpus;

/// How bad a reviewer finding is. Declaration order is sort order:
/// correctness problems come before style nits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Malformed HCL, broken references, review could not be completed
    Correctness,
    /// A resource the request implies is missing
    Coverage,
    Security,
    Style,
}

impl Severity {
    /// Lenient mapping for labels coming back from the review provider
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "correctness" | "syntax" | "error" | "critical" => Self::Correctness,
            "coverage" | "missing" | "completeness" => Self::Coverage,
            "security" | "high" => Self::Security,
            _ => Self::Style,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Correctness => "correctness",
            Self::Coverage => "coverage",
            Self::Security => "security",
            Self::Style => "style",
        };
        f.write_str(label)
    }
}

/// One reviewer finding with the suggested fix
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub severity: Severity,
    pub issue: String,
    pub fix: String,
}

impl Issue {
    pub fn new(severity: Severity, issue: impl Into<String>, fix: impl Into<String>) -> Self {
        Self {
            severity,
            issue: issue.into(),
            fix: fix.into(),
        }
    }
}

/// A non-empty list of issues, ordered by severity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Issues(Vec<Issue>);

impl Issues {
    /// `None` for an empty list. Sorting is stable, so issues of equal
    /// severity keep the order they were found in.
    pub fn new(mut issues: Vec<Issue>) -> Option<Self> {
        if issues.is_empty() {
            return None;
        }
        issues.sort_by_key(|i| i.severity);
        Some(Self(issues))
    }
}

impl Deref for Issues {
    type Target = [Issue];

    fn deref(&self) -> &[Issue] {
        &self.0
    }
}

/// Reviewer verdict on one candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", content = "issues", rename_all = "snake_case")]
pub enum Critique {
    Approved,
    NeedsRevision(Issues),
}

impl Critique {
    /// An empty list is an approval.
    pub fn from_issues(issues: Vec<Issue>) -> Self {
        match Issues::new(issues) {
            Some(issues) => Self::NeedsRevision(issues),
            None => Self::Approved,
        }
    }

    pub fn is_approved(&self) -> bool {
        matches!(self, Self::Approved)
    }

    pub fn issues(&self) -> &[Issue] {
        match self {
            Self::Approved => &[],
            Self::NeedsRevision(issues) => issues,
        }
    }
}

/// Loop stages that do work; terminal states live in [`LoopState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Researching,
    Generating,
    Reviewing,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Researching => "researching",
            Self::Generating => "generating",
            Self::Reviewing => "reviewing",
        };
        f.write_str(label)
    }
}

/// Every state of the refinement state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Active(Stage),
    DoneApproved,
    DoneCapped,
}

/// How a completed run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The reviewer approved the final candidate
    Approved,
    /// The revision cap was hit; the final candidate still has open issues
    Capped,
}

/// Mutable state of one run. Owned by the loop, never shared.
#[derive(Debug)]
pub(crate) struct RunState {
    pub run_id: Uuid,
    pub user_request: String,
    pub research_corpus: ResearchCorpus,
    pub research_degraded: bool,
    pub critique: Option<Critique>,
    pub revision_count: u32,
    pub history: Vec<String>,
    pub started_at: DateTime<Utc>,
}

impl RunState {
    pub fn new(user_request: &str) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            user_request: user_request.to_string(),
            research_corpus: ResearchCorpus::default(),
            research_degraded: false,
            critique: None,
            revision_count: 0,
            history: Vec::new(),
            started_at: Utc::now(),
        }
    }

    /// Current best candidate (the last one generated)
    pub fn candidate_code(&self) -> Option<&str> {
        self.history.last().map(String::as_str)
    }

    pub fn into_report(self, outcome: Outcome) -> RunReport {
        RunReport {
            run_id: self.run_id,
            outcome,
            user_request: self.user_request,
            research_corpus: self.research_corpus,
            research_degraded: self.research_degraded,
            critique: self.critique.unwrap_or(Critique::Approved),
            revision_count: self.revision_count,
            history: self.history,
            started_at: self.started_at,
            finished_at: Utc::now(),
        }
    }
}

/// Result of a run that reached a terminal state
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub outcome: Outcome,
    pub user_request: String,
    pub research_corpus: ResearchCorpus,
    /// Research came back empty and generation ran without a corpus
    pub research_degraded: bool,
    /// The verdict on the final candidate
    pub critique: Critique,
    pub revision_count: u32,
    /// Every candidate in generation order; never empty
    pub history: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    pub fn final_candidate(&self) -> &str {
        self.history.last().map(String::as_str).unwrap_or_default()
    }

    /// The second-to-last candidate, offered as the "previous version".
    pub fn previous_candidate(&self) -> Option<&str> {
        self.history
            .len()
            .checked_sub(2)
            .map(|i| self.history[i].as_str())
    }

    pub fn is_approved(&self) -> bool {
        self.outcome == Outcome::Approved
    }
}

/// Progress notifications, one per state transition
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEvent {
    StageEntered { stage: Stage, revision: u32 },
    ResearchCompleted { snippets: usize, degraded: bool },
    CandidateGenerated { revision: u32, bytes: usize },
    Reviewed { revision: u32, issues: usize },
    Finished { outcome: Outcome, revision_count: u32 },
    Aborted { stage: Stage, revision_count: u32, reason: String },
}
