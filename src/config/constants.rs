// Project-wide constants
//
// Centralised here so default endpoints, limits and artifact names have one
// source of truth. Import via `use crate::config::constants::*;`.

/// Maximum number of Generator→Reviewer revision cycles after the first candidate.
pub const DEFAULT_MAX_REVISIONS: u32 = 3;

/// Per provider call timeout applied by the pipeline components.
pub const DEFAULT_CALL_TIMEOUT_SECS: u64 = 60;

/// Number of research queries derived from a request.
pub const QUERY_COUNT: usize = 3;

/// Search hits requested per research query.
pub const DEFAULT_MAX_RESULTS_PER_QUERY: usize = 2;

/// One initial attempt plus one retry.
pub const GENERATION_ATTEMPTS: u32 = 2;

/// One initial attempt plus one retry.
pub const REVIEW_ATTEMPTS: u32 = 2;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_GENERATION_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

pub const DEFAULT_TAVILY_BASE_URL: &str = "https://api.tavily.com";

/// Transport-level retry for transient HTTP failures (429 / 5xx / connect errors).
pub const DEFAULT_HTTP_ATTEMPTS: u32 = 3;
pub const DEFAULT_HTTP_BASE_DELAY_MS: u64 = 1000;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 90;

pub const ENV_TAVILY_API_KEY: &str = "TAVILY_API_KEY";
pub const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_OPENAI_BASE_URL: &str = "OPENAI_BASE_URL";
pub const ENV_MODEL: &str = "TFSMITH_MODEL";
pub const ENV_MAX_REVISIONS: &str = "TFSMITH_MAX_REVISIONS";

/// File name of the final configuration artifact.
pub const MAIN_TF: &str = "main.tf";

/// File name of the second-to-last candidate.
pub const PREVIOUS_TF: &str = "second_last_main.tf";
