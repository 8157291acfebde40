// Candidate generation and review

pub mod generator;
pub mod hcl;
pub mod prompts;
pub mod reviewer;

pub use generator::{CodeGenerator, Revision};
pub use hcl::{extract_code, scan, HclDocument, SyntaxError};
pub use reviewer::{local_issues, Reviewer};
