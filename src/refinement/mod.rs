// Refinement loop: research once, then generate and review until approved or capped

pub mod loop_runner;
pub mod types;

pub use loop_runner::RefinementLoop;
pub use types::{Critique, Issue, Issues, LoopState, Outcome, RunEvent, RunReport, Severity, Stage};
