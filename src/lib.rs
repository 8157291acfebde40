// tfsmith - plain-language AWS requests to reviewed Terraform
// Library exports

pub mod codegen;
pub mod config;
pub mod errors;
pub mod output;
pub mod providers;
pub mod refinement;
pub mod research;

pub use config::{load_settings, Settings};
pub use errors::{
    ConfigError, GenerationError, PlanningError, ResearchError, ReviewError, RunAborted, RunError,
};
pub use output::{write_artifacts, Artifacts};
pub use refinement::{Critique, Issue, Outcome, RefinementLoop, RunEvent, RunReport, Severity, Stage};
