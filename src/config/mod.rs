// Configuration module
// Public interface for settings loading

pub mod constants;
mod loader;
mod settings;

pub use loader::{apply_env_overrides, default_config_path, load_settings};
pub use settings::{
    Credentials, GenerationSettings, HttpSettings, RefinementSettings, ResearchSettings,
    SearchDepth, Settings,
};
