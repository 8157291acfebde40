// Settings loader
// Defaults, then ~/.tfsmith/config.toml (or an explicit file), then environment

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::constants::*;
use super::settings::Settings;

/// `~/.tfsmith/config.toml`, if a home directory can be determined.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".tfsmith").join("config.toml"))
}

/// Load settings for this process.
///
/// An explicit `path` must exist; the default path is optional. Environment
/// variables override file values. Credentials are not required here; the
/// caller decides whether the command needs them.
pub fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let mut settings = match path {
        Some(path) => {
            if !path.exists() {
                bail!("Configuration file not found: {}", path.display());
            }
            read_settings_file(path)?
        }
        None => match default_config_path() {
            Some(path) if path.exists() => read_settings_file(&path)?,
            _ => Settings::default(),
        },
    };

    apply_env_overrides(&mut settings, |key| std::env::var(key).ok())?;

    settings
        .validate()
        .context("Configuration validation failed")?;

    Ok(settings)
}

fn read_settings_file(path: &Path) -> Result<Settings> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;
    let settings: Settings = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse configuration file: {}", path.display()))?;
    tracing::debug!("Loaded settings from {}", path.display());
    Ok(settings)
}

/// Apply environment overrides through `lookup` so tests can inject values.
///
/// Empty variables are ignored.
pub fn apply_env_overrides<F>(settings: &mut Settings, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(key) = get(ENV_TAVILY_API_KEY) {
        settings.credentials.tavily_api_key = Some(key);
    }
    if let Some(key) = get(ENV_OPENAI_API_KEY) {
        settings.credentials.openai_api_key = Some(key);
    }
    if let Some(url) = get(ENV_OPENAI_BASE_URL) {
        settings.generation.base_url = url.trim_end_matches('/').to_string();
    }
    if let Some(model) = get(ENV_MODEL) {
        settings.generation.model = model;
    }
    if let Some(raw) = get(ENV_MAX_REVISIONS) {
        settings.refinement.max_revisions = raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a positive integer, got {:?}", ENV_MAX_REVISIONS, raw))?;
    }

    Ok(())
}
