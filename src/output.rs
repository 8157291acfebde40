// Artifact writing: the final candidate and the one before it

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::constants::{MAIN_TF, PREVIOUS_TF};

/// Paths written by [`write_artifacts`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifacts {
    pub main: PathBuf,
    /// Only written when at least two candidates exist
    pub previous: Option<PathBuf>,
}

/// Write the last candidate of `history` to `main.tf` and the one before it
/// to `second_last_main.tf`. A stale `second_last_main.tf` from an earlier
/// run is removed when there is no previous candidate.
pub fn write_artifacts(dir: &Path, history: &[String]) -> Result<Artifacts> {
    let Some(last) = history.last() else {
        anyhow::bail!("No candidate configuration to write");
    };

    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;

    let main = dir.join(MAIN_TF);
    write_file(&main, last)?;

    let previous_path = dir.join(PREVIOUS_TF);
    let previous = match history.len().checked_sub(2).map(|i| &history[i]) {
        Some(code) => {
            write_file(&previous_path, code)?;
            Some(previous_path)
        }
        None => {
            if previous_path.exists() {
                fs::remove_file(&previous_path)
                    .with_context(|| format!("Failed to remove stale {}", previous_path.display()))?;
            }
            None
        }
    };

    tracing::debug!(main = %main.display(), "Wrote artifacts");
    Ok(Artifacts { main, previous })
}

fn write_file(path: &Path, code: &str) -> Result<()> {
    let mut contents = code.trim_end().to_string();
    contents.push('\n');
    fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_single_candidate() {
        let dir = TempDir::new().unwrap();
        let artifacts = write_artifacts(dir.path(), &["resource \"aws_s3_bucket\" \"a\" {}".to_string()]).unwrap();

        assert_eq!(
            fs::read_to_string(&artifacts.main).unwrap(),
            "resource \"aws_s3_bucket\" \"a\" {}\n"
        );
        assert!(artifacts.previous.is_none());
        assert!(!dir.path().join(PREVIOUS_TF).exists());
    }

    #[test]
    fn test_previous_candidate_written() {
        let dir = TempDir::new().unwrap();
        let history = vec!["v1".to_string(), "v2".to_string(), "v3\n\n".to_string()];
        let artifacts = write_artifacts(dir.path(), &history).unwrap();

        assert_eq!(fs::read_to_string(&artifacts.main).unwrap(), "v3\n");
        let previous = artifacts.previous.unwrap();
        assert_eq!(previous, dir.path().join("second_last_main.tf"));
        assert_eq!(fs::read_to_string(previous).unwrap(), "v2\n");
    }

    #[test]
    fn test_stale_previous_removed() {
        let dir = TempDir::new().unwrap();
        write_artifacts(dir.path(), &["v1".to_string(), "v2".to_string()]).unwrap();
        write_artifacts(dir.path(), &["w1".to_string()]).unwrap();
        assert!(!dir.path().join(PREVIOUS_TF).exists());
    }

    #[test]
    fn test_creates_directory_and_rejects_empty_history() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("infra/prod");
        write_artifacts(&nested, &["v1".to_string()]).unwrap();
        assert!(nested.join(MAIN_TF).exists());

        assert!(write_artifacts(dir.path(), &[]).is_err());
    }
}
