//! Configuration for the review application.
//!
//! Stored as TOML. Every field has a default, so an empty file (or no file
//! at all) is a valid configuration:
//!
//! ```toml
//! data_dir = "reviews"
//! evidence_dir = "evidence"
//! denial_policy = "reject"      # or "ignore"
//! collaborator_timeout_ms = 5000
//! log_filter = "info"
//! ```

use crate::error::AppError;
use kra_review_core::DenialPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "kra-review.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding one `<review-id>.json` document per review.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Directory holding uploaded evidence content.
    #[serde(default = "default_evidence_dir")]
    pub evidence_dir: PathBuf,
    /// How out-of-stage or out-of-role requests are answered.
    #[serde(default)]
    pub denial_policy: DenialPolicy,
    /// Upper bound on every save/submit/upload/delete call.
    #[serde(default = "default_collaborator_timeout_ms")]
    pub collaborator_timeout_ms: u64,
    /// `tracing` filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            evidence_dir: default_evidence_dir(),
            denial_policy: DenialPolicy::default(),
            collaborator_timeout_ms: default_collaborator_timeout_ms(),
            log_filter: default_log_filter(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("reviews")
}

fn default_evidence_dir() -> PathBuf {
    PathBuf::from("evidence")
}

const fn default_collaborator_timeout_ms() -> u64 {
    5_000
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration.
    ///
    /// An explicit path must exist. Without one, `kra-review.toml` in the
    /// working directory is used if present, defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.exists() {
                    Self::from_file(fallback)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw).map_err(|source| AppError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    #[must_use]
    pub fn collaborator_timeout(&self) -> Duration {
        Duration::from_millis(self.collaborator_timeout_ms)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.collaborator_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn partial_file_overrides_only_given_keys() {
        let config: Config =
            toml::from_str("denial_policy = \"ignore\"\ncollaborator_timeout_ms = 250\n").unwrap();
        assert_eq!(config.denial_policy, DenialPolicy::Ignore);
        assert_eq!(config.collaborator_timeout_ms, 250);
        assert_eq!(config.data_dir, PathBuf::from("reviews"));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::load(Some(&dir.path().join("absent.toml")));
        assert!(matches!(result, Err(AppError::Io(_))));
    }

    #[test]
    fn bad_toml_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "denial_policy = 3").unwrap();
        let err = Config::from_file(&path).unwrap_err();
        assert!(err.to_string().contains("bad.toml"));
    }
}
