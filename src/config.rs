//! Runtime configuration read from `RENALSIGHT_*` environment variables.

use std::path::PathBuf;

use crate::application::FailurePolicy;
use crate::RenalsightError;

pub const MODEL_DIR_ENV: &str = "RENALSIGHT_MODEL_DIR";
pub const LOG_MODE_ENV: &str = "RENALSIGHT_LOG_MODE";
pub const LOG_FILE_ENV: &str = "RENALSIGHT_LOG_FILE";
pub const FAILURE_POLICY_ENV: &str = "RENALSIGHT_FAILURE_POLICY";
pub const REQUIRE_MANIFEST_ENV: &str = "RENALSIGHT_REQUIRE_MANIFEST";

/// Where log lines go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogMode {
    /// File when stdout is a terminal, stdout otherwise.
    #[default]
    Auto,
    File,
    Stdout,
}

impl LogMode {
    /// Resolve `Auto` against whether stdout is interactive.
    #[must_use]
    pub fn use_file(self, interactive: bool) -> bool {
        match self {
            Self::File => true,
            Self::Stdout => false,
            Self::Auto => interactive,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub model_dir: PathBuf,
    pub log_mode: LogMode,
    pub log_file: PathBuf,
    pub failure_policy: FailurePolicy,
    pub require_manifest: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            log_mode: LogMode::Auto,
            log_file: PathBuf::from("renalsight.log"),
            failure_policy: FailurePolicy::Isolated,
            require_manifest: false,
        }
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value.trim(), "1" | "true" | "TRUE" | "yes" | "YES")
}

impl AppConfig {
    /// Read the process environment once.
    ///
    /// # Errors
    /// Returns `RenalsightError::Config` for unrecognised values.
    pub fn from_env() -> Result<Self, RenalsightError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source. Unset variables keep their defaults.
    ///
    /// # Errors
    /// Returns `RenalsightError::Config` for unrecognised values.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, RenalsightError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(dir) = lookup(MODEL_DIR_ENV).filter(|v| !v.trim().is_empty()) {
            config.model_dir = PathBuf::from(dir.trim());
        }

        if let Some(mode) = lookup(LOG_MODE_ENV) {
            config.log_mode = match mode.trim() {
                "" | "auto" => LogMode::Auto,
                "file" => LogMode::File,
                "stdout" => LogMode::Stdout,
                other => {
                    return Err(RenalsightError::Config(format!(
                        "{LOG_MODE_ENV}={other:?} (expected auto, file or stdout)"
                    )))
                }
            };
        }

        if let Some(file) = lookup(LOG_FILE_ENV).filter(|v| !v.trim().is_empty()) {
            config.log_file = PathBuf::from(file.trim());
        }

        if let Some(policy) = lookup(FAILURE_POLICY_ENV).filter(|v| !v.trim().is_empty()) {
            config.failure_policy = policy
                .parse()
                .map_err(|e| RenalsightError::Config(format!("{FAILURE_POLICY_ENV}: {e}")))?;
        }

        if let Some(flag) = lookup(REQUIRE_MANIFEST_ENV) {
            config.require_manifest = parse_bool(&flag);
        }

        Ok(config)
    }
}
