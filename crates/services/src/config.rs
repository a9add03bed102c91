//! Runtime configuration read from `EXAM_*` environment variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use exam_core::time::DEFAULT_LOW_TIME_SECS;
use thiserror::Error;

pub const DB_URL_VAR: &str = "EXAM_DB_URL";
pub const PERSIST_TIMEOUT_VAR: &str = "EXAM_PERSIST_TIMEOUT_MS";
pub const LOW_TIME_VAR: &str = "EXAM_LOW_TIME_SECS";

const DEFAULT_DB_URL: &str = "sqlite://exam.sqlite3";
const DEFAULT_PERSIST_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("{var} must not be empty")]
    Empty { var: &'static str },
    #[error("invalid {var} value: {raw}")]
    Invalid { var: &'static str, raw: String },
}

/// Settings shared by the session engine and its storage backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamConfig {
    pub db_url: String,
    pub persist_timeout: Duration,
    pub low_time_threshold_secs: u64,
}

impl Default for ExamConfig {
    fn default() -> Self {
        Self {
            db_url: normalize_sqlite_url(DEFAULT_DB_URL),
            persist_timeout: Duration::from_millis(DEFAULT_PERSIST_TIMEOUT_MS),
            low_time_threshold_secs: DEFAULT_LOW_TIME_SECS,
        }
    }
}

impl ExamConfig {
    /// Read configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` naming the first variable with an unusable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`, falling back to defaults for
    /// missing keys.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` naming the first variable with an unusable value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(raw) = lookup(DB_URL_VAR) {
            if raw.trim().is_empty() {
                return Err(ConfigError::Empty { var: DB_URL_VAR });
            }
            config.db_url = normalize_sqlite_url(&raw);
        }
        if let Some(raw) = lookup(PERSIST_TIMEOUT_VAR) {
            let millis = parse_u64(PERSIST_TIMEOUT_VAR, &raw)?;
            if millis == 0 {
                return Err(ConfigError::Invalid {
                    var: PERSIST_TIMEOUT_VAR,
                    raw,
                });
            }
            config.persist_timeout = Duration::from_millis(millis);
        }
        if let Some(raw) = lookup(LOW_TIME_VAR) {
            config.low_time_threshold_secs = parse_u64(LOW_TIME_VAR, &raw)?;
        }

        Ok(config)
    }
}

fn parse_u64(var: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim().parse::<u64>().map_err(|_| ConfigError::Invalid {
        var,
        raw: raw.to_string(),
    })
}

/// Turn a bare path or `sqlite:` URL into a `sqlite://` URL that creates the
/// file on first use.
#[must_use]
pub fn normalize_sqlite_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed == "sqlite::memory:" || trimmed.contains("mode=memory") {
        return trimmed.to_string();
    }

    let base = if trimmed.starts_with("sqlite://") {
        trimmed.to_string()
    } else {
        let path_str = trimmed.strip_prefix("sqlite:").unwrap_or(trimmed);
        let path = Path::new(path_str);
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .unwrap_or_else(|_| PathBuf::from("."))
                .join(path)
        };
        format!("sqlite://{}", absolute.display())
    };

    if base.contains("mode=") {
        base
    } else if base.contains('?') {
        format!("{base}&mode=rwc")
    } else {
        format!("{base}?mode=rwc")
    }
}
