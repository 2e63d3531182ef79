//! Runtime configuration.
//!
//! # Responsibility
//! - Collect tunables from environment-style key/value lookups.
//! - Resolve relative paths against an explicit base directory.
//!
//! # Invariants
//! - Every key has a default; only malformed values are errors.
//! - Worker counts and limits are always at least 1.

use crate::cache::change_cache::DEFAULT_CACHE_FILE;
use crate::classify::DEFAULT_CONTENT_LIMIT;
use crate::index::tag_index::DEFAULT_INDEX_WORKERS;
use crate::logging::default_log_level;
use crate::model::tag::{tag_set, TagSet};
use crate::service::reconcile::{TagPolicy, DEFAULT_MAINTENANCE_TAG};
use crate::service::tagging_service::{RunOptions, DEFAULT_CLASSIFY_WORKERS};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use std::path::{Path, PathBuf};

pub const KEY_VAULT_PATH: &str = "VAULT_PATH";
pub const KEY_CACHE_PATH: &str = "VAULTTAG_CACHE_PATH";
pub const KEY_VOCABULARY_SIZE: &str = "VAULTTAG_VOCABULARY_SIZE";
pub const KEY_CONTENT_LIMIT: &str = "VAULTTAG_CONTENT_LIMIT";
pub const KEY_INDEX_WORKERS: &str = "VAULTTAG_INDEX_WORKERS";
pub const KEY_CLASSIFY_WORKERS: &str = "VAULTTAG_CLASSIFY_WORKERS";
pub const KEY_MAINTENANCE_TAGS: &str = "VAULTTAG_MAINTENANCE_TAGS";
pub const KEY_CLASSIFIER_CMD: &str = "VAULTTAG_CLASSIFIER_CMD";
pub const KEY_LOG_LEVEL: &str = "VAULTTAG_LOG_LEVEL";
pub const KEY_LOG_DIR: &str = "VAULTTAG_LOG_DIR";

const DEFAULT_VAULT_PATH: &str = "./Notes";
const DEFAULT_VOCABULARY_SIZE: usize = 50;
const DEFAULT_LOG_DIR: &str = "logs";

/// Configuration error.
#[derive(Debug)]
pub enum ConfigError {
    /// A value could not be parsed or is out of range.
    InvalidValue {
        key: &'static str,
        value: String,
        reason: &'static str,
    },
    /// The working directory could not be determined.
    WorkingDir(io::Error),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { key, value, reason } => {
                write!(f, "invalid value `{value}` for {key}: {reason}")
            }
            Self::WorkingDir(err) => write!(f, "cannot determine working directory: {err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::WorkingDir(err) => Some(err),
            Self::InvalidValue { .. } => None,
        }
    }
}

/// Resolved tagger configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggerConfig {
    /// Root of the note corpus.
    pub vault_path: PathBuf,
    /// Change cache store file.
    pub cache_path: PathBuf,
    /// Number of top tags handed to the classifier as vocabulary.
    pub vocabulary_size: usize,
    /// Maximum content characters submitted per note.
    pub content_limit: usize,
    pub index_workers: usize,
    pub classify_workers: usize,
    pub maintenance_tags: TagSet,
    /// Shell command implementing the classifier, if configured.
    pub classifier_command: Option<String>,
    pub log_level: String,
    /// Absolute directory for rolling log files.
    pub log_dir: PathBuf,
}

impl TaggerConfig {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_dir = std::env::current_dir().map_err(ConfigError::WorkingDir)?;
        Self::from_lookup(&base_dir, |key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`, resolving paths against `base_dir`.
    pub fn from_lookup<F>(base_dir: &Path, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|raw| !raw.is_empty())
        };

        let vault_path = resolve(
            base_dir,
            value(KEY_VAULT_PATH).as_deref().unwrap_or(DEFAULT_VAULT_PATH),
        );
        let cache_path = resolve(
            base_dir,
            value(KEY_CACHE_PATH).as_deref().unwrap_or(DEFAULT_CACHE_FILE),
        );
        let log_dir = resolve(
            base_dir,
            value(KEY_LOG_DIR).as_deref().unwrap_or(DEFAULT_LOG_DIR),
        );

        let maintenance_tags = match value(KEY_MAINTENANCE_TAGS) {
            Some(raw) => tag_set(raw.split(',')),
            None => tag_set([DEFAULT_MAINTENANCE_TAG]),
        };

        Ok(Self {
            vault_path,
            cache_path,
            vocabulary_size: parse_count(
                KEY_VOCABULARY_SIZE,
                value(KEY_VOCABULARY_SIZE),
                DEFAULT_VOCABULARY_SIZE,
            )?,
            content_limit: parse_count(
                KEY_CONTENT_LIMIT,
                value(KEY_CONTENT_LIMIT),
                DEFAULT_CONTENT_LIMIT,
            )?,
            index_workers: parse_count(
                KEY_INDEX_WORKERS,
                value(KEY_INDEX_WORKERS),
                DEFAULT_INDEX_WORKERS,
            )?,
            classify_workers: parse_count(
                KEY_CLASSIFY_WORKERS,
                value(KEY_CLASSIFY_WORKERS),
                DEFAULT_CLASSIFY_WORKERS,
            )?,
            maintenance_tags,
            classifier_command: value(KEY_CLASSIFIER_CMD),
            log_level: value(KEY_LOG_LEVEL).unwrap_or_else(|| default_log_level().to_string()),
            log_dir,
        })
    }

    pub fn tag_policy(&self) -> TagPolicy {
        TagPolicy {
            maintenance_tags: self.maintenance_tags.clone(),
        }
    }

    pub fn run_options(&self, force: bool, auto_approve: bool) -> RunOptions {
        RunOptions {
            force,
            auto_approve,
            vocabulary_size: self.vocabulary_size,
            content_limit: self.content_limit,
            index_workers: self.index_workers,
            classify_workers: self.classify_workers,
        }
    }
}

fn resolve(base_dir: &Path, value: &str) -> PathBuf {
    let path = Path::new(value);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

fn parse_count(
    key: &'static str,
    raw: Option<String>,
    default: usize,
) -> Result<usize, ConfigError> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    match raw.parse::<usize>() {
        Ok(0) => Err(ConfigError::InvalidValue {
            key,
            value: raw,
            reason: "must be at least 1",
        }),
        Ok(parsed) => Ok(parsed),
        Err(_) => Err(ConfigError::InvalidValue {
            key,
            value: raw,
            reason: "expected a positive integer",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, TaggerConfig, KEY_CLASSIFY_WORKERS, KEY_VOCABULARY_SIZE};
    use crate::model::tag::tag_set;
    use std::collections::HashMap;
    use std::path::Path;

    fn load(pairs: &[(&str, &str)]) -> Result<TaggerConfig, ConfigError> {
        let values: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        TaggerConfig::from_lookup(Path::new("/work"), |key| values.get(key).cloned())
    }

    #[test]
    fn defaults_resolve_against_base_dir() {
        let config = load(&[]).unwrap();
        assert_eq!(config.vault_path, Path::new("/work/./Notes"));
        assert_eq!(config.cache_path, Path::new("/work/.auto_tag_cache.json"));
        assert_eq!(config.log_dir, Path::new("/work/logs"));
        assert_eq!(config.vocabulary_size, 50);
        assert_eq!(config.content_limit, 4000);
        assert_eq!(config.maintenance_tags, tag_set(["for-review"]));
        assert!(config.classifier_command.is_none());
    }

    #[test]
    fn explicit_values_override_defaults() {
        let config = load(&[
            ("VAULT_PATH", "/vault"),
            ("VAULTTAG_VOCABULARY_SIZE", "10"),
            ("VAULTTAG_MAINTENANCE_TAGS", "#stale, for-review"),
            ("VAULTTAG_CLASSIFIER_CMD", "  ./classify.sh  "),
        ])
        .unwrap();
        assert_eq!(config.vault_path, Path::new("/vault"));
        assert_eq!(config.vocabulary_size, 10);
        assert_eq!(config.maintenance_tags, tag_set(["stale", "for-review"]));
        assert_eq!(config.classifier_command.as_deref(), Some("./classify.sh"));
    }

    #[test]
    fn zero_and_garbage_counts_are_rejected() {
        let zero = load(&[(KEY_CLASSIFY_WORKERS, "0")]).unwrap_err();
        assert!(matches!(
            zero,
            ConfigError::InvalidValue { key, .. } if key == KEY_CLASSIFY_WORKERS
        ));
        let garbage = load(&[(KEY_VOCABULARY_SIZE, "lots")]).unwrap_err();
        assert!(garbage.to_string().contains("positive integer"));
    }
}
