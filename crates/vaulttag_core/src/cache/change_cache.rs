//! Persistent mtime cache deciding which notes need reprocessing.
//!
//! # Responsibility
//! - Map absolute note paths to the modification time last recorded.
//! - Persist the mapping as a flat JSON object after every update.
//!
//! # Invariants
//! - A note needs processing iff it has no entry or its current mtime is
//!   strictly greater than the recorded one.
//! - An unreadable or invalid store opens as an empty cache.
//! - `update` records the mtime observed at call time, never a stale one.

use crate::atomic_file::write_atomically;
use log::{info, warn};
use serde_json::Value;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

/// Default store location, relative to the working directory.
pub const DEFAULT_CACHE_FILE: &str = ".auto_tag_cache.json";

pub type CacheResult<T> = Result<T, CacheError>;

/// Error for cache updates and flushes.
#[derive(Debug)]
pub enum CacheError {
    /// The note's modification time could not be read.
    Stat { path: PathBuf, source: io::Error },
    /// The store could not be serialized.
    Encode(serde_json::Error),
    /// The store could not be written.
    Write { path: PathBuf, source: io::Error },
}

impl Display for CacheError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stat { path, source } => {
                write!(f, "failed to read mtime of `{}`: {source}", path.display())
            }
            Self::Encode(err) => write!(f, "failed to encode change cache: {err}"),
            Self::Write { path, source } => {
                write!(f, "failed to write change cache `{}`: {source}", path.display())
            }
        }
    }
}

impl Error for CacheError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Stat { source, .. } | Self::Write { source, .. } => Some(source),
            Self::Encode(err) => Some(err),
        }
    }
}

/// Explicitly owned change cache bound to one store file.
#[derive(Debug, Clone)]
pub struct ChangeCache {
    store_path: PathBuf,
    entries: BTreeMap<String, f64>,
}

impl ChangeCache {
    /// Opens the store at `store_path`. Missing or corrupt stores start empty.
    pub fn open(store_path: impl Into<PathBuf>) -> Self {
        let store_path = store_path.into();
        let entries = load_entries(&store_path);
        info!(
            "event=cache_open module=cache status=ok path={} entries={}",
            store_path.display(),
            entries.len()
        );
        Self {
            store_path,
            entries,
        }
    }

    pub fn store_path(&self) -> &Path {
        &self.store_path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Recorded mtime for `path`, if any.
    pub fn cached_mtime(&self, path: &Path) -> Option<f64> {
        self.entries.get(&cache_key(path)).copied()
    }

    /// Returns whether `path` is new or modified since its last update.
    ///
    /// A note whose mtime cannot be read is reported as needing processing,
    /// so the failure surfaces where the note is actually read.
    pub fn should_process(&self, path: &Path) -> bool {
        let Some(recorded) = self.cached_mtime(path) else {
            return true;
        };
        match modified_secs(path) {
            Ok(current) => current > recorded,
            Err(err) => {
                warn!(
                    "event=cache_stat module=cache status=error path={} reason={err}",
                    path.display()
                );
                true
            }
        }
    }

    /// Records the current mtime of `path` and flushes the store.
    ///
    /// Call only after the note on disk reflects the decision being recorded.
    pub fn update(&mut self, path: &Path) -> CacheResult<()> {
        let mtime = modified_secs(path).map_err(|source| CacheError::Stat {
            path: path.to_path_buf(),
            source,
        })?;
        self.entries.insert(cache_key(path), mtime);
        self.flush()
    }

    /// Drops the entry for `path`. Returns whether one existed.
    pub fn forget(&mut self, path: &Path) -> CacheResult<bool> {
        let removed = self.entries.remove(&cache_key(path)).is_some();
        if removed {
            self.flush()?;
        }
        Ok(removed)
    }

    /// Drops every entry, forcing a full rescan next time.
    pub fn clear(&mut self) -> CacheResult<()> {
        self.entries.clear();
        self.flush()
    }

    /// Writes the store atomically.
    pub fn flush(&self) -> CacheResult<()> {
        let encoded = serde_json::to_vec_pretty(&self.entries).map_err(CacheError::Encode)?;
        if let Some(parent) = self.store_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| CacheError::Write {
                    path: self.store_path.clone(),
                    source,
                })?;
            }
        }
        write_atomically(&self.store_path, &encoded).map_err(|source| CacheError::Write {
            path: self.store_path.clone(),
            source,
        })
    }
}

fn load_entries(store_path: &Path) -> BTreeMap<String, f64> {
    let raw = match fs::read_to_string(store_path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return BTreeMap::new(),
        Err(err) => {
            warn!(
                "event=cache_load module=cache status=degraded path={} reason={err}",
                store_path.display()
            );
            return BTreeMap::new();
        }
    };

    match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Object(map)) => map
            .into_iter()
            .filter_map(|(key, value)| value.as_f64().map(|mtime| (key, mtime)))
            .collect(),
        Ok(_) => {
            warn!(
                "event=cache_load module=cache status=degraded path={} reason=not_an_object",
                store_path.display()
            );
            BTreeMap::new()
        }
        Err(err) => {
            warn!(
                "event=cache_load module=cache status=degraded path={} reason={err}",
                store_path.display()
            );
            BTreeMap::new()
        }
    }
}

fn cache_key(path: &Path) -> String {
    std::path::absolute(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .to_string_lossy()
        .into_owned()
}

fn modified_secs(path: &Path) -> io::Result<f64> {
    let modified = fs::metadata(path)?.modified()?;
    let since_epoch = modified
        .duration_since(UNIX_EPOCH)
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
    Ok(since_epoch.as_secs_f64())
}

#[cfg(test)]
mod tests {
    use super::{cache_key, ChangeCache};
    use std::path::Path;

    #[test]
    fn cache_key_is_absolute() {
        let key = cache_key(Path::new("relative/note.md"));
        assert!(Path::new(&key).is_absolute());
    }

    #[test]
    fn non_numeric_entries_are_dropped_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("cache.json");
        std::fs::write(&store, r#"{"/a.md": 12.5, "/b.md": "oops"}"#).unwrap();

        let cache = ChangeCache::open(&store);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.cached_mtime(Path::new("/a.md")), Some(12.5));
    }

    #[test]
    fn non_object_store_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("cache.json");
        std::fs::write(&store, "[1, 2, 3]").unwrap();
        assert!(ChangeCache::open(&store).is_empty());
    }
}
