//! Corpus-wide tag frequency index.
//!
//! # Responsibility
//! - Enumerate note files under a root in deterministic order.
//! - Extract tags on a bounded worker pool and fold results at one point.
//! - Rank tags by note count, ties broken by first-seen scan order.
//!
//! # Invariants
//! - The index is rebuilt from scratch on every pass.
//! - One unreadable note never aborts the scan; it is logged and reported.
//! - Folding happens in scan order regardless of worker completion order.

use crate::model::note::NoteTags;
use crate::model::tag::{Tag, TagSet};
use crate::note::extract::read_note_tags;
use crate::note::NoteResult;
use log::{info, warn};
use std::collections::{BTreeSet, HashMap};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;
use walkdir::WalkDir;

/// File extension identifying note files.
pub const NOTE_EXTENSION: &str = "md";
pub const DEFAULT_INDEX_WORKERS: usize = 4;

/// Fatal indexing error: the root itself is unusable.
#[derive(Debug)]
pub enum IndexError {
    RootNotDirectory(PathBuf),
}

impl Display for IndexError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RootNotDirectory(path) => {
                write!(f, "index root is not a directory: {}", path.display())
            }
        }
    }
}

impl Error for IndexError {}

/// One note (or directory entry) skipped during a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexFailure {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone)]
struct TagEntry {
    files: BTreeSet<PathBuf>,
    count: usize,
    first_seen: usize,
}

/// Mapping tag -> notes and tag -> occurrence count.
#[derive(Debug, Clone, Default)]
pub struct TagIndex {
    entries: HashMap<Tag, TagEntry>,
}

impl TagIndex {
    /// Folds one note's tags into the index.
    pub fn record(&mut self, path: &Path, tags: &NoteTags) {
        for tag in tags.ordered() {
            let next_ordinal = self.entries.len();
            let entry = self.entries.entry(tag).or_insert_with(|| TagEntry {
                files: BTreeSet::new(),
                count: 0,
                first_seen: next_ordinal,
            });
            if entry.files.insert(path.to_path_buf()) {
                entry.count += 1;
            }
        }
    }

    pub fn unique_tags(&self) -> usize {
        self.entries.len()
    }

    pub fn count(&self, tag: &Tag) -> usize {
        self.entries.get(tag).map_or(0, |entry| entry.count)
    }

    /// Notes carrying `tag`.
    pub fn files_for(&self, tag: &Tag) -> Option<&BTreeSet<PathBuf>> {
        self.entries.get(tag).map(|entry| &entry.files)
    }

    pub fn tags(&self) -> TagSet {
        self.entries.keys().cloned().collect()
    }

    /// All tags with counts, most frequent first; ties keep scan order.
    pub fn ranked(&self) -> Vec<(Tag, usize)> {
        let mut ranked: Vec<(&Tag, &TagEntry)> = self.entries.iter().collect();
        ranked.sort_by(|(_, a), (_, b)| {
            b.count
                .cmp(&a.count)
                .then_with(|| a.first_seen.cmp(&b.first_seen))
        });
        ranked
            .into_iter()
            .map(|(tag, entry)| (tag.clone(), entry.count))
            .collect()
    }

    /// The `limit` most frequent tags.
    pub fn top_tags(&self, limit: usize) -> Vec<Tag> {
        self.ranked()
            .into_iter()
            .take(limit)
            .map(|(tag, _)| tag)
            .collect()
    }
}

/// Outcome of one indexing pass.
#[derive(Debug, Clone, Default)]
pub struct IndexResult {
    pub index: TagIndex,
    /// Every note file found, in scan order.
    pub files: Vec<PathBuf>,
    pub failures: Vec<IndexFailure>,
    /// Notes whose header was malformed (counted with zero header tags).
    pub malformed_headers: Vec<PathBuf>,
}

impl IndexResult {
    pub fn top_tags(&self, limit: usize) -> Vec<Tag> {
        self.index.top_tags(limit)
    }
}

/// Builds a fresh index over every note under `root`.
pub fn build(root: &Path, workers: usize) -> Result<IndexResult, IndexError> {
    let (files, mut failures) = list_note_files(root)?;
    let results = read_all(&files, workers);

    let mut index = TagIndex::default();
    let mut malformed_headers = Vec::new();
    for (path, result) in files.iter().zip(results) {
        match result {
            Some(Ok(tags)) => {
                if tags.is_header_malformed() {
                    malformed_headers.push(path.clone());
                }
                index.record(path, &tags);
            }
            Some(Err(err)) => {
                warn!(
                    "event=note_skipped module=index status=error path={} reason={err}",
                    path.display()
                );
                failures.push(IndexFailure {
                    path: path.clone(),
                    reason: err.to_string(),
                });
            }
            None => failures.push(IndexFailure {
                path: path.clone(),
                reason: "worker did not report a result".to_string(),
            }),
        }
    }

    info!(
        "event=index_built module=index status=ok root={} files={} tags={} failed={} malformed_headers={}",
        root.display(),
        files.len(),
        index.unique_tags(),
        failures.len(),
        malformed_headers.len()
    );

    Ok(IndexResult {
        index,
        files,
        failures,
        malformed_headers,
    })
}

/// Lists note files under `root`, sorted by name at every directory level.
///
/// Unreadable directory entries are reported, not fatal.
pub fn list_note_files(root: &Path) -> Result<(Vec<PathBuf>, Vec<IndexFailure>), IndexError> {
    if !root.is_dir() {
        return Err(IndexError::RootNotDirectory(root.to_path_buf()));
    }

    let mut files = Vec::new();
    let mut failures = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        match entry {
            Ok(entry) => {
                if entry.file_type().is_file() && is_note_file(entry.path()) {
                    files.push(entry.into_path());
                }
            }
            Err(err) => {
                let path = err
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| root.to_path_buf());
                warn!(
                    "event=walk_entry module=index status=error path={} reason={err}",
                    path.display()
                );
                failures.push(IndexFailure {
                    path,
                    reason: err.to_string(),
                });
            }
        }
    }
    Ok((files, failures))
}

fn is_note_file(path: &Path) -> bool {
    path.extension()
        .is_some_and(|extension| extension == NOTE_EXTENSION)
}

/// Reads and extracts every file on up to `workers` threads.
///
/// Workers send results over a channel; this thread is the only writer
/// of the result slots.
fn read_all(files: &[PathBuf], workers: usize) -> Vec<Option<NoteResult<NoteTags>>> {
    let mut slots: Vec<Option<NoteResult<NoteTags>>> = files.iter().map(|_| None).collect();
    if files.is_empty() {
        return slots;
    }

    let workers = workers.clamp(1, files.len());
    let next = AtomicUsize::new(0);
    let (tx, rx) = mpsc::channel();

    thread::scope(|scope| {
        for _ in 0..workers {
            let tx = tx.clone();
            let next = &next;
            scope.spawn(move || loop {
                let slot = next.fetch_add(1, Ordering::Relaxed);
                let Some(path) = files.get(slot) else {
                    break;
                };
                let result = read_note_tags(path).map(|(_, tags)| tags);
                if tx.send((slot, result)).is_err() {
                    break;
                }
            });
        }
        drop(tx);

        for (slot, result) in rx {
            slots[slot] = Some(result);
        }
    });

    slots
}
