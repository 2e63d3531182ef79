//! Scan-suggest-apply orchestration.
//!
//! # Responsibility
//! - Wire index, change cache, classifier, reconciler and header writer.
//! - Expose the command surface: scan, rank, suggest, apply, run.
//!
//! # Invariants
//! - Classification runs with bounded parallelism; confirmation and writes
//!   happen one note at a time in scan order.
//! - Interactive runs classify at most `classify_workers` notes ahead of
//!   the note being confirmed.
//! - A note whose tags changed on disk after planning is left as is and
//!   not recorded.
//! - The cache is updated only after a note was written, skipped by the
//!   operator, or found to need no change. Failures leave it untouched.
//! - One note's failure never aborts the run.

use crate::cache::change_cache::{CacheError, ChangeCache};
use crate::classify::{Classifier, ClassifyError, ClassifyRequest};
use crate::index::tag_index::{self, IndexError, IndexResult, DEFAULT_INDEX_WORKERS};
use crate::model::note::NoteTags;
use crate::model::tag::{display_tags, Tag, TagSet};
use crate::note::extract::read_note_tags;
use crate::note::writer;
use crate::note::NoteError;
use crate::service::reconcile::{reconcile, Reconciliation, TagPolicy};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;

pub const DEFAULT_CLASSIFY_WORKERS: usize = 2;

/// Service error for tagging use-cases.
#[derive(Debug)]
pub enum TaggingError {
    Index(IndexError),
    /// Requested sub-folder does not exist under the vault root.
    FolderNotFound(PathBuf),
    Note(NoteError),
    Classify { path: PathBuf, source: ClassifyError },
    Cache(CacheError),
}

impl Display for TaggingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Index(err) => write!(f, "{err}"),
            Self::FolderNotFound(path) => write!(f, "folder does not exist: {}", path.display()),
            Self::Note(err) => write!(f, "{err}"),
            Self::Classify { path, source } => {
                write!(f, "no suggestion for `{}`: {source}", path.display())
            }
            Self::Cache(err) => write!(f, "{err}"),
        }
    }
}

impl Error for TaggingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Index(err) => Some(err),
            Self::FolderNotFound(_) => None,
            Self::Note(err) => Some(err),
            Self::Classify { source, .. } => Some(source),
            Self::Cache(err) => Some(err),
        }
    }
}

impl From<IndexError> for TaggingError {
    fn from(value: IndexError) -> Self {
        Self::Index(value)
    }
}

impl From<NoteError> for TaggingError {
    fn from(value: NoteError) -> Self {
        Self::Note(value)
    }
}

impl From<CacheError> for TaggingError {
    fn from(value: CacheError) -> Self {
        Self::Cache(value)
    }
}

/// Knobs for one tagging run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Ignore the change cache and process every target.
    pub force: bool,
    /// Apply every non-empty diff without asking.
    pub auto_approve: bool,
    pub vocabulary_size: usize,
    pub content_limit: usize,
    pub index_workers: usize,
    pub classify_workers: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            force: false,
            auto_approve: false,
            vocabulary_size: 50,
            content_limit: crate::classify::DEFAULT_CONTENT_LIMIT,
            index_workers: DEFAULT_INDEX_WORKERS,
            classify_workers: DEFAULT_CLASSIFY_WORKERS,
        }
    }
}

/// Operator choice for one proposed change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Write the new header and record the note in the cache.
    Apply,
    /// Leave the note as is but record it so it is not offered again.
    Skip,
    /// Leave the note as is and record nothing.
    Ignore,
    /// Stop before the next note.
    Quit,
}

/// Source of operator decisions.
pub trait Confirm {
    fn confirm(&mut self, change: &PlannedChange) -> Decision;
}

/// Approves every change.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoApprove;

impl Confirm for AutoApprove {
    fn confirm(&mut self, _change: &PlannedChange) -> Decision {
        Decision::Apply
    }
}

/// Reconciled suggestion for one note, not yet applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedChange {
    pub path: PathBuf,
    /// Tag surfaces as read when the suggestion was made.
    pub current: NoteTags,
    pub reconciliation: Reconciliation,
}

impl PlannedChange {
    /// Removed tags that stay present because they are inline-only.
    pub fn inline_retained(&self) -> TagSet {
        self.reconciliation.inline_retained(&self.current)
    }
}

/// Counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub targets: usize,
    /// Targets skipped because the cache says they are unchanged.
    pub cached: usize,
    pub classified: usize,
    pub no_suggestion: usize,
    pub unchanged: usize,
    pub applied: usize,
    pub skipped: usize,
    pub ignored: usize,
    pub failed: usize,
    /// Notes edited on disk between planning and the decision.
    pub conflicted: usize,
    pub aborted: bool,
}

/// Top `limit` tags of `scan`, most frequent first.
pub fn rank(scan: &IndexResult, limit: usize) -> Vec<Tag> {
    scan.top_tags(limit)
}

/// Tagging use-case service.
pub struct TaggingService<'c, C: Classifier + ?Sized> {
    classifier: &'c C,
    cache: ChangeCache,
    policy: TagPolicy,
    options: RunOptions,
}

impl<'c, C: Classifier + ?Sized> TaggingService<'c, C> {
    pub fn new(classifier: &'c C, cache: ChangeCache, policy: TagPolicy, options: RunOptions) -> Self {
        Self {
            classifier,
            cache,
            policy,
            options,
        }
    }

    pub fn cache(&self) -> &ChangeCache {
        &self.cache
    }

    pub fn into_cache(self) -> ChangeCache {
        self.cache
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Builds a fresh tag index over `root`.
    pub fn scan(&self, root: &Path) -> Result<IndexResult, TaggingError> {
        Ok(tag_index::build(root, self.options.index_workers)?)
    }

    /// Reads one note, asks the classifier, and reconciles the answer.
    pub fn suggest(&self, path: &Path, vocabulary: &[Tag]) -> Result<PlannedChange, TaggingError> {
        let (content, current) = read_note_tags(path)?;
        let effective = current.effective();
        let request =
            ClassifyRequest::new(&content, &effective, vocabulary, self.options.content_limit);
        let suggestion =
            self.classifier
                .classify(&request)
                .map_err(|source| TaggingError::Classify {
                    path: path.to_path_buf(),
                    source,
                })?;
        let reconciliation = reconcile(&effective, &suggestion, &self.policy);
        Ok(PlannedChange {
            path: path.to_path_buf(),
            current,
            reconciliation,
        })
    }

    /// Writes the planned header tags and records the note in the cache.
    pub fn apply(&mut self, change: &PlannedChange) -> Result<(), TaggingError> {
        writer::apply(&change.path, &change.reconciliation.final_tags)?;
        self.cache.update(&change.path)?;
        Ok(())
    }

    /// Records a note as handled without writing it.
    pub fn skip(&mut self, path: &Path) -> Result<(), TaggingError> {
        Ok(self.cache.update(path)?)
    }

    /// Full scan-suggest-apply loop over `root`, or over `folder` inside it.
    pub fn run(
        &mut self,
        root: &Path,
        folder: Option<&Path>,
        confirm: &mut dyn Confirm,
    ) -> Result<RunReport, TaggingError> {
        let scan = self.scan(root)?;
        let vocabulary = rank(&scan, self.options.vocabulary_size);
        let targets = select_targets(root, folder, &scan.files)?;

        let mut report = RunReport {
            targets: targets.len(),
            ..RunReport::default()
        };
        let stale: Vec<PathBuf> = targets
            .into_iter()
            .filter(|path| self.options.force || self.cache.should_process(path))
            .collect();
        report.cached = report.targets - stale.len();
        info!(
            "event=run_start module=tagging status=ok targets={} stale={} force={} auto={}",
            report.targets,
            stale.len(),
            self.options.force,
            self.options.auto_approve
        );

        let window = if self.options.auto_approve {
            stale.len()
        } else {
            self.options.classify_workers
        }
        .max(1);
        'batches: for batch in stale.chunks(window) {
            let planned = self.plan_all(batch, &vocabulary);
            for (path, outcome) in batch.iter().zip(planned) {
                if self
                    .settle(path, outcome, confirm, &mut report)
                    .is_break()
                {
                    report.aborted = true;
                    break 'batches;
                }
            }
        }

        info!(
            "event=run_done module=tagging status=ok applied={} skipped={} unchanged={} no_suggestion={} failed={} conflicted={} aborted={}",
            report.applied,
            report.skipped,
            report.unchanged,
            report.no_suggestion,
            report.failed,
            report.conflicted,
            report.aborted
        );
        Ok(report)
    }

    /// Confirms and applies one planned note. Breaks when the operator quits.
    fn settle(
        &mut self,
        path: &Path,
        outcome: Option<Result<PlannedChange, TaggingError>>,
        confirm: &mut dyn Confirm,
        report: &mut RunReport,
    ) -> ControlFlow<()> {
        let change = match outcome {
            Some(Ok(change)) => change,
            Some(Err(TaggingError::Classify { source, .. })) => {
                warn!(
                    "event=classify module=tagging status=no_suggestion path={} reason={source}",
                    path.display()
                );
                report.no_suggestion += 1;
                return ControlFlow::Continue(());
            }
            Some(Err(err)) => {
                warn!(
                    "event=suggest module=tagging status=error path={} reason={err}",
                    path.display()
                );
                report.failed += 1;
                return ControlFlow::Continue(());
            }
            None => {
                report.failed += 1;
                return ControlFlow::Continue(());
            }
        };
        report.classified += 1;

        if change.reconciliation.is_noop() {
            report.unchanged += 1;
            self.record(path);
            return ControlFlow::Continue(());
        }

        let decision = if self.options.auto_approve {
            Decision::Apply
        } else {
            confirm.confirm(&change)
        };
        match decision {
            Decision::Quit => return ControlFlow::Break(()),
            Decision::Ignore => {
                report.ignored += 1;
                return ControlFlow::Continue(());
            }
            Decision::Apply | Decision::Skip => {}
        }

        if !self.still_current(&change) {
            report.conflicted += 1;
            return ControlFlow::Continue(());
        }

        if decision == Decision::Skip {
            report.skipped += 1;
            self.record(path);
            return ControlFlow::Continue(());
        }

        match writer::apply(path, &change.reconciliation.final_tags) {
            Ok(()) => {
                info!(
                    "event=note_tagged module=tagging status=ok path={} added=[{}] removed=[{}]",
                    path.display(),
                    display_tags(&change.reconciliation.added),
                    display_tags(&change.reconciliation.removed)
                );
                report.applied += 1;
                self.record(path);
            }
            Err(err) => {
                warn!(
                    "event=note_write module=tagging status=error path={} reason={err}",
                    path.display()
                );
                report.failed += 1;
            }
        }
        ControlFlow::Continue(())
    }

    /// Whether the note's tag surfaces still match what the plan was made from.
    fn still_current(&self, change: &PlannedChange) -> bool {
        match read_note_tags(&change.path) {
            Ok((_, tags)) if tags == change.current => true,
            Ok(_) => {
                warn!(
                    "event=note_conflict module=tagging status=skipped path={} reason=tags_changed_since_plan",
                    change.path.display()
                );
                false
            }
            Err(err) => {
                warn!(
                    "event=note_conflict module=tagging status=skipped path={} reason={err}",
                    change.path.display()
                );
                false
            }
        }
    }

    /// Cache update after the on-disk state is final. Failures are logged;
    /// the note is simply offered again next run.
    fn record(&mut self, path: &Path) {
        if let Err(err) = self.cache.update(path) {
            warn!(
                "event=cache_update module=tagging status=error path={} reason={err}",
                path.display()
            );
        }
    }

    /// Suggests for every path on up to `classify_workers` threads.
    /// Results come back in input order.
    fn plan_all(
        &self,
        paths: &[PathBuf],
        vocabulary: &[Tag],
    ) -> Vec<Option<Result<PlannedChange, TaggingError>>> {
        let mut slots: Vec<Option<Result<PlannedChange, TaggingError>>> =
            paths.iter().map(|_| None).collect();
        if paths.is_empty() {
            return slots;
        }

        let workers = self.options.classify_workers.clamp(1, paths.len());
        let next = AtomicUsize::new(0);
        let (tx, rx) = mpsc::channel();

        thread::scope(|scope| {
            for _ in 0..workers {
                let tx = tx.clone();
                let next = &next;
                scope.spawn(move || loop {
                    let slot = next.fetch_add(1, Ordering::Relaxed);
                    let Some(path) = paths.get(slot) else {
                        break;
                    };
                    let outcome = self.suggest(path, vocabulary);
                    if tx.send((slot, outcome)).is_err() {
                        break;
                    }
                });
            }
            drop(tx);

            for (slot, outcome) in rx {
                slots[slot] = Some(outcome);
            }
        });

        slots
    }
}

fn select_targets(
    root: &Path,
    folder: Option<&Path>,
    files: &[PathBuf],
) -> Result<Vec<PathBuf>, TaggingError> {
    let Some(folder) = folder else {
        return Ok(files.to_vec());
    };
    let dir = root.join(folder);
    if !dir.is_dir() {
        return Err(TaggingError::FolderNotFound(dir));
    }
    Ok(files
        .iter()
        .filter(|path| path.starts_with(&dir))
        .cloned()
        .collect())
}
