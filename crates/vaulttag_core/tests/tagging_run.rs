use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Mutex;
use vaulttag_core::model::note::NoteTags;
use vaulttag_core::model::tag::tag_set;
use vaulttag_core::{
    rank, AutoApprove, ChangeCache, Classifier, ClassifyError, ClassifyRequest, Confirm, Decision,
    PlannedChange, RunOptions, Suggestion, Tag, TagPolicy, TaggingError, TaggingService,
};

/// Answers by the `key:` line of the content; unknown keys get no suggestion.
struct ScriptedClassifier {
    answers: HashMap<String, Suggestion>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedClassifier {
    fn new(answers: &[(&str, &[&str], Option<&str>)]) -> Self {
        let answers = answers
            .iter()
            .map(|(key, topics, maturity)| {
                let suggestion = Suggestion {
                    topics: topics.iter().filter_map(|t| Tag::parse(t)).collect(),
                    maturity: maturity.and_then(Tag::parse),
                    maintenance: None,
                };
                (key.to_string(), suggestion)
            })
            .collect();
        Self {
            answers,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<String> {
        let mut calls = self.calls.lock().unwrap().clone();
        calls.sort();
        calls
    }
}

impl Classifier for ScriptedClassifier {
    fn classify(&self, request: &ClassifyRequest<'_>) -> Result<Suggestion, ClassifyError> {
        let key = request
            .content
            .lines()
            .find(|line| line.starts_with("key:"))
            .unwrap_or_default()
            .trim_start_matches("key:")
            .trim()
            .to_string();
        self.calls.lock().unwrap().push(key.clone());
        self.answers
            .get(&key)
            .cloned()
            .ok_or_else(|| ClassifyError::Unavailable(format!("no script for `{key}`")))
    }
}

/// Replays decisions in order and remembers what it was asked.
struct Scripted {
    decisions: Vec<Decision>,
    seen: Vec<String>,
}

impl Confirm for Scripted {
    fn confirm(&mut self, change: &PlannedChange) -> Decision {
        let name = change.path.file_name().unwrap().to_string_lossy().to_string();
        self.seen.push(name);
        if self.decisions.is_empty() {
            Decision::Ignore
        } else {
            self.decisions.remove(0)
        }
    }
}

fn note(root: &Path, name: &str, tags: &str, key: &str) {
    fs::write(
        root.join(name),
        format!("---\ntags: [{tags}]\n---\nkey: {key}\nbody text\n"),
    )
    .unwrap();
}

fn header_tags_of(path: &Path) -> vaulttag_core::TagSet {
    let (_, tags): (String, NoteTags) =
        vaulttag_core::note::extract::read_note_tags(path).unwrap();
    tags.header.to_set()
}

fn options(auto_approve: bool, force: bool) -> RunOptions {
    RunOptions {
        auto_approve,
        force,
        ..RunOptions::default()
    }
}

fn vault() -> (tempfile::TempDir, tempfile::TempDir) {
    let vault = tempfile::tempdir().unwrap();
    let state = tempfile::tempdir().unwrap();
    note(vault.path(), "a.md", "foo, bar", "a");
    note(vault.path(), "b.md", "keep", "b");
    note(vault.path(), "c.md", "x", "missing");
    (vault, state)
}

fn classifier() -> ScriptedClassifier {
    ScriptedClassifier::new(&[
        ("a", &["foo", "baz"], Some("sprout")),
        ("b", &["keep"], None),
    ])
}

#[test]
fn auto_run_applies_changes_and_records_cache() {
    let (vault, state) = vault();
    let classifier = classifier();
    let cache = ChangeCache::open(state.path().join("cache.json"));
    let mut service = TaggingService::new(&classifier, cache, TagPolicy::default(), options(true, false));

    let report = service
        .run(vault.path(), None, &mut AutoApprove)
        .unwrap();

    assert_eq!(report.targets, 3);
    assert_eq!(report.classified, 2);
    assert_eq!(report.applied, 1);
    assert_eq!(report.unchanged, 1);
    assert_eq!(report.no_suggestion, 1);
    assert_eq!(report.failed, 0);
    assert_eq!(
        header_tags_of(&vault.path().join("a.md")),
        tag_set(["foo", "baz", "sprout"])
    );

    let cache = service.cache();
    assert!(!cache.should_process(&vault.path().join("a.md")));
    assert!(!cache.should_process(&vault.path().join("b.md")));
    assert!(cache.should_process(&vault.path().join("c.md")));
}

#[test]
fn second_run_only_retries_unrecorded_notes_unless_forced() {
    let (vault, state) = vault();
    let classifier = classifier();
    let store = state.path().join("cache.json");

    let mut service = TaggingService::new(
        &classifier,
        ChangeCache::open(&store),
        TagPolicy::default(),
        options(true, false),
    );
    service.run(vault.path(), None, &mut AutoApprove).unwrap();

    let second = ScriptedClassifier::new(&[]);
    let mut service = TaggingService::new(
        &second,
        ChangeCache::open(&store),
        TagPolicy::default(),
        options(true, false),
    );
    let report = service.run(vault.path(), None, &mut AutoApprove).unwrap();
    assert_eq!(report.cached, 2);
    assert_eq!(second.calls(), vec!["missing"]);

    let forced = ScriptedClassifier::new(&[]);
    let mut service = TaggingService::new(
        &forced,
        ChangeCache::open(&store),
        TagPolicy::default(),
        options(true, true),
    );
    let report = service.run(vault.path(), None, &mut AutoApprove).unwrap();
    assert_eq!(report.cached, 0);
    assert_eq!(forced.calls(), vec!["a", "b", "missing"]);
}

#[test]
fn skip_records_and_ignore_does_not() {
    let vault = tempfile::tempdir().unwrap();
    let state = tempfile::tempdir().unwrap();
    note(vault.path(), "a.md", "old", "a");
    note(vault.path(), "b.md", "old", "b");
    let classifier = ScriptedClassifier::new(&[("a", &["new"], None), ("b", &["new"], None)]);
    let mut service = TaggingService::new(
        &classifier,
        ChangeCache::open(state.path().join("cache.json")),
        TagPolicy::default(),
        options(false, false),
    );

    let mut confirm = Scripted {
        decisions: vec![Decision::Skip, Decision::Ignore],
        seen: Vec::new(),
    };
    let report = service.run(vault.path(), None, &mut confirm).unwrap();

    assert_eq!(confirm.seen, vec!["a.md", "b.md"]);
    assert_eq!((report.skipped, report.ignored, report.applied), (1, 1, 0));
    assert_eq!(header_tags_of(&vault.path().join("a.md")), tag_set(["old"]));
    assert!(!service.cache().should_process(&vault.path().join("a.md")));
    assert!(service.cache().should_process(&vault.path().join("b.md")));
}

#[test]
fn quit_stops_before_the_next_note() {
    let vault = tempfile::tempdir().unwrap();
    let state = tempfile::tempdir().unwrap();
    note(vault.path(), "a.md", "old", "a");
    note(vault.path(), "b.md", "old", "b");
    let classifier = ScriptedClassifier::new(&[("a", &["new"], None), ("b", &["new"], None)]);
    let mut service = TaggingService::new(
        &classifier,
        ChangeCache::open(state.path().join("cache.json")),
        TagPolicy::default(),
        options(false, false),
    );

    let mut confirm = Scripted {
        decisions: vec![Decision::Apply, Decision::Quit],
        seen: Vec::new(),
    };
    let report = service.run(vault.path(), None, &mut confirm).unwrap();

    assert!(report.aborted);
    assert_eq!(report.applied, 1);
    assert_eq!(header_tags_of(&vault.path().join("a.md")), tag_set(["new"]));
    assert_eq!(header_tags_of(&vault.path().join("b.md")), tag_set(["old"]));
    assert!(service.cache().should_process(&vault.path().join("b.md")));
}

#[test]
fn write_failure_leaves_note_and_cache_untouched() {
    let vault = tempfile::tempdir().unwrap();
    let state = tempfile::tempdir().unwrap();
    let broken = "---\ntags: [old\nkey: a\n---\nbody\n";
    fs::write(vault.path().join("a.md"), broken).unwrap();
    let classifier = ScriptedClassifier::new(&[("a", &["new"], None)]);
    let mut service = TaggingService::new(
        &classifier,
        ChangeCache::open(state.path().join("cache.json")),
        TagPolicy::default(),
        options(true, false),
    );

    let report = service.run(vault.path(), None, &mut AutoApprove).unwrap();

    assert_eq!(report.failed, 1);
    assert_eq!(report.applied, 0);
    assert_eq!(fs::read_to_string(vault.path().join("a.md")).unwrap(), broken);
    assert!(service.cache().is_empty());
}

#[test]
fn folder_restricts_targets() {
    let vault = tempfile::tempdir().unwrap();
    let state = tempfile::tempdir().unwrap();
    fs::create_dir(vault.path().join("inbox")).unwrap();
    note(vault.path(), "top.md", "t", "top");
    note(&vault.path().join("inbox"), "n.md", "t", "inbox");
    let classifier = ScriptedClassifier::new(&[]);
    let mut service = TaggingService::new(
        &classifier,
        ChangeCache::open(state.path().join("cache.json")),
        TagPolicy::default(),
        options(true, false),
    );

    let report = service
        .run(vault.path(), Some(Path::new("inbox")), &mut AutoApprove)
        .unwrap();
    assert_eq!(report.targets, 1);
    assert_eq!(classifier.calls(), vec!["inbox"]);

    let error = service
        .run(vault.path(), Some(Path::new("absent")), &mut AutoApprove)
        .unwrap_err();
    assert!(matches!(error, TaggingError::FolderNotFound(_)));
}

#[test]
fn suggest_uses_ranked_vocabulary_and_reports_inline_retained() {
    let vault = tempfile::tempdir().unwrap();
    let state = tempfile::tempdir().unwrap();
    fs::write(
        vault.path().join("a.md"),
        "---\ntags: [topic]\n---\nkey: a\nshelved #archive\n",
    )
    .unwrap();
    let classifier = ScriptedClassifier::new(&[("a", &["topic"], Some("seed"))]);
    let service = TaggingService::new(
        &classifier,
        ChangeCache::open(state.path().join("cache.json")),
        TagPolicy::default(),
        options(false, false),
    );

    let scan = service.scan(vault.path()).unwrap();
    let vocabulary = rank(&scan, 1);
    assert_eq!(vocabulary, vec![Tag::parse("topic").unwrap()]);

    let change = service.suggest(&vault.path().join("a.md"), &vocabulary).unwrap();
    assert_eq!(change.reconciliation.added, tag_set(["seed"]));
    assert_eq!(change.reconciliation.removed, tag_set(["archive"]));
    assert_eq!(change.inline_retained(), tag_set(["archive"]));
}

/// Edits `target` while the operator looks at the first prompt.
struct EditingOperator<'a> {
    classifier: &'a ScriptedClassifier,
    target: std::path::PathBuf,
    calls_at_first_prompt: Option<usize>,
    decision: Decision,
}

impl Confirm for EditingOperator<'_> {
    fn confirm(&mut self, _change: &PlannedChange) -> Decision {
        if self.calls_at_first_prompt.is_none() {
            self.calls_at_first_prompt = Some(self.classifier.calls().len());
            fs::write(
                &self.target,
                "---\ntags: [old, user-added]\n---\nkey: a\nbody text\n",
            )
            .unwrap();
        }
        self.decision
    }
}

fn four_notes(root: &Path) {
    for (name, key) in [("a.md", "a"), ("b.md", "b"), ("c.md", "c"), ("d.md", "d")] {
        note(root, name, "old", key);
    }
}

fn four_answers() -> ScriptedClassifier {
    ScriptedClassifier::new(&[
        ("a", &["new"], None),
        ("b", &["new"], None),
        ("c", &["new"], None),
        ("d", &["new"], None),
    ])
}

#[test]
fn interactive_run_classifies_within_the_worker_window() {
    let vault = tempfile::tempdir().unwrap();
    let state = tempfile::tempdir().unwrap();
    four_notes(vault.path());
    let classifier = four_answers();
    let mut service = TaggingService::new(
        &classifier,
        ChangeCache::open(state.path().join("cache.json")),
        TagPolicy::default(),
        RunOptions {
            classify_workers: 1,
            ..options(false, false)
        },
    );

    let mut operator = EditingOperator {
        classifier: &classifier,
        target: vault.path().join("unrelated.txt"),
        calls_at_first_prompt: None,
        decision: Decision::Quit,
    };
    let report = service.run(vault.path(), None, &mut operator).unwrap();

    assert!(report.aborted);
    assert_eq!(operator.calls_at_first_prompt, Some(1));
    assert_eq!(classifier.calls(), vec!["a"]);
}

#[test]
fn note_edited_during_prompt_is_neither_written_nor_recorded() {
    let vault = tempfile::tempdir().unwrap();
    let state = tempfile::tempdir().unwrap();
    four_notes(vault.path());
    let classifier = four_answers();
    let mut service = TaggingService::new(
        &classifier,
        ChangeCache::open(state.path().join("cache.json")),
        TagPolicy::default(),
        RunOptions {
            classify_workers: 1,
            ..options(false, false)
        },
    );

    let edited = vault.path().join("a.md");
    let mut operator = EditingOperator {
        classifier: &classifier,
        target: edited.clone(),
        calls_at_first_prompt: None,
        decision: Decision::Apply,
    };
    let report = service.run(vault.path(), None, &mut operator).unwrap();

    assert_eq!(report.conflicted, 1);
    assert_eq!(report.applied, 3);
    assert_eq!(header_tags_of(&edited), tag_set(["old", "user-added"]));
    assert!(service.cache().should_process(&edited));
    assert_eq!(
        header_tags_of(&vault.path().join("d.md")),
        tag_set(["new"])
    );
}
