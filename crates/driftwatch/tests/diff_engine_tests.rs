//! Scenario tests driving the diff engine through the public API.

use std::fs;
use std::path::Path;

use driftwatch::{DiffEngine, Pattern, RuleSet};
use tempfile::TempDir;

/// Build an engine, take the baseline scan, and run one throwaway diff.
///
/// The throwaway diff seeds content hashes for files written within the scan
/// second, so the diffs the tests assert on only report real changes.
fn settled_engine(root: &Path, rules: RuleSet) -> DiffEngine {
    let mut engine = DiffEngine::new(root.to_path_buf(), rules);
    engine.rebuild().unwrap();
    engine.diff(&[root.to_path_buf()], true).unwrap();
    engine
}

#[test]
fn reports_the_full_lifecycle_of_a_file() {
    let dir = TempDir::new().unwrap();
    let mut engine = settled_engine(dir.path(), RuleSet::new());
    let dirs = vec![dir.path().to_path_buf()];

    fs::write(dir.path().join("note.txt"), "first").unwrap();
    let changes = engine.diff(&dirs, true).unwrap();
    assert_eq!(changes.added, vec!["note.txt".to_string()]);
    assert!(changes.modified.is_empty());
    assert!(changes.removed.is_empty());

    fs::write(dir.path().join("note.txt"), "second").unwrap();
    let changes = engine.diff(&dirs, true).unwrap();
    assert_eq!(changes.modified, vec!["note.txt".to_string()]);
    assert!(changes.added.is_empty());

    fs::remove_file(dir.path().join("note.txt")).unwrap();
    let changes = engine.diff(&dirs, true).unwrap();
    assert_eq!(changes.removed, vec!["note.txt".to_string()]);

    let changes = engine.diff(&dirs, true).unwrap();
    assert!(changes.is_empty());
}

#[test]
fn removal_of_a_nested_tree_reports_every_file() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("proj/src")).unwrap();
    fs::write(dir.path().join("proj/readme.md"), "r").unwrap();
    fs::write(dir.path().join("proj/src/main.rs"), "m").unwrap();
    fs::write(dir.path().join("proj/src/util.rs"), "u").unwrap();

    let mut engine = settled_engine(dir.path(), RuleSet::new());

    fs::remove_dir_all(dir.path().join("proj")).unwrap();

    let mut changes = engine
        .diff(&[dir.path().to_path_buf()], false)
        .unwrap();
    changes.removed.sort();
    assert_eq!(
        changes.removed,
        vec![
            "proj/readme.md".to_string(),
            "proj/src/main.rs".to_string(),
            "proj/src/util.rs".to_string(),
        ]
    );
    assert!(changes.added.is_empty());
    assert!(changes.modified.is_empty());
    assert!(!engine.registry().contains(&dir.path().join("proj")));
}

#[test]
fn default_ignores_prune_whole_subtrees() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join(".git")).unwrap();
    fs::write(dir.path().join(".git/HEAD"), "ref").unwrap();
    fs::write(dir.path().join("tracked.rs"), "t").unwrap();

    let mut engine = settled_engine(dir.path(), RuleSet::with_default_ignores());
    assert!(!engine.registry().contains(&dir.path().join(".git")));

    fs::write(dir.path().join(".git/index"), "i").unwrap();
    fs::write(dir.path().join("added.rs"), "a").unwrap();

    let changes = engine
        .diff(&[dir.path().to_path_buf()], true)
        .unwrap();
    assert_eq!(changes.added, vec!["added.rs".to_string()]);
    assert!(changes.modified.is_empty());
}

#[test]
fn filters_scope_reports_and_ignores_prune_walks() {
    let dir = TempDir::new().unwrap();

    let mut rules = RuleSet::new();
    rules.add_ignore(Pattern::suffix("/skip"));
    rules.add_filter(Pattern::substring(".rb"));
    let mut engine = settled_engine(dir.path(), rules);

    fs::create_dir(dir.path().join("skip")).unwrap();
    fs::write(dir.path().join("skip/inner.rb"), "i").unwrap();
    fs::write(dir.path().join("keep.rb"), "k").unwrap();
    fs::write(dir.path().join("notes.txt"), "n").unwrap();

    let changes = engine
        .diff(&[dir.path().to_path_buf()], true)
        .unwrap();
    assert_eq!(changes.added, vec!["keep.rb".to_string()]);
    assert!(!engine.registry().contains(&dir.path().join("notes.txt")));
    assert!(!engine.registry().contains(&dir.path().join("skip")));
}

#[test]
fn diffs_only_touch_the_dirty_directories() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("one")).unwrap();
    fs::create_dir(dir.path().join("two")).unwrap();

    let mut engine = settled_engine(dir.path(), RuleSet::new());

    fs::write(dir.path().join("one/f.txt"), "f").unwrap();
    fs::write(dir.path().join("two/g.txt"), "g").unwrap();

    // Only "one" is flagged dirty; the change under "two" stays invisible.
    let changes = engine
        .diff(&[dir.path().join("one")], false)
        .unwrap();
    assert_eq!(changes.added, vec!["one/f.txt".to_string()]);

    let changes = engine
        .diff(&[dir.path().join("two")], false)
        .unwrap();
    assert_eq!(changes.added, vec!["two/g.txt".to_string()]);
}

#[test]
fn rebuild_establishes_a_fresh_baseline() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("old.txt"), "o").unwrap();

    let engine = settled_engine(dir.path(), RuleSet::new());
    drop(engine);

    // Changes made while no engine was watching are absorbed by the next
    // baseline scan rather than reported.
    fs::write(dir.path().join("while_down.txt"), "w").unwrap();
    fs::remove_file(dir.path().join("old.txt")).unwrap();

    let mut engine = settled_engine(dir.path(), RuleSet::new());
    assert!(engine.registry().contains(&dir.path().join("while_down.txt")));
    assert!(!engine.registry().contains(&dir.path().join("old.txt")));

    let changes = engine
        .diff(&[dir.path().to_path_buf()], true)
        .unwrap();
    assert!(changes.is_empty());
}
