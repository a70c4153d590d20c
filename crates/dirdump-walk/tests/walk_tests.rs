use dirdump_core::{IgnoreConfig, WalkConfig};
use dirdump_ignore::IgnoreMatcher;
use dirdump_walk::{
    CancellationToken, FileError, SkipReason, SkippedItem, WalkError, WalkOptions, walk,
};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

/// Normalize separators so assertions read the same on every platform.
fn slash(path: &str) -> String {
    path.replace('\\', "/")
}

fn find<'a>(items: &'a [SkippedItem], path: &str) -> Option<&'a SkippedItem> {
    items.iter().find(|item| slash(&item.path) == path)
}

fn collect_processed(
    root: &Path,
    matcher: &IgnoreMatcher,
    options: &WalkOptions,
) -> (BTreeSet<String>, dirdump_walk::WalkOutcome) {
    let seen = Mutex::new(BTreeSet::new());
    let outcome = walk(
        root,
        matcher,
        |rel, content| {
            if content.is_ok() {
                seen.lock().unwrap().insert(slash(rel));
            }
            Ok::<(), String>(())
        },
        options,
    );
    (seen.into_inner().unwrap(), outcome)
}

fn create_mixed_tree() -> TempDir {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write(root, ".gitignore", "*.log\nbuild/\n");
    write(root, "README.md", "readme");
    write(root, "src/main.rs", "fn main() {}");
    write(root, "src/lib.rs", "pub fn lib() {}");
    write(root, "src/util/mod.rs", "mod x;");
    write(root, "src/util/.gitignore", "generated.rs\n");
    write(root, "src/util/generated.rs", "// generated");
    write(root, "debug.log", "log");
    write(root, "build/out.o", "bin");
    write(root, ".git/HEAD", "ref: refs/heads/main");
    write(root, ".config/settings.toml", "a = 1");
    write(root, "docs/guide.MD", "# guide");
    write(root, "docs/big.txt", &"x".repeat(4096));
    temp
}

#[test]
fn test_scenario_hidden_and_custom_rules_with_extension_filter() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write(root, "a.go", "package main");
    write(root, ".hidden/file.go", "package hidden");
    write(root, "dist/out.bin", "\x7fELF");

    let config = IgnoreConfig::builder()
        .root(root)
        .custom_patterns(vec!["dist/".to_string()])
        .build()
        .unwrap();
    let matcher = IgnoreMatcher::new(&config).unwrap();
    let walk_config = WalkConfig::builder()
        .extensions(vec!["go".to_string()])
        .build()
        .unwrap();

    let (processed, outcome) = collect_processed(root, &matcher, &WalkOptions::new(walk_config));

    assert!(outcome.is_ok());
    assert_eq!(processed, BTreeSet::from(["a.go".to_string()]));

    let hidden = find(&outcome.skipped, ".hidden").unwrap();
    assert_eq!(hidden.reason, SkipReason::IgnoredHidden);
    assert!(hidden.is_dir);
    assert_eq!(hidden.reason.to_string(), "Ignored (Hidden Rule)");

    let dist = find(&outcome.skipped, "dist").unwrap();
    assert_eq!(dist.reason, SkipReason::IgnoredRule);
    assert!(dist.is_dir);
    assert_eq!(dist.reason.to_string(), "Ignored (Gitignore/Custom Rule)");

    // Pruned subtrees are not visited at all.
    assert!(find(&outcome.skipped, ".hidden/file.go").is_none());
    assert!(find(&outcome.skipped, "dist/out.bin").is_none());
}

#[test]
fn test_gitignore_hidden_and_vcs_rules() {
    let temp = create_mixed_tree();
    let matcher = IgnoreMatcher::new(&IgnoreConfig::new(temp.path())).unwrap();

    let (processed, outcome) = collect_processed(temp.path(), &matcher, &WalkOptions::default());

    let expected: BTreeSet<String> = [
        "README.md",
        "docs/big.txt",
        "docs/guide.MD",
        "src/lib.rs",
        "src/main.rs",
        "src/util/mod.rs",
    ]
    .into_iter()
    .map(String::from)
    .collect();
    assert_eq!(processed, expected);

    assert_eq!(find(&outcome.skipped, "debug.log").unwrap().reason, SkipReason::IgnoredRule);
    assert_eq!(find(&outcome.skipped, "build").unwrap().reason, SkipReason::IgnoredRule);
    assert_eq!(
        find(&outcome.skipped, "src/util/generated.rs").unwrap().reason,
        SkipReason::IgnoredRule
    );
    assert_eq!(find(&outcome.skipped, ".git").unwrap().reason, SkipReason::IgnoredHidden);
    assert_eq!(find(&outcome.skipped, ".gitignore").unwrap().reason, SkipReason::IgnoredHidden);
}

#[test]
fn test_disabled_matcher_includes_everything() {
    let temp = create_mixed_tree();
    let matcher = IgnoreMatcher::disabled(temp.path());

    let (processed, outcome) = collect_processed(temp.path(), &matcher, &WalkOptions::default());

    assert!(outcome.skipped.is_empty());
    assert!(processed.contains(".git/HEAD"));
    assert!(processed.contains("build/out.o"));
    assert_eq!(processed.len(), 13);
}

#[test]
fn test_sequential_and_concurrent_deliver_the_same_files() {
    let temp = create_mixed_tree();
    for i in 0..40 {
        write(temp.path(), &format!("gen/{}/file{i}.rs", i % 5), "x");
    }
    let matcher = IgnoreMatcher::new(&IgnoreConfig::new(temp.path())).unwrap();
    let base = WalkConfig::builder()
        .extensions(vec!["rs".to_string(), "md".to_string()])
        .max_file_size(1024u64)
        .build()
        .unwrap();

    let (sequential, _) = collect_processed(temp.path(), &matcher, &WalkOptions::new(base.clone()));
    assert_eq!(sequential.len(), 45);

    for workers in [1usize, 3, 8] {
        let mut config = base.clone();
        config.concurrent = true;
        config.workers = workers;
        let (concurrent, outcome) = collect_processed(temp.path(), &matcher, &WalkOptions::new(config));
        assert!(outcome.is_ok());
        assert_eq!(concurrent, sequential, "workers = {workers}");
    }
}

#[test]
fn test_size_limit_boundary() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "exact.txt", &"a".repeat(100));
    write(temp.path(), "over.txt", &"a".repeat(101));
    let matcher = IgnoreMatcher::new(&IgnoreConfig::new(temp.path())).unwrap();
    let config = WalkConfig::builder().max_file_size(100u64).build().unwrap();

    let errors = Mutex::new(Vec::new());
    let outcome = walk(
        temp.path(),
        &matcher,
        |rel, content| {
            if let Err(FileError::SizeLimitExceeded { size, limit }) = content {
                errors.lock().unwrap().push((rel.to_string(), size, limit));
            }
            Ok::<(), String>(())
        },
        &WalkOptions::new(config),
    );

    assert_eq!(
        errors.into_inner().unwrap(),
        vec![("over.txt".to_string(), 101, 100)]
    );
    assert_eq!(outcome.skipped.len(), 1);
    assert_eq!(outcome.skipped[0].reason, SkipReason::SizeLimit);
    assert_eq!(outcome.stats.processed_files, 1);
}

#[test]
fn test_extension_filter_is_case_insensitive() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "A.GO", "x");
    write(temp.path(), "b.go", "x");
    write(temp.path(), "c.rs", "x");
    write(temp.path(), "Makefile", "x");
    let matcher = IgnoreMatcher::new(&IgnoreConfig::new(temp.path())).unwrap();
    let config = WalkConfig::builder()
        .extensions(vec![".Go".to_string()])
        .build()
        .unwrap();

    let (processed, outcome) = collect_processed(temp.path(), &matcher, &WalkOptions::new(config));

    assert_eq!(
        processed,
        BTreeSet::from(["A.GO".to_string(), "b.go".to_string()])
    );
    let filtered: Vec<_> = outcome
        .skipped
        .iter()
        .filter(|item| item.reason == SkipReason::FilteredExtension)
        .map(|item| item.path.as_str())
        .collect();
    assert_eq!(filtered, vec!["Makefile", "c.rs"]);
}

#[test]
fn test_counters_account_for_every_file() {
    let temp = create_mixed_tree();
    let matcher = IgnoreMatcher::new(&IgnoreConfig::new(temp.path())).unwrap();
    let config = WalkConfig::builder()
        .extensions(vec!["rs".to_string(), "txt".to_string()])
        .max_file_size(1024u64)
        .build()
        .unwrap();

    for concurrent in [false, true] {
        let mut config = config.clone();
        config.concurrent = concurrent;
        let (_, outcome) = collect_processed(temp.path(), &matcher, &WalkOptions::new(config));
        let stats = &outcome.stats;

        assert_eq!(stats.processed_files + stats.skipped_files, stats.total_files);
        assert_eq!(stats.pending_files(), 0);
        assert_eq!(stats.processed_files, 3);

        let file_skips = outcome.skipped.iter().filter(|item| !item.is_dir).count() as u64;
        let dir_skips = outcome.skipped.iter().filter(|item| item.is_dir).count() as u64;
        assert_eq!(file_skips, stats.skipped_files);
        assert_eq!(dir_skips, stats.skipped_dirs);
    }
}

#[test]
fn test_handler_errors_do_not_stop_the_walk() {
    let temp = TempDir::new().unwrap();
    for i in 0..10 {
        write(temp.path(), &format!("f{i}.txt"), "x");
    }
    let matcher = IgnoreMatcher::new(&IgnoreConfig::new(temp.path())).unwrap();
    let calls = AtomicU64::new(0);

    let outcome = walk(
        temp.path(),
        &matcher,
        |_, _| {
            calls.fetch_add(1, Ordering::SeqCst);
            Err("handler failure")
        },
        &WalkOptions::default(),
    );

    assert!(outcome.is_ok());
    assert_eq!(calls.load(Ordering::SeqCst), 10);
    assert_eq!(outcome.stats.processed_files, 10);
}

fn create_large_tree(files: usize) -> TempDir {
    let temp = TempDir::new().unwrap();
    for i in 0..files {
        write(temp.path(), &format!("d{:02}/f{i:05}.txt", i % 20), "content");
    }
    temp
}

fn assert_cancels_midway(concurrent: bool) {
    const FILES: usize = 10_000;
    const CANCEL_AFTER: u64 = 100;
    const WORKERS: u64 = 4;

    let temp = create_large_tree(FILES);
    let matcher = IgnoreMatcher::new(&IgnoreConfig::new(temp.path())).unwrap();
    let token = CancellationToken::new();
    let config = WalkConfig::builder()
        .concurrent(concurrent)
        .workers(WORKERS as usize)
        .build()
        .unwrap();
    let options = WalkOptions::new(config).with_cancel(token.clone());
    let calls = AtomicU64::new(0);

    let outcome = walk(
        temp.path(),
        &matcher,
        |_, _| {
            if calls.fetch_add(1, Ordering::SeqCst) + 1 == CANCEL_AFTER {
                token.cancel();
            }
            Ok::<(), String>(())
        },
        &options,
    );

    assert!(matches!(outcome.error, Some(WalkError::Cancelled)));
    let processed = outcome.stats.processed_files;
    assert!(processed >= CANCEL_AFTER);
    // Queued files are abandoned; each other worker finishes at most the
    // file it already holds.
    let bound = if concurrent { CANCEL_AFTER + WORKERS - 1 } else { CANCEL_AFTER };
    assert!(processed <= bound, "processed {processed} files");
    assert!(outcome.stats.total_files < FILES as u64);
}

#[test]
fn test_cancellation_sequential() {
    assert_cancels_midway(false);
}

#[test]
fn test_cancellation_concurrent() {
    assert_cancels_midway(true);
}

#[test]
fn test_cancelled_before_start() {
    let temp = create_large_tree(50);
    let matcher = IgnoreMatcher::new(&IgnoreConfig::new(temp.path())).unwrap();
    let token = CancellationToken::new();
    token.cancel();

    let (processed, outcome) = collect_processed(
        temp.path(),
        &matcher,
        &WalkOptions::default().with_cancel(token),
    );

    assert!(processed.is_empty());
    assert!(outcome.error.unwrap().is_cancellation());
}

#[test]
fn test_deadline_returns_deadline_error() {
    let temp = create_large_tree(200);
    let matcher = IgnoreMatcher::new(&IgnoreConfig::new(temp.path())).unwrap();

    for concurrent in [false, true] {
        let config = WalkConfig::builder()
            .concurrent(concurrent)
            .workers(2usize)
            .timeout(Duration::from_millis(100))
            .build()
            .unwrap();

        let outcome = walk(
            temp.path(),
            &matcher,
            |_, _| {
                std::thread::sleep(Duration::from_millis(10));
                Ok::<(), String>(())
            },
            &WalkOptions::new(config),
        );

        assert!(matches!(
            outcome.error,
            Some(WalkError::DeadlineExceeded { timeout }) if timeout == Duration::from_millis(100)
        ));
        assert!(outcome.stats.processed_files < 200);
    }
}

#[test]
fn test_progress_callback_receives_snapshots() {
    let temp = create_large_tree(30);
    let matcher = IgnoreMatcher::new(&IgnoreConfig::new(temp.path())).unwrap();
    let snapshots = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&snapshots);
    let options = WalkOptions::default()
        .with_progress(move |stats| sink.lock().unwrap().push(stats))
        .with_progress_interval(Duration::from_millis(10));

    let outcome = walk(
        temp.path(),
        &matcher,
        |_, _| {
            std::thread::sleep(Duration::from_millis(5));
            Ok::<(), String>(())
        },
        &options,
    );
    assert!(outcome.is_ok());

    let snapshots = snapshots.lock().unwrap();
    assert!(!snapshots.is_empty());
    assert!(snapshots.iter().any(|s| s.total_files > 0));
    assert!(snapshots.iter().all(|s| s.processed_files <= 30));
}

#[test]
fn test_missing_root_is_fatal() {
    let temp = TempDir::new().unwrap();
    let matcher = IgnoreMatcher::disabled(temp.path());
    let outcome = walk(
        temp.path().join("missing"),
        &matcher,
        |_: &str, _: Result<Vec<u8>, FileError>| Ok::<(), String>(()),
        &WalkOptions::default(),
    );
    let (skipped, error) = outcome.into_parts();
    assert!(skipped.is_empty());
    assert!(matches!(error, Some(WalkError::RootNotFound { .. })));
}

#[cfg(unix)]
#[test]
fn test_unreadable_directory_is_pruned() {
    use std::os::unix::fs::PermissionsExt;

    let temp = TempDir::new().unwrap();
    write(temp.path(), "locked/secret.txt", "x");
    write(temp.path(), "open.txt", "x");
    let locked = temp.path().join("locked");
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // Privileged users can list the directory anyway.
    if fs::read_dir(&locked).is_ok() {
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let matcher = IgnoreMatcher::new(&IgnoreConfig::new(temp.path())).unwrap();
    let (processed, outcome) = collect_processed(temp.path(), &matcher, &WalkOptions::default());
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    assert!(outcome.is_ok());
    assert_eq!(processed, BTreeSet::from(["open.txt".to_string()]));
    let item = find(&outcome.skipped, "locked").unwrap();
    assert_eq!(item.reason, SkipReason::PermissionError);
}
