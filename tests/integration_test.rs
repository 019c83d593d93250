use std::fs;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use malscan_core::{FileFilter, Options, Scanner, Signature, SignatureSet};

/// Scan everything handed to it — the scenarios below aren't testing the
/// default PHP/HTML/JS filter, so they opt out of it explicitly.
fn allow_all_filter() -> FileFilter {
    FileFilter::new()
}

fn options_for(dir: &std::path::Path, signatures: SignatureSet) -> Options<io::Empty> {
    Options::new(signatures)
        .with_path(dir.to_string_lossy().into_owned())
        .with_workers(2)
}

#[test]
fn empty_directory_yields_zero_everything() {
    let dir = tempfile::tempdir().unwrap();

    let mut options = options_for(dir.path(), SignatureSet::new());
    options.file_filter = Some(allow_all_filter());

    let results = Arc::new(Mutex::new(Vec::new()));
    let results_cb = Arc::clone(&results);

    let metrics = Scanner::new(options)
        .scan(
            move |result| results_cb.lock().unwrap().push(result),
            None,
            None,
        )
        .unwrap();

    assert_eq!(metrics.total_count(), 0);
    assert_eq!(metrics.total_bytes(), 0);
    assert!(results.lock().unwrap().is_empty());
}

#[test]
fn single_matching_file_is_reported_with_its_excerpt() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.php"), "<?php eval($_GET[x]);").unwrap();

    let mut signatures = SignatureSet::new();
    signatures.add(Signature::new(1, r"eval\(\$_GET"));

    let mut options = options_for(dir.path(), signatures);
    options.file_filter = Some(allow_all_filter());

    let results = Arc::new(Mutex::new(Vec::new()));
    let results_cb = Arc::clone(&results);

    let metrics = Scanner::new(options)
        .scan(
            move |result| results_cb.lock().unwrap().push(result),
            None,
            None,
        )
        .unwrap();

    assert_eq!(metrics.total_count(), 1);
    let results = results.lock().unwrap();
    assert_eq!(results.len(), 1);
    let result = &results[0];
    assert_eq!(result.read_length, 21);
    assert_eq!(result.matches.get(&1).map(String::as_str), Some("eval($_GET"));
}

#[test]
fn filter_excludes_files_with_no_include_rule() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.php"), "<?php echo 1;").unwrap();
    fs::write(dir.path().join("b.png"), [0x89, 0x50, 0x4e, 0x47]).unwrap();

    // Default config: no include overrides, no images pattern -> PHP/HTML/JS only.
    let options = options_for(dir.path(), SignatureSet::new());

    let results = Arc::new(Mutex::new(Vec::new()));
    let results_cb = Arc::clone(&results);

    let metrics = Scanner::new(options)
        .scan(
            move |result| results_cb.lock().unwrap().push(result),
            None,
            None,
        )
        .unwrap();

    assert_eq!(metrics.total_count(), 1);
    let results = results.lock().unwrap();
    assert_eq!(results[0].path.file_name().unwrap(), "a.php");
}

#[cfg(unix)]
#[test]
fn unreadable_file_reports_an_exception_but_scan_completes() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let blocked = dir.path().join("blocked.php");
    fs::write(&blocked, "<?php echo 1;").unwrap();
    fs::set_permissions(&blocked, fs::Permissions::from_mode(0o000)).unwrap();

    if fs::File::open(&blocked).is_ok() {
        // Running with elevated privileges that bypass file permissions
        // (e.g. root) -- this scenario can't be exercised here.
        return;
    }

    fs::write(dir.path().join("ok.php"), "<?php echo 1;").unwrap();

    let options = options_for(dir.path(), SignatureSet::new());

    let results = Arc::new(Mutex::new(Vec::new()));
    let results_cb = Arc::clone(&results);

    let metrics = Scanner::new(options)
        .scan(
            move |result| results_cb.lock().unwrap().push(result),
            None,
            None,
        )
        .unwrap();

    assert_eq!(metrics.total_count(), 1);
    assert_eq!(results.lock().unwrap().len(), 1);

    let _ = fs::set_permissions(&blocked, fs::Permissions::from_mode(0o644));
}

#[test]
fn pattern_timeout_is_recorded_and_reported_in_the_finished_summary() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.php"), "a".repeat(8192)).unwrap();

    let mut signatures = SignatureSet::new();
    signatures.add(Signature::new(1, "a+").timeout(Duration::from_nanos(1)));

    let mut options = options_for(dir.path(), signatures);
    options.file_filter = Some(allow_all_filter());

    let results = Arc::new(Mutex::new(Vec::new()));
    let results_cb = Arc::clone(&results);

    let metrics = Scanner::new(options)
        .scan(
            move |result| results_cb.lock().unwrap().push(result),
            None,
            None,
        )
        .unwrap();

    assert_eq!(metrics.total_timeouts(), 1);
    let results = results.lock().unwrap();
    assert!(results[0].timeouts.contains(&1));
    assert!(results[0].matches.is_empty());
}

#[test]
fn two_roots_four_workers_splits_work_across_every_slot() {
    let root_a = tempfile::tempdir().unwrap();
    let root_b = tempfile::tempdir().unwrap();

    for i in 0..100 {
        fs::write(root_a.path().join(format!("f{i}.php")), "x").unwrap();
    }
    for i in 0..100 {
        fs::write(root_b.path().join(format!("f{i}.php")), "x").unwrap();
    }

    let options: Options<io::Empty> = Options::new(SignatureSet::new())
        .with_path(root_a.path().to_string_lossy().into_owned())
        .with_path(root_b.path().to_string_lossy().into_owned())
        .with_workers(4);

    let metrics = Scanner::new(options).scan(|_| {}, None, None).unwrap();

    assert_eq!(metrics.total_count(), 200);
    assert_eq!(metrics.counts.len(), 4);
    assert_eq!(metrics.counts.iter().sum::<u64>(), 200);
    assert!(metrics.counts.iter().all(|&c| c <= 200));
}

#[test]
fn progress_callback_receives_a_metrics_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    for i in 0..50 {
        fs::write(dir.path().join(format!("f{i}.php")), "x".repeat(4096)).unwrap();
    }

    let options = options_for(dir.path(), SignatureSet::new());

    let ticks = Arc::new(Mutex::new(0u32));
    let ticks_cb = Arc::clone(&ticks);

    let metrics = Scanner::new(options)
        .scan(
            |_| {},
            Some(Box::new(move |update| {
                *ticks_cb.lock().unwrap() += 1;
                assert_eq!(update.metrics.counts.len(), 2);
            })),
            None,
        )
        .unwrap();

    assert_eq!(metrics.total_count(), 50);
}

#[test]
fn nonexistent_root_path_fails_with_locator_fatal_and_the_right_path() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("does-not-exist");

    let options: Options<io::Empty> = Options::new(SignatureSet::new())
        .with_path(missing.to_string_lossy().into_owned())
        .with_workers(2);

    let err = Scanner::new(options).scan(|_| {}, None, None).unwrap_err();

    match err {
        malscan_core::ScanError::LocatorFatal { path, .. } => assert_eq!(path, missing),
        other => panic!("expected LocatorFatal, got {other:?}"),
    }
}

#[test]
fn scanning_with_no_paths_configured_fails_with_configuration_error() {
    let options: Options<io::Empty> = Options::new(SignatureSet::new());
    let err = Scanner::new(options).scan(|_| {}, None, None).unwrap_err();
    assert!(matches!(err, malscan_core::ScanError::Configuration(_)));
}

#[test]
fn custom_finished_callback_observes_final_metrics_and_timer() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.php"), "x").unwrap();

    let options = options_for(dir.path(), SignatureSet::new());

    let observed = Arc::new(Mutex::new(None));
    let observed_cb = Arc::clone(&observed);

    Scanner::new(options)
        .scan(
            |_| {},
            None,
            Some(Box::new(move |metrics, timer| {
                *observed_cb.lock().unwrap() = Some((metrics.total_count(), timer.elapsed()));
            })),
        )
        .unwrap();

    let observed = observed.lock().unwrap();
    let (count, _elapsed) = observed.expect("finished callback should have run");
    assert_eq!(count, 1);
}
