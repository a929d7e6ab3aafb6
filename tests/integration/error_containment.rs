//! Integration tests for unreadable directories and files under both error
//! policies

use crate::integration::{
    checksum, checksummer, nested_tree, write_files, CountingSource, FailingLister,
};
use dirdigest::walk::ErrorPolicy;
use dirdigest::{ChecksumError, Strategy, WalkError};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

#[test]
fn test_unlistable_directory_digests_as_if_removed() {
    let tree = nested_tree();
    let lister = Arc::new(FailingLister {
        name: "mid1".to_string(),
    });

    let skipped: Vec<String> = Strategy::ALL
        .iter()
        .map(|&strategy| {
            let outcome = checksummer(strategy, 4)
                .with_lister(lister.clone())
                .checksum_with_stats(tree.path())
                .unwrap();
            assert_eq!(outcome.stats.errors, 4, "{}", strategy);
            outcome.digest
        })
        .collect();

    for i in 0..4 {
        fs::remove_dir_all(tree.path().join(format!("top{}/mid1", i))).unwrap();
    }
    let pruned = checksum(Strategy::Sequential, 1, tree.path());
    for (strategy, digest) in Strategy::ALL.iter().zip(&skipped) {
        assert_eq!(digest, &pruned, "{}", strategy);
    }
}

#[test]
fn test_unreadable_file_digests_as_if_removed() {
    let tree = nested_tree();
    let mut skipped = Vec::new();
    for strategy in Strategy::ALL {
        let source = CountingSource::new(Some("side.bin"));
        let outcome = checksummer(strategy, 4)
            .with_source(source)
            .checksum_with_stats(tree.path())
            .unwrap();
        assert_eq!(outcome.stats.errors, 4, "{}", strategy);
        assert_eq!(outcome.stats.files_digested, 13, "{}", strategy);
        skipped.push(outcome.digest);
    }

    for i in 0..4 {
        fs::remove_file(tree.path().join(format!("top{}/side.bin", i))).unwrap();
    }
    let pruned = checksum(Strategy::Sequential, 1, tree.path());
    assert!(skipped.iter().all(|d| d == &pruned));
}

#[test]
fn test_unlistable_root_digests_as_empty() {
    let tree = nested_tree();
    let root_name = tree
        .path()
        .file_name()
        .unwrap()
        .to_string_lossy()
        .into_owned();
    let lister = Arc::new(FailingLister { name: root_name });
    let empty = checksum(Strategy::Sequential, 1, tempfile::TempDir::new().unwrap().path());
    for strategy in Strategy::ALL {
        let digest = checksummer(strategy, 2)
            .with_lister(lister.clone())
            .checksum(tree.path())
            .unwrap();
        assert_eq!(digest, empty, "{}", strategy);
    }
}

#[test]
fn test_fail_policy_surfaces_scan_error() {
    let tree = nested_tree();
    let lister = Arc::new(FailingLister {
        name: "mid2".to_string(),
    });
    for strategy in Strategy::ALL {
        let result = checksummer(strategy, 4)
            .with_lister(lister.clone())
            .with_error_policy(ErrorPolicy::Fail)
            .checksum(tree.path());
        match result {
            Err(ChecksumError::Walk(WalkError::Scan { path, .. })) => {
                assert!(path.ends_with("mid2"), "{}: {:?}", strategy, path);
            }
            other => panic!("{}: expected scan error, got {:?}", strategy, other),
        }
    }
}

#[test]
fn test_fail_policy_surfaces_read_error() {
    let tree = nested_tree();
    for strategy in Strategy::ALL {
        let result = checksummer(strategy, 2)
            .with_source(CountingSource::new(Some("root.txt")))
            .with_error_policy(ErrorPolicy::Fail)
            .checksum(tree.path());
        assert!(
            matches!(result, Err(ChecksumError::Walk(WalkError::Read { .. }))),
            "{}: {:?}",
            strategy,
            result
        );
    }
}

#[cfg(unix)]
#[test]
fn test_non_utf8_names_are_reported_not_merged() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let plain = TempDir::new().unwrap();
    write_files(plain.path(), &[("a.txt", "x")]);
    let expected = checksum(Strategy::Sequential, 1, plain.path());

    let tree = TempDir::new().unwrap();
    write_files(tree.path(), &[("a.txt", "x")]);
    for raw in [b"\xff", b"\xfe"] {
        fs::write(tree.path().join(OsStr::from_bytes(raw)), "same").unwrap();
    }

    for strategy in Strategy::ALL {
        for parallelism in [1, 4] {
            let outcome = checksummer(strategy, parallelism)
                .checksum_with_stats(tree.path())
                .unwrap();
            assert_eq!(outcome.digest, expected, "{} at {}", strategy, parallelism);
            assert_eq!(outcome.stats.errors, 2, "{} at {}", strategy, parallelism);
            assert_eq!(outcome.stats.files_digested, 1, "{} at {}", strategy, parallelism);

            let failed = checksummer(strategy, parallelism)
                .with_error_policy(ErrorPolicy::Fail)
                .checksum(tree.path());
            assert!(
                matches!(failed, Err(ChecksumError::Walk(WalkError::InvalidName { .. }))),
                "{} at {}: {:?}",
                strategy,
                parallelism,
                failed
            );
        }
    }

    // U+FFFD is an ordinary name and takes part in the digest
    fs::remove_file(tree.path().join(OsStr::from_bytes(b"\xfe"))).unwrap();
    fs::rename(
        tree.path().join(OsStr::from_bytes(b"\xff")),
        tree.path().join("\u{FFFD}"),
    )
    .unwrap();
    assert_ne!(checksum(Strategy::Sequential, 1, tree.path()), expected);
    assert_ne!(checksum(Strategy::Recursive, 1, tree.path()), expected);
}
