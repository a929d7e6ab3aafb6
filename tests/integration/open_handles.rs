//! Integration tests for the bound on simultaneously open directories and
//! files, which is configured separately from the worker count

use crate::integration::{checksummer, write_files, HandleTracker};
use dirdigest::Strategy;
use std::time::Duration;
use tempfile::TempDir;

/// 16 sibling directories with two files each
fn wide_tree() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let files: Vec<(String, String)> = (0..16)
        .flat_map(|d| (0..2).map(move |f| (format!("d{}/f{}", d, f), format!("{}-{}", d, f))))
        .collect();
    let refs: Vec<(&str, &str)> = files.iter().map(|(p, c)| (p.as_str(), c.as_str())).collect();
    write_files(temp_dir.path(), &refs);
    temp_dir
}

#[test]
fn test_listings_and_reads_share_the_open_file_bound() {
    let tree = wide_tree();
    for strategy in Strategy::ALL {
        for max_open_files in [1, 3] {
            let tracker = HandleTracker::new(Duration::from_millis(2));
            let outcome = checksummer(strategy, 16)
                .with_max_open_files(max_open_files)
                .with_lister(tracker.clone())
                .with_source(tracker.clone())
                .checksum_with_stats(tree.path())
                .unwrap();
            assert_eq!(outcome.stats.files_digested, 32, "{}", strategy);
            assert_eq!(outcome.stats.dirs_scanned, 17, "{}", strategy);
            assert!(
                tracker.peak() <= max_open_files,
                "{} with max_open_files={}: peak {}",
                strategy,
                max_open_files,
                tracker.peak()
            );
        }
    }
}

#[test]
fn test_single_permit_still_finishes_deep_walk() {
    let temp_dir = TempDir::new().unwrap();
    write_files(
        temp_dir.path(),
        &[("a/b/c/d/e", "1"), ("a/b/x", "2"), ("a/y", "3"), ("z", "4")],
    );
    for strategy in Strategy::ALL {
        let tracker = HandleTracker::new(Duration::from_micros(200));
        let outcome = checksummer(strategy, 8)
            .with_max_open_files(1)
            .with_lister(tracker.clone())
            .with_source(tracker.clone())
            .checksum_with_stats(temp_dir.path())
            .unwrap();
        assert_eq!(outcome.stats.files_digested, 4, "{}", strategy);
        assert_eq!(tracker.peak(), 1, "{}", strategy);
    }
}
