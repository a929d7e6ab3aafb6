//! Integration tests for the digest of a small known tree

use crate::integration::{checksum, example_tree, md5, md5_combine};
use dirdigest::digest::{Combiner, DigestAlgorithm, DigestMap};
use dirdigest::{Checksummer, Strategy};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

fn expected_example_digest() -> String {
    let d = md5_combine(&[("b.txt", &md5("y"))], &[]);
    md5_combine(&[("a.txt", &md5("x"))], &[("d", &d)])
}

#[test]
fn test_example_tree_matches_hand_computed_digest() {
    let tree = example_tree();
    let expected = expected_example_digest();
    for strategy in Strategy::ALL {
        assert_eq!(checksum(strategy, 4, tree.path()), expected, "{}", strategy);
    }
}

#[test]
fn test_leaf_digests_are_md5_of_contents() {
    assert_eq!(md5("x"), "9dd4e461268c8034f5c8564e155c67a6");
    assert_eq!(md5("y"), "415290769594460e2e485922904f345d");
}

#[test]
fn test_empty_root_digest() {
    let temp_dir = TempDir::new().unwrap();
    let expected = md5_combine(&[], &[]);
    for strategy in Strategy::ALL {
        assert_eq!(checksum(strategy, 2, temp_dir.path()), expected, "{}", strategy);
    }
}

#[test]
fn test_missing_root_digests_as_empty() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("missing");
    let expected = md5_combine(&[], &[]);
    for strategy in Strategy::ALL {
        assert_eq!(checksum(strategy, 2, &missing), expected, "{}", strategy);
    }
}

#[test]
fn test_empty_subdirectories_are_omitted() {
    let tree = example_tree();
    let expected = checksum(Strategy::Sequential, 1, tree.path());
    fs::create_dir_all(tree.path().join("empty/nested/deeper")).unwrap();
    for strategy in Strategy::ALL {
        assert_eq!(checksum(strategy, 3, tree.path()), expected, "{}", strategy);
    }
}

/// Combiner that records the inputs it sees
struct NameListCombiner;

impl Combiner for NameListCombiner {
    fn combine(&self, files: &DigestMap, dirs: &DigestMap) -> String {
        let files: Vec<&str> = files.keys().map(String::as_str).collect();
        let dirs: Vec<String> = dirs.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        format!("[{}|{}]", files.join(","), dirs.join(","))
    }
}

#[test]
fn test_combiner_receives_child_names() {
    let tree = example_tree();
    for strategy in Strategy::ALL {
        let digest = Checksummer::new(strategy, DigestAlgorithm::Md5)
            .with_combiner(Arc::new(NameListCombiner))
            .checksum(tree.path())
            .unwrap();
        assert_eq!(digest, "[a.txt|d=[b.txt|]]", "{}", strategy);
    }
}
