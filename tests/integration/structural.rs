//! Integration tests for the digest compiler's structural checks

use dirdigest::digest::{DigestAlgorithm, ListingCombiner};
use dirdigest::tree::{compile_checksum, DigestCompiler, Entry};
use dirdigest::{FileDigest, StructuralError};

fn combiner() -> ListingCombiner {
    ListingCombiner::new(DigestAlgorithm::Md5)
}

#[test]
fn test_duplicate_file_is_rejected() {
    let result = compile_checksum(
        vec![
            FileDigest::new("d/f", "1"),
            FileDigest::new("g", "2"),
            FileDigest::new("d/f", "3"),
        ],
        &combiner(),
    );
    assert_eq!(result, Err(StructuralError::DuplicatePath("d/f".to_string())));
}

#[test]
fn test_file_then_directory_conflict() {
    let result = compile_checksum(
        vec![FileDigest::new("n", "1"), FileDigest::new("n/inner", "2")],
        &combiner(),
    );
    assert_eq!(result, Err(StructuralError::TypeConflict("n".to_string())));
}

#[test]
fn test_directory_then_file_conflict() {
    let result = compile_checksum(
        vec![FileDigest::new("n/inner", "2"), FileDigest::new("n", "1")],
        &combiner(),
    );
    assert_eq!(result, Err(StructuralError::TypeConflict("n".to_string())));
}

#[test]
fn test_order_does_not_matter() {
    let files = vec![
        FileDigest::new("a/b/c", "1"),
        FileDigest::new("a/d", "2"),
        FileDigest::new("e", "3"),
        FileDigest::new("a/b/f", "4"),
    ];
    let forward = compile_checksum(files.clone(), &combiner()).unwrap();
    let backward = compile_checksum(files.into_iter().rev(), &combiner()).unwrap();
    assert_eq!(forward, backward);
}

#[test]
fn test_intermediate_directories_created_on_demand() {
    let mut compiler = DigestCompiler::new();
    compiler.add("x/y/z/file", "1".to_string()).unwrap();
    assert_eq!(compiler.file_count(), 1);
    let Some(Entry::Directory(x)) = compiler.root().children.get("x") else {
        panic!("expected directory x");
    };
    assert!(matches!(x.children.get("y"), Some(Entry::Directory(_))));
}

#[test]
fn test_failed_insert_leaves_tree_unchanged() {
    let mut compiler = DigestCompiler::new();
    compiler.add("f", "1".to_string()).unwrap();
    let before = compiler.digest(&combiner());
    assert!(compiler.add("f", "2".to_string()).is_err());
    assert!(compiler.add("f/g", "3".to_string()).is_err());
    assert_eq!(compiler.file_count(), 1);
    assert_eq!(compiler.digest(&combiner()), before);
}

#[test]
fn test_invalid_paths_rejected() {
    for bad in ["", "/abs", "a//b", "a/../b", "./a"] {
        let mut compiler = DigestCompiler::new();
        assert!(
            matches!(
                compiler.add(bad, "1".to_string()),
                Err(StructuralError::InvalidPath(_))
            ),
            "{:?}",
            bad
        );
    }
}
