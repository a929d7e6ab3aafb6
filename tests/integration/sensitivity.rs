//! Integration tests for what does and does not change a digest

use crate::integration::{checksum, example_tree, write_files};
use dirdigest::Strategy;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_same_tree_same_digest() {
    let tree = example_tree();
    let first = checksum(Strategy::Pool, 4, tree.path());
    let second = checksum(Strategy::Pool, 4, tree.path());
    assert_eq!(first, second);
}

#[test]
fn test_identical_trees_in_different_locations() {
    let a = example_tree();
    let b = example_tree();
    assert_eq!(
        checksum(Strategy::Threaded, 2, a.path()),
        checksum(Strategy::Fanout, 2, b.path())
    );
}

#[test]
fn test_content_change_changes_digest() {
    let tree = example_tree();
    let before = checksum(Strategy::Cooperative, 2, tree.path());
    fs::write(tree.path().join("d/b.txt"), "z").unwrap();
    assert_ne!(before, checksum(Strategy::Cooperative, 2, tree.path()));
}

#[test]
fn test_rename_changes_digest() {
    let tree = example_tree();
    let before = checksum(Strategy::Sequential, 1, tree.path());
    fs::rename(tree.path().join("a.txt"), tree.path().join("c.txt")).unwrap();
    assert_ne!(before, checksum(Strategy::Sequential, 1, tree.path()));
}

#[test]
fn test_moving_file_between_directories_changes_digest() {
    let a = TempDir::new().unwrap();
    write_files(a.path(), &[("x/f", "same"), ("y/g", "other")]);
    let b = TempDir::new().unwrap();
    write_files(b.path(), &[("y/f", "same"), ("x/g", "other")]);
    assert_ne!(
        checksum(Strategy::Pool, 2, a.path()),
        checksum(Strategy::Pool, 2, b.path())
    );
}

#[test]
fn test_file_versus_directory_of_same_name() {
    let a = TempDir::new().unwrap();
    write_files(a.path(), &[("n", "content")]);
    let b = TempDir::new().unwrap();
    write_files(b.path(), &[("n/inner", "content")]);
    assert_ne!(
        checksum(Strategy::Recursive, 1, a.path()),
        checksum(Strategy::Recursive, 1, b.path())
    );
}

#[test]
fn test_added_file_changes_digest() {
    let tree = example_tree();
    let before = checksum(Strategy::Fanout, 4, tree.path());
    write_files(tree.path(), &[("d/new.txt", "")]);
    assert_ne!(before, checksum(Strategy::Fanout, 4, tree.path()));
}

#[cfg(unix)]
#[test]
fn test_permissions_and_mtime_do_not_matter() {
    use std::os::unix::fs::PermissionsExt;

    let tree = example_tree();
    let before = checksum(Strategy::Pool, 2, tree.path());
    let path = tree.path().join("a.txt");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o600)).unwrap();
    let contents = fs::read(&path).unwrap();
    fs::write(&path, contents).unwrap();
    assert_eq!(before, checksum(Strategy::Pool, 2, tree.path()));
}

#[cfg(unix)]
#[test]
fn test_symlinks_are_followed() {
    let real = example_tree();
    let linked = TempDir::new().unwrap();
    write_files(linked.path(), &[("a.txt", "x")]);
    std::os::unix::fs::symlink(real.path().join("d"), linked.path().join("d")).unwrap();
    for strategy in Strategy::ALL {
        assert_eq!(
            checksum(strategy, 2, real.path()),
            checksum(strategy, 2, linked.path()),
            "{}",
            strategy
        );
    }
}
