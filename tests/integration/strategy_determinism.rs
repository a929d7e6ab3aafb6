//! Property tests: every strategy at every parallelism yields the same digest

use crate::integration::{checksum, nested_tree, write_files};
use dirdigest::digest::{DigestAlgorithm, ListingCombiner};
use dirdigest::tree::compile_checksum;
use dirdigest::{FileDigest, Strategy as WalkStrategy};
use proptest::prelude::*;
use proptest::test_runner::{Config, TestRunner};
use std::collections::BTreeMap;
use tempfile::TempDir;

/// Relative path built from small directory indexes and a file index.
/// Directory names (`d*`) and file names (`f*`) never collide.
fn relpath(dirs: &[u8], file: u8) -> String {
    let mut parts: Vec<String> = dirs.iter().map(|d| format!("d{}", d)).collect();
    parts.push(format!("f{}", file));
    parts.join("/")
}

fn tree_strategy() -> impl Strategy<Value = BTreeMap<String, Vec<u8>>> {
    prop::collection::vec(
        (
            prop::collection::vec(0u8..3, 0..4),
            0u8..4,
            prop::collection::vec(any::<u8>(), 0..64),
        ),
        0..24,
    )
    .prop_map(|entries| {
        entries
            .into_iter()
            .map(|(dirs, file, content)| (relpath(&dirs, file), content))
            .collect()
    })
}

#[test]
fn test_all_strategies_agree_property() {
    let mut runner = TestRunner::new(Config {
        cases: 16,
        ..Config::default()
    });

    runner
        .run(&tree_strategy(), |files| {
            let temp_dir = TempDir::new().unwrap();
            for (relpath, content) in &files {
                let path = temp_dir.path().join(relpath);
                std::fs::create_dir_all(path.parent().unwrap()).unwrap();
                std::fs::write(path, content).unwrap();
            }

            // Compiling the known file set directly gives the reference digest
            let expected = compile_checksum(
                files.iter().map(|(relpath, content)| {
                    FileDigest::new(relpath.clone(), DigestAlgorithm::Md5.hex_digest(content))
                }),
                &ListingCombiner::new(DigestAlgorithm::Md5),
            )
            .unwrap();

            for strategy in WalkStrategy::ALL {
                for parallelism in [1, 4, 64] {
                    let digest = checksum(strategy, parallelism, temp_dir.path());
                    prop_assert_eq!(&digest, &expected, "{} at {}", strategy, parallelism);
                }
            }
            Ok(())
        })
        .unwrap();
}

#[test]
fn test_nested_tree_stable_across_runs() {
    let tree = nested_tree();
    let reference = checksum(WalkStrategy::Sequential, 1, tree.path());
    for _ in 0..3 {
        for strategy in WalkStrategy::ALL {
            for parallelism in [1, 2, 4, 16] {
                assert_eq!(
                    checksum(strategy, parallelism, tree.path()),
                    reference,
                    "{} at {}",
                    strategy,
                    parallelism
                );
            }
        }
    }
}

#[test]
fn test_wide_directory() {
    let temp_dir = TempDir::new().unwrap();
    let files: Vec<(String, String)> = (0..300)
        .map(|i| (format!("wide/f{:03}", i), i.to_string()))
        .collect();
    let refs: Vec<(&str, &str)> = files.iter().map(|(p, c)| (p.as_str(), c.as_str())).collect();
    write_files(temp_dir.path(), &refs);

    let reference = checksum(WalkStrategy::Sequential, 1, temp_dir.path());
    for strategy in WalkStrategy::ALL {
        assert_eq!(checksum(strategy, 8, temp_dir.path()), reference, "{}", strategy);
    }
}
