//! Directory combination function
//!
//! A directory's digest is a pure function of the `{name -> digest}` mappings
//! of its direct file children and its direct subdirectory children.

use crate::digest::algorithm::DigestAlgorithm;
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Name -> digest mapping for one directory level
pub type DigestMap = BTreeMap<String, String>;

/// Combines a directory's children into the directory's own digest.
///
/// Implementations must be deterministic and must not depend on the order in
/// which children were inserted.
pub trait Combiner: Send + Sync {
    fn combine(&self, files: &DigestMap, dirs: &DigestMap) -> String;
}

/// Default combiner: hashes a canonical JSON listing of the children.
///
/// The listing is `{"directories":[{"digest":..,"name":..}],"files":[..]}`
/// with entries sorted by name and compact separators.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListingCombiner {
    algorithm: DigestAlgorithm,
}

impl ListingCombiner {
    pub fn new(algorithm: DigestAlgorithm) -> Self {
        Self { algorithm }
    }

    /// Canonical serialized listing fed to the hash
    pub fn listing(files: &DigestMap, dirs: &DigestMap) -> String {
        json!({
            "directories": entries(dirs),
            "files": entries(files),
        })
        .to_string()
    }
}

fn entries(map: &DigestMap) -> Vec<Value> {
    map.iter()
        .map(|(name, digest)| json!({ "digest": digest, "name": name }))
        .collect()
}

impl Combiner for ListingCombiner {
    fn combine(&self, files: &DigestMap, dirs: &DigestMap) -> String {
        self.algorithm
            .hex_digest(Self::listing(files, dirs).as_bytes())
    }
}
