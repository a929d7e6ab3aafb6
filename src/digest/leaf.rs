//! Leaf digester: streams a file's bytes through an incremental hash

use crate::digest::algorithm::DigestAlgorithm;
use crate::digest::source::DigestSource;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use tracing::trace;

/// Block size used when streaming file content into the hasher
pub const DIGEST_BLOCK_SIZE: usize = 1 << 16;

/// Default digest source: reads the file in fixed-size blocks.
///
/// Holds no mutable state, so one instance can be shared by every worker.
#[derive(Debug, Clone, Copy)]
pub struct LeafDigester {
    algorithm: DigestAlgorithm,
    block_size: usize,
}

impl LeafDigester {
    pub fn new(algorithm: DigestAlgorithm) -> Self {
        Self {
            algorithm,
            block_size: DIGEST_BLOCK_SIZE,
        }
    }

    /// Override the read block size (mainly useful in tests)
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size.max(1);
        self
    }

    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    /// Digest everything readable from `reader`
    pub fn digest_reader<R: Read>(&self, mut reader: R) -> io::Result<String> {
        let mut hasher = self.algorithm.hasher();
        let mut block = vec![0u8; self.block_size];
        loop {
            let n = match reader.read(&mut block) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            hasher.update(&block[..n]);
        }
        Ok(hasher.finalize_hex())
    }
}

impl Default for LeafDigester {
    fn default() -> Self {
        Self::new(DigestAlgorithm::default())
    }
}

impl DigestSource for LeafDigester {
    fn digest_file(&self, path: &Path) -> io::Result<String> {
        let file = File::open(path)?;
        let digest = self.digest_reader(file)?;
        trace!(path = %path.display(), digest = %digest, "Digested file");
        Ok(digest)
    }
}
