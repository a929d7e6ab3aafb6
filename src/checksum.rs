//! checksum(root): one call from a root path to its digest
//!
//! A [`Checksummer`] holds the injected collaborators (digest source,
//! directory lister, combiner) and the walk settings, runs the configured
//! strategy, and folds its stream with the digest compiler.

use crate::config::{CacheConfig, WalkConfig};
use crate::digest::{
    Combiner, DigestAlgorithm, LeafDigester, ListingCombiner, MemoizingSource, SharedSource,
};
use crate::error::ChecksumError;
use crate::tree::{checksum_recursive, DigestCompiler};
use crate::walk::listing::{FsLister, SharedLister};
use crate::walk::{
    default_parallelism, ErrorPolicy, Strategy, WalkContext, WalkCounters, WalkStats,
    DEFAULT_MAX_OPEN_FILES,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

/// Result of one checksum run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumOutcome {
    pub digest: String,
    pub stats: WalkStats,
}

/// Computes directory digests with a fixed strategy and configuration
pub struct Checksummer {
    strategy: Strategy,
    algorithm: DigestAlgorithm,
    parallelism: usize,
    max_open_files: usize,
    error_policy: ErrorPolicy,
    source: SharedSource,
    lister: SharedLister,
    combiner: Arc<dyn Combiner>,
    cache: Option<Arc<MemoizingSource<LeafDigester>>>,
    cancel: CancellationToken,
}

impl Checksummer {
    /// Leaf digester and listing combiner for `algorithm`, default limits
    pub fn new(strategy: Strategy, algorithm: DigestAlgorithm) -> Self {
        Self {
            strategy,
            algorithm,
            parallelism: default_parallelism(),
            max_open_files: DEFAULT_MAX_OPEN_FILES,
            error_policy: ErrorPolicy::default(),
            source: Arc::new(LeafDigester::new(algorithm)),
            lister: Arc::new(FsLister),
            combiner: Arc::new(ListingCombiner::new(algorithm)),
            cache: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Build from loaded configuration, opening the digest cache if enabled
    pub fn from_config(walk: &WalkConfig, cache: &CacheConfig) -> Result<Self, ChecksumError> {
        let checksummer = Self::new(walk.strategy, walk.algorithm)
            .with_parallelism(walk.parallelism)
            .with_max_open_files(walk.max_open_files)
            .with_error_policy(walk.error_policy);
        if !cache.enabled {
            return Ok(checksummer);
        }

        let leaf = LeafDigester::new(walk.algorithm);
        let store_path = cache
            .path
            .clone()
            .or_else(MemoizingSource::<LeafDigester>::default_store_path);
        let memo = match store_path {
            Some(path) => MemoizingSource::persistent(leaf, path, walk.algorithm.as_str())?,
            None => MemoizingSource::in_memory(leaf),
        };
        if cache.clear_on_start {
            memo.clear()?;
        }
        Ok(checksummer.with_cache(Arc::new(memo)))
    }

    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism.max(1);
        self
    }

    pub fn with_max_open_files(mut self, max_open_files: usize) -> Self {
        self.max_open_files = max_open_files.max(1);
        self
    }

    pub fn with_error_policy(mut self, error_policy: ErrorPolicy) -> Self {
        self.error_policy = error_policy;
        self
    }

    /// Replace the digest source (drops any cache set earlier)
    pub fn with_source(mut self, source: SharedSource) -> Self {
        self.source = source;
        self.cache = None;
        self
    }

    pub fn with_lister(mut self, lister: SharedLister) -> Self {
        self.lister = lister;
        self
    }

    pub fn with_combiner(mut self, combiner: Arc<dyn Combiner>) -> Self {
        self.combiner = combiner;
        self
    }

    /// Digest files through a memoizing source
    pub fn with_cache(mut self, cache: Arc<MemoizingSource<LeafDigester>>) -> Self {
        self.source = cache.clone() as SharedSource;
        self.cache = Some(cache);
        self
    }

    /// Cancelling this token aborts every in-flight and future checksum
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    pub fn caching_files(&self) -> bool {
        self.cache.is_some()
    }

    pub fn cache(&self) -> Option<&MemoizingSource<LeafDigester>> {
        self.cache.as_deref()
    }

    /// Digest of the tree under `root`
    pub fn checksum(&self, root: &Path) -> Result<String, ChecksumError> {
        self.checksum_with_stats(root).map(|outcome| outcome.digest)
    }

    /// Digest of the tree under `root` plus walk counters
    #[instrument(skip(self), fields(strategy = %self.strategy, root = %root.display()))]
    pub fn checksum_with_stats(&self, root: &Path) -> Result<ChecksumOutcome, ChecksumError> {
        if self.cancel.is_cancelled() {
            return Err(ChecksumError::Cancelled);
        }
        let started = Instant::now();
        info!(parallelism = self.parallelism, "Checksum started");

        let ctx = WalkContext::new(Arc::clone(&self.source))
            .with_lister(Arc::clone(&self.lister))
            .with_parallelism(self.parallelism)
            .with_max_open_files(self.max_open_files)
            .with_error_policy(self.error_policy)
            .with_cancellation(self.cancel.clone());
        let counters: Arc<WalkCounters> = Arc::clone(&ctx.counters);

        let digest = match self.strategy.walker(ctx.clone()) {
            Some(walker) => {
                let mut stream = walker.digest_walk(root);
                let mut compiler = DigestCompiler::new();
                for item in stream.by_ref() {
                    compiler.add_file(item?)?;
                }
                stream.finish()?;
                compiler.digest(self.combiner.as_ref())
            }
            None => checksum_recursive(&ctx, root, self.combiner.as_ref())?,
        };
        if self.cancel.is_cancelled() {
            return Err(ChecksumError::Cancelled);
        }
        if let Some(cache) = &self.cache {
            cache.flush()?;
        }

        let stats = counters.snapshot();
        info!(
            digest = %digest,
            dirs = stats.dirs_scanned,
            files = stats.files_digested,
            errors = stats.errors,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Checksum finished"
        );
        Ok(ChecksumOutcome { digest, stats })
    }
}

impl std::fmt::Debug for Checksummer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Checksummer")
            .field("strategy", &self.strategy)
            .field("algorithm", &self.algorithm)
            .field("parallelism", &self.parallelism)
            .field("max_open_files", &self.max_open_files)
            .field("error_policy", &self.error_policy)
            .field("caching_files", &self.caching_files())
            .finish()
    }
}
