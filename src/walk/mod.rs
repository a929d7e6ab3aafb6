//! Concurrent Walkers
//!
//! A walker turns a root directory into an unordered stream of
//! [`FileDigest`]s, one per reachable file. Strategies differ only in how
//! they schedule listing and digesting; every strategy emits each reachable
//! file exactly once and closes its stream only after all discovered work,
//! including work discovered during the walk, is finished.

pub mod async_queue;
pub mod cooperative;
pub mod fanout;
pub mod gate;
pub mod listing;
pub mod pool;
pub mod queue;
pub mod sequential;
pub mod threaded;

use crate::digest::SharedSource;
use crate::error::{ChecksumError, WalkError};
use crate::tree::path::relative_path;
use crate::types::FileDigest;
use gate::OpenFileGate;
use listing::{FsLister, SharedLister};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

pub use cooperative::CooperativeWalker;
pub use fanout::FanoutWalker;
pub use pool::PoolWalker;
pub use sequential::SequentialWalker;
pub use threaded::ThreadedWalker;

/// Default bound on simultaneously open files
pub const DEFAULT_MAX_OPEN_FILES: usize = 64;

/// One element of a walker's output stream
pub type WalkItem = Result<FileDigest, WalkError>;

/// `min(32, cpus + 4)`
pub fn default_parallelism() -> usize {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    (cpus + 4).min(32)
}

/// What to do when a directory cannot be listed or a file cannot be read
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Log and count the failure; the affected path is absent from the digest
    #[default]
    Skip,
    /// Deliver the failure through the stream and abort the checksum
    Fail,
}

impl fmt::Display for ErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorPolicy::Skip => write!(f, "skip"),
            ErrorPolicy::Fail => write!(f, "fail"),
        }
    }
}

impl FromStr for ErrorPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "skip" => Ok(ErrorPolicy::Skip),
            "fail" => Ok(ErrorPolicy::Fail),
            _ => Err(format!("Unknown error policy: {}", s)),
        }
    }
}

/// Scheduling strategy used to produce the digest stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Breadth-first on the calling thread
    Sequential,
    /// OS threads, a job stack for input and a separate monitor for output
    Threaded,
    /// OS threads sharing a job stack, results over a channel
    #[default]
    Pool,
    /// Fixed number of tasks on a single-threaded async runtime
    Cooperative,
    /// One task per directory and per file
    Fanout,
    /// Top-down recursion without a stream
    Recursive,
}

impl Strategy {
    pub const ALL: [Strategy; 6] = [
        Strategy::Sequential,
        Strategy::Threaded,
        Strategy::Pool,
        Strategy::Cooperative,
        Strategy::Fanout,
        Strategy::Recursive,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::Sequential => "sequential",
            Strategy::Threaded => "threaded",
            Strategy::Pool => "pool",
            Strategy::Cooperative => "cooperative",
            Strategy::Fanout => "fanout",
            Strategy::Recursive => "recursive",
        }
    }

    /// Build the stream walker for this strategy.
    ///
    /// `Recursive` computes digests directly and has no walker.
    pub fn walker(self, ctx: WalkContext) -> Option<Box<dyn DigestWalker>> {
        match self {
            Strategy::Sequential => Some(Box::new(SequentialWalker::new(ctx))),
            Strategy::Threaded => Some(Box::new(ThreadedWalker::new(ctx))),
            Strategy::Pool => Some(Box::new(PoolWalker::new(ctx))),
            Strategy::Cooperative => Some(Box::new(CooperativeWalker::new(ctx))),
            Strategy::Fanout => Some(Box::new(FanoutWalker::new(ctx))),
            Strategy::Recursive => None,
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.to_lowercase();
        Strategy::ALL
            .iter()
            .copied()
            .find(|strategy| strategy.as_str() == lowered)
            .ok_or_else(|| format!("Unknown strategy: {}", s))
    }
}

/// Produces the digest stream for a root directory
pub trait DigestWalker: Send + Sync {
    fn name(&self) -> &'static str;

    /// Start walking `root`. A root that is missing or not a directory
    /// yields an empty stream.
    fn digest_walk(&self, root: &Path) -> DigestStream;
}

/// Counters shared by all workers of one walk
#[derive(Debug, Default)]
pub struct WalkCounters {
    dirs_scanned: AtomicU64,
    files_digested: AtomicU64,
    errors: AtomicU64,
}

impl WalkCounters {
    pub fn record_dir(&self) {
        self.dirs_scanned.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_file(&self) {
        self.files_digested.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> WalkStats {
        WalkStats {
            dirs_scanned: self.dirs_scanned.load(Ordering::Relaxed),
            files_digested: self.files_digested.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`WalkCounters`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalkStats {
    pub dirs_scanned: u64,
    pub files_digested: u64,
    pub errors: u64,
}

/// Everything a worker needs: injected collaborators, limits, policy,
/// cancellation, and counters.
#[derive(Clone)]
pub struct WalkContext {
    pub source: SharedSource,
    pub lister: SharedLister,
    pub parallelism: usize,
    pub max_open_files: usize,
    pub error_policy: ErrorPolicy,
    pub cancel: CancellationToken,
    pub counters: Arc<WalkCounters>,
}

impl WalkContext {
    pub fn new(source: SharedSource) -> Self {
        Self {
            source,
            lister: Arc::new(FsLister),
            parallelism: default_parallelism(),
            max_open_files: DEFAULT_MAX_OPEN_FILES,
            error_policy: ErrorPolicy::default(),
            cancel: CancellationToken::new(),
            counters: Arc::new(WalkCounters::default()),
        }
    }

    pub fn with_lister(mut self, lister: SharedLister) -> Self {
        self.lister = lister;
        self
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

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn stats(&self) -> WalkStats {
        self.counters.snapshot()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Context for a single walk; cancelling the walk leaves the parent
    /// token untouched
    pub fn for_walk(&self) -> Self {
        let mut ctx = self.clone();
        ctx.cancel = self.cancel.child_token();
        ctx
    }

    /// List one directory through the injected lister
    pub fn list(&self, dir: &Path) -> Result<Vec<listing::DirEntry>, WalkError> {
        let entries = self
            .lister
            .list(dir)
            .map_err(|e| WalkError::scan(dir, e))?;
        self.counters.record_dir();
        debug!(dir = %dir.display(), entries = entries.len(), "Scanned directory");
        Ok(entries)
    }

    /// Digest one file through the injected source
    pub fn digest(&self, root: &Path, path: &Path) -> Result<FileDigest, WalkError> {
        let relpath = relative_path(root, path)?;
        let digest = self
            .source
            .digest_file(path)
            .map_err(|e| WalkError::read(path, e))?;
        self.counters.record_file();
        trace!(path = %relpath, digest = %digest, "Digested file");
        Ok(FileDigest::new(relpath, digest))
    }

    /// Apply the error policy: `None` when the failure is skipped,
    /// `Some(err)` when it has to be delivered downstream
    pub fn handle_error(&self, err: WalkError) -> Option<WalkError> {
        self.counters.record_error();
        match self.error_policy {
            ErrorPolicy::Skip => {
                warn!(path = %err.path().display(), error = %err, "Skipping unreadable path");
                None
            }
            ErrorPolicy::Fail => Some(err),
        }
    }
}

impl fmt::Debug for WalkContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalkContext")
            .field("parallelism", &self.parallelism)
            .field("max_open_files", &self.max_open_files)
            .field("error_policy", &self.error_policy)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

/// Scan one directory for the thread-based strategies.
///
/// Subdirectories are handed to `on_subdir` before any file is digested so
/// that idle workers can pick them up early. The listing and every file
/// digest each hold a gate permit.
pub(crate) fn scan_directory(
    ctx: &WalkContext,
    root: &Path,
    dir: &Path,
    gate: &OpenFileGate,
    mut on_subdir: impl FnMut(PathBuf),
    mut emit: impl FnMut(WalkItem),
) {
    let listing = {
        let _permit = gate.acquire();
        ctx.list(dir)
    };
    let entries = match listing {
        Ok(entries) => entries,
        Err(err) => {
            if let Some(err) = ctx.handle_error(err) {
                emit(Err(err));
            }
            return;
        }
    };

    let mut files = Vec::new();
    for entry in entries {
        if entry.is_dir {
            on_subdir(entry.path);
        } else {
            files.push(entry.path);
        }
    }

    for path in files {
        if ctx.is_cancelled() {
            return;
        }
        let result = {
            let _permit = gate.acquire();
            ctx.digest(root, &path)
        };
        match result {
            Ok(file) => emit(Ok(file)),
            Err(err) => {
                if let Some(err) = ctx.handle_error(err) {
                    emit(Err(err));
                }
            }
        }
    }
}

/// First failure recorded by any worker of a walk
#[derive(Debug, Default)]
pub(crate) struct WalkStatus {
    failure: Mutex<Option<String>>,
}

impl WalkStatus {
    pub(crate) fn record_failure(&self, message: impl Into<String>) {
        let mut failure = self.failure.lock();
        if failure.is_none() {
            *failure = Some(message.into());
        }
    }

    pub(crate) fn failure(&self) -> Option<String> {
        self.failure.lock().clone()
    }
}

/// Output of [`DigestWalker::digest_walk`]
///
/// Iterating yields items in completion order. Dropping the stream early
/// cancels the walk and joins its workers; [`DigestStream::finish`] does the
/// same and reports how the walk ended.
pub struct DigestStream {
    items: Box<dyn Iterator<Item = WalkItem> + Send>,
    cancel: CancellationToken,
    workers: Vec<JoinHandle<()>>,
    status: Arc<WalkStatus>,
}

impl DigestStream {
    pub(crate) fn new(
        items: impl Iterator<Item = WalkItem> + Send + 'static,
        cancel: CancellationToken,
        workers: Vec<JoinHandle<()>>,
        status: Arc<WalkStatus>,
    ) -> Self {
        Self {
            items: Box::new(items),
            cancel,
            workers,
            status,
        }
    }

    /// Stream that yields nothing
    pub fn empty(cancel: CancellationToken) -> Self {
        Self::new(
            std::iter::empty(),
            cancel,
            Vec::new(),
            Arc::new(WalkStatus::default()),
        )
    }

    /// Wait for the workers and report how the walk ended.
    ///
    /// Returns `Cancelled` if the walk's token fired before this call and
    /// `Runtime` if a worker panicked or could not be started.
    pub fn finish(mut self) -> Result<(), ChecksumError> {
        let cancelled = self.cancel.is_cancelled();
        self.join_workers();
        if let Some(message) = self.status.failure() {
            return Err(ChecksumError::Runtime(message));
        }
        if cancelled {
            return Err(ChecksumError::Cancelled);
        }
        Ok(())
    }

    fn join_workers(&mut self) {
        for handle in self.workers.drain(..) {
            let name = handle.thread().name().unwrap_or("walker").to_string();
            if handle.join().is_err() {
                self.status
                    .record_failure(format!("Worker thread {} panicked", name));
            }
        }
    }
}

impl Iterator for DigestStream {
    type Item = WalkItem;

    fn next(&mut self) -> Option<WalkItem> {
        self.items.next()
    }
}

impl Drop for DigestStream {
    fn drop(&mut self) {
        if !self.workers.is_empty() {
            self.cancel.cancel();
            self.join_workers();
        }
    }
}
