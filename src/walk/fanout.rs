//! Unbounded fan-out walker
//!
//! Spawns one task per directory and one per file, with no cap on the number
//! of tasks. A `TaskTracker` stands in for a join group: the root task is
//! spawned, the tracker is closed, and `wait` resolves once every task, and
//! every task those tasks spawned, has finished. The number of open handles
//! (directory listings and file reads) is bounded by a semaphore.
//!
//! Kept for comparison; the pool and cooperative walkers schedule far less
//! work for the same tree.

use crate::walk::{DigestStream, DigestWalker, WalkContext, WalkItem, WalkStatus};
use crossbeam_channel::{unbounded, Sender};
use futures::future::{BoxFuture, FutureExt};
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::spawn_blocking;
use tokio_util::task::TaskTracker;
use tracing::{debug, error};

pub struct FanoutWalker {
    ctx: WalkContext,
}

impl FanoutWalker {
    pub fn new(ctx: WalkContext) -> Self {
        Self { ctx }
    }
}

impl DigestWalker for FanoutWalker {
    fn name(&self) -> &'static str {
        "fanout"
    }

    fn digest_walk(&self, root: &Path) -> DigestStream {
        let ctx = self.ctx.for_walk();
        let cancel = ctx.cancel.clone();
        if !ctx.lister.is_walkable(root) {
            return DigestStream::empty(cancel);
        }

        let status = Arc::new(WalkStatus::default());
        let (sender, receiver) = unbounded();
        let root = root.to_path_buf();

        let runtime_status = Arc::clone(&status);
        let spawned = thread::Builder::new()
            .name("dirdigest-fanout".to_string())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_multi_thread()
                    .worker_threads(ctx.parallelism)
                    .thread_name("dirdigest-fanout-worker")
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime,
                    Err(e) => {
                        error!(error = %e, "Failed to start async runtime");
                        runtime_status.record_failure(format!("Failed to start async runtime: {}", e));
                        return;
                    }
                };
                let fanout = Arc::new(Fanout {
                    open_files: Arc::new(Semaphore::new(ctx.max_open_files)),
                    tracker: TaskTracker::new(),
                    ctx,
                    root,
                    output: sender,
                    status: runtime_status,
                });
                runtime.block_on(fanout.run());
            });

        let workers = match spawned {
            Ok(handle) => vec![handle],
            Err(e) => {
                status.record_failure(format!("Failed to spawn runtime thread: {}", e));
                Vec::new()
            }
        };
        DigestStream::new(receiver.into_iter(), cancel, workers, status)
    }
}

struct Fanout {
    ctx: WalkContext,
    root: PathBuf,
    tracker: TaskTracker,
    open_files: Arc<Semaphore>,
    output: Sender<WalkItem>,
    status: Arc<WalkStatus>,
}

impl Fanout {
    async fn run(self: Arc<Self>) {
        debug!(root = %self.root.display(), "Fan-out walk started");
        let root = self.root.clone();
        self.spawn(Arc::clone(&self).scan(root));
        self.tracker.close();
        self.tracker.wait().await;
    }

    /// Track a task and record it if it panics
    fn spawn(&self, task: BoxFuture<'static, ()>) {
        let status = Arc::clone(&self.status);
        self.tracker.spawn(async move {
            if AssertUnwindSafe(task).catch_unwind().await.is_err() {
                status.record_failure("Fan-out task panicked");
            }
        });
    }

    async fn admit(&self) -> Option<OwnedSemaphorePermit> {
        tokio::select! {
            permit = Arc::clone(&self.open_files).acquire_owned() => permit.ok(),
            _ = self.ctx.cancel.cancelled() => None,
        }
    }

    fn emit(&self, item: WalkItem) {
        if self.output.send(item).is_err() {
            self.ctx.cancel.cancel();
        }
    }

    fn scan(self: Arc<Self>, dir: PathBuf) -> BoxFuture<'static, ()> {
        async move {
            let Some(permit) = self.admit().await else {
                return;
            };
            let listing = {
                let ctx = self.ctx.clone();
                spawn_blocking(move || {
                    let _permit = permit;
                    ctx.list(&dir)
                })
                .await
            };
            let entries = match listing {
                Ok(Ok(entries)) => entries,
                Ok(Err(err)) => {
                    if let Some(err) = self.ctx.handle_error(err) {
                        self.emit(Err(err));
                    }
                    return;
                }
                Err(e) => {
                    self.status
                        .record_failure(format!("Directory listing task failed: {}", e));
                    return;
                }
            };

            for entry in entries {
                if self.ctx.is_cancelled() {
                    return;
                }
                let task = if entry.is_dir {
                    Arc::clone(&self).scan(entry.path)
                } else {
                    Arc::clone(&self).digest(entry.path)
                };
                self.spawn(task);
            }
        }
        .boxed()
    }

    fn digest(self: Arc<Self>, path: PathBuf) -> BoxFuture<'static, ()> {
        async move {
            let Some(permit) = self.admit().await else {
                return;
            };
            let result = {
                let ctx = self.ctx.clone();
                let root = self.root.clone();
                spawn_blocking(move || {
                    let _permit = permit;
                    ctx.digest(&root, &path)
                })
                .await
            };
            match result {
                Ok(Ok(file)) => self.emit(Ok(file)),
                Ok(Err(err)) => {
                    if let Some(err) = self.ctx.handle_error(err) {
                        self.emit(Err(err));
                    }
                }
                Err(e) => self.status.record_failure(format!("Digest task failed: {}", e)),
            }
        }
        .boxed()
    }
}
