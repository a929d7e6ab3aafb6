//! Bounded-concurrency walker on a single-threaded async runtime
//!
//! `parallelism` worker tasks pull directories from an [`AsyncJobStack`].
//! Listing and file reads run through `spawn_blocking`, so the only
//! suspension points are waiting for work, listing, and reading. Listings
//! and file reads are additionally gated by a semaphore of `max_open_files`
//! permits.
//! Workers send results to a single collector task over a channel; the
//! collector forwards them to the stream and the walk ends once the
//! `JoinSet` holding the workers is empty.

use crate::walk::async_queue::AsyncJobStack;
use crate::walk::{DigestStream, DigestWalker, WalkContext, WalkItem, WalkStatus};
use crossbeam_channel::{unbounded, Sender};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::{spawn_blocking, JoinSet};
use tracing::{debug, error};

pub struct CooperativeWalker {
    ctx: WalkContext,
}

impl CooperativeWalker {
    pub fn new(ctx: WalkContext) -> Self {
        Self { ctx }
    }
}

impl DigestWalker for CooperativeWalker {
    fn name(&self) -> &'static str {
        "cooperative"
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
            .name("dirdigest-cooperative".to_string())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
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
                runtime.block_on(run_walk(ctx, root, sender, runtime_status));
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

async fn run_walk(
    ctx: WalkContext,
    root: PathBuf,
    output: Sender<WalkItem>,
    status: Arc<WalkStatus>,
) {
    let stack = Arc::new(AsyncJobStack::new([root.clone()]).with_cancellation(ctx.cancel.clone()));
    let open_files = Arc::new(Semaphore::new(ctx.max_open_files));
    let (tx, mut rx) = unbounded_channel();

    let mut workers = JoinSet::new();
    for _ in 0..ctx.parallelism {
        workers.spawn(worker(
            ctx.clone(),
            root.clone(),
            Arc::clone(&stack),
            Arc::clone(&open_files),
            tx.clone(),
            Arc::clone(&status),
        ));
    }
    drop(tx);
    debug!(workers = ctx.parallelism, root = %root.display(), "Cooperative walk started");

    let collect = async {
        while let Some(item) = rx.recv().await {
            if output.send(item).is_err() {
                ctx.cancel.cancel();
                break;
            }
        }
    };
    let join = async {
        while let Some(result) = workers.join_next().await {
            if let Err(e) = result {
                if e.is_panic() {
                    status.record_failure(format!("Walker task panicked: {}", e));
                }
            }
        }
    };
    tokio::join!(collect, join);
}

async fn worker(
    ctx: WalkContext,
    root: PathBuf,
    stack: Arc<AsyncJobStack<PathBuf>>,
    open_files: Arc<Semaphore>,
    tx: UnboundedSender<WalkItem>,
    status: Arc<WalkStatus>,
) {
    while let Some(job) = stack.next_job().await {
        let Some(permit) = admit(&ctx, &open_files).await else {
            break;
        };
        let dir = job.clone();
        let listing = {
            let ctx = ctx.clone();
            spawn_blocking(move || {
                let _permit = permit;
                ctx.list(&dir)
            })
            .await
        };
        let entries = match listing {
            Ok(Ok(entries)) => entries,
            Ok(Err(err)) => {
                if let Some(err) = ctx.handle_error(err) {
                    let _ = tx.send(Err(err));
                }
                continue;
            }
            Err(e) => {
                status.record_failure(format!("Directory listing task failed: {}", e));
                continue;
            }
        };

        let mut files = Vec::new();
        for entry in entries {
            if entry.is_dir {
                stack.put(entry.path);
            } else {
                files.push(entry.path);
            }
        }

        for path in files {
            let Some(permit) = admit(&ctx, &open_files).await else {
                break;
            };

            let result = {
                let ctx = ctx.clone();
                let root = root.clone();
                spawn_blocking(move || {
                    let _permit = permit;
                    ctx.digest(&root, &path)
                })
                .await
            };
            match result {
                Ok(Ok(file)) => {
                    let _ = tx.send(Ok(file));
                }
                Ok(Err(err)) => {
                    if let Some(err) = ctx.handle_error(err) {
                        let _ = tx.send(Err(err));
                    }
                }
                Err(e) => status.record_failure(format!("Digest task failed: {}", e)),
            }
        }
    }
}

/// Wait for an open-handle permit; `None` once the walk is cancelled
async fn admit(ctx: &WalkContext, open_files: &Arc<Semaphore>) -> Option<OwnedSemaphorePermit> {
    tokio::select! {
        permit = Arc::clone(open_files).acquire_owned() => permit.ok(),
        _ = ctx.cancel.cancelled() => None,
    }
}
