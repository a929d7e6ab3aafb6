//! Thread-pool walker
//!
//! `parallelism` OS threads drain one shared [`JobStack`] of directories.
//! Each worker pushes discovered subdirectories back onto the stack and
//! sends file digests over a channel; the stream ends when every worker has
//! seen the stack terminate and dropped its sender.

use crate::walk::gate::OpenFileGate;
use crate::walk::queue::JobStack;
use crate::walk::{scan_directory, DigestStream, DigestWalker, WalkContext, WalkItem, WalkStatus};
use crossbeam_channel::{unbounded, Sender};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use tracing::{debug, error};

pub struct PoolWalker {
    ctx: WalkContext,
}

impl PoolWalker {
    pub fn new(ctx: WalkContext) -> Self {
        Self { ctx }
    }
}

impl DigestWalker for PoolWalker {
    fn name(&self) -> &'static str {
        "pool"
    }

    fn digest_walk(&self, root: &Path) -> DigestStream {
        let ctx = self.ctx.for_walk();
        let cancel = ctx.cancel.clone();
        if !ctx.lister.is_walkable(root) {
            return DigestStream::empty(cancel);
        }

        let stack = Arc::new(JobStack::new([root.to_path_buf()]).with_cancellation(cancel.clone()));
        let gate = Arc::new(OpenFileGate::new(ctx.max_open_files));
        let status = Arc::new(WalkStatus::default());
        let (sender, receiver) = unbounded();

        let mut workers = Vec::with_capacity(ctx.parallelism);
        for id in 0..ctx.parallelism {
            let worker = PoolWorker {
                ctx: ctx.clone(),
                root: root.to_path_buf(),
                stack: Arc::clone(&stack),
                gate: Arc::clone(&gate),
                sender: sender.clone(),
            };
            let spawned = thread::Builder::new()
                .name(format!("dirdigest-pool-{}", id))
                .spawn(move || worker.run());
            match spawned {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    error!(worker = id, error = %e, "Failed to spawn pool worker");
                    status.record_failure(format!("Failed to spawn pool worker {}: {}", id, e));
                    cancel.cancel();
                    break;
                }
            }
        }
        debug!(workers = workers.len(), root = %root.display(), "Pool walk started");
        drop(sender);

        DigestStream::new(receiver.into_iter(), cancel, workers, status)
    }
}

struct PoolWorker {
    ctx: WalkContext,
    root: PathBuf,
    stack: Arc<JobStack<PathBuf>>,
    gate: Arc<OpenFileGate>,
    sender: Sender<WalkItem>,
}

impl PoolWorker {
    fn run(self) {
        for job in self.stack.iter() {
            scan_directory(
                &self.ctx,
                &self.root,
                &job,
                &self.gate,
                |dir| self.stack.put(dir),
                |item| {
                    // a closed receiver means the stream was dropped and the walk cancelled
                    let _ = self.sender.send(item);
                },
            );
        }
    }
}
