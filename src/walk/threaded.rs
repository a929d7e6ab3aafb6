//! Threaded walker with decoupled input and output signalling
//!
//! Input is a [`JobStack`] of directories. Output goes through a separate
//! monitor with its own condition variable, so a worker publishing results
//! never contends with workers waiting for input. Each worker publishes one
//! batch per directory and a final `WorkerDone` marker when it exits, on
//! every exit path, and the consumer counts markers to know when the stream
//! is complete.

use crate::walk::gate::OpenFileGate;
use crate::walk::queue::JobStack;
use crate::walk::{scan_directory, DigestStream, DigestWalker, WalkContext, WalkItem, WalkStatus};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use tracing::{debug, error};

pub struct ThreadedWalker {
    ctx: WalkContext,
}

impl ThreadedWalker {
    pub fn new(ctx: WalkContext) -> Self {
        Self { ctx }
    }
}

impl DigestWalker for ThreadedWalker {
    fn name(&self) -> &'static str {
        "threaded"
    }

    fn digest_walk(&self, root: &Path) -> DigestStream {
        let ctx = self.ctx.for_walk();
        let cancel = ctx.cancel.clone();
        if !ctx.lister.is_walkable(root) {
            return DigestStream::empty(cancel);
        }

        let input = Arc::new(JobStack::new([root.to_path_buf()]).with_cancellation(cancel.clone()));
        let output = Arc::new(OutputMonitor::default());
        let gate = Arc::new(OpenFileGate::new(ctx.max_open_files));
        let status = Arc::new(WalkStatus::default());

        let mut workers = Vec::with_capacity(ctx.parallelism);
        for id in 0..ctx.parallelism {
            let ctx = ctx.clone();
            let root = root.to_path_buf();
            let input = Arc::clone(&input);
            let output = Arc::clone(&output);
            let gate = Arc::clone(&gate);
            let spawned = thread::Builder::new()
                .name(format!("dirdigest-threaded-{}", id))
                .spawn(move || {
                    let _done = WorkerDone(Arc::clone(&output));
                    run_worker(&ctx, &root, &input, &output, &gate);
                });
            match spawned {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    error!(worker = id, error = %e, "Failed to spawn walker thread");
                    status.record_failure(format!("Failed to spawn walker thread {}: {}", id, e));
                    cancel.cancel();
                    break;
                }
            }
        }
        debug!(workers = workers.len(), root = %root.display(), "Threaded walk started");

        let items = OutputDrain {
            monitor: output,
            live_workers: workers.len(),
            ready: VecDeque::new(),
        };
        DigestStream::new(items, cancel, workers, status)
    }
}

fn run_worker(
    ctx: &WalkContext,
    root: &Path,
    input: &JobStack<PathBuf>,
    output: &OutputMonitor,
    gate: &OpenFileGate,
) {
    for job in input.iter() {
        let mut batch = Vec::new();
        scan_directory(ctx, root, &job, gate, |dir| input.put(dir), |item| {
            batch.push(Output::Item(item))
        });
        output.publish(batch);
    }
}

enum Output {
    Item(WalkItem),
    WorkerDone,
}

#[derive(Default)]
struct OutputMonitor {
    queue: Mutex<VecDeque<Output>>,
    on_output: Condvar,
}

impl OutputMonitor {
    fn publish(&self, batch: Vec<Output>) {
        if batch.is_empty() {
            return;
        }
        self.queue.lock().extend(batch);
        self.on_output.notify_one();
    }
}

/// Publishes the exit marker when a worker returns or unwinds
struct WorkerDone(Arc<OutputMonitor>);

impl Drop for WorkerDone {
    fn drop(&mut self) {
        self.0.publish(vec![Output::WorkerDone]);
    }
}

struct OutputDrain {
    monitor: Arc<OutputMonitor>,
    live_workers: usize,
    ready: VecDeque<WalkItem>,
}

impl Iterator for OutputDrain {
    type Item = WalkItem;

    fn next(&mut self) -> Option<WalkItem> {
        loop {
            if let Some(item) = self.ready.pop_front() {
                return Some(item);
            }
            if self.live_workers == 0 {
                return None;
            }
            let mut queue = self.monitor.queue.lock();
            while queue.is_empty() {
                self.monitor.on_output.wait(&mut queue);
            }
            for output in queue.drain(..) {
                match output {
                    Output::Item(item) => self.ready.push_back(item),
                    Output::WorkerDone => self.live_workers -= 1,
                }
            }
        }
    }
}
