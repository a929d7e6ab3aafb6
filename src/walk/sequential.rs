//! Breadth-first walker running on the consumer's thread
//!
//! Nothing happens until the stream is polled; each call to `next` digests
//! at most one file and lists directories as needed.

use crate::walk::{DigestStream, DigestWalker, WalkContext, WalkItem, WalkStatus};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub struct SequentialWalker {
    ctx: WalkContext,
}

impl SequentialWalker {
    pub fn new(ctx: WalkContext) -> Self {
        Self { ctx }
    }
}

impl DigestWalker for SequentialWalker {
    fn name(&self) -> &'static str {
        "sequential"
    }

    fn digest_walk(&self, root: &Path) -> DigestStream {
        let ctx = self.ctx.for_walk();
        let cancel = ctx.cancel.clone();
        if !ctx.lister.is_walkable(root) {
            return DigestStream::empty(cancel);
        }
        let items = BreadthFirst {
            root: root.to_path_buf(),
            dirs: VecDeque::from([root.to_path_buf()]),
            files: VecDeque::new(),
            ctx,
        };
        DigestStream::new(items, cancel, Vec::new(), Arc::new(WalkStatus::default()))
    }
}

struct BreadthFirst {
    ctx: WalkContext,
    root: PathBuf,
    dirs: VecDeque<PathBuf>,
    files: VecDeque<PathBuf>,
}

impl Iterator for BreadthFirst {
    type Item = WalkItem;

    fn next(&mut self) -> Option<WalkItem> {
        loop {
            if self.ctx.is_cancelled() {
                return None;
            }

            if let Some(path) = self.files.pop_front() {
                match self.ctx.digest(&self.root, &path) {
                    Ok(file) => return Some(Ok(file)),
                    Err(err) => match self.ctx.handle_error(err) {
                        Some(err) => return Some(Err(err)),
                        None => continue,
                    },
                }
            }

            let dir = self.dirs.pop_front()?;
            match self.ctx.list(&dir) {
                Ok(entries) => {
                    for entry in entries {
                        if entry.is_dir {
                            self.dirs.push_back(entry.path);
                        } else {
                            self.files.push_back(entry.path);
                        }
                    }
                }
                Err(err) => {
                    if let Some(err) = self.ctx.handle_error(err) {
                        return Some(Err(err));
                    }
                }
            }
        }
    }
}
