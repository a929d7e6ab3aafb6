//! Termination-tracking job stack for thread workers
//!
//! A synchronized LIFO shared by workers that are both producers and
//! consumers. Each worker repeatedly takes a job, may `put` any number of new
//! jobs while processing it, and retires it when the [`Job`] handle drops.
//! Iteration ends for everyone once the stack is empty *and* every issued job
//! has been retired.
//!
//! ```text
//!   put() ──► pending ──► next_job() ──► Job (outstanding) ──drop──► retired
//!                ▲                            │
//!                └──────── put() ─────────────┘
//! ```
//!
//! `outstanding` counts jobs created but not yet retired. It is only touched
//! under the same lock that guards `pending`, so "pending is empty and
//! outstanding is zero" is observed atomically.

use parking_lot::{Condvar, Mutex};
use std::ops::Deref;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// How often a waiting worker re-checks an external cancellation token
pub const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug)]
struct State<T> {
    pending: Vec<T>,
    outstanding: usize,
    cancelled: bool,
}

/// Synchronized job stack with completion tracking
#[derive(Debug)]
pub struct JobStack<T> {
    state: Mutex<State<T>>,
    changed: Condvar,
    cancel: Option<CancellationToken>,
}

impl<T> JobStack<T> {
    /// Create a stack seeded with the given jobs
    pub fn new<I: IntoIterator<Item = T>>(seed: I) -> Self {
        let pending: Vec<T> = seed.into_iter().collect();
        let outstanding = pending.len();
        Self {
            state: Mutex::new(State {
                pending,
                outstanding,
                cancelled: false,
            }),
            changed: Condvar::new(),
            cancel: None,
        }
    }

    /// Stop handing out jobs once `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Add a job and wake one waiting worker
    pub fn put(&self, item: T) {
        let mut state = self.state.lock();
        state.pending.push(item);
        state.outstanding += 1;
        self.changed.notify_one();
    }

    /// Take the next job, blocking while other workers may still add more.
    ///
    /// Returns `None` once all work is retired or the stack was cancelled;
    /// after that it never yields a job again.
    pub fn next_job(&self) -> Option<Job<'_, T>> {
        let mut state = self.state.lock();
        loop {
            if state.cancelled || self.is_token_cancelled() {
                return None;
            }
            if state.outstanding == 0 {
                return None;
            }
            if let Some(item) = state.pending.pop() {
                return Some(Job {
                    stack: self,
                    item: Some(item),
                });
            }
            if self.cancel.is_some() {
                self.changed.wait_for(&mut state, CANCEL_POLL_INTERVAL);
            } else {
                self.changed.wait(&mut state);
            }
        }
    }

    /// Iterate over jobs until the stack is drained
    pub fn iter(&self) -> Jobs<'_, T> {
        Jobs { stack: self }
    }

    /// Wake every waiter and refuse further jobs
    pub fn cancel(&self) {
        let mut state = self.state.lock();
        state.cancelled = true;
        self.changed.notify_all();
    }

    /// Jobs issued but not yet retired (queued or in flight)
    pub fn outstanding(&self) -> usize {
        self.state.lock().outstanding
    }

    /// Jobs waiting to be taken
    pub fn pending(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// True once every job has been retired
    pub fn is_done(&self) -> bool {
        let state = self.state.lock();
        state.outstanding == 0 && state.pending.is_empty()
    }

    fn retire(&self) {
        let mut state = self.state.lock();
        state.outstanding -= 1;
        if state.outstanding == 0 {
            self.changed.notify_all();
        }
    }

    fn is_token_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map(CancellationToken::is_cancelled)
            .unwrap_or(false)
    }
}

/// A job taken from the stack; retired when dropped, including during unwinding
#[derive(Debug)]
pub struct Job<'a, T> {
    stack: &'a JobStack<T>,
    item: Option<T>,
}

impl<T> Deref for Job<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // only taken out in drop
        self.item.as_ref().unwrap_or_else(|| unreachable!())
    }
}

impl<T> Drop for Job<'_, T> {
    fn drop(&mut self) {
        self.item.take();
        self.stack.retire();
    }
}

/// Iterator returned by [`JobStack::iter`]
pub struct Jobs<'a, T> {
    stack: &'a JobStack<T>,
}

impl<'a, T> Iterator for Jobs<'a, T> {
    type Item = Job<'a, T>;

    fn next(&mut self) -> Option<Job<'a, T>> {
        self.stack.next_job()
    }
}
