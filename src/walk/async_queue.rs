//! Termination-tracking job stack for async tasks
//!
//! Same contract as [`crate::walk::queue::JobStack`], with waiting expressed
//! as a suspension point instead of a blocked thread. Waiters register with
//! the [`Notify`] *before* inspecting the state, so a `put` or a final
//! retirement that lands between the check and the await is never lost.

use parking_lot::Mutex;
use std::ops::Deref;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
struct State<T> {
    pending: Vec<T>,
    outstanding: usize,
    cancelled: bool,
}

/// Job stack shared by cooperative worker tasks
#[derive(Debug)]
pub struct AsyncJobStack<T> {
    state: Mutex<State<T>>,
    changed: Notify,
    cancel: Option<CancellationToken>,
}

impl<T> AsyncJobStack<T> {
    pub fn new<I: IntoIterator<Item = T>>(seed: I) -> Self {
        let pending: Vec<T> = seed.into_iter().collect();
        let outstanding = pending.len();
        Self {
            state: Mutex::new(State {
                pending,
                outstanding,
                cancelled: false,
            }),
            changed: Notify::new(),
            cancel: None,
        }
    }

    /// Stop handing out jobs once `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn put(&self, item: T) {
        {
            let mut state = self.state.lock();
            state.pending.push(item);
            state.outstanding += 1;
        }
        self.changed.notify_waiters();
    }

    /// Take the next job, suspending while other tasks may still add more.
    ///
    /// Resolves to `None` once every job has been retired or the stack was
    /// cancelled.
    pub async fn next_job(&self) -> Option<AsyncJob<'_, T>> {
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(next) = self.try_take() {
                return next;
            }

            match &self.cancel {
                Some(token) => {
                    tokio::select! {
                        _ = &mut notified => {}
                        _ = token.cancelled() => {}
                    }
                }
                None => notified.await,
            }
        }
    }

    /// `Some(None)` when done, `Some(Some(job))` when a job is available,
    /// `None` when the caller has to wait
    fn try_take(&self) -> Option<Option<AsyncJob<'_, T>>> {
        let mut state = self.state.lock();
        let token_cancelled = self
            .cancel
            .as_ref()
            .map(CancellationToken::is_cancelled)
            .unwrap_or(false);
        if state.cancelled || token_cancelled || state.outstanding == 0 {
            return Some(None);
        }
        state.pending.pop().map(|item| {
            Some(AsyncJob {
                stack: self,
                item: Some(item),
            })
        })
    }

    pub fn cancel(&self) {
        self.state.lock().cancelled = true;
        self.changed.notify_waiters();
    }

    pub fn outstanding(&self) -> usize {
        self.state.lock().outstanding
    }

    pub fn is_done(&self) -> bool {
        let state = self.state.lock();
        state.outstanding == 0 && state.pending.is_empty()
    }

    fn retire(&self) {
        let done = {
            let mut state = self.state.lock();
            state.outstanding -= 1;
            state.outstanding == 0
        };
        if done {
            self.changed.notify_waiters();
        }
    }
}

/// A job taken from an [`AsyncJobStack`]; retired on drop
#[derive(Debug)]
pub struct AsyncJob<'a, T> {
    stack: &'a AsyncJobStack<T>,
    item: Option<T>,
}

impl<T> Deref for AsyncJob<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.item.as_ref().unwrap_or_else(|| unreachable!())
    }
}

impl<T> Drop for AsyncJob<'_, T> {
    fn drop(&mut self) {
        self.item.take();
        self.stack.retire();
    }
}
