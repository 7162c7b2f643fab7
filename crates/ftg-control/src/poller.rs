//! Cancellable background poll loop.
//!
//! One loop per logical resource: hold its [`PollHandle`] in a [`PollSlot`] and
//! starting a new loop cancels the previous one. Cancellation is cooperative and
//! checked at iteration boundaries; a fetch already in flight runs to completion
//! but its result is dropped. Publishing and `cancel` share a lock, so once `cancel`
//! returns no further `on_update` call can start. `on_update` must therefore not
//! cancel its own handle.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub struct Poller;

impl Poller {
    /// Wait `interval`, run `fetch`, publish via `on_update`, forever until cancelled.
    pub fn start<F, Fut, R, U>(interval: Duration, fetch: F, on_update: U) -> PollHandle
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: Send + 'static,
        U: FnMut(R) + Send + 'static,
    {
        Self::spawn(interval, false, fetch, on_update)
    }

    /// Same as [`start`](Self::start) but the first fetch happens without waiting.
    pub fn start_immediate<F, Fut, R, U>(interval: Duration, fetch: F, on_update: U) -> PollHandle
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: Send + 'static,
        U: FnMut(R) + Send + 'static,
    {
        Self::spawn(interval, true, fetch, on_update)
    }

    fn spawn<F, Fut, R, U>(
        interval: Duration,
        immediate: bool,
        mut fetch: F,
        mut on_update: U,
    ) -> PollHandle
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: Send + 'static,
        U: FnMut(R) + Send + 'static,
    {
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let publish = Arc::new(Mutex::new(()));
        let publish_gate = Arc::clone(&publish);
        let task = tokio::spawn(async move {
            let mut skip_wait = immediate;
            loop {
                if !skip_wait {
                    tokio::select! {
                        _ = cancelled.cancelled() => break,
                        _ = tokio::time::sleep(interval) => {}
                    }
                }
                skip_wait = false;
                if cancelled.is_cancelled() {
                    break;
                }
                let result = fetch().await;
                let _gate = lock_gate(&publish_gate);
                if cancelled.is_cancelled() {
                    tracing::trace!("poll result discarded after cancellation");
                    break;
                }
                on_update(result);
            }
        });
        PollHandle {
            token,
            publish,
            task: Some(task),
        }
    }
}

/// Owner of a running poll loop. Dropping it cancels the loop.
pub struct PollHandle {
    token: CancellationToken,
    publish: Arc<Mutex<()>>,
    task: Option<JoinHandle<()>>,
}

fn lock_gate(gate: &Mutex<()>) -> MutexGuard<'_, ()> {
    match gate.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl PollHandle {
    /// Stop the loop. Waits for an `on_update` call already running on another
    /// thread, then guarantees no further one.
    pub fn cancel(&self) {
        let _gate = lock_gate(&self.publish);
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Cancel and wait for the loop to exit (including any in-flight fetch).
    pub async fn shutdown(mut self) {
        self.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Holds at most one active poll loop for a named resource.
pub struct PollSlot {
    name: &'static str,
    current: Mutex<Option<PollHandle>>,
}

impl PollSlot {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            current: Mutex::new(None),
        }
    }

    /// Install `handle` as the active loop, cancelling any previous one.
    pub fn replace(&self, handle: PollHandle) {
        let previous = match self.current.lock() {
            Ok(mut guard) => guard.replace(handle),
            Err(poisoned) => poisoned.into_inner().replace(handle),
        };
        if let Some(previous) = previous {
            previous.cancel();
            tracing::debug!(resource = self.name, "previous poll loop cancelled");
        }
    }

    /// Cancel the active loop. Returns whether one was running.
    pub fn stop(&self) -> bool {
        let previous = match self.current.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        match previous {
            Some(handle) => {
                let was_active = !handle.is_cancelled();
                handle.cancel();
                tracing::debug!(resource = self.name, "poll loop stopped");
                was_active
            }
            None => false,
        }
    }

    /// Cancel the active loop and wait until its task has exited.
    pub async fn shutdown(&self) {
        let previous = match self.current.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(handle) = previous {
            handle.shutdown().await;
            tracing::debug!(resource = self.name, "poll loop shut down");
        }
    }

    pub fn is_active(&self) -> bool {
        match self.current.lock() {
            Ok(guard) => guard.as_ref().is_some_and(|h| !h.is_cancelled()),
            Err(poisoned) => poisoned
                .into_inner()
                .as_ref()
                .is_some_and(|h| !h.is_cancelled()),
        }
    }
}
