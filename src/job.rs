//! Cancelable background jobs
//!
//! A small structured-concurrency primitive for listeners that must run only
//! within a bounded window: the task body receives a cancellation token, and
//! `cancel()` does not resolve until the body has observed the signal and
//! returned. Used for the AT driver's inbound reader and for every speech
//! collection window.

use std::future::Future;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::common::{Error, Result};

/// Handle to a running background task.
///
/// The task stops when its data source ends or when the token fires,
/// whichever happens first. Streams consumed inside the body should be
/// polled under `tokio::select!` against `token.cancelled()` so that
/// iteration stops no later than the next item.
pub struct CancelableJob<T> {
    token: CancellationToken,
    handle: JoinHandle<T>,
}

impl<T: Send + 'static> CancelableJob<T> {
    /// Spawn `body` in the background and return a handle immediately.
    pub fn start<F, Fut>(body: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let token = CancellationToken::new();
        let handle = tokio::spawn(body(token.clone()));
        Self { token, handle }
    }

    /// Signal cancellation and wait until the task has observed it and
    /// returned, yielding the task's value.
    pub async fn cancel(self) -> Result<T> {
        self.token.cancel();
        self.join().await
    }

    /// Wait for the task to finish on its own (data source ended).
    ///
    /// A panicking task is resumed here rather than swallowed.
    pub async fn join(self) -> Result<T> {
        match self.handle.await {
            Ok(value) => Ok(value),
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => Err(Error::Internal(format!("background job failed: {e}"))),
        }
    }
}
