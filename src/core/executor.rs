//! Deadline-bounded execution of a unit of work
//!
//! [`execute_with_context`] races a [`Process`] against the tighter of the
//! context deadline and an explicit timeout.
//!
//! # Late completion
//!
//! The work is spawned as a detached tokio task and is never aborted. When the
//! caller stops waiting, the task keeps running. Its eventual outcome goes to
//! the process cleanup callback exactly once, so resources it produced (a
//! pool, a cursor) can be released. The cleanup never runs when the work
//! finished in time.

use crate::core::context::Context;
use crate::core::error::{DatabaseError, Result};
use parking_lot::Mutex;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{error, trace, warn};
use uuid::Uuid;

type Work<T> = Pin<Box<dyn Future<Output = Result<T>> + Send>>;
type Cleanup<T> = Box<dyn FnOnce(Result<T>) + Send>;

/// A unit of work plus what to do with its result if nobody is waiting anymore
pub struct Process<T> {
    work: Work<T>,
    cleanup: Option<Cleanup<T>>,
}

impl<T: Send + 'static> Process<T> {
    pub fn new<F>(work: F) -> Self
    where
        F: Future<Output = Result<T>> + Send + 'static,
    {
        Self {
            work: Box::pin(work),
            cleanup: None,
        }
    }

    /// Attach a callback receiving the outcome of work that outlived its deadline
    #[must_use]
    pub fn with_cleanup<C>(mut self, cleanup: C) -> Self
    where
        C: FnOnce(Result<T>) + Send + 'static,
    {
        self.cleanup = Some(Box::new(cleanup));
        self
    }
}

impl<T> std::fmt::Debug for Process<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Process")
            .field("has_cleanup", &self.cleanup.is_some())
            .finish()
    }
}

/// Run `process`, giving up after `timeout` or at the context deadline
///
/// A zero `timeout` awaits the work inline: no deadline or cancellation
/// applies and the cleanup is never called.
///
/// # Errors
///
/// - [`DatabaseError::DeadlineExceeded`] when the deadline fires first
/// - [`DatabaseError::Cancelled`] when the context is cancelled first
/// - whatever the work itself returned otherwise
pub async fn execute_with_context<T: Send + 'static>(
    process: Process<T>,
    ctx: &Context,
    timeout: Duration,
) -> Result<T> {
    let Process { work, cleanup } = process;
    let request_id = ctx.request_id();
    let started = Instant::now();

    if timeout.is_zero() {
        let result = work.await;
        trace!(%request_id, elapsed = ?started.elapsed(), "executed process inline");
        return result;
    }

    let slot = Arc::new(Mutex::new(cleanup));
    let (tx, mut rx) = oneshot::channel();

    let late_slot = Arc::clone(&slot);
    tokio::spawn(async move {
        let result = work.await;
        if let Err(result) = tx.send(result) {
            run_cleanup(&late_slot, result, request_id);
        }
    });

    let deadline = match ctx.deadline() {
        Some(ctx_deadline) => ctx_deadline.min(started + timeout),
        None => started + timeout,
    };

    let failure = tokio::select! {
        outcome = &mut rx => {
            return match outcome {
                Ok(result) => {
                    trace!(%request_id, elapsed = ?started.elapsed(), "executed process");
                    result
                }
                Err(_) => Err(DatabaseError::other(
                    "process ended without reporting a result",
                )),
            };
        }
        _ = tokio::time::sleep_until(deadline) => DatabaseError::DeadlineExceeded {
            timeout_ms: deadline.saturating_duration_since(started).as_millis() as u64,
        },
        _ = ctx.cancelled() => DatabaseError::Cancelled,
    };

    // Past this point the sender either already delivered (we own the
    // result) or its send will fail (the task owns it).
    rx.close();
    if let Ok(result) = rx.try_recv() {
        run_cleanup(&slot, result, request_id);
    }

    error!(%request_id, elapsed = ?started.elapsed(), "{failure}");
    Err(failure)
}

fn run_cleanup<T>(slot: &Mutex<Option<Cleanup<T>>>, result: Result<T>, request_id: Uuid) {
    let cleanup = slot.lock().take();
    match cleanup {
        Some(cleanup) => {
            warn!(%request_id, ok = result.is_ok(), "cleaning up late process result");
            cleanup(result);
        }
        None => trace!(%request_id, "dropping late process result"),
    }
}
