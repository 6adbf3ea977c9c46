//! Request-scoped execution context
//!
//! A [`Context`] travels with every facade call. It carries the request
//! identifier used to scope log events, an optional absolute deadline and a
//! cancellation token shared by every clone.

use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct Context {
    request_id: Uuid,
    deadline: Option<Instant>,
    cancel: CancellationToken,
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

impl Context {
    /// Context without deadline, tagged with a fresh request id
    pub fn background() -> Self {
        Self::with_request_id(Uuid::new_v4())
    }

    /// Context tagged with an existing request id
    pub fn with_request_id(request_id: Uuid) -> Self {
        Self {
            request_id,
            deadline: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Derive a context that expires `timeout` from now
    ///
    /// The tighter of the existing and the new deadline wins. Cancelling the
    /// parent cancels the child, not the other way round.
    #[must_use]
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Derive a context that expires at `deadline`
    #[must_use]
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(current) if current < deadline => current,
            _ => deadline,
        };
        Self {
            request_id: self.request_id,
            deadline: Some(deadline),
            cancel: self.cancel.child_token(),
        }
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Signal every waiter on this context (and its children) to give up
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once the context is cancelled
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }
}
