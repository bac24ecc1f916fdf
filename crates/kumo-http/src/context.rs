//! Call-scoped cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Cancellation handle shared between a caller and an in-flight request.
///
/// Cloning produces another handle to the same state. A request checks the
/// context exactly once, before its first attempt; a configured timeout uses
/// its own deadline and does not observe this handle.
#[derive(Clone, Default)]
pub struct CallContext {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    cancelled: AtomicBool,
    cause: Mutex<Option<String>>,
}

impl CallContext {
    /// Create a live, un-cancelled context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel without a recorded cause.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
    }

    /// Cancel and record why.
    pub fn cancel_with(&self, cause: impl Into<String>) {
        if let Ok(mut slot) = self.inner.cause.lock() {
            *slot = Some(cause.into());
        }
        self.inner.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether the context has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// The recorded cancellation cause, if any.
    pub fn cause(&self) -> Option<String> {
        self.inner.cause.lock().ok().and_then(|slot| slot.clone())
    }
}

impl std::fmt::Debug for CallContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallContext")
            .field("cancelled", &self.is_cancelled())
            .field("cause", &self.cause())
            .finish()
    }
}
