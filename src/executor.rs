//! Execution of background fetches.
//!
//! A [`WorkExecutor`] only runs work; it never touches the cache. Results
//! travel back to the owner thread over the cache's completion channel.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// A unit of background work.
pub type Work = Box<dyn FnOnce() + Send + 'static>;

/// Runs work off (or on) the caller's thread.
///
/// Implementations may drop work without running it; the cache reports
/// such loads as cancelled.
pub trait WorkExecutor {
    fn submit(&self, work: Work);
}

/// Runs work immediately on the submitting thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineExecutor;

impl WorkExecutor for InlineExecutor {
    fn submit(&self, work: Work) {
        work();
    }
}

/// Runs each unit of work on its own named thread.
#[derive(Debug)]
pub struct ThreadExecutor {
    name: String,
    spawned: AtomicU64,
}

impl ThreadExecutor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            spawned: AtomicU64::new(0),
        }
    }
}

impl Default for ThreadExecutor {
    fn default() -> Self {
        Self::new("catalog-load")
    }
}

impl WorkExecutor for ThreadExecutor {
    fn submit(&self, work: Work) {
        let n = self.spawned.fetch_add(1, Ordering::Relaxed);
        let spawned = std::thread::Builder::new()
            .name(format!("{}-{}", self.name, n))
            .spawn(work);
        if let Err(e) = spawned {
            // The work (and its completion guard) was dropped; waiters see a cancellation.
            tracing::error!(error = %e, "failed to spawn catalog load thread");
        }
    }
}

/// Cooperative cancellation flag shared between the cache and a unit of work.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
