//! Cancellation flags for timer-driven work
//!
//! An `AbortFlag` is a cloneable, awaitable abort signal. A child flag is
//! aborted when it or any ancestor is aborted, which lets one view teardown
//! stop every loop started under it while a retry only stops its own loop.

use futures::future::select_all;
use std::sync::Arc;
use tokio::sync::watch;

/// Awaitable abort signal shared between a loop and its owner
#[derive(Debug, Clone)]
pub struct AbortFlag {
    own: Arc<watch::Sender<bool>>,
    ancestors: Vec<Arc<watch::Sender<bool>>>,
}

impl Default for AbortFlag {
    fn default() -> Self {
        Self::new()
    }
}

impl AbortFlag {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            own: Arc::new(tx),
            ancestors: Vec::new(),
        }
    }

    /// New flag that also trips when `self` trips
    pub fn child(&self) -> Self {
        let (tx, _rx) = watch::channel(false);
        let mut ancestors = self.ancestors.clone();
        ancestors.push(Arc::clone(&self.own));
        Self {
            own: Arc::new(tx),
            ancestors,
        }
    }

    /// Trip this flag (and every child derived from it)
    pub fn abort(&self) {
        self.own.send_replace(true);
    }

    pub fn is_aborted(&self) -> bool {
        *self.own.borrow() || self.ancestors.iter().any(|tx| *tx.borrow())
    }

    /// Resolves once this flag or an ancestor is aborted
    pub async fn aborted(&self) {
        let mut receivers: Vec<_> = std::iter::once(&self.own)
            .chain(self.ancestors.iter())
            .map(|tx| tx.subscribe())
            .collect();

        let waits = receivers.iter_mut().map(|rx| {
            Box::pin(async move {
                // The sender outlives `self`, so `wait_for` only returns on abort
                let _ = rx.wait_for(|aborted| *aborted).await;
            })
        });

        select_all(waits).await;
    }
}

/// Handle the hosting view keeps to signal teardown
#[derive(Debug, Clone)]
pub struct TeardownHandle(pub(crate) AbortFlag);

impl TeardownHandle {
    /// Stop all pending work; nothing fires after this returns
    pub fn teardown(&self) {
        self.0.abort();
    }

    pub fn is_torn_down(&self) -> bool {
        self.0.is_aborted()
    }
}
