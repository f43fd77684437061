//! One-shot "server is ready to be probed" signal.

use std::sync::Arc;
use tokio::sync::watch;

/// A single-fire broadcast: once signaled it stays signaled.
///
/// Clones share the same underlying signal, so the driver that launches the server and
/// the clients waiting on it can each hold their own handle.
#[derive(Clone, Debug)]
pub struct ReadinessGate {
    tx: Arc<watch::Sender<bool>>,
}

impl ReadinessGate {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Mark the server as ready. Calls after the first have no effect.
    pub fn signal_ready(&self) {
        self.tx.send_if_modified(|ready| {
            if *ready {
                false
            } else {
                *ready = true;
                true
            }
        });
    }

    pub fn is_ready(&self) -> bool {
        *self.tx.borrow()
    }

    /// Wait until [`signal_ready`](Self::signal_ready) has been called. No timeout.
    pub async fn await_ready(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|ready| *ready).await;
    }
}

impl Default for ReadinessGate {
    fn default() -> Self {
        Self::new()
    }
}
