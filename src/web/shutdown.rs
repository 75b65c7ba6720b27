//! Shutdown escalation from request handlers to the server loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;
use tracing::error;

/// Sending half held by the router.
///
/// Only the first [`signal`](ShutdownSignal::signal) call emits; later calls
/// from concurrent failing requests are dropped.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    tx: mpsc::Sender<String>,
    fired: Arc<AtomicBool>,
}

/// Receiving half observed by the server loop.
#[derive(Debug)]
pub struct ShutdownReceiver {
    rx: mpsc::Receiver<String>,
}

pub fn channel() -> (ShutdownSignal, ShutdownReceiver) {
    let (tx, rx) = mpsc::channel(1);
    (
        ShutdownSignal {
            tx,
            fired: Arc::new(AtomicBool::new(false)),
        },
        ShutdownReceiver { rx },
    )
}

impl ShutdownSignal {
    /// Requests process shutdown. Returns `true` if this call emitted the signal.
    pub fn signal(&self, reason: impl Into<String>) -> bool {
        if self.fired.swap(true, Ordering::SeqCst) {
            return false;
        }

        let reason = reason.into();
        error!(reason = %reason, "shutdown requested");

        // Capacity 1 and a single sender past the guard: this cannot be full.
        let _ = self.tx.try_send(reason);
        true
    }

    pub fn is_signalled(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }
}

impl ShutdownReceiver {
    /// Waits for the shutdown reason. `None` when every sender is gone.
    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<String> {
        self.rx.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_signal_fires_once() {
        let (signal, mut rx) = channel();
        let other = signal.clone();

        assert!(signal.signal("first"));
        assert!(!other.signal("second"));
        assert!(other.is_signalled());

        assert_eq!(rx.recv().await.as_deref(), Some("first"));
        assert_eq!(rx.try_recv(), None);
    }

    #[tokio::test]
    async fn test_recv_none_when_dropped() {
        let (signal, mut rx) = channel();
        drop(signal);
        assert_eq!(rx.recv().await, None);
    }
}
