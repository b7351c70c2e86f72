//! Connectivity tracking and drain triggering.

use std::sync::Arc;

use tokio::sync::watch;

use crate::remote::RemoteDocumentStore;

use super::queue::{DrainOutcome, SyncQueue};

/// Tracks the host runtime's online/offline signal.
///
/// The host pushes transitions into the paired `watch::Sender`; the monitor
/// exposes the current state and drives a drain on every offline-to-online
/// transition. The exposed state is for UI display only; no cache logic
/// reads it.
#[derive(Clone)]
pub struct ConnectivityMonitor {
    receiver: watch::Receiver<bool>,
}

impl ConnectivityMonitor {
    /// Create a monitor over an existing connectivity signal.
    #[must_use]
    pub const fn new(receiver: watch::Receiver<bool>) -> Self {
        Self { receiver }
    }

    /// Create a connectivity channel and a monitor subscribed to it.
    #[must_use]
    pub fn channel(initially_online: bool) -> (watch::Sender<bool>, Self) {
        let (sender, receiver) = watch::channel(initially_online);
        (sender, Self { receiver })
    }

    /// Current connectivity state.
    #[must_use]
    pub fn is_online(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Run the drain loop until the connectivity sender is dropped.
    ///
    /// Spawn this on the runtime with a concrete remote store:
    /// `tokio::spawn(monitor.clone().run_drain_loop(queue, remote))`.
    pub async fn run_drain_loop<R: RemoteDocumentStore>(self, queue: Arc<SyncQueue>, remote: R) {
        let mut receiver = self.receiver;
        let mut was_online = *receiver.borrow();

        while receiver.changed().await.is_ok() {
            let online = *receiver.borrow();
            if online && !was_online {
                tracing::info!("Back online; draining pending mutations");
                match queue.drain(&remote).await {
                    Ok(DrainOutcome::Drained(report)) => {
                        if let Some(failure) = report.failure {
                            tracing::warn!(
                                "Drain stopped after {} replays: {failure}",
                                report.replayed
                            );
                        }
                    }
                    Ok(DrainOutcome::AlreadySyncing) => {
                        tracing::debug!("Drain already in flight");
                    }
                    Err(error) => {
                        tracing::warn!("Drain failed: {error}");
                    }
                }
            }
            was_online = online;
        }
    }
}
