//! In-process event bus for single-node deployments.

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc, watch, Mutex};
use tracing::warn;

use arbor_core::error::AppError;
use arbor_core::result::AppResult;
use arbor_entity::directory::DirectoryEvent;

use crate::traits::Watcher;

/// Buffer size of the per-watcher forwarding channel.
const FORWARD_BUFFER: usize = 64;

/// Broadcast bus carrying directory events to in-process watchers.
///
/// The notifier side publishes here after every mutation; each
/// [`MemoryWatcher`] holds its own subscription. Slow watchers that fall
/// more than the buffer behind lose the oldest events; the periodic full
/// reconcile is the designed compensator.
#[derive(Debug, Clone)]
pub struct MemoryEventBus {
    tx: broadcast::Sender<DirectoryEvent>,
}

impl MemoryEventBus {
    /// Create a bus retaining up to `buffer_size` events per subscriber.
    pub fn new(buffer_size: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer_size);
        Self { tx }
    }

    /// Publish an event to all subscribed watchers.
    ///
    /// Returns the number of watchers that will observe it.
    pub fn publish(&self, event: DirectoryEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    /// Create a watcher subscribed from this point onward.
    pub fn watcher(&self) -> MemoryWatcher {
        MemoryWatcher {
            tx: self.tx.clone(),
            subscription: Mutex::new(Some(self.tx.subscribe())),
        }
    }
}

/// [`Watcher`] fed by a [`MemoryEventBus`] subscription.
#[derive(Debug)]
pub struct MemoryWatcher {
    tx: broadcast::Sender<DirectoryEvent>,
    /// Subscription taken at construction so events published before
    /// `watch` is first called are retained.
    subscription: Mutex<Option<broadcast::Receiver<DirectoryEvent>>>,
}

#[async_trait]
impl Watcher for MemoryWatcher {
    async fn watch(
        &self,
        mut cancel: watch::Receiver<bool>,
    ) -> AppResult<(mpsc::Receiver<DirectoryEvent>, mpsc::Receiver<AppError>)> {
        let mut source = {
            let mut guard = self.subscription.lock().await;
            guard.take().unwrap_or_else(|| self.tx.subscribe())
        };

        let (event_tx, event_rx) = mpsc::channel(FORWARD_BUFFER);
        let (error_tx, error_rx) = mpsc::channel(1);

        tokio::spawn(async move {
            // Held so the error channel stays open while forwarding; the
            // bus itself has no fatal error to report.
            let _error_tx = error_tx;

            loop {
                tokio::select! {
                    changed = cancel.changed() => {
                        if changed.is_err() || *cancel.borrow() {
                            break;
                        }
                    }
                    received = source.recv() => match received {
                        Ok(event) => {
                            if event_tx.send(event).await.is_err() {
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(
                                skipped,
                                "Watcher lagged behind the event bus; dropped events \
                                 will be recovered by the next full reconcile"
                            );
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                }
            }
        });

        Ok((event_rx, error_rx))
    }
}
