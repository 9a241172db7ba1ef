//! Bounded producer → enricher handoff with drop-on-full semantics.

use tokio::sync::mpsc;
use tracing::warn;

use crate::event::BaseEvent;

/// Sending half of the ingest channel. Cheap to clone; every producer
/// thread gets its own handle.
#[derive(Clone)]
pub struct IngestSender {
    tx: mpsc::Sender<BaseEvent>,
}

impl IngestSender {
    /// Non-blocking send. If the channel is full the event is dropped and
    /// a warning is logged; this never returns an error to the caller —
    /// the public API is fire-and-forget.
    pub fn offer(&self, event: BaseEvent) {
        if let Err(mpsc::error::TrySendError::Full(_)) = self.tx.try_send(event) {
            warn!("ingest channel full, dropping event");
        }
        // A `Closed` error means the enricher task has shut down (e.g.
        // after `reset()`); silently dropping is correct here too, since
        // the public API never surfaces ingest failures.
    }
}

/// Receiving half of the ingest channel, owned by the enricher task.
pub struct IngestReceiver {
    rx: mpsc::Receiver<BaseEvent>,
}

impl IngestReceiver {
    pub async fn recv(&mut self) -> Option<BaseEvent> {
        self.rx.recv().await
    }
}

/// Build a bounded ingest channel of capacity `max(100, max_queue_events / 2)`.
pub fn ingest_channel(max_queue_events: usize) -> (IngestSender, IngestReceiver) {
    let capacity = std::cmp::max(100, max_queue_events / 2);
    let (tx, rx) = mpsc::channel(capacity);
    (IngestSender { tx }, IngestReceiver { rx })
}
