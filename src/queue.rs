//! Bounded FIFO buffer of [`EnrichedEvent`]s with asymmetric overflow
//! policy between `enqueue` and `requeue_front`.

use std::collections::VecDeque;

use tokio::sync::Mutex;
use tracing::warn;

use crate::event::EnrichedEvent;

/// Thread-safe, bounded FIFO queue. All mutating operations serialize
/// through a single mutex; `size()` takes the same lock since the queue
/// is never large enough to warrant a separate fast-path read.
pub struct EventQueue {
    inner: Mutex<VecDeque<EnrichedEvent>>,
    capacity: usize,
}

impl EventQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity,
        }
    }

    pub async fn size(&self) -> usize {
        self.inner.lock().await.len()
    }

    /// Append `event` at the tail. If the queue is at capacity, the
    /// oldest element is dropped first (logged as overflow).
    pub async fn enqueue(&self, event: EnrichedEvent) {
        let mut q = self.inner.lock().await;
        if q.len() == self.capacity {
            q.pop_front();
            warn!("event queue overflow, dropped oldest event");
        }
        q.push_back(event);
    }

    /// Remove and return up to `n` elements from the head, preserving
    /// order.
    pub async fn drain(&self, n: usize) -> Vec<EnrichedEvent> {
        let mut q = self.inner.lock().await;
        let take = n.min(q.len());
        q.drain(..take).collect()
    }

    /// Prepend `events` to the head, preserving their internal order (the
    /// first element of `events` becomes the new head). If this would
    /// exceed capacity, elements are dropped from the tail (newest) to
    /// make room: requeued events represent work already accepted and
    /// partially attempted, so they take precedence over newer events
    /// already sitting in the queue.
    pub async fn requeue_front(&self, events: Vec<EnrichedEvent>) {
        if events.is_empty() {
            return;
        }
        let mut q = self.inner.lock().await;
        for event in events.into_iter().rev() {
            q.push_front(event);
        }
        while q.len() > self.capacity {
            q.pop_back();
        }
    }

    pub async fn clear(&self) {
        self.inner.lock().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::event::EventType;

    fn event(id: &str) -> EnrichedEvent {
        EnrichedEvent {
            event_type: EventType::Track,
            event: Some(id.to_string()),
            properties: None,
            traits: None,
            anonymous_id: "anon".to_string(),
            user_id: None,
            group_id: None,
            timestamp: "2024-01-01T00:00:00.000Z".to_string(),
            context: Context::library_only("sdk", "1.0.0"),
            message_id: id.to_string(),
            write_key: "wk".to_string(),
            sent_at: None,
        }
    }

    #[tokio::test]
    async fn fifo_under_overflow_keeps_last_n() {
        let q = EventQueue::new(5);
        for i in 0..8 {
            q.enqueue(event(&format!("E{i}"))).await;
        }
        assert_eq!(q.size().await, 5);
        let drained = q.drain(5).await;
        let ids: Vec<_> = drained.iter().map(|e| e.message_id.clone()).collect();
        assert_eq!(ids, vec!["E3", "E4", "E5", "E6", "E7"]);
    }

    #[tokio::test]
    async fn requeue_restores_order() {
        let q = EventQueue::new(10);
        for i in 0..4 {
            q.enqueue(event(&format!("E{i}"))).await;
        }
        let batch = q.drain(4).await;
        assert_eq!(q.size().await, 0);

        q.requeue_front(batch.clone()).await;
        let redrained = q.drain(4).await;
        let orig_ids: Vec<_> = batch.iter().map(|e| &e.message_id).collect();
        let redrained_ids: Vec<_> = redrained.iter().map(|e| &e.message_id).collect();
        assert_eq!(orig_ids, redrained_ids);
    }

    #[tokio::test]
    async fn requeue_front_drops_from_tail_when_over_capacity() {
        let q = EventQueue::new(3);
        q.enqueue(event("existing1")).await;
        q.enqueue(event("existing2")).await;
        q.enqueue(event("existing3")).await;

        // requeue 2 events that must take priority over the newest
        // existing element.
        let requeued = vec![event("r1"), event("r2")];
        q.requeue_front(requeued).await;

        assert_eq!(q.size().await, 3);
        let drained = q.drain(3).await;
        let ids: Vec<_> = drained.iter().map(|e| e.message_id.clone()).collect();
        // r1, r2 preserved at head in order; existing3 (newest) dropped to
        // make room, existing1 survives as the oldest surviving original.
        assert_eq!(ids, vec!["r1", "r2", "existing1"]);
    }

    #[tokio::test]
    async fn clear_empties_queue() {
        let q = EventQueue::new(5);
        q.enqueue(event("a")).await;
        q.clear().await;
        assert_eq!(q.size().await, 0);
    }

    #[tokio::test]
    async fn drain_preserves_remaining_order() {
        let q = EventQueue::new(10);
        for i in 0..3 {
            q.enqueue(event(&format!("E{i}"))).await;
        }
        let first = q.drain(2).await;
        assert_eq!(first.len(), 2);
        assert_eq!(q.size().await, 1);
        let rest = q.drain(10).await;
        assert_eq!(rest[0].message_id, "E2");
    }
}
