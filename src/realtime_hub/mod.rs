//! RealtimeHub - Live Event Distribution
//!
//! ## Responsibilities
//!
//! - Subscriber registration (one unbounded queue per subscriber)
//! - Event broadcasting to every currently connected subscriber
//! - Releasing subscriber resources on disconnect
//!
//! Note: There is no replay. A subscriber only sees events published after it
//! subscribed; history comes from the event log.

use crate::event_normalizer::Event;
use futures::Stream;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use uuid::Uuid;

type Connections = RwLock<HashMap<Uuid, mpsc::UnboundedSender<Event>>>;

/// RealtimeHub instance
pub struct RealtimeHub {
    connections: Arc<Connections>,
    published_count: AtomicU64,
}

impl RealtimeHub {
    /// Create new RealtimeHub
    pub fn new() -> Self {
        Self {
            connections: Arc::new(RwLock::new(HashMap::new())),
            published_count: AtomicU64::new(0),
        }
    }

    /// Register a new subscriber
    pub fn subscribe(&self) -> Subscription {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();

        self.connections
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, tx);

        tracing::info!(subscriber_id = %id, "Subscriber connected");

        Subscription {
            id,
            rx,
            connections: Arc::downgrade(&self.connections),
        }
    }

    /// Deliver an event to every current subscriber
    ///
    /// Never blocks: each subscriber owns an unbounded queue. Subscribers whose
    /// receiver is gone are pruned.
    pub fn publish(&self, event: &Event) {
        self.published_count.fetch_add(1, Ordering::Relaxed);

        let mut closed = Vec::new();
        {
            let connections = self.connections.read().unwrap_or_else(|e| e.into_inner());
            tracing::debug!(
                event_id = ?event.id(),
                kind = event.kind().as_str(),
                subscriber_count = connections.len(),
                "Publishing event"
            );

            for (id, tx) in connections.iter() {
                if tx.send(event.clone()).is_err() {
                    closed.push(*id);
                }
            }
        }

        if !closed.is_empty() {
            let mut connections = self.connections.write().unwrap_or_else(|e| e.into_inner());
            for id in closed {
                connections.remove(&id);
                tracing::debug!(subscriber_id = %id, "Pruned closed subscriber");
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.connections.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Number of events published since startup
    pub fn published_count(&self) -> u64 {
        self.published_count.load(Ordering::Relaxed)
    }
}

impl Default for RealtimeHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Live subscription handle
///
/// Yields events in publish order. Dropping it unregisters the subscriber.
pub struct Subscription {
    id: Uuid,
    rx: mpsc::UnboundedReceiver<Event>,
    connections: std::sync::Weak<Connections>,
}

impl Subscription {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Wait for the next event; `None` once the hub is gone
    pub async fn recv(&mut self) -> Option<Event> {
        self.rx.recv().await
    }

    /// Next already-queued event, if any
    pub fn try_recv(&mut self) -> Option<Event> {
        self.rx.try_recv().ok()
    }
}

impl Stream for Subscription {
    type Item = Event;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Event>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(connections) = self.connections.upgrade() {
            connections
                .write()
                .unwrap_or_else(|e| e.into_inner())
                .remove(&self.id);
        }
        tracing::info!(subscriber_id = %self.id, "Subscriber disconnected");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_normalizer::{EventNormalizer, PartialEvent};
    use futures::StreamExt;

    fn motion(corr: &str) -> Event {
        EventNormalizer::new().normalize(PartialEvent::motion_detected(corr))
    }

    #[tokio::test]
    async fn test_subscriber_before_publish_receives_event() {
        let hub = RealtimeHub::new();
        let mut sub = hub.subscribe();

        let event = motion("motion-1");
        hub.publish(&event);

        assert_eq!(sub.recv().await, Some(event));
    }

    #[tokio::test]
    async fn test_late_subscriber_gets_no_replay() {
        let hub = RealtimeHub::new();
        hub.publish(&motion("motion-1"));

        let mut late = hub.subscribe();
        assert!(late.try_recv().is_none());

        let second = motion("motion-2");
        hub.publish(&second);
        assert_eq!(late.try_recv(), Some(second));
    }

    #[tokio::test]
    async fn test_events_arrive_in_publish_order_for_every_subscriber() {
        let hub = RealtimeHub::new();
        let mut a = hub.subscribe();
        let mut b = hub.subscribe();

        let events: Vec<Event> = (0..5).map(|i| motion(&format!("motion-{}", i))).collect();
        for event in &events {
            hub.publish(event);
        }

        let got_a: Vec<Event> = (&mut a).take(5).collect().await;
        let got_b: Vec<Event> = (&mut b).take(5).collect().await;
        assert_eq!(got_a, events);
        assert_eq!(got_b, events);
    }

    #[tokio::test]
    async fn test_slow_subscriber_does_not_block_others() {
        let hub = RealtimeHub::new();
        let _idle = hub.subscribe();
        let mut active = hub.subscribe();

        for i in 0..1000 {
            hub.publish(&motion(&format!("motion-{}", i)));
        }

        let mut received = 0;
        while active.try_recv().is_some() {
            received += 1;
        }
        assert_eq!(received, 1000);
    }

    #[tokio::test]
    async fn test_drop_releases_subscriber() {
        let hub = RealtimeHub::new();
        let sub = hub.subscribe();
        assert_eq!(hub.subscriber_count(), 1);

        drop(sub);
        assert_eq!(hub.subscriber_count(), 0);

        // Publishing with nobody attached is fine
        hub.publish(&motion("motion-1"));
        assert_eq!(hub.published_count(), 1);
    }
}
