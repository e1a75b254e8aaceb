//! The broadcast relay.
//!
//! Every connection joins one shared topic. Whatever any connection
//! publishes is delivered to all joined connections, the publisher
//! included, in the order the relay accepted it. Frames are forwarded
//! as they arrived; the relay never looks inside the payload.

use crate::message::{ConnectionId, Envelope};
use circles_protocol::Frame;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, info, trace};

/// Relay errors.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The connection already joined.
    #[error("Connection already joined: {0}")]
    AlreadyConnected(String),

    /// Maximum connections reached.
    #[error("Maximum connections reached ({0})")]
    MaxConnectionsReached(usize),
}

/// Relay configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Maximum number of joined connections.
    pub max_connections: usize,
    /// Events buffered per receiver before a slow receiver starts skipping.
    pub capacity: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            max_connections: 10_000,
            capacity: 1024,
        }
    }
}

/// Single-topic fan-out relay.
pub struct Relay {
    /// Broadcast sender shared by all connections.
    sender: broadcast::Sender<Arc<Envelope>>,
    /// Joined connections and when they joined.
    connections: DashMap<ConnectionId, Instant>,
    /// Number of events published so far.
    relayed: AtomicU64,
    config: RelayConfig,
}

impl Relay {
    /// Create a new relay with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(RelayConfig::default())
    }

    /// Create a new relay with custom configuration.
    #[must_use]
    pub fn with_config(config: RelayConfig) -> Self {
        info!("Creating relay with config: {:?}", config);
        let (sender, _) = broadcast::channel(config.capacity.max(1));
        Self {
            sender,
            connections: DashMap::new(),
            relayed: AtomicU64::new(0),
            config,
        }
    }

    /// Join a connection to the relay.
    ///
    /// Returns the receiver on which the connection gets every frame
    /// published from now on.
    ///
    /// The limit is checked again after inserting, so concurrent joins
    /// never leave more than `max_connections` joined. A join that loses
    /// that race is refused even if a slot frees up right after.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection already joined or the
    /// connection limit is reached.
    pub fn join(
        &self,
        connection_id: &ConnectionId,
    ) -> Result<broadcast::Receiver<Arc<Envelope>>, RelayError> {
        let limit = self.config.max_connections;
        if self.connections.len() >= limit {
            return Err(RelayError::MaxConnectionsReached(limit));
        }

        // The shard guard must be gone before `len()` locks every shard.
        match self.connections.entry(connection_id.clone()) {
            Entry::Occupied(_) => {
                return Err(RelayError::AlreadyConnected(connection_id.to_string()))
            }
            Entry::Vacant(slot) => {
                slot.insert(Instant::now());
            }
        }

        let connections = self.connections.len();
        if connections > limit {
            self.connections.remove(connection_id);
            return Err(RelayError::MaxConnectionsReached(limit));
        }

        let receiver = self.sender.subscribe();
        debug!(connection = %connection_id, connections, "Joined relay");
        Ok(receiver)
    }

    /// Remove a connection from the relay.
    ///
    /// The caller drops the receiver it got from [`Relay::join`].
    /// Returns `true` if the connection had joined.
    pub fn leave(&self, connection_id: &ConnectionId) -> bool {
        match self.connections.remove(connection_id) {
            Some((_, joined_at)) => {
                debug!(
                    connection = %connection_id,
                    connected_for = ?joined_at.elapsed(),
                    "Left relay"
                );
                true
            }
            None => false,
        }
    }

    /// Publish an envelope to every joined connection.
    ///
    /// Returns the number of receivers that got it.
    pub fn publish(&self, envelope: Envelope) -> usize {
        let event = envelope.frame.event;
        let source = envelope.source.clone();
        self.relayed.fetch_add(1, Ordering::Relaxed);
        let count = self.sender.send(Arc::new(envelope)).unwrap_or_default();
        trace!(event = %event, source = ?source, recipients = count, "Relayed frame");
        count
    }

    /// Publish a frame received from `source`.
    pub fn broadcast(&self, source: &ConnectionId, frame: Frame) -> usize {
        self.publish(Envelope::new(frame).with_source(source.clone()))
    }

    /// Check if a connection has joined.
    #[must_use]
    pub fn is_connected(&self, connection_id: &ConnectionId) -> bool {
        self.connections.contains_key(connection_id)
    }

    /// Number of joined connections.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Get relay statistics.
    #[must_use]
    pub fn stats(&self) -> RelayStats {
        RelayStats {
            connection_count: self.connections.len(),
            receiver_count: self.sender.receiver_count(),
            events_relayed: self.relayed.load(Ordering::Relaxed),
        }
    }
}

impl Default for Relay {
    fn default() -> Self {
        Self::new()
    }
}

/// Relay statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayStats {
    /// Number of joined connections.
    pub connection_count: usize,
    /// Number of live broadcast receivers.
    pub receiver_count: usize,
    /// Total events published.
    pub events_relayed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use circles_protocol::{CircleEvent, Event, EventName};
    use serde_json::json;
    use std::sync::Barrier;
    use tokio::sync::broadcast::error::TryRecvError;

    fn circle(initials: &str, x: i32, y: i32) -> Frame {
        Frame::from_event(&Event::add_circle(CircleEvent {
            initials: initials.to_string(),
            x: x.into(),
            y: y.into(),
            diameter: 30.into(),
            color: "rgba(10,20,30,0.4)".to_string(),
        }))
        .unwrap()
    }

    fn clear() -> Frame {
        Frame::new(EventName::ClearCircles)
    }

    fn x_of(envelope: &Envelope) -> i64 {
        envelope.frame.data.as_ref().unwrap()["x"].as_i64().unwrap()
    }

    #[test]
    fn test_join_leave() {
        let relay = Relay::new();
        let a = ConnectionId::new("conn-a");

        let rx = relay.join(&a).unwrap();
        assert!(relay.is_connected(&a));
        assert_eq!(relay.connection_count(), 1);

        assert!(matches!(
            relay.join(&a),
            Err(RelayError::AlreadyConnected(_))
        ));

        assert!(relay.leave(&a));
        drop(rx);
        assert!(!relay.is_connected(&a));
        assert!(!relay.leave(&a));
        assert_eq!(relay.stats().receiver_count, 0);
    }

    #[test]
    fn test_max_connections() {
        let relay = Relay::with_config(RelayConfig {
            max_connections: 1,
            capacity: 8,
        });

        let _rx = relay.join(&"conn-1".into()).unwrap();
        assert!(matches!(
            relay.join(&"conn-2".into()),
            Err(RelayError::MaxConnectionsReached(1))
        ));
        assert!(!relay.is_connected(&"conn-2".into()));
    }

    #[test]
    fn test_concurrent_joins_respect_limit() {
        const LIMIT: usize = 5;
        const THREADS: usize = 32;

        let relay = Relay::with_config(RelayConfig {
            max_connections: LIMIT,
            capacity: 8,
        });
        let barrier = Barrier::new(THREADS);

        let joined: Vec<_> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..THREADS)
                .map(|i| {
                    let relay = &relay;
                    let barrier = &barrier;
                    scope.spawn(move || {
                        barrier.wait();
                        relay.join(&ConnectionId::new(format!("conn-{i}"))).ok()
                    })
                })
                .collect();
            handles
                .into_iter()
                .filter_map(|h| h.join().unwrap())
                .collect()
        });

        assert!(joined.len() <= LIMIT);
        assert_eq!(relay.connection_count(), joined.len());
    }

    #[test]
    fn test_broadcast_reaches_sender_and_others_unchanged() {
        let relay = Relay::new();
        let a = ConnectionId::new("conn-a");
        let b = ConnectionId::new("conn-b");
        let mut rx_a = relay.join(&a).unwrap();
        let mut rx_b = relay.join(&b).unwrap();

        let frame = circle("AB", 50, 80);
        assert_eq!(relay.broadcast(&a, frame.clone()), 2);

        for rx in [&mut rx_a, &mut rx_b] {
            let envelope = rx.try_recv().unwrap();
            assert_eq!(envelope.frame, frame);
            assert_eq!(envelope.source, Some(a.clone()));
            // Exactly one copy.
            assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
        }
    }

    #[test]
    fn test_payload_is_not_interpreted() {
        let relay = Relay::new();
        let a = ConnectionId::new("conn-a");
        let mut rx = relay.join(&a).unwrap();

        let odd = Frame::new(EventName::AddCircle)
            .with_data(json!({ "x": 50.5, "dia": "big", "extra": [1, 2] }));
        relay.broadcast(&a, odd.clone());

        assert_eq!(rx.try_recv().unwrap().frame, odd);
    }

    #[test]
    fn test_receipt_order_across_senders() {
        let relay = Relay::new();
        let a = ConnectionId::new("conn-a");
        let b = ConnectionId::new("conn-b");
        let mut rx_a = relay.join(&a).unwrap();
        let mut rx_b = relay.join(&b).unwrap();

        relay.broadcast(&a, circle("AA", 1, 1));
        relay.broadcast(&b, circle("BB", 2, 2));
        relay.broadcast(&b, circle("BB", 3, 3));

        for rx in [&mut rx_a, &mut rx_b] {
            let xs: Vec<i64> = (0..3).map(|_| x_of(&rx.try_recv().unwrap())).collect();
            assert_eq!(xs, vec![1, 2, 3]);
        }
        assert_eq!(relay.stats().events_relayed, 3);
    }

    #[test]
    fn test_clear_reaches_everyone() {
        let relay = Relay::new();
        let ids: Vec<ConnectionId> = (0..4).map(|i| format!("conn-{i}").as_str().into()).collect();
        let mut receivers: Vec<_> = ids.iter().map(|id| relay.join(id).unwrap()).collect();

        assert_eq!(relay.broadcast(&ids[2], clear()), 4);
        for rx in &mut receivers {
            assert_eq!(rx.try_recv().unwrap().frame, clear());
        }
    }

    #[test]
    fn test_publish_without_connections() {
        let relay = Relay::new();
        assert_eq!(relay.publish(Envelope::new(clear())), 0);
        assert_eq!(relay.stats().events_relayed, 1);
    }

    #[test]
    fn test_late_joiner_sees_only_new_events() {
        let relay = Relay::new();
        let a = ConnectionId::new("conn-a");
        let _rx_a = relay.join(&a).unwrap();
        relay.broadcast(&a, circle("AB", 5, 5));

        let mut rx_b = relay.join(&"conn-b".into()).unwrap();
        assert!(matches!(rx_b.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn test_slow_receiver_skips_without_blocking() {
        let relay = Relay::with_config(RelayConfig {
            max_connections: 10,
            capacity: 2,
        });
        let a = ConnectionId::new("conn-a");
        let mut rx = relay.join(&a).unwrap();

        for x in 0..5 {
            relay.broadcast(&a, circle("AB", x, 0));
        }

        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(3))
        ));
        let next = rx.recv().await.unwrap();
        assert_eq!(x_of(&next), 3);
    }
}
