//! # Event Publisher
//!
//! Publishing side of the bus, plus the bookkeeping an indexer needs to trust
//! what it receives: per-wallet sequence heads and drop counters.

use crate::events::{EventEnvelope, EventFilter, EventTopic};
use crate::subscriber::{EventStream, EventSubscriber, Registration, Subscription};
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::entities::Address;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, trace, warn};

/// Sink for wallet notifications.
///
/// The wallet engine holds one of these and nothing else from the bus.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Deliver an envelope. Returns how many subscribers were handed a copy.
    async fn publish(&self, envelope: EventEnvelope) -> usize;

    /// Envelopes accepted so far, delivered or not.
    fn events_published(&self) -> u64;
}

/// How many live subscriptions asked for each topic.
///
/// A filter with no topics (or with [`EventTopic::All`]) is booked under
/// `All` and counts toward every topic.
#[derive(Debug, Default)]
pub(crate) struct InterestTable {
    by_topic: Mutex<HashMap<EventTopic, usize>>,
}

impl InterestTable {
    fn keys(filter: &EventFilter) -> Vec<EventTopic> {
        if filter.topics.is_empty() || filter.topics.contains(&EventTopic::All) {
            vec![EventTopic::All]
        } else {
            filter.topics.clone()
        }
    }

    pub(crate) fn register(&self, filter: &EventFilter) {
        let mut table = self.by_topic.lock();
        for topic in Self::keys(filter) {
            *table.entry(topic).or_default() += 1;
        }
    }

    pub(crate) fn release(&self, filter: &EventFilter) {
        let mut table = self.by_topic.lock();
        for topic in Self::keys(filter) {
            if let Some(count) = table.get_mut(&topic) {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    table.remove(&topic);
                }
            }
        }
    }

    fn interested(&self, topic: EventTopic) -> usize {
        let table = self.by_topic.lock();
        let wildcard = table.get(&EventTopic::All).copied().unwrap_or(0);
        if topic == EventTopic::All {
            return wildcard;
        }
        wildcard + table.get(&topic).copied().unwrap_or(0)
    }
}

/// Single-process bus over `tokio::sync::broadcast`.
///
/// Nothing is retained for late subscribers: an indexer has to subscribe
/// before the wallets it follows start emitting.
pub struct InMemoryEventBus {
    sender: broadcast::Sender<EventEnvelope>,
    interest: Arc<InterestTable>,
    /// Last sequence seen per emitting wallet.
    heads: Mutex<HashMap<Address, u64>>,
    published: AtomicU64,
    undelivered: AtomicU64,
    capacity: usize,
}

impl InMemoryEventBus {
    /// Bus buffering [`DEFAULT_CHANNEL_CAPACITY`] envelopes per subscriber.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Bus with a custom per-subscriber buffer.
    ///
    /// # Panics
    ///
    /// If `capacity` is zero (a `broadcast` channel cannot be empty).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            interest: Arc::new(InterestTable::default()),
            heads: Mutex::new(HashMap::new()),
            published: AtomicU64::new(0),
            undelivered: AtomicU64::new(0),
            capacity,
        }
    }

    /// Open a pull-style subscription.
    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        debug!(
            topics = ?filter.topics,
            wallets = filter.wallets.len(),
            "Subscription opened"
        );
        let registration = Registration::new(Arc::clone(&self.interest), filter);
        Subscription::new(self.sender.subscribe(), registration)
    }

    /// Open a subscription consumed as a `Stream`.
    #[must_use]
    pub fn event_stream(&self, filter: EventFilter) -> EventStream {
        let registration = Registration::new(Arc::clone(&self.interest), filter);
        EventStream::new(self.sender.subscribe(), registration)
    }

    /// Live receivers, whatever their filters.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Live subscriptions whose filter admits `topic`.
    #[must_use]
    pub fn interest(&self, topic: EventTopic) -> usize {
        self.interest.interested(topic)
    }

    /// Highest sequence number published so far by `wallet`.
    #[must_use]
    pub fn last_sequence(&self, wallet: &Address) -> Option<u64> {
        self.heads.lock().get(wallet).copied()
    }

    /// Envelopes published while no receiver was attached.
    #[must_use]
    pub fn events_undelivered(&self) -> u64 {
        self.undelivered.load(Ordering::Relaxed)
    }

    /// Per-subscriber buffer size.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Record the envelope's sequence against its wallet's head.
    ///
    /// Out-of-order or skipped sequences are logged, never rejected.
    fn advance_head(&self, envelope: &EventEnvelope) {
        let mut heads = self.heads.lock();
        let expected = heads.get(&envelope.wallet).map_or(0, |last| last + 1);
        if envelope.sequence != expected {
            warn!(
                wallet = %envelope.wallet,
                expected,
                got = envelope.sequence,
                "Sequence discontinuity"
            );
        }
        let head = heads.entry(envelope.wallet).or_insert(envelope.sequence);
        *head = (*head).max(envelope.sequence);
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSubscriber for InMemoryEventBus {
    fn subscribe(&self, filter: EventFilter) -> Subscription {
        InMemoryEventBus::subscribe(self, filter)
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, envelope: EventEnvelope) -> usize {
        self.advance_head(&envelope);
        self.published.fetch_add(1, Ordering::Relaxed);

        let topic = envelope.topic();
        let wallet = envelope.wallet;
        let sequence = envelope.sequence;

        if let Ok(receivers) = self.sender.send(envelope) {
            trace!(?topic, %wallet, sequence, receivers, "Envelope delivered");
            receivers
        } else {
            self.undelivered.fetch_add(1, Ordering::Relaxed);
            debug!(?topic, %wallet, sequence, "No subscribers, envelope discarded");
            0
        }
    }

    fn events_published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::WalletEvent;

    const WALLET: Address = Address::repeat_byte(0xee);

    fn added(sequence: u64) -> EventEnvelope {
        EventEnvelope::new(
            WALLET,
            sequence,
            WalletEvent::OwnerAdded {
                owner: Address::repeat_byte(1),
            },
        )
    }

    #[tokio::test]
    async fn test_unobserved_publish_is_counted() {
        let bus = InMemoryEventBus::new();

        assert_eq!(bus.publish(added(0)).await, 0);
        assert_eq!(bus.events_published(), 1);
        assert_eq!(bus.events_undelivered(), 1);
        assert_eq!(bus.last_sequence(&WALLET), Some(0));
    }

    #[tokio::test]
    async fn test_every_receiver_gets_a_copy() {
        let bus = InMemoryEventBus::new();
        let _all = bus.subscribe(EventFilter::all());
        let _members = bus.subscribe(EventFilter::topics(vec![EventTopic::Membership]));
        let _treasury = bus.subscribe(EventFilter::topics(vec![EventTopic::Treasury]));

        // Filtering happens on the receiving side
        assert_eq!(bus.publish(added(0)).await, 3);
        assert_eq!(bus.subscriber_count(), 3);
        assert_eq!(bus.events_undelivered(), 0);
    }

    #[test]
    fn test_interest_by_topic() {
        let bus = InMemoryEventBus::new();
        let _all = bus.subscribe(EventFilter::all());
        let members = bus.subscribe(EventFilter::topics(vec![
            EventTopic::Membership,
            EventTopic::Execution,
        ]));

        assert_eq!(bus.interest(EventTopic::Membership), 2);
        assert_eq!(bus.interest(EventTopic::Execution), 2);
        assert_eq!(bus.interest(EventTopic::Treasury), 1);

        drop(members);
        assert_eq!(bus.interest(EventTopic::Membership), 1);
        assert_eq!(bus.interest(EventTopic::All), 1);
    }

    #[tokio::test]
    async fn test_sequence_gap_does_not_block_delivery() {
        let bus = InMemoryEventBus::new();
        let mut sub = bus.subscribe(EventFilter::all());

        bus.publish(added(0)).await;
        bus.publish(added(4)).await;
        bus.publish(added(2)).await;

        assert_eq!(bus.last_sequence(&WALLET), Some(4));
        assert_eq!(sub.drain().len(), 3);
        assert_eq!(bus.last_sequence(&Address::repeat_byte(1)), None);
    }

    #[test]
    fn test_custom_capacity() {
        let bus = InMemoryEventBus::with_capacity(16);
        assert_eq!(bus.capacity(), 16);
        assert_eq!(InMemoryEventBus::default().capacity(), DEFAULT_CHANNEL_CAPACITY);
    }
}
