//! # Event Subscriber
//!
//! Receiving side of the bus. Two shapes: a pull [`Subscription`] and a
//! push-style [`EventStream`]. Both apply their filter locally and count
//! envelopes lost to a full buffer.

use crate::events::{EventEnvelope, EventFilter};
use crate::publisher::InterestTable;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::Stream;
use tracing::{debug, warn};

/// Errors from subscription operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// Every publisher handle was dropped.
    #[error("Event bus closed")]
    Closed,
}

/// Anything that can hand out subscriptions.
pub trait EventSubscriber: Send + Sync {
    /// Subscribe to envelopes matching `filter`.
    fn subscribe(&self, filter: EventFilter) -> Subscription;
}

/// A filter booked in the bus's interest table; released on drop.
pub(crate) struct Registration {
    table: Arc<InterestTable>,
    filter: EventFilter,
}

impl Registration {
    pub(crate) fn new(table: Arc<InterestTable>, filter: EventFilter) -> Self {
        table.register(&filter);
        Self { table, filter }
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.table.release(&self.filter);
        debug!(topics = ?self.filter.topics, "Subscription closed");
    }
}

/// Pull-style subscription handle.
pub struct Subscription {
    receiver: broadcast::Receiver<EventEnvelope>,
    registration: Registration,
    missed: u64,
}

impl Subscription {
    pub(crate) fn new(
        receiver: broadcast::Receiver<EventEnvelope>,
        registration: Registration,
    ) -> Self {
        Self {
            receiver,
            registration,
            missed: 0,
        }
    }

    /// Wait for the next matching envelope. `None` once the bus is gone.
    ///
    /// A lagging subscriber skips ahead to the oldest buffered envelope; the
    /// skipped count is added to [`Subscription::missed`].
    pub async fn recv(&mut self) -> Option<EventEnvelope> {
        loop {
            match self.receiver.recv().await {
                Ok(envelope) if self.registration.filter.matches(&envelope) => {
                    return Some(envelope)
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => self.note_lag(skipped),
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Next matching envelope already buffered, if any.
    ///
    /// # Errors
    ///
    /// `Closed` once the bus is gone and the buffer is exhausted.
    pub fn try_recv(&mut self) -> Result<Option<EventEnvelope>, SubscriptionError> {
        loop {
            match self.receiver.try_recv() {
                Ok(envelope) if self.registration.filter.matches(&envelope) => {
                    return Ok(Some(envelope))
                }
                Ok(_) => {}
                Err(TryRecvError::Lagged(skipped)) => self.note_lag(skipped),
                Err(TryRecvError::Empty) => return Ok(None),
                Err(TryRecvError::Closed) => return Err(SubscriptionError::Closed),
            }
        }
    }

    /// Take every matching envelope currently buffered, oldest first.
    pub fn drain(&mut self) -> Vec<EventEnvelope> {
        std::iter::from_fn(|| self.try_recv().ok().flatten()).collect()
    }

    /// Envelopes lost because this subscriber fell behind.
    #[must_use]
    pub fn missed(&self) -> u64 {
        self.missed
    }

    /// The filter applied on receive.
    #[must_use]
    pub fn filter(&self) -> &EventFilter {
        &self.registration.filter
    }

    fn note_lag(&mut self, skipped: u64) {
        self.missed += skipped;
        warn!(skipped, total = self.missed, "Subscriber lagged behind the bus");
    }
}

/// Subscription consumed through `tokio_stream::Stream`.
pub struct EventStream {
    inner: BroadcastStream<EventEnvelope>,
    registration: Registration,
    missed: u64,
}

impl EventStream {
    pub(crate) fn new(
        receiver: broadcast::Receiver<EventEnvelope>,
        registration: Registration,
    ) -> Self {
        Self {
            inner: BroadcastStream::new(receiver),
            registration,
            missed: 0,
        }
    }

    /// Envelopes lost because this stream fell behind.
    #[must_use]
    pub fn missed(&self) -> u64 {
        self.missed
    }

    /// The filter applied on receive.
    #[must_use]
    pub fn filter(&self) -> &EventFilter {
        &self.registration.filter
    }
}

impl Stream for EventStream {
    type Item = EventEnvelope;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            match Pin::new(&mut this.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(envelope))) => {
                    if this.registration.filter.matches(&envelope) {
                        return Poll::Ready(Some(envelope));
                    }
                }
                Poll::Ready(Some(Err(BroadcastStreamRecvError::Lagged(skipped)))) => {
                    this.missed += skipped;
                    warn!(skipped, total = this.missed, "Event stream lagged behind the bus");
                }
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
