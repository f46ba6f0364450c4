//! # Shared Bus - Notification Bus for Wallet Events
//!
//! Carries the notifications emitted by the wallet engine to whoever records or
//! indexes them.
//!
//! ## Rules
//!
//! - The engine only ever **publishes**; it never reads from the bus.
//! - Every event travels inside an `EventEnvelope` carrying the emitting wallet's
//!   address and a per-wallet sequence number, so a persistence layer can detect
//!   gaps and order events without trusting delivery order.
//!
//! ```text
//! ┌──────────────┐                    ┌──────────────┐
//! │ Wallet       │                    │ Indexer      │
//! │              │    publish()       │              │
//! │              │ ──────┐            │              │
//! └──────────────┘       │            └──────────────┘
//!                        ▼                    ↑
//!                  ┌──────────────┐          │
//!                  │  Event Bus   │          │
//!                  │              │ ─────────┘
//!                  └──────────────┘  subscribe()
//! ```

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod events;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use events::{EventEnvelope, EventFilter, EventTopic, WalletEvent};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{EventStream, EventSubscriber, Subscription, SubscriptionError};

/// Maximum events to buffer per subscriber before the slowest one lags.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
