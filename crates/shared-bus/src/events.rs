//! # Wallet Events
//!
//! Defines every notification the wallet engine emits.

use serde::{Deserialize, Serialize};
use shared_types::entities::{Address, Bytes, TxIndex, U256};

/// All notifications that can be published to the bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WalletEvent {
    // =========================================================================
    // PROPOSALS
    // =========================================================================
    /// An owner proposed a new transaction.
    TransactionCreated {
        /// Ledger position of the new transaction.
        index: TxIndex,
        /// Owner who proposed it.
        creator: Address,
        /// Account that will receive the value.
        destination: Address,
        /// Value to transfer.
        amount: U256,
        /// Payload forwarded to the destination.
        payload: Bytes,
    },

    // =========================================================================
    // CONFIRMATIONS
    // =========================================================================
    /// An owner approved a transaction.
    TransactionConfirmed {
        /// Ledger position.
        index: TxIndex,
        /// Approving owner.
        confirmer: Address,
    },

    /// An owner withdrew an earlier approval.
    TransactionRevoked {
        /// Ledger position.
        index: TxIndex,
        /// Owner withdrawing the approval.
        revoker: Address,
    },

    // =========================================================================
    // EXECUTION
    // =========================================================================
    /// A transaction was carried out by the settlement runtime.
    TransactionExecuted {
        /// Ledger position.
        index: TxIndex,
        /// Owner who triggered execution.
        executor: Address,
    },

    // =========================================================================
    // MEMBERSHIP
    // =========================================================================
    /// A new owner joined.
    OwnerAdded {
        /// The new owner.
        owner: Address,
    },

    /// An owner was removed.
    OwnerRemoved {
        /// The removed owner.
        owner: Address,
    },

    /// The confirmation threshold changed.
    RequiredConfirmationsChanged {
        /// The new threshold.
        threshold: usize,
    },

    // =========================================================================
    // TREASURY
    // =========================================================================
    /// Value arrived with no associated proposal.
    Deposit {
        /// Account that sent the value.
        sender: Address,
        /// Value received.
        amount: U256,
        /// Total holdings after the deposit.
        balance: U256,
    },
}

impl WalletEvent {
    /// Get the topic for this event (for filtering).
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::TransactionCreated { .. } => EventTopic::Proposal,
            Self::TransactionConfirmed { .. } | Self::TransactionRevoked { .. } => {
                EventTopic::Confirmation
            }
            Self::TransactionExecuted { .. } => EventTopic::Execution,
            Self::OwnerAdded { .. }
            | Self::OwnerRemoved { .. }
            | Self::RequiredConfirmationsChanged { .. } => EventTopic::Membership,
            Self::Deposit { .. } => EventTopic::Treasury,
        }
    }

    /// The transaction this event refers to, if any.
    #[must_use]
    pub fn transaction_index(&self) -> Option<TxIndex> {
        match self {
            Self::TransactionCreated { index, .. }
            | Self::TransactionConfirmed { index, .. }
            | Self::TransactionRevoked { index, .. }
            | Self::TransactionExecuted { index, .. } => Some(*index),
            _ => None,
        }
    }
}

/// An event together with its origin and ordering information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Address of the wallet that emitted the event.
    pub wallet: Address,
    /// Per-wallet sequence number, starting at 0, incremented per event.
    pub sequence: u64,
    /// The event itself.
    pub event: WalletEvent,
}

impl EventEnvelope {
    /// Wrap an event.
    #[must_use]
    pub fn new(wallet: Address, sequence: u64, event: WalletEvent) -> Self {
        Self {
            wallet,
            sequence,
            event,
        }
    }

    /// Topic of the wrapped event.
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        self.event.topic()
    }
}

/// Event topics for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    /// Transaction proposals.
    Proposal,
    /// Confirmations and revocations.
    Confirmation,
    /// Executions.
    Execution,
    /// Owner set and threshold changes.
    Membership,
    /// Deposits.
    Treasury,
    /// All events (no filtering).
    All,
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
    /// Wallets to include. Empty means all wallets.
    pub wallets: Vec<Address>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self {
            topics,
            wallets: Vec::new(),
        }
    }

    /// Create a filter for events from specific wallets.
    #[must_use]
    pub fn from_wallets(wallets: Vec<Address>) -> Self {
        Self {
            topics: Vec::new(),
            wallets,
        }
    }

    /// Check if an envelope matches this filter.
    #[must_use]
    pub fn matches(&self, envelope: &EventEnvelope) -> bool {
        let topic_match = self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&envelope.topic());

        let wallet_match = self.wallets.is_empty() || self.wallets.contains(&envelope.wallet);

        topic_match && wallet_match
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wallet() -> Address {
        Address::repeat_byte(0xee)
    }

    fn deposit() -> WalletEvent {
        WalletEvent::Deposit {
            sender: Address::repeat_byte(1),
            amount: U256::from(5),
            balance: U256::from(5),
        }
    }

    #[test]
    fn test_event_topic_mapping() {
        assert_eq!(deposit().topic(), EventTopic::Treasury);
        assert_eq!(
            WalletEvent::TransactionRevoked {
                index: 0,
                revoker: Address::repeat_byte(2),
            }
            .topic(),
            EventTopic::Confirmation
        );
        assert_eq!(
            WalletEvent::RequiredConfirmationsChanged { threshold: 2 }.topic(),
            EventTopic::Membership
        );
    }

    #[test]
    fn test_transaction_index() {
        let event = WalletEvent::TransactionExecuted {
            index: 3,
            executor: Address::repeat_byte(1),
        };
        assert_eq!(event.transaction_index(), Some(3));
        assert_eq!(deposit().transaction_index(), None);
    }

    #[test]
    fn test_filter_all() {
        let filter = EventFilter::all();
        assert!(filter.matches(&EventEnvelope::new(wallet(), 0, deposit())));
    }

    #[test]
    fn test_filter_by_topic() {
        let filter = EventFilter::topics(vec![EventTopic::Membership]);

        let membership = EventEnvelope::new(
            wallet(),
            0,
            WalletEvent::OwnerAdded {
                owner: Address::repeat_byte(9),
            },
        );
        assert!(filter.matches(&membership));
        assert!(!filter.matches(&EventEnvelope::new(wallet(), 1, deposit())));
    }

    #[test]
    fn test_filter_by_wallet() {
        let filter = EventFilter::from_wallets(vec![wallet()]);

        assert!(filter.matches(&EventEnvelope::new(wallet(), 0, deposit())));
        assert!(!filter.matches(&EventEnvelope::new(
            Address::repeat_byte(0xdd),
            0,
            deposit()
        )));
    }

    #[test]
    fn test_envelope_serde() {
        let envelope = EventEnvelope::new(wallet(), 7, deposit());
        let json = serde_json::to_string(&envelope).unwrap();
        let back: EventEnvelope = serde_json::from_str(&json).unwrap();
        assert_eq!(envelope, back);
    }
}
