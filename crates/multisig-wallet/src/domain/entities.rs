//! # Core Domain Entities
//!
//! The proposal record and the request handed to the settlement runtime.

use serde::{Deserialize, Serialize};
use shared_types::entities::{Address, Bytes, TxIndex, U256};

// =============================================================================
// TRANSACTION
// =============================================================================

/// A proposed value transfer awaiting confirmations.
///
/// `executed` and `confirmation_count` are only changed by the ledger and the
/// confirmation tracker. Once `executed` is true no field changes again.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Account receiving the value.
    pub destination: Address,
    /// Value to transfer.
    pub amount: U256,
    /// Payload forwarded to the destination.
    pub payload: Bytes,
    pub(crate) executed: bool,
    pub(crate) confirmation_count: usize,
}

impl Transaction {
    /// Creates a new pending transaction with no confirmations.
    #[must_use]
    pub fn new(destination: Address, amount: U256, payload: Bytes) -> Self {
        Self {
            destination,
            amount,
            payload,
            executed: false,
            confirmation_count: 0,
        }
    }

    /// Returns true once the transaction has been carried out.
    #[must_use]
    pub fn is_executed(&self) -> bool {
        self.executed
    }

    /// Cached number of owners currently confirming this transaction.
    #[must_use]
    pub fn confirmation_count(&self) -> usize {
        self.confirmation_count
    }

    /// Returns true if the cached count reaches `threshold`.
    #[must_use]
    pub fn has_quorum(&self, threshold: usize) -> bool {
        self.confirmation_count >= threshold
    }

    /// Lifecycle position of this transaction.
    #[must_use]
    pub fn status(&self) -> TransactionStatus {
        if self.executed {
            TransactionStatus::Executed
        } else {
            TransactionStatus::Pending {
                confirmations: self.confirmation_count,
            }
        }
    }
}

/// Transaction lifecycle.
///
/// ```text
/// Pending(n) ──confirm──→ Pending(n+1)
/// Pending(n) ──revoke───→ Pending(n-1)
/// Pending(n) ──execute──→ Executed      (terminal)
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionStatus {
    /// Awaiting confirmations or execution. No expiry.
    Pending {
        /// Current confirmation count.
        confirmations: usize,
    },
    /// Carried out. Terminal.
    Executed,
}

// =============================================================================
// SETTLEMENT CALL
// =============================================================================

/// The value transfer and payload invocation requested from the settlement
/// runtime when a transaction executes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementCall {
    /// Ledger position of the transaction being executed.
    pub index: TxIndex,
    /// Paying account (the wallet itself).
    pub from: Address,
    /// Receiving account.
    pub to: Address,
    /// Value to move.
    pub value: U256,
    /// Payload to run at the destination.
    pub payload: Bytes,
}

// =============================================================================
// TESTS
// =============================================================================
