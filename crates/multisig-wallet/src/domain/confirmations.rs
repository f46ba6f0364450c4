//! # Confirmation Tracker
//!
//! Per-transaction, per-owner approval records. Each transaction caches its
//! confirmation count; every mutation here updates record and count together.
//!
//! Owner removal calls [`ConfirmationTracker::clear_owner`], which scans every
//! pending transaction. Executed transactions keep their records untouched.

use super::ledger::TransactionLedger;
use crate::errors::WalletError;
use shared_types::entities::{Address, TxIndex};
use std::collections::{BTreeSet, HashMap};

/// Approval bookkeeping, keyed by ledger position.
#[derive(Debug, Clone, Default)]
pub struct ConfirmationTracker {
    /// Owners holding a true record, per transaction.
    records: HashMap<TxIndex, BTreeSet<Address>>,
}

impl ConfirmationTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `owner`'s approval and increments the cached count.
    ///
    /// # Errors
    ///
    /// `TransactionNotExist`, `AlreadyConfirmed`, then `AlreadyExecuted`.
    pub fn confirm(
        &mut self,
        ledger: &mut TransactionLedger,
        index: TxIndex,
        owner: Address,
    ) -> Result<(), WalletError> {
        let tx = ledger.get_mut(index)?;
        if self.is_confirmed(index, &owner) {
            return Err(WalletError::AlreadyConfirmed { index, owner });
        }
        if tx.executed {
            return Err(WalletError::AlreadyExecuted(index));
        }

        self.records.entry(index).or_default().insert(owner);
        tx.confirmation_count += 1;
        Ok(())
    }

    /// Withdraws `owner`'s approval and decrements the cached count.
    ///
    /// # Errors
    ///
    /// `TransactionNotExist`, `NotConfirmed`, then `AlreadyExecuted`.
    pub fn revoke(
        &mut self,
        ledger: &mut TransactionLedger,
        index: TxIndex,
        owner: Address,
    ) -> Result<(), WalletError> {
        let tx = ledger.get_mut(index)?;
        if !self.is_confirmed(index, &owner) {
            return Err(WalletError::NotConfirmed { index, owner });
        }
        if tx.executed {
            return Err(WalletError::AlreadyExecuted(index));
        }

        self.remove_record(index, &owner);
        tx.confirmation_count = tx.confirmation_count.saturating_sub(1);
        Ok(())
    }

    /// Returns true if `owner` holds a true record for `index`.
    #[must_use]
    pub fn is_confirmed(&self, index: TxIndex, owner: &Address) -> bool {
        self.records
            .get(&index)
            .is_some_and(|owners| owners.contains(owner))
    }

    /// Owners confirming `index`, sorted by address.
    #[must_use]
    pub fn confirmations(&self, index: TxIndex) -> Vec<Address> {
        self.records
            .get(&index)
            .map(|owners| owners.iter().copied().collect())
            .unwrap_or_default()
    }

    /// True count of records for `index`, recomputed from the records.
    #[must_use]
    pub fn count(&self, index: TxIndex) -> usize {
        self.records.get(&index).map_or(0, BTreeSet::len)
    }

    /// Clears `owner`'s record on every pending transaction and decrements
    /// the affected counts. Returns the affected indices in ascending order.
    pub fn clear_owner(&mut self, ledger: &mut TransactionLedger, owner: &Address) -> Vec<TxIndex> {
        let mut cleared = Vec::new();

        for index in ledger.pending_indices() {
            if !self.remove_record(index, owner) {
                continue;
            }
            if let Ok(tx) = ledger.get_mut(index) {
                tx.confirmation_count = tx.confirmation_count.saturating_sub(1);
            }
            cleared.push(index);
        }

        cleared
    }

    fn remove_record(&mut self, index: TxIndex, owner: &Address) -> bool {
        let Some(owners) = self.records.get_mut(&index) else {
            return false;
        };
        let removed = owners.remove(owner);
        if owners.is_empty() {
            self.records.remove(&index);
        }
        removed
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::entities::{Bytes, U256};

    fn addr(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    fn ledger_with(count: usize) -> TransactionLedger {
        let mut ledger = TransactionLedger::new();
        for _ in 0..count {
            ledger
                .append(addr(0xd0), U256::from(5), Bytes::new())
                .unwrap();
        }
        ledger
    }

    #[test]
    fn test_confirm_increments_count() {
        let mut ledger = ledger_with(1);
        let mut tracker = ConfirmationTracker::new();

        tracker.confirm(&mut ledger, 0, addr(2)).unwrap();
        tracker.confirm(&mut ledger, 0, addr(1)).unwrap();

        assert_eq!(ledger.get(0).unwrap().confirmation_count(), 2);
        assert_eq!(tracker.count(0), 2);
        // Sorted by address, not by confirmation order
        assert_eq!(tracker.confirmations(0), vec![addr(1), addr(2)]);
    }

    #[test]
    fn test_double_confirm_rejected() {
        let mut ledger = ledger_with(1);
        let mut tracker = ConfirmationTracker::new();

        tracker.confirm(&mut ledger, 0, addr(1)).unwrap();
        assert_eq!(
            tracker.confirm(&mut ledger, 0, addr(1)),
            Err(WalletError::AlreadyConfirmed {
                index: 0,
                owner: addr(1)
            })
        );
        assert_eq!(ledger.get(0).unwrap().confirmation_count(), 1);
    }

    #[test]
    fn test_confirm_missing_transaction() {
        let mut ledger = ledger_with(0);
        let mut tracker = ConfirmationTracker::new();

        assert_eq!(
            tracker.confirm(&mut ledger, 3, addr(1)),
            Err(WalletError::TransactionNotExist(3))
        );
    }

    #[test]
    fn test_revoke_decrements_count() {
        let mut ledger = ledger_with(1);
        let mut tracker = ConfirmationTracker::new();

        tracker.confirm(&mut ledger, 0, addr(1)).unwrap();
        tracker.revoke(&mut ledger, 0, addr(1)).unwrap();

        assert_eq!(ledger.get(0).unwrap().confirmation_count(), 0);
        assert!(!tracker.is_confirmed(0, &addr(1)));
        assert!(tracker.confirmations(0).is_empty());
    }

    #[test]
    fn test_revoke_without_confirmation() {
        let mut ledger = ledger_with(1);
        let mut tracker = ConfirmationTracker::new();

        assert_eq!(
            tracker.revoke(&mut ledger, 0, addr(1)),
            Err(WalletError::NotConfirmed {
                index: 0,
                owner: addr(1)
            })
        );
    }

    #[test]
    fn test_executed_transaction_is_frozen() {
        let mut ledger = ledger_with(1);
        let mut tracker = ConfirmationTracker::new();
        tracker.confirm(&mut ledger, 0, addr(1)).unwrap();
        ledger.mark_executed(0).unwrap();

        assert_eq!(
            tracker.confirm(&mut ledger, 0, addr(2)),
            Err(WalletError::AlreadyExecuted(0))
        );
        assert_eq!(
            tracker.revoke(&mut ledger, 0, addr(1)),
            Err(WalletError::AlreadyExecuted(0))
        );
        // Record-level conflicts are reported first
        assert_eq!(
            tracker.confirm(&mut ledger, 0, addr(1)),
            Err(WalletError::AlreadyConfirmed {
                index: 0,
                owner: addr(1)
            })
        );
        assert_eq!(ledger.get(0).unwrap().confirmation_count(), 1);
    }

    #[test]
    fn test_clear_owner_only_touches_pending() {
        let mut ledger = ledger_with(3);
        let mut tracker = ConfirmationTracker::new();
        for index in 0..3 {
            tracker.confirm(&mut ledger, index, addr(1)).unwrap();
            tracker.confirm(&mut ledger, index, addr(2)).unwrap();
        }
        ledger.mark_executed(1).unwrap();

        let cleared = tracker.clear_owner(&mut ledger, &addr(2));

        assert_eq!(cleared, vec![0, 2]);
        assert_eq!(ledger.get(0).unwrap().confirmation_count(), 1);
        assert_eq!(ledger.get(2).unwrap().confirmation_count(), 1);
        // Executed transaction keeps its history
        assert_eq!(ledger.get(1).unwrap().confirmation_count(), 2);
        assert!(tracker.is_confirmed(1, &addr(2)));
    }

    #[test]
    fn test_clear_owner_without_records() {
        let mut ledger = ledger_with(2);
        let mut tracker = ConfirmationTracker::new();
        tracker.confirm(&mut ledger, 0, addr(1)).unwrap();

        assert!(tracker.clear_owner(&mut ledger, &addr(7)).is_empty());
        assert_eq!(ledger.get(0).unwrap().confirmation_count(), 1);
    }
}
