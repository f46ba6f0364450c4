//! # Wallet State
//!
//! Composes the owner registry, the ledger and the confirmation tracker.
//! Each method evaluates every precondition before the
//! first mutation, so a failed call changes nothing.
//!
//! ## Precondition Order
//!
//! | Operation            | Checks (in order)                                              |
//! |----------------------|----------------------------------------------------------------|
//! | `add_owner`          | NotOwner, ZeroAddress, DuplicateOwner                          |
//! | `remove_owner`       | NotOwner (caller), NotOwner (target), CannotRemoveLastOwner, InvalidThreshold |
//! | `change_threshold`   | NotOwner, InvalidThreshold                                     |
//! | `create_transaction` | NotOwner, ZeroAddress                                          |
//! | `confirm`            | NotOwner, TransactionNotExist, AlreadyConfirmed, AlreadyExecuted |
//! | `revoke`             | NotOwner, TransactionNotExist, NotConfirmed, AlreadyExecuted |
//! | `prepare_execution`  | NotOwner, TransactionNotExist, NotEnoughConfirmations, AlreadyExecuted |
//!
//! There is no activity flag; nothing here is gated on one.

use super::confirmations::ConfirmationTracker;
use super::entities::{SettlementCall, Transaction};
use super::ledger::TransactionLedger;
use super::owners::OwnerRegistry;
use crate::errors::WalletError;
use shared_types::entities::{Address, Bytes, TxIndex, U256};

/// Everything the engine owns, behind one lock.
#[derive(Debug, Clone)]
pub struct WalletState {
    owners: OwnerRegistry,
    ledger: TransactionLedger,
    confirmations: ConfirmationTracker,
}

impl WalletState {
    /// Builds the initial state.
    ///
    /// # Errors
    ///
    /// The construction errors of [`OwnerRegistry::new`].
    pub fn new(owners: Vec<Address>, threshold: usize) -> Result<Self, WalletError> {
        Ok(Self {
            owners: OwnerRegistry::new(owners, threshold)?,
            ledger: TransactionLedger::new(),
            confirmations: ConfirmationTracker::new(),
        })
    }

    /// Owner registry.
    #[must_use]
    pub fn owners(&self) -> &OwnerRegistry {
        &self.owners
    }

    /// Transaction ledger.
    #[must_use]
    pub fn ledger(&self) -> &TransactionLedger {
        &self.ledger
    }

    /// Confirmation records.
    #[must_use]
    pub fn confirmations(&self) -> &ConfirmationTracker {
        &self.confirmations
    }

    #[cfg(test)]
    pub(crate) fn ledger_mut(&mut self) -> &mut TransactionLedger {
        &mut self.ledger
    }

    #[cfg(test)]
    pub(crate) fn confirmations_mut(&mut self) -> &mut ConfirmationTracker {
        &mut self.confirmations
    }

    // =========================================================================
    // MEMBERSHIP
    // =========================================================================

    /// Adds `new_owner` on behalf of `caller`.
    ///
    /// # Errors
    ///
    /// See the module table.
    pub fn add_owner(&mut self, caller: &Address, new_owner: Address) -> Result<(), WalletError> {
        self.owners.ensure_owner(caller)?;
        self.owners.add_owner(new_owner)
    }

    /// Removes `target` and clears its confirmations on pending transactions,
    /// returning the indices whose count dropped.
    ///
    /// # Errors
    ///
    /// See the module table.
    pub fn remove_owner(
        &mut self,
        caller: &Address,
        target: &Address,
    ) -> Result<Vec<TxIndex>, WalletError> {
        self.owners.ensure_owner(caller)?;
        self.owners.remove_owner(target)?;
        Ok(self.confirmations.clear_owner(&mut self.ledger, target))
    }

    /// Sets the threshold.
    ///
    /// # Errors
    ///
    /// See the module table.
    pub fn change_threshold(&mut self, caller: &Address, threshold: usize) -> Result<(), WalletError> {
        self.owners.ensure_owner(caller)?;
        self.owners.change_threshold(threshold)
    }

    // =========================================================================
    // PROPOSALS AND CONFIRMATIONS
    // =========================================================================

    /// Appends a proposal and returns its index.
    ///
    /// # Errors
    ///
    /// See the module table.
    pub fn create_transaction(
        &mut self,
        caller: &Address,
        destination: Address,
        amount: U256,
        payload: Bytes,
    ) -> Result<TxIndex, WalletError> {
        self.owners.ensure_owner(caller)?;
        self.ledger.append(destination, amount, payload)
    }

    /// Records the caller's confirmation.
    ///
    /// # Errors
    ///
    /// See the module table.
    pub fn confirm(&mut self, caller: &Address, index: TxIndex) -> Result<(), WalletError> {
        self.owners.ensure_owner(caller)?;
        self.confirmations.confirm(&mut self.ledger, index, *caller)
    }

    /// Withdraws the caller's confirmation.
    ///
    /// # Errors
    ///
    /// See the module table.
    pub fn revoke(&mut self, caller: &Address, index: TxIndex) -> Result<(), WalletError> {
        self.owners.ensure_owner(caller)?;
        self.confirmations.revoke(&mut self.ledger, index, *caller)
    }

    // =========================================================================
    // EXECUTION
    // =========================================================================

    /// Runs every execution check against the live state and returns the
    /// call to hand to the settlement runtime. Mutates nothing.
    ///
    /// # Errors
    ///
    /// See the module table.
    pub fn prepare_execution(
        &self,
        caller: &Address,
        index: TxIndex,
        wallet: Address,
    ) -> Result<SettlementCall, WalletError> {
        self.owners.ensure_owner(caller)?;

        let tx: &Transaction = self.ledger.get(index)?;
        let required = self.owners.threshold();
        if !tx.has_quorum(required) {
            return Err(WalletError::NotEnoughConfirmations {
                index,
                confirmations: tx.confirmation_count(),
                required,
            });
        }
        if tx.is_executed() {
            return Err(WalletError::AlreadyExecuted(index));
        }

        Ok(SettlementCall {
            index,
            from: wallet,
            to: tx.destination,
            value: tx.amount,
            payload: tx.payload.clone(),
        })
    }

    /// Marks a transaction executed after the settlement runtime succeeded.
    ///
    /// # Errors
    ///
    /// `TransactionNotExist` or `AlreadyExecuted`.
    pub fn finalize_execution(&mut self, index: TxIndex) -> Result<(), WalletError> {
        self.ledger.mark_executed(index)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const WALLET: Address = Address::new([0xee; 20]);

    fn addr(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    /// Owners A=1, B=2, C=3, threshold 2, one pending transaction to D=0xd0.
    fn state() -> WalletState {
        let mut state = WalletState::new(vec![addr(1), addr(2), addr(3)], 2).unwrap();
        state
            .create_transaction(&addr(1), addr(0xd0), U256::from(5), Bytes::new())
            .unwrap();
        state
    }

    #[test]
    fn test_non_owner_rejected_everywhere() {
        let mut state = state();
        let outsider = addr(9);
        let expected = Err(WalletError::NotOwner(outsider));

        assert_eq!(state.add_owner(&outsider, addr(4)), expected);
        assert_eq!(state.change_threshold(&outsider, 1), expected);
        assert_eq!(state.confirm(&outsider, 0), expected);
        assert_eq!(state.revoke(&outsider, 0), expected);
        assert_eq!(
            state.remove_owner(&outsider, &addr(1)).map(|_| ()),
            expected
        );
        assert_eq!(
            state
                .create_transaction(&outsider, addr(0xd0), U256::one(), Bytes::new())
                .map(|_| ()),
            expected
        );
        assert_eq!(
            state.prepare_execution(&outsider, 0, WALLET).map(|_| ()),
            expected
        );
    }

    #[test]
    fn test_remove_owner_cascades_confirmations() {
        let mut state = state();
        state.confirm(&addr(2), 0).unwrap();

        let cleared = state.remove_owner(&addr(1), &addr(2)).unwrap();

        assert_eq!(cleared, vec![0]);
        assert_eq!(state.ledger().get(0).unwrap().confirmation_count(), 0);
        assert!(state.confirmations().confirmations(0).is_empty());
    }

    #[test]
    fn test_remove_owner_target_not_owner() {
        let mut state = state();
        assert_eq!(
            state.remove_owner(&addr(1), &addr(9)),
            Err(WalletError::NotOwner(addr(9)))
        );
    }

    #[test]
    fn test_prepare_execution_order() {
        let mut state = state();

        assert_eq!(
            state.prepare_execution(&addr(1), 5, WALLET),
            Err(WalletError::TransactionNotExist(5))
        );
        assert_eq!(
            state.prepare_execution(&addr(1), 0, WALLET),
            Err(WalletError::NotEnoughConfirmations {
                index: 0,
                confirmations: 0,
                required: 2
            })
        );

        state.confirm(&addr(2), 0).unwrap();
        state.confirm(&addr(3), 0).unwrap();
        let call = state.prepare_execution(&addr(1), 0, WALLET).unwrap();
        assert_eq!(call.from, WALLET);
        assert_eq!(call.to, addr(0xd0));
        assert_eq!(call.value, U256::from(5));

        state.finalize_execution(0).unwrap();
        assert_eq!(
            state.prepare_execution(&addr(1), 0, WALLET),
            Err(WalletError::AlreadyExecuted(0))
        );
    }

    #[test]
    fn test_executed_below_raised_threshold_reports_quorum_first() {
        let mut state = state();
        state.confirm(&addr(2), 0).unwrap();
        state.confirm(&addr(3), 0).unwrap();
        state.finalize_execution(0).unwrap();
        state.change_threshold(&addr(1), 3).unwrap();

        assert!(matches!(
            state.prepare_execution(&addr(1), 0, WALLET),
            Err(WalletError::NotEnoughConfirmations { .. })
        ));
    }

    #[test]
    fn test_create_checks_owner_before_destination() {
        let mut state = state();

        assert_eq!(
            state.create_transaction(&addr(9), Address::ZERO, U256::one(), Bytes::new()),
            Err(WalletError::NotOwner(addr(9)))
        );
        assert_eq!(
            state.create_transaction(&addr(1), Address::ZERO, U256::one(), Bytes::new()),
            Err(WalletError::ZeroAddress)
        );
        assert_eq!(state.ledger().len(), 1);
    }
}
