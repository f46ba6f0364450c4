//! # Transaction Ledger
//!
//! Append-only store of proposals. A transaction's index is its position;
//! entries are never reordered or deleted.

use super::entities::Transaction;
use crate::errors::WalletError;
use shared_types::entities::{Address, Bytes, TxIndex, U256};

/// Ordered, append-only proposal store.
#[derive(Debug, Clone, Default)]
pub struct TransactionLedger {
    transactions: Vec<Transaction>,
}

impl TransactionLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a new pending transaction and returns its index.
    ///
    /// # Errors
    ///
    /// `ZeroAddress` if `destination` is the null address.
    pub fn append(
        &mut self,
        destination: Address,
        amount: U256,
        payload: Bytes,
    ) -> Result<TxIndex, WalletError> {
        if destination.is_zero() {
            return Err(WalletError::ZeroAddress);
        }
        let index = self.transactions.len();
        self.transactions
            .push(Transaction::new(destination, amount, payload));
        Ok(index)
    }

    /// Looks up a transaction.
    ///
    /// # Errors
    ///
    /// `TransactionNotExist` for an out-of-range index.
    pub fn get(&self, index: TxIndex) -> Result<&Transaction, WalletError> {
        self.transactions
            .get(index)
            .ok_or(WalletError::TransactionNotExist(index))
    }

    pub(crate) fn get_mut(&mut self, index: TxIndex) -> Result<&mut Transaction, WalletError> {
        self.transactions
            .get_mut(index)
            .ok_or(WalletError::TransactionNotExist(index))
    }

    /// Number of transactions ever created.
    #[must_use]
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    /// Returns true if no transaction was ever created.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Indices of transactions not yet executed, ascending.
    #[must_use]
    pub fn pending_indices(&self) -> Vec<TxIndex> {
        self.iter()
            .filter(|(_, tx)| !tx.is_executed())
            .map(|(index, _)| index)
            .collect()
    }

    /// Iterates `(index, transaction)` in ledger order.
    pub fn iter(&self) -> impl Iterator<Item = (TxIndex, &Transaction)> {
        self.transactions.iter().enumerate()
    }

    /// Marks a transaction executed. Terminal.
    ///
    /// # Errors
    ///
    /// `TransactionNotExist`, or `AlreadyExecuted` if already terminal.
    pub fn mark_executed(&mut self, index: TxIndex) -> Result<(), WalletError> {
        let tx = self.get_mut(index)?;
        if tx.executed {
            return Err(WalletError::AlreadyExecuted(index));
        }
        tx.executed = true;
        Ok(())
    }

    /// Copies of the executed transactions, for before/after comparisons.
    /// Pending entries are left out; only executed ones are immutable.
    #[must_use]
    pub fn executed_snapshot(&self) -> Vec<(TxIndex, Transaction)> {
        self.iter()
            .filter(|(_, tx)| tx.is_executed())
            .map(|(index, tx)| (index, tx.clone()))
            .collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================
