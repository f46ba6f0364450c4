//! # Driving Ports (API - Inbound)
//!
//! The operation surface of a multisig wallet. Every mutating call takes the
//! caller's address explicitly; authorization is decided by the engine.

use crate::domain::entities::Transaction;
use crate::errors::WalletError;
use async_trait::async_trait;
use shared_types::entities::{Address, Bytes, TxIndex, U256};

// =============================================================================
// MULTISIG WALLET API (Primary Driving Port)
// =============================================================================

/// Primary API for owners and readers of a wallet.
///
/// ## Usage
///
/// ```ignore
/// let index = wallet.create_transaction(alice, bob, U256::from(5), Bytes::new()).await?;
/// wallet.confirm_transaction(carol, index).await?;
/// wallet.confirm_transaction(dave, index).await?;
/// wallet.execute_transaction(alice, index).await?;
/// ```
#[async_trait]
pub trait MultisigWalletApi: Send + Sync {
    // =========================================================================
    // MEMBERSHIP
    // =========================================================================

    /// Add `new_owner`. Caller must be an owner.
    async fn add_owner(&self, caller: Address, new_owner: Address) -> Result<(), WalletError>;

    /// Remove `owner` and clear its confirmations on pending transactions.
    ///
    /// Removal swaps the last owner into the vacated slot, so the order
    /// returned by `get_owners` is not stable across removals.
    async fn remove_owner(&self, caller: Address, owner: Address) -> Result<(), WalletError>;

    /// Set the number of confirmations required to execute.
    async fn change_threshold(&self, caller: Address, threshold: usize)
        -> Result<(), WalletError>;

    // =========================================================================
    // PROPOSALS
    // =========================================================================

    /// Propose a transfer. Returns the new transaction's index.
    async fn create_transaction(
        &self,
        caller: Address,
        destination: Address,
        amount: U256,
        payload: Bytes,
    ) -> Result<TxIndex, WalletError>;

    /// Record the caller's approval of `index`.
    async fn confirm_transaction(&self, caller: Address, index: TxIndex)
        -> Result<(), WalletError>;

    /// Withdraw the caller's approval of `index`.
    async fn revoke_confirmation(&self, caller: Address, index: TxIndex)
        -> Result<(), WalletError>;

    /// Carry out `index` through the settlement runtime once quorum is met.
    ///
    /// On `ExecutionFailed` the transaction stays pending with its
    /// confirmations intact and may be retried.
    async fn execute_transaction(&self, caller: Address, index: TxIndex)
        -> Result<(), WalletError>;

    // =========================================================================
    // DEPOSITS
    // =========================================================================

    /// Accept an incoming transfer with no associated proposal. Called by the
    /// settlement runtime once `amount` is credited; `balance` is the wallet's
    /// holdings including it. Never fails. `None` and an empty payload are
    /// treated the same.
    async fn receive(&self, sender: Address, amount: U256, balance: U256, payload: Option<Bytes>);

    // =========================================================================
    // READS
    // =========================================================================

    /// Owners in enumeration order.
    async fn get_owners(&self) -> Vec<Address>;

    /// Current threshold.
    async fn get_threshold(&self) -> usize;

    /// Number of transactions ever created.
    async fn get_transaction_count(&self) -> usize;

    /// A copy of the transaction at `index`.
    async fn get_transaction(&self, index: TxIndex) -> Result<Transaction, WalletError>;

    /// Indices of transactions not yet executed, ascending.
    async fn get_pending_transactions(&self) -> Vec<TxIndex>;

    /// Owners currently confirming `index`, sorted by address.
    async fn get_confirmations(&self, index: TxIndex) -> Result<Vec<Address>, WalletError>;
}
