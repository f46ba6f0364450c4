//! # Settlement Adapter
//!
//! In-memory settlement runtime for testing and embedding.
//! Accounts without a registered [`CallHandler`] accept any payload.
//!
//! A transfer debits and credits first, then runs the destination's handler
//! with no adapter lock held (the handler may call back into the wallet).
//! Until the handler returns `Ok` the transfer is only provisional: a handler
//! error, a panic or a dropped future restores both balances.

use crate::domain::entities::SettlementCall;
use crate::errors::SettlementError;
use crate::ports::inbound::MultisigWalletApi;
use crate::ports::outbound::SettlementRuntime;
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::entities::{Address, U256};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, warn};

// =============================================================================
// CALL HANDLERS
// =============================================================================

/// Code running at a destination account.
#[async_trait]
pub trait CallHandler: Send + Sync {
    /// Invoked after the value has been credited; `balance` is the
    /// destination's holdings including it. An error reverts the whole
    /// transfer.
    async fn on_call(&self, call: &SettlementCall, balance: U256) -> Result<(), SettlementError>;
}

/// Destination that rejects every call.
#[derive(Debug, Clone)]
pub struct RevertingHandler {
    reason: String,
}

impl RevertingHandler {
    /// Create a handler that always reverts with `reason`.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl CallHandler for RevertingHandler {
    async fn on_call(&self, _call: &SettlementCall, _balance: U256) -> Result<(), SettlementError> {
        Err(SettlementError::Reverted(self.reason.clone()))
    }
}

/// Routes value arriving at a wallet's own address into its deposit entry
/// point. Holds a weak reference so the wallet and the runtime can own each
/// other without a cycle.
pub struct WalletReceiver {
    wallet: Weak<dyn MultisigWalletApi>,
}

impl WalletReceiver {
    /// Create a receiver for `wallet`.
    #[must_use]
    pub fn new(wallet: &Arc<dyn MultisigWalletApi>) -> Self {
        Self {
            wallet: Arc::downgrade(wallet),
        }
    }
}

#[async_trait]
impl CallHandler for WalletReceiver {
    async fn on_call(&self, call: &SettlementCall, balance: U256) -> Result<(), SettlementError> {
        let wallet = self
            .wallet
            .upgrade()
            .ok_or_else(|| SettlementError::Reverted("wallet dropped".into()))?;

        wallet
            .receive(call.from, call.value, balance, Some(call.payload.clone()))
            .await;
        Ok(())
    }
}

// =============================================================================
// IN-MEMORY SETTLEMENT
// =============================================================================

/// In-memory settlement runtime.
#[derive(Default)]
pub struct InMemorySettlement {
    /// Account balances.
    balances: RwLock<HashMap<Address, U256>>,
    /// Code registered at destination accounts.
    handlers: RwLock<HashMap<Address, Arc<dyn CallHandler>>>,
    /// Every call that completed.
    calls: RwLock<Vec<SettlementCall>>,
    /// Simulated outage.
    offline: AtomicBool,
}

impl InMemorySettlement {
    /// Create an empty runtime.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the balance of `address`.
    pub fn set_balance(&self, address: Address, balance: U256) {
        self.balances.write().insert(address, balance);
    }

    /// Balance of `address`, zero if unknown.
    #[must_use]
    pub fn balance(&self, address: &Address) -> U256 {
        self.balances.read().get(address).copied().unwrap_or_default()
    }

    /// Register code at `address`, replacing any earlier handler.
    pub fn register_handler(&self, address: Address, handler: Arc<dyn CallHandler>) {
        self.handlers.write().insert(address, handler);
    }

    /// Remove the code at `address`; it becomes a plain account.
    pub fn clear_handler(&self, address: &Address) {
        self.handlers.write().remove(address);
    }

    /// Simulate the runtime becoming unreachable.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Calls that completed, in completion order.
    #[must_use]
    pub fn completed_calls(&self) -> Vec<SettlementCall> {
        self.calls.read().clone()
    }

    fn ensure_online(&self) -> Result<(), SettlementError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(SettlementError::Unavailable("runtime offline".into()));
        }
        Ok(())
    }

    /// Debit `from` and credit `to`, returning `to`'s new balance.
    fn move_value(&self, from: Address, to: Address, value: U256) -> Result<U256, SettlementError> {
        let mut balances = self.balances.write();

        let available = balances.get(&from).copied().unwrap_or_default();
        if available < value {
            return Err(SettlementError::InsufficientBalance {
                required: value,
                available,
            });
        }
        if from == to {
            return Ok(available);
        }

        let current = balances.get(&to).copied().unwrap_or_default();
        let credited = current
            .checked_add(value)
            .ok_or(SettlementError::BalanceOverflow(to))?;

        balances.insert(from, available - value);
        balances.insert(to, credited);
        Ok(credited)
    }

    fn restore(&self, from: Address, to: Address, value: U256) {
        if from == to {
            return;
        }
        let mut balances = self.balances.write();
        let to_balance = balances.entry(to).or_default();
        *to_balance = to_balance.saturating_sub(value);
        let from_balance = balances.entry(from).or_default();
        *from_balance = from_balance.saturating_add(value);
    }
}

/// A debit and credit not yet accepted by the destination. Restored on
/// drop unless committed.
struct ProvisionalTransfer<'a> {
    runtime: &'a InMemorySettlement,
    from: Address,
    to: Address,
    value: U256,
    committed: bool,
}

impl<'a> ProvisionalTransfer<'a> {
    fn new(runtime: &'a InMemorySettlement, call: &SettlementCall) -> Self {
        Self {
            runtime,
            from: call.from,
            to: call.to,
            value: call.value,
            committed: false,
        }
    }

    fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for ProvisionalTransfer<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.runtime.restore(self.from, self.to, self.value);
        }
    }
}

#[async_trait]
impl SettlementRuntime for InMemorySettlement {
    async fn transfer_and_call(&self, call: SettlementCall) -> Result<(), SettlementError> {
        self.ensure_online()?;
        let credited = self.move_value(call.from, call.to, call.value)?;
        let transfer = ProvisionalTransfer::new(self, &call);

        let handler = self.handlers.read().get(&call.to).cloned();
        if let Some(handler) = handler {
            if let Err(e) = handler.on_call(&call, credited).await {
                drop(transfer);
                warn!(index = call.index, to = %call.to, error = %e, "Settlement call reverted");
                return Err(e);
            }
        }
        transfer.commit();

        debug!(index = call.index, to = %call.to, value = %call.value, "Settlement call completed");
        self.calls.write().push(call);
        Ok(())
    }

    async fn balance_of(&self, address: Address) -> Result<U256, SettlementError> {
        self.ensure_online()?;
        Ok(self.balance(&address))
    }
}

// =============================================================================
// TESTS
// =============================================================================
