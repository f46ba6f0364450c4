//! # Multisig Wallet Service
//!
//! The execution engine: composes the domain state with the execution guard,
//! the settlement runtime and the event bus.
//!
//! ## Concurrency
//!
//! All wallet state sits behind one `tokio::sync::Mutex`, so mutating calls
//! run one at a time. Events are published while that lock is held, so their
//! sequence order is the mutation order.
//!
//! `execute_transaction` releases the lock while the settlement call is
//! outstanding. The destination may call back in during that window:
//!
//! - reads and deposits proceed normally
//! - every other mutating call fails with `ReentrantCall`, checked first
//! - a nested `execute_transaction` runs its own checks, then fails with
//!   `ReentrantCall` on guard acquisition
//!
//! The `executed` flag is set only after the settlement runtime reports
//! success; the guard covers the window in between.
//!
//! ## Cancellation
//!
//! Once the guard is taken, the settlement call and the recording of its
//! outcome run in a spawned task that owns the guard. Dropping the
//! `execute_transaction` future does not stop it: the transfer either
//! completes and the transaction is marked executed, or fails and the
//! transaction stays pending. Either way the guard is released only after.

use crate::adapters::{InMemorySettlement, WalletReceiver};
use crate::config::WalletConfig;
use crate::domain::entities::Transaction;
use crate::domain::invariants::{check_all_invariants, InvariantCheckResult};
use crate::domain::state::WalletState;
use crate::errors::{SettlementError, WalletError};
use crate::guard::ExecutionGuard;
use crate::ports::inbound::MultisigWalletApi;
use crate::ports::outbound::SettlementRuntime;

use async_trait::async_trait;
use shared_bus::{EventEnvelope, EventPublisher, InMemoryEventBus, WalletEvent};
use shared_types::entities::{Address, Bytes, TxIndex, U256};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, instrument, warn, Instrument, Span};

/// Statistics for a wallet.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WalletStats {
    /// Proposals created.
    pub transactions_created: u64,
    /// Confirmations recorded.
    pub confirmations: u64,
    /// Confirmations withdrawn by their owner.
    pub revocations: u64,
    /// Confirmations cleared by owner removal.
    pub confirmations_cleared: u64,
    /// Executions the settlement runtime carried out.
    pub executions_succeeded: u64,
    /// Executions the settlement runtime rejected.
    pub executions_failed: u64,
    /// Calls rejected by the execution guard.
    pub reentrant_rejections: u64,
    /// Calls rejected by any other precondition.
    pub rejected_calls: u64,
    /// Deposits accepted.
    pub deposits: u64,
}

/// Executed transactions copied before a mutation (debug builds only).
type ExecutedSnapshot = Option<Vec<(TxIndex, Transaction)>>;

/// State and notification plumbing, shared with the detached half of an
/// execution.
struct WalletCore {
    address: Address,
    state: Mutex<WalletState>,
    publisher: Arc<dyn EventPublisher>,
    /// Next event sequence number.
    sequence: AtomicU64,
    stats: RwLock<WalletStats>,
}

/// A quorum-gated wallet.
pub struct MultisigWallet<S: SettlementRuntime> {
    /// The wallet's own account.
    address: Address,
    core: Arc<WalletCore>,
    /// Held while a settlement call is outstanding.
    executing: Arc<AtomicBool>,
    /// Runtime that moves value.
    settlement: Arc<S>,
}

impl<S: SettlementRuntime + 'static> MultisigWallet<S> {
    /// Build a wallet from its configuration.
    ///
    /// # Errors
    ///
    /// `ZeroAddress` for a null wallet address, otherwise the owner and
    /// threshold construction errors, in list order.
    pub fn new(
        config: WalletConfig,
        settlement: Arc<S>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Result<Self, WalletError> {
        if config.address.is_zero() {
            return Err(WalletError::ZeroAddress);
        }
        let state = WalletState::new(config.owners, config.threshold)?;

        info!(
            wallet = %config.address,
            owners = state.owners().len(),
            threshold = state.owners().threshold(),
            "Wallet created"
        );

        Ok(Self {
            address: config.address,
            core: Arc::new(WalletCore {
                address: config.address,
                state: Mutex::new(state),
                publisher,
                sequence: AtomicU64::new(0),
                stats: RwLock::new(WalletStats::default()),
            }),
            executing: Arc::new(AtomicBool::new(false)),
            settlement,
        })
    }

    /// The wallet's own account.
    #[must_use]
    pub fn address(&self) -> Address {
        self.address
    }

    /// Returns true while a settlement call is outstanding.
    #[must_use]
    pub fn is_executing(&self) -> bool {
        ExecutionGuard::is_held(&self.executing)
    }

    /// Current statistics.
    pub async fn stats(&self) -> WalletStats {
        self.core.stats.read().await.clone()
    }

    // =========================================================================
    // MEMBERSHIP
    // =========================================================================

    /// Add `new_owner`.
    ///
    /// # Errors
    ///
    /// `ReentrantCall`, `NotOwner`, `ZeroAddress`, `DuplicateOwner`.
    #[instrument(skip(self), fields(wallet = %self.address))]
    pub async fn add_owner(&self, caller: Address, new_owner: Address) -> Result<(), WalletError> {
        let core = &self.core;
        let mut state = core.state.lock().await;
        let before = WalletCore::snapshot(&state);

        if let Err(e) = self
            .ensure_idle()
            .and_then(|()| state.add_owner(&caller, new_owner))
        {
            return Err(core.reject(e).await);
        }

        core.verify(&state, before.as_deref());
        core.emit(WalletEvent::OwnerAdded { owner: new_owner }).await;
        info!(owner = %new_owner, owners = state.owners().len(), "Owner added");
        Ok(())
    }

    /// Remove `target`, clearing its confirmations on pending transactions
    /// in the same step.
    ///
    /// # Errors
    ///
    /// `ReentrantCall`, `NotOwner` (caller, then target),
    /// `CannotRemoveLastOwner`, `InvalidThreshold`.
    #[instrument(skip(self), fields(wallet = %self.address))]
    pub async fn remove_owner(&self, caller: Address, target: Address) -> Result<(), WalletError> {
        let core = &self.core;
        let mut state = core.state.lock().await;
        let before = WalletCore::snapshot(&state);

        let cleared = match self
            .ensure_idle()
            .and_then(|()| state.remove_owner(&caller, &target))
        {
            Ok(cleared) => cleared,
            Err(e) => return Err(core.reject(e).await),
        };

        core.stats.write().await.confirmations_cleared += cleared.len() as u64;
        core.verify(&state, before.as_deref());
        core.emit(WalletEvent::OwnerRemoved { owner: target }).await;
        info!(
            owner = %target,
            owners = state.owners().len(),
            cleared = ?cleared,
            "Owner removed"
        );
        Ok(())
    }

    /// Set the confirmation threshold.
    ///
    /// # Errors
    ///
    /// `ReentrantCall`, `NotOwner`, `InvalidThreshold`.
    #[instrument(skip(self), fields(wallet = %self.address))]
    pub async fn change_threshold(&self, caller: Address, threshold: usize) -> Result<(), WalletError> {
        let core = &self.core;
        let mut state = core.state.lock().await;
        let before = WalletCore::snapshot(&state);

        if let Err(e) = self
            .ensure_idle()
            .and_then(|()| state.change_threshold(&caller, threshold))
        {
            return Err(core.reject(e).await);
        }

        core.verify(&state, before.as_deref());
        core.emit(WalletEvent::RequiredConfirmationsChanged { threshold })
            .await;
        info!(threshold, "Threshold changed");
        Ok(())
    }

    // =========================================================================
    // PROPOSALS
    // =========================================================================

    /// Propose a transfer of `amount` to `destination` with `payload`.
    ///
    /// # Errors
    ///
    /// `ReentrantCall`, `NotOwner`, `ZeroAddress`.
    #[instrument(skip(self, payload), fields(wallet = %self.address, payload_len = payload.len()))]
    pub async fn create_transaction(
        &self,
        caller: Address,
        destination: Address,
        amount: U256,
        payload: Bytes,
    ) -> Result<TxIndex, WalletError> {
        let core = &self.core;
        let mut state = core.state.lock().await;
        let before = WalletCore::snapshot(&state);

        let index = match self.ensure_idle().and_then(|()| {
            state.create_transaction(&caller, destination, amount, payload.clone())
        }) {
            Ok(index) => index,
            Err(e) => return Err(core.reject(e).await),
        };

        core.stats.write().await.transactions_created += 1;
        core.verify(&state, before.as_deref());
        core.emit(WalletEvent::TransactionCreated {
            index,
            creator: caller,
            destination,
            amount,
            payload,
        })
        .await;
        info!(index, "Transaction created");
        Ok(index)
    }

    /// Record the caller's confirmation of `index`.
    ///
    /// # Errors
    ///
    /// `ReentrantCall`, `NotOwner`, `TransactionNotExist`,
    /// `AlreadyConfirmed`, `AlreadyExecuted`.
    #[instrument(skip(self), fields(wallet = %self.address))]
    pub async fn confirm_transaction(&self, caller: Address, index: TxIndex) -> Result<(), WalletError> {
        let core = &self.core;
        let mut state = core.state.lock().await;
        let before = WalletCore::snapshot(&state);

        if let Err(e) = self
            .ensure_idle()
            .and_then(|()| state.confirm(&caller, index))
        {
            return Err(core.reject(e).await);
        }

        core.stats.write().await.confirmations += 1;
        core.verify(&state, before.as_deref());
        core.emit(WalletEvent::TransactionConfirmed {
            index,
            confirmer: caller,
        })
        .await;
        info!(index, "Transaction confirmed");
        Ok(())
    }

    /// Withdraw the caller's confirmation of `index`.
    ///
    /// # Errors
    ///
    /// `ReentrantCall`, `NotOwner`, `TransactionNotExist`, `NotConfirmed`,
    /// `AlreadyExecuted`.
    #[instrument(skip(self), fields(wallet = %self.address))]
    pub async fn revoke_confirmation(&self, caller: Address, index: TxIndex) -> Result<(), WalletError> {
        let core = &self.core;
        let mut state = core.state.lock().await;
        let before = WalletCore::snapshot(&state);

        if let Err(e) = self
            .ensure_idle()
            .and_then(|()| state.revoke(&caller, index))
        {
            return Err(core.reject(e).await);
        }

        core.stats.write().await.revocations += 1;
        core.verify(&state, before.as_deref());
        core.emit(WalletEvent::TransactionRevoked {
            index,
            revoker: caller,
        })
        .await;
        info!(index, "Confirmation revoked");
        Ok(())
    }

    // =========================================================================
    // EXECUTION
    // =========================================================================

    /// Carry out `index` through the settlement runtime.
    ///
    /// # Errors
    ///
    /// `NotOwner`, `TransactionNotExist`, `NotEnoughConfirmations`,
    /// `AlreadyExecuted`, then `ReentrantCall` if the guard is held, then
    /// `ExecutionFailed` if the settlement runtime fails. On
    /// `ExecutionFailed` nothing changes and the call may be retried.
    #[instrument(skip(self), fields(wallet = %self.address))]
    pub async fn execute_transaction(&self, caller: Address, index: TxIndex) -> Result<(), WalletError> {
        let state = self.core.state.lock().await;

        let call = match state.prepare_execution(&caller, index, self.address) {
            Ok(call) => call,
            Err(e) => return Err(self.core.reject(e).await),
        };
        let Some(guard) = ExecutionGuard::acquire(&self.executing) else {
            return Err(self.core.reject(WalletError::ReentrantCall).await);
        };

        // Released so that callbacks from the destination reach the guard
        // instead of blocking on the lock.
        drop(state);
        debug!(index, to = %call.to, value = %call.value, "Invoking settlement runtime");

        let core = Arc::clone(&self.core);
        let settlement = Arc::clone(&self.settlement);
        let settle = tokio::spawn(
            async move {
                let outcome = settlement.transfer_and_call(call).await;
                core.record_execution(index, caller, outcome, guard).await
            }
            .instrument(Span::current()),
        );

        match settle.await {
            Ok(result) => result,
            Err(e) => {
                error!(index, error = %e, "Settlement task panicked");
                Err(WalletError::ExecutionFailed(index))
            }
        }
    }

    // =========================================================================
    // DEPOSITS
    // =========================================================================

    /// Accept a transfer with no associated proposal. Called by the
    /// settlement runtime after `amount` has been credited, with the
    /// resulting `balance`. Never fails and never touches the guard.
    #[instrument(skip(self, payload), fields(wallet = %self.address))]
    pub async fn receive(&self, sender: Address, amount: U256, balance: U256, payload: Option<Bytes>) {
        let payload = payload.unwrap_or_default();
        let core = &self.core;
        // Serialises the notification with other mutations.
        let _state = core.state.lock().await;

        core.stats.write().await.deposits += 1;
        core.emit(WalletEvent::Deposit {
            sender,
            amount,
            balance,
        })
        .await;
        info!(
            sender = %sender,
            amount = %amount,
            balance = %balance,
            payload_len = payload.len(),
            "Deposit received"
        );
    }

    // =========================================================================
    // READS
    // =========================================================================

    /// Owners in enumeration order. Not stable across removals.
    pub async fn get_owners(&self) -> Vec<Address> {
        self.core.state.lock().await.owners().owners().to_vec()
    }

    /// Current threshold.
    pub async fn get_threshold(&self) -> usize {
        self.core.state.lock().await.owners().threshold()
    }

    /// Returns true if `address` is a current owner.
    pub async fn is_owner(&self, address: Address) -> bool {
        self.core.state.lock().await.owners().is_owner(&address)
    }

    /// Number of transactions ever created.
    pub async fn get_transaction_count(&self) -> usize {
        self.core.state.lock().await.ledger().len()
    }

    /// A copy of the transaction at `index`.
    ///
    /// # Errors
    ///
    /// `TransactionNotExist`.
    pub async fn get_transaction(&self, index: TxIndex) -> Result<Transaction, WalletError> {
        self.core.state.lock().await.ledger().get(index).cloned()
    }

    /// Indices of transactions not yet executed, ascending.
    pub async fn get_pending_transactions(&self) -> Vec<TxIndex> {
        self.core.state.lock().await.ledger().pending_indices()
    }

    /// Returns true if `owner` currently confirms `index`.
    ///
    /// # Errors
    ///
    /// `TransactionNotExist`.
    pub async fn is_confirmed(&self, index: TxIndex, owner: Address) -> Result<bool, WalletError> {
        let state = self.core.state.lock().await;
        state.ledger().get(index)?;
        Ok(state.confirmations().is_confirmed(index, &owner))
    }

    /// Owners currently confirming `index`, sorted by address.
    ///
    /// # Errors
    ///
    /// `TransactionNotExist`.
    pub async fn get_confirmations(&self, index: TxIndex) -> Result<Vec<Address>, WalletError> {
        let state = self.core.state.lock().await;
        state.ledger().get(index)?;
        Ok(state.confirmations().confirmations(index))
    }

    /// The wallet's holdings as reported by the settlement runtime.
    ///
    /// # Errors
    ///
    /// `SettlementUnavailable`.
    pub async fn balance(&self) -> Result<U256, WalletError> {
        Ok(self.settlement.balance_of(self.address).await?)
    }

    /// Run every invariant check against the current state.
    pub async fn check_invariants(&self) -> InvariantCheckResult {
        check_all_invariants(&*self.core.state.lock().await, None)
    }

    fn ensure_idle(&self) -> Result<(), WalletError> {
        if self.is_executing() {
            return Err(WalletError::ReentrantCall);
        }
        Ok(())
    }
}

// =============================================================================
// INTERNALS
// =============================================================================

impl WalletCore {
    /// Record the settlement outcome of `index`, then release `guard`.
    async fn record_execution(
        &self,
        index: TxIndex,
        executor: Address,
        outcome: Result<(), SettlementError>,
        guard: ExecutionGuard,
    ) -> Result<(), WalletError> {
        let mut state = self.state.lock().await;
        if let Err(e) = outcome {
            drop(guard);
            self.stats.write().await.executions_failed += 1;
            warn!(index, error = %e, "Settlement failed, transaction stays pending");
            return Err(WalletError::ExecutionFailed(index));
        }

        let before = Self::snapshot(&state);
        let finalized = state.finalize_execution(index);
        drop(guard);
        finalized?;

        self.stats.write().await.executions_succeeded += 1;
        self.verify(&state, before.as_deref());
        self.emit(WalletEvent::TransactionExecuted { index, executor })
            .await;
        info!(index, "Transaction executed");
        Ok(())
    }

    async fn reject(&self, err: WalletError) -> WalletError {
        {
            let mut stats = self.stats.write().await;
            if err == WalletError::ReentrantCall {
                stats.reentrant_rejections += 1;
            } else {
                stats.rejected_calls += 1;
            }
        }
        warn!(error = %err, class = ?err.class(), "Call rejected");
        err
    }

    async fn emit(&self, event: WalletEvent) {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);
        let receivers = self
            .publisher
            .publish(EventEnvelope::new(self.address, sequence, event))
            .await;
        debug!(sequence, receivers, "Event emitted");
    }

    fn snapshot(state: &WalletState) -> ExecutedSnapshot {
        cfg!(debug_assertions).then(|| state.ledger().executed_snapshot())
    }

    fn verify(&self, state: &WalletState, before: Option<&[(TxIndex, Transaction)]>) {
        if !cfg!(debug_assertions) {
            return;
        }
        let result = check_all_invariants(state, before);
        if let InvariantCheckResult::Invalid(violations) = &result {
            for violation in violations {
                error!(wallet = %self.address, %violation, "Invariant violated");
            }
        }
        debug_assert!(result.is_valid(), "wallet invariants violated: {result:?}");
    }
}

// =============================================================================
// MultisigWalletApi Implementation
// =============================================================================

#[async_trait]
impl<S: SettlementRuntime + 'static> MultisigWalletApi for MultisigWallet<S> {
    async fn add_owner(&self, caller: Address, new_owner: Address) -> Result<(), WalletError> {
        MultisigWallet::add_owner(self, caller, new_owner).await
    }

    async fn remove_owner(&self, caller: Address, owner: Address) -> Result<(), WalletError> {
        MultisigWallet::remove_owner(self, caller, owner).await
    }

    async fn change_threshold(&self, caller: Address, threshold: usize) -> Result<(), WalletError> {
        MultisigWallet::change_threshold(self, caller, threshold).await
    }

    async fn create_transaction(
        &self,
        caller: Address,
        destination: Address,
        amount: U256,
        payload: Bytes,
    ) -> Result<TxIndex, WalletError> {
        MultisigWallet::create_transaction(self, caller, destination, amount, payload).await
    }

    async fn confirm_transaction(&self, caller: Address, index: TxIndex) -> Result<(), WalletError> {
        MultisigWallet::confirm_transaction(self, caller, index).await
    }

    async fn revoke_confirmation(&self, caller: Address, index: TxIndex) -> Result<(), WalletError> {
        MultisigWallet::revoke_confirmation(self, caller, index).await
    }

    async fn execute_transaction(&self, caller: Address, index: TxIndex) -> Result<(), WalletError> {
        MultisigWallet::execute_transaction(self, caller, index).await
    }

    async fn receive(&self, sender: Address, amount: U256, balance: U256, payload: Option<Bytes>) {
        MultisigWallet::receive(self, sender, amount, balance, payload).await;
    }

    async fn get_owners(&self) -> Vec<Address> {
        MultisigWallet::get_owners(self).await
    }

    async fn get_threshold(&self) -> usize {
        MultisigWallet::get_threshold(self).await
    }

    async fn get_transaction_count(&self) -> usize {
        MultisigWallet::get_transaction_count(self).await
    }

    async fn get_transaction(&self, index: TxIndex) -> Result<Transaction, WalletError> {
        MultisigWallet::get_transaction(self, index).await
    }

    async fn get_pending_transactions(&self) -> Vec<TxIndex> {
        MultisigWallet::get_pending_transactions(self).await
    }

    async fn get_confirmations(&self, index: TxIndex) -> Result<Vec<Address>, WalletError> {
        MultisigWallet::get_confirmations(self, index).await
    }
}

// =============================================================================
// TEST WIRING
// =============================================================================

/// A wallet wired to in-memory collaborators.
pub struct TestWallet {
    /// The engine.
    pub wallet: Arc<MultisigWallet<InMemorySettlement>>,
    /// Its settlement runtime; the wallet's address routes into `receive`.
    pub settlement: Arc<InMemorySettlement>,
    /// Its event bus.
    pub bus: Arc<InMemoryEventBus>,
}

/// Wallet at `0xeeee…` over in-memory settlement and bus (for testing).
///
/// # Errors
///
/// The construction errors of [`MultisigWallet::new`].
pub fn create_test_wallet(owners: Vec<Address>, threshold: usize) -> Result<TestWallet, WalletError> {
    let settlement = Arc::new(InMemorySettlement::new());
    let bus = Arc::new(InMemoryEventBus::new());
    let config = WalletConfig::new(Address::repeat_byte(0xee), owners, threshold);

    let wallet = Arc::new(MultisigWallet::new(
        config,
        Arc::clone(&settlement),
        Arc::clone(&bus) as Arc<dyn EventPublisher>,
    )?);

    let api: Arc<dyn MultisigWalletApi> = Arc::clone(&wallet) as Arc<dyn MultisigWalletApi>;
    settlement.register_handler(wallet.address(), Arc::new(WalletReceiver::new(&api)));

    Ok(TestWallet {
        wallet,
        settlement,
        bus,
    })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::RevertingHandler;
    use shared_bus::EventFilter;

    fn addr(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    const A: u8 = 0xa1;
    const B: u8 = 0xb2;
    const C: u8 = 0xc3;
    const D: u8 = 0xd4;

    fn wallet() -> TestWallet {
        create_test_wallet(vec![addr(A), addr(B), addr(C)], 2).unwrap()
    }

    #[tokio::test]
    async fn test_create_wallet() {
        let t = wallet();

        assert_eq!(t.wallet.get_owners().await, vec![addr(A), addr(B), addr(C)]);
        assert_eq!(t.wallet.get_threshold().await, 2);
        assert_eq!(t.wallet.get_transaction_count().await, 0);
        assert_eq!(t.wallet.stats().await, WalletStats::default());
    }

    #[tokio::test]
    async fn test_new_rejects_zero_wallet_address() {
        let result = MultisigWallet::new(
            WalletConfig::new(Address::ZERO, vec![addr(A)], 1),
            Arc::new(InMemorySettlement::new()),
            Arc::new(InMemoryEventBus::new()),
        );
        assert!(matches!(result, Err(WalletError::ZeroAddress)));
    }

    #[tokio::test]
    async fn test_full_lifecycle_emits_in_order() {
        let t = wallet();
        let mut sub = t.bus.subscribe(EventFilter::all());
        t.settlement.set_balance(t.wallet.address(), U256::from(10));

        let index = t
            .wallet
            .create_transaction(addr(A), addr(D), U256::from(5), Bytes::new())
            .await
            .unwrap();
        t.wallet.confirm_transaction(addr(B), index).await.unwrap();
        t.wallet.confirm_transaction(addr(C), index).await.unwrap();
        t.wallet.execute_transaction(addr(A), index).await.unwrap();

        let events: Vec<_> = sub.drain();
        let sequences: Vec<u64> = events.iter().map(|e| e.sequence).collect();
        assert_eq!(sequences, vec![0, 1, 2, 3]);
        assert_eq!(
            events[3].event,
            WalletEvent::TransactionExecuted {
                index,
                executor: addr(A)
            }
        );

        assert!(t.wallet.get_transaction(index).await.unwrap().is_executed());
        assert_eq!(t.wallet.balance().await.unwrap(), U256::from(5));
        assert_eq!(t.wallet.stats().await.executions_succeeded, 1);
        assert!(t.wallet.check_invariants().await.is_valid());
    }

    #[tokio::test]
    async fn test_failed_execution_is_retryable() {
        let t = wallet();
        t.settlement.set_balance(t.wallet.address(), U256::from(10));
        t.settlement
            .register_handler(addr(D), Arc::new(RevertingHandler::new("rejected")));

        let index = t
            .wallet
            .create_transaction(addr(A), addr(D), U256::from(5), Bytes::new())
            .await
            .unwrap();
        t.wallet.confirm_transaction(addr(A), index).await.unwrap();
        t.wallet.confirm_transaction(addr(B), index).await.unwrap();

        let err = t.wallet.execute_transaction(addr(A), index).await.unwrap_err();
        assert_eq!(err, WalletError::ExecutionFailed(index));
        assert!(err.is_retryable());
        assert!(!t.wallet.is_executing());
        assert_eq!(t.wallet.get_pending_transactions().await, vec![index]);

        t.settlement.clear_handler(&addr(D));
        t.wallet.execute_transaction(addr(C), index).await.unwrap();

        let stats = t.wallet.stats().await;
        assert_eq!(stats.executions_failed, 1);
        assert_eq!(stats.executions_succeeded, 1);
    }

    #[tokio::test]
    async fn test_rejections_counted_and_silent() {
        let t = wallet();
        let mut sub = t.bus.subscribe(EventFilter::all());

        let err = t
            .wallet
            .create_transaction(addr(D), addr(D), U256::one(), Bytes::new())
            .await
            .unwrap_err();

        assert_eq!(err, WalletError::NotOwner(addr(D)));
        assert_eq!(t.wallet.stats().await.rejected_calls, 1);
        assert!(sub.drain().is_empty());
    }

    #[tokio::test]
    async fn test_confirmation_reads() {
        let t = wallet();
        let index = t
            .wallet
            .create_transaction(addr(A), addr(D), U256::one(), Bytes::new())
            .await
            .unwrap();
        t.wallet.confirm_transaction(addr(C), index).await.unwrap();
        t.wallet.confirm_transaction(addr(A), index).await.unwrap();

        assert_eq!(
            t.wallet.get_confirmations(index).await.unwrap(),
            vec![addr(A), addr(C)]
        );
        assert!(t.wallet.is_confirmed(index, addr(C)).await.unwrap());
        assert!(!t.wallet.is_confirmed(index, addr(B)).await.unwrap());
        assert_eq!(
            t.wallet.get_confirmations(9).await,
            Err(WalletError::TransactionNotExist(9))
        );
    }

    #[tokio::test]
    async fn test_deposit_emitted_while_runtime_offline() {
        let t = wallet();
        let mut sub = t.bus.subscribe(EventFilter::all());
        t.settlement.set_offline(true);

        t.wallet
            .receive(addr(D), U256::one(), U256::from(6), None)
            .await;

        assert_eq!(
            sub.drain().into_iter().map(|e| e.event).collect::<Vec<_>>(),
            vec![WalletEvent::Deposit {
                sender: addr(D),
                amount: U256::one(),
                balance: U256::from(6),
            }]
        );
        assert_eq!(t.wallet.stats().await.deposits, 1);
        assert!(matches!(
            t.wallet.balance().await,
            Err(WalletError::SettlementUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_deposit_through_runtime_reports_credited_balance() {
        let t = wallet();
        let mut sub = t.bus.subscribe(EventFilter::all());
        t.settlement.set_balance(t.wallet.address(), U256::from(3));
        t.settlement.set_balance(addr(D), U256::from(5));

        t.settlement
            .transfer_and_call(crate::domain::entities::SettlementCall {
                index: 0,
                from: addr(D),
                to: t.wallet.address(),
                value: U256::from(5),
                payload: Bytes::new(),
            })
            .await
            .unwrap();

        assert_eq!(
            sub.drain().into_iter().map(|e| e.event).collect::<Vec<_>>(),
            vec![WalletEvent::Deposit {
                sender: addr(D),
                amount: U256::from(5),
                balance: U256::from(8),
            }]
        );
    }
}
