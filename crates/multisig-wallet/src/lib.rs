//! # Multisig Wallet - Quorum-Gated Custodial Account
//!
//! Guards a shared account: no value transfer executes until a configurable
//! number of registered owners has confirmed it.
//!
//! ## Components
//!
//! | Component | Location | Purpose |
//! |-----------|----------|---------|
//! | Owner registry | `domain/owners.rs` | Owner set, enumeration order, threshold |
//! | Transaction ledger | `domain/ledger.rs` | Append-only proposals and execution state |
//! | Confirmation tracker | `domain/confirmations.rs` | Per-owner approvals and cached counts |
//! | Execution engine | `service.rs` | Quorum gate, execution guard, events |
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | `1 <= threshold <= owners` | `domain/owners.rs` - `check_threshold()` |
//! | Owner set non-empty, no duplicates | `domain/owners.rs` - `new()`, `add_owner()`, `remove_owner()` |
//! | Cached count == true records | `domain/confirmations.rs` - `confirm()`, `revoke()`, `clear_owner()` |
//! | Executed is terminal and immutable | `domain/ledger.rs` - `mark_executed()`, `domain/confirmations.rs` |
//! | No nested execution | `guard.rs` - `ExecutionGuard` |
//!
//! All of them are re-checked after every mutation in debug builds
//! (`domain/invariants.rs` - `check_all_invariants()`).
//!
//! ## Outbound Dependencies
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | `SettlementRuntime` | Move value and run the destination's payload |
//! | `shared_bus::EventPublisher` | Deliver notifications |
//!
//! ## Usage Example
//!
//! ```ignore
//! use multisig_wallet::prelude::*;
//!
//! let index = wallet.create_transaction(alice, dest, U256::from(5), Bytes::new()).await?;
//! wallet.confirm_transaction(bob, index).await?;
//! wallet.confirm_transaction(carol, index).await?;
//! wallet.execute_transaction(alice, index).await?;
//! ```

// Crate-level lints
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]

// =============================================================================
// MODULES
// =============================================================================

pub mod adapters;
pub mod config;
pub mod domain;
pub mod errors;
pub mod guard;
pub mod ports;
pub mod service;

// =============================================================================
// PRELUDE
// =============================================================================

/// Convenient re-exports for common usage.
pub mod prelude {
    // Shared value types
    pub use shared_types::entities::{Address, Bytes, TxIndex, U256};

    // Domain
    pub use crate::domain::entities::{SettlementCall, Transaction, TransactionStatus};
    pub use crate::domain::invariants::{
        check_all_invariants, InvariantCheckResult, InvariantViolation,
    };
    pub use crate::domain::state::WalletState;

    // Ports
    pub use crate::ports::inbound::MultisigWalletApi;
    pub use crate::ports::outbound::SettlementRuntime;

    // Adapters
    pub use crate::adapters::{CallHandler, InMemorySettlement, RevertingHandler, WalletReceiver};

    // Errors
    pub use crate::errors::{ConfigError, ErrorClass, SettlementError, WalletError};

    // Config
    pub use crate::config::WalletConfig;

    // Events
    pub use shared_bus::{EventEnvelope, EventFilter, EventTopic, InMemoryEventBus, WalletEvent};

    // Service
    pub use crate::service::{create_test_wallet, MultisigWallet, TestWallet, WalletStats};
}

// =============================================================================
// CRATE INFO
// =============================================================================

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// TESTS
// =============================================================================
