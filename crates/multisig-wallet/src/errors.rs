//! # Error Types
//!
//! All error types for the wallet engine.

use shared_types::entities::{Address, TxIndex, U256};
use shared_types::errors::AddressParseError;
use thiserror::Error;

// =============================================================================
// WALLET ERRORS
// =============================================================================

/// Errors returned by wallet operations.
///
/// Every failing call leaves the wallet exactly as it was before the call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WalletError {
    /// Construction was attempted with an empty owner list.
    #[error("owners required")]
    OwnersRequired,

    /// The address (caller or removal target) is not a current owner.
    #[error("not an owner: {0}")]
    NotOwner(Address),

    /// The null address was supplied where a real account is required.
    #[error("zero address")]
    ZeroAddress,

    /// The address is already an owner.
    #[error("duplicate owner: {0}")]
    DuplicateOwner(Address),

    /// Removing the only remaining owner.
    #[error("cannot remove last owner")]
    CannotRemoveLastOwner,

    /// Threshold outside `1..=owners`.
    #[error("invalid threshold: {threshold} (owners: {owners})")]
    InvalidThreshold {
        /// Requested or resulting threshold.
        threshold: usize,
        /// Owner count the threshold was checked against.
        owners: usize,
    },

    /// The transaction index is out of range.
    #[error("transaction {0} does not exist")]
    TransactionNotExist(TxIndex),

    /// The owner already confirmed this transaction.
    #[error("transaction {index} already confirmed by {owner}")]
    AlreadyConfirmed {
        /// Ledger position.
        index: TxIndex,
        /// Confirming owner.
        owner: Address,
    },

    /// The owner holds no confirmation to revoke.
    #[error("transaction {index} not confirmed by {owner}")]
    NotConfirmed {
        /// Ledger position.
        index: TxIndex,
        /// Revoking owner.
        owner: Address,
    },

    /// The transaction was already executed.
    #[error("transaction {0} already executed")]
    AlreadyExecuted(TxIndex),

    /// The live confirmation count is below the threshold.
    #[error("transaction {index} has {confirmations} confirmations, {required} required")]
    NotEnoughConfirmations {
        /// Ledger position.
        index: TxIndex,
        /// Current confirmation count.
        confirmations: usize,
        /// Current threshold.
        required: usize,
    },

    /// The settlement runtime reported failure; the transaction stays pending.
    #[error("execution of transaction {0} failed")]
    ExecutionFailed(TxIndex),

    /// A state-mutating call arrived while an execution was outstanding.
    ///
    /// Applies to callbacks from the destination and to calls from any other
    /// task alike, until the outstanding execution is finalised.
    #[error("execution guard held: reentrant call rejected")]
    ReentrantCall,

    /// The settlement runtime could not answer a read.
    #[error("settlement runtime unavailable: {0}")]
    SettlementUnavailable(String),
}

/// Error classes, used by callers deciding how to react to a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Caller is not a current owner.
    Authorization,
    /// Referenced transaction does not exist.
    Referential,
    /// Operation conflicts with current state.
    StateConflict,
    /// Bad parameter.
    Validation,
    /// The external settlement runtime failed.
    Collaborator,
    /// Rejected by the execution guard.
    Guard,
}

impl WalletError {
    /// Classify this error.
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::NotOwner(_) => ErrorClass::Authorization,
            Self::TransactionNotExist(_) => ErrorClass::Referential,
            Self::AlreadyConfirmed { .. }
            | Self::NotConfirmed { .. }
            | Self::AlreadyExecuted(_)
            | Self::NotEnoughConfirmations { .. }
            | Self::CannotRemoveLastOwner => ErrorClass::StateConflict,
            Self::OwnersRequired
            | Self::ZeroAddress
            | Self::DuplicateOwner(_)
            | Self::InvalidThreshold { .. } => ErrorClass::Validation,
            Self::ExecutionFailed(_) | Self::SettlementUnavailable(_) => ErrorClass::Collaborator,
            Self::ReentrantCall => ErrorClass::Guard,
        }
    }

    /// Returns true if repeating the same call later can succeed without
    /// changing its inputs.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ExecutionFailed(_))
    }
}

// =============================================================================
// SETTLEMENT ERRORS
// =============================================================================

/// Errors reported by the settlement runtime.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SettlementError {
    /// The paying account cannot cover the transfer.
    #[error("insufficient balance: required {required}, available {available}")]
    InsufficientBalance {
        /// Value requested.
        required: U256,
        /// Value held.
        available: U256,
    },

    /// The destination rejected the call.
    #[error("call reverted: {0}")]
    Reverted(String),

    /// Crediting the destination would overflow.
    #[error("balance overflow at {0}")]
    BalanceOverflow(Address),

    /// The runtime could not be reached.
    #[error("settlement runtime unavailable: {0}")]
    Unavailable(String),
}

impl From<SettlementError> for WalletError {
    fn from(err: SettlementError) -> Self {
        WalletError::SettlementUnavailable(err.to_string())
    }
}

// =============================================================================
// CONFIG ERRORS
// =============================================================================

/// Errors from loading wallet configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required setting is absent.
    #[error("missing setting: {0}")]
    Missing(&'static str),

    /// An address setting did not parse.
    #[error("invalid address in {key}: {source}")]
    InvalidAddress {
        /// Setting name.
        key: &'static str,
        /// Parse failure.
        #[source]
        source: AddressParseError,
    },

    /// A numeric setting did not parse.
    #[error("invalid value for {key}: {value}")]
    InvalidValue {
        /// Setting name.
        key: &'static str,
        /// Raw value.
        value: String,
    },

    /// The parsed settings violate wallet construction rules.
    #[error("invalid wallet configuration: {0}")]
    Rejected(#[from] WalletError),
}

// =============================================================================
// TESTS
// =============================================================================
