//! # Domain Invariants
//!
//! Properties that MUST hold after every call, successful or failed:
//!
//! - Threshold bounds: `1 <= threshold <= |owners|`
//! - Owner-set integrity: non-empty, no duplicates, no null owner
//! - Confirmation counts: cached count equals the number of true records
//! - Executed immutability: an executed transaction never changes again

use super::entities::Transaction;
use super::state::WalletState;
use shared_types::entities::{Address, TxIndex};
use std::collections::HashSet;

// =============================================================================
// INVARIANT CHECKS
// =============================================================================

/// `1 <= threshold <= |owners|`.
#[must_use]
pub fn check_threshold_invariant(state: &WalletState) -> bool {
    let owners = state.owners();
    owners.threshold() >= 1 && owners.threshold() <= owners.len()
}

/// Owner set is non-empty, duplicate-free, null-free, and its lookup map
/// agrees with the enumeration.
#[must_use]
pub fn check_owner_set_invariant(state: &WalletState) -> bool {
    let owners = state.owners();
    let mut seen = HashSet::with_capacity(owners.len());

    !owners.is_empty()
        && owners.owners().iter().all(|o| !o.is_zero() && seen.insert(*o))
        && owners.is_consistent()
}

/// Transactions whose cached count differs from their records.
#[must_use]
pub fn find_count_mismatches(state: &WalletState) -> Vec<(TxIndex, usize, usize)> {
    state
        .ledger()
        .iter()
        .filter_map(|(index, tx)| {
            let actual = state.confirmations().count(index);
            (tx.confirmation_count() != actual).then_some((index, tx.confirmation_count(), actual))
        })
        .collect()
}

/// Pending transactions still holding a record from a non-owner.
#[must_use]
pub fn find_stale_confirmations(state: &WalletState) -> Vec<(TxIndex, Address)> {
    let mut stale = Vec::new();
    for index in state.ledger().pending_indices() {
        for owner in state.confirmations().confirmations(index) {
            if !state.owners().is_owner(&owner) {
                stale.push((index, owner));
            }
        }
    }
    stale
}

/// Executed transactions in `before` that are missing or differ in `state`.
#[must_use]
pub fn find_mutated_executed(
    before: &[(TxIndex, Transaction)],
    state: &WalletState,
) -> Vec<TxIndex> {
    before
        .iter()
        .filter(|(index, tx)| state.ledger().get(*index).map_or(true, |now| now != tx))
        .map(|(index, _)| *index)
        .collect()
}

/// Check all invariants. Pass an executed snapshot taken earlier
/// ([`TransactionLedger::executed_snapshot`]) to also check executed
/// immutability.
///
/// [`TransactionLedger::executed_snapshot`]: crate::domain::ledger::TransactionLedger::executed_snapshot
#[must_use]
pub fn check_all_invariants(
    state: &WalletState,
    before: Option<&[(TxIndex, Transaction)]>,
) -> InvariantCheckResult {
    let mut violations = Vec::new();

    if !check_threshold_invariant(state) {
        violations.push(InvariantViolation::ThresholdOutOfRange {
            threshold: state.owners().threshold(),
            owners: state.owners().len(),
        });
    }

    if !check_owner_set_invariant(state) {
        violations.push(InvariantViolation::OwnerSetCorrupted);
    }

    for (index, cached, actual) in find_count_mismatches(state) {
        violations.push(InvariantViolation::CountMismatch {
            index,
            cached,
            actual,
        });
    }

    for (index, owner) in find_stale_confirmations(state) {
        violations.push(InvariantViolation::StaleConfirmation { index, owner });
    }

    if let Some(before) = before {
        for index in find_mutated_executed(before, state) {
            violations.push(InvariantViolation::ExecutedMutated { index });
        }
    }

    if violations.is_empty() {
        InvariantCheckResult::Valid
    } else {
        InvariantCheckResult::Invalid(violations)
    }
}

// =============================================================================
// INVARIANT TYPES
// =============================================================================

/// Result of checking all invariants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvariantCheckResult {
    /// All invariants hold.
    Valid,
    /// One or more invariants violated.
    Invalid(Vec<InvariantViolation>),
}

impl InvariantCheckResult {
    /// Returns true if all invariants hold.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

/// Specific invariant violation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvariantViolation {
    /// Threshold outside `1..=owners`.
    ThresholdOutOfRange { threshold: usize, owners: usize },
    /// Owner set empty, duplicated, null, or out of sync with its index.
    OwnerSetCorrupted,
    /// Cached confirmation count disagrees with the records.
    CountMismatch {
        index: TxIndex,
        cached: usize,
        actual: usize,
    },
    /// A removed owner still confirms a pending transaction.
    StaleConfirmation { index: TxIndex, owner: Address },
    /// An executed transaction changed or disappeared.
    ExecutedMutated { index: TxIndex },
}

impl std::fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ThresholdOutOfRange { threshold, owners } => {
                write!(f, "threshold {threshold} out of range for {owners} owners")
            }
            Self::OwnerSetCorrupted => write!(f, "owner set corrupted"),
            Self::CountMismatch {
                index,
                cached,
                actual,
            } => write!(
                f,
                "transaction {index}: cached count {cached} != {actual} records"
            ),
            Self::StaleConfirmation { index, owner } => {
                write!(f, "transaction {index}: stale confirmation from {owner}")
            }
            Self::ExecutedMutated { index } => {
                write!(f, "executed transaction {index} was modified")
            }
        }
    }
}
