//! # Execution Guard
//!
//! Reentrancy lock held for the full duration of a settlement call.
//!
//! Acquired by compare-and-swap on the wallet's flag, released on drop
//! (RAII), so every exit path of an execution releases it: success,
//! collaborator failure, `?` propagation or a panic.
//!
//! The guard owns a handle to the flag, so it can move into the detached
//! task that settles and finalises an execution. A caller that stops
//! polling `execute_transaction` therefore does not release it early; it is
//! released only once the outcome has been recorded.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Exclusive hold on a wallet's execution flag.
///
/// # Example
///
/// ```ignore
/// let guard = ExecutionGuard::acquire(&self.executing).ok_or(WalletError::ReentrantCall)?;
/// // Flag is held until `guard` goes out of scope
/// ```
#[derive(Debug)]
pub struct ExecutionGuard {
    flag: Arc<AtomicBool>,
}

impl ExecutionGuard {
    /// Take the flag. `None` if it is already held.
    #[must_use]
    pub fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self {
                flag: Arc::clone(flag),
            })
    }

    /// Returns true if some guard currently holds `flag`.
    #[must_use]
    pub fn is_held(flag: &AtomicBool) -> bool {
        flag.load(Ordering::Acquire)
    }
}

impl Drop for ExecutionGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

// =============================================================================
// TESTS
// =============================================================================
