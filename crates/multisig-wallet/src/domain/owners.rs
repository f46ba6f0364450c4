//! # Owner Registry
//!
//! The set of owners, their enumeration order, and the confirmation threshold.
//!
//! ## Data Structures
//!
//! - `positions`: O(1) membership test, owner → slot in `owners`
//! - `owners`: enumeration order
//!
//! Removal is swap-remove: the last owner moves into the vacated slot, so the
//! enumeration order is NOT stable across removals.
//!
//! ## Invariants Enforced
//!
//! - `1 <= threshold <= owners.len()` after every mutation
//! - no duplicates, never empty, `positions` and `owners` agree

use crate::errors::WalletError;
use shared_types::entities::Address;
use std::collections::HashMap;

/// Owner set with enumeration and threshold.
#[derive(Debug, Clone)]
pub struct OwnerRegistry {
    /// Owner → index into `owners`.
    positions: HashMap<Address, usize>,
    /// Enumeration order.
    owners: Vec<Address>,
    /// Confirmations required to execute.
    threshold: usize,
}

impl OwnerRegistry {
    /// Builds a registry from an initial owner list.
    ///
    /// # Errors
    ///
    /// Checked in order: `OwnersRequired` for an empty list, then per entry in
    /// list order `ZeroAddress` / `DuplicateOwner`, then `InvalidThreshold`.
    pub fn new(owners: Vec<Address>, threshold: usize) -> Result<Self, WalletError> {
        if owners.is_empty() {
            return Err(WalletError::OwnersRequired);
        }

        let mut positions = HashMap::with_capacity(owners.len());
        for (slot, owner) in owners.iter().enumerate() {
            if owner.is_zero() {
                return Err(WalletError::ZeroAddress);
            }
            if positions.insert(*owner, slot).is_some() {
                return Err(WalletError::DuplicateOwner(*owner));
            }
        }

        check_threshold(threshold, owners.len())?;

        Ok(Self {
            positions,
            owners,
            threshold,
        })
    }

    /// Returns true if `address` is a current owner.
    #[must_use]
    pub fn is_owner(&self, address: &Address) -> bool {
        self.positions.contains_key(address)
    }

    /// Fails with `NotOwner` unless `address` is a current owner.
    ///
    /// # Errors
    ///
    /// `WalletError::NotOwner` carrying `address`.
    pub fn ensure_owner(&self, address: &Address) -> Result<(), WalletError> {
        if self.is_owner(address) {
            Ok(())
        } else {
            Err(WalletError::NotOwner(*address))
        }
    }

    /// Owners in enumeration order.
    #[must_use]
    pub fn owners(&self) -> &[Address] {
        &self.owners
    }

    /// Number of owners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    /// Always false; the registry never becomes empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    /// Current threshold.
    #[must_use]
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Slot of `address` in the enumeration, if an owner.
    #[must_use]
    pub fn position(&self, address: &Address) -> Option<usize> {
        self.positions.get(address).copied()
    }

    /// Appends a new owner.
    ///
    /// # Errors
    ///
    /// `ZeroAddress` for the null address, `DuplicateOwner` if already present.
    pub fn add_owner(&mut self, owner: Address) -> Result<(), WalletError> {
        if owner.is_zero() {
            return Err(WalletError::ZeroAddress);
        }
        if self.is_owner(&owner) {
            return Err(WalletError::DuplicateOwner(owner));
        }

        self.positions.insert(owner, self.owners.len());
        self.owners.push(owner);
        Ok(())
    }

    /// Removes an owner by swap-remove.
    ///
    /// # Errors
    ///
    /// `NotOwner` if `target` is not an owner, `CannotRemoveLastOwner` if it is
    /// the only one, `InvalidThreshold` if fewer owners than the threshold
    /// would remain. Nothing changes on error.
    pub fn remove_owner(&mut self, target: &Address) -> Result<(), WalletError> {
        let slot = self
            .position(target)
            .ok_or(WalletError::NotOwner(*target))?;
        if self.owners.len() == 1 {
            return Err(WalletError::CannotRemoveLastOwner);
        }
        check_threshold(self.threshold, self.owners.len() - 1)?;

        self.positions.remove(target);
        self.owners.swap_remove(slot);
        if let Some(moved) = self.owners.get(slot) {
            self.positions.insert(*moved, slot);
        }
        Ok(())
    }

    /// Sets a new threshold.
    ///
    /// # Errors
    ///
    /// `InvalidThreshold` unless `1 <= threshold <= owners`.
    pub fn change_threshold(&mut self, threshold: usize) -> Result<(), WalletError> {
        check_threshold(threshold, self.owners.len())?;
        self.threshold = threshold;
        Ok(())
    }

    /// Returns true if the position map and the enumeration agree.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.positions.len() == self.owners.len()
            && self
                .owners
                .iter()
                .enumerate()
                .all(|(slot, owner)| self.positions.get(owner) == Some(&slot))
    }
}

fn check_threshold(threshold: usize, owners: usize) -> Result<(), WalletError> {
    if threshold == 0 || threshold > owners {
        return Err(WalletError::InvalidThreshold { threshold, owners });
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    fn registry(count: u8, threshold: usize) -> OwnerRegistry {
        OwnerRegistry::new((1..=count).map(addr).collect(), threshold).unwrap()
    }

    #[test]
    fn test_new_validates_in_order() {
        assert_eq!(
            OwnerRegistry::new(vec![], 1).unwrap_err(),
            WalletError::OwnersRequired
        );
        assert_eq!(
            OwnerRegistry::new(vec![addr(1), Address::ZERO], 1).unwrap_err(),
            WalletError::ZeroAddress
        );
        assert_eq!(
            OwnerRegistry::new(vec![addr(1), addr(1)], 1).unwrap_err(),
            WalletError::DuplicateOwner(addr(1))
        );
        // Entry errors win over a bad threshold
        assert_eq!(
            OwnerRegistry::new(vec![addr(1), addr(1)], 0).unwrap_err(),
            WalletError::DuplicateOwner(addr(1))
        );
        assert_eq!(
            OwnerRegistry::new(vec![addr(1)], 2).unwrap_err(),
            WalletError::InvalidThreshold {
                threshold: 2,
                owners: 1
            }
        );
        assert!(OwnerRegistry::new(vec![addr(1)], 0).is_err());
    }

    #[test]
    fn test_add_owner() {
        let mut reg = registry(2, 1);
        reg.add_owner(addr(3)).unwrap();

        assert_eq!(reg.owners(), &[addr(1), addr(2), addr(3)]);
        assert!(reg.is_owner(&addr(3)));
        assert!(reg.is_consistent());
    }

    #[test]
    fn test_add_owner_rejects_zero_and_duplicate() {
        let mut reg = registry(2, 1);

        assert_eq!(reg.add_owner(Address::ZERO), Err(WalletError::ZeroAddress));
        assert_eq!(
            reg.add_owner(addr(2)),
            Err(WalletError::DuplicateOwner(addr(2)))
        );
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn test_remove_owner_swaps_last_into_slot() {
        let mut reg = registry(4, 1);
        reg.remove_owner(&addr(1)).unwrap();

        // Last owner moved into slot 0
        assert_eq!(reg.owners(), &[addr(4), addr(2), addr(3)]);
        assert_eq!(reg.position(&addr(4)), Some(0));
        assert!(!reg.is_owner(&addr(1)));
        assert!(reg.is_consistent());
    }

    #[test]
    fn test_remove_last_slot_owner() {
        let mut reg = registry(3, 1);
        reg.remove_owner(&addr(3)).unwrap();

        assert_eq!(reg.owners(), &[addr(1), addr(2)]);
        assert!(reg.is_consistent());
    }

    #[test]
    fn test_remove_owner_errors() {
        let mut reg = registry(1, 1);
        assert_eq!(
            reg.remove_owner(&addr(9)),
            Err(WalletError::NotOwner(addr(9)))
        );
        assert_eq!(
            reg.remove_owner(&addr(1)),
            Err(WalletError::CannotRemoveLastOwner)
        );
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_remove_owner_keeps_threshold_satisfiable() {
        let mut reg = registry(3, 3);
        assert_eq!(
            reg.remove_owner(&addr(2)),
            Err(WalletError::InvalidThreshold {
                threshold: 3,
                owners: 2
            })
        );
        assert_eq!(reg.len(), 3);

        reg.change_threshold(2).unwrap();
        reg.remove_owner(&addr(2)).unwrap();
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.threshold(), 2);
    }

    #[test]
    fn test_change_threshold_bounds() {
        let mut reg = registry(3, 2);

        assert!(reg.change_threshold(0).is_err());
        assert!(reg.change_threshold(4).is_err());
        assert_eq!(reg.threshold(), 2);

        reg.change_threshold(3).unwrap();
        assert_eq!(reg.threshold(), 3);
    }
}
