//! # Core Value Types
//!
//! Account identifiers, amounts and opaque payloads.
//!
//! ## Clusters
//!
//! - **Accounts**: `Address`
//! - **Value**: `U256`
//! - **Payloads**: `Bytes`
//! - **Ledger positions**: `TxIndex`

use crate::errors::AddressParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// Re-export U256 from primitive-types for use across all crates
pub use primitive_types::U256;

/// Position of a proposal in the append-only transaction ledger.
pub type TxIndex = usize;

// =============================================================================
// ADDRESS (20 bytes)
// =============================================================================

/// A 20-byte account identifier.
///
/// The all-zero value is the null identifier and is never a valid owner or
/// transfer destination.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The null address (0x0000...0000).
    pub const ZERO: Self = Self([0u8; 20]);

    /// Creates an address from a 20-byte array.
    #[must_use]
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Creates an address whose every byte is `byte`. Handy for fixtures.
    #[must_use]
    pub const fn repeat_byte(byte: u8) -> Self {
        Self([byte; 20])
    }

    /// Creates an address from a slice. Returns None if wrong length.
    #[must_use]
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        if slice.len() == 20 {
            let mut bytes = [0u8; 20];
            bytes.copy_from_slice(slice);
            Some(Self(bytes))
        } else {
            None
        }
    }

    /// Parses a hex address, with or without a `0x` prefix.
    ///
    /// # Errors
    ///
    /// Returns `AddressParseError` if the input is not hex or not 20 bytes.
    pub fn from_hex(input: &str) -> Result<Self, AddressParseError> {
        let trimmed = input.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        let bytes =
            hex::decode(digits).map_err(|e| AddressParseError::InvalidHex(e.to_string()))?;
        Self::from_slice(&bytes).ok_or(AddressParseError::InvalidLength(bytes.len()))
    }

    /// Returns the underlying bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Returns true if this is the null address.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// Full lowercase hex form with `0x` prefix.
    #[must_use]
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x")?;
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x")?;
        for byte in &self.0[..4] {
            write!(f, "{byte:02x}")?;
        }
        write!(f, "...")?;
        for byte in &self.0[18..] {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

impl From<Address> for [u8; 20] {
    fn from(addr: Address) -> Self {
        addr.0
    }
}

// =============================================================================
// BYTES (arbitrary length)
// =============================================================================

/// Opaque payload forwarded to a transfer destination.
#[derive(Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Bytes(pub Vec<u8>);

impl Bytes {
    /// Creates an empty payload.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Creates a payload from a slice.
    #[must_use]
    pub fn from_slice(slice: &[u8]) -> Self {
        Self(slice.to_vec())
    }

    /// Returns a reference to the underlying slice.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Returns the length.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Bytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x")?;
        if self.0.len() <= 8 {
            for byte in &self.0 {
                write!(f, "{byte:02x}")?;
            }
        } else {
            for byte in &self.0[..4] {
                write!(f, "{byte:02x}")?;
            }
            write!(f, "..({} bytes)", self.0.len())?;
        }
        Ok(())
    }
}

impl From<Vec<u8>> for Bytes {
    fn from(vec: Vec<u8>) -> Self {
        Self(vec)
    }
}

impl From<&[u8]> for Bytes {
    fn from(slice: &[u8]) -> Self {
        Self::from_slice(slice)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_address() {
        assert!(Address::ZERO.is_zero());
        assert!(!Address::repeat_byte(1).is_zero());
    }

    #[test]
    fn test_from_hex_with_and_without_prefix() {
        let expected = Address::repeat_byte(0xab);
        let hex_body = "ab".repeat(20);

        assert_eq!(Address::from_hex(&hex_body).unwrap(), expected);
        assert_eq!(Address::from_hex(&format!("0x{hex_body}")).unwrap(), expected);
        assert_eq!(format!("0x{hex_body}").parse::<Address>().unwrap(), expected);
    }

    #[test]
    fn test_from_hex_rejects_bad_input() {
        assert!(matches!(
            Address::from_hex("0xzz"),
            Err(AddressParseError::InvalidHex(_))
        ));
        assert_eq!(
            Address::from_hex("0xabcd"),
            Err(AddressParseError::InvalidLength(2))
        );
    }

    #[test]
    fn test_display_is_abbreviated() {
        let addr = Address::repeat_byte(0x11);
        assert_eq!(addr.to_string(), "0x11111111...1111");
        assert_eq!(addr.to_hex().len(), 42);
    }

    #[test]
    fn test_bytes_debug_truncates() {
        let short = Bytes::from_slice(&[1, 2]);
        assert_eq!(format!("{short:?}"), "0x0102");

        let long = Bytes::from(vec![0xffu8; 32]);
        assert_eq!(format!("{long:?}"), "0xffffffff..(32 bytes)");
    }

    #[test]
    fn test_address_serde() {
        let addr = Address::repeat_byte(7);
        let json = serde_json::to_string(&addr).unwrap();
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(addr, back);
    }
}
