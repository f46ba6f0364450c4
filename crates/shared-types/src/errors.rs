//! # Error Types
//!
//! Errors produced while parsing shared value types.

use thiserror::Error;

/// Errors from parsing a textual account identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressParseError {
    /// The input is not valid hexadecimal.
    #[error("Invalid hex in address: {0}")]
    InvalidHex(String),

    /// The decoded input is not 20 bytes long.
    #[error("Invalid address length: expected 20 bytes, got {0}")]
    InvalidLength(usize),
}
