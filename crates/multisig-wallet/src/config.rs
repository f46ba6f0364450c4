//! # Wallet Configuration
//!
//! Initial owner list, threshold and wallet address.
//!
//! ## Environment
//!
//! | Variable              | Format                         | Required |
//! |-----------------------|--------------------------------|----------|
//! | `QV_WALLET_ADDRESS`   | 20-byte hex, `0x` optional     | yes      |
//! | `QV_WALLET_OWNERS`    | comma-separated addresses      | yes      |
//! | `QV_WALLET_THRESHOLD` | positive integer               | yes      |

use crate::domain::owners::OwnerRegistry;
use crate::errors::{ConfigError, WalletError};
use serde::{Deserialize, Serialize};
use shared_types::entities::Address;

/// Environment variable holding the wallet's own address.
pub const ENV_ADDRESS: &str = "QV_WALLET_ADDRESS";
/// Environment variable holding the initial owners.
pub const ENV_OWNERS: &str = "QV_WALLET_OWNERS";
/// Environment variable holding the threshold.
pub const ENV_THRESHOLD: &str = "QV_WALLET_THRESHOLD";

/// Construction parameters of a wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletConfig {
    /// The wallet's own account; value sent here is a deposit.
    pub address: Address,
    /// Initial owners, in enumeration order.
    pub owners: Vec<Address>,
    /// Initial confirmation threshold.
    pub threshold: usize,
}

impl WalletConfig {
    /// Wallet configuration from its parts.
    #[must_use]
    pub fn new(address: Address, owners: Vec<Address>, threshold: usize) -> Self {
        Self {
            address,
            owners,
            threshold,
        }
    }

    /// Load from process environment variables.
    ///
    /// # Errors
    ///
    /// See [`WalletConfig::from_lookup`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load through an arbitrary key lookup, then validate.
    ///
    /// # Errors
    ///
    /// `Missing` for an absent required key, `InvalidAddress` / `InvalidValue`
    /// for unparsable values, `Rejected` if the parsed values fail
    /// [`WalletConfig::validate`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| lookup(key).ok_or(ConfigError::Missing(key));

        let address = parse_address(ENV_ADDRESS, &required(ENV_ADDRESS)?)?;

        let owners = required(ENV_OWNERS)?
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| parse_address(ENV_OWNERS, s))
            .collect::<Result<Vec<_>, _>>()?;

        let raw = required(ENV_THRESHOLD)?;
        let threshold = raw
            .trim()
            .parse::<usize>()
            .map_err(|_| ConfigError::InvalidValue {
                key: ENV_THRESHOLD,
                value: raw.clone(),
            })?;

        let config = Self::new(address, owners, threshold);
        config.validate()?;
        Ok(config)
    }

    /// Apply the construction rules without building a wallet.
    ///
    /// # Errors
    ///
    /// `Rejected(ZeroAddress)` for a null wallet address, otherwise the
    /// construction errors of [`OwnerRegistry::new`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.address.is_zero() {
            return Err(WalletError::ZeroAddress.into());
        }
        OwnerRegistry::new(self.owners.clone(), self.threshold)?;
        Ok(())
    }
}

fn parse_address(key: &'static str, raw: &str) -> Result<Address, ConfigError> {
    Address::from_hex(raw.trim()).map_err(|source| ConfigError::InvalidAddress { key, source })
}

// =============================================================================
// TESTS
// =============================================================================
