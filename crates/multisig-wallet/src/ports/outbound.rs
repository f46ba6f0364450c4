//! # Driven Ports (SPI - Outbound)
//!
//! The settlement runtime the engine depends on to move value and run
//! payload code at the destination.

use crate::domain::entities::SettlementCall;
use crate::errors::SettlementError;
use async_trait::async_trait;
use shared_types::entities::{Address, U256};

/// Runtime that finally moves value.
///
/// ## Contract
///
/// `transfer_and_call` is atomic: either the value moves AND the destination
/// accepts the payload, or nothing changes and an error is returned.
///
/// The destination may call back into the wallet while `transfer_and_call`
/// is outstanding. Implementations must not hold locks across that callback.
#[async_trait]
pub trait SettlementRuntime: Send + Sync {
    /// Transfer `call.value` from `call.from` to `call.to` and invoke the
    /// destination with `call.payload`.
    async fn transfer_and_call(&self, call: SettlementCall) -> Result<(), SettlementError>;

    /// Current holdings of `address`.
    async fn balance_of(&self, address: Address) -> Result<U256, SettlementError>;
}
