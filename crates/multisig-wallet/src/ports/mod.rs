//! # Ports Layer (Middle Hexagon)
//!
//! Trait definitions between the wallet engine and the outside world.
//!
//! - **Driving Port (Inbound)**: `MultisigWalletApi`
//! - **Driven Port (Outbound)**: `SettlementRuntime`
//! - No concrete implementations in this module

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
