//! # Domain Layer (Inner Hexagon)
//!
//! Pure wallet logic: owner registry, transaction ledger, confirmation
//! tracker, their composition, and the invariant checks.
//! NO I/O, NO async.
//!
//! Dependencies point INWARD only (the engine and adapters depend on this,
//! not vice versa).

pub mod confirmations;
pub mod entities;
pub mod invariants;
pub mod ledger;
pub mod owners;
pub mod state;

pub use confirmations::*;
pub use entities::*;
pub use invariants::*;
pub use ledger::*;
pub use owners::*;
pub use state::*;
