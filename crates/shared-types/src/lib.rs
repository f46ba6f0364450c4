//! # Shared Types Crate
//!
//! Value types used by every crate in the workspace.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: account identifiers, amounts and payloads are
//!   defined once here and reused by the engine and the event bus.
//! - **Null identifier**: `Address::ZERO` is the null account; callers reject it
//!   wherever a real account is required.

pub mod entities;
pub mod errors;

pub use entities::*;
pub use errors::*;
