//! # Adapters Layer (Outer Hexagon)
//!
//! Implementations of the driven ports.

pub mod settlement;

pub use settlement::*;
