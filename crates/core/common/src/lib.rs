//! Core types for the Chronos matching system
//!
//! Fixed-point value types and wire-level domain constants shared by the
//! order book, the matching engine, and the codec layer. Everything here is
//! `Copy`, integer-backed, and exact — no floating point participates in
//! matching decisions.

#![deny(warnings)]
#![deny(clippy::all)]
#![deny(missing_docs)]

pub mod domain;
pub mod types;

pub use domain::{ExecType, OrderType, Side};
pub use types::{Px, Qty, Symbol, Ts};
