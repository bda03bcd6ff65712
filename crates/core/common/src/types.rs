//! Fixed-point value types used throughout the matching core

use serde::{Deserialize, Serialize};
use std::fmt;

/// Instrument identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Symbol(pub u32);

impl Symbol {
    /// Create a new Symbol with given ID
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw instrument id
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SYM_{}", self.0)
    }
}

/// Price type (stored as i64 fixed-point for determinism, scale 10^8)
///
/// `repr(transparent)` guarantees the same layout and ABI as a raw `i64` so
/// the type can live inside fixed-layout records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Px(i64);

impl Px {
    /// Fixed-point scale: 1 raw unit = 10^-8 of the quoted price
    pub const SCALE: i64 = 100_000_000;

    /// Zero price
    pub const ZERO: Self = Self(0);

    /// Sentinel returned by best-bid queries on an empty bid side
    pub const MIN: Self = Self(i64::MIN);

    /// Sentinel returned by best-ask queries on an empty ask side
    pub const MAX: Self = Self(i64::MAX);

    /// Create a new Price from f64. Test and configuration convenience only —
    /// nothing on the matching path goes through floating point.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn new(value: f64) -> Self {
        Self((value * Self::SCALE as f64).round() as i64)
    }

    /// Get the price as f64
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(self) -> f64 {
        self.0 as f64 / Self::SCALE as f64
    }

    /// Get the raw fixed-point value
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        self.0
    }

    /// Create from a raw fixed-point value
    #[must_use]
    pub const fn from_i64(raw: i64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for Px {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.8}", self.as_f64())
    }
}

/// Quantity type for order sizes (i32, non-negative in valid states)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Qty(i32);

impl Qty {
    /// Zero quantity
    pub const ZERO: Self = Self(0);

    /// Create a new Quantity
    #[must_use]
    pub const fn new(units: i32) -> Self {
        Self(units)
    }

    /// Get the raw quantity
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    /// Check if quantity is zero
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Qty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Timestamp in nanoseconds, assigned by the replicated log.
///
/// Deliberately has no wall-clock constructor: the cluster timestamp is the
/// only permitted time input, identical across replicas for the same command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Ts(i64);

impl Ts {
    /// Create timestamp from nanoseconds
    #[must_use]
    pub const fn from_nanos(nanos: i64) -> Self {
        Self(nanos)
    }

    /// Get timestamp as nanoseconds
    #[must_use]
    pub const fn as_nanos(self) -> i64 {
        self.0
    }
}

impl fmt::Display for Ts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ns", self.0)
    }
}
