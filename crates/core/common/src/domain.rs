//! Wire-level domain constants
//!
//! Byte values match the SBE wire format exactly. `#[repr(u8)]` keeps each
//! enum one byte so they can be packed into order slots and messages without
//! translation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Order side
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Bid side
    Buy = 0,
    /// Ask side
    Sell = 1,
}

impl Side {
    /// The side an aggressor on this side matches against
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }

    /// Wire value
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Decode from the wire value
    #[must_use]
    pub const fn from_wire(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Buy),
            1 => Some(Self::Sell),
            _ => None,
        }
    }

    /// True for the bid side
    #[must_use]
    pub const fn is_buy(self) -> bool {
        matches!(self, Self::Buy)
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// Order type
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderType {
    /// Rest at the limit price if not immediately filled
    Limit = 0,
    /// Fill against available liquidity or reject
    Market = 1,
}

impl OrderType {
    /// Wire value
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Decode from the wire value
    #[must_use]
    pub const fn from_wire(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Limit),
            1 => Some(Self::Market),
            _ => None,
        }
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Limit => write!(f, "LIMIT"),
            Self::Market => write!(f, "MARKET"),
        }
    }
}

/// Execution report type
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExecType {
    /// Order accepted and resting, no fill
    New = 0,
    /// Order partially filled
    PartialFill = 1,
    /// Order completely filled
    Fill = 2,
    /// Order canceled
    Canceled = 3,
    /// Order rejected
    Rejected = 4,
}

impl ExecType {
    /// Wire value
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Decode from the wire value
    #[must_use]
    pub const fn from_wire(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::New),
            1 => Some(Self::PartialFill),
            2 => Some(Self::Fill),
            3 => Some(Self::Canceled),
            4 => Some(Self::Rejected),
            _ => None,
        }
    }
}

impl fmt::Display for ExecType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::New => write!(f, "NEW"),
            Self::PartialFill => write!(f, "PARTIAL_FILL"),
            Self::Fill => write!(f, "FILL"),
            Self::Canceled => write!(f, "CANCELED"),
            Self::Rejected => write!(f, "REJECTED"),
        }
    }
}
