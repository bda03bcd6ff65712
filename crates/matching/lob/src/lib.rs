//! Pre-allocated limit order book
//!
//! Structure-of-arrays price levels over a contiguous pool of 64-byte order
//! slots. All memory is allocated at construction; add/remove/reduce and the
//! top-of-book queries perform zero heap allocation. Designed for pinned-core,
//! single-threaded operation driven by a totally-ordered command log.

#![deny(warnings)]
#![deny(clippy::all)]

pub mod book;
pub mod slots;

pub use book::{BookError, OrderBook, MAX_LEVELS, MAX_ORDERS};
pub use slots::{OrderSlot, SlotPool, NULL_SLOT, ORDER_SLOT_SIZE};
