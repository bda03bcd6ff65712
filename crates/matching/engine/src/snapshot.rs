//! Versioned binary snapshot of engine state
//!
//! Layout (little-endian):
//!
//! ```text
//!   version       : u16
//!   book_count    : u32
//!   message_count : u64
//!   per book:
//!     instrument_id    : u32
//!     live_order_count : u32
//!     per live order, price-time order (bids then asks, levels best-first,
//!     FIFO within a level):
//!       order_id     : u64
//!       price        : i64
//!       client_id    : u64
//!       timestamp_ns : i64
//!       remaining    : i32
//!       side         : u8
//!       order_type   : u8
//! ```
//!
//! Restore resets the engine and replays `add_order` in recorded order,
//! rebuilding identical book state deterministically. Snapshot construction
//! is not a hot path and may allocate.

use crate::engine::MatchingEngine;
use crate::metrics::MetricsSink;
use common::{OrderType, Px, Qty, Side, Ts};
use lob::{BookError, NULL_SLOT};
use thiserror::Error;

/// Current snapshot format version
pub const SNAPSHOT_VERSION: u16 = 1;

/// Snapshot restore failures
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Snapshot written by an unknown format version
    #[error("unsupported snapshot version {0}")]
    UnsupportedVersion(u16),

    /// Snapshot ends before the declared contents
    #[error("snapshot truncated at byte {0}")]
    Truncated(usize),

    /// Snapshot references an instrument this engine does not serve
    #[error("snapshot references unknown instrument {0}")]
    UnknownInstrument(u32),

    /// An order could not be re-added during replay
    #[error("replay failed for order {0}")]
    ReplayFailed(u64),

    /// Restored book failed invariant validation
    #[error("restored book failed validation: {0}")]
    Validation(#[from] BookError),
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], SnapshotError> {
        if self.bytes.len() - self.pos < n {
            return Err(SnapshotError::Truncated(self.pos));
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, SnapshotError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, SnapshotError> {
        let mut b = [0u8; 2];
        b.copy_from_slice(self.take(2)?);
        Ok(u16::from_le_bytes(b))
    }

    fn u32(&mut self) -> Result<u32, SnapshotError> {
        let mut b = [0u8; 4];
        b.copy_from_slice(self.take(4)?);
        Ok(u32::from_le_bytes(b))
    }

    fn i32(&mut self) -> Result<i32, SnapshotError> {
        let mut b = [0u8; 4];
        b.copy_from_slice(self.take(4)?);
        Ok(i32::from_le_bytes(b))
    }

    fn u64(&mut self) -> Result<u64, SnapshotError> {
        let mut b = [0u8; 8];
        b.copy_from_slice(self.take(8)?);
        Ok(u64::from_le_bytes(b))
    }

    fn i64(&mut self) -> Result<i64, SnapshotError> {
        let mut b = [0u8; 8];
        b.copy_from_slice(self.take(8)?);
        Ok(i64::from_le_bytes(b))
    }
}

impl<M: MetricsSink> MatchingEngine<M> {
    /// Serialize every book's live orders in price-time order
    pub fn snapshot_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&SNAPSHOT_VERSION.to_le_bytes());

        let book_count = self.books.iter().flatten().count() as u32;
        out.extend_from_slice(&book_count.to_le_bytes());
        out.extend_from_slice(&self.message_count.to_le_bytes());

        for book in self.books.iter().flatten() {
            out.extend_from_slice(&book.instrument().as_u32().to_le_bytes());
            out.extend_from_slice(&(book.live_order_count() as u32).to_le_bytes());

            for side in [Side::Buy, Side::Sell] {
                let level_count = match side {
                    Side::Buy => book.bid_level_count(),
                    Side::Sell => book.ask_level_count(),
                };
                for level in 0..level_count {
                    let mut slot = book.head_order_slot(side, level);
                    while slot != NULL_SLOT {
                        let record = book.slot(slot);
                        out.extend_from_slice(&record.order_id().to_le_bytes());
                        out.extend_from_slice(&record.price().as_i64().to_le_bytes());
                        out.extend_from_slice(&record.client_id().to_le_bytes());
                        out.extend_from_slice(&record.timestamp_ns().as_nanos().to_le_bytes());
                        out.extend_from_slice(&record.remaining().as_i32().to_le_bytes());
                        out.push(record.side().as_u8());
                        out.push(record.order_type().as_u8());
                        slot = record.next();
                    }
                }
            }
        }
    }

    /// Reset the engine and rebuild state by replaying the snapshot
    pub fn restore(&mut self, bytes: &[u8]) -> Result<(), SnapshotError> {
        let mut reader = Reader::new(bytes);

        let version = reader.u16()?;
        if version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion(version));
        }
        let book_count = reader.u32()?;
        let message_count = reader.u64()?;

        self.reset();

        for _ in 0..book_count {
            let instrument_id = reader.u32()?;
            let live_order_count = reader.u32()?;

            for _ in 0..live_order_count {
                let order_id = reader.u64()?;
                let price = reader.i64()?;
                let client_id = reader.u64()?;
                let timestamp_ns = reader.i64()?;
                let remaining = reader.i32()?;
                let side = if reader.u8()? == Side::Sell.as_u8() {
                    Side::Sell
                } else {
                    Side::Buy
                };
                let order_type = if reader.u8()? == OrderType::Market.as_u8() {
                    OrderType::Market
                } else {
                    OrderType::Limit
                };

                let book = self
                    .books
                    .get_mut(instrument_id as usize)
                    .and_then(Option::as_mut)
                    .ok_or(SnapshotError::UnknownInstrument(instrument_id))?;

                let slot = book.add_order(
                    order_id,
                    Px::from_i64(price),
                    client_id,
                    Ts::from_nanos(timestamp_ns),
                    Qty::new(remaining),
                    side,
                    order_type,
                );
                if slot == NULL_SLOT {
                    return Err(SnapshotError::ReplayFailed(order_id));
                }
            }

            let book = self
                .books
                .get(instrument_id as usize)
                .and_then(Option::as_ref)
                .ok_or(SnapshotError::UnknownInstrument(instrument_id))?;
            book.validate()?;
        }

        self.message_count = message_count;
        Ok(())
    }
}
