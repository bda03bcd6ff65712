//! Per-instrument order book
//!
//! Two Structure-of-Arrays sides (bids descending, asks ascending), each
//! level owning a doubly-linked FIFO queue of slots from the shared pool.
//! Level insertion and collapse shift the parallel arrays and rewrite the
//! `level_index` of every shifted order, keeping the price arrays contiguous
//! so the scanner can sweep them with wide loads.

use crate::slots::{OrderSlot, SlotPool, NULL_SLOT};
use common::{OrderType, Px, Qty, Side, Symbol, Ts};
use rustc_hash::{FxBuildHasher, FxHashMap};
use thiserror::Error;

/// Maximum number of price levels per side. 8 KB of prices per side stays
/// L1-cache-resident.
pub const MAX_LEVELS: usize = 1024;

/// Maximum number of live orders per book
pub const MAX_ORDERS: usize = 1_048_576;

/// Structural inconsistencies surfaced by [`OrderBook::validate`]
#[derive(Debug, Error)]
pub enum BookError {
    /// Price array not strictly sorted
    #[error("{side} prices out of order at level {index}")]
    SortOrder {
        /// Side of the violation
        side: Side,
        /// First offending level
        index: usize,
    },

    /// Recorded aggregate quantity disagrees with the queue contents
    #[error("{side} level {index} aggregate mismatch: recorded {recorded}, queued {queued}")]
    AggregateMismatch {
        /// Side of the violation
        side: Side,
        /// Offending level
        index: usize,
        /// Aggregate stored in the level array
        recorded: i64,
        /// Sum of remaining over the FIFO queue
        queued: i64,
    },

    /// Recorded order count disagrees with the queue length
    #[error("{side} level {index} order count mismatch: recorded {recorded}, queued {queued}")]
    OrderCountMismatch {
        /// Side of the violation
        side: Side,
        /// Offending level
        index: usize,
        /// Count stored in the level array
        recorded: u32,
        /// Queue length found by walking
        queued: u32,
    },

    /// Slot's level_index does not point at the level it is queued on
    #[error("slot {slot} carries level index {found}, queued at {expected}")]
    LevelIndexMismatch {
        /// Offending slot
        slot: i32,
        /// level_index stored in the slot
        found: i32,
        /// Level the slot was actually reached from
        expected: i32,
    },

    /// Slot price differs from its level price
    #[error("slot {slot} price {slot_price} differs from level price {level_price}")]
    PriceMismatch {
        /// Offending slot
        slot: i32,
        /// Price stored in the slot
        slot_price: i64,
        /// Price stored in the level array
        level_price: i64,
    },

    /// Slot queued on the wrong side
    #[error("slot {slot} queued on the wrong side")]
    SideMismatch {
        /// Offending slot
        slot: i32,
    },

    /// Live slot with non-positive remaining quantity
    #[error("slot {slot} live with non-positive remaining {remaining}")]
    NonPositiveRemaining {
        /// Offending slot
        slot: i32,
        /// Remaining quantity found
        remaining: i32,
    },

    /// FIFO back-link or tail pointer broken
    #[error("broken FIFO linkage at slot {slot}")]
    BrokenLinkage {
        /// Offending slot
        slot: i32,
    },

    /// Slot reachable twice (two queues, or queue and free list)
    #[error("slot {slot} reachable from more than one owner")]
    SlotAliased {
        /// Offending slot
        slot: i32,
    },

    /// Free list walk did not terminate
    #[error("free list corrupt: cycle detected")]
    FreeListCycle,

    /// live + free does not cover the pool
    #[error("partition broken: {live} live + {free} free != capacity {capacity}")]
    PartitionMismatch {
        /// Live orders counted by queue walk
        live: usize,
        /// Free list length
        free: usize,
        /// Pool capacity
        capacity: usize,
    },

    /// order-id index entry does not resolve to a matching live slot
    #[error("order index entry {order_id} does not resolve to a live slot")]
    IndexMismatch {
        /// Offending order id
        order_id: u64,
    },
}

/// One side of the book: parallel arrays indexed by level, best at index 0
#[derive(Debug)]
struct SideLevels {
    prices: Box<[i64]>,
    agg_qty: Box<[i64]>,
    order_count: Box<[u32]>,
    head: Box<[i32]>,
    tail: Box<[i32]>,
    len: usize,
    max_levels: usize,
}

impl SideLevels {
    fn new(max_levels: usize) -> Self {
        Self {
            prices: vec![0i64; max_levels].into_boxed_slice(),
            agg_qty: vec![0i64; max_levels].into_boxed_slice(),
            order_count: vec![0u32; max_levels].into_boxed_slice(),
            head: vec![NULL_SLOT; max_levels].into_boxed_slice(),
            tail: vec![NULL_SLOT; max_levels].into_boxed_slice(),
            len: 0,
            max_levels,
        }
    }

    fn reset(&mut self) {
        self.prices.fill(0);
        self.agg_qty.fill(0);
        self.order_count.fill(0);
        self.head.fill(NULL_SLOT);
        self.tail.fill(NULL_SLOT);
        self.len = 0;
    }

    fn clear_entry(&mut self, index: usize) {
        self.prices[index] = 0;
        self.agg_qty[index] = 0;
        self.order_count[index] = 0;
        self.head[index] = NULL_SLOT;
        self.tail[index] = NULL_SLOT;
    }
}

/// Walk a level queue rewriting every slot's level_index
fn relabel_queue(pool: &mut SlotPool, mut cursor: i32, level: i32) {
    while cursor != NULL_SLOT {
        let record = pool.get_mut(cursor);
        record.level_index = level;
        cursor = record.next;
    }
}

/// Find or create the level for `price` and append `slot` at its FIFO tail.
///
/// Returns the level index, or `None` when a new level is needed but the
/// side already holds `max_levels` (the caller must release the slot).
fn insert_into_level(
    levels: &mut SideLevels,
    pool: &mut SlotPool,
    slot: i32,
    price: i64,
    is_buy: bool,
) -> Option<usize> {
    let len = levels.len;
    let mut found = None;

    for i in 0..len {
        let level_price = levels.prices[i];
        if level_price == price {
            found = Some(i);
            break;
        }
        let insert_before = if is_buy {
            price > level_price
        } else {
            price < level_price
        };
        if insert_before {
            if len == levels.max_levels {
                return None;
            }
            levels.prices.copy_within(i..len, i + 1);
            levels.agg_qty.copy_within(i..len, i + 1);
            levels.order_count.copy_within(i..len, i + 1);
            levels.head.copy_within(i..len, i + 1);
            levels.tail.copy_within(i..len, i + 1);
            levels.len += 1;
            for j in (i + 1)..=len {
                relabel_queue(pool, levels.head[j], j as i32);
            }
            levels.clear_entry(i);
            levels.prices[i] = price;
            found = Some(i);
            break;
        }
    }

    let index = match found {
        Some(i) => i,
        None => {
            // Less aggressive than every existing level: append at the end
            if len == levels.max_levels {
                return None;
            }
            levels.clear_entry(len);
            levels.prices[len] = price;
            levels.len += 1;
            len
        }
    };

    let tail = levels.tail[index];
    let remaining;
    {
        let record = pool.get_mut(slot);
        record.level_index = index as i32;
        record.prev = tail;
        record.next = NULL_SLOT;
        remaining = record.remaining.as_i32() as i64;
    }
    levels.agg_qty[index] += remaining;
    levels.order_count[index] += 1;
    if tail == NULL_SLOT {
        levels.head[index] = slot;
    } else {
        pool.get_mut(tail).next = slot;
    }
    levels.tail[index] = slot;

    Some(index)
}

/// Shift levels `[index+1..len)` left by one and rewrite their queues
fn collapse_level(levels: &mut SideLevels, pool: &mut SlotPool, index: usize) {
    let len = levels.len;
    let shifted = len - index - 1;
    if shifted > 0 {
        levels.prices.copy_within(index + 1..len, index);
        levels.agg_qty.copy_within(index + 1..len, index);
        levels.order_count.copy_within(index + 1..len, index);
        levels.head.copy_within(index + 1..len, index);
        levels.tail.copy_within(index + 1..len, index);
        for i in index..index + shifted {
            relabel_queue(pool, levels.head[i], i as i32);
        }
    }
    levels.len -= 1;
    levels.clear_entry(levels.len);
}

/// Unlink `slot` from its level queue, fixing aggregates; collapses the
/// level when its last order leaves.
fn unlink_from_level(levels: &mut SideLevels, pool: &mut SlotPool, slot: i32, index: usize) {
    let (next, prev, remaining) = {
        let record = pool.get(slot);
        (record.next, record.prev, record.remaining().as_i32() as i64)
    };

    levels.agg_qty[index] -= remaining;
    assert!(
        levels.agg_qty[index] >= 0,
        "negative aggregate quantity at level {index} after unlinking slot {slot}"
    );
    levels.order_count[index] -= 1;

    if prev == NULL_SLOT {
        levels.head[index] = next;
    } else {
        pool.get_mut(prev).next = next;
    }
    if next == NULL_SLOT {
        levels.tail[index] = prev;
    } else {
        pool.get_mut(next).prev = prev;
    }

    if levels.order_count[index] == 0 {
        collapse_level(levels, pool, index);
    }
}

/// Per-instrument limit order book over a pre-allocated slot pool.
///
/// All memory is owned by the book and allocated at construction; the
/// mutating operations are allocation-free. Strictly single-threaded.
#[derive(Debug)]
pub struct OrderBook {
    instrument: Symbol,
    bids: SideLevels,
    asks: SideLevels,
    pool: SlotPool,
    /// order id -> slot, kept in lockstep with add/remove for cancels
    order_index: FxHashMap<u64, i32>,
    live_order_count: usize,
}

impl OrderBook {
    /// Construct a book with the default capacity
    /// ([`MAX_ORDERS`] slots, [`MAX_LEVELS`] levels per side)
    #[must_use]
    pub fn new(instrument: Symbol) -> Self {
        Self::with_capacity(instrument, MAX_ORDERS, MAX_LEVELS)
    }

    /// Construct a book with explicit capacities, fixed for its lifetime
    ///
    /// # Panics
    /// Panics if either capacity is zero or `max_orders` exceeds the i32
    /// index range.
    #[must_use]
    pub fn with_capacity(instrument: Symbol, max_orders: usize, max_levels: usize) -> Self {
        assert!(max_levels > 0, "max_levels must be non-zero");
        Self {
            instrument,
            bids: SideLevels::new(max_levels),
            asks: SideLevels::new(max_levels),
            pool: SlotPool::new(max_orders),
            order_index: FxHashMap::with_capacity_and_hasher(max_orders, FxBuildHasher),
            live_order_count: 0,
        }
    }

    /// Instrument this book serves
    #[must_use]
    pub fn instrument(&self) -> Symbol {
        self.instrument
    }

    /// Number of live orders across both sides
    #[must_use]
    pub fn live_order_count(&self) -> usize {
        self.live_order_count
    }

    /// Active bid levels
    #[must_use]
    pub fn bid_level_count(&self) -> usize {
        self.bids.len
    }

    /// Active ask levels
    #[must_use]
    pub fn ask_level_count(&self) -> usize {
        self.asks.len
    }

    /// Active bid prices, strictly descending, best first
    #[must_use]
    pub fn bid_prices(&self) -> &[i64] {
        &self.bids.prices[..self.bids.len]
    }

    /// Active ask prices, strictly ascending, best first
    #[must_use]
    pub fn ask_prices(&self) -> &[i64] {
        &self.asks.prices[..self.asks.len]
    }

    /// Best bid price, or [`Px::MIN`] when the bid side is empty
    #[must_use]
    pub fn best_bid(&self) -> Px {
        if self.bids.len > 0 {
            Px::from_i64(self.bids.prices[0])
        } else {
            Px::MIN
        }
    }

    /// Best ask price, or [`Px::MAX`] when the ask side is empty
    #[must_use]
    pub fn best_ask(&self) -> Px {
        if self.asks.len > 0 {
            Px::from_i64(self.asks.prices[0])
        } else {
            Px::MAX
        }
    }

    /// Aggregate resting quantity at a level
    #[must_use]
    pub fn level_quantity(&self, side: Side, level: usize) -> i64 {
        match side {
            Side::Buy => self.bids.agg_qty[level],
            Side::Sell => self.asks.agg_qty[level],
        }
    }

    /// Number of orders queued at a level
    #[must_use]
    pub fn level_order_count(&self, side: Side, level: usize) -> u32 {
        match side {
            Side::Buy => self.bids.order_count[level],
            Side::Sell => self.asks.order_count[level],
        }
    }

    /// Head of the FIFO queue at a level, `NULL_SLOT` if out of range
    #[must_use]
    pub fn head_order_slot(&self, side: Side, level: usize) -> i32 {
        let levels = match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        };
        if level < levels.len {
            levels.head[level]
        } else {
            NULL_SLOT
        }
    }

    /// Shared access to a slot record
    #[must_use]
    pub fn slot(&self, slot: i32) -> &OrderSlot {
        self.pool.get(slot)
    }

    /// Resolve an order id to its slot, if live
    #[must_use]
    pub fn lookup_order(&self, order_id: u64) -> Option<i32> {
        self.order_index.get(&order_id).copied()
    }

    /// Allocate a slot, populate it, and queue it at its price level.
    ///
    /// Returns the slot index. Returns `NULL_SLOT` — leaving the book
    /// untouched — when the pool is exhausted or the side already holds the
    /// maximum number of price levels and a new one would be needed.
    ///
    /// Order ids are assumed unique per book; the gateway enforces this
    /// upstream.
    #[allow(clippy::too_many_arguments)]
    pub fn add_order(
        &mut self,
        order_id: u64,
        price: Px,
        client_id: u64,
        timestamp_ns: Ts,
        quantity: Qty,
        side: Side,
        order_type: OrderType,
    ) -> i32 {
        debug_assert!(quantity.as_i32() > 0, "add_order requires positive quantity");

        let slot = self.pool.alloc();
        if slot == NULL_SLOT {
            return NULL_SLOT;
        }

        {
            let record = self.pool.get_mut(slot);
            record.order_id = order_id;
            record.price = price;
            record.client_id = client_id;
            record.timestamp_ns = timestamp_ns;
            record.quantity = quantity;
            record.remaining = quantity;
            record.instrument_id = self.instrument.as_u32();
            record.side = side;
            record.order_type = order_type;
            record.next = NULL_SLOT;
            record.prev = NULL_SLOT;
            record.level_index = NULL_SLOT;
        }

        let (levels, pool) = match side {
            Side::Buy => (&mut self.bids, &mut self.pool),
            Side::Sell => (&mut self.asks, &mut self.pool),
        };
        if insert_into_level(levels, pool, slot, price.as_i64(), side.is_buy()).is_none() {
            // Side is at max_levels: refuse the add rather than orphan the slot
            self.pool.free(slot);
            return NULL_SLOT;
        }

        self.live_order_count += 1;
        self.order_index.insert(order_id, slot);
        slot
    }

    /// Unlink an order and return its slot to the free list.
    ///
    /// Returns the remaining quantity at the moment of removal. Removing an
    /// out-of-range or already-freed slot returns zero and has no effect.
    pub fn remove_order(&mut self, slot: i32) -> Qty {
        if !self.pool.contains(slot) {
            return Qty::ZERO;
        }
        let (remaining, side, level_index, order_id) = {
            let record = self.pool.get(slot);
            (
                record.remaining(),
                record.side(),
                record.level_index,
                record.order_id(),
            )
        };
        if level_index == NULL_SLOT {
            return Qty::ZERO;
        }

        let (levels, pool) = match side {
            Side::Buy => (&mut self.bids, &mut self.pool),
            Side::Sell => (&mut self.asks, &mut self.pool),
        };
        unlink_from_level(levels, pool, slot, level_index as usize);

        self.pool.free(slot);
        self.live_order_count -= 1;
        self.order_index.remove(&order_id);
        remaining
    }

    /// Reduce an order's remaining quantity after a fill.
    ///
    /// Returns the new remaining quantity. Does not remove the slot when it
    /// reaches zero — the caller removes after emitting its report.
    ///
    /// # Panics
    /// Panics on an unlinked slot or if the level aggregate would go
    /// negative; either means corrupt state and the process must not
    /// continue diverging.
    pub fn reduce_quantity(&mut self, slot: i32, fill_qty: Qty) -> Qty {
        let (new_remaining, side, level_index) = {
            let record = self.pool.get_mut(slot);
            debug_assert!(
                fill_qty.as_i32() > 0 && fill_qty <= record.remaining,
                "fill {fill_qty} out of range for slot {slot}"
            );
            let new_remaining = Qty::new(record.remaining.as_i32() - fill_qty.as_i32());
            record.remaining = new_remaining;
            (new_remaining, record.side, record.level_index)
        };
        assert!(
            level_index != NULL_SLOT,
            "reduce_quantity on unlinked slot {slot}"
        );

        let levels = match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        };
        let index = level_index as usize;
        levels.agg_qty[index] -= fill_qty.as_i32() as i64;
        assert!(
            levels.agg_qty[index] >= 0,
            "negative aggregate quantity at level {index} after fill on slot {slot}"
        );

        new_remaining
    }

    /// Restore the empty post-construction state without reallocating
    pub fn reset(&mut self) {
        self.bids.reset();
        self.asks.reset();
        self.pool.reset();
        self.order_index.clear();
        self.live_order_count = 0;
    }

    /// Walk the whole structure checking every invariant.
    ///
    /// Diagnostic: O(capacity) and allocating, for tests and post-restore
    /// verification — never the hot path.
    pub fn validate(&self) -> Result<(), BookError> {
        let capacity = self.pool.capacity();
        let mut seen = vec![false; capacity];
        let mut live = 0usize;

        for (side, levels) in [(Side::Buy, &self.bids), (Side::Sell, &self.asks)] {
            for i in 0..levels.len {
                if i + 1 < levels.len {
                    let ordered = if side.is_buy() {
                        levels.prices[i] > levels.prices[i + 1]
                    } else {
                        levels.prices[i] < levels.prices[i + 1]
                    };
                    if !ordered {
                        return Err(BookError::SortOrder { side, index: i });
                    }
                }

                let mut queued_qty = 0i64;
                let mut queued_count = 0u32;
                let mut prev = NULL_SLOT;
                let mut cursor = levels.head[i];
                while cursor != NULL_SLOT {
                    if seen[cursor as usize] {
                        return Err(BookError::SlotAliased { slot: cursor });
                    }
                    seen[cursor as usize] = true;

                    let record = self.pool.get(cursor);
                    if record.level_index != i as i32 {
                        return Err(BookError::LevelIndexMismatch {
                            slot: cursor,
                            found: record.level_index,
                            expected: i as i32,
                        });
                    }
                    if record.side() != side {
                        return Err(BookError::SideMismatch { slot: cursor });
                    }
                    if record.price().as_i64() != levels.prices[i] {
                        return Err(BookError::PriceMismatch {
                            slot: cursor,
                            slot_price: record.price().as_i64(),
                            level_price: levels.prices[i],
                        });
                    }
                    if record.remaining().as_i32() <= 0 {
                        return Err(BookError::NonPositiveRemaining {
                            slot: cursor,
                            remaining: record.remaining().as_i32(),
                        });
                    }
                    if record.prev != prev {
                        return Err(BookError::BrokenLinkage { slot: cursor });
                    }

                    queued_qty += record.remaining().as_i32() as i64;
                    queued_count += 1;
                    live += 1;
                    prev = cursor;
                    cursor = record.next;
                }

                if levels.tail[i] != prev {
                    return Err(BookError::BrokenLinkage {
                        slot: levels.tail[i],
                    });
                }
                if queued_count == 0 || queued_count != levels.order_count[i] {
                    return Err(BookError::OrderCountMismatch {
                        side,
                        index: i,
                        recorded: levels.order_count[i],
                        queued: queued_count,
                    });
                }
                if queued_qty != levels.agg_qty[i] {
                    return Err(BookError::AggregateMismatch {
                        side,
                        index: i,
                        recorded: levels.agg_qty[i],
                        queued: queued_qty,
                    });
                }
            }
        }

        if live != self.live_order_count {
            return Err(BookError::PartitionMismatch {
                live: self.live_order_count,
                free: 0,
                capacity,
            });
        }

        let mut free = 0usize;
        let mut cursor = self.pool.free_head();
        while cursor != NULL_SLOT {
            if seen[cursor as usize] {
                return Err(BookError::SlotAliased { slot: cursor });
            }
            seen[cursor as usize] = true;
            free += 1;
            if free > capacity {
                return Err(BookError::FreeListCycle);
            }
            cursor = self.pool.get(cursor).next;
        }
        if live + free != capacity {
            return Err(BookError::PartitionMismatch {
                live,
                free,
                capacity,
            });
        }

        if self.order_index.len() != live {
            return Err(BookError::PartitionMismatch {
                live: self.order_index.len(),
                free,
                capacity,
            });
        }
        for (&order_id, &slot) in &self.order_index {
            if !self.pool.contains(slot) {
                return Err(BookError::IndexMismatch { order_id });
            }
            let record = self.pool.get(slot);
            if record.level_index == NULL_SLOT || record.order_id() != order_id {
                return Err(BookError::IndexMismatch { order_id });
            }
        }

        Ok(())
    }
}
