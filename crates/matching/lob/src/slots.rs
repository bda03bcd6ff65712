//! Order slot pool
//!
//! One contiguous allocation of cache-line-sized order records, recycled
//! through an intrusive free list. Slot indices (not pointers) are the
//! external handles: they stay stable until the slot is freed and let the
//! book validate structural invariants cheaply.

use common::{OrderType, Px, Qty, Side, Ts};
use std::mem::{align_of, offset_of, size_of};

/// Sentinel index meaning "no slot" in linked lists and level heads
pub const NULL_SLOT: i32 = -1;

/// Bytes per order slot, one cache line
pub const ORDER_SLOT_SIZE: usize = 64;

/// One live or free order record.
///
/// Layout is fixed (`repr(C, align(64))`, compile-time asserted):
///
/// ```text
///   order_id     : u64 @ 0
///   price        : i64 @ 8
///   client_id    : u64 @ 16
///   timestamp_ns : i64 @ 24
///   quantity     : i32 @ 32
///   remaining    : i32 @ 36
///   instrument_id: u32 @ 40
///   side         : u8  @ 44
///   order_type   : u8  @ 45
///   next         : i32 @ 48    intrusive FIFO / free-list link
///   prev         : i32 @ 52
///   level_index  : i32 @ 56    index into the side's price-level arrays
/// ```
#[repr(C, align(64))]
#[derive(Debug, Clone, Copy)]
pub struct OrderSlot {
    pub(crate) order_id: u64,
    pub(crate) price: Px,
    pub(crate) client_id: u64,
    pub(crate) timestamp_ns: Ts,
    pub(crate) quantity: Qty,
    pub(crate) remaining: Qty,
    pub(crate) instrument_id: u32,
    pub(crate) side: Side,
    pub(crate) order_type: OrderType,
    _pad0: [u8; 2],
    pub(crate) next: i32,
    pub(crate) prev: i32,
    pub(crate) level_index: i32,
    _pad1: [u8; 4],
}

const _: () = {
    assert!(size_of::<OrderSlot>() == ORDER_SLOT_SIZE);
    assert!(align_of::<OrderSlot>() == 64);
    assert!(offset_of!(OrderSlot, order_id) == 0);
    assert!(offset_of!(OrderSlot, price) == 8);
    assert!(offset_of!(OrderSlot, client_id) == 16);
    assert!(offset_of!(OrderSlot, timestamp_ns) == 24);
    assert!(offset_of!(OrderSlot, quantity) == 32);
    assert!(offset_of!(OrderSlot, remaining) == 36);
    assert!(offset_of!(OrderSlot, instrument_id) == 40);
    assert!(offset_of!(OrderSlot, side) == 44);
    assert!(offset_of!(OrderSlot, order_type) == 45);
    assert!(offset_of!(OrderSlot, next) == 48);
    assert!(offset_of!(OrderSlot, prev) == 52);
    assert!(offset_of!(OrderSlot, level_index) == 56);
};

impl OrderSlot {
    const fn empty() -> Self {
        Self {
            order_id: 0,
            price: Px::ZERO,
            client_id: 0,
            timestamp_ns: Ts::from_nanos(0),
            quantity: Qty::ZERO,
            remaining: Qty::ZERO,
            instrument_id: 0,
            side: Side::Buy,
            order_type: OrderType::Limit,
            _pad0: [0; 2],
            next: NULL_SLOT,
            prev: NULL_SLOT,
            level_index: NULL_SLOT,
            _pad1: [0; 4],
        }
    }

    /// Order identifier
    #[inline]
    #[must_use]
    pub fn order_id(&self) -> u64 {
        self.order_id
    }

    /// Limit price
    #[inline]
    #[must_use]
    pub fn price(&self) -> Px {
        self.price
    }

    /// Owning client
    #[inline]
    #[must_use]
    pub fn client_id(&self) -> u64 {
        self.client_id
    }

    /// Timestamp the order was accepted at
    #[inline]
    #[must_use]
    pub fn timestamp_ns(&self) -> Ts {
        self.timestamp_ns
    }

    /// Original quantity
    #[inline]
    #[must_use]
    pub fn quantity(&self) -> Qty {
        self.quantity
    }

    /// Unfilled quantity
    #[inline]
    #[must_use]
    pub fn remaining(&self) -> Qty {
        self.remaining
    }

    /// Side the order rests on
    #[inline]
    #[must_use]
    pub fn side(&self) -> Side {
        self.side
    }

    /// Order type
    #[inline]
    #[must_use]
    pub fn order_type(&self) -> OrderType {
        self.order_type
    }

    /// Next slot in the level FIFO (or free list), `NULL_SLOT` at the end
    #[inline]
    #[must_use]
    pub fn next(&self) -> i32 {
        self.next
    }
}

/// Fixed-capacity pool of order slots.
///
/// A single contiguous boxed slice allocated once; free slots are chained
/// through their `next` field. `alloc`/`free` are O(1) pointer bumps.
#[derive(Debug)]
pub struct SlotPool {
    slots: Box<[OrderSlot]>,
    free_head: i32,
}

impl SlotPool {
    /// Pre-allocate `capacity` slots and chain the free list 0 -> 1 -> ...
    ///
    /// # Panics
    /// Panics if `capacity` is 0 or does not fit an `i32` index.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "slot pool capacity must be non-zero");
        assert!(
            i32::try_from(capacity).is_ok(),
            "slot pool capacity {capacity} exceeds i32 index range"
        );

        let mut slots = vec![OrderSlot::empty(); capacity].into_boxed_slice();
        Self::chain_free_list(&mut slots);
        Self {
            slots,
            free_head: 0,
        }
    }

    fn chain_free_list(slots: &mut [OrderSlot]) {
        let capacity = slots.len();
        for (i, slot) in slots.iter_mut().enumerate() {
            *slot = OrderSlot::empty();
            slot.next = if i + 1 < capacity {
                (i + 1) as i32
            } else {
                NULL_SLOT
            };
        }
    }

    /// Pop a slot off the free list, or `NULL_SLOT` when exhausted
    #[inline]
    pub fn alloc(&mut self) -> i32 {
        let slot = self.free_head;
        if slot == NULL_SLOT {
            return NULL_SLOT;
        }
        self.free_head = self.slots[slot as usize].next;
        slot
    }

    /// Return a slot to the free list.
    ///
    /// Clears the level linkage so a freed slot is recognizable
    /// (`level_index == NULL_SLOT`).
    #[inline]
    pub fn free(&mut self, slot: i32) {
        let record = &mut self.slots[slot as usize];
        record.level_index = NULL_SLOT;
        record.prev = NULL_SLOT;
        record.next = self.free_head;
        self.free_head = slot;
    }

    /// Shared access to a slot record
    #[inline]
    #[must_use]
    pub fn get(&self, slot: i32) -> &OrderSlot {
        &self.slots[slot as usize]
    }

    /// Exclusive access to a slot record
    #[inline]
    pub fn get_mut(&mut self, slot: i32) -> &mut OrderSlot {
        &mut self.slots[slot as usize]
    }

    /// Total number of slots
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// True when `slot` is a valid index into the pool
    #[inline]
    #[must_use]
    pub fn contains(&self, slot: i32) -> bool {
        slot >= 0 && (slot as usize) < self.slots.len()
    }

    /// Head of the free list, `NULL_SLOT` when the pool is exhausted
    #[inline]
    #[must_use]
    pub fn free_head(&self) -> i32 {
        self.free_head
    }

    /// Walk the free list and count its length.
    ///
    /// Diagnostic only — O(free slots), bounded by capacity so a corrupt
    /// (cyclic) list is reported rather than looping forever.
    #[must_use]
    pub fn free_list_len(&self) -> Option<usize> {
        let mut len = 0usize;
        let mut cursor = self.free_head;
        while cursor != NULL_SLOT {
            len += 1;
            if len > self.slots.len() {
                return None; // cycle
            }
            cursor = self.slots[cursor as usize].next;
        }
        Some(len)
    }

    /// Restore the freshly-constructed state without reallocating
    pub fn reset(&mut self) {
        Self::chain_free_list(&mut self.slots);
        self.free_head = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1)]
    #[case(64)]
    #[case(1024)]
    fn test_full_drain_and_refill(#[case] capacity: usize) {
        let mut pool = SlotPool::new(capacity);
        for _ in 0..capacity {
            assert_ne!(pool.alloc(), NULL_SLOT);
        }
        assert_eq!(pool.alloc(), NULL_SLOT);
        pool.reset();
        assert_eq!(pool.free_list_len(), Some(capacity));
    }

    #[test]
    fn test_slot_is_one_cache_line() {
        assert_eq!(size_of::<OrderSlot>(), 64);
        assert_eq!(align_of::<OrderSlot>(), 64);
    }

    #[test]
    fn test_alloc_free_cycle() {
        let mut pool = SlotPool::new(4);
        assert_eq!(pool.free_list_len(), Some(4));

        let a = pool.alloc();
        let b = pool.alloc();
        assert_eq!(a, 0);
        assert_eq!(b, 1);
        assert_eq!(pool.free_list_len(), Some(2));

        pool.free(a);
        assert_eq!(pool.free_list_len(), Some(3));
        // LIFO: the freed slot comes back first
        assert_eq!(pool.alloc(), a);
    }

    #[test]
    fn test_exhaustion_returns_null() {
        let mut pool = SlotPool::new(2);
        assert_ne!(pool.alloc(), NULL_SLOT);
        assert_ne!(pool.alloc(), NULL_SLOT);
        assert_eq!(pool.alloc(), NULL_SLOT);
    }

    #[test]
    fn test_reset_rechains_without_realloc() {
        let mut pool = SlotPool::new(8);
        for _ in 0..8 {
            pool.alloc();
        }
        assert_eq!(pool.alloc(), NULL_SLOT);
        pool.reset();
        assert_eq!(pool.free_list_len(), Some(8));
        assert_eq!(pool.alloc(), 0);
    }

    #[test]
    fn test_freed_slot_is_marked() {
        let mut pool = SlotPool::new(2);
        let slot = pool.alloc();
        pool.get_mut(slot).level_index = 5;
        pool.free(slot);
        assert_eq!(pool.get(slot).level_index, NULL_SLOT);
    }
}
