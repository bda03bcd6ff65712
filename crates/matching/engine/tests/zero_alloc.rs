//! Zero-allocation proof for the command path
//!
//! A counting global allocator wraps the system allocator; after engine
//! construction and frame preparation, a mixed workload must allocate
//! nothing.

use common::Ts;
use engine::{EngineConfig, MatchingEngine};
use schema::{header, CancelOrderEncoder, MessageHeaderEncoder, NewOrderSingleEncoder};
use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicU64, Ordering};

static ALLOCATION_COUNT: AtomicU64 = AtomicU64::new(0);
static ALLOCATED_BYTES: AtomicU64 = AtomicU64::new(0);

struct CountingAllocator;

unsafe impl GlobalAlloc for CountingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        ALLOCATION_COUNT.fetch_add(1, Ordering::SeqCst);
        ALLOCATED_BYTES.fetch_add(layout.size() as u64, Ordering::SeqCst);
        System.alloc(layout)
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        System.dealloc(ptr, layout)
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        ALLOCATION_COUNT.fetch_add(1, Ordering::SeqCst);
        ALLOCATED_BYTES.fetch_add(new_size as u64, Ordering::SeqCst);
        System.realloc(ptr, layout, new_size)
    }
}

#[global_allocator]
static GLOBAL: CountingAllocator = CountingAllocator;

fn new_order_frame(order_id: u64, price: i64, qty: u32, side: u8, order_type: u8) -> Vec<u8> {
    let mut frame = vec![0u8; header::ENCODED_LENGTH + schema::new_order::BLOCK_LENGTH];
    MessageHeaderEncoder::wrap(&mut frame, 0)
        .unwrap()
        .block_length(schema::new_order::BLOCK_LENGTH as u16)
        .template_id(schema::new_order::TEMPLATE_ID)
        .schema_id(schema::SCHEMA_ID)
        .version(schema::SCHEMA_VERSION);
    NewOrderSingleEncoder::wrap(&mut frame, header::ENCODED_LENGTH)
        .unwrap()
        .order_id(order_id)
        .price(price)
        .client_id(order_id)
        .timestamp_ns(0)
        .instrument_id(1)
        .quantity(qty)
        .side(side)
        .order_type(order_type);
    frame
}

fn cancel_frame(order_id: u64) -> Vec<u8> {
    let mut frame = vec![0u8; header::ENCODED_LENGTH + schema::cancel::BLOCK_LENGTH];
    MessageHeaderEncoder::wrap(&mut frame, 0)
        .unwrap()
        .block_length(schema::cancel::BLOCK_LENGTH as u16)
        .template_id(schema::cancel::TEMPLATE_ID)
        .schema_id(schema::SCHEMA_ID)
        .version(schema::SCHEMA_VERSION);
    CancelOrderEncoder::wrap(&mut frame, header::ENCODED_LENGTH)
        .unwrap()
        .order_id(order_id)
        .client_id(order_id)
        .instrument_id(1);
    frame
}

#[test]
fn command_path_allocates_nothing() {
    let config = EngineConfig {
        instrument_count: 1,
        max_orders: 8192,
        max_levels: 128,
        disable_simd: false,
    };
    let mut engine = MatchingEngine::new(&config);
    let mut out = [0u8; 65536];

    // Pre-build every frame: rest, cross, partially fill, cancel
    let mut frames = Vec::new();
    for i in 0..512u64 {
        let tick = (i % 16) as i64;
        frames.push(new_order_frame(
            1_000 + i,
            10_000_000_000 + tick * 10_000_000,
            5 + (i % 7) as u32,
            (i % 2) as u8,
            0,
        ));
        if i % 9 == 0 {
            frames.push(new_order_frame(2_000 + i, 0, 3, (i % 2) as u8, 1));
        }
        if i % 5 == 0 {
            frames.push(cancel_frame(1_000 + i / 2));
        }
    }

    // Warm the path once so any lazy one-time setup is out of the window;
    // a dedicated order id keeps the replayed ids unique
    let warmup = new_order_frame(999, 10_000_000_000, 1, 0, 0);
    engine
        .on_command(&warmup, Ts::from_nanos(1), &mut out, 0)
        .unwrap();

    let allocations_before = ALLOCATION_COUNT.load(Ordering::SeqCst);
    let bytes_before = ALLOCATED_BYTES.load(Ordering::SeqCst);

    for (i, frame) in frames.iter().enumerate() {
        engine
            .on_command(frame, Ts::from_nanos(10 + i as i64), &mut out, 0)
            .unwrap();
    }

    let allocations_after = ALLOCATION_COUNT.load(Ordering::SeqCst);
    let bytes_after = ALLOCATED_BYTES.load(Ordering::SeqCst);

    assert_eq!(
        allocations_after - allocations_before,
        0,
        "matching path performed heap allocations"
    );
    assert_eq!(bytes_after - bytes_before, 0);

    engine.order_book(1).unwrap().validate().unwrap();
}
