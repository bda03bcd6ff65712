//! Benchmarks for the matching hot path

use common::Ts;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use engine::{EngineConfig, MatchingEngine};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use schema::{header, MessageHeaderEncoder, NewOrderSingleEncoder};

fn new_order_frame(
    order_id: u64,
    price: i64,
    qty: u32,
    side: u8,
    order_type: u8,
) -> Vec<u8> {
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

fn bench_rest_and_cross(c: &mut Criterion) {
    let mut group = c.benchmark_group("match_order");
    group.throughput(Throughput::Elements(2));

    let config = EngineConfig {
        instrument_count: 1,
        max_orders: 65_536,
        max_levels: 256,
        disable_simd: false,
    };
    let mut engine = MatchingEngine::new(&config);
    let mut out = [0u8; 4096];

    // One resting sell then one crossing buy: the book returns to empty
    // every iteration, so the measurement is steady-state.
    let mut next_id = 1u64;
    let mut ts = 1i64;
    group.bench_function("rest_then_cross", |b| {
        b.iter(|| {
            let sell = new_order_frame(next_id, 10_000_000_000, 1, 1, 0);
            let buy = new_order_frame(next_id + 1, 10_000_000_000, 1, 0, 0);
            next_id += 2;

            let written = engine
                .on_command(&sell, Ts::from_nanos(ts), &mut out, 0)
                .unwrap();
            black_box(written);
            let written = engine
                .on_command(&buy, Ts::from_nanos(ts + 1), &mut out, 0)
                .unwrap();
            black_box(written);
            ts += 2;
        });
    });
    group.finish();
}

fn bench_deep_book_sweep(c: &mut Criterion) {
    let mut group = c.benchmark_group("sweep");

    let config = EngineConfig {
        instrument_count: 1,
        max_orders: 65_536,
        max_levels: 256,
        disable_simd: false,
    };
    let mut engine = MatchingEngine::new(&config);
    let mut out = [0u8; 65536];
    let mut rng = StdRng::seed_from_u64(42);

    // Populate a realistic resting ask ladder
    let mut next_id = 1u64;
    for level in 0..64i64 {
        for _ in 0..4 {
            let frame = new_order_frame(
                next_id,
                10_000_000_000 + level * 10_000_000,
                rng.gen_range(1..20),
                1,
                0,
            );
            engine
                .on_command(&frame, Ts::from_nanos(next_id as i64), &mut out, 0)
                .unwrap();
            next_id += 1;
        }
    }

    // Small crossing buys against the ladder, replenished each iteration so
    // book depth stays roughly constant.
    let mut ts = 1_000_000i64;
    group.bench_function("cross_one_level", |b| {
        b.iter(|| {
            let buy = new_order_frame(next_id, 10_000_000_000, 2, 0, 0);
            let replenish = new_order_frame(next_id + 1, 10_000_000_000, 2, 1, 0);
            next_id += 2;

            let written = engine
                .on_command(&buy, Ts::from_nanos(ts), &mut out, 0)
                .unwrap();
            black_box(written);
            let written = engine
                .on_command(&replenish, Ts::from_nanos(ts + 1), &mut out, 0)
                .unwrap();
            black_box(written);
            ts += 2;
        });
    });
    group.finish();
}

criterion_group!(benches, bench_rest_and_cross, bench_deep_book_sweep);
criterion_main!(benches);
