//! Replay determinism and scanner equivalence

use common::Ts;
use engine::{EngineConfig, MatchingEngine, PriceScanner};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use schema::{header, CancelOrderEncoder, MessageHeaderEncoder, NewOrderSingleEncoder};

fn new_order_frame(
    order_id: u64,
    price: i64,
    qty: u32,
    instrument_id: u32,
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
        .client_id(7_000 + order_id)
        .timestamp_ns(0)
        .instrument_id(instrument_id)
        .quantity(qty)
        .side(side)
        .order_type(order_type);
    frame
}

fn cancel_frame(order_id: u64, instrument_id: u32) -> Vec<u8> {
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
        .client_id(7_000 + order_id)
        .instrument_id(instrument_id);
    frame
}

/// Seeded pseudo-random command stream mixing limits, markets, and cancels
fn command_stream(seed: u64, len: usize) -> Vec<Vec<u8>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut commands = Vec::with_capacity(len);
    let mut next_id = 1u64;

    for _ in 0..len {
        if next_id > 4 && rng.gen_bool(0.15) {
            // Cancel a (possibly already gone) earlier order
            let target = rng.gen_range(1..next_id);
            commands.push(cancel_frame(target, 1));
            continue;
        }
        let side = if rng.gen_bool(0.5) { 0u8 } else { 1u8 };
        let order_type = if rng.gen_bool(0.1) { 1u8 } else { 0u8 };
        let tick = rng.gen_range(-10i64..=10);
        let price = 10_000_000_000 + tick * 10_000_000;
        let qty = rng.gen_range(1u32..50);
        commands.push(new_order_frame(next_id, price, qty, 1, side, order_type));
        next_id += 1;
    }
    commands
}

fn replay(engine: &mut MatchingEngine, commands: &[Vec<u8>]) -> Vec<u8> {
    let mut stream = Vec::new();
    let mut out = [0u8; 65536];
    for (i, frame) in commands.iter().enumerate() {
        let written = engine
            .on_command(frame, Ts::from_nanos(1_000 + i as i64), &mut out, 0)
            .unwrap();
        stream.extend_from_slice(&out[..written]);
    }
    stream
}

fn config(disable_simd: bool) -> EngineConfig {
    EngineConfig {
        instrument_count: 1,
        max_orders: 4096,
        max_levels: 64,
        disable_simd,
    }
}

#[test]
fn replaying_the_same_stream_is_byte_identical() {
    let commands = command_stream(42, 500);

    let mut first = MatchingEngine::new(&config(false));
    let mut second = MatchingEngine::new(&config(false));

    let stream_a = replay(&mut first, &commands);
    let stream_b = replay(&mut second, &commands);

    assert!(!stream_a.is_empty());
    assert_eq!(stream_a, stream_b);
    first.order_book(1).unwrap().validate().unwrap();
}

#[test]
fn scalar_and_vectorized_replicas_produce_identical_streams() {
    // Replicas may select different scanner variants; outputs must not differ
    let commands = command_stream(7, 500);

    let mut scalar_engine = MatchingEngine::new(&config(true));
    let mut auto_engine = MatchingEngine::new(&config(false));
    assert_eq!(scalar_engine.scanner(), PriceScanner::Scalar);

    let scalar_stream = replay(&mut scalar_engine, &commands);
    let auto_stream = replay(&mut auto_engine, &commands);

    assert_eq!(scalar_stream, auto_stream);
}

#[test]
fn reset_then_replay_reproduces_the_stream() {
    let commands = command_stream(99, 200);

    let mut engine = MatchingEngine::new(&config(false));
    let first_pass = replay(&mut engine, &commands);
    engine.reset();
    let second_pass = replay(&mut engine, &commands);

    assert_eq!(first_pass, second_pass);
}

#[cfg(target_arch = "x86_64")]
mod scanner_equivalence {
    use super::*;

    fn scanner_pair() -> Option<(PriceScanner, PriceScanner)> {
        if !is_x86_feature_detected!("avx2") {
            return None;
        }
        Some((PriceScanner::Scalar, PriceScanner::Vectorized))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(512))]

        /// Equivalence over arbitrary arrays, sorted or not
        #[test]
        fn variants_agree_on_any_input(
            prices in proptest::collection::vec(any::<i64>(), 0..40),
            probe in any::<i64>(),
            flag in any::<bool>(),
        ) {
            let Some((scalar, vectorized)) = scanner_pair() else { return Ok(()); };

            prop_assert_eq!(
                scalar.find_insertion_point(&prices, probe, flag),
                vectorized.find_insertion_point(&prices, probe, flag)
            );
            prop_assert_eq!(
                scalar.count_matchable_levels(&prices, probe, flag),
                vectorized.count_matchable_levels(&prices, probe, flag)
            );
            prop_assert_eq!(
                scalar.find_first_matchable_level(&prices, probe, flag),
                vectorized.find_first_matchable_level(&prices, probe, flag)
            );
        }

        /// Sorted inputs shaped like real books
        #[test]
        fn variants_agree_on_sorted_books(
            mut prices in proptest::collection::vec(1i64..1_000_000, 0..40),
            probe in 1i64..1_000_000,
            is_buy in any::<bool>(),
        ) {
            let Some((scalar, vectorized)) = scanner_pair() else { return Ok(()); };

            // Asks ascend for a buyer, bids descend for a seller
            prices.sort_unstable();
            prices.dedup();
            if !is_buy {
                prices.reverse();
            }

            prop_assert_eq!(
                scalar.count_matchable_levels(&prices, probe, is_buy),
                vectorized.count_matchable_levels(&prices, probe, is_buy)
            );
            prop_assert_eq!(
                scalar.find_insertion_point(&prices, probe, !is_buy),
                vectorized.find_insertion_point(&prices, probe, !is_buy)
            );
        }
    }
}
