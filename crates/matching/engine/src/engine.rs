//! Matching engine
//!
//! Single-threaded, allocation-free command processing. A command enters
//! with a cluster-assigned timestamp, mutates exactly one book, and leaves a
//! contiguous run of execution reports in the caller's output buffer. The
//! same command stream always produces the same bytes, exec ids included.

use crate::config::EngineConfig;
use crate::metrics::{MetricsSink, NoOpMetrics};
use crate::scanner::PriceScanner;
use common::{ExecType, OrderType, Px, Qty, Side, Ts};
use lob::{OrderBook, MAX_LEVELS, NULL_SLOT};
use schema::{
    cancel, exec_report, header, new_order, CancelOrderDecoder, CodecError,
    ExecutionReportEncoder, MessageHeaderDecoder, MessageHeaderEncoder, NewOrderSingleDecoder,
    SCHEMA_ID, SCHEMA_VERSION,
};
use thiserror::Error;
use tracing::{debug, error, warn};

/// Bytes per emitted report: message header plus ExecutionReport body
pub const REPORT_FRAME_LEN: usize = header::ENCODED_LENGTH + exec_report::BLOCK_LENGTH;

/// Output sizing guidance for one `match_order` call: one report per
/// sweepable level plus the aggressor's own report. A sweep that consumes
/// more resting orders than levels needs proportionally more — the engine
/// checks capacity before every report and fails with
/// [`EngineError::OutputBufferFull`] instead of writing a partial frame.
pub const RECOMMENDED_OUTPUT_LEN: usize = (MAX_LEVELS + 1) * REPORT_FRAME_LEN;

/// Engine-level failures surfaced to the caller
#[derive(Debug, Error)]
pub enum EngineError {
    /// Caller-provided output buffer cannot hold the next report
    #[error("output buffer full: need {needed} bytes at offset {offset}, have {available}")]
    OutputBufferFull {
        /// Offset the report would have been written at
        offset: usize,
        /// Bytes the report needs
        needed: usize,
        /// Bytes left in the buffer
        available: usize,
    },

    /// Malformed frame handed to `on_command`
    #[error(transparent)]
    Codec(#[from] CodecError),
}

#[inline]
fn ensure_report_capacity(out_len: usize, offset: usize) -> Result<(), EngineError> {
    let available = out_len.saturating_sub(offset);
    if available < REPORT_FRAME_LEN {
        return Err(EngineError::OutputBufferFull {
            offset,
            needed: REPORT_FRAME_LEN,
            available,
        });
    }
    Ok(())
}

/// Write one header + ExecutionReport frame and bump the exec-id counter.
///
/// Free function over split engine fields so report emission can interleave
/// with an exclusive borrow of the book being swept.
#[allow(clippy::too_many_arguments)]
fn write_report<M: MetricsSink>(
    next_exec_id: &mut u64,
    metrics: &M,
    out: &mut [u8],
    offset: usize,
    order_id: u64,
    price: i64,
    client_id: u64,
    match_timestamp: Ts,
    instrument_id: u32,
    filled_qty: u32,
    remaining_qty: u32,
    side: Side,
    exec_type: ExecType,
) -> Result<usize, EngineError> {
    ensure_report_capacity(out.len(), offset)?;

    MessageHeaderEncoder::wrap(out, offset)?
        .block_length(exec_report::BLOCK_LENGTH as u16)
        .template_id(exec_report::TEMPLATE_ID)
        .schema_id(SCHEMA_ID)
        .version(SCHEMA_VERSION);

    ExecutionReportEncoder::wrap(out, offset + header::ENCODED_LENGTH)?
        .order_id(order_id)
        .exec_id(*next_exec_id)
        .price(price)
        .client_id(client_id)
        .match_timestamp_ns(match_timestamp.as_nanos())
        .instrument_id(instrument_id)
        .filled_quantity(filled_qty)
        .remaining_quantity(remaining_qty)
        .side(side.as_u8())
        .exec_type(exec_type.as_u8());

    *next_exec_id += 1;

    match exec_type {
        ExecType::Fill | ExecType::PartialFill => metrics.on_match_found(),
        ExecType::Rejected => metrics.on_order_rejected(),
        ExecType::New | ExecType::Canceled => {}
    }

    Ok(REPORT_FRAME_LEN)
}

/// Deterministic matching engine over a dense instrument table.
///
/// Books are pre-allocated for instrument ids `1..=instrument_count` and
/// addressed by direct index — no hashing on the command path.
#[derive(Debug)]
pub struct MatchingEngine<M: MetricsSink = NoOpMetrics> {
    pub(crate) books: Vec<Option<OrderBook>>,
    scanner: PriceScanner,
    metrics: M,
    pub(crate) next_exec_id: u64,
    pub(crate) message_count: u64,
}

impl MatchingEngine<NoOpMetrics> {
    /// Engine without metrics
    #[must_use]
    pub fn new(config: &EngineConfig) -> Self {
        Self::with_metrics(config, NoOpMetrics)
    }
}

impl<M: MetricsSink> MatchingEngine<M> {
    /// Engine with an injected metrics sink
    #[must_use]
    pub fn with_metrics(config: &EngineConfig, metrics: M) -> Self {
        let mut books = Vec::with_capacity(config.instrument_count as usize + 1);
        books.push(None); // instrument ids are 1-based
        for id in 1..=config.instrument_count {
            books.push(Some(OrderBook::with_capacity(
                common::Symbol::new(id),
                config.max_orders,
                config.max_levels,
            )));
        }
        Self {
            books,
            scanner: PriceScanner::select(config),
            metrics,
            next_exec_id: 1,
            message_count: 0,
        }
    }

    /// The scanner variant selected at construction
    #[must_use]
    pub fn scanner(&self) -> PriceScanner {
        self.scanner
    }

    /// Injected metrics sink
    #[must_use]
    pub fn metrics(&self) -> &M {
        &self.metrics
    }

    /// Commands consumed since construction or reset
    #[must_use]
    pub fn message_count(&self) -> u64 {
        self.message_count
    }

    /// Book for an instrument, if configured
    #[must_use]
    pub fn order_book(&self, instrument_id: u32) -> Option<&OrderBook> {
        self.books.get(instrument_id as usize).and_then(Option::as_ref)
    }

    /// Decode the frame header, dispatch by template id, and return the
    /// bytes written to `out`.
    ///
    /// Unknown template ids are logged and ignored (zero bytes written).
    pub fn on_command(
        &mut self,
        frame: &[u8],
        cluster_timestamp: Ts,
        out: &mut [u8],
        offset: usize,
    ) -> Result<usize, EngineError> {
        let frame_header = MessageHeaderDecoder::wrap(frame, 0)?;
        let template_id = frame_header.template_id();
        let body_offset = MessageHeaderDecoder::ENCODED_LENGTH;
        self.message_count += 1;

        match template_id {
            new_order::TEMPLATE_ID => {
                let decoder = NewOrderSingleDecoder::wrap(frame, body_offset)?;
                self.match_order(&decoder, cluster_timestamp, out, offset)
            }
            cancel::TEMPLATE_ID => {
                let decoder = CancelOrderDecoder::wrap(frame, body_offset)?;
                self.cancel_order(&decoder, cluster_timestamp, out, offset)
            }
            other => {
                warn!(template_id = other, "unknown template id, ignoring");
                Ok(0)
            }
        }
    }

    /// Match a decoded NewOrderSingle against the book, then rest or reject
    /// the residual.
    ///
    /// Writes one report per resting order filled, in price-time order, then
    /// exactly one report for the incoming order. Returns bytes written.
    pub fn match_order(
        &mut self,
        decoder: &NewOrderSingleDecoder<'_>,
        cluster_timestamp: Ts,
        out: &mut [u8],
        offset: usize,
    ) -> Result<usize, EngineError> {
        let Self {
            books,
            scanner,
            metrics,
            next_exec_id,
            ..
        } = self;
        metrics.on_order_processed();

        let order_id = decoder.order_id();
        let price = decoder.price();
        let client_id = decoder.client_id();
        let instrument_id = decoder.instrument_id();
        let original_qty = decoder.quantity() as i32;

        // Trusted wire values: anything non-zero reads as the other variant
        let side = if decoder.side() == Side::Buy.as_u8() {
            Side::Buy
        } else {
            Side::Sell
        };
        let order_type = if decoder.order_type() == OrderType::Market.as_u8() {
            OrderType::Market
        } else {
            OrderType::Limit
        };

        let mut current_offset = offset;

        let Some(book) = books
            .get_mut(instrument_id as usize)
            .and_then(Option::as_mut)
        else {
            error!(instrument_id, order_id, "unknown instrument id");
            current_offset += write_report(
                next_exec_id,
                metrics,
                out,
                current_offset,
                order_id,
                price,
                client_id,
                cluster_timestamp,
                instrument_id,
                0,
                original_qty as u32,
                side,
                ExecType::Rejected,
            )?;
            return Ok(current_offset - offset);
        };

        let is_buy = side.is_buy();
        let opposite = side.opposite();
        let mut quantity = original_qty;

        // ─── Aggressive matching phase ───
        let (top_price, opposite_count) = if is_buy {
            (book.best_ask(), book.ask_level_count())
        } else {
            (book.best_bid(), book.bid_level_count())
        };

        if opposite_count > 0 && quantity > 0 {
            let can_trade = order_type == OrderType::Market
                || (is_buy && top_price.as_i64() <= price)
                || (!is_buy && top_price.as_i64() >= price);

            if can_trade {
                let effective_limit = match order_type {
                    OrderType::Market => {
                        if is_buy {
                            i64::MAX
                        } else {
                            i64::MIN
                        }
                    }
                    OrderType::Limit => price,
                };

                let matchable_levels = {
                    let opposite_prices = if is_buy {
                        book.ask_prices()
                    } else {
                        book.bid_prices()
                    };
                    scanner.count_matchable_levels(opposite_prices, effective_limit, is_buy)
                };

                for _ in 0..matchable_levels {
                    if quantity == 0 {
                        break;
                    }
                    // Clearing a level collapses the arrays, so the next
                    // best level is always back at index 0.
                    let mut slot = book.head_order_slot(opposite, 0);

                    while slot != NULL_SLOT && quantity > 0 {
                        let record = book.slot(slot);
                        let resting_remaining = record.remaining().as_i32();
                        let fill_qty = quantity.min(resting_remaining);
                        let fill_price = record.price().as_i64();
                        let resting_order_id = record.order_id();
                        let resting_client_id = record.client_id();
                        let next_slot = record.next();

                        // Gate on output capacity before touching book state
                        ensure_report_capacity(out.len(), current_offset)?;

                        let new_remaining = book.reduce_quantity(slot, Qty::new(fill_qty));
                        let resting_exec_type = if new_remaining.is_zero() {
                            ExecType::Fill
                        } else {
                            ExecType::PartialFill
                        };

                        current_offset += write_report(
                            next_exec_id,
                            metrics,
                            out,
                            current_offset,
                            resting_order_id,
                            fill_price,
                            resting_client_id,
                            cluster_timestamp,
                            instrument_id,
                            fill_qty as u32,
                            new_remaining.as_i32() as u32,
                            opposite,
                            resting_exec_type,
                        )?;

                        if new_remaining.is_zero() {
                            book.remove_order(slot);
                        }

                        quantity -= fill_qty;
                        slot = next_slot;
                    }
                }
            }
        }

        // ─── Report for the incoming order ───
        if quantity == 0 {
            // Fully filled
            current_offset += write_report(
                next_exec_id,
                metrics,
                out,
                current_offset,
                order_id,
                price,
                client_id,
                cluster_timestamp,
                instrument_id,
                original_qty as u32,
                0,
                side,
                ExecType::Fill,
            )?;
        } else if quantity < original_qty {
            // Partially filled: report, then rest the residual (limit only)
            current_offset += write_report(
                next_exec_id,
                metrics,
                out,
                current_offset,
                order_id,
                price,
                client_id,
                cluster_timestamp,
                instrument_id,
                (original_qty - quantity) as u32,
                quantity as u32,
                side,
                ExecType::PartialFill,
            )?;

            if order_type == OrderType::Limit {
                let slot = book.add_order(
                    order_id,
                    Px::from_i64(price),
                    client_id,
                    cluster_timestamp,
                    Qty::new(quantity),
                    side,
                    order_type,
                );
                if slot == NULL_SLOT {
                    // Book refused the residual: reject it rather than drop it
                    warn!(order_id, instrument_id, "book full, residual rejected");
                    current_offset += write_report(
                        next_exec_id,
                        metrics,
                        out,
                        current_offset,
                        order_id,
                        price,
                        client_id,
                        cluster_timestamp,
                        instrument_id,
                        0,
                        quantity as u32,
                        side,
                        ExecType::Rejected,
                    )?;
                }
            }
        } else if order_type == OrderType::Limit {
            // No fill: rest the full quantity
            ensure_report_capacity(out.len(), current_offset)?;
            let slot = book.add_order(
                order_id,
                Px::from_i64(price),
                client_id,
                cluster_timestamp,
                Qty::new(quantity),
                side,
                order_type,
            );
            let exec_type = if slot == NULL_SLOT {
                warn!(order_id, instrument_id, "book full, order rejected");
                ExecType::Rejected
            } else {
                ExecType::New
            };
            current_offset += write_report(
                next_exec_id,
                metrics,
                out,
                current_offset,
                order_id,
                price,
                client_id,
                cluster_timestamp,
                instrument_id,
                0,
                quantity as u32,
                side,
                exec_type,
            )?;
        } else {
            // Market order with no liquidity
            current_offset += write_report(
                next_exec_id,
                metrics,
                out,
                current_offset,
                order_id,
                price,
                client_id,
                cluster_timestamp,
                instrument_id,
                0,
                quantity as u32,
                side,
                ExecType::Rejected,
            )?;
        }

        Ok(current_offset - offset)
    }

    /// Cancel a resting order by id, emitting CANCELED with its remaining
    /// quantity, or REJECTED when the instrument or order id is unknown.
    pub fn cancel_order(
        &mut self,
        decoder: &CancelOrderDecoder<'_>,
        cluster_timestamp: Ts,
        out: &mut [u8],
        offset: usize,
    ) -> Result<usize, EngineError> {
        let Self {
            books,
            metrics,
            next_exec_id,
            ..
        } = self;
        metrics.on_order_processed();

        let order_id = decoder.order_id();
        let client_id = decoder.client_id();
        let instrument_id = decoder.instrument_id();

        let resolved = books
            .get_mut(instrument_id as usize)
            .and_then(Option::as_mut)
            .and_then(|book| book.lookup_order(order_id).map(|slot| (book, slot)));

        let written = match resolved {
            Some((book, slot)) => {
                debug!(order_id, instrument_id, "cancel request");
                let record = book.slot(slot);
                let side = record.side();
                let price = record.price().as_i64();
                let resting_client_id = record.client_id();

                ensure_report_capacity(out.len(), offset)?;
                let remaining = book.remove_order(slot);
                write_report(
                    next_exec_id,
                    metrics,
                    out,
                    offset,
                    order_id,
                    price,
                    resting_client_id,
                    cluster_timestamp,
                    instrument_id,
                    0,
                    remaining.as_i32() as u32,
                    side,
                    ExecType::Canceled,
                )?
            }
            None => {
                warn!(order_id, instrument_id, "cancel of unknown order");
                write_report(
                    next_exec_id,
                    metrics,
                    out,
                    offset,
                    order_id,
                    0,
                    client_id,
                    cluster_timestamp,
                    instrument_id,
                    0,
                    0,
                    Side::Buy,
                    ExecType::Rejected,
                )?
            }
        };

        Ok(written)
    }

    /// Restore the post-construction state: empty books, exec ids from 1.
    ///
    /// No reallocation; the books re-chain their pools in place.
    pub fn reset(&mut self) {
        for book in self.books.iter_mut().flatten() {
            book.reset();
        }
        self.next_exec_id = 1;
        self.message_count = 0;
    }
}
