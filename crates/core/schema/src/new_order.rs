//! NewOrderSingle message body (template 1)
//!
//! Wire format (42 bytes, little-endian):
//!
//! ```text
//!   order_id      : u64 @ 0
//!   price         : i64 @ 8    fixed-point, scale 10^8
//!   client_id     : u64 @ 16
//!   timestamp_ns  : i64 @ 24   cluster-assigned nanosecond timestamp
//!   instrument_id : u32 @ 32
//!   quantity      : u32 @ 36
//!   side          : u8  @ 40   0=BUY, 1=SELL
//!   order_type    : u8  @ 41   0=LIMIT, 1=MARKET
//! ```

use crate::bytes::{get_i64, get_u32, get_u64, put_i64, put_u32, put_u64};
use crate::{check_capacity, CodecError};

const ORDER_ID_OFFSET: usize = 0;
const PRICE_OFFSET: usize = 8;
const CLIENT_ID_OFFSET: usize = 16;
const TIMESTAMP_NS_OFFSET: usize = 24;
const INSTRUMENT_ID_OFFSET: usize = 32;
const QUANTITY_OFFSET: usize = 36;
const SIDE_OFFSET: usize = 40;
const ORDER_TYPE_OFFSET: usize = 41;

/// Template identifier
pub const TEMPLATE_ID: u16 = 1;

/// Body length in bytes
pub const BLOCK_LENGTH: usize = 42;

/// Read-side NewOrderSingle flyweight
#[derive(Debug)]
pub struct NewOrderSingleDecoder<'a> {
    buffer: &'a [u8],
    offset: usize,
}

impl<'a> NewOrderSingleDecoder<'a> {
    /// Template identifier
    pub const TEMPLATE_ID: u16 = TEMPLATE_ID;

    /// Body length in bytes
    pub const BLOCK_LENGTH: usize = BLOCK_LENGTH;

    /// Wrap a buffer at the given offset, validating capacity once
    pub fn wrap(buffer: &'a [u8], offset: usize) -> Result<Self, CodecError> {
        check_capacity(buffer.len(), offset, BLOCK_LENGTH)?;
        Ok(Self { buffer, offset })
    }

    /// Client-assigned order identifier
    #[must_use]
    pub fn order_id(&self) -> u64 {
        get_u64(self.buffer, self.offset + ORDER_ID_OFFSET)
    }

    /// Limit price (ignored for market orders)
    #[must_use]
    pub fn price(&self) -> i64 {
        get_i64(self.buffer, self.offset + PRICE_OFFSET)
    }

    /// Originating client identifier
    #[must_use]
    pub fn client_id(&self) -> u64 {
        get_u64(self.buffer, self.offset + CLIENT_ID_OFFSET)
    }

    /// Gateway receive timestamp
    #[must_use]
    pub fn timestamp_ns(&self) -> i64 {
        get_i64(self.buffer, self.offset + TIMESTAMP_NS_OFFSET)
    }

    /// Target instrument
    #[must_use]
    pub fn instrument_id(&self) -> u32 {
        get_u32(self.buffer, self.offset + INSTRUMENT_ID_OFFSET)
    }

    /// Order quantity
    #[must_use]
    pub fn quantity(&self) -> u32 {
        get_u32(self.buffer, self.offset + QUANTITY_OFFSET)
    }

    /// Wire side value
    #[must_use]
    pub fn side(&self) -> u8 {
        self.buffer[self.offset + SIDE_OFFSET]
    }

    /// Wire order-type value
    #[must_use]
    pub fn order_type(&self) -> u8 {
        self.buffer[self.offset + ORDER_TYPE_OFFSET]
    }
}

/// Write-side NewOrderSingle flyweight
#[derive(Debug)]
pub struct NewOrderSingleEncoder<'a> {
    buffer: &'a mut [u8],
    offset: usize,
}

impl<'a> NewOrderSingleEncoder<'a> {
    /// Template identifier
    pub const TEMPLATE_ID: u16 = TEMPLATE_ID;

    /// Body length in bytes
    pub const BLOCK_LENGTH: usize = BLOCK_LENGTH;

    /// Wrap a buffer at the given offset, validating capacity once
    pub fn wrap(buffer: &'a mut [u8], offset: usize) -> Result<Self, CodecError> {
        check_capacity(buffer.len(), offset, BLOCK_LENGTH)?;
        Ok(Self { buffer, offset })
    }

    /// Set the order identifier
    pub fn order_id(&mut self, value: u64) -> &mut Self {
        put_u64(self.buffer, self.offset + ORDER_ID_OFFSET, value);
        self
    }

    /// Set the limit price
    pub fn price(&mut self, value: i64) -> &mut Self {
        put_i64(self.buffer, self.offset + PRICE_OFFSET, value);
        self
    }

    /// Set the client identifier
    pub fn client_id(&mut self, value: u64) -> &mut Self {
        put_u64(self.buffer, self.offset + CLIENT_ID_OFFSET, value);
        self
    }

    /// Set the gateway receive timestamp
    pub fn timestamp_ns(&mut self, value: i64) -> &mut Self {
        put_i64(self.buffer, self.offset + TIMESTAMP_NS_OFFSET, value);
        self
    }

    /// Set the target instrument
    pub fn instrument_id(&mut self, value: u32) -> &mut Self {
        put_u32(self.buffer, self.offset + INSTRUMENT_ID_OFFSET, value);
        self
    }

    /// Set the order quantity
    pub fn quantity(&mut self, value: u32) -> &mut Self {
        put_u32(self.buffer, self.offset + QUANTITY_OFFSET, value);
        self
    }

    /// Set the wire side value
    pub fn side(&mut self, value: u8) -> &mut Self {
        self.buffer[self.offset + SIDE_OFFSET] = value;
        self
    }

    /// Set the wire order-type value
    pub fn order_type(&mut self, value: u8) -> &mut Self {
        self.buffer[self.offset + ORDER_TYPE_OFFSET] = value;
        self
    }
}
