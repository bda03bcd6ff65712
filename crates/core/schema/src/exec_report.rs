//! ExecutionReport message body (template 3)
//!
//! Wire format (54 bytes, little-endian):
//!
//! ```text
//!   order_id           : u64 @ 0
//!   exec_id            : u64 @ 8
//!   price              : i64 @ 16   fixed-point, scale 10^8
//!   client_id          : u64 @ 24
//!   match_timestamp_ns : i64 @ 32
//!   instrument_id      : u32 @ 40
//!   filled_quantity    : u32 @ 44
//!   remaining_quantity : u32 @ 48
//!   side               : u8  @ 52
//!   exec_type          : u8  @ 53
//! ```

use crate::bytes::{get_i64, get_u32, get_u64, put_i64, put_u32, put_u64};
use crate::{check_capacity, CodecError};

const ORDER_ID_OFFSET: usize = 0;
const EXEC_ID_OFFSET: usize = 8;
const PRICE_OFFSET: usize = 16;
const CLIENT_ID_OFFSET: usize = 24;
const MATCH_TIMESTAMP_NS_OFFSET: usize = 32;
const INSTRUMENT_ID_OFFSET: usize = 40;
const FILLED_QUANTITY_OFFSET: usize = 44;
const REMAINING_QUANTITY_OFFSET: usize = 48;
const SIDE_OFFSET: usize = 52;
const EXEC_TYPE_OFFSET: usize = 53;

/// Template identifier
pub const TEMPLATE_ID: u16 = 3;

/// Body length in bytes
pub const BLOCK_LENGTH: usize = 54;

/// Read-side ExecutionReport flyweight
#[derive(Debug)]
pub struct ExecutionReportDecoder<'a> {
    buffer: &'a [u8],
    offset: usize,
}

impl<'a> ExecutionReportDecoder<'a> {
    /// Template identifier
    pub const TEMPLATE_ID: u16 = TEMPLATE_ID;

    /// Body length in bytes
    pub const BLOCK_LENGTH: usize = BLOCK_LENGTH;

    /// Wrap a buffer at the given offset, validating capacity once
    pub fn wrap(buffer: &'a [u8], offset: usize) -> Result<Self, CodecError> {
        check_capacity(buffer.len(), offset, BLOCK_LENGTH)?;
        Ok(Self { buffer, offset })
    }

    /// Order the report describes
    #[must_use]
    pub fn order_id(&self) -> u64 {
        get_u64(self.buffer, self.offset + ORDER_ID_OFFSET)
    }

    /// Engine-assigned execution identifier
    #[must_use]
    pub fn exec_id(&self) -> u64 {
        get_u64(self.buffer, self.offset + EXEC_ID_OFFSET)
    }

    /// Execution price (resting price for fills)
    #[must_use]
    pub fn price(&self) -> i64 {
        get_i64(self.buffer, self.offset + PRICE_OFFSET)
    }

    /// Owning client
    #[must_use]
    pub fn client_id(&self) -> u64 {
        get_u64(self.buffer, self.offset + CLIENT_ID_OFFSET)
    }

    /// Cluster timestamp of the match
    #[must_use]
    pub fn match_timestamp_ns(&self) -> i64 {
        get_i64(self.buffer, self.offset + MATCH_TIMESTAMP_NS_OFFSET)
    }

    /// Instrument
    #[must_use]
    pub fn instrument_id(&self) -> u32 {
        get_u32(self.buffer, self.offset + INSTRUMENT_ID_OFFSET)
    }

    /// Quantity filled by this execution
    #[must_use]
    pub fn filled_quantity(&self) -> u32 {
        get_u32(self.buffer, self.offset + FILLED_QUANTITY_OFFSET)
    }

    /// Quantity still open after this execution
    #[must_use]
    pub fn remaining_quantity(&self) -> u32 {
        get_u32(self.buffer, self.offset + REMAINING_QUANTITY_OFFSET)
    }

    /// Wire side value
    #[must_use]
    pub fn side(&self) -> u8 {
        self.buffer[self.offset + SIDE_OFFSET]
    }

    /// Wire exec-type value
    #[must_use]
    pub fn exec_type(&self) -> u8 {
        self.buffer[self.offset + EXEC_TYPE_OFFSET]
    }
}

/// Write-side ExecutionReport flyweight
#[derive(Debug)]
pub struct ExecutionReportEncoder<'a> {
    buffer: &'a mut [u8],
    offset: usize,
}

impl<'a> ExecutionReportEncoder<'a> {
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

    /// Set the execution identifier
    pub fn exec_id(&mut self, value: u64) -> &mut Self {
        put_u64(self.buffer, self.offset + EXEC_ID_OFFSET, value);
        self
    }

    /// Set the execution price
    pub fn price(&mut self, value: i64) -> &mut Self {
        put_i64(self.buffer, self.offset + PRICE_OFFSET, value);
        self
    }

    /// Set the owning client
    pub fn client_id(&mut self, value: u64) -> &mut Self {
        put_u64(self.buffer, self.offset + CLIENT_ID_OFFSET, value);
        self
    }

    /// Set the cluster timestamp of the match
    pub fn match_timestamp_ns(&mut self, value: i64) -> &mut Self {
        put_i64(self.buffer, self.offset + MATCH_TIMESTAMP_NS_OFFSET, value);
        self
    }

    /// Set the instrument
    pub fn instrument_id(&mut self, value: u32) -> &mut Self {
        put_u32(self.buffer, self.offset + INSTRUMENT_ID_OFFSET, value);
        self
    }

    /// Set the quantity filled by this execution
    pub fn filled_quantity(&mut self, value: u32) -> &mut Self {
        put_u32(self.buffer, self.offset + FILLED_QUANTITY_OFFSET, value);
        self
    }

    /// Set the quantity still open after this execution
    pub fn remaining_quantity(&mut self, value: u32) -> &mut Self {
        put_u32(self.buffer, self.offset + REMAINING_QUANTITY_OFFSET, value);
        self
    }

    /// Set the wire side value
    pub fn side(&mut self, value: u8) -> &mut Self {
        self.buffer[self.offset + SIDE_OFFSET] = value;
        self
    }

    /// Set the wire exec-type value
    pub fn exec_type(&mut self, value: u8) -> &mut Self {
        self.buffer[self.offset + EXEC_TYPE_OFFSET] = value;
        self
    }
}
