//! CancelOrder message body (template 2)
//!
//! Wire format (20 bytes, little-endian):
//!
//! ```text
//!   order_id      : u64 @ 0
//!   client_id     : u64 @ 8
//!   instrument_id : u32 @ 16
//! ```

use crate::bytes::{get_u32, get_u64, put_u32, put_u64};
use crate::{check_capacity, CodecError};

const ORDER_ID_OFFSET: usize = 0;
const CLIENT_ID_OFFSET: usize = 8;
const INSTRUMENT_ID_OFFSET: usize = 16;

/// Template identifier
pub const TEMPLATE_ID: u16 = 2;

/// Body length in bytes
pub const BLOCK_LENGTH: usize = 20;

/// Read-side CancelOrder flyweight
#[derive(Debug)]
pub struct CancelOrderDecoder<'a> {
    buffer: &'a [u8],
    offset: usize,
}

impl<'a> CancelOrderDecoder<'a> {
    /// Template identifier
    pub const TEMPLATE_ID: u16 = TEMPLATE_ID;

    /// Body length in bytes
    pub const BLOCK_LENGTH: usize = BLOCK_LENGTH;

    /// Wrap a buffer at the given offset, validating capacity once
    pub fn wrap(buffer: &'a [u8], offset: usize) -> Result<Self, CodecError> {
        check_capacity(buffer.len(), offset, BLOCK_LENGTH)?;
        Ok(Self { buffer, offset })
    }

    /// Order to cancel
    #[must_use]
    pub fn order_id(&self) -> u64 {
        get_u64(self.buffer, self.offset + ORDER_ID_OFFSET)
    }

    /// Cancelling client
    #[must_use]
    pub fn client_id(&self) -> u64 {
        get_u64(self.buffer, self.offset + CLIENT_ID_OFFSET)
    }

    /// Instrument the order rests on
    #[must_use]
    pub fn instrument_id(&self) -> u32 {
        get_u32(self.buffer, self.offset + INSTRUMENT_ID_OFFSET)
    }
}

/// Write-side CancelOrder flyweight
#[derive(Debug)]
pub struct CancelOrderEncoder<'a> {
    buffer: &'a mut [u8],
    offset: usize,
}

impl<'a> CancelOrderEncoder<'a> {
    /// Template identifier
    pub const TEMPLATE_ID: u16 = TEMPLATE_ID;

    /// Body length in bytes
    pub const BLOCK_LENGTH: usize = BLOCK_LENGTH;

    /// Wrap a buffer at the given offset, validating capacity once
    pub fn wrap(buffer: &'a mut [u8], offset: usize) -> Result<Self, CodecError> {
        check_capacity(buffer.len(), offset, BLOCK_LENGTH)?;
        Ok(Self { buffer, offset })
    }

    /// Set the order to cancel
    pub fn order_id(&mut self, value: u64) -> &mut Self {
        put_u64(self.buffer, self.offset + ORDER_ID_OFFSET, value);
        self
    }

    /// Set the cancelling client
    pub fn client_id(&mut self, value: u64) -> &mut Self {
        put_u64(self.buffer, self.offset + CLIENT_ID_OFFSET, value);
        self
    }

    /// Set the instrument
    pub fn instrument_id(&mut self, value: u32) -> &mut Self {
        put_u32(self.buffer, self.offset + INSTRUMENT_ID_OFFSET, value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_round_trip() {
        let mut buf = [0u8; BLOCK_LENGTH];
        CancelOrderEncoder::wrap(&mut buf, 0)
            .unwrap()
            .order_id(9)
            .client_id(77)
            .instrument_id(3);

        assert_eq!(&buf[0..8], &9u64.to_le_bytes());
        assert_eq!(&buf[8..16], &77u64.to_le_bytes());
        assert_eq!(&buf[16..20], &3u32.to_le_bytes());

        let decoder = CancelOrderDecoder::wrap(&buf, 0).unwrap();
        assert_eq!(decoder.order_id(), 9);
        assert_eq!(decoder.client_id(), 77);
        assert_eq!(decoder.instrument_id(), 3);
    }
}
