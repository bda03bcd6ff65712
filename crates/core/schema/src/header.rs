//! 8-byte message header prepended to every frame
//!
//! Wire format (little-endian):
//!
//! ```text
//!   block_length : u16 @ 0   length of the message body
//!   template_id  : u16 @ 2   message type identifier
//!   schema_id    : u16 @ 4   schema identifier
//!   version      : u16 @ 6   schema version
//! ```

use crate::bytes::{get_u16, put_u16};
use crate::{check_capacity, CodecError};

const BLOCK_LENGTH_OFFSET: usize = 0;
const TEMPLATE_ID_OFFSET: usize = 2;
const SCHEMA_ID_OFFSET: usize = 4;
const VERSION_OFFSET: usize = 6;

/// Header size in bytes
pub const ENCODED_LENGTH: usize = 8;

/// Read-side header flyweight
#[derive(Debug)]
pub struct MessageHeaderDecoder<'a> {
    buffer: &'a [u8],
    offset: usize,
}

impl<'a> MessageHeaderDecoder<'a> {
    /// Header size in bytes
    pub const ENCODED_LENGTH: usize = ENCODED_LENGTH;

    /// Wrap a buffer at the given offset, validating capacity once
    pub fn wrap(buffer: &'a [u8], offset: usize) -> Result<Self, CodecError> {
        check_capacity(buffer.len(), offset, ENCODED_LENGTH)?;
        Ok(Self { buffer, offset })
    }

    /// Body length in bytes
    #[must_use]
    pub fn block_length(&self) -> u16 {
        get_u16(self.buffer, self.offset + BLOCK_LENGTH_OFFSET)
    }

    /// Message type identifier
    #[must_use]
    pub fn template_id(&self) -> u16 {
        get_u16(self.buffer, self.offset + TEMPLATE_ID_OFFSET)
    }

    /// Schema identifier
    #[must_use]
    pub fn schema_id(&self) -> u16 {
        get_u16(self.buffer, self.offset + SCHEMA_ID_OFFSET)
    }

    /// Schema version
    #[must_use]
    pub fn version(&self) -> u16 {
        get_u16(self.buffer, self.offset + VERSION_OFFSET)
    }
}

/// Write-side header flyweight
#[derive(Debug)]
pub struct MessageHeaderEncoder<'a> {
    buffer: &'a mut [u8],
    offset: usize,
}

impl<'a> MessageHeaderEncoder<'a> {
    /// Header size in bytes
    pub const ENCODED_LENGTH: usize = ENCODED_LENGTH;

    /// Wrap a buffer at the given offset, validating capacity once
    pub fn wrap(buffer: &'a mut [u8], offset: usize) -> Result<Self, CodecError> {
        check_capacity(buffer.len(), offset, ENCODED_LENGTH)?;
        Ok(Self { buffer, offset })
    }

    /// Set the body length
    pub fn block_length(&mut self, value: u16) -> &mut Self {
        put_u16(self.buffer, self.offset + BLOCK_LENGTH_OFFSET, value);
        self
    }

    /// Set the message type identifier
    pub fn template_id(&mut self, value: u16) -> &mut Self {
        put_u16(self.buffer, self.offset + TEMPLATE_ID_OFFSET, value);
        self
    }

    /// Set the schema identifier
    pub fn schema_id(&mut self, value: u16) -> &mut Self {
        put_u16(self.buffer, self.offset + SCHEMA_ID_OFFSET, value);
        self
    }

    /// Set the schema version
    pub fn version(&mut self, value: u16) -> &mut Self {
        put_u16(self.buffer, self.offset + VERSION_OFFSET, value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_exact_layout() {
        let mut buf = [0u8; 8];
        MessageHeaderEncoder::wrap(&mut buf, 0)
            .unwrap()
            .block_length(54)
            .template_id(3)
            .schema_id(1)
            .version(1);

        assert_eq!(buf, [54, 0, 3, 0, 1, 0, 1, 0]);

        let decoder = MessageHeaderDecoder::wrap(&buf, 0).unwrap();
        assert_eq!(decoder.block_length(), 54);
        assert_eq!(decoder.template_id(), 3);
        assert_eq!(decoder.schema_id(), 1);
        assert_eq!(decoder.version(), 1);
    }

    #[test]
    fn test_wrap_rejects_short_buffer() {
        let buf = [0u8; 7];
        assert!(MessageHeaderDecoder::wrap(&buf, 0).is_err());
        let buf = [0u8; 16];
        assert!(MessageHeaderDecoder::wrap(&buf, 9).is_err());
        assert!(MessageHeaderDecoder::wrap(&buf, 8).is_ok());
    }
}
