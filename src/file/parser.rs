//! Low-level byte cursor for decoding engine-provided blobs.
//!
//! The engine hands out some fields of native records (public keys, hash values) as
//! ECMA-335 blobs: a compressed unsigned length followed by the payload. [`Parser`] provides
//! the bounds-checked cursor used to decode them.
//!
//! # Examples
//!
//! ```rust
//! use rtassembly::file::parser::Parser;
//!
//! let blob = [0x03, 0xAA, 0xBB, 0xCC];
//! let mut parser = Parser::new(&blob);
//!
//! let len = parser.read_compressed_uint()? as usize;
//! assert_eq!(parser.read_bytes(len)?, &[0xAA, 0xBB, 0xCC]);
//! # Ok::<(), rtassembly::Error>(())
//! ```

use crate::{Error, Result};

/// A cursor-based reader over a byte slice.
///
/// All reads are bounds checked and fail with [`crate::Error::OutOfBounds`] instead of
/// panicking on truncated data.
pub struct Parser<'a> {
    /// The binary data being parsed
    data: &'a [u8],
    /// Current position within the data buffer
    position: usize,
}

impl<'a> Parser<'a> {
    /// Create a new [`Parser`] from a byte slice.
    ///
    /// # Arguments
    /// * `data` - The byte slice to read from
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Parser { data, position: 0 }
    }

    /// Returns the length of the underlying data buffer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the parser has no data.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get the current position of the parser within the data buffer.
    #[must_use]
    pub fn pos(&self) -> usize {
        self.position
    }

    /// Number of bytes left between the cursor and the end of the data.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    /// Read a single byte and advance.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if no data is left.
    pub fn read_u8(&mut self) -> Result<u8> {
        let byte = *self.data.get(self.position).ok_or(Error::OutOfBounds)?;
        self.position += 1;
        Ok(byte)
    }

    /// Borrow the next `len` bytes and advance past them.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer than `len` bytes are left.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self.position.checked_add(len).ok_or(Error::OutOfBounds)?;
        let bytes = self.data.get(self.position..end).ok_or(Error::OutOfBounds)?;
        self.position = end;
        Ok(bytes)
    }

    /// Read a compressed unsigned integer as defined in ECMA-335 II.23.2.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if reading would exceed the data length or
    /// [`crate::Error::DecodeFailure`] for an invalid leading byte.
    pub fn read_compressed_uint(&mut self) -> Result<u32> {
        let first_byte = self.read_u8()?;

        match compressed_uint_len(first_byte)? {
            // 1-byte encoding: 0xxxxxxx
            1 => Ok(u32::from(first_byte)),
            // 2-byte encoding: 10xxxxxx xxxxxxxx
            2 => {
                let second_byte = self.read_u8()?;
                Ok(((u32::from(first_byte) & 0x3F) << 8) | u32::from(second_byte))
            }
            // 4-byte encoding: 11xxxxxx xxxxxxxx xxxxxxxx xxxxxxxx
            _ => {
                let b1 = u32::from(self.read_u8()?);
                let b2 = u32::from(self.read_u8()?);
                let b3 = u32::from(self.read_u8()?);
                Ok(((u32::from(first_byte) & 0x1F) << 24) | (b1 << 16) | (b2 << 8) | b3)
            }
        }
    }
}

/// Size in bytes of a compressed unsigned integer, derived from its first byte.
///
/// # Errors
/// Returns [`crate::Error::DecodeFailure`] if `first_byte` starts no valid encoding.
pub fn compressed_uint_len(first_byte: u8) -> Result<usize> {
    if (first_byte & 0x80) == 0 {
        Ok(1)
    } else if (first_byte & 0xC0) == 0x80 {
        Ok(2)
    } else if (first_byte & 0xE0) == 0xC0 {
        Ok(4)
    } else {
        Err(decode_error!("Invalid compressed uint - {}", first_byte))
    }
}
