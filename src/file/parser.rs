//! Low-level byte stream parser for hunk container decoding.
//!
//! This module provides the [`crate::file::parser::Parser`] type, a cursor-based
//! binary data parser designed for walking the records of an AmigaOS hunk file.
//! It offers bounds-checked access to binary data in the big-endian layout the
//! format mandates.
//!
//! # Architecture
//!
//! The parser is built around a simple cursor-based model that maintains a position
//! within a byte slice:
//!
//! - **Position tracking** - Maintains current offset for sequential parsing operations
//! - **Bounds checking** - All operations validate data availability before reading
//! - **Type-safe reading** - Strongly typed methods for common data types
//!
//! # Usage Examples
//!
//! ```rust
//! use amidoor::Parser;
//!
//! let data = [0x00, 0x00, 0x03, 0xF3, 0x00, 0x00, 0x00, 0x00];
//! let mut parser = Parser::new(&data);
//!
//! let tag = parser.read_be::<u32>()?;
//! assert_eq!(tag, 0x3F3);
//! assert_eq!(parser.pos(), 4);
//! # Ok::<(), amidoor::Error>(())
//! ```

use crate::{
    file::io::{read_be_at, WordIO},
    Result,
};

/// A cursor-based binary data parser for reading hunk container structures.
///
/// `Parser` maintains an internal position and provides bounds checking to
/// prevent buffer overruns when reading malformed or truncated data. All
/// multi-byte reads are big-endian, matching the on-disk format.
///
/// # Examples
///
/// ```rust
/// use amidoor::Parser;
///
/// let data = [0x00, 0x00, 0x00, 0x2A, 0xFF, 0xFF];
/// let mut parser = Parser::new(&data);
///
/// let word = parser.read_be::<u32>()?;
/// assert_eq!(word, 42);
///
/// let tail = parser.read_be::<u16>()?;
/// assert_eq!(tail, 0xFFFF);
/// assert!(!parser.has_more_data());
/// # Ok::<(), amidoor::Error>(())
/// ```
pub struct Parser<'a> {
    /// The binary data being parsed
    data: &'a [u8],
    /// Current position within the data buffer
    position: usize,
}

impl<'a> Parser<'a> {
    /// Create a new [`crate::file::parser::Parser`] from a byte slice.
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

    /// Returns `true` if there is more data available to parse.
    #[must_use]
    pub fn has_more_data(&self) -> bool {
        self.position < self.data.len()
    }

    /// Returns the number of bytes remaining after the current position.
    #[must_use]
    pub fn data_remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// Move the current position to the specified index.
    ///
    /// # Arguments
    /// * `pos` - The position to move the cursor to
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the position is beyond the data length.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(crate::Error::OutOfBounds);
        }

        self.position = pos;
        Ok(())
    }

    /// Move the position forward by the specified number of bytes.
    ///
    /// # Arguments
    /// * `step` - Amount of bytes to advance
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if advancing by step would exceed the data length.
    pub fn advance_by(&mut self, step: usize) -> Result<()> {
        if self.position + step > self.data.len() {
            return Err(crate::Error::OutOfBounds);
        }

        self.position += step;
        Ok(())
    }

    /// Get the current position of the parser within the data buffer.
    #[must_use]
    pub fn pos(&self) -> usize {
        self.position
    }

    /// Read a value of type `T` in big-endian byte order, advancing the cursor.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes remaining.
    pub fn read_be<T: WordIO>(&mut self) -> Result<T> {
        read_be_at::<T>(self.data, &mut self.position)
    }

    /// Peek at the next big-endian value of type `T` without advancing the cursor.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes remaining.
    pub fn peek_be<T: WordIO>(&self) -> Result<T> {
        let mut offset = self.position;
        read_be_at::<T>(self.data, &mut offset)
    }

    /// Read `len` raw bytes, advancing the cursor.
    ///
    /// # Arguments
    /// * `len` - Number of bytes to read
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer than `len` bytes remain.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.position + len > self.data.len() {
            return Err(crate::Error::OutOfBounds);
        }

        let bytes = &self.data[self.position..self.position + len];
        self.position += len;
        Ok(bytes)
    }
}
