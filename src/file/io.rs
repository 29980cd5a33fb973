//! Low-level byte order and safe reading utilities for hunk container parsing.
//!
//! This module provides endian-aware binary data reading for parsing AmigaOS hunk
//! files. The format is big-endian throughout (32-bit words), so the helpers here
//! are built around safe, bounds-checked big-endian access to byte buffers.
//!
//! # Architecture
//!
//! The module is built around the [`crate::file::io::WordIO`] trait which provides a
//! unified interface for reading binary data in a type-safe manner:
//!
//! - Generic trait-based reading for the primitive types the loader needs
//! - Automatic bounds checking to prevent buffer overruns
//! - Consistent error handling through the [`crate::Result`] type
//!
//! # Key Components
//!
//! - [`crate::file::io::WordIO`] - Trait defining big-endian conversion for primitive types
//! - [`crate::file::io::read_be`] - Read a value from the buffer start
//! - [`crate::file::io::read_be_at`] - Read a value at a specific offset with auto-advance
//!
//! # Error Handling
//!
//! All reading functions return [`crate::Result<T>`] and will return
//! [`crate::Error::OutOfBounds`] if there are insufficient bytes in the buffer to
//! complete the operation.

use crate::{Error::OutOfBounds, Result};

/// Trait for implementing type-specific safe binary data reading operations.
///
/// This trait provides a unified interface for reading primitive types from byte
/// slices in big-endian byte order, the only order the hunk format uses. It is
/// implemented for the integer types the loader and the CPU engine exchange.
pub trait WordIO: Sized {
    /// Associated type representing the byte array type for this numeric type.
    type Bytes: Sized + for<'a> TryFrom<&'a [u8]>;

    /// Read T from a byte buffer in big-endian
    fn from_be_bytes(bytes: Self::Bytes) -> Self;

    /// Write T to a byte buffer in big-endian
    fn to_be_bytes(self) -> Self::Bytes;
}

macro_rules! impl_word_io {
    ($($t:ty),*) => {
        $(
            impl WordIO for $t {
                type Bytes = [u8; std::mem::size_of::<$t>()];

                fn from_be_bytes(bytes: Self::Bytes) -> Self {
                    <$t>::from_be_bytes(bytes)
                }

                fn to_be_bytes(self) -> Self::Bytes {
                    <$t>::to_be_bytes(self)
                }
            }
        )*
    };
}

impl_word_io!(u8, i8, u16, i16, u32, i32);

/// Safely reads a value of type `T` in big-endian byte order from a data buffer.
///
/// This function reads from the beginning of the buffer and supports all types that
/// implement the [`crate::file::io::WordIO`] trait.
///
/// # Arguments
///
/// * `data` - The byte buffer to read from
///
/// # Errors
///
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
///
/// # Examples
///
/// ```rust,ignore
/// use amidoor::file::io::read_be;
///
/// let data = [0x00, 0x00, 0x03, 0xF3]; // Big-endian u32: HUNK_HEADER
/// let value: u32 = read_be(&data)?;
/// assert_eq!(value, 0x3F3);
/// # Ok::<(), amidoor::Error>(())
/// ```
pub fn read_be<T: WordIO>(data: &[u8]) -> Result<T> {
    let mut offset = 0_usize;
    read_be_at(data, &mut offset)
}

/// Safely reads a value of type `T` in big-endian byte order at a specific offset.
///
/// This function reads from the specified offset and automatically advances the
/// offset by the number of bytes read.
///
/// # Arguments
///
/// * `data` - The byte buffer to read from
/// * `offset` - Mutable reference to the offset position (advanced after reading)
///
/// # Errors
///
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
pub fn read_be_at<T: WordIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let type_len = std::mem::size_of::<T>();
    if (type_len + *offset) > data.len() {
        return Err(OutOfBounds);
    }

    let Ok(read) = data[*offset..*offset + type_len].try_into() else {
        return Err(OutOfBounds);
    };

    *offset += type_len;

    Ok(T::from_be_bytes(read))
}
