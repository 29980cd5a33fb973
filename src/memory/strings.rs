//! Lenient string readers for library-call argument marshaling.
//!
//! Amiga code passes strings in two conventions: C-style NUL-terminated runs
//! (most of dos.library) and BCPL-style length-prefixed runs (a first byte
//! holding the length). Door binaries mix both freely, and some pass pointers
//! into scratch buffers with no terminator at all, so the reader here is
//! deliberately forgiving: it tries the NUL-terminated interpretation first,
//! falls back to length-prefixed when the first byte is not text, stops at the
//! first non-printable non-whitespace byte either way, and returns whatever was
//! accumulated even if no terminator was ever found.

use crate::{memory::MemoryImage, Result};

/// Upper bound on a single string read. Longer runs are truncated here, which
/// keeps a missing terminator from walking the whole image.
pub const MAX_STRING_READ: usize = 256;

/// Returns `true` for bytes the lenient readers treat as string content:
/// printable ASCII plus tab, carriage return and line feed.
fn is_text_byte(byte: u8) -> bool {
    matches!(byte, 0x20..=0x7E | b'\t' | b'\r' | b'\n')
}

/// Read a string from emulated memory at `address` using the lenient dual policy.
///
/// If the first byte is text, the run is read as a C string: bytes accumulate
/// until a NUL, a non-text byte, [`MAX_STRING_READ`] or the end of the image.
/// Otherwise the first byte is taken as a BCPL length prefix and up to that
/// many following bytes are read, again stopping early at the first non-text
/// byte. Either way the accumulated text is returned; a missing terminator is
/// not an error.
///
/// # Errors
/// Returns [`crate::Error::MemoryFault`] only if the first byte itself is
/// outside the image. Faults past the first byte end accumulation instead.
///
/// # Examples
///
/// ```rust
/// use amidoor::memory::{read_string, MemoryImage};
///
/// let mut memory = MemoryImage::new(0x100);
/// memory.write_bytes(0x10, b"OK\0")?;
/// assert_eq!(read_string(&memory, 0x10)?, "OK");
///
/// // Length-prefixed, no terminator anywhere.
/// memory.write_bytes(0x20, &[2, b'O', b'K'])?;
/// assert_eq!(read_string(&memory, 0x20)?, "OK");
/// # Ok::<(), amidoor::Error>(())
/// ```
pub fn read_string(memory: &MemoryImage, address: u32) -> Result<String> {
    let first = memory.read_u8(address)?;

    let mut accumulated = Vec::new();
    if first == 0 {
        return Ok(String::new());
    }

    if is_text_byte(first) {
        // C-string interpretation.
        accumulated.push(first);
        for i in 1..MAX_STRING_READ as u32 {
            match memory.read_u8(address.wrapping_add(i)) {
                Ok(0) => break,
                Ok(byte) if is_text_byte(byte) => accumulated.push(byte),
                _ => break,
            }
        }
    } else {
        // Length-prefixed interpretation.
        let len = usize::from(first).min(MAX_STRING_READ);
        for i in 1..=len as u32 {
            match memory.read_u8(address.wrapping_add(i)) {
                Ok(byte) if is_text_byte(byte) => accumulated.push(byte),
                _ => break,
            }
        }
    }

    Ok(String::from_utf8_lossy(&accumulated).into_owned())
}
