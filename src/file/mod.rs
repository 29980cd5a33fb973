//! File access and binary parsing utilities.
//!
//! This module provides the low-level building blocks the loader sits on top of:
//! a bounds-checked big-endian cursor parser and memory-mapped file reading.
//!
//! # Key Components
//!
//! - [`crate::file::parser::Parser`] - Cursor-based big-endian binary parser
//! - [`crate::file::io`] - Endian-aware primitive reading helpers
//! - [`crate::file::read_file`] - Memory-mapped file reading
//!
//! # Integration
//!
//! [`crate::hunk`] uses these types to walk the hunk container records, and
//! [`crate::library`] to parse real shared-library binaries found on disk.

pub(crate) mod io;
pub(crate) mod parser;

pub use parser::Parser;

use std::path::Path;

use crate::Result;

/// Read an entire file into memory via a memory mapping.
///
/// Door and library binaries are small by modern standards (tens of kilobytes),
/// but loading them through a mapping avoids an intermediate read buffer and
/// matches how the rest of the crate treats file bytes as immutable input.
///
/// # Arguments
/// * `path` - Path of the file to read
///
/// # Errors
/// Returns [`crate::Error::FileError`] if the file cannot be opened or mapped,
/// and [`crate::Error::Empty`] for zero-length files.
pub fn read_file(path: &Path) -> Result<Vec<u8>> {
    let file = std::fs::File::open(path)?;
    if file.metadata()?.len() == 0 {
        return Err(crate::Error::Empty);
    }

    // Safety: the mapping is read-only and copied out before the file handle drops.
    let mmap = unsafe { memmap2::Mmap::map(&file)? };
    Ok(mmap.to_vec())
}
