//! AmigaOS hunk container parsing and installation.
//!
//! Door binaries ship in the hunk format: a self-describing sequence of
//! big-endian 32-bit words laying out code, data and zero-filled segments plus
//! the relocations needed to patch absolute addresses once segment placement is
//! known. This module parses that container into a typed [`BinaryImage`] and
//! installs it into a [`crate::memory::MemoryImage`].
//!
//! # Architecture
//!
//! Loading is strictly two-phase:
//!
//! 1. **Parse** ([`BinaryImage::parse`]) walks the container once. Segment
//!    addresses are bump-allocated from the load base while the header is read,
//!    so every address is fixed before the first record body is touched.
//! 2. **Install** ([`BinaryImage::install`]) copies segment bytes into emulated
//!    memory and applies each relocation exactly once. Because all segment
//!    addresses were fixed in phase 1, relocations are purely additive and
//!    their application order cannot matter.
//!
//! Unknown record kinds (symbols, debug data, future extensions) are skipped to
//! the next end-of-segment marker rather than aborting the parse; auxiliary
//! data must never break loading.
//!
//! # Key Components
//!
//! - [`BinaryImage`] - Parsed container: segments, relocations, entry point
//! - [`Segment`] / [`SegmentKind`] - One placed chunk of code, data or bss
//! - [`Relocation`] - A single 32-bit patch site
//!
//! # Usage Examples
//!
//! ```rust,no_run
//! use amidoor::hunk::BinaryImage;
//! use amidoor::memory::MemoryImage;
//! use std::path::Path;
//!
//! let image = BinaryImage::from_file(Path::new("doors/tradewars"))?;
//! let mut memory = MemoryImage::new(0x0010_0000);
//! image.install(&mut memory)?;
//! println!("entry point at {:#010x}", image.entry_point());
//! # Ok::<(), amidoor::Error>(())
//! ```

mod image;
mod parser;

pub use image::{BinaryImage, Relocation, Segment, SegmentKind};

/// Container tag starting every loadable hunk file.
pub const HUNK_HEADER: u32 = 0x3F3;
/// A code segment: size in words followed by the payload.
pub const HUNK_CODE: u32 = 0x3E9;
/// An initialized data segment: size in words followed by the payload.
pub const HUNK_DATA: u32 = 0x3EA;
/// A zero-filled segment: size in words, no payload.
pub const HUNK_BSS: u32 = 0x3EB;
/// 32-bit relocation table: `(count, target, offset*count)` groups, zero-terminated.
pub const HUNK_RELOC32: u32 = 0x3EC;
/// End-of-segment marker; advances the current segment index.
pub const HUNK_END: u32 = 0x3F2;
/// Symbol table, skipped.
pub const HUNK_SYMBOL: u32 = 0x3F0;
/// Debug data, skipped.
pub const HUNK_DEBUG: u32 = 0x3F1;

/// Mask clearing the memory-attribute flag bits (30 and 31) from size words
/// and record tags.
pub const HUNK_SIZE_MASK: u32 = 0x3FFF_FFFF;
