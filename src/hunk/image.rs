//! Parsed hunk container representation and installation into emulated memory.

use std::path::Path;

use strum::Display;

use crate::{file::read_file, memory::MemoryImage, Result};

/// The role of a [`Segment`] within the loaded binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum SegmentKind {
    /// Executable machine code.
    Code,
    /// Initialized data.
    Data,
    /// Zero-filled data; owns no source bytes.
    Bss,
}

/// One contiguous chunk of the binary, placed at a fixed emulated address.
///
/// Segments are immutable once placed: the address assigned during parsing is
/// the address relocations are computed against and must never change.
#[derive(Debug, Clone)]
pub struct Segment {
    /// The segment's role.
    pub kind: SegmentKind,
    /// Emulated address the segment is installed at (256-byte aligned).
    pub address: u32,
    /// Size of the segment in bytes.
    pub size: u32,
    /// Payload bytes; empty for [`SegmentKind::Bss`].
    pub bytes: Vec<u8>,
}

/// A single 32-bit relocation patch site.
///
/// Applying the relocation reads the big-endian word at
/// `segments[segment].address + offset`, adds `segments[target].address`, and
/// writes the sum back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relocation {
    /// Index of the segment containing the patch site.
    pub segment: usize,
    /// Byte offset of the patch site within that segment.
    pub offset: u32,
    /// Index of the segment whose base address is added.
    pub target: usize,
}

/// A fully parsed hunk container, ready to install.
///
/// Constructed once by [`BinaryImage::parse`] (or [`BinaryImage::from_file`]),
/// consumed once by [`BinaryImage::install`], and not needed at run time.
///
/// # Examples
///
/// ```rust,no_run
/// use amidoor::hunk::BinaryImage;
/// use std::path::Path;
///
/// let image = BinaryImage::from_file(Path::new("doors/lord"))?;
/// for segment in image.segments() {
///     println!("{} segment, {} bytes at {:#010x}",
///         segment.kind, segment.size, segment.address);
/// }
/// # Ok::<(), amidoor::Error>(())
/// ```
pub struct BinaryImage {
    pub(crate) segments: Vec<Segment>,
    pub(crate) relocations: Vec<Relocation>,
    pub(crate) entry_point: u32,
}

impl BinaryImage {
    /// Parse a hunk container, placing segments from the default load base.
    ///
    /// # Arguments
    /// * `data` - The raw container bytes
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the header tag is wrong or the
    /// declared segment counts/sizes are inconsistent with the remaining byte
    /// length, and [`crate::Error::Empty`] for empty input.
    pub fn parse(data: &[u8]) -> Result<Self> {
        super::parser::parse_at(data, crate::memory::VECTOR_TABLE_END)
    }

    /// Parse a hunk container, placing segments from `load_base`.
    ///
    /// Used by the library loader, which places library binaries in high
    /// memory rather than the program load area.
    ///
    /// # Errors
    /// Same as [`BinaryImage::parse`].
    pub fn parse_at(data: &[u8], load_base: u32) -> Result<Self> {
        super::parser::parse_at(data, load_base)
    }

    /// Read and parse a hunk container from disk.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] for I/O failures, otherwise the
    /// same errors as [`BinaryImage::parse`].
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = read_file(path)?;
        Self::parse(&data)
    }

    /// The parsed segments, in declaration order.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// The parsed relocations, in container order.
    #[must_use]
    pub fn relocations(&self) -> &[Relocation] {
        &self.relocations
    }

    /// Address execution starts at: the first code segment, or the load base
    /// if the binary has none.
    #[must_use]
    pub fn entry_point(&self) -> u32 {
        self.entry_point
    }

    /// Copy every segment into `memory` and apply every relocation.
    ///
    /// Relocations are applied exactly once each, in container order; because
    /// every segment address was fixed during parsing, the order is
    /// immaterial.
    ///
    /// # Errors
    /// Returns [`crate::Error::MemoryFault`] if a segment or patch site falls
    /// outside the configured memory image, which means the image is too small
    /// for the binary.
    pub fn install(&self, memory: &mut MemoryImage) -> Result<()> {
        for segment in &self.segments {
            match segment.kind {
                SegmentKind::Bss => memory.fill(segment.address, segment.size, 0)?,
                SegmentKind::Code | SegmentKind::Data => {
                    memory.write_bytes(segment.address, &segment.bytes)?;
                    // Header size can exceed the payload; the tail is zeroed.
                    let copied = segment.bytes.len() as u32;
                    if copied < segment.size {
                        memory.fill(segment.address + copied, segment.size - copied, 0)?;
                    }
                }
            }
        }

        for relocation in &self.relocations {
            let site = self.segments[relocation.segment].address + relocation.offset;
            let value = memory.read_u32(site)?;
            let patched = value.wrapping_add(self.segments[relocation.target].address);
            memory.write_u32(site, patched)?;
        }

        log::debug!(
            "installed {} segments, {} relocations, entry {:#010x}",
            self.segments.len(),
            self.relocations.len(),
            self.entry_point
        );
        Ok(())
    }
}
