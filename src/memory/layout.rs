//! Address-space conventions for a running door.
//!
//! The emulated address space is carved into fixed regions, derived from the
//! configured memory size:
//!
//! ```text
//! 0x000000 ┌──────────────────────────┐
//!          │ reset vectors / reserved │  SSP at 0, initial PC at 4
//! 0x000400 ├──────────────────────────┤
//!          │ code / data / bss        │  segments, 256-byte aligned, growing up
//!          │          ...             │
//!          │ stack                    │  growing down from heap_base
//!     1/4  ├──────────────────────────┤
//!          │ heap (AllocMem)          │  bump allocated, growing up
//!     1/2  ├──────────────────────────┤
//!          │ library space            │  real libraries bump down from the top,
//!          │          ...             │  stub bases pinned near the ceiling
//!      top └──────────────────────────┘
//! ```
//!
//! Every address here is a convention, not a hardware fact; the only hard
//! boundary is the buffer length enforced by [`crate::memory::MemoryImage`].

use crate::Result;

/// Default size of the emulated memory image: 1 MiB.
pub const DEFAULT_MEMORY_BYTES: usize = 0x0010_0000;

/// Smallest supported memory image. Below this the fixed regions collide.
pub const MIN_MEMORY_BYTES: usize = 0x0002_0000;

/// End of the reserved reset-vector region; segments load above this.
pub const VECTOR_TABLE_END: u32 = 0x400;

/// Segments are placed at addresses rounded up to this boundary.
pub const SEGMENT_ALIGNMENT: u32 = 0x100;

/// Distance between consecutively installed real library binaries.
const LIBRARY_SPACING: u32 = 0x8000;

/// Gap below the ceiling reserved for the stub library bases.
const STUB_REGION_BYTES: u32 = 0x4000;

/// Address-space layout derived from a configured memory size.
///
/// Computed once per session and copied freely; all fields are plain addresses
/// into the session's [`crate::memory::MemoryImage`].
///
/// # Examples
///
/// ```rust
/// use amidoor::memory::{MemoryLayout, DEFAULT_MEMORY_BYTES};
///
/// let layout = MemoryLayout::new(DEFAULT_MEMORY_BYTES)?;
/// assert_eq!(layout.load_base, 0x400);
/// assert!(layout.exec_base > layout.library_space);
/// # Ok::<(), amidoor::Error>(())
/// ```
#[derive(Debug, Clone, Copy)]
pub struct MemoryLayout {
    /// Total size of the memory image in bytes.
    pub memory_bytes: u32,
    /// First address available for binary segments.
    pub load_base: u32,
    /// Initial stack pointer written to the reset vector at address 0.
    pub stack_pointer: u32,
    /// First address of the AllocMem heap region.
    pub heap_base: u32,
    /// One past the last address of the AllocMem heap region.
    pub heap_end: u32,
    /// Floor of library space; calls targeting addresses at or above this are
    /// library calls.
    pub library_space: u32,
    /// Fixed base address of the emulated exec.library stub.
    pub exec_base: u32,
    /// Fixed base address of the emulated dos.library stub.
    pub dos_base: u32,
    /// Fixed base address of the emulated door.library stub.
    pub door_base: u32,
    /// Slot ceiling for the first real library binary; later libraries bump
    /// downward from here.
    pub library_slot_top: u32,
    /// Distance between consecutive real library slots.
    pub library_spacing: u32,
}

impl MemoryLayout {
    /// Compute the layout for a memory image of `memory_bytes` bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::Error`] if `memory_bytes` is below
    /// [`MIN_MEMORY_BYTES`] or above the 24-bit address space.
    pub fn new(memory_bytes: usize) -> Result<Self> {
        if memory_bytes < MIN_MEMORY_BYTES {
            return Err(crate::Error::Error(format!(
                "memory size {memory_bytes:#x} below minimum {MIN_MEMORY_BYTES:#x}"
            )));
        }
        if memory_bytes > 0x0100_0000 {
            return Err(crate::Error::Error(format!(
                "memory size {memory_bytes:#x} exceeds the 24-bit address space"
            )));
        }

        let top = memory_bytes as u32;
        let heap_base = top / 4;
        let library_space = top / 2;

        Ok(MemoryLayout {
            memory_bytes: top,
            load_base: VECTOR_TABLE_END,
            stack_pointer: heap_base,
            heap_base,
            heap_end: library_space,
            library_space,
            exec_base: top - 0x1000,
            dos_base: top - 0x2000,
            door_base: top - 0x3000,
            library_slot_top: top - STUB_REGION_BYTES,
            library_spacing: LIBRARY_SPACING,
        })
    }

    /// Round `address` up to the next segment boundary.
    #[must_use]
    pub fn align_segment(address: u32) -> u32 {
        (address + SEGMENT_ALIGNMENT - 1) & !(SEGMENT_ALIGNMENT - 1)
    }
}
