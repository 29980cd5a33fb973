//! Bump allocator backing the exec.library AllocMem/FreeMem emulation.

use bitflags::bitflags;

use crate::{memory::MemoryImage, Result};

bitflags! {
    /// AmigaOS memory attribute flags, as passed to AllocMem in D1.
    ///
    /// The physical placement flags are meaningless in a flat emulated buffer
    /// and are accepted but ignored; only [`MemFlags::CLEAR`] changes behavior.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MemFlags: u32 {
        /// Memory accessible to other tasks (ignored).
        const PUBLIC = 1 << 0;
        /// Chip RAM, reachable by the custom chips (ignored).
        const CHIP = 1 << 1;
        /// Fast RAM (ignored).
        const FAST = 1 << 2;
        /// Zero the allocated block before returning it.
        const CLEAR = 1 << 16;
    }
}

/// Allocation granularity. AllocMem rounds block sizes to 8 bytes.
const BLOCK_ALIGNMENT: u32 = 8;

/// A bump allocator over the session's dedicated heap region.
///
/// AllocMem requests advance a cursor through the region; FreeMem is accepted
/// and recorded but never reclaims (doors run for minutes, not days, and the
/// region is released wholesale when the session terminates). An exhausted
/// region yields address 0, which is exactly the AllocMem failure contract the
/// running program already knows how to handle.
///
/// # Examples
///
/// ```rust
/// use amidoor::memory::{HeapAllocator, MemFlags, MemoryImage, MemoryLayout};
///
/// let layout = MemoryLayout::new(0x0002_0000)?;
/// let mut memory = MemoryImage::new(0x0002_0000);
/// let mut heap = HeapAllocator::new(&layout);
///
/// let block = heap.allocate(&mut memory, 64, MemFlags::CLEAR)?;
/// assert_ne!(block, 0);
/// assert_eq!(memory.read_u32(block)?, 0);
/// # Ok::<(), amidoor::Error>(())
/// ```
pub struct HeapAllocator {
    cursor: u32,
    end: u32,
}

impl HeapAllocator {
    /// Create an allocator over the heap region of `layout`.
    #[must_use]
    pub fn new(layout: &crate::memory::MemoryLayout) -> Self {
        HeapAllocator {
            cursor: layout.heap_base,
            end: layout.heap_end,
        }
    }

    /// Allocate `size` bytes, returning the block address or 0 on exhaustion.
    ///
    /// The block is aligned to 8 bytes. When `flags` contains
    /// [`MemFlags::CLEAR`] the block is zero-filled before it is returned.
    ///
    /// # Errors
    /// Returns [`crate::Error::MemoryFault`] only if the zero-fill itself
    /// faults, which indicates a layout/image size mismatch.
    pub fn allocate(
        &mut self,
        memory: &mut MemoryImage,
        size: u32,
        flags: MemFlags,
    ) -> Result<u32> {
        if size == 0 {
            return Ok(0);
        }

        let rounded = (size + BLOCK_ALIGNMENT - 1) & !(BLOCK_ALIGNMENT - 1);
        let Some(next) = self.cursor.checked_add(rounded) else {
            return Ok(0);
        };
        if next > self.end {
            log::debug!(
                "AllocMem exhausted: {size} bytes requested, {} free",
                self.end - self.cursor
            );
            return Ok(0);
        }

        let block = self.cursor;
        self.cursor = next;

        if flags.contains(MemFlags::CLEAR) {
            memory.fill(block, rounded, 0)?;
        }

        log::trace!("AllocMem {size} bytes ({flags:?}) -> {block:#010x}");
        Ok(block)
    }

    /// Release a block. A no-op for the bump allocator; kept for symmetry with
    /// the FreeMem operation that calls it.
    pub fn free(&mut self, address: u32, size: u32) {
        log::trace!("FreeMem {size} bytes at {address:#010x} (not reclaimed)");
    }

    /// Bytes remaining in the heap region.
    #[must_use]
    pub fn remaining(&self) -> u32 {
        self.end - self.cursor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryLayout;

    fn setup() -> (MemoryImage, HeapAllocator) {
        let layout = MemoryLayout::new(0x0002_0000).unwrap();
        (MemoryImage::new(0x0002_0000), HeapAllocator::new(&layout))
    }

    #[test]
    fn blocks_are_aligned_and_disjoint() {
        let (mut memory, mut heap) = setup();
        let a = heap.allocate(&mut memory, 3, MemFlags::empty()).unwrap();
        let b = heap.allocate(&mut memory, 16, MemFlags::empty()).unwrap();
        assert_eq!(a % 8, 0);
        assert_eq!(b, a + 8);
    }

    #[test]
    fn clear_flag_zeroes_the_block() {
        let (mut memory, mut heap) = setup();
        let a = heap.allocate(&mut memory, 8, MemFlags::empty()).unwrap();
        memory.write_u32(a, 0xFFFF_FFFF).unwrap();

        let mut heap2 = HeapAllocator::new(&MemoryLayout::new(0x0002_0000).unwrap());
        let b = heap2.allocate(&mut memory, 8, MemFlags::CLEAR).unwrap();
        assert_eq!(a, b);
        assert_eq!(memory.read_u32(b).unwrap(), 0);
    }

    #[test]
    fn exhaustion_returns_null() {
        let (mut memory, mut heap) = setup();
        let region = heap.remaining();
        let big = heap.allocate(&mut memory, region, MemFlags::empty()).unwrap();
        assert_ne!(big, 0);
        let none = heap.allocate(&mut memory, 8, MemFlags::empty()).unwrap();
        assert_eq!(none, 0);
    }

    #[test]
    fn zero_size_returns_null() {
        let (mut memory, mut heap) = setup();
        assert_eq!(heap.allocate(&mut memory, 0, MemFlags::empty()).unwrap(), 0);
    }
}
