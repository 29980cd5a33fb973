//! Emulated RAM and address-space conventions.
//!
//! This module owns everything about the emulated machine's memory: the single
//! backing buffer every other component goes through, the address-space layout
//! conventions (reset vectors, segment load area, heap, stack, library space),
//! the AllocMem-style bump allocator and the lenient string readers the library
//! emulators use for argument marshaling.
//!
//! # Architecture
//!
//! There are no raw pointers into emulated memory anywhere in the crate. Every
//! component that conceptually "holds a pointer" holds a validated integer
//! address instead, and all arithmetic goes through the bounds-checked accessors
//! of [`crate::memory::MemoryImage`]. An access outside the configured buffer is
//! a reportable [`crate::Error::MemoryFault`], never a silent wraparound.
//!
//! # Key Components
//!
//! - [`crate::memory::MemoryImage`] - The owned, fixed-length backing store
//! - [`crate::memory::MemoryLayout`] - Address-space conventions derived from the buffer size
//! - [`crate::memory::HeapAllocator`] - Bump allocator backing AllocMem/FreeMem
//! - [`crate::memory::MemFlags`] - AllocMem memory attribute flags
//! - [`crate::memory::read_string`] - Lenient C-string / length-prefixed string reader

mod alloc;
mod image;
mod layout;
mod strings;

pub use alloc::{HeapAllocator, MemFlags};
pub use image::{MemoryImage, ADDRESS_MASK};
pub use layout::{MemoryLayout, DEFAULT_MEMORY_BYTES, SEGMENT_ALIGNMENT, VECTOR_TABLE_END};
pub use strings::{read_string, MAX_STRING_READ};
