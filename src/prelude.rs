//! # amidoor Prelude
//!
//! This module provides a convenient prelude for the most commonly used types
//! from the amidoor library. Import this module to get quick access to the
//! essential types for loading and running door programs.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all amidoor operations
pub use crate::Error;

/// The result type used throughout amidoor
pub use crate::Result;

// ================================================================================================
// Main Entry Points
// ================================================================================================

/// The execution session and its lifecycle types
pub use crate::session::{DoorSession, SessionConfig, SessionState};

/// Loaded, relocatable binary images
pub use crate::hunk::{BinaryImage, Segment, SegmentKind};

/// Low-level container parsing utilities
pub use crate::Parser;

// ================================================================================================
// Emulation Building Blocks
// ================================================================================================

/// The engine contract and its outcomes
pub use crate::cpu::{CpuEngine, Register, RunOutcome};

/// The emulated address space and its layout
pub use crate::memory::{MemoryImage, MemoryLayout};

/// Library resolution and the trap router
pub use crate::library::{Dispatch, LibraryTable, TrapRouter};
