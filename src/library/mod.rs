//! Shared-library emulation: stub libraries, real-binary loading and the trap
//! router.
//!
//! AmigaOS programs call shared libraries through a register-held base address
//! and small negative offsets: `jsr -48(a6)` calls the function whose jump
//! vector sits 48 bytes below the library base in A6. The CPU engine traps any
//! such call into library space; this module turns the trapped absolute
//! address back into *which library, which function* and executes the function
//! host-side.
//!
//! # Two-tier resolution
//!
//! Opening a library first tries the [`crate::library::LibraryTable`]'s
//! real-binary loader (when enabled): a file literally named after the library
//! found in the search path is parsed with the hunk loader, installed in a
//! high-memory slot and its jump table recovered. When no file exists the
//! open falls back to a *stub* — a fixed base address with no bytes behind it,
//! every known offset handled by a host-side emulator. Failure to find a
//! library is never an error; returning base 0 is the AmigaOS contract the
//! calling program already handles.
//!
//! # Emulated libraries
//!
//! - [`crate::library::ExecLibrary`] — memory allocation, library open/close
//! - [`crate::library::DosLibrary`] — byte streams on well-known handles, wall-clock time
//! - [`crate::library::DoorLibrary`] — the BBS terminal API doors are written against
//!
//! Each emulator is a closed set of operations with an explicit
//! offset-to-operation table; adding an operation is a table change, not a new
//! free-floating constant.

mod door;
mod dos;
mod exec;
mod loader;
mod router;

pub use door::DoorLibrary;
pub use dos::{DosLibrary, STDERR_HANDLE, STDIN_HANDLE, STDOUT_HANDLE};
pub use exec::ExecLibrary;
pub use loader::{LibraryTable, LoadedLibrary, ResolvedCall, ResolvedTarget};
pub use router::{Dispatch, TrapRouter};

use crate::{
    cpu::CpuEngine,
    memory::{HeapAllocator, MemoryImage},
    session::IoChannel,
    Result,
};

/// Everything a library emulator may touch while handling one trapped call.
///
/// Borrowed fields only; a `TrapContext` lives for exactly one dispatch and
/// cannot outlive it, which is what makes dispatch non-stateful: a trapped
/// call completes before the session's step loop yields again.
pub struct TrapContext<'a> {
    /// The engine's register file, for argument/return marshaling.
    pub cpu: &'a mut dyn CpuEngine,
    /// The session's memory image.
    pub memory: &'a mut MemoryImage,
    /// The session's input queue and output buffer.
    pub io: &'a mut IoChannel,
    /// The session's AllocMem heap.
    pub allocator: &'a mut HeapAllocator,
    /// The session's library table, for open/close and target resolution.
    pub libraries: &'a mut LibraryTable,
}

/// A host-side emulation of one shared library.
///
/// Implementations map resolved negative offsets to operations, read arguments
/// from registers and memory through the [`TrapContext`], perform the
/// operation, and write results back. Returning `Ok(false)` means the offset
/// is not one of the library's known operations — the emulator must not have
/// mutated anything in that case.
pub trait LibraryEmulator {
    /// The library's canonical name, e.g. `"dos.library"`.
    fn name(&self) -> &'static str;

    /// Handle the operation at `offset` (negative, relative to the library
    /// base). Returns whether the offset was recognized.
    ///
    /// # Errors
    /// Propagates [`crate::Error::MemoryFault`] from argument marshaling.
    fn handle(&mut self, offset: i32, ctx: &mut TrapContext<'_>) -> Result<bool>;
}
