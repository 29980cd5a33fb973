//! exec.library stub: memory allocation and library open/close.

use crate::{
    cpu::Register,
    library::{LibraryEmulator, TrapContext},
    memory::{read_string, MemFlags},
    Result,
};

/// Offsets of the emulated exec.library operations, as published in the
/// original OS include files. Every vector is six bytes, hence the spacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExecCall {
    AllocMem,
    FreeMem,
    OldOpenLibrary,
    CloseLibrary,
    OpenLibrary,
}

impl ExecCall {
    fn from_offset(offset: i32) -> Option<ExecCall> {
        match offset {
            -198 => Some(ExecCall::AllocMem),
            -210 => Some(ExecCall::FreeMem),
            -408 => Some(ExecCall::OldOpenLibrary),
            -414 => Some(ExecCall::CloseLibrary),
            -552 => Some(ExecCall::OpenLibrary),
            _ => None,
        }
    }
}

/// Host-side exec.library.
///
/// Register conventions follow the OS documentation: `AllocMem(size/D0,
/// flags/D1)` returns the block in D0; `OpenLibrary(name/A1, version/D0)`
/// returns the base in D0. `OldOpenLibrary` is the pre-V36 entry point with
/// no version argument; it opens with version 0.
#[derive(Default)]
pub struct ExecLibrary;

impl LibraryEmulator for ExecLibrary {
    fn name(&self) -> &'static str {
        "exec.library"
    }

    fn handle(&mut self, offset: i32, ctx: &mut TrapContext<'_>) -> Result<bool> {
        let Some(call) = ExecCall::from_offset(offset) else {
            return Ok(false);
        };

        match call {
            ExecCall::AllocMem => {
                let size = ctx.cpu.register(Register::D0);
                let flags = MemFlags::from_bits_truncate(ctx.cpu.register(Register::D1));
                let block = ctx.allocator.allocate(ctx.memory, size, flags)?;
                ctx.cpu.set_register(Register::D0, block);
            }
            ExecCall::FreeMem => {
                let block = ctx.cpu.register(Register::A1);
                let size = ctx.cpu.register(Register::D0);
                ctx.allocator.free(block, size);
            }
            ExecCall::OldOpenLibrary | ExecCall::OpenLibrary => {
                let name_ptr = ctx.cpu.register(Register::A1);
                let name = read_string(ctx.memory, name_ptr)?;
                let version = if call == ExecCall::OpenLibrary {
                    ctx.cpu.register(Register::D0)
                } else {
                    0
                };
                let base = ctx.libraries.open(ctx.memory, &name, version)?;
                ctx.cpu.set_register(Register::D0, base.unwrap_or(0));
            }
            ExecCall::CloseLibrary => {
                // Stub libraries have no open count and real libraries stay
                // installed for the life of the session.
                log::trace!(
                    "CloseLibrary base {:#010x}",
                    ctx.cpu.register(Register::A1)
                );
            }
        }
        Ok(true)
    }
}
