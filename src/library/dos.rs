//! dos.library stub: byte streams on well-known handles and wall-clock time.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::{
    cpu::Register,
    library::{LibraryEmulator, TrapContext},
    Result,
};

/// Handle value returned by `Input()` and accepted by `Read`.
pub const STDIN_HANDLE: u32 = 1;
/// Handle value returned by `Output()` and accepted by `Write`.
pub const STDOUT_HANDLE: u32 = 2;
/// Handle value for the error stream; writes are merged into the output.
pub const STDERR_HANDLE: u32 = 3;

/// Seconds between the UNIX epoch and 1978-01-01, the OS's day zero.
const EPOCH_OFFSET_SECS: u64 = 252_460_800;

/// `DateStamp` ticks per second.
const TICKS_PER_SECOND: u64 = 50;

/// Offsets of the emulated dos.library operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DosCall {
    Open,
    Close,
    Read,
    Write,
    Input,
    Output,
    DateStamp,
}

impl DosCall {
    fn from_offset(offset: i32) -> Option<DosCall> {
        match offset {
            -30 => Some(DosCall::Open),
            -36 => Some(DosCall::Close),
            -42 => Some(DosCall::Read),
            -48 => Some(DosCall::Write),
            -54 => Some(DosCall::Input),
            -60 => Some(DosCall::Output),
            -192 => Some(DosCall::DateStamp),
            _ => None,
        }
    }
}

/// Host-side dos.library.
///
/// dos.library predates the register conventions of the rest of the OS and
/// passes arguments in D1-D3 with the result in D0. Only the three console
/// handles exist; `Open` never grants filesystem access and returns 0 for
/// every name, which door programs already treat as failure.
#[derive(Default)]
pub struct DosLibrary;

impl DosLibrary {
    /// Copy `len` bytes at `buffer` to the session output.
    fn write(&self, ctx: &mut TrapContext<'_>, buffer: u32, len: u32) -> Result<u32> {
        let bytes = ctx.memory.read_bytes(buffer, len)?.to_vec();
        ctx.io.write(&bytes);
        Ok(len)
    }

    /// Fill `buffer` with up to `len` queued input bytes.
    fn read(&self, ctx: &mut TrapContext<'_>, buffer: u32, len: u32) -> Result<u32> {
        let mut count = 0;
        while count < len {
            let Some(byte) = ctx.io.pop_input() else {
                break;
            };
            // Program-controlled pointer: wrap and let the image mask and
            // bounds-check the access.
            ctx.memory.write_u8(buffer.wrapping_add(count), byte)?;
            count += 1;
        }
        Ok(count)
    }

    /// Write a `DateStamp` (days, minutes, ticks since 1978-01-01) at `at`.
    fn date_stamp(&self, ctx: &mut TrapContext<'_>, at: u32) -> Result<()> {
        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
            .saturating_sub(EPOCH_OFFSET_SECS);
        let days = since_epoch / 86_400;
        let minutes = (since_epoch % 86_400) / 60;
        let ticks = (since_epoch % 60) * TICKS_PER_SECOND;
        ctx.memory.write_u32(at, days as u32)?;
        ctx.memory.write_u32(at.wrapping_add(4), minutes as u32)?;
        ctx.memory.write_u32(at.wrapping_add(8), ticks as u32)?;
        Ok(())
    }
}

impl LibraryEmulator for DosLibrary {
    fn name(&self) -> &'static str {
        "dos.library"
    }

    fn handle(&mut self, offset: i32, ctx: &mut TrapContext<'_>) -> Result<bool> {
        let Some(call) = DosCall::from_offset(offset) else {
            return Ok(false);
        };

        match call {
            DosCall::Open => {
                // No filesystem behind the stub.
                ctx.cpu.set_register(Register::D0, 0);
            }
            DosCall::Close => {
                ctx.cpu.set_register(Register::D0, u32::MAX); // DOSTRUE
            }
            DosCall::Read => {
                let handle = ctx.cpu.register(Register::D1);
                let buffer = ctx.cpu.register(Register::D2);
                let len = ctx.cpu.register(Register::D3);
                let count = if handle == STDIN_HANDLE {
                    self.read(ctx, buffer, len)?
                } else {
                    log::debug!("Read on unknown handle {handle}");
                    0
                };
                ctx.cpu.set_register(Register::D0, count);
            }
            DosCall::Write => {
                let handle = ctx.cpu.register(Register::D1);
                let buffer = ctx.cpu.register(Register::D2);
                let len = ctx.cpu.register(Register::D3);
                let count = if handle == STDOUT_HANDLE || handle == STDERR_HANDLE {
                    self.write(ctx, buffer, len)?
                } else {
                    log::debug!("Write on unknown handle {handle}");
                    0
                };
                ctx.cpu.set_register(Register::D0, count);
            }
            DosCall::Input => {
                ctx.cpu.set_register(Register::D0, STDIN_HANDLE);
            }
            DosCall::Output => {
                ctx.cpu.set_register(Register::D0, STDOUT_HANDLE);
            }
            DosCall::DateStamp => {
                let at = ctx.cpu.register(Register::D1);
                self.date_stamp(ctx, at)?;
                ctx.cpu.set_register(Register::D0, at);
            }
        }
        Ok(true)
    }
}
