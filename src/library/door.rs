//! door.library stub: the terminal API door programs are written against.

use crate::{
    cpu::Register,
    library::{LibraryEmulator, TrapContext},
    memory::read_string,
    Result,
};

/// Value returned by `GetChar` when the input queue is empty.
const NO_INPUT: u32 = 0xFFFF_FFFF;

/// Offsets of the door.library operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DoorCall {
    PutString,
    PutChar,
    GetChar,
    GetLine,
    ClearScreen,
}

impl DoorCall {
    fn from_offset(offset: i32) -> Option<DoorCall> {
        match offset {
            -6 => Some(DoorCall::PutString),
            -12 => Some(DoorCall::PutChar),
            -18 => Some(DoorCall::GetChar),
            -24 => Some(DoorCall::GetLine),
            -30 => Some(DoorCall::ClearScreen),
            _ => None,
        }
    }
}

/// Host-side door.library.
///
/// The terminal calls marshal between the register conventions of the door
/// API (strings in A0, characters and lengths in D0) and the session's
/// [`crate::session::IoChannel`]. `ClearScreen` emits the ANSI erase + home
/// sequence; door-era terminals and modern ones agree on it.
#[derive(Default)]
pub struct DoorLibrary;

impl LibraryEmulator for DoorLibrary {
    fn name(&self) -> &'static str {
        "door.library"
    }

    fn handle(&mut self, offset: i32, ctx: &mut TrapContext<'_>) -> Result<bool> {
        let Some(call) = DoorCall::from_offset(offset) else {
            return Ok(false);
        };

        match call {
            DoorCall::PutString => {
                let text = read_string(ctx.memory, ctx.cpu.register(Register::A0))?;
                ctx.io.write(text.as_bytes());
            }
            DoorCall::PutChar => {
                ctx.io.write_u8(ctx.cpu.register(Register::D0) as u8);
            }
            DoorCall::GetChar => {
                let value = ctx.io.pop_input().map_or(NO_INPUT, u32::from);
                ctx.cpu.set_register(Register::D0, value);
            }
            DoorCall::GetLine => {
                let buffer = ctx.cpu.register(Register::A0);
                let capacity = ctx.cpu.register(Register::D0);
                let len = get_line(ctx, buffer, capacity)?;
                ctx.cpu.set_register(Register::D0, len);
            }
            DoorCall::ClearScreen => {
                ctx.io.write(b"\x1b[2J\x1b[H");
            }
        }
        Ok(true)
    }
}

/// Consume one line of input into `buffer`, NUL-terminated.
///
/// Reads up to the next line feed (consumed, not stored) or until the queue
/// empties. At most `capacity − 1` bytes are stored so the terminator always
/// fits; a zero-capacity buffer stores nothing. Returns the stored length.
fn get_line(ctx: &mut TrapContext<'_>, buffer: u32, capacity: u32) -> Result<u32> {
    let mut len = 0;
    while let Some(byte) = ctx.io.pop_input() {
        if byte == b'\n' {
            break;
        }
        if len + 1 < capacity {
            ctx.memory.write_u8(buffer.wrapping_add(len), byte)?;
            len += 1;
        }
    }
    if capacity > 0 {
        ctx.memory.write_u8(buffer.wrapping_add(len), 0)?;
    }
    Ok(len)
}
