//! The CPU integration contract and the bundled reference engine.
//!
//! The instruction-stepping engine is a replaceable component: anything that
//! can step 68000 machine code against a [`crate::memory::MemoryImage`] and
//! honor the library-call suspension protocol can drive a door. This module
//! defines that contract ([`CpuEngine`]) and ships a small reference
//! interpreter ([`Interpreter`]) covering the instruction subset the bundled
//! tests and simple doors use.
//!
//! # The suspend/resume protocol
//!
//! The original environment had its engine invoke a host callback mid
//! instruction whenever code called into library space. Here that re-entrant
//! callback is replaced with a discriminated result: [`CpuEngine::run`]
//! returns [`RunOutcome::LibraryCall`] *after* pushing the return address and
//! setting the program counter to the call target, then suspends. The caller
//! (the execution session) dispatches the call through the trap router,
//! performs the callee epilogue, and resumes the engine with another `run`
//! call — plain sequential function calls, no re-entrancy.
//!
//! # Key Components
//!
//! - [`CpuEngine`] - The contract an external engine must satisfy
//! - [`Register`] - The 68000 register file as seen through the contract
//! - [`RunOutcome`] - Result of one bounded execution slice
//! - [`Interpreter`] - Bundled reference engine

mod interpreter;


pub use interpreter::Interpreter;

use strum::Display;

use crate::{memory::MemoryImage, Result};

/// One register of the emulated 68000, as exposed through [`CpuEngine`].
///
/// Eight data registers, eight address registers (A7 doubling as the stack
/// pointer), the program counter and the status register. All are 32 bits
/// wide through this interface; engines that model a 16-bit status register
/// zero-extend it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Register {
    /// Data register D0 — the conventional primary argument/return register.
    D0,
    /// Data register D1.
    D1,
    /// Data register D2.
    D2,
    /// Data register D3.
    D3,
    /// Data register D4.
    D4,
    /// Data register D5.
    D5,
    /// Data register D6.
    D6,
    /// Data register D7.
    D7,
    /// Address register A0 — conventional buffer/string pointer.
    A0,
    /// Address register A1.
    A1,
    /// Address register A2.
    A2,
    /// Address register A3.
    A3,
    /// Address register A4.
    A4,
    /// Address register A5.
    A5,
    /// Address register A6 — by convention the library base for the call in
    /// flight.
    A6,
    /// Address register A7, the stack pointer.
    A7,
    /// Program counter.
    Pc,
    /// Status register.
    Sr,
}

impl Register {
    /// Data register by index, `0..=7`.
    #[must_use]
    pub fn data(index: usize) -> Register {
        const DATA: [Register; 8] = [
            Register::D0,
            Register::D1,
            Register::D2,
            Register::D3,
            Register::D4,
            Register::D5,
            Register::D6,
            Register::D7,
        ];
        DATA[index & 7]
    }

    /// Address register by index, `0..=7`.
    #[must_use]
    pub fn addr(index: usize) -> Register {
        const ADDR: [Register; 8] = [
            Register::A0,
            Register::A1,
            Register::A2,
            Register::A3,
            Register::A4,
            Register::A5,
            Register::A6,
            Register::A7,
        ];
        ADDR[index & 7]
    }
}

/// Result of one bounded execution slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The cycle budget was consumed without incident; call `run` again to
    /// continue.
    Completed {
        /// Cycles consumed by the slice.
        cycles: u32,
    },
    /// The instruction stream executed a call whose target lies in registered
    /// library space. The return address is already pushed and the program
    /// counter holds `target`; the engine is suspended until the next `run`.
    LibraryCall {
        /// Absolute address the call targeted.
        target: u32,
        /// Cycles consumed up to and including the call.
        cycles: u32,
    },
    /// A halt-type instruction was executed; the program is finished.
    Halted {
        /// Cycles consumed up to and including the halt.
        cycles: u32,
    },
}

/// The contract an instruction-stepping engine must satisfy.
///
/// The engine owns the register file. It does *not* own memory: the session's
/// [`MemoryImage`] is lent to it for each call, which keeps a single owner for
/// the address space and makes the suspend points explicit — there is exactly
/// one runnable component at a time.
///
/// # Contract obligations
///
/// - `reset` re-reads the two 32-bit vectors at address 0 as the initial
///   stack pointer and program counter.
/// - `run` executes at most `cycle_budget` cycles and stops early with
///   [`RunOutcome::LibraryCall`] when a call instruction targets a registered
///   library region (return address pushed, program counter at the target),
///   or [`RunOutcome::Halted`] on a halt-type instruction. Halting is a
///   normal outcome, never an `Err`.
/// - Faults (illegal instruction, unmapped access) are `Err` values and leave
///   the register file at the faulting instruction for post-mortem reads.
pub trait CpuEngine {
    /// Read a register.
    fn register(&self, register: Register) -> u32;

    /// Write a register.
    fn set_register(&mut self, register: Register, value: u32);

    /// Register `[start, end)` as library space for call detection.
    fn add_library_region(&mut self, start: u32, end: u32);

    /// Reload the reset vectors from address 0 of `memory`: initial stack
    /// pointer first, initial program counter second.
    ///
    /// # Errors
    /// Returns [`crate::Error::MemoryFault`] if the vector table is outside
    /// the image.
    fn reset(&mut self, memory: &MemoryImage) -> Result<()>;

    /// Execute up to `cycle_budget` cycles against `memory`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Engine`] for faults the engine detects itself
    /// (illegal opcodes) and [`crate::Error::MemoryFault`] for accesses
    /// outside the image.
    fn run(&mut self, memory: &mut MemoryImage, cycle_budget: u32) -> Result<RunOutcome>;
}
