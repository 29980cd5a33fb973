//! Bundled reference implementation of the [`CpuEngine`] contract.
//!
//! A deliberately small 68000 interpreter: enough of the instruction set to
//! run the bundled tests and simple doors (immediate moves, register moves,
//! absolute and displacement jumps/calls, branches, quick arithmetic, test,
//! stop). Anything outside the subset is an engine error with the offending
//! opcode and address, which is the honest answer for a reference engine —
//! production deployments slot a full-fidelity engine in through the trait.
//!
//! Cycle costs are the coarse 68000 figures; cooperative scheduling only needs
//! them to be proportionate, not exact.

use crate::{
    cpu::{CpuEngine, Register, RunOutcome},
    memory::MemoryImage,
    Result,
};

// Status register condition code bits.
const SR_ZERO: u16 = 1 << 2;
const SR_NEGATIVE: u16 = 1 << 3;

/// Reference 68000 interpreter.
///
/// # Examples
///
/// ```rust
/// use amidoor::cpu::{CpuEngine, Interpreter, Register, RunOutcome};
/// use amidoor::memory::MemoryImage;
///
/// let mut memory = MemoryImage::new(0x1000);
/// memory.write_u32(0, 0x0F00)?;    // initial stack pointer
/// memory.write_u32(4, 0x0100)?;    // initial program counter
/// memory.write_u16(0x100, 0x7029)?; // moveq #41,d0
/// memory.write_u16(0x102, 0x4E72)?; // stop
/// memory.write_u16(0x104, 0x2700)?;
///
/// let mut cpu = Interpreter::new();
/// cpu.reset(&memory)?;
/// let outcome = cpu.run(&mut memory, 100)?;
/// assert!(matches!(outcome, RunOutcome::Halted { .. }));
/// assert_eq!(cpu.register(Register::D0), 41);
/// # Ok::<(), amidoor::Error>(())
/// ```
#[derive(Default)]
pub struct Interpreter {
    data: [u32; 8],
    addr: [u32; 8],
    pc: u32,
    sr: u16,
    halted: bool,
    library_regions: Vec<(u32, u32)>,
}

impl Interpreter {
    /// Create an interpreter with a zeroed register file.
    #[must_use]
    pub fn new() -> Self {
        Interpreter::default()
    }

    fn in_library_region(&self, address: u32) -> bool {
        self.library_regions
            .iter()
            .any(|&(start, end)| address >= start && address < end)
    }

    fn set_nz(&mut self, value: u32) {
        self.sr &= !(SR_ZERO | SR_NEGATIVE);
        if value == 0 {
            self.sr |= SR_ZERO;
        }
        if value & 0x8000_0000 != 0 {
            self.sr |= SR_NEGATIVE;
        }
    }

    fn push_u32(&mut self, memory: &mut MemoryImage, value: u32) -> Result<()> {
        self.addr[7] = self.addr[7].wrapping_sub(4);
        memory.write_u32(self.addr[7], value)
    }

    fn pop_u32(&mut self, memory: &MemoryImage) -> Result<u32> {
        let value = memory.read_u32(self.addr[7])?;
        self.addr[7] = self.addr[7].wrapping_add(4);
        Ok(value)
    }

    /// Resolve a branch displacement encoded in the low byte of `op`.
    fn branch_target(&mut self, memory: &MemoryImage, op: u16) -> Result<(u32, u32)> {
        let base = self.pc.wrapping_add(2);
        let disp8 = op as u8 as i8;
        if disp8 == 0 {
            let disp16 = memory.read_u16(base)? as i16;
            Ok((base.wrapping_add(disp16 as u32), 4))
        } else {
            Ok((base.wrapping_add(disp8 as u32), 2))
        }
    }

    /// Execute a call to `target`, trapping when it lands in library space.
    fn call(
        &mut self,
        memory: &mut MemoryImage,
        target: u32,
        return_address: u32,
        cycles: u32,
    ) -> Result<Option<RunOutcome>> {
        self.push_u32(memory, return_address)?;
        self.pc = target;
        if self.in_library_region(target) {
            return Ok(Some(RunOutcome::LibraryCall { target, cycles }));
        }
        Ok(None)
    }

    /// Execute one instruction, returning its cycle cost, or an early outcome.
    fn step(&mut self, memory: &mut MemoryImage, consumed: u32) -> Result<StepResult> {
        let op = memory.read_u16(self.pc)?;

        match op {
            // nop
            0x4E71 => {
                self.pc = self.pc.wrapping_add(2);
                return Ok(StepResult::Continue(4));
            }
            // rts
            0x4E75 => {
                self.pc = self.pop_u32(memory)?;
                return Ok(StepResult::Continue(16));
            }
            // stop #imm16 — the halt instruction of this environment
            0x4E72 => {
                self.sr = memory.read_u16(self.pc.wrapping_add(2))?;
                self.pc = self.pc.wrapping_add(4);
                self.halted = true;
                return Ok(StepResult::Outcome(RunOutcome::Halted {
                    cycles: consumed + 4,
                }));
            }
            // jsr (xxx).l
            0x4EB9 => {
                let target = memory.read_u32(self.pc.wrapping_add(2))?;
                let ret = self.pc.wrapping_add(6);
                if let Some(outcome) = self.call(memory, target, ret, consumed + 20)? {
                    return Ok(StepResult::Outcome(outcome));
                }
                return Ok(StepResult::Continue(20));
            }
            // jmp (xxx).l
            0x4EF9 => {
                self.pc = memory.read_u32(self.pc.wrapping_add(2))?;
                return Ok(StepResult::Continue(12));
            }
            _ => {}
        }

        // jsr d16(An) — the canonical library call form: jsr -offset(a6)
        if op & 0xFFF8 == 0x4EA8 {
            let an = self.addr[(op & 7) as usize];
            let disp = memory.read_u16(self.pc.wrapping_add(2))? as i16;
            let target = an.wrapping_add(disp as u32);
            let ret = self.pc.wrapping_add(4);
            if let Some(outcome) = self.call(memory, target, ret, consumed + 18)? {
                return Ok(StepResult::Outcome(outcome));
            }
            return Ok(StepResult::Continue(18));
        }

        // jmp d16(An)
        if op & 0xFFF8 == 0x4EE8 {
            let an = self.addr[(op & 7) as usize];
            let disp = memory.read_u16(self.pc.wrapping_add(2))? as i16;
            self.pc = an.wrapping_add(disp as u32);
            return Ok(StepResult::Continue(10));
        }

        // moveq #imm8,Dn
        if op & 0xF100 == 0x7000 {
            let value = op as u8 as i8 as i32 as u32;
            self.data[((op >> 9) & 7) as usize] = value;
            self.set_nz(value);
            self.pc = self.pc.wrapping_add(2);
            return Ok(StepResult::Continue(4));
        }

        // move.l #imm32,Dn
        if op & 0xF1FF == 0x203C {
            let value = memory.read_u32(self.pc.wrapping_add(2))?;
            self.data[((op >> 9) & 7) as usize] = value;
            self.set_nz(value);
            self.pc = self.pc.wrapping_add(6);
            return Ok(StepResult::Continue(12));
        }

        // movea.l #imm32,An
        if op & 0xF1FF == 0x207C {
            let value = memory.read_u32(self.pc.wrapping_add(2))?;
            self.addr[((op >> 9) & 7) as usize] = value;
            self.pc = self.pc.wrapping_add(6);
            return Ok(StepResult::Continue(12));
        }

        // move.l Ds,Dn
        if op & 0xF1F8 == 0x2000 {
            let value = self.data[(op & 7) as usize];
            self.data[((op >> 9) & 7) as usize] = value;
            self.set_nz(value);
            self.pc = self.pc.wrapping_add(2);
            return Ok(StepResult::Continue(4));
        }

        // move.l Ds,An (movea.l)
        if op & 0xF1F8 == 0x2040 {
            self.addr[((op >> 9) & 7) as usize] = self.data[(op & 7) as usize];
            self.pc = self.pc.wrapping_add(2);
            return Ok(StepResult::Continue(4));
        }

        // lea (xxx).l,An
        if op & 0xF1FF == 0x41F9 {
            self.addr[((op >> 9) & 7) as usize] = memory.read_u32(self.pc.wrapping_add(2))?;
            self.pc = self.pc.wrapping_add(6);
            return Ok(StepResult::Continue(12));
        }

        // tst.l Dn
        if op & 0xFFF8 == 0x4A80 {
            let value = self.data[(op & 7) as usize];
            self.set_nz(value);
            self.pc = self.pc.wrapping_add(2);
            return Ok(StepResult::Continue(4));
        }

        // addq.l #q,Dn / subq.l #q,Dn
        if op & 0xF0F8 == 0x5080 {
            let mut quick = u32::from((op >> 9) & 7);
            if quick == 0 {
                quick = 8;
            }
            let register = (op & 7) as usize;
            let value = if op & 0x0100 == 0 {
                self.data[register].wrapping_add(quick)
            } else {
                self.data[register].wrapping_sub(quick)
            };
            self.data[register] = value;
            self.set_nz(value);
            self.pc = self.pc.wrapping_add(2);
            return Ok(StepResult::Continue(8));
        }

        // bra / beq / bne
        if op & 0xFF00 == 0x6000 || op & 0xFF00 == 0x6700 || op & 0xFF00 == 0x6600 {
            let (target, advance) = self.branch_target(memory, op)?;
            let zero = self.sr & SR_ZERO != 0;
            let taken = match op & 0xFF00 {
                0x6000 => true,
                0x6700 => zero,
                _ => !zero,
            };
            if taken {
                self.pc = target;
            } else {
                self.pc = self.pc.wrapping_add(advance);
            }
            return Ok(StepResult::Continue(10));
        }

        Err(crate::Error::Engine(format!(
            "unimplemented opcode {op:#06x} at {:#010x}",
            self.pc
        )))
    }
}

/// Internal per-instruction result.
enum StepResult {
    /// Instruction retired normally; cycle cost attached.
    Continue(u32),
    /// Execution must suspend with this outcome.
    Outcome(RunOutcome),
}

impl CpuEngine for Interpreter {
    fn register(&self, register: Register) -> u32 {
        match register {
            Register::D0 => self.data[0],
            Register::D1 => self.data[1],
            Register::D2 => self.data[2],
            Register::D3 => self.data[3],
            Register::D4 => self.data[4],
            Register::D5 => self.data[5],
            Register::D6 => self.data[6],
            Register::D7 => self.data[7],
            Register::A0 => self.addr[0],
            Register::A1 => self.addr[1],
            Register::A2 => self.addr[2],
            Register::A3 => self.addr[3],
            Register::A4 => self.addr[4],
            Register::A5 => self.addr[5],
            Register::A6 => self.addr[6],
            Register::A7 => self.addr[7],
            Register::Pc => self.pc,
            Register::Sr => u32::from(self.sr),
        }
    }

    fn set_register(&mut self, register: Register, value: u32) {
        match register {
            Register::D0 => self.data[0] = value,
            Register::D1 => self.data[1] = value,
            Register::D2 => self.data[2] = value,
            Register::D3 => self.data[3] = value,
            Register::D4 => self.data[4] = value,
            Register::D5 => self.data[5] = value,
            Register::D6 => self.data[6] = value,
            Register::D7 => self.data[7] = value,
            Register::A0 => self.addr[0] = value,
            Register::A1 => self.addr[1] = value,
            Register::A2 => self.addr[2] = value,
            Register::A3 => self.addr[3] = value,
            Register::A4 => self.addr[4] = value,
            Register::A5 => self.addr[5] = value,
            Register::A6 => self.addr[6] = value,
            Register::A7 => self.addr[7] = value,
            Register::Pc => self.pc = value,
            Register::Sr => self.sr = value as u16,
        }
    }

    fn add_library_region(&mut self, start: u32, end: u32) {
        self.library_regions.push((start, end));
    }

    fn reset(&mut self, memory: &MemoryImage) -> Result<()> {
        self.addr[7] = memory.read_u32(0)?;
        self.pc = memory.read_u32(4)?;
        self.sr = 0x2700;
        self.halted = false;
        Ok(())
    }

    fn run(&mut self, memory: &mut MemoryImage, cycle_budget: u32) -> Result<RunOutcome> {
        if self.halted {
            return Ok(RunOutcome::Halted { cycles: 0 });
        }

        let mut consumed = 0_u32;
        while consumed < cycle_budget {
            match self.step(memory, consumed)? {
                StepResult::Continue(cycles) => consumed += cycles,
                StepResult::Outcome(outcome) => return Ok(outcome),
            }
        }
        Ok(RunOutcome::Completed { cycles: consumed })
    }
}
