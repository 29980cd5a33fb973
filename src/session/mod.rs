//! Execution sessions: one loaded door program, stepped to completion.
//!
//! A session owns everything one program touches — memory image, CPU engine,
//! heap allocator, library table, I/O channel — and shares none of it, so a
//! fault or runaway loop in one session cannot leak into another. The host
//! drives the session cooperatively: [`DoorSession::step`] runs one bounded
//! cycle slice and returns, which is where the wall-clock deadline is checked
//! and where queued input and pending output cross the boundary.
//!
//! # Lifecycle
//!
//! ```text
//! Initializing --start--> Running --halt-----> Completed
//!                            |   \--deadline-> TimedOut
//!                            |   \--fault----> Errored
//!                            v
//!                       Terminated   (terminate(), from any state)
//! ```
//!
//! Library calls never leave the step that trapped them: the engine suspends
//! with a [`crate::cpu::RunOutcome::LibraryCall`], the router executes the
//! call host-side, the session performs the callee epilogue and the next
//! slice resumes as if the call had returned normally.

mod io;

pub use io::IoChannel;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::{
    cpu::{CpuEngine, Interpreter, Register, RunOutcome},
    hunk::BinaryImage,
    library::{Dispatch, LibraryTable, TrapRouter},
    memory::{HeapAllocator, MemoryImage, MemoryLayout},
    Error, Result,
};

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum SessionState {
    /// Constructed; no program loaded yet.
    Initializing,
    /// Program installed in memory; engine not started.
    Loaded,
    /// Engine live; `step`/`run` advance the program.
    Running,
    /// The program halted normally.
    Completed,
    /// The wall-clock deadline passed before the program halted.
    TimedOut,
    /// The engine or a library call faulted; the error was surfaced.
    Errored,
    /// `terminate` was called; the engine is gone.
    Terminated,
}

impl SessionState {
    /// Whether the session can make no further progress.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(
            self,
            SessionState::Initializing | SessionState::Loaded | SessionState::Running
        )
    }
}

/// Tunables for one session.
///
/// # Examples
///
/// ```rust,ignore
/// let config = SessionConfig::new()
///     .timeout(Duration::from_secs(30))
///     .library_path("/bbs/libs");
/// let mut session = DoorSession::new(config)?;
/// ```
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Wall-clock budget for the whole program run.
    pub timeout: Duration,
    /// Size of the emulated address space in bytes.
    pub memory_bytes: usize,
    /// Cycle budget per `step` slice.
    pub cycles_per_slice: u32,
    /// Directories searched for real library binaries.
    pub library_paths: Vec<PathBuf>,
    /// Whether real library binaries may be loaded at all.
    pub allow_real_libraries: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            timeout: Duration::from_secs(300),
            memory_bytes: crate::memory::DEFAULT_MEMORY_BYTES,
            cycles_per_slice: 50_000,
            library_paths: Vec::new(),
            allow_real_libraries: false,
        }
    }
}

impl SessionConfig {
    /// Start from the defaults.
    #[must_use]
    pub fn new() -> Self {
        SessionConfig::default()
    }

    /// Set the wall-clock budget.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the emulated address-space size.
    #[must_use]
    pub fn memory_bytes(mut self, bytes: usize) -> Self {
        self.memory_bytes = bytes;
        self
    }

    /// Set the cycle budget per step slice.
    #[must_use]
    pub fn cycles_per_slice(mut self, cycles: u32) -> Self {
        self.cycles_per_slice = cycles;
        self
    }

    /// Append a directory to the real-library search path and enable
    /// real-binary loading.
    #[must_use]
    pub fn library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.library_paths.push(path.into());
        self.allow_real_libraries = true;
        self
    }

    /// Enable or disable real-binary library loading.
    #[must_use]
    pub fn allow_real_libraries(mut self, allow: bool) -> Self {
        self.allow_real_libraries = allow;
        self
    }
}

/// One door program, loaded and stepped to completion.
pub struct DoorSession {
    config: SessionConfig,
    layout: MemoryLayout,
    memory: MemoryImage,
    io: IoChannel,
    allocator: HeapAllocator,
    libraries: LibraryTable,
    router: TrapRouter,
    cpu: Option<Box<dyn CpuEngine>>,
    entry_point: u32,
    deadline: Option<Instant>,
    cycles_run: u64,
    state: SessionState,
}

impl DoorSession {
    /// Build an empty session from `config`.
    ///
    /// # Errors
    /// Fails when the configured memory size is outside the supported range.
    pub fn new(config: SessionConfig) -> Result<Self> {
        let layout = MemoryLayout::new(config.memory_bytes)?;
        let memory = MemoryImage::new(config.memory_bytes);
        let allocator = HeapAllocator::new(&layout);
        let libraries = LibraryTable::new(
            layout,
            config.library_paths.clone(),
            config.allow_real_libraries,
        );
        Ok(DoorSession {
            config,
            layout,
            memory,
            io: IoChannel::new(),
            allocator,
            libraries,
            router: TrapRouter::new(),
            cpu: None,
            entry_point: 0,
            deadline: None,
            cycles_run: 0,
            state: SessionState::Initializing,
        })
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Total cycles the engine has reported across all slices.
    #[must_use]
    pub fn cycles_run(&self) -> u64 {
        self.cycles_run
    }

    /// The session's address-space layout.
    #[must_use]
    pub fn layout(&self) -> &MemoryLayout {
        &self.layout
    }

    /// Read-only view of the session's memory image.
    #[must_use]
    pub fn memory(&self) -> &MemoryImage {
        &self.memory
    }

    /// Load a door binary from a file and start the engine.
    ///
    /// # Errors
    /// Fails on unreadable or malformed binaries, on images that do not fit
    /// in memory, or when called on a session that already started.
    pub fn start(&mut self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let data = crate::file::read_file(path.as_ref())?;
        self.start_from_bytes(&data)
    }

    /// Load a door binary from memory and start the engine.
    ///
    /// Installs the image, writes the reset vectors (initial stack pointer at
    /// address 0, entry point at address 4), constructs and resets the engine
    /// with the library space registered as trapping, and arms the wall-clock
    /// deadline.
    ///
    /// # Errors
    /// Same conditions as [`DoorSession::start`].
    pub fn start_from_bytes(&mut self, data: &[u8]) -> Result<()> {
        if self.state != SessionState::Initializing {
            return Err(Error::InvalidState("session already started"));
        }

        let image = BinaryImage::parse_at(data, self.layout.load_base)?;
        image.install(&mut self.memory)?;
        self.entry_point = image.entry_point();
        self.state = SessionState::Loaded;

        self.memory.write_u32(0, self.layout.stack_pointer)?;
        self.memory.write_u32(4, self.entry_point)?;

        let mut cpu: Box<dyn CpuEngine> = Box::new(Interpreter::new());
        cpu.add_library_region(self.layout.library_space, self.layout.memory_bytes);
        cpu.reset(&self.memory)?;
        self.cpu = Some(cpu);

        self.deadline = Some(Instant::now() + self.config.timeout);
        self.state = SessionState::Running;
        log::debug!(
            "session started: entry {:#010x}, sp {:#010x}, timeout {:?}",
            self.entry_point,
            self.layout.stack_pointer,
            self.config.timeout
        );
        Ok(())
    }

    /// Run one bounded cycle slice.
    ///
    /// Returns the state after the slice; callers loop until
    /// [`SessionState::is_terminal`]. The deadline is checked before the
    /// slice, so a timed-out session never executes further instructions.
    ///
    /// # Errors
    /// Engine and library faults are surfaced verbatim after moving the
    /// session to [`SessionState::Errored`].
    pub fn step(&mut self) -> Result<SessionState> {
        if self.state != SessionState::Running {
            return Err(Error::InvalidState("session is not running"));
        }
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            log::debug!("session deadline passed after {} cycles", self.cycles_run);
            self.state = SessionState::TimedOut;
            return Ok(self.state);
        }

        match self.run_slice() {
            Ok(state) => Ok(state),
            Err(error) => {
                self.state = SessionState::Errored;
                Err(error)
            }
        }
    }

    /// Step until the session reaches a terminal state.
    ///
    /// # Errors
    /// Same conditions as [`DoorSession::step`].
    pub fn run(&mut self) -> Result<SessionState> {
        while !self.state.is_terminal() {
            self.step()?;
        }
        Ok(self.state)
    }

    /// Append bytes to the program's pending input.
    pub fn queue_input(&mut self, bytes: &[u8]) {
        self.io.queue_input(bytes);
    }

    /// Drain everything the program has written since the last take.
    pub fn take_output(&mut self) -> Vec<u8> {
        self.io.take_output()
    }

    /// Tear the session down. Idempotent from any state.
    pub fn terminate(&mut self) {
        if self.state == SessionState::Terminated {
            return;
        }
        self.cpu = None;
        self.deadline = None;
        self.state = SessionState::Terminated;
        log::debug!("session terminated after {} cycles", self.cycles_run);
    }

    fn run_slice(&mut self) -> Result<SessionState> {
        let Some(cpu) = self.cpu.as_deref_mut() else {
            return Err(Error::InvalidState("engine missing"));
        };

        match cpu.run(&mut self.memory, self.config.cycles_per_slice)? {
            RunOutcome::Completed { cycles } => {
                self.cycles_run += u64::from(cycles);
            }
            RunOutcome::Halted { cycles } => {
                self.cycles_run += u64::from(cycles);
                self.state = SessionState::Completed;
            }
            RunOutcome::LibraryCall { target, cycles } => {
                self.cycles_run += u64::from(cycles);
                let mut ctx = crate::library::TrapContext {
                    cpu,
                    memory: &mut self.memory,
                    io: &mut self.io,
                    allocator: &mut self.allocator,
                    libraries: &mut self.libraries,
                };
                match self.router.dispatch(&mut ctx, target)? {
                    Dispatch::Handled => {
                        return_from_call(ctx.cpu, ctx.memory)?;
                    }
                    Dispatch::Redirect(address) => {
                        // Real library code runs in place; its own RTS uses
                        // the frame the trapped call pushed.
                        ctx.cpu.set_register(Register::Pc, address);
                    }
                    Dispatch::Unhandled => {
                        log::debug!("unhandled library call at {target:#010x}, returning 0");
                        ctx.cpu.set_register(Register::D0, 0);
                        return_from_call(ctx.cpu, ctx.memory)?;
                    }
                }
            }
        }
        Ok(self.state)
    }
}

/// Callee epilogue for an emulated library call: pop the return address the
/// trapped `jsr` pushed and resume there.
fn return_from_call(cpu: &mut dyn CpuEngine, memory: &MemoryImage) -> Result<()> {
    let sp = cpu.register(Register::A7);
    let return_address = memory.read_u32(sp)?;
    cpu.set_register(Register::A7, sp.wrapping_add(4));
    cpu.set_register(Register::Pc, return_address);
    Ok(())
}
