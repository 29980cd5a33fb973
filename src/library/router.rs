//! Trap router: from a trapped absolute address to a library operation.

use crate::{
    library::{
        DoorLibrary, DosLibrary, ExecLibrary, LibraryEmulator, ResolvedTarget, TrapContext,
    },
    Result,
};

/// Outcome of routing one trapped library call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// An emulator performed the operation; the caller performs the callee
    /// epilogue and resumes.
    Handled,
    /// The call resolved to a real library's jump vector; the caller should
    /// resume execution at this address (the return frame is already on the
    /// stack, so the real code returns to the original call site).
    Redirect(u32),
    /// No library claims the target, or the library does not implement the
    /// offset. The caller decides whether that is fatal; nothing was mutated.
    Unhandled,
}

/// Routes trapped call targets to the per-library emulators.
///
/// Resolution computes `target − base` for every known library; a hit within
/// a library's negative-offset range goes to that library's emulator with the
/// resolved offset. Stateless across dispatches — each trapped call is
/// resolved and finished before the session's step loop continues.
///
/// # Examples
///
/// ```rust,ignore
/// let mut router = TrapRouter::new();
/// match router.dispatch(&mut ctx, target)? {
///     Dispatch::Handled => { /* epilogue, resume */ }
///     Dispatch::Redirect(address) => { /* jump into real library code */ }
///     Dispatch::Unhandled => { /* fake a zero return or escalate */ }
/// }
/// ```
#[derive(Default)]
pub struct TrapRouter {
    exec: ExecLibrary,
    dos: DosLibrary,
    door: DoorLibrary,
}

impl TrapRouter {
    /// Create a router with the three stub emulators registered.
    #[must_use]
    pub fn new() -> Self {
        TrapRouter::default()
    }

    /// Route the trapped call at `target`.
    ///
    /// # Errors
    /// Propagates marshaling faults from the emulator that claimed the call.
    pub fn dispatch(&mut self, ctx: &mut TrapContext<'_>, target: u32) -> Result<Dispatch> {
        // A target inside a loaded library's installed image is real machine
        // code (the library's functions calling each other, most commonly);
        // it executes in place rather than being emulated.
        let Some(call) = ctx.libraries.resolve(target) else {
            if ctx.libraries.is_loaded_code(target) {
                return Ok(Dispatch::Redirect(target));
            }
            log::debug!("unresolved trap at {target:#010x}");
            return Ok(Dispatch::Unhandled);
        };

        let handled = match call.target {
            ResolvedTarget::Exec => self.exec.handle(call.offset, ctx)?,
            ResolvedTarget::Dos => self.dos.handle(call.offset, ctx)?,
            ResolvedTarget::Door => self.door.handle(call.offset, ctx)?,
            ResolvedTarget::Loaded(index) => {
                let library = &ctx.libraries.loaded()[index];
                return match library.jump_table.get(&call.offset) {
                    Some(&address) => Ok(Dispatch::Redirect(address)),
                    None if library.contains(target) => Ok(Dispatch::Redirect(target)),
                    None => {
                        log::debug!(
                            "call into {} at unknown offset {}",
                            library.name,
                            call.offset
                        );
                        Ok(Dispatch::Unhandled)
                    }
                };
            }
        };

        if handled {
            Ok(Dispatch::Handled)
        } else {
            log::debug!(
                "library offset {} not implemented for target {target:#010x}",
                call.offset
            );
            Ok(Dispatch::Unhandled)
        }
    }
}
