//! Library table: stub bases, real-binary loading and call-target resolution.
//!
//! Real library binaries are ordinary hunk files. When one is found on the
//! search path it is installed into a downward bump-allocated slot in library
//! space and its jump table recovered by pattern matching — the container
//! format does not record the vector-table layout, but the original linkers
//! emit it as a run of absolute-jump stubs (`jmp (target).l`, opcode `0x4EF9`,
//! six bytes each) at the front of segment 0. The library base is placed just
//! past that run so the recovered offsets are the conventional −6, −12, …
//! multiples.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::{
    hunk::BinaryImage,
    memory::{MemoryImage, MemoryLayout},
    Result,
};

/// Opcode of the absolute long jump the linker emits for each jump vector.
const JMP_ABSOLUTE: u16 = 0x4EF9;

/// Bytes per jump vector: the opcode word plus a 32-bit target.
const JUMP_STUB_BYTES: u32 = 6;

/// Widest negative-offset range a single library may claim. Calls landing
/// further below a base than this belong to no library.
const OFFSET_RANGE: i32 = 0x400;

/// A real shared-library binary installed in library space.
///
/// Never mutated after installation; the jump table maps each recovered
/// negative offset to the absolute address of the function it vectors to.
pub struct LoadedLibrary {
    /// The name the library was opened under, e.g. `"doorutil.library"`.
    pub name: String,
    /// Version requested when the library was first opened.
    pub version: u32,
    /// The base address calls are made relative to.
    pub base: u32,
    /// Recovered map from negative offset to absolute function address.
    pub jump_table: BTreeMap<i32, u32>,
    /// Number of segments installed for this library.
    pub segment_count: usize,
    /// First address of the installed image.
    pub span_start: u32,
    /// One past the last installed byte.
    pub span_end: u32,
}

impl LoadedLibrary {
    /// Whether `address` lies within the installed image.
    #[must_use]
    pub fn contains(&self, address: u32) -> bool {
        (self.span_start..self.span_end).contains(&address)
    }
}

/// Which component handles a resolved call target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedTarget {
    /// The exec.library stub emulator.
    Exec,
    /// The dos.library stub emulator.
    Dos,
    /// The door.library stub emulator.
    Door,
    /// A real library installed by the loader; index into the loaded list.
    Loaded(usize),
}

/// A trapped call target resolved to a library and a negative offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedCall {
    /// Which library the target belongs to.
    pub target: ResolvedTarget,
    /// Offset of the call below that library's base; always negative.
    pub offset: i32,
}

/// Per-session registry of every library a door can reach.
///
/// Owns the stub base assignments, the real-binary loader state and the
/// loaded-library cache. Lives exactly as long as its session and shares
/// nothing with sibling sessions.
pub struct LibraryTable {
    layout: MemoryLayout,
    search_paths: Vec<PathBuf>,
    allow_real: bool,
    loaded: Vec<LoadedLibrary>,
    next_slot: u32,
}

impl LibraryTable {
    /// Create the table for one session.
    ///
    /// # Arguments
    /// * `layout` - The session's address-space layout
    /// * `search_paths` - Ordered directories probed for real library files
    /// * `allow_real` - Whether real-binary loading is enabled at all
    #[must_use]
    pub fn new(layout: MemoryLayout, search_paths: Vec<PathBuf>, allow_real: bool) -> Self {
        LibraryTable {
            next_slot: layout.library_slot_top,
            layout,
            search_paths,
            allow_real,
            loaded: Vec::new(),
        }
    }

    /// The address-space layout this table allocates within.
    #[must_use]
    pub fn layout(&self) -> &MemoryLayout {
        &self.layout
    }

    /// Libraries installed from real binaries, in installation order.
    #[must_use]
    pub fn loaded(&self) -> &[LoadedLibrary] {
        &self.loaded
    }

    /// Open a library by name, returning its base address.
    ///
    /// Resolution order: an already-installed real library, then a fresh
    /// real-binary load (when enabled), then the fixed stub table. `None`
    /// means the name resolved to nothing — the emulated OpenLibrary returns
    /// base 0 and the program decides what that means.
    ///
    /// # Errors
    /// Returns an error only when a found library file is malformed or does
    /// not fit in memory; absence is `Ok(None)`.
    pub fn open(
        &mut self,
        memory: &mut MemoryImage,
        name: &str,
        version: u32,
    ) -> Result<Option<u32>> {
        if let Some(library) = self.load(memory, name, version)? {
            return Ok(Some(library.base));
        }

        let stub = match name {
            "exec.library" => Some(self.layout.exec_base),
            "dos.library" => Some(self.layout.dos_base),
            "door.library" => Some(self.layout.door_base),
            _ => None,
        };
        if stub.is_none() {
            log::debug!("OpenLibrary {name:?} v{version}: no real binary, no stub");
        }
        Ok(stub)
    }

    /// Load a real library binary by name, installing it on first use.
    ///
    /// Idempotent: a second load of the same name returns the cached
    /// installation without touching the filesystem or re-parsing.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for an unparseable library file;
    /// a missing file is `Ok(None)` (the two-tier fallback, not an error).
    pub fn load(
        &mut self,
        memory: &mut MemoryImage,
        name: &str,
        version: u32,
    ) -> Result<Option<&LoadedLibrary>> {
        if let Some(index) = self.loaded.iter().position(|lib| lib.name == name) {
            return Ok(Some(&self.loaded[index]));
        }
        if !self.allow_real {
            return Ok(None);
        }

        let Some(path) = self
            .search_paths
            .iter()
            .map(|dir| dir.join(name))
            .find(|candidate| candidate.is_file())
        else {
            return Ok(None);
        };

        let Some(slot) = self.next_slot.checked_sub(self.layout.library_spacing) else {
            log::debug!("library space exhausted loading {name:?}");
            return Ok(None);
        };
        if slot < self.layout.library_space {
            log::debug!("library space exhausted loading {name:?}");
            return Ok(None);
        }

        let data = crate::file::read_file(&path)?;
        let image = BinaryImage::parse_at(&data, slot)?;
        image.install(memory)?;

        let origin = image
            .segments()
            .first()
            .map_or(slot, |segment| segment.address);
        let (base, jump_table) = recover_jump_table(memory, origin)?;

        let span_start = image
            .segments()
            .iter()
            .map(|segment| segment.address)
            .min()
            .unwrap_or(slot);
        let span_end = image
            .segments()
            .iter()
            .map(|segment| segment.address + segment.size)
            .max()
            .unwrap_or(slot);

        log::debug!(
            "installed {name:?} from {path:?}: base {base:#010x}, {} vectors",
            jump_table.len()
        );

        self.next_slot = slot;
        self.loaded.push(LoadedLibrary {
            name: name.to_string(),
            version,
            base,
            jump_table,
            segment_count: image.segments().len(),
            span_start,
            span_end,
        });
        Ok(self.loaded.last())
    }

    /// Whether `target` lies inside any loaded library's installed image.
    ///
    /// Loaded libraries hold real machine code, so calls landing there (their
    /// own functions calling each other, or a recovered jump vector executed
    /// directly) run in place rather than being emulated.
    #[must_use]
    pub fn is_loaded_code(&self, target: u32) -> bool {
        self.loaded.iter().any(|library| library.contains(target))
    }

    /// Resolve a trapped call target to a library and negative offset.
    ///
    /// Returns `None` when the target is below no known base, or not within
    /// [`OFFSET_RANGE`] of one.
    #[must_use]
    pub fn resolve(&self, target: u32) -> Option<ResolvedCall> {
        let stubs = [
            (ResolvedTarget::Exec, self.layout.exec_base),
            (ResolvedTarget::Dos, self.layout.dos_base),
            (ResolvedTarget::Door, self.layout.door_base),
        ];
        for (kind, base) in stubs {
            if let Some(offset) = negative_offset(target, base) {
                return Some(ResolvedCall {
                    target: kind,
                    offset,
                });
            }
        }
        for (index, library) in self.loaded.iter().enumerate() {
            if let Some(offset) = negative_offset(target, library.base) {
                return Some(ResolvedCall {
                    target: ResolvedTarget::Loaded(index),
                    offset,
                });
            }
        }
        None
    }
}

/// Offset of `target` below `base`, if within the per-library range.
fn negative_offset(target: u32, base: u32) -> Option<i32> {
    let delta = i64::from(target) - i64::from(base);
    if (-i64::from(OFFSET_RANGE as u32)..0).contains(&delta) {
        Some(delta as i32)
    } else {
        None
    }
}

/// Scan the run of jump stubs at `origin` and derive the library base.
///
/// Each vector is `jmp (target).l`; the base sits just past the last stub, so
/// vector `k` of `n` lands at offset `−6 × (n − k)`.
fn recover_jump_table(memory: &MemoryImage, origin: u32) -> Result<(u32, BTreeMap<i32, u32>)> {
    let mut targets = Vec::new();
    let mut cursor = origin;
    while cursor + JUMP_STUB_BYTES <= origin + OFFSET_RANGE as u32 {
        match memory.read_u16(cursor) {
            Ok(JMP_ABSOLUTE) => {
                targets.push(memory.read_u32(cursor + 2)?);
                cursor += JUMP_STUB_BYTES;
            }
            _ => break,
        }
    }

    let base = cursor;
    let count = targets.len() as i32;
    let jump_table = targets
        .into_iter()
        .enumerate()
        .map(|(k, target)| (-(JUMP_STUB_BYTES as i32) * (count - k as i32), target))
        .collect();
    Ok((base, jump_table))
}
