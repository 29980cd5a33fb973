//! Library loading and resolution integration tests.
//!
//! These tests exercise the two-tier open path: real library binaries placed
//! in a search directory are installed with recovered jump tables, while the
//! well-known names fall back to their fixed stub bases.

use amidoor::{
    cpu::Interpreter,
    library::{Dispatch, LibraryTable, ResolvedTarget, TrapContext, TrapRouter},
    memory::{HeapAllocator, MemoryImage, MemoryLayout, DEFAULT_MEMORY_BYTES},
    session::IoChannel,
};

mod builders;
use builders::ContainerBuilder;

/// A library binary whose code hunk opens with two jump vectors, each
/// relocated to point at a function later in the same hunk.
fn library_binary() -> Vec<u8> {
    ContainerBuilder::new()
        .code(&[
            0x4EF9, 0x0000, 0x000C, // jmp (func_a).l
            0x4EF9, 0x0000, 0x0010, // jmp (func_b).l
            0x7007, 0x4E75, // func_a: moveq #7,d0 ; rts
            0x7009, 0x4E75, // func_b: moveq #9,d0 ; rts
        ])
        .reloc(0, &[2, 8])
        .build()
}

fn session_parts() -> (MemoryImage, MemoryLayout) {
    let layout = MemoryLayout::new(DEFAULT_MEMORY_BYTES).unwrap();
    (MemoryImage::new(DEFAULT_MEMORY_BYTES), layout)
}

#[test]
fn real_library_is_installed_with_a_recovered_jump_table() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("doorutil.library"), library_binary()).unwrap();

    let (mut memory, layout) = session_parts();
    let mut libraries = LibraryTable::new(layout, vec![dir.path().to_path_buf()], true);

    let base = libraries
        .open(&mut memory, "doorutil.library", 1)
        .unwrap()
        .expect("library should load");

    let slot = layout.library_slot_top - layout.library_spacing;
    assert_eq!(base, slot + 12, "base sits past the two jump stubs");

    let library = &libraries.loaded()[0];
    assert_eq!(library.jump_table.len(), 2);
    assert_eq!(library.jump_table[&-12], slot + 0x0C);
    assert_eq!(library.jump_table[&-6], slot + 0x10);
    // The function bodies made it into memory.
    assert_eq!(memory.read_u16(slot + 0x0C).unwrap(), 0x7007);
    assert_eq!(memory.read_u16(slot + 0x10).unwrap(), 0x7009);
}

#[test]
fn loading_is_idempotent_per_name() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("doorutil.library");
    std::fs::write(&path, library_binary()).unwrap();

    let (mut memory, layout) = session_parts();
    let mut libraries = LibraryTable::new(layout, vec![dir.path().to_path_buf()], true);

    let first = libraries.open(&mut memory, "doorutil.library", 1).unwrap();
    // Even with the file gone, the cached installation answers.
    std::fs::remove_file(&path).unwrap();
    let second = libraries.open(&mut memory, "doorutil.library", 1).unwrap();

    assert_eq!(first, second);
    assert_eq!(libraries.loaded().len(), 1);
}

#[test]
fn well_known_names_fall_back_to_stub_bases() {
    let dir = tempfile::tempdir().unwrap();
    let (mut memory, layout) = session_parts();
    let mut libraries = LibraryTable::new(layout, vec![dir.path().to_path_buf()], true);

    assert_eq!(
        libraries.open(&mut memory, "dos.library", 36).unwrap(),
        Some(layout.dos_base)
    );
    assert_eq!(
        libraries.open(&mut memory, "mathffp.library", 0).unwrap(),
        None
    );
}

#[test]
fn calls_below_a_real_base_resolve_to_it() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("doorutil.library"), library_binary()).unwrap();

    let (mut memory, layout) = session_parts();
    let mut libraries = LibraryTable::new(layout, vec![dir.path().to_path_buf()], true);
    let base = libraries
        .open(&mut memory, "doorutil.library", 1)
        .unwrap()
        .unwrap();

    let call = libraries.resolve(base.wrapping_sub(6)).unwrap();
    assert_eq!(call.target, ResolvedTarget::Loaded(0));
    assert_eq!(call.offset, -6);
}

#[test]
fn dispatch_redirects_into_real_library_code() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("doorutil.library"), library_binary()).unwrap();

    let (mut memory, layout) = session_parts();
    let mut libraries = LibraryTable::new(layout, vec![dir.path().to_path_buf()], true);
    let base = libraries
        .open(&mut memory, "doorutil.library", 1)
        .unwrap()
        .unwrap();
    let func_b = libraries.loaded()[0].jump_table[&-6];

    let mut cpu = Interpreter::new();
    let mut io = IoChannel::new();
    let mut allocator = HeapAllocator::new(&layout);
    let mut router = TrapRouter::new();
    let mut ctx = TrapContext {
        cpu: &mut cpu,
        memory: &mut memory,
        io: &mut io,
        allocator: &mut allocator,
        libraries: &mut libraries,
    };

    assert_eq!(
        router.dispatch(&mut ctx, base.wrapping_sub(6)).unwrap(),
        Dispatch::Redirect(func_b)
    );
    // An offset with no jump vector behind it stays unhandled.
    assert_eq!(
        router.dispatch(&mut ctx, base.wrapping_sub(60)).unwrap(),
        Dispatch::Unhandled
    );
}

#[test]
fn internal_calls_inside_a_loaded_library_execute_in_place() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("doorutil.library"), library_binary()).unwrap();

    let (mut memory, layout) = session_parts();
    let mut libraries = LibraryTable::new(layout, vec![dir.path().to_path_buf()], true);
    libraries
        .open(&mut memory, "doorutil.library", 1)
        .unwrap()
        .unwrap();
    let func_a = libraries.loaded()[0].jump_table[&-12];

    // The address holds the library's own machine code, not a jump vector;
    // a call landing there (one library function calling another) must run
    // that code rather than be faked out as an unknown operation.
    assert_eq!(memory.read_u16(func_a).unwrap(), 0x7007);

    let mut cpu = Interpreter::new();
    let mut io = IoChannel::new();
    let mut allocator = HeapAllocator::new(&layout);
    let mut router = TrapRouter::new();
    let mut ctx = TrapContext {
        cpu: &mut cpu,
        memory: &mut memory,
        io: &mut io,
        allocator: &mut allocator,
        libraries: &mut libraries,
    };

    assert_eq!(
        router.dispatch(&mut ctx, func_a).unwrap(),
        Dispatch::Redirect(func_a)
    );
}
