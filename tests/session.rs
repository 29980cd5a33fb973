//! End-to-end session tests: load a container, run it, observe the streams.
//!
//! The programs here are hand-assembled 68000, laid out with the in-test
//! container builder. Library bases are the fixed stub addresses of the
//! default 1 MiB layout: exec at 0xFF000, dos at 0xFE000, door at 0xFD000.

use std::time::Duration;

use amidoor::{DoorSession, Error, SessionConfig, SessionState};

mod builders;
use builders::ContainerBuilder;


#[test]
fn hello_from_amiga_via_dos_write() {
    // movea.l #dos,a6 ; jsr -60(a6)   Output() -> d0
    // move.l d0,d1    ; move.l #msg,d2 ; move.l #17,d3
    // jsr -48(a6)     Write(handle, msg, 17)
    // stop
    let data = ContainerBuilder::new()
        .code(&[
            0x2C7C, 0x000F, 0xE000, // movea.l #$FE000,a6
            0x4EAE, 0xFFC4, // jsr -60(a6)
            0x2200, // move.l d0,d1
            0x243C, 0x0000, 0x0000, // move.l #msg,d2 (relocated)
            0x263C, 0x0000, 0x0011, // move.l #17,d3
            0x4EAE, 0xFFD0, // jsr -48(a6)
            0x4E72, 0x2700, // stop
        ])
        .reloc(1, &[14])
        .data(b"Hello from Amiga!")
        .build();

    let mut session = DoorSession::new(SessionConfig::default()).unwrap();
    session.start_from_bytes(&data).unwrap();
    let state = session.run().unwrap();

    assert_eq!(state, SessionState::Completed);
    assert_eq!(session.take_output(), b"Hello from Amiga!");
}

#[test]
fn door_get_char_echo() {
    // movea.l #door,a6 ; jsr -18(a6)  GetChar -> d0
    // jsr -12(a6)  PutChar(d0) ; stop
    let data = ContainerBuilder::new()
        .code(&[
            0x2C7C, 0x000F, 0xD000, // movea.l #$FD000,a6
            0x4EAE, 0xFFEE, // jsr -18(a6)
            0x4EAE, 0xFFF4, // jsr -12(a6)
            0x4E72, 0x2700,
        ])
        .build();

    let mut session = DoorSession::new(SessionConfig::default()).unwrap();
    session.queue_input(b"A");
    session.start_from_bytes(&data).unwrap();
    let state = session.run().unwrap();

    assert_eq!(state, SessionState::Completed);
    assert_eq!(session.take_output(), b"A");
}

#[test]
fn infinite_loop_times_out_and_terminate_is_idempotent() {
    // bra.s -2 — a branch to itself
    let data = ContainerBuilder::new().code(&[0x60FE]).build();

    let config = SessionConfig::new()
        .timeout(Duration::from_millis(50))
        .cycles_per_slice(1_000);
    let mut session = DoorSession::new(config).unwrap();
    session.start_from_bytes(&data).unwrap();

    let state = session.run().unwrap();
    assert_eq!(state, SessionState::TimedOut);
    assert!(session.cycles_run() > 0);

    session.terminate();
    assert_eq!(session.state(), SessionState::Terminated);
    session.terminate();
    assert_eq!(session.state(), SessionState::Terminated);
}

#[test]
fn unresolved_library_call_is_a_no_op_returning_zero() {
    // movea.l #$F0000,a6 — library space, but below no known base.
    // jsr -6(a6) ; jsr -12(a6) — both unresolved, both must return.
    // stop
    let data = ContainerBuilder::new()
        .code(&[
            0x2C7C, 0x000F, 0x0000, // movea.l #$F0000,a6
            0x4EAE, 0xFFFA, // jsr -6(a6)
            0x4EAE, 0xFFF4, // jsr -12(a6)
            0x4E72, 0x2700,
        ])
        .build();

    let mut session = DoorSession::new(SessionConfig::default()).unwrap();
    session.start_from_bytes(&data).unwrap();
    let state = session.run().unwrap();

    assert_eq!(state, SessionState::Completed);
    assert!(session.take_output().is_empty());
}

#[test]
fn malformed_binary_never_starts_the_session() {
    let mut session = DoorSession::new(SessionConfig::default()).unwrap();
    let result = session.start_from_bytes(&[0xDE, 0xAD, 0xBE, 0xEF]);
    assert!(matches!(result, Err(Error::Malformed { .. })));
    assert_eq!(session.state(), SessionState::Initializing);
}

#[test]
fn step_after_completion_is_an_invalid_state_error() {
    let data = ContainerBuilder::new().code(&[0x4E72, 0x2700]).build();
    let mut session = DoorSession::new(SessionConfig::default()).unwrap();
    session.start_from_bytes(&data).unwrap();
    session.run().unwrap();
    assert!(matches!(session.step(), Err(Error::InvalidState(_))));
}
