//! Byte-stream bridge between the emulated program and its host.

use std::collections::VecDeque;

/// The session's input queue and output buffer.
///
/// Input is queued by the host (the BBS side of the bridge) and consumed one
/// byte at a time by the emulated console reads; output accumulates until the
/// host drains it with [`IoChannel::take_output`]. Both directions are plain
/// byte streams — line discipline, echo and ANSI interpretation are the
/// terminal's business, not the channel's.
#[derive(Default)]
pub struct IoChannel {
    input: VecDeque<u8>,
    output: Vec<u8>,
}

impl IoChannel {
    /// Create an empty channel.
    #[must_use]
    pub fn new() -> Self {
        IoChannel::default()
    }

    /// Append bytes to the input queue.
    pub fn queue_input(&mut self, bytes: &[u8]) {
        self.input.extend(bytes);
    }

    /// Consume the next queued input byte, if any.
    pub fn pop_input(&mut self) -> Option<u8> {
        self.input.pop_front()
    }

    /// Number of input bytes waiting to be consumed.
    #[must_use]
    pub fn input_len(&self) -> usize {
        self.input.len()
    }

    /// Append bytes to the output buffer.
    pub fn write(&mut self, bytes: &[u8]) {
        self.output.extend_from_slice(bytes);
    }

    /// Append one byte to the output buffer.
    pub fn write_u8(&mut self, byte: u8) {
        self.output.push(byte);
    }

    /// Drain and return everything written since the last take.
    pub fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.output)
    }
}
