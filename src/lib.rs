// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
//#![deny(unsafe_code)]
// - 'file/mod.rs' uses mmap to map a file into memory

//! # amidoor
//!
//! An execution environment for AmigaOS hunk-format BBS door programs.
//! Built in pure Rust, `amidoor` loads the classic hunk container format,
//! relocates it into an emulated 68000 address space, and runs it with the
//! shared-library surface doors expect — exec, dos and the door terminal
//! API — bridged to host-side byte streams.
//!
//! ## Features
//!
//! - **Hunk container loading** - Header, code/data/bss and 32-bit relocation
//!   records, with forward-compatible skipping of unknown record types
//! - **Two-phase relocation** - Segment addresses fixed up front, so
//!   cross-segment references resolve regardless of record order
//! - **Library emulation** - exec/dos/door stubs handled host-side, plus
//!   loading of real library binaries with jump-table recovery
//! - **Cooperative sessions** - Bounded cycle slices, wall-clock timeouts and
//!   per-session isolation; one runaway door cannot take the host down
//! - **Pluggable engine** - The CPU sits behind a narrow trait; the built-in
//!   interpreter covers the instruction subset door startup code uses
//!
//! ## Quick Start
//!
//! Add `amidoor` to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! amidoor = "0.1"
//! ```
//!
//! ### Using the Prelude
//!
//! For convenient access to the most commonly used types, import the prelude:
//!
//! ```rust,no_run
//! use amidoor::prelude::*;
//!
//! let mut session = DoorSession::new(SessionConfig::default())?;
//! session.start("doors/onliner")?;
//! while !session.state().is_terminal() {
//!     session.step()?;
//!     print!("{}", String::from_utf8_lossy(&session.take_output()));
//! }
//! # Ok::<(), amidoor::Error>(())
//! ```
//!
//! ### Inspecting a binary without running it
//!
//! ```rust,no_run
//! use amidoor::hunk::BinaryImage;
//!
//! let image = BinaryImage::from_file(std::path::Path::new("doors/onliner"))?;
//! for segment in image.segments() {
//!     println!("{} segment, {} bytes at {:#010x}", segment.kind, segment.size, segment.address);
//! }
//! # Ok::<(), amidoor::Error>(())
//! ```
//!
//! ## Architecture
//!
//! `amidoor` is organized into several key modules:
//!
//! - [`prelude`] - Convenient re-exports of commonly used types
//! - [`hunk`] - Hunk container parsing and relocation
//! - [`memory`] - The emulated address space, layout and heap
//! - [`cpu`] - The engine contract and the reference interpreter
//! - [`library`] - Stub libraries, real-binary loading and trap routing
//! - [`session`] - The execution session tying it all together
//! - [`Error`] and [`Result`] - Comprehensive error handling
//!
//! ## Error Handling
//!
//! All operations return [`Result<T, Error>`](Result) with specific failure
//! context:
//!
//! ```rust,no_run
//! use amidoor::{hunk::BinaryImage, Error};
//!
//! match BinaryImage::from_file(std::path::Path::new("doors/onliner")) {
//!     Ok(image) => println!("{} segments", image.segments().len()),
//!     Err(Error::Malformed { message, .. }) => println!("Malformed binary: {}", message),
//!     Err(e) => println!("Other error: {}", e),
//! }
//! ```

#[macro_use]
pub(crate) mod error;
pub(crate) mod file;

/// Shared functionality which is used in unit- and integration-tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types.
///
/// # Example
///
/// ```rust,no_run
/// use amidoor::prelude::*;
///
/// let image = BinaryImage::from_file("doors/onliner".as_ref())?;
/// # Ok::<(), amidoor::Error>(())
/// ```
pub mod prelude;

pub mod cpu;
pub mod hunk;
pub mod library;
pub mod memory;
pub mod session;

pub use error::Error;
pub use file::Parser;
pub use hunk::BinaryImage;
pub use session::{DoorSession, SessionConfig, SessionState};

/// The result type used throughout `amidoor`.
pub type Result<T> = std::result::Result<T, Error>;
