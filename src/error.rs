use thiserror::Error;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// This enum covers all failure modes that can occur while loading a hunk-format binary,
/// installing it into emulated memory, and running it under a CPU engine. Each variant
/// provides specific context about the failure mode to enable appropriate error handling.
///
/// # Error Categories
///
/// ## Container Parsing Errors
/// - [`Error::Malformed`] - Corrupted or invalid hunk container structure
/// - [`Error::OutOfBounds`] - Attempted to read beyond the container boundaries
/// - [`Error::Empty`] - Empty input provided
///
/// ## Run-time Errors
/// - [`Error::MemoryFault`] - Access outside the configured memory image
/// - [`Error::Engine`] - The CPU engine reported a failure other than a normal halt
/// - [`Error::InvalidState`] - A session operation was issued in the wrong state
///
/// ## I/O Errors
/// - [`Error::FileError`] - Filesystem I/O errors
///
/// # Examples
///
/// ```rust,no_run
/// use amidoor::{Error, hunk::BinaryImage};
/// use std::path::Path;
///
/// match BinaryImage::from_file(Path::new("doors/lord")) {
///     Ok(image) => {
///         println!("Loaded {} segments", image.segments().len());
///     }
///     Err(Error::Malformed { message, file, line }) => {
///         eprintln!("Malformed container: {} ({}:{})", message, file, line);
///     }
///     Err(Error::FileError(io_err)) => {
///         eprintln!("I/O error: {}", io_err);
///     }
///     Err(e) => {
///         eprintln!("Other error: {}", e);
///     }
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    // Container parsing errors
    /// The file is damaged and could not be parsed.
    ///
    /// This error indicates that the container structure is corrupted or doesn't
    /// conform to the AmigaOS hunk format. The error includes the source location
    /// where the malformation was detected for debugging purposes.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted while parsing the container.
    ///
    /// This error occurs when trying to read data beyond the end of the file
    /// or record. It's a safety check to prevent buffer overruns during parsing.
    #[error("Out of Bound read would have occurred!")]
    OutOfBounds,

    /// Provided input was empty.
    ///
    /// This error occurs when an empty file or buffer is provided where
    /// actual hunk container data was expected.
    #[error("Provided input was empty")]
    Empty,

    /// An address outside the configured memory image was accessed.
    ///
    /// Every access to the emulated address space is validated against the
    /// memory image size. There is no silent wraparound; a door that reads or
    /// writes outside its RAM surfaces this fault and only its own session is
    /// affected.
    ///
    /// # Fields
    ///
    /// * `address` - The faulting emulated address
    /// * `len` - Length of the attempted access in bytes
    #[error("Memory fault: {len} byte access at {address:#010x}")]
    MemoryFault {
        /// The faulting emulated address
        address: u32,
        /// Length of the attempted access in bytes
        len: u32,
    },

    /// The CPU engine reported a failure other than a normal halt.
    ///
    /// Surfaced verbatim to the caller; the affected session transitions to
    /// the errored state and is torn down.
    #[error("Engine error: {0}")]
    Engine(String),

    /// A session operation was issued in a state that does not permit it,
    /// for example running a session that was never started.
    #[error("Invalid session state: {0}")]
    InvalidState(&'static str),

    /// File I/O error.
    ///
    /// Wraps standard I/O errors that can occur during file operations
    /// such as reading from disk, permission issues, or filesystem errors.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// Generic error for miscellaneous failures.
    ///
    /// Used for errors that don't fit into other categories.
    #[error("{0}")]
    Error(String),
}
