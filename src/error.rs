use std::path::Path;

use thiserror::Error;

/// Error type for this crate
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Misuse(String),
    #[error("{0}")]
    Buffer(String),
    #[error("{0}")]
    Data(String),
    #[error("out of memory")]
    Memory,
}

/// Result type for this crate
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::Io(_) => ErrorCode::Io,
            Error::Misuse(_) => ErrorCode::Misuse,
            Error::Buffer(_) => ErrorCode::Buffer,
            Error::Data(_) => ErrorCode::Data,
            Error::Memory => ErrorCode::Memory,
        }
    }
}

impl From<Error> for std::io::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::Io(e) => e,
            _ => std::io::Error::new(std::io::ErrorKind::Other, e),
        }
    }
}

/// Classification of the last error recorded on a stream handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// No error recorded.
    Ok,
    /// Operation invalid for the stream's mode or arguments.
    Misuse,
    /// Buffer-related condition: push-back with no room, formatted write
    /// overflow, or an unexpected end of input mid-member. Informational for
    /// reads: already-decompressed data stays available.
    Buffer,
    /// Corrupt compressed payload.
    Data,
    /// Allocation failure reported by the codec.
    Memory,
    /// Operating system I/O failure.
    Io,
}

impl ErrorCode {
    /// Fatal codes discard buffered output so stale bytes cannot be read
    /// past the failure point.
    pub fn is_fatal(self) -> bool {
        !matches!(self, ErrorCode::Ok | ErrorCode::Buffer)
    }
}

/// Sticky per-handle error state. The message is replaced, never appended,
/// and cleared only by an explicit reset or rewind.
#[derive(Debug)]
pub struct ErrorState {
    code: ErrorCode,
    msg: String,
}

impl ErrorState {
    pub fn new() -> Self {
        ErrorState {
            code: ErrorCode::Ok,
            msg: String::new(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// The recorded message; a fixed literal for memory errors.
    pub fn message(&self) -> &str {
        match self.code {
            ErrorCode::Memory => "out of memory",
            _ => &self.msg,
        }
    }

    /// Record a new error, prefixing the stream's path. Memory errors keep
    /// the static literal and allocate nothing.
    pub fn record(&mut self, path: &Path, err: &Error) {
        self.msg.clear();
        self.code = err.code();
        if self.code != ErrorCode::Memory {
            self.msg = format!("{}: {}", path.display(), err);
        }
    }

    pub fn clear(&mut self) {
        self.code = ErrorCode::Ok;
        self.msg.clear();
    }

    /// Reconstruct the recorded error, e.g. to surface it again at close.
    pub fn to_error(&self) -> Option<Error> {
        match self.code {
            ErrorCode::Ok => None,
            ErrorCode::Misuse => Some(Error::Misuse(self.msg.clone())),
            ErrorCode::Buffer => Some(Error::Buffer(self.msg.clone())),
            ErrorCode::Data => Some(Error::Data(self.msg.clone())),
            ErrorCode::Memory => Some(Error::Memory),
            ErrorCode::Io => Some(Error::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                self.msg.clone(),
            ))),
        }
    }
}

impl Default for ErrorState {
    fn default() -> Self {
        Self::new()
    }
}
