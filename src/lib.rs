//! Buffered gzip file streams with transparent pass-through.
//!
//! A [`GzFile`] wraps a file descriptor and reads or writes one logical byte
//! stream across it. Writing compresses into gzip members; reading inspects
//! the first bytes and either decompresses gzip data (any number of
//! concatenated members) or passes raw bytes through unchanged. On top of
//! that it emulates random access: [`GzFile::seek`] skips forward lazily on
//! the read side and fills the gap with zeros on the write side, and
//! [`GzFile::push_back`] returns a byte to the stream.
//!
//! Errors stick to the handle: after a data or I/O error every following
//! operation fails with it until [`GzFile::clear_error`], and
//! [`GzFile::last_error`] reports the code and message at any time.
//!
//! ```no_run
//! use gzfile::{GzFile, CompressionLevel};
//!
//! # fn main() -> gzfile::Result<()> {
//! let mut writer = GzFile::create("log.gz", CompressionLevel::Default)?;
//! writer.write_fmt(format_args!("{} events\n", 128))?;
//! writer.close()?;
//!
//! let mut reader = GzFile::open("log.gz", "rb")?;
//! let mut line = Vec::new();
//! reader.read_line(&mut line)?;
//! assert_eq!(line, b"128 events\n");
//! # Ok(())
//! # }
//! ```

mod buffer;
pub mod error;
pub mod gzip;
mod mode;
mod read;
mod stream;
mod write;

pub use error::{Error, ErrorCode, Result};
pub use mode::{Access, CompressionLevel, OpenMode, Strategy};
pub use stream::{GzFile, DEFAULT_BUFFER_SIZE};

/// How much the codec should flush in one [`Processor::process`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flush {
    /// Take input as convenient; output may stay buffered inside the codec.
    None,
    /// Emit everything received so far so the reader can see it.
    Sync,
    /// Complete the stream, emitting the trailer.
    Finish,
}

/// Outcome of one [`Processor::process`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    /// The end of a complete stream was produced or consumed.
    StreamEnd,
}

/// Incremental byte-stream codec. One call moves as much data as fits from
/// `input` to `output`; progress is observed through the total counters.
pub trait Processor {
    fn process(&mut self, input: &[u8], output: &mut [u8], flush: Flush) -> Result<Status>;
    /// Return to the initial state to handle another stream.
    fn reset(&mut self);
    /// Total bytes consumed since creation or the last reset.
    fn total_in(&self) -> u64;
    /// Total bytes produced since creation or the last reset.
    fn total_out(&self) -> u64;
}

/// Open `path` for reading. Shorthand for [`GzFile::open`] with mode `"rb"`.
pub fn open<P: AsRef<std::path::Path>>(path: P) -> Result<GzFile> {
    GzFile::open(path, "rb")
}

/// Create `path` for writing at the given level. Shorthand for
/// [`GzFile::create`].
pub fn create<P: AsRef<std::path::Path>>(path: P, level: CompressionLevel) -> Result<GzFile> {
    GzFile::create(path, level)
}

#[cfg(test)]
mod tests;
