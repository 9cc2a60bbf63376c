use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::buffer::Buffer;
use crate::error::{Error, ErrorCode, ErrorState, Result};
use crate::gzip::{GzipCompress, GzipDecompress};
use crate::mode::{Access, CompressionLevel, OpenMode, Strategy};
use crate::Flush;

/// Default chunk size; read buffers are one chunk, the paired buffer twice
/// that (see [`GzFile::set_buffer_size`]).
pub const DEFAULT_BUFFER_SIZE: usize = 131072;

/// Smallest accepted chunk size; anything lower misbehaves with flushing.
const MIN_BUFFER_SIZE: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StreamMode {
    Read,
    Write,
}

/// Read-side fetch strategy. `Look` probes the next bytes for a gzip magic,
/// `Copy` passes raw bytes through, `Inflate` decompresses a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReadHow {
    Look,
    Copy,
    Inflate,
}

/// A buffered gzip file stream.
///
/// A `GzFile` reads or writes one logical byte stream over a descriptor,
/// transparently compressing on the write side and, on the read side,
/// detecting whether the input is gzip-framed or raw. Random access is
/// emulated: forward seeks are deferred to the next I/O call, backward seeks
/// while reading rewind and replay.
///
/// ## Example
/// ```no_run
/// use gzfile::GzFile;
///
/// # fn main() -> gzfile::Result<()> {
/// let mut writer = GzFile::open("data.gz", "wb6")?;
/// writer.write(b"hello, world")?;
/// writer.close()?;
///
/// let mut reader = GzFile::open("data.gz", "rb")?;
/// let mut buf = vec![0u8; 12];
/// let n = reader.read(&mut buf)?;
/// assert_eq!(&buf[..n], b"hello, world");
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct GzFile {
    pub(crate) path: PathBuf,
    pub(crate) file: Option<File>,
    pub(crate) mode: StreamMode,
    pub(crate) how: ReadHow,
    pub(crate) direct: bool,
    pub(crate) want: usize,
    pub(crate) input: Buffer,
    pub(crate) output: Buffer,
    pub(crate) decomp: Option<GzipDecompress>,
    pub(crate) comp: Option<GzipCompress>,
    pub(crate) pos: u64,
    pub(crate) seek_pending: bool,
    pub(crate) skip: u64,
    pub(crate) eof: bool,
    pub(crate) past_eof: bool,
    pub(crate) reset_pending: bool,
    pub(crate) level: CompressionLevel,
    pub(crate) strategy: Strategy,
    pub(crate) err: ErrorState,
    pub(crate) start: u64,
}

impl GzFile {
    /// Open `path` with a `gzopen`-style mode string, e.g. `"rb"`, `"wb9"`,
    /// `"a"`, `"wbT"` (see [`OpenMode::parse`]).
    pub fn open<P: AsRef<Path>>(path: P, mode: &str) -> Result<GzFile> {
        let mode = OpenMode::parse(mode)?;
        let mut options = OpenOptions::new();
        match mode.access {
            Access::Read => {
                options.read(true);
            }
            Access::Write => {
                options.write(true).create(true).truncate(true);
            }
            Access::Append => {
                options.write(true).create(true).append(true);
            }
        }
        if mode.exclusive {
            options.create_new(true);
        }
        let file = options.open(&path)?;
        Self::from_parts(file, path.as_ref().to_path_buf(), mode)
    }

    /// Create `path` for writing with the given compression level.
    pub fn create<P: AsRef<Path>>(path: P, level: CompressionLevel) -> Result<GzFile> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;
        let mode = OpenMode {
            access: Access::Write,
            level,
            strategy: Strategy::Default,
            direct: false,
            exclusive: false,
        };
        Self::from_parts(file, path.as_ref().to_path_buf(), mode)
    }

    /// Adopt an already-open descriptor. `label` stands in for the path in
    /// error messages. The descriptor's current offset becomes the rewind
    /// origin when reading.
    pub fn from_file<P: AsRef<Path>>(file: File, label: P, mode: &str) -> Result<GzFile> {
        let mode = OpenMode::parse(mode)?;
        Self::from_parts(file, label.as_ref().to_path_buf(), mode)
    }

    fn from_parts(mut file: File, path: PathBuf, mode: OpenMode) -> Result<GzFile> {
        let stream_mode = match mode.access {
            Access::Read => StreamMode::Read,
            Access::Write => StreamMode::Write,
            Access::Append => {
                // position at the end so offset() reports correctly
                file.seek(SeekFrom::End(0))?;
                StreamMode::Write
            }
        };
        // pipes cannot report a position; rewind is unsupported there anyway
        let start = if stream_mode == StreamMode::Read {
            file.stream_position().unwrap_or(0)
        } else {
            0
        };
        Ok(GzFile {
            path,
            file: Some(file),
            mode: stream_mode,
            how: ReadHow::Look,
            // reading starts as direct so an empty file reports pass-through
            direct: stream_mode == StreamMode::Read || mode.direct,
            want: DEFAULT_BUFFER_SIZE,
            input: Buffer::new(0),
            output: Buffer::new(0),
            decomp: None,
            comp: None,
            pos: 0,
            seek_pending: false,
            skip: 0,
            eof: false,
            past_eof: false,
            reset_pending: false,
            level: mode.level,
            strategy: mode.strategy,
            err: ErrorState::new(),
            start,
        })
    }

    /// Set the chunk size. Must be called before the first I/O operation;
    /// fails once the buffers exist. The size is doubled internally, so it
    /// must be small enough to double without overflow.
    pub fn set_buffer_size(&mut self, size: usize) -> Result<()> {
        if self.buffers_allocated() {
            return Err(Error::Misuse("buffers are already allocated".to_string()));
        }
        if size.checked_mul(2).is_none() {
            return Err(Error::Buffer("buffer size too large to double".to_string()));
        }
        self.want = size.max(MIN_BUFFER_SIZE);
        Ok(())
    }

    pub(crate) fn buffers_allocated(&self) -> bool {
        self.input.capacity() != 0
    }

    /// Record an error on the handle and hand it back for propagation.
    /// Fatal codes discard buffered output.
    pub(crate) fn fail(&mut self, err: Error) -> Error {
        self.err.record(&self.path, &err);
        if err.code().is_fatal() {
            self.output.clear();
        }
        err
    }

    pub(crate) fn readable(&self) -> Result<()> {
        if self.mode != StreamMode::Read {
            return Err(Error::Misuse("stream is not open for reading".to_string()));
        }
        if self.err.code().is_fatal() {
            return Err(self.err.to_error().unwrap_or(Error::Memory));
        }
        Ok(())
    }

    pub(crate) fn writable(&self) -> Result<()> {
        if self.mode != StreamMode::Write {
            return Err(Error::Misuse("stream is not open for writing".to_string()));
        }
        if self.err.code() != ErrorCode::Ok {
            return Err(self.err.to_error().unwrap_or(Error::Memory));
        }
        Ok(())
    }

    /// Reset the stream state after a rewind or raw reposition.
    fn reset_state(&mut self) {
        self.output.clear();
        self.input.clear();
        if self.mode == StreamMode::Read {
            self.eof = false;
            self.past_eof = false;
            self.how = ReadHow::Look;
        } else {
            self.reset_pending = false;
        }
        self.seek_pending = false;
        self.skip = 0;
        self.err.clear();
        self.pos = 0;
    }

    /// Seek back to the descriptor offset recorded at open and start over.
    /// Reading only.
    pub fn rewind(&mut self) -> Result<()> {
        self.readable()?;
        let Some(file) = self.file.as_mut() else {
            return Err(Error::Misuse("stream is closed".to_string()));
        };
        file.seek(SeekFrom::Start(self.start))?;
        self.reset_state();
        Ok(())
    }

    /// Logical position the caller observes, including any deferred skip.
    pub fn position(&self) -> u64 {
        self.pos + if self.seek_pending { self.skip } else { 0 }
    }

    /// Reposition the logical stream. `SeekFrom::End` is not supported: the
    /// uncompressed length is unknown without reading to the end.
    ///
    /// Forward seeks are recorded and serviced lazily by the next read or
    /// write. A backward seek while reading rewinds and replays; while
    /// writing it is an error. Returns the new logical position.
    pub fn seek(&mut self, target: SeekFrom) -> Result<u64> {
        if self.err.code().is_fatal() {
            return Err(self.err.to_error().unwrap_or(Error::Memory));
        }
        let mut rel = match target {
            SeekFrom::Start(offset) => {
                let offset = i64::try_from(offset)
                    .map_err(|_| Error::Misuse("seek offset does not fit in i64".to_string()))?;
                offset - self.pos as i64
            }
            SeekFrom::Current(delta) => {
                delta + if self.seek_pending { self.skip as i64 } else { 0 }
            }
            SeekFrom::End(_) => {
                return Err(Error::Misuse(
                    "cannot seek from the end of a compressed stream".to_string(),
                ))
            }
        };
        self.seek_pending = false;
        self.skip = 0;

        // within the raw pass-through region a true descriptor seek works
        if self.mode == StreamMode::Read
            && self.how == ReadHow::Copy
            && self.pos as i64 + rel >= 0
        {
            let Some(file) = self.file.as_mut() else {
                return Err(Error::Misuse("stream is closed".to_string()));
            };
            file.seek(SeekFrom::Current(rel - self.output.len() as i64))?;
            self.output.clear();
            self.input.clear();
            self.eof = false;
            self.past_eof = false;
            self.err.clear();
            self.pos = (self.pos as i64 + rel) as u64;
            return Ok(self.pos);
        }

        // a backward net offset while reading means rewind and replay
        if rel < 0 {
            if self.mode != StreamMode::Read {
                return Err(Error::Misuse(
                    "cannot seek backwards while writing".to_string(),
                ));
            }
            let absolute = self.pos as i64 + rel;
            if absolute < 0 {
                return Err(Error::Misuse("seek before start of stream".to_string()));
            }
            self.rewind()?;
            rel = absolute;
        }

        // consume what is already buffered, defer the rest
        if self.mode == StreamMode::Read {
            let n = (self.output.len() as u64).min(rel as u64) as usize;
            self.output.consume(n);
            self.pos += n as u64;
            rel -= n as i64;
        }
        if rel > 0 {
            self.seek_pending = true;
            self.skip = rel as u64;
        }
        Ok(self.pos + rel as u64)
    }

    /// Offset in the underlying file, not counting buffered input.
    pub fn offset(&mut self) -> Result<u64> {
        let Some(file) = self.file.as_mut() else {
            return Err(Error::Misuse("stream is closed".to_string()));
        };
        let at = file.stream_position()?;
        if self.mode == StreamMode::Read {
            Ok(at - self.input.len() as u64)
        } else {
            Ok(at)
        }
    }

    /// True once a read attempt went past the end of the stream. Mirrors
    /// `feof`: reading the last byte does not set this, reading beyond does.
    pub fn is_eof(&self) -> bool {
        self.mode == StreamMode::Read && self.past_eof
    }

    /// True if the data is passing through uncompressed. On a freshly opened
    /// read stream this probes the header first.
    pub fn is_direct(&mut self) -> bool {
        if self.mode == StreamMode::Read && self.how == ReadHow::Look && self.output.is_empty() {
            let _ = self.look();
        }
        self.direct
    }

    /// The sticky error code and message recorded on the handle.
    pub fn last_error(&self) -> (ErrorCode, &str) {
        (self.err.code(), self.err.message())
    }

    /// Clear the sticky error and the end-of-file indicators.
    pub fn clear_error(&mut self) {
        if self.mode == StreamMode::Read {
            self.eof = false;
            self.past_eof = false;
        }
        self.err.clear();
    }

    /// The compression level configured for subsequent members.
    pub fn level(&self) -> CompressionLevel {
        self.level
    }

    /// The strategy requested at open or via [`GzFile::set_params`].
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Finish any pending compression and release the descriptor. Teardown
    /// runs to completion even after a prior failure; the first recorded
    /// error is returned rather than masked by later cleanup.
    pub fn close(mut self) -> Result<()> {
        self.teardown()
    }

    fn teardown(&mut self) -> Result<()> {
        if self.file.is_none() {
            return Ok(());
        }
        let mut result = if self.err.code().is_fatal() {
            self.err.to_error().map(Err).unwrap_or(Ok(()))
        } else {
            Ok(())
        };
        if self.mode == StreamMode::Write {
            if self.seek_pending {
                self.seek_pending = false;
                let skip = self.skip;
                if let Err(e) = self.zero_fill(skip) {
                    if result.is_ok() {
                        result = Err(e);
                    }
                }
            }
            if let Err(e) = self.drain(Flush::Finish) {
                if result.is_ok() {
                    result = Err(e);
                }
            }
        } else if result.is_ok() && self.err.code() == ErrorCode::Buffer {
            // surface a truncated-input condition the caller may not have seen
            result = self.err.to_error().map(Err).unwrap_or(Ok(()));
        }
        self.comp = None;
        self.decomp = None;
        self.input = Buffer::new(0);
        self.output = Buffer::new(0);
        self.err.clear();
        self.file = None;
        result
    }
}

impl Drop for GzFile {
    fn drop(&mut self) {
        let _ = self.teardown();
    }
}

impl Seek for GzFile {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        Ok(GzFile::seek(self, pos)?)
    }
}
