//! Write side: staged compression into the descriptor.
//!
//! Bytes accumulate in the input buffer and are compressed a chunk at a
//! time; large writes skip the staging copy and feed the codec directly.
//! `Flush::Finish` closes the gzip member, and the next write after that
//! starts a fresh one, so one stream can carry several members.

use std::fmt;
use std::io::{self, Write};

use crate::buffer::Buffer;
use crate::error::{Error, Result};
use crate::gzip::GzipCompress;
use crate::mode::{CompressionLevel, Strategy};
use crate::stream::GzFile;
use crate::{Flush, Processor, Status};

/// Bounded `fmt::Write` sink; formatting past the end is an error instead
/// of a silent truncation.
struct BoundedSink<'a> {
    buf: &'a mut [u8],
    len: usize,
}

impl fmt::Write for BoundedSink<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let bytes = s.as_bytes();
        if self.len + bytes.len() > self.buf.len() {
            return Err(fmt::Error);
        }
        self.buf[self.len..self.len + bytes.len()].copy_from_slice(bytes);
        self.len += bytes.len();
        Ok(())
    }
}

impl GzFile {
    /// Allocate the write buffers and the codec. The input buffer is double
    /// the chunk size so [`GzFile::write_fmt`] always has a full chunk of
    /// formatting room past the staged bytes.
    fn write_init(&mut self) {
        self.input = Buffer::new(self.want * 2);
        if !self.direct {
            self.output = Buffer::new(self.want);
            self.comp = Some(GzipCompress::new(self.level.into()));
        }
    }

    /// Write the compressed output buffer to the descriptor.
    fn push_output(&mut self) -> Result<()> {
        let Some(file) = self.file.as_mut() else {
            return Err(Error::Misuse("stream is closed".to_string()));
        };
        if let Err(e) = file.write_all(self.output.window()) {
            return Err(self.fail(Error::Io(e)));
        }
        self.output.clear();
        Ok(())
    }

    /// Compress everything staged in the input buffer. `Flush::Sync` pushes
    /// the result to the descriptor; `Flush::Finish` also completes the
    /// member, and the next drain with data starts a new one. In transparent
    /// mode the staged bytes are written as they are and `flush` is ignored.
    pub(crate) fn drain(&mut self, flush: Flush) -> Result<()> {
        if !self.buffers_allocated() {
            self.write_init();
        }

        if self.direct {
            let Some(file) = self.file.as_mut() else {
                return Err(Error::Misuse("stream is closed".to_string()));
            };
            if let Err(e) = file.write_all(self.input.window()) {
                return Err(self.fail(Error::Io(e)));
            }
            self.input.clear();
            return Ok(());
        }

        if self.reset_pending {
            // don't start a new member unless there is data to write
            if self.input.is_empty() {
                return Ok(());
            }
            if let Some(codec) = self.comp.as_mut() {
                codec.reset();
            }
            self.reset_pending = false;
        }

        let mut status = Status::Ok;
        loop {
            let Some(codec) = self.comp.as_mut() else {
                return Err(Error::Misuse("no compression session".to_string()));
            };
            let in_before = codec.total_in();
            let out_before = codec.total_out();
            let result = codec.process(self.input.window(), self.output.space_mut(), flush);
            let consumed = (codec.total_in() - in_before) as usize;
            let produced = (codec.total_out() - out_before) as usize;
            self.input.consume(consumed);
            self.output.commit(produced);
            match result {
                Ok(s) => status = s,
                Err(e) => return Err(self.fail(e)),
            }
            if self.output.is_full() {
                self.push_output()?;
            }
            let done = match flush {
                Flush::Finish => status == Status::StreamEnd,
                _ => consumed == 0 && produced == 0,
            };
            if done {
                break;
            }
        }
        if flush != Flush::None {
            self.push_output()?;
        }
        if flush == Flush::Finish {
            self.reset_pending = true;
        }
        Ok(())
    }

    /// Compress `len` zeros. Used to fill the gap left by a forward seek.
    pub(crate) fn zero_fill(&mut self, mut len: u64) -> Result<()> {
        if !self.buffers_allocated() {
            self.write_init();
        }
        if !self.input.is_empty() {
            self.drain(Flush::None)?;
        }
        while len > 0 {
            let n = (self.want as u64).min(len) as usize;
            self.input.space_mut()[..n].fill(0);
            self.input.commit(n);
            self.pos += n as u64;
            self.drain(Flush::None)?;
            len -= n as u64;
        }
        Ok(())
    }

    /// Feed the caller's buffer to the codec without the staging copy.
    fn compress_direct(&mut self, buf: &[u8]) -> Result<()> {
        // the restart check in drain() never sees this data, so repeat it
        if self.reset_pending {
            if let Some(codec) = self.comp.as_mut() {
                codec.reset();
            }
            self.reset_pending = false;
        }
        let mut off = 0;
        while off < buf.len() {
            let Some(codec) = self.comp.as_mut() else {
                return Err(Error::Misuse("no compression session".to_string()));
            };
            let in_before = codec.total_in();
            let out_before = codec.total_out();
            let result = codec.process(&buf[off..], self.output.space_mut(), Flush::None);
            let consumed = (codec.total_in() - in_before) as usize;
            let produced = (codec.total_out() - out_before) as usize;
            off += consumed;
            self.pos += consumed as u64;
            self.output.commit(produced);
            if let Err(e) = result {
                return Err(self.fail(e));
            }
            if self.output.is_full() {
                self.push_output()?;
            }
        }
        Ok(())
    }

    /// Write all of `buf`, returning its length. Small writes are staged in
    /// the input buffer and compressed once a full chunk accumulates.
    pub fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.writable()?;
        if buf.is_empty() {
            return Ok(0);
        }
        if !self.buffers_allocated() {
            self.write_init();
        }
        if self.seek_pending {
            self.seek_pending = false;
            let skip = self.skip;
            self.zero_fill(skip)?;
        }

        if buf.len() < self.want {
            let mut off = 0;
            while off < buf.len() {
                let room = (self.want - self.input.len()).min(buf.len() - off);
                self.input.extend(&buf[off..off + room]);
                self.pos += room as u64;
                off += room;
                if off < buf.len() {
                    self.drain(Flush::None)?;
                }
            }
        } else {
            if !self.input.is_empty() {
                self.drain(Flush::None)?;
            }
            if self.direct {
                let Some(file) = self.file.as_mut() else {
                    return Err(Error::Misuse("stream is closed".to_string()));
                };
                if let Err(e) = file.write_all(buf) {
                    return Err(self.fail(Error::Io(e)));
                }
                self.pos += buf.len() as u64;
            } else {
                self.compress_direct(buf)?;
            }
        }
        Ok(buf.len())
    }

    /// Write one byte, going straight into the input buffer when it has room.
    pub fn write_byte(&mut self, byte: u8) -> Result<()> {
        self.writable()?;
        if self.seek_pending {
            self.seek_pending = false;
            let skip = self.skip;
            self.zero_fill(skip)?;
        }
        if self.buffers_allocated() && self.input.len() < self.want {
            self.input.extend(&[byte]);
            self.pos += 1;
            return Ok(());
        }
        self.write(&[byte])?;
        Ok(())
    }

    /// Write a string, returning the number of bytes written.
    pub fn write_str(&mut self, s: &str) -> Result<usize> {
        self.write(s.as_bytes())
    }

    /// Format directly into the input buffer. The formatted text is limited
    /// to one chunk; anything longer fails without writing.
    ///
    /// Usually invoked through `format_args!`:
    /// ```no_run
    /// # fn main() -> gzfile::Result<()> {
    /// # let mut stream = gzfile::GzFile::open("x.gz", "w")?;
    /// stream.write_fmt(format_args!("record {}\n", 7))?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn write_fmt(&mut self, args: fmt::Arguments<'_>) -> Result<usize> {
        self.writable()?;
        if !self.buffers_allocated() {
            self.write_init();
        }
        if self.seek_pending {
            self.seek_pending = false;
            let skip = self.skip;
            self.zero_fill(skip)?;
        }

        let limit = self.want;
        let outcome = {
            let space = self.input.space_mut();
            let mut sink = BoundedSink {
                buf: &mut space[..limit],
                len: 0,
            };
            fmt::write(&mut sink, args).map(|_| sink.len)
        };
        let written = match outcome {
            Ok(n) => n,
            Err(_) => {
                let err = Error::Buffer("formatted output does not fit in one chunk".to_string());
                return Err(self.fail(err));
            }
        };
        self.input.commit(written);
        self.pos += written as u64;
        if self.input.len() >= self.want {
            self.drain(Flush::None)?;
        }
        Ok(written)
    }

    /// Flush staged data through the codec and out to the descriptor.
    /// `Flush::Finish` completes the current member; `Flush::None` flushes
    /// nothing and is rejected.
    pub fn flush(&mut self, flush: Flush) -> Result<()> {
        self.writable()?;
        if flush == Flush::None {
            return Err(Error::Misuse("flush request would not flush".to_string()));
        }
        if self.seek_pending {
            self.seek_pending = false;
            let skip = self.skip;
            self.zero_fill(skip)?;
        }
        self.drain(flush)
    }

    /// Change the compression level and strategy for subsequent data. An
    /// open member is finished first so the change lands on a member
    /// boundary; readers see one concatenated stream either way.
    pub fn set_params(&mut self, level: CompressionLevel, strategy: Strategy) -> Result<()> {
        self.writable()?;
        if self.direct {
            return Err(Error::Misuse(
                "cannot set compression parameters on a transparent stream".to_string(),
            ));
        }
        if level == self.level && strategy == self.strategy {
            return Ok(());
        }
        if self.seek_pending {
            self.seek_pending = false;
            let skip = self.skip;
            self.zero_fill(skip)?;
        }
        if self.buffers_allocated() {
            let member_open = !self.input.is_empty()
                || self
                    .comp
                    .as_ref()
                    .map_or(false, |codec| codec.total_out() > 0 && !self.reset_pending);
            if member_open {
                self.drain(Flush::Finish)?;
            }
        }
        if let Some(codec) = self.comp.as_mut() {
            codec.set_level(level.into());
        }
        self.level = level;
        self.strategy = strategy;
        Ok(())
    }
}

impl Write for GzFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(GzFile::write(self, buf)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(GzFile::flush(self, Flush::Sync)?)
    }
}
