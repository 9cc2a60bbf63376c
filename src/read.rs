//! Read side: buffered and direct delivery of raw or decompressed bytes.
//!
//! Bytes flow from the descriptor into the input buffer, get decoded (or
//! passed through) into the output buffer, and leave through the caller's
//! slices. Whether the stream is gzip or plain data is decided by
//! [`GzFile::look`] on the first fetch and again after every member, so any
//! number of concatenated members read as one stream.

use std::fs::File;
use std::io::{self, Read};

use crate::buffer::Buffer;
use crate::error::{Error, Result};
use crate::gzip::{GzipDecompress, MAGIC};
use crate::stream::{GzFile, ReadHow, StreamMode};
use crate::{Flush, Processor, Status};

/// Read into `buf` until it is full or the descriptor reports end of file,
/// retrying short reads. Returns the byte count and whether EOF was hit.
fn raw_load(file: &mut File, buf: &mut [u8]) -> io::Result<(usize, bool)> {
    let mut got = 0;
    while got < buf.len() {
        match file.read(&mut buf[got..]) {
            Ok(0) => return Ok((got, true)),
            Ok(n) => got += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok((got, false))
}

impl GzFile {
    /// Top up the input buffer from the descriptor, sliding any leftover
    /// bytes to the front first.
    fn stage(&mut self) -> Result<()> {
        if self.err.code().is_fatal() {
            return Err(self.err.to_error().unwrap_or(Error::Memory));
        }
        if self.eof {
            return Ok(());
        }
        self.input.slide_to_front();
        let Some(file) = self.file.as_mut() else {
            return Err(Error::Misuse("stream is closed".to_string()));
        };
        match raw_load(file, self.input.space_mut()) {
            Ok((n, hit_end)) => {
                self.input.commit(n);
                if hit_end {
                    self.eof = true;
                }
                Ok(())
            }
            Err(e) => Err(self.fail(Error::Io(e))),
        }
    }

    /// Decide how the next stretch of input is delivered: a gzip magic
    /// starts a compressed member, anything else passes through raw. Called
    /// with an empty output buffer. Allocates the buffers on first use.
    pub(crate) fn look(&mut self) -> Result<()> {
        if !self.buffers_allocated() {
            self.input = Buffer::new(self.want);
            self.output = Buffer::new(self.want * 2);
            self.decomp = Some(GzipDecompress::new());
        }

        if self.input.len() < 2 {
            self.stage()?;
            if self.input.is_empty() {
                return Ok(());
            }
        }

        let window = self.input.window();
        if window.len() > 1 && window[..2] == MAGIC {
            if let Some(codec) = self.decomp.as_mut() {
                codec.reset();
            }
            self.how = ReadHow::Inflate;
            self.direct = false;
            return Ok(());
        }
        // a lone magic byte at the very end of the input is raw data

        if !self.direct {
            // trailing garbage after the last gzip member is ignored
            self.input.clear();
            self.eof = true;
            return Ok(());
        }

        // raw stream: hand the staged bytes straight to the output buffer
        self.output.extend(self.input.window());
        self.input.clear();
        self.how = ReadHow::Copy;
        self.direct = true;
        Ok(())
    }

    /// Decompress into `dst` until it is full or the member ends. A member
    /// cut short by end of input records an informational error and returns
    /// whatever was recovered.
    fn inflate_chunk(&mut self, dst: &mut [u8]) -> Result<usize> {
        let mut filled = 0;
        while filled < dst.len() {
            if self.input.is_empty() {
                self.stage()?;
                if self.input.is_empty() {
                    let err = Error::Buffer("unexpected end of file".to_string());
                    self.err.record(&self.path, &err);
                    break;
                }
            }
            let Some(codec) = self.decomp.as_mut() else {
                return Err(Error::Misuse("no decompression session".to_string()));
            };
            let in_before = codec.total_in();
            let out_before = codec.total_out();
            let result = codec.process(self.input.window(), &mut dst[filled..], Flush::None);
            let consumed = (codec.total_in() - in_before) as usize;
            let produced = (codec.total_out() - out_before) as usize;
            self.input.consume(consumed);
            filled += produced;
            match result {
                Ok(Status::StreamEnd) => {
                    // end of member; probe for a concatenated one next fetch
                    self.how = ReadHow::Look;
                    break;
                }
                Ok(Status::Ok) => (),
                Err(e) => return Err(self.fail(e)),
            }
        }
        Ok(filled)
    }

    /// Refill the output buffer by whatever means the stream shape calls
    /// for, probing for a new member when undecided.
    pub(crate) fn fetch(&mut self) -> Result<()> {
        loop {
            match self.how {
                ReadHow::Look => {
                    self.look()?;
                    if self.how == ReadHow::Look {
                        // end of input, nothing to deliver
                        return Ok(());
                    }
                }
                ReadHow::Copy => {
                    let Some(file) = self.file.as_mut() else {
                        return Err(Error::Misuse("stream is closed".to_string()));
                    };
                    match raw_load(file, self.output.space_mut()) {
                        Ok((n, hit_end)) => {
                            self.output.commit(n);
                            if hit_end {
                                self.eof = true;
                            }
                        }
                        Err(e) => return Err(self.fail(Error::Io(e))),
                    }
                    return Ok(());
                }
                ReadHow::Inflate => {
                    let mut out = std::mem::take(&mut self.output);
                    let result = self.inflate_chunk(out.space_mut());
                    match result {
                        Ok(n) => out.commit(n),
                        Err(ref e) if e.code().is_fatal() => out.clear(),
                        Err(_) => (),
                    }
                    self.output = out;
                    result?;
                }
            }
            if !self.output.is_empty() || (self.eof && self.input.is_empty()) {
                return Ok(());
            }
        }
    }

    /// Discard `len` uncompressed bytes, decompressing as needed. Stops
    /// early at end of input.
    pub(crate) fn skip_ahead(&mut self, mut len: u64) -> Result<()> {
        while len > 0 {
            if !self.output.is_empty() {
                let n = (self.output.len() as u64).min(len) as usize;
                self.output.consume(n);
                self.pos += n as u64;
                len -= n as u64;
            } else if self.eof && self.input.is_empty() {
                break;
            } else {
                self.fetch()?;
            }
        }
        Ok(())
    }

    /// Read up to `buf.len()` bytes, returning how many arrived. Zero means
    /// end of stream. Small requests are served from the output buffer;
    /// large ones bypass it and decompress straight into `buf`.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.readable()?;
        if buf.is_empty() {
            return Ok(0);
        }
        if self.seek_pending {
            self.seek_pending = false;
            let skip = self.skip;
            self.skip_ahead(skip)?;
        }

        let mut got = 0;
        while got < buf.len() {
            if !self.output.is_empty() {
                let n = self.output.read_into(&mut buf[got..]);
                got += n;
                self.pos += n as u64;
            } else if self.eof && self.input.is_empty() {
                self.past_eof = true;
                break;
            } else if self.how == ReadHow::Look || buf.len() - got < self.output.capacity() {
                // going through the buffer leaves room for a push-back
                self.fetch()?;
            } else if self.how == ReadHow::Copy {
                let Some(file) = self.file.as_mut() else {
                    return Err(Error::Misuse("stream is closed".to_string()));
                };
                match raw_load(file, &mut buf[got..]) {
                    Ok((n, hit_end)) => {
                        if hit_end {
                            self.eof = true;
                        }
                        got += n;
                        self.pos += n as u64;
                    }
                    Err(e) => return Err(self.fail(Error::Io(e))),
                }
            } else {
                let n = self.inflate_chunk(&mut buf[got..])?;
                got += n;
                self.pos += n as u64;
            }
        }
        Ok(got)
    }

    /// Read one byte; `None` at end of stream.
    pub fn read_byte(&mut self) -> Result<Option<u8>> {
        self.readable()?;
        if !self.seek_pending && !self.output.is_empty() {
            let byte = self.output.window()[0];
            self.output.consume(1);
            self.pos += 1;
            return Ok(Some(byte));
        }
        let mut byte = [0u8; 1];
        match self.read(&mut byte)? {
            0 => Ok(None),
            _ => Ok(Some(byte[0])),
        }
    }

    /// Append bytes to `line` up to and including the next newline, or to
    /// the end of the stream. Returns the number of bytes appended; zero
    /// means end of stream.
    pub fn read_line(&mut self, line: &mut Vec<u8>) -> Result<usize> {
        self.readable()?;
        if self.seek_pending {
            self.seek_pending = false;
            let skip = self.skip;
            self.skip_ahead(skip)?;
        }

        let mut appended = 0;
        loop {
            if self.output.is_empty() {
                self.fetch()?;
                if self.output.is_empty() {
                    self.past_eof = true;
                    break;
                }
            }
            let window = self.output.window();
            let newline = window.iter().position(|&b| b == b'\n');
            let n = match newline {
                Some(at) => at + 1,
                None => window.len(),
            };
            line.extend_from_slice(&self.output.window()[..n]);
            self.output.consume(n);
            self.pos += n as u64;
            appended += n;
            if newline.is_some() {
                break;
            }
        }
        Ok(appended)
    }

    /// Put one byte back to be read first by the next read. The room for
    /// push-back is whatever is free in the output buffer; at least one byte
    /// always fits right after a buffered read.
    pub fn push_back(&mut self, byte: u8) -> Result<()> {
        // a freshly opened stream has no buffers to push into yet
        if self.mode == StreamMode::Read && self.how == ReadHow::Look && self.output.is_empty() {
            self.look()?;
        }
        self.readable()?;
        if self.seek_pending {
            self.seek_pending = false;
            let skip = self.skip;
            self.skip_ahead(skip)?;
        }
        if !self.output.prepend(byte) {
            let err = Error::Buffer("out of room to push characters".to_string());
            return Err(self.fail(err));
        }
        self.pos = self.pos.saturating_sub(1);
        self.past_eof = false;
        Ok(())
    }
}

impl Read for GzFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(GzFile::read(self, buf)?)
    }
}
