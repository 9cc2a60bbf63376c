//! Streaming gzip member codecs built on [flate2](https://github.com/rust-lang/flate2-rs).
//!
//! The deflate payload is handled by `flate2::{Compress, Decompress}` in raw
//! mode; the member header, footer and CRC accounting live here so that a
//! stream of concatenated members can be restarted with [`Processor::reset`].

mod footer;
mod header;

pub use footer::{MemberFooter, FOOTER_SIZE};
pub use header::{MemberHeader, MAGIC};

use crate::error::{Error, Result};
use crate::{Flush, Processor, Status};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Header,
    Data,
    Footer,
    Done,
}

/// Compresses one gzip member at a time.
#[derive(Debug)]
pub struct GzipCompress {
    inner: flate2::Compress,
    level: flate2::Compression,
    phase: Phase,
    crc: flate2::Crc,
    pending: Vec<u8>,
    total_in: u64,
    total_out: u64,
}

impl Default for GzipCompress {
    fn default() -> Self {
        Self::new(flate2::Compression::default())
    }
}

impl GzipCompress {
    pub fn new(level: flate2::Compression) -> Self {
        Self {
            inner: flate2::Compress::new(level, false),
            level,
            phase: Phase::Header,
            crc: flate2::Crc::new(),
            pending: Vec::new(),
            total_in: 0,
            total_out: 0,
        }
    }

    /// Record a new level for subsequent members. The running member is not
    /// retuned; callers drain and [`Processor::reset`] before the change
    /// takes effect.
    pub fn set_level(&mut self, level: flate2::Compression) {
        self.level = level;
    }

    /// Move as much of the staged header/footer bytes as fit into `output`,
    /// returning the number of bytes emitted.
    fn drain_pending(&mut self, output: &mut [u8]) -> usize {
        let n = output.len().min(self.pending.len());
        output[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        self.total_out += n as u64;
        n
    }
}

impl Processor for GzipCompress {
    fn process(&mut self, input: &[u8], mut output: &mut [u8], flush: Flush) -> Result<Status> {
        loop {
            if self.phase == Phase::Header {
                MemberHeader::default()
                    .write(&mut self.pending)
                    .map_err(|e| Error::Data(e.to_string()))?;
                self.phase = Phase::Data;
            }

            if !self.pending.is_empty() {
                let n = self.drain_pending(output);
                output = &mut output[n..];
                if !self.pending.is_empty() {
                    // output full
                    return Ok(Status::Ok);
                }
            }

            match self.phase {
                Phase::Header => unreachable!(),
                Phase::Data => {
                    let in_before = self.inner.total_in();
                    let out_before = self.inner.total_out();
                    let status = self
                        .inner
                        .compress(
                            input,
                            output,
                            match flush {
                                Flush::None => flate2::FlushCompress::None,
                                Flush::Sync => flate2::FlushCompress::Sync,
                                Flush::Finish => flate2::FlushCompress::Finish,
                            },
                        )
                        .map_err(|e| Error::Data(e.to_string()))?;
                    let consumed = (self.inner.total_in() - in_before) as usize;
                    let produced = (self.inner.total_out() - out_before) as usize;
                    self.crc.update(&input[..consumed]);
                    output = &mut output[produced..];
                    self.total_in += consumed as u64;
                    self.total_out += produced as u64;
                    match status {
                        flate2::Status::Ok | flate2::Status::BufError => return Ok(Status::Ok),
                        flate2::Status::StreamEnd => self.phase = Phase::Footer,
                    }
                }
                Phase::Footer => {
                    let footer = MemberFooter {
                        crc32: self.crc.sum(),
                        data_len: self.crc.amount(),
                    };
                    footer
                        .write(&mut self.pending)
                        .map_err(|e| Error::Data(e.to_string()))?;
                    self.phase = Phase::Done;
                }
                Phase::Done => return Ok(Status::StreamEnd),
            }
        }
    }

    fn reset(&mut self) {
        self.inner = flate2::Compress::new(self.level, false);
        self.phase = Phase::Header;
        self.crc.reset();
        self.pending.clear();
        self.total_in = 0;
        self.total_out = 0;
    }

    fn total_in(&self) -> u64 {
        self.total_in
    }

    fn total_out(&self) -> u64 {
        self.total_out
    }
}

// Header fields are parsed incrementally, at most this many bytes per step.
const HEADER_STEP: usize = 128;

/// Decompresses one gzip member at a time, verifying the trailer.
#[derive(Debug)]
pub struct GzipDecompress {
    inner: flate2::Decompress,
    phase: Phase,
    crc: flate2::Crc,
    staged: Vec<u8>,
    total_in: u64,
    total_out: u64,
}

impl Default for GzipDecompress {
    fn default() -> Self {
        Self::new()
    }
}

impl GzipDecompress {
    pub fn new() -> Self {
        Self {
            inner: flate2::Decompress::new(false),
            phase: Phase::Header,
            crc: flate2::Crc::new(),
            staged: Vec::new(),
            total_in: 0,
            total_out: 0,
        }
    }
}

impl Processor for GzipDecompress {
    fn process(&mut self, mut input: &[u8], output: &mut [u8], _flush: Flush) -> Result<Status> {
        loop {
            match self.phase {
                Phase::Header => {
                    let take = HEADER_STEP.min(input.len());
                    if take == 0 {
                        // need more input
                        return Ok(Status::Ok);
                    }
                    let already = self.staged.len();
                    self.staged.extend_from_slice(&input[..take]);
                    match MemberHeader::parse(&self.staged[..]) {
                        Ok(parsed) => {
                            let consumed = parsed.size - already;
                            input = &input[consumed..];
                            self.total_in += consumed as u64;
                            self.staged.clear();
                            self.phase = Phase::Data;
                        }
                        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                            input = &input[take..];
                            self.total_in += take as u64;
                        }
                        Err(e) => return Err(Error::Data(e.to_string())),
                    }
                }
                Phase::Data => {
                    if input.is_empty() {
                        return Ok(Status::Ok);
                    }
                    let in_before = self.inner.total_in();
                    let out_before = self.inner.total_out();
                    let status = self
                        .inner
                        .decompress(input, output, flate2::FlushDecompress::None)
                        .map_err(|e| Error::Data(e.to_string()))?;
                    let consumed = (self.inner.total_in() - in_before) as usize;
                    let produced = (self.inner.total_out() - out_before) as usize;
                    self.crc.update(&output[..produced]);
                    self.total_in += consumed as u64;
                    self.total_out += produced as u64;
                    input = &input[consumed..];
                    match status {
                        flate2::Status::Ok | flate2::Status::BufError => {
                            return Ok(Status::Ok);
                        }
                        flate2::Status::StreamEnd => self.phase = Phase::Footer,
                    }
                }
                Phase::Footer => {
                    let take = FOOTER_SIZE
                        .saturating_sub(self.staged.len())
                        .min(input.len());
                    if take == 0 && self.staged.len() < FOOTER_SIZE {
                        return Ok(Status::Ok);
                    }
                    self.staged.extend_from_slice(&input[..take]);
                    input = &input[take..];
                    self.total_in += take as u64;
                    if self.staged.len() < FOOTER_SIZE {
                        return Ok(Status::Ok);
                    }
                    let footer = MemberFooter::parse(&self.staged[..])
                        .map_err(|e| Error::Data(e.to_string()))?;
                    if footer.crc32 != self.crc.sum() {
                        return Err(Error::Data("incorrect data check".to_string()));
                    }
                    if footer.data_len != self.crc.amount() {
                        return Err(Error::Data("incorrect length check".to_string()));
                    }
                    self.staged.clear();
                    self.phase = Phase::Done;
                    return Ok(Status::StreamEnd);
                }
                Phase::Done => return Ok(Status::StreamEnd),
            }
        }
    }

    fn reset(&mut self) {
        self.inner.reset(false);
        self.phase = Phase::Header;
        self.crc.reset();
        self.staged.clear();
        self.total_in = 0;
        self.total_out = 0;
    }

    fn total_in(&self) -> u64 {
        self.total_in
    }

    fn total_out(&self) -> u64 {
        self.total_out
    }
}
