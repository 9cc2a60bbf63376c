use std::io::{self, BufRead, Write};

/// Trailer of one gzip member: CRC-32 of the uncompressed data and its
/// length modulo 2^32.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberFooter {
    pub crc32: u32,
    pub data_len: u32,
}

pub const FOOTER_SIZE: usize = 8;

impl MemberFooter {
    pub fn parse(mut reader: impl BufRead) -> io::Result<Self> {
        let mut buf = [0u8; FOOTER_SIZE];
        reader.read_exact(&mut buf)?;
        Ok(MemberFooter {
            crc32: u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]),
            data_len: u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]),
        })
    }

    pub fn write(&self, mut writer: impl Write) -> io::Result<()> {
        writer.write_all(&self.crc32.to_le_bytes())?;
        writer.write_all(&self.data_len.to_le_bytes())?;
        Ok(())
    }
}
