use std::io::{self, BufRead, Write};

/// Two-byte magic identifying a gzip member.
pub const MAGIC: [u8; 2] = [0x1f, 0x8b];

pub const FHCRC: u8 = 0b0000_0010;
pub const FEXTRA: u8 = 0b0000_0100;
pub const FNAME: u8 = 0b0000_1000;
pub const FCOMMENT: u8 = 0b0001_0000;

/// Header of one gzip member.
///
/// Optional fields are carried through parsing so that members produced by
/// other tools (gzip, pigz, bgzip) read back correctly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberHeader {
    pub method: u8,
    pub flags: u8,
    pub mtime: u32,
    pub extra_flags: u8,
    pub os: u8,
    pub extra: Option<Vec<u8>>,
    pub file_name: Option<Vec<u8>>,
    pub comment: Option<Vec<u8>>,
    pub header_crc: Option<u16>,
    /// Total encoded size of this header in bytes.
    pub size: usize,
}

impl Default for MemberHeader {
    fn default() -> Self {
        MemberHeader {
            method: 8,
            flags: 0,
            mtime: 0,
            extra_flags: 0,
            os: 255,
            extra: None,
            file_name: None,
            comment: None,
            header_crc: None,
            size: 10,
        }
    }
}

fn eof(what: &str) -> io::Error {
    io::Error::new(io::ErrorKind::UnexpectedEof, format!("incomplete gzip {}", what))
}

fn read_bytes<R: BufRead, const N: usize>(reader: &mut R, what: &str) -> io::Result<[u8; N]> {
    let mut buf = [0u8; N];
    reader.read_exact(&mut buf).map_err(|e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            eof(what)
        } else {
            e
        }
    })?;
    Ok(buf)
}

impl MemberHeader {
    /// Parse a member header. Returns `UnexpectedEof` if the input ends
    /// before the header does, so a caller staging input incrementally can
    /// retry with more bytes.
    pub fn parse<R: BufRead>(mut reader: R) -> io::Result<Self> {
        let magic: [u8; 2] = read_bytes(&mut reader, "header")?;
        if magic != MAGIC {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "invalid gzip header",
            ));
        }

        let fixed: [u8; 8] = read_bytes(&mut reader, "header")?;
        let method = fixed[0];
        let flags = fixed[1];
        let mtime = u32::from_le_bytes([fixed[2], fixed[3], fixed[4], fixed[5]]);
        let extra_flags = fixed[6];
        let os = fixed[7];
        let mut size = 10;

        let extra = if flags & FEXTRA != 0 {
            let xlen: [u8; 2] = read_bytes(&mut reader, "extra field")?;
            let xlen = u16::from_le_bytes(xlen) as usize;
            let mut data = vec![0u8; xlen];
            reader
                .read_exact(&mut data)
                .map_err(|_| eof("extra field"))?;
            size += 2 + xlen;
            Some(data)
        } else {
            None
        };

        let file_name = if flags & FNAME != 0 {
            let mut name = Vec::new();
            reader.read_until(0, &mut name)?;
            if !name.ends_with(b"\0") {
                return Err(eof("file name"));
            }
            size += name.len();
            name.pop();
            Some(name)
        } else {
            None
        };

        let comment = if flags & FCOMMENT != 0 {
            let mut text = Vec::new();
            reader.read_until(0, &mut text)?;
            if !text.ends_with(b"\0") {
                return Err(eof("comment"));
            }
            size += text.len();
            text.pop();
            Some(text)
        } else {
            None
        };

        let header_crc = if flags & FHCRC != 0 {
            let crc: [u8; 2] = read_bytes(&mut reader, "header crc")?;
            size += 2;
            Some(u16::from_le_bytes(crc))
        } else {
            None
        };

        Ok(MemberHeader {
            method,
            flags,
            mtime,
            extra_flags,
            os,
            extra,
            file_name,
            comment,
            header_crc,
            size,
        })
    }

    /// Encode this header. Only the fixed fields are emitted for the default
    /// header used on the write path.
    pub fn write<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_all(&MAGIC)?;
        writer.write_all(&[self.method, self.flags])?;
        writer.write_all(&self.mtime.to_le_bytes())?;
        writer.write_all(&[self.extra_flags, self.os])?;

        if self.flags & FEXTRA != 0 {
            let extra = self.extra.as_deref().unwrap_or_default();
            let xlen = u16::try_from(extra.len())
                .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "extra field too long"))?;
            writer.write_all(&xlen.to_le_bytes())?;
            writer.write_all(extra)?;
        }
        if self.flags & FNAME != 0 {
            writer.write_all(self.file_name.as_deref().unwrap_or_default())?;
            writer.write_all(&[0])?;
        }
        if self.flags & FCOMMENT != 0 {
            writer.write_all(self.comment.as_deref().unwrap_or_default())?;
            writer.write_all(&[0])?;
        }
        if self.flags & FHCRC != 0 {
            writer.write_all(&self.header_crc.unwrap_or(0).to_le_bytes())?;
        }
        Ok(())
    }
}
