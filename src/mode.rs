use crate::error::{Error, Result};

/// List of compression levels
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum CompressionLevel {
    Fast,
    Default,
    Best,
    Number(u32),
}

impl Into<flate2::Compression> for CompressionLevel {
    fn into(self) -> flate2::Compression {
        match self {
            CompressionLevel::Fast => flate2::Compression::fast(),
            CompressionLevel::Default => flate2::Compression::default(),
            CompressionLevel::Best => flate2::Compression::best(),
            CompressionLevel::Number(x) => flate2::Compression::new(x),
        }
    }
}

/// Deflate strategy requested in the mode string. Recorded on the handle and
/// reported back by [`crate::GzFile::strategy`]; see DESIGN.md for how the
/// flate2 backend treats it.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum Strategy {
    Default,
    Filtered,
    HuffmanOnly,
    Rle,
    Fixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
    Append,
}

/// Parsed form of a `gzopen`-style mode string such as `"rb"` or `"wb9f"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenMode {
    pub access: Access,
    pub level: CompressionLevel,
    pub strategy: Strategy,
    /// Write without compression (`T`).
    pub direct: bool,
    /// Fail if the file already exists (`x`).
    pub exclusive: bool,
}

impl OpenMode {
    /// Interpret a mode string. One of `r`, `w` or `a` is required; `+` is
    /// rejected because a stream reads or writes, never both. Unknown
    /// characters are ignored.
    pub fn parse(mode: &str) -> Result<OpenMode> {
        let mut access = None;
        let mut level = CompressionLevel::Default;
        let mut strategy = Strategy::Default;
        let mut direct = false;
        let mut exclusive = false;

        for c in mode.chars() {
            match c {
                '0'..='9' => level = CompressionLevel::Number(c as u32 - '0' as u32),
                'r' => access = Some(Access::Read),
                'w' => access = Some(Access::Write),
                'a' => access = Some(Access::Append),
                '+' => {
                    return Err(Error::Misuse(
                        "cannot read and write the same stream".to_string(),
                    ))
                }
                'b' => (), // all streams are binary
                'x' => exclusive = true,
                'f' => strategy = Strategy::Filtered,
                'h' => strategy = Strategy::HuffmanOnly,
                'R' => strategy = Strategy::Rle,
                'F' => strategy = Strategy::Fixed,
                'T' => direct = true,
                _ => (),
            }
        }

        let access = access
            .ok_or_else(|| Error::Misuse(format!("mode string {:?} selects no access", mode)))?;
        if access == Access::Read && direct {
            return Err(Error::Misuse(
                "transparent mode is detected, not requested, when reading".to_string(),
            ));
        }
        Ok(OpenMode {
            access,
            level,
            strategy,
            direct,
            exclusive,
        })
    }
}
