//! Scenario tests spanning the write and read sides together.

use std::io::SeekFrom;

use temp_testdir::TempDir;

use crate::{CompressionLevel, ErrorCode, Flush, GzFile};

fn deterministic_bytes(len: usize) -> Vec<u8> {
    let mut state = 0x2545f491u32;
    (0..len)
        .map(|_| {
            state = state.wrapping_mul(1103515245).wrapping_add(12345);
            (state >> 16) as u8
        })
        .collect()
}

fn write_stream(path: &std::path::Path, data: &[u8], chunk: usize) -> anyhow::Result<()> {
    let mut stream = GzFile::open(path, "wb")?;
    for piece in data.chunks(chunk) {
        assert_eq!(stream.write(piece)?, piece.len());
    }
    stream.close()?;
    Ok(())
}

fn read_stream(path: &std::path::Path, chunk: usize) -> anyhow::Result<Vec<u8>> {
    let mut stream = GzFile::open(path, "rb")?;
    let mut out = Vec::new();
    let mut buf = vec![0u8; chunk];
    loop {
        let n = stream.read(&mut buf)?;
        if n == 0 {
            break;
        }
        out.extend_from_slice(&buf[..n]);
    }
    stream.close()?;
    Ok(out)
}

#[test]
fn test_roundtrip_across_chunk_sizes() -> anyhow::Result<()> {
    let temp = TempDir::default();
    let data = deterministic_bytes(300_000);
    for (write_chunk, read_chunk) in [(1usize, 7usize), (64, 4096), (100_000, 1), (300_000, 65536)]
    {
        let path = temp.join(format!("case-{write_chunk}-{read_chunk}.gz"));
        write_stream(&path, &data, write_chunk)?;
        assert_eq!(read_stream(&path, read_chunk)?, data);
    }
    Ok(())
}

#[test]
fn test_tiny_buffers_roundtrip() -> anyhow::Result<()> {
    let temp = TempDir::default();
    let path = temp.join("tiny.gz");
    let data = vec![b'A'; 50];

    let mut writer = GzFile::open(&path, "wb")?;
    writer.set_buffer_size(8)?;
    writer.write(&data)?;
    writer.close()?;

    let mut reader = GzFile::open(&path, "rb")?;
    reader.set_buffer_size(8)?;
    let mut out = Vec::new();
    let mut buf = [0u8; 3];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        out.extend_from_slice(&buf[..n]);
    }
    assert_eq!(out, data);
    reader.close()?;
    Ok(())
}

#[test]
fn test_forward_seek_matches_full_read() -> anyhow::Result<()> {
    let temp = TempDir::default();
    let path = temp.join("x.gz");
    let data = deterministic_bytes(40_000);
    write_stream(&path, &data, 4096)?;

    let mut stream = GzFile::open(&path, "rb")?;
    stream.seek(SeekFrom::Start(25_000))?;
    let mut tail = vec![0u8; 15_000];
    assert_eq!(stream.read(&mut tail)?, 15_000);
    assert_eq!(tail, &data[25_000..]);
    Ok(())
}

#[test]
fn test_backward_seek_replays() -> anyhow::Result<()> {
    let temp = TempDir::default();
    let path = temp.join("x.gz");
    let data = deterministic_bytes(10_000);
    write_stream(&path, &data, 4096)?;

    let mut stream = GzFile::open(&path, "rb")?;
    let mut buf = vec![0u8; 8000];
    stream.read(&mut buf)?;
    stream.seek(SeekFrom::Start(100))?;
    assert_eq!(stream.position(), 100);
    let mut replay = vec![0u8; 500];
    stream.read(&mut replay)?;
    assert_eq!(replay, &data[100..600]);
    Ok(())
}

#[test]
fn test_seek_on_raw_stream_uses_descriptor() -> anyhow::Result<()> {
    let temp = TempDir::default();
    let path = temp.join("x.txt");
    let data = deterministic_bytes(5000);
    std::fs::write(&path, &data)?;

    let mut stream = GzFile::open(&path, "rb")?;
    let mut buf = vec![0u8; 1000];
    stream.read(&mut buf)?;
    // forward and backward both work on a pass-through stream
    stream.seek(SeekFrom::Start(4000))?;
    let n = stream.read(&mut buf)?;
    assert_eq!(&buf[..n], &data[4000..]);
    stream.seek(SeekFrom::Start(10))?;
    let n = stream.read(&mut buf)?;
    assert_eq!(&buf[..n], &data[10..1010]);
    Ok(())
}

#[test]
fn test_rewind_restarts_stream() -> anyhow::Result<()> {
    let temp = TempDir::default();
    let path = temp.join("x.gz");
    write_stream(&path, b"replay me", 64)?;

    let mut stream = GzFile::open(&path, "rb")?;
    let mut buf = vec![0u8; 16];
    let n = stream.read(&mut buf)?;
    assert_eq!(&buf[..n], b"replay me");
    stream.rewind()?;
    assert_eq!(stream.position(), 0);
    let n = stream.read(&mut buf)?;
    assert_eq!(&buf[..n], b"replay me");
    Ok(())
}

#[test]
fn test_write_seek_fills_gap_with_zeros() -> anyhow::Result<()> {
    let temp = TempDir::default();
    let path = temp.join("x.gz");
    let mut writer = GzFile::open(&path, "wb")?;
    writer.write(b"abc")?;
    writer.seek(SeekFrom::Current(5))?;
    assert_eq!(writer.position(), 8);
    writer.write(b"xyz")?;
    writer.close()?;

    assert_eq!(read_stream(&path, 64)?, b"abc\0\0\0\0\0xyz");
    Ok(())
}

#[test]
fn test_write_seek_absolute_gap() -> anyhow::Result<()> {
    let temp = TempDir::default();
    let path = temp.join("x.gz");
    let mut writer = GzFile::open(&path, "wb")?;
    writer.seek(SeekFrom::Start(4))?;
    writer.write(b"late")?;
    writer.close()?;

    assert_eq!(read_stream(&path, 64)?, b"\0\0\0\0late");
    Ok(())
}

#[test]
fn test_push_back_interacts_with_seek_and_tell() -> anyhow::Result<()> {
    let temp = TempDir::default();
    let path = temp.join("x.gz");
    write_stream(&path, b"0123456789", 64)?;

    let mut stream = GzFile::open(&path, "rb")?;
    stream.seek(SeekFrom::Start(4))?;
    assert_eq!(stream.read_byte()?, Some(b'4'));
    stream.push_back(b'!')?;
    assert_eq!(stream.position(), 4);
    assert_eq!(stream.read_byte()?, Some(b'!'));
    assert_eq!(stream.read_byte()?, Some(b'5'));
    Ok(())
}

#[test]
fn test_multiple_push_backs_read_in_order() -> anyhow::Result<()> {
    let temp = TempDir::default();
    let path = temp.join("x.gz");
    write_stream(&path, b"tail", 64)?;

    let mut stream = GzFile::open(&path, "rb")?;
    for &byte in b"cba" {
        stream.push_back(byte)?;
    }
    let mut buf = vec![0u8; 16];
    let n = stream.read(&mut buf)?;
    assert_eq!(&buf[..n], b"abctail");
    Ok(())
}

#[test]
fn test_push_back_capacity_is_output_room() -> anyhow::Result<()> {
    let temp = TempDir::default();
    let path = temp.join("x.gz");
    write_stream(&path, &vec![b'A'; 50], 64)?;

    let mut stream = GzFile::open(&path, "rb")?;
    stream.set_buffer_size(8)?;
    // the output arena holds 16 bytes; reading one frees exactly one slot
    assert_eq!(stream.read_byte()?, Some(b'A'));
    stream.push_back(b'x')?;
    let err = stream.push_back(b'y').unwrap_err();
    assert_eq!(err.code(), ErrorCode::Buffer);
    // informational: the buffered bytes are still there after a reset
    stream.clear_error();
    assert_eq!(stream.read_byte()?, Some(b'x'));
    assert_eq!(stream.read_byte()?, Some(b'A'));
    Ok(())
}

#[test]
fn test_write_error_is_sticky_and_survives_close() -> anyhow::Result<()> {
    let temp = TempDir::default();
    let path = temp.join("x.gz");
    std::fs::write(&path, b"")?;

    // a read-only descriptor adopted for writing fails at the first drain
    let read_only = std::fs::File::open(&path)?;
    let mut stream = GzFile::from_file(read_only, &path, "wb")?;
    stream.set_buffer_size(8)?;
    assert!(stream.write(&[0u8; 64]).is_err());
    let (code, _) = stream.last_error();
    assert_eq!(code, ErrorCode::Io);
    // later writes keep failing without touching the descriptor
    assert!(stream.write(b"more").is_err());
    // close reports the original failure, not a cleanup artifact
    assert!(stream.close().is_err());
    Ok(())
}

#[test]
fn test_truncated_input_surfaces_at_close() -> anyhow::Result<()> {
    let temp = TempDir::default();
    let path = temp.join("x.gz");
    write_stream(&path, &deterministic_bytes(5000), 4096)?;
    let bytes = std::fs::read(&path)?;
    std::fs::write(&path, &bytes[..bytes.len() - 4])?;

    let mut stream = GzFile::open(&path, "rb")?;
    let mut out = vec![0u8; 8192];
    while stream.read(&mut out)? > 0 {}
    assert_eq!(stream.last_error().0, ErrorCode::Buffer);
    assert!(stream.close().is_err());
    Ok(())
}

#[test]
fn test_clear_error_allows_reading_on() -> anyhow::Result<()> {
    let temp = TempDir::default();
    let path = temp.join("x.gz");
    write_stream(&path, b"short", 64)?;

    let mut stream = GzFile::open(&path, "rb")?;
    let mut buf = vec![0u8; 16];
    stream.read(&mut buf)?;
    stream.read(&mut buf)?;
    assert!(stream.is_eof());
    stream.clear_error();
    assert!(!stream.is_eof());
    assert_eq!(stream.read(&mut buf)?, 0);
    Ok(())
}

#[test]
fn test_level_helpers_roundtrip() -> anyhow::Result<()> {
    let temp = TempDir::default();
    let path = temp.join("x.gz");
    let data = deterministic_bytes(20_000);
    let mut writer = crate::create(&path, CompressionLevel::Best)?;
    writer.write(&data)?;
    writer.close()?;

    let mut reader = crate::open(&path)?;
    let mut out = vec![0u8; data.len()];
    assert_eq!(reader.read(&mut out)?, data.len());
    assert_eq!(out, data);
    Ok(())
}

#[test]
fn test_sync_flush_then_more_data() -> anyhow::Result<()> {
    let temp = TempDir::default();
    let path = temp.join("x.gz");
    let mut writer = GzFile::open(&path, "wb")?;
    writer.write(b"first half|")?;
    writer.flush(Flush::Sync)?;
    writer.write(b"second half")?;
    writer.close()?;

    assert_eq!(read_stream(&path, 64)?, b"first half|second half");
    Ok(())
}

#[test]
fn test_io_seek_trait() -> anyhow::Result<()> {
    let temp = TempDir::default();
    let path = temp.join("x.gz");
    write_stream(&path, b"0123456789", 64)?;

    let mut stream = GzFile::open(&path, "rb")?;
    let at = std::io::Seek::seek(&mut stream, SeekFrom::Start(3))?;
    assert_eq!(at, 3);
    assert_eq!(stream.read_byte()?, Some(b'3'));
    Ok(())
}
