// SPDX-License-Identifier: PMPL-1.0-or-later
//
// VeriSim Refop - Validating reader
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Reads one generation file and verifies it in two stages: the header's
// complement fields first, then the payload CRC-16. A caller buffer smaller
// than the stored payload receives a truncated copy, but the CRC is always
// computed over the complete payload, which is streamed rather than
// buffered.

use std::fs::{File, OpenOptions};
use std::io::{self, ErrorKind};
use std::path::Path;

use tracing::debug;

use crate::crc16::{crc16_update, CRC16_SEED};
use crate::error::ReadError;
use crate::header::{RecordHeader, HEADER_SIZE};
use crate::io_util::read_full;

/// Scratch size for the part of a payload that does not fit the caller's
/// buffer.
const CHUNK_SIZE: usize = 8 * 1024;

/// Read and validate the record stored at `path` into `buf`.
///
/// Returns the number of bytes copied into `buf`: the payload size, or
/// `buf.len()` when the payload is larger than the buffer. Bytes past the
/// end of the declared payload are ignored.
///
/// # Errors
///
/// See [`ReadError`]. A payload that does not fit in `buf` must not be
/// larger than `size_limit`.
pub fn read_validated(path: &Path, buf: &mut [u8], size_limit: u64) -> Result<usize, ReadError> {
    let (mut file, header) = open_record(path)?;

    let fits = usize::try_from(header.size)
        .ok()
        .filter(|&size| size <= buf.len());

    match fits {
        Some(size) => {
            read_payload(&mut file, &header, &mut buf[..size])?;
            Ok(size)
        }
        None => {
            if header.size > size_limit {
                return Err(ReadError::RecordTooLarge {
                    size: header.size,
                    limit: size_limit,
                });
            }
            read_payload(&mut file, &header, buf)?;

            debug!(
                path = %path.display(),
                stored = header.size,
                copied = buf.len(),
                "Truncated read into smaller buffer"
            );
            Ok(buf.len())
        }
    }
}

/// Read and validate the complete record stored at `path`.
///
/// The returned vector holds exactly the stored payload. Its allocation is
/// bounded by the length of the file on disk, never by `size_limit` alone.
///
/// # Errors
///
/// See [`ReadError`]. A failed allocation is reported as `Unreadable`.
pub fn read_record(path: &Path, size_limit: u64) -> Result<Vec<u8>, ReadError> {
    let (mut file, header) = open_record(path)?;

    if header.size > size_limit {
        return Err(ReadError::RecordTooLarge {
            size: header.size,
            limit: size_limit,
        });
    }

    let on_disk = file.metadata().map_err(ReadError::Unreadable)?.len();
    let available = on_disk.saturating_sub(HEADER_SIZE as u64);
    if header.size > available {
        return Err(ReadError::TruncatedPayload {
            expected: header.size,
            read: usize::try_from(available).unwrap_or(usize::MAX),
        });
    }

    let size = usize::try_from(header.size).map_err(|_| ReadError::RecordTooLarge {
        size: header.size,
        limit: size_limit,
    })?;

    let mut payload = Vec::new();
    payload
        .try_reserve_exact(size)
        .map_err(|e| ReadError::Unreadable(io::Error::new(ErrorKind::OutOfMemory, e)))?;
    payload.resize(size, 0);

    read_payload(&mut file, &header, &mut payload)?;
    Ok(payload)
}

/// Open `path` and read and validate its header.
fn open_record(path: &Path) -> Result<(File, RecordHeader), ReadError> {
    let mut file = open_read_only(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => ReadError::NotFound,
        _ => ReadError::Unreadable(e),
    })?;

    let mut header_bytes = [0u8; HEADER_SIZE];
    let read = read_full(&mut file, &mut header_bytes).map_err(ReadError::Unreadable)?;
    if read != HEADER_SIZE {
        return Err(ReadError::TruncatedHeader {
            read,
            expected: HEADER_SIZE,
        });
    }

    let header = RecordHeader::from_bytes(&header_bytes);
    if !header.validate() {
        return Err(ReadError::InvalidHeader);
    }

    Ok((file, header))
}

/// Fill `prefix` with the start of the payload, stream the rest through the
/// CRC, and check the result against the header.
///
/// `prefix` must not be longer than the declared payload.
fn read_payload(
    file: &mut File,
    header: &RecordHeader,
    prefix: &mut [u8],
) -> Result<(), ReadError> {
    let truncated = |read: usize| ReadError::TruncatedPayload {
        expected: header.size,
        read,
    };

    let mut read = read_full(file, prefix).map_err(ReadError::Unreadable)?;
    if read != prefix.len() {
        return Err(truncated(read));
    }
    let mut crc = crc16_update(CRC16_SEED, prefix);

    let mut remaining = header.size - prefix.len() as u64;
    let mut chunk = [0u8; CHUNK_SIZE];
    while remaining > 0 {
        let want = remaining.min(CHUNK_SIZE as u64) as usize;
        let n = read_full(file, &mut chunk[..want]).map_err(ReadError::Unreadable)?;
        crc = crc16_update(crc, &chunk[..n]);
        read = read.saturating_add(n);
        if n != want {
            return Err(truncated(read));
        }
        remaining -= n as u64;
    }

    if crc != header.crc16 {
        return Err(ReadError::PayloadCorrupt {
            expected: header.crc16,
            actual: crc,
        });
    }

    Ok(())
}

fn open_read_only(path: &Path) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.read(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.custom_flags(libc::O_NOFOLLOW | libc::O_CLOEXEC);
    }

    options.open(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_SIZE_LIMIT;
    use crate::writer::encode_record;
    use std::fs;
    use tempfile::TempDir;

    fn write_record(dir: &TempDir, payload: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join("record.bin");
        fs::write(&path, encode_record(payload)).unwrap();
        path
    }

    #[test]
    fn test_read_exact_fit() {
        let dir = TempDir::new().unwrap();
        let path = write_record(&dir, b"generation");

        let mut buf = [0u8; 10];
        let n = read_validated(&path, &mut buf, DEFAULT_SIZE_LIMIT).unwrap();
        assert_eq!(n, 10);
        assert_eq!(&buf, b"generation");
    }

    #[test]
    fn test_read_into_larger_buffer() {
        let dir = TempDir::new().unwrap();
        let path = write_record(&dir, b"abc");

        let mut buf = [0xEEu8; 8];
        let n = read_validated(&path, &mut buf, DEFAULT_SIZE_LIMIT).unwrap();
        assert_eq!(n, 3);
        assert_eq!(&buf[..3], b"abc");
        assert_eq!(buf[3], 0xEE);
    }

    #[test]
    fn test_truncating_read() {
        let dir = TempDir::new().unwrap();
        let payload: Vec<u8> = (0..=255u8).collect();
        let path = write_record(&dir, &payload);

        let mut buf = [0u8; 16];
        let n = read_validated(&path, &mut buf, DEFAULT_SIZE_LIMIT).unwrap();
        assert_eq!(n, 16);
        assert_eq!(&buf[..], &payload[..16]);
    }

    #[test]
    fn test_truncating_read_still_checks_full_crc() {
        let dir = TempDir::new().unwrap();
        let path = write_record(&dir, &[1u8; 64]);
        let mut bytes = fs::read(&path).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        fs::write(&path, bytes).unwrap();

        let mut buf = [0u8; 4];
        let err = read_validated(&path, &mut buf, DEFAULT_SIZE_LIMIT).unwrap_err();
        assert!(matches!(err, ReadError::PayloadCorrupt { .. }));
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let mut buf = [0u8; 4];
        let absent = dir.path().join("absent");
        let err = read_validated(&absent, &mut buf, DEFAULT_SIZE_LIMIT).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_empty_and_short_files_are_truncated_headers() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("short.bin");
        let mut buf = [0u8; 4];

        fs::write(&path, b"").unwrap();
        let err = read_validated(&path, &mut buf, DEFAULT_SIZE_LIMIT).unwrap_err();
        assert!(matches!(err, ReadError::TruncatedHeader { read: 0, .. }));

        fs::write(&path, &encode_record(b"data")[..HEADER_SIZE - 1]).unwrap();
        let err = read_validated(&path, &mut buf, DEFAULT_SIZE_LIMIT).unwrap_err();
        assert!(matches!(err, ReadError::TruncatedHeader { read: 31, .. }));
    }

    #[test]
    fn test_truncated_payload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cut.bin");
        let record = encode_record(b"0123456789");
        fs::write(&path, &record[..record.len() - 3]).unwrap();

        let mut buf = [0u8; 10];
        let err = read_validated(&path, &mut buf, DEFAULT_SIZE_LIMIT).unwrap_err();
        assert!(matches!(err, ReadError::TruncatedPayload { expected: 10, read: 7 }));
        assert!(err.is_corruption());
    }

    #[test]
    fn test_invalid_header() {
        let dir = TempDir::new().unwrap();
        let path = write_record(&dir, b"data");
        let mut bytes = fs::read(&path).unwrap();
        bytes[0] ^= 0x01;
        fs::write(&path, bytes).unwrap();

        let mut buf = [0u8; 4];
        let err = read_validated(&path, &mut buf, DEFAULT_SIZE_LIMIT).unwrap_err();
        assert!(matches!(err, ReadError::InvalidHeader));
    }

    #[test]
    fn test_record_larger_than_limit() {
        let dir = TempDir::new().unwrap();
        let path = write_record(&dir, &[3u8; 100]);

        let mut buf = [0u8; 10];
        let err = read_validated(&path, &mut buf, 50).unwrap_err();
        assert!(matches!(err, ReadError::RecordTooLarge { size: 100, limit: 50 }));
    }

    #[test]
    fn test_large_record_fitting_buffer_ignores_limit() {
        let dir = TempDir::new().unwrap();
        let path = write_record(&dir, &[3u8; 100]);

        let mut buf = [0u8; 100];
        assert_eq!(read_validated(&path, &mut buf, 50).unwrap(), 100);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_not_followed() {
        let dir = TempDir::new().unwrap();
        let target = write_record(&dir, b"data");
        let link = dir.path().join("link.bin");
        std::os::unix::fs::symlink(&target, &link).unwrap();

        let mut buf = [0u8; 4];
        let err = read_validated(&link, &mut buf, DEFAULT_SIZE_LIMIT).unwrap_err();
        assert!(matches!(err, ReadError::Unreadable(_)));
    }

    #[test]
    fn test_trailing_bytes_ignored() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("padded.bin");
        let mut bytes = encode_record(b"abc");
        bytes.extend_from_slice(b"junk");
        fs::write(&path, bytes).unwrap();

        let mut buf = [0u8; 16];
        assert_eq!(read_validated(&path, &mut buf, DEFAULT_SIZE_LIMIT).unwrap(), 3);
        assert_eq!(&buf[..3], b"abc");
        assert_eq!(read_record(&path, DEFAULT_SIZE_LIMIT).unwrap(), b"abc");
    }

    #[test]
    fn test_read_record_returns_exact_payload() {
        let dir = TempDir::new().unwrap();
        let payload: Vec<u8> = (0..20_000u32).map(|i| (i % 253) as u8).collect();
        let path = write_record(&dir, &payload);

        assert_eq!(read_record(&path, u64::MAX).unwrap(), payload);
    }

    #[test]
    fn test_read_record_over_limit() {
        let dir = TempDir::new().unwrap();
        let path = write_record(&dir, &[5u8; 64]);

        let err = read_record(&path, 63).unwrap_err();
        assert!(matches!(err, ReadError::RecordTooLarge { size: 64, limit: 63 }));
    }

    #[test]
    fn test_forged_size_does_not_allocate() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("forged.bin");
        let header = RecordHeader::encode(0, 1 << 40);
        let mut bytes = header.to_bytes().to_vec();
        bytes.extend_from_slice(b"abc");
        fs::write(&path, bytes).unwrap();

        let err = read_record(&path, u64::MAX).unwrap_err();
        assert!(matches!(err, ReadError::TruncatedPayload { read: 3, .. }));

        let mut buf = [0u8; 8];
        let err = read_validated(&path, &mut buf, u64::MAX).unwrap_err();
        assert!(matches!(err, ReadError::TruncatedPayload { read: 3, .. }));
    }

    #[test]
    fn test_streamed_tail_checked_across_chunks() {
        let dir = TempDir::new().unwrap();
        let payload: Vec<u8> = (0..3 * CHUNK_SIZE + 17).map(|i| (i % 241) as u8).collect();
        let path = write_record(&dir, &payload);

        let mut buf = [0u8; 5];
        assert_eq!(read_validated(&path, &mut buf, DEFAULT_SIZE_LIMIT).unwrap(), 5);
        assert_eq!(&buf, &payload[..5]);

        let mut bytes = fs::read(&path).unwrap();
        bytes[HEADER_SIZE + 2 * CHUNK_SIZE + 3] ^= 0x40;
        fs::write(&path, bytes).unwrap();
        let err = read_validated(&path, &mut buf, DEFAULT_SIZE_LIMIT).unwrap_err();
        assert!(matches!(err, ReadError::PayloadCorrupt { .. }));
    }
}
