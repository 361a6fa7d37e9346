// SPDX-License-Identifier: PMPL-1.0-or-later
//
// VeriSim Refop - Interruption-tolerant read/write loops
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unlike `read_exact`/`write_all`, these report how many bytes were
// transferred, so callers can tell a short file apart from a hard error.

use std::io::{self, ErrorKind, Read, Write};

/// Read until `buf` is full, end of input, or a hard error.
///
/// `Interrupted` is retried. Returns the number of bytes read, which is
/// smaller than `buf.len()` only at end of input.
pub fn read_full<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Write all of `buf` unless the writer stops accepting bytes or fails.
///
/// `Interrupted` is retried. Returns the number of bytes written, which is
/// smaller than `buf.len()` only if a write accepted zero bytes.
pub fn write_full<W: Write + ?Sized>(writer: &mut W, buf: &[u8]) -> io::Result<usize> {
    let mut written = 0;
    while written < buf.len() {
        match writer.write(&buf[written..]) {
            Ok(0) => break,
            Ok(n) => written += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(written)
}
