// SPDX-License-Identifier: PMPL-1.0-or-later
//
// VeriSim Refop - Staging writer
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Writes a complete record (header + payload) into the staging file and
// makes it durable. Promotion into the primary slot is done separately by
// the rotation engine, so a crash here never touches the live generations.

use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::Path;

use tracing::debug;

use crate::config::RefopConfig;
use crate::crc16::crc16;
use crate::error::{RefopError, RefopResult};
use crate::handle::RefopHandle;
use crate::header::{RecordHeader, HEADER_SIZE};
use crate::io_util::write_full;

/// Build the on-disk record for `payload` in one contiguous buffer.
pub fn encode_record(payload: &[u8]) -> Vec<u8> {
    let header = RecordHeader::encode(crc16(payload), payload.len() as u64);
    let mut record = Vec::with_capacity(HEADER_SIZE + payload.len());
    record.extend_from_slice(&header.to_bytes());
    record.extend_from_slice(payload);
    record
}

/// Write `payload` to the handle's staging file and fsync it.
///
/// Any stale staging file is removed first. On failure nothing is promoted
/// and the staging file is either absent or left as the failing step left
/// it.
///
/// # Errors
///
/// - `SizeLimitExceeded` if `payload` is empty or larger than the
///   configured limit. No file is touched in that case.
/// - `Io` if removing, creating, writing or syncing the staging file fails.
pub fn write_staging(
    handle: &RefopHandle,
    payload: &[u8],
    config: &RefopConfig,
) -> RefopResult<()> {
    let size = payload.len() as u64;
    if size == 0 || size > config.size_limit {
        return Err(RefopError::SizeLimitExceeded {
            size,
            limit: config.size_limit,
        });
    }

    let staging = handle.staging();

    match fs::remove_file(staging) {
        Ok(()) => debug!(path = %staging.display(), "Removed stale staging file"),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => {
            return Err(RefopError::io(
                format!("failed to remove stale staging file '{}'", staging.display()),
                e,
            ));
        }
    }

    let record = encode_record(payload);

    let mut file = create_exclusive(staging).map_err(|e| {
        RefopError::io(
            format!("failed to create staging file '{}'", staging.display()),
            e,
        )
    })?;

    let written = write_full(&mut file, &record).map_err(|e| {
        RefopError::io(format!("failed to write staging file '{}'", staging.display()), e)
    })?;
    if written != record.len() {
        return Err(RefopError::io(
            format!("short write to staging file '{}'", staging.display()),
            std::io::Error::new(
                ErrorKind::WriteZero,
                format!("wrote {written} of {} bytes", record.len()),
            ),
        ));
    }

    file.sync_all().map_err(|e| {
        RefopError::io(format!("failed to sync staging file '{}'", staging.display()), e)
    })?;

    debug!(
        path = %staging.display(),
        bytes = record.len(),
        "Wrote staging record"
    );

    Ok(())
}

/// Create `path` for writing, failing if it exists. Symlinks are never
/// followed and the file is readable only by its owner.
fn create_exclusive(path: &Path) -> std::io::Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options
            .mode(0o600)
            .custom_flags(libc::O_NOFOLLOW | libc::O_CLOEXEC);
    }

    options.open(path)
}
