// SPDX-License-Identifier: PMPL-1.0-or-later
//
// VeriSim Refop - Pickup with fallback
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Tries the primary generation, then the backup. A generation proven
// corrupt is deleted so the next `set` rotates over a clean slot.

use std::path::Path;

use tracing::{info, warn};

use crate::error::{ReadError, RefopError, RefopResult};
use crate::handle::RefopHandle;
use crate::reader::{read_record, read_validated};
use crate::rotation::remove_best_effort;

/// Successful pickup result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PickupOutcome {
    /// Bytes copied into the caller's buffer.
    pub len: usize,
    /// `true` when the value came from the backup generation.
    pub recovered: bool,
}

/// Read the newest valid generation into `buf`.
///
/// # Errors
///
/// - `NoEntry` if neither generation exists.
/// - `Broken` if no generation could be read and at least one exists.
pub fn pickup(
    handle: &RefopHandle,
    buf: &mut [u8],
    size_limit: u64,
) -> RefopResult<PickupOutcome> {
    let (len, recovered) = pickup_with(handle, |path| read_validated(path, buf, size_limit))?;
    Ok(PickupOutcome { len, recovered })
}

/// Read the newest valid generation into a vector holding exactly the
/// stored payload. Returns the payload and whether it came from the backup.
///
/// # Errors
///
/// Same as [`pickup`].
pub fn pickup_vec(handle: &RefopHandle, size_limit: u64) -> RefopResult<(Vec<u8>, bool)> {
    pickup_with(handle, |path| read_record(path, size_limit))
}

fn pickup_with<T>(
    handle: &RefopHandle,
    mut read: impl FnMut(&Path) -> Result<T, ReadError>,
) -> RefopResult<(T, bool)> {
    let primary_error = match read(handle.primary()) {
        Ok(value) => return Ok((value, false)),
        Err(e) => {
            discard_if_corrupt(handle.primary(), &e);
            e
        }
    };

    let backup_error = match read(handle.backup()) {
        Ok(value) => {
            info!(
                primary = %handle.primary().display(),
                reason = %primary_error,
                "Recovered value from backup generation"
            );
            return Ok((value, true));
        }
        Err(e) => {
            discard_if_corrupt(handle.backup(), &e);
            e
        }
    };

    if primary_error.is_not_found() && backup_error.is_not_found() {
        return Err(RefopError::NoEntry);
    }

    warn!(
        primary = %primary_error,
        backup = %backup_error,
        "No readable generation"
    );

    Err(RefopError::Broken {
        primary: primary_error,
        backup: backup_error,
    })
}

fn discard_if_corrupt(path: &Path, error: &ReadError) {
    if error.is_corruption() {
        warn!(path = %path.display(), reason = %error, "Discarding corrupt generation");
        remove_best_effort(path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_SIZE_LIMIT;
    use crate::writer::encode_record;
    use std::fs;
    use tempfile::TempDir;

    fn setup() -> (TempDir, RefopHandle) {
        let dir = TempDir::new().unwrap();
        let handle = RefopHandle::new(dir.path(), "pick.bin").unwrap();
        (dir, handle)
    }

    #[test]
    fn test_primary_preferred() {
        let (_dir, handle) = setup();
        fs::write(handle.primary(), encode_record(b"new")).unwrap();
        fs::write(handle.backup(), encode_record(b"old")).unwrap();

        let mut buf = [0u8; 3];
        let outcome = pickup(&handle, &mut buf, DEFAULT_SIZE_LIMIT).unwrap();
        assert_eq!(outcome, PickupOutcome { len: 3, recovered: false });
        assert_eq!(&buf, b"new");
    }

    #[test]
    fn test_missing_primary_recovers_without_deleting() {
        let (_dir, handle) = setup();
        fs::write(handle.backup(), encode_record(b"old")).unwrap();

        let mut buf = [0u8; 3];
        let outcome = pickup(&handle, &mut buf, DEFAULT_SIZE_LIMIT).unwrap();
        assert!(outcome.recovered);
        assert_eq!(&buf, b"old");
        assert!(handle.backup().exists());
    }

    #[test]
    fn test_corrupt_primary_is_pruned() {
        let (_dir, handle) = setup();
        fs::write(handle.primary(), b"garbage").unwrap();
        fs::write(handle.backup(), encode_record(b"old")).unwrap();

        let mut buf = [0u8; 3];
        let outcome = pickup(&handle, &mut buf, DEFAULT_SIZE_LIMIT).unwrap();
        assert!(outcome.recovered);
        assert!(!handle.primary().exists());
        assert!(handle.backup().exists());
    }

    #[test]
    fn test_corrupt_backup_is_pruned_not_primary() {
        let (_dir, handle) = setup();
        fs::write(handle.backup(), b"garbage").unwrap();

        let mut buf = [0u8; 3];
        let err = pickup(&handle, &mut buf, DEFAULT_SIZE_LIMIT).unwrap_err();
        assert!(matches!(
            err,
            RefopError::Broken {
                primary: ReadError::NotFound,
                backup: ReadError::TruncatedHeader { .. },
            }
        ));
        assert!(!handle.backup().exists());
    }

    #[test]
    fn test_no_files_is_no_entry() {
        let (_dir, handle) = setup();
        let mut buf = [0u8; 3];
        let err = pickup(&handle, &mut buf, DEFAULT_SIZE_LIMIT).unwrap_err();
        assert!(matches!(err, RefopError::NoEntry));
    }

    #[test]
    fn test_both_corrupt_is_broken_and_pruned() {
        let (_dir, handle) = setup();
        let mut record = encode_record(b"abcd");
        let last = record.len() - 1;
        record[last] ^= 0x10;
        fs::write(handle.primary(), &record).unwrap();
        fs::write(handle.backup(), &record).unwrap();

        let mut buf = [0u8; 4];
        let err = pickup(&handle, &mut buf, DEFAULT_SIZE_LIMIT).unwrap_err();
        assert!(matches!(err, RefopError::Broken { .. }));
        assert!(!handle.primary().exists());
        assert!(!handle.backup().exists());

        // Once pruned, the store reads as empty.
        let err = pickup(&handle, &mut buf, DEFAULT_SIZE_LIMIT).unwrap_err();
        assert!(matches!(err, RefopError::NoEntry));
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_primary_is_kept() {
        let (dir, handle) = setup();
        let target = dir.path().join("elsewhere");
        fs::write(&target, encode_record(b"new")).unwrap();
        std::os::unix::fs::symlink(&target, handle.primary()).unwrap();
        fs::write(handle.backup(), encode_record(b"old")).unwrap();

        let mut buf = [0u8; 3];
        let outcome = pickup(&handle, &mut buf, DEFAULT_SIZE_LIMIT).unwrap();
        assert!(outcome.recovered);
        assert!(fs::symlink_metadata(handle.primary()).is_ok());
    }

    #[test]
    fn test_pickup_vec_falls_back_to_backup() {
        let (_dir, handle) = setup();
        fs::write(handle.primary(), b"garbage").unwrap();
        fs::write(handle.backup(), encode_record(b"previous")).unwrap();

        let (value, recovered) = pickup_vec(&handle, u64::MAX).unwrap();
        assert_eq!(value, b"previous");
        assert!(recovered);
        assert!(!handle.primary().exists());
    }

    #[test]
    fn test_pickup_vec_empty_store() {
        let (_dir, handle) = setup();
        let err = pickup_vec(&handle, DEFAULT_SIZE_LIMIT).unwrap_err();
        assert!(matches!(err, RefopError::NoEntry));
    }
}
