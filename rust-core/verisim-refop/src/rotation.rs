// SPDX-License-Identifier: PMPL-1.0-or-later
//
// VeriSim Refop - Generation rotation
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Promotes a durable staging file into the primary slot. The previous
// primary, when present, becomes the backup:
//
//        current                   next
//   | primary | backup |     | primary | backup |
//   |    1    |    2   |  -> |   new   |    1   |   BothPresent
//   |    1    |    -   |  -> |   new   |    1   |   PrimaryOnly
//   |    -    |    2   |  -> |   new   |    2   |   BackupOnly
//   |    -    |    -   |  -> |   new   |    -   |   Empty
//
// Individual renames and removals are best-effort. Only an ambiguous
// existence probe aborts the rotation.

use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind};
use std::path::Path;

use tracing::{debug, warn};

use crate::error::{RefopError, RefopResult};
use crate::handle::RefopHandle;

// ---------------------------------------------------------------------------
// FileState
// ---------------------------------------------------------------------------

/// Result of probing a generation file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    /// The file exists.
    Present,
    /// The file does not exist.
    Absent,
    /// The probe failed for a reason other than "not found".
    Unknown,
}

/// Probe whether `path` exists.
pub fn probe(path: &Path) -> FileState {
    match fs::metadata(path) {
        Ok(_) => FileState::Present,
        Err(e) if e.kind() == ErrorKind::NotFound => FileState::Absent,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "File probe failed");
            FileState::Unknown
        }
    }
}

// ---------------------------------------------------------------------------
// RotationCase
// ---------------------------------------------------------------------------

/// Which branch of the rotation matrix was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationCase {
    /// Primary and backup existed; the old backup was discarded.
    BothPresent,
    /// Only the primary existed; it became the backup.
    PrimaryOnly,
    /// Only the backup existed; it was kept.
    BackupOnly,
    /// Neither existed.
    Empty,
}

/// Promote the staging file into the primary slot.
///
/// # Errors
///
/// Returns `Io` only when the primary or backup probe is `Unknown`; the
/// file set is left untouched in that case.
pub fn rotate(handle: &RefopHandle) -> RefopResult<RotationCase> {
    let primary = handle.primary();
    let backup = handle.backup();
    let staging = handle.staging();

    let primary_state = probe(primary);
    let backup_state = probe(backup);

    let case = match (primary_state, backup_state) {
        (FileState::Unknown, _) => return Err(probe_error(primary)),
        (_, FileState::Unknown) => return Err(probe_error(backup)),
        (FileState::Present, FileState::Present) => RotationCase::BothPresent,
        (FileState::Present, FileState::Absent) => RotationCase::PrimaryOnly,
        (FileState::Absent, FileState::Present) => RotationCase::BackupOnly,
        (FileState::Absent, FileState::Absent) => RotationCase::Empty,
    };

    match case {
        RotationCase::BothPresent => {
            remove_best_effort(backup);
            rename_best_effort(primary, backup);
            rename_best_effort(staging, primary);
        }
        RotationCase::PrimaryOnly => {
            rename_best_effort(primary, backup);
            rename_best_effort(staging, primary);
        }
        RotationCase::BackupOnly | RotationCase::Empty => {
            rename_best_effort(staging, primary);
        }
    }

    if let Err(e) = sync_directory(handle.basedir()) {
        warn!(
            dir = %handle.basedir().display(),
            error = %e,
            "Failed to sync directory after rotation"
        );
    }

    debug!(primary = %primary.display(), ?case, "Rotated generations");

    Ok(case)
}

/// Remove `path`, logging any failure other than "not found".
///
/// Returns `true` if the file is gone afterwards.
pub(crate) fn remove_best_effort(path: &Path) -> bool {
    match fs::remove_file(path) {
        Ok(()) => true,
        Err(e) if e.kind() == ErrorKind::NotFound => true,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to remove file");
            false
        }
    }
}

fn rename_best_effort(from: &Path, to: &Path) {
    if let Err(e) = fs::rename(from, to) {
        warn!(
            from = %from.display(),
            to = %to.display(),
            error = %e,
            "Failed to rename file"
        );
    }
}

fn probe_error(path: &Path) -> RefopError {
    let source = fs::metadata(path)
        .err()
        .unwrap_or_else(|| io::Error::other("file state changed during probe"));
    RefopError::io(
        format!("cannot determine state of '{}'", path.display()),
        source,
    )
}

/// fsync a directory so renames inside it survive power loss.
fn sync_directory(dir: &Path) -> io::Result<()> {
    let mut options = OpenOptions::new();
    options.read(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.custom_flags(libc::O_DIRECTORY | libc::O_NOFOLLOW | libc::O_CLOEXEC);
    }

    let directory: File = options.open(dir)?;
    directory.sync_all()
}
