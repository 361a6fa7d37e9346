// SPDX-License-Identifier: PMPL-1.0-or-later
//
// VeriSim Refop - Path handle
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// A handle resolves the on-disk file set for one stored value:
//
//   <dir>/<name>        primary (latest generation)
//   <dir>/<name>.bk1    backup (previous generation)
//   <dir>/<name>.tmp    staging (exists only during `set`)
//
// Paths are derived once and never change. The handle performs no I/O
// after the directory existence check in `new`.

use std::ffi::OsStr;
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf, MAIN_SEPARATOR_STR};

use tracing::debug;

use crate::error::{RefopError, RefopResult};

/// Suffix of the backup generation file.
pub const BACKUP_SUFFIX: &str = ".bk1";

/// Suffix of the staging file.
pub const STAGING_SUFFIX: &str = ".tmp";

/// Room reserved for any file suffix when checking path length.
pub const MAX_SUFFIX_LEN: usize = 10;

#[cfg(unix)]
const PATH_MAX: usize = libc::PATH_MAX as usize;

#[cfg(not(unix))]
const PATH_MAX: usize = 260;

/// Resolved file paths for one redundantly stored value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefopHandle {
    basedir: PathBuf,
    primary: PathBuf,
    backup: PathBuf,
    staging: PathBuf,
}

impl RefopHandle {
    /// Derive the file set for `filename` inside `directory`.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if either argument is empty or the resulting
    ///   paths would exceed the platform path length limit.
    /// - `NotFound` if `directory` does not exist, is not a directory, or
    ///   cannot be traversed.
    /// - `Io` for any other failure while probing `directory`.
    pub fn new(directory: impl AsRef<Path>, filename: impl AsRef<OsStr>) -> RefopResult<Self> {
        let directory = directory.as_ref();
        let filename = filename.as_ref();

        if directory.as_os_str().is_empty() {
            return Err(RefopError::InvalidArgument("directory is empty".into()));
        }
        if filename.is_empty() {
            return Err(RefopError::InvalidArgument("filename is empty".into()));
        }

        let dir_len = directory.as_os_str().len();
        let file_len = filename.len();
        if dir_len + file_len + MAX_SUFFIX_LEN + 1 > PATH_MAX {
            return Err(RefopError::InvalidArgument(format!(
                "path of {} bytes exceeds limit of {PATH_MAX}",
                dir_len + file_len
            )));
        }

        match fs::metadata(directory) {
            Ok(metadata) if metadata.is_dir() => {}
            Ok(_) => return Err(RefopError::NotFound(directory.to_path_buf())),
            Err(e) => return Err(map_stat_error(directory, e)),
        }

        let mut basedir = directory.as_os_str().to_os_string();
        if !ends_with_separator(&basedir) {
            basedir.push(MAIN_SEPARATOR_STR);
        }

        let mut primary = basedir.clone();
        primary.push(filename);

        let handle = Self {
            basedir: PathBuf::from(basedir),
            backup: with_suffix(&primary, BACKUP_SUFFIX),
            staging: with_suffix(&primary, STAGING_SUFFIX),
            primary: PathBuf::from(primary),
        };

        debug!(primary = %handle.primary.display(), "Created refop handle");

        Ok(handle)
    }

    /// Release the handle. Equivalent to dropping it.
    pub fn release(self) {
        debug!(primary = %self.primary.display(), "Released refop handle");
    }

    /// The containing directory, always ending with a separator.
    pub fn basedir(&self) -> &Path {
        &self.basedir
    }

    /// The primary (latest) generation file.
    pub fn primary(&self) -> &Path {
        &self.primary
    }

    /// The backup (previous) generation file.
    pub fn backup(&self) -> &Path {
        &self.backup
    }

    /// The staging file used while a new value is written.
    pub fn staging(&self) -> &Path {
        &self.staging
    }
}

fn with_suffix(primary: &OsStr, suffix: &str) -> PathBuf {
    let mut path = primary.to_os_string();
    path.push(suffix);
    PathBuf::from(path)
}

fn ends_with_separator(path: &OsStr) -> bool {
    path.as_encoded_bytes()
        .last()
        .is_some_and(|&byte| byte == b'/' || (cfg!(windows) && byte == b'\\'))
}

/// Map a failed directory probe to the store's error taxonomy.
fn map_stat_error(directory: &Path, error: io::Error) -> RefopError {
    if matches!(error.kind(), ErrorKind::NotFound | ErrorKind::PermissionDenied) {
        return RefopError::NotFound(directory.to_path_buf());
    }

    #[cfg(unix)]
    match error.raw_os_error() {
        Some(libc::ELOOP) | Some(libc::ENOTDIR) => {
            return RefopError::NotFound(directory.to_path_buf());
        }
        Some(libc::ENAMETOOLONG) => {
            return RefopError::InvalidArgument(format!(
                "directory name too long: {}",
                directory.display()
            ));
        }
        _ => {}
    }

    RefopError::io(
        format!("failed to probe directory '{}'", directory.display()),
        error,
    )
}
