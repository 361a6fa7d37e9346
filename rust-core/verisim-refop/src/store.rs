// SPDX-License-Identifier: PMPL-1.0-or-later
//
// VeriSim Refop - Public store API
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// `Refop` ties a path handle to a configuration and exposes the three store
// operations:
//
//   set    -> write staging, fsync, rotate generations, fsync directory
//   get    -> read primary, fall back to backup, prune corrupt files
//   remove -> unlink staging, primary and backup

use std::ffi::OsStr;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::config::RefopConfig;
use crate::error::{RefopError, RefopResult, RefopStatus};
use crate::handle::RefopHandle;
use crate::pickup::{pickup, pickup_vec};
use crate::rotation::{probe, remove_best_effort, rotate, FileState};
use crate::writer::write_staging;

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Result of a successful `get`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetOutcome {
    /// Bytes copied into the caller's buffer.
    pub len: usize,
    /// `true` when the value was read from the backup generation.
    pub recovered: bool,
}

impl GetOutcome {
    /// `Success` or `Recovered`.
    pub fn status(&self) -> RefopStatus {
        if self.recovered {
            RefopStatus::Recovered
        } else {
            RefopStatus::Success
        }
    }
}

/// Which files of the set currently exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationState {
    /// State of the primary generation.
    pub primary: FileState,
    /// State of the backup generation.
    pub backup: FileState,
    /// State of the staging file.
    pub staging: FileState,
}

// ---------------------------------------------------------------------------
// Refop
// ---------------------------------------------------------------------------

/// A single value stored redundantly across a primary and a backup file.
///
/// `Refop` is not internally synchronized. Calls touching the same files
/// must be serialized by the caller.
#[derive(Debug, Clone)]
pub struct Refop {
    handle: RefopHandle,
    config: RefopConfig,
}

impl Refop {
    /// Build a store from an existing handle.
    pub fn new(handle: RefopHandle, config: RefopConfig) -> Self {
        Self { handle, config }
    }

    /// Resolve the handle for `filename` in `directory` and build a store.
    pub fn open(
        directory: impl AsRef<Path>,
        filename: impl AsRef<OsStr>,
        config: RefopConfig,
    ) -> RefopResult<Self> {
        Ok(Self::new(RefopHandle::new(directory, filename)?, config))
    }

    /// The underlying path handle.
    pub fn handle(&self) -> &RefopHandle {
        &self.handle
    }

    /// The store configuration.
    pub fn config(&self) -> &RefopConfig {
        &self.config
    }

    /// Store `payload` as the new latest generation.
    ///
    /// # Errors
    ///
    /// - `SizeLimitExceeded` if `payload` is empty or larger than the
    ///   configured limit.
    /// - `Io` if the staging write or the rotation fails. A failed rotation
    ///   removes the staging file.
    pub fn set(&self, payload: &[u8]) -> RefopResult<()> {
        write_staging(&self.handle, payload, &self.config)?;

        match rotate(&self.handle) {
            Ok(case) => {
                debug!(bytes = payload.len(), ?case, "Stored new generation");
                Ok(())
            }
            Err(e) => {
                remove_best_effort(self.handle.staging());
                Err(e)
            }
        }
    }

    /// Read the latest valid generation into `buf`.
    ///
    /// If the stored payload is longer than `buf`, only the first
    /// `buf.len()` bytes are copied.
    ///
    /// # Errors
    ///
    /// - `NoEntry` if nothing is stored.
    /// - `Broken` if every stored generation is corrupt or unreadable.
    pub fn get(&self, buf: &mut [u8]) -> RefopResult<GetOutcome> {
        let outcome = pickup(&self.handle, buf, self.config.size_limit)?;
        Ok(GetOutcome {
            len: outcome.len,
            recovered: outcome.recovered,
        })
    }

    /// Read the latest valid generation into a new vector.
    ///
    /// The vector is sized from the stored record, so the full payload is
    /// returned whatever the configured limit.
    pub fn get_vec(&self) -> RefopResult<(Vec<u8>, bool)> {
        pickup_vec(&self.handle, self.config.size_limit)
    }

    /// Delete staging, primary and backup.
    ///
    /// Missing files are not an error. Every file is attempted even if an
    /// earlier removal fails.
    ///
    /// # Errors
    ///
    /// Returns the first removal failure other than "not found".
    pub fn remove(&self) -> RefopResult<()> {
        let mut first_error = None;

        for path in [self.handle.staging(), self.handle.primary(), self.handle.backup()] {
            match fs::remove_file(path) {
                Ok(()) => debug!(path = %path.display(), "Removed file"),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to remove file");
                    if first_error.is_none() {
                        first_error = Some(RefopError::io(
                            format!("failed to remove '{}'", path.display()),
                            e,
                        ));
                    }
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                info!(primary = %self.handle.primary().display(), "Removed stored value");
                Ok(())
            }
        }
    }

    /// Probe which files of the set exist.
    pub fn inspect(&self) -> GenerationState {
        GenerationState {
            primary: probe(self.handle.primary()),
            backup: probe(self.handle.backup()),
            staging: probe(self.handle.staging()),
        }
    }
}
