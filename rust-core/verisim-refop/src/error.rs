// SPDX-License-Identifier: PMPL-1.0-or-later
//
// VeriSim Refop - Error types
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Two layers of errors: `ReadError` describes why a single generation file
// could not be used, `RefopError` is what callers of the store see. Every
// `RefopError` collapses to exactly one `RefopStatus` code.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

// ---------------------------------------------------------------------------
// RefopStatus
// ---------------------------------------------------------------------------

/// Terminal status of a store operation.
///
/// The numeric values are stable and are used as process exit codes by the
/// `refop` command-line tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum RefopStatus {
    /// The operation succeeded.
    Success = 0,
    /// The operation succeeded, but only by falling back to the backup
    /// generation.
    Recovered = 1,
    /// The target file or directory does not exist.
    NoEntry = -1,
    /// Every stored generation was corrupt or unreadable.
    Broken = -2,
    /// The caller passed an invalid argument.
    ArgError = -3,
    /// An internal operation failed (I/O, out of space, ...).
    SystemError = -100,
}

impl RefopStatus {
    /// The numeric status code.
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Returns `true` for `Success` and `Recovered`.
    pub fn is_ok(self) -> bool {
        matches!(self, Self::Success | Self::Recovered)
    }
}

impl fmt::Display for RefopStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Success => "success",
            Self::Recovered => "recovered",
            Self::NoEntry => "no entry",
            Self::Broken => "broken",
            Self::ArgError => "argument error",
            Self::SystemError => "system error",
        };
        write!(f, "{name} ({})", self.code())
    }
}

// ---------------------------------------------------------------------------
// ReadError
// ---------------------------------------------------------------------------

/// Why a single generation file could not be read.
#[derive(Debug, Error)]
pub enum ReadError {
    /// The file does not exist.
    #[error("file not found")]
    NotFound,

    /// The file exists but could not be opened or read.
    #[error("file unreadable: {0}")]
    Unreadable(#[source] io::Error),

    /// Fewer bytes than a full header were present.
    #[error("truncated header: read {read} of {expected} bytes")]
    TruncatedHeader {
        /// Bytes actually read.
        read: usize,
        /// Size of a complete header.
        expected: usize,
    },

    /// The payload ended before the size declared in the header.
    #[error("truncated payload: read {read} of {expected} bytes")]
    TruncatedPayload {
        /// Payload size declared in the header.
        expected: u64,
        /// Bytes actually read.
        read: usize,
    },

    /// The header failed its magic, version, or complement checks.
    #[error("invalid record header")]
    InvalidHeader,

    /// The header declares a payload larger than the configured limit.
    #[error("record of {size} bytes exceeds limit of {limit} bytes")]
    RecordTooLarge {
        /// Declared payload size.
        size: u64,
        /// Configured size limit.
        limit: u64,
    },

    /// The payload CRC-16 does not match the header.
    #[error("payload CRC mismatch: expected {expected:#06x}, got {actual:#06x}")]
    PayloadCorrupt {
        /// CRC stored in the header.
        expected: u16,
        /// CRC computed from the payload.
        actual: u16,
    },
}

impl ReadError {
    /// Returns `true` when the file exists but its content is unusable.
    ///
    /// Files failing with a corruption-class error are pruned by the pickup
    /// engine. `NotFound` and `Unreadable` are not corruption.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Self::TruncatedHeader { .. }
                | Self::TruncatedPayload { .. }
                | Self::InvalidHeader
                | Self::RecordTooLarge { .. }
                | Self::PayloadCorrupt { .. }
        )
    }

    /// Returns `true` for `NotFound`.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

// ---------------------------------------------------------------------------
// RefopError
// ---------------------------------------------------------------------------

/// Errors returned by the redundant store.
#[derive(Debug, Error)]
pub enum RefopError {
    /// The caller passed an invalid argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The payload is empty or larger than the configured size limit.
    #[error("payload of {size} bytes outside allowed range 1..={limit}")]
    SizeLimitExceeded {
        /// Payload size in bytes.
        size: u64,
        /// Configured size limit.
        limit: u64,
    },

    /// The storage directory does not exist or is not traversable.
    #[error("directory not found or inaccessible: {}", .0.display())]
    NotFound(PathBuf),

    /// Neither the primary nor the backup generation exists.
    #[error("no stored data")]
    NoEntry,

    /// No generation could be read and at least one was corrupt or
    /// unreadable.
    #[error("stored data is broken (primary: {primary}; backup: {backup})")]
    Broken {
        /// Failure reading the primary generation.
        primary: ReadError,
        /// Failure reading the backup generation.
        backup: ReadError,
    },

    /// An I/O operation failed with no recovery path.
    #[error("{context}: {source}")]
    Io {
        /// What was being attempted.
        context: String,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
}

impl RefopError {
    /// Build an `Io` error with context.
    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// The public status this error collapses to.
    pub fn status(&self) -> RefopStatus {
        match self {
            Self::InvalidArgument(_) | Self::SizeLimitExceeded { .. } => RefopStatus::ArgError,
            Self::NotFound(_) | Self::NoEntry => RefopStatus::NoEntry,
            Self::Broken { .. } => RefopStatus::Broken,
            Self::Io { .. } => RefopStatus::SystemError,
        }
    }
}

/// Convenience type alias for store results.
pub type RefopResult<T> = Result<T, RefopError>;
