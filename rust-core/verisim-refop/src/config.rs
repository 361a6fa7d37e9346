// SPDX-License-Identifier: PMPL-1.0-or-later
//! Store configuration.
//!
//! The only tunable is the maximum payload size. It is injected when a
//! [`crate::Refop`] is built and never changes afterwards.

use serde::{Deserialize, Serialize};

/// Default maximum payload size: 1 MiB.
pub const DEFAULT_SIZE_LIMIT: u64 = 1024 * 1024;

/// Configuration for a redundant store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefopConfig {
    /// Largest payload, in bytes, that `set` accepts and `get` will buffer.
    pub size_limit: u64,
}

impl RefopConfig {
    /// Replace the size limit.
    pub fn with_size_limit(mut self, size_limit: u64) -> Self {
        self.size_limit = size_limit;
        self
    }
}

impl Default for RefopConfig {
    fn default() -> Self {
        Self {
            size_limit: DEFAULT_SIZE_LIMIT,
        }
    }
}
