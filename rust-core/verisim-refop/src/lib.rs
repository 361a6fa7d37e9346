// SPDX-License-Identifier: PMPL-1.0-or-later
//
// VeriSim Refop - Redundant two-generation file store
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Persists one configuration-like value so that it survives a crash or a
// partial write at any point. The value is kept in two generations, a
// primary and a backup, and reads fall back from one to the other.
//
// # Architecture
//
// `set` never modifies a live generation in place:
//
// 1. The record is written to `<name>.tmp` and fsynced.
// 2. The old primary is renamed to `<name>.bk1` (discarding the previous
//    backup) and the staging file is renamed to `<name>`.
// 3. The directory is fsynced so the renames are durable.
//
// `get` validates the primary, falls back to the backup, and deletes any
// generation proven corrupt.
//
// ## On-disk record format (all integers little-endian)
//
// ```text
// [4 bytes: magic (u32)]        -- 0x96962323
// [4 bytes: version (u32)]      -- 1
// [4 bytes: !version (u32)]
// [2 bytes: crc16 (u16)]        -- CRC-16 of the payload, seed 0xFFFF
// [2 bytes: !crc16 (u16)]
// [8 bytes: size (u64)]         -- payload length
// [8 bytes: !size (u64)]
// [N bytes: payload]
// ```
//
// ## Usage
//
// ```no_run
// use verisim_refop::{Refop, RefopConfig};
//
// let store = Refop::open("/var/lib/app", "settings.bin", RefopConfig::default()).unwrap();
// store.set(b"mode=fast").unwrap();
//
// let mut buf = [0u8; 64];
// let outcome = store.get(&mut buf).unwrap();
// println!("{} bytes, recovered={}", outcome.len, outcome.recovered);
//
// store.remove().unwrap();
// ```

pub mod config;
pub mod crc16;
pub mod error;
pub mod handle;
pub mod header;
pub mod io_util;
pub mod pickup;
pub mod reader;
pub mod rotation;
pub mod store;
pub mod writer;

// Re-export the primary public API for ergonomic imports.
pub use config::{RefopConfig, DEFAULT_SIZE_LIMIT};
pub use error::{ReadError, RefopError, RefopResult, RefopStatus};
pub use handle::RefopHandle;
pub use header::{RecordHeader, HEADER_MAGIC, HEADER_SIZE, HEADER_VERSION};
pub use pickup::PickupOutcome;
pub use rotation::{FileState, RotationCase};
pub use store::{GenerationState, GetOutcome, Refop};
