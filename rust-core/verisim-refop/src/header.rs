// SPDX-License-Identifier: PMPL-1.0-or-later
//
// VeriSim Refop - Record header codec
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Every generation file starts with a fixed 32-byte header followed by the
// payload. Each scalar field is paired with its bitwise complement, so a
// corrupted header is detected before the payload is read or hashed.
//
// On-disk header format (all integers little-endian, packed):
//   [4 bytes: magic (u32)]          -- 0x96962323
//   [4 bytes: version (u32)]        -- 1
//   [4 bytes: version_inv (u32)]    -- !version
//   [2 bytes: crc16 (u16)]          -- CRC-16 of the payload
//   [2 bytes: crc16_inv (u16)]      -- !crc16
//   [8 bytes: size (u64)]           -- payload length in bytes
//   [8 bytes: size_inv (u64)]       -- !size

/// Constant format tag at the start of every record.
pub const HEADER_MAGIC: u32 = 0x9696_2323;

/// The only supported header format version.
pub const HEADER_VERSION: u32 = 1;

/// Size of the encoded header in bytes.
pub const HEADER_SIZE: usize = 32;

/// The fixed-size record header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    /// Format tag, must equal [`HEADER_MAGIC`].
    pub magic: u32,
    /// Format version.
    pub version: u32,
    /// Complement of `version`.
    pub version_inv: u32,
    /// CRC-16 of the payload.
    pub crc16: u16,
    /// Complement of `crc16`.
    pub crc16_inv: u16,
    /// Payload length in bytes.
    pub size: u64,
    /// Complement of `size`.
    pub size_inv: u64,
}

impl RecordHeader {
    /// Build a well-formed header for a payload with the given CRC and size.
    pub fn encode(crc16: u16, size: u64) -> Self {
        Self {
            magic: HEADER_MAGIC,
            version: HEADER_VERSION,
            version_inv: !HEADER_VERSION,
            crc16,
            crc16_inv: !crc16,
            size,
            size_inv: !size,
        }
    }

    /// Check magic, version and every complement pair. The payload is not
    /// inspected.
    pub fn validate(&self) -> bool {
        self.magic == HEADER_MAGIC
            && self.version == !self.version_inv
            && self.version == HEADER_VERSION
            && self.crc16 == !self.crc16_inv
            && self.size == !self.size_inv
    }

    /// Serialize to the on-disk layout.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[0..4].copy_from_slice(&self.magic.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.version.to_le_bytes());
        bytes[8..12].copy_from_slice(&self.version_inv.to_le_bytes());
        bytes[12..14].copy_from_slice(&self.crc16.to_le_bytes());
        bytes[14..16].copy_from_slice(&self.crc16_inv.to_le_bytes());
        bytes[16..24].copy_from_slice(&self.size.to_le_bytes());
        bytes[24..32].copy_from_slice(&self.size_inv.to_le_bytes());
        bytes
    }

    /// Deserialize from the on-disk layout. Never fails; call
    /// [`RecordHeader::validate`] on the result.
    pub fn from_bytes(bytes: &[u8; HEADER_SIZE]) -> Self {
        let u32_at = |at: usize| {
            u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
        };
        let u16_at = |at: usize| u16::from_le_bytes([bytes[at], bytes[at + 1]]);
        let u64_at = |at: usize| {
            let mut word = [0u8; 8];
            word.copy_from_slice(&bytes[at..at + 8]);
            u64::from_le_bytes(word)
        };

        Self {
            magic: u32_at(0),
            version: u32_at(4),
            version_inv: u32_at(8),
            crc16: u16_at(12),
            crc16_inv: u16_at(14),
            size: u64_at(16),
            size_inv: u64_at(24),
        }
    }
}
