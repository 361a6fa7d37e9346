// SPDX-License-Identifier: PMPL-1.0-or-later
//
// VeriSim Refop - CRC-16 payload checksum
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Reflected CRC-16 (polynomial 0x8005, reversed form 0xA001), no final xor.
// Seeded with 0xFFFF this is the CRC-16/MODBUS parameter set.

/// Seed used for every record payload.
pub const CRC16_SEED: u16 = 0xFFFF;

const CRC16_POLY_REFLECTED: u16 = 0xA001;

const CRC16_TABLE: [u16; 256] = build_table();

const fn build_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut byte = 0;
    while byte < 256 {
        let mut crc = byte as u16;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 1 != 0 {
                (crc >> 1) ^ CRC16_POLY_REFLECTED
            } else {
                crc >> 1
            };
            bit += 1;
        }
        table[byte] = crc;
        byte += 1;
    }
    table
}

/// Continue a CRC-16 computation over `data`.
pub(crate) fn crc16_update(mut crc: u16, data: &[u8]) -> u16 {
    for &byte in data {
        crc = (crc >> 8) ^ CRC16_TABLE[((crc ^ u16::from(byte)) & 0xFF) as usize];
    }
    crc
}

/// CRC-16 of `data` with the record seed.
pub fn crc16(data: &[u8]) -> u16 {
    crc16_update(CRC16_SEED, data)
}
