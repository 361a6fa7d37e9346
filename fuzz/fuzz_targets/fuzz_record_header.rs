// SPDX-License-Identifier: PMPL-1.0-or-later
// Fuzz target for record header decoding and validation

#![no_main]

use libfuzzer_sys::fuzz_target;
use verisim_refop::{RecordHeader, HEADER_SIZE};

fuzz_target!(|data: &[u8]| {
    let Some(bytes) = data.get(..HEADER_SIZE) else {
        return;
    };
    let Ok(bytes) = <[u8; HEADER_SIZE]>::try_from(bytes) else {
        return;
    };

    let header = RecordHeader::from_bytes(&bytes);

    // A header that validates must survive re-encoding unchanged.
    if header.validate() {
        assert_eq!(header.to_bytes(), bytes);
        assert_eq!(RecordHeader::encode(header.crc16, header.size), header);
    }
});
