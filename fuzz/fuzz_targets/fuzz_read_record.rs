// SPDX-License-Identifier: PMPL-1.0-or-later
// Fuzz target for reading arbitrary generation files

#![no_main]

use libfuzzer_sys::fuzz_target;
use verisim_refop::reader::{read_record, read_validated};

fuzz_target!(|data: &[u8]| {
    let Ok(dir) = tempfile::TempDir::new() else {
        return;
    };
    let path = dir.path().join("fuzz.bin");
    if std::fs::write(&path, data).is_err() {
        return;
    }

    // Small buffer and limit exercise both the direct and truncating paths.
    let mut buf = [0u8; 64];
    let prefix = read_validated(&path, &mut buf, 4096).map(|n| buf[..n].to_vec());

    // The record reader must agree with the buffered reader on the prefix,
    // even with no limit.
    if let (Ok(prefix), Ok(full)) = (prefix, read_record(&path, u64::MAX)) {
        assert!(full.starts_with(&prefix));
    }
});
