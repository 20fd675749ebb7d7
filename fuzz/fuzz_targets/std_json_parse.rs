//! Fuzz target for canonical JSON parsing.
//!
//! This fuzzer feeds arbitrary byte sequences to the canonical JSON reader,
//! checking for panics, crashes, or hangs.

#![no_main]

use cvconv::conversion::ConversionReport;
use cvconv::ir::io_std_json::from_std_json_slice;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    let mut report = ConversionReport::default();
    let _ = from_std_json_slice(data, &mut report);
});
