//! Fuzz target for DSV line parsing and image building.
//!
//! Arbitrary UTF-8 text is read under the default preset and turned into
//! image records, checking for panics, crashes, or hangs.

#![no_main]

use std::sync::OnceLock;

use cvconv::config::{load_config, DsvConfig};
use cvconv::dsv::{build_images, parse_line, read_dsv_str};
use cvconv::ir::ImageSize;
use libfuzzer_sys::fuzz_target;

fn config() -> &'static DsvConfig {
    static CONFIG: OnceLock<DsvConfig> = OnceLock::new();
    CONFIG.get_or_init(|| load_config(None).expect("default preset"))
}

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let config = config();
    for line in text.lines() {
        let _ = parse_line(line, config);
    }

    let raw = read_dsv_str(text, "fuzz.csv", config);
    let _ = build_images(raw, config, |_| Ok(Some(ImageSize::new(640, 480))));
});
