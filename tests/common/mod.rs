#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

/// Path of a file under `tests/fixtures`.
pub fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

/// A blank 24-bit BMP of the given size. Only the headers matter for
/// dimension probing; the pixel array is zero-filled.
pub fn bmp_bytes(width: u32, height: u32) -> Vec<u8> {
    let row_stride = (width * 3).div_ceil(4) * 4;
    let pixels = row_stride * height;
    let file_size = 54 + pixels;

    let mut bytes = Vec::with_capacity(file_size as usize);
    // File header.
    bytes.extend_from_slice(b"BM");
    bytes.extend_from_slice(&file_size.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&54u32.to_le_bytes());
    // BITMAPINFOHEADER.
    for field in [40, width as i32, height as i32] {
        bytes.extend_from_slice(&field.to_le_bytes());
    }
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&24u16.to_le_bytes());
    for field in [0, pixels, 2835, 2835, 0, 0] {
        bytes.extend_from_slice(&field.to_le_bytes());
    }

    bytes.resize(file_size as usize, 0);
    bytes
}

/// Writes a blank image so `dsv2std --images` has something to probe. The
/// content is BMP whatever the extension; size probing goes by content.
pub fn write_image(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    fs::write(path, bmp_bytes(width, height)).expect("write image file");
}
