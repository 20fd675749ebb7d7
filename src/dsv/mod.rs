//! Delimiter-separated-values codec.
//!
//! Maps image records to and from text lines under a [`DsvConfig`]:
//! value and annotation delimiters, class and path placement, quoting,
//! one line per annotation or per image, and one file per image or per
//! batch.
//!
//! [`DsvConfig`]: crate::config::DsvConfig

pub mod read;
pub mod token;
pub mod write;

pub use read::{
    build_images, inferred_image_name, parse_line, probe_image_size, read_dsv, read_dsv_str,
    ParsedLine, RawAnnotations,
};
pub use token::{quote_if_necessary, unquote, Token};
pub use write::{
    annotation_file_name, annotation_tokens, bounding_box_tokens, image_lines, image_path_token,
    render_image, render_lines, to_dsv_string, write_dsv, ImageLines,
};
