use std::path::PathBuf;
use thiserror::Error;

use crate::ir::BoxFormat;

/// The main error type for cvconv operations.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse annotation JSON from {path}: {source}")]
    JsonParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write annotation JSON to {path}: {source}")]
    JsonWrite {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to parse configuration from {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Expected exactly 4 box values, found {found}")]
    InvalidArity { found: usize },

    #[error("Missing required field '{field}' in {context}")]
    MissingField {
        field: &'static str,
        context: String,
    },

    #[error("Unsupported box format: {0}")]
    UnsupportedFormat(String),

    #[error("Image width and height must be known for relative format '{format}'")]
    MissingImageSize { format: BoxFormat },

    #[error("Invalid image size for '{filename}': {width}x{height}")]
    InvalidImageSize {
        filename: String,
        width: u64,
        height: u64,
    },

    #[error("Image '{filename}' appears with different sizes: {first_width}x{first_height} and {second_width}x{second_height}")]
    ConflictingImageSize {
        filename: String,
        first_width: u32,
        first_height: u32,
        second_width: u32,
        second_height: u32,
    },

    #[error("Configuration option '{0}' is required for this operation")]
    MissingOption(&'static str),

    #[error("Invalid annotation {index} of image '{image}': {message}")]
    InvalidDsvAnnotation {
        image: String,
        index: usize,
        message: String,
    },

    #[error("Images '{first}' and '{second}' would both be written to {}", path.display())]
    DuplicateOutputFile {
        path: PathBuf,
        first: String,
        second: String,
    },

    #[error("Failed to read image dimensions from {path}: {source}")]
    ImageProbe {
        path: PathBuf,
        #[source]
        source: imagesize::ImageError,
    },
}
