//! Coordinate transforms between the canonical box form and named formats.
//!
//! The canonical form is `(x, y, width, height)` with a top-left anchor in
//! pixel units, i.e. the COCO layout. Every other [`BoxFormat`] is reached by
//! an exact algebraic map from it, and relative formats additionally divide
//! x-axis values by the image width and y-axis values by the image height.

use serde::{Deserialize, Serialize};

use super::format::BoxFormat;
use crate::error::ConvertError;

/// Width and height of an image in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    /// Creates a new image size.
    #[inline]
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    fn scale(self) -> (f64, f64) {
        (self.width as f64, self.height as f64)
    }
}

/// Converts values given in `format` into the canonical COCO form.
///
/// Relative formats are first multiplied by the image dimensions and then
/// mapped like their absolute counterpart.
///
/// # Errors
/// Returns [`ConvertError::InvalidArity`] unless exactly four values are
/// given, and [`ConvertError::MissingImageSize`] when a relative format is
/// requested without a usable image size.
pub fn to_canonical(
    values: &[f64],
    format: BoxFormat,
    image: Option<ImageSize>,
) -> Result<[f64; 4], ConvertError> {
    let [a, b, c, d] = four(values)?;

    let [a, b, c, d] = if format.is_relative() {
        let (w, h) = relative_scale(format, image)?;
        [a * w, b * h, c * w, d * h]
    } else {
        [a, b, c, d]
    };

    Ok(match format.absolute() {
        BoxFormat::Voc => [a, b, c - a, d - b],
        BoxFormat::Center => [a - c / 2.0, b - d / 2.0, c, d],
        _ => [a, b, c, d],
    })
}

/// Converts canonical COCO values into `format`.
///
/// Relative formats apply the absolute map first and then divide by the
/// image dimensions.
///
/// # Errors
/// Same conditions as [`to_canonical`].
pub fn from_canonical(
    canonical: &[f64],
    format: BoxFormat,
    image: Option<ImageSize>,
) -> Result<[f64; 4], ConvertError> {
    let [x, y, w, h] = four(canonical)?;

    let [a, b, c, d] = match format.absolute() {
        BoxFormat::Voc => [x, y, x + w, y + h],
        BoxFormat::Center => [x + w / 2.0, y + h / 2.0, w, h],
        _ => [x, y, w, h],
    };

    if format.is_relative() {
        let (iw, ih) = relative_scale(format, image)?;
        Ok([a / iw, b / ih, c / iw, d / ih])
    } else {
        Ok([a, b, c, d])
    }
}

/// Pairs the values of a tuple with the named keys of `format`.
pub fn values_to_named(values: [f64; 4], format: BoxFormat) -> [(&'static str, f64); 4] {
    let names = format.value_names();
    [
        (names[0], values[0]),
        (names[1], values[1]),
        (names[2], values[2]),
        (names[3], values[3]),
    ]
}

/// Extracts the four values of `format` from a keyed lookup.
///
/// Returns `None` if any of the format's keys cannot be resolved.
pub fn named_to_values<F>(format: BoxFormat, mut lookup: F) -> Option<[f64; 4]>
where
    F: FnMut(&str) -> Option<f64>,
{
    let [n1, n2, n3, n4] = format.value_names();
    Some([lookup(n1)?, lookup(n2)?, lookup(n3)?, lookup(n4)?])
}

fn four(values: &[f64]) -> Result<[f64; 4], ConvertError> {
    <[f64; 4]>::try_from(values).map_err(|_| ConvertError::InvalidArity {
        found: values.len(),
    })
}

fn relative_scale(format: BoxFormat, image: Option<ImageSize>) -> Result<(f64, f64), ConvertError> {
    match image {
        Some(size) if size.width > 0 && size.height > 0 => Ok(size.scale()),
        _ => Err(ConvertError::MissingImageSize { format }),
    }
}
