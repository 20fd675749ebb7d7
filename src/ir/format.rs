//! Named bounding box coordinate formats.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConvertError;

/// The external coordinate layouts a bounding box can be read or written in.
///
/// Every format is an ordered 4-tuple. The canonical at-rest form is
/// [`BoxFormat::Coco`]; all others are views produced at the boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoxFormat {
    /// `x, y, width, height` with a top-left anchor, in pixels.
    #[serde(rename = "coco")]
    Coco,
    /// `xMin, yMin, xMax, yMax`, in pixels.
    #[serde(rename = "voc")]
    Voc,
    /// `xCenter, yCenter, width, height`, in pixels.
    #[serde(rename = "center")]
    Center,
    /// COCO layout divided by the image width/height.
    #[serde(rename = "relativeCoco")]
    RelativeCoco,
    /// VOC layout divided by the image width/height.
    #[serde(rename = "relativeVoc")]
    RelativeVoc,
    /// Center layout divided by the image width/height.
    #[serde(rename = "relativeCenter")]
    RelativeCenter,
}

impl BoxFormat {
    /// All supported formats, absolute ones first.
    pub const ALL: [BoxFormat; 6] = [
        BoxFormat::Coco,
        BoxFormat::Voc,
        BoxFormat::Center,
        BoxFormat::RelativeCoco,
        BoxFormat::RelativeVoc,
        BoxFormat::RelativeCenter,
    ];

    /// The serialized name of this format (e.g. `"relativeVoc"`).
    pub fn as_str(self) -> &'static str {
        match self {
            BoxFormat::Coco => "coco",
            BoxFormat::Voc => "voc",
            BoxFormat::Center => "center",
            BoxFormat::RelativeCoco => "relativeCoco",
            BoxFormat::RelativeVoc => "relativeVoc",
            BoxFormat::RelativeCenter => "relativeCenter",
        }
    }

    /// The record keys of the four values, in tuple order.
    ///
    /// The same list is used to build a record from a tuple and to extract a
    /// tuple from a record, so both shapes always agree for a given format.
    pub fn value_names(self) -> [&'static str; 4] {
        match self {
            BoxFormat::Coco => ["x", "y", "width", "height"],
            BoxFormat::Voc => ["xMin", "yMin", "xMax", "yMax"],
            BoxFormat::Center => ["xCenter", "yCenter", "width", "height"],
            BoxFormat::RelativeCoco => ["relX", "relY", "relWidth", "relHeight"],
            BoxFormat::RelativeVoc => ["relXMin", "relYMin", "relXMax", "relYMax"],
            BoxFormat::RelativeCenter => ["relXCenter", "relYCenter", "relWidth", "relHeight"],
        }
    }

    /// Returns true for formats normalized by the image dimensions.
    pub fn is_relative(self) -> bool {
        matches!(
            self,
            BoxFormat::RelativeCoco | BoxFormat::RelativeVoc | BoxFormat::RelativeCenter
        )
    }

    /// The pixel-space layout underlying this format.
    pub fn absolute(self) -> BoxFormat {
        match self {
            BoxFormat::RelativeCoco => BoxFormat::Coco,
            BoxFormat::RelativeVoc => BoxFormat::Voc,
            BoxFormat::RelativeCenter => BoxFormat::Center,
            other => other,
        }
    }
}

impl fmt::Display for BoxFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BoxFormat {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BoxFormat::ALL
            .into_iter()
            .find(|format| format.as_str() == s)
            .ok_or_else(|| {
                ConvertError::UnsupportedFormat(format!(
                    "'{}' (supported: coco, voc, center, relativeCoco, relativeVoc, relativeCenter)",
                    s
                ))
            })
    }
}
