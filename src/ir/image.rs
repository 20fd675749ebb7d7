//! The image record: identity, size and its owned annotations.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::annotation::{
    read_annotations, Annotation, AnnotationFormats, AnnotationMeta, AnnotationRecord,
};
use super::transform::ImageSize;
use crate::conversion::report::ConversionReport;
use crate::error::ConvertError;

/// An image together with the annotations drawn on it.
///
/// The image exclusively owns its annotations; they carry no reference back
/// to it. Width and height are always known, which is what relative box
/// formats need.
#[derive(Clone, Debug, PartialEq)]
pub struct Image {
    /// Filename of the image; unique within a batch.
    pub filename: String,

    /// Width of the image in pixels.
    pub width: u32,

    /// Height of the image in pixels.
    pub height: u32,

    /// Optional folder prefix of the image.
    pub path: Option<String>,

    /// Image-level labels.
    pub meta: AnnotationMeta,

    pub annotations: Vec<Annotation>,
}

impl Image {
    /// Creates an image without annotations.
    pub fn new(filename: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            filename: filename.into(),
            width,
            height,
            path: None,
            meta: AnnotationMeta::default(),
            annotations: Vec::new(),
        }
    }

    /// Sets the folder prefix of this image.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Appends an annotation.
    pub fn with_annotation(mut self, annotation: impl Into<Annotation>) -> Self {
        self.annotations.push(annotation.into());
        self
    }

    /// The image dimensions.
    #[inline]
    pub fn size(&self) -> ImageSize {
        ImageSize::new(self.width, self.height)
    }

    /// Builds an image from a keyed record.
    ///
    /// `filename`, `width` and `height` are required; annotations are read
    /// through the registry, with skips noted in `report`.
    pub fn from_record(record: &Value, report: &mut ConversionReport) -> Result<Self, ConvertError> {
        let raw = RawImage::deserialize(record).map_err(|source| ConvertError::JsonParse {
            path: "<image>".into(),
            source,
        })?;
        Image::from_raw(raw, report)
    }

    pub(crate) fn from_raw(raw: RawImage, report: &mut ConversionReport) -> Result<Self, ConvertError> {
        let filename = raw.filename.ok_or_else(|| ConvertError::MissingField {
            field: "filename",
            context: "image record".into(),
        })?;
        let width = raw.width.ok_or_else(|| ConvertError::MissingField {
            field: "width",
            context: format!("image '{}'", filename),
        })?;
        let height = raw.height.ok_or_else(|| ConvertError::MissingField {
            field: "height",
            context: format!("image '{}'", filename),
        })?;
        let size = checked_size(&filename, width, height)?;

        let annotations = read_annotations(&raw.annotations, Some(size), report)?;

        Ok(Self {
            filename,
            width: size.width,
            height: size.height,
            path: raw.path,
            meta: raw.meta,
            annotations,
        })
    }

    /// Serializes this image, writing each annotation in the format chosen
    /// for its kind.
    pub fn to_record(&self, formats: &AnnotationFormats) -> Result<ImageRecord<'_>, ConvertError> {
        let size = Some(self.size());
        let annotations = self
            .annotations
            .iter()
            .map(|annotation| annotation.to_record(formats, size))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ImageRecord {
            filename: &self.filename,
            width: self.width,
            height: self.height,
            path: self.path.as_deref(),
            meta: &self.meta,
            annotations,
        })
    }
}

/// Validates that both dimensions are positive and fit in `u32`.
pub(crate) fn checked_size(filename: &str, width: u64, height: u64) -> Result<ImageSize, ConvertError> {
    match (u32::try_from(width), u32::try_from(height)) {
        (Ok(w), Ok(h)) if w > 0 && h > 0 => Ok(ImageSize::new(w, h)),
        _ => Err(ConvertError::InvalidImageSize {
            filename: filename.to_string(),
            width,
            height,
        }),
    }
}

/// An image as it appears in input JSON, before validation.
#[derive(Debug, Deserialize)]
pub(crate) struct RawImage {
    #[serde(default)]
    filename: Option<String>,

    #[serde(default)]
    width: Option<u64>,

    #[serde(default)]
    height: Option<u64>,

    #[serde(default)]
    path: Option<String>,

    #[serde(flatten)]
    meta: AnnotationMeta,

    #[serde(default, deserialize_with = "super::annotation::null_as_default")]
    annotations: Vec<Value>,
}

/// The serialized shape of one image.
#[derive(Debug, Serialize)]
pub struct ImageRecord<'a> {
    pub filename: &'a str,

    pub width: u32,

    pub height: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<&'a str>,

    #[serde(flatten)]
    pub meta: &'a AnnotationMeta,

    pub annotations: Vec<AnnotationRecord<'a>>,
}
