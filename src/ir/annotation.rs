//! Annotation variants and the type-tag registry that constructs them.
//!
//! Serialized annotations carry a `type` field. Reading resolves that tag
//! through [`REGISTRY`] to a constructor; writing matches exhaustively on
//! [`Annotation`]. Adding a geometry means adding a variant, a registry
//! entry, and a match arm in the writers.

use indexmap::IndexMap;
use log::warn;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::format::BoxFormat;
use super::transform::{from_canonical, named_to_values, to_canonical, values_to_named, ImageSize};
use crate::conversion::report::{ConversionIssue, ConversionIssueCode, ConversionReport};
use crate::error::ConvertError;

/// Type tag of [`BoundingBox`] annotations.
pub const BOUNDING_BOX_TAG: &str = "boundingBox";

/// Builds an annotation from a raw record and the owning image's size.
pub type AnnotationConstructor =
    fn(&Value, Option<ImageSize>) -> Result<Annotation, ConvertError>;

/// Maps serialized type tags to annotation constructors.
pub const REGISTRY: &[(&str, AnnotationConstructor)] = &[(BOUNDING_BOX_TAG, construct_bounding_box)];

/// Looks up the constructor registered for a type tag.
pub fn constructor_for(tag: &str) -> Option<AnnotationConstructor> {
    REGISTRY
        .iter()
        .find(|(registered, _)| *registered == tag)
        .map(|(_, constructor)| *constructor)
}

fn construct_bounding_box(
    record: &Value,
    image: Option<ImageSize>,
) -> Result<Annotation, ConvertError> {
    BoundingBox::from_record(record, image).map(Annotation::BoundingBox)
}

/// Labelling metadata shared by images and annotations.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnnotationMeta {
    #[serde(deserialize_with = "null_as_default")]
    pub label: String,

    #[serde(deserialize_with = "null_as_default")]
    pub instance: String,

    #[serde(deserialize_with = "null_as_default")]
    pub additional_labels: Vec<String>,

    #[serde(deserialize_with = "null_as_default")]
    pub verified: bool,

    #[serde(deserialize_with = "null_as_default")]
    pub auto_created: bool,
}

pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// The kinds of annotation geometry known to the registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AnnotationKind {
    BoundingBox,
}

impl AnnotationKind {
    /// The serialized `type` tag.
    pub fn tag(self) -> &'static str {
        match self {
            AnnotationKind::BoundingBox => BOUNDING_BOX_TAG,
        }
    }
}

/// Output format choices, one per annotation kind.
///
/// A writer that meets an annotation whose kind has no format selected
/// fails with [`ConvertError::MissingOption`] instead of guessing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AnnotationFormats {
    pub bounding_box: Option<BoxFormat>,
}

impl AnnotationFormats {
    /// Selects `format` for bounding boxes.
    pub fn with_bounding_box(format: BoxFormat) -> Self {
        Self {
            bounding_box: Some(format),
        }
    }

    /// The format chosen for bounding boxes.
    pub fn bounding_box(&self) -> Result<BoxFormat, ConvertError> {
        self.bounding_box
            .ok_or(ConvertError::MissingOption(BOUNDING_BOX_TAG))
    }
}

/// An annotation of any registered geometry.
#[derive(Clone, Debug, PartialEq)]
pub enum Annotation {
    BoundingBox(BoundingBox),
}

impl Annotation {
    /// The geometry kind of this annotation.
    pub fn kind(&self) -> AnnotationKind {
        match self {
            Annotation::BoundingBox(_) => AnnotationKind::BoundingBox,
        }
    }

    /// Labelling metadata of this annotation.
    pub fn meta(&self) -> &AnnotationMeta {
        match self {
            Annotation::BoundingBox(bbox) => &bbox.meta,
        }
    }

    /// Mutable labelling metadata, for loaders that assign labels after the
    /// geometry is built.
    pub fn meta_mut(&mut self) -> &mut AnnotationMeta {
        match self {
            Annotation::BoundingBox(bbox) => &mut bbox.meta,
        }
    }

    /// Serializes this annotation with the format chosen for its kind.
    pub fn to_record(
        &self,
        formats: &AnnotationFormats,
        image: Option<ImageSize>,
    ) -> Result<AnnotationRecord<'_>, ConvertError> {
        match self {
            Annotation::BoundingBox(bbox) => bbox.to_record(formats.bounding_box()?, image),
        }
    }
}

impl From<BoundingBox> for Annotation {
    fn from(bbox: BoundingBox) -> Self {
        Annotation::BoundingBox(bbox)
    }
}

/// An axis-aligned bounding box.
///
/// Values are stored in canonical COCO form regardless of the format they
/// were read in; `format` remembers that source format.
#[derive(Clone, Debug, PartialEq)]
pub struct BoundingBox {
    pub meta: AnnotationMeta,
    pub format: BoxFormat,
    values: [f64; 4],
}

impl BoundingBox {
    /// Creates a bounding box from four values given in `format`.
    ///
    /// # Errors
    /// Fails if `values` does not hold exactly four numbers, or if `format`
    /// is relative and `image` is missing.
    pub fn new(
        values: &[f64],
        format: BoxFormat,
        image: Option<ImageSize>,
    ) -> Result<Self, ConvertError> {
        Ok(Self {
            meta: AnnotationMeta::default(),
            format,
            values: to_canonical(values, format, image)?,
        })
    }

    /// Creates a bounding box directly from canonical COCO values.
    pub fn from_coco(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            meta: AnnotationMeta::default(),
            format: BoxFormat::Coco,
            values: [x, y, width, height],
        }
    }

    /// Builds a bounding box from a keyed record.
    ///
    /// The record names its `format`; the four values are read from that
    /// format's keys (see [`BoxFormat::value_names`]).
    pub fn from_record(record: &Value, image: Option<ImageSize>) -> Result<Self, ConvertError> {
        let format_name = record.get("format").and_then(Value::as_str).ok_or_else(|| {
            ConvertError::MissingField {
                field: "format",
                context: "bounding box record".into(),
            }
        })?;
        let format: BoxFormat = format_name.parse()?;

        let values = named_to_values(format, |key| record.get(key).and_then(Value::as_f64))
            .ok_or_else(|| ConvertError::MissingField {
                field: "box values",
                context: format!(
                    "bounding box record (expected keys {})",
                    format.value_names().join(", ")
                ),
            })?;

        let meta = AnnotationMeta::deserialize(record).map_err(|source| {
            ConvertError::JsonParse {
                path: "<annotation>".into(),
                source,
            }
        })?;

        let mut bbox = BoundingBox::new(&values, format, image)?;
        bbox.meta = meta;
        Ok(bbox)
    }

    /// Sets the label of this box.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.meta.label = label.into();
        self
    }

    /// The canonical `(x, y, width, height)` values.
    #[inline]
    pub fn values(&self) -> [f64; 4] {
        self.values
    }

    /// The box values expressed in `format`.
    pub fn values_in(
        &self,
        format: BoxFormat,
        image: Option<ImageSize>,
    ) -> Result<[f64; 4], ConvertError> {
        from_canonical(&self.values, format, image)
    }

    /// Serializes this box in `format`.
    pub fn to_record(
        &self,
        format: BoxFormat,
        image: Option<ImageSize>,
    ) -> Result<AnnotationRecord<'_>, ConvertError> {
        let values = self.values_in(format, image)?;
        Ok(AnnotationRecord {
            meta: &self.meta,
            kind: AnnotationKind::BoundingBox.tag(),
            format,
            values: values_to_named(values, format).into_iter().collect(),
        })
    }
}

/// The serialized shape of one annotation.
#[derive(Debug, Serialize)]
pub struct AnnotationRecord<'a> {
    #[serde(flatten)]
    pub meta: &'a AnnotationMeta,

    #[serde(rename = "type")]
    pub kind: &'static str,

    pub format: BoxFormat,

    #[serde(flatten)]
    pub values: IndexMap<&'static str, f64>,
}

/// Reads a sequence of raw annotation records.
///
/// Records without a `type` or with a type missing from [`REGISTRY`] are
/// dropped and noted in `report`. Errors from a registered constructor
/// (missing values, bad format, wrong arity) abort the read.
pub fn read_annotations(
    records: &[Value],
    image: Option<ImageSize>,
    report: &mut ConversionReport,
) -> Result<Vec<Annotation>, ConvertError> {
    let mut annotations = Vec::with_capacity(records.len());
    for record in records {
        if let Some(annotation) = read_annotation(record, image, report)? {
            annotations.push(annotation);
        }
    }
    Ok(annotations)
}

/// Reads a single raw annotation record, or `None` if it was skipped.
pub fn read_annotation(
    record: &Value,
    image: Option<ImageSize>,
    report: &mut ConversionReport,
) -> Result<Option<Annotation>, ConvertError> {
    let Some(tag) = record.get("type").and_then(Value::as_str) else {
        let message = "annotation was skipped because it has no type".to_string();
        warn!("{}", message);
        report.add(ConversionIssue::warning(
            ConversionIssueCode::AnnotationMissingType,
            message,
        ));
        return Ok(None);
    };

    let Some(constructor) = constructor_for(tag) else {
        let message = format!("annotation was skipped because type '{}' is not supported", tag);
        warn!("{}", message);
        report.add(ConversionIssue::warning(
            ConversionIssueCode::AnnotationUnknownType,
            message,
        ));
        return Ok(None);
    };

    constructor(record, image).map(Some)
}
