//! Configuration for the DSV codec.
//!
//! A configuration is assembled once per run: the built-in default preset
//! is overlaid key by key with the user's options and the result is parsed
//! into an immutable [`DsvConfig`], which is then passed explicitly to every
//! codec call.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};
use serde_yaml::{Mapping, Value};

use crate::error::ConvertError;
use crate::ir::{AnnotationFormats, BoxFormat, ImageSize};

/// The default preset every configuration starts from.
pub const DEFAULT_PRESET: &str = include_str!("../configs/dsv_default.yaml");

/// YOLO text labels, selectable by the name `yolo`.
pub const YOLO_PRESET: &str = include_str!("../configs/dsv_yolo.yaml");

/// Options of the delimiter-separated-values codec.
///
/// Field defaults (used for keys absent from every layer) are listed per
/// field. The default preset may set other values; see [`load_config`].
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DsvConfig {
    /// Separator between the values of one annotation. Default `","`.
    pub delimiter: String,

    /// Separator between annotations sharing a line. Default `";"`.
    pub annotation_delimiter: String,

    /// Separator between lines. Default `"\n"`.
    pub line_terminator: String,

    /// Whether lines carry the image path. Default `false`.
    pub with_path: bool,

    /// Path token after the annotation values instead of before. Default `false`.
    pub path_at_end: bool,

    /// Folder prefix for images without a path. Default none.
    #[serde(deserialize_with = "scalar_string")]
    pub default_path: Option<String>,

    /// One line per annotation instead of one line per image. Default `false`.
    pub annotation_per_line: bool,

    /// Class token after the box values instead of before. Default `false`.
    pub class_at_end: bool,

    /// Raw class to written class. Default none.
    pub class_mapping: Option<ClassMapping>,

    /// Omit the class token for unlabelled annotations. Default `false`.
    pub ignore_empty_class: bool,

    /// Class written for unlabelled annotations. Default none (no token).
    #[serde(deserialize_with = "scalar_string")]
    pub default_class: Option<String>,

    /// Quote tokens containing spaces or separators. Default `false`.
    pub quoting: bool,

    /// Quote character. Default `"\""`.
    pub quote_char: String,

    /// One output file per image instead of one file. Default `false`.
    pub file_per_image: bool,

    /// Output folder when `file_per_image` is set.
    pub output_folder: Option<PathBuf>,

    /// Output file when `file_per_image` is unset.
    pub output_file: Option<PathBuf>,

    /// Extension of per-image files. Default `"txt"`.
    pub file_extension: String,

    /// Extension appended to image names inferred from annotation file names.
    #[serde(deserialize_with = "scalar_string")]
    pub image_extension: Option<String>,

    /// Format bounding boxes are written (and read) in.
    pub bounding_box: Option<BoxFormat>,

    /// Fallback image width when reading DSV sources.
    pub image_width: Option<u32>,

    /// Fallback image height when reading DSV sources.
    pub image_height: Option<u32>,
}

impl Default for DsvConfig {
    fn default() -> Self {
        Self {
            delimiter: ",".into(),
            annotation_delimiter: ";".into(),
            line_terminator: "\n".into(),
            with_path: false,
            path_at_end: false,
            default_path: None,
            annotation_per_line: false,
            class_at_end: false,
            class_mapping: None,
            ignore_empty_class: false,
            default_class: None,
            quoting: false,
            quote_char: "\"".into(),
            file_per_image: false,
            output_folder: None,
            output_file: None,
            file_extension: "txt".into(),
            image_extension: None,
            bounding_box: None,
            image_width: None,
            image_height: None,
        }
    }
}

impl DsvConfig {
    /// Parses a configuration from YAML, filling absent keys with the field
    /// defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConvertError> {
        serde_yaml::from_str(yaml).map_err(|source| ConvertError::ConfigParse {
            path: PathBuf::from("<string>"),
            source,
        })
    }

    /// Routes an output path to `output_folder` or `output_file`, depending
    /// on `file_per_image`.
    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        if self.file_per_image {
            self.output_folder = Some(output.into());
        } else {
            self.output_file = Some(output.into());
        }
        self
    }

    /// Output formats per annotation kind.
    pub fn annotation_formats(&self) -> AnnotationFormats {
        AnnotationFormats {
            bounding_box: self.bounding_box,
        }
    }

    /// The configured fallback image size, if both dimensions are set.
    pub fn image_size(&self) -> Option<ImageSize> {
        self.image_width
            .zip(self.image_height)
            .map(|(width, height)| ImageSize::new(width, height))
    }

    /// Applies the class mapping to `class`, or returns it unchanged.
    pub fn map_class<'a>(&'a self, class: &'a str) -> &'a str {
        self.class_mapping
            .as_ref()
            .and_then(|mapping| mapping.get(class))
            .unwrap_or(class)
    }
}

/// Loads the effective configuration for a run.
///
/// `user` is either `None` (defaults only), the preset name `yolo`, or a
/// path to a YAML file. The user mapping overrides the default preset key by
/// key before the merged mapping is parsed.
pub fn load_config(user: Option<&str>) -> Result<DsvConfig, ConvertError> {
    let defaults = parse_layer(DEFAULT_PRESET, Path::new("<default preset>"))?;

    let merged = match user {
        None => defaults,
        Some("yolo") => merge_layers(defaults, parse_layer(YOLO_PRESET, Path::new("<yolo preset>"))?),
        Some(path) => {
            let path = Path::new(path);
            let text = fs::read_to_string(path)?;
            merge_layers(defaults, parse_layer(&text, path)?)
        }
    };

    serde_yaml::from_value(merged).map_err(|source| ConvertError::ConfigParse {
        path: PathBuf::from(user.unwrap_or("<default preset>")),
        source,
    })
}

fn parse_layer(text: &str, path: &Path) -> Result<Value, ConvertError> {
    let value: Value = serde_yaml::from_str(text).map_err(|source| ConvertError::ConfigParse {
        path: path.to_path_buf(),
        source,
    })?;
    // An empty file is an empty layer.
    Ok(match value {
        Value::Null => Value::Mapping(Mapping::new()),
        other => other,
    })
}

/// Overlays `overrides` on `base`, one top-level key at a time.
pub fn merge_layers(base: Value, overrides: Value) -> Value {
    match (base, overrides) {
        (Value::Mapping(mut base), Value::Mapping(overrides)) => {
            for (key, value) in overrides {
                base.insert(key, value);
            }
            Value::Mapping(base)
        }
        (_, overrides) => overrides,
    }
}

/// Class substitutions, keyed by the class as it appears in the source.
///
/// Keys and values may be any YAML scalar (`0: polyp`, `polyp: 0`); both are
/// kept in their string form.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClassMapping(IndexMap<String, String>);

impl ClassMapping {
    /// Looks up the substitute for `class`.
    pub fn get(&self, class: &str) -> Option<&str> {
        self.0.get(class).map(String::as_str)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the mapping has no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ClassMapping {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        ClassMapping(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl<'de> Deserialize<'de> for ClassMapping {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error;

        let Value::Mapping(mapping) = Value::deserialize(deserializer)? else {
            return Err(D::Error::custom("classMapping must be a mapping"));
        };

        mapping
            .into_iter()
            .map(|(key, value)| match (scalar_to_string(&key), scalar_to_string(&value)) {
                (Some(k), Some(v)) => Ok((k, v)),
                _ => Err(D::Error::custom(
                    "classMapping keys and values must be scalars",
                )),
            })
            .collect()
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn scalar_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        value => scalar_to_string(&value)
            .map(Some)
            .ok_or_else(|| D::Error::custom("expected a scalar value")),
    }
}
