//! DSV read path: line tokenizer, source loader and image builder.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use log::debug;
use walkdir::WalkDir;

use super::token::{rsplit_once_unquoted, split_once_unquoted, split_unquoted, unquote, Token};
use crate::config::DsvConfig;
use crate::error::ConvertError;
use crate::ir::{checked_size, BoundingBox, Image, ImageSize};

/// Token tuples per image, keyed by image name in first-seen order.
pub type RawAnnotations = IndexMap<String, Vec<Vec<Token>>>;

/// The pieces of one physical line.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParsedLine {
    /// The path token, when the layout carries one.
    pub path: Option<String>,
    /// One token tuple per annotation on the line.
    pub annotations: Vec<Vec<Token>>,
}

/// Splits one line into its path token and annotation tuples.
///
/// Blank lines produce no annotations and no path.
pub fn parse_line(line: &str, config: &DsvConfig) -> ParsedLine {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return ParsedLine::default();
    }

    let mut path = None;
    let mut segments: Vec<&str> = if config.annotation_per_line {
        if config.with_path {
            let split = if config.path_at_end {
                rsplit_once_unquoted(line, &config.delimiter, config)
                    .map(|(values, path)| (path, values))
            } else {
                split_once_unquoted(line, &config.delimiter, config)
            };
            match split {
                Some((head, rest)) => {
                    path = Some(head);
                    vec![rest]
                }
                None => {
                    path = Some(line);
                    Vec::new()
                }
            }
        } else {
            vec![line]
        }
    } else {
        split_unquoted(line, &config.annotation_delimiter, config)
    };

    if config.with_path && !config.annotation_per_line && !segments.is_empty() {
        let index = if config.path_at_end { segments.len() - 1 } else { 0 };
        path = Some(segments.remove(index));
    }

    let annotations = segments
        .into_iter()
        .filter(|segment| !segment.trim().is_empty())
        .map(|segment| annotation_tokens(segment, config))
        .collect();

    ParsedLine {
        path: path.map(|p| unquote(p.trim(), config).to_string()),
        annotations,
    }
}

fn annotation_tokens(segment: &str, config: &DsvConfig) -> Vec<Token> {
    let mut raw: Vec<&str> =
        split_unquoted(segment.trim_matches(['\r', '\n']), &config.delimiter, config)
            .into_iter()
            .map(|value| unquote(value.trim(), config))
            .collect();

    // Mapping keys match the text as written, before number coercion.
    if let Some(mapping) = &config.class_mapping {
        let index = if config.class_at_end { raw.len() - 1 } else { 0 };
        if let Some(mapped) = mapping.get(raw[index]) {
            raw[index] = mapped;
        }
    }

    raw.into_iter().map(Token::parse).collect()
}

/// Reads a DSV source into token tuples per image.
///
/// With `filePerImage` the source is a folder and every regular file in it
/// is read; otherwise it is a single file. Images that end up without any
/// annotation tuple are dropped.
pub fn read_dsv(path: &Path, config: &DsvConfig) -> Result<RawAnnotations, ConvertError> {
    let mut images = RawAnnotations::new();

    if config.file_per_image {
        for entry in WalkDir::new(path)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(std::io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            read_file(entry.path(), config, &mut images)?;
        }
    } else {
        read_file(path, config, &mut images)?;
    }

    images.retain(|_, tuples| !tuples.is_empty());
    Ok(images)
}

/// Reads DSV text as if it came from a file named `file_name`.
pub fn read_dsv_str(text: &str, file_name: &str, config: &DsvConfig) -> RawAnnotations {
    let mut images = RawAnnotations::new();
    accumulate(text, file_name, config, &mut images);
    images.retain(|_, tuples| !tuples.is_empty());
    images
}

fn read_file(path: &Path, config: &DsvConfig, images: &mut RawAnnotations) -> Result<(), ConvertError> {
    let text = fs::read_to_string(path)?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    debug!("Reading annotations from {}", path.display());
    accumulate(&text, &file_name, config, images);
    Ok(())
}

fn accumulate(text: &str, file_name: &str, config: &DsvConfig, images: &mut RawAnnotations) {
    let inferred = inferred_image_name(file_name, config);
    for line in physical_lines(text, config) {
        let parsed = parse_line(line, config);
        let key = if config.with_path {
            match parsed.path {
                Some(path) => path,
                None => continue,
            }
        } else {
            inferred.clone()
        };
        images.entry(key).or_default().extend(parsed.annotations);
    }
}

/// Newline terminators accept both `\n` and `\r\n` input; any other
/// terminator splits literally.
fn physical_lines<'a>(text: &'a str, config: &DsvConfig) -> Vec<&'a str> {
    match config.line_terminator.as_str() {
        "" | "\n" | "\r\n" => text.lines().collect(),
        terminator => text.split(terminator).collect(),
    }
}

/// Image name derived from an annotation file name: the part before the
/// first `.`, plus the configured image extension.
pub fn inferred_image_name(file_name: &str, config: &DsvConfig) -> String {
    let stem = file_name.split('.').next().unwrap_or(file_name);
    match &config.image_extension {
        Some(ext) if !ext.is_empty() => format!("{}.{}", stem, ext.trim_start_matches('.')),
        _ => stem.to_string(),
    }
}

/// Builds image records from token tuples.
///
/// A 5-token tuple carries the class at the configured class position; a
/// 4-token tuple has no class. Box values are read in the configured
/// `boundingBox` format. `size_of` is asked for each image's dimensions
/// first; `imageWidth`/`imageHeight` are the fallback.
pub fn build_images<F>(
    raw: RawAnnotations,
    config: &DsvConfig,
    mut size_of: F,
) -> Result<Vec<Image>, ConvertError>
where
    F: FnMut(&str) -> Result<Option<ImageSize>, ConvertError>,
{
    let format = config.annotation_formats().bounding_box()?;
    let mut images = Vec::with_capacity(raw.len());

    for (key, tuples) in raw {
        let size = match size_of(&key)? {
            Some(size) => size,
            None => config.image_size().ok_or(ConvertError::MissingOption("imageWidth"))?,
        };

        let (folder, filename) = match key.rsplit_once('/') {
            Some((folder, filename)) => (Some(folder.to_string()), filename.to_string()),
            None => (None, key.clone()),
        };
        let mut image = Image::new(filename, size.width, size.height);
        image.path = folder;

        for (index, tuple) in tuples.iter().enumerate() {
            let invalid = |message: String| ConvertError::InvalidDsvAnnotation {
                image: key.clone(),
                index: index + 1,
                message,
            };

            let (label, values) = match tuple.len() {
                4 => (None, &tuple[..]),
                5 if config.class_at_end => (Some(&tuple[4]), &tuple[..4]),
                5 => (Some(&tuple[0]), &tuple[1..]),
                n => return Err(invalid(format!("expected 4 or 5 values, found {}", n))),
            };

            let values = values
                .iter()
                .map(|token| {
                    token
                        .as_f64()
                        .ok_or_else(|| invalid(format!("'{}' is not a number", token)))
                })
                .collect::<Result<Vec<f64>, _>>()?;

            let mut bbox = BoundingBox::new(&values, format, Some(size))?;
            if let Some(label) = label {
                bbox.meta.label = label.to_string();
            }
            image.annotations.push(bbox.into());
        }

        images.push(image);
    }

    Ok(images)
}

/// Reads the dimensions of `name` inside `folder`, or `None` if there is no
/// such file.
pub fn probe_image_size(folder: &Path, name: &str) -> Result<Option<ImageSize>, ConvertError> {
    let path: PathBuf = folder.join(name);
    if !path.is_file() {
        return Ok(None);
    }
    let dims = imagesize::size(&path).map_err(|source| ConvertError::ImageProbe {
        path: path.clone(),
        source,
    })?;
    checked_size(name, dims.width as u64, dims.height as u64).map(Some)
}
