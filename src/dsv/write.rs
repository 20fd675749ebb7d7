//! DSV write path: token assembly, line rendering and file output.
//!
//! An image is first laid out as lines of blocks of tokens. A block is one
//! annotation (or the path, when the path shares a line with several
//! annotations). Tokens in a block are joined by `delimiter`, blocks by
//! `annotationDelimiter`, and lines by `lineTerminator`.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use rayon::prelude::*;

use super::token::{quote_if_necessary, Token};
use crate::config::DsvConfig;
use crate::conversion::report::{ConversionCounts, ConversionIssue, ConversionIssueCode, ConversionReport};
use crate::error::ConvertError;
use crate::ir::{Annotation, BoundingBox, BoxFormat, Image, ImageSize};

/// Tokens of one image, as lines of blocks.
pub type ImageLines = Vec<Vec<Vec<Token>>>;

/// Linearizes a bounding box into tokens, class included.
///
/// An empty label becomes `defaultClass`, or no class token at all with
/// `ignoreEmptyClass` (or without a default). The class mapping is applied
/// to the resolved class before it is placed at the start or end.
pub fn bounding_box_tokens(
    bbox: &BoundingBox,
    format: BoxFormat,
    image: ImageSize,
    config: &DsvConfig,
) -> Result<Vec<Token>, ConvertError> {
    let mut tokens: Vec<Token> = bbox
        .values_in(format, Some(image))?
        .into_iter()
        .map(Token::from)
        .collect();

    let label = bbox.meta.label.trim();
    let class = if label.is_empty() {
        if config.ignore_empty_class {
            None
        } else {
            config.default_class.as_deref()
        }
    } else {
        Some(label)
    };

    if let Some(class) = class {
        let class = Token::Text(quote_if_necessary(config.map_class(class), config));
        if config.class_at_end {
            tokens.push(class);
        } else {
            tokens.insert(0, class);
        }
    }

    Ok(tokens)
}

/// Linearizes any annotation, using the output format configured for its
/// kind.
pub fn annotation_tokens(
    annotation: &Annotation,
    image: ImageSize,
    config: &DsvConfig,
) -> Result<Vec<Token>, ConvertError> {
    let formats = config.annotation_formats();
    match annotation {
        Annotation::BoundingBox(bbox) => {
            bounding_box_tokens(bbox, formats.bounding_box()?, image, config)
        }
    }
}

/// The path token of an image: folder prefix plus filename, quoted if
/// necessary. `None` when neither the image nor the config has a folder.
pub fn image_path_token(image: &Image, config: &DsvConfig) -> Option<Token> {
    let folder = image.path.as_deref().or(config.default_path.as_deref())?;
    let path = if folder.is_empty() || folder.ends_with('/') {
        format!("{}{}", folder, image.filename)
    } else {
        format!("{}/{}", folder, image.filename)
    };
    Some(Token::Text(quote_if_necessary(&path, config)))
}

/// Lays out an image as lines of blocks of tokens.
pub fn image_lines(image: &Image, config: &DsvConfig) -> Result<ImageLines, ConvertError> {
    let size = image.size();
    let path = if config.with_path {
        image_path_token(image, config)
    } else {
        None
    };

    let mut blocks = Vec::with_capacity(image.annotations.len() + 1);
    for annotation in &image.annotations {
        let mut tokens = annotation_tokens(annotation, size, config)?;
        if let (true, Some(path)) = (config.annotation_per_line, &path) {
            if config.path_at_end {
                tokens.push(path.clone());
            } else {
                tokens.insert(0, path.clone());
            }
        }
        blocks.push(tokens);
    }

    if config.annotation_per_line {
        return Ok(blocks.into_iter().map(|block| vec![block]).collect());
    }

    if let Some(path) = path {
        if config.path_at_end {
            blocks.push(vec![path]);
        } else {
            blocks.insert(0, vec![path]);
        }
    }
    Ok(vec![blocks])
}

/// Joins laid-out lines into text.
pub fn render_lines(lines: &ImageLines, config: &DsvConfig) -> String {
    lines
        .iter()
        .map(|line| {
            line.iter()
                .map(|block| {
                    block
                        .iter()
                        .map(Token::to_string)
                        .collect::<Vec<_>>()
                        .join(config.delimiter.as_str())
                })
                .collect::<Vec<_>>()
                .join(config.annotation_delimiter.as_str())
        })
        .collect::<Vec<_>>()
        .join(config.line_terminator.as_str())
}

/// Renders one image, or `None` if it has no annotations.
pub fn render_image(image: &Image, config: &DsvConfig) -> Result<Option<String>, ConvertError> {
    if image.annotations.is_empty() {
        return Ok(None);
    }
    let lines = image_lines(image, config)?;
    Ok(Some(render_lines(&lines, config)))
}

/// Name of the per-image annotation file: the image filename with its last
/// extension replaced.
pub fn annotation_file_name(image_filename: &str, extension: &str) -> String {
    let stem = image_filename
        .rsplit_once('.')
        .map_or(image_filename, |(stem, _)| stem);
    format!("{}.{}", stem, extension.trim_start_matches('.'))
}

/// Renders every image in parallel, noting the ones with nothing to write.
fn render_all<'a>(
    images: &'a [Image],
    config: &DsvConfig,
    report: &mut ConversionReport,
) -> Result<Vec<(&'a Image, String)>, ConvertError> {
    let rendered = images
        .par_iter()
        .map(|image| render_image(image, config))
        .collect::<Result<Vec<_>, _>>()?;

    let mut output = Vec::with_capacity(images.len());
    for (image, text) in images.iter().zip(rendered) {
        match text {
            Some(text) => output.push((image, text)),
            None => report.add(ConversionIssue::info(
                ConversionIssueCode::ImageWithoutAnnotations,
                format!("image '{}' has no annotations and was not written", image.filename),
            )),
        }
    }

    report.output = ConversionCounts {
        images: output.len(),
        annotations: output.iter().map(|(image, _)| image.annotations.len()).sum(),
    };
    Ok(output)
}

/// Renders a whole batch into one string, images joined by the line
/// terminator.
pub fn to_dsv_string(
    images: &[Image],
    config: &DsvConfig,
    report: &mut ConversionReport,
) -> Result<String, ConvertError> {
    let rendered = render_all(images, config, report)?;
    Ok(rendered
        .into_iter()
        .map(|(_, text)| text)
        .collect::<Vec<_>>()
        .join(config.line_terminator.as_str()))
}

/// Writes a batch to `outputFolder` (one file per image) or `outputFile`.
///
/// Every output file is produced by a single write. Returns the paths
/// written.
pub fn write_dsv(
    images: &[Image],
    config: &DsvConfig,
    report: &mut ConversionReport,
) -> Result<Vec<PathBuf>, ConvertError> {
    let written = if config.file_per_image {
        let folder = config
            .output_folder
            .as_deref()
            .ok_or(ConvertError::MissingOption("outputFolder"))?;
        write_per_image(folder, images, config, report)?
    } else {
        let file = config
            .output_file
            .as_deref()
            .ok_or(ConvertError::MissingOption("outputFile"))?;
        let text = to_dsv_string(images, config, report)?;
        create_parent(file)?;
        fs::write(file, text)?;
        info!("Wrote {}", file.display());
        vec![file.to_path_buf()]
    };

    report.files_written += written.len();
    Ok(written)
}

fn write_per_image(
    folder: &Path,
    images: &[Image],
    config: &DsvConfig,
    report: &mut ConversionReport,
) -> Result<Vec<PathBuf>, ConvertError> {
    let rendered = render_all(images, config, report)?;

    // Targets are resolved up front so a collision fails before anything is written.
    let mut owners: HashMap<PathBuf, &str> = HashMap::with_capacity(rendered.len());
    let mut targets = Vec::with_capacity(rendered.len());
    for (image, text) in rendered {
        let path = folder.join(annotation_file_name(&image.filename, &config.file_extension));
        if let Some(first) = owners.insert(path.clone(), &image.filename) {
            return Err(ConvertError::DuplicateOutputFile {
                path,
                first: first.to_string(),
                second: image.filename.clone(),
            });
        }
        targets.push((image, path, text));
    }

    fs::create_dir_all(folder)?;
    let mut written = Vec::with_capacity(targets.len());
    for (image, path, text) in targets {
        fs::write(&path, text)?;
        debug!("Wrote {} annotation(s) to {}", image.annotations.len(), path.display());
        written.push(path);
    }
    info!("Wrote {} annotation file(s) to {}", written.len(), folder.display());
    Ok(written)
}

fn create_parent(file: &Path) -> Result<(), ConvertError> {
    match file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => Ok(fs::create_dir_all(parent)?),
        _ => Ok(()),
    }
}
