//! Canonical ("standard") annotation JSON.
//!
//! The document is an object with an `images` array. Each image carries
//! `filename`, `width`, `height`, labelling metadata and an `annotations`
//! array; each annotation names its `type` and `format` and stores its box
//! under that format's keys.
//!
//! ```json
//! {
//!   "images": [{
//!     "filename": "1001.png", "width": 512, "height": 256,
//!     "annotations": [{
//!       "type": "boundingBox", "format": "voc", "label": "polyp",
//!       "xMin": 12, "yMin": 20, "xMax": 46, "yMax": 80
//!     }]
//!   }]
//! }
//! ```

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use indexmap::map::Entry;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::annotation::AnnotationFormats;
use super::image::{Image, ImageRecord, RawImage};
use crate::conversion::report::{ConversionIssue, ConversionIssueCode, ConversionReport};
use crate::error::ConvertError;

#[derive(Deserialize)]
struct StdDocument {
    images: Vec<RawImage>,
}

#[derive(Serialize)]
struct StdDocumentRecord<'a> {
    images: Vec<ImageRecord<'a>>,
}

/// Reads images from a canonical JSON file.
///
/// Annotations with a missing or unknown `type` are skipped and noted in
/// `report`.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed, or if an image or
/// annotation lacks a required field.
pub fn read_std_json(path: &Path, report: &mut ConversionReport) -> Result<Vec<Image>, ConvertError> {
    let file = File::open(path).map_err(ConvertError::Io)?;
    let reader = BufReader::new(file);

    let document: StdDocument =
        serde_json::from_reader(reader).map_err(|source| ConvertError::JsonParse {
            path: path.to_path_buf(),
            source,
        })?;

    document_to_images(document, report)
}

/// Reads images from a canonical JSON string.
///
/// Useful for testing without file I/O.
pub fn from_std_json_str(json: &str, report: &mut ConversionReport) -> Result<Vec<Image>, ConvertError> {
    from_std_json_slice(json.as_bytes(), report)
}

/// Reads images from canonical JSON bytes.
pub fn from_std_json_slice(
    bytes: &[u8],
    report: &mut ConversionReport,
) -> Result<Vec<Image>, ConvertError> {
    let document: StdDocument =
        serde_json::from_slice(bytes).map_err(|source| ConvertError::JsonParse {
            path: PathBuf::from("<bytes>"),
            source,
        })?;
    document_to_images(document, report)
}

fn document_to_images(
    document: StdDocument,
    report: &mut ConversionReport,
) -> Result<Vec<Image>, ConvertError> {
    let images = document
        .images
        .into_iter()
        .map(|raw| Image::from_raw(raw, report))
        .collect::<Result<Vec<_>, _>>()?;

    report.input.images += images.len();
    report.input.annotations += images.iter().map(|i| i.annotations.len()).sum::<usize>();
    Ok(images)
}

/// Serializes images to a pretty-printed canonical JSON string.
pub fn to_std_json_string(images: &[Image], formats: &AnnotationFormats) -> Result<String, ConvertError> {
    let document = document_record(images, formats)?;
    serde_json::to_string_pretty(&document).map_err(|source| ConvertError::JsonWrite {
        path: PathBuf::from("<string>"),
        source,
    })
}

/// Writes images to a canonical JSON file, creating parent folders.
///
/// Every annotation is written in the format `formats` selects for its kind.
pub fn write_std_json(
    path: &Path,
    images: &[Image],
    formats: &AnnotationFormats,
) -> Result<(), ConvertError> {
    let document = document_record(images, formats)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file = File::create(path).map_err(ConvertError::Io)?;
    let mut writer = BufWriter::new(file);

    serde_json::to_writer_pretty(&mut writer, &document).map_err(|source| {
        ConvertError::JsonWrite {
            path: path.to_path_buf(),
            source,
        }
    })?;
    writer.flush().map_err(ConvertError::Io)
}

fn document_record<'a>(
    images: &'a [Image],
    formats: &AnnotationFormats,
) -> Result<StdDocumentRecord<'a>, ConvertError> {
    let images = images
        .iter()
        .map(|image| image.to_record(formats))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(StdDocumentRecord { images })
}

/// Merges several batches into one.
///
/// Images sharing a filename become one record with the annotations of all
/// occurrences, in input order. Occurrences with different sizes are an
/// error.
pub fn merge_images<I>(batches: I, report: &mut ConversionReport) -> Result<Vec<Image>, ConvertError>
where
    I: IntoIterator<Item = Vec<Image>>,
{
    let mut merged: IndexMap<String, Image> = IndexMap::new();

    for image in batches.into_iter().flatten() {
        match merged.entry(image.filename.clone()) {
            Entry::Vacant(entry) => {
                entry.insert(image);
            }
            Entry::Occupied(mut entry) => {
                let existing = entry.get_mut();
                if existing.size() != image.size() {
                    return Err(ConvertError::ConflictingImageSize {
                        filename: image.filename,
                        first_width: existing.width,
                        first_height: existing.height,
                        second_width: image.width,
                        second_height: image.height,
                    });
                }
                report.add(ConversionIssue::info(
                    ConversionIssueCode::DuplicateImageMerged,
                    format!(
                        "image '{}' appears more than once; annotations were merged",
                        image.filename
                    ),
                ));
                existing.annotations.extend(image.annotations);
            }
        }
    }

    let images: Vec<Image> = merged.into_values().collect();
    report.output.images = images.len();
    report.output.annotations = images.iter().map(|i| i.annotations.len()).sum();
    Ok(images)
}

/// Reads and merges several canonical JSON files.
pub fn merge_std_json(paths: &[PathBuf], report: &mut ConversionReport) -> Result<Vec<Image>, ConvertError> {
    let batches = paths
        .iter()
        .map(|path| read_std_json(path, report))
        .collect::<Result<Vec<_>, _>>()?;
    merge_images(batches, report)
}

/// Reads a list of file paths, one per line.
///
/// Blank lines and lines starting with `#` are ignored. Relative paths are
/// resolved against the folder of the list file.
pub fn read_path_list(path: &Path) -> Result<Vec<PathBuf>, ConvertError> {
    let text = fs::read_to_string(path)?;
    let base = path.parent().unwrap_or_else(|| Path::new(""));

    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| base.join(line))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Annotation, BoundingBox, BoxFormat};

    const SAMPLE: &str = r#"{
        "images": [
            {
                "filename": "1001.png", "width": 512, "height": 256,
                "label": "colon", "instance": "", "additionalLabels": ["a"],
                "verified": true, "autoCreated": false,
                "annotations": [
                    {"type": "boundingBox", "format": "coco", "label": "Polyp1",
                     "x": 12, "y": 20, "width": 34, "height": 60},
                    {"type": "boundingBox", "format": "voc",
                     "xMin": 9, "yMin": 10, "xMax": 30, "yMax": 57},
                    {"format": "coco", "x": 1, "y": 1, "width": 1, "height": 1}
                ]
            },
            {"filename": "1020.png", "width": 512, "height": 256, "annotations": []}
        ]
    }"#;

    #[test]
    fn read_sample() {
        let mut report = ConversionReport::new("json", "ir");
        let images = from_std_json_str(SAMPLE, &mut report).unwrap();

        assert_eq!(images.len(), 2);
        assert_eq!(images[0].annotations.len(), 2);
        assert_eq!(images[0].meta.additional_labels, vec!["a".to_string()]);
        assert!(images[0].meta.verified);
        let Annotation::BoundingBox(bbox) = &images[0].annotations[1];
        assert_eq!(bbox.values(), [9.0, 10.0, 21.0, 47.0]);
        assert_eq!(report.warning_count(), 1);
        assert_eq!(report.input.images, 2);
        assert_eq!(report.input.annotations, 2);
    }

    #[test]
    fn write_then_read_in_another_format() {
        let mut report = ConversionReport::default();
        let images = from_std_json_str(SAMPLE, &mut report).unwrap();
        let json = to_std_json_string(
            &images,
            &AnnotationFormats::with_bounding_box(BoxFormat::RelativeCenter),
        )
        .unwrap();
        assert!(json.contains("\"relXCenter\""));

        let restored = from_std_json_str(&json, &mut report).unwrap();
        assert_eq!(restored.len(), images.len());
        for (a, b) in images[0].annotations.iter().zip(&restored[0].annotations) {
            let (Annotation::BoundingBox(a), Annotation::BoundingBox(b)) = (a, b);
            for (x, y) in a.values().iter().zip(b.values()) {
                assert!((x - y).abs() < 1e-9);
            }
            assert_eq!(a.meta, b.meta);
        }
    }

    #[test]
    fn missing_images_key_is_a_parse_error() {
        let err = from_std_json_str("{}", &mut ConversionReport::default()).unwrap_err();
        assert!(matches!(err, ConvertError::JsonParse { .. }));
    }

    #[test]
    fn write_file_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.json");
        let images = vec![Image::new("a.png", 10, 10)
            .with_annotation(BoundingBox::from_coco(1.0, 2.0, 3.0, 4.0))];
        write_std_json(&path, &images, &AnnotationFormats::with_bounding_box(BoxFormat::Voc))
            .unwrap();

        let restored = read_std_json(&path, &mut ConversionReport::default()).unwrap();
        assert_eq!(restored, images_with_format(images, BoxFormat::Voc));
    }

    fn images_with_format(mut images: Vec<Image>, format: BoxFormat) -> Vec<Image> {
        for image in &mut images {
            for Annotation::BoundingBox(bbox) in &mut image.annotations {
                bbox.format = format;
            }
        }
        images
    }

    #[test]
    fn merge_combines_duplicates() {
        let a = vec![Image::new("a.png", 10, 10)
            .with_annotation(BoundingBox::from_coco(1.0, 1.0, 1.0, 1.0))];
        let b = vec![
            Image::new("a.png", 10, 10).with_annotation(BoundingBox::from_coco(2.0, 2.0, 2.0, 2.0)),
            Image::new("b.png", 10, 10),
        ];
        let mut report = ConversionReport::new("json", "json");
        let merged = merge_images(vec![a, b], &mut report).unwrap();

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].annotations.len(), 2);
        assert_eq!(report.count_of(ConversionIssueCode::DuplicateImageMerged), 1);
        assert_eq!(report.output.annotations, 2);
    }

    #[test]
    fn merge_rejects_size_conflicts() {
        let a = vec![Image::new("a.png", 10, 10)];
        let b = vec![Image::new("a.png", 20, 10)];
        let err = merge_images(vec![a, b], &mut ConversionReport::default()).unwrap_err();
        assert!(matches!(err, ConvertError::ConflictingImageSize { .. }));
    }

    #[test]
    fn path_list_skips_comments_and_resolves_relative() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("list.txt");
        fs::write(&list, "# sources\none.json\n\n  two.json  \n/abs/three.json\n").unwrap();

        let paths = read_path_list(&list).unwrap();
        assert_eq!(
            paths,
            vec![
                dir.path().join("one.json"),
                dir.path().join("two.json"),
                PathBuf::from("/abs/three.json"),
            ]
        );
    }
}
