//! End-to-end conversions between canonical JSON and DSV.
//!
//! Each function reads its input, runs the codec with an already-merged
//! configuration and writes the output, returning a [`ConversionReport`]
//! describing what was read, written and dropped.

pub mod report;

pub use report::{
    ConversionCounts, ConversionIssue, ConversionIssueCode, ConversionReport, ConversionSeverity,
};

use std::path::Path;

use log::info;

use crate::config::DsvConfig;
use crate::dsv;
use crate::error::ConvertError;
use crate::ir::io_std_json::{merge_std_json, read_path_list, read_std_json, write_std_json};
use crate::ir::AnnotationFormats;

/// Canonical JSON to DSV.
///
/// The destination is taken from `config` (`outputFolder` or `outputFile`).
pub fn std_to_dsv(input: &Path, config: &DsvConfig) -> Result<ConversionReport, ConvertError> {
    let mut report = ConversionReport::new("json", "dsv");
    let images = read_std_json(input, &mut report)?;
    info!("Read {} image(s) from {}", images.len(), input.display());

    dsv::write_dsv(&images, config, &mut report)?;
    Ok(report)
}

/// DSV to canonical JSON.
///
/// Image sizes are probed from `image_folder` when given, falling back to
/// `imageWidth`/`imageHeight`. Boxes are written in the format `formats`
/// selects.
pub fn dsv_to_std(
    input: &Path,
    output: &Path,
    config: &DsvConfig,
    image_folder: Option<&Path>,
    formats: &AnnotationFormats,
) -> Result<ConversionReport, ConvertError> {
    let mut report = ConversionReport::new("dsv", "json");

    let raw = dsv::read_dsv(input, config)?;
    report.input = ConversionCounts {
        images: raw.len(),
        annotations: raw.values().map(Vec::len).sum(),
    };

    let images = dsv::build_images(raw, config, |name| match image_folder {
        Some(folder) => dsv::probe_image_size(folder, name),
        None => Ok(None),
    })?;

    write_std_json(output, &images, formats)?;
    info!("Wrote {}", output.display());

    report.output = report.input.clone();
    report.files_written = 1;
    Ok(report)
}

/// Merges the canonical JSON files listed in `list` into `output`.
pub fn merge(
    list: &Path,
    output: &Path,
    formats: &AnnotationFormats,
) -> Result<ConversionReport, ConvertError> {
    let mut report = ConversionReport::new("json", "json");

    let paths = read_path_list(list)?;
    let images = merge_std_json(&paths, &mut report)?;
    write_std_json(output, &images, formats)?;
    info!("Merged {} file(s) into {}", paths.len(), output.display());

    report.files_written = 1;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::BoxFormat;
    use std::fs;

    const SAMPLE: &str = r#"{"images": [
        {"filename": "1001.png", "width": 100, "height": 50, "annotations": [
            {"type": "boundingBox", "format": "coco", "label": "cat",
             "x": 10, "y": 5, "width": 20, "height": 10},
            {"type": "polygon"}
        ]},
        {"filename": "1002.png", "width": 100, "height": 50, "annotations": []}
    ]}"#;

    #[test]
    fn std_to_dsv_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.json");
        fs::write(&input, SAMPLE).unwrap();

        let config = DsvConfig {
            bounding_box: Some(BoxFormat::Voc),
            ..Default::default()
        }
        .with_output(dir.path().join("out.csv"));
        let report = std_to_dsv(&input, &config).unwrap();

        let text = fs::read_to_string(dir.path().join("out.csv")).unwrap();
        assert_eq!(text, "cat,10,5,30,15");
        assert_eq!(report.input.images, 2);
        assert_eq!(report.output.images, 1);
        assert_eq!(report.files_written, 1);
        assert_eq!(report.count_of(ConversionIssueCode::AnnotationUnknownType), 1);
    }

    #[test]
    fn dsv_to_std_uses_configured_size() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.csv");
        fs::write(&input, "a.png,cat,0.5,0.5,0.5,0.5\n").unwrap();

        let config = DsvConfig {
            annotation_per_line: true,
            with_path: true,
            bounding_box: Some(BoxFormat::RelativeCenter),
            image_width: Some(100),
            image_height: Some(50),
            ..Default::default()
        };
        let output = dir.path().join("out.json");
        let report = dsv_to_std(
            &input,
            &output,
            &config,
            None,
            &AnnotationFormats::with_bounding_box(BoxFormat::Coco),
        )
        .unwrap();
        assert_eq!(report.input.annotations, 1);

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        let ann = &json["images"][0]["annotations"][0];
        assert_eq!(json["images"][0]["filename"], "a.png");
        assert_eq!(ann["label"], "cat");
        assert_eq!(ann["x"], 25.0);
        assert_eq!(ann["y"], 12.5);
        assert_eq!(ann["width"], 50.0);
        assert_eq!(ann["height"], 25.0);
    }

    #[test]
    fn merge_list() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.json"), SAMPLE).unwrap();
        fs::write(dir.path().join("b.json"), SAMPLE).unwrap();
        fs::write(dir.path().join("list.txt"), "a.json\nb.json\n").unwrap();

        let output = dir.path().join("merged.json");
        let report = merge(
            &dir.path().join("list.txt"),
            &output,
            &AnnotationFormats::with_bounding_box(BoxFormat::Coco),
        )
        .unwrap();

        assert_eq!(report.output.images, 2);
        assert_eq!(report.output.annotations, 2);
        assert_eq!(report.count_of(ConversionIssueCode::DuplicateImageMerged), 2);
        assert!(output.is_file());
    }
}
