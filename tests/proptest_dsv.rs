use std::collections::HashMap;

use cvconv::config::DsvConfig;
use cvconv::conversion::ConversionReport;
use cvconv::dsv::{build_images, read_dsv, write_dsv};
use cvconv::ir::{BoundingBox, Image, ImageSize};
use cvconv::ConvertError;
use proptest::prelude::*;

mod proptest_helpers;

/// Layouts that can be read back unambiguously. Lines without a path are
/// only recoverable when every image has its own file.
fn arb_layout() -> impl Strategy<Value = DsvConfig> {
    (
        prop::sample::select(vec![",", "\t", "|"]),
        any::<bool>(),
        any::<bool>(),
        any::<bool>(),
        any::<bool>(),
        any::<bool>(),
        proptest_helpers::arb_box_format(),
    )
        .prop_map(
            |(delimiter, with_path, path_at_end, per_line, class_at_end, per_image, format)| {
                DsvConfig {
                    delimiter: delimiter.into(),
                    with_path,
                    path_at_end,
                    annotation_per_line: per_line,
                    class_at_end,
                    file_per_image: per_image || !with_path,
                    quoting: true,
                    default_path: Some(String::new()),
                    image_extension: Some("png".into()),
                    bounding_box: Some(format),
                    ..Default::default()
                }
            },
        )
}

fn write_then_read(images: &[Image], config: DsvConfig) -> Vec<Image> {
    let temp = tempfile::tempdir().expect("create temp dir");
    let target = if config.file_per_image {
        temp.path().join("labels")
    } else {
        temp.path().join("labels.csv")
    };
    let config = config.with_output(target.clone());

    let mut report = ConversionReport::new("ir", "dsv");
    write_dsv(images, &config, &mut report).expect("write dsv");

    let sizes: HashMap<String, ImageSize> = images
        .iter()
        .map(|image| (image.filename.clone(), image.size()))
        .collect();
    let raw = read_dsv(&target, &config).expect("read dsv");
    build_images(raw, &config, |name| Ok(sizes.get(name).copied())).expect("build images")
}

proptest! {
    #![proptest_config(proptest_helpers::proptest_config())]

    #[test]
    fn dsv_roundtrip_preserves_boxes_and_labels(
        images in proptest_helpers::arb_images(4, 5),
        config in arb_layout(),
    ) {
        let restored = write_then_read(&images, config);
        let res = proptest_helpers::assert_images_equivalent(&images, &restored, proptest_helpers::EPS);
        prop_assert!(res.is_ok(), "{}", res.unwrap_err());
    }

    #[test]
    fn dsv_roundtrip_is_idempotent(
        images in proptest_helpers::arb_images(3, 4),
        config in arb_layout(),
    ) {
        let first = write_then_read(&images, config.clone());
        let second = write_then_read(&first, config);
        let res = proptest_helpers::assert_images_equivalent(&first, &second, proptest_helpers::EPS);
        prop_assert!(res.is_ok(), "{}", res.unwrap_err());
    }

    #[test]
    fn one_file_per_annotated_image(
        images in proptest_helpers::arb_images(6, 2),
    ) {
        let temp = tempfile::tempdir().expect("create temp dir");
        let config = DsvConfig {
            file_per_image: true,
            bounding_box: Some(cvconv::ir::BoxFormat::RelativeCenter),
            ..Default::default()
        }
        .with_output(temp.path().join("labels"));

        let mut report = ConversionReport::new("ir", "dsv");
        let written = write_dsv(&images, &config, &mut report).expect("write dsv");

        prop_assert_eq!(written.len(), images.len());
        prop_assert_eq!(report.files_written, images.len());
        let on_disk = std::fs::read_dir(temp.path().join("labels")).expect("list").count();
        prop_assert_eq!(on_disk, images.len());
    }

    #[test]
    fn shared_stem_images_are_rejected(
        (size, [x, y, w, h]) in proptest_helpers::arb_sized_box(),
        stem in "[a-z]{1,8}",
        extensions in prop::sample::subsequence(vec!["png", "jpg", "jpeg", "bmp"], 2),
    ) {
        let temp = tempfile::tempdir().expect("create temp dir");
        let folder = temp.path().join("labels");
        let config = DsvConfig {
            file_per_image: true,
            bounding_box: Some(cvconv::ir::BoxFormat::Coco),
            ..Default::default()
        }
        .with_output(folder.clone());

        let images: Vec<Image> = extensions
            .iter()
            .map(|ext| {
                Image::new(format!("{}.{}", stem, ext), size.width, size.height)
                    .with_annotation(BoundingBox::from_coco(x, y, w, h).with_label("cat"))
            })
            .collect();

        let mut report = ConversionReport::new("ir", "dsv");
        let err = write_dsv(&images, &config, &mut report).expect_err("names collide");
        prop_assert!(
            matches!(err, ConvertError::DuplicateOutputFile { .. }),
            "unexpected error: {}",
            err
        );
        prop_assert!(!folder.exists());
    }
}
