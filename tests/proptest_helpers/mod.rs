#![allow(dead_code)]

use std::collections::BTreeMap;

use cvconv::ir::{Annotation, BoundingBox, BoxFormat, Image, ImageSize};
use proptest::prelude::*;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

/// Tolerance for values that went through a format transform and a text
/// round trip. Relative formats multiply back by dimensions of up to 4096.
pub const EPS: f64 = 1e-6;

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

pub fn arb_box_format() -> impl Strategy<Value = BoxFormat> {
    prop::sample::select(BoxFormat::ALL.to_vec())
}

pub fn arb_image_size() -> impl Strategy<Value = ImageSize> {
    (1u32..=4096, 1u32..=4096).prop_map(|(w, h)| ImageSize::new(w, h))
}

/// A canonical box lying inside an image of `size`.
pub fn arb_coco_box(size: ImageSize) -> impl Strategy<Value = [f64; 4]> {
    let (w, h) = (size.width as f64, size.height as f64);
    (0.0..w, 0.0..h, 0.0..=1.0f64, 0.0..=1.0f64)
        .prop_map(move |(x, y, fw, fh)| [x, y, (w - x) * fw, (h - y) * fh])
}

pub fn arb_sized_box() -> impl Strategy<Value = (ImageSize, [f64; 4])> {
    arb_image_size().prop_flat_map(|size| (Just(size), arb_coco_box(size)))
}

/// Labels that survive a quoted text round trip: no purely numeric ones,
/// which would come back normalized, and no quote characters or newlines.
pub fn arb_label() -> impl Strategy<Value = String> {
    prop::sample::select(vec![
        "", "cat", "dog", "polyp", "two words", "a,b", "x;y", "p|q", "tab\tbed",
    ])
    .prop_map(String::from)
}

pub fn arb_image(index: usize, max_boxes: usize) -> impl Strategy<Value = Image> {
    arb_image_size().prop_flat_map(move |size| {
        prop::collection::vec((arb_coco_box(size), arb_label()), 1..=max_boxes).prop_map(
            move |boxes| {
                boxes.into_iter().fold(
                    Image::new(format!("img{}.png", index), size.width, size.height),
                    |image, ([x, y, w, h], label)| {
                        image.with_annotation(BoundingBox::from_coco(x, y, w, h).with_label(label))
                    },
                )
            },
        )
    })
}

/// Between one and `max_images` annotated images with distinct filenames.
pub fn arb_images(max_images: usize, max_boxes: usize) -> impl Strategy<Value = Vec<Image>> {
    (1..=max_images).prop_flat_map(move |n| {
        (0..n)
            .map(|index| arb_image(index, max_boxes))
            .collect::<Vec<_>>()
    })
}

pub fn boxes_close(a: [f64; 4], b: [f64; 4], eps: f64) -> bool {
    a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() <= eps)
}

/// Compares two batches by filename: sizes, labels and canonical values.
/// Image order is ignored, annotation order is not.
pub fn assert_images_equivalent(
    expected: &[Image],
    actual: &[Image],
    eps: f64,
) -> Result<(), String> {
    let by_name: BTreeMap<&str, &Image> =
        actual.iter().map(|img| (img.filename.as_str(), img)).collect();
    if by_name.len() != expected.len() {
        return Err(format!(
            "image count mismatch: expected {}, got {}",
            expected.len(),
            by_name.len()
        ));
    }

    for image in expected {
        let other = by_name
            .get(image.filename.as_str())
            .ok_or_else(|| format!("missing image '{}'", image.filename))?;
        if image.size() != other.size() {
            return Err(format!("size mismatch for '{}'", image.filename));
        }
        if image.annotations.len() != other.annotations.len() {
            return Err(format!(
                "annotation count mismatch for '{}': expected {}, got {}",
                image.filename,
                image.annotations.len(),
                other.annotations.len()
            ));
        }
        for (index, (a, b)) in image.annotations.iter().zip(&other.annotations).enumerate() {
            let (Annotation::BoundingBox(a), Annotation::BoundingBox(b)) = (a, b);
            if a.meta.label != b.meta.label {
                return Err(format!(
                    "label mismatch for '{}' #{}: {:?} vs {:?}",
                    image.filename, index, a.meta.label, b.meta.label
                ));
            }
            if !boxes_close(a.values(), b.values(), eps) {
                return Err(format!(
                    "box mismatch for '{}' #{}: {:?} vs {:?}",
                    image.filename,
                    index,
                    a.values(),
                    b.values()
                ));
            }
        }
    }
    Ok(())
}
