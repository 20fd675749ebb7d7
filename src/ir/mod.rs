//! Canonical annotation model.
//!
//! Images own annotations; bounding boxes are stored in canonical COCO
//! form (`x, y, width, height` in pixels) whatever format they were read
//! in. Every other [`BoxFormat`] is a view computed by the [`transform`]
//! functions at the boundary.
//!
//! # Example
//!
//! ```
//! use cvconv::ir::{BoundingBox, BoxFormat, Image, ImageSize};
//!
//! let bbox = BoundingBox::new(&[128.0, 216.0, 329.0, 251.0], BoxFormat::Voc, None)?
//!     .with_label("polyp");
//! assert_eq!(bbox.values(), [128.0, 216.0, 201.0, 35.0]);
//!
//! let image = Image::new("1001.png", 960, 540).with_annotation(bbox);
//! assert_eq!(image.size(), ImageSize::new(960, 540));
//! # Ok::<(), cvconv::ConvertError>(())
//! ```

mod annotation;
mod format;
mod image;
pub mod io_std_json;
pub mod transform;

pub use annotation::{
    constructor_for, read_annotation, read_annotations, Annotation, AnnotationConstructor,
    AnnotationFormats, AnnotationKind, AnnotationMeta, AnnotationRecord, BoundingBox,
    BOUNDING_BOX_TAG, REGISTRY,
};
pub use format::BoxFormat;
pub use image::{Image, ImageRecord};
pub(crate) use image::checked_size;
pub use transform::{from_canonical, to_canonical, ImageSize};
