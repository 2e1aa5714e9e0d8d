//! Re-orientation, RGB normalization and aspect-preserving downscaling.

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};

use crate::types::BoundingBox;

/// Fits decoded images into a bounding box.
#[derive(Debug, Clone, Copy)]
pub struct Transformer {
    bounding_box: BoundingBox,
    filter: FilterType,
}

impl Transformer {
    /// Create a transformer for the given bounding box (Lanczos3 resampling).
    pub fn new(bounding_box: BoundingBox) -> Self {
        Self {
            bounding_box,
            filter: FilterType::Lanczos3,
        }
    }

    /// Produce a plain RGB image, upright, no larger than the bounding box.
    pub fn transform(&self, image: DynamicImage, orientation: Option<u32>) -> DynamicImage {
        let image = apply_orientation(image, orientation);
        let image = normalize_color(image);

        let (width, height) = image.dimensions();
        let (target_w, target_h) = fit_dimensions(width, height, self.bounding_box);
        if (target_w, target_h) == (width, height) {
            return image;
        }

        tracing::trace!("  Resize: {width}x{height} -> {target_w}x{target_h}");
        image.resize_exact(target_w, target_h, self.filter)
    }
}

/// Output size for a `width`x`height` image in `bounding_box`.
///
/// The scale is `min(box_w / w, box_h / h, 1.0)`, so images are never
/// upscaled. Each side is rounded to the nearest pixel and kept at least 1.
pub fn fit_dimensions(width: u32, height: u32, bounding_box: BoundingBox) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (width, height);
    }
    let scale = (bounding_box.width as f64 / width as f64)
        .min(bounding_box.height as f64 / height as f64)
        .min(1.0);
    if scale >= 1.0 {
        return (width, height);
    }
    let w = ((width as f64 * scale).round() as u32).clamp(1, bounding_box.width);
    let h = ((height as f64 * scale).round() as u32).clamp(1, bounding_box.height);
    (w, h)
}

/// Rotate/flip pixels according to an EXIF orientation (1-8).
pub fn apply_orientation(image: DynamicImage, orientation: Option<u32>) -> DynamicImage {
    match orientation {
        Some(2) => image.fliph(),
        Some(3) => image.rotate180(),
        Some(4) => image.flipv(),
        Some(5) => image.rotate90().fliph(), // transpose
        Some(6) => image.rotate90(),
        Some(7) => image.rotate270().fliph(), // transverse
        Some(8) => image.rotate270(),
        _ => image,
    }
}

/// Convert anything that is not 8-bit RGB (gray, alpha, 16-bit, float) to RGB8.
///
/// Alpha is dropped, not composited.
pub fn normalize_color(image: DynamicImage) -> DynamicImage {
    match image {
        DynamicImage::ImageRgb8(_) => image,
        other => DynamicImage::ImageRgb8(other.to_rgb8()),
    }
}
