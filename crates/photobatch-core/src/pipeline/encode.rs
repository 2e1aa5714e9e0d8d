//! Baseline JPEG encoding with optional ICC/EXIF pass-through.

use image::DynamicImage;
use img_parts::jpeg::Jpeg;
use img_parts::{Bytes, ImageEXIF, ImageICC};
use mozjpeg::{ColorSpace, Compress};
use std::borrow::Cow;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;

use crate::error::PipelineError;

/// Encodes RGB images to JPEG with 4:2:0 chroma subsampling and optimized
/// Huffman tables.
#[derive(Debug, Clone, Copy)]
pub struct JpegEncoder {
    quality: u8,
    strip_metadata: bool,
}

impl JpegEncoder {
    pub fn new(quality: u8, strip_metadata: bool) -> Self {
        Self {
            quality: quality.clamp(1, 100),
            strip_metadata,
        }
    }

    /// Encode `image`, re-attaching `icc` (APP2) and `exif` (APP1) unless
    /// metadata stripping is on. Absent blocks are never synthesized.
    ///
    /// `path` is the source file, used only for error reporting.
    pub fn encode(
        &self,
        image: &DynamicImage,
        icc: Option<&[u8]>,
        exif: Option<&[u8]>,
        path: &Path,
    ) -> Result<Vec<u8>, PipelineError> {
        let encode_err = |message: String| PipelineError::Encode {
            path: path.to_path_buf(),
            message,
        };

        // libjpeg reports fatal errors by unwinding
        let encoded = catch_unwind(AssertUnwindSafe(|| compress(image, self.quality)))
            .map_err(|_| encode_err("mozjpeg: encoder panicked".to_string()))?
            .map_err(encode_err)?;

        if self.strip_metadata || (icc.is_none() && exif.is_none()) {
            return Ok(encoded);
        }
        attach_metadata(encoded, icc, exif).map_err(encode_err)
    }
}

fn compress(image: &DynamicImage, quality: u8) -> Result<Vec<u8>, String> {
    // Zero-copy when the transformer already produced RGB8
    let rgb: Cow<'_, image::RgbImage> = match image {
        DynamicImage::ImageRgb8(rgb) => Cow::Borrowed(rgb),
        _ => Cow::Owned(image.to_rgb8()),
    };
    let (w, h) = rgb.dimensions();
    if w == 0 || h == 0 {
        return Err("Invalid image dimensions: width or height is zero".to_string());
    }

    let mut comp = Compress::new(ColorSpace::JCS_RGB);
    comp.set_size(w as usize, h as usize);
    comp.set_color_space(ColorSpace::JCS_YCbCr);
    comp.set_quality(quality as f32);
    comp.set_chroma_sampling_pixel_sizes((2, 2), (2, 2));
    comp.set_optimize_coding(true);

    let mut output = Vec::with_capacity((w as usize * h as usize * 3 / 10).max(4096));
    {
        let mut writer = comp
            .start_compress(&mut output)
            .map_err(|e| format!("mozjpeg: failed to start compress: {e:?}"))?;

        let stride = w as usize * 3;
        for row in rgb.as_raw().chunks(stride) {
            writer
                .write_scanlines(row)
                .map_err(|e| format!("mozjpeg: failed to write scanlines: {e:?}"))?;
        }
        writer
            .finish()
            .map_err(|e| format!("mozjpeg: failed to finish: {e:?}"))?;
    }
    Ok(output)
}

/// Insert ICC (APP2, chunked by img-parts) and EXIF (APP1) segments.
fn attach_metadata(
    jpeg_data: Vec<u8>,
    icc: Option<&[u8]>,
    exif: Option<&[u8]>,
) -> Result<Vec<u8>, String> {
    let mut jpeg = Jpeg::from_bytes(Bytes::from(jpeg_data))
        .map_err(|e| format!("failed to parse encoded JPEG: {e}"))?;

    if let Some(icc) = icc {
        jpeg.set_icc_profile(Some(Bytes::copy_from_slice(icc)));
    }
    if let Some(exif) = exif {
        jpeg.set_exif(Some(Bytes::copy_from_slice(exif)));
    }

    let mut output = Vec::new();
    jpeg.encoder()
        .write_to(&mut output)
        .map_err(|e| format!("failed to write JPEG with metadata: {e}"))?;
    Ok(output)
}
