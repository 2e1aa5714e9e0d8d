//! Embedded metadata extraction: capture time, orientation, ICC and EXIF.

use exif::{In, Reader, Tag, Value};
use image::ImageDecoder as _;
use img_parts::{Bytes, DynImage, ImageEXIF, ImageICC};
use std::io::Cursor;

use crate::types::EmbeddedMetadata;

const TAG_ORIENTATION: u16 = 0x0112;
const TYPE_SHORT: u16 = 3;
const TYPE_LONG: u16 = 4;

/// Extracts embedded metadata from encoded image bytes.
pub struct MetadataExtractor;

impl MetadataExtractor {
    /// Read every embedded field the pipeline cares about.
    ///
    /// Never fails: anything missing or unreadable is left as `None`.
    pub fn extract(bytes: &[u8]) -> EmbeddedMetadata {
        let mut metadata = EmbeddedMetadata::default();

        if let Ok(exif) = Reader::new().read_from_container(&mut Cursor::new(bytes)) {
            metadata.captured_at = Self::get_datetime(&exif);
            metadata.orientation = Self::get_u32(&exif, Tag::Orientation);
        }

        // Raw blocks for pass-through; img-parts understands JPEG, PNG and WebP.
        // Anything else (TIFF, BMP) asks the image decoder instead.
        match DynImage::from_bytes(Bytes::copy_from_slice(bytes)) {
            Ok(Some(image)) => {
                metadata.icc_profile = image.icc_profile().map(|b| b.to_vec());
                metadata.exif = image.exif().map(|b| b.to_vec());
            }
            _ => {
                let (icc_profile, exif) = Self::decoder_blocks(bytes);
                metadata.icc_profile = icc_profile;
                metadata.exif = exif;
            }
        }

        metadata
    }

    /// ICC and EXIF blocks as reported by the `image` decoder for the format.
    fn decoder_blocks(bytes: &[u8]) -> (Option<Vec<u8>>, Option<Vec<u8>>) {
        let decoder = image::ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .ok()
            .and_then(|reader| reader.into_decoder().ok());
        let Some(mut decoder) = decoder else {
            return (None, None);
        };
        let icc_profile = decoder.icc_profile().ok().flatten();
        let exif = decoder.exif_metadata().ok().flatten();
        (
            icc_profile.filter(|b| !b.is_empty()),
            exif.filter(|b| !b.is_empty()),
        )
    }

    /// Get a u32 field from EXIF data.
    fn get_u32(exif: &exif::Exif, tag: Tag) -> Option<u32> {
        exif.get_field(tag, In::PRIMARY)
            .and_then(|f| match &f.value {
                Value::Short(v) => v.first().map(|&x| x as u32),
                Value::Long(v) => v.first().copied(),
                _ => None,
            })
    }

    /// Get the capture time as stored, preferring DateTimeOriginal, then
    /// DateTimeDigitized, then DateTime.
    fn get_datetime(exif: &exif::Exif) -> Option<String> {
        [Tag::DateTimeOriginal, Tag::DateTimeDigitized, Tag::DateTime]
            .into_iter()
            .filter_map(|tag| exif.get_field(tag, In::PRIMARY))
            .find_map(|f| match &f.value {
                Value::Ascii(parts) => parts.first().and_then(|raw| {
                    let s = String::from_utf8_lossy(raw);
                    let s = s.trim_matches(|c: char| c == '\0' || c.is_whitespace());
                    (!s.is_empty()).then(|| s.to_string())
                }),
                _ => None,
            })
    }
}

/// Rewrite the IFD0 orientation of an EXIF block to 1 (top-left).
///
/// Called once the pixels have been rotated, so that viewers do not apply
/// the rotation a second time. Everything else is left byte-for-byte intact;
/// blocks without an orientation entry, or that do not parse as TIFF, are
/// returned unchanged.
pub fn normalize_orientation(mut exif: Vec<u8>) -> Vec<u8> {
    if let Some((value_offset, ty, little_endian)) = find_orientation_value(&exif) {
        match ty {
            TYPE_SHORT => {
                let bytes = if little_endian {
                    1u16.to_le_bytes()
                } else {
                    1u16.to_be_bytes()
                };
                exif[value_offset..value_offset + 2].copy_from_slice(&bytes);
            }
            TYPE_LONG => {
                let bytes = if little_endian {
                    1u32.to_le_bytes()
                } else {
                    1u32.to_be_bytes()
                };
                exif[value_offset..value_offset + 4].copy_from_slice(&bytes);
            }
            _ => {}
        }
    }
    exif
}

/// Locate the inline value of the IFD0 orientation entry.
///
/// Returns `(value_offset, field_type, little_endian)`.
fn find_orientation_value(tiff: &[u8]) -> Option<(usize, u16, bool)> {
    let little_endian = match tiff.get(0..2)? {
        b"II" => true,
        b"MM" => false,
        _ => return None,
    };
    let read_u16 = |at: usize| -> Option<u16> {
        let b: [u8; 2] = tiff.get(at..at + 2)?.try_into().ok()?;
        Some(if little_endian {
            u16::from_le_bytes(b)
        } else {
            u16::from_be_bytes(b)
        })
    };
    let read_u32 = |at: usize| -> Option<u32> {
        let b: [u8; 4] = tiff.get(at..at + 4)?.try_into().ok()?;
        Some(if little_endian {
            u32::from_le_bytes(b)
        } else {
            u32::from_be_bytes(b)
        })
    };

    if read_u16(2)? != 42 {
        return None;
    }
    let ifd0 = read_u32(4)? as usize;
    let count = read_u16(ifd0)? as usize;

    (0..count).find_map(|i| {
        let entry = ifd0 + 2 + i * 12;
        if read_u16(entry)? != TAG_ORIENTATION {
            return None;
        }
        let ty = read_u16(entry + 2)?;
        let width = match ty {
            TYPE_SHORT => 2,
            TYPE_LONG => 4,
            _ => return None,
        };
        let value_offset = entry + 8;
        tiff.get(value_offset..value_offset + width)?;
        Some((value_offset, ty, little_endian))
    })
}
