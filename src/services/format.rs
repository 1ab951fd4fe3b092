//! Output format handling service
//!
//! Keeps PNG encoding and preview generation out of the engines so every
//! backend produces outputs the same way.

use crate::error::Result;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;

/// Service for producing pipeline outputs
pub struct OutputFormatHandler;

impl OutputFormatHandler {
    /// Extension of every cleaned output (without the dot)
    pub const OUTPUT_EXTENSION: &'static str = "png";

    /// Encode an image as PNG
    ///
    /// # Examples
    /// ```rust
    /// use unmark_batch::services::OutputFormatHandler;
    /// use image::{DynamicImage, RgbaImage};
    ///
    /// let image = DynamicImage::ImageRgba8(RgbaImage::new(2, 2));
    /// let png = OutputFormatHandler::encode_png(&image).unwrap();
    /// assert_eq!(&png[..4], b"\x89PNG");
    /// ```
    pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
        let mut buffer = Cursor::new(Vec::new());
        image.write_to(&mut buffer, ImageFormat::Png)?;
        Ok(buffer.into_inner())
    }

    /// Normalize arbitrary encoded image bytes to PNG
    ///
    /// PNG input is passed through untouched; anything else decodable is
    /// re-encoded. Returns the PNG bytes with the pixel dimensions.
    pub fn normalize_to_png(bytes: &[u8]) -> Result<(Vec<u8>, u32, u32)> {
        let format = image::guess_format(bytes)?;
        let decoded = image::load_from_memory_with_format(bytes, format)?;
        let (width, height) = (decoded.width(), decoded.height());

        if format == ImageFormat::Png {
            Ok((bytes.to_vec(), width, height))
        } else {
            let rgba = DynamicImage::ImageRgba8(decoded.to_rgba8());
            Ok((Self::encode_png(&rgba)?, width, height))
        }
    }

    /// Build the comparison preview of an original
    ///
    /// With `max_dimension == 0`, or when the original already fits, the
    /// original bytes are reused as-is. Otherwise a PNG thumbnail bounded by
    /// `max_dimension` on its longest edge is produced.
    pub fn preview(original: &[u8], decoded: &DynamicImage, max_dimension: u32) -> Result<Vec<u8>> {
        if max_dimension == 0
            || (decoded.width() <= max_dimension && decoded.height() <= max_dimension)
        {
            return Ok(original.to_vec());
        }

        let thumbnail = decoded.thumbnail(max_dimension, max_dimension);
        Self::encode_png(&DynamicImage::ImageRgba8(thumbnail.to_rgba8()))
    }
}
