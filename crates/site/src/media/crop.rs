//! Square crop of a staged image, re-encoded as JPEG.
//!
//! Cropping is purely local. The decode and encode are CPU bound and run on
//! the blocking pool via [`crop_to_jpeg_blocking`].

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use serde::Deserialize;
use thiserror::Error;

/// JPEG quality for cropped output.
pub const JPEG_QUALITY: u8 = 95;

/// Allowed difference between width and height, in pixels.
const SQUARE_TOLERANCE: u32 = 1;

/// Pixel rectangle chosen by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CropError {
    #[error("crop area is empty")]
    Empty,

    #[error("crop area must be square ({width}x{height})")]
    NotSquare { width: u32, height: u32 },

    #[error("crop area exceeds the {image_width}x{image_height} image")]
    OutOfBounds { image_width: u32, image_height: u32 },

    #[error("only images can be cropped")]
    NotAnImage,

    #[error("could not decode image: {0}")]
    Decode(String),

    #[error("could not encode JPEG: {0}")]
    Encode(String),

    #[error("crop worker failed: {0}")]
    Worker(String),
}

impl CropRect {
    /// Check the rectangle against an image of the given size.
    ///
    /// # Errors
    ///
    /// Returns the first geometry rule the rectangle breaks.
    pub fn validate(&self, image_width: u32, image_height: u32) -> Result<(), CropError> {
        if self.width == 0 || self.height == 0 {
            return Err(CropError::Empty);
        }
        if self.width.abs_diff(self.height) > SQUARE_TOLERANCE {
            return Err(CropError::NotSquare {
                width: self.width,
                height: self.height,
            });
        }
        let fits = self
            .x
            .checked_add(self.width)
            .is_some_and(|right| right <= image_width)
            && self
                .y
                .checked_add(self.height)
                .is_some_and(|bottom| bottom <= image_height);
        if !fits {
            return Err(CropError::OutOfBounds {
                image_width,
                image_height,
            });
        }
        Ok(())
    }
}

/// Crop `bytes` to `rect` and encode the result as JPEG.
///
/// # Errors
///
/// Returns [`CropError`] when the bytes are not a decodable image or the
/// rectangle is invalid for it.
pub fn crop_to_jpeg(bytes: &[u8], rect: CropRect) -> Result<Vec<u8>, CropError> {
    let image = image::load_from_memory(bytes).map_err(|e| CropError::Decode(e.to_string()))?;
    rect.validate(image.width(), image.height())?;

    let cropped = image.crop_imm(rect.x, rect.y, rect.width, rect.height).to_rgb8();

    let mut out = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY)
        .encode_image(&cropped)
        .map_err(|e| CropError::Encode(e.to_string()))?;
    Ok(out.into_inner())
}

/// [`crop_to_jpeg`] on the blocking thread pool.
///
/// # Errors
///
/// Same as [`crop_to_jpeg`], plus [`CropError::Worker`] if the task panics.
pub async fn crop_to_jpeg_blocking(bytes: Vec<u8>, rect: CropRect) -> Result<Vec<u8>, CropError> {
    tokio::task::spawn_blocking(move || crop_to_jpeg(&bytes, rect))
        .await
        .map_err(|e| CropError::Worker(e.to_string()))?
}
