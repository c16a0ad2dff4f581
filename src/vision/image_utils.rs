// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image decoding for detection requests
//!
//! Turns a transport-encoded payload (raw base64 or a `data:` URI) into a
//! [`CanonicalImage`]: an 8-bit RGB raster with non-zero dimensions.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, ImageFormat, RgbImage};
use thiserror::Error;

/// Maximum decoded image size (10MB)
pub const MAX_IMAGE_SIZE: usize = 10 * 1024 * 1024;

/// Separator between a `data:<mime>;base64` header and the payload
const TRANSPORT_SEPARATOR: char = ',';

/// Errors raised while turning a payload into a canonical image
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Image data is empty")]
    EmptyData,

    #[error("Invalid base64 encoding: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("Image data is too large: {0} bytes (max: {1} bytes)")]
    TooLarge(usize, usize),

    #[error("Unsupported image format")]
    UnsupportedFormat,

    #[error("Failed to decode image: {0}")]
    DecodeFailed(String),

    #[error("Image has zero dimension: {width}x{height}")]
    ZeroDimension { width: u32, height: u32 },
}

/// Decoded RGB image handed to the detection pipeline
///
/// Never mutated after construction.
#[derive(Debug, Clone)]
pub struct CanonicalImage {
    pixels: RgbImage,
}

impl CanonicalImage {
    /// Wrap an RGB buffer, rejecting empty rasters
    pub fn from_rgb(pixels: RgbImage) -> Result<Self, ImageError> {
        let (width, height) = pixels.dimensions();
        if width == 0 || height == 0 {
            return Err(ImageError::ZeroDimension { width, height });
        }
        Ok(Self { pixels })
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &RgbImage {
        &self.pixels
    }
}

/// Metadata captured while decoding
#[derive(Debug, Clone)]
pub struct ImageInfo {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Detected container format
    pub format: ImageFormat,
    /// Decoded payload size in bytes
    pub size_bytes: usize,
}

/// Drop everything up to and including the first `,`
///
/// Raw base64 contains no comma, so it passes through untouched.
pub fn strip_transport_prefix(payload: &str) -> &str {
    match payload.split_once(TRANSPORT_SEPARATOR) {
        Some((_, rest)) => rest,
        None => payload,
    }
}

/// Decode a base64 (optionally `data:` URI) payload into a canonical image
///
/// # Errors
/// Every failure maps to an [`ImageError`]; malformed input never panics.
///
/// # Example
/// ```ignore
/// let (image, info) = decode_base64_image("data:image/png;base64,iVBORw0KGgo...")?;
/// println!("Image size: {}x{}", info.width, info.height);
/// ```
pub fn decode_base64_image(payload: &str) -> Result<(CanonicalImage, ImageInfo), ImageError> {
    // Line-wrapped encoders (MIME, Android `Base64.DEFAULT`) insert breaks
    let encoded: String = strip_transport_prefix(payload)
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    if encoded.is_empty() {
        return Err(ImageError::EmptyData);
    }

    let bytes = STANDARD.decode(&encoded)?;
    decode_image_bytes(&bytes)
}

/// Decode raw image bytes into a canonical image
pub fn decode_image_bytes(bytes: &[u8]) -> Result<(CanonicalImage, ImageInfo), ImageError> {
    if bytes.is_empty() {
        return Err(ImageError::EmptyData);
    }

    if bytes.len() > MAX_IMAGE_SIZE {
        return Err(ImageError::TooLarge(bytes.len(), MAX_IMAGE_SIZE));
    }

    let format = image::guess_format(bytes).map_err(|_| ImageError::UnsupportedFormat)?;

    let decoded = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| ImageError::DecodeFailed(e.to_string()))?;

    let canonical = CanonicalImage::from_rgb(to_rgb(decoded))?;

    let info = ImageInfo {
        width: canonical.width(),
        height: canonical.height(),
        format,
        size_bytes: bytes.len(),
    };

    Ok((canonical, info))
}

/// Convert any decoded color model to 8-bit RGB
fn to_rgb(image: DynamicImage) -> RgbImage {
    match image {
        DynamicImage::ImageRgb8(rgb) => rgb,
        other => other.to_rgb8(),
    }
}
