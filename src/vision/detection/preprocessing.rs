// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Letterbox preprocessing for YOLO-style detectors

use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::Array4;

/// Default square input edge for exported YOLO models
pub const DEFAULT_INPUT_SIZE: u32 = 640;

/// Letterbox fill value (the gray YOLO was trained with)
pub const PAD_VALUE: u8 = 114;

/// Scaling and padding applied during letterboxing
///
/// Needed to map boxes from model input space back to the source image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LetterboxInfo {
    /// Scale factor applied to the source image
    pub scale: f32,
    /// Left padding in model input pixels
    pub offset_x: u32,
    /// Top padding in model input pixels
    pub offset_y: u32,
    pub original_width: u32,
    pub original_height: u32,
}

impl LetterboxInfo {
    pub fn new(width: u32, height: u32, target_size: u32) -> Self {
        let (new_w, new_h, scale) = fitted_size(width, height, target_size);
        Self {
            scale,
            offset_x: (target_size - new_w) / 2,
            offset_y: (target_size - new_h) / 2,
            original_width: width,
            original_height: height,
        }
    }

    /// Map a point from model input space back to source image space
    pub fn map_to_original(&self, x: f32, y: f32) -> (f32, f32) {
        let orig_x = (x - self.offset_x as f32) / self.scale;
        let orig_y = (y - self.offset_y as f32) / self.scale;
        (orig_x, orig_y)
    }
}

/// Aspect-preserving size that fits inside `target_size` squared
fn fitted_size(width: u32, height: u32, target_size: u32) -> (u32, u32, f32) {
    let scale =
        (target_size as f32 / width.max(1) as f32).min(target_size as f32 / height.max(1) as f32);
    let new_w = ((width as f32 * scale).round() as u32).clamp(1, target_size);
    let new_h = ((height as f32 * scale).round() as u32).clamp(1, target_size);
    (new_w, new_h, scale)
}

/// Letterbox an RGB image into an NCHW `[1, 3, S, S]` tensor scaled to [0, 1]
///
/// Steps:
/// 1. Resize preserving aspect ratio (bilinear)
/// 2. Centre on a `PAD_VALUE` canvas
/// 3. Divide by 255, no mean/std normalization
pub fn letterbox(image: &RgbImage, target_size: u32) -> (Array4<f32>, LetterboxInfo) {
    let (width, height) = image.dimensions();
    let info = LetterboxInfo::new(width, height, target_size);
    let (new_w, new_h, _) = fitted_size(width, height, target_size);

    let resized = if (new_w, new_h) == (width, height) {
        image.clone()
    } else {
        imageops::resize(image, new_w, new_h, FilterType::Triangle)
    };

    let size = target_size as usize;
    let mut tensor = Array4::from_elem((1, 3, size, size), PAD_VALUE as f32 / 255.0);

    let (ox, oy) = (info.offset_x as usize, info.offset_y as usize);
    for (x, y, pixel) in resized.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, oy + y as usize, ox + x as usize]] = pixel[c] as f32 / 255.0;
        }
    }

    (tensor, info)
}
