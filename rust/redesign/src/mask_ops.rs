// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Boolean mask operations on single-channel images
//!
//! Masks are `GrayImage`s where any non-zero pixel is foreground. Masks
//! produced here use 255 for foreground and 0 for background.

use crate::error::{PipelineError, Result};
use crate::types::BoundingBox;
use image::{GrayImage, Luma, RgbImage};
use imageproc::distance_transform::Norm;

pub const FOREGROUND: u8 = 255;

/// An all-background mask
pub fn empty_mask(width: u32, height: u32) -> GrayImage {
    GrayImage::new(width, height)
}

/// Normalize any non-zero pixel to 255
pub fn binarize(mask: &GrayImage) -> GrayImage {
    let mut result = mask.clone();
    for pixel in result.pixels_mut() {
        if pixel.0[0] != 0 {
            pixel.0[0] = FOREGROUND;
        }
    }
    result
}

/// Morphological dilation with a square structuring element - expands foreground
pub fn dilate(mask: &GrayImage, radius: u8) -> GrayImage {
    if radius == 0 {
        return binarize(mask);
    }
    imageproc::morphology::dilate(&binarize(mask), Norm::LInf, radius)
}

/// OR `mask` into `target` in place
pub fn union_into(target: &mut GrayImage, mask: &GrayImage) -> Result<()> {
    if target.dimensions() != mask.dimensions() {
        return Err(PipelineError::MaskShape {
            expected: target.dimensions(),
            actual: mask.dimensions(),
        });
    }
    for (dst, src) in target.pixels_mut().zip(mask.pixels()) {
        if src.0[0] != 0 {
            *dst = Luma([FOREGROUND]);
        }
    }
    Ok(())
}

/// Number of foreground pixels
pub fn foreground_count(mask: &GrayImage) -> u64 {
    mask.pixels().filter(|p| p.0[0] != 0).count() as u64
}

/// True when `mask` has foreground wherever `other` does
pub fn covers(mask: &GrayImage, other: &GrayImage) -> bool {
    mask.dimensions() == other.dimensions()
        && mask
            .pixels()
            .zip(other.pixels())
            .all(|(m, o)| o.0[0] == 0 || m.0[0] != 0)
}

/// Copy the pixels inside `bbox` (already clamped to the image)
pub fn crop_region(image: &RgbImage, bbox: &BoundingBox) -> RgbImage {
    image::imageops::crop_imm(image, bbox.x, bbox.y, bbox.width, bbox.height).to_image()
}
