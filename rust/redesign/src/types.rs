// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Core types shared by the classification, masking and prompt stages

use image::{GrayImage, RgbImage};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Axis-aligned region bounds in pixels (x, y, width, height)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Clip the box to an image of the given size.
    ///
    /// Returns `None` when nothing of the box remains inside the image.
    pub fn clamp_to(&self, image_width: u32, image_height: u32) -> Option<BoundingBox> {
        let x_end = self.x.saturating_add(self.width).min(image_width);
        let y_end = self.y.saturating_add(self.height).min(image_height);
        if x_end <= self.x || y_end <= self.y {
            return None;
        }
        Some(BoundingBox::new(self.x, self.y, x_end - self.x, y_end - self.y))
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// A candidate object produced by the segmentation backend
#[derive(Debug, Clone)]
pub struct RawRegion {
    /// Full-image boolean mask (255 = region pixel)
    pub mask: Arc<GrayImage>,
    pub bbox: BoundingBox,
    /// Number of foreground pixels
    pub area: u64,
}

/// One (label, confidence) pair from the classification backend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Prediction {
    pub label: String,
    /// Confidence in [0, 1]
    pub confidence: f32,
}

impl Prediction {
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }
}

/// Outcome of classifying a single region.
///
/// `Object` carries the display label; every other variant is a rejection
/// marker that must not reach mask selection or prompt composition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectLabel {
    Object(String),
    /// Confidence/area policy rejected every candidate
    Unclassified,
    /// Crop was empty or below the minimum side length
    TooSmall,
    /// No classification backend is loaded
    ModelError,
    /// The backend was loaded but inference failed for this region
    ClassificationFailed,
}

impl ObjectLabel {
    pub fn object(label: impl Into<String>) -> Self {
        ObjectLabel::Object(label.into())
    }

    /// The display label, if this is not a rejection marker
    pub fn as_object(&self) -> Option<&str> {
        match self {
            ObjectLabel::Object(label) => Some(label),
            _ => None,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        !matches!(self, ObjectLabel::Object(_))
    }
}

impl fmt::Display for ObjectLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectLabel::Object(label) => f.write_str(label),
            ObjectLabel::Unclassified => f.write_str("Unclassified"),
            ObjectLabel::TooSmall => f.write_str("TooSmall"),
            ObjectLabel::ModelError => f.write_str("ModelError"),
            ObjectLabel::ClassificationFailed => f.write_str("ClassificationFailed"),
        }
    }
}

/// A region paired with its final label.
///
/// The mask is shared with the originating [`RawRegion`], never copied.
#[derive(Debug, Clone)]
pub struct ClassifiedObject {
    pub mask: Arc<GrayImage>,
    pub bbox: BoundingBox,
    pub area: u64,
    pub label: ObjectLabel,
}

impl ClassifiedObject {
    pub fn from_region(region: &RawRegion, label: ObjectLabel) -> Self {
        Self {
            mask: Arc::clone(&region.mask),
            bbox: region.bbox,
            area: region.area,
            label,
        }
    }
}

/// Objects that survived scene filtering, in detection order.
///
/// Only [`crate::scene_filter::SceneFilter`] builds these, so every entry
/// carries a known display label.
#[derive(Debug, Clone, Default)]
pub struct SceneObjectSet {
    objects: Vec<ClassifiedObject>,
}

impl SceneObjectSet {
    pub(crate) fn from_filtered(objects: Vec<ClassifiedObject>) -> Self {
        Self { objects }
    }

    pub fn as_slice(&self) -> &[ClassifiedObject] {
        &self.objects
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ClassifiedObject> {
        self.objects.iter()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Distinct display labels, sorted
    pub fn labels(&self) -> BTreeSet<&str> {
        self.objects
            .iter()
            .filter_map(|obj| obj.label.as_object())
            .collect()
    }
}

impl<'a> IntoIterator for &'a SceneObjectSet {
    type Item = &'a ClassifiedObject;
    type IntoIter = std::slice::Iter<'a, ClassifiedObject>;

    fn into_iter(self) -> Self::IntoIter {
        self.objects.iter()
    }
}

/// Combined editable mask and the labels it covers
#[derive(Debug, Clone)]
pub struct MaskSelection {
    /// Single-channel mask, 255 = editable
    pub mask: GrayImage,
    pub changed_labels: BTreeSet<String>,
}

impl MaskSelection {
    /// True when there is nothing to redesign; generation must be skipped
    pub fn is_empty(&self) -> bool {
        self.changed_labels.is_empty()
    }
}

/// Everything the inpainting backend needs for one generation
#[derive(Debug, Clone)]
pub struct InpaintRequest {
    pub image: RgbImage,
    /// Single-channel mask, non-zero = editable
    pub mask: GrayImage,
    pub prompt: String,
    pub negative_prompt: String,
    pub guidance_scale: f32,
    pub num_inference_steps: u32,
    pub seed: u64,
}
