// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Pipeline configuration, loaded from defaults, JSON or environment variables.

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Parameters handed verbatim to the automatic mask generator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SegmentationParams {
    /// Prompt grid density along each image side
    pub points_per_side: u32,
    pub pred_iou_thresh: f32,
    pub stability_score_thresh: f32,
    pub box_nms_thresh: f32,
    /// Regions below this many pixels are discarded by the generator
    pub min_mask_region_area: u64,
}

impl Default for SegmentationParams {
    fn default() -> Self {
        Self {
            points_per_side: 16,
            pred_iou_thresh: 0.90,
            stability_score_thresh: 0.95,
            box_nms_thresh: 0.7,
            min_mask_region_area: 2000,
        }
    }
}

/// Tunable constants for classification, mask selection and generation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RedesignConfig {
    /// Crops narrower or shorter than this are rejected as too small (pixels)
    pub min_crop_side: u32,
    /// Top-1 confidence below which small regions are discarded
    pub min_confidence: f32,
    /// Fraction of the image area above which a region counts as large
    pub large_area_fraction: f64,
    /// Number of predictions requested from the classifier
    pub top_k: usize,
    /// How many of the largest structural candidates are considered
    pub structural_candidate_limit: usize,
    /// Dilation radius applied to structural masks (pixels)
    pub structural_dilation_radius: u8,
    /// Upper bound on composed prompt length (characters)
    pub max_prompt_chars: usize,
    pub negative_prompt: String,
    pub guidance_scale: f32,
    pub num_inference_steps: u32,
    pub seed: u64,
    pub segmentation: SegmentationParams,
}

impl Default for RedesignConfig {
    fn default() -> Self {
        Self {
            min_crop_side: 16,
            min_confidence: 0.15,
            large_area_fraction: 0.05,
            top_k: 5,
            structural_candidate_limit: 3,
            structural_dilation_radius: 15,
            max_prompt_chars: 400,
            negative_prompt:
                "bad quality, blurry, noise, distortions, disfigured, monochrome, cartoon, painting"
                    .into(),
            guidance_scale: 7.5,
            num_inference_steps: 50,
            seed: 42,
            segmentation: SegmentationParams::default(),
        }
    }
}

impl RedesignConfig {
    /// Load configuration from `REDESIGN_*` environment variables.
    ///
    /// Missing or unparsable values fall back to the defaults; parsed values
    /// out of range are rejected.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load a JSON configuration document; omitted fields take defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: RedesignConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(PipelineError::Config(format!(
                "min_confidence must be within [0, 1], got {}",
                self.min_confidence
            )));
        }
        if !(0.0..=1.0).contains(&self.large_area_fraction) {
            return Err(PipelineError::Config(format!(
                "large_area_fraction must be within [0, 1], got {}",
                self.large_area_fraction
            )));
        }
        if self.top_k == 0 {
            return Err(PipelineError::Config("top_k must be at least 1".into()));
        }
        if self.num_inference_steps == 0 {
            return Err(PipelineError::Config(
                "num_inference_steps must be at least 1".into(),
            ));
        }
        Ok(())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let seg = defaults.segmentation.clone();
        let config = Self {
            min_crop_side: parse_or(&lookup, "REDESIGN_MIN_CROP_SIDE", defaults.min_crop_side),
            min_confidence: parse_or(&lookup, "REDESIGN_MIN_CONFIDENCE", defaults.min_confidence),
            large_area_fraction: parse_or(
                &lookup,
                "REDESIGN_LARGE_AREA_FRACTION",
                defaults.large_area_fraction,
            ),
            top_k: parse_or(&lookup, "REDESIGN_TOP_K", defaults.top_k),
            structural_candidate_limit: parse_or(
                &lookup,
                "REDESIGN_STRUCTURAL_CANDIDATES",
                defaults.structural_candidate_limit,
            ),
            structural_dilation_radius: parse_or(
                &lookup,
                "REDESIGN_DILATION_RADIUS",
                defaults.structural_dilation_radius,
            ),
            max_prompt_chars: parse_or(
                &lookup,
                "REDESIGN_MAX_PROMPT_CHARS",
                defaults.max_prompt_chars,
            ),
            negative_prompt: lookup("REDESIGN_NEGATIVE_PROMPT").unwrap_or(defaults.negative_prompt),
            guidance_scale: parse_or(&lookup, "REDESIGN_GUIDANCE_SCALE", defaults.guidance_scale),
            num_inference_steps: parse_or(
                &lookup,
                "REDESIGN_INFERENCE_STEPS",
                defaults.num_inference_steps,
            ),
            seed: parse_or(&lookup, "REDESIGN_SEED", defaults.seed),
            segmentation: SegmentationParams {
                points_per_side: parse_or(
                    &lookup,
                    "REDESIGN_SEG_POINTS_PER_SIDE",
                    seg.points_per_side,
                ),
                pred_iou_thresh: parse_or(
                    &lookup,
                    "REDESIGN_SEG_PRED_IOU_THRESH",
                    seg.pred_iou_thresh,
                ),
                stability_score_thresh: parse_or(
                    &lookup,
                    "REDESIGN_SEG_STABILITY_THRESH",
                    seg.stability_score_thresh,
                ),
                box_nms_thresh: parse_or(&lookup, "REDESIGN_SEG_BOX_NMS_THRESH", seg.box_nms_thresh),
                min_mask_region_area: parse_or(
                    &lookup,
                    "REDESIGN_SEG_MIN_REGION_AREA",
                    seg.min_mask_region_area,
                ),
            },
        };
        config.validate()?;
        Ok(config)
    }
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    lookup(key)
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}
