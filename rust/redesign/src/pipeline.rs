// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end redesign over injected model backends
//!
//! ```text
//! image ─► segment ─► classify (per region) ─► clean ─┬─► select mask ─┐
//!                                                     └─► compose prompt ┴─► inpaint
//! ```
//!
//! Backends are loaded once by the caller and handed in; a missing backend
//! disables only the stage that needs it.

use crate::analysis::SceneSummary;
use crate::classifier::{ClassificationBackend, ObjectClassifier};
use crate::config::{RedesignConfig, SegmentationParams};
use crate::error::{BackendError, PipelineError, Result};
use crate::mask_selector::MaskSelector;
use crate::prompt::PromptComposer;
use crate::scene_filter::SceneFilter;
use crate::types::{ClassifiedObject, InpaintRequest, MaskSelection, RawRegion, SceneObjectSet};
use crate::vocabulary::LabelVocabulary;
use image::RgbImage;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

/// External automatic mask generator
pub trait SegmentationBackend {
    /// Propose candidate regions for the whole image, in any order
    fn segment(
        &self,
        image: &RgbImage,
        params: &SegmentationParams,
    ) -> std::result::Result<Vec<RawRegion>, BackendError>;
}

/// External diffusion inpainting model
pub trait InpaintingBackend {
    fn inpaint(&self, request: &InpaintRequest) -> std::result::Result<RgbImage, BackendError>;
}

/// Classified regions of one image
#[derive(Debug, Clone)]
pub struct SceneAnalysis {
    /// Every classified region, including rejected ones
    pub objects: Vec<ClassifiedObject>,
    /// Regions with meaningful labels
    pub clean: SceneObjectSet,
    pub summary: SceneSummary,
}

/// Mask and prompt ready for generation
#[derive(Debug, Clone)]
pub struct PreparedRedesign {
    pub selection: MaskSelection,
    pub prompt: String,
}

/// Result of a redesign request
#[derive(Debug, Clone)]
pub enum RedesignOutcome {
    Generated {
        image: RgbImage,
        changed_labels: BTreeSet<String>,
        prompt: String,
    },
    /// Nothing in the scene matched the request; the original image is returned
    NothingToRedesign { image: RgbImage },
    /// The inpainting backend is missing or failed
    GenerationFailed { reason: String },
}

impl RedesignOutcome {
    /// The image to show the user, if any
    pub fn image(&self) -> Option<&RgbImage> {
        match self {
            RedesignOutcome::Generated { image, .. } => Some(image),
            RedesignOutcome::NothingToRedesign { image } => Some(image),
            RedesignOutcome::GenerationFailed { .. } => None,
        }
    }
}

pub struct RedesignPipeline {
    config: RedesignConfig,
    vocabulary: Arc<LabelVocabulary>,
    segmenter: Option<Box<dyn SegmentationBackend>>,
    classifier: ObjectClassifier,
    filter: SceneFilter,
    selector: MaskSelector,
    composer: PromptComposer,
    inpainter: Option<Box<dyn InpaintingBackend>>,
}

impl RedesignPipeline {
    /// Create a pipeline with no backends loaded
    pub fn new(config: RedesignConfig, vocabulary: Arc<LabelVocabulary>) -> Self {
        Self {
            classifier: ObjectClassifier::new(None, Arc::clone(&vocabulary), &config),
            filter: SceneFilter::new(Arc::clone(&vocabulary)),
            selector: MaskSelector::new(Arc::clone(&vocabulary), &config),
            composer: PromptComposer::new(&config),
            segmenter: None,
            inpainter: None,
            vocabulary,
            config,
        }
    }

    pub fn with_segmenter(mut self, segmenter: Box<dyn SegmentationBackend>) -> Self {
        self.segmenter = Some(segmenter);
        self
    }

    pub fn with_classifier(mut self, backend: Box<dyn ClassificationBackend>) -> Self {
        self.classifier =
            ObjectClassifier::new(Some(backend), Arc::clone(&self.vocabulary), &self.config);
        self
    }

    pub fn with_inpainter(mut self, inpainter: Box<dyn InpaintingBackend>) -> Self {
        self.inpainter = Some(inpainter);
        self
    }

    pub fn config(&self) -> &RedesignConfig {
        &self.config
    }

    pub fn classifier(&self) -> &ObjectClassifier {
        &self.classifier
    }

    pub fn scene_filter(&self) -> &SceneFilter {
        &self.filter
    }

    /// Segment the image and classify every region
    pub fn analyze(&self, image: &RgbImage) -> Result<SceneAnalysis> {
        let segmenter = self
            .segmenter
            .as_ref()
            .ok_or(PipelineError::SegmenterUnavailable)?;

        let start = Instant::now();
        let regions = segmenter.segment(image, &self.config.segmentation)?;
        tracing::info!(
            regions = regions.len(),
            segment_time_ms = start.elapsed().as_millis() as u64,
            "Segmentation complete"
        );

        let objects = self.classify_regions(image, &regions);
        let clean = self.filter.clean(&objects);
        let summary = SceneSummary::from_objects(clean.as_slice());

        tracing::info!(
            classified = objects.len(),
            meaningful = clean.len(),
            total_time_ms = start.elapsed().as_millis() as u64,
            "Scene analysis complete"
        );

        Ok(SceneAnalysis {
            objects,
            clean,
            summary,
        })
    }

    /// Classify regions one by one; regions outside the image are skipped
    pub fn classify_regions(&self, image: &RgbImage, regions: &[RawRegion]) -> Vec<ClassifiedObject> {
        let dimensions = image.dimensions();
        regions
            .iter()
            .filter_map(|region| {
                if region.mask.dimensions() != dimensions {
                    tracing::warn!(
                        mask = ?region.mask.dimensions(),
                        image = ?dimensions,
                        "Skipping region with mismatched mask"
                    );
                    return None;
                }
                let label = self.classifier.classify_region(image, region)?;
                tracing::debug!(label = %label, area = region.area, "Classified region");
                Some(ClassifiedObject::from_region(region, label))
            })
            .collect()
    }

    /// Select the mask and compose the prompt; `None` when nothing matches
    pub fn prepare(
        &self,
        image_size: (u32, u32),
        objects: &[ClassifiedObject],
        request: &str,
    ) -> Option<PreparedRedesign> {
        let selection = self.selector.select(objects, request, image_size);
        if selection.is_empty() {
            return None;
        }
        let prompt = self.composer.compose(objects, request);
        Some(PreparedRedesign { selection, prompt })
    }

    /// Assemble the backend request for a prepared redesign
    pub fn inpaint_request(&self, image: &RgbImage, prepared: &PreparedRedesign) -> InpaintRequest {
        InpaintRequest {
            image: image.clone(),
            mask: prepared.selection.mask.clone(),
            prompt: prepared.prompt.clone(),
            negative_prompt: self.config.negative_prompt.clone(),
            guidance_scale: self.config.guidance_scale,
            num_inference_steps: self.config.num_inference_steps,
            seed: self.config.seed,
        }
    }

    /// Redesign the scene according to `request`
    pub fn redesign(&self, image: &RgbImage, objects: &SceneObjectSet, request: &str) -> RedesignOutcome {
        let Some(prepared) = self.prepare(image.dimensions(), objects.as_slice(), request) else {
            tracing::warn!("Nothing to redesign; returning the original image");
            return RedesignOutcome::NothingToRedesign {
                image: image.clone(),
            };
        };

        let Some(inpainter) = &self.inpainter else {
            return RedesignOutcome::GenerationFailed {
                reason: "inpainting backend is not loaded".into(),
            };
        };

        tracing::info!(
            changed = ?prepared.selection.changed_labels,
            prompt = %prepared.prompt,
            "Starting generation"
        );

        let request = self.inpaint_request(image, &prepared);
        let start = Instant::now();
        match inpainter.inpaint(&request) {
            Ok(generated) => {
                tracing::info!(
                    generate_time_ms = start.elapsed().as_millis() as u64,
                    "Generation complete"
                );
                RedesignOutcome::Generated {
                    image: generated,
                    changed_labels: prepared.selection.changed_labels,
                    prompt: prepared.prompt,
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Generation failed");
                RedesignOutcome::GenerationFailed {
                    reason: e.to_string(),
                }
            }
        }
    }
}
