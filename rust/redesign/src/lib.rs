// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Prompt-driven interior redesign: from segmented regions to an inpainting mask
//!
//! This crate provides the decision logic between three external models:
//! 1. Classifying segmented regions into a closed interior vocabulary
//! 2. Filtering the scene down to meaningful objects
//! 3. Selecting an editable mask from a free-text redesign request
//! 4. Composing a bounded generation prompt
//!
//! The segmentation, classification and inpainting models are reached
//! through the [`SegmentationBackend`], [`ClassificationBackend`] and
//! [`InpaintingBackend`] traits.
//!
//! # Usage
//!
//! ```rust,ignore
//! use room_redesign::{LabelVocabulary, RedesignConfig, RedesignPipeline};
//! use std::sync::Arc;
//!
//! let pipeline = RedesignPipeline::new(RedesignConfig::from_env()?, Arc::new(LabelVocabulary::standard()))
//!     .with_segmenter(Box::new(my_segmenter))
//!     .with_classifier(Box::new(my_classifier))
//!     .with_inpainter(Box::new(my_inpainter));
//!
//! let scene = pipeline.analyze(&room)?;
//! let outcome = pipeline.redesign(&room, &scene.clean, "paint the wall black");
//! ```

pub mod analysis;
pub mod classifier;
pub mod config;
pub mod error;
pub mod mask_ops;
pub mod mask_selector;
pub mod pipeline;
pub mod prompt;
pub mod scene_filter;
pub mod types;
pub mod vocabulary;

// Re-export commonly used types and functions
pub use analysis::SceneSummary;
pub use classifier::{normalize_label, ClassificationBackend, ObjectClassifier, PolicyRule};
pub use config::{RedesignConfig, SegmentationParams};
pub use error::{BackendError, PipelineError, Result};
pub use mask_selector::{MaskSelector, RequestIntent};
pub use pipeline::{
    InpaintingBackend, PreparedRedesign, RedesignOutcome, RedesignPipeline, SceneAnalysis,
    SegmentationBackend,
};
pub use prompt::PromptComposer;
pub use scene_filter::SceneFilter;
pub use types::{
    BoundingBox, ClassifiedObject, InpaintRequest, MaskSelection, ObjectLabel, Prediction,
    RawRegion, SceneObjectSet,
};
pub use vocabulary::LabelVocabulary;
