// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors reported by an external model backend (segmentation,
/// classification or inpainting)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Invalid backend input: {0}")]
    InvalidInput(String),
}

/// Errors that abort a whole-image operation
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Segmentation backend is not loaded")]
    SegmenterUnavailable,

    #[error("Segmentation failed: {0}")]
    Segmentation(#[from] BackendError),

    #[error("Mask size {actual:?} does not match image size {expected:?}")]
    MaskShape {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
