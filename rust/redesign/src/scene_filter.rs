// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Drops rejected and unknown labels before masking and prompting

use crate::types::{ClassifiedObject, SceneObjectSet};
use crate::vocabulary::LabelVocabulary;
use std::sync::Arc;

pub struct SceneFilter {
    vocabulary: Arc<LabelVocabulary>,
}

impl SceneFilter {
    pub fn new(vocabulary: Arc<LabelVocabulary>) -> Self {
        Self { vocabulary }
    }

    /// Keep objects whose label is a known display label, preserving order
    pub fn clean(&self, objects: &[ClassifiedObject]) -> SceneObjectSet {
        let kept: Vec<ClassifiedObject> = objects
            .iter()
            .filter(|obj| {
                obj.label
                    .as_object()
                    .is_some_and(|label| self.vocabulary.is_meaningful(label))
            })
            .cloned()
            .collect();

        tracing::debug!(
            input = objects.len(),
            kept = kept.len(),
            "Filtered scene objects"
        );

        SceneObjectSet::from_filtered(kept)
    }
}
