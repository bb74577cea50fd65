// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scene summary: label counts and general design suggestions

use crate::types::ClassifiedObject;
use serde::Serialize;
use std::collections::BTreeMap;

const SEATING_LABELS: &[&str] = &["koltuk", "kanepe"];
const WALL_LABEL: &str = "duvar";

/// Counts of meaningful labels in a scene
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct SceneSummary {
    pub counts: BTreeMap<String, usize>,
}

impl SceneSummary {
    /// Count labels, ignoring rejection markers
    pub fn from_objects(objects: &[ClassifiedObject]) -> Self {
        let mut counts = BTreeMap::new();
        for label in objects.iter().filter_map(|obj| obj.label.as_object()) {
            *counts.entry(label.to_string()).or_insert(0) += 1;
        }
        Self { counts }
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn count(&self, label: &str) -> usize {
        self.counts.get(label).copied().unwrap_or(0)
    }

    pub fn suggestions(&self) -> Vec<&'static str> {
        let mut suggestions = Vec::new();
        if SEATING_LABELS.iter().any(|l| self.counts.contains_key(*l)) {
            suggestions.push(
                "Lighting matched to the seating area can make the room feel larger.",
            );
        }
        if self.counts.contains_key(WALL_LABEL) {
            suggestions.push(
                "The walls read as neutral; an accent wall would give the design more energy.",
            );
        }
        suggestions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BoundingBox, ObjectLabel};
    use image::GrayImage;
    use std::sync::Arc;

    fn object(label: ObjectLabel) -> ClassifiedObject {
        ClassifiedObject {
            mask: Arc::new(GrayImage::new(2, 2)),
            bbox: BoundingBox::new(0, 0, 2, 2),
            area: 4,
            label,
        }
    }

    #[test]
    fn test_counts_skip_sentinels() {
        let summary = SceneSummary::from_objects(&[
            object(ObjectLabel::object("koltuk")),
            object(ObjectLabel::object("koltuk")),
            object(ObjectLabel::object("masa")),
            object(ObjectLabel::Unclassified),
            object(ObjectLabel::TooSmall),
        ]);
        assert_eq!(summary.total(), 3);
        assert_eq!(summary.count("koltuk"), 2);
        assert_eq!(summary.count("masa"), 1);
        assert_eq!(summary.count("duvar"), 0);
    }

    #[test]
    fn test_suggestions() {
        let summary = SceneSummary::from_objects(&[
            object(ObjectLabel::object("kanepe")),
            object(ObjectLabel::object("duvar")),
        ]);
        assert_eq!(summary.suggestions().len(), 2);

        let summary = SceneSummary::from_objects(&[object(ObjectLabel::object("masa"))]);
        assert!(summary.suggestions().is_empty());
        assert!(SceneSummary::default().is_empty());
    }
}
