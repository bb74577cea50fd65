// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Editable-mask selection from scene objects and a redesign request
//!
//! Two sources feed the combined mask:
//! - Structural: when the request mentions walls or floors, the largest
//!   matching structural candidate per requested category, dilated to cover
//!   segmentation undershoot along room edges
//! - Furniture: every movable object, undilated

use crate::config::RedesignConfig;
use crate::mask_ops::{dilate, empty_mask, union_into};
use crate::types::{ClassifiedObject, MaskSelection, ObjectLabel};
use crate::vocabulary::LabelVocabulary;
use image::GrayImage;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Structural categories a request can ask to change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructuralTarget {
    Wall,
    Floor,
}

/// Structural intent parsed from a redesign request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RequestIntent {
    pub wall: bool,
    pub floor: bool,
}

impl RequestIntent {
    pub fn any(&self) -> bool {
        self.wall || self.floor
    }
}

pub struct MaskSelector {
    vocabulary: Arc<LabelVocabulary>,
    candidate_limit: usize,
    dilation_radius: u8,
}

impl MaskSelector {
    pub fn new(vocabulary: Arc<LabelVocabulary>, config: &RedesignConfig) -> Self {
        Self {
            vocabulary,
            candidate_limit: config.structural_candidate_limit,
            dilation_radius: config.structural_dilation_radius,
        }
    }

    pub fn parse_intent(&self, request: &str) -> RequestIntent {
        RequestIntent {
            wall: self.vocabulary.mentions_wall(request),
            floor: self.vocabulary.mentions_floor(request),
        }
    }

    /// Build the combined mask for `request` over an image of `(width, height)`.
    ///
    /// An empty `changed_labels` set means there is nothing to redesign and
    /// generation should be skipped.
    pub fn select(
        &self,
        objects: &[ClassifiedObject],
        request: &str,
        (width, height): (u32, u32),
    ) -> MaskSelection {
        let mut mask = empty_mask(width, height);
        let mut changed_labels = BTreeSet::new();

        let intent = self.parse_intent(request);
        if intent.any() {
            self.merge_structural(objects, intent, &mut mask, &mut changed_labels);
        }

        for obj in objects {
            let Some(label) = obj.label.as_object() else {
                continue;
            };
            if self.vocabulary.is_changeable(label) && merge(&mut mask, &obj.mask) {
                changed_labels.insert(label.to_string());
            }
        }

        if changed_labels.is_empty() {
            tracing::info!(request, "No objects matched the redesign request");
        } else {
            tracing::debug!(
                wall = intent.wall,
                floor = intent.floor,
                changed = ?changed_labels,
                "Selected redesign mask"
            );
        }

        MaskSelection {
            mask,
            changed_labels,
        }
    }

    /// Largest structural candidates: unclassified, too-small, empty-space
    /// or structural regions, biggest first
    pub fn structural_candidates<'a>(
        &self,
        objects: &'a [ClassifiedObject],
    ) -> Vec<&'a ClassifiedObject> {
        let display = &self.vocabulary.structural_display;
        let mut candidates: Vec<&ClassifiedObject> = objects
            .iter()
            .filter(|obj| match &obj.label {
                ObjectLabel::Unclassified | ObjectLabel::TooSmall => true,
                ObjectLabel::Object(label) => {
                    *label == display.empty_space || self.vocabulary.is_structural_display(label)
                }
                _ => false,
            })
            .collect();
        candidates.sort_by(|a, b| b.area.cmp(&a.area));
        candidates.truncate(self.candidate_limit);
        candidates
    }

    fn merge_structural(
        &self,
        objects: &[ClassifiedObject],
        intent: RequestIntent,
        mask: &mut GrayImage,
        changed_labels: &mut BTreeSet<String>,
    ) {
        let mut wall_pending = intent.wall;
        let mut floor_pending = intent.floor;

        for candidate in self.structural_candidates(objects) {
            if !wall_pending && !floor_pending {
                break;
            }

            let target = if wall_pending && self.matches(candidate, StructuralTarget::Wall) {
                StructuralTarget::Wall
            } else if floor_pending && self.matches(candidate, StructuralTarget::Floor) {
                StructuralTarget::Floor
            } else {
                continue;
            };

            let dilated = dilate(&candidate.mask, self.dilation_radius);
            if !merge(mask, &dilated) {
                continue;
            }

            let display = &self.vocabulary.structural_display;
            let label = match target {
                StructuralTarget::Wall => {
                    wall_pending = false;
                    &display.wall
                }
                StructuralTarget::Floor => {
                    floor_pending = false;
                    &display.floor
                }
            };
            tracing::debug!(
                label = %label,
                source = %candidate.label,
                area = candidate.area,
                "Structural region selected"
            );
            changed_labels.insert(label.clone());
        }
    }

    fn matches(&self, obj: &ClassifiedObject, target: StructuralTarget) -> bool {
        let display = &self.vocabulary.structural_display;
        match &obj.label {
            ObjectLabel::Unclassified => true,
            ObjectLabel::Object(label) => match target {
                StructuralTarget::Wall => *label == display.wall,
                StructuralTarget::Floor => *label == display.floor,
            },
            _ => false,
        }
    }
}

/// OR `src` into `mask`, skipping masks of the wrong size
fn merge(mask: &mut GrayImage, src: &GrayImage) -> bool {
    match union_into(mask, src) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Skipping region mask");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mask_ops::{covers, foreground_count, FOREGROUND};
    use crate::types::BoundingBox;
    use image::Luma;

    fn rect_object(size: (u32, u32), rect: (u32, u32, u32, u32), label: ObjectLabel) -> ClassifiedObject {
        let (x0, y0, w, h) = rect;
        let mut mask = GrayImage::new(size.0, size.1);
        for y in y0..y0 + h {
            for x in x0..x0 + w {
                mask.put_pixel(x, y, Luma([FOREGROUND]));
            }
        }
        ClassifiedObject {
            mask: Arc::new(mask),
            bbox: BoundingBox::new(x0, y0, w, h),
            area: w as u64 * h as u64,
            label,
        }
    }

    fn selector(radius: u8) -> MaskSelector {
        let config = RedesignConfig {
            structural_dilation_radius: radius,
            ..RedesignConfig::default()
        };
        MaskSelector::new(Arc::new(LabelVocabulary::standard()), &config)
    }

    fn labels(selection: &MaskSelection) -> Vec<&str> {
        selection.changed_labels.iter().map(String::as_str).collect()
    }

    #[test]
    fn test_wall_request_dilates_unclassified_region() {
        let size = (1000, 1000);
        let wall = rect_object(size, (0, 0, 1000, 200), ObjectLabel::Unclassified);
        let sofa = rect_object(size, (400, 600, 50, 100), ObjectLabel::object("koltuk"));
        assert_eq!(wall.area, 200_000);
        assert_eq!(sofa.area, 5_000);

        let selector = MaskSelector::new(
            Arc::new(LabelVocabulary::standard()),
            &RedesignConfig::default(),
        );
        let selection = selector.select(&[wall.clone(), sofa.clone()], "paint the wall black", size);

        assert_eq!(labels(&selection), vec!["duvar", "koltuk"]);
        assert!(covers(&selection.mask, &dilate(&wall.mask, 15)));
        assert!(covers(&selection.mask, &sofa.mask));
        // wall grown by 15px, sofa untouched
        assert_eq!(selection.mask.get_pixel(10, 214).0[0], FOREGROUND);
        assert_eq!(selection.mask.get_pixel(10, 215).0[0], 0);
        assert_eq!(selection.mask.get_pixel(399, 650).0[0], 0);
        assert_eq!(
            foreground_count(&selection.mask),
            1000 * 215 + 5_000
        );
    }

    #[test]
    fn test_no_structural_keywords_never_dilates() {
        let size = (100, 100);
        let objects = vec![
            rect_object(size, (0, 0, 100, 40), ObjectLabel::object("duvar")),
            rect_object(size, (0, 60, 100, 40), ObjectLabel::Unclassified),
            rect_object(size, (10, 45, 10, 10), ObjectLabel::object("sandalye")),
        ];
        let selection = selector(5).select(&objects, "Modern minimalist chairs", size);

        assert_eq!(labels(&selection), vec!["sandalye"]);
        assert_eq!(selection.mask, *objects[2].mask);
    }

    #[test]
    fn test_empty_objects_nothing_to_redesign() {
        let selection = selector(15).select(&[], "paint the wall black", (64, 48));
        assert!(selection.is_empty());
        assert_eq!(selection.mask.dimensions(), (64, 48));
        assert_eq!(foreground_count(&selection.mask), 0);
    }

    #[test]
    fn test_wall_and_floor_each_get_own_region() {
        let size = (100, 100);
        let objects = vec![
            rect_object(size, (0, 0, 100, 30), ObjectLabel::Unclassified),
            rect_object(size, (0, 70, 100, 25), ObjectLabel::object("zemin")),
            rect_object(size, (0, 40, 100, 10), ObjectLabel::Unclassified),
        ];
        let selection = selector(1).select(&objects, "white wall and oak floor", size);

        assert_eq!(labels(&selection), vec!["duvar", "zemin"]);
        assert!(covers(&selection.mask, &objects[0].mask));
        assert!(covers(&selection.mask, &objects[1].mask));
        // third candidate is not needed once both categories are satisfied
        assert_eq!(selection.mask.get_pixel(50, 45).0[0], 0);
    }

    #[test]
    fn test_floor_request_skips_wall_regions() {
        let size = (100, 100);
        let objects = vec![
            rect_object(size, (0, 0, 100, 60), ObjectLabel::object("duvar")),
            rect_object(size, (0, 80, 100, 20), ObjectLabel::object("zemin")),
        ];
        let selection = selector(2).select(&objects, "Marble tiling", size);

        assert_eq!(labels(&selection), vec!["zemin"]);
        assert_eq!(selection.mask.get_pixel(50, 10).0[0], 0);
        assert_eq!(selection.mask.get_pixel(50, 78).0[0], FOREGROUND);
    }

    #[test]
    fn test_only_top_candidates_considered() {
        let size = (100, 100);
        let objects = vec![
            rect_object(size, (0, 0, 100, 20), ObjectLabel::object("tavan")),
            rect_object(size, (0, 20, 100, 19), ObjectLabel::object("boş alan")),
            rect_object(size, (0, 40, 100, 18), ObjectLabel::object("tavan")),
            rect_object(size, (0, 60, 100, 5), ObjectLabel::object("duvar")),
        ];
        let selection = selector(2).select(&objects, "green walls", size);

        assert!(selection.is_empty());
        assert_eq!(foreground_count(&selection.mask), 0);
    }

    #[test]
    fn test_structural_candidates_sorted_and_limited() {
        let size = (50, 50);
        let objects = vec![
            rect_object(size, (0, 0, 10, 10), ObjectLabel::Unclassified),
            rect_object(size, (0, 0, 40, 40), ObjectLabel::object("koltuk")),
            rect_object(size, (0, 0, 30, 30), ObjectLabel::object("duvar")),
            rect_object(size, (0, 0, 20, 20), ObjectLabel::TooSmall),
            rect_object(size, (0, 0, 25, 25), ObjectLabel::object("boş alan")),
            rect_object(size, (0, 0, 5, 5), ObjectLabel::object("zemin")),
        ];
        let candidates = selector(1).structural_candidates(&objects);
        let areas: Vec<u64> = candidates.iter().map(|c| c.area).collect();
        assert_eq!(areas, vec![900, 625, 400]);
    }

    #[test]
    fn test_too_small_regions_take_candidate_slots() {
        let size = (100, 100);
        let objects = vec![
            rect_object(size, (0, 0, 100, 30), ObjectLabel::TooSmall),
            rect_object(size, (0, 30, 100, 25), ObjectLabel::object("tavan")),
            rect_object(size, (0, 55, 100, 20), ObjectLabel::TooSmall),
            rect_object(size, (0, 80, 100, 10), ObjectLabel::Unclassified),
        ];
        let selection = selector(1).select(&objects, "white walls", size);

        // the unclassified region is fourth by area, so no wall is found
        assert!(selection.is_empty());
    }

    #[test]
    fn test_structural_and_furniture_overlap_is_harmless() {
        let size = (60, 60);
        let objects = vec![
            rect_object(size, (10, 10, 30, 30), ObjectLabel::Unclassified),
            rect_object(size, (20, 20, 10, 10), ObjectLabel::object("masa")),
        ];
        let selection = selector(3).select(&objects, "duvar rengi mavi", size);

        assert_eq!(labels(&selection), vec!["duvar", "masa"]);
        assert_eq!(foreground_count(&selection.mask), 36 * 36);
    }

    #[test]
    fn test_mismatched_mask_is_skipped() {
        let objects = vec![
            rect_object((30, 30), (0, 0, 10, 10), ObjectLabel::object("lamba")),
            rect_object((40, 40), (0, 0, 10, 10), ObjectLabel::object("halı")),
        ];
        let selection = selector(1).select(&objects, "boho", (40, 40));
        assert_eq!(labels(&selection), vec!["halı"]);
    }

    #[test]
    fn test_parse_intent() {
        let selector = selector(1);
        assert_eq!(
            selector.parse_intent("Black WALLS, wooden floor"),
            RequestIntent {
                wall: true,
                floor: true
            }
        );
        assert!(!selector.parse_intent("scandinavian sofa").any());
    }

    #[test]
    fn test_embedded_keywords_do_not_trigger_floor() {
        let selector = selector(1);
        assert_eq!(selector.parse_intent("cozy textile sofa"), RequestIntent::default());
        assert_eq!(selector.parse_intent("dark background"), RequestIntent::default());

        let size = (100, 100);
        let objects = vec![
            rect_object(size, (0, 60, 100, 40), ObjectLabel::object("zemin")),
            rect_object(size, (10, 10, 20, 20), ObjectLabel::object("koltuk")),
        ];
        let selection = selector.select(&objects, "cozy textile sofa", size);
        assert_eq!(labels(&selection), vec!["koltuk"]);
        assert_eq!(foreground_count(&selection.mask), 400);
    }
}
