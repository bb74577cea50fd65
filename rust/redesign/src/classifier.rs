// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Region classification: top-k predictions to a single display label
//!
//! The decision runs an ordered list of policy rules, each of which either
//! settles the label or defers to the next one:
//!
//! 1. Confidence gate: low-confidence *small* regions are discarded
//! 2. Structural override: large regions whose top-1 token is structural
//!    (wall, floor, ...) are accepted regardless of confidence
//! 3. Whitelist scan: first non-blacklisted candidate with a whitelisted token
//! 4. Top-1 fallback: the top-1 token unless blacklisted
//!
//! Accepted tokens are then translated to display labels.

use crate::config::RedesignConfig;
use crate::error::BackendError;
use crate::mask_ops::crop_region;
use crate::types::{ObjectLabel, Prediction, RawRegion};
use crate::vocabulary::LabelVocabulary;
use image::RgbImage;
use std::sync::Arc;

/// External image classifier producing ranked predictions for a crop
pub trait ClassificationBackend {
    /// Return up to `k` predictions, ranked by descending confidence.
    /// Labels may be raw model labels (`category:subtype`).
    fn top_k(&self, crop: &RgbImage, k: usize) -> Result<Vec<Prediction>, BackendError>;
}

/// Reduce a raw model label to its lower-cased subtype (text after the last `:`)
pub fn normalize_label(raw: &str) -> String {
    raw.rsplit(':').next().unwrap_or(raw).trim().to_lowercase()
}

/// Outcome of a single policy rule
#[derive(Debug, Clone, PartialEq)]
pub enum RuleDecision {
    /// Accept this canonical token (translated afterwards)
    Accept(String),
    /// Reject the region with this marker
    Reject(ObjectLabel),
}

/// Inputs visible to every policy rule
#[derive(Debug, Clone)]
pub struct RuleInput<'a> {
    /// Normalized predictions, best first; never empty
    pub predictions: &'a [Prediction],
    pub region_area: u64,
    /// Pixel area above which a region counts as large
    pub required_area: f64,
    pub min_confidence: f32,
}

impl RuleInput<'_> {
    fn top(&self) -> &Prediction {
        &self.predictions[0]
    }

    fn is_large(&self) -> bool {
        self.region_area as f64 > self.required_area
    }
}

/// Classification policy rules, evaluated in [`PolicyRule::ORDER`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyRule {
    ConfidenceGate,
    StructuralOverride,
    WhitelistScan,
    TopOneFallback,
}

impl PolicyRule {
    pub const ORDER: [PolicyRule; 4] = [
        PolicyRule::ConfidenceGate,
        PolicyRule::StructuralOverride,
        PolicyRule::WhitelistScan,
        PolicyRule::TopOneFallback,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PolicyRule::ConfidenceGate => "confidence_gate",
            PolicyRule::StructuralOverride => "structural_override",
            PolicyRule::WhitelistScan => "whitelist_scan",
            PolicyRule::TopOneFallback => "top_one_fallback",
        }
    }

    /// Evaluate this rule; `None` defers to the next rule
    pub fn evaluate(&self, input: &RuleInput<'_>, vocab: &LabelVocabulary) -> Option<RuleDecision> {
        match self {
            PolicyRule::ConfidenceGate => {
                if input.top().confidence < input.min_confidence && !input.is_large() {
                    Some(RuleDecision::Reject(ObjectLabel::Unclassified))
                } else {
                    None
                }
            }
            PolicyRule::StructuralOverride => {
                if !input.is_large() {
                    return None;
                }
                let base = vocab.base_token(&input.top().label);
                vocab
                    .is_structural(base)
                    .then(|| RuleDecision::Accept(base.to_string()))
            }
            PolicyRule::WhitelistScan => input
                .predictions
                .iter()
                .filter(|p| !vocab.is_blacklisted(&p.label))
                .map(|p| vocab.base_token(&p.label))
                .find(|base| vocab.is_whitelisted(base))
                .map(|base| RuleDecision::Accept(base.to_string())),
            PolicyRule::TopOneFallback => {
                let top = &input.top().label;
                if vocab.is_blacklisted(top) {
                    Some(RuleDecision::Reject(ObjectLabel::Unclassified))
                } else {
                    Some(RuleDecision::Accept(vocab.base_token(top).to_string()))
                }
            }
        }
    }
}

/// Decides one label per region from crop size, area and classifier output
pub struct ObjectClassifier {
    backend: Option<Box<dyn ClassificationBackend>>,
    vocabulary: Arc<LabelVocabulary>,
    min_crop_side: u32,
    min_confidence: f32,
    large_area_fraction: f64,
    top_k: usize,
}

impl ObjectClassifier {
    /// Create a classifier. `backend = None` means the model failed to load;
    /// every classifiable region then yields [`ObjectLabel::ModelError`].
    pub fn new(
        backend: Option<Box<dyn ClassificationBackend>>,
        vocabulary: Arc<LabelVocabulary>,
        config: &RedesignConfig,
    ) -> Self {
        Self {
            backend,
            vocabulary,
            min_crop_side: config.min_crop_side,
            min_confidence: config.min_confidence,
            large_area_fraction: config.large_area_fraction,
            top_k: config.top_k,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.backend.is_some()
    }

    pub fn vocabulary(&self) -> &LabelVocabulary {
        &self.vocabulary
    }

    /// Classify a cropped region.
    ///
    /// Never fails: backend problems are reported through the label so a
    /// single bad region cannot abort the rest of the image.
    pub fn classify(&self, crop: &RgbImage, region_area: u64, total_image_area: u64) -> ObjectLabel {
        if self.is_too_small(crop.dimensions()) {
            return ObjectLabel::TooSmall;
        }

        let Some(backend) = &self.backend else {
            return ObjectLabel::ModelError;
        };

        match backend.top_k(crop, self.top_k) {
            Ok(predictions) => {
                self.decide(crop.dimensions(), region_area, total_image_area, &predictions)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Classification backend failed for region");
                ObjectLabel::ClassificationFailed
            }
        }
    }

    /// Crop `region` out of `image` and classify it
    pub fn classify_region(&self, image: &RgbImage, region: &RawRegion) -> Option<ObjectLabel> {
        let (width, height) = image.dimensions();
        let bbox = region.bbox.clamp_to(width, height)?;
        let crop = crop_region(image, &bbox);
        Some(self.classify(&crop, region.area, width as u64 * height as u64))
    }

    /// Apply the label policy to already-computed predictions.
    ///
    /// `crop_size` is (width, height) of the crop the predictions came from.
    pub fn decide(
        &self,
        crop_size: (u32, u32),
        region_area: u64,
        total_image_area: u64,
        predictions: &[Prediction],
    ) -> ObjectLabel {
        if self.is_too_small(crop_size) {
            return ObjectLabel::TooSmall;
        }

        let mut ranked: Vec<Prediction> = predictions
            .iter()
            .map(|p| Prediction::new(normalize_label(&p.label), p.confidence))
            .collect();
        ranked.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        ranked.truncate(self.top_k);

        if ranked.is_empty() {
            return ObjectLabel::Unclassified;
        }

        let input = RuleInput {
            predictions: &ranked,
            region_area,
            required_area: total_image_area as f64 * self.large_area_fraction,
            min_confidence: self.min_confidence,
        };

        for rule in PolicyRule::ORDER {
            if let Some(decision) = rule.evaluate(&input, &self.vocabulary) {
                tracing::debug!(
                    rule = rule.name(),
                    top_label = %ranked[0].label,
                    top_confidence = ranked[0].confidence,
                    region_area,
                    "Classification rule decided"
                );
                return match decision {
                    RuleDecision::Accept(token) => {
                        ObjectLabel::Object(self.vocabulary.translate(&token).to_string())
                    }
                    RuleDecision::Reject(label) => label,
                };
            }
        }

        // TopOneFallback always decides
        ObjectLabel::Unclassified
    }

    fn is_too_small(&self, (width, height): (u32, u32)) -> bool {
        width == 0 || height == 0 || width < self.min_crop_side || height < self.min_crop_side
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BoundingBox;
    use image::GrayImage;
    use std::cell::Cell;

    const TOTAL_AREA: u64 = 1000 * 1000;
    const SMALL_AREA: u64 = 5_000;
    const LARGE_AREA: u64 = 200_000;

    struct StaticBackend {
        predictions: Vec<Prediction>,
        calls: Cell<usize>,
    }

    impl StaticBackend {
        fn new(predictions: &[(&str, f32)]) -> Self {
            Self {
                predictions: predictions
                    .iter()
                    .map(|(l, c)| Prediction::new(*l, *c))
                    .collect(),
                calls: Cell::new(0),
            }
        }
    }

    impl ClassificationBackend for StaticBackend {
        fn top_k(&self, _crop: &RgbImage, k: usize) -> Result<Vec<Prediction>, BackendError> {
            self.calls.set(self.calls.get() + 1);
            Ok(self.predictions.iter().take(k).cloned().collect())
        }
    }

    struct FailingBackend;

    impl ClassificationBackend for FailingBackend {
        fn top_k(&self, _crop: &RgbImage, _k: usize) -> Result<Vec<Prediction>, BackendError> {
            Err(BackendError::Inference("tensor shape mismatch".into()))
        }
    }

    fn classifier_with(predictions: &[(&str, f32)]) -> ObjectClassifier {
        ObjectClassifier::new(
            Some(Box::new(StaticBackend::new(predictions))),
            Arc::new(LabelVocabulary::standard()),
            &RedesignConfig::default(),
        )
    }

    fn crop(width: u32, height: u32) -> RgbImage {
        RgbImage::new(width, height)
    }

    #[test]
    fn test_too_small_regardless_of_output() {
        let classifier = classifier_with(&[("sofa", 0.99)]);
        for (w, h) in [(0, 0), (15, 64), (64, 15), (15, 15)] {
            assert_eq!(
                classifier.classify(&crop(w, h), LARGE_AREA, TOTAL_AREA),
                ObjectLabel::TooSmall,
                "crop {}x{}",
                w,
                h
            );
        }
        assert_eq!(
            classifier.classify(&crop(16, 16), SMALL_AREA, TOTAL_AREA),
            ObjectLabel::object("koltuk")
        );
    }

    #[test]
    fn test_missing_backend_is_model_error() {
        let classifier = ObjectClassifier::new(
            None,
            Arc::new(LabelVocabulary::standard()),
            &RedesignConfig::default(),
        );
        assert!(!classifier.is_loaded());
        assert_eq!(
            classifier.classify(&crop(64, 64), SMALL_AREA, TOTAL_AREA),
            ObjectLabel::ModelError
        );
    }

    #[test]
    fn test_backend_failure_is_contained() {
        let classifier = ObjectClassifier::new(
            Some(Box::new(FailingBackend)),
            Arc::new(LabelVocabulary::standard()),
            &RedesignConfig::default(),
        );
        assert_eq!(
            classifier.classify(&crop(64, 64), SMALL_AREA, TOTAL_AREA),
            ObjectLabel::ClassificationFailed
        );
    }

    #[test]
    fn test_low_confidence_small_region_unclassified() {
        let classifier = classifier_with(&[("sofa", 0.14), ("chair", 0.10)]);
        assert_eq!(
            classifier.classify(&crop(64, 64), SMALL_AREA, TOTAL_AREA),
            ObjectLabel::Unclassified
        );
        // exactly 5% is not "large"
        assert_eq!(
            classifier.classify(&crop(64, 64), 50_000, TOTAL_AREA),
            ObjectLabel::Unclassified
        );
    }

    #[test]
    fn test_large_structural_region_bypasses_confidence() {
        let classifier = classifier_with(&[("stone wall", 0.05), ("sofa", 0.04)]);
        assert_eq!(
            classifier.classify(&crop(64, 64), LARGE_AREA, TOTAL_AREA),
            ObjectLabel::object("duvar")
        );
    }

    #[test]
    fn test_structural_override_bypasses_blacklist() {
        // large region: "floor" wins even though "mop" is blacklisted
        let classifier = classifier_with(&[("mop-floor", 0.40), ("sofa", 0.30)]);
        assert_eq!(
            classifier.classify(&crop(64, 64), LARGE_AREA, TOTAL_AREA),
            ObjectLabel::object("zemin")
        );
        // small region: the blacklist applies and the scan moves on to sofa
        assert_eq!(
            classifier.classify(&crop(64, 64), SMALL_AREA, TOTAL_AREA),
            ObjectLabel::object("koltuk")
        );
    }

    #[test]
    fn test_whitelist_scan_skips_blacklisted_candidates() {
        let classifier = classifier_with(&[
            ("boston bull, boston terrier", 0.50),
            ("grand piano", 0.20),
            ("studio couch, day bed", 0.10),
        ]);
        assert_eq!(
            classifier.classify(&crop(64, 64), SMALL_AREA, TOTAL_AREA),
            ObjectLabel::object("kanepe")
        );
    }

    #[test]
    fn test_fallback_accepts_novel_top_one() {
        let classifier = classifier_with(&[("grand piano", 0.60), ("accordion", 0.10)]);
        assert_eq!(
            classifier.classify(&crop(64, 64), SMALL_AREA, TOTAL_AREA),
            ObjectLabel::object("grand piano")
        );
    }

    #[test]
    fn test_fallback_rejects_blacklisted_top_one() {
        let classifier = classifier_with(&[("bolo tie, bola tie", 0.60), ("accordion", 0.10)]);
        assert_eq!(
            classifier.classify(&crop(64, 64), SMALL_AREA, TOTAL_AREA),
            ObjectLabel::Unclassified
        );
    }

    #[test]
    fn test_large_non_structural_region_uses_normal_flow() {
        let classifier = classifier_with(&[("four-poster bed", 0.08)]);
        assert_eq!(
            classifier.classify(&crop(64, 64), LARGE_AREA, TOTAL_AREA),
            ObjectLabel::object("yatak")
        );
    }

    #[test]
    fn test_decide_normalizes_and_ranks_raw_labels() {
        let classifier = classifier_with(&[]);
        let predictions = vec![
            Prediction::new("furniture:Accordion", 0.20),
            Prediction::new("n04344873: Studio Couch", 0.70),
        ];
        assert_eq!(
            classifier.decide((64, 64), SMALL_AREA, TOTAL_AREA, &predictions),
            ObjectLabel::object("kanepe")
        );
        assert_eq!(
            classifier.decide((64, 64), SMALL_AREA, TOTAL_AREA, &[]),
            ObjectLabel::Unclassified
        );
    }

    #[test]
    fn test_rules_evaluated_in_order() {
        let vocab = LabelVocabulary::standard();
        let predictions = vec![Prediction::new("wall clock", 0.05)];
        let input = RuleInput {
            predictions: &predictions,
            region_area: 10,
            required_area: 100.0,
            min_confidence: 0.15,
        };
        assert_eq!(
            PolicyRule::ConfidenceGate.evaluate(&input, &vocab),
            Some(RuleDecision::Reject(ObjectLabel::Unclassified))
        );
        assert_eq!(PolicyRule::StructuralOverride.evaluate(&input, &vocab), None);
        assert_eq!(
            PolicyRule::WhitelistScan.evaluate(&input, &vocab),
            Some(RuleDecision::Accept("wall".into()))
        );
    }

    #[test]
    fn test_classify_region_clamps_bbox() {
        let classifier = classifier_with(&[("sofa", 0.9)]);
        let image = RgbImage::new(100, 100);
        let region = RawRegion {
            mask: Arc::new(GrayImage::new(100, 100)),
            bbox: BoundingBox::new(80, 80, 50, 50),
            area: 400,
        };
        assert_eq!(
            classifier.classify_region(&image, &region),
            Some(ObjectLabel::object("koltuk"))
        );

        let outside = RawRegion {
            bbox: BoundingBox::new(100, 100, 10, 10),
            ..region
        };
        assert_eq!(classifier.classify_region(&image, &outside), None);
    }

    #[test]
    fn test_normalize_label() {
        assert_eq!(normalize_label("n03201208: Dining Table "), "dining table");
        assert_eq!(normalize_label("a:b:Sofa"), "sofa");
        assert_eq!(normalize_label("Lamp"), "lamp");
    }
}
