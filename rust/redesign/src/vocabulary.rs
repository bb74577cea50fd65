// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Label tables deciding which classifier outputs count as interior objects
//!
//! Classifier tokens are English (ImageNet-style class names); display
//! labels are Turkish. The tables are built once and shared read-only for
//! the lifetime of the process.

use crate::error::{PipelineError, Result};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Canonical tokens considered relevant to an interior scene
const INTERIOR_WHITELIST: &[&str] = &[
    "bed", "sofa", "chair", "table", "lamp", "wardrobe", "closet", "nightstand", "mirror", "rug",
    "cabinet", "shelf", "ottoman", "wall", "ceiling", "floor", "tile", "plaster", "wallpaper",
    "room", "space", "quilt", "cushion", "pillow", "curtain", "window", "shade", "frame", "pouf",
    "couch", "sectional", "daybed", "dresser", "comforter", "press", "console", "art", "picture",
    "painting", "basket", "plant", "vase", "clock", "sconce", "stove", "sink", "washbasin",
    "lavabo", "desk",
];

/// Tokens for large, low-detail regions (walls, floors, ceilings)
const STRUCTURAL_TOKENS: &[&str] = &["wall", "floor", "ceiling", "room", "space", "plaster", "tile"];

/// Substrings of known false-positive classes. Matched against raw labels.
const NEGATIVE_FILTER: &[&str] = &[
    "tobacco", "bulletproof", "abaya", "bula", "bola", "tie", "windsor", "terrier", "retriever",
    "bulldog", "schnauzer", "beagle", "swab", "mop",
];

const TRANSLATIONS: &[(&str, &str)] = &[
    ("bed", "yatak"),
    ("sofa", "koltuk"),
    ("chair", "sandalye"),
    ("table", "masa"),
    ("lamp", "lamba"),
    ("wardrobe", "gardırop"),
    ("closet", "dolap"),
    ("nightstand", "komodin"),
    ("mirror", "ayna"),
    ("rug", "halı"),
    ("cabinet", "dolap"),
    ("shelf", "raf"),
    ("ottoman", "puf"),
    ("pouf", "puf"),
    ("couch", "kanepe"),
    ("desk", "çalışma masası"),
    ("window", "pencere"),
    ("wall", "duvar"),
    ("ceiling", "tavan"),
    ("floor", "zemin"),
    ("tile", "fayans"),
    ("curtain", "perde"),
    ("quilt", "yorgan"),
    ("cushion", "yastık"),
    ("pillow", "yastık"),
    ("frame", "çerçeve"),
    ("art", "sanat eseri"),
    ("picture", "resim"),
    ("painting", "tablo"),
    ("basket", "sepet"),
    ("plant", "bitki"),
    ("vase", "vazo"),
    ("stove", "ocak"),
    ("sink", "lavabo"),
    ("space", "boş alan"),
    ("windsor", "yastık"),
    ("tobacco", "dolap"),
    ("shop", "dolap"),
    ("vest", "yastık"),
    ("tie", "yastık"),
    ("abaya", "örtü"),
    ("daybed", "yatak"),
    ("plate", "raf"),
    ("rack", "raf"),
];

/// Display labels worth keeping for redesign
const MEANINGFUL_DISPLAY_LABELS: &[&str] = &[
    "yatak", "koltuk", "sandalye", "masa", "lamba", "gardırop", "dolap", "komodin", "ayna", "halı",
    "raf", "puf", "kanepe", "çalışma masası", "pencere", "duvar", "tavan", "zemin", "perde",
    "yorgan", "yastık", "çerçeve", "sanat eseri", "bitki", "vazo", "ocak", "lavabo", "örtü",
    "boş alan",
];

/// Movable objects whose masks are replaced without dilation
const CHANGEABLE_DISPLAY_LABELS: &[&str] = &[
    "koltuk", "kanepe", "sandalye", "masa", "halı", "lamba", "dolap", "puf", "yatak", "komodin",
];

const WALL_KEYWORDS: &[&str] = &["duvar", "wall", "siyah duvar", "beyaz duvar", "duvarları"];
const FLOOR_KEYWORDS: &[&str] = &["zemin", "floor", "ground", "yer", "fayans", "tiling", "tile"];

/// Display labels with a structural role in mask selection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StructuralDisplayLabels {
    pub wall: String,
    pub floor: String,
    pub ceiling: String,
    pub empty_space: String,
}

/// Immutable lookup tables for label policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelVocabulary {
    pub whitelist: FxHashSet<String>,
    pub structural: FxHashSet<String>,
    pub negative: Vec<String>,
    pub translations: FxHashMap<String, String>,
    pub meaningful: FxHashSet<String>,
    pub changeable: FxHashSet<String>,
    pub structural_display: StructuralDisplayLabels,
    pub wall_keywords: Vec<String>,
    pub floor_keywords: Vec<String>,
}

impl LabelVocabulary {
    /// The built-in English → Turkish interior vocabulary
    pub fn standard() -> Self {
        fn set(items: &[&str]) -> FxHashSet<String> {
            items.iter().map(|s| s.to_string()).collect()
        }
        fn list(items: &[&str]) -> Vec<String> {
            items.iter().map(|s| s.to_string()).collect()
        }

        Self {
            whitelist: set(INTERIOR_WHITELIST),
            structural: set(STRUCTURAL_TOKENS),
            negative: list(NEGATIVE_FILTER),
            translations: TRANSLATIONS
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            meaningful: set(MEANINGFUL_DISPLAY_LABELS),
            changeable: set(CHANGEABLE_DISPLAY_LABELS),
            structural_display: StructuralDisplayLabels {
                wall: "duvar".into(),
                floor: "zemin".into(),
                ceiling: "tavan".into(),
                empty_space: "boş alan".into(),
            },
            wall_keywords: list(WALL_KEYWORDS),
            floor_keywords: list(FLOOR_KEYWORDS),
        }
    }

    /// Process-wide standard vocabulary, built on first use
    pub fn shared() -> &'static LabelVocabulary {
        static SHARED: OnceLock<LabelVocabulary> = OnceLock::new();
        SHARED.get_or_init(LabelVocabulary::standard)
    }

    /// Load a vocabulary document and check its internal consistency
    pub fn from_json(json: &str) -> Result<Self> {
        let vocabulary: LabelVocabulary = serde_json::from_str(json)?;
        vocabulary.validate()?;
        Ok(vocabulary)
    }

    fn validate(&self) -> Result<()> {
        if let Some(token) = self.structural.iter().find(|t| !self.whitelist.contains(*t)) {
            return Err(PipelineError::Config(format!(
                "structural token '{}' is not whitelisted",
                token
            )));
        }
        let display = &self.structural_display;
        for label in [&display.wall, &display.floor] {
            if !self.meaningful.contains(label) {
                return Err(PipelineError::Config(format!(
                    "structural display label '{}' is not a meaningful label",
                    label
                )));
            }
        }
        Ok(())
    }

    pub fn is_whitelisted(&self, token: &str) -> bool {
        self.whitelist.contains(token)
    }

    pub fn is_structural(&self, token: &str) -> bool {
        self.structural.contains(token)
    }

    /// True when the raw label contains any negative-filter substring
    pub fn is_blacklisted(&self, raw_label: &str) -> bool {
        self.negative.iter().any(|neg| raw_label.contains(neg.as_str()))
    }

    /// First whitelisted word of a multi-word label, or the label itself
    pub fn base_token<'a>(&self, label: &'a str) -> &'a str {
        label
            .split(|c: char| c == ',' || c == '-' || c.is_whitespace())
            .filter(|part| !part.is_empty())
            .find(|part| self.whitelist.contains(*part))
            .unwrap_or(label)
    }

    /// Display label for a token; unmapped tokens pass through unchanged
    pub fn translate<'a>(&'a self, token: &'a str) -> &'a str {
        self.translations.get(token).map(String::as_str).unwrap_or(token)
    }

    pub fn is_meaningful(&self, display_label: &str) -> bool {
        self.meaningful.contains(display_label)
    }

    pub fn is_changeable(&self, display_label: &str) -> bool {
        self.changeable.contains(display_label)
    }

    pub fn is_structural_display(&self, display_label: &str) -> bool {
        let d = &self.structural_display;
        display_label == d.wall || display_label == d.floor || display_label == d.ceiling
    }

    /// Case-insensitive check for wall intent in a redesign request
    pub fn mentions_wall(&self, request: &str) -> bool {
        mentions_any(&words(request), &self.wall_keywords)
    }

    /// Case-insensitive check for floor intent in a redesign request
    pub fn mentions_floor(&self, request: &str) -> bool {
        mentions_any(&words(request), &self.floor_keywords)
    }
}

impl Default for LabelVocabulary {
    fn default() -> Self {
        Self::standard()
    }
}

/// Lower-cased alphanumeric words of a request
fn words(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// A keyword matches at the start of a word, so inflected forms ("walls",
/// "duvarları") count but embedded ones ("textile", "background") do not.
/// Multi-word keywords must match consecutive words, the last by prefix.
fn mentions_any(request_words: &[String], keywords: &[String]) -> bool {
    keywords.iter().any(|keyword| {
        let keyword = words(keyword);
        let Some((last, leading)) = keyword.split_last() else {
            return false;
        };
        request_words.windows(keyword.len()).any(|window| {
            window[..leading.len()] == *leading && window[leading.len()].starts_with(last.as_str())
        })
    })
}
