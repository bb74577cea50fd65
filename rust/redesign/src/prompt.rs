// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Generation prompt from the user's request and the detected scene

use crate::config::RedesignConfig;
use crate::types::ClassifiedObject;
use std::collections::BTreeSet;

pub struct PromptComposer {
    max_chars: usize,
}

impl PromptComposer {
    pub fn new(config: &RedesignConfig) -> Self {
        Self {
            max_chars: config.max_prompt_chars,
        }
    }

    /// Compose the inpainting prompt.
    ///
    /// Scene labels are listed in sorted order and dropped from the end
    /// until the prompt fits `max_prompt_chars`. The request itself is never
    /// shortened, so a request longer than the bound yields a longer prompt.
    pub fn compose(&self, objects: &[ClassifiedObject], request: &str) -> String {
        let request = collapse_whitespace(request);
        let labels: Vec<&str> = objects
            .iter()
            .filter_map(|obj| obj.label.as_object())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut take = labels.len();
        loop {
            let prompt = render(&request, &labels[..take]);
            if take == 0 || prompt.chars().count() <= self.max_chars {
                if take < labels.len() {
                    tracing::debug!(
                        dropped = labels.len() - take,
                        max_chars = self.max_chars,
                        "Trimmed scene labels from prompt"
                    );
                }
                return prompt;
            }
            take -= 1;
        }
    }
}

fn render(request: &str, labels: &[&str]) -> String {
    let style = format!("interior design, {}, cinematic light, photorealistic", request);
    let prompt = if labels.is_empty() {
        format!("{}. A highly detailed interior scene.", style)
    } else {
        format!(
            "{}. A highly detailed interior scene with {}.",
            style,
            labels.join(", ")
        )
    };
    collapse_whitespace(&prompt)
}

/// Collapse whitespace runs to one space and trim the ends
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
