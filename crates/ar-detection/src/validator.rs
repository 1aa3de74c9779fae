use tracing::debug;

use crate::patterns::{CONFIRMATION_PHRASE, DEFAULT_SELECTION, SECONDARY_OPTION};
use crate::prompt::RecognizedPrompt;

/// Decides whether one extracted box is an actionable confirmation dialog.
#[derive(Debug, Clone)]
pub struct DialogValidator {
    /// Whitelist in configured order, paired with its lowercase form.
    whitelist: Vec<(String, String)>,
}

impl DialogValidator {
    pub fn new(whitelist: &[String]) -> Self {
        let whitelist = whitelist
            .iter()
            .filter(|t| !t.trim().is_empty())
            .map(|t| (t.clone(), t.to_lowercase()))
            .collect();
        Self { whitelist }
    }

    /// Runs the gates in order. A failed gate returns immediately with the
    /// flags gathered so far, for diagnostics.
    pub fn validate(&self, block: &str) -> RecognizedPrompt {
        let mut prompt = RecognizedPrompt::default();

        if !CONFIRMATION_PHRASE.is_match(block) {
            debug!("Box rejected: no confirmation phrase");
            return prompt;
        }
        prompt.has_confirmation_phrase = true;
        prompt.has_box_structure = true;

        if !DEFAULT_SELECTION.is_match(block) {
            debug!("Box rejected: selection marker is not on option 1");
            return prompt;
        }
        prompt.has_default_selection_marker = true;

        prompt.has_secondary_option = SECONDARY_OPTION.is_match(block);

        prompt.detected_operation = self.detect_operation(block);
        match &prompt.detected_operation {
            Some(operation) => {
                debug!("Box accepted for whitelisted operation '{}'", operation);
                prompt.is_valid = true;
            }
            None => debug!("Box rejected: no whitelisted operation"),
        }

        prompt
    }

    /// Longest whitelist entry contained in `block`, case-insensitively.
    /// Equal lengths keep the entry listed first.
    pub fn detect_operation(&self, block: &str) -> Option<String> {
        let lower = block.to_lowercase();
        let mut best: Option<&(String, String)> = None;
        for entry in &self.whitelist {
            if !lower.contains(entry.1.as_str()) {
                continue;
            }
            if best.map_or(true, |b| entry.1.len() > b.1.len()) {
                best = Some(entry);
            }
        }
        best.map(|(original, _)| original.clone())
    }
}
