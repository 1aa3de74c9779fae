use tracing::debug;

use crate::extractor::extract_blocks;
use crate::patterns::{CONFIRMATION_PHRASE, DEFAULT_SELECTION};
use crate::prompt::RecognizedPrompt;
use crate::validator::DialogValidator;
use crate::window::{ScanLimits, TextWindowExpander};

/// Turns raw terminal text into a single [`RecognizedPrompt`].
#[derive(Debug, Clone)]
pub struct PromptParser {
    expander: TextWindowExpander,
    validator: DialogValidator,
    whitelist: Vec<String>,
}

impl PromptParser {
    pub fn new(whitelist: Vec<String>, limits: ScanLimits) -> Self {
        Self {
            expander: TextWindowExpander::new(limits, &whitelist),
            validator: DialogValidator::new(&whitelist),
            whitelist,
        }
    }

    pub fn whitelist(&self) -> &[String] {
        &self.whitelist
    }

    pub fn limits(&self) -> ScanLimits {
        self.expander.limits()
    }

    /// Largest number of lines a parse will ever look at; hosts can use it
    /// as the fetch size.
    pub fn max_lines(&self) -> usize {
        self.expander.limits().max_lines
    }

    /// Returns the first box that validates. When none does, the partial
    /// flags of the last attempted box are returned. When no box is found at
    /// all, the confirmation and selection flags describe the scanned window.
    pub fn parse(&self, full_text: &str) -> RecognizedPrompt {
        let scan = self.expander.expand(full_text);
        if !scan.found() {
            return scan_flags(scan.text);
        }

        let blocks = extract_blocks(scan.text, self.max_lines());
        debug!(
            "Scanning {} box(es) in a {}-line window ({:?})",
            blocks.len(),
            scan.lines(),
            scan.outcome
        );

        let mut last = None;
        for (index, block) in blocks.iter().enumerate() {
            let prompt = self.validator.validate(block);
            if prompt.is_valid {
                debug!("Box {} holds a valid prompt", index + 1);
                return prompt;
            }
            last = Some(prompt);
        }

        last.unwrap_or_else(|| scan_flags(scan.text))
    }
}

fn scan_flags(text: &str) -> RecognizedPrompt {
    RecognizedPrompt {
        has_confirmation_phrase: CONFIRMATION_PHRASE.is_match(text),
        has_default_selection_marker: DEFAULT_SELECTION.is_match(text),
        ..Default::default()
    }
}
