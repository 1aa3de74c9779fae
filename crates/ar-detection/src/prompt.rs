use serde::{Deserialize, Serialize};

/// Result of one recognition attempt.
///
/// Built fresh by every parse and never mutated afterwards; callers compare
/// values (for example the detected operation) rather than identities.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecognizedPrompt {
    /// Every validation gate passed.
    pub is_valid: bool,
    /// The "Do you want" marker was found.
    pub has_confirmation_phrase: bool,
    /// The selection cursor sits on option 1.
    pub has_default_selection_marker: bool,
    /// A "Yes, and don't ask again" option is offered.
    pub has_secondary_option: bool,
    /// A complete box passed the confirmation-phrase check.
    pub has_box_structure: bool,
    /// Whitelisted operation named inside the box.
    pub detected_operation: Option<String>,
}

impl RecognizedPrompt {
    /// Option to answer with: "2" when the don't-ask-again option exists.
    pub fn option_to_select(&self) -> &'static str {
        if self.has_secondary_option {
            "2"
        } else {
            "1"
        }
    }

    /// Human-readable label for the option that will be chosen.
    pub fn option_description(&self) -> &'static str {
        if self.has_secondary_option {
            "'Yes, and don't ask again'"
        } else {
            "'Yes'"
        }
    }

    /// Same operation as `other`, compared by value.
    pub fn same_operation(&self, other: &RecognizedPrompt) -> bool {
        self.detected_operation == other.detected_operation
    }
}
