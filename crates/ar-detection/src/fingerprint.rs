//! Duplicate-prompt fingerprints.
//!
//! A fingerprint hashes the dialog-looking lines near the bottom of the
//! text, so unchanged scrollback produces the same value cycle after cycle.

use sha2::{Digest, Sha256};

use crate::patterns::DIALOG_INDICATORS;
use crate::STATUS_TAG;

/// Lines at the bottom of the text that are inspected.
const SCAN_LINES: usize = 100;

/// Indicator lines kept in the hash.
const KEPT_LINES: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", &self.0[..12.min(self.0.len())])
    }
}

#[derive(Debug, Clone)]
pub struct FingerprintBuilder {
    indicators: Vec<String>,
}

impl FingerprintBuilder {
    /// Indicator tokens are the fixed dialog tokens plus every whitelist entry.
    pub fn new(whitelist: &[String]) -> Self {
        let mut indicators: Vec<String> =
            DIALOG_INDICATORS.iter().map(|s| s.to_string()).collect();
        indicators.extend(
            whitelist
                .iter()
                .filter(|t| !t.trim().is_empty())
                .map(|t| t.to_lowercase()),
        );
        Self { indicators }
    }

    pub fn compute(&self, text: &str) -> Fingerprint {
        let lines: Vec<&str> = text.split('\n').collect();
        let recent = &lines[lines.len().saturating_sub(SCAN_LINES)..];

        let relevant: Vec<String> = recent
            .iter()
            .filter(|line| !line.contains(STATUS_TAG))
            .filter(|line| {
                let lower = line.to_lowercase();
                self.indicators.iter().any(|i| lower.contains(i.as_str()))
            })
            .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
            .collect();

        let kept = &relevant[relevant.len().saturating_sub(KEPT_LINES)..];
        let mut hasher = Sha256::new();
        hasher.update(kept.join("\n").as_bytes());
        Fingerprint(hex::encode(hasher.finalize()))
    }
}
