//! Extraction of complete bordered boxes from a text window.

use tracing::debug;

use crate::patterns::{BOX_CLOSE_LINE, BOX_OPEN_LINE};

/// Default cap on the number of lines a single box may span.
pub const DEFAULT_MAX_BOX_LINES: usize = 2000;

/// Returns every complete box in `window`, top to bottom.
///
/// A box starts at a line matching the open border and ends at the close
/// border that brings the nesting depth back to zero, so inner boxes stay
/// part of their outer box. A box that never closes, or grows past
/// `max_box_lines`, is dropped and scanning resumes on the line after its
/// open border.
pub fn extract_blocks(window: &str, max_box_lines: usize) -> Vec<&str> {
    let lines = line_spans(window);
    let mut blocks = Vec::new();

    let mut i = 0;
    while i < lines.len() {
        let (start, end) = lines[i];
        if !BOX_OPEN_LINE.is_match(&window[start..end]) {
            i += 1;
            continue;
        }

        let mut depth = 1usize;
        let mut closed_at = None;
        let mut j = i + 1;
        while j < lines.len() && j - i < max_box_lines {
            let line = &window[lines[j].0..lines[j].1];
            if BOX_OPEN_LINE.is_match(line) {
                depth += 1;
            } else if BOX_CLOSE_LINE.is_match(line) {
                depth -= 1;
                if depth == 0 {
                    closed_at = Some(j);
                    break;
                }
            }
            j += 1;
        }

        match closed_at {
            Some(j) => {
                blocks.push(&window[start..lines[j].1]);
                i = j + 1;
            }
            None => {
                debug!("Dropping unterminated box starting at line {}", i);
                i += 1;
            }
        }
    }

    blocks
}

/// Byte ranges of each `\n`-separated line, excluding the separator.
fn line_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start = 0;
    for (idx, _) in text.match_indices('\n') {
        spans.push((start, idx));
        start = idx + 1;
    }
    spans.push((start, text.len()));
    spans
}
