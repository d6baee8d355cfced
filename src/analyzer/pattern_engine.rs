//! # Pattern Engine
//!
//! Applies a single check's compiled pattern to a unit of text.

use crate::catalog::Check;

/// One match of a check pattern within the evaluated text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternMatch {
    /// Byte offset of the match start within the evaluated text.
    pub offset: usize,
    /// Length of the match in bytes.
    pub length: usize,
    pub matched_text: String,
}

/// Every non-overlapping, non-empty match of `check` in `text`, in order.
///
/// Holds no state between calls, so evaluating the same text twice gives the
/// same result.
pub fn evaluate(check: &Check, text: &str) -> Vec<PatternMatch> {
    check
        .pattern
        .regex()
        .find_iter(text)
        .filter(|m| !m.is_empty())
        .map(|m| PatternMatch {
            offset: m.start(),
            length: m.len(),
            matched_text: m.as_str().to_string(),
        })
        .collect()
}

/// Byte offsets of line starts, for mapping whole-file match offsets back to
/// 1-based line and column numbers.
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_offsets: Vec<usize>,
}

impl LineIndex {
    pub fn new(content: &str) -> Self {
        let mut line_offsets = vec![0];
        line_offsets.extend(
            content
                .bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self { line_offsets }
    }

    pub fn line_count(&self) -> usize {
        self.line_offsets.len()
    }

    /// 1-based (line, column). Columns count characters, not bytes.
    pub fn offset_to_line_col(&self, content: &str, offset: usize) -> (usize, usize) {
        let line_idx = self
            .line_offsets
            .binary_search(&offset)
            .unwrap_or_else(|i| i.saturating_sub(1));

        let line_start = self.line_offsets.get(line_idx).copied().unwrap_or(0);
        let column = content
            .get(line_start..offset)
            .map(|prefix| prefix.chars().count())
            .unwrap_or(offset - line_start)
            + 1;

        (line_idx + 1, column)
    }
}
