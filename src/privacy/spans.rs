//! Interval-exclusion set for a single masking pass
//!
//! Tracks the byte ranges of the current text that have already been
//! replaced by a token, so lower-priority categories cannot re-mask them.
//! When a category's replacements are applied, existing spans are shifted
//! to stay aligned with the rewritten text.

use std::ops::Range;

/// Sorted, non-overlapping set of masked byte ranges
#[derive(Debug, Clone, Default)]
pub struct SpanSet {
    spans: Vec<Range<usize>>,
}

impl SpanSet {
    /// Create an empty span set
    pub fn new() -> Self {
        Self::default()
    }

    /// Masked spans, in ascending order
    #[cfg(test)]
    pub fn spans(&self) -> &[Range<usize>] {
        &self.spans
    }

    /// Whether `range` intersects any masked span
    pub fn overlaps(&self, range: &Range<usize>) -> bool {
        // First span that ends after range.start; spans are sorted and disjoint.
        let idx = self.spans.partition_point(|s| s.end <= range.start);
        self.spans
            .get(idx)
            .is_some_and(|s| s.start < range.end)
    }

    /// Replace each range in `ranges` with `token`, returning the new text.
    ///
    /// `ranges` must be sorted, disjoint, and must not overlap any span
    /// already in the set. The replaced regions are added to the set and
    /// existing spans are remapped into the new text's coordinates.
    pub fn apply(&mut self, text: &str, ranges: &[Range<usize>], token: &str) -> String {
        if ranges.is_empty() {
            return text.to_string();
        }

        let mut out = String::with_capacity(text.len());
        let mut added = Vec::with_capacity(ranges.len());
        let mut cursor = 0;
        for range in ranges {
            out.push_str(&text[cursor..range.start]);
            let start = out.len();
            out.push_str(token);
            added.push(start..out.len());
            cursor = range.end;
        }
        out.push_str(&text[cursor..]);

        let remap = |pos: usize| -> usize {
            let mut shifted = pos as isize;
            for range in ranges.iter().take_while(|r| r.end <= pos) {
                shifted += token.len() as isize - range.len() as isize;
            }
            shifted as usize
        };

        let mut merged: Vec<Range<usize>> = self
            .spans
            .iter()
            .map(|s| remap(s.start)..remap(s.end))
            .chain(added)
            .collect();
        merged.sort_by_key(|s| s.start);
        self.spans = merged;

        out
    }
}
