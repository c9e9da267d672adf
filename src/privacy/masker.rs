//! Priority-ordered, overlap-aware PII masking
//!
//! ```text
//! text ─▶ EMAIL ─▶ SSN ─▶ CREDIT_CARD ─▶ … ─▶ ADDRESS ─▶ ZIP ─▶ masked text
//!          │        │          │                  │         │
//!          └────────┴── SpanSet (regions already replaced) ─┘
//! ```
//!
//! Each category runs against the partially masked text produced by the
//! categories before it. A match overlapping a region already replaced in
//! this pass is skipped, so every character is attributed to at most one
//! category and stricter shapes win.

use super::catalog::PatternCatalog;
use super::category::PiiCategory;
use super::spans::SpanSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Redaction counts per category. Every category is always present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MaskCounts(BTreeMap<PiiCategory, usize>);

impl Default for MaskCounts {
    fn default() -> Self {
        Self(PiiCategory::PRIORITY.iter().map(|&c| (c, 0)).collect())
    }
}

impl MaskCounts {
    /// Count for one category
    pub fn get(&self, category: PiiCategory) -> usize {
        self.0.get(&category).copied().unwrap_or(0)
    }

    /// Add `n` redactions for a category
    pub fn add(&mut self, category: PiiCategory, n: usize) {
        *self.0.entry(category).or_insert(0) += n;
    }

    /// Sum across categories
    pub fn total(&self) -> usize {
        self.0.values().sum()
    }

    /// Accumulate another set of counts into this one
    pub fn merge(&mut self, other: &MaskCounts) {
        for (category, n) in other.iter() {
            self.add(category, n);
        }
    }

    /// (category, count) pairs in priority order
    pub fn iter(&self) -> impl Iterator<Item = (PiiCategory, usize)> + '_ {
        self.0.iter().map(|(c, n)| (*c, *n))
    }
}

/// Output of a masking pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Masked {
    /// Text with every detected span replaced by its category token
    pub text: String,

    /// Redactions per category
    pub counts: MaskCounts,
}

/// Applies a [`PatternCatalog`] to text
#[derive(Debug, Clone)]
pub struct PiiMasker {
    catalog: Arc<PatternCatalog>,
}

impl PiiMasker {
    /// Create a masker over a shared catalog
    pub fn new(catalog: Arc<PatternCatalog>) -> Self {
        Self { catalog }
    }

    /// The catalog this masker uses
    pub fn catalog(&self) -> &PatternCatalog {
        &self.catalog
    }

    /// Mask all PII in `text`. Never fails; no matches means zero counts.
    pub fn mask(&self, text: &str) -> Masked {
        let mut counts = MaskCounts::default();
        let mut spans = SpanSet::new();
        let mut current = text.to_string();

        for &category in self.catalog.ordered_categories() {
            if !self.catalog.is_enabled(category) {
                continue;
            }

            let accepted: Vec<_> = self
                .catalog
                .rules_for(category)
                .find(&current)
                .into_iter()
                .filter(|range| !spans.overlaps(range))
                .collect();
            if accepted.is_empty() {
                continue;
            }

            counts.add(category, accepted.len());
            current = spans.apply(&current, &accepted, category.token());
        }

        Masked {
            text: current,
            counts,
        }
    }
}
