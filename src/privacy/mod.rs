//! PII detection and masking
//!
//! Pattern- and heuristic-based detection for a fixed set of categories:
//! - [`PatternCatalog`] — compiled rules, one per [`PiiCategory`]
//! - [`ContextGate`] — keyword-window check for context-dependent shapes
//! - [`PiiMasker`] — priority-ordered masking with span tracking

pub mod catalog;
pub mod category;
pub mod context;
pub mod masker;
mod spans;

pub use catalog::{CatalogConfig, DetectionRule, DocumentShape, PatternCatalog, Validator};
pub use category::PiiCategory;
pub use context::ContextGate;
pub use masker::{MaskCounts, Masked, PiiMasker};
