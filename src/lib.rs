//! # a3s-transcript
//!
//! Chat-history extraction with PII masking for the A3S ecosystem.
//!
//! ## Overview
//!
//! `a3s-transcript` pulls conversation history from the Kore.ai bot API,
//! groups it into per-session transcripts, and masks personally identifiable
//! information before anything is written out. Masked text is the only
//! artifact that leaves the pipeline.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use a3s_transcript::{CatalogConfig, PatternCatalog, PiiMasker};
//!
//! # fn example() -> a3s_transcript::Result<()> {
//! let catalog = Arc::new(PatternCatalog::new(&CatalogConfig::default())?);
//! let masker = PiiMasker::new(catalog);
//!
//! let masked = masker.mask("Reach me at john@example.com or (555) 123-4567");
//! assert_eq!(masked.text, "Reach me at [EMAIL] or [PHONE]");
//! # Ok(())
//! # }
//! ```
//!
//! ## Sources
//!
//! - **kore** — HTTP client for `getMessagesV2`
//! - **memory** — in-memory pages for tests and offline replay
//!
//! ## Architecture
//!
//! - **MessageSource** trait — one page request against any backend
//! - **MessageFetcher** — sequential pagination with a fixed delay
//! - **SessionAggregator** — groups messages into ordered transcripts
//! - **PiiMasker** — priority-ordered masking over a [`PatternCatalog`]
//! - **ExtractionPipeline** — fetch → group → mask

pub mod aggregator;
pub mod config;
pub mod error;
pub mod export;
pub mod fetcher;
pub mod pipeline;
pub mod privacy;
pub mod source;
pub mod types;

// Re-export core types
pub use aggregator::SessionAggregator;
pub use config::ExtractionConfig;
pub use error::{Result, TranscriptError};
pub use fetcher::{DateRange, FetchOptions, Fetched, MessageFetcher};
pub use pipeline::{Extraction, ExtractionPipeline};
pub use privacy::{CatalogConfig, MaskCounts, Masked, PatternCatalog, PiiCategory, PiiMasker};
pub use source::{MessageSource, PageRequest};
pub use types::{
    ExtractionReport, FetchPhase, FetchState, MaskedTranscript, MessagePage, RawMessage, Role,
    SessionTranscript,
};

// Re-export sources for convenience
pub use source::kore::{KoreSettings, KoreSource};
pub use source::memory::MemorySource;
