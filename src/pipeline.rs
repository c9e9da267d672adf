//! Extraction pipeline: fetch → group → mask
//!
//! ```text
//! MessageSource ─▶ MessageFetcher ─▶ SessionAggregator ─▶ PiiMasker ─▶ Vec<MaskedTranscript>
//! ```
//!
//! Unmasked transcript text never outlives the loop iteration that masks it.

use crate::aggregator::SessionAggregator;
use crate::config::ExtractionConfig;
use crate::error::Result;
use crate::fetcher::{DateRange, FetchOptions, MessageFetcher};
use crate::privacy::{MaskCounts, PatternCatalog, PiiMasker};
use crate::source::kore::KoreSource;
use crate::source::MessageSource;
use crate::types::{ExtractionReport, MaskedTranscript};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::Instrument;

/// Output of a pipeline run
#[derive(Debug, Clone)]
pub struct Extraction {
    /// One masked transcript per session, in first-encounter order
    pub transcripts: Vec<MaskedTranscript>,

    /// Run summary
    pub report: ExtractionReport,
}

/// Fetches, groups, and masks chat history
pub struct ExtractionPipeline {
    fetcher: MessageFetcher,
    aggregator: SessionAggregator,
    masker: PiiMasker,
}

impl ExtractionPipeline {
    /// Create a pipeline over any message source
    pub fn new(
        source: Arc<dyn MessageSource>,
        catalog: Arc<PatternCatalog>,
        options: FetchOptions,
    ) -> Self {
        Self {
            fetcher: MessageFetcher::new(source, options),
            aggregator: SessionAggregator::new(),
            masker: PiiMasker::new(catalog),
        }
    }

    /// Build a Kore.ai-backed pipeline from a validated config
    pub fn from_config(config: &ExtractionConfig) -> Result<Self> {
        config.validate()?;
        let source = KoreSource::new(&config.kore_settings())?;
        let catalog = PatternCatalog::new(&config.catalog)?;
        Ok(Self::new(
            Arc::new(source),
            Arc::new(catalog),
            config.fetch_options(),
        ))
    }

    /// Abort between pages once `shutdown` becomes `true`
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.fetcher = self.fetcher.with_shutdown(shutdown);
        self
    }

    /// Run the full extraction for `range`
    pub async fn run(&self, range: &DateRange) -> Result<Extraction> {
        let run_id = format!("run-{}", uuid::Uuid::new_v4());
        let span = tracing::info_span!("extraction", run_id = %run_id);
        self.execute(range, run_id).instrument(span).await
    }

    async fn execute(&self, range: &DateRange, run_id: String) -> Result<Extraction> {
        let fetched = self.fetcher.fetch(range).await?;
        tracing::info!(messages = fetched.messages.len(), "Messages retrieved");

        let sessions = self.aggregator.group(&fetched.messages);
        drop(fetched.messages);
        tracing::info!(sessions = sessions.len(), "Unique sessions");

        let mut counts = MaskCounts::default();
        let mut transcripts = Vec::with_capacity(sessions.len());
        for (session_id, transcript) in sessions {
            let masked = self.masker.mask(&transcript.body());
            counts.merge(&masked.counts);
            transcripts.push(MaskedTranscript {
                session_id,
                text: masked.text,
                counts: masked.counts,
            });
        }

        log_summary(&counts);

        let report = ExtractionReport {
            run_id,
            messages_retrieved: fetched.state.retrieved,
            requests: fetched.state.requests,
            sessions: transcripts.len(),
            counts,
        };
        Ok(Extraction {
            transcripts,
            report,
        })
    }
}

fn log_summary(counts: &MaskCounts) {
    for (category, n) in counts.iter().filter(|(_, n)| *n > 0) {
        tracing::info!(category = category.tag(), count = n, "Masked");
    }
    if counts.total() == 0 {
        tracing::warn!("No PII detected; review output for under-masking");
    } else {
        tracing::info!(total = counts.total(), "Masking complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::privacy::{CatalogConfig, PiiCategory};
    use crate::source::memory::MemorySource;
    use crate::types::{RawMessage, Role};
    use chrono::{TimeZone, Utc};
    use std::time::Duration;

    fn catalog() -> Arc<PatternCatalog> {
        Arc::new(PatternCatalog::new(&CatalogConfig::default()).unwrap())
    }

    fn options() -> FetchOptions {
        FetchOptions {
            page_size: 2,
            request_delay: Duration::ZERO,
        }
    }

    fn msg(session: &str, secs: u32, role: Role, text: &str) -> RawMessage {
        RawMessage::new(
            session,
            Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, secs).unwrap(),
            role,
            text,
        )
    }

    #[tokio::test]
    async fn test_masks_each_session() {
        let source = Arc::new(MemorySource::from_messages(vec![
            msg("sess1", 1, Role::User, "my email is john@example.com"),
            msg("sess2", 2, Role::User, "nothing to see"),
            msg("sess1", 3, Role::User, "call me at 555-123-4567"),
            msg("sess1", 2, Role::Bot, "sure"),
        ]));
        let pipeline = ExtractionPipeline::new(source.clone(), catalog(), options());
        let range = DateRange::parse("2024-01-15", "2024-01-15").unwrap();

        let extraction = pipeline.run(&range).await.unwrap();
        assert_eq!(extraction.transcripts.len(), 2);

        let sess1 = &extraction.transcripts[0];
        assert_eq!(sess1.session_id, "sess1");
        assert_eq!(
            sess1.text,
            "[2024-01-15 10:30:01] User: my email is [EMAIL]\n\
             [2024-01-15 10:30:02] Bot: sure\n\
             [2024-01-15 10:30:03] User: call me at [PHONE]"
        );
        assert_eq!(sess1.counts.get(PiiCategory::Email), 1);
        assert_eq!(sess1.counts.get(PiiCategory::Phone), 1);

        let sess2 = &extraction.transcripts[1];
        assert_eq!(sess2.counts.total(), 0);

        let report = &extraction.report;
        assert!(report.run_id.starts_with("run-"));
        assert_eq!(report.messages_retrieved, 4);
        assert_eq!(report.requests, 2);
        assert_eq!(report.sessions, 2);
        assert_eq!(report.counts.total(), 2);
        assert_eq!(source.request_count().await, 2);
    }

    #[tokio::test]
    async fn test_empty_range() {
        let source = Arc::new(MemorySource::from_messages(Vec::new()));
        let pipeline = ExtractionPipeline::new(source, catalog(), options());
        let range = DateRange::parse("2024-01-01", "2024-01-02").unwrap();

        let extraction = pipeline.run(&range).await.unwrap();
        assert!(extraction.transcripts.is_empty());
        assert_eq!(extraction.report.sessions, 0);
        assert_eq!(extraction.report.requests, 1);
    }

    #[tokio::test]
    async fn test_fetch_error_aborts_run() {
        let source = Arc::new(MemorySource::scripted(vec![Err(
            crate::error::TranscriptError::Auth { status: 403 },
        )]));
        let pipeline = ExtractionPipeline::new(source, catalog(), options());
        let range = DateRange::parse("2024-01-01", "2024-01-02").unwrap();

        assert!(matches!(
            pipeline.run(&range).await,
            Err(crate::error::TranscriptError::Auth { status: 403 })
        ));
    }

    #[test]
    fn test_from_config_validates_first() {
        let config = ExtractionConfig::default();
        assert!(matches!(
            ExtractionPipeline::from_config(&config),
            Err(crate::error::TranscriptError::Validation(_))
        ));
    }
}
