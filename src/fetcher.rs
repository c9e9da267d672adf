//! Paginated message retrieval
//!
//! `MessageFetcher` drives a [`MessageSource`] page by page until the API
//! reports no more data:
//!
//! ```text
//! START ─▶ REQUESTING ─▶ ACCUMULATING ─┬─▶ DONE     (!moreAvailable, retrieved ≥ total, or empty page)
//!              ▲                       │
//!              └──── fixed delay ◀─────┘            (moreAvailable && retrieved < total)
//!
//! any error ─▶ FAILED
//! ```
//!
//! Requests are strictly sequential: each one depends on the previous
//! page's `total`/`moreAvailable`. There is no retry; the fixed delay only
//! exists to respect the remote rate limit.

use crate::error::{Result, TranscriptError};
use crate::source::{MessageSource, PageRequest};
use crate::types::{FetchPhase, FetchState, RawMessage};
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Default page size (the Kore.ai maximum)
pub const DEFAULT_PAGE_SIZE: u32 = 10_000;

/// Default wait between page requests
pub const DEFAULT_REQUEST_DELAY: Duration = Duration::from_secs(5);

/// Inclusive date range, validated so that `from <= to`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    from: NaiveDate,
    to: NaiveDate,
}

impl DateRange {
    /// Create a range, rejecting `from > to`
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self> {
        if from > to {
            return Err(TranscriptError::Validation(format!(
                "start date {} is after end date {}",
                from, to
            )));
        }
        Ok(Self { from, to })
    }

    /// Parse two `YYYY-MM-DD` dates
    pub fn parse(from: &str, to: &str) -> Result<Self> {
        Self::new(parse_date(from)?, parse_date(to)?)
    }

    /// First day
    pub fn from(&self) -> NaiveDate {
        self.from
    }

    /// Last day
    pub fn to(&self) -> NaiveDate {
        self.to
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
        TranscriptError::Validation(format!("invalid date '{}': expected YYYY-MM-DD", raw))
    })
}

/// Pagination settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    /// Messages requested per page
    pub page_size: u32,

    /// Fixed wait before every request after the first
    pub request_delay: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            request_delay: DEFAULT_REQUEST_DELAY,
        }
    }
}

/// Result of a completed fetch
#[derive(Debug, Clone)]
pub struct Fetched {
    /// Every message retrieved, in arrival order
    pub messages: Vec<RawMessage>,

    /// Final pagination state
    pub state: FetchState,
}

/// Sequential paginator over a message source
pub struct MessageFetcher {
    source: Arc<dyn MessageSource>,
    options: FetchOptions,
    shutdown: Option<watch::Receiver<bool>>,
}

impl MessageFetcher {
    /// Create a fetcher over a source
    pub fn new(source: Arc<dyn MessageSource>, options: FetchOptions) -> Self {
        Self {
            source,
            options,
            shutdown: None,
        }
    }

    /// Abort between pages once `shutdown` becomes `true`
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Pagination settings
    pub fn options(&self) -> &FetchOptions {
        &self.options
    }

    /// Fetch every message in `range`
    pub async fn fetch_all(&self, range: &DateRange) -> Result<Vec<RawMessage>> {
        self.fetch(range).await.map(|fetched| fetched.messages)
    }

    /// Fetch every message in `range`, returning the final pagination state too
    pub async fn fetch(&self, range: &DateRange) -> Result<Fetched> {
        let mut state = FetchState::default();
        let mut messages = Vec::new();

        tracing::info!(
            source = self.source.name(),
            from = %range.from(),
            to = %range.to(),
            page_size = self.options.page_size,
            "Fetching messages"
        );

        loop {
            let ready = if state.requests == 0 {
                self.check_cancelled()
            } else {
                self.pause().await
            };
            if let Err(e) = ready {
                state.phase = FetchPhase::Failed;
                tracing::warn!(retrieved = state.retrieved, "Fetch cancelled between pages");
                return Err(e);
            }

            state.phase = FetchPhase::Requesting;
            state.requests += 1;
            let request = PageRequest {
                date_from: range.from(),
                date_to: range.to(),
                limit: self.options.page_size,
                skip: state.skip,
            };

            let page = match self.source.fetch_page(&request).await {
                Ok(page) => page,
                Err(e) => {
                    state.phase = FetchPhase::Failed;
                    tracing::error!(
                        skip = state.skip,
                        request = state.requests,
                        error = %e,
                        "Page request failed"
                    );
                    return Err(e);
                }
            };

            state.phase = FetchPhase::Accumulating;
            let received = page.messages.len() as u64;
            state.skip += received;
            state.retrieved += received;
            state.total = page.total;
            state.more_available = page.more_available;
            messages.extend(page.messages);

            tracing::info!(
                received,
                retrieved = state.retrieved,
                total = state.total,
                more_available = state.more_available,
                "Retrieved page"
            );

            if received == 0 || !state.wants_more() {
                state.phase = FetchPhase::Done;
                break;
            }
        }

        tracing::info!(
            retrieved = state.retrieved,
            requests = state.requests,
            "Fetch complete"
        );

        Ok(Fetched { messages, state })
    }

    fn check_cancelled(&self) -> Result<()> {
        match &self.shutdown {
            Some(rx) if *rx.borrow() => Err(TranscriptError::Cancelled),
            _ => Ok(()),
        }
    }

    /// Wait out the inter-request delay, returning early on shutdown
    async fn pause(&self) -> Result<()> {
        let delay = self.options.request_delay;
        if !delay.is_zero() {
            tracing::debug!(delay_ms = delay.as_millis() as u64, "Waiting before next page");
        }

        let Some(mut shutdown) = self.shutdown.clone() else {
            tokio::time::sleep(delay).await;
            return Ok(());
        };

        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);
        loop {
            if *shutdown.borrow_and_update() {
                return Err(TranscriptError::Cancelled);
            }
            tokio::select! {
                _ = &mut sleep => return Ok(()),
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        // Sender gone: nobody can cancel any more.
                        (&mut sleep).await;
                        return Ok(());
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::memory::MemorySource;
    use crate::types::{MessagePage, Role};
    use chrono::{TimeZone, Utc};

    fn range() -> DateRange {
        DateRange::parse("2024-01-01", "2024-01-31").unwrap()
    }

    fn page(n: usize, start: usize, total: u64, more: bool) -> MessagePage {
        MessagePage {
            messages: (start..start + n)
                .map(|i| {
                    RawMessage::new(
                        format!("s{}", i % 7),
                        Utc.timestamp_opt(1_700_000_000 + i as i64, 0).unwrap(),
                        Role::User,
                        "hi",
                    )
                })
                .collect(),
            total,
            more_available: more,
        }
    }

    fn no_delay() -> FetchOptions {
        FetchOptions {
            page_size: 1000,
            request_delay: Duration::ZERO,
        }
    }

    #[test]
    fn test_date_range_validation() {
        assert!(DateRange::parse("2024-01-01", "2024-01-01").is_ok());
        assert!(matches!(
            DateRange::parse("2024-02-01", "2024-01-01"),
            Err(TranscriptError::Validation(_))
        ));
        assert!(matches!(
            DateRange::parse("01/01/2024", "2024-01-01"),
            Err(TranscriptError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_three_pages_until_total() {
        let source = Arc::new(MemorySource::scripted(vec![
            Ok(page(1000, 0, 2500, true)),
            Ok(page(1000, 1000, 2500, true)),
            Ok(page(500, 2000, 2500, false)),
        ]));
        let fetcher = MessageFetcher::new(source.clone(), no_delay());

        let fetched = fetcher.fetch(&range()).await.unwrap();
        assert_eq!(fetched.messages.len(), 2500);
        assert_eq!(fetched.state.requests, 3);
        assert_eq!(fetched.state.phase, FetchPhase::Done);
        assert_eq!(source.request_count().await, 3);

        let skips: Vec<u64> = source.requests().await.iter().map(|r| r.skip).collect();
        assert_eq!(skips, vec![0, 1000, 2000]);
        assert!(source.requests().await.iter().all(|r| r.limit == 1000));
    }

    #[tokio::test]
    async fn test_stops_when_total_reached_despite_more_available() {
        let source = Arc::new(MemorySource::scripted(vec![
            Ok(page(2, 0, 4, true)),
            Ok(page(2, 2, 4, true)),
            Ok(page(2, 4, 4, true)),
        ]));
        let fetcher = MessageFetcher::new(source.clone(), no_delay());

        let messages = fetcher.fetch_all(&range()).await.unwrap();
        assert_eq!(messages.len(), 4);
        assert_eq!(source.request_count().await, 2);
    }

    #[tokio::test]
    async fn test_empty_page_terminates() {
        let source = Arc::new(MemorySource::scripted(vec![
            Ok(page(3, 0, 100, true)),
            Ok(page(0, 0, 100, true)),
        ]));
        let fetcher = MessageFetcher::new(source.clone(), no_delay());

        let fetched = fetcher.fetch(&range()).await.unwrap();
        assert_eq!(fetched.messages.len(), 3);
        assert_eq!(fetched.state.requests, 2);
    }

    #[tokio::test]
    async fn test_error_is_fatal_without_retry() {
        let source = Arc::new(MemorySource::scripted(vec![
            Ok(page(10, 0, 20, true)),
            Err(TranscriptError::Auth { status: 401 }),
            Ok(page(10, 10, 20, false)),
        ]));
        let fetcher = MessageFetcher::new(source.clone(), no_delay());

        let result = fetcher.fetch(&range()).await;
        assert!(matches!(result, Err(TranscriptError::Auth { status: 401 })));
        assert_eq!(source.request_count().await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_delay_between_requests() {
        let source = Arc::new(MemorySource::scripted(vec![
            Ok(page(1, 0, 3, true)),
            Ok(page(1, 1, 3, true)),
            Ok(page(1, 2, 3, false)),
        ]));
        let fetcher = MessageFetcher::new(
            source,
            FetchOptions {
                page_size: 1,
                request_delay: Duration::from_secs(5),
            },
        );

        let started = tokio::time::Instant::now();
        fetcher.fetch_all(&range()).await.unwrap();
        assert_eq!(started.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_cancel_before_first_request() {
        let (tx, rx) = watch::channel(true);
        let source = Arc::new(MemorySource::scripted(vec![Ok(page(1, 0, 1, false))]));
        let fetcher = MessageFetcher::new(source.clone(), no_delay()).with_shutdown(rx);

        assert!(matches!(
            fetcher.fetch(&range()).await,
            Err(TranscriptError::Cancelled)
        ));
        assert_eq!(source.request_count().await, 0);
        drop(tx);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_delay() {
        let (tx, rx) = watch::channel(false);
        let source = Arc::new(MemorySource::scripted(vec![
            Ok(page(1, 0, 3, true)),
            Ok(page(1, 1, 3, true)),
            Ok(page(1, 2, 3, false)),
        ]));
        let fetcher = MessageFetcher::new(
            source.clone(),
            FetchOptions {
                page_size: 1,
                request_delay: Duration::from_secs(60),
            },
        )
        .with_shutdown(rx);

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            tx.send(true).unwrap();
        });

        let result = fetcher.fetch(&range()).await;
        assert!(matches!(result, Err(TranscriptError::Cancelled)));
        assert_eq!(source.request_count().await, 1);
        canceller.await.unwrap();
    }
}
