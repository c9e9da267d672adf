//! In-memory message source
//!
//! Serves pages from memory. Used by tests and for replaying previously
//! captured message sets without network access. Every request is recorded
//! so pagination behavior can be asserted.

use super::{MessageSource, PageRequest};
use crate::error::Result;
use crate::types::{MessagePage, RawMessage};
use async_trait::async_trait;
use std::collections::VecDeque;
use tokio::sync::Mutex;

enum Backing {
    /// Slice a fixed message set by skip/limit, as the real API does
    Messages(Vec<RawMessage>),
    /// Return pre-built responses in order, ignoring skip/limit
    Scripted(VecDeque<Result<MessagePage>>),
}

/// In-memory message source
pub struct MemorySource {
    backing: Mutex<Backing>,
    requests: Mutex<Vec<PageRequest>>,
}

impl MemorySource {
    /// Serve `messages`, paginated by each request's skip/limit
    pub fn from_messages(messages: Vec<RawMessage>) -> Self {
        Self::with_backing(Backing::Messages(messages))
    }

    /// Serve the given responses in order, one per request.
    ///
    /// Once the script is exhausted, further requests get an empty final page.
    pub fn scripted(responses: Vec<Result<MessagePage>>) -> Self {
        Self::with_backing(Backing::Scripted(responses.into()))
    }

    fn with_backing(backing: Backing) -> Self {
        Self {
            backing: Mutex::new(backing),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Requests received so far, in order
    pub async fn requests(&self) -> Vec<PageRequest> {
        self.requests.lock().await.clone()
    }

    /// Number of requests received so far
    pub async fn request_count(&self) -> usize {
        self.requests.lock().await.len()
    }
}

#[async_trait]
impl MessageSource for MemorySource {
    async fn fetch_page(&self, request: &PageRequest) -> Result<MessagePage> {
        self.requests.lock().await.push(request.clone());

        let mut backing = self.backing.lock().await;
        match &mut *backing {
            Backing::Messages(messages) => {
                let total = messages.len() as u64;
                let start = (request.skip as usize).min(messages.len());
                let end = start.saturating_add(request.limit as usize).min(messages.len());
                let page = messages[start..end]
                    .iter()
                    .enumerate()
                    .map(|(i, m)| m.clone().with_offset((start + i) as u64))
                    .collect();
                Ok(MessagePage {
                    messages: page,
                    total,
                    more_available: (end as u64) < total,
                })
            }
            Backing::Scripted(responses) => responses.pop_front().unwrap_or_else(|| {
                Ok(MessagePage {
                    messages: Vec::new(),
                    total: 0,
                    more_available: false,
                })
            }),
        }
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TranscriptError;
    use crate::types::Role;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn request(skip: u64, limit: u32) -> PageRequest {
        PageRequest {
            date_from: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            date_to: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            limit,
            skip,
        }
    }

    fn messages(n: usize) -> Vec<RawMessage> {
        (0..n)
            .map(|i| {
                RawMessage::new(
                    format!("s{}", i % 2),
                    Utc.timestamp_opt(1_700_000_000 + i as i64, 0).unwrap(),
                    Role::User,
                    format!("m{}", i),
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn test_paginates_by_skip_and_limit() {
        let source = MemorySource::from_messages(messages(5));

        let page = source.fetch_page(&request(0, 2)).await.unwrap();
        assert_eq!(page.messages.len(), 2);
        assert_eq!(page.total, 5);
        assert!(page.more_available);

        let page = source.fetch_page(&request(4, 2)).await.unwrap();
        assert_eq!(page.messages.len(), 1);
        assert_eq!(page.messages[0].offset, 4);
        assert!(!page.more_available);

        let page = source.fetch_page(&request(10, 2)).await.unwrap();
        assert!(page.messages.is_empty());

        assert_eq!(source.request_count().await, 3);
        assert_eq!(source.requests().await[1].skip, 4);
    }

    #[tokio::test]
    async fn test_scripted_responses() {
        let source = MemorySource::scripted(vec![
            Ok(MessagePage {
                messages: messages(1),
                total: 2,
                more_available: true,
            }),
            Err(TranscriptError::Transport("connection reset".to_string())),
        ]);

        assert!(source.fetch_page(&request(0, 1)).await.is_ok());
        assert!(matches!(
            source.fetch_page(&request(1, 1)).await,
            Err(TranscriptError::Transport(_))
        ));

        let exhausted = source.fetch_page(&request(2, 1)).await.unwrap();
        assert!(exhausted.messages.is_empty());
        assert!(!exhausted.more_available);
        assert_eq!(source.name(), "memory");
    }
}
