//! Message source trait — the seam between pagination and transport
//!
//! A `MessageSource` answers one page request. The
//! [`MessageFetcher`](crate::fetcher::MessageFetcher) drives the pagination
//! loop on top of any implementation:
//!
//! - **kore** — HTTP client for the Kore.ai `getMessagesV2` API
//! - **memory** — scripted pages for tests and offline replay

use crate::error::Result;
use crate::types::MessagePage;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub mod kore;
pub mod memory;

/// Parameters of a single page request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    /// First day of the range (inclusive)
    #[serde(with = "iso_date")]
    pub date_from: NaiveDate,

    /// Last day of the range (inclusive)
    #[serde(with = "iso_date")]
    pub date_to: NaiveDate,

    /// Page size
    pub limit: u32,

    /// Offset into the result set
    pub skip: u64,
}

/// Core trait for message backends
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Fetch one page of messages
    async fn fetch_page(&self, request: &PageRequest) -> Result<MessagePage>;

    /// Source name (e.g., "kore", "memory")
    fn name(&self) -> &str;
}

/// `YYYY-MM-DD` (de)serialization for request dates
pub(crate) mod iso_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d";

    pub fn serialize<S: Serializer>(date: &NaiveDate, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&date.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveDate::parse_from_str(&raw, FORMAT).map_err(serde::de::Error::custom)
    }
}
