//! Extraction configuration
//!
//! Loaded from an HCL file; every key is optional so the CLI can fill in the
//! rest from flags and environment variables before [`ExtractionConfig::validate`]
//! runs.
//!
//! ```hcl
//! base_url      = "https://bots.kore.ai"
//! stream_id     = "st-0000-1111"
//! date_from     = "2024-01-01"
//! date_to       = "2024-01-31"
//! output        = "chat_history_masked.csv"
//! page_size     = 10000
//! request_delay = "5s"
//! timeout       = "30s"
//!
//! catalog {
//!   drivers_license {
//!     prefix = "DL"
//!     digits = 8
//!   }
//!   disabled = ["ZIP"]
//! }
//! ```

use crate::error::{Result, TranscriptError};
use crate::fetcher::{DateRange, FetchOptions, DEFAULT_PAGE_SIZE, DEFAULT_REQUEST_DELAY};
use crate::privacy::CatalogConfig;
use crate::source::kore::KoreSettings;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default Kore.ai host
pub const DEFAULT_BASE_URL: &str = "https://bots.kore.ai";

/// Default CSV output path
pub const DEFAULT_OUTPUT: &str = "chat_history_masked.csv";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExtractionConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub stream_id: String,
    /// JWT for the `auth` header. Prefer `KORE_JWT_TOKEN` over the file.
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub date_from: String,
    #[serde(default)]
    pub date_to: String,
    #[serde(default = "default_output")]
    pub output: PathBuf,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_request_delay", with = "duration_serde")]
    pub request_delay: Duration,
    #[serde(default = "default_timeout", with = "duration_serde")]
    pub timeout: Duration,
    #[serde(default)]
    pub catalog: CatalogConfig,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            stream_id: String::new(),
            token: String::new(),
            date_from: String::new(),
            date_to: String::new(),
            output: default_output(),
            page_size: default_page_size(),
            request_delay: default_request_delay(),
            timeout: default_timeout(),
            catalog: CatalogConfig::default(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.into()
}
fn default_output() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT)
}
fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}
fn default_request_delay() -> Duration {
    DEFAULT_REQUEST_DELAY
}
fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

pub mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let s = String::deserialize(d)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    /// Parse `"5s"` or `"500ms"`
    pub fn parse_duration(s: &str) -> Result<Duration, String> {
        let s = s.trim();
        if let Some(v) = s.strip_suffix("ms") {
            return v
                .trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|e| e.to_string());
        }
        if let Some(v) = s.strip_suffix('s') {
            return v
                .trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|e| e.to_string());
        }
        Err(format!("unknown duration format: '{s}' (use '5s' or '500ms')"))
    }
}

impl ExtractionConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let src = std::fs::read_to_string(path).map_err(|e| {
            TranscriptError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::parse(&src)
            .map_err(|e| TranscriptError::Config(format!("{} in {}", e, path.display())))
    }

    /// Parse HCL source
    pub fn parse(src: &str) -> Result<Self> {
        hcl::from_str(src).map_err(|e| TranscriptError::Config(format!("parse error: {e}")))
    }

    /// Check everything needed before the first request
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(TranscriptError::Validation("base_url is empty".into()));
        }
        if self.stream_id.trim().is_empty() {
            return Err(TranscriptError::Validation(
                "stream_id is required (--stream-id or KORE_STREAM_ID)".into(),
            ));
        }
        if self.token.trim().is_empty() {
            return Err(TranscriptError::Validation(
                "token is required (--token or KORE_JWT_TOKEN)".into(),
            ));
        }
        if self.page_size == 0 {
            return Err(TranscriptError::Validation(
                "page_size must be greater than 0".into(),
            ));
        }
        if self.output.as_os_str().is_empty() {
            return Err(TranscriptError::Validation("output path is empty".into()));
        }
        self.date_range()?;
        Ok(())
    }

    pub fn date_range(&self) -> Result<DateRange> {
        if self.date_from.trim().is_empty() || self.date_to.trim().is_empty() {
            return Err(TranscriptError::Validation(
                "date_from and date_to are required (YYYY-MM-DD)".into(),
            ));
        }
        DateRange::parse(&self.date_from, &self.date_to)
    }

    pub fn kore_settings(&self) -> KoreSettings {
        KoreSettings {
            base_url: self.base_url.clone(),
            stream_id: self.stream_id.clone(),
            token: self.token.clone(),
            timeout: self.timeout,
        }
    }

    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            page_size: self.page_size,
            request_delay: self.request_delay,
        }
    }
}

impl fmt::Display for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = if self.token.is_empty() { "(unset)" } else { "****" };
        writeln!(f, "base_url      = {}", self.base_url)?;
        writeln!(f, "stream_id     = {}", self.stream_id)?;
        writeln!(f, "token         = {}", token)?;
        writeln!(f, "date_from     = {}", self.date_from)?;
        writeln!(f, "date_to       = {}", self.date_to)?;
        writeln!(f, "output        = {}", self.output.display())?;
        writeln!(f, "page_size     = {}", self.page_size)?;
        writeln!(f, "request_delay = {}ms", self.request_delay.as_millis())?;
        writeln!(f, "timeout       = {}ms", self.timeout.as_millis())?;
        let disabled: Vec<&str> = self.catalog.disabled.iter().map(|c| c.tag()).collect();
        write!(f, "disabled      = [{}]", disabled.join(", "))
    }
}
