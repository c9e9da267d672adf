//! Kore.ai message history source
//!
//! Calls `POST {base}/api/public/bot/{streamId}/getMessagesV2` with the JWT
//! in the `auth` header and maps each record to a [`RawMessage`].
//!
//! API Reference: https://developer.kore.ai/docs/bots/api-guide/conversation-history/

use super::{MessageSource, PageRequest};
use crate::error::{Result, TranscriptError};
use crate::types::{parse_timestamp, MessagePage, RawMessage, Role};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

const MESSAGES_PATH: &str = "api/public/bot";
const MESSAGES_METHOD: &str = "getMessagesV2";
const UNKNOWN_SESSION: &str = "unknown";

/// Top-level response shape. Every field is required.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireResponse {
    messages: Option<Vec<serde_json::Value>>,
    total: Option<u64>,
    more_available: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireMessage {
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    created_on: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    components: Vec<WireComponent>,
}

#[derive(Debug, Default, Deserialize)]
struct WireComponent {
    #[serde(default)]
    data: Option<WireComponentData>,
}

#[derive(Debug, Default, Deserialize)]
struct WireComponentData {
    #[serde(default)]
    text: Option<String>,
}

impl WireMessage {
    /// First non-empty text component
    fn text(&self) -> String {
        self.components
            .iter()
            .filter_map(|c| c.data.as_ref()?.text.as_deref())
            .find(|t| !t.is_empty())
            .unwrap_or_default()
            .to_string()
    }
}

/// Connection settings for the Kore.ai API
#[derive(Clone)]
pub struct KoreSettings {
    /// Base URL (e.g. https://bots.kore.ai)
    pub base_url: String,
    /// Stream (bot) identifier
    pub stream_id: String,
    /// JWT token
    pub token: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl fmt::Debug for KoreSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KoreSettings")
            .field("base_url", &self.base_url)
            .field("stream_id", &self.stream_id)
            .field("token", &"***")
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// HTTP message source for the Kore.ai bot API
pub struct KoreSource {
    client: reqwest::Client,
    url: String,
    token: String,
}

impl KoreSource {
    /// Create a source from connection settings
    pub fn new(settings: &KoreSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| TranscriptError::Transport(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            url: Self::api_url(&settings.base_url, &settings.stream_id),
            token: settings.token.clone(),
        })
    }

    /// Build the messages endpoint URL
    pub fn api_url(base_url: &str, stream_id: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            normalize_base_url(base_url),
            MESSAGES_PATH,
            stream_id,
            MESSAGES_METHOD
        )
    }

    /// Endpoint this source posts to
    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Prefix `https://` when no scheme is given and strip trailing slashes
pub fn normalize_base_url(base_url: &str) -> String {
    let trimmed = base_url.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    }
}

/// Parse a response body into a page. `skip` seeds message offsets.
pub fn parse_page(body: &str, skip: u64) -> Result<MessagePage> {
    let response: WireResponse = serde_json::from_str(body)
        .map_err(|e| TranscriptError::api(format!("response is not valid JSON: {}", e), body))?;

    let raw_messages = response
        .messages
        .ok_or_else(|| TranscriptError::api("missing 'messages'", body))?;
    let total = response
        .total
        .ok_or_else(|| TranscriptError::api("missing 'total'", body))?;
    let more_available = response
        .more_available
        .ok_or_else(|| TranscriptError::api("missing 'moreAvailable'", body))?;

    let messages = raw_messages
        .into_iter()
        .enumerate()
        .map(|(i, value)| parse_message(value, skip + i as u64))
        .collect::<Result<Vec<_>>>()?;

    Ok(MessagePage {
        messages,
        total,
        more_available,
    })
}

fn parse_message(value: serde_json::Value, offset: u64) -> Result<RawMessage> {
    let context = value.to_string();
    let wire: WireMessage = serde_json::from_value(value).map_err(|e| {
        TranscriptError::api(format!("malformed message at offset {}: {}", offset, e), &context)
    })?;

    let created_on = wire.created_on.as_deref().ok_or_else(|| {
        TranscriptError::api(format!("message at offset {} has no 'createdOn'", offset), &context)
    })?;
    let timestamp = parse_timestamp(created_on).ok_or_else(|| {
        TranscriptError::api(
            format!("message at offset {} has unparseable 'createdOn'", offset),
            &context,
        )
    })?;

    let text = wire.text();
    let session_id = wire
        .session_id
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| UNKNOWN_SESSION.to_string());
    let role = Role::from_wire(wire.kind.as_deref().unwrap_or("unknown"));

    Ok(RawMessage::new(session_id, timestamp, role, text).with_offset(offset))
}

#[async_trait]
impl MessageSource for KoreSource {
    async fn fetch_page(&self, request: &PageRequest) -> Result<MessagePage> {
        tracing::debug!(url = %self.url, skip = request.skip, limit = request.limit, "Requesting page");

        let resp = self
            .client
            .post(&self.url)
            .header("auth", &self.token)
            .json(request)
            .send()
            .await
            .map_err(|e| TranscriptError::Transport(format!("Kore API request failed: {}", e)))?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(TranscriptError::Auth {
                status: status.as_u16(),
            });
        }

        let body = resp
            .text()
            .await
            .map_err(|e| TranscriptError::Transport(format!("Failed to read Kore response: {}", e)))?;

        if !status.is_success() {
            return Err(TranscriptError::api(format!("HTTP {}", status), &body));
        }

        parse_page(&body, request.skip)
    }

    fn name(&self) -> &str {
        "kore"
    }
}
