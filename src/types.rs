//! Core transcript types
//!
//! All serializable types use camelCase JSON for wire compatibility with the
//! Kore.ai message API.

use crate::privacy::MaskCounts;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Who sent a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    /// End user (`incoming` on the wire)
    User,
    /// Bot reply (`outgoing` on the wire)
    Bot,
    /// Any other message type, kept verbatim
    Other(String),
}

impl Role {
    /// Map the wire `type` field to a role
    pub fn from_wire(kind: &str) -> Self {
        match kind {
            "incoming" => Self::User,
            "outgoing" => Self::Bot,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "User"),
            Self::Bot => write!(f, "Bot"),
            Self::Other(kind) => {
                let mut chars = kind.chars();
                match chars.next() {
                    Some(first) => write!(
                        f,
                        "{}{}",
                        first.to_uppercase(),
                        chars.as_str().to_lowercase()
                    ),
                    None => write!(f, "Unknown"),
                }
            }
        }
    }
}

/// A single message as retrieved from the remote API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMessage {
    /// Conversation the message belongs to
    pub session_id: String,

    /// When the message was created (UTC)
    pub timestamp: DateTime<Utc>,

    /// Sender
    pub role: Role,

    /// Message text (empty when the record carried no text component)
    pub text: String,

    /// Absolute position in the paginated result set (`skip + index`)
    pub offset: u64,
}

impl RawMessage {
    /// Create a message, assigning offset 0
    pub fn new(
        session_id: impl Into<String>,
        timestamp: DateTime<Utc>,
        role: Role,
        text: impl Into<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            timestamp,
            role,
            text: text.into(),
            offset: 0,
        }
    }

    /// Set the result-set offset
    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }
}

/// Parse an API timestamp.
///
/// Accepts RFC 3339 (`2024-01-15T10:30:45.123Z`) and naive ISO forms
/// (`2024-01-15T10:30:45`, `2024-01-15 10:30:45`), the latter read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Chronologically ordered dialogue for one session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionTranscript {
    /// Session identifier
    pub session_id: String,

    /// Formatted dialogue lines, oldest first
    pub lines: Vec<String>,
}

impl SessionTranscript {
    /// Transcript body: lines joined with `\n`
    pub fn body(&self) -> String {
        self.lines.join("\n")
    }
}

/// A session transcript after PII masking. Terminal artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaskedTranscript {
    /// Session identifier
    pub session_id: String,

    /// Masked transcript body
    pub text: String,

    /// Redactions applied to this transcript
    pub counts: MaskCounts,
}

/// Pagination lifecycle phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FetchPhase {
    /// No request issued yet
    #[default]
    Start,
    /// A page request is in flight
    Requesting,
    /// A page was received and appended
    Accumulating,
    /// All pages retrieved
    Done,
    /// A request or response failed; the run stops
    Failed,
}

/// Mutable pagination state owned by one fetch run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchState {
    /// Offset for the next request
    pub skip: u64,

    /// Total expected, as last reported by the API
    pub total: u64,

    /// Messages retrieved so far
    pub retrieved: u64,

    /// `moreAvailable` from the last page
    pub more_available: bool,

    /// Requests issued so far
    pub requests: u32,

    /// Current phase
    pub phase: FetchPhase,
}

impl FetchState {
    /// Whether another page should be requested
    pub fn wants_more(&self) -> bool {
        self.more_available && self.retrieved < self.total
    }
}

/// One page as returned by a [`MessageSource`](crate::source::MessageSource)
#[derive(Debug, Clone, Default)]
pub struct MessagePage {
    /// Messages on this page
    pub messages: Vec<RawMessage>,

    /// Total messages matching the query
    pub total: u64,

    /// Whether more pages exist
    pub more_available: bool,
}

/// Summary of an extraction run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionReport {
    /// Run identifier (run-<uuid>)
    pub run_id: String,

    /// Messages retrieved from the API
    pub messages_retrieved: u64,

    /// Page requests issued
    pub requests: u32,

    /// Sessions emitted
    pub sessions: usize,

    /// Redactions across all sessions
    pub counts: MaskCounts,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_role_from_wire() {
        assert_eq!(Role::from_wire("incoming"), Role::User);
        assert_eq!(Role::from_wire("outgoing"), Role::Bot);
        assert_eq!(
            Role::from_wire("agent"),
            Role::Other("agent".to_string())
        );
    }

    #[test]
    fn test_role_display() {
        assert_eq!(Role::User.to_string(), "User");
        assert_eq!(Role::Bot.to_string(), "Bot");
        assert_eq!(Role::Other("AGENT".to_string()).to_string(), "Agent");
        assert_eq!(Role::Other(String::new()).to_string(), "Unknown");
    }

    #[test]
    fn test_parse_timestamp_forms() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 45).unwrap();
        assert_eq!(parse_timestamp("2024-01-15T10:30:45"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-15T10:30:45Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-15 10:30:45"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-15T11:30:45+01:00"), Some(expected));

        let with_millis = parse_timestamp("2024-01-15T10:30:45.250Z").unwrap();
        assert!(with_millis > expected);
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_fetch_state_wants_more() {
        let mut state = FetchState {
            total: 10,
            retrieved: 5,
            more_available: true,
            ..Default::default()
        };
        assert!(state.wants_more());

        state.retrieved = 10;
        assert!(!state.wants_more());

        state.retrieved = 5;
        state.more_available = false;
        assert!(!state.wants_more());
    }

    #[test]
    fn test_transcript_body() {
        let t = SessionTranscript {
            session_id: "s".to_string(),
            lines: vec!["a".to_string(), "b".to_string()],
        };
        assert_eq!(t.body(), "a\nb");
    }
}
