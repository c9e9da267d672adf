//! Error types for a3s-transcript

use thiserror::Error;

/// Errors that can occur while extracting or masking transcripts
#[derive(Debug, Error)]
pub enum TranscriptError {
    /// Token rejected by the remote API (HTTP 401/403)
    #[error("Authentication failed (HTTP {status}): check the JWT token")]
    Auth { status: u16 },

    /// Network failure, timeout, or connection refused
    #[error("Transport error: {0}")]
    Transport(String),

    /// Response did not have the expected shape
    #[error("Unexpected API response: {reason} (response: {context})")]
    Api { reason: String, context: String },

    /// Bad input caught before any network call
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration could not be loaded or compiled
    #[error("Configuration error: {0}")]
    Config(String),

    /// Run aborted between pagination requests
    #[error("Extraction cancelled")]
    Cancelled,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TranscriptError {
    /// Build an `Api` error, keeping at most `MAX_CONTEXT` bytes of the body
    pub fn api(reason: impl Into<String>, body: &str) -> Self {
        Self::Api {
            reason: reason.into(),
            context: truncate_context(body),
        }
    }
}

const MAX_CONTEXT: usize = 512;

fn truncate_context(body: &str) -> String {
    if body.len() <= MAX_CONTEXT {
        return body.to_string();
    }
    let mut end = MAX_CONTEXT;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &body[..end])
}

/// Result type alias for transcript operations
pub type Result<T> = std::result::Result<T, TranscriptError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_context_is_truncated() {
        let body = "x".repeat(2000);
        match TranscriptError::api("bad shape", &body) {
            TranscriptError::Api { context, .. } => {
                assert!(context.len() <= MAX_CONTEXT + '…'.len_utf8());
                assert!(context.ends_with('…'));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_api_context_respects_char_boundaries() {
        let body = "é".repeat(400);
        let err = TranscriptError::api("bad shape", &body);
        assert!(err.to_string().contains("bad shape"));
    }

    #[test]
    fn test_auth_display() {
        let err = TranscriptError::Auth { status: 401 };
        assert!(err.to_string().contains("401"));
    }
}
