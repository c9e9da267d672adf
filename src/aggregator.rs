//! Session grouping and transcript formatting
//!
//! Messages arrive in API order, interleaved across sessions. Grouping keeps
//! sessions in first-encounter order and sorts each session's messages by
//! timestamp. The sort is stable, so messages sharing a timestamp keep their
//! arrival order.

use crate::types::{RawMessage, SessionTranscript};
use indexmap::IndexMap;

const LINE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Groups raw messages into per-session transcripts
#[derive(Debug, Default, Clone, Copy)]
pub struct SessionAggregator;

impl SessionAggregator {
    /// Create an aggregator
    pub fn new() -> Self {
        Self
    }

    /// Group messages by session. Every input message yields exactly one line.
    pub fn group(&self, messages: &[RawMessage]) -> IndexMap<String, SessionTranscript> {
        let mut by_session: IndexMap<&str, Vec<&RawMessage>> = IndexMap::new();
        for msg in messages {
            by_session
                .entry(msg.session_id.as_str())
                .or_default()
                .push(msg);
        }

        by_session
            .into_iter()
            .map(|(session_id, mut msgs)| {
                msgs.sort_by_key(|m| m.timestamp);
                let transcript = SessionTranscript {
                    session_id: session_id.to_string(),
                    lines: msgs.into_iter().map(format_line).collect(),
                };
                (session_id.to_string(), transcript)
            })
            .collect()
    }
}

/// `[YYYY-MM-DD HH:MM:SS] Role: text`
pub fn format_line(msg: &RawMessage) -> String {
    format!(
        "[{}] {}: {}",
        msg.timestamp.format(LINE_TIMESTAMP_FORMAT),
        msg.role,
        msg.text
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;
    use chrono::{TimeZone, Utc};

    fn msg(session: &str, secs: u32, role: Role, text: &str) -> RawMessage {
        RawMessage::new(
            session,
            Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, secs).unwrap(),
            role,
            text,
        )
    }

    #[test]
    fn test_format_line() {
        let line = format_line(&msg("s", 45, Role::User, "hello"));
        assert_eq!(line, "[2024-01-15 10:30:45] User: hello");

        let line = format_line(&msg("s", 0, Role::Other("agent".into()), ""));
        assert_eq!(line, "[2024-01-15 10:30:00] Agent: ");
    }

    #[test]
    fn test_interleaved_sessions() {
        let messages = vec![
            msg("b", 20, Role::Bot, "b2"),
            msg("a", 10, Role::User, "a1"),
            msg("b", 5, Role::User, "b1"),
            msg("a", 30, Role::Bot, "a3"),
            msg("a", 20, Role::User, "a2"),
        ];

        let grouped = SessionAggregator::new().group(&messages);
        let keys: Vec<&String> = grouped.keys().collect();
        assert_eq!(keys, vec!["b", "a"]);

        assert_eq!(
            grouped["a"].lines,
            vec![
                "[2024-01-15 10:30:10] User: a1",
                "[2024-01-15 10:30:20] User: a2",
                "[2024-01-15 10:30:30] Bot: a3",
            ]
        );
        assert_eq!(
            grouped["b"].lines,
            vec![
                "[2024-01-15 10:30:05] User: b1",
                "[2024-01-15 10:30:20] Bot: b2",
            ]
        );
    }

    #[test]
    fn test_equal_timestamps_keep_arrival_order() {
        let messages = vec![
            msg("s", 10, Role::User, "first"),
            msg("s", 10, Role::Bot, "second"),
            msg("s", 10, Role::User, "third"),
        ];
        let grouped = SessionAggregator::new().group(&messages);
        let texts: Vec<&str> = grouped["s"]
            .lines
            .iter()
            .map(|l| l.rsplit(": ").next().unwrap())
            .collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_no_message_dropped() {
        let messages: Vec<RawMessage> = (0..50)
            .map(|i| msg(&format!("s{}", i % 4), (i % 60) as u32, Role::User, ""))
            .collect();
        let grouped = SessionAggregator::new().group(&messages);
        assert_eq!(grouped.len(), 4);
        let lines: usize = grouped.values().map(|t| t.lines.len()).sum();
        assert_eq!(lines, 50);
    }

    #[test]
    fn test_empty_input() {
        assert!(SessionAggregator::new().group(&[]).is_empty());
    }
}
