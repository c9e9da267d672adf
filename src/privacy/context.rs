//! Keyword-window context gate
//!
//! Some shapes (a bare date, for instance) are only PII in context. A
//! `ContextGate` admits a match only when one of its keywords starts one of
//! the `window` tokens immediately preceding the match on the same line.
//!
//! ```text
//! "I was born on 01/15/1990"      → tokens before: [I, was, born, on] → admitted
//! "meeting on 01/15/1990"         → tokens before: [meeting, on]      → rejected
//! ```

use serde::{Deserialize, Serialize};

/// Default number of preceding tokens inspected
pub const DEFAULT_CONTEXT_WINDOW: usize = 6;

/// Keyword-window gate for context-dependent categories
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextGate {
    /// Lowercase keyword prefixes (e.g. "birth" also covers "birthday")
    keywords: Vec<String>,

    /// How many preceding tokens to inspect
    window: usize,
}

impl ContextGate {
    /// Create a gate from keywords and a token window
    pub fn new<I, S>(keywords: I, window: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
            window,
        }
    }

    /// Keywords this gate looks for
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Token window size
    pub fn window(&self) -> usize {
        self.window
    }

    /// Whether the match starting at byte `start` of `text` is in context
    pub fn admits(&self, text: &str, start: usize) -> bool {
        self.admits_line(line_before(text, start))
    }

    /// Whether the tail of `line` carries a keyword within the window.
    ///
    /// `line` is the text between the start of the line and the match.
    pub fn admits_line(&self, line: &str) -> bool {
        if self.window == 0 || self.keywords.is_empty() {
            return false;
        }
        line.split_whitespace()
            .rev()
            .take(self.window)
            .map(normalize_token)
            .any(|token| {
                self.keywords
                    .iter()
                    .any(|keyword| token.starts_with(keyword.as_str()))
            })
    }
}

/// Text on the same line as byte `start`, up to (not including) it
pub fn line_before(text: &str, start: usize) -> &str {
    let before = &text[..start];
    match before.rfind('\n') {
        Some(pos) => &before[pos + 1..],
        None => before,
    }
}

/// Lowercase and strip leading/trailing punctuation ("(DOB:" → "dob")
fn normalize_token(token: &str) -> String {
    token
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase()
}

/// Default keywords for date-of-birth context
pub fn default_birth_keywords() -> Vec<String> {
    ["born", "birth", "birthday", "birthdate", "dob", "d.o.b"]
        .iter()
        .map(|k| k.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate() -> ContextGate {
        ContextGate::new(default_birth_keywords(), DEFAULT_CONTEXT_WINDOW)
    }

    fn admits_at(gate: &ContextGate, text: &str, needle: &str) -> bool {
        let start = text.find(needle).unwrap();
        gate.admits(text, start)
    }

    #[test]
    fn test_keyword_in_window() {
        let g = gate();
        assert!(admits_at(&g, "I was born on 01/15/1990", "01/15"));
        assert!(admits_at(&g, "DOB: 1990-01-15", "1990"));
        assert!(admits_at(&g, "my date of birth is 01/15/1990", "01/15"));
        assert!(admits_at(&g, "(birthday) 01/15/1990", "01/15"));
    }

    #[test]
    fn test_no_keyword() {
        let g = gate();
        assert!(!admits_at(&g, "meeting on 01/15/1990", "01/15"));
        assert!(!admits_at(&g, "01/15/1990", "01/15"));
    }

    #[test]
    fn test_keyword_outside_window() {
        let g = ContextGate::new(["born"], 2);
        assert!(!admits_at(
            &g,
            "born somewhere and then on 01/15/1990",
            "01/15"
        ));
        assert!(admits_at(&g, "born on 01/15/1990", "01/15"));
    }

    #[test]
    fn test_previous_line_does_not_count() {
        let g = gate();
        let text = "[2024-01-15 10:30:45] Bot: what is your date of birth?\n[2024-01-15 10:31:00] User: 01/15/1990";
        assert!(!admits_at(&g, text, "2024-01-15 10:31"));
    }

    #[test]
    fn test_prefix_not_substring() {
        let g = gate();
        assert!(!admits_at(&g, "reborn on 01/15/1990", "01/15"));
    }

    #[test]
    fn test_line_before() {
        assert_eq!(line_before("a b\nborn on X", 12), "born on ");
        assert_eq!(line_before("born on X", 8), "born on ");
        assert_eq!(line_before("x\n", 2), "");
    }

    #[test]
    fn test_empty_gate_admits_nothing() {
        let g = ContextGate::new(Vec::<String>::new(), 6);
        assert!(!admits_at(&g, "born on 01/15/1990", "01/15"));
        let g = ContextGate::new(["born"], 0);
        assert!(!admits_at(&g, "born on 01/15/1990", "01/15"));
    }
}
