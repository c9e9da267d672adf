//! Compiled detection rules for each PII category
//!
//! The catalog is built once per process and shared read-only (via `Arc`)
//! with every [`PiiMasker`](super::PiiMasker). Rules are plain regexes,
//! optionally gated by a [`Validator`] that checks the words preceding the
//! match with a [`ContextGate`].

use super::category::PiiCategory;
use super::context::{default_birth_keywords, line_before, ContextGate, DEFAULT_CONTEXT_WINDOW};
use crate::error::{Result, TranscriptError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::ops::Range;

const EMAIL_PATTERN: &str =
    r"\b[A-Za-z0-9_.%+-]+@[A-Za-z0-9-]+(?:\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}\b";

const SSN_PATTERN: &str = r"\b\d{3}-\d{2}-\d{4}\b";

// Grouped form (#### #### #### #…) or 13-19 contiguous digits.
const CREDIT_CARD_PATTERN: &str = r"\b(?:\d{4}[ -]){3}\d{1,7}\b|\b\d{13,19}\b";

const IP_ADDRESS_PATTERN: &str =
    r"\b(?:(?:25[0-5]|2[0-4]\d|1\d\d|[1-9]?\d)\.){3}(?:25[0-5]|2[0-4]\d|1\d\d|[1-9]?\d)\b";

const PHONE_PATTERN: &str =
    r"(?:(?:\+|\b)1[-.\s]?)?(?:\(\d{3}\)|\b\d{3})[-.\s]?\d{3}[-.\s]?\d{4}\b";

const DOB_PATTERN: &str = r"\b(?:(?:0?[1-9]|1[0-2])/(?:0?[1-9]|[12]\d|3[01])/(?:19|20)\d{2}|(?:19|20)\d{2}-(?:0[1-9]|1[0-2])-(?:0[1-9]|[12]\d|3[01]))\b";

const BANK_ACCOUNT_PATTERN: &str = r"\b\d{10,17}\b";

const STREET_PATTERN: &str = concat!(
    r"\d{1,6}\s+(?:[A-Za-z][A-Za-z.'-]*\s+){1,4}",
    r"(?:street|st|avenue|ave|road|rd|boulevard|blvd|lane|ln|drive|dr|court|ct|circle|cir|plaza|place|pl|way|parkway|pkwy|terrace|ter)\b\.?",
    // ZIP after an optional city and an optional state, or city and state alone
    r"(?:,?\s+(?:[A-Za-z][A-Za-z ]{0,30}?,\s*)?(?:[A-Za-z]{2}\s+)?\d{5}(?:-\d{4})?\b",
    r"|,?\s+[A-Za-z][A-Za-z ]{0,30}?,\s*[A-Za-z]{2}\b)?",
);

const ADDRESS_KEYWORDS: &str = r"\b(?:address|live\s+at|located\s+at|residing\s+at)\b[:\s]*";

const ZIP_PATTERN: &str = r"\b\d{5}(?:-\d{4})?\b";

/// Capture group that narrows a match to the part that gets masked
const MASKED_GROUP: &str = "masked";

/// A street address, or whatever follows an address keyword up to the end
/// of the clause. The keyword itself is kept.
fn address_pattern() -> String {
    format!(
        r"(?i)\b(?:{street})|{keywords}(?P<{group}>{street}|[A-Za-z0-9#][^\n;.\[\]]*)",
        street = STREET_PATTERN,
        keywords = ADDRESS_KEYWORDS,
        group = MASKED_GROUP,
    )
}

/// Prefix + digit-count shape for document identifiers (e.g. `DL` + 8)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentShape {
    /// Literal prefix, matched case-sensitively
    pub prefix: String,

    /// Number of digits following the prefix
    pub digits: usize,
}

impl DocumentShape {
    /// Create a new document shape
    pub fn new(prefix: impl Into<String>, digits: usize) -> Self {
        Self {
            prefix: prefix.into(),
            digits,
        }
    }

    fn pattern(&self) -> String {
        format!(r"\b{}\d{{{}}}\b", regex::escape(&self.prefix), self.digits)
    }
}

/// Tunable parts of the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Driver's license shape
    pub drivers_license: DocumentShape,

    /// Passport shape
    pub passport: DocumentShape,

    /// Keywords that put a date in birth context
    pub birth_keywords: Vec<String>,

    /// Preceding tokens inspected by the DOB context gate
    pub context_window: usize,

    /// Categories the masker should skip
    pub disabled: Vec<PiiCategory>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            drivers_license: DocumentShape::new("DL", 8),
            passport: DocumentShape::new("P", 8),
            birth_keywords: default_birth_keywords(),
            context_window: DEFAULT_CONTEXT_WINDOW,
            disabled: Vec::new(),
        }
    }
}

/// Context check applied to a regex match before it is accepted
#[derive(Debug, Clone)]
pub struct Validator {
    gate: ContextGate,
    /// Spans a later rule will mask; each counts as one token in the window
    collapse: Option<Box<DetectionRule>>,
}

impl Validator {
    /// Accept matches whose preceding words satisfy `gate`
    pub fn context(gate: ContextGate) -> Self {
        Self {
            gate,
            collapse: None,
        }
    }

    /// Read every span `rule` finds before the match as the single token it
    /// is replaced with, so the verdict is the same on masked output.
    pub fn collapsing(mut self, rule: DetectionRule) -> Self {
        self.collapse = Some(Box::new(rule));
        self
    }

    /// Keyword gate
    pub fn gate(&self) -> &ContextGate {
        &self.gate
    }

    fn accepts(&self, text: &str, range: &Range<usize>) -> bool {
        let line = line_before(text, range.start);
        match &self.collapse {
            Some(rule) => self.gate.admits_line(&rule.collapsed(line)),
            None => self.gate.admits_line(line),
        }
    }
}

/// A compiled rule for one category
#[derive(Debug, Clone)]
pub struct DetectionRule {
    category: PiiCategory,
    pattern: Regex,
    masked_group: bool,
    validator: Option<Validator>,
}

impl DetectionRule {
    /// Compile a rule.
    ///
    /// When the pattern has a `(?P<masked>…)` group, only that group is
    /// reported for matches where it participates.
    pub fn new(category: PiiCategory, pattern: &str, validator: Option<Validator>) -> Result<Self> {
        let pattern = Regex::new(pattern)
            .map_err(|e| TranscriptError::Config(format!("{}: {}", category, e)))?;
        let masked_group = pattern
            .capture_names()
            .any(|name| name == Some(MASKED_GROUP));
        Ok(Self {
            category,
            pattern,
            masked_group,
            validator,
        })
    }

    /// Category this rule detects
    pub fn category(&self) -> PiiCategory {
        self.category
    }

    /// Underlying regex
    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }

    /// Byte ranges of all validated, non-overlapping matches in `text`
    pub fn find(&self, text: &str) -> Vec<Range<usize>> {
        let ranges: Vec<Range<usize>> = if self.masked_group {
            self.pattern
                .captures_iter(text)
                .filter_map(|caps| caps.name(MASKED_GROUP).or_else(|| caps.get(0)))
                .map(|m| m.start()..m.start() + m.as_str().trim_end().len())
                .collect()
        } else {
            self.pattern.find_iter(text).map(|m| m.range()).collect()
        };

        ranges
            .into_iter()
            .filter(|range| {
                self.validator
                    .as_ref()
                    .map_or(true, |v| v.accepts(text, range))
            })
            .collect()
    }

    /// `text` with every match replaced by this rule's token
    fn collapsed<'a>(&self, text: &'a str) -> Cow<'a, str> {
        let ranges = self.find(text);
        if ranges.is_empty() {
            return Cow::Borrowed(text);
        }
        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for range in ranges {
            out.push_str(&text[last..range.start]);
            out.push_str(self.category.token());
            last = range.end;
        }
        out.push_str(&text[last..]);
        Cow::Owned(out)
    }
}

/// Read-only set of detection rules, one per category
#[derive(Debug, Clone)]
pub struct PatternCatalog {
    /// Indexed by position in `PiiCategory::PRIORITY`
    rules: Vec<DetectionRule>,
    disabled: Vec<PiiCategory>,
}

impl PatternCatalog {
    /// Compile the catalog from configuration
    pub fn new(config: &CatalogConfig) -> Result<Self> {
        if config.drivers_license.digits == 0 || config.passport.digits == 0 {
            return Err(TranscriptError::Config(
                "document shapes need at least one digit".to_string(),
            ));
        }

        let address = DetectionRule::new(PiiCategory::Address, &address_pattern(), None)?;
        // DOB runs before ADDRESS, so an address between the keyword and the
        // date is still a run of words at this point.
        let dob = Validator::context(ContextGate::new(
            &config.birth_keywords,
            config.context_window,
        ))
        .collapsing(address.clone());

        let rules = PiiCategory::PRIORITY
            .iter()
            .map(|&category| match category {
                PiiCategory::Email => DetectionRule::new(category, EMAIL_PATTERN, None),
                PiiCategory::Ssn => DetectionRule::new(category, SSN_PATTERN, None),
                PiiCategory::CreditCard => DetectionRule::new(category, CREDIT_CARD_PATTERN, None),
                PiiCategory::IpAddress => DetectionRule::new(category, IP_ADDRESS_PATTERN, None),
                PiiCategory::Phone => DetectionRule::new(category, PHONE_PATTERN, None),
                PiiCategory::Dob => DetectionRule::new(category, DOB_PATTERN, Some(dob.clone())),
                PiiCategory::DriversLicense => {
                    DetectionRule::new(category, &config.drivers_license.pattern(), None)
                }
                PiiCategory::Passport => {
                    DetectionRule::new(category, &config.passport.pattern(), None)
                }
                PiiCategory::BankAccount => {
                    DetectionRule::new(category, BANK_ACCOUNT_PATTERN, None)
                }
                PiiCategory::Address => Ok(address.clone()),
                PiiCategory::Zip => DetectionRule::new(category, ZIP_PATTERN, None),
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(
            rules = rules.len(),
            disabled = ?config.disabled,
            "Pattern catalog compiled"
        );

        Ok(Self {
            rules,
            disabled: config.disabled.clone(),
        })
    }

    /// Rule for a category
    pub fn rules_for(&self, category: PiiCategory) -> &DetectionRule {
        // `rules` is built from PRIORITY, so the index always exists.
        &self.rules[category as usize]
    }

    /// Categories in masking priority order
    pub fn ordered_categories(&self) -> &'static [PiiCategory] {
        &PiiCategory::PRIORITY
    }

    /// Whether a category has been disabled by configuration
    pub fn is_enabled(&self, category: PiiCategory) -> bool {
        !self.disabled.contains(&category)
    }
}
