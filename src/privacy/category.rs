//! PII categories and their masking tokens

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A category of personally identifiable information.
///
/// Variants are declared in masking priority order, so the derived `Ord`
/// matches [`PiiCategory::PRIORITY`]: more specific shapes come before the
/// general ones that could also swallow them (SSN before PHONE before
/// BANK_ACCOUNT, ADDRESS before ZIP).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PiiCategory {
    Email,
    Ssn,
    CreditCard,
    IpAddress,
    Phone,
    Dob,
    DriversLicense,
    Passport,
    BankAccount,
    Address,
    Zip,
}

impl PiiCategory {
    /// All categories in the order the masker evaluates them
    pub const PRIORITY: [PiiCategory; 11] = [
        Self::Email,
        Self::Ssn,
        Self::CreditCard,
        Self::IpAddress,
        Self::Phone,
        Self::Dob,
        Self::DriversLicense,
        Self::Passport,
        Self::BankAccount,
        Self::Address,
        Self::Zip,
    ];

    /// Upper-case tag, e.g. `CREDIT_CARD`
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Email => "EMAIL",
            Self::Ssn => "SSN",
            Self::CreditCard => "CREDIT_CARD",
            Self::IpAddress => "IP_ADDRESS",
            Self::Phone => "PHONE",
            Self::Dob => "DOB",
            Self::DriversLicense => "DRIVERS_LICENSE",
            Self::Passport => "PASSPORT",
            Self::BankAccount => "BANK_ACCOUNT",
            Self::Address => "ADDRESS",
            Self::Zip => "ZIP",
        }
    }

    /// Replacement token, e.g. `[CREDIT_CARD]`
    pub fn token(&self) -> &'static str {
        match self {
            Self::Email => "[EMAIL]",
            Self::Ssn => "[SSN]",
            Self::CreditCard => "[CREDIT_CARD]",
            Self::IpAddress => "[IP_ADDRESS]",
            Self::Phone => "[PHONE]",
            Self::Dob => "[DOB]",
            Self::DriversLicense => "[DRIVERS_LICENSE]",
            Self::Passport => "[PASSPORT]",
            Self::BankAccount => "[BANK_ACCOUNT]",
            Self::Address => "[ADDRESS]",
            Self::Zip => "[ZIP]",
        }
    }
}

impl fmt::Display for PiiCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for PiiCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        Self::PRIORITY
            .iter()
            .copied()
            .find(|c| c.tag() == normalized)
            .ok_or_else(|| format!("unknown PII category: '{s}'"))
    }
}
