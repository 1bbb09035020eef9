//! Phone/email identifier handling.
//!
//! Everything downstream (verification-code keys, repository lookups,
//! notifier dispatch) works with the canonical form produced here: E.164
//! for phone numbers, lowercased address for email.

use std::fmt;

use serde::{Deserialize, Serialize};
use validator::ValidateEmail;

use crate::error::CoreError;

/// A user-supplied contact identifier in canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Identifier {
    /// Canonical E.164 phone number, e.g. `+79011234561`.
    Phone(String),
    /// Lowercased email address.
    Email(String),
}

impl Identifier {
    /// Parse a raw string as an email if it contains `@`, otherwise as a
    /// phone number.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        if raw.contains('@') {
            Self::email(raw)
        } else {
            Self::phone(raw)
        }
    }

    /// Normalize and validate a phone number into E.164 form.
    pub fn phone(raw: &str) -> Result<Self, CoreError> {
        let normalized = normalize_phone(raw);
        if !is_e164(&normalized) {
            return Err(CoreError::Validation(format!(
                "invalid phone number: {raw}"
            )));
        }
        Ok(Identifier::Phone(normalized))
    }

    /// Validate an email address, lowercasing it for canonical storage.
    pub fn email(raw: &str) -> Result<Self, CoreError> {
        let address = raw.trim().to_ascii_lowercase();
        if !address.validate_email() {
            return Err(CoreError::Validation(format!(
                "invalid email address: {raw}"
            )));
        }
        Ok(Identifier::Email(address))
    }

    /// The canonical string used for store keys and repository lookups.
    pub fn as_str(&self) -> &str {
        match self {
            Identifier::Phone(s) | Identifier::Email(s) => s,
        }
    }

    pub fn is_phone(&self) -> bool {
        matches!(self, Identifier::Phone(_))
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strip separators and rewrite the domestic `8XXXXXXXXXX` form to
/// `+7XXXXXXXXXX` before E.164 validation.
fn normalize_phone(raw: &str) -> String {
    let compact: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect();
    if compact.len() == 11
        && compact.starts_with('8')
        && compact[1..].chars().all(|c| c.is_ascii_digit())
    {
        format!("+7{}", &compact[1..])
    } else {
        compact
    }
}

/// E.164: a leading `+`, then 10-15 digits with a nonzero first digit.
fn is_e164(s: &str) -> bool {
    let Some(digits) = s.strip_prefix('+') else {
        return false;
    };
    (10..=15).contains(&digits.len())
        && digits.chars().all(|c| c.is_ascii_digit())
        && !digits.starts_with('0')
}
