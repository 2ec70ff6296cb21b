//! Validated value types for user fields
//!
//! Each type parses from a raw string and displays as the string it
//! persists, so loading and saving never rewrites a stored value.

use std::fmt;
use std::str::FromStr;

/// Rejected raw input for a value type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid {kind}: '{value}'")]
pub struct InvalidValue {
    kind: &'static str,
    value: String,
}

impl InvalidValue {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// E-mail address with a non-empty local part and a dotted domain
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EmailAddress(String);

impl EmailAddress {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn domain(&self) -> &str {
        self.0.rsplit_once('@').map(|(_, d)| d).unwrap_or_default()
    }
}

impl FromStr for EmailAddress {
    type Err = InvalidValue;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let value = raw.trim();
        let valid = match value.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty()
                    && !domain.contains('@')
                    && domain.contains('.')
                    && !domain.starts_with('.')
                    && !domain.ends_with('.')
                    && !value.chars().any(char::is_whitespace)
            }
            None => false,
        };
        if valid {
            Ok(Self(value.to_string()))
        } else {
            Err(InvalidValue::new("email address", raw))
        }
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Full name; the first word is the first name, the rest the last name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PersonName(String);

impl PersonName {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn first_name(&self) -> &str {
        self.0.split_whitespace().next().unwrap_or_default()
    }

    /// Everything after the first name; empty for a single-word name
    pub fn last_name(&self) -> &str {
        self.0
            .split_once(char::is_whitespace)
            .map(|(_, rest)| rest.trim_start())
            .unwrap_or_default()
    }
}

impl FromStr for PersonName {
    type Err = InvalidValue;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let value = raw.trim();
        if value.is_empty() || value.chars().any(|c| c.is_control() || c.is_ascii_digit()) {
            return Err(InvalidValue::new("person name", raw));
        }
        Ok(Self(value.to_string()))
    }
}

impl fmt::Display for PersonName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Phone number: digits with optional `+`, spaces, dashes, dots or parentheses
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    const MIN_DIGITS: usize = 6;
    const MAX_DIGITS: usize = 15;

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Digits only, keeping a leading `+`
    pub fn normalized(&self) -> String {
        let digits: String = self.0.chars().filter(char::is_ascii_digit).collect();
        if self.0.starts_with('+') {
            format!("+{}", digits)
        } else {
            digits
        }
    }
}

impl FromStr for PhoneNumber {
    type Err = InvalidValue;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let value = raw.trim();
        let body = value.strip_prefix('+').unwrap_or(value);
        let allowed = body
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '-' | '.' | '(' | ')'));
        let digits = body.chars().filter(char::is_ascii_digit).count();

        if allowed && (Self::MIN_DIGITS..=Self::MAX_DIGITS).contains(&digits) {
            Ok(Self(value.to_string()))
        } else {
            Err(InvalidValue::new("phone number", raw))
        }
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
