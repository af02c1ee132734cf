//! Phone normalization.
//!
//! Raw phone input is reduced to its digits. The digit string is the
//! identity used for deduplication and phone search; the `+`-prefixed form
//! is the E.164-like representation shown to callers.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fewest digits a phone number may have.
pub const MIN_PHONE_DIGITS: usize = 7;

/// Most digits a phone number may have (E.164 limit).
pub const MAX_PHONE_DIGITS: usize = 15;

static PHONE_QUERY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9]+$").expect("Failed to compile phone query regex"));

/// A successfully normalized phone number.
///
/// # Example
///
/// ```
/// use phonebook_mcp_server::domain::normalize_phone;
///
/// let phone = normalize_phone("+7 (771) 123-45-67").unwrap();
/// assert_eq!(phone.e164(), "+77711234567");
/// assert_eq!(phone.digits(), "77711234567");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NormalizedPhone {
    e164: String,
    digits: String,
}

impl NormalizedPhone {
    /// The canonical `+`-prefixed form.
    pub fn e164(&self) -> &str {
        &self.e164
    }

    /// The digit-only key (no leading `+`).
    pub fn digits(&self) -> &str {
        &self.digits
    }

    /// Split into `(e164, digits)`.
    pub fn into_parts(self) -> (String, String) {
        (self.e164, self.digits)
    }
}

impl fmt::Display for NormalizedPhone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.e164)
    }
}

/// Keep only the ASCII digits of `raw`, in order.
pub fn digits_only(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Normalize a raw phone string.
///
/// Every non-digit character is dropped. The result is rejected (`None`)
/// when fewer than 7 or more than 15 digits remain. Leading zeros are kept.
/// Pure and total: the same input always yields the same output.
pub fn normalize_phone(raw: &str) -> Option<NormalizedPhone> {
    let digits = digits_only(raw);
    if !(MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS).contains(&digits.len()) {
        return None;
    }
    Some(NormalizedPhone {
        e164: format!("+{}", digits),
        digits,
    })
}

/// Whether a free-text search query should be treated as a phone lookup.
///
/// True for an optional leading `+` followed by one or more digits.
pub fn is_phone_query(query: &str) -> bool {
    PHONE_QUERY.is_match(query)
}
