//! Primary-phone resolution.
//!
//! Turns caller phone entries into the phone set a contact stores:
//! normalized, deduplicated by digit key, with exactly one primary.

use crate::domain::{normalize_phone, ValidationError};
use crate::models::{Phone, PhoneIn};
use std::collections::HashSet;

/// What an empty result means for the operation at hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyPhones {
    /// Create: a contact must keep at least one phone.
    Reject,
    /// Update with an explicit list: an empty set clears all phones.
    Allow,
}

/// Resolve `entries` into a storable phone set.
///
/// Any entry that fails normalization rejects the whole list. Later entries
/// sharing a digit key with an earlier one are dropped. The first entry that
/// asks to be primary keeps the flag; without one, the first entry becomes
/// primary. The result is ordered primary first, then input order.
pub fn resolve_phones(entries: &[PhoneIn], empty: EmptyPhones) -> Result<Vec<Phone>, ValidationError> {
    let mut seen: HashSet<String> = HashSet::with_capacity(entries.len());
    let mut phones: Vec<Phone> = Vec::with_capacity(entries.len());

    for entry in entries {
        let raw = entry.raw.trim();
        let normalized =
            normalize_phone(raw).ok_or_else(|| ValidationError::InvalidPhone(raw.to_string()))?;
        let (e164, digits) = normalized.into_parts();

        if !seen.insert(digits.clone()) {
            continue;
        }

        phones.push(Phone {
            label: entry
                .label
                .as_deref()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string),
            raw: raw.to_string(),
            e164,
            digits,
            is_primary: entry.is_primary,
        });
    }

    if phones.is_empty() {
        return match empty {
            EmptyPhones::Reject => Err(ValidationError::NoValidPhones),
            EmptyPhones::Allow => Ok(phones),
        };
    }

    let primary = phones.iter().position(|p| p.is_primary).unwrap_or(0);
    for (i, phone) in phones.iter_mut().enumerate() {
        phone.is_primary = i == primary;
    }
    let chosen = phones.remove(primary);
    phones.insert(0, chosen);

    Ok(phones)
}
