//! Contact model representing a person in the directory.

use crate::domain::{ContactId, Patch};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A phone number owned by exactly one contact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Phone {
    /// Free-text label ("work", "home", ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// The input string as the user typed it, kept for display
    pub raw: String,

    /// Canonical `+`-prefixed form
    pub e164: String,

    /// Digit-only key used for deduplication and phone search
    pub digits: String,

    /// Whether this is the contact's primary phone
    pub is_primary: bool,
}

/// A contact as persisted by the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Contact {
    /// Store-assigned identifier, strictly increasing per insertion
    pub id: ContactId,

    pub first_name: String,

    pub last_name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,

    /// Phones, primary first then in insertion order
    pub phones: Vec<Phone>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Contact {
    /// The "first last" concatenation used by name search.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// The phone flagged primary, if the contact has any phones.
    pub fn primary_phone(&self) -> Option<&Phone> {
        self.phones.iter().find(|p| p.is_primary)
    }
}

/// Everything needed to insert a contact; ID and timestamps come from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewContact {
    pub first_name: String,
    pub last_name: String,
    pub company: Option<String>,
    pub phones: Vec<Phone>,
}

/// Scalar-field changes for an update. Names cannot be cleared.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContactChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub company: Patch<String>,
}

impl ContactChanges {
    /// True when no scalar field is touched.
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none() && self.last_name.is_none() && !self.company.is_present()
    }
}

/// Sort key for listing contacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    /// Last name, then first name
    Name,
    CreatedAt,
    #[default]
    UpdatedAt,
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "name" => Ok(SortKey::Name),
            "created_at" => Ok(SortKey::CreatedAt),
            "updated_at" => Ok(SortKey::UpdatedAt),
            other => Err(format!("Unknown sort key: {}", other)),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SortKey::Name => "name",
            SortKey::CreatedAt => "created_at",
            SortKey::UpdatedAt => "updated_at",
        };
        f.write_str(s)
    }
}

/// Sort direction for listing contacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(format!("Unknown sort order: {}", other)),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        })
    }
}

/// Partial, case-insensitive filters for listing. `None` means "any".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContactFilter {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub company: Option<String>,
    /// Already reduced to digits
    pub phone_digits: Option<String>,
}

/// A fully resolved list request as handed to the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub filter: ContactFilter,
    pub after_id: Option<ContactId>,
    pub limit: usize,
    pub sort: SortKey,
    pub order: SortOrder,
}

/// One page of a keyset-paginated listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactPage {
    pub contacts: Vec<Contact>,
    /// ID of the last returned contact when more rows exist
    pub next_after_id: Option<ContactId>,
}

impl ContactPage {
    /// Build a page from up to `limit + 1` rows fetched in final order.
    ///
    /// The extra row only signals that another page exists; it is dropped.
    pub fn from_overfetch(mut rows: Vec<Contact>, limit: usize) -> Self {
        let has_more = rows.len() > limit;
        rows.truncate(limit);
        let next_after_id = if has_more {
            rows.last().map(|c| c.id)
        } else {
            None
        };
        Self {
            contacts: rows,
            next_after_id,
        }
    }

    pub fn has_more(&self) -> bool {
        self.next_after_id.is_some()
    }
}
