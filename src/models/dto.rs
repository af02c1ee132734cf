//! Input and output shapes of the contact service.
//!
//! Inputs are plain structs filled in by the caller layer; outputs are what
//! the caller serializes back. Digit keys stay internal and are not part of
//! the output.

use super::contact::{Contact, Phone};
use crate::domain::{ContactId, Patch};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// One phone entry as supplied by a caller.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PhoneIn {
    pub label: Option<String>,
    pub raw: String,
    pub is_primary: bool,
}

impl PhoneIn {
    pub fn new(raw: impl Into<String>) -> Self {
        Self {
            label: None,
            raw: raw.into(),
            is_primary: false,
        }
    }

    pub fn labeled(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn primary(mut self) -> Self {
        self.is_primary = true;
        self
    }
}

/// Input of `ContactService::create_contact`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContactCreateIn {
    pub first_name: String,
    pub last_name: String,
    pub company: Option<String>,
    pub phones: Vec<PhoneIn>,
}

/// Input of `ContactService::update_contact`.
///
/// `phones` is `Unset` to keep the stored phones, `Set(vec![])` or `Clear`
/// to remove them all, and `Set(non_empty)` to replace them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContactUpdateIn {
    pub first_name: Patch<String>,
    pub last_name: Patch<String>,
    pub company: Patch<String>,
    pub phones: Patch<Vec<PhoneIn>>,
}

/// Input of `ContactService::list_contacts`.
///
/// Sort and order are free strings; unknown values fall back to the
/// default ordering.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListFilter {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub company: Option<String>,
    pub phone: Option<String>,
    pub after_id: Option<ContactId>,
    pub limit: Option<usize>,
    pub sort: Option<String>,
    pub order: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhoneOut {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub phone_raw: String,
    pub phone_e164: String,
    pub is_primary: bool,
}

impl From<Phone> for PhoneOut {
    fn from(phone: Phone) -> Self {
        Self {
            label: phone.label,
            phone_raw: phone.raw,
            phone_e164: phone.e164,
            is_primary: phone.is_primary,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContactOut {
    pub id: ContactId,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    pub phones: Vec<PhoneOut>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Contact> for ContactOut {
    fn from(contact: Contact) -> Self {
        Self {
            id: contact.id,
            first_name: contact.first_name,
            last_name: contact.last_name,
            company: contact.company,
            phones: contact.phones.into_iter().map(PhoneOut::from).collect(),
            created_at: contact.created_at,
            updated_at: contact.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageOut {
    pub next_after_id: Option<ContactId>,
    pub has_more: bool,
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListOut {
    pub items: Vec<ContactOut>,
    pub page: PageOut,
}
