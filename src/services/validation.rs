//! Structural validation of service input.
//!
//! Only shapes and length bounds are checked here; phone normalization and
//! deduplication happen in the phone resolver.

use crate::domain::{Patch, ValidationError};
use crate::models::{ContactCreateIn, ContactUpdateIn, PhoneIn};

pub const MAX_NAME_LEN: usize = 40;
pub const MAX_COMPANY_LEN: usize = 40;
pub const MAX_LABEL_LEN: usize = 40;
pub const MIN_PHONE_RAW_LEN: usize = 5;
pub const MAX_PHONE_RAW_LEN: usize = 32;

/// Validates contact input before any normalization.
///
/// Lengths are counted in characters after trimming.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContactValidator;

impl ContactValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate_create(&self, input: &ContactCreateIn) -> Result<(), ValidationError> {
        self.validate_name("first_name", &input.first_name)?;
        self.validate_name("last_name", &input.last_name)?;
        if let Some(company) = &input.company {
            self.validate_company(company)?;
        }
        if input.phones.is_empty() {
            return Err(ValidationError::MissingPhones);
        }
        input
            .phones
            .iter()
            .try_for_each(|phone| self.validate_phone(phone))
    }

    pub fn validate_update(&self, input: &ContactUpdateIn) -> Result<(), ValidationError> {
        match &input.first_name {
            Patch::Unset => {}
            Patch::Clear => return Err(ValidationError::CannotClear("first_name")),
            Patch::Set(name) => self.validate_name("first_name", name)?,
        }
        match &input.last_name {
            Patch::Unset => {}
            Patch::Clear => return Err(ValidationError::CannotClear("last_name")),
            Patch::Set(name) => self.validate_name("last_name", name)?,
        }
        if let Patch::Set(company) = &input.company {
            self.validate_company(company)?;
        }
        if let Patch::Set(phones) = &input.phones {
            phones.iter().try_for_each(|phone| self.validate_phone(phone))?;
        }
        Ok(())
    }

    pub fn validate_phone(&self, phone: &PhoneIn) -> Result<(), ValidationError> {
        let raw = phone.raw.trim();
        if raw.is_empty() {
            return Err(ValidationError::Required("phone"));
        }
        let len = raw.chars().count();
        if len < MIN_PHONE_RAW_LEN {
            return Err(ValidationError::TooShort {
                field: "phone",
                min: MIN_PHONE_RAW_LEN,
            });
        }
        if len > MAX_PHONE_RAW_LEN {
            return Err(ValidationError::TooLong {
                field: "phone",
                max: MAX_PHONE_RAW_LEN,
            });
        }
        if let Some(label) = &phone.label {
            check_max("label", label, MAX_LABEL_LEN)?;
        }
        Ok(())
    }

    fn validate_name(&self, field: &'static str, value: &str) -> Result<(), ValidationError> {
        if value.trim().is_empty() {
            return Err(ValidationError::Required(field));
        }
        check_max(field, value, MAX_NAME_LEN)
    }

    fn validate_company(&self, value: &str) -> Result<(), ValidationError> {
        check_max("company", value, MAX_COMPANY_LEN)
    }
}

fn check_max(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    if value.trim().chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_input() -> ContactCreateIn {
        ContactCreateIn {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            company: None,
            phones: vec![PhoneIn::new("+44 20 7123 4567")],
        }
    }

    #[test]
    fn test_valid_create() {
        assert!(ContactValidator::new().validate_create(&create_input()).is_ok());
    }

    #[test]
    fn test_blank_name_is_required() {
        let mut input = create_input();
        input.first_name = "   ".to_string();
        assert_eq!(
            ContactValidator::new().validate_create(&input),
            Err(ValidationError::Required("first_name"))
        );
    }

    #[test]
    fn test_name_length_counts_characters() {
        let mut input = create_input();
        input.last_name = "Ж".repeat(40);
        assert!(ContactValidator::new().validate_create(&input).is_ok());
        input.last_name = "Ж".repeat(41);
        assert_eq!(
            ContactValidator::new().validate_create(&input),
            Err(ValidationError::TooLong {
                field: "last_name",
                max: 40
            })
        );
    }

    #[test]
    fn test_create_requires_a_phone_entry() {
        let mut input = create_input();
        input.phones.clear();
        assert_eq!(
            ContactValidator::new().validate_create(&input),
            Err(ValidationError::MissingPhones)
        );
    }

    #[test]
    fn test_phone_raw_bounds() {
        let validator = ContactValidator::new();
        assert!(validator.validate_phone(&PhoneIn::new("1234")).is_err());
        assert!(validator.validate_phone(&PhoneIn::new("12345")).is_ok());
        assert!(validator.validate_phone(&PhoneIn::new("1".repeat(33))).is_err());
        assert!(validator
            .validate_phone(&PhoneIn::new("12345").labeled("x".repeat(41)))
            .is_err());
    }

    #[test]
    fn test_update_cannot_clear_names() {
        let input = ContactUpdateIn {
            last_name: Patch::Clear,
            ..Default::default()
        };
        assert_eq!(
            ContactValidator::new().validate_update(&input),
            Err(ValidationError::CannotClear("last_name"))
        );
    }

    #[test]
    fn test_update_allows_clearing_company_and_phones() {
        let input = ContactUpdateIn {
            company: Patch::Clear,
            phones: Patch::Set(Vec::new()),
            ..Default::default()
        };
        assert!(ContactValidator::new().validate_update(&input).is_ok());
    }
}
