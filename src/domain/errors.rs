//! Domain validation errors.

use std::fmt;

/// Errors that can occur while validating contact input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided ID is zero or negative.
    InvalidId(i64),

    /// A required field is missing or blank after trimming.
    Required(&'static str),

    /// A field is shorter than its lower bound.
    TooShort { field: &'static str, min: usize },

    /// A field exceeds its upper bound.
    TooLong { field: &'static str, max: usize },

    /// A required field was explicitly cleared in an update.
    CannotClear(&'static str),

    /// The request carried no phone entries at all.
    MissingPhones,

    /// The provided phone number could not be normalized.
    InvalidPhone(String),

    /// Every phone was dropped during normalization and deduplication.
    NoValidPhones,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidId(id) => write!(f, "Invalid contact id: {}", id),
            Self::Required(field) => write!(f, "{} is required", field),
            Self::TooShort { field, min } => {
                write!(f, "{} must be at least {} characters", field, min)
            }
            Self::TooLong { field, max } => {
                write!(f, "{} must be at most {} characters", field, max)
            }
            Self::CannotClear(field) => write!(f, "{} cannot be cleared", field),
            Self::MissingPhones => write!(f, "at least one phone is required"),
            Self::InvalidPhone(phone) => write!(f, "Invalid phone number: {}", phone),
            Self::NoValidPhones => write!(f, "no valid phones"),
        }
    }
}

impl std::error::Error for ValidationError {}
