//! Domain value objects and types.
//!
//! This module contains type-safe wrappers for domain concepts like
//! contact IDs, normalized phone numbers, and partial-update fields. These
//! value objects validate at construction time and keep invalid data out
//! of the rest of the system.

pub mod contact_id;
pub mod errors;
pub mod patch;
pub mod phone;

pub use contact_id::ContactId;
pub use errors::ValidationError;
pub use patch::Patch;
pub use phone::{digits_only, is_phone_query, normalize_phone, NormalizedPhone};
