//! Application service layer.
//!
//! Services contain business logic and orchestrate interactions between
//! the validator, the phone resolver and the repository. They provide a
//! clean boundary between the MCP handlers and the data access layer.

mod contact_service;
pub mod phone_resolver;
pub mod validation;

pub use contact_service::{ContactService, ContactServiceImpl};
pub use phone_resolver::{resolve_phones, EmptyPhones};
pub use validation::ContactValidator;
