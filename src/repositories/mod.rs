mod memory_contact_repository;
pub mod query;
mod sqlite_contact_repository;
mod sqlite_schema;
mod traits;

pub use memory_contact_repository::InMemoryContactRepository;
pub use sqlite_contact_repository::SqliteContactRepository;
pub use traits::ContactRepository;
