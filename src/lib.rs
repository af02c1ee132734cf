//! Phonebook MCP Server - a contact directory exposed over the Model Context Protocol.
//!
//! Contacts carry a set of phone numbers that are normalized to an E.164-like
//! form, deduplicated by their digit key and always have exactly one primary.
//! Listing is keyset-paginated; search treats digit queries as phone lookups
//! and everything else as a ranked name search.
//!
//! # Architecture
//!
//! - **domain**: Value objects (contact IDs, normalized phones, partial-update fields)
//! - **models**: Stored records, query types and service input/output shapes
//! - **error**: Custom error types for precise error handling
//! - **config**: Configuration management from environment variables
//! - **repositories**: Storage trait with in-memory and SQLite backends
//! - **matching**: Name similarity ranking
//! - **metrics**: Per-operation counters and durations
//! - **services**: Validation, phone resolution and the contact service
//! - **server**: MCP protocol server

pub mod config;
pub mod domain;
pub mod error;
pub mod matching;
pub mod metrics;
pub mod models;
pub mod repositories;
pub mod server;
pub mod services;

pub use config::{Config, ServiceConfig, StorageBackend};
pub use domain::{normalize_phone, ContactId, NormalizedPhone, Patch};
pub use error::{ConfigError, ErrorKind, RepositoryError, ServiceError};
pub use metrics::{Metrics, MetricsSummary, Operation};
pub use models::{Contact, ContactOut, ListOut, Phone};
pub use server::PhonebookMcpServer;
pub use services::{ContactService, ContactServiceImpl};
