//! Embedded SQLite schema and pool setup.

use crate::error::RepositoryResult;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

/// Database schema, applied on every connect. Idempotent.
///
/// SQLite's `LIKE` and `NOCASE` fold ASCII only, so every searchable text
/// column has a `*_fold` twin holding its Unicode lowercase form. Filters,
/// name search and name sorting run on the twins.
pub(crate) const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS contacts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    company TEXT,
    first_name_fold TEXT NOT NULL,
    last_name_fold TEXT NOT NULL,
    company_fold TEXT,
    full_name_fold TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS contact_phones (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    contact_id INTEGER NOT NULL REFERENCES contacts(id) ON DELETE CASCADE,
    label TEXT,
    raw TEXT NOT NULL,
    e164 TEXT NOT NULL,
    digits TEXT NOT NULL,
    is_primary INTEGER NOT NULL DEFAULT 0,
    UNIQUE (contact_id, digits)
);

CREATE INDEX IF NOT EXISTS idx_contact_phones_contact ON contact_phones(contact_id);
CREATE INDEX IF NOT EXISTS idx_contact_phones_digits ON contact_phones(digits);
CREATE INDEX IF NOT EXISTS idx_contacts_updated ON contacts(updated_at, id);
CREATE INDEX IF NOT EXISTS idx_contacts_created ON contacts(created_at, id);
CREATE INDEX IF NOT EXISTS idx_contacts_name ON contacts(last_name_fold, first_name_fold, id);
";

/// Create a connection pool for `url`.
///
/// An in-memory database lives only as long as its connection, so it gets
/// a single connection that is never recycled.
pub(crate) async fn create_connection_pool(
    url: &str,
    max_connections: u32,
) -> RepositoryResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let in_memory = url.contains(":memory:");
    let mut pool_options = SqlitePoolOptions::new();
    pool_options = if in_memory {
        pool_options
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        pool_options.max_connections(max_connections.max(1))
    };

    Ok(pool_options.connect_with(options).await?)
}

/// Initialize database schema
pub(crate) async fn init_schema(pool: &SqlitePool) -> RepositoryResult<()> {
    sqlx::query(SCHEMA).execute(pool).await?;
    Ok(())
}
