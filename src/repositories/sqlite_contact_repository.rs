use crate::domain::{ContactId, Patch};
use crate::error::{RepositoryError, RepositoryResult};
use crate::matching::{fold, name_candidate_cap, NameRanker};
use crate::models::{Contact, ContactChanges, ContactPage, ListQuery, NewContact, Phone};
use crate::repositories::query::{
    build_list_sql, like_pattern, CursorKey, SqlValue, CURSOR_ROW_SQL,
};
use crate::repositories::sqlite_schema::{create_connection_pool, init_schema};
use crate::repositories::traits::ContactRepository;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use std::collections::HashMap;

const CONTACT_COLUMNS: &str =
    "c.id, c.first_name, c.last_name, c.company, c.created_at, c.updated_at";

/// Contact repository backed by SQLite through `sqlx`.
///
/// Multi-statement writes (contact row plus phone rows) run in a single
/// transaction. A transaction dropped before commit, for example because
/// the caller's future was cancelled, is rolled back.
#[derive(Clone)]
pub struct SqliteContactRepository {
    pool: SqlitePool,
}

impl SqliteContactRepository {
    /// Open (or create) the database at `url` and make sure the schema exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the URL is invalid, the
    /// connection fails, or schema initialization fails.
    pub async fn connect(url: &str, max_connections: u32) -> RepositoryResult<Self> {
        let pool = create_connection_pool(url, max_connections).await?;
        init_schema(&pool).await?;
        Ok(Self { pool })
    }
}

fn timestamp(ms: i64) -> RepositoryResult<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .ok_or_else(|| RepositoryError::Storage(format!("Invalid timestamp: {}", ms)))
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn full_name_fold(first_name: &str, last_name: &str) -> String {
    fold(&format!("{} {}", first_name, last_name))
}

fn stored_id(raw: i64) -> RepositoryResult<ContactId> {
    ContactId::new(raw).map_err(|e| RepositoryError::Storage(e.to_string()))
}

/// Parse a contact row; phones are attached separately.
fn parse_contact_row(row: &SqliteRow) -> RepositoryResult<Contact> {
    Ok(Contact {
        id: stored_id(row.try_get("id")?)?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        company: row.try_get("company")?,
        phones: Vec::new(),
        created_at: timestamp(row.try_get("created_at")?)?,
        updated_at: timestamp(row.try_get("updated_at")?)?,
    })
}

fn parse_phone_row(row: &SqliteRow) -> RepositoryResult<Phone> {
    Ok(Phone {
        label: row.try_get("label")?,
        raw: row.try_get("raw")?,
        e164: row.try_get("e164")?,
        digits: row.try_get("digits")?,
        is_primary: row.try_get("is_primary")?,
    })
}

/// Load phones for `contacts` in one query, primary first then insertion
/// order. With `digits` set, only phones whose key contains it are kept.
async fn attach_phones(
    conn: &mut SqliteConnection,
    contacts: &mut [Contact],
    digits: Option<&str>,
) -> RepositoryResult<()> {
    if contacts.is_empty() {
        return Ok(());
    }

    let placeholders = vec!["?"; contacts.len()].join(", ");
    let mut sql = format!(
        "SELECT contact_id, label, raw, e164, digits, is_primary FROM contact_phones \
         WHERE contact_id IN ({placeholders})"
    );
    if digits.is_some() {
        sql.push_str(" AND digits LIKE ? ESCAPE '\\'");
    }
    sql.push_str(" ORDER BY contact_id, is_primary DESC, id ASC");

    let mut query = sqlx::query(&sql);
    for contact in contacts.iter() {
        query = query.bind(contact.id.get());
    }
    if let Some(digits) = digits {
        query = query.bind(like_pattern(digits));
    }

    let mut by_contact: HashMap<i64, Vec<Phone>> = HashMap::new();
    let mut rows = query.fetch(&mut *conn);
    while let Some(row) = rows.try_next().await? {
        let contact_id: i64 = row.try_get("contact_id")?;
        by_contact
            .entry(contact_id)
            .or_default()
            .push(parse_phone_row(&row)?);
    }

    for contact in contacts.iter_mut() {
        contact.phones = by_contact.remove(&contact.id.get()).unwrap_or_default();
    }
    Ok(())
}

async fn insert_phones(
    conn: &mut SqliteConnection,
    contact_id: i64,
    phones: &[Phone],
) -> RepositoryResult<()> {
    for phone in phones {
        sqlx::query(
            "INSERT INTO contact_phones (contact_id, label, raw, e164, digits, is_primary)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(contact_id)
        .bind(phone.label.as_deref())
        .bind(phone.raw.as_str())
        .bind(phone.e164.as_str())
        .bind(phone.digits.as_str())
        .bind(phone.is_primary)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

async fn fetch_contact(conn: &mut SqliteConnection, id: ContactId) -> RepositoryResult<Contact> {
    let row = sqlx::query(&format!(
        "SELECT {CONTACT_COLUMNS} FROM contacts c WHERE c.id = ?"
    ))
    .bind(id.get())
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(RepositoryError::NotFound(id))?;

    let mut contacts = vec![parse_contact_row(&row)?];
    attach_phones(conn, &mut contacts, None).await?;
    Ok(contacts.remove(0))
}

/// Build the `SET` clauses for the scalar changes (consumes the changes).
///
/// `current` holds the stored first and last name, so the folded full name
/// can be recomputed when only one of them changes.
fn build_update_clauses(
    changes: ContactChanges,
    current: (&str, &str),
    now: i64,
) -> Vec<(&'static str, SqlValue)> {
    let mut clauses = Vec::new();

    if changes.first_name.is_some() || changes.last_name.is_some() {
        let first = changes.first_name.as_deref().unwrap_or(current.0);
        let last = changes.last_name.as_deref().unwrap_or(current.1);
        clauses.push(("full_name_fold", SqlValue::Text(full_name_fold(first, last))));
    }
    if let Some(first) = changes.first_name {
        clauses.push(("first_name_fold", SqlValue::Text(fold(&first))));
        clauses.push(("first_name", SqlValue::Text(first)));
    }
    if let Some(last) = changes.last_name {
        clauses.push(("last_name_fold", SqlValue::Text(fold(&last))));
        clauses.push(("last_name", SqlValue::Text(last)));
    }
    match changes.company {
        Patch::Unset => {}
        Patch::Clear => {
            clauses.push(("company_fold", SqlValue::Null));
            clauses.push(("company", SqlValue::Null));
        }
        Patch::Set(company) => {
            clauses.push(("company_fold", SqlValue::Text(fold(&company))));
            clauses.push(("company", SqlValue::Text(company)));
        }
    }

    clauses.push(("updated_at", SqlValue::Int(now)));
    clauses
}

/// Sort-key values of the `after_id` row, or `None` if it has been deleted.
async fn fetch_cursor_key(
    conn: &mut SqliteConnection,
    query: &ListQuery,
) -> RepositoryResult<Option<CursorKey>> {
    let Some(after) = query.after_id else {
        return Ok(None);
    };
    let row = sqlx::query(CURSOR_ROW_SQL)
        .bind(after.get())
        .fetch_optional(&mut *conn)
        .await?;

    row.map(|row| -> RepositoryResult<CursorKey> {
        Ok(CursorKey::for_sort(
            after,
            query.sort,
            (row.try_get("last_name_fold")?, row.try_get("first_name_fold")?),
            row.try_get("created_at")?,
            row.try_get("updated_at")?,
        ))
    })
    .transpose()
}

#[async_trait]
impl ContactRepository for SqliteContactRepository {
    async fn create(&self, contact: NewContact) -> RepositoryResult<Contact> {
        let mut tx = self.pool.begin().await?;
        let now = now_millis();

        let id = sqlx::query(
            "INSERT INTO contacts (first_name, last_name, company,
                 first_name_fold, last_name_fold, company_fold, full_name_fold,
                 created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(contact.first_name.as_str())
        .bind(contact.last_name.as_str())
        .bind(contact.company.as_deref())
        .bind(fold(&contact.first_name))
        .bind(fold(&contact.last_name))
        .bind(contact.company.as_deref().map(fold))
        .bind(full_name_fold(&contact.first_name, &contact.last_name))
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        insert_phones(&mut tx, id, &contact.phones).await?;
        let created = fetch_contact(&mut tx, stored_id(id)?).await?;
        tx.commit().await?;

        tracing::debug!("Inserted contact {} with {} phones", id, created.phones.len());
        Ok(created)
    }

    async fn get(&self, id: ContactId) -> RepositoryResult<Contact> {
        let mut conn = self.pool.acquire().await?;
        fetch_contact(&mut conn, id).await
    }

    async fn update(
        &self,
        id: ContactId,
        changes: ContactChanges,
        phones: Option<Vec<Phone>>,
    ) -> RepositoryResult<Contact> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query("SELECT first_name, last_name FROM contacts WHERE id = ?")
            .bind(id.get())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(RepositoryError::NotFound(id))?;

        if changes.is_empty() && phones.is_none() {
            return fetch_contact(&mut tx, id).await;
        }

        let first_name: String = current.try_get("first_name")?;
        let last_name: String = current.try_get("last_name")?;
        let clauses = build_update_clauses(changes, (&first_name, &last_name), now_millis());
        let set_sql: Vec<String> = clauses
            .iter()
            .map(|(column, _)| format!("{column} = ?"))
            .collect();
        let sql = format!("UPDATE contacts SET {} WHERE id = ?", set_sql.join(", "));

        let mut query = sqlx::query(&sql);
        for (_, value) in clauses {
            query = match value {
                SqlValue::Text(text) => query.bind(text),
                SqlValue::Int(int) => query.bind(int),
                SqlValue::Null => query.bind(Option::<String>::None),
            };
        }
        query.bind(id.get()).execute(&mut *tx).await?;

        if let Some(phones) = phones {
            sqlx::query("DELETE FROM contact_phones WHERE contact_id = ?")
                .bind(id.get())
                .execute(&mut *tx)
                .await?;
            insert_phones(&mut tx, id.get(), &phones).await?;
        }

        let updated = fetch_contact(&mut tx, id).await?;
        tx.commit().await?;
        Ok(updated)
    }

    async fn delete(&self, id: ContactId) -> RepositoryResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM contact_phones WHERE contact_id = ?")
            .bind(id.get())
            .execute(&mut *tx)
            .await?;
        let affected = sqlx::query("DELETE FROM contacts WHERE id = ?")
            .bind(id.get())
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if affected == 0 {
            return Err(RepositoryError::NotFound(id));
        }
        tx.commit().await?;
        Ok(())
    }

    async fn list(&self, query: ListQuery) -> RepositoryResult<ContactPage> {
        let mut conn = self.pool.acquire().await?;
        let cursor = fetch_cursor_key(&mut conn, &query).await?;

        let stmt = build_list_sql(&query, cursor.as_ref());
        let mut sql_query = sqlx::query(&stmt.sql);
        for value in stmt.binds {
            sql_query = match value {
                SqlValue::Text(text) => sql_query.bind(text),
                SqlValue::Int(int) => sql_query.bind(int),
                SqlValue::Null => sql_query.bind(Option::<String>::None),
            };
        }

        let rows = sql_query.fetch_all(&mut *conn).await?;
        let contacts = rows
            .iter()
            .map(parse_contact_row)
            .collect::<RepositoryResult<Vec<_>>>()?;

        let mut page = ContactPage::from_overfetch(contacts, query.limit);
        attach_phones(&mut conn, &mut page.contacts, None).await?;
        Ok(page)
    }

    async fn search_by_phone(&self, digits: &str, limit: usize) -> RepositoryResult<Vec<Contact>> {
        let mut conn = self.pool.acquire().await?;
        let pattern = like_pattern(digits);

        let rows = sqlx::query(&format!(
            "SELECT {CONTACT_COLUMNS} FROM contacts c
             WHERE EXISTS (
                 SELECT 1 FROM contact_phones p
                 WHERE p.contact_id = c.id AND p.digits LIKE ? ESCAPE '\\'
             )
             ORDER BY c.updated_at DESC, c.id ASC
             LIMIT ?"
        ))
        .bind(pattern)
        .bind(limit as i64)
        .fetch_all(&mut *conn)
        .await?;

        let mut contacts = rows
            .iter()
            .map(parse_contact_row)
            .collect::<RepositoryResult<Vec<_>>>()?;
        attach_phones(&mut conn, &mut contacts, Some(digits)).await?;
        Ok(contacts)
    }

    async fn search_by_name(&self, query: &str, limit: usize) -> RepositoryResult<Vec<Contact>> {
        let mut conn = self.pool.acquire().await?;

        let rows = sqlx::query(&format!(
            "SELECT {CONTACT_COLUMNS} FROM contacts c
             WHERE c.full_name_fold LIKE ? ESCAPE '\\'
             ORDER BY c.updated_at DESC, c.id ASC
             LIMIT ?"
        ))
        .bind(like_pattern(&fold(query)))
        .bind(i64::try_from(name_candidate_cap(limit)).unwrap_or(i64::MAX))
        .fetch_all(&mut *conn)
        .await?;

        let candidates = rows
            .iter()
            .map(parse_contact_row)
            .collect::<RepositoryResult<Vec<_>>>()?;

        let mut ranked = NameRanker::new(query).rank(candidates);
        ranked.truncate(limit);
        attach_phones(&mut conn, &mut ranked, None).await?;
        Ok(ranked)
    }
}
