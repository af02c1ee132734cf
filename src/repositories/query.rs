//! List query building shared by the storage backends.
//!
//! The SQL backend renders a `ListQuery` into a statement plus bind values;
//! the in-memory backend evaluates the same filter and ordering directly on
//! `Contact` values. Both follow one rule set:
//!
//! - filters are case-insensitive substrings (full Unicode folding), the
//!   phone filter matches any phone's digit key
//! - the chosen sort is always followed by `id ASC`
//! - `after_id` is a keyset cursor: only rows strictly after the cursor row
//!   in `(sort key, id)` order are returned; when the cursor row no longer
//!   exists, only IDs greater than it are kept
//! - `limit + 1` rows are fetched so the page knows whether more exist

use crate::domain::ContactId;
use crate::matching::{contains_ignore_case, fold};
use crate::models::{Contact, ContactFilter, ListQuery, SortKey, SortOrder};
use std::cmp::Ordering;

/// A value bound to a `?` placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    Text(String),
    Int(i64),
    Null,
}

/// A rendered statement and its binds, in placeholder order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlStatement {
    pub sql: String,
    pub binds: Vec<SqlValue>,
}

/// Wrap user text as a `LIKE '%..%'` pattern, escaping wildcards with `\`.
pub fn like_pattern(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('%');
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Sort-key values of the row an `after_id` cursor points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CursorValue {
    /// Folded last and first name
    Name { last: String, first: String },
    /// `created_at` or `updated_at` in epoch milliseconds
    Millis(i64),
}

/// The cursor row: its id plus the value of the active sort key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorKey {
    pub id: ContactId,
    pub value: CursorValue,
}

impl CursorKey {
    /// Keep the value `sort` orders by out of a cursor row's key columns.
    pub fn for_sort(
        id: ContactId,
        sort: SortKey,
        name: (String, String),
        created_at: i64,
        updated_at: i64,
    ) -> Self {
        let value = match sort {
            SortKey::Name => CursorValue::Name {
                last: name.0,
                first: name.1,
            },
            SortKey::CreatedAt => CursorValue::Millis(created_at),
            SortKey::UpdatedAt => CursorValue::Millis(updated_at),
        };
        Self { id, value }
    }
}

/// Reads every sort-key column of one contact, for building a `CursorKey`.
pub const CURSOR_ROW_SQL: &str =
    "SELECT last_name_fold, first_name_fold, created_at, updated_at FROM contacts WHERE id = ?";

fn direction(order: SortOrder) -> (&'static str, &'static str) {
    match order {
        SortOrder::Asc => ("ASC", ">"),
        SortOrder::Desc => ("DESC", "<"),
    }
}

/// The `ORDER BY` clause for a sort key and direction.
pub fn order_by_clause(sort: SortKey, order: SortOrder) -> String {
    let (dir, _) = direction(order);
    match sort {
        SortKey::Name => {
            format!("ORDER BY c.last_name_fold {dir}, c.first_name_fold {dir}, c.id ASC")
        }
        SortKey::CreatedAt => format!("ORDER BY c.created_at {dir}, c.id ASC"),
        SortKey::UpdatedAt => format!("ORDER BY c.updated_at {dir}, c.id ASC"),
    }
}

/// The condition selecting rows strictly after `cursor` in the order given
/// by `order_by_clause(sort, order)`.
fn keyset_condition(
    cursor: &CursorKey,
    sort: SortKey,
    order: SortOrder,
    binds: &mut Vec<SqlValue>,
) -> String {
    let (_, cmp) = direction(order);
    let id = cursor.id.get();
    match (&cursor.value, sort) {
        (CursorValue::Name { last, first }, SortKey::Name) => {
            binds.extend([
                SqlValue::Text(last.clone()),
                SqlValue::Text(last.clone()),
                SqlValue::Text(first.clone()),
                SqlValue::Text(first.clone()),
                SqlValue::Int(id),
            ]);
            format!(
                "(c.last_name_fold {cmp} ? OR (c.last_name_fold = ? AND \
                 (c.first_name_fold {cmp} ? OR (c.first_name_fold = ? AND c.id > ?))))"
            )
        }
        (CursorValue::Millis(ms), SortKey::CreatedAt | SortKey::UpdatedAt) => {
            let column = if sort == SortKey::CreatedAt {
                "c.created_at"
            } else {
                "c.updated_at"
            };
            binds.extend([SqlValue::Int(*ms), SqlValue::Int(*ms), SqlValue::Int(id)]);
            format!("({column} {cmp} ? OR ({column} = ? AND c.id > ?))")
        }
        // A key read for another sort says nothing about this order.
        _ => {
            binds.push(SqlValue::Int(id));
            "c.id > ?".to_string()
        }
    }
}

/// Render the contact-row query for one page (phones are loaded separately).
///
/// `cursor` carries the sort-key values of the `after_id` row; pass `None`
/// when that row is gone, and the query falls back to `id > after_id`.
pub fn build_list_sql(query: &ListQuery, cursor: Option<&CursorKey>) -> SqlStatement {
    let mut sql = String::from(
        "SELECT c.id, c.first_name, c.last_name, c.company, c.created_at, c.updated_at\n\
         FROM contacts c\n",
    );
    let mut conditions: Vec<String> = Vec::new();
    let mut binds: Vec<SqlValue> = Vec::new();

    let filter = &query.filter;
    for (column, value) in [
        ("c.first_name_fold", non_blank(&filter.first_name)),
        ("c.last_name_fold", non_blank(&filter.last_name)),
        ("c.company_fold", non_blank(&filter.company)),
    ] {
        if let Some(value) = value {
            conditions.push(format!("{column} LIKE ? ESCAPE '\\'"));
            binds.push(SqlValue::Text(like_pattern(&fold(value))));
        }
    }

    if let Some(digits) = non_blank(&filter.phone_digits) {
        // EXISTS keeps one row per contact even with several matching phones.
        conditions.push(
            "EXISTS (SELECT 1 FROM contact_phones p WHERE p.contact_id = c.id AND p.digits LIKE ? ESCAPE '\\')"
                .to_string(),
        );
        binds.push(SqlValue::Text(like_pattern(digits)));
    }

    match (cursor, query.after_id) {
        (Some(cursor), _) => {
            conditions.push(keyset_condition(cursor, query.sort, query.order, &mut binds));
        }
        (None, Some(after)) => {
            conditions.push("c.id > ?".to_string());
            binds.push(SqlValue::Int(after.get()));
        }
        (None, None) => {}
    }

    if !conditions.is_empty() {
        sql.push_str("WHERE ");
        sql.push_str(&conditions.join(" AND "));
        sql.push('\n');
    }

    sql.push_str(&order_by_clause(query.sort, query.order));
    sql.push_str("\nLIMIT ?");
    binds.push(SqlValue::Int(query.limit as i64 + 1));

    SqlStatement { sql, binds }
}

/// In-memory evaluation of a `ContactFilter`.
pub fn matches_filter(contact: &Contact, filter: &ContactFilter) -> bool {
    let text_ok = |field: Option<&str>, wanted: Option<&str>| match wanted {
        None => true,
        Some(wanted) => field.is_some_and(|f| contains_ignore_case(f, wanted)),
    };

    text_ok(Some(&contact.first_name), non_blank(&filter.first_name))
        && text_ok(Some(&contact.last_name), non_blank(&filter.last_name))
        && text_ok(contact.company.as_deref(), non_blank(&filter.company))
        && match non_blank(&filter.phone_digits) {
            None => true,
            Some(digits) => contact.phones.iter().any(|p| p.digits.contains(digits)),
        }
}

/// In-memory ordering matching `order_by_clause`.
pub fn compare_contacts(a: &Contact, b: &Contact, sort: SortKey, order: SortOrder) -> Ordering {
    let primary = match sort {
        SortKey::Name => fold(&a.last_name)
            .cmp(&fold(&b.last_name))
            .then_with(|| fold(&a.first_name).cmp(&fold(&b.first_name))),
        SortKey::CreatedAt => a.created_at.cmp(&b.created_at),
        SortKey::UpdatedAt => a.updated_at.cmp(&b.updated_at),
    };
    let primary = match order {
        SortOrder::Asc => primary,
        SortOrder::Desc => primary.reverse(),
    };
    primary.then_with(|| a.id.cmp(&b.id))
}

/// Whether `contact` comes strictly after `cursor` in list order.
pub fn is_after_cursor(contact: &Contact, cursor: &Contact, sort: SortKey, order: SortOrder) -> bool {
    compare_contacts(contact, cursor, sort, order) == Ordering::Greater
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ContactId;
    use chrono::Utc;

    fn query(filter: ContactFilter) -> ListQuery {
        ListQuery {
            filter,
            after_id: None,
            limit: 20,
            sort: SortKey::UpdatedAt,
            order: SortOrder::Desc,
        }
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("ann"), "%ann%");
        assert_eq!(like_pattern("50%_off\\"), "%50\\%\\_off\\\\%");
    }

    #[test]
    fn test_build_list_sql_without_filters() {
        let stmt = build_list_sql(&query(ContactFilter::default()), None);
        assert!(!stmt.sql.contains("WHERE"));
        assert!(stmt.sql.contains("ORDER BY c.updated_at DESC, c.id ASC"));
        assert_eq!(stmt.binds, vec![SqlValue::Int(21)]);
    }

    #[test]
    fn test_build_list_sql_binds_in_placeholder_order() {
        let mut q = query(ContactFilter {
            first_name: Some("An".to_string()),
            last_name: Some("  ".to_string()),
            company: Some("ACME".to_string()),
            phone_digits: Some("7771".to_string()),
        });
        q.after_id = Some(ContactId::new(10).unwrap());
        q.limit = 2;

        let stmt = build_list_sql(&q, None);
        assert_eq!(stmt.sql.matches('?').count(), stmt.binds.len());
        assert_eq!(
            stmt.binds,
            vec![
                SqlValue::Text("%an%".to_string()),
                SqlValue::Text("%acme%".to_string()),
                SqlValue::Text("%7771%".to_string()),
                SqlValue::Int(10),
                SqlValue::Int(3),
            ]
        );
        assert!(stmt.sql.contains("c.first_name_fold LIKE"));
        assert!(!stmt.sql.contains("c.last_name_fold LIKE"));
        assert!(stmt.sql.contains("c.id > ?"));
    }

    #[test]
    fn test_filters_bind_unicode_folded_patterns() {
        let stmt = build_list_sql(
            &query(ContactFilter {
                last_name: Some("СМИРНОВА".to_string()),
                ..Default::default()
            }),
            None,
        );
        assert_eq!(stmt.binds[0], SqlValue::Text("%смирнова%".to_string()));
    }

    #[test]
    fn test_cursor_on_timestamp_sort_is_keyset() {
        let mut q = query(ContactFilter::default());
        q.after_id = Some(ContactId::new(2).unwrap());
        let cursor = CursorKey::for_sort(
            ContactId::new(2).unwrap(),
            SortKey::UpdatedAt,
            (String::new(), String::new()),
            100,
            500,
        );

        let stmt = build_list_sql(&q, Some(&cursor));
        assert!(stmt
            .sql
            .contains("(c.updated_at < ? OR (c.updated_at = ? AND c.id > ?))"));
        assert_eq!(
            stmt.binds,
            vec![
                SqlValue::Int(500),
                SqlValue::Int(500),
                SqlValue::Int(2),
                SqlValue::Int(21),
            ]
        );
    }

    #[test]
    fn test_cursor_on_name_sort_nests_last_first_id() {
        let mut q = query(ContactFilter::default());
        q.sort = SortKey::Name;
        q.order = SortOrder::Asc;
        q.after_id = Some(ContactId::new(4).unwrap());
        let cursor = CursorKey::for_sort(
            ContactId::new(4).unwrap(),
            SortKey::Name,
            ("lee".to_string(), "ann".to_string()),
            0,
            0,
        );

        let stmt = build_list_sql(&q, Some(&cursor));
        assert_eq!(stmt.sql.matches('?').count(), stmt.binds.len());
        assert!(stmt.sql.contains("c.last_name_fold > ?"));
        assert!(stmt.sql.contains("c.first_name_fold > ?"));
        assert_eq!(stmt.binds[0], SqlValue::Text("lee".to_string()));
        assert_eq!(stmt.binds[2], SqlValue::Text("ann".to_string()));
        assert_eq!(stmt.binds[4], SqlValue::Int(4));
    }

    #[test]
    fn test_order_by_name_always_ends_with_id() {
        let clause = order_by_clause(SortKey::Name, SortOrder::Asc);
        assert!(clause.starts_with("ORDER BY c.last_name_fold ASC"));
        assert!(clause.ends_with("c.id ASC"));
        let clause = order_by_clause(SortKey::CreatedAt, SortOrder::Desc);
        assert_eq!(clause, "ORDER BY c.created_at DESC, c.id ASC");
    }

    #[test]
    fn test_compare_contacts_ties_on_id() {
        let now = Utc::now();
        let make = |id| Contact {
            id: ContactId::new(id).unwrap(),
            first_name: "Same".to_string(),
            last_name: "Name".to_string(),
            company: None,
            phones: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        let (a, b) = (make(1), make(2));
        for order in [SortOrder::Asc, SortOrder::Desc] {
            for sort in [SortKey::Name, SortKey::CreatedAt, SortKey::UpdatedAt] {
                assert_eq!(compare_contacts(&a, &b, sort, order), Ordering::Less);
            }
        }
    }

    #[test]
    fn test_is_after_cursor_follows_sort_direction() {
        let now = Utc::now();
        let make = |id, last: &str| Contact {
            id: ContactId::new(id).unwrap(),
            first_name: "A".to_string(),
            last_name: last.to_string(),
            company: None,
            phones: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        let (zed, abe) = (make(1, "Zed"), make(2, "abe"));
        assert!(is_after_cursor(&zed, &abe, SortKey::Name, SortOrder::Asc));
        assert!(!is_after_cursor(&zed, &abe, SortKey::Name, SortOrder::Desc));
        // Equal timestamps fall back to ascending id in both directions.
        assert!(is_after_cursor(&abe, &zed, SortKey::CreatedAt, SortOrder::Desc));
        assert!(!is_after_cursor(&zed, &abe, SortKey::UpdatedAt, SortOrder::Asc));
    }
}
