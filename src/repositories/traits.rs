use crate::domain::{digits_only, is_phone_query, ContactId};
use crate::error::RepositoryResult;
use crate::models::{Contact, ContactChanges, ContactPage, ListQuery, NewContact, Phone};
use async_trait::async_trait;

/// Repository for managing contacts and the phones they own.
///
/// Provides abstraction over contact storage, enabling different
/// implementations (SQLite, in-memory, test doubles). Phones arrive already
/// normalized, deduplicated and with exactly one primary; implementations
/// persist them as given.
#[async_trait]
pub trait ContactRepository: Send + Sync {
    /// Insert a contact and its phones atomically. The store assigns the ID
    /// and both timestamps.
    async fn create(&self, contact: NewContact) -> RepositoryResult<Contact>;

    /// Retrieve a single contact by ID.
    async fn get(&self, id: ContactId) -> RepositoryResult<Contact>;

    /// Apply scalar changes and, when `phones` is `Some`, replace the whole
    /// phone set. Both commit together or not at all.
    async fn update(
        &self,
        id: ContactId,
        changes: ContactChanges,
        phones: Option<Vec<Phone>>,
    ) -> RepositoryResult<Contact>;

    /// Hard-delete a contact and its phones.
    async fn delete(&self, id: ContactId) -> RepositoryResult<()>;

    /// Filtered, sorted, keyset-paginated listing.
    async fn list(&self, query: ListQuery) -> RepositoryResult<ContactPage>;

    /// Contacts owning a phone whose digit key contains `digits`. Each
    /// result carries only its matching phones.
    async fn search_by_phone(&self, digits: &str, limit: usize) -> RepositoryResult<Vec<Contact>>;

    /// Contacts whose "first last" contains `query`, best match first, each
    /// with its full phone set.
    async fn search_by_name(&self, query: &str, limit: usize) -> RepositoryResult<Vec<Contact>>;

    /// Free-text search.
    ///
    /// A query made of an optional leading `+` and digits is a phone
    /// lookup (results carry only matching phones); anything else is a
    /// ranked name search (results carry full phone sets). A blank query
    /// matches nothing.
    async fn search(&self, query: &str, limit: usize) -> RepositoryResult<Vec<Contact>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        if is_phone_query(query) {
            self.search_by_phone(&digits_only(query), limit).await
        } else {
            self.search_by_name(query, limit).await
        }
    }
}
