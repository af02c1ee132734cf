use crate::domain::{ContactId, Patch};
use crate::error::{RepositoryError, RepositoryResult};
use crate::matching::{name_candidate_cap, recency_then_id, NameRanker};
use crate::models::{Contact, ContactChanges, ContactPage, ListQuery, NewContact, Phone};
use crate::repositories::query::{compare_contacts, is_after_cursor, matches_filter};
use crate::repositories::traits::ContactRepository;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

#[derive(Default)]
struct State {
    last_id: i64,
    contacts: BTreeMap<ContactId, Contact>,
}

/// Contact repository kept entirely in process memory.
///
/// Every mutation runs under one write lock, so a contact row and its
/// phones always change together. Useful for tests and for running the
/// server without a database file.
#[derive(Default)]
pub struct InMemoryContactRepository {
    state: RwLock<State>,
}

impl InMemoryContactRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored contacts.
    pub async fn len(&self) -> usize {
        self.state.read().await.contacts.len()
    }

    /// Whether the repository holds no contacts.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Primary first, then input order.
fn order_phones(mut phones: Vec<Phone>) -> Vec<Phone> {
    phones.sort_by_key(|p| !p.is_primary);
    phones
}

#[async_trait]
impl ContactRepository for InMemoryContactRepository {
    async fn create(&self, contact: NewContact) -> RepositoryResult<Contact> {
        let mut state = self.state.write().await;
        let next = state.last_id + 1;
        let id = ContactId::new(next).map_err(|e| RepositoryError::Storage(e.to_string()))?;
        let now = Utc::now();

        let stored = Contact {
            id,
            first_name: contact.first_name,
            last_name: contact.last_name,
            company: contact.company,
            phones: order_phones(contact.phones),
            created_at: now,
            updated_at: now,
        };
        state.last_id = next;
        state.contacts.insert(id, stored.clone());
        Ok(stored)
    }

    async fn get(&self, id: ContactId) -> RepositoryResult<Contact> {
        let state = self.state.read().await;
        state
            .contacts
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound(id))
    }

    async fn update(
        &self,
        id: ContactId,
        changes: ContactChanges,
        phones: Option<Vec<Phone>>,
    ) -> RepositoryResult<Contact> {
        let mut state = self.state.write().await;
        let contact = state
            .contacts
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound(id))?;

        if changes.is_empty() && phones.is_none() {
            return Ok(contact.clone());
        }

        if let Some(first_name) = changes.first_name {
            contact.first_name = first_name;
        }
        if let Some(last_name) = changes.last_name {
            contact.last_name = last_name;
        }
        match changes.company {
            Patch::Unset => {}
            Patch::Clear => contact.company = None,
            Patch::Set(company) => contact.company = Some(company),
        }
        if let Some(phones) = phones {
            contact.phones = order_phones(phones);
        }
        contact.updated_at = Utc::now();

        Ok(contact.clone())
    }

    async fn delete(&self, id: ContactId) -> RepositoryResult<()> {
        let mut state = self.state.write().await;
        state
            .contacts
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound(id))
    }

    async fn list(&self, query: ListQuery) -> RepositoryResult<ContactPage> {
        let state = self.state.read().await;
        let cursor = query.after_id.and_then(|after| state.contacts.get(&after));
        let mut rows: Vec<Contact> = state
            .contacts
            .values()
            .filter(|c| match (cursor, query.after_id) {
                (Some(cursor), _) => is_after_cursor(c, cursor, query.sort, query.order),
                (None, Some(after)) => c.id > after,
                (None, None) => true,
            })
            .filter(|c| matches_filter(c, &query.filter))
            .cloned()
            .collect();

        rows.sort_by(|a, b| compare_contacts(a, b, query.sort, query.order));
        rows.truncate(query.limit + 1);

        Ok(ContactPage::from_overfetch(rows, query.limit))
    }

    async fn search_by_phone(&self, digits: &str, limit: usize) -> RepositoryResult<Vec<Contact>> {
        let state = self.state.read().await;
        let mut hits: Vec<Contact> = state
            .contacts
            .values()
            .filter_map(|c| {
                let matching: Vec<Phone> = c
                    .phones
                    .iter()
                    .filter(|p| p.digits.contains(digits))
                    .cloned()
                    .collect();
                if matching.is_empty() {
                    return None;
                }
                Some(Contact {
                    phones: matching,
                    ..c.clone()
                })
            })
            .collect();

        hits.sort_by(recency_then_id);
        hits.truncate(limit);
        Ok(hits)
    }

    async fn search_by_name(&self, query: &str, limit: usize) -> RepositoryResult<Vec<Contact>> {
        let mut ranker = NameRanker::new(query);
        let mut candidates: Vec<Contact> = {
            let state = self.state.read().await;
            state
                .contacts
                .values()
                .filter(|c| ranker.matches(c))
                .cloned()
                .collect()
        };
        candidates.sort_by(recency_then_id);
        candidates.truncate(name_candidate_cap(limit));

        let mut ranked = ranker.rank(candidates);
        ranked.truncate(limit);
        Ok(ranked)
    }
}
