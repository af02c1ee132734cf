use async_trait::async_trait;
use phonebook_mcp_server::domain::ContactId;
use phonebook_mcp_server::error::{RepositoryError, RepositoryResult};
use phonebook_mcp_server::models::{
    Contact, ContactChanges, ContactPage, ListQuery, NewContact, Phone,
};
use phonebook_mcp_server::repositories::{ContactRepository, InMemoryContactRepository};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// How the mock should misbehave on its next calls.
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub enum MockFailure {
    /// Return a storage error
    Storage(String),
    /// Sleep before answering
    Hang(Duration),
}

/// Mock contact repository for testing.
///
/// Delegates to an in-memory store and tracks method calls for verification.
/// Can be scripted to fail or stall to exercise the service's error
/// classification and deadlines.
#[allow(dead_code)]
#[derive(Clone, Default)]
pub struct MockContactRepository {
    inner: Arc<InMemoryContactRepository>,
    call_counts: Arc<Mutex<HashMap<String, usize>>>,
    last_update: Arc<Mutex<Option<(ContactChanges, Option<Vec<Phone>>)>>>,
    failure: Arc<Mutex<Option<MockFailure>>>,
}

#[allow(dead_code)]
impl MockContactRepository {
    /// Create a new empty MockContactRepository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following call misbehave.
    pub fn fail_with(&self, failure: MockFailure) {
        *self.failure.lock().unwrap() = Some(failure);
    }

    /// Go back to normal behavior.
    pub fn recover(&self) {
        *self.failure.lock().unwrap() = None;
    }

    /// Get the number of times a method was called.
    pub fn get_call_count(&self, method: &str) -> usize {
        let counts = self.call_counts.lock().unwrap();
        *counts.get(method).unwrap_or(&0)
    }

    /// Total calls over all methods.
    pub fn total_calls(&self) -> usize {
        self.call_counts.lock().unwrap().values().sum()
    }

    /// The arguments of the most recent `update` call.
    pub fn last_update(&self) -> Option<(ContactChanges, Option<Vec<Phone>>)> {
        self.last_update.lock().unwrap().clone()
    }

    async fn track_call(&self, method: &str) -> RepositoryResult<()> {
        {
            let mut counts = self.call_counts.lock().unwrap();
            *counts.entry(method.to_string()).or_insert(0) += 1;
        }

        let failure = self.failure.lock().unwrap().clone();
        match failure {
            None => Ok(()),
            Some(MockFailure::Storage(msg)) => Err(RepositoryError::Storage(msg)),
            Some(MockFailure::Hang(delay)) => {
                tokio::time::sleep(delay).await;
                Ok(())
            }
        }
    }
}

#[async_trait]
impl ContactRepository for MockContactRepository {
    async fn create(&self, contact: NewContact) -> RepositoryResult<Contact> {
        self.track_call("create").await?;
        self.inner.create(contact).await
    }

    async fn get(&self, id: ContactId) -> RepositoryResult<Contact> {
        self.track_call("get").await?;
        self.inner.get(id).await
    }

    async fn update(
        &self,
        id: ContactId,
        changes: ContactChanges,
        phones: Option<Vec<Phone>>,
    ) -> RepositoryResult<Contact> {
        self.track_call("update").await?;
        *self.last_update.lock().unwrap() = Some((changes.clone(), phones.clone()));
        self.inner.update(id, changes, phones).await
    }

    async fn delete(&self, id: ContactId) -> RepositoryResult<()> {
        self.track_call("delete").await?;
        self.inner.delete(id).await
    }

    async fn list(&self, query: ListQuery) -> RepositoryResult<ContactPage> {
        self.track_call("list").await?;
        self.inner.list(query).await
    }

    async fn search_by_phone(&self, digits: &str, limit: usize) -> RepositoryResult<Vec<Contact>> {
        self.track_call("search_by_phone").await?;
        self.inner.search_by_phone(digits, limit).await
    }

    async fn search_by_name(&self, query: &str, limit: usize) -> RepositoryResult<Vec<Contact>> {
        self.track_call("search_by_name").await?;
        self.inner.search_by_name(query, limit).await
    }
}
