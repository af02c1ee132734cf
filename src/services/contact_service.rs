//! Contact service layer.
//!
//! Business logic for creating, updating, listing and searching contacts.
//! Every repository failure leaves this layer classified as exactly one
//! `ServiceError` kind. Each operation is timed and its outcome counted in
//! the service's `Metrics`.

use crate::config::ServiceConfig;
use crate::domain::{digits_only, ContactId, Patch};
use crate::error::{RepositoryError, RepositoryResult, ServiceError, ServiceResult};
use crate::metrics::{Metrics, MetricsSummary, Operation, OperationTimer};
use crate::models::{
    ContactChanges, ContactCreateIn, ContactFilter, ContactOut, ContactUpdateIn, ListFilter,
    ListOut, ListQuery, NewContact, PageOut, SortKey, SortOrder,
};
use crate::repositories::ContactRepository;
use crate::services::phone_resolver::{resolve_phones, EmptyPhones};
use crate::services::validation::ContactValidator;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

/// Contact service trait for business operations.
#[async_trait]
pub trait ContactService: Send + Sync {
    /// Validate, resolve phones and store a new contact.
    async fn create_contact(&self, input: ContactCreateIn) -> ServiceResult<ContactOut>;

    /// Get complete details for a specific contact.
    async fn get_contact(&self, id: ContactId) -> ServiceResult<ContactOut>;

    /// Apply a partial update. Scalar changes and a phone replacement commit
    /// together.
    async fn update_contact(&self, id: ContactId, input: ContactUpdateIn)
        -> ServiceResult<ContactOut>;

    /// Hard-delete a contact. A missing id is `NotFound`.
    async fn delete_contact(&self, id: ContactId) -> ServiceResult<()>;

    /// Filtered, sorted, keyset-paginated listing.
    async fn list_contacts(&self, filter: ListFilter) -> ServiceResult<ListOut>;

    /// Phone lookup for phone-shaped queries, ranked name search otherwise.
    async fn search(&self, query: &str, limit: Option<usize>) -> ServiceResult<Vec<ContactOut>>;

    /// Snapshot of per-operation call, error and duration counters.
    fn metrics(&self) -> MetricsSummary;
}

/// Default implementation of ContactService.
pub struct ContactServiceImpl {
    repository: Arc<dyn ContactRepository>,
    validator: ContactValidator,
    config: ServiceConfig,
    metrics: Metrics,
}

impl ContactServiceImpl {
    /// Create a new contact service.
    pub fn new(repository: Arc<dyn ContactRepository>, config: ServiceConfig) -> Self {
        Self {
            repository,
            validator: ContactValidator::new(),
            config,
            metrics: Metrics::new(),
        }
    }

    /// Time a whole operation and count its outcome, validation failures
    /// included.
    async fn observed<T, F>(&self, operation: Operation, fut: F) -> ServiceResult<T>
    where
        T: Send,
        F: Future<Output = ServiceResult<T>> + Send,
    {
        let timer = OperationTimer::new(self.metrics.clone(), operation);
        let result = fut.await;
        match &result {
            Ok(_) => timer.complete(),
            Err(err) => timer.complete_with_error(err.kind()),
        }
        result
    }

    /// Run one repository call under the operation deadline and classify
    /// its failure.
    async fn call<T, F>(&self, operation: &'static str, fut: F) -> ServiceResult<T>
    where
        T: Send,
        F: Future<Output = RepositoryResult<T>> + Send,
    {
        match tokio::time::timeout(self.config.operation_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(classify(operation, err)),
            Err(_) => {
                tracing::warn!(
                    "{} exceeded deadline of {:?}",
                    operation,
                    self.config.operation_timeout
                );
                Err(ServiceError::internal())
            }
        }
    }
}

fn classify(operation: &'static str, err: RepositoryError) -> ServiceError {
    match err {
        RepositoryError::NotFound(id) => ServiceError::NotFound(format!("contact {} not found", id)),
        other => {
            tracing::error!("{} failed: {}", operation, other);
            ServiceError::internal()
        }
    }
}

/// Absent or zero means `default`; anything above `max` is capped.
fn clamp_limit(requested: Option<usize>, default: usize, max: usize) -> usize {
    match requested {
        None | Some(0) => default.min(max),
        Some(n) => n.min(max),
    }
}

fn trimmed(value: &str) -> String {
    value.trim().to_string()
}

/// A blank company is stored as no company.
fn company_value(value: &str) -> Option<String> {
    Some(trimmed(value)).filter(|c| !c.is_empty())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| trimmed(&v)).filter(|v| !v.is_empty())
}

fn list_query(filter: ListFilter, limit: usize) -> ListQuery {
    let sort = filter
        .sort
        .as_deref()
        .and_then(|s| s.parse::<SortKey>().ok())
        .unwrap_or_default();
    let order = filter
        .order
        .as_deref()
        .and_then(|s| s.parse::<SortOrder>().ok())
        .unwrap_or_default();

    ListQuery {
        filter: ContactFilter {
            first_name: non_blank(filter.first_name),
            last_name: non_blank(filter.last_name),
            company: non_blank(filter.company),
            phone_digits: filter
                .phone
                .as_deref()
                .map(digits_only)
                .filter(|d| !d.is_empty()),
        },
        after_id: filter.after_id,
        limit,
        sort,
        order,
    }
}

impl ContactServiceImpl {
    async fn create_inner(&self, input: ContactCreateIn) -> ServiceResult<ContactOut> {
        tracing::debug!("create_contact: {} phone entries", input.phones.len());
        self.validator.validate_create(&input)?;
        let phones = resolve_phones(&input.phones, EmptyPhones::Reject)?;

        let new_contact = NewContact {
            first_name: trimmed(&input.first_name),
            last_name: trimmed(&input.last_name),
            company: input.company.as_deref().and_then(company_value),
            phones,
        };

        let created = self
            .call("create_contact", self.repository.create(new_contact))
            .await?;
        tracing::info!("Created contact {}", created.id);
        Ok(created.into())
    }

    async fn get_inner(&self, id: ContactId) -> ServiceResult<ContactOut> {
        tracing::debug!("get_contact: {}", id);
        let contact = self.call("get_contact", self.repository.get(id)).await?;
        Ok(contact.into())
    }

    async fn update_inner(
        &self,
        id: ContactId,
        input: ContactUpdateIn,
    ) -> ServiceResult<ContactOut> {
        tracing::debug!("update_contact: {}", id);
        self.validator.validate_update(&input)?;

        let phones = match &input.phones {
            Patch::Unset => None,
            Patch::Clear => Some(Vec::new()),
            Patch::Set(entries) => Some(resolve_phones(entries, EmptyPhones::Allow)?),
        };

        let changes = ContactChanges {
            first_name: input.first_name.as_ref().into_set().map(|v| trimmed(v)),
            last_name: input.last_name.as_ref().into_set().map(|v| trimmed(v)),
            company: match &input.company {
                Patch::Unset => Patch::Unset,
                Patch::Clear => Patch::Clear,
                Patch::Set(value) => company_value(value).map_or(Patch::Clear, Patch::Set),
            },
        };

        let updated = self
            .call("update_contact", self.repository.update(id, changes, phones))
            .await?;
        tracing::info!("Updated contact {}", id);
        Ok(updated.into())
    }

    async fn delete_inner(&self, id: ContactId) -> ServiceResult<()> {
        tracing::debug!("delete_contact: {}", id);
        self.call("delete_contact", self.repository.delete(id)).await?;
        tracing::info!("Deleted contact {}", id);
        Ok(())
    }

    async fn list_inner(&self, filter: ListFilter) -> ServiceResult<ListOut> {
        let limit = clamp_limit(
            filter.limit,
            self.config.default_page_size,
            self.config.max_page_size,
        );
        let query = list_query(filter, limit);
        tracing::debug!(
            "list_contacts: sort={} order={} limit={} after={:?}",
            query.sort,
            query.order,
            limit,
            query.after_id
        );

        let page = self.call("list_contacts", self.repository.list(query)).await?;
        let has_more = page.has_more();
        Ok(ListOut {
            items: page.contacts.into_iter().map(ContactOut::from).collect(),
            page: PageOut {
                next_after_id: page.next_after_id,
                has_more,
                limit,
            },
        })
    }

    async fn search_inner(
        &self,
        query: &str,
        limit: Option<usize>,
    ) -> ServiceResult<Vec<ContactOut>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let limit = clamp_limit(
            limit,
            self.config.default_search_limit,
            self.config.max_search_limit,
        );
        tracing::debug!("search: {:?} limit={}", query, limit);

        let contacts = self
            .call("search", self.repository.search(query, limit))
            .await?;
        Ok(contacts.into_iter().map(ContactOut::from).collect())
    }
}

#[async_trait]
impl ContactService for ContactServiceImpl {
    async fn create_contact(&self, input: ContactCreateIn) -> ServiceResult<ContactOut> {
        self.observed(Operation::CreateContact, self.create_inner(input))
            .await
    }

    async fn get_contact(&self, id: ContactId) -> ServiceResult<ContactOut> {
        self.observed(Operation::GetContact, self.get_inner(id)).await
    }

    async fn update_contact(
        &self,
        id: ContactId,
        input: ContactUpdateIn,
    ) -> ServiceResult<ContactOut> {
        self.observed(Operation::UpdateContact, self.update_inner(id, input))
            .await
    }

    async fn delete_contact(&self, id: ContactId) -> ServiceResult<()> {
        self.observed(Operation::DeleteContact, self.delete_inner(id))
            .await
    }

    async fn list_contacts(&self, filter: ListFilter) -> ServiceResult<ListOut> {
        self.observed(Operation::ListContacts, self.list_inner(filter))
            .await
    }

    async fn search(&self, query: &str, limit: Option<usize>) -> ServiceResult<Vec<ContactOut>> {
        self.observed(Operation::Search, self.search_inner(query, limit))
            .await
    }

    fn metrics(&self) -> MetricsSummary {
        self.metrics.summary()
    }
}
