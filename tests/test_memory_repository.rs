//! In-memory repository behavior shared with the SQL backend.

use phonebook_mcp_server::domain::{ContactId, Patch};
use phonebook_mcp_server::models::{
    ContactChanges, ContactFilter, ListQuery, NewContact, Phone, SortKey, SortOrder,
};
use phonebook_mcp_server::repositories::{ContactRepository, InMemoryContactRepository};

fn phone(digits: &str, primary: bool) -> Phone {
    Phone {
        label: None,
        raw: digits.to_string(),
        e164: format!("+{}", digits),
        digits: digits.to_string(),
        is_primary: primary,
    }
}

fn new_contact(first: &str, last: &str, phones: Vec<Phone>) -> NewContact {
    NewContact {
        first_name: first.to_string(),
        last_name: last.to_string(),
        company: None,
        phones,
    }
}

fn list_query_for(limit: usize, sort: SortKey, order: SortOrder) -> ListQuery {
    ListQuery {
        filter: ContactFilter::default(),
        after_id: None,
        limit,
        sort,
        order,
    }
}

/// Follow `next_after_id` until the last page and collect every id seen.
async fn walk_pages<R: ContactRepository>(
    repo: &R,
    sort: SortKey,
    order: SortOrder,
    page_size: usize,
) -> Vec<ContactId> {
    let mut query = list_query_for(page_size, sort, order);
    let mut seen = Vec::new();
    loop {
        let page = repo.list(query.clone()).await.unwrap();
        seen.extend(page.contacts.iter().map(|c| c.id));
        match page.next_after_id {
            Some(next) => query.after_id = Some(next),
            None => return seen,
        }
        assert!(seen.len() <= 100, "cursor walk does not terminate");
    }
}

async fn seed_for_paging<R: ContactRepository>(repo: &R) {
    // Shared last names and timestamps force the id tiebreak; later
    // updates make updated_at order differ from id order.
    for (first, last) in [
        ("Cid", "Smith"),
        ("ann", "smith"),
        ("Bob", "Adams"),
        ("Dan", "Smith"),
        ("Eve", "Young"),
        ("Ann", "Smith"),
        ("Fay", "adams"),
    ] {
        repo.create(new_contact(first, last, vec![])).await.unwrap();
    }
    for id in [6, 1, 3] {
        tokio::time::sleep(std::time::Duration::from_millis(3)).await;
        repo.update(
            ContactId::new(id).unwrap(),
            ContactChanges {
                company: Patch::Set(format!("Co {id}")),
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap();
    }
}

async fn assert_every_walk_matches_unpaged<R: ContactRepository>(repo: &R) {
    for sort in [SortKey::Name, SortKey::CreatedAt, SortKey::UpdatedAt] {
        for order in [SortOrder::Asc, SortOrder::Desc] {
            let unpaged: Vec<ContactId> = repo
                .list(list_query_for(100, sort, order))
                .await
                .unwrap()
                .contacts
                .iter()
                .map(|c| c.id)
                .collect();
            assert_eq!(unpaged.len(), 7);

            for page_size in [1, 2, 3] {
                let walked = walk_pages(repo, sort, order, page_size).await;
                assert_eq!(
                    walked, unpaged,
                    "sort={sort} order={order} page_size={page_size}"
                );
            }
        }
    }
}

#[tokio::test]
async fn test_list_sorts_by_name_case_insensitively() {
    let repo = InMemoryContactRepository::new();
    repo.create(new_contact("bob", "adams", vec![])).await.unwrap();
    repo.create(new_contact("Al", "Zed", vec![])).await.unwrap();
    repo.create(new_contact("Amy", "Adams", vec![])).await.unwrap();

    let page = repo
        .list(list_query_for(10, SortKey::Name, SortOrder::Asc))
        .await
        .unwrap();
    let names: Vec<String> = page.contacts.iter().map(|c| c.full_name()).collect();
    assert_eq!(names, vec!["Amy Adams", "bob adams", "Al Zed"]);
    assert!(!page.has_more());
}

#[tokio::test]
async fn test_list_exact_page_has_no_more() {
    let repo = InMemoryContactRepository::new();
    for name in ["A", "B"] {
        repo.create(new_contact(name, "X", vec![])).await.unwrap();
    }

    let page = repo
        .list(list_query_for(2, SortKey::CreatedAt, SortOrder::Asc))
        .await
        .unwrap();
    assert_eq!(page.contacts.len(), 2);
    assert_eq!(page.next_after_id, None);
}

#[tokio::test]
async fn test_list_cursor_excludes_seen_ids() {
    let repo = InMemoryContactRepository::new();
    for name in ["A", "B", "C"] {
        repo.create(new_contact(name, "X", vec![])).await.unwrap();
    }

    let mut query = list_query_for(1, SortKey::CreatedAt, SortOrder::Asc);
    query.after_id = Some(ContactId::new(2).unwrap());
    let page = repo.list(query).await.unwrap();
    assert_eq!(page.contacts.len(), 1);
    assert_eq!(page.contacts[0].id.get(), 3);
}

#[tokio::test]
async fn test_update_bumps_timestamp_and_clears_company() {
    let repo = InMemoryContactRepository::new();
    let mut input = new_contact("A", "B", vec![phone("1111111", true)]);
    input.company = Some("Acme".to_string());
    let created = repo.create(input).await.unwrap();

    let updated = repo
        .update(
            created.id,
            ContactChanges {
                company: Patch::Clear,
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap();
    assert_eq!(updated.company, None);
    assert_eq!(updated.phones.len(), 1);
    assert!(updated.updated_at >= created.updated_at);
    assert_eq!(updated.created_at, created.created_at);
}

#[tokio::test]
async fn test_search_dispatches_on_query_shape() {
    let repo = InMemoryContactRepository::new();
    repo.create(new_contact(
        "Ann",
        "Lee",
        vec![phone("77711234567", true), phone("15550002222", false)],
    ))
    .await
    .unwrap();
    repo.create(new_contact("Bob", "7771", vec![phone("15550003333", true)]))
        .await
        .unwrap();

    // Digits only: phone lookup, the last name "7771" is not considered
    let results = repo.search("+7771", 10).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].first_name, "Ann");
    assert_eq!(results[0].phones.len(), 1);

    // Anything else: name search with full phone sets
    let results = repo.search("ann l", 10).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].phones.len(), 2);
}

#[tokio::test]
async fn test_phone_search_orders_by_recency() {
    let repo = InMemoryContactRepository::new();
    let older = repo
        .create(new_contact("Old", "One", vec![phone("5551111", true)]))
        .await
        .unwrap();
    let newer = repo
        .create(new_contact("New", "One", vec![phone("5552222", true)]))
        .await
        .unwrap();
    repo.update(
        older.id,
        ContactChanges {
            first_name: Some("Older".to_string()),
            ..Default::default()
        },
        None,
    )
    .await
    .unwrap();

    let results = repo.search_by_phone("555", 10).await.unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].id, older.id);
    assert_eq!(results[1].id, newer.id);
}

#[tokio::test]
async fn test_cursor_walk_matches_unpaged_order_for_every_sort() {
    let repo = InMemoryContactRepository::new();
    seed_for_paging(&repo).await;
    assert_every_walk_matches_unpaged(&repo).await;
}

#[tokio::test]
async fn test_cursor_on_deleted_row_falls_back_to_id() {
    let repo = InMemoryContactRepository::new();
    for name in ["A", "B", "C"] {
        repo.create(new_contact(name, "X", vec![])).await.unwrap();
    }
    repo.delete(ContactId::new(2).unwrap()).await.unwrap();

    let mut query = list_query_for(10, SortKey::Name, SortOrder::Desc);
    query.after_id = Some(ContactId::new(2).unwrap());
    let page = repo.list(query).await.unwrap();
    let ids: Vec<i64> = page.contacts.iter().map(|c| c.id.get()).collect();
    assert_eq!(ids, vec![3]);
}

#[tokio::test]
async fn test_filters_fold_non_ascii_case() {
    let repo = InMemoryContactRepository::new();
    repo.create(new_contact("Жанна", "Смирнова", vec![])).await.unwrap();

    let mut query = list_query_for(10, SortKey::Name, SortOrder::Asc);
    query.filter.last_name = Some("СМИРНОВА".to_string());
    assert_eq!(repo.list(query).await.unwrap().contacts.len(), 1);
    assert_eq!(repo.search("жанна", 10).await.unwrap().len(), 1);
}
