//! Ledger store behavior tests against the in-memory backend.

use table_ledger::entry::{Activity, ValidationEntry};
use table_ledger::memory::MemoryTableBackend;
use table_ledger::store::{LedgerStore, UpsertOutcome};

const TABLE: &str = "blobvalidation";

fn entry(blob: &str, industry: &str, account: &str) -> ValidationEntry {
    let mut entry = ValidationEntry::new(blob);
    entry.industry = industry.to_string();
    entry.account = account.to_string();
    entry.subscription = "sub1".to_string();
    entry.actor = "tester@example.com".to_string();
    entry
}

#[tokio::test]
async fn search_on_missing_table_is_empty_not_an_error() {
    let store = LedgerStore::new(MemoryTableBackend::new());
    let results = store.search_by_industry(TABLE, "finance").await.unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn industry_filter_is_substring_containment() {
    let store = LedgerStore::new(MemoryTableBackend::new());

    store
        .upsert(TABLE, &entry("c/a.txt", "finance-retail", "acct1"))
        .await
        .unwrap();
    store
        .upsert(TABLE, &entry("c/b.txt", "energy", "acct1"))
        .await
        .unwrap();

    let results = store.search_by_industry(TABLE, "retail").await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].industry, "finance-retail");

    // Empty filter matches everything, same as the containment rule
    let all = store.search_by_industry(TABLE, "").await.unwrap();
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn upsert_reports_inserted_then_updated() {
    let store = LedgerStore::new(MemoryTableBackend::new());
    let mut e = entry("c/a.txt", "finance", "acct1");
    e.md5 = Some("aaaa==".to_string());

    assert_eq!(
        store.upsert(TABLE, &e).await.unwrap(),
        UpsertOutcome::Inserted
    );

    // Same key pair, new hash: replaced in place, not duplicated
    e.md5 = Some("bbbb==".to_string());
    assert_eq!(
        store.upsert(TABLE, &e).await.unwrap(),
        UpsertOutcome::Updated
    );

    let results = store.search_by_industry(TABLE, "finance").await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].md5.as_deref(), Some("bbbb=="));
}

#[tokio::test]
async fn history_round_trips_through_the_store_append_only() {
    let store = LedgerStore::new(MemoryTableBackend::new());
    let mut e = entry("c/a.txt", "finance", "acct1");
    e.append_history(Activity::Create, "tester@example.com");
    store.upsert(TABLE, &e).await.unwrap();

    let mut fetched = store
        .search_by_industry(TABLE, "finance")
        .await
        .unwrap()
        .remove(0);
    assert_eq!(fetched.history.len(), 1);
    let first = fetched.history[0].clone();

    fetched.append_history(Activity::Rebase, "tester@example.com");
    store.upsert(TABLE, &fetched).await.unwrap();

    let again = store
        .search_by_industry(TABLE, "finance")
        .await
        .unwrap()
        .remove(0);
    assert_eq!(again.history.len(), 2);
    // Prior records never change
    assert_eq!(again.history[0], first);
    assert_eq!(again.history[1].activity, Activity::Rebase);
}

#[tokio::test]
async fn ensure_table_is_idempotent() {
    let store = LedgerStore::new(MemoryTableBackend::new());
    store.ensure_table(TABLE).await.unwrap();
    store.ensure_table(TABLE).await.unwrap();
    assert!(store.search_by_industry(TABLE, "x").await.unwrap().is_empty());
}

#[tokio::test]
async fn delete_removes_rows_by_key_pair() {
    let store = LedgerStore::new(MemoryTableBackend::new());
    let e = entry("c/a.txt", "finance", "acct1");
    store.upsert(TABLE, &e).await.unwrap();

    store
        .delete(TABLE, &[(e.partition_key.clone(), e.row_key.clone())])
        .await
        .unwrap();

    assert!(store
        .search_by_industry(TABLE, "finance")
        .await
        .unwrap()
        .is_empty());
}
