//! Durable table ledger for blob validation entries
//!
//! Provides the validation entry data model and a key-value table store
//! abstraction with two interchangeable backends: Azure Table storage
//! (REST, SharedKeyLite auth) and an in-memory table for tests and
//! local dry runs.
//!
//! # Quick Start
//!
//! ```no_run
//! use table_ledger::entry::{Activity, ValidationEntry};
//! use table_ledger::memory::MemoryTableBackend;
//! use table_ledger::store::LedgerStore;
//!
//! # async fn example() -> table_ledger::Result<()> {
//! let store = LedgerStore::new(MemoryTableBackend::new());
//!
//! let mut entry = ValidationEntry::new("container/report.csv");
//! entry.industry = "finance".to_string();
//! entry.append_history(Activity::Create, "validator@example.com");
//!
//! let outcome = store.upsert("blobvalidation", &entry).await?;
//! println!("Write outcome: {:?}", outcome);
//!
//! let matches = store.search_by_industry("blobvalidation", "finance").await?;
//! println!("Found {} entries", matches.len());
//! # Ok(())
//! # }
//! ```

pub mod azure;
pub mod entry;
pub mod error;
pub mod memory;
pub mod store;
pub mod traits;

// Re-export commonly used types
pub use entry::{Activity, EntityRow, HistoryRecord, ValidationEntry};
pub use error::{LedgerError, Result};
pub use store::{LedgerStore, UpsertOutcome};
pub use traits::TableBackend;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryTableBackend;

    #[tokio::test]
    async fn test_store_integration() {
        let store = LedgerStore::new(MemoryTableBackend::new());

        let mut entry = ValidationEntry::new("container/data.bin");
        entry.industry = "retail".to_string();
        entry.account = "acct1".to_string();

        let outcome = store.upsert("validation", &entry).await.unwrap();
        assert_eq!(outcome, UpsertOutcome::Inserted);

        let found = store.search_by_industry("validation", "retail").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].blob, "container/data.bin");
    }
}
