//! Ledger store
//!
//! Layers the validation-entry semantics on top of a [`TableBackend`]:
//! industry search with substring filtering, create-or-update upsert
//! with an explicit outcome, idempotent table creation, and row
//! deletion.

use crate::entry::ValidationEntry;
use crate::error::{LedgerError, Result};
use crate::traits::TableBackend;
use tracing::{debug, warn};

/// What an upsert did.
///
/// A first-class branch instead of inferring the path from a caught
/// conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// No row existed for the key; a new one was written.
    Inserted,
    /// A row existed and was replaced in place.
    Updated,
}

/// Durable key-value ledger of validation entries.
pub struct LedgerStore<B: TableBackend> {
    backend: B,
}

impl<B: TableBackend> LedgerStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// All entries whose `industry` field contains `industry` as a
    /// substring.
    ///
    /// This is deliberately a filter, not an exact match: searching
    /// "retail" returns entries tagged "finance-retail". Order follows
    /// the underlying listing and is not guaranteed stable.
    ///
    /// A missing table is not an error: first-run ingest searches before
    /// anything has been written, so this logs a warning and returns an
    /// empty result.
    pub async fn search_by_industry(
        &self,
        table: &str,
        industry: &str,
    ) -> Result<Vec<ValidationEntry>> {
        let rows = match self.backend.list_rows(table).await {
            Ok(rows) => rows,
            Err(LedgerError::TableNotFound(_)) => {
                warn!("Table {} not found, returning no records", table);
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        let mut entries = Vec::new();
        for row in rows {
            // Rows without an industry tag are not validation entries
            if row.industry.is_empty() || !row.industry.contains(industry) {
                continue;
            }
            entries.push(ValidationEntry::from_row(row)?);
        }

        debug!(
            "search_by_industry({}, {}) matched {} entries",
            table,
            industry,
            entries.len()
        );
        Ok(entries)
    }

    /// Write an entry keyed by `(PartitionKey, RowKey)`.
    ///
    /// Ensures the table exists, then inserts; if the key is already
    /// present the row is replaced in place. Last writer wins - there is
    /// no optimistic concurrency check. Any write failure other than the
    /// key conflict propagates to the caller.
    pub async fn upsert(&self, table: &str, entry: &ValidationEntry) -> Result<UpsertOutcome> {
        let row = entry.to_row()?;

        self.backend.create_table(table).await?;

        match self.backend.insert_row(table, &row).await {
            Ok(()) => Ok(UpsertOutcome::Inserted),
            Err(LedgerError::EntityExists { .. }) => {
                self.backend.replace_row(table, &row).await?;
                Ok(UpsertOutcome::Updated)
            }
            Err(e) => Err(e),
        }
    }

    /// Idempotent table creation.
    pub async fn ensure_table(&self, table: &str) -> Result<()> {
        self.backend.create_table(table).await
    }

    /// Delete rows by `(PartitionKey, RowKey)` pairs.
    pub async fn delete(&self, table: &str, keys: &[(String, String)]) -> Result<()> {
        for (partition_key, row_key) in keys {
            self.backend.delete_row(table, partition_key, row_key).await?;
        }
        Ok(())
    }

    /// Access the underlying backend (test inspection).
    pub fn backend(&self) -> &B {
        &self.backend
    }
}
