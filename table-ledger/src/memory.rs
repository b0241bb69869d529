//! In-memory table backend
//!
//! Second implementation of [`TableBackend`], used by engine tests and
//! local dry runs. Mirrors the Azure backend's observable behavior:
//! listing an absent table is `TableNotFound`, inserting a duplicate key
//! is `EntityExists`, replacing an absent row is `EntityNotFound`.

use crate::entry::EntityRow;
use crate::error::{LedgerError, Result};
use crate::traits::TableBackend;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

type Table = HashMap<(String, String), EntityRow>;

/// In-memory table service.
#[derive(Default)]
pub struct MemoryTableBackend {
    tables: Mutex<HashMap<String, Table>>,
}

impl MemoryTableBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows currently in a table (0 if absent). Test helper.
    pub async fn row_count(&self, table: &str) -> usize {
        self.tables
            .lock()
            .await
            .get(table)
            .map(|t| t.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl TableBackend for MemoryTableBackend {
    async fn create_table(&self, table: &str) -> Result<()> {
        self.tables
            .lock()
            .await
            .entry(table.to_string())
            .or_default();
        Ok(())
    }

    async fn list_rows(&self, table: &str) -> Result<Vec<EntityRow>> {
        let tables = self.tables.lock().await;
        let rows = tables
            .get(table)
            .ok_or_else(|| LedgerError::TableNotFound(table.to_string()))?;
        Ok(rows.values().cloned().collect())
    }

    async fn insert_row(&self, table: &str, row: &EntityRow) -> Result<()> {
        let mut tables = self.tables.lock().await;
        let rows = tables
            .get_mut(table)
            .ok_or_else(|| LedgerError::TableNotFound(table.to_string()))?;

        let key = (row.partition_key.clone(), row.row_key.clone());
        if rows.contains_key(&key) {
            return Err(LedgerError::EntityExists {
                partition_key: row.partition_key.clone(),
                row_key: row.row_key.clone(),
            });
        }
        rows.insert(key, row.clone());
        Ok(())
    }

    async fn replace_row(&self, table: &str, row: &EntityRow) -> Result<()> {
        let mut tables = self.tables.lock().await;
        let rows = tables
            .get_mut(table)
            .ok_or_else(|| LedgerError::TableNotFound(table.to_string()))?;

        let key = (row.partition_key.clone(), row.row_key.clone());
        match rows.get_mut(&key) {
            Some(existing) => {
                *existing = row.clone();
                Ok(())
            }
            None => Err(LedgerError::EntityNotFound {
                partition_key: row.partition_key.clone(),
                row_key: row.row_key.clone(),
            }),
        }
    }

    async fn delete_row(&self, table: &str, partition_key: &str, row_key: &str) -> Result<()> {
        let mut tables = self.tables.lock().await;
        let rows = tables
            .get_mut(table)
            .ok_or_else(|| LedgerError::TableNotFound(table.to_string()))?;

        let key = (partition_key.to_string(), row_key.to_string());
        match rows.remove(&key) {
            Some(_) => Ok(()),
            None => Err(LedgerError::EntityNotFound {
                partition_key: partition_key.to_string(),
                row_key: row_key.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pk: &str, rk: &str) -> EntityRow {
        EntityRow {
            partition_key: pk.to_string(),
            row_key: rk.to_string(),
            industry: "test".to_string(),
            md5: None,
            account: String::new(),
            subscription: String::new(),
            blob: String::new(),
            actor: String::new(),
            history: String::new(),
        }
    }

    #[tokio::test]
    async fn test_list_missing_table() {
        let backend = MemoryTableBackend::new();
        let result = backend.list_rows("absent").await;
        assert!(matches!(result, Err(LedgerError::TableNotFound(_))));
    }

    #[tokio::test]
    async fn test_insert_duplicate_is_conflict() {
        let backend = MemoryTableBackend::new();
        backend.create_table("t").await.unwrap();
        backend.insert_row("t", &row("p", "r")).await.unwrap();

        let result = backend.insert_row("t", &row("p", "r")).await;
        assert!(matches!(result, Err(LedgerError::EntityExists { .. })));
    }

    #[tokio::test]
    async fn test_replace_missing_row() {
        let backend = MemoryTableBackend::new();
        backend.create_table("t").await.unwrap();
        let result = backend.replace_row("t", &row("p", "r")).await;
        assert!(matches!(result, Err(LedgerError::EntityNotFound { .. })));
    }

    #[tokio::test]
    async fn test_delete_removes_row() {
        let backend = MemoryTableBackend::new();
        backend.create_table("t").await.unwrap();
        backend.insert_row("t", &row("p", "r")).await.unwrap();
        backend.delete_row("t", "p", "r").await.unwrap();
        assert_eq!(backend.row_count("t").await, 0);
    }
}
