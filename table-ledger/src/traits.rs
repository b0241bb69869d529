/// Unified interface over raw table CRUD
use crate::entry::EntityRow;
use crate::error::Result;
use async_trait::async_trait;

/// Table backend trait
///
/// Implemented by the Azure Table REST backend and the in-memory
/// backend. The `LedgerStore` layers entry decoding, the industry
/// filter, and upsert semantics on top of these primitives.
#[async_trait]
pub trait TableBackend: Send + Sync {
    /// Create a table. Creating a table that already exists is success.
    async fn create_table(&self, table: &str) -> Result<()>;

    /// List every row in a table.
    ///
    /// Fails with `LedgerError::TableNotFound` if the table does not
    /// exist. Row order is whatever the service returns.
    async fn list_rows(&self, table: &str) -> Result<Vec<EntityRow>>;

    /// Insert a row. Fails with `LedgerError::EntityExists` if a row
    /// with the same `(PartitionKey, RowKey)` is already present.
    async fn insert_row(&self, table: &str, row: &EntityRow) -> Result<()>;

    /// Replace an existing row in place (last writer wins).
    async fn replace_row(&self, table: &str, row: &EntityRow) -> Result<()>;

    /// Delete a row by its key pair.
    async fn delete_row(&self, table: &str, partition_key: &str, row_key: &str) -> Result<()>;
}
