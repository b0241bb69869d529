//! Validation entry data model
//!
//! One `ValidationEntry` per tracked blob. The entry carries its table
//! identity (`PartitionKey` derived from the blob path, `RowKey` from the
//! creation timestamp), the last recorded content hash, and an
//! append-only history of activity records.
//!
//! The underlying table accepts only scalar string-like columns, so the
//! structured `history` field is JSON-encoded into a single column on
//! write and decoded back on read. Every other column maps one-to-one to
//! a plain string.

use crate::error::{LedgerError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Activity kind recorded in an entry's history log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activity {
    /// Entry was created during ingest.
    Create,
    /// Entry existed during ingest and its hash had changed.
    CreateRebase,
    /// Recorded hash was replaced during a rebase pass.
    Rebase,
}

impl fmt::Display for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Activity::Create => write!(f, "create"),
            Activity::CreateRebase => write!(f, "create_rebase"),
            Activity::Rebase => write!(f, "rebase"),
        }
    }
}

/// One record in the append-only history log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// UTC time the activity happened.
    pub timestamp: DateTime<Utc>,

    /// What happened.
    pub activity: Activity,

    /// Identity of the writer.
    pub actor: String,
}

/// Wire representation of one table row.
///
/// Field names match the table column names; `history` holds the
/// JSON-encoded history log. Non-key columns default to empty when a row
/// predates them (rows written before history tracking existed carry no
/// history column).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityRow {
    #[serde(rename = "PartitionKey")]
    pub partition_key: String,

    #[serde(rename = "RowKey")]
    pub row_key: String,

    #[serde(default)]
    pub industry: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub md5: Option<String>,

    #[serde(default)]
    pub account: String,

    #[serde(default)]
    pub subscription: String,

    #[serde(default)]
    pub blob: String,

    #[serde(default)]
    pub actor: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub history: String,
}

/// One tracked blob: identity, last recorded hash, and audit history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationEntry {
    /// Derived once from the blob path at creation, never recomputed.
    pub partition_key: String,

    /// Creation timestamp (ISO-8601). Immutable after creation.
    pub row_key: String,

    pub industry: String,

    /// Last recorded content hash (base64 MD5), absent if the blob could
    /// not be resolved when the hash was recorded.
    pub md5: Option<String>,

    pub account: String,
    pub subscription: String,

    /// Blob path as ingested, e.g. `container/dir/file.csv`.
    pub blob: String,

    /// Identity of the last writer.
    pub actor: String,

    /// Append-only activity log, insertion order significant.
    pub history: Vec<HistoryRecord>,
}

impl ValidationEntry {
    /// Create a fresh entry for a blob path.
    ///
    /// `PartitionKey` is the blob path with `/` replaced by `_`;
    /// `RowKey` is the creation timestamp.
    pub fn new(blob: &str) -> Self {
        Self {
            partition_key: derive_partition_key(blob),
            row_key: Utc::now().to_rfc3339(),
            industry: String::new(),
            md5: None,
            account: String::new(),
            subscription: String::new(),
            blob: blob.to_string(),
            actor: String::new(),
            history: Vec::new(),
        }
    }

    /// Append a history record stamped with the current UTC time.
    pub fn append_history(&mut self, activity: Activity, actor: &str) {
        self.history.push(HistoryRecord {
            timestamp: Utc::now(),
            activity,
            actor: actor.to_string(),
        });
    }

    /// Encode into the wire row, serializing `history` to JSON.
    pub fn to_row(&self) -> Result<EntityRow> {
        let history = if self.history.is_empty() {
            String::new()
        } else {
            serde_json::to_string(&self.history)?
        };

        Ok(EntityRow {
            partition_key: self.partition_key.clone(),
            row_key: self.row_key.clone(),
            industry: self.industry.clone(),
            md5: self.md5.clone(),
            account: self.account.clone(),
            subscription: self.subscription.clone(),
            blob: self.blob.clone(),
            actor: self.actor.clone(),
            history,
        })
    }

    /// Decode from a wire row, parsing the JSON history column.
    ///
    /// An empty history column decodes to an empty log.
    pub fn from_row(row: EntityRow) -> Result<Self> {
        let history: Vec<HistoryRecord> = if row.history.is_empty() {
            Vec::new()
        } else {
            serde_json::from_str(&row.history).map_err(|e| {
                LedgerError::Serialization(format!(
                    "invalid history column for RowKey '{}': {}",
                    row.row_key, e
                ))
            })?
        };

        Ok(Self {
            partition_key: row.partition_key,
            row_key: row.row_key,
            industry: row.industry,
            md5: row.md5,
            account: row.account,
            subscription: row.subscription,
            blob: row.blob,
            actor: row.actor,
            history,
        })
    }
}

/// Partition key derivation: slashes are not valid in table keys.
pub fn derive_partition_key(blob: &str) -> String {
    blob.replace('/', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_key_replaces_slashes() {
        assert_eq!(
            derive_partition_key("container/dir/file.csv"),
            "container_dir_file.csv"
        );
        assert_eq!(derive_partition_key("plain"), "plain");
    }

    #[test]
    fn test_new_entry_identity() {
        let entry = ValidationEntry::new("container/a.txt");
        assert_eq!(entry.partition_key, "container_a.txt");
        assert_eq!(entry.blob, "container/a.txt");
        assert!(!entry.row_key.is_empty());
        assert!(entry.history.is_empty());
        assert!(entry.md5.is_none());
    }

    #[test]
    fn test_history_survives_row_encoding() {
        let mut entry = ValidationEntry::new("c/a.txt");
        entry.industry = "finance".to_string();
        entry.md5 = Some("q1w2e3==".to_string());
        entry.append_history(Activity::Create, "user@example.com");
        entry.append_history(Activity::CreateRebase, "user@example.com");

        let row = entry.to_row().unwrap();
        let decoded = ValidationEntry::from_row(row).unwrap();

        assert_eq!(decoded.history.len(), 2);
        assert_eq!(decoded.history[0].activity, Activity::Create);
        assert_eq!(decoded.history[1].activity, Activity::CreateRebase);
        assert_eq!(decoded.md5.as_deref(), Some("q1w2e3=="));
    }

    #[test]
    fn test_decode_tolerates_missing_history() {
        // Rows written before history tracking carry no history column
        let json = r#"{"PartitionKey":"c_a.txt","RowKey":"2023-01-01T00:00:00Z","industry":"retail","account":"acct1","subscription":"sub1","blob":"c/a.txt","actor":"u"}"#;
        let row: EntityRow = serde_json::from_str(json).unwrap();
        let entry = ValidationEntry::from_row(row).unwrap();
        assert!(entry.history.is_empty());
        assert!(entry.md5.is_none());
    }

    #[test]
    fn test_invalid_history_column_is_an_error() {
        let row = EntityRow {
            partition_key: "p".to_string(),
            row_key: "r".to_string(),
            industry: "x".to_string(),
            md5: None,
            account: String::new(),
            subscription: String::new(),
            blob: String::new(),
            actor: String::new(),
            history: "{not json".to_string(),
        };
        assert!(ValidationEntry::from_row(row).is_err());
    }

    #[test]
    fn test_activity_wire_names() {
        assert_eq!(
            serde_json::to_string(&Activity::CreateRebase).unwrap(),
            "\"create_rebase\""
        );
        assert_eq!(Activity::Rebase.to_string(), "rebase");
    }
}
