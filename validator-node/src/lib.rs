//! 雲存儲 Blob 完整性驗證節點
//!
//! 本 crate 實現了一個完整的驗證節點，負責:
//! 1. 將 Blob 及其內容哈希登記到持久化帳本（ingest）
//! 2. 對照帳本重新檢查當前哈希（validate，只讀）
//! 3. 哈希變更時更新記錄並追加審計歷史（rebase）
//!
//! # 架構
//!
//! ```text
//! ┌──────────────┐
//! │   Context    │  ← 核心對帳邏輯
//! └──────┬───────┘
//!        │
//!   ┌────┴────┬──────────┬──────────┐
//!   ▼         ▼          ▼          ▼
//! Ledger   Blob Hash   AzCli     Config
//! Store    Resolver    (keys,
//! (table-             actor)
//!  ledger)
//! ```
//!
//! # 示例用法
//!
//! ```no_run
//! use table_ledger::{memory::MemoryTableBackend, LedgerStore};
//! use validator_node::blob::AzureBlobResolver;
//! use validator_node::config::load_config;
//! use validator_node::context::Context;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("configuration.json")?;
//!     let ledger = LedgerStore::new(MemoryTableBackend::new());
//!     let resolver = AzureBlobResolver::new();
//!
//!     let context = Context::new(config, "actor@example.com".to_string(), ledger, resolver);
//!     let results = context.validate("finance").await?;
//!     println!("Validated {} entries", results.len());
//!
//!     Ok(())
//! }
//! ```

// 公開模塊
pub mod azcli;
pub mod blob;
pub mod config;
pub mod context;
pub mod error;
pub mod types;

// Re-export 常用類型
pub use context::Context;
pub use error::{Result, ValidatorError};
pub use types::{BatchDescriptor, ValidationResult, ValidatorConfig};
