//! 共享數據類型定義
//!
//! 本模塊定義驗證節點中各個子系統共享的數據結構

use serde::{Deserialize, Serialize};
use table_ledger::ValidationEntry;

/// 帳本存儲位置
///
/// 保存驗證記錄的表存儲的帳戶/訂閱/表名
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryStorage {
    /// 存儲帳戶名
    pub account: String,

    /// Azure 訂閱（帳戶密鑰解析用）
    pub subscription: String,

    /// 驗證記錄表名
    pub table: String,
}

/// 驗證節點運行時配置
///
/// 啟動時加載一次，整個運行期間不可變
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorConfig {
    /// Industry 白名單
    ///
    /// validate/rebase 的 industry 參數與 ingest 批次的 industry
    /// 都必須出現在此列表中
    pub industries: Vec<String>,

    /// 帳本存儲位置
    pub history_storage: HistoryStorage,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            industries: std::env::var("ALLOWED_INDUSTRIES")
                .map(|s| {
                    s.split(',')
                        .map(|i| i.trim().to_string())
                        .filter(|i| !i.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            history_storage: HistoryStorage {
                account: std::env::var("HISTORY_STORAGE_ACCOUNT").unwrap_or_default(),
                subscription: std::env::var("HISTORY_STORAGE_SUBSCRIPTION").unwrap_or_default(),
                table: std::env::var("HISTORY_STORAGE_TABLE")
                    .unwrap_or_else(|_| "blobvalidation".to_string()),
            },
        }
    }
}

/// 批次描述檔（ingest 輸入）
///
/// 一個批次包含單一 industry/帳戶/訂閱下的一組 Blob 路徑
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchDescriptor {
    /// 目標 industry（必須在白名單中）
    #[serde(default)]
    pub industry: String,

    /// 存儲帳戶名
    #[serde(default)]
    pub account: String,

    /// Azure 訂閱
    #[serde(default)]
    pub subscription: String,

    /// Blob 路徑序列（有序）
    #[serde(default)]
    pub blobs: Vec<String>,
}

/// 單個條目的驗證結果（臨時派生值，不持久化）
#[derive(Debug, Clone)]
pub struct ValidationResult {
    /// 被驗證的帳本條目
    pub entry: ValidationEntry,

    /// 剛解析出的當前哈希（無法解析時為 None）
    pub current_hash: Option<String>,

    /// current_hash == entry.md5
    pub validated: bool,
}

/// Rebase 單個條目的處理結果
#[derive(Debug, Clone)]
pub struct RebaseOutcome {
    /// Blob 路徑
    pub blob: String,

    /// 是否重寫了記錄（哈希未變時為 false）
    pub updated: bool,
}

/// Ingest 對單個 Blob 採取的動作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestAction {
    /// 不存在匹配條目，創建了新記錄
    Created,
    /// 條目已存在且哈希不同，就地更新
    Rebased,
    /// 條目已存在且哈希相同，未寫入
    Unchanged,
}

/// Ingest 單個 Blob 的處理結果
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    /// Blob 路徑
    pub blob: String,

    /// 採取的動作
    pub action: IngestAction,
}
