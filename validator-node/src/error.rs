//! 驗證節點統一錯誤類型定義
//!
//! 本模塊定義了驗證節點運行過程中可能遇到的所有錯誤類型，
//! 使用 thiserror crate 提供良好的錯誤鏈和上下文信息。

use thiserror::Error;

/// 驗證節點錯誤類型
///
/// 涵蓋所有子系統的錯誤情況：
/// - 前置條件檢查（參數、industry 白名單、批次描述檔）
/// - 存儲帳戶憑證解析
/// - Blob 存儲交互
/// - 帳本表存儲
/// - 配置管理
#[derive(Error, Debug)]
pub enum ValidatorError {
    /// 前置條件錯誤
    ///
    /// 參數錯誤、不允許的 industry、缺失或無效的批次描述檔。
    /// 在任何帳本/存儲訪問之前報告，進程以非零狀態退出
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// 憑證解析錯誤
    ///
    /// 當無法取得存儲帳戶密鑰時返回此錯誤
    /// （帳戶/訂閱無效，或調用者缺少權限）
    #[error("Credential resolution failed: {0}")]
    CredentialResolution(String),

    /// Blob 存儲錯誤
    ///
    /// Blob 屬性請求的硬失敗（「未找到」不屬於此類，
    /// 由 HashOutcome::NotFound 表示）
    #[error("Blob storage error: {0}")]
    BlobStorage(String),

    /// 帳本存儲錯誤
    #[error("Ledger error: {0}")]
    Ledger(#[from] table_ledger::LedgerError),

    /// 配置錯誤
    ///
    /// 當配置文件格式錯誤或缺少必要參數時返回此錯誤
    #[error("Configuration error: {0}")]
    Config(String),

    /// 序列化/反序列化錯誤
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// HTTP 請求錯誤
    #[error("HTTP request error: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// I/O 錯誤
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// 通用錯誤
    ///
    /// 用於包裝其他未分類的錯誤
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result 類型別名
///
/// 使用統一的錯誤類型簡化函數簽名
pub type Result<T> = std::result::Result<T, ValidatorError>;

/// 從 JSON 錯誤轉換
impl From<serde_json::Error> for ValidatorError {
    fn from(err: serde_json::Error) -> Self {
        ValidatorError::Serialization(err.to_string())
    }
}
