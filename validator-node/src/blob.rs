//! Blob 哈希解析模塊
//!
//! 負責取得單個 Blob 當前的內容哈希:
//! - 通過 Azure CLI 解析存儲帳戶密鑰
//! - 對 Blob 發送簽名的 HEAD 請求，讀取 Content-MD5 屬性
//!
//! # 失敗語義
//!
//! - 憑證解析失敗: 硬錯誤（該帳戶致命）
//! - 容器/Blob 不存在: `HashOutcome::NotFound`（每 Blob 軟失敗，
//!   調用方必須繼續處理批次中的下一個條目）
//! - 其他 HTTP 失敗: 硬錯誤

use crate::azcli;
use crate::error::{Result, ValidatorError};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::{Client, StatusCode};
use sha2::Sha256;
use std::time::Duration;
use tracing::{debug, warn};

type HmacSha256 = Hmac<Sha256>;

/// 默認超時（秒）
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Blob 服務 API 版本
const API_VERSION: &str = "2019-02-02";

/// Outcome of a hash lookup.
///
/// "Not found" is a sentinel, not an error: a missing blob must not
/// abort batch processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HashOutcome {
    /// The blob's Content-MD5 property, base64-encoded.
    Resolved(String),
    /// Container or blob does not exist, or no MD5 property is stored.
    NotFound,
}

/// Hash resolver trait
///
/// Seam between the reconciliation engine and blob storage; the engine
/// tests substitute a scripted implementation.
#[async_trait]
pub trait HashResolver: Send + Sync {
    /// Resolve the current content hash of `blob_path` in the given
    /// account/subscription.
    async fn resolve(
        &self,
        account: &str,
        subscription: &str,
        blob_path: &str,
    ) -> Result<HashOutcome>;
}

/// Azure Blob storage resolver
///
/// One HEAD request per lookup; credentials are resolved per call and
/// not cached or pooled across operations.
pub struct AzureBlobResolver {
    http_client: Client,
}

impl AzureBlobResolver {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT_SECS)
    }

    pub fn with_timeout(timeout_secs: u64) -> Self {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to build HTTP client");

        Self { http_client }
    }

    /// HEAD the blob and read its Content-MD5 header.
    async fn fetch_content_md5(
        &self,
        account: &str,
        key: &[u8],
        container: &str,
        object: &str,
    ) -> Result<HashOutcome> {
        let url = format!(
            "https://{}.blob.core.windows.net/{}/{}",
            account, container, object
        );

        let date = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        let string_to_sign = blob_string_to_sign(&date, account, container, object);

        // HMAC accepts any key length
        let mut mac = HmacSha256::new_from_slice(key).expect("HMAC key length");
        mac.update(string_to_sign.as_bytes());
        let signature = general_purpose::STANDARD.encode(mac.finalize().into_bytes());

        let response = self
            .http_client
            .head(&url)
            .header(
                "Authorization",
                format!("SharedKeyLite {}:{}", account, signature),
            )
            .header("x-ms-date", date)
            .header("x-ms-version", API_VERSION)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ValidatorError::BlobStorage(format!("{}: request timeout", url))
                } else {
                    ValidatorError::BlobStorage(format!("{}: {}", url, e))
                }
            })?;

        match response.status() {
            StatusCode::OK => match response.headers().get("Content-MD5") {
                Some(md5) => {
                    let hash = md5
                        .to_str()
                        .map_err(|e| {
                            ValidatorError::BlobStorage(format!("invalid Content-MD5 header: {}", e))
                        })?
                        .to_string();
                    debug!("Resolved hash for {}/{}: {}", container, object, hash);
                    Ok(HashOutcome::Resolved(hash))
                }
                None => {
                    // Blob exists but carries no MD5 property
                    warn!("Blob {}/{} has no Content-MD5 property", container, object);
                    Ok(HashOutcome::NotFound)
                }
            },
            StatusCode::NOT_FOUND => {
                debug!("Blob {}/{} not found in account {}", container, object, account);
                Ok(HashOutcome::NotFound)
            }
            status => Err(ValidatorError::BlobStorage(format!(
                "HEAD {}: HTTP {} {}",
                url,
                status,
                status.canonical_reason().unwrap_or("Unknown")
            ))),
        }
    }
}

impl Default for AzureBlobResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HashResolver for AzureBlobResolver {
    async fn resolve(
        &self,
        account: &str,
        subscription: &str,
        blob_path: &str,
    ) -> Result<HashOutcome> {
        let storage_account = azcli::resolve_storage_account(account, subscription).await?;

        let key = general_purpose::STANDARD
            .decode(storage_account.primary_key())
            .map_err(|e| {
                ValidatorError::CredentialResolution(format!("{}: invalid account key: {}", account, e))
            })?;

        let (container, object) = parse_blob_parts(blob_path);
        self.fetch_content_md5(account, &key, &container, &object)
            .await
    }
}

/// SharedKeyLite string-to-sign for a HEAD request against blob storage.
fn blob_string_to_sign(date: &str, account: &str, container: &str, object: &str) -> String {
    format!(
        "HEAD\n\n\n\nx-ms-date:{}\nx-ms-version:{}\n/{}/{}/{}",
        date, API_VERSION, account, container, object
    )
}

/// Split a blob path into `(container, object)`.
///
/// Backslash separators are normalized to `/` and a leading separator is
/// stripped; the first segment is the container, the joined remainder is
/// the object path (possibly empty).
pub fn parse_blob_parts(blob_path: &str) -> (String, String) {
    let normalized = blob_path.replace('\\', "/");
    let trimmed = normalized.strip_prefix('/').unwrap_or(&normalized);

    match trimmed.split_once('/') {
        Some((container, object)) => (container.to_string(), object.to_string()),
        None => (trimmed.to_string(), String::new()),
    }
}
