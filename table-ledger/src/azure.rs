//! Azure Table storage backend
//!
//! Talks to the Azure Table service REST API directly:
//! - `GET /{table}()` - list entities (with continuation tokens)
//! - `POST /{table}` - insert entity
//! - `PUT /{table}(PartitionKey='..',RowKey='..')` - replace entity
//! - `DELETE /{table}(PartitionKey='..',RowKey='..')` - delete entity
//! - `POST /Tables` - create table
//!
//! Requests are authenticated with SharedKeyLite signatures:
//! `HMAC-SHA256(key, "{x-ms-date}\n{canonicalized resource}")` where the
//! key is the base64-decoded storage account key.
//!
//! Every call is attempt-once. A client is cheap to construct and holds
//! no connection state beyond reqwest's pool.

use crate::entry::EntityRow;
use crate::error::{LedgerError, Result};
use crate::traits::TableBackend;
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::{header::HeaderMap, Client, Response, StatusCode};
use serde::Deserialize;
use sha2::Sha256;
use std::time::Duration;
use tracing::{debug, info};

type HmacSha256 = Hmac<Sha256>;

/// Default request timeout (seconds)
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Table service API version
const API_VERSION: &str = "2019-02-02";

/// Entity listing response body (`odata=nometadata`)
#[derive(Deserialize)]
struct QueryResponse {
    value: Vec<EntityRow>,
}

/// Azure Table service client
///
/// One instance per storage account; tables are addressed per call.
pub struct AzureTableBackend {
    http_client: Client,
    account: String,
    /// Decoded storage account key (HMAC signing key)
    key: Vec<u8>,
    base_url: String,
}

impl AzureTableBackend {
    /// Create a client for a storage account.
    ///
    /// `account_key` is the base64 key as returned by
    /// `az storage account keys list`.
    pub fn new(account: &str, account_key: &str) -> Result<Self> {
        Self::with_config(
            account,
            account_key,
            format!("https://{}.table.core.windows.net", account),
            DEFAULT_TIMEOUT_SECS,
        )
    }

    /// Create a client with a custom endpoint and timeout (emulator,
    /// sovereign clouds).
    pub fn with_config(
        account: &str,
        account_key: &str,
        base_url: String,
        timeout_secs: u64,
    ) -> Result<Self> {
        let key = general_purpose::STANDARD
            .decode(account_key)
            .map_err(|e| LedgerError::InvalidKey(format!("{}: {}", account, e)))?;

        let http_client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to build HTTP client");

        debug!("Created AzureTableBackend for account {}", account);

        Ok(Self {
            http_client,
            account: account.to_string(),
            key,
            base_url,
        })
    }

    /// Storage account name this client is bound to.
    pub fn account(&self) -> &str {
        &self.account
    }

    /// Build the signed header set for one request.
    ///
    /// `resource` is the canonicalized resource, e.g. `/acct/Tables` or
    /// `/acct/mytable()`.
    fn signed_headers(&self, resource: &str) -> HeaderMap {
        let date = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        let string_to_sign = format!("{}\n{}", date, resource);

        // HMAC accepts any key length
        let mut mac = HmacSha256::new_from_slice(&self.key).expect("HMAC key length");
        mac.update(string_to_sign.as_bytes());
        let signature = general_purpose::STANDARD.encode(mac.finalize().into_bytes());

        let mut headers = HeaderMap::new();
        let auth = format!("SharedKeyLite {}:{}", self.account, signature);
        headers.insert("Authorization", auth.parse().expect("valid header"));
        headers.insert("x-ms-date", date.parse().expect("valid header"));
        headers.insert("x-ms-version", API_VERSION.parse().expect("valid header"));
        headers.insert(
            "Accept",
            "application/json;odata=nometadata".parse().expect("valid header"),
        );
        headers.insert("DataServiceVersion", "3.0;NetFx".parse().expect("valid header"));
        headers
    }

    fn map_transport_error(&self, e: reqwest::Error) -> LedgerError {
        if e.is_timeout() {
            LedgerError::Unreachable(format!("{}: request timeout", self.base_url))
        } else if e.is_connect() {
            LedgerError::Unreachable(format!("{}: connection failed - {}", self.base_url, e))
        } else {
            LedgerError::Unreachable(format!("{}: {}", self.base_url, e))
        }
    }

    async fn unexpected_status(&self, context: &str, response: Response) -> LedgerError {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read error body".to_string());
        LedgerError::Service(format!(
            "{}: HTTP {} {} - {}",
            context,
            status,
            status.canonical_reason().unwrap_or("Unknown"),
            body
        ))
    }

    /// Resource path for a single entity, with OData key escaping.
    fn entity_path(table: &str, partition_key: &str, row_key: &str) -> String {
        format!(
            "{}(PartitionKey='{}',RowKey='{}')",
            table,
            escape_odata_key(partition_key),
            escape_odata_key(row_key)
        )
    }
}

#[async_trait]
impl TableBackend for AzureTableBackend {
    async fn create_table(&self, table: &str) -> Result<()> {
        let url = format!("{}/Tables", self.base_url);
        let resource = format!("/{}/Tables", self.account);

        let response = self
            .http_client
            .post(&url)
            .headers(self.signed_headers(&resource))
            .header("Prefer", "return-no-content")
            .json(&serde_json::json!({ "TableName": table }))
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        match response.status() {
            StatusCode::CREATED | StatusCode::NO_CONTENT => {
                info!("Created table {}", table);
                Ok(())
            }
            // Idempotent: an existing table is success
            StatusCode::CONFLICT => {
                debug!("Table {} already exists", table);
                Ok(())
            }
            _ => Err(self.unexpected_status("create table", response).await),
        }
    }

    async fn list_rows(&self, table: &str) -> Result<Vec<EntityRow>> {
        let url = format!("{}/{}()", self.base_url, table);
        let resource = format!("/{}/{}()", self.account, table);

        let mut rows = Vec::new();
        let mut continuation: Option<(String, String)> = None;

        // The service pages at 1000 entities; follow continuation tokens
        loop {
            let mut request = self
                .http_client
                .get(&url)
                .headers(self.signed_headers(&resource));

            if let Some((next_pk, next_rk)) = &continuation {
                request = request.query(&[
                    ("NextPartitionKey", next_pk.as_str()),
                    ("NextRowKey", next_rk.as_str()),
                ]);
            }

            let response = request
                .send()
                .await
                .map_err(|e| self.map_transport_error(e))?;

            match response.status() {
                StatusCode::OK => {
                    continuation = next_page_token(response.headers());

                    let page: QueryResponse = response.json().await.map_err(|e| {
                        LedgerError::Serialization(format!(
                            "failed to parse entity listing: {}",
                            e
                        ))
                    })?;
                    rows.extend(page.value);

                    if continuation.is_none() {
                        break;
                    }
                }
                StatusCode::NOT_FOUND => {
                    return Err(LedgerError::TableNotFound(table.to_string()));
                }
                _ => return Err(self.unexpected_status("list entities", response).await),
            }
        }

        debug!("Listed {} rows from table {}", rows.len(), table);
        Ok(rows)
    }

    async fn insert_row(&self, table: &str, row: &EntityRow) -> Result<()> {
        let url = format!("{}/{}", self.base_url, table);
        let resource = format!("/{}/{}", self.account, table);

        let response = self
            .http_client
            .post(&url)
            .headers(self.signed_headers(&resource))
            .header("Prefer", "return-no-content")
            .json(row)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        match response.status() {
            StatusCode::CREATED | StatusCode::NO_CONTENT => Ok(()),
            StatusCode::CONFLICT => Err(LedgerError::EntityExists {
                partition_key: row.partition_key.clone(),
                row_key: row.row_key.clone(),
            }),
            StatusCode::NOT_FOUND => Err(LedgerError::TableNotFound(table.to_string())),
            _ => Err(self.unexpected_status("insert entity", response).await),
        }
    }

    async fn replace_row(&self, table: &str, row: &EntityRow) -> Result<()> {
        let path = Self::entity_path(table, &row.partition_key, &row.row_key);
        let url = format!("{}/{}", self.base_url, path);
        let resource = format!("/{}/{}", self.account, path);

        let response = self
            .http_client
            .put(&url)
            .headers(self.signed_headers(&resource))
            // Unconditional replace: last writer wins
            .header("If-Match", "*")
            .json(row)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        match response.status() {
            StatusCode::NO_CONTENT => Ok(()),
            StatusCode::NOT_FOUND => Err(LedgerError::EntityNotFound {
                partition_key: row.partition_key.clone(),
                row_key: row.row_key.clone(),
            }),
            _ => Err(self.unexpected_status("replace entity", response).await),
        }
    }

    async fn delete_row(&self, table: &str, partition_key: &str, row_key: &str) -> Result<()> {
        let path = Self::entity_path(table, partition_key, row_key);
        let url = format!("{}/{}", self.base_url, path);
        let resource = format!("/{}/{}", self.account, path);

        let response = self
            .http_client
            .delete(&url)
            .headers(self.signed_headers(&resource))
            .header("If-Match", "*")
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        match response.status() {
            StatusCode::NO_CONTENT => Ok(()),
            StatusCode::NOT_FOUND => Err(LedgerError::EntityNotFound {
                partition_key: partition_key.to_string(),
                row_key: row_key.to_string(),
            }),
            _ => Err(self.unexpected_status("delete entity", response).await),
        }
    }
}

/// Read the continuation token pair from a listing response, if present.
fn next_page_token(headers: &HeaderMap) -> Option<(String, String)> {
    let next_pk = headers
        .get("x-ms-continuation-NextPartitionKey")?
        .to_str()
        .ok()?
        .to_string();
    let next_rk = headers
        .get("x-ms-continuation-NextRowKey")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    Some((next_pk, next_rk))
}

/// Escape a key value for use inside an OData key predicate.
///
/// Single quotes are doubled per OData rules; everything outside the
/// URL-unreserved set is percent-encoded.
fn escape_odata_key(value: &str) -> String {
    let quoted = value.replace('\'', "''");
    let mut out = String::with_capacity(quoted.len());
    for byte in quoted.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' | b'\'' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}
