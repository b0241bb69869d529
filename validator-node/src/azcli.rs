//! Azure CLI 調用模塊
//!
//! 通過外部 `az` 進程解析存儲帳戶密鑰與登錄身份。
//! 兩個調用都是一次性嘗試，無重試。

use crate::error::{Result, ValidatorError};
use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

/// Resolved storage account: name plus its access keys.
#[derive(Debug, Clone)]
pub struct StorageAccount {
    pub name: String,
    pub keys: Vec<String>,
    pub subscription: String,
}

impl StorageAccount {
    /// Primary access key.
    pub fn primary_key(&self) -> &str {
        // resolve_storage_account guarantees at least one key
        &self.keys[0]
    }
}

/// One element of `az storage account keys list` output.
#[derive(Deserialize)]
struct KeyEntry {
    value: String,
}

/// `az account show` output (the part we read).
#[derive(Deserialize)]
struct AccountShow {
    user: AccountUser,
}

#[derive(Deserialize)]
struct AccountUser {
    name: String,
}

/// Resolve a storage account's access keys via the Azure CLI.
///
/// Fails with `CredentialResolution` if the account/subscription pair is
/// invalid or the caller lacks permission. Fatal for this account; not
/// retried.
pub async fn resolve_storage_account(account: &str, subscription: &str) -> Result<StorageAccount> {
    debug!(
        "Resolving keys for storage account {} (subscription {})",
        account, subscription
    );

    let stdout = run_az(&[
        "storage",
        "account",
        "keys",
        "list",
        "--account-name",
        account,
        "--subscription",
        subscription,
        "--output",
        "json",
    ])
    .await
    .map_err(|e| ValidatorError::CredentialResolution(format!("{}: {}", account, e)))?;

    let entries: Vec<KeyEntry> = serde_json::from_str(&stdout).map_err(|e| {
        ValidatorError::CredentialResolution(format!(
            "{}: unexpected az output - {}",
            account, e
        ))
    })?;

    if entries.is_empty() {
        return Err(ValidatorError::CredentialResolution(format!(
            "{}: no access keys returned",
            account
        )));
    }

    Ok(StorageAccount {
        name: account.to_string(),
        keys: entries.into_iter().map(|k| k.value).collect(),
        subscription: subscription.to_string(),
    })
}

/// Identity of the signed-in CLI user, used as the `actor` on writes.
///
/// A missing login is a fatal precondition error: nothing else can work
/// without it.
pub async fn current_actor() -> Result<String> {
    let stdout = run_az(&["account", "show", "--output", "json"])
        .await
        .map_err(|e| {
            ValidatorError::Precondition(format!("not logged in to the Azure CLI: {}", e))
        })?;

    let account: AccountShow = serde_json::from_str(&stdout).map_err(|e| {
        ValidatorError::Precondition(format!("unexpected `az account show` output: {}", e))
    })?;

    Ok(account.user.name)
}

/// Run `az` with the given arguments and return stdout on success.
async fn run_az(args: &[&str]) -> std::result::Result<String, String> {
    let output = Command::new("az")
        .args(args)
        .output()
        .await
        .map_err(|e| format!("failed to spawn az: {}", e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!(
            "az exited with {}: {}",
            output.status,
            stderr.trim()
        ));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
