//! 配置管理模塊
//!
//! 負責加載和驗證運行配置與 ingest 批次描述檔

use crate::error::{Result, ValidatorError};
use crate::types::{BatchDescriptor, ValidatorConfig};
use config::{Config, File};
use std::path::Path;

/// 從配置文件加載驗證節點配置
///
/// # 參數
/// - `config_path`: 配置文件路徑（支持 JSON、TOML、YAML）
///
/// # 返回
/// - `Ok(ValidatorConfig)`: 成功加載的配置
/// - `Err(ValidatorError)`: 配置文件格式錯誤或缺少必要字段
pub fn load_config<P: AsRef<Path>>(config_path: P) -> Result<ValidatorConfig> {
    let config = Config::builder()
        .add_source(File::from(config_path.as_ref()))
        .build()
        .map_err(|e| ValidatorError::Config(format!("Failed to load config file: {}", e)))?;

    let validator_config: ValidatorConfig = config
        .try_deserialize()
        .map_err(|e| ValidatorError::Config(format!("Failed to parse config: {}", e)))?;

    validate_config(&validator_config)?;

    Ok(validator_config)
}

/// 從環境變量加載配置（用於容器化部署）
///
/// 環境變量前綴: `VALIDATOR_`
/// 示例: `VALIDATOR_HISTORY_STORAGE__ACCOUNT`
pub fn load_config_from_env() -> Result<ValidatorConfig> {
    let config = Config::builder()
        .add_source(config::Environment::with_prefix("VALIDATOR").separator("__"))
        .build()
        .map_err(|e| ValidatorError::Config(format!("Failed to load env vars: {}", e)))?;

    let validator_config: ValidatorConfig = config
        .try_deserialize()
        .map_err(|e| ValidatorError::Config(format!("Failed to parse env config: {}", e)))?;

    validate_config(&validator_config)?;

    Ok(validator_config)
}

/// 驗證配置的有效性
///
/// 檢查:
/// - industry 白名單非空
/// - 帳本存儲描述完整（帳戶/訂閱/表名）
pub fn validate_config(config: &ValidatorConfig) -> Result<()> {
    if config.industries.is_empty() {
        return Err(ValidatorError::Config(
            "industries allow-list must not be empty".to_string(),
        ));
    }

    if config.history_storage.account.is_empty() {
        return Err(ValidatorError::Config(
            "history_storage.account is required".to_string(),
        ));
    }

    if config.history_storage.subscription.is_empty() {
        return Err(ValidatorError::Config(
            "history_storage.subscription is required".to_string(),
        ));
    }

    if config.history_storage.table.is_empty() {
        return Err(ValidatorError::Config(
            "history_storage.table is required".to_string(),
        ));
    }

    Ok(())
}

/// 加載 ingest 批次描述檔並檢查必要字段
///
/// 任何缺失/空白的必要字段都是致命的前置條件錯誤，
/// 在任何帳本訪問之前報告
pub fn load_batch<P: AsRef<Path>>(settings_path: P) -> Result<BatchDescriptor> {
    let raw = std::fs::read_to_string(settings_path.as_ref()).map_err(|e| {
        ValidatorError::Precondition(format!(
            "settings file {} unreadable: {}",
            settings_path.as_ref().display(),
            e
        ))
    })?;

    let batch: BatchDescriptor = serde_json::from_str(&raw)
        .map_err(|e| ValidatorError::Precondition(format!("settings are incorrect: {}", e)))?;

    if batch.industry.is_empty()
        || batch.account.is_empty()
        || batch.subscription.is_empty()
        || batch.blobs.is_empty()
    {
        return Err(ValidatorError::Precondition(
            "settings are incorrect: industry, account, subscription and blobs are all required"
                .to_string(),
        ));
    }

    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HistoryStorage;
    use std::io::Write;

    fn valid_config() -> ValidatorConfig {
        ValidatorConfig {
            industries: vec!["finance".to_string(), "retail".to_string()],
            history_storage: HistoryStorage {
                account: "acct1".to_string(),
                subscription: "sub1".to_string(),
                table: "blobvalidation".to_string(),
            },
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_empty_industries_rejected() {
        let mut config = valid_config();
        config.industries.clear();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_incomplete_history_storage_rejected() {
        let mut config = valid_config();
        config.history_storage.account.clear();
        assert!(validate_config(&config).is_err());

        let mut config = valid_config();
        config.history_storage.table.clear();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_load_config_from_json_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{
                "industries": ["finance"],
                "history_storage": {{
                    "account": "acct1",
                    "subscription": "sub1",
                    "table": "blobvalidation"
                }}
            }}"#
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.industries, vec!["finance"]);
        assert_eq!(config.history_storage.table, "blobvalidation");
    }

    #[test]
    fn test_load_batch_requires_all_fields() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{"industry": "finance", "account": "", "subscription": "sub1", "blobs": ["c/a.txt"]}}"#
        )
        .unwrap();

        let result = load_batch(file.path());
        assert!(matches!(result, Err(ValidatorError::Precondition(_))));
    }

    #[test]
    fn test_load_batch_valid() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{"industry": "finance", "account": "acct1", "subscription": "sub1", "blobs": ["container/a.txt", "container/b.txt"]}}"#
        )
        .unwrap();

        let batch = load_batch(file.path()).unwrap();
        assert_eq!(batch.blobs.len(), 2);
        assert_eq!(batch.industry, "finance");
    }

    #[test]
    fn test_missing_settings_file_is_precondition_error() {
        let result = load_batch("/nonexistent/settings.json");
        assert!(matches!(result, Err(ValidatorError::Precondition(_))));
    }
}
