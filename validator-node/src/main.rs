//! Blob Validation Node Main Program
//!
//! Implements the complete validation workflow:
//! 1. Parse the operation mode (ingest / validate / rebase)
//! 2. Load configuration and verify the Azure CLI login
//! 3. Resolve the ledger storage account and build the table store
//! 4. Dispatch to the reconciliation engine
//! 5. Print human-readable per-entry progress

use anyhow::{Context as _, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use table_ledger::azure::AzureTableBackend;
use table_ledger::LedgerStore;
use validator_node::blob::AzureBlobResolver;
use validator_node::types::{IngestAction, ValidatorConfig};
use validator_node::{azcli, config, Context};

/// Cloud Storage Blob Integrity Validator Node
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Import blobs to the validation table, --settings required
    #[arg(long, default_value_t = false)]
    ingest: bool,

    /// Validate recorded hashes for an industry, --industry required
    #[arg(long, default_value_t = false)]
    validate: bool,

    /// Rebase recorded hashes for an industry, --industry required
    #[arg(long, default_value_t = false)]
    rebase: bool,

    /// Industry filter, required for --validate and --rebase
    #[arg(long)]
    industry: Option<String>,

    /// Batch descriptor file (JSON), required for --ingest
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long, default_value = "configuration.json")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// The single operation mode a run executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Ingest,
    Validate,
    Rebase,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 1. Initialize logging
    init_logging(&args.log_level)?;

    info!("🚀 Starting Blob Validator Node v{}", env!("CARGO_PKG_VERSION"));
    info!("──────────────────────────────────────────────");

    // 2. Resolve the operation mode (exactly one)
    let mode = match resolve_mode(&args) {
        Ok(mode) => mode,
        Err(message) => {
            error!("❌ {}", message);
            error!("   Use exactly one of --ingest, --validate, --rebase");
            std::process::exit(1);
        }
    };

    // 3. Load and validate configuration
    let run_config = load_configuration(&args.config)?;
    config::validate_config(&run_config).context("Configuration is incomplete")?;

    info!("🔍 Validating configuration...");
    info!("   - Industries: {}", run_config.industries.join(", "));
    info!(
        "   - Ledger: table '{}' in account '{}'",
        run_config.history_storage.table, run_config.history_storage.account
    );

    // 4. Verify login; the signed-in user becomes the write actor
    let actor = azcli::current_actor()
        .await
        .context("Azure CLI login validation failed")?;
    info!("✅ Logged in as {}", actor);

    // 5. Resolve the ledger storage account and build the engine
    let ledger_account = azcli::resolve_storage_account(
        &run_config.history_storage.account,
        &run_config.history_storage.subscription,
    )
    .await
    .context("Failed to resolve the ledger storage account")?;

    let backend = AzureTableBackend::new(&ledger_account.name, ledger_account.primary_key())
        .context("Failed to build the table backend")?;
    let engine = Context::new(
        run_config,
        actor,
        LedgerStore::new(backend),
        AzureBlobResolver::new(),
    );

    // 6. Run the requested operation
    match mode {
        Mode::Validate => run_validate(&engine, &args).await?,
        Mode::Rebase => run_rebase(&engine, &args).await?,
        Mode::Ingest => run_ingest(&engine, &args).await?,
    }

    info!("\n✅ All tasks complete!");
    Ok(())
}

/// Initialize logging system
fn init_logging(log_level: &str) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => {
            eprintln!("⚠️  Unknown log level: {}, using INFO", log_level);
            tracing::Level::INFO
        }
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    Ok(())
}

/// Exactly one mode flag must be set; mode-specific arguments must be
/// present. Checked before any work begins.
fn resolve_mode(args: &Args) -> std::result::Result<Mode, String> {
    let count = [args.ingest, args.validate, args.rebase]
        .iter()
        .filter(|&&flag| flag)
        .count();
    if count != 1 {
        return Err("You must identify one: --ingest, --validate, --rebase".to_string());
    }

    if (args.validate || args.rebase) && args.industry.is_none() {
        return Err("--industry required for --validate and --rebase".to_string());
    }

    if args.ingest {
        match &args.settings {
            None => return Err("--settings required for --ingest".to_string()),
            Some(path) if !path.exists() => {
                return Err(format!(
                    "--settings does not point to a valid file: {}",
                    path.display()
                ));
            }
            Some(_) => {}
        }
    }

    Ok(if args.ingest {
        Mode::Ingest
    } else if args.validate {
        Mode::Validate
    } else {
        Mode::Rebase
    })
}

/// Load configuration file
fn load_configuration(config_path: &Path) -> Result<ValidatorConfig> {
    info!("📋 Loading configuration: {}", config_path.display());

    if !config_path.exists() {
        warn!("Configuration file does not exist, using defaults");
        return Ok(ValidatorConfig::default());
    }

    config::load_config(config_path).context("Failed to load configuration")
}

async fn run_validate(
    engine: &Context<AzureTableBackend, AzureBlobResolver>,
    args: &Args,
) -> Result<()> {
    // resolve_mode guarantees the industry argument
    let industry = args.industry.as_deref().unwrap_or_default();

    info!("──────────────────────────────────────────────");
    info!("📊 Validating current hashes for industry {}", industry);
    info!("──────────────────────────────────────────────\n");

    let results = engine.validate(industry).await?;

    let valid = results.iter().filter(|r| r.validated).count();
    info!(
        "\n   Validation finished: {}/{} entries valid",
        valid,
        results.len()
    );
    Ok(())
}

async fn run_rebase(
    engine: &Context<AzureTableBackend, AzureBlobResolver>,
    args: &Args,
) -> Result<()> {
    let industry = args.industry.as_deref().unwrap_or_default();

    info!("──────────────────────────────────────────────");
    info!("🔄 Rebasing hashes for industry {}", industry);
    info!("──────────────────────────────────────────────\n");

    let outcomes = engine.rebase(industry).await?;

    let updated = outcomes.iter().filter(|o| o.updated).count();
    info!(
        "\n   Rebase finished: {} updated, {} unchanged",
        updated,
        outcomes.len() - updated
    );
    Ok(())
}

async fn run_ingest(
    engine: &Context<AzureTableBackend, AzureBlobResolver>,
    args: &Args,
) -> Result<()> {
    // resolve_mode guarantees the settings argument
    let settings = args
        .settings
        .as_deref()
        .context("--settings required for --ingest")?;

    info!("──────────────────────────────────────────────");
    info!("📥 Ingesting {}", settings.display());
    info!("──────────────────────────────────────────────\n");

    let batch = config::load_batch(settings)?;
    let outcomes = engine.ingest(&batch).await?;

    let created = outcomes
        .iter()
        .filter(|o| o.action == IngestAction::Created)
        .count();
    let rebased = outcomes
        .iter()
        .filter(|o| o.action == IngestAction::Rebased)
        .count();
    info!(
        "\n   Ingest finished: {} created, {} updated, {} unchanged",
        created,
        rebased,
        outcomes.len() - created - rebased
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(ingest: bool, validate: bool, rebase: bool) -> Args {
        Args {
            ingest,
            validate,
            rebase,
            industry: None,
            settings: None,
            config: PathBuf::from("configuration.json"),
            log_level: "info".to_string(),
        }
    }

    #[test]
    fn test_exactly_one_mode_required() {
        assert!(resolve_mode(&args(false, false, false)).is_err());
        assert!(resolve_mode(&args(true, true, false)).is_err());
    }

    #[test]
    fn test_validate_requires_industry() {
        let mut a = args(false, true, false);
        assert!(resolve_mode(&a).is_err());

        a.industry = Some("finance".to_string());
        assert_eq!(resolve_mode(&a).unwrap(), Mode::Validate);
    }

    #[test]
    fn test_ingest_requires_existing_settings() {
        let mut a = args(true, false, false);
        assert!(resolve_mode(&a).is_err());

        a.settings = Some(PathBuf::from("/nonexistent/settings.json"));
        assert!(resolve_mode(&a).is_err());

        let file = tempfile::NamedTempFile::new().unwrap();
        a.settings = Some(file.path().to_path_buf());
        assert_eq!(resolve_mode(&a).unwrap(), Mode::Ingest);
    }
}
