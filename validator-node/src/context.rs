//! 核心對帳邏輯模塊

use crate::blob::{HashOutcome, HashResolver};
use crate::error::{Result, ValidatorError};
use crate::types::{
    BatchDescriptor, IngestAction, IngestOutcome, RebaseOutcome, ValidationResult, ValidatorConfig,
};
use table_ledger::{Activity, LedgerStore, TableBackend, ValidationEntry};
use tracing::{info, warn};

/// Reconciliation engine.
///
/// Explicitly constructed from configuration, the running identity, the
/// ledger store, and a hash resolver; holds no process-wide state.
/// Processing is strictly sequential: one entry/blob at a time.
pub struct Context<B: TableBackend, R: HashResolver> {
    config: ValidatorConfig,
    actor: String,
    ledger: LedgerStore<B>,
    resolver: R,
}

impl<B: TableBackend, R: HashResolver> Context<B, R> {
    pub fn new(config: ValidatorConfig, actor: String, ledger: LedgerStore<B>, resolver: R) -> Self {
        Self {
            config,
            actor,
            ledger,
            resolver,
        }
    }

    /// The ledger store this context writes to (test inspection).
    pub fn ledger(&self) -> &LedgerStore<B> {
        &self.ledger
    }

    fn table(&self) -> &str {
        &self.config.history_storage.table
    }

    /// Industry allow-list precondition, checked before any ledger
    /// access.
    fn ensure_industry(&self, industry: &str) -> Result<()> {
        if self.config.industries.iter().any(|i| i == industry) {
            return Ok(());
        }
        Err(ValidatorError::Precondition(format!(
            "industry '{}' is not allowed; acceptable industries are: {}",
            industry,
            self.config.industries.join(", ")
        )))
    }

    /// Compare every tracked blob in an industry against its recorded
    /// hash. Read-only: performs no ledger writes.
    ///
    /// A hash-resolution failure for one blob is reported as
    /// unresolved (`validated = false`) and never aborts the batch.
    pub async fn validate(&self, industry: &str) -> Result<Vec<ValidationResult>> {
        self.ensure_industry(industry)?;

        let entries = self.ledger.search_by_industry(self.table(), industry).await?;
        info!("Found {} records for {}", entries.len(), industry);

        let mut results = Vec::with_capacity(entries.len());
        for entry in entries {
            let current_hash = match self
                .resolver
                .resolve(&entry.account, &entry.subscription, &entry.blob)
                .await
            {
                Ok(HashOutcome::Resolved(hash)) => Some(hash),
                Ok(HashOutcome::NotFound) => None,
                Err(e) => {
                    warn!("Hash resolution failed for {}: {}", entry.blob, e);
                    None
                }
            };

            let validated = match &current_hash {
                Some(hash) => entry.md5.as_deref() == Some(hash.as_str()),
                // Unresolved is never validated
                None => false,
            };

            info!("Validation for {} = {}", entry.blob, validated);
            results.push(ValidationResult {
                entry,
                current_hash,
                validated,
            });
        }

        Ok(results)
    }

    /// Re-record the hash of every entry whose current hash differs,
    /// appending a `rebase` history record. Entries with an unchanged
    /// hash are left untouched: no write, no history record.
    pub async fn rebase(&self, industry: &str) -> Result<Vec<RebaseOutcome>> {
        self.ensure_industry(industry)?;

        let entries = self.ledger.search_by_industry(self.table(), industry).await?;
        info!("Found {} records for {}", entries.len(), industry);

        let mut outcomes = Vec::with_capacity(entries.len());
        for mut entry in entries {
            let current_hash = match self
                .resolver
                .resolve(&entry.account, &entry.subscription, &entry.blob)
                .await
            {
                Ok(HashOutcome::Resolved(hash)) => Some(hash),
                Ok(HashOutcome::NotFound) => None,
                Err(e) => {
                    // Hard resolver failure: skip the entry rather than
                    // rewrite it from bad data, keep processing
                    warn!("Hash resolution failed for {}, skipping: {}", entry.blob, e);
                    outcomes.push(RebaseOutcome {
                        blob: entry.blob,
                        updated: false,
                    });
                    continue;
                }
            };

            if current_hash != entry.md5 {
                info!("Updating hash for {}", entry.blob);
                entry.md5 = current_hash;
                entry.actor = self.actor.clone();
                entry.append_history(Activity::Rebase, &self.actor);
                self.ledger.upsert(self.table(), &entry).await?;
                outcomes.push(RebaseOutcome {
                    blob: entry.blob,
                    updated: true,
                });
            } else {
                info!("Unchanged hash for {}", entry.blob);
                outcomes.push(RebaseOutcome {
                    blob: entry.blob,
                    updated: false,
                });
            }
        }

        Ok(outcomes)
    }

    /// Register a batch of blobs in the ledger.
    ///
    /// The industry snapshot is fetched once at batch start, not
    /// re-fetched per blob; concurrent ingests of the same table can
    /// still race at the store layer (last writer wins).
    pub async fn ingest(&self, batch: &BatchDescriptor) -> Result<Vec<IngestOutcome>> {
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
        self.ensure_industry(&batch.industry)?;

        let snapshot = self
            .ledger
            .search_by_industry(self.table(), &batch.industry)
            .await?;
        info!(
            "Ingesting {} blobs for {} in {}",
            batch.blobs.len(),
            batch.industry,
            batch.account
        );

        let mut outcomes = Vec::with_capacity(batch.blobs.len());
        for blob in &batch.blobs {
            let existing = snapshot
                .iter()
                .find(|e| e.account == batch.account && &e.blob == blob);
            info!(
                "Entry for {} in {} exists: {}",
                blob,
                batch.account,
                existing.is_some()
            );

            let current_hash = match self
                .resolver
                .resolve(&batch.account, &batch.subscription, blob)
                .await?
            {
                HashOutcome::Resolved(hash) => Some(hash),
                HashOutcome::NotFound => None,
            };

            let action = match existing {
                Some(existing) if existing.md5 != current_hash => {
                    info!("Updating hash for {}", blob);
                    let mut entry = existing.clone();
                    entry.md5 = current_hash;
                    entry.actor = self.actor.clone();
                    entry.append_history(Activity::CreateRebase, &self.actor);
                    self.ledger.upsert(self.table(), &entry).await?;
                    IngestAction::Rebased
                }
                Some(_) => {
                    info!("Hash for {} in {} unchanged", blob, batch.account);
                    IngestAction::Unchanged
                }
                None => {
                    info!("Creating entry for {} in {}", blob, batch.account);
                    let mut entry = ValidationEntry::new(blob);
                    entry.industry = batch.industry.clone();
                    entry.account = batch.account.clone();
                    entry.subscription = batch.subscription.clone();
                    entry.md5 = current_hash;
                    entry.actor = self.actor.clone();
                    entry.append_history(Activity::Create, &self.actor);
                    self.ledger.upsert(self.table(), &entry).await?;
                    IngestAction::Created
                }
            };

            outcomes.push(IngestOutcome {
                blob: blob.clone(),
                action,
            });
        }

        Ok(outcomes)
    }
}
