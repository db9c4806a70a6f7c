//! The transaction coordinator.
//!
//! Owns the store session for the duration of one run and wraps every load
//! phase in a single transaction: all phases succeed and the batch commits
//! once, or the first unrecoverable error rolls the whole batch back and the
//! store is left exactly as it was.

use super::phases::{LoadContext, Phase};
use super::LoadSummary;
use crate::config::{Config, LoadConfig, ReloadPolicy};
use crate::error::{LoaderError, Result};
use crate::sources::SourceBatch;
use crate::store::Store;
use crate::targeting::CountryVocabulary;
use rusqlite::{params, Transaction};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info};

pub struct Coordinator {
    store: Store,
    vocab: CountryVocabulary,
    load: LoadConfig,
    cancel: Arc<AtomicBool>,
}

impl Coordinator {
    pub fn new(store: Store, config: &Config) -> Self {
        Self {
            store,
            vocab: CountryVocabulary::new(config.targeting.countries.clone()),
            load: config.load.clone(),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A flag an external caller may set to abort the run; the in-flight
    /// transaction is rolled back at the next phase boundary.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Runs every load phase in dependency order inside one transaction.
    /// Commits only after the last phase succeeds; any error rolls back the
    /// entire batch.
    pub fn run(&mut self, batch: &SourceBatch) -> Result<LoadSummary> {
        let policy = self.load.on_existing_campaigns;
        let max_skip_reasons = self.load.max_skip_reasons;
        let vocab = self.vocab.clone();
        let cancel = Arc::clone(&self.cancel);

        let tx = self.store.connection().transaction()?;
        info!("Transaction started");

        if policy == ReloadPolicy::Abort {
            Self::ensure_fresh_batch(&tx, batch)?;
        }

        let mut ctx = LoadContext::new(&tx, batch, vocab, max_skip_reasons);
        match Self::run_phases(&mut ctx, &cancel) {
            Ok(()) => {
                let summary = ctx.into_summary();
                tx.commit()?;
                info!(
                    events_inserted = summary.events_inserted,
                    skipped = summary.skipped,
                    "Load committed"
                );
                Ok(summary)
            }
            Err(e) => {
                let summary = ctx.into_summary();
                // The phase error is the cause the caller needs; a failed
                // rollback must not replace it.
                if let Err(rollback_err) = tx.rollback() {
                    error!(error = %rollback_err, "Rollback failed");
                }
                error!(
                    error = %e,
                    events_inserted = summary.events_inserted,
                    skipped = summary.skipped,
                    "Load failed; transaction rolled back"
                );
                Err(e)
            }
        }
    }

    /// Releases the session once the run is over, e.g. for post-run queries.
    pub fn into_store(self) -> Store {
        self.store
    }

    fn run_phases(ctx: &mut LoadContext<'_>, cancel: &AtomicBool) -> Result<()> {
        for phase in Phase::ORDER {
            if cancel.load(Ordering::Relaxed) {
                return Err(LoaderError::Cancelled);
            }
            let span = tracing::info_span!("phase", name = phase.name());
            let _enter = span.enter();
            ctx.execute(phase)?;
        }
        Ok(())
    }

    /// Campaigns have no natural key, so under the `abort` reload policy a
    /// batch naming an already-stored campaign is refused before any write.
    fn ensure_fresh_batch(tx: &Transaction<'_>, batch: &SourceBatch) -> Result<()> {
        let names: BTreeSet<&str> = batch
            .campaigns
            .iter()
            .map(|c| c.campaign_name.as_str())
            .collect();
        let mut stmt = tx.prepare("SELECT 1 FROM Campaigns WHERE CampaignName = ?1 LIMIT 1")?;
        for name in names {
            if stmt.exists(params![name])? {
                return Err(LoaderError::BatchAlreadyLoaded(format!(
                    "campaign '{name}' already exists in the store"
                )));
            }
        }
        Ok(())
    }
}
