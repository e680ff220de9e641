//! Bidirectional sync between the local collection and Notion.
//!
//! One pass runs `Validating → Fetching → Reconciling → WritingRemote →
//! PersistingLocal`. Any failure ends the pass, records the error in the
//! sync status and leaves the local collection untouched.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::{AppError, Prompt, RemoteConfig, Result, StorageBackend, SyncStatusPatch};
use crate::infrastructure::{PromptStore, RemoteCollection};

/// Stage of a sync pass, used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Validating,
    Fetching,
    Reconciling,
    WritingRemote,
    PersistingLocal,
}

impl std::fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Validating => "validating",
            Self::Fetching => "fetching",
            Self::Reconciling => "reconciling",
            Self::WritingRemote => "writing-remote",
            Self::PersistingLocal => "persisting-local",
        };
        f.write_str(name)
    }
}

/// Converged collection plus the remote writes needed to reach it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncPlan {
    /// Local records in local order, then remote-only records in fetch order.
    pub merged: Vec<Prompt>,
    /// Positions in `merged` whose record must be written remotely, in order.
    pub writes: Vec<usize>,
    /// Remote-only records appended to the result.
    pub pulled: usize,
}

/// Reconcile two collections by id.
///
/// Local-only records are kept and scheduled for writing. For ids on both
/// sides the local record wins only when its `updated_at` is strictly
/// greater; ties go to the remote record. Remote-only records are appended
/// without a write. Nothing is ever deleted.
#[must_use]
pub fn reconcile(local: &[Prompt], remote: Vec<Prompt>) -> SyncPlan {
    let mut index: HashMap<String, Prompt> = HashMap::with_capacity(remote.len());
    let mut remote_order = Vec::with_capacity(remote.len());
    for prompt in remote {
        match index.entry(prompt.id.clone()) {
            Entry::Occupied(_) => {
                tracing::warn!(id = %prompt.id, "Duplicate remote id, keeping first");
            }
            Entry::Vacant(slot) => {
                remote_order.push(prompt.id.clone());
                slot.insert(prompt);
            }
        }
    }

    let mut plan = SyncPlan::default();

    for local_prompt in local {
        match index.remove(&local_prompt.id) {
            None => {
                plan.writes.push(plan.merged.len());
                plan.merged.push(local_prompt.clone());
            }
            Some(remote_prompt) if local_prompt.updated_at > remote_prompt.updated_at => {
                plan.writes.push(plan.merged.len());
                plan.merged.push(local_prompt.clone());
            }
            Some(remote_prompt) => plan.merged.push(remote_prompt),
        }
    }

    for id in remote_order {
        if let Some(remote_prompt) = index.remove(&id) {
            plan.merged.push(remote_prompt);
            plan.pulled += 1;
        }
    }

    plan
}

/// What a successful pass did.
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    /// The converged collection, now persisted locally.
    pub prompts: Vec<Prompt>,
    /// Local-only records created remotely.
    pub created: usize,
    /// Existing remote records overwritten by newer local versions.
    pub updated: usize,
    /// Remote-only records added locally.
    pub pulled: usize,
    /// Remote documents skipped because they could not be converted.
    pub dropped: usize,
    /// Whether the remote database had to be created first.
    pub provisioned: bool,
}

/// Runs sync passes against a remote collection.
///
/// Callers must not run two passes against the same store concurrently.
pub struct SyncService {
    store: PromptStore,
    remote: Arc<dyn RemoteCollection>,
}

impl SyncService {
    #[must_use]
    pub fn new(store: PromptStore, remote: Arc<dyn RemoteCollection>) -> Self {
        Self { store, remote }
    }

    /// Run one sync pass and return the converged collection.
    ///
    /// A pass recorded as in progress blocks a new one unless `force` is set,
    /// which recovers from a run that died without recording its outcome.
    ///
    /// # Errors
    /// Returns a config error without any remote call when Notion is not
    /// configured; otherwise the first storage or remote error encountered.
    pub async fn sync(&self, force: bool) -> Result<SyncReport> {
        tracing::info!("Starting sync...");
        enter(SyncPhase::Validating);

        let Some(config) = self.store.remote_config().await? else {
            let err = AppError::not_configured();
            self.record_failure(&err).await;
            return Err(err);
        };

        if self.store.sync_status().await?.in_progress && !force {
            return Err(AppError::SyncInProgress);
        }

        self.store
            .update_sync_status(SyncStatusPatch::started())
            .await?;

        match self.run(&config).await {
            Ok(report) => {
                self.store
                    .update_sync_status(SyncStatusPatch::succeeded())
                    .await?;
                tracing::info!(
                    total = report.prompts.len(),
                    created = report.created,
                    updated = report.updated,
                    pulled = report.pulled,
                    dropped = report.dropped,
                    "Sync completed"
                );
                Ok(report)
            }
            Err(err) => {
                self.record_failure(&err).await;
                Err(err)
            }
        }
    }

    /// Follow-up pass after a local change. Runs only when `auto_sync` is
    /// on and Notion is the active backend; returns `None` otherwise.
    ///
    /// # Errors
    /// Returns the error of the pass, if one ran.
    pub async fn sync_after_change(&self, auto_sync: bool) -> Result<Option<SyncReport>> {
        if !auto_sync {
            return Ok(None);
        }

        let (_, backend) = self.store.load_prompts().await?;
        if backend != StorageBackend::Notion {
            tracing::debug!(%backend, "Auto-sync skipped");
            return Ok(None);
        }

        self.sync(false).await.map(Some)
    }

    async fn run(&self, config: &RemoteConfig) -> Result<SyncReport> {
        enter(SyncPhase::Fetching);
        let (local, _) = self.store.load_prompts().await?;

        let resolution = self.remote.resolve_container(config).await?;
        let config = if resolution.provisioned {
            let resolved = config.with_container(&resolution.container_id);
            self.store.save_remote_config(&resolved).await?;
            resolved
        } else {
            config.clone()
        };

        let fetched = self.remote.fetch_all(&config).await?;

        enter(SyncPhase::Reconciling);
        let mut plan = reconcile(&local, fetched.prompts);

        enter(SyncPhase::WritingRemote);
        let mut report = SyncReport {
            pulled: plan.pulled,
            dropped: fetched.dropped,
            provisioned: resolution.provisioned,
            ..SyncReport::default()
        };

        for &slot in &plan.writes {
            let prompt = &plan.merged[slot];
            let existed = prompt.is_remote();
            tracing::debug!(id = %prompt.id, existed, "Writing prompt to Notion");

            let stored = self.remote.create_or_update(&config, prompt).await?;

            if existed {
                report.updated += 1;
            } else {
                report.created += 1;
            }
            // Adopt the stored id and timestamps so the next pass sees a tie.
            if let Some(stored) = stored {
                plan.merged[slot] = stored;
            }
        }

        enter(SyncPhase::PersistingLocal);
        self.store
            .save_prompts(&plan.merged, StorageBackend::Notion)
            .await?;

        report.prompts = plan.merged;
        Ok(report)
    }

    async fn record_failure(&self, err: &AppError) {
        tracing::warn!(error = %err, "Sync failed");
        if let Err(status_err) = self
            .store
            .update_sync_status(SyncStatusPatch::failed(err.to_string()))
            .await
        {
            tracing::error!(error = %status_err, "Could not record sync failure");
        }
    }
}

fn enter(phase: SyncPhase) {
    tracing::debug!(%phase, "Sync phase");
}
