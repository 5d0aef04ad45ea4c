//! Sync reconciler: keeps the in-memory workspace and the record store in step.
//!
//! ## Operations
//!
//! `load_initial()` fetches everything on startup. An empty remote store (no
//!   accounts and no deals) is replaced by the sample dataset; the local
//!   cache seeds itself and keeps emptied collections empty. A malformed
//!   response keeps whatever is already in memory, or the sample if nothing is.
//!
//! `refresh_background()` runs on a timer. Each collection is replaced only
//!   when the fetched one is non-empty, so a transient empty read never wipes
//!   local edits.
//!
//! `refresh_manual()` asks for confirmation, then replaces all three
//!   collections unconditionally.
//!
//! `save()` writes accounts, deals and representatives in that order and stops
//!   at the first failure. Earlier writes are not rolled back.
//!
//! Every fetch and save takes a ticket from one counter. A fetch response is
//! applied only if its ticket is newer than the last applied fetch and the
//! last save start; anything older is discarded.

use crate::error::SyncError;
use crate::models::{Dataset, RecordKind};
use crate::sample;
use crate::store::{Collection, RecordStore};
use chrono::NaiveDate;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::workspace::Workspace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Loading,
    Loaded,
    Saving,
    Saved,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Initial,
    Background,
    Manual,
}

/// What a load or refresh did to the workspace.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReport {
    pub replaced: Vec<RecordKind>,
    /// Collections left alone because the fetched one was empty.
    pub kept: Vec<RecordKind>,
    /// The sample dataset was installed instead of fetched data.
    pub seeded: bool,
    /// The response arrived after a newer one and was dropped.
    pub stale: bool,
    /// Fetched rows that could not be read.
    pub rejected: usize,
}

/// Outcome of a manual refresh.
#[derive(Debug, Clone, PartialEq)]
pub enum ManualRefresh {
    Applied(SyncReport),
    Cancelled,
}

pub struct Reconciler {
    store: Arc<dyn RecordStore>,
    workspace: Arc<RwLock<Workspace>>,
    phase: Mutex<Phase>,
    tickets: AtomicU64,
    last_applied_fetch: AtomicU64,
    last_save_start: AtomicU64,
    reference_date: NaiveDate,
}

impl Reconciler {
    pub fn new(store: Arc<dyn RecordStore>, reference_date: NaiveDate) -> Self {
        Self {
            store,
            workspace: Arc::new(RwLock::new(Workspace::default())),
            phase: Mutex::new(Phase::Idle),
            tickets: AtomicU64::new(0),
            last_applied_fetch: AtomicU64::new(0),
            last_save_start: AtomicU64::new(0),
            reference_date,
        }
    }

    pub fn workspace(&self) -> Arc<RwLock<Workspace>> {
        Arc::clone(&self.workspace)
    }

    pub fn store_name(&self) -> &'static str {
        self.store.name()
    }

    pub fn phase(&self) -> Phase {
        self.phase.lock().map(|p| *p).unwrap_or(Phase::Failed)
    }

    fn set_phase(&self, phase: Phase) {
        if let Ok(mut p) = self.phase.lock() {
            debug!("Sync phase {:?} -> {:?}", *p, phase);
            *p = phase;
        }
    }

    fn next_ticket(&self) -> u64 {
        self.tickets.fetch_add(1, Ordering::SeqCst) + 1
    }

    // ── Loading ───────────────────────────────────────────────────────────────

    pub async fn load_initial(&self) -> Result<SyncReport, SyncError> {
        self.fetch_and_apply(Mode::Initial).await
    }

    pub async fn refresh_background(&self) -> Result<SyncReport, SyncError> {
        self.fetch_and_apply(Mode::Background).await
    }

    /// Replace local state with the store's, after `confirm` agrees.
    pub async fn refresh_manual<F>(&self, confirm: F) -> Result<ManualRefresh, SyncError>
    where
        F: FnOnce() -> bool,
    {
        if !confirm() {
            info!("Manual refresh cancelled");
            return Ok(ManualRefresh::Cancelled);
        }
        self.fetch_and_apply(Mode::Manual).await.map(ManualRefresh::Applied)
    }

    async fn fetch_and_apply(&self, mode: Mode) -> Result<SyncReport, SyncError> {
        let ticket = self.next_ticket();
        self.set_phase(Phase::Loading);
        info!("{:?} fetch from {} store (ticket {})", mode, self.store.name(), ticket);

        match self.store.fetch_all().await {
            Ok(data) => {
                let report = self.apply_fetched(ticket, data, mode).await;
                self.set_phase(Phase::Loaded);
                Ok(report)
            }
            Err(SyncError::MalformedResponse(reason)) if mode == Mode::Initial => {
                warn!("Malformed response on initial load: {}", reason);
                let mut ws = self.workspace.write().await;
                let mut report = SyncReport::default();
                if ws.is_empty() {
                    info!("Nothing in memory, falling back to the sample dataset");
                    ws.replace_all(sample::dataset(self.reference_date));
                    report.seeded = true;
                    report.replaced = RecordKind::ALL.to_vec();
                } else {
                    report.kept = RecordKind::ALL.to_vec();
                }
                self.set_phase(Phase::Loaded);
                Ok(report)
            }
            Err(e) => {
                error!("{:?} fetch failed: {}", mode, e);
                self.set_phase(Phase::Failed);
                Err(e)
            }
        }
    }

    async fn apply_fetched(&self, ticket: u64, mut data: Dataset, mode: Mode) -> SyncReport {
        let mut ws = self.workspace.write().await;
        let mut report = SyncReport {
            rejected: data.rejected.len(),
            ..Default::default()
        };

        let newest_fetch = self.last_applied_fetch.load(Ordering::SeqCst);
        let save_start = self.last_save_start.load(Ordering::SeqCst);
        if ticket <= newest_fetch || ticket <= save_start {
            warn!(
                "Discarding stale {:?} response (ticket {}, last fetch {}, last save {})",
                mode, ticket, newest_fetch, save_start
            );
            report.stale = true;
            return report;
        }
        self.last_applied_fetch.store(ticket, Ordering::SeqCst);

        if report.rejected > 0 {
            warn!("{} fetched rows were rejected and are not in the workspace", report.rejected);
        }

        match mode {
            Mode::Initial => {
                let empty = data.accounts.is_empty() && data.deals.is_empty();
                if empty && self.store.seeds_when_empty() {
                    info!("Store has no accounts or deals, starting from the sample dataset");
                    data = sample::dataset(self.reference_date);
                    report.seeded = true;
                }
                ws.replace_all(data);
                report.replaced = RecordKind::ALL.to_vec();
            }
            Mode::Background => {
                for kind in RecordKind::ALL {
                    if data.len_of(kind) > 0 {
                        ws.replace(kind, &mut data);
                        report.replaced.push(kind);
                    } else {
                        debug!("Fetched {} empty, keeping local copy", kind);
                        report.kept.push(kind);
                    }
                }
            }
            Mode::Manual => {
                for kind in RecordKind::ALL {
                    ws.replace(kind, &mut data);
                }
                report.replaced = RecordKind::ALL.to_vec();
            }
        }

        info!(
            "Applied {:?} fetch: {} accounts, {} deals, {} representatives in memory",
            mode,
            ws.accounts().len(),
            ws.deals().len(),
            ws.representatives().len()
        );
        report
    }

    // ── Saving ────────────────────────────────────────────────────────────────

    /// Push the full snapshot. Returns the collections written.
    pub async fn save(&self) -> Result<Vec<RecordKind>, SyncError> {
        let ticket = self.next_ticket();
        self.last_save_start.fetch_max(ticket, Ordering::SeqCst);
        self.set_phase(Phase::Saving);

        let snapshot = self.workspace.read().await.data().clone();
        if !snapshot.rejected.is_empty() {
            warn!(
                "{} unreadable rows are not part of this save and will be overwritten",
                snapshot.rejected.len()
            );
        }

        let mut committed = Vec::new();
        for kind in RecordKind::ALL {
            let records = Collection::of(&snapshot, kind);
            info!("Saving {} {} (ticket {})", records.len(), kind, ticket);
            if let Err(e) = self.store.replace_collection(records).await {
                error!("Save aborted at {}: {}", kind, e);
                self.set_phase(Phase::Failed);
                return Err(SyncError::PartialSave {
                    failed: kind,
                    committed,
                    source: e.into(),
                });
            }
            committed.push(kind);
        }

        self.set_phase(Phase::Saved);
        Ok(committed)
    }

    /// Forget stored data and start over from the sample dataset. Nothing is
    /// pushed to a remote store until the next save.
    pub async fn reset_to_sample(&self) -> Result<(), SyncError> {
        self.store.reset().await?;
        let ticket = self.next_ticket();
        self.last_applied_fetch.fetch_max(ticket, Ordering::SeqCst);
        self.workspace
            .write()
            .await
            .replace_all(sample::dataset(self.reference_date));
        info!("Workspace reset to the sample dataset");
        Ok(())
    }

    /// Run `refresh_background` every `every`, starting one interval from now.
    pub fn spawn_periodic(self: Arc<Self>, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.tick().await;
            loop {
                interval.tick().await;
                match self.refresh_background().await {
                    Ok(report) if report.stale => debug!("Periodic refresh superseded"),
                    Ok(report) => info!(
                        "Periodic refresh: replaced {:?}, kept {:?}",
                        report.replaced, report.kept
                    ),
                    Err(e) => warn!("Periodic refresh failed: {}", e),
                }
            }
        })
    }
}
