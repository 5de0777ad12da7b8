//! Sync coordinator - runs pull, merge and persist cycles.
//!
//! ```text
//! IDLE | FAILED -> REQUESTING -> MERGING -> IDLE
//!                      |            |
//!                      +-> FAILED <-+
//! ```
//!
//! The request runs without the writer lock; local edits made meanwhile are
//! persisted before the merge starts. A failed cycle leaves the stored sync
//! tokens untouched, so the next trigger repeats the same delta.
//!
//! [`SyncCoordinator::cancel`] applies to the cycle in flight only. Each
//! cycle starts with a cleared cancellation flag, and a cancel issued
//! before the request is sent still aborts it.

use crate::error::{Error, Result, SyncFailure};
use crate::service::InventoryService;
use crate::store::KeyedStore;
use crate::transport::Transport;
use inventory_engine::{CollectionKind, Inconsistency, MergeReport, SyncPhase, SyncState};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{watch, Notify};

/// Outcome of a successful sync cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReport {
    /// Merge summary per collection that received records
    pub merged: BTreeMap<CollectionKind, MergeReport>,
    /// Problems found in the merged ledger collections
    pub inconsistencies: Vec<Inconsistency>,
    /// Why the post-merge consistency check could not run, if it failed
    pub check_error: Option<String>,
    /// Tokens stored at the end of the cycle
    pub sync_state: SyncState,
}

impl SyncReport {
    /// Records inserted or updated across all collections.
    pub fn changed(&self) -> usize {
        self.merged.values().map(|r| r.inserted + r.updated).sum()
    }
}

/// Drives sync cycles for one service.
pub struct SyncCoordinator<S, T> {
    service: InventoryService<S>,
    transport: T,
    phase: watch::Sender<SyncPhase>,
    cancel: Notify,
    cancelled: AtomicBool,
    request_timeout: Duration,
}

impl<S: KeyedStore, T: Transport> SyncCoordinator<S, T> {
    pub fn new(service: InventoryService<S>, transport: T, request_timeout: Duration) -> Self {
        let (phase, _) = watch::channel(SyncPhase::Idle);
        Self {
            service,
            transport,
            phase,
            cancel: Notify::new(),
            cancelled: AtomicBool::new(false),
            request_timeout,
        }
    }

    pub fn service(&self) -> &InventoryService<S> {
        &self.service
    }

    /// Current phase.
    pub fn phase(&self) -> SyncPhase {
        *self.phase.borrow()
    }

    /// Receiver notified on every phase change.
    pub fn subscribe(&self) -> watch::Receiver<SyncPhase> {
        self.phase.subscribe()
    }

    /// Abort the request of the cycle in flight, if any.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.cancel.notify_waiters();
    }

    /// Run one full cycle.
    ///
    /// Fails with [`Error::SyncInProgress`] if a cycle is already running.
    pub async fn sync(&self) -> Result<SyncReport> {
        self.begin()?;

        match self.run().await {
            Ok(report) => {
                self.advance(SyncPhase::Idle);
                tracing::info!("Sync completed: {} records changed", report.changed());
                Ok(report)
            }
            Err(e) => {
                self.advance(SyncPhase::Failed);
                tracing::error!("Sync failed: {}", e);
                Err(e)
            }
        }
    }

    /// Upload the local list of each collection.
    pub async fn push_all(&self) -> Result<usize> {
        self.cancelled.store(false, Ordering::SeqCst);
        let mut total = 0;
        for kind in CollectionKind::ALL {
            let records = self.service.collection(kind).await?;
            if records.is_empty() {
                continue;
            }
            total += self.request(self.transport.push(kind, records)).await?;
        }
        tracing::info!("Pushed {} records", total);
        Ok(total)
    }

    fn begin(&self) -> Result<()> {
        let mut started = false;
        self.phase.send_if_modified(|phase| match phase.transition(SyncPhase::Requesting) {
            Ok(next) => {
                *phase = next;
                started = true;
                true
            }
            Err(_) => false,
        });

        if started {
            self.cancelled.store(false, Ordering::SeqCst);
            Ok(())
        } else {
            Err(Error::SyncInProgress)
        }
    }

    fn advance(&self, next: SyncPhase) {
        self.phase.send_modify(|phase| match phase.transition(next) {
            Ok(next) => *phase = next,
            Err(e) => tracing::warn!("Ignoring phase change: {}", e),
        });
    }

    async fn run(&self) -> Result<SyncReport> {
        let state = self.service.sync_state().await?;
        let request = state.pull_request();

        let response = self.request(self.transport.pull(&request)).await?;
        tracing::debug!("Received {} records", response.record_count());

        self.advance(SyncPhase::Merging);
        let applied = self
            .service
            .apply_pull(&state, response)
            .await
            .map_err(|e| SyncFailure::Persist(e.to_string()))?;

        let (inconsistencies, check_error) = match self.service.check().await {
            Ok(found) => (found, None),
            Err(e) => {
                tracing::error!("Consistency check failed after sync: {}", e);
                (Vec::new(), Some(e.to_string()))
            }
        };
        for problem in &inconsistencies {
            tracing::warn!("Inconsistent state after sync: {:?}", problem);
        }

        Ok(SyncReport {
            merged: applied.merged,
            inconsistencies,
            check_error,
            sync_state: applied.sync_state,
        })
    }

    /// Await a network call under the request timeout and cancellation.
    async fn request<R>(
        &self,
        call: impl std::future::Future<Output = std::result::Result<R, SyncFailure>>,
    ) -> Result<R> {
        let cancelled = self.cancel.notified();
        tokio::pin!(cancelled);
        cancelled.as_mut().enable();
        if self.cancelled.load(Ordering::SeqCst) {
            return Err(SyncFailure::Cancelled.into());
        }

        tokio::select! {
            result = tokio::time::timeout(self.request_timeout, call) => match result {
                Ok(result) => Ok(result?),
                Err(_) => Err(SyncFailure::Timeout(self.request_timeout).into()),
            },
            _ = &mut cancelled => Err(SyncFailure::Cancelled.into()),
        }
    }
}
