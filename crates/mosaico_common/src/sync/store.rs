//! Progression store: the single owner of one account's state on a device.
//!
//! Holds the last authoritative state received from the adapter plus at most
//! one optimistic state computed locally. Optimistic states are disposable:
//! any authoritative state that arrives replaces local state wholesale after
//! reconciliation. Only one completion may be in flight at a time, which is
//! what keeps a double-tapped "lesson completed" from being applied twice.

use super::{StatePatch, SyncAdapter};
use crate::error::StoreError;
use crate::progression::engine::{LessonOutcome, ProgressionEngine};
use crate::progression::state::ProgressionState;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use tracing::{error, info, warn};

#[derive(Debug)]
struct StoreState {
    authoritative: ProgressionState,
    optimistic: Option<ProgressionState>,
}

/// Clears the in-flight flag when the completion finishes, however it ends.
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct ProgressionStore<A: SyncAdapter> {
    account_id: String,
    engine: ProgressionEngine,
    adapter: Arc<A>,
    inner: RwLock<StoreState>,
    in_flight: AtomicBool,
}

impl<A: SyncAdapter> ProgressionStore<A> {
    /// Fetch and reconcile the account's current document.
    pub async fn open(
        account_id: &str,
        engine: ProgressionEngine,
        adapter: Arc<A>,
    ) -> Result<Self, StoreError> {
        let doc = adapter.fetch(account_id).await?;
        let authoritative = engine.reconcile(&doc.state)?;
        info!(account_id, xp = authoritative.xp, level = authoritative.level, "Opened progression store");

        Ok(Self {
            account_id: account_id.to_string(),
            engine,
            adapter,
            inner: RwLock::new(StoreState {
                authoritative,
                optimistic: None,
            }),
            in_flight: AtomicBool::new(false),
        })
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn engine(&self) -> &ProgressionEngine {
        &self.engine
    }

    /// State to display: the optimistic state if one exists
    pub async fn current(&self) -> ProgressionState {
        let inner = self.inner.read().await;
        inner
            .optimistic
            .clone()
            .unwrap_or_else(|| inner.authoritative.clone())
    }

    /// Last state confirmed by the adapter
    pub async fn authoritative(&self) -> ProgressionState {
        self.inner.read().await.authoritative.clone()
    }

    /// Whether a local state is waiting to be confirmed by the adapter
    pub async fn has_pending(&self) -> bool {
        self.inner.read().await.optimistic.is_some()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Apply a lesson completion optimistically and persist it.
    ///
    /// Fails with `CompletionInFlight` while a previous completion is still
    /// being persisted. If the persist fails this completion's optimistic
    /// state is dropped, the one it was built on is restored, and the
    /// authoritative state is untouched.
    pub async fn complete_lesson(&self, track_id: &str) -> Result<LessonOutcome, StoreError> {
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            warn!(account_id = %self.account_id, track_id, "Completion already in flight");
            return Err(StoreError::CompletionInFlight);
        };

        let base = self.current().await;
        let outcome = self.engine.complete_lesson(&base, track_id)?;
        let patch = StatePatch::between(&base, &outcome.state);

        let previous = {
            let mut inner = self.inner.write().await;
            std::mem::replace(&mut inner.optimistic, Some(outcome.state.clone()))
        };

        if let Err(err) = self.adapter.apply_patch(&self.account_id, patch).await {
            warn!(account_id = %self.account_id, track_id, error = %err, "Persist failed, discarding optimistic state");
            // Earlier persisted but unconfirmed completions stay visible
            let mut inner = self.inner.write().await;
            if inner.optimistic.as_ref() == Some(&outcome.state) {
                inner.optimistic = previous;
            }
            return Err(err.into());
        }

        if let Some(badge) = &outcome.new_badge {
            info!(account_id = %self.account_id, mosaic = badge.mosaic_index, "Badge persisted");
        }
        Ok(outcome)
    }

    /// Replace local state with state published by the adapter.
    ///
    /// States that fail reconciliation are refused and reported; the
    /// previous local state stays in place.
    pub async fn accept_authoritative(&self, state: &ProgressionState) -> Result<(), StoreError> {
        let reconciled = match self.engine.reconcile(state) {
            Ok(reconciled) => reconciled,
            Err(err) => {
                error!(account_id = %self.account_id, error = %err, "Refusing authoritative state");
                return Err(err.into());
            }
        };

        let mut inner = self.inner.write().await;
        inner.authoritative = reconciled;
        inner.optimistic = None;
        Ok(())
    }

    /// Drive the live-update loop until the adapter closes the channel.
    ///
    /// Returns early with the error if a published state violates the
    /// progression invariants.
    pub async fn follow(
        &self,
        mut updates: watch::Receiver<ProgressionState>,
    ) -> Result<(), StoreError> {
        while updates.changed().await.is_ok() {
            let state = updates.borrow_and_update().clone();
            self.accept_authoritative(&state).await?;
        }
        info!(account_id = %self.account_id, "Live updates closed");
        Ok(())
    }

    /// Re-fetch the document and accept it as authoritative
    pub async fn refresh(&self) -> Result<(), StoreError> {
        let doc = self.adapter.fetch(&self.account_id).await?;
        self.accept_authoritative(&doc.state).await
    }
}
