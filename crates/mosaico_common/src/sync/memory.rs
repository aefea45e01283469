//! In-memory synchronization adapter.
//!
//! Stands in for the backend document store in tests and in the CLI. Each
//! account's latest document lives in a `watch` channel, so every accepted
//! patch is republished to subscribers the way a live document listener
//! would.

use super::{ProgressionDocument, StatePatch, SyncAdapter};
use crate::error::SyncError;
use crate::progression::state::ProgressionState;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{watch, Mutex};
use tracing::{debug, warn};

pub struct InMemorySyncAdapter {
    accounts: Mutex<HashMap<String, watch::Sender<ProgressionState>>>,
    fail_next: Mutex<Option<SyncError>>,
    paused: watch::Sender<bool>,
    patches_applied: AtomicU64,
}

impl InMemorySyncAdapter {
    pub fn new() -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
            fail_next: Mutex::new(None),
            paused: watch::Sender::new(false),
            patches_applied: AtomicU64::new(0),
        }
    }

    /// Create the account document if missing and return its state.
    pub async fn provision(&self, account_id: &str) -> ProgressionState {
        let mut accounts = self.accounts.lock().await;
        let tx = accounts
            .entry(account_id.to_string())
            .or_insert_with(|| watch::Sender::new(ProgressionState::new()));
        let state = tx.borrow().clone();
        state
    }

    /// Overwrite an account's document as another writer would, notifying
    /// subscribers.
    pub async fn push_authoritative(&self, account_id: &str, state: ProgressionState) {
        let mut accounts = self.accounts.lock().await;
        match accounts.get(account_id) {
            Some(tx) => {
                tx.send_replace(state);
            }
            None => {
                accounts.insert(account_id.to_string(), watch::Sender::new(state));
            }
        }
    }

    /// Redeliver the current document without changing it.
    pub async fn republish(&self, account_id: &str) -> Result<(), SyncError> {
        let accounts = self.accounts.lock().await;
        let tx = accounts
            .get(account_id)
            .ok_or_else(|| SyncError::NotProvisioned(account_id.to_string()))?;
        tx.send_modify(|_| {});
        Ok(())
    }

    /// The next `apply_patch` fails with `err` and stores nothing.
    pub async fn fail_next_patch(&self, err: SyncError) {
        *self.fail_next.lock().await = Some(err);
    }

    /// Hold every `apply_patch` until [`Self::resume_patches`].
    pub fn pause_patches(&self) {
        self.paused.send_replace(true);
    }

    pub fn resume_patches(&self) {
        self.paused.send_replace(false);
    }

    pub fn patches_applied(&self) -> u64 {
        self.patches_applied.load(Ordering::SeqCst)
    }

    pub async fn snapshot(&self, account_id: &str) -> Option<ProgressionState> {
        let accounts = self.accounts.lock().await;
        let state = accounts.get(account_id).map(|tx| tx.borrow().clone());
        state
    }

    async fn wait_until_resumed(&self) {
        let mut paused = self.paused.subscribe();
        while *paused.borrow_and_update() {
            if paused.changed().await.is_err() {
                break;
            }
        }
    }
}

impl Default for InMemorySyncAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncAdapter for InMemorySyncAdapter {
    async fn fetch(&self, account_id: &str) -> Result<ProgressionDocument, SyncError> {
        self.snapshot(account_id)
            .await
            .map(|state| ProgressionDocument::new(account_id, state))
            .ok_or_else(|| SyncError::NotProvisioned(account_id.to_string()))
    }

    async fn apply_patch(&self, account_id: &str, patch: StatePatch) -> Result<(), SyncError> {
        self.wait_until_resumed().await;

        if let Some(err) = self.fail_next.lock().await.take() {
            warn!(account_id, error = %err, "Injected patch failure");
            return Err(err);
        }

        let accounts = self.accounts.lock().await;
        let tx = accounts
            .get(account_id)
            .ok_or_else(|| SyncError::NotProvisioned(account_id.to_string()))?;
        tx.send_modify(|state| patch.apply_to(state));
        self.patches_applied.fetch_add(1, Ordering::SeqCst);
        debug!(account_id, "Applied patch");
        Ok(())
    }

    async fn subscribe(
        &self,
        account_id: &str,
    ) -> Result<watch::Receiver<ProgressionState>, SyncError> {
        let accounts = self.accounts.lock().await;
        let receiver = accounts.get(account_id).map(|tx| tx.subscribe());
        receiver.ok_or_else(|| SyncError::NotProvisioned(account_id.to_string()))
    }
}
