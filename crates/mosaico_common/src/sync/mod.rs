//! Synchronization boundary.
//!
//! The backend document store persists progression patches and republishes
//! authoritative state to every subscriber. Delivery is at-least-once and
//! eventually consistent; whatever the adapter publishes last wins.

pub mod memory;
pub mod store;

pub use memory::InMemorySyncAdapter;
pub use store::ProgressionStore;

use crate::error::SyncError;
use crate::progression::state::{MosaicBadge, ProgressionState, TrackProgress};
use crate::progression::tracks::ColorToken;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::Future;
use tokio::sync::watch;

/// Persisted record: account identity plus the flattened progression fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressionDocument {
    pub account_id: String,
    #[serde(flatten)]
    pub state: ProgressionState,
}

impl ProgressionDocument {
    pub fn new(account_id: &str, state: ProgressionState) -> Self {
        Self {
            account_id: account_id.to_string(),
            state,
        }
    }
}

/// Top-level fields that changed between two states
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xp: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_mosaic_index: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_mosaic_pieces: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_mosaic_color_history: Option<Vec<ColorToken>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mosaic_badges: Option<Vec<MosaicBadge>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_progress: Option<BTreeMap<String, TrackProgress>>,
}

fn changed<T: PartialEq + Clone>(old: &T, new: &T) -> Option<T> {
    (old != new).then(|| new.clone())
}

impl StatePatch {
    pub fn between(old: &ProgressionState, new: &ProgressionState) -> Self {
        Self {
            xp: changed(&old.xp, &new.xp),
            level: changed(&old.level, &new.level),
            current_mosaic_index: changed(&old.current_mosaic_index, &new.current_mosaic_index),
            current_mosaic_pieces: changed(&old.current_mosaic_pieces, &new.current_mosaic_pieces),
            current_mosaic_color_history: changed(
                &old.current_mosaic_color_history,
                &new.current_mosaic_color_history,
            ),
            mosaic_badges: changed(&old.mosaic_badges, &new.mosaic_badges),
            track_progress: changed(&old.track_progress, &new.track_progress),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Overwrite every field present in the patch
    pub fn apply_to(&self, state: &mut ProgressionState) {
        if let Some(xp) = self.xp {
            state.xp = xp;
        }
        if let Some(level) = self.level {
            state.level = level;
        }
        if let Some(index) = self.current_mosaic_index {
            state.current_mosaic_index = index;
        }
        if let Some(pieces) = self.current_mosaic_pieces {
            state.current_mosaic_pieces = pieces;
        }
        if let Some(history) = &self.current_mosaic_color_history {
            state.current_mosaic_color_history = history.clone();
        }
        if let Some(badges) = &self.mosaic_badges {
            state.mosaic_badges = badges.clone();
        }
        if let Some(progress) = &self.track_progress {
            state.track_progress = progress.clone();
        }
    }
}

/// Contract with the backend document store.
///
/// `apply_patch` succeeding means the write is durable; the authoritative
/// result still arrives through the subscription.
pub trait SyncAdapter: Send + Sync {
    fn fetch(
        &self,
        account_id: &str,
    ) -> impl Future<Output = Result<ProgressionDocument, SyncError>> + Send;

    fn apply_patch(
        &self,
        account_id: &str,
        patch: StatePatch,
    ) -> impl Future<Output = Result<(), SyncError>> + Send;

    /// Live feed of authoritative state. The current value is marked seen.
    fn subscribe(
        &self,
        account_id: &str,
    ) -> impl Future<Output = Result<watch::Receiver<ProgressionState>, SyncError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_between_equal_states_is_empty() {
        let state = ProgressionState::new();
        let patch = StatePatch::between(&state, &state);
        assert!(patch.is_empty());
        assert_eq!(serde_json::to_string(&patch).unwrap(), "{}");
    }

    #[test]
    fn test_patch_carries_only_changed_fields() {
        let old = ProgressionState::new();
        let mut new = old.clone();
        new.xp = 80;
        new.current_mosaic_pieces = 1;
        new.current_mosaic_color_history.push(ColorToken::from("#4DB6AC"));

        let patch = StatePatch::between(&old, &new);
        assert_eq!(patch.xp, Some(80));
        assert_eq!(patch.level, None);
        assert_eq!(patch.current_mosaic_index, None);
        assert_eq!(patch.current_mosaic_pieces, Some(1));
        assert!(patch.mosaic_badges.is_none());

        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(json["xp"], 80);
        assert!(json.get("level").is_none());
        assert_eq!(json["currentMosaicColorHistory"][0], "#4DB6AC");

        let mut merged = old.clone();
        patch.apply_to(&mut merged);
        assert_eq!(merged, new);
    }

    #[test]
    fn test_document_flattens_state() {
        let doc = ProgressionDocument::new("user-1", ProgressionState::new());
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["accountId"], "user-1");
        assert_eq!(json["xp"], 0);
        assert_eq!(json["currentMosaicIndex"], 1);

        let back: ProgressionDocument = serde_json::from_value(json).unwrap();
        assert_eq!(back, doc);
    }
}
