//! Progression State
//!
//! The per-account record managed by the engine. It is serialized as a flat
//! camelCase document by the synchronization layer. Key names written by
//! older clients (`currentMosaicHistory`, badge `id`/`history`) are accepted
//! on read.

use super::tracks::ColorToken;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Lessons completed on one track
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackProgress {
    /// Older documents omit this; reconciliation fills it from the map key.
    #[serde(default)]
    pub track_id: String,
    pub completed_lessons: u32,
}

impl TrackProgress {
    pub fn new(track_id: &str) -> Self {
        Self {
            track_id: track_id.to_string(),
            completed_lessons: 0,
        }
    }
}

/// Immutable record of a completed mosaic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MosaicBadge {
    #[serde(alias = "id")]
    pub mosaic_index: u32,
    pub completed_at: DateTime<Utc>,
    /// One color per segment, in the order the pieces were earned
    #[serde(alias = "history")]
    pub color_history: Vec<ColorToken>,
}

/// Root progression record for one account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressionState {
    pub xp: u64,
    /// Cached for display; always recomputed from `xp`
    pub level: u32,
    pub current_mosaic_index: u32,
    pub current_mosaic_pieces: u32,
    #[serde(default, alias = "currentMosaicHistory")]
    pub current_mosaic_color_history: Vec<ColorToken>,
    #[serde(default)]
    pub mosaic_badges: Vec<MosaicBadge>,
    #[serde(default)]
    pub track_progress: BTreeMap<String, TrackProgress>,
}

impl ProgressionState {
    /// State of a freshly provisioned account
    pub fn new() -> Self {
        Self {
            xp: 0,
            level: 1,
            current_mosaic_index: 1,
            current_mosaic_pieces: 0,
            current_mosaic_color_history: Vec::new(),
            mosaic_badges: Vec::new(),
            track_progress: BTreeMap::new(),
        }
    }

    /// Lessons completed on `track_id` (zero if never started)
    pub fn completed_lessons(&self, track_id: &str) -> u32 {
        self.track_progress
            .get(track_id)
            .map(|p| p.completed_lessons)
            .unwrap_or(0)
    }

    /// Pieces across every badge plus the mosaic in progress
    pub fn total_pieces(&self) -> u64 {
        let badged: u64 = self
            .mosaic_badges
            .iter()
            .map(|b| b.color_history.len() as u64)
            .sum();
        badged + u64::from(self.current_mosaic_pieces)
    }

    pub fn latest_badge(&self) -> Option<&MosaicBadge> {
        self.mosaic_badges.last()
    }
}

impl Default for ProgressionState {
    fn default() -> Self {
        Self::new()
    }
}
