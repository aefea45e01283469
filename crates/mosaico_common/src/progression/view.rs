//! Read-only projections of a [`ProgressionState`] for display layers.
//!
//! Renderers consume these as plain data; nothing here draws anything.

use super::mosaic::{mosaic_stars, segment_colors, MosaicCatalog};
use super::state::ProgressionState;
use super::tracks::{ColorToken, TrackCatalog};
use serde::Serialize;
use std::collections::HashMap;

/// The mosaic currently being built
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MosaicView {
    pub mosaic_index: u32,
    pub pieces: u32,
    /// `None` once every mosaic is complete
    pub total_segments: Option<u32>,
    /// One fill per segment; empty in mastery
    pub segment_colors: Vec<ColorToken>,
    pub percent: f64,
    pub stars: u8,
    pub mastery: bool,
}

impl MosaicView {
    pub fn from_state(state: &ProgressionState, mosaics: &MosaicCatalog) -> Self {
        let total_segments = mosaics.get(state.current_mosaic_index);
        let segment_colors = total_segments
            .map(|total| {
                segment_colors(
                    state.current_mosaic_pieces,
                    &state.current_mosaic_color_history,
                    total,
                )
            })
            .unwrap_or_default();
        let percent = match total_segments {
            Some(total) => (f64::from(state.current_mosaic_pieces) / f64::from(total) * 100.0).min(100.0),
            None => 100.0,
        };

        Self {
            mosaic_index: state.current_mosaic_index,
            pieces: state.current_mosaic_pieces,
            total_segments,
            segment_colors,
            percent,
            stars: mosaic_stars(state.total_pieces()),
            mastery: mosaics.is_mastery_reached(&state.mosaic_badges),
        }
    }
}

/// How many pieces were earned in one color
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColorCount {
    pub color: ColorToken,
    pub count: u64,
}

/// Color usage across the current mosaic and every badge.
///
/// Colors are normalized (trimmed, upper-cased) before counting; blank
/// entries are skipped. Sorted by count, most used first, ties by color.
pub fn color_distribution(state: &ProgressionState) -> Vec<ColorCount> {
    let mut counts: HashMap<ColorToken, u64> = HashMap::new();
    let all = state
        .current_mosaic_color_history
        .iter()
        .chain(state.mosaic_badges.iter().flat_map(|b| b.color_history.iter()));

    for color in all {
        let key = color.normalized();
        if key.as_str().is_empty() {
            continue;
        }
        *counts.entry(key).or_insert(0) += 1;
    }

    let mut entries: Vec<ColorCount> = counts
        .into_iter()
        .map(|(color, count)| ColorCount { color, count })
        .collect();
    entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.color.cmp(&b.color)));
    entries
}

/// Progress through one catalog track
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackProgressView {
    pub track_id: String,
    pub title: String,
    pub completed_lessons: u32,
    pub total_lessons: u32,
    /// Rounded, 0-100
    pub percent: u8,
    pub is_complete: bool,
}

/// One view per catalog track, in catalog order
pub fn track_progress_views(state: &ProgressionState, tracks: &TrackCatalog) -> Vec<TrackProgressView> {
    tracks
        .tracks()
        .iter()
        .map(|track| {
            let completed = state.completed_lessons(&track.track_id);
            let ratio = f64::from(completed.min(track.total_lessons)) / f64::from(track.total_lessons);
            TrackProgressView {
                track_id: track.track_id.clone(),
                title: track.title.clone(),
                completed_lessons: completed,
                total_lessons: track.total_lessons,
                percent: (ratio * 100.0).round() as u8,
                is_complete: completed >= track.total_lessons,
            }
        })
        .collect()
}
