//! Mosaic Catalog
//!
//! Number of segments required to complete each mosaic. Indices are
//! contiguous from 1; past the last index the account has reached mastery.

use super::state::MosaicBadge;
use super::tracks::ColorToken;
use crate::error::CatalogError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Built-in segment counts, by mosaic index
pub const BUILTIN_SEGMENTS: &[u32] = &[9, 26, 40, 60, 80];

/// Fill for a segment that was earned but has no recorded color
pub const EARNED_FALLBACK_COLOR: &str = "#A3E6D5";

/// Fill for a segment that has not been earned yet
pub const UNEARNED_COLOR: &str = "#555555";

/// Star tiers over total pieces, highest first
const STAR_TIERS: &[(u64, u8)] = &[(61, 5), (37, 4), (21, 3), (9, 2), (1, 1)];

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Unknown mosaic index {index} (catalog defines 1..={max})")]
pub struct UnknownMosaicIndex {
    pub index: u32,
    pub max: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MosaicEntry {
    pub mosaic_index: u32,
    pub segment_count: u32,
}

/// Validated mosaic catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MosaicCatalog {
    entries: Vec<MosaicEntry>,
}

impl MosaicCatalog {
    pub fn new(entries: Vec<MosaicEntry>) -> Result<Self, CatalogError> {
        if entries.is_empty() {
            return Err(CatalogError::EmptyMosaicCatalog);
        }
        for (pos, entry) in entries.iter().enumerate() {
            let expected = pos as u32 + 1;
            if entry.mosaic_index != expected {
                return Err(CatalogError::MosaicGap {
                    expected,
                    found: entry.mosaic_index,
                });
            }
            if entry.segment_count == 0 {
                return Err(CatalogError::ZeroSegments(entry.mosaic_index));
            }
        }
        Ok(Self { entries })
    }

    pub fn builtin() -> Self {
        Self {
            entries: BUILTIN_SEGMENTS
                .iter()
                .enumerate()
                .map(|(pos, &segment_count)| MosaicEntry {
                    mosaic_index: pos as u32 + 1,
                    segment_count,
                })
                .collect(),
        }
    }

    pub fn entries(&self) -> &[MosaicEntry] {
        &self.entries
    }

    /// Highest defined mosaic index
    pub fn max_index(&self) -> u32 {
        self.entries.len() as u32
    }

    pub fn total_mosaics(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, mosaic_index: u32) -> Option<u32> {
        let pos = (mosaic_index as usize).checked_sub(1)?;
        self.entries.get(pos).map(|e| e.segment_count)
    }

    pub fn segment_count_for(&self, mosaic_index: u32) -> Result<u32, UnknownMosaicIndex> {
        self.get(mosaic_index).ok_or(UnknownMosaicIndex {
            index: mosaic_index,
            max: self.max_index(),
        })
    }

    /// True once a badge exists for every defined mosaic
    pub fn is_mastery_reached(&self, badges: &[MosaicBadge]) -> bool {
        badges.len() >= self.total_mosaics()
    }

    /// True when `mosaic_index` points past the last defined mosaic
    pub fn is_past_last(&self, mosaic_index: u32) -> bool {
        mosaic_index > self.max_index()
    }
}

impl Default for MosaicCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Star rating (0-5) for the total number of pieces ever earned
pub fn mosaic_stars(total_pieces: u64) -> u8 {
    STAR_TIERS
        .iter()
        .find(|(min, _)| total_pieces >= *min)
        .map(|&(_, stars)| stars)
        .unwrap_or(0)
}

/// Fill color of every segment of a mosaic, for renderers.
///
/// Segments covered by `history` use the recorded color. Segments counted in
/// `pieces` but missing from `history` use [`EARNED_FALLBACK_COLOR`]. The
/// rest use [`UNEARNED_COLOR`]. Always returns `total_segments` entries.
pub fn segment_colors(pieces: u32, history: &[ColorToken], total_segments: u32) -> Vec<ColorToken> {
    (0..total_segments as usize)
        .map(|i| match history.get(i) {
            Some(color) => color.clone(),
            None if i < pieces as usize => ColorToken::from(EARNED_FALLBACK_COLOR),
            None => ColorToken::from(UNEARNED_COLOR),
        })
        .collect()
}
