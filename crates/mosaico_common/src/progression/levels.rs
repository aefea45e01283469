//! Level Table
//!
//! Maps cumulative XP to a display level and title. The table is static
//! configuration data: thresholds are cumulative and strictly increasing,
//! and level 1 always starts at 0 XP.
//!
//! XP beyond the last threshold stays at the last level (the level cap).

use crate::error::CatalogError;
use serde::{Deserialize, Serialize};

/// Built-in level thresholds and titles
pub const BUILTIN_LEVELS: &[(u32, u64, &str)] = &[
    (1, 0, "Iniciante"),
    (2, 100, "Aprendiz"),
    (3, 250, "Explorador"),
    (4, 500, "Praticante"),
    (5, 800, "Construtor"),
    (6, 1_200, "Artesão"),
    (7, 1_700, "Especialista"),
    (8, 2_300, "Mestre"),
    (9, 3_000, "Visionário"),
    (10, 4_000, "Mentor"),
    (11, 5_500, "Lenda"),
    (12, 7_500, "Ícone"),
    (13, 10_000, "Titã"),
    (14, 13_000, "Colosso"),
    (15, 16_500, "Oráculo"),
    (16, 20_500, "Arquiteto"),
    (17, 25_000, "Pioneiro"),
    (18, 30_000, "Virtuoso"),
    (19, 36_000, "Iluminado"),
    (20, 43_000, "Sábio"),
    (21, 51_000, "Protetor"),
    (22, 60_000, "Alquimista"),
    (23, 70_000, "Desbravador"),
    (24, 82_000, "Soberano"),
    (25, 95_000, "Guardião"),
    (26, 110_000, "Paradigma"),
    (27, 130_000, "Eminência"),
    (28, 155_000, "Ancestral"),
    (29, 185_000, "Primordial"),
    (30, 220_000, "Ascendente"),
];

/// One row of the level table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelEntry {
    /// Level number (1-based)
    pub level: u32,
    /// Cumulative XP required to reach this level
    pub xp_threshold: u64,
    /// Display title
    pub title: String,
}

/// Progress through the current level, for progress bars
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelProgress {
    pub level: u32,
    pub title: String,
    /// XP earned since reaching the current level
    pub xp_earned_in_level: u64,
    /// XP span of the current level. At the cap this equals
    /// `xp_earned_in_level` so the bar reads as full.
    pub xp_needed_for_level: u64,
    /// 0.0 - 100.0
    pub percent: f64,
}

impl LevelProgress {
    pub fn is_capped(&self) -> bool {
        self.xp_needed_for_level == self.xp_earned_in_level && self.percent >= 100.0
    }
}

/// Validated, ordered level table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelTable {
    entries: Vec<LevelEntry>,
}

impl LevelTable {
    /// Validate entries into a table.
    ///
    /// Levels must be contiguous from 1, level 1 must have threshold 0, and
    /// thresholds must strictly increase.
    pub fn new(entries: Vec<LevelEntry>) -> Result<Self, CatalogError> {
        let first = entries.first().ok_or(CatalogError::EmptyLevelTable)?;
        if first.level != 1 || first.xp_threshold != 0 {
            return Err(CatalogError::BadLevelFloor {
                level: first.level,
                threshold: first.xp_threshold,
            });
        }

        for pair in entries.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            if next.level != prev.level + 1 {
                return Err(CatalogError::LevelOrder {
                    level: next.level,
                    reason: format!("expected level {}", prev.level + 1),
                });
            }
            if next.xp_threshold <= prev.xp_threshold {
                return Err(CatalogError::LevelOrder {
                    level: next.level,
                    reason: format!(
                        "threshold {} is not above {}",
                        next.xp_threshold, prev.xp_threshold
                    ),
                });
            }
        }

        Ok(Self { entries })
    }

    /// The built-in table
    pub fn builtin() -> Self {
        Self {
            entries: BUILTIN_LEVELS
                .iter()
                .map(|&(level, xp_threshold, title)| LevelEntry {
                    level,
                    xp_threshold,
                    title: title.to_string(),
                })
                .collect(),
        }
    }

    pub fn entries(&self) -> &[LevelEntry] {
        &self.entries
    }

    /// Highest defined level
    pub fn max_level(&self) -> u32 {
        self.cap().level
    }

    fn cap(&self) -> &LevelEntry {
        // Non-empty by construction.
        &self.entries[self.entries.len() - 1]
    }

    /// Highest entry whose threshold is at or below `xp`.
    pub fn level_for_xp(&self, xp: u64) -> &LevelEntry {
        let reached = self.entries.partition_point(|e| e.xp_threshold <= xp);
        // Level 1 has threshold 0, so at least one entry is always reached.
        &self.entries[reached.saturating_sub(1)]
    }

    /// Title for a level number, if the table defines it
    pub fn title_for(&self, level: u32) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.level == level)
            .map(|e| e.title.as_str())
    }

    /// Progress within the level implied by `xp`
    pub fn progress_within_level(&self, xp: u64) -> LevelProgress {
        let current = self.level_for_xp(xp);
        let xp_earned_in_level = xp - current.xp_threshold;

        let next = self.entries.iter().find(|e| e.level == current.level + 1);
        let (xp_needed_for_level, percent) = match next {
            Some(next) => {
                let span = next.xp_threshold - current.xp_threshold;
                let percent = (xp_earned_in_level as f64 / span as f64) * 100.0;
                (span, percent.min(100.0))
            }
            None => (xp_earned_in_level, 100.0),
        };

        LevelProgress {
            level: current.level,
            title: current.title.clone(),
            xp_earned_in_level,
            xp_needed_for_level,
            percent,
        }
    }

    /// XP still missing for the next level; `None` at the cap
    pub fn xp_to_next_level(&self, xp: u64) -> Option<u64> {
        let current = self.level_for_xp(xp);
        self.entries
            .iter()
            .find(|e| e.level == current.level + 1)
            .map(|next| next.xp_threshold - xp)
    }
}

impl Default for LevelTable {
    fn default() -> Self {
        Self::builtin()
    }
}
