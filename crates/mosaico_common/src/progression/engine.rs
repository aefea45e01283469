//! Progression Engine
//!
//! Turns a lesson completion into the next [`ProgressionState`]: track
//! progress, XP, level, mosaic pieces and, when a mosaic fills up, the badge
//! plus rollover into the next mosaic.
//!
//! The engine keeps no state between calls. Callers own the state value and
//! must submit each genuine completion exactly once; the engine has no
//! memory with which to deduplicate.

use super::state::{MosaicBadge, ProgressionState, TrackProgress};
use crate::catalog::Catalogs;
use crate::error::EngineError;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Source of badge completion timestamps
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to one instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Everything that changed because of one lesson completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonOutcome {
    pub state: ProgressionState,
    pub track_id: String,
    pub xp_gained: u64,
    pub level_before: u32,
    pub level_after: u32,
    /// False once every mosaic is complete
    pub piece_awarded: bool,
    /// Badge issued by this completion, if it filled a mosaic
    pub new_badge: Option<MosaicBadge>,
    /// This completion filled the last defined mosaic
    pub mastery_reached: bool,
}

impl LessonOutcome {
    pub fn leveled_up(&self) -> bool {
        self.level_after > self.level_before
    }
}

#[derive(Clone)]
pub struct ProgressionEngine {
    catalogs: Arc<Catalogs>,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for ProgressionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressionEngine")
            .field("catalogs", &self.catalogs)
            .finish_non_exhaustive()
    }
}

impl ProgressionEngine {
    pub fn new(catalogs: Arc<Catalogs>) -> Self {
        Self::with_clock(catalogs, Arc::new(SystemClock))
    }

    pub fn with_clock(catalogs: Arc<Catalogs>, clock: Arc<dyn Clock>) -> Self {
        Self { catalogs, clock }
    }

    pub fn catalogs(&self) -> &Catalogs {
        &self.catalogs
    }

    /// Apply one lesson completion and return only the next state.
    pub fn apply_lesson_completion(
        &self,
        state: &ProgressionState,
        track_id: &str,
    ) -> Result<ProgressionState, EngineError> {
        self.complete_lesson(state, track_id).map(|outcome| outcome.state)
    }

    /// Apply one lesson completion.
    ///
    /// On error `state` is untouched and no partial result exists.
    pub fn complete_lesson(
        &self,
        state: &ProgressionState,
        track_id: &str,
    ) -> Result<LessonOutcome, EngineError> {
        let Some(track) = self.catalogs.tracks.get(track_id) else {
            warn!(track_id, "Rejected completion for unknown track");
            return Err(EngineError::UnknownTrack(track_id.to_string()));
        };

        let completed = state.completed_lessons(track_id);
        if completed >= track.total_lessons {
            warn!(
                track_id,
                completed,
                total = track.total_lessons,
                "Rejected completion for finished track"
            );
            return Err(EngineError::TrackAlreadyComplete {
                track_id: track_id.to_string(),
                total_lessons: track.total_lessons,
            });
        }

        let mut next = state.clone();

        let progress = next
            .track_progress
            .entry(track_id.to_string())
            .or_insert_with(|| TrackProgress::new(track_id));
        progress.track_id = track_id.to_string();
        progress.completed_lessons = completed + 1;

        let level_before = self.catalogs.levels.level_for_xp(state.xp).level;
        next.xp = next.xp.saturating_add(track.reward_xp);
        next.level = self.catalogs.levels.level_for_xp(next.xp).level;

        let mut piece_awarded = false;
        let mut new_badge = None;
        let mut mastery_reached = false;

        let mosaics = &self.catalogs.mosaics;
        if next.current_mosaic_index > mosaics.max_index() + 1 {
            return Err(violation(format!(
                "mosaic {} is beyond the last defined mosaic {}",
                next.current_mosaic_index,
                mosaics.max_index()
            )));
        }
        if !mosaics.is_past_last(next.current_mosaic_index) {
            let capacity = mosaics
                .segment_count_for(next.current_mosaic_index)
                .map_err(|e| EngineError::InvariantViolation(e.to_string()))?;
            if next.current_mosaic_pieces >= capacity {
                return Err(EngineError::InvariantViolation(format!(
                    "mosaic {} already holds {} of {} pieces",
                    next.current_mosaic_index, next.current_mosaic_pieces, capacity
                )));
            }

            next.current_mosaic_color_history.push(track.color.clone());
            next.current_mosaic_pieces += 1;
            piece_awarded = true;

            if next.current_mosaic_pieces == capacity {
                let badge = self.roll_over(&mut next);
                mastery_reached = mosaics.is_past_last(next.current_mosaic_index);
                if mastery_reached {
                    info!(badges = next.mosaic_badges.len(), "Mosaic mastery reached");
                }
                new_badge = Some(badge);
            }
        }

        if next.level > level_before {
            info!(from = level_before, to = next.level, xp = next.xp, "Level up");
        }
        debug!(
            track_id,
            xp = next.xp,
            level = next.level,
            mosaic = next.current_mosaic_index,
            pieces = next.current_mosaic_pieces,
            "Applied lesson completion"
        );

        let level_after = next.level;
        Ok(LessonOutcome {
            state: next,
            track_id: track_id.to_string(),
            xp_gained: track.reward_xp,
            level_before,
            level_after,
            piece_awarded,
            new_badge,
            mastery_reached,
        })
    }

    /// Badge the full mosaic and start the next one empty.
    fn roll_over(&self, state: &mut ProgressionState) -> MosaicBadge {
        let badge = MosaicBadge {
            mosaic_index: state.current_mosaic_index,
            completed_at: self.clock.now(),
            color_history: std::mem::take(&mut state.current_mosaic_color_history),
        };
        state.mosaic_badges.push(badge.clone());
        state.current_mosaic_index += 1;
        state.current_mosaic_pieces = 0;

        info!(
            mosaic = badge.mosaic_index,
            segments = badge.color_history.len(),
            "Mosaic completed"
        );
        badge
    }

    /// Normalize state received from the synchronization layer.
    ///
    /// The cached level is recomputed from XP and missing track ids are
    /// filled from their map keys. Anything that cannot be normalized without
    /// guessing is reported as `InvariantViolation`.
    pub fn reconcile(&self, state: &ProgressionState) -> Result<ProgressionState, EngineError> {
        let mut next = state.clone();

        let level = self.catalogs.levels.level_for_xp(next.xp).level;
        if level != next.level {
            warn!(stored = next.level, derived = level, xp = next.xp, "Repaired cached level");
            next.level = level;
        }

        if next.current_mosaic_color_history.len() != next.current_mosaic_pieces as usize {
            return Err(violation(format!(
                "mosaic {} has {} pieces but {} colors",
                next.current_mosaic_index,
                next.current_mosaic_pieces,
                next.current_mosaic_color_history.len()
            )));
        }

        self.check_badges(&next)?;
        self.check_current_mosaic(&next)?;

        for (key, progress) in next.track_progress.iter_mut() {
            if progress.track_id.is_empty() {
                progress.track_id = key.clone();
            } else if progress.track_id != *key {
                return Err(violation(format!(
                    "track progress under {} is labelled {}",
                    key, progress.track_id
                )));
            }

            match self.catalogs.tracks.get(key) {
                Some(track) if progress.completed_lessons > track.total_lessons => {
                    return Err(violation(format!(
                        "track {} has {} of {} lessons completed",
                        key, progress.completed_lessons, track.total_lessons
                    )));
                }
                Some(_) => {}
                None => debug!(track_id = %key, "Keeping progress for track missing from catalog"),
            }
        }

        Ok(next)
    }

    fn check_badges(&self, state: &ProgressionState) -> Result<(), EngineError> {
        for (pos, badge) in state.mosaic_badges.iter().enumerate() {
            let expected = pos as u32 + 1;
            if badge.mosaic_index != expected {
                return Err(violation(format!(
                    "badge at position {} is for mosaic {} (expected {})",
                    pos, badge.mosaic_index, expected
                )));
            }
            if let Some(segments) = self.catalogs.mosaics.get(badge.mosaic_index) {
                if badge.color_history.len() != segments as usize {
                    return Err(violation(format!(
                        "badge for mosaic {} has {} colors but the mosaic has {} segments",
                        badge.mosaic_index,
                        badge.color_history.len(),
                        segments
                    )));
                }
            }
        }
        Ok(())
    }

    fn check_current_mosaic(&self, state: &ProgressionState) -> Result<(), EngineError> {
        let expected = state.mosaic_badges.len() as u32 + 1;
        if state.current_mosaic_index != expected {
            return Err(violation(format!(
                "current mosaic is {} but {} badges are recorded",
                state.current_mosaic_index,
                state.mosaic_badges.len()
            )));
        }

        let mosaics = &self.catalogs.mosaics;
        match mosaics.get(state.current_mosaic_index) {
            Some(capacity) if state.current_mosaic_pieces >= capacity => Err(violation(format!(
                "mosaic {} holds {} pieces at rest (capacity {})",
                state.current_mosaic_index, state.current_mosaic_pieces, capacity
            ))),
            Some(_) => Ok(()),
            None if state.current_mosaic_index == mosaics.max_index() + 1 => {
                if state.current_mosaic_pieces == 0 {
                    Ok(())
                } else {
                    Err(violation(format!(
                        "mastery state holds {} idle pieces",
                        state.current_mosaic_pieces
                    )))
                }
            }
            None => Err(violation(format!(
                "mosaic {} is beyond the last defined mosaic {}",
                state.current_mosaic_index,
                mosaics.max_index()
            ))),
        }
    }
}

fn violation(detail: String) -> EngineError {
    tracing::error!(%detail, "Progression invariant violated");
    EngineError::InvariantViolation(detail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progression::mosaic::{MosaicCatalog, MosaicEntry};
    use crate::progression::tracks::ColorToken;
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 9, 30, 0).unwrap()
    }

    fn engine() -> ProgressionEngine {
        ProgressionEngine::with_clock(
            Arc::new(Catalogs::builtin()),
            Arc::new(FixedClock(fixed_time())),
        )
    }

    fn tiny_engine() -> ProgressionEngine {
        let mut catalogs = Catalogs::builtin();
        catalogs.mosaics = MosaicCatalog::new(vec![
            MosaicEntry { mosaic_index: 1, segment_count: 2 },
            MosaicEntry { mosaic_index: 2, segment_count: 1 },
        ])
        .unwrap();
        ProgressionEngine::with_clock(Arc::new(catalogs), Arc::new(FixedClock(fixed_time())))
    }

    #[test]
    fn test_single_completion() {
        let engine = engine();
        let outcome = engine
            .complete_lesson(&ProgressionState::new(), "ia-fundamentos")
            .unwrap();

        let s = &outcome.state;
        assert_eq!(s.xp, 80);
        assert_eq!(s.level, 1);
        assert_eq!(s.current_mosaic_pieces, 1);
        assert_eq!(s.current_mosaic_color_history, vec![ColorToken::from("#4DB6AC")]);
        assert_eq!(s.track_progress["ia-fundamentos"].completed_lessons, 1);
        assert_eq!(s.track_progress["ia-fundamentos"].track_id, "ia-fundamentos");
        assert_eq!(outcome.xp_gained, 80);
        assert!(outcome.piece_awarded);
        assert!(outcome.new_badge.is_none());
        assert!(!outcome.leveled_up());
    }

    #[test]
    fn test_level_up_is_reported() {
        let engine = engine();
        let first = engine.complete_lesson(&ProgressionState::new(), "ia-fundamentos").unwrap();
        let second = engine.complete_lesson(&first.state, "ia-fundamentos").unwrap();
        assert_eq!(second.state.xp, 160);
        assert_eq!(second.level_before, 1);
        assert_eq!(second.level_after, 2);
        assert!(second.leveled_up());
    }

    #[test]
    fn test_large_reward_jumps_several_levels() {
        let mut catalogs = Catalogs::builtin();
        let mut tracks = catalogs.tracks.tracks().to_vec();
        tracks[0].reward_xp = 1_000;
        catalogs.tracks = crate::progression::tracks::TrackCatalog::new(tracks).unwrap();
        let engine = ProgressionEngine::new(Arc::new(catalogs));

        let outcome = engine.complete_lesson(&ProgressionState::new(), "ia-fundamentos").unwrap();
        assert_eq!(outcome.state.level, 5);
        assert_eq!(outcome.level_after - outcome.level_before, 4);
    }

    #[test]
    fn test_unknown_track_leaves_state_alone() {
        let engine = engine();
        let state = ProgressionState::new();
        let err = engine.apply_lesson_completion(&state, "culinaria").unwrap_err();
        assert_eq!(err, EngineError::UnknownTrack("culinaria".into()));
        assert_eq!(state, ProgressionState::new());
    }

    #[test]
    fn test_finished_track_is_rejected() {
        let engine = engine();
        let mut state = ProgressionState::new();
        for _ in 0..6 {
            state = engine.apply_lesson_completion(&state, "esg-sustentabilidade").unwrap();
        }
        let err = engine
            .apply_lesson_completion(&state, "esg-sustentabilidade")
            .unwrap_err();
        assert_eq!(
            err,
            EngineError::TrackAlreadyComplete {
                track_id: "esg-sustentabilidade".into(),
                total_lessons: 6
            }
        );
    }

    #[test]
    fn test_rollover_and_mastery() {
        let engine = tiny_engine();
        let mut state = ProgressionState::new();

        let outcome = engine.complete_lesson(&state, "ia-fundamentos").unwrap();
        state = outcome.state;
        let outcome = engine.complete_lesson(&state, "esg-sustentabilidade").unwrap();
        let badge = outcome.new_badge.clone().unwrap();
        assert_eq!(badge.mosaic_index, 1);
        assert_eq!(badge.completed_at, fixed_time());
        assert_eq!(
            badge.color_history,
            vec![ColorToken::from("#4DB6AC"), ColorToken::from("#FFD54F")]
        );
        assert!(!outcome.mastery_reached);
        state = outcome.state;
        assert_eq!(state.current_mosaic_index, 2);
        assert_eq!(state.current_mosaic_pieces, 0);
        assert!(state.current_mosaic_color_history.is_empty());

        let outcome = engine.complete_lesson(&state, "ia-fundamentos").unwrap();
        assert!(outcome.mastery_reached);
        state = outcome.state;
        assert_eq!(state.current_mosaic_index, 3);
        assert_eq!(state.mosaic_badges.len(), 2);
        assert!(engine.catalogs().mosaics.is_mastery_reached(&state.mosaic_badges));

        // Past mastery: XP and track progress still count, pieces do not
        let outcome = engine.complete_lesson(&state, "ia-fundamentos").unwrap();
        assert!(!outcome.piece_awarded);
        assert!(outcome.new_badge.is_none());
        assert!(!outcome.mastery_reached);
        assert_eq!(outcome.state.xp, state.xp + 80);
        assert_eq!(outcome.state.current_mosaic_index, 3);
        assert_eq!(outcome.state.current_mosaic_pieces, 0);
        assert_eq!(outcome.state.mosaic_badges.len(), 2);
        assert_eq!(outcome.state.completed_lessons("ia-fundamentos"), 3);
    }

    #[test]
    fn test_overfull_mosaic_is_an_invariant_violation() {
        let engine = tiny_engine();
        let mut state = ProgressionState::new();
        state.current_mosaic_pieces = 2;
        state.current_mosaic_color_history = vec![ColorToken::from("#000000"); 2];
        let err = engine.apply_lesson_completion(&state, "ia-fundamentos").unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_index_beyond_mastery_is_rejected_like_reconcile() {
        let engine = tiny_engine();
        let mut state = ProgressionState::new();
        // Two mosaics defined, so 3 is mastery and 4 is out of range
        state.current_mosaic_index = 3;
        assert!(engine.apply_lesson_completion(&state, "ia-fundamentos").is_ok());

        state.current_mosaic_index = 4;
        let err = engine.apply_lesson_completion(&state, "ia-fundamentos").unwrap_err();
        assert!(matches!(err, EngineError::InvariantViolation(_)));
        assert!(engine.reconcile(&state).unwrap_err().is_fatal());
    }

    #[test]
    fn test_reconcile_repairs_level_and_track_ids() {
        let engine = engine();
        let mut state = ProgressionState::new();
        state.xp = 900;
        state.level = 2;
        state.track_progress.insert(
            "esg-sustentabilidade".into(),
            TrackProgress { track_id: String::new(), completed_lessons: 3 },
        );

        let fixed = engine.reconcile(&state).unwrap();
        assert_eq!(fixed.level, 5);
        assert_eq!(fixed.track_progress["esg-sustentabilidade"].track_id, "esg-sustentabilidade");
        assert_eq!(engine.reconcile(&fixed).unwrap(), fixed);
    }

    #[test]
    fn test_reconcile_rejects_parity_mismatch() {
        let engine = engine();
        let mut state = ProgressionState::new();
        state.current_mosaic_pieces = 2;
        state.current_mosaic_color_history = vec![ColorToken::from("#4DB6AC")];
        let err = engine.reconcile(&state).unwrap_err();
        assert!(matches!(err, EngineError::InvariantViolation(_)));
    }

    #[test]
    fn test_reconcile_rejects_badge_disorder() {
        let engine = tiny_engine();
        let badge = |index: u32, len: usize| MosaicBadge {
            mosaic_index: index,
            completed_at: fixed_time(),
            color_history: vec![ColorToken::from("#4DB6AC"); len],
        };

        let mut state = ProgressionState::new();
        state.mosaic_badges = vec![badge(2, 1), badge(1, 2)];
        state.current_mosaic_index = 3;
        assert!(engine.reconcile(&state).is_err());

        state.mosaic_badges = vec![badge(1, 2), badge(1, 2)];
        assert!(engine.reconcile(&state).is_err());

        state.mosaic_badges = vec![badge(1, 2), badge(2, 1)];
        assert!(engine.reconcile(&state).is_ok());

        // Badge length must match the mosaic's segment count
        state.mosaic_badges = vec![badge(1, 3), badge(2, 1)];
        assert!(engine.reconcile(&state).is_err());
    }

    #[test]
    fn test_reconcile_rejects_index_out_of_step() {
        let engine = engine();
        let mut state = ProgressionState::new();
        state.current_mosaic_index = 2;
        assert!(engine.reconcile(&state).is_err());

        let mut state = ProgressionState::new();
        state.current_mosaic_pieces = 9;
        state.current_mosaic_color_history = vec![ColorToken::from("#4DB6AC"); 9];
        assert!(engine.reconcile(&state).is_err());
    }

    #[test]
    fn test_reconcile_rejects_overcompleted_track() {
        let engine = engine();
        let mut state = ProgressionState::new();
        state.track_progress.insert(
            "esg-sustentabilidade".into(),
            TrackProgress { track_id: "esg-sustentabilidade".into(), completed_lessons: 7 },
        );
        assert!(engine.reconcile(&state).is_err());

        // Tracks no longer in the catalog are kept as-is
        let mut state = ProgressionState::new();
        state.track_progress.insert(
            "retired".into(),
            TrackProgress { track_id: "retired".into(), completed_lessons: 99 },
        );
        assert_eq!(engine.reconcile(&state).unwrap(), state);
    }
}
