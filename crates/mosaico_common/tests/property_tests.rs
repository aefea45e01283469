//! Property-based tests for the progression engine.
//!
//! Verifies invariants across random completion sequences:
//! - level is monotonic in XP and always matches the stored XP
//! - current mosaic pieces match the color history length
//! - each mosaic index is badged at most once, in order
//! - a rollover always leaves an empty mosaic behind
//! - reconciliation is idempotent

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use proptest::prelude::*;

use mosaico_common::progression::{
    ColorToken, FixedClock, LevelTable, MosaicCatalog, MosaicEntry, ProgressionEngine,
    ProgressionState, TrackCatalog, TrackDefinition,
};
use mosaico_common::{Catalogs, EngineError};

// =============================================================================
// Fixtures
// =============================================================================

const TRACK_IDS: &[&str] = &["alpha", "beta", "gamma", "ghost"];

/// Small mosaics and generous lessons so sequences reach mastery
fn small_catalogs() -> Catalogs {
    let mosaics = MosaicCatalog::new(
        [3, 2, 5]
            .iter()
            .enumerate()
            .map(|(pos, &segment_count)| MosaicEntry {
                mosaic_index: pos as u32 + 1,
                segment_count,
            })
            .collect(),
    )
    .unwrap();

    let tracks = TrackCatalog::new(vec![
        track("alpha", 20, 35, "#4DB6AC"),
        track("beta", 6, 120, "#D1C4E9"),
        track("gamma", 15, 0, "#FFD54F"),
    ])
    .unwrap();

    Catalogs::new(LevelTable::builtin(), mosaics, tracks)
}

fn track(id: &str, total_lessons: u32, reward_xp: u64, color: &str) -> TrackDefinition {
    TrackDefinition {
        track_id: id.to_string(),
        title: id.to_string(),
        area: "Tech".to_string(),
        total_lessons,
        reward_xp,
        color: ColorToken::from(color),
        tags: Vec::new(),
    }
}

fn engine() -> ProgressionEngine {
    let clock = FixedClock(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
    ProgressionEngine::with_clock(Arc::new(small_catalogs()), Arc::new(clock))
}

// =============================================================================
// Strategies
// =============================================================================

fn arb_events() -> impl Strategy<Value = Vec<&'static str>> {
    prop::collection::vec(prop::sample::select(TRACK_IDS), 0..60)
}

fn check_invariants(engine: &ProgressionEngine, state: &ProgressionState) {
    let catalogs = engine.catalogs();
    assert_eq!(state.level, catalogs.levels.level_for_xp(state.xp).level);
    assert_eq!(
        state.current_mosaic_color_history.len(),
        state.current_mosaic_pieces as usize
    );
    match catalogs.mosaics.get(state.current_mosaic_index) {
        Some(capacity) => assert!(state.current_mosaic_pieces < capacity),
        None => {
            assert_eq!(state.current_mosaic_index, catalogs.mosaics.max_index() + 1);
            assert_eq!(state.current_mosaic_pieces, 0);
        }
    }
    for (pos, badge) in state.mosaic_badges.iter().enumerate() {
        assert_eq!(badge.mosaic_index, pos as u32 + 1);
    }
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #[test]
    fn level_is_monotonic_in_xp(a in 0u64..400_000, b in 0u64..400_000) {
        let table = LevelTable::builtin();
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(table.level_for_xp(lo).level <= table.level_for_xp(hi).level);
    }

    #[test]
    fn progress_percent_stays_in_range(xp in 0u64..500_000) {
        let progress = LevelTable::builtin().progress_within_level(xp);
        prop_assert!(progress.percent >= 0.0 && progress.percent <= 100.0);
        prop_assert!(progress.xp_earned_in_level <= progress.xp_needed_for_level);
    }

    #[test]
    fn invariants_hold_after_any_event_sequence(events in arb_events()) {
        let engine = engine();
        let mut state = ProgressionState::new();

        for track_id in events {
            let before = state.clone();
            match engine.complete_lesson(&state, track_id) {
                Ok(outcome) => {
                    prop_assert!(outcome.state.xp >= before.xp);
                    if outcome.new_badge.is_some() {
                        prop_assert_eq!(outcome.state.current_mosaic_pieces, 0);
                        prop_assert!(outcome.state.current_mosaic_color_history.is_empty());
                        prop_assert_eq!(
                            outcome.state.mosaic_badges.len(),
                            before.mosaic_badges.len() + 1
                        );
                    }
                    state = outcome.state;
                }
                Err(EngineError::UnknownTrack(id)) => prop_assert_eq!(id, "ghost"),
                Err(EngineError::TrackAlreadyComplete { .. }) => {}
                Err(other) => prop_assert!(false, "unexpected error {:?}", other),
            }
            check_invariants(&engine, &state);
        }
    }

    #[test]
    fn each_mosaic_is_badged_at_most_once(events in arb_events()) {
        let engine = engine();
        let state = events.iter().fold(ProgressionState::new(), |s, id| {
            engine.apply_lesson_completion(&s, id).unwrap_or(s)
        });

        for index in 1..=engine.catalogs().mosaics.max_index() {
            let count = state.mosaic_badges.iter().filter(|b| b.mosaic_index == index).count();
            prop_assert!(count <= 1);
        }
        for badge in &state.mosaic_badges {
            let segments = engine.catalogs().mosaics.segment_count_for(badge.mosaic_index).unwrap();
            prop_assert_eq!(badge.color_history.len(), segments as usize);
        }
    }

    #[test]
    fn reconcile_is_idempotent_on_engine_output(events in arb_events(), stale_level in 1u32..40) {
        let engine = engine();
        let mut state = events.iter().fold(ProgressionState::new(), |s, id| {
            engine.apply_lesson_completion(&s, id).unwrap_or(s)
        });
        state.level = stale_level;

        let once = engine.reconcile(&state).unwrap();
        let twice = engine.reconcile(&once).unwrap();
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn reconcile_is_idempotent_or_rejects(
        xp in 0u64..300_000,
        level in 0u32..50,
        pieces in 0u32..6,
        colors in 0usize..6,
        index in 1u32..6,
    ) {
        let engine = engine();
        let mut state = ProgressionState::new();
        state.xp = xp;
        state.level = level;
        state.current_mosaic_index = index;
        state.current_mosaic_pieces = pieces;
        state.current_mosaic_color_history = vec![ColorToken::from("#4DB6AC"); colors];

        if let Ok(once) = engine.reconcile(&state) {
            prop_assert_eq!(engine.reconcile(&once).unwrap(), once.clone());
            check_invariants(&engine, &once);
        }
    }

    #[test]
    fn rejected_events_leave_state_untouched(events in arb_events()) {
        let engine = engine();
        let mut state = ProgressionState::new();
        for track_id in events {
            let snapshot = state.clone();
            match engine.apply_lesson_completion(&state, track_id) {
                Ok(next) => state = next,
                Err(_) => prop_assert_eq!(&state, &snapshot),
            }
        }
    }
}

#[test]
fn mastery_stops_pieces_but_not_xp() {
    let engine = engine();
    let mut state = ProgressionState::new();
    // 3 + 2 + 5 pieces fill every mosaic
    for _ in 0..10 {
        state = engine.apply_lesson_completion(&state, "alpha").unwrap();
    }
    assert_eq!(state.mosaic_badges.len(), 3);
    assert!(engine.catalogs().mosaics.is_mastery_reached(&state.mosaic_badges));
    assert_eq!(state.current_mosaic_index, 4);

    let outcome = engine.complete_lesson(&state, "beta").unwrap();
    assert!(!outcome.piece_awarded);
    assert_eq!(outcome.state.xp, state.xp + 120);
    assert_eq!(outcome.state.mosaic_badges.len(), 3);
    assert_eq!(outcome.state.current_mosaic_pieces, 0);
    check_invariants(&engine, &outcome.state);
}
