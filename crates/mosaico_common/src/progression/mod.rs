//! Progression Module
//!
//! XP, levels, mosaics and badges for a learner account.
//!
//! ## Level System
//!
//! - Cumulative XP thresholds per level, with display titles
//! - XP past the last threshold stays at the level cap
//!
//! ## Mosaics
//!
//! - Each lesson completion adds one piece, tagged with the track color
//! - A full mosaic becomes a permanent badge and the next mosaic starts empty
//! - After the last mosaic, completions still earn XP but no pieces

pub mod engine;
pub mod levels;
pub mod mosaic;
pub mod state;
pub mod tracks;
pub mod view;

pub use engine::{Clock, FixedClock, LessonOutcome, ProgressionEngine, SystemClock};
pub use levels::{LevelEntry, LevelProgress, LevelTable, BUILTIN_LEVELS};
pub use mosaic::{
    mosaic_stars, segment_colors, MosaicCatalog, MosaicEntry, UnknownMosaicIndex,
    BUILTIN_SEGMENTS, EARNED_FALLBACK_COLOR, UNEARNED_COLOR,
};
pub use state::{MosaicBadge, ProgressionState, TrackProgress};
pub use tracks::{ColorToken, TrackCatalog, TrackDefinition};
pub use view::{color_distribution, track_progress_views, ColorCount, MosaicView, TrackProgressView};
