//! Progression engine for the Mosaico learning app.
//!
//! Converts lesson completions into durable account state: XP, levels,
//! mosaic pieces and mosaic badges. The engine itself is pure; the `sync`
//! module holds the boundary with the backend document store.

pub mod catalog;
pub mod error;
pub mod progression;
pub mod recommend;
pub mod sync;

pub use catalog::{Catalogs, CATALOG_ENV};
pub use error::{CatalogError, EngineError, StoreError, SyncError};
pub use progression::{
    LessonOutcome, LevelProgress, LevelTable, MosaicBadge, MosaicCatalog, ProgressionEngine,
    ProgressionState, TrackCatalog, TrackProgress,
};
pub use recommend::{recommend_tracks, Recommender};
pub use sync::{InMemorySyncAdapter, ProgressionDocument, ProgressionStore, StatePatch, SyncAdapter};
