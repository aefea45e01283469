//! Error types for the progression engine and its collaborators.

use thiserror::Error;

/// Failures reported by the progression engine.
///
/// `UnknownTrack` and `TrackAlreadyComplete` are input-validation errors: the
/// caller should re-fetch authoritative state and not resubmit the event.
/// `InvariantViolation` means state arrived that no valid sequence of
/// completions could have produced, and is surfaced for diagnostics.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Unknown track: {0}")]
    UnknownTrack(String),

    #[error("Track {track_id} already has all {total_lessons} lessons completed")]
    TrackAlreadyComplete { track_id: String, total_lessons: u32 },

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
}

impl EngineError {
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::UnknownTrack(_) => "unknown_track",
            EngineError::TrackAlreadyComplete { .. } => "track_already_complete",
            EngineError::InvariantViolation(_) => "invariant_violation",
        }
    }

    /// Fatal errors point at a catalog or adapter bug rather than bad input.
    pub fn is_fatal(&self) -> bool {
        matches!(self, EngineError::InvariantViolation(_))
    }

    /// The engine performs no I/O, so nothing it reports is worth retrying
    /// unchanged.
    pub fn is_retryable(&self) -> bool {
        false
    }
}

/// Failures while loading or validating the static catalogs.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Level table is empty")]
    EmptyLevelTable,

    #[error("Level table must start at level 1 with threshold 0 (found level {level}, threshold {threshold})")]
    BadLevelFloor { level: u32, threshold: u64 },

    #[error("Level {level} breaks the level table ordering: {reason}")]
    LevelOrder { level: u32, reason: String },

    #[error("Mosaic catalog is empty")]
    EmptyMosaicCatalog,

    #[error("Mosaic index {found} is out of sequence (expected {expected})")]
    MosaicGap { expected: u32, found: u32 },

    #[error("Mosaic {0} has zero segments")]
    ZeroSegments(u32),

    #[error("Track catalog is empty")]
    EmptyTrackCatalog,

    #[error("Duplicate track id: {0}")]
    DuplicateTrack(String),

    #[error("Track {0} has zero lessons")]
    ZeroLessons(String),

    #[error("Invalid color token {token:?} for track {track_id}")]
    InvalidColor { track_id: String, token: String },

    #[error("Catalog parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CatalogError {
    pub fn code(&self) -> &'static str {
        match self {
            CatalogError::EmptyLevelTable
            | CatalogError::BadLevelFloor { .. }
            | CatalogError::LevelOrder { .. } => "catalog_levels",
            CatalogError::EmptyMosaicCatalog
            | CatalogError::MosaicGap { .. }
            | CatalogError::ZeroSegments(_) => "catalog_mosaics",
            CatalogError::EmptyTrackCatalog
            | CatalogError::DuplicateTrack(_)
            | CatalogError::ZeroLessons(_)
            | CatalogError::InvalidColor { .. } => "catalog_tracks",
            CatalogError::Parse(_) => "catalog_parse",
            CatalogError::Io(_) => "catalog_io",
        }
    }
}

/// Failures reported by a synchronization adapter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error("Account {0} has no progression document")]
    NotProvisioned(String),

    #[error("Patch rejected: {0}")]
    Rejected(String),

    #[error("Sync backend unavailable: {0}")]
    Unavailable(String),
}

impl SyncError {
    pub fn code(&self) -> &'static str {
        match self {
            SyncError::NotProvisioned(_) => "not_provisioned",
            SyncError::Rejected(_) => "patch_rejected",
            SyncError::Unavailable(_) => "sync_unavailable",
        }
    }
}

/// Failures reported by [`crate::sync::ProgressionStore`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("A lesson completion is already in flight")]
    CompletionInFlight,

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Sync(#[from] SyncError),
}

impl StoreError {
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::CompletionInFlight => "completion_in_flight",
            StoreError::Engine(e) => e.code(),
            StoreError::Sync(e) => e.code(),
        }
    }
}
