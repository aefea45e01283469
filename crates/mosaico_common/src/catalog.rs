//! Static catalog configuration.
//!
//! Level Table, Mosaic Catalog and Track Catalog are loaded once at startup
//! and validated into their tagged types, so the engine never re-checks them.
//!
//! ## File format (TOML)
//!
//! ```toml
//! [[levels]]
//! level = 1
//! xp_threshold = 0
//! title = "Iniciante"
//!
//! [[mosaics]]
//! mosaic_index = 1
//! segment_count = 9
//!
//! [[tracks]]
//! track_id = "ia-fundamentos"
//! title = "Fundamentos de IA"
//! area = "IA"
//! total_lessons = 12
//! reward_xp = 80
//! color = "#4DB6AC"
//! tags = ["Inteligência Artificial"]
//! ```
//!
//! Any section left out falls back to the built-in table.

use crate::error::CatalogError;
use crate::progression::levels::{LevelEntry, LevelTable};
use crate::progression::mosaic::{MosaicCatalog, MosaicEntry};
use crate::progression::tracks::{TrackCatalog, TrackDefinition};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Environment variable naming a catalog file
pub const CATALOG_ENV: &str = "MOSAICO_CATALOG";

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogFile {
    levels: Option<Vec<LevelEntry>>,
    mosaics: Option<Vec<MosaicEntry>>,
    tracks: Option<Vec<TrackDefinition>>,
}

/// The three static catalogs, validated together
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalogs {
    pub levels: LevelTable,
    pub mosaics: MosaicCatalog,
    pub tracks: TrackCatalog,
}

impl Catalogs {
    pub fn new(levels: LevelTable, mosaics: MosaicCatalog, tracks: TrackCatalog) -> Self {
        Self {
            levels,
            mosaics,
            tracks,
        }
    }

    /// Built-in catalogs shipped with this client version
    pub fn builtin() -> Self {
        Self::new(
            LevelTable::builtin(),
            MosaicCatalog::builtin(),
            TrackCatalog::builtin(),
        )
    }

    /// Parse and validate a TOML catalog document
    pub fn from_toml_str(content: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = toml::from_str(content)?;

        let levels = match file.levels {
            Some(entries) => LevelTable::new(entries)?,
            None => LevelTable::builtin(),
        };
        let mosaics = match file.mosaics {
            Some(entries) => MosaicCatalog::new(entries)?,
            None => MosaicCatalog::builtin(),
        };
        let tracks = match file.tracks {
            Some(entries) => TrackCatalog::new(entries)?,
            None => TrackCatalog::builtin(),
        };

        Ok(Self::new(levels, mosaics, tracks))
    }

    /// Load from a specific path
    pub fn load_from(path: &Path) -> Result<Self, CatalogError> {
        let content = fs::read_to_string(path)?;
        let catalogs = Self::from_toml_str(&content)?;
        info!(
            path = %path.display(),
            levels = catalogs.levels.max_level(),
            mosaics = catalogs.mosaics.total_mosaics(),
            tracks = catalogs.tracks.len(),
            "Loaded catalogs"
        );
        Ok(catalogs)
    }

    /// Load from `$MOSAICO_CATALOG`, or use the built-in catalogs
    pub fn load() -> Result<Self, CatalogError> {
        match std::env::var_os(CATALOG_ENV) {
            Some(path) => Self::load_from(Path::new(&path)),
            None => {
                debug!("{} not set, using built-in catalogs", CATALOG_ENV);
                Ok(Self::builtin())
            }
        }
    }
}

impl Default for Catalogs {
    fn default() -> Self {
        Self::builtin()
    }
}
