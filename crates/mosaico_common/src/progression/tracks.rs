//! Track Catalog
//!
//! Static metadata for each learning track: lesson count, XP reward, and the
//! color that tags mosaic pieces earned on the track.

use crate::error::CatalogError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A color used to tag mosaic pieces (`#RRGGBB`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColorToken(String);

impl ColorToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `#` followed by exactly six hex digits
    pub fn is_valid_hex(&self) -> bool {
        let Some(digits) = self.0.strip_prefix('#') else {
            return false;
        };
        digits.len() == 6 && digits.chars().all(|c| c.is_ascii_hexdigit())
    }

    /// Trimmed, upper-cased form used when counting colors
    pub fn normalized(&self) -> ColorToken {
        ColorToken(self.0.trim().to_ascii_uppercase())
    }
}

impl fmt::Display for ColorToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ColorToken {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Static definition of a learning track
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackDefinition {
    pub track_id: String,
    pub title: String,
    /// Subject area (e.g. "IA", "ESG")
    pub area: String,
    pub total_lessons: u32,
    /// XP granted per completed lesson
    pub reward_xp: u64,
    pub color: ColorToken,
    /// Interest tags used by the recommendation fallback
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Validated track catalog, in definition order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackCatalog {
    tracks: Vec<TrackDefinition>,
    by_id: HashMap<String, usize>,
}

impl TrackCatalog {
    pub fn new(tracks: Vec<TrackDefinition>) -> Result<Self, CatalogError> {
        if tracks.is_empty() {
            return Err(CatalogError::EmptyTrackCatalog);
        }

        let mut by_id = HashMap::with_capacity(tracks.len());
        for (pos, track) in tracks.iter().enumerate() {
            if track.total_lessons == 0 {
                return Err(CatalogError::ZeroLessons(track.track_id.clone()));
            }
            if !track.color.is_valid_hex() {
                return Err(CatalogError::InvalidColor {
                    track_id: track.track_id.clone(),
                    token: track.color.as_str().to_string(),
                });
            }
            if by_id.insert(track.track_id.clone(), pos).is_some() {
                return Err(CatalogError::DuplicateTrack(track.track_id.clone()));
            }
        }

        Ok(Self { tracks, by_id })
    }

    pub fn builtin() -> Self {
        let tracks = vec![
            builtin_track(
                "ia-fundamentos",
                "Fundamentos de IA",
                "IA",
                12,
                80,
                "#4DB6AC",
                &["Inteligência Artificial", "Tecnologia"],
            ),
            builtin_track(
                "softskills-futuro",
                "Soft Skills para o Futuro",
                "Soft Skills",
                10,
                60,
                "#D1C4E9",
                &["Soft Skills", "Comunicação", "Liderança"],
            ),
            builtin_track(
                "esg-sustentabilidade",
                "ESG e Sustentabilidade",
                "ESG",
                6,
                50,
                "#FFD54F",
                &["ESG & Sustentabilidade"],
            ),
            builtin_track(
                "dados-tecnologia",
                "Dados e Tecnologia",
                "Tech",
                8,
                70,
                "#64B5F6",
                &["Tecnologia", "Produtividade", "Carreira & Futuro do Trabalho"],
            ),
        ];
        let by_id = tracks
            .iter()
            .enumerate()
            .map(|(pos, t)| (t.track_id.clone(), pos))
            .collect();
        Self { tracks, by_id }
    }

    pub fn get(&self, track_id: &str) -> Option<&TrackDefinition> {
        self.by_id.get(track_id).map(|&pos| &self.tracks[pos])
    }

    pub fn contains(&self, track_id: &str) -> bool {
        self.by_id.contains_key(track_id)
    }

    pub fn tracks(&self) -> &[TrackDefinition] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

impl Default for TrackCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn builtin_track(
    track_id: &str,
    title: &str,
    area: &str,
    total_lessons: u32,
    reward_xp: u64,
    color: &str,
    tags: &[&str],
) -> TrackDefinition {
    TrackDefinition {
        track_id: track_id.to_string(),
        title: title.to_string(),
        area: area.to_string(),
        total_lessons,
        reward_xp,
        color: ColorToken::from(color),
        tags: tags.iter().map(|t| t.to_string()).collect(),
    }
}
