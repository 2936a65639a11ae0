use std::fmt;

use crate::foundation::core::Rect;

/// Axis-aligned bounding box of one tile in world coordinates.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileBounds {
    pub tile_id: String,
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
    pub z: f64,
}

impl TileBounds {
    pub fn new(
        tile_id: impl Into<String>,
        min_x: f64,
        min_y: f64,
        max_x: f64,
        max_y: f64,
        z: f64,
    ) -> Self {
        Self {
            tile_id: tile_id.into(),
            min_x,
            min_y,
            max_x,
            max_y,
            z,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.min_x, self.min_y, self.max_x, self.max_y)
    }

    /// Closed-interval overlap test; touching edges count as overlapping.
    pub fn intersects(&self, min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> bool {
        self.min_x <= max_x && self.max_x >= min_x && self.min_y <= max_y && self.max_y >= min_y
    }
}

/// Unordered pair of tile ids.
///
/// The two ids are stored sorted, so `TileIdPair::new(a, b) == TileIdPair::new(b, a)`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct TileIdPair {
    p: String,
    q: String,
}

impl TileIdPair {
    pub fn new(a: impl Into<String>, b: impl Into<String>) -> Self {
        let (a, b) = (a.into(), b.into());
        if a <= b {
            Self { p: a, q: b }
        } else {
            Self { p: b, q: a }
        }
    }

    /// Lexicographically smaller id.
    pub fn p(&self) -> &str {
        &self.p
    }

    /// Lexicographically larger id.
    pub fn q(&self) -> &str {
        &self.q
    }
}

impl fmt::Display for TileIdPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.p, self.q)
    }
}
