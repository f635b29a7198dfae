use geo::geometry::Coord;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TerrainError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("no {ext} tiles in {dir:?}")]
    NoTiles { dir: PathBuf, ext: &'static str },

    #[error("malformed tile {path:?}: {reason}")]
    TileFormat { path: PathBuf, reason: String },

    #[error("tile for {cell:?} has {found} points per degree, expected {expected}")]
    Resolution {
        cell: Coord<i32>,
        expected: usize,
        found: usize,
    },

    #[error("{0} is not a valid page budget (1, 4, 9, 16, 25, 36, 49 or 64)")]
    InvalidPages(usize),

    #[error("page budget of {0} tiles exhausted")]
    PageBudget(usize),

    #[error("no terrain data loaded at {lat:.4}, {lon:.4}")]
    NoTerrain { lat: f64, lon: f64 },
}

impl TerrainError {
    pub(crate) fn format(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::TileFormat {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
