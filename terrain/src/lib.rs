//! Terrain for RF path analysis.
//!
//! Sites, great-circle sampling, one degree elevation tiles with
//! their signal and mask grids, and terrain profiles between sites.

pub mod constants;
mod error;
mod loader;
mod map;
pub mod math;
mod profile;
mod site;
mod tile;

pub use crate::{
    error::TerrainError,
    loader::{HgtLoader, MemoryLoader, SdfLoader, TileLoader, TileMode},
    map::{ElevationMap, Extent, Pages, Resolution},
    profile::{Haat, Obstruction, Path, PathProfiler},
    site::Site,
    tile::{SignalMerge, Tile},
};
pub use geo;
