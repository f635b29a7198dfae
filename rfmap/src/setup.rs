//! Picking a tile source and loading the terrain a run needs.

use anyhow::{anyhow, Result};
use coverage::{MapSummary, Reach, Region};
use log::info;
use serde::Serialize;
use std::path::Path;
use terrain::{ElevationMap, Extent, HgtLoader, SdfLoader, Site, TerrainError, TileLoader, TileMode};

/// SPLAT! data files if `dir` has any, SRTM/NASADEM `.hgt` files
/// otherwise.
pub fn tile_loader(dir: &Path) -> Result<Box<dyn TileLoader>> {
    match SdfLoader::new(dir.to_owned()) {
        Ok(loader) => Ok(Box::new(loader)),
        Err(TerrainError::NoTiles { .. }) => Ok(Box::new(HgtLoader::new(dir.to_owned(), TileMode::MemMap)?)),
        Err(e) => Err(e.into()),
    }
}

/// Loads the cells under `txs`, then everything within each
/// transmitter's reach, returning the reaches in `txs` order.
pub fn load_for_sweeps(
    map: &ElevationMap,
    loader: &dyn TileLoader,
    txs: &[Site],
    rx_alt_ft: f64,
    max_range: Option<f64>,
) -> Result<(Region, Vec<Reach>)> {
    let mut region = Region::covering(txs).ok_or_else(|| anyhow!("no transmitters"))?;
    region.load(map, loader)?;
    let reaches: Vec<Reach> = txs
        .iter()
        .map(|tx| Reach::estimate(map, map.pages(), tx, rx_alt_ft, max_range))
        .collect();
    for (tx, reach) in txs.iter().zip(&reaches) {
        region.include_reach(tx, reach);
    }
    region.load(map, loader)?;
    info!("loaded {} tiles for {region:?}", map.tile_count());
    Ok((region, reaches))
}

/// What gets printed when a map run finishes.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub region: Region,
    pub extent: Extent,
    pub tiles: usize,
    pub maps: Vec<MapSummary>,
}

impl RunSummary {
    pub fn new(region: Region, map: &ElevationMap, maps: Vec<MapSummary>) -> Self {
        Self {
            region,
            extent: map.extent(),
            tiles: map.tile_count(),
            maps,
        }
    }

    pub fn print(&self) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(self)?);
        Ok(())
    }
}
