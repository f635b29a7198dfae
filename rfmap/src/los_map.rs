use crate::{
    options::{Global, Los},
    setup::{load_for_sweeps, tile_loader, RunSummary},
};
use anyhow::Result;
use coverage::{mask, Sweep, SweepConfig};
use terrain::{ElevationMap, PathProfiler, Site, TileLoader};

impl Los {
    pub fn run(&self, global: &Global) -> Result<()> {
        let loader = tile_loader(&global.tiles)?;
        let map = ElevationMap::new(global.resolution(), global.pages()?);
        self.plot(global, &map, &*loader, true)?.print()
    }

    pub fn plot(&self, global: &Global, map: &ElevationMap, loader: &dyn TileLoader, progress: bool) -> Result<RunSummary> {
        let txs: Vec<Site> = self.tx.iter().map(|tx| tx.0.clone()).collect();
        let (region, _) = load_for_sweeps(map, loader, &txs, self.rx_alt, self.max_range)?;

        let config = SweepConfig {
            threads: global.threads,
            progress,
            ..SweepConfig::default()
        };
        let sweep = Sweep::new(PathProfiler::new(map).clutter(global.clutter), &config)?;
        let maps = txs
            .iter()
            .enumerate()
            .map(|(i, tx)| sweep.plot_los_map(tx, self.rx_alt, i))
            .collect::<Result<Vec<_>, _>>()?;
        for tx in &txs {
            mask::place_marker(map, tx.lat(), tx.lon());
        }
        Ok(RunSummary::new(region, map, maps))
    }
}

#[cfg(test)]
mod tests {
    use crate::options::{Global, Los};
    use coverage::mask;
    use terrain::{geo::geometry::Coord, ElevationMap, MemoryLoader, Pages, Resolution};

    #[test]
    fn test_two_transmitters() {
        let global = Global {
            threads: 2,
            hd: false,
            pages: 4,
            tiles: ".".into(),
            clutter: 0.0,
        };
        let los = Los {
            tx: vec!["44.3,-71.5,100".parse().unwrap(), "44.7,-71.5,100".parse().unwrap()],
            rx_alt: 30.0,
            max_range: Some(5.0),
        };
        let map = ElevationMap::new(Resolution::Standard, Pages::new(4).unwrap());
        let loader = MemoryLoader::new().with_flat(Coord { x: 71, y: 44 }, 100);
        let summary = los.plot(&global, &map, &loader, false).unwrap();

        assert_eq!(summary.tiles, 1);
        assert_eq!(summary.maps.len(), 2);
        assert_eq!(map.get_mask(44.3, 71.5), mask::los_bit(0) | mask::MARKER);
        assert_eq!(map.get_mask(44.35, 71.5), mask::los_bit(0));
        assert_eq!(map.get_mask(44.65, 71.5), mask::los_bit(1));
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["maps"][1]["transmitter"], "44.7,-71.5,100");
    }
}
