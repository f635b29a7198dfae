use crate::{
    options::{Coverage, Global},
    setup::{load_for_sweeps, tile_loader, RunSummary},
};
use anyhow::{Context, Result};
use coverage::{mask, AntennaPattern, LrSettings, OutputQuantity, Sweep, SweepConfig};
use log::info;
use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};
use terrain::{ElevationMap, PathProfiler, Site, TileLoader};

impl Coverage {
    pub fn run(&self, global: &Global) -> Result<()> {
        let loader = tile_loader(&global.tiles)?;
        let map = ElevationMap::new(global.resolution(), global.pages()?);
        self.plot(global, &map, &*loader, true)?.print()
    }

    pub fn plot(&self, global: &Global, map: &ElevationMap, loader: &dyn TileLoader, progress: bool) -> Result<RunSummary> {
        let pattern = self.pattern.as_deref().map(read_pattern).transpose()?;
        let txs: Vec<Site> = self.tx.iter().map(|tx| tx.0.clone()).collect();
        let (region, reaches) = load_for_sweeps(map, loader, &txs, self.rx_alt, self.max_range)?;

        let config = SweepConfig {
            threads: global.threads,
            progress,
            ..SweepConfig::default()
        };
        let sweep = Sweep::new(PathProfiler::new(map).clutter(global.clutter), &config)?;
        let quantity = OutputQuantity::select(self.radio.erp, self.radio.dbm);
        let mut maps = Vec::with_capacity(txs.len());
        for (i, (tx, reach)) in txs.iter().zip(&reaches).enumerate() {
            let settings = LrSettings {
                model: self.radio.model(),
                params: self.radio.params(),
                erp_w: self.radio.erp,
                quantity,
                rx_alt_ft: self.rx_alt,
                max_range_miles: reach.max_range,
                pattern: pattern.as_ref(),
            };
            let summary = match &self.ano {
                Some(path) => {
                    let path = ano_path(path, i, txs.len());
                    let mut out = BufWriter::new(File::create(&path).with_context(|| format!("creating {path:?}"))?);
                    let summary = sweep.plot_lr_map(tx, i, &settings, Some(&mut out))?;
                    out.flush()?;
                    info!("wrote {path:?}");
                    summary
                }
                None => sweep.plot_lr_map(tx, i, &settings, None)?,
            };
            maps.push(summary);
        }
        for tx in &txs {
            mask::place_marker(map, tx.lat(), tx.lon());
        }
        Ok(RunSummary::new(region, map, maps))
    }
}

/// `path` itself for a single transmitter, `stem-N.ext` otherwise.
fn ano_path(path: &Path, index: usize, count: usize) -> PathBuf {
    if count < 2 {
        return path.to_owned();
    }
    let stem = path.file_stem().map_or_else(Default::default, |s| s.to_string_lossy());
    let name = match path.extension() {
        Some(ext) => format!("{stem}-{}.{}", index + 1, ext.to_string_lossy()),
        None => format!("{stem}-{}", index + 1),
    };
    path.with_file_name(name)
}

/// Reads whitespace separated field ratios, azimuth major.
fn read_pattern(path: &Path) -> Result<AntennaPattern> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {path:?}"))?;
    let gains = text
        .split_whitespace()
        .map(str::parse::<f32>)
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("parsing {path:?}"))?;
    Ok(AntennaPattern::from_gains(gains)?)
}

#[cfg(test)]
mod tests {
    use super::{ano_path, read_pattern};
    use crate::options::{Coverage, Global, Radio};
    use coverage::{mask, OutputQuantity, AZIMUTHS, ELEVATION_BUCKETS};
    use std::{fs, path::Path};
    use terrain::{geo::geometry::Coord, ElevationMap, MemoryLoader, Pages, Resolution};

    #[test]
    fn test_ano_path() {
        let path = Path::new("out/map.ano");
        assert_eq!(ano_path(path, 0, 1), Path::new("out/map.ano"));
        assert_eq!(ano_path(path, 0, 3), Path::new("out/map-1.ano"));
        assert_eq!(ano_path(path, 2, 3), Path::new("out/map-3.ano"));
        assert_eq!(ano_path(Path::new("map"), 1, 2), Path::new("map-2"));
    }

    #[test]
    fn test_read_pattern() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pattern.txt");
        fs::write(&path, "1.0 0.5\n0.25").unwrap();
        assert!(read_pattern(&path).is_err());

        let gains = vec!["0.5"; AZIMUTHS * ELEVATION_BUCKETS].join(" ");
        fs::write(&path, gains).unwrap();
        let pattern = read_pattern(&path).unwrap();
        assert_eq!(pattern.gain(90.0, 0.0), Some(0.5));
    }

    #[test]
    fn test_coverage_with_ano() {
        let dir = tempfile::tempdir().unwrap();
        let ano = dir.path().join("map.ano");
        let global = Global {
            threads: 2,
            hd: false,
            pages: 4,
            tiles: ".".into(),
            clutter: 0.0,
        };
        let coverage = Coverage {
            tx: vec!["44.5,-71.5,100".parse().unwrap(), "44.52,-71.5,100".parse().unwrap()],
            rx_alt: 30.0,
            max_range: Some(1.5),
            ano: Some(ano.clone()),
            pattern: None,
            radio: Radio {
                erp: 50.0,
                dbm: true,
                itm: true,
                ..Radio::default()
            },
        };
        let map = ElevationMap::new(Resolution::Standard, Pages::new(4).unwrap());
        let loader = MemoryLoader::new().with_flat(Coord { x: 71, y: 44 }, 100);
        let summary = coverage.plot(&global, &map, &loader, false).unwrap();

        assert_eq!(summary.maps.len(), 2);
        assert!(summary.maps.iter().all(|m| m.max_range_miles == Some(1.5) && m.skipped == 0));
        let dbm = OutputQuantity::ReceivedPower.dequantize(map.get_signal(44.51, 71.5)).unwrap();
        assert!((-120.0..0.0).contains(&dbm), "{dbm}");
        assert_eq!(map.get_mask(44.51, 71.5) >> 3, 2);
        assert_ne!(map.get_mask(44.5, 71.5) & mask::MARKER, 0);

        for name in ["map-1.ano", "map-2.ano"] {
            let text = fs::read_to_string(dir.path().join(name)).unwrap();
            assert!(text.starts_with("72, 71\t; max_west, min_west\n45, 44\t; max_north, min_north\n"));
            assert!(text.lines().count() > 100);
        }
        assert!(!ano.exists());
    }
}
