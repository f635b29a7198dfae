use crate::{
    options::{Global, P2p},
    setup::tile_loader,
};
use anyhow::{anyhow, Result};
use coverage::{count_mask, field_strength_dbuv, plot_path, received_power_dbm, Reach, Region};
use itm::Prediction;
use log::warn;
use serde::Serialize;
use terrain::{constants::KM_PER_MILE, ElevationMap, Haat, PathProfiler, Site, TileLoader};

/// Everything known about one transmitter to receiver path.
#[derive(Debug, Serialize)]
pub struct Report {
    pub tx: Site,
    pub rx: Site,
    pub distance_miles: f64,
    pub distance_km: f64,
    pub azimuth: f64,
    pub back_azimuth: f64,
    pub tx_ground_m: f64,
    pub rx_ground_m: f64,
    /// Angle at which the transmitter sees the receiver.
    pub elevation_angle: f64,
    /// Angle at which the transmitter sees the first obstruction, or
    /// the receiver if there is none.
    pub obstruction_angle: f64,
    /// `[lat, lon]` of the first obstruction, east-positive.
    pub obstruction: Option<[f64; 2]>,
    pub haat: Option<Haat>,
    pub prediction: Prediction,
    pub mode: String,
    pub field_strength_dbuv_m: Option<f64>,
    pub received_power_dbm: Option<f64>,
    pub path_samples: usize,
    /// Path samples a receiver at the receiver's height would see
    /// the transmitter from.
    pub visible_samples: usize,
}

impl P2p {
    pub fn run(&self, global: &Global) -> Result<()> {
        let loader = tile_loader(&global.tiles)?;
        let report = self.report(global, &*loader)?;
        println!("{}", serde_json::to_string_pretty(&report)?);
        Ok(())
    }

    pub fn report(&self, global: &Global, loader: &dyn TileLoader) -> Result<Report> {
        let pages = global.pages()?;
        let map = ElevationMap::new(global.resolution(), pages);

        let mut region = Region::covering([&self.tx.0, &self.rx.0]).ok_or_else(|| anyhow!("no sites"))?;
        region.load(&map, loader)?;
        let (tx, rx) = (&map.agl(&self.tx.0), &map.agl(&self.rx.0));
        // Room for the HAAT radials.
        region.include_reach(tx, &Reach::estimate(&map, pages, tx, rx.alt(), Some(10.5)));
        region.load(&map, loader)?;

        let profiler = PathProfiler::new(&map).clutter(global.clutter);
        let path = profiler.read_path(tx, rx);
        let pfl = path.pfl(global.clutter);
        let params = self.radio.params();
        let prediction = itm::point_to_point(self.radio.model(), &pfl, tx.alt_m(), rx.alt_m(), &params)?;
        if let Some(warning) = prediction.warning {
            warn!("{warning:?}");
        }

        let haat = profiler
            .haat(tx)
            .map_err(|e| warn!("no HAAT: {e}"))
            .ok();
        let obstruction = profiler.elevation_angle2(tx, rx);
        let erp = self.radio.erp;
        let (field_strength_dbuv_m, received_power_dbm) = if erp == 0.0 {
            (None, None)
        } else {
            (
                Some(field_strength_dbuv(params.frq_mhz, erp, prediction.loss_db)),
                Some(received_power_dbm(erp, prediction.loss_db)),
            )
        };

        plot_path(&profiler, tx, rx, 1);
        let distance_miles = tx.distance(rx);

        Ok(Report {
            tx: tx.clone(),
            rx: rx.clone(),
            distance_miles,
            distance_km: distance_miles * KM_PER_MILE,
            azimuth: tx.azimuth(rx),
            back_azimuth: rx.azimuth(tx),
            tx_ground_m: map.get_elevation(tx),
            rx_ground_m: map.get_elevation(rx),
            elevation_angle: profiler.elevation_angle(tx, rx),
            obstruction_angle: obstruction.angle,
            obstruction: obstruction
                .at
                .map(|at| [at.y, Site::new(at.y, at.x, 0.0).lon_east()]),
            haat,
            mode: prediction.mode_description(),
            prediction,
            field_strength_dbuv_m,
            received_power_dbm,
            path_samples: path.len(),
            visible_samples: count_mask(&map, |m| m & 1 != 0),
        })
    }
}
