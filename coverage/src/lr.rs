//! Longley-Rice coverage.

use crate::{
    mask,
    pattern::AntennaPattern,
    quantize::OutputQuantity,
    sweep::{count_mask, edge_targets, MapSummary, Sweep},
    CoverageError,
};
use itm::{Model, Params, PropagationError};
use log::{debug, info, warn};
use std::{collections::HashSet, io::Write, time::Instant};
use terrain::{
    constants::{FOUR_THIRDS, METERS_PER_MILE},
    geo::geometry::Coord,
    math::cos_angle,
    Extent, Site,
};

/// Per-run inputs of a Longley-Rice map.
#[derive(Debug, Clone, Copy)]
pub struct LrSettings<'p> {
    pub model: Model,
    pub params: Params,
    /// Effective radiated power (watts), 0 for path loss only.
    pub erp_w: f64,
    pub quantity: OutputQuantity,
    /// Receiver height above ground (feet).
    pub rx_alt_ft: f64,
    /// Pixels farther than this from the transmitter are left alone
    /// (miles).
    pub max_range_miles: f64,
    pub pattern: Option<&'p AntennaPattern>,
}

impl Default for LrSettings<'_> {
    fn default() -> Self {
        Self {
            model: Model::default(),
            params: Params::default(),
            erp_w: 0.0,
            quantity: OutputQuantity::PathLoss,
            rx_alt_ft: 30.0,
            max_range_miles: f64::INFINITY,
            pattern: None,
        }
    }
}

type PixelKey = (Coord<i32>, usize);

/// One line of alphanumeric output.
#[derive(Debug, Clone, Copy)]
struct AnoRecord {
    key: PixelKey,
    lat: f64,
    lon: f64,
    azimuth: f64,
    elevation: f64,
    value: f64,
    blocked: bool,
}

#[derive(Default)]
struct SectorResult {
    records: Vec<AnoRecord>,
    skipped: usize,
    error: Option<PropagationError>,
}

impl Sweep<'_> {
    /// Predicts the signal from `tx` at every sample of the loaded
    /// region within `settings.max_range_miles`, merging quantized
    /// values into the signal grid and stamping `tx_index + 1` into
    /// the mask of every pixel reached.
    ///
    /// When `ano` is given a text record per pixel is written to it.
    /// Pixels the propagation engine rejects are skipped and counted.
    ///
    /// # Errors
    ///
    /// Fails if nothing is loaded, the sweep is cancelled, or `ano`
    /// cannot be written.
    pub fn plot_lr_map(
        &self,
        tx: &Site,
        tx_index: usize,
        settings: &LrSettings<'_>,
        ano: Option<&mut dyn Write>,
    ) -> Result<MapSummary, CoverageError> {
        let now = Instant::now();
        let map = self.map();
        let extent = map.extent();
        if extent.is_empty() {
            return Err(CoverageError::EmptyMap);
        }
        let targets = edge_targets(&extent, map.ppd());
        let tx = &map.agl(tx);
        let tx_number = tx_index + 1;
        let with_records = ano.is_some();
        info!(
            "lr map; tx: {:?}, model: {:?}, quantity: {:?}, max range: {} mi, targets: {}, threads: {}",
            tx.name(),
            settings.model,
            settings.quantity,
            settings.max_range_miles,
            targets.len(),
            self.threads()
        );

        let results = self.run(format!("Longley-Rice {}", tx.name()), &targets, |sector| {
            let mut result = SectorResult::default();
            let mut visited = HashSet::new();
            for target in sector {
                let rx = Site::new(target.y, target.x, settings.rx_alt_ft);
                self.plot_lr_path(tx, &rx, tx_number, settings, with_records, &mut visited, &mut result);
            }
            result
        })?;

        let skipped: usize = results.iter().map(|r| r.skipped).sum();
        if let Some(err) = results.iter().find_map(|r| r.error.as_ref()) {
            warn!("lr map; tx: {:?}, skipped {skipped} pixels, first: {err}", tx.name());
        }
        if let Some(out) = ano {
            write_ano(out, &extent, settings.quantity, results.iter().flat_map(|r| &r.records))?;
        }

        let stamp = mask::stamp(0, tx_number);
        let summary = MapSummary {
            transmitter: tx.name().to_owned(),
            targets: targets.len(),
            sectors: self.sectors(targets.len()),
            pixels: count_mask(map, |m| m & !mask::KEEP_ON_STAMP == stamp),
            skipped,
            max_range_miles: Some(settings.max_range_miles),
            elapsed_secs: now.elapsed().as_secs_f64(),
        };
        info!("lr map done; {summary:?}");
        Ok(summary)
    }

    /// Evaluates every pixel on the path from `tx` to `rx`, outward,
    /// up to the maximum range.
    #[allow(clippy::too_many_arguments, clippy::cast_precision_loss)]
    fn plot_lr_path(
        &self,
        tx: &Site,
        rx: &Site,
        tx_number: usize,
        settings: &LrSettings<'_>,
        with_records: bool,
        visited: &mut HashSet<PixelKey>,
        result: &mut SectorResult,
    ) {
        let map = self.map();
        let path = self.profiler.read_path(tx, rx);
        if path.len() < 3 {
            return;
        }
        let clutter = self.profiler.clutter_m();
        let elev = path.elevation();
        let dist = path.distance();
        let mut pfl = path.pfl(clutter);

        let four_thirds = FOUR_THIRDS * self.profiler.earth_radius_m();
        let xmtr_r = four_thirds + tx.alt_m() + elev[0];
        let rx_alt_m = rx.alt_m();
        let want_angle = settings.pattern.is_some() || with_records;

        for y in 2..path.len() - 1 {
            if dist[y] > settings.max_range_miles {
                break;
            }
            let Coord { x: lon, y: lat } = path.coords()[y];
            let Some(key) = map.pixel(lat, lon) else {
                continue;
            };
            if !visited.insert(key) {
                continue;
            }

            let (elevation, blocked) = if want_angle {
                let dest_r = four_thirds + rx_alt_m + elev[y];
                let cos_rcvr = cos_angle(xmtr_r, METERS_PER_MILE * dist[y], dest_r).clamp(-1.0, 1.0);
                // First terrain sample at or above the ray to the
                // receiver, seen from the transmitter.
                let obstruction = (2..y).find_map(|x| {
                    let z = elev[x];
                    let test_r = four_thirds + if z == 0.0 { z } else { z + clutter };
                    let cos_test = cos_angle(xmtr_r, METERS_PER_MILE * dist[x], test_r).clamp(-1.0, 1.0);
                    (cos_rcvr >= cos_test).then_some(cos_test)
                });
                let cos_seen = obstruction.unwrap_or(cos_rcvr);
                (cos_seen.acos().to_degrees() - 90.0, obstruction.is_some())
            } else {
                (0.0, false)
            };

            // Profile from the transmitter to this pixel, with the
            // pixel's own sample left bare.
            pfl[0] = y as f64;
            pfl[1] = METERS_PER_MILE * (dist[y] - dist[y - 1]);
            let clothed = pfl[2 + y];
            pfl[2 + y] = elev[y];
            let prediction = itm::point_to_point(settings.model, &pfl[..y + 3], tx.alt_m(), rx_alt_m, &settings.params);
            pfl[2 + y] = clothed;

            let mut loss = match prediction {
                Ok(prediction) => prediction.loss_db,
                Err(err) => {
                    debug!("skipping pixel; lat: {lat}, lon: {lon}, {err}");
                    result.skipped += 1;
                    result.error.get_or_insert(err);
                    continue;
                }
            };
            let azimuth = tx.azimuth(&Site::new(lat, lon, 0.0));
            if let Some(pattern) = settings.pattern {
                loss += pattern.loss_db(azimuth, elevation);
            }
            let value = settings.quantity.value(loss, settings.erp_w, settings.params.frq_mhz);
            map.merge_signal(lat, lon, settings.quantity.quantize(value), settings.quantity.merge());
            map.update_mask(lat, lon, |m| mask::stamp(m, tx_number));

            if with_records {
                result.records.push(AnoRecord {
                    key,
                    lat,
                    lon,
                    azimuth,
                    elevation,
                    value,
                    blocked,
                });
            }
        }
    }
}

/// Writes the header and one line per pixel, keeping the first record
/// of each pixel.
fn write_ano<'r, W, I>(out: &mut W, extent: &Extent, quantity: OutputQuantity, records: I) -> std::io::Result<()>
where
    W: Write + ?Sized,
    I: IntoIterator<Item = &'r AnoRecord>,
{
    writeln!(out, "{}, {}\t; max_west, min_west", extent.max_west, extent.min_west)?;
    writeln!(out, "{}, {}\t; max_north, min_north", extent.max_north, extent.min_north)?;
    let mut seen = HashSet::new();
    for r in records.into_iter().filter(|r| seen.insert(r.key)) {
        write!(out, "{:.7}, {:.7}, {:.3}, {:.3}, ", r.lat, r.lon, r.azimuth, r.elevation)?;
        match quantity {
            OutputQuantity::PathLoss => write!(out, "{:.2}", r.value)?,
            OutputQuantity::FieldStrength | OutputQuantity::ReceivedPower => write!(out, "{:.3}", r.value)?,
        }
        if r.blocked {
            out.write_all(b" *")?;
        }
        out.write_all(b"\n")?;
    }
    out.flush()
}
