//! One degree square of terrain and the result grids layered on it.
//!
//! # Layout
//!
//! Every grid in a tile is indexed by `(x, y)` where `x` counts
//! samples north from the tile's southern edge and `y` counts samples
//! west from its eastern edge. The linear index is `x * ppd + y`.

use crate::{math::lon_diff, TerrainError};
use byteorder::{BigEndian as BE, ByteOrder};
use geo::geometry::Coord;
use memmap2::Mmap;
use std::{
    mem::size_of,
    path::Path,
    sync::atomic::{AtomicU8, Ordering},
};

/// HGT marker for missing samples.
pub(crate) const HGT_VOID: i16 = i16::MIN;

pub struct Tile {
    /// `x` is the tile's eastern (minimum west) longitude and `y` its
    /// southern latitude, in whole degrees.
    cell: Coord<i32>,

    /// Samples per degree along each side.
    ppd: usize,

    /// Lowest elevation sample in this tile.
    min_elevation: i16,

    /// Highest elevation sample in this tile.
    max_elevation: i16,

    /// Elevation samples.
    samples: SampleStore,

    /// Quantized signal per sample.
    signal: Box<[AtomicU8]>,

    /// Bit flags per sample.
    mask: Box<[AtomicU8]>,
}

enum SampleStore {
    /// Sea level everywhere.
    Flat,
    /// Samples in grid order.
    InMem(Box<[i16]>),
    /// Raw HGT file: north row first, west column first, one extra
    /// row and column of overlap.
    Hgt(Mmap),
}

impl SampleStore {
    fn get(&self, ppd: usize, x: usize, y: usize) -> i16 {
        match self {
            Self::Flat => 0,
            Self::InMem(samples) => samples[x * ppd + y],
            Self::Hgt(raw) => {
                let index = (ppd - x) * (ppd + 1) + (ppd - 1 - y);
                let start = index * size_of::<i16>();
                match BE::read_i16(&raw[start..start + size_of::<i16>()]) {
                    HGT_VOID => 0,
                    sample => sample,
                }
            }
        }
    }
}

/// How a new value combines with one already in the signal grid.
///
/// Both merges are commutative, so the grid's final contents do not
/// depend on the order in which paths are evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalMerge {
    /// Keep the strongest value.
    MaxHold,
    /// Keep the smallest non-zero value; zero means "unset".
    LowestNonZero,
}

impl SignalMerge {
    pub fn merge(self, existing: u8, new: u8) -> u8 {
        match self {
            Self::MaxHold => existing.max(new),
            Self::LowestNonZero => match (existing, new) {
                (0, new) => new,
                (existing, 0) => existing,
                (existing, new) => existing.min(new),
            },
        }
    }
}

impl Tile {
    /// Returns a sea level tile for `cell`.
    pub fn flat(cell: Coord<i32>, ppd: usize) -> Self {
        Self::with_store(cell, ppd, SampleStore::Flat, (0, 0))
    }

    /// Returns a tile whose sample at `(x, y)` is `f(x, y)` meters.
    pub fn from_fn<F>(cell: Coord<i32>, ppd: usize, f: F) -> Self
    where
        F: Fn(usize, usize) -> i16,
    {
        let samples: Box<[i16]> = (0..ppd)
            .flat_map(|x| (0..ppd).map(move |y| (x, y)))
            .map(|(x, y)| f(x, y))
            .collect();
        Self::from_samples(cell, ppd, samples)
    }

    /// Returns a tile backed by samples already in grid order.
    ///
    /// # Panics
    ///
    /// Panics if `samples.len() != ppd * ppd`.
    pub fn from_samples(cell: Coord<i32>, ppd: usize, samples: Box<[i16]>) -> Self {
        assert_eq!(samples.len(), ppd * ppd);
        let min = samples.iter().copied().min().unwrap_or(0);
        let max = samples.iter().copied().max().unwrap_or(0);
        Self::with_store(cell, ppd, SampleStore::InMem(samples), (min, max))
    }

    /// Returns a tile using a memory-mapped HGT file as storage.
    pub(crate) fn from_hgt(
        cell: Coord<i32>,
        ppd: usize,
        raw: Mmap,
        path: &Path,
    ) -> Result<Self, TerrainError> {
        let expected = (ppd + 1) * (ppd + 1) * size_of::<i16>();
        if raw.len() != expected {
            return Err(TerrainError::format(
                path,
                format!("{} bytes, expected {expected}", raw.len()),
            ));
        }
        let store = SampleStore::Hgt(raw);
        let (min, max) = (0..ppd)
            .flat_map(|x| (0..ppd).map(move |y| (x, y)))
            .map(|(x, y)| store.get(ppd, x, y))
            .fold((i16::MAX, i16::MIN), |(lo, hi), z| (lo.min(z), hi.max(z)));
        Ok(Self::with_store(cell, ppd, store, (min, max)))
    }

    fn with_store(cell: Coord<i32>, ppd: usize, samples: SampleStore, (min, max): (i16, i16)) -> Self {
        let grid = || (0..ppd * ppd).map(|_| AtomicU8::new(0)).collect();
        Self {
            cell,
            ppd,
            min_elevation: min,
            max_elevation: max,
            samples,
            signal: grid(),
            mask: grid(),
        }
    }

    pub fn cell(&self) -> Coord<i32> {
        self.cell
    }

    pub fn ppd(&self) -> usize {
        self.ppd
    }

    pub fn min_north(&self) -> i32 {
        self.cell.y
    }

    pub fn max_north(&self) -> i32 {
        self.cell.y + 1
    }

    pub fn min_west(&self) -> i32 {
        self.cell.x
    }

    pub fn max_west(&self) -> i32 {
        self.cell.x + 1
    }

    /// Returns the lowest elevation sample in this tile.
    pub fn min_elevation(&self) -> i16 {
        self.min_elevation
    }

    /// Returns the highest elevation sample in this tile.
    pub fn max_elevation(&self) -> i16 {
        self.max_elevation
    }

    /// Returns the grid position nearest to `lat`, `lon` (west
    /// positive), if it falls in this tile.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss,
        clippy::cast_sign_loss
    )]
    pub fn xy(&self, lat: f64, lon: f64) -> Option<(usize, usize)> {
        let ppd = self.ppd as f64;
        let mpi = ppd - 1.0;
        let x = (ppd * (lat - f64::from(self.min_north()))).round_ties_even();
        let y = mpi - (ppd * lon_diff(f64::from(self.max_west()), lon)).round_ties_even();
        if (0.0..=mpi).contains(&x) && (0.0..=mpi).contains(&y) {
            Some((x as usize, y as usize))
        } else {
            None
        }
    }

    /// Returns the linear grid index nearest to `lat`, `lon`.
    pub fn index(&self, lat: f64, lon: f64) -> Option<usize> {
        self.xy(lat, lon).map(|(x, y)| x * self.ppd + y)
    }

    /// Returns the grid position nearest to `lat`, `lon` if it lies
    /// within this tile's bounds, clamped to the grid.
    ///
    /// Unlike [`Tile::xy`], the half-sample strip along the north and
    /// east edges resolves to this tile instead of the neighbor.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss,
        clippy::cast_sign_loss
    )]
    pub fn xy_within(&self, lat: f64, lon: f64) -> Option<(usize, usize)> {
        let ppd = self.ppd as f64;
        let mpi = ppd - 1.0;
        let north = lat - f64::from(self.min_north());
        let west = lon_diff(f64::from(self.max_west()), lon);
        if !(0.0..=1.0).contains(&north) || !(0.0..=1.0).contains(&west) {
            return None;
        }
        let x = (ppd * north).round_ties_even().min(mpi);
        let y = (mpi - (ppd * west).round_ties_even()).max(0.0);
        Some((x as usize, y as usize))
    }

    /// Linear form of [`Tile::xy_within`].
    pub fn index_within(&self, lat: f64, lon: f64) -> Option<usize> {
        self.xy_within(lat, lon).map(|(x, y)| x * self.ppd + y)
    }

    /// Returns the center of grid position `(x, y)` as (lat, west
    /// positive lon).
    pub fn location(&self, x: usize, y: usize) -> (f64, f64) {
        grid_location(self.cell, self.ppd, x, y)
    }

    /// Returns the elevation sample at `(x, y)` in meters.
    pub fn get(&self, x: usize, y: usize) -> i16 {
        self.samples.get(self.ppd, x, y)
    }

    /// Returns the elevation sample at linear `index` in meters.
    pub fn elevation(&self, index: usize) -> i16 {
        self.get(index / self.ppd, index % self.ppd)
    }

    pub fn signal(&self, index: usize) -> u8 {
        self.signal[index].load(Ordering::Relaxed)
    }

    pub fn set_signal(&self, index: usize, value: u8) {
        self.signal[index].store(value, Ordering::Relaxed);
    }

    /// Atomically folds `value` into the signal at `index`, returning
    /// the stored result.
    pub fn merge_signal(&self, index: usize, value: u8, merge: SignalMerge) -> u8 {
        let cell = &self.signal[index];
        match cell.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |old| {
            let new = merge.merge(old, value);
            (new != old).then_some(new)
        }) {
            Ok(old) => merge.merge(old, value),
            Err(unchanged) => unchanged,
        }
    }

    pub fn mask(&self, index: usize) -> u8 {
        self.mask[index].load(Ordering::Relaxed)
    }

    pub fn set_mask(&self, index: usize, value: u8) {
        self.mask[index].store(value, Ordering::Relaxed);
    }

    /// ORs `bits` into the mask at `index`, returning the new mask.
    pub fn or_mask(&self, index: usize, bits: u8) -> u8 {
        self.mask[index].fetch_or(bits, Ordering::Relaxed) | bits
    }

    /// Atomically replaces the mask at `index` with `f(mask)`,
    /// returning the new mask.
    pub fn update_mask<F>(&self, index: usize, f: F) -> u8
    where
        F: Fn(u8) -> u8,
    {
        let cell = &self.mask[index];
        match cell.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |old| Some(f(old))) {
            Ok(old) | Err(old) => f(old),
        }
    }
}

/// Center of grid position `(x, y)` in `cell`, as (lat, west
/// positive lon).
#[allow(clippy::cast_precision_loss)]
pub(crate) fn grid_location(cell: Coord<i32>, ppd: usize, x: usize, y: usize) -> (f64, f64) {
    let ppd = ppd as f64;
    let lat = f64::from(cell.y) + x as f64 / ppd;
    let lon = f64::from(cell.x + 1) - (ppd - 1.0 - y as f64) / ppd;
    (lat, lon)
}

impl std::fmt::Debug for Tile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tile")
            .field("cell", &self.cell)
            .field("ppd", &self.ppd)
            .field("min_elevation", &self.min_elevation)
            .field("max_elevation", &self.max_elevation)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::{SignalMerge, Tile};
    use geo::geometry::Coord;

    const PPD: usize = 120;

    fn ramp() -> Tile {
        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        Tile::from_fn(Coord { x: 71, y: 44 }, PPD, |x, y| (x * 10 + y) as i16)
    }

    #[test]
    fn test_index_corners() {
        let tile = ramp();
        // South-east corner sample sits one step west of the eastern edge.
        assert_eq!(tile.xy(44.0, 71.0 + 1.0 / 120.0), Some((0, 0)));
        assert_eq!(tile.xy(44.0, 72.0), Some((0, PPD - 1)));
        assert_eq!(tile.xy(45.0 - 1.0 / 120.0, 72.0), Some((PPD - 1, PPD - 1)));
        // The northern edge belongs to the next tile up.
        assert_eq!(tile.xy(45.0, 72.0), None);
        assert_eq!(tile.xy(43.9, 71.5), None);
        assert_eq!(tile.xy(44.5, 72.1), None);
        assert_eq!(tile.xy(f64::NAN, 71.5), None);
    }

    #[test]
    fn test_index_within_clamps_edges() {
        let tile = ramp();
        assert_eq!(tile.xy_within(45.0, 72.0), Some((PPD - 1, PPD - 1)));
        assert_eq!(tile.xy_within(44.0, 71.0), Some((0, 0)));
        assert_eq!(tile.xy_within(45.0 - 1e-9, 71.000_000_001), Some((PPD - 1, 0)));
        assert_eq!(tile.xy_within(44.5, 71.5), tile.xy(44.5, 71.5));
        assert_eq!(tile.index_within(45.0, 71.0), Some((PPD - 1) * PPD));
        assert_eq!(tile.xy_within(45.001, 71.5), None);
        assert_eq!(tile.xy_within(44.5, 70.999), None);
        assert_eq!(tile.xy_within(f64::NAN, 71.5), None);
    }

    #[test]
    fn test_location_round_trip() {
        let tile = ramp();
        for (x, y) in [(0, 0), (5, 17), (PPD - 1, PPD - 1), (60, 3)] {
            let (lat, lon) = tile.location(x, y);
            assert_eq!(tile.xy(lat, lon), Some((x, y)));
            assert_eq!(tile.elevation(x * PPD + y), tile.get(x, y));
        }
    }

    #[test]
    fn test_min_max() {
        let tile = ramp();
        assert_eq!(tile.min_elevation(), 0);
        assert_eq!(tile.max_elevation(), 119 * 10 + 119);
        let flat = Tile::flat(Coord { x: 0, y: 0 }, PPD);
        assert_eq!((flat.min_elevation(), flat.max_elevation()), (0, 0));
        assert_eq!(flat.get(7, 7), 0);
    }

    #[test]
    fn test_merges_commute() {
        for merge in [SignalMerge::MaxHold, SignalMerge::LowestNonZero] {
            for a in [0_u8, 1, 90, 255] {
                for b in [0_u8, 3, 90, 200] {
                    assert_eq!(merge.merge(a, b), merge.merge(b, a), "{merge:?} {a} {b}");
                }
            }
        }
        assert_eq!(SignalMerge::MaxHold.merge(100, 90), 100);
        assert_eq!(SignalMerge::LowestNonZero.merge(0, 140), 140);
        assert_eq!(SignalMerge::LowestNonZero.merge(120, 140), 120);
    }

    #[test]
    fn test_signal_and_mask() {
        let tile = ramp();
        assert_eq!(tile.merge_signal(5, 120, SignalMerge::MaxHold), 120);
        assert_eq!(tile.merge_signal(5, 90, SignalMerge::MaxHold), 120);
        assert_eq!(tile.signal(5), 120);
        tile.set_signal(5, 7);
        assert_eq!(tile.signal(5), 7);

        assert_eq!(tile.or_mask(9, 1), 1);
        assert_eq!(tile.or_mask(9, 8), 9);
        assert_eq!(tile.update_mask(9, |m| (m & 7) | (3 << 3)), 0b1_1001);
        tile.set_mask(9, 2);
        assert_eq!(tile.mask(9), 2);
    }
}
