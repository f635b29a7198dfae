//! Sources of elevation tiles.

use crate::{tile::HGT_VOID, Tile, TerrainError};
use byteorder::{BigEndian as BE, ReadBytesExt};
use geo::geometry::Coord;
use log::debug;
use memmap2::Mmap;
use std::{
    collections::HashMap,
    fs::File,
    io::{BufReader, ErrorKind, Read},
    mem::size_of,
    path::{Path, PathBuf},
};

/// Something that can produce the terrain for a one degree cell.
///
/// `cell.x` is the cell's minimum west longitude (`0..360`) and
/// `cell.y` its minimum latitude. Returning `Ok(None)` means the
/// source has no data for the cell, which is not an error.
pub trait TileLoader: Sync {
    fn load(&self, cell: Coord<i32>, ppd: usize) -> Result<Option<Tile>, TerrainError>;
}

/// How to handle tile.
///
/// The trade off between loading tile data into memory versus memory
/// mapping is not obvious, and you should measure both before
/// deciding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileMode {
    /// Parse tile and load into memory.
    ///
    /// Note that this can consume gigabytes of RAM when loading many
    /// tiles.
    InMem,

    /// Memory map file contents.
    MemMap,
}

/// Returns `Ok(None)` in place of a not-found error.
fn open_optional(path: &Path) -> Result<Option<File>, TerrainError> {
    match File::open(path) {
        Ok(file) => Ok(Some(file)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Fails early if `dir` holds no file with extension `ext`.
fn ensure_has_tiles(dir: &Path, ext: &'static str) -> Result<(), TerrainError> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path
            .extension()
            .and_then(std::ffi::OsStr::to_str)
            .is_some_and(|e| e.eq_ignore_ascii_case(ext))
        {
            return Ok(());
        }
    }
    Err(TerrainError::NoTiles {
        dir: dir.to_owned(),
        ext,
    })
}

/// Plain-text SPLAT! data files.
///
/// A file named `N:N+1:W:W+1.sdf` (`-hd.sdf` at 3600 points per
/// degree) starts with four integers, `max_west`, `min_north`,
/// `min_west` and `max_north`, followed by `ppd * ppd` elevations in
/// meters in grid order.
#[derive(Debug, Clone)]
pub struct SdfLoader {
    dir: PathBuf,
}

impl SdfLoader {
    pub fn new(dir: PathBuf) -> Result<Self, TerrainError> {
        ensure_has_tiles(&dir, "sdf")?;
        Ok(Self { dir })
    }

    /// Returns the expected file name for `cell`.
    pub fn file_name(Coord { x, y }: Coord<i32>, ppd: usize) -> String {
        let hd = if ppd == 3600 { "-hd" } else { "" };
        format!("{}:{}:{}:{}{hd}.sdf", y, y + 1, x, (x + 1) % 360)
    }
}

impl TileLoader for SdfLoader {
    fn load(&self, cell: Coord<i32>, ppd: usize) -> Result<Option<Tile>, TerrainError> {
        let path = self.dir.join(Self::file_name(cell, ppd));
        let Some(file) = open_optional(&path)? else {
            return Ok(None);
        };
        debug!("loading {path:?}");

        let mut text = String::new();
        BufReader::new(file).read_to_string(&mut text)?;
        let mut values = text.split_ascii_whitespace().map(|word| {
            word.parse::<i32>()
                .map_err(|e| TerrainError::format(&path, format!("{word:?}: {e}")))
        });
        let mut next = || {
            values
                .next()
                .unwrap_or_else(|| Err(TerrainError::format(&path, "truncated")))
        };

        let header = [next()?, next()?, next()?, next()?];
        let [max_west, min_north, min_west, max_north] = header;
        if min_north != cell.y
            || max_north != cell.y + 1
            || min_west != cell.x
            || max_west.rem_euclid(360) != (cell.x + 1) % 360
        {
            return Err(TerrainError::format(
                &path,
                format!("header {header:?} does not match cell {cell:?}"),
            ));
        }

        let mut samples = Vec::with_capacity(ppd * ppd);
        for _ in 0..ppd * ppd {
            let sample = next()?;
            let sample = i16::try_from(sample)
                .map_err(|_| TerrainError::format(&path, format!("elevation {sample} out of range")))?;
            samples.push(sample);
        }
        Ok(Some(Tile::from_samples(cell, ppd, samples.into_boxed_slice())))
    }
}

/// SRTM / NASADEM `.hgt` files.
///
/// # References
///
/// 1. [30-Meter SRTM Tile Downloader](https://dwtkns.com/srtm30m)
/// 1. [SRTM Collection User Guide](https://lpdaac.usgs.gov/documents/179/SRTM_User_Guide_V3.pdf)
#[derive(Debug, Clone)]
pub struct HgtLoader {
    /// Directory containing HGT tile files.
    dir: PathBuf,

    /// How to load tiles (in-memory or mapped).
    mode: TileMode,
}

impl HgtLoader {
    pub fn new(dir: PathBuf, mode: TileMode) -> Result<Self, TerrainError> {
        // Let's try to fail early be checking that dir has at least
        // one `hgt` file.
        ensure_has_tiles(&dir, "hgt")?;
        Ok(Self { dir, mode })
    }

    /// Returns the expected file name for `cell`, e.g. `N44W072.hgt`.
    pub fn file_name(Coord { x, y }: Coord<i32>) -> String {
        // HGT files are named by their south-west corner.
        let lon = {
            let lon = -(x + 1);
            if lon < -180 {
                lon + 360
            } else {
                lon
            }
        };
        let n_s = if y.is_negative() { 'S' } else { 'N' };
        let e_w = if lon.is_negative() { 'W' } else { 'E' };
        format!("{n_s}{:02}{e_w}{:03}.hgt", y.abs(), lon.abs())
    }

    fn path(&self, cell: Coord<i32>) -> PathBuf {
        let file_name = Self::file_name(cell);
        let path = self.dir.join(&file_name);
        if path.exists() {
            path
        } else {
            self.dir.join(file_name.to_lowercase())
        }
    }
}

/// Returns points per degree from an HGT file's length.
fn extract_ppd(path: &Path, len: u64) -> Result<usize, TerrainError> {
    const RES_1_ARCSECOND: u64 = 3601 * 3601 * size_of::<i16>() as u64;
    const RES_3_ARCSECOND: u64 = 1201 * 1201 * size_of::<i16>() as u64;
    match len {
        RES_1_ARCSECOND => Ok(3600),
        RES_3_ARCSECOND => Ok(1200),
        invalid => Err(TerrainError::format(path, format!("invalid length {invalid}"))),
    }
}

impl TileLoader for HgtLoader {
    fn load(&self, cell: Coord<i32>, ppd: usize) -> Result<Option<Tile>, TerrainError> {
        let path = self.path(cell);
        let Some(file) = open_optional(&path)? else {
            return Ok(None);
        };
        debug!("loading {path:?}");

        let found = extract_ppd(&path, file.metadata()?.len())?;
        if found != ppd {
            return Err(TerrainError::Resolution {
                cell,
                expected: ppd,
                found,
            });
        }

        match self.mode {
            TileMode::MemMap => {
                let raw = unsafe { Mmap::map(&file)? };
                Ok(Some(Tile::from_hgt(cell, ppd, raw, &path)?))
            }
            TileMode::InMem => {
                let side = ppd + 1;
                let mut raw = Vec::with_capacity(side * side);
                let mut file = BufReader::new(file);
                for _ in 0..side * side {
                    raw.push(file.read_i16::<BE>()?);
                }
                // Drop the overlapping north row and east column.
                Ok(Some(Tile::from_fn(cell, ppd, |x, y| {
                    match raw[(ppd - x) * side + (ppd - 1 - y)] {
                        HGT_VOID => 0,
                        sample => sample,
                    }
                })))
            }
        }
    }
}

type ElevationFn = Box<dyn Fn(f64, f64) -> i16 + Send + Sync>;

/// Synthetic terrain for tests and demos.
///
/// Each registered cell is sampled from a function of (lat, west
/// positive lon); cells without a function are reported missing.
#[derive(Default)]
pub struct MemoryLoader {
    cells: HashMap<Coord<i32>, ElevationFn>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cell<F>(mut self, cell: Coord<i32>, f: F) -> Self
    where
        F: Fn(f64, f64) -> i16 + Send + Sync + 'static,
    {
        self.cells.insert(cell, Box::new(f));
        self
    }

    pub fn with_flat(self, cell: Coord<i32>, elevation: i16) -> Self {
        self.with_cell(cell, move |_, _| elevation)
    }
}

impl TileLoader for MemoryLoader {
    fn load(&self, cell: Coord<i32>, ppd: usize) -> Result<Option<Tile>, TerrainError> {
        Ok(self.cells.get(&cell).map(|f| {
            Tile::from_fn(cell, ppd, |x, y| {
                let (lat, lon) = crate::tile::grid_location(cell, ppd, x, y);
                f(lat, lon)
            })
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::{HgtLoader, MemoryLoader, SdfLoader, TileLoader, TileMode};
    use crate::TerrainError;
    use byteorder::{BigEndian as BE, WriteBytesExt};
    use geo::geometry::Coord;
    use std::{fmt::Write as _, fs, io::Write as _};

    const MT_WASHINGTON: Coord<i32> = Coord { x: 71, y: 44 };

    #[test]
    fn test_file_names() {
        assert_eq!(HgtLoader::file_name(MT_WASHINGTON), "N44W072.hgt");
        assert_eq!(HgtLoader::file_name(Coord { x: 359, y: 0 }), "N00E000.hgt");
        assert_eq!(HgtLoader::file_name(Coord { x: 0, y: 0 }), "N00W001.hgt");
        assert_eq!(HgtLoader::file_name(Coord { x: 359, y: -1 }), "S01E000.hgt");
        assert_eq!(HgtLoader::file_name(Coord { x: 180, y: -1 }), "S01E179.hgt");
        assert_eq!(SdfLoader::file_name(MT_WASHINGTON, 1200), "44:45:71:72.sdf");
        assert_eq!(SdfLoader::file_name(Coord { x: 359, y: 0 }, 3600), "0:1:359:0-hd.sdf");
    }

    #[test]
    fn test_sdf_load() {
        let dir = tempfile::tempdir().unwrap();
        let ppd = 4;
        let mut text = String::from("72\n44\n71\n45\n");
        for i in 0..ppd * ppd {
            writeln!(text, "{}", 100 + i).unwrap();
        }
        fs::write(dir.path().join("44:45:71:72.sdf"), text).unwrap();

        let loader = SdfLoader::new(dir.path().to_owned()).unwrap();
        let tile = loader.load(MT_WASHINGTON, ppd).unwrap().unwrap();
        assert_eq!(tile.get(0, 0), 100);
        assert_eq!(tile.get(1, 2), 106);
        assert_eq!(tile.max_elevation(), 115);
        assert!(loader.load(Coord { x: 70, y: 44 }, ppd).unwrap().is_none());
    }

    #[test]
    fn test_sdf_rejects_bad_header() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("44:45:71:72.sdf"), "73 44 72 45 1 2 3 4").unwrap();
        let loader = SdfLoader::new(dir.path().to_owned()).unwrap();
        assert!(matches!(
            loader.load(MT_WASHINGTON, 2),
            Err(TerrainError::TileFormat { .. })
        ));
    }

    #[test]
    fn test_empty_dir_fails_early() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            HgtLoader::new(dir.path().to_owned(), TileMode::MemMap),
            Err(TerrainError::NoTiles { .. })
        ));
    }

    /// Writes a 3 arcsecond HGT file where each sample encodes its
    /// file row and column.
    fn write_hgt(dir: &std::path::Path) {
        let mut file = fs::File::create(dir.join("N44W072.hgt")).unwrap();
        let mut raw = Vec::with_capacity(1201 * 1201 * 2);
        for row in 0..1201_i16 {
            for col in 0..1201_i16 {
                let sample = if row == 600 && col == 600 {
                    i16::MIN
                } else {
                    row.wrapping_mul(7).wrapping_add(col)
                };
                raw.write_i16::<BE>(sample).unwrap();
            }
        }
        file.write_all(&raw).unwrap();
    }

    #[test]
    fn test_hgt_modes_agree() {
        let dir = tempfile::tempdir().unwrap();
        write_hgt(dir.path());
        let mapped = HgtLoader::new(dir.path().to_owned(), TileMode::MemMap)
            .unwrap()
            .load(MT_WASHINGTON, 1200)
            .unwrap()
            .unwrap();
        let in_mem = HgtLoader::new(dir.path().to_owned(), TileMode::InMem)
            .unwrap()
            .load(MT_WASHINGTON, 1200)
            .unwrap()
            .unwrap();

        // Grid (0, 0) is the south-east sample: last row, one column
        // short of the overlapping east edge.
        assert_eq!(mapped.get(0, 0), 1200 * 7 + 1199);
        // North-west corner of the grid is file row 1, column 0.
        assert_eq!(mapped.get(1199, 1199), 7);
        // Voids read as sea level.
        assert_eq!(mapped.get(600, 599), 0);
        for (x, y) in [(0, 0), (10, 20), (600, 599), (1199, 1199), (777, 3)] {
            assert_eq!(mapped.get(x, y), in_mem.get(x, y));
        }
        assert_eq!(mapped.min_elevation(), in_mem.min_elevation());
        assert_eq!(mapped.max_elevation(), in_mem.max_elevation());
    }

    #[test]
    fn test_hgt_resolution_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        write_hgt(dir.path());
        let loader = HgtLoader::new(dir.path().to_owned(), TileMode::MemMap).unwrap();
        assert!(matches!(
            loader.load(MT_WASHINGTON, 3600),
            Err(TerrainError::Resolution { found: 1200, .. })
        ));
        assert!(loader.load(Coord { x: 0, y: 0 }, 1200).unwrap().is_none());
    }

    #[test]
    fn test_memory_loader() {
        let loader = MemoryLoader::new().with_cell(MT_WASHINGTON, |lat, _| if lat < 44.5 { 10 } else { 20 });
        let tile = loader.load(MT_WASHINGTON, 120).unwrap().unwrap();
        assert_eq!(tile.get(0, 0), 10);
        assert_eq!(tile.get(119, 0), 20);
        assert!(loader.load(Coord { x: 0, y: 0 }, 120).unwrap().is_none());
    }
}
