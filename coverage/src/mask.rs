//! Bit layout of the mask grid.
//!
//! | bits | meaning                                   |
//! |------|-------------------------------------------|
//! | 0    | visible from the first transmitter (LOS)  |
//! | 1    | site marker                               |
//! | 3-5  | visible from transmitters 2 to 4 (LOS)    |
//! | 3-7  | number of the last Longley-Rice transmitter |

use terrain::ElevationMap;

/// Marks a site on the rendered map.
pub const MARKER: u8 = 0b10;

/// Bits a Longley-Rice sweep leaves alone.
pub const KEEP_ON_STAMP: u8 = 0b111;

/// Largest transmitter number a Longley-Rice sweep can stamp.
pub const MAX_TX_NUMBER: usize = 31;

/// Returns the line-of-sight bit for the `tx_index`th transmitter
/// (zero based). Transmitters past the fourth share the fourth's
/// bit.
pub fn los_bit(tx_index: usize) -> u8 {
    match tx_index {
        0 => 1,
        1 => 8,
        2 => 16,
        _ => 32,
    }
}

/// Replaces the transmitter number (one based) in `mask`, keeping
/// the low bits.
#[allow(clippy::cast_possible_truncation)]
pub fn stamp(mask: u8, tx_number: usize) -> u8 {
    (mask & KEEP_ON_STAMP) | ((tx_number.min(MAX_TX_NUMBER) as u8) << 3)
}

/// ORs [`MARKER`] into the 3 × 3 samples around `lat`, `lon`.
#[allow(clippy::cast_precision_loss)]
pub fn place_marker(map: &ElevationMap, lat: f64, lon: f64) {
    let dpp = 1.0 / map.ppd() as f64;
    for i in [-1.0, 0.0, 1.0] {
        for j in [-1.0, 0.0, 1.0] {
            map.or_mask(lat + i * dpp, (lon + j * dpp).rem_euclid(360.0), MARKER);
        }
    }
}
