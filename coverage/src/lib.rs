//! Area coverage over terrain.
//!
//! Sweeps trace paths from a transmitter to every edge sample of an
//! [`terrain::ElevationMap`], either marking line-of-sight visibility
//! in the mask grid ([`Sweep::plot_los_map`]) or running the
//! Longley-Rice/ITWOM engine per pixel and merging the quantized
//! result into the signal grid ([`Sweep::plot_lr_map`]).

mod error;
mod los;
mod lr;
pub mod mask;
mod pattern;
mod progress;
mod quantize;
mod region;
mod sweep;

pub use crate::{
    error::CoverageError,
    los::plot_path,
    lr::LrSettings,
    pattern::{AntennaPattern, AZIMUTHS, ELEVATION_BUCKETS},
    quantize::{field_strength_dbuv, received_power_dbm, OutputQuantity},
    region::{Reach, Region},
    sweep::{count_mask, edge_targets, MapSummary, Sweep, SweepConfig},
};
