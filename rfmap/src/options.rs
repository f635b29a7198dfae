use anyhow::{anyhow, Error as AnyError};
use clap::{Args, Parser, Subcommand, ValueEnum};
use itm::{Climate, Model, Params, Polarization};
use std::{path::PathBuf, str::FromStr};
use terrain::{Pages, Resolution, Site};

/// Terrain-aware RF path loss and coverage maps.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: Global,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Debug, Clone, Args)]
pub struct Global {
    /// Worker threads, 0 for one per core.
    #[arg(long, global = true, default_value_t = 0)]
    pub threads: usize,

    /// Use 3600 samples per degree tiles.
    #[arg(long, global = true)]
    pub hd: bool,

    /// Tile page budget: 1, 4, 9, 16, 25, 36, 49 or 64.
    #[arg(long, global = true, default_value_t = 16)]
    pub pages: usize,

    /// Directory of .sdf or .hgt elevation tiles.
    #[arg(long, global = true, default_value = ".")]
    pub tiles: PathBuf,

    /// Ground clutter height, in meters.
    #[arg(long, global = true, default_value_t = 0.0)]
    pub clutter: f64,
}

impl Global {
    pub fn resolution(&self) -> Resolution {
        if self.hd {
            Resolution::High
        } else {
            Resolution::Standard
        }
    }

    pub fn pages(&self) -> Result<Pages, AnyError> {
        Ok(Pages::new(self.pages)?)
    }
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Report path loss and geometry between two sites.
    P2p(P2p),

    /// Plot line-of-sight coverage of one or more transmitters.
    Los(Los),

    /// Plot Longley-Rice coverage of one or more transmitters.
    Coverage(Coverage),
}

#[derive(Debug, Clone, Args)]
pub struct P2p {
    /// Transmitter "lat,lon,alt[,amsl]", alt in feet above ground or,
    /// with "amsl", above sea level.
    #[arg(long)]
    pub tx: LatLonAlt,

    /// Receiver "lat,lon,alt[,amsl]".
    #[arg(long)]
    pub rx: LatLonAlt,

    #[command(flatten)]
    pub radio: Radio,
}

#[derive(Debug, Clone, Args)]
pub struct Los {
    /// Transmitter "lat,lon,alt[,amsl]", alt in feet above ground.
    /// Up to four get their own mask bit.
    #[arg(long, required = true)]
    pub tx: Vec<LatLonAlt>,

    /// Receiver height above ground, in feet.
    #[arg(long, default_value_t = 30.0)]
    pub rx_alt: f64,

    /// Limit the sweep radius, in miles.
    #[arg(long)]
    pub max_range: Option<f64>,
}

#[derive(Debug, Clone, Args)]
pub struct Coverage {
    /// Transmitter "lat,lon,alt[,amsl]", alt in feet above ground.
    #[arg(long, required = true)]
    pub tx: Vec<LatLonAlt>,

    /// Receiver height above ground, in feet.
    #[arg(long, default_value_t = 30.0)]
    pub rx_alt: f64,

    /// Limit the sweep radius, in miles.
    #[arg(long)]
    pub max_range: Option<f64>,

    /// Write per-pixel text records here. Several transmitters write
    /// one numbered file each.
    #[arg(long)]
    pub ano: Option<PathBuf>,

    /// Antenna pattern: 361 × 1001 whitespace separated field ratios,
    /// azimuth major.
    #[arg(long)]
    pub pattern: Option<PathBuf>,

    #[command(flatten)]
    pub radio: Radio,
}

#[derive(Debug, Clone, Args)]
pub struct Radio {
    /// Carrier frequency, in MHz.
    #[arg(long, default_value_t = 900.0)]
    pub frequency: f64,

    /// Effective radiated power, in watts. 0 reports path loss.
    #[arg(long, default_value_t = 0.0)]
    pub erp: f64,

    /// Report received power (dBm) instead of field strength.
    #[arg(long)]
    pub dbm: bool,

    /// Use Longley-Rice ITM 1.2.2 instead of ITWOM.
    #[arg(long)]
    pub itm: bool,

    /// Confidence, as a fraction.
    #[arg(long, default_value_t = 0.5)]
    pub conf: f64,

    /// Reliability, as a fraction.
    #[arg(long, default_value_t = 0.5)]
    pub rel: f64,

    /// Relative ground permittivity.
    #[arg(long, default_value_t = 15.0)]
    pub dielectric: f64,

    /// Ground conductivity, in siemens per meter.
    #[arg(long, default_value_t = 0.005)]
    pub conductivity: f64,

    /// Surface refractivity, in N-units.
    #[arg(long, default_value_t = 301.0)]
    pub refractivity: f64,

    /// Radio climate, by name or number 1 to 7.
    #[arg(long, value_enum, default_value_t = RadioClimate::ContinentalTemperate)]
    pub climate: RadioClimate,

    /// Antenna polarization, by name or number 0 or 1.
    #[arg(long, value_enum, default_value_t = AntennaPolarization::Vertical)]
    pub polarization: AntennaPolarization,
}

impl Default for Radio {
    fn default() -> Self {
        let params = Params::default();
        Self {
            frequency: params.frq_mhz,
            erp: 0.0,
            dbm: false,
            itm: false,
            conf: params.conf,
            rel: params.rel,
            dielectric: params.eps_dielect,
            conductivity: params.sgm_conductivity,
            refractivity: params.eno_ns_surfref,
            climate: RadioClimate::ContinentalTemperate,
            polarization: AntennaPolarization::Vertical,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RadioClimate {
    #[value(alias = "1")]
    Equatorial,
    #[value(alias = "2")]
    ContinentalSubtropical,
    #[value(alias = "3")]
    MaritimeSubtropical,
    #[value(alias = "4")]
    Desert,
    #[value(alias = "5")]
    ContinentalTemperate,
    #[value(alias = "6")]
    MaritimeTemperateOverLand,
    #[value(alias = "7")]
    MaritimeTemperateOverSea,
}

impl From<RadioClimate> for Climate {
    fn from(climate: RadioClimate) -> Self {
        match climate {
            RadioClimate::Equatorial => Self::Equatorial,
            RadioClimate::ContinentalSubtropical => Self::ContinentalSubtropical,
            RadioClimate::MaritimeSubtropical => Self::MaritimeSubtropical,
            RadioClimate::Desert => Self::Desert,
            RadioClimate::ContinentalTemperate => Self::ContinentalTemperate,
            RadioClimate::MaritimeTemperateOverLand => Self::MaritimeTemperateOverLand,
            RadioClimate::MaritimeTemperateOverSea => Self::MaritimeTemperateOverSea,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AntennaPolarization {
    #[value(alias = "0")]
    Horizontal,
    #[value(alias = "1")]
    Vertical,
}

impl From<AntennaPolarization> for Polarization {
    fn from(polarization: AntennaPolarization) -> Self {
        match polarization {
            AntennaPolarization::Horizontal => Self::Horizontal,
            AntennaPolarization::Vertical => Self::Vertical,
        }
    }
}

impl Radio {
    pub fn model(&self) -> Model {
        if self.itm {
            Model::Itm
        } else {
            Model::Itwom
        }
    }

    pub fn params(&self) -> Params {
        Params {
            eps_dielect: self.dielectric,
            sgm_conductivity: self.conductivity,
            eno_ns_surfref: self.refractivity,
            frq_mhz: self.frequency,
            radio_climate: self.climate.into(),
            pol: self.polarization.into(),
            conf: self.conf,
            rel: self.rel,
        }
    }
}

/// A site given as conventional, east-positive "lat,lon,alt", with
/// an optional trailing ",amsl" when alt is above sea level.
#[derive(Clone, Debug, PartialEq)]
pub struct LatLonAlt(pub Site);

impl FromStr for LatLonAlt {
    type Err = AnyError;
    fn from_str(s: &str) -> Result<Self, AnyError> {
        let mut fields = s.split(',').map(str::trim);
        let (Some(lat), Some(lon), Some(alt), amsl, None) = (
            fields.next(),
            fields.next(),
            fields.next(),
            fields.next(),
            fields.next(),
        ) else {
            return Err(anyhow!("{s:?} is not a valid lat,lon,alt"));
        };
        let amsl = match amsl {
            None => false,
            Some(flag) if flag.eq_ignore_ascii_case("amsl") => true,
            Some(flag) => return Err(anyhow!("{flag:?} is not a valid altitude reference")),
        };
        let lat = f64::from_str(lat)?;
        let lon = f64::from_str(lon)?;
        let alt = f64::from_str(alt)?;
        if !(-90.0..=90.0).contains(&lat) {
            return Err(anyhow!("latitude {lat} is out of range"));
        }
        Ok(Self(
            Site::from_east(lat, lon, alt)
                .above_sea_level(amsl)
                .named(s),
        ))
    }
}
