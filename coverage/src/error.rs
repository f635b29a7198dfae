use terrain::TerrainError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoverageError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Terrain(#[from] TerrainError),

    #[error("antenna pattern has {found} gains, expected {expected}")]
    PatternShape { expected: usize, found: usize },

    #[error("antenna pattern gain {gain} at azimuth {azimuth}, bucket {bucket} is not a field ratio")]
    PatternGain { azimuth: usize, bucket: usize, gain: f32 },

    #[error("no terrain loaded to sweep")]
    EmptyMap,

    #[error("sweep cancelled")]
    Cancelled,

    #[error("worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}
