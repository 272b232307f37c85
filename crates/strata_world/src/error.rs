use rayon::ThreadPoolBuildError;
use strata_shared::settings::ConfigError;
use thiserror::Error;

/// Startup failures. Nothing here is ever raised per region.
#[derive(Debug, Error)]
pub enum GenError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to start worker pool: {0}")]
    WorkerPool(#[from] ThreadPoolBuildError),
}

pub type GenResult<T> = Result<T, GenError>;
