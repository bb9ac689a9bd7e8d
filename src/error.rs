use thiserror::Error;

use crate::config::ConfigError;
use crate::engine::EngineError;

/// Crate-level convenience error.
///
/// Not a "god error": it is a thin wrapper over the capability errors.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}
