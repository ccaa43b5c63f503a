//! Error types for the terrain engine

use thiserror::Error;

/// Main error type for the engine
#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("terrain format error: {0}")]
    Format(String),

    #[error("GPU error: {0}")]
    Gpu(String),
}
