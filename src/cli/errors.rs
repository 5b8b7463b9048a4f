use std::path::PathBuf;

use thiserror::Error;

/// Application-specific errors for the CLI
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Input directory does not exist: {path:?}")]
    MissingInput { path: PathBuf },

    #[error("Could not start resource monitor: {0}")]
    Monitor(#[source] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] sentimosaic::Error),
}
