/// Error taxonomy for the core crate.
///
/// Item-level problems (an unreadable folder, a malformed extract row) never
/// surface here; they are logged and counted in [`crate::RunStats`]. Values
/// of this type abort the stage that produced them.
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Keyword map error: {0}")]
    Keywords(String),

    #[error("Cannot write {}: {source}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Worker pool error: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    #[error("{stage} stage failed: {message}")]
    Stage { stage: &'static str, message: String },
}

impl Error {
    /// Wrap an I/O error with the output path it concerns.
    pub fn output(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Output {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
