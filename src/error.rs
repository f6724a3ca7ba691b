use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProcessingError>;

#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration load error: {0}")]
    ConfigLoad(#[from] config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Invalid file pattern: {0}")]
    InvalidPattern(#[from] glob::PatternError),

    #[error("Discovery failed for {}: {message}", path.display())]
    Discovery { path: PathBuf, message: String },

    #[error("Cannot read station file {}: {source}", path.display())]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid station file name: {0}")]
    InvalidStationFile(String),

    #[error("Store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("Weather store {} does not exist; run an ingestion first", .0.display())]
    StoreNotFound(PathBuf),

    #[error("Merge failed for station {station_id} on {date}: {source}")]
    Merge {
        station_id: String,
        date: NaiveDate,
        #[source]
        source: Box<ProcessingError>,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Async task error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),

    #[error("{skipped} of {discovered} station files could not be read and were skipped")]
    SkippedFiles { skipped: usize, discovered: usize },
}

impl ProcessingError {
    /// Faults scoped to a single station file; everything else is fatal to the run.
    pub fn is_file_access(&self) -> bool {
        matches!(
            self,
            ProcessingError::FileAccess { .. } | ProcessingError::InvalidStationFile(_)
        )
    }

    pub fn file_access(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ProcessingError::FileAccess {
            path: path.into(),
            source,
        }
    }
}
