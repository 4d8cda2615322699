use overheard_engine::{RecordError, StartTimeError, StoreError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("could not determine the user config directory")]
    NoConfigDir,

    /// The job list could not be loaded; nothing is scheduled.
    #[error("failed to load job list: {0}")]
    Config(#[source] StoreError),

    #[error("job list error: {0}")]
    Store(#[from] StoreError),

    #[error("invalid start time: {0}")]
    StartTime(#[from] StartTimeError),

    #[error("invalid job: {0}")]
    InvalidJob(#[from] RecordError),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}
