use std::path::PathBuf;

use chrono::{NaiveDate, NaiveTime};
use reqwest::StatusCode;

/// Errors produced while turning a `"<Weekday> <h>:<mm><am|pm>"` expression into an instant.
#[derive(Debug, thiserror::Error)]
pub enum StartTimeError {
    #[error("invalid start time `{input}`: expected '<Weekday> <h>:<mm><am|pm>'")]
    InvalidFormat { input: String },

    #[error("invalid clock time `{input}`: expected '<h>:<mm><am|pm>'")]
    InvalidTime { input: String },

    #[error("invalid day of the week `{input}`")]
    InvalidWeekday { input: String },

    #[error("local time {time} does not exist on {date}")]
    NonexistentLocalTime { date: NaiveDate, time: NaiveTime },
}

/// Errors raised by the persisted job list.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to read job list at {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse job list at {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("failed to serialize job list: {source}")]
    Serialize { source: serde_yaml::Error },

    #[error("failed to write job list at {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl StoreError {
    /// Whether the store simply does not exist yet.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Read { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PlaylistError {
    #[error("could not fetch playlist {url}: {source}")]
    Fetch {
        url: String,
        source: reqwest::Error,
    },

    #[error("playlist request for {url} failed with HTTP {status}")]
    Status { url: String, status: StatusCode },

    #[error("no stream URL found in playlist")]
    Format,
}

/// Job-scoped failures. None of these ever abort sibling jobs.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("invalid duration `{input}`: {reason}")]
    InvalidDuration { input: String, reason: String },

    #[error("invalid start time: {0}")]
    InvalidStartTime(#[from] StartTimeError),

    #[error("could not get stream URL from playlist: {0}")]
    PlaylistResolution(#[from] PlaylistError),

    #[error("could not connect to stream {url}: {source}")]
    Stream {
        url: String,
        source: reqwest::Error,
    },

    #[error("stream {url} did not respond before the recording window closed")]
    StreamTimeout { url: String },

    #[error("stream {url} returned HTTP {status}")]
    StreamStatus { url: String, status: StatusCode },

    #[error("could not create output directory {}: {source}", .path.display())]
    OutputDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("could not create output file {}: {source}", .path.display())]
    OutputFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("could not reschedule job: {0}")]
    Reschedule(#[from] StoreError),

    #[error("job cancelled")]
    Cancelled,

    #[error("job task failed: {0}")]
    Task(String),
}

impl RecordError {
    pub fn invalid_duration(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDuration {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Errors caused by the job definition itself rather than the environment.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::InvalidDuration { .. } | Self::InvalidStartTime(_))
    }

    pub fn is_network(&self) -> bool {
        match self {
            Self::Stream { .. } | Self::StreamTimeout { .. } | Self::StreamStatus { .. } => true,
            Self::PlaylistResolution(err) => !matches!(err, PlaylistError::Format),
            _ => false,
        }
    }
}
