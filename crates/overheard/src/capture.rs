//! # Capture Executor
//!
//! Records one job: waits for its start time, resolves playlist references,
//! opens the stream and copies bytes to a fresh file until the stream ends or
//! the recording window closes.
//!
//! The window is measured from the moment the connection is opened, not from
//! the scheduled start, and running out of window is the normal way for a
//! live stream capture to end.

use std::fmt;
use std::path::PathBuf;
use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Local, Utc};
use futures::{Stream, StreamExt};
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::config::CaptureConfig;
use crate::error::RecordError;
use crate::job::Job;
use crate::output::{create_output_file, ensure_output_dir, extension_for};
use crate::playlist::{HttpPlaylistResolver, PlaylistResolver, is_playlist};
use crate::reschedule::{RescheduleOutcome, Rescheduler};
use crate::schedule::{parse_duration, resolve_start};
use crate::store::JobStoreHandle;

/// Why a copy stopped before the stream ended on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TruncationReason {
    /// The recording window elapsed.
    Deadline,
    /// The connection failed mid-stream.
    Network(String),
    /// Shutdown was requested.
    Cancelled,
}

impl fmt::Display for TruncationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deadline => f.write_str("recording window elapsed"),
            Self::Network(reason) => write!(f, "stream error: {reason}"),
            Self::Cancelled => f.write_str("shutdown requested"),
        }
    }
}

/// Result of copying a stream body to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// The stream ended before the window closed.
    Completed { bytes: u64 },
    /// The copy stopped early; everything received so far is on disk.
    Truncated { bytes: u64, reason: TruncationReason },
    /// Writing to the output file failed.
    Failed { bytes: u64, reason: String },
}

impl CaptureOutcome {
    pub fn bytes(&self) -> u64 {
        match self {
            Self::Completed { bytes }
            | Self::Truncated { bytes, .. }
            | Self::Failed { bytes, .. } => *bytes,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Copy `stream` into `writer` until it ends, `deadline` passes or `cancel` fires.
///
/// Stream errors and deadline expiry are not errors here: they end the copy
/// with [`CaptureOutcome::Truncated`] and the exact number of bytes written.
pub async fn copy_stream<S, E, W>(
    stream: S,
    writer: &mut W,
    deadline: Instant,
    cancel: &CancellationToken,
) -> CaptureOutcome
where
    S: Stream<Item = Result<Bytes, E>>,
    E: fmt::Display,
    W: AsyncWrite + Unpin,
{
    let mut stream = pin!(stream);
    let mut bytes = 0u64;

    let outcome = loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            next = tokio::time::timeout_at(deadline, stream.next()) => Some(next),
        };

        match next {
            None => {
                break CaptureOutcome::Truncated {
                    bytes,
                    reason: TruncationReason::Cancelled,
                };
            }
            Some(Err(_elapsed)) => {
                break CaptureOutcome::Truncated {
                    bytes,
                    reason: TruncationReason::Deadline,
                };
            }
            Some(Ok(None)) => break CaptureOutcome::Completed { bytes },
            Some(Ok(Some(Err(e)))) => {
                break CaptureOutcome::Truncated {
                    bytes,
                    reason: TruncationReason::Network(e.to_string()),
                };
            }
            Some(Ok(Some(Ok(chunk)))) => {
                if let Err(e) = writer.write_all(&chunk).await {
                    break CaptureOutcome::Failed {
                        bytes,
                        reason: e.to_string(),
                    };
                }
                bytes += chunk.len() as u64;
            }
        }
    };

    match writer.flush().await {
        Err(e) if !outcome.is_failure() => CaptureOutcome::Failed {
            bytes,
            reason: e.to_string(),
        },
        _ => outcome,
    }
}

/// A finished capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recording {
    pub path: PathBuf,
    pub outcome: CaptureOutcome,
    /// Set for recurring jobs.
    pub rescheduled: Option<RescheduleOutcome>,
}

/// Runs the capture pipeline for individual jobs.
pub struct Recorder {
    client: Client,
    resolver: Arc<dyn PlaylistResolver>,
    rescheduler: Rescheduler,
    write_buffer_size: usize,
}

impl Recorder {
    pub fn new(client: Client, store: JobStoreHandle) -> Self {
        Self {
            resolver: Arc::new(HttpPlaylistResolver::new(client.clone())),
            client,
            rescheduler: Rescheduler::new(store),
            write_buffer_size: CaptureConfig::default().write_buffer_size,
        }
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn PlaylistResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_write_buffer_size(mut self, size: usize) -> Self {
        self.write_buffer_size = size.max(1);
        self
    }

    /// Validate the job, wait for its start time, then [`capture`](Self::capture) it.
    #[instrument(skip_all, fields(stream_url = %job.stream_url))]
    pub async fn record(
        &self,
        job: &Job,
        cancel: &CancellationToken,
    ) -> Result<Recording, RecordError> {
        let duration = parse_duration(&job.duration)?;
        let start = resolve_start(&job.start_time)?;

        info!(start = %start.to_rfc2822(), "Job loaded, waiting for start time");
        wait_until(start, cancel).await?;

        self.capture(job, duration, cancel).await
    }

    /// Record `job` right away for at most `duration`, then reschedule it if recurring.
    #[instrument(skip_all, fields(stream_url = %job.stream_url))]
    pub async fn capture(
        &self,
        job: &Job,
        duration: Duration,
        cancel: &CancellationToken,
    ) -> Result<Recording, RecordError> {
        let stream_url = if is_playlist(&job.stream_url) {
            tokio::select! {
                _ = cancel.cancelled() => return Err(RecordError::Cancelled),
                resolved = self.resolver.resolve(&job.stream_url) => resolved?,
            }
        } else {
            job.stream_url.clone()
        };

        let deadline = Instant::now() + duration;
        debug!(stream_url = %stream_url, duration = ?duration, "Opening stream");

        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(RecordError::Cancelled),
            response = tokio::time::timeout_at(deadline, self.client.get(&stream_url).send()) => response,
        };
        let response = response
            .map_err(|_| RecordError::StreamTimeout {
                url: stream_url.clone(),
            })?
            .map_err(|source| RecordError::Stream {
                url: stream_url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RecordError::StreamStatus {
                url: stream_url,
                status,
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok());
        let extension = extension_for(content_type);

        ensure_output_dir(&job.output_dir).await?;
        let (path, file) =
            create_output_file(&job.output_dir, Utc::now().timestamp(), extension).await?;

        info!(path = %path.display(), "Recording started");

        let mut writer = BufWriter::with_capacity(self.write_buffer_size, file);
        let outcome = copy_stream(response.bytes_stream(), &mut writer, deadline, cancel).await;
        report_outcome(&path, &outcome);

        let rescheduled = if job.recurring {
            Some(self.rescheduler.reschedule(&job.key()).await?)
        } else {
            None
        };

        Ok(Recording {
            path,
            outcome,
            rescheduled,
        })
    }
}

/// Single deadline wait; only shutdown interrupts it.
async fn wait_until(start: DateTime<Local>, cancel: &CancellationToken) -> Result<(), RecordError> {
    let wait = (start - Local::now()).to_std().unwrap_or_default();
    debug!(wait = ?wait, "Sleeping until start time");

    tokio::select! {
        _ = cancel.cancelled() => Err(RecordError::Cancelled),
        _ = tokio::time::sleep(wait) => Ok(()),
    }
}

fn report_outcome(path: &std::path::Path, outcome: &CaptureOutcome) {
    match outcome {
        CaptureOutcome::Completed { bytes } => {
            info!(path = %path.display(), bytes, "Stream ended, recording finished");
        }
        CaptureOutcome::Truncated { bytes, reason } => {
            info!(path = %path.display(), bytes, reason = %reason, "Recording stopped");
        }
        CaptureOutcome::Failed { bytes, reason } => {
            warn!(path = %path.display(), bytes, reason = %reason, "Recording failed while writing");
        }
    }

    if outcome.bytes() == 0 {
        warn!(path = %path.display(), "0 bytes were written, stream may be empty");
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use futures::stream;

    use super::*;

    fn chunk(data: &'static [u8]) -> Result<Bytes, io::Error> {
        Ok(Bytes::from_static(data))
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_stream_completes_before_deadline() {
        let body = stream::iter(vec![chunk(b"ID3"), chunk(b"frame-1"), chunk(b"frame-2")]);
        let mut out = Vec::new();
        let deadline = Instant::now() + Duration::from_secs(3600);

        let started = Instant::now();
        let outcome = copy_stream(body, &mut out, deadline, &CancellationToken::new()).await;

        assert_eq!(outcome, CaptureOutcome::Completed { bytes: 17 });
        assert_eq!(out, b"ID3frame-1frame-2");
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_truncates_mid_stream() {
        let body = stream::iter(vec![chunk(b"abcd"), chunk(b"efgh")])
            .chain(stream::pending::<Result<Bytes, io::Error>>());
        let mut out = Vec::new();
        let deadline = Instant::now() + Duration::from_secs(5);

        let outcome = copy_stream(body, &mut out, deadline, &CancellationToken::new()).await;

        assert_eq!(
            outcome,
            CaptureOutcome::Truncated {
                bytes: 8,
                reason: TruncationReason::Deadline,
            }
        );
        assert_eq!(out, b"abcdefgh");
        assert!(!outcome.is_failure());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_chunks_stop_at_deadline() {
        let body = stream::iter(0..10u8).then(|i| async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            Ok::<_, io::Error>(Bytes::from(vec![i; 4]))
        });
        let mut out = Vec::new();
        let deadline = Instant::now() + Duration::from_millis(3500);

        let outcome = copy_stream(body, &mut out, deadline, &CancellationToken::new()).await;

        assert_eq!(
            outcome,
            CaptureOutcome::Truncated {
                bytes: 12,
                reason: TruncationReason::Deadline,
            }
        );
        assert_eq!(out, [0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2]);
    }

    #[tokio::test]
    async fn test_network_error_keeps_partial_data() {
        let body = stream::iter(vec![
            chunk(b"partial"),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "connection reset")),
            chunk(b"never"),
        ]);
        let mut out = Vec::new();
        let deadline = Instant::now() + Duration::from_secs(60);

        let outcome = copy_stream(body, &mut out, deadline, &CancellationToken::new()).await;

        assert_eq!(
            outcome,
            CaptureOutcome::Truncated {
                bytes: 7,
                reason: TruncationReason::Network("connection reset".to_string()),
            }
        );
        assert_eq!(out, b"partial");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_stops_copy() {
        let body = stream::iter(vec![chunk(b"abc")]).chain(stream::pending());
        let mut out = Vec::new();
        let deadline = Instant::now() + Duration::from_secs(3600);
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(10)).await;
            trigger.cancel();
        });

        let outcome = copy_stream(body, &mut out, deadline, &cancel).await;
        assert_eq!(
            outcome,
            CaptureOutcome::Truncated {
                bytes: 3,
                reason: TruncationReason::Cancelled,
            }
        );
    }

    #[tokio::test]
    async fn test_empty_stream_is_completed_with_zero_bytes() {
        let body = stream::empty::<Result<Bytes, io::Error>>();
        let mut out = Vec::new();
        let deadline = Instant::now() + Duration::from_secs(60);

        let outcome = copy_stream(body, &mut out, deadline, &CancellationToken::new()).await;
        assert_eq!(outcome, CaptureOutcome::Completed { bytes: 0 });
        assert!(out.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_is_interrupted_by_shutdown() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let start = Local::now() + chrono::TimeDelta::hours(5);
        assert!(matches!(
            wait_until(start, &cancel).await,
            Err(RecordError::Cancelled)
        ));
    }

    #[tokio::test]
    async fn test_past_start_does_not_wait() {
        let start = Local::now() - chrono::TimeDelta::seconds(30);
        wait_until(start, &CancellationToken::new()).await.unwrap();
    }
}
