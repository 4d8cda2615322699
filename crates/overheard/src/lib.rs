//! Scheduling and capture engine for unattended internet radio recordings.
//!
//! A job list names streams, weekly start times and capture lengths. The
//! [`Runner`] starts one task per job; each task waits for its start time,
//! records the stream through a [`Recorder`] and, for recurring jobs, moves
//! the stored start time one week forward through the shared
//! [`JobStoreHandle`].

pub mod capture;
pub mod config;
pub mod error;
pub mod job;
pub mod output;
pub mod playlist;
pub mod reschedule;
pub mod runner;
pub mod schedule;
pub mod store;

pub use capture::{CaptureOutcome, Recorder, Recording, TruncationReason, copy_stream};
pub use config::{CaptureConfig, create_client};
pub use error::{PlaylistError, RecordError, StartTimeError, StoreError};
pub use job::{Job, JobKey};
pub use playlist::{HttpPlaylistResolver, PlaylistResolver};
pub use reschedule::{RescheduleOutcome, Rescheduler};
pub use runner::{JobReport, JobStatus, Runner};
pub use schedule::{format_start, parse_duration, resolve_start, resolve_start_at};
pub use store::{JobStore, JobStoreHandle, MemoryJobStore, YamlJobStore};
