//! Runs every job of a loaded job list concurrently.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::capture::{CaptureOutcome, Recorder, Recording, TruncationReason};
use crate::error::RecordError;
use crate::job::Job;

/// Coarse result of one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    /// The stream ended on its own or the recording window elapsed.
    Completed,
    /// Something was recorded but the copy stopped early.
    Partial,
    Failed,
}

/// Result of one job's task.
#[derive(Debug)]
pub struct JobReport {
    pub job: Job,
    pub result: Result<Recording, RecordError>,
}

impl JobReport {
    pub fn status(&self) -> JobStatus {
        match &self.result {
            Err(_) => JobStatus::Failed,
            Ok(recording) => match &recording.outcome {
                CaptureOutcome::Completed { .. } => JobStatus::Completed,
                CaptureOutcome::Truncated {
                    reason: TruncationReason::Deadline,
                    ..
                } => JobStatus::Completed,
                CaptureOutcome::Truncated { .. } => JobStatus::Partial,
                CaptureOutcome::Failed { .. } => JobStatus::Failed,
            },
        }
    }
}

/// Spawns one task per job and collects a report for each.
pub struct Runner {
    recorder: Arc<Recorder>,
}

impl Runner {
    pub fn new(recorder: Recorder) -> Self {
        Self {
            recorder: Arc::new(recorder),
        }
    }

    /// Run all jobs to completion. Reports come back in job-list order.
    ///
    /// A failing or panicking job never affects its siblings.
    pub async fn run(&self, jobs: Vec<Job>, cancel: CancellationToken) -> Vec<JobReport> {
        let total = jobs.len();
        let mut tasks = JoinSet::new();

        for (index, job) in jobs.into_iter().enumerate() {
            let recorder = Arc::clone(&self.recorder);
            let cancel = cancel.clone();

            tasks.spawn(async move {
                let result = AssertUnwindSafe(recorder.record(&job, &cancel))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|panic| Err(RecordError::Task(panic_message(&*panic))));
                (index, JobReport { job, result })
            });
        }
        info!(jobs = total, "Scheduled all jobs");

        let mut slots: Vec<Option<JobReport>> = (0..total).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, report)) => {
                    log_report(&report);
                    slots[index] = Some(report);
                }
                Err(e) => warn!(error = %e, "Job task did not finish"),
            }
        }

        slots.into_iter().flatten().collect()
    }
}

fn log_report(report: &JobReport) {
    let stream_url = &report.job.stream_url;
    match &report.result {
        Ok(recording) => info!(
            stream_url = %stream_url,
            path = %recording.path.display(),
            bytes = recording.outcome.bytes(),
            "Job finished"
        ),
        Err(e) => error!(stream_url = %stream_url, error = %e, "Error recording job"),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "job panicked".to_string()
    }
}
