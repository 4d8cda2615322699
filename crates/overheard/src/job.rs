//! Recording job definitions as persisted in the job list.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A single recording task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// Direct stream address or a `.m3u`/`.pls` playlist reference.
    pub stream_url: String,
    /// Start expression such as `"Wed 6:00pm"`.
    pub start_time: String,
    /// Capture length such as `"1h30m"`.
    pub duration: String,
    /// Directory that receives the recording, created on demand.
    pub output_dir: PathBuf,
    /// Reschedule one week later after every run.
    #[serde(default, skip_serializing_if = "is_false")]
    pub recurring: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl Job {
    pub fn new(
        stream_url: impl Into<String>,
        start_time: impl Into<String>,
        duration: impl Into<String>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            stream_url: stream_url.into(),
            start_time: start_time.into(),
            duration: duration.into(),
            output_dir: output_dir.into(),
            recurring: false,
        }
    }

    pub fn recurring(mut self, recurring: bool) -> Self {
        self.recurring = recurring;
        self
    }

    /// Key used to find this job again in a freshly loaded job list.
    pub fn key(&self) -> JobKey {
        JobKey {
            stream_url: self.stream_url.clone(),
            start_time: self.start_time.clone(),
        }
    }
}

/// Identity of a job across reloads of the job list.
///
/// Entries are matched by stream address and the start expression as it was
/// *before* resolution, never by position: the list may be edited while a
/// recording is in progress.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobKey {
    pub stream_url: String,
    pub start_time: String,
}

impl JobKey {
    pub fn matches(&self, job: &Job) -> bool {
        job.stream_url == self.stream_url && job.start_time == self.start_time
    }
}

/// On-disk shape of the job list: older files hold a single record.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum JobDocument {
    Many(Vec<Job>),
    One(Job),
}

impl From<JobDocument> for Vec<Job> {
    fn from(document: JobDocument) -> Self {
        match document {
            JobDocument::Many(jobs) => jobs,
            JobDocument::One(job) => vec![job],
        }
    }
}
