//! Weekly rescheduling of recurring jobs.

use std::fmt::Display;

use chrono::{DateTime, Local, TimeDelta, TimeZone};
use tracing::{debug, info};

use crate::error::RecordError;
use crate::job::JobKey;
use crate::schedule::{format_start, resolve_start_at};
use crate::store::JobStoreHandle;

/// Distance between two runs of a recurring job.
const RECURRENCE_HOURS: i64 = 7 * 24;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RescheduleOutcome {
    /// The stored start expression was rewritten.
    Advanced { from: String, to: String },
    /// No entry matched; the job was removed or edited meanwhile.
    NotFound,
}

/// Advances recurring jobs in the persisted list, one at a time.
#[derive(Clone)]
pub struct Rescheduler {
    store: JobStoreHandle,
}

impl Rescheduler {
    pub fn new(store: JobStoreHandle) -> Self {
        Self { store }
    }

    pub async fn reschedule(&self, key: &JobKey) -> Result<RescheduleOutcome, RecordError> {
        self.reschedule_at(key, &Local::now()).await
    }

    /// Re-read the list, move the entry matching `key` one week forward and
    /// write the list back, all under the store lock.
    pub async fn reschedule_at<Tz>(
        &self,
        key: &JobKey,
        now: &DateTime<Tz>,
    ) -> Result<RescheduleOutcome, RecordError>
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let advanced = self
            .store
            .update(|jobs| {
                let Some(entry) = jobs.iter_mut().find(|job| key.matches(job)) else {
                    return Ok(None);
                };

                let current = resolve_start_at(&entry.start_time, now)?;
                let next = current + TimeDelta::hours(RECURRENCE_HOURS);
                let from = std::mem::replace(&mut entry.start_time, format_start(&next));

                Ok::<_, RecordError>(Some((from, entry.start_time.clone())))
            })
            .await?;

        match advanced {
            Some((from, to)) => {
                info!(stream_url = %key.stream_url, from = %from, to = %to, "Rescheduled recurring job");
                Ok(RescheduleOutcome::Advanced { from, to })
            }
            None => {
                debug!(stream_url = %key.stream_url, start_time = %key.start_time, "Recurring job no longer in job list");
                Ok(RescheduleOutcome::NotFound)
            }
        }
    }
}
