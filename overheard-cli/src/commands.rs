use std::path::PathBuf;
use std::time::Duration;

use overheard_engine::{
    CaptureConfig, Job, JobStoreHandle, Recorder, Runner, YamlJobStore, create_client,
    format_start, parse_duration, resolve_start,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::error::{AppError, Result};
use crate::output;

pub struct CommandExecutor {
    config: AppConfig,
}

impl CommandExecutor {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    fn store(&self) -> JobStoreHandle {
        JobStoreHandle::new(YamlJobStore::new(&self.config.jobs_path))
    }

    /// Run every job in the list until all of them finish or Ctrl-C is pressed.
    pub async fn record(&self, connect_timeout: Duration) -> Result<()> {
        let store = self.store();
        let jobs = store.load().await.map_err(AppError::Config)?;

        if jobs.is_empty() {
            warn!(path = %self.config.jobs_path.display(), "Job list is empty, nothing to record");
            return Ok(());
        }
        info!(jobs = jobs.len(), path = %self.config.jobs_path.display(), "Loaded job list");

        let capture_config = CaptureConfig {
            connect_timeout,
            ..CaptureConfig::default()
        };
        let client = create_client(&capture_config)?;
        let recorder = Recorder::new(client, store)
            .with_write_buffer_size(capture_config.write_buffer_size);
        let runner = Runner::new(recorder);

        let cancel = CancellationToken::new();
        let shutdown = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown requested, stopping recordings");
                shutdown.cancel();
            }
        });

        let reports = runner.run(jobs, cancel).await;
        output::print_summary(&reports);
        Ok(())
    }

    /// Validate a job, normalise its start time and append it to the list.
    pub async fn add(
        &self,
        stream_url: String,
        start: String,
        duration: String,
        output_dir: PathBuf,
        recurring: bool,
    ) -> Result<()> {
        parse_duration(&duration)?;
        let next = resolve_start(&start)?;
        let start_time = format_start(&next);

        let job = Job::new(stream_url, start_time, duration, output_dir).recurring(recurring);
        let count = self.store().append(job).await?;

        println!(
            "Added job starting {} (next: {}), {} job(s) in {}",
            format_start(&next),
            next.format("%Y-%m-%d %H:%M %:z"),
            count,
            self.config.jobs_path.display()
        );
        Ok(())
    }

    pub async fn show_config(&self) -> Result<()> {
        let path = &self.config.jobs_path;
        println!("Job list: {}", path.display());

        match self.store().load().await {
            Ok(jobs) => println!("Status: ok, {} job(s)", jobs.len()),
            Err(e) if e.is_not_found() => println!("Status: not created yet"),
            Err(e) => println!("Status: invalid ({e})"),
        }
        Ok(())
    }
}
