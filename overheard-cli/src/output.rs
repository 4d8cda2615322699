use humansize::{BINARY, format_size};
use overheard_engine::{CaptureOutcome, JobReport, JobStatus, Recording, RescheduleOutcome};

/// One line per job, e.g. `[ok] http://radio.example/live -> /srv/radio/recording-1700000000.mp3 (12.5 MiB)`.
pub fn report_line(report: &JobReport) -> String {
    let tag = match report.status() {
        JobStatus::Completed => "ok",
        JobStatus::Partial => "partial",
        JobStatus::Failed => "failed",
    };

    match &report.result {
        Ok(recording) => {
            let mut line = format!(
                "[{tag}] {} -> {} ({})",
                report.job.stream_url,
                recording.path.display(),
                format_size(recording.outcome.bytes(), BINARY),
            );
            if report.status() != JobStatus::Completed {
                line.push_str(&format!(": {}", outcome_reason(recording)));
            }
            if let Some(RescheduleOutcome::Advanced { to, .. }) = &recording.rescheduled {
                line.push_str(&format!(", next: {to}"));
            }
            line
        }
        Err(e) => format!("[{tag}] {}: {e}", report.job.stream_url),
    }
}

fn outcome_reason(recording: &Recording) -> String {
    match &recording.outcome {
        CaptureOutcome::Completed { .. } => "completed".to_string(),
        CaptureOutcome::Truncated { reason, .. } => reason.to_string(),
        CaptureOutcome::Failed { reason, .. } => reason.clone(),
    }
}

pub fn print_summary(reports: &[JobReport]) {
    let completed = reports
        .iter()
        .filter(|r| r.status() == JobStatus::Completed)
        .count();
    let partial = reports
        .iter()
        .filter(|r| r.status() == JobStatus::Partial)
        .count();
    let failed = reports.len() - completed - partial;

    for report in reports {
        match report.status() {
            JobStatus::Failed => eprintln!("{}", report_line(report)),
            _ => println!("{}", report_line(report)),
        }
    }
    println!("{completed} completed, {partial} partial, {failed} failed");
}
