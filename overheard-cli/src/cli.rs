use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "overheard",
    version,
    about = "Schedule and record audio from internet radio streams",
    long_about = "overheard records internet radio streams on a weekly schedule.\n\
                  Add jobs with the `add` command, then leave `record` running: it waits\n\
                  for each job's start time and captures the stream for the configured duration."
)]
pub struct Args {
    /// Path to the job list (defaults to <config dir>/overheard/config.yaml)
    #[arg(short, long, global = true, env = "OVERHEARD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Wait for every scheduled job and record it
    Record {
        /// Time allowed to connect to a stream or playlist
        #[arg(long, default_value = "30s", value_parser = humantime::parse_duration)]
        connect_timeout: Duration,
    },

    /// Add a recording job to the job list
    Add {
        /// Stream URL, or a .m3u/.pls playlist URL
        #[arg(long)]
        stream_url: String,

        /// Weekly start time, e.g. "Wed 6:00pm"
        #[arg(long)]
        start: String,

        /// Recording length, e.g. "1h30m"
        #[arg(long)]
        duration: String,

        /// Directory that receives the recordings
        #[arg(long)]
        output_dir: PathBuf,

        /// Record again every week
        #[arg(long)]
        recurring: bool,
    },

    /// Show the job list location and validate its contents
    Config,
}
