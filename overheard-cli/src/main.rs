mod cli;
mod commands;
mod config;
mod error;
mod output;

use std::process;

use chrono::Local;
use clap::Parser;
use mimalloc::MiMalloc;
use tracing::{Level, error};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use crate::{
    cli::{Args, Commands},
    commands::CommandExecutor,
    config::AppConfig,
    error::Result,
};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = run(args).await {
        error!("Application error: {}", e);
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    init_logging(args.verbose, args.quiet);

    let config = AppConfig::load(args.config.as_deref())?;
    let executor = CommandExecutor::new(config);

    match args.command {
        Commands::Record { connect_timeout } => executor.record(connect_timeout).await,
        Commands::Add {
            stream_url,
            start,
            duration,
            output_dir,
            recurring,
        } => {
            executor
                .add(stream_url, start, duration, output_dir, recurring)
                .await
        }
        Commands::Config => executor.show_config().await,
    }
}

/// Timestamps in local time, since job start times are local.
struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z"))
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_timer(LocalTimer)
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}
