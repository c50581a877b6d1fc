//! A deterministic soak driver for sketch aggregators.
//!
//! Runs a configurable number of producer threads against a single aggregator while a collector snapshots it on a fixed
//! interval, then checks that every recorded value was accounted for exactly once.

#![deny(warnings)]
#![deny(missing_docs)]

use anyhow::{Context as _, Result};
use tracing::{error, info};
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

mod config;
use self::config::Config;

mod driver;
use self::driver::Driver;

fn main() {
    tracing_subscriber::fmt()
        .compact()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_ansi(true)
        .with_target(true)
        .init();

    match run() {
        Ok(()) => info!("tally-soak stopped."),
        Err(e) => {
            error!("{:?}", e);
            std::process::exit(1);
        }
    }
}

fn run() -> Result<()> {
    info!("tally-soak starting...");

    let config_path = config_path(std::env::args())?;
    let config = Config::try_from_file(&config_path)?;
    let driver = Driver::new(config);
    let report = driver.run()?;
    report.verify()
}

/// Extracts the configuration file path from the command line arguments.
///
/// We only accept a single command line argument: the path to the configuration file.
fn config_path<I>(mut args: I) -> Result<String>
where
    I: Iterator<Item = String>,
{
    args.nth(1).context(
        "Path to the configuration file must be passed as the first (and only) argument to `tally-soak`.",
    )
}
