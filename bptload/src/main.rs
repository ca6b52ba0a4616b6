//! bptload - load a CSV file into the B+Tree dataset service and probe it
//!
//! Creates a dataset named after the file, bulk-inserts every line keyed by
//! its line offset, then runs a fixed range query, deletes and searches,
//! printing each reply.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use bptload_client::workload::{self, CsvInput};
use bptload_client::{DatasetClient, Pacing, Phase, SleepPacer};

mod config;

use config::Config;

/// Load a CSV file into the dataset service and exercise its endpoints
#[derive(Parser, Debug)]
#[command(name = "bptload")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// CSV file to load; its base name becomes the dataset name
    csv: PathBuf,

    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Service host (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// Service port (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Read timeout in seconds, 0 to wait forever (overrides config)
    #[arg(short, long)]
    timeout: Option<u64>,

    /// Skip the pauses between requests
    #[arg(long)]
    no_pause: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging
    let log_level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    // Config file, then command-line overrides
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(secs) = args.timeout {
        config.server.read_timeout_secs = secs;
    }

    let input = CsvInput::load(&args.csv)
        .with_context(|| format!("loading {}", args.csv.display()))?;

    let mut client = DatasetClient::new(config.server.host.clone(), config.server.port)
        .with_read_timeout(config.read_timeout());
    let mut pacer = SleepPacer::new(if args.no_pause { Pacing::none() } else { config.pacing() });

    info!("Starting bptload v{}", env!("CARGO_PKG_VERSION"));
    info!("Service: {}", client.addr());
    match client.read_timeout() {
        Some(timeout) => info!("Read timeout: {:?}", timeout),
        None => info!("Read timeout: none"),
    }

    let name = input.dataset_name().clone();
    let summary = workload::run(&input, &mut client, &mut pacer, |step, reply| {
        match step.phase {
            Phase::Create { order } => {
                println!("\n=== Creating dataset '{}' with order {} ===", name, order)
            }
            phase => println!("\n=== {} ===", phase),
        }
        println!("{}", reply);
    })?;

    info!(
        "Done: {} requests, {} batches, {} JSON replies, {} raw replies",
        summary.requests, summary.batches, summary.json_replies, summary.raw_replies
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_are_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_single_positional() {
        let args = Args::try_parse_from(["bptload", "data.csv"]).unwrap();
        assert_eq!(args.csv, PathBuf::from("data.csv"));
        assert!(args.config.is_none());
        assert!(!args.no_pause);
    }

    #[test]
    fn test_missing_or_extra_positional_rejected() {
        assert!(Args::try_parse_from(["bptload"]).is_err());
        assert!(Args::try_parse_from(["bptload", "a.csv", "b.csv"]).is_err());
    }

    #[test]
    fn test_overrides() {
        let args = Args::try_parse_from([
            "bptload", "--host", "10.1.1.1", "-p", "7001", "-t", "0", "--no-pause", "x.csv",
        ])
        .unwrap();
        assert_eq!(args.host.as_deref(), Some("10.1.1.1"));
        assert_eq!(args.port, Some(7001));
        assert_eq!(args.timeout, Some(0));
        assert!(args.no_pause);
    }
}
