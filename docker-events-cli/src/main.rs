//! Docker Events Conformance CLI
//!
//! Command-line harness around the docker-events-parser library. Two modes:
//! - Live mode (default): run a short-lived container while capturing
//!   `docker events`, then verify the expected operations all appeared.
//! - Offline mode (`--events-file`): reconcile an already-captured event
//!   stream, useful for checking saved daemon output without a docker host.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

mod config;
mod docker;
mod harness;
mod report;

use config::HarnessConfig;

/// Verify a container produces every expected docker event
#[derive(Parser, Debug)]
#[command(name = "docker-events-cli")]
#[command(about = "Reconcile docker events output against expected operations", long_about = None)]
#[command(version)]
struct Args {
    /// Path to configuration file (config.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Image for the test container (overrides config)
    #[arg(long, value_name = "IMAGE")]
    image: Option<String>,

    /// Comma-delimited expected operations (overrides config)
    #[arg(long, value_name = "OPS")]
    expect: Option<String>,

    /// Seconds to wait for trailing events (overrides config)
    #[arg(long, value_name = "SECONDS")]
    wait_stop: Option<u64>,

    /// Maximum unparseable lines tolerated (overrides config)
    #[arg(long, value_name = "COUNT")]
    allowance: Option<usize>,

    /// Fail when operations outside the expected set are observed
    #[arg(long)]
    strict: bool,

    /// Reconcile a previously captured events file instead of running docker
    #[arg(long, value_name = "FILE")]
    events_file: Option<PathBuf>,

    /// Container id to check in offline mode (64 hex chars)
    #[arg(long, value_name = "CID", requires = "events_file")]
    cid: Option<String>,

    /// Emit the report as JSON instead of text
    #[arg(long)]
    json: bool,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    log::info!("docker-events-cli v{}", env!("CARGO_PKG_VERSION"));
    log::info!("using parser library v{}", docker_events_parser::VERSION);

    let mut config = match &args.config {
        Some(path) => config::load_config(path)?,
        None => HarnessConfig::default(),
    };
    apply_overrides(&mut config, &args);

    if let Some(events_file) = &args.events_file {
        offline_mode(events_file, &config, &args)
    } else {
        live_mode(config, &args)
    }
}

/// Command-line values win over file values
fn apply_overrides(config: &mut HarnessConfig, args: &Args) {
    if let Some(image) = &args.image {
        config.image = image.clone();
    }
    if let Some(expect) = &args.expect {
        config.expect_events = expect.clone();
    }
    if let Some(wait_stop) = args.wait_stop {
        config.wait_stop = wait_stop;
    }
    if let Some(allowance) = args.allowance {
        config.unparseable_allowance = allowance;
    }
    if args.strict {
        config.fail_on_unexpected = true;
    }
}

/// Run the full lifecycle against a live docker daemon
fn live_mode(config: HarnessConfig, args: &Args) -> Result<()> {
    let mut subtest = harness::EventsSubtest::new(config);
    let report = subtest.run()?;
    print_report(&report, args.json)
}

/// Reconcile a saved capture without touching docker
fn offline_mode(events_file: &PathBuf, config: &HarnessConfig, args: &Args) -> Result<()> {
    use docker_events_parser::{EventIndex, StreamParser};

    let captured = std::fs::read_to_string(events_file)
        .with_context(|| format!("failed to read events file: {:?}", events_file))?;

    match &args.cid {
        Some(cid) => {
            let report = harness::check_events(
                &captured,
                cid,
                &config.expected_operations(),
                config.unparseable_allowance,
                config.fail_on_unexpected,
            )?;
            print_report(&report, args.json)
        }
        None => {
            // No target container: just summarize what the capture holds
            let records = StreamParser::new(Some(config.unparseable_allowance))
                .parse(&captured)?;
            let mut index = EventIndex::new();
            index.merge(records);
            for (id, events) in index.iter() {
                let ops: Vec<_> = events
                    .iter()
                    .map(|e| e.operation.as_deref().unwrap_or("<none>"))
                    .collect();
                println!("{}: {}", id, ops.join(", "));
            }
            Ok(())
        }
    }
}

fn print_report(report: &report::CheckReport, json: bool) -> Result<()> {
    if json {
        println!("{}", report::render_json(report)?);
    } else {
        print!("{}", report::render_text(report));
    }
    Ok(())
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
