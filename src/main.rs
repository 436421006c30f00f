use anyhow::Result;
use clap::{Parser, Subcommand};
use hostguard::config::{Config, LogFormat};
use hostguard::monitors::BaselineMonitor;
use hostguard::probe::{HostProbe, SystemProbe};
use hostguard::response::ResponseHandler;
use hostguard::scanner::{ContentScanner, PersistenceScanner};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "hostguard", version)]
#[command(about = "Baseline monitoring and persistence scanning for short-notice Linux defense")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "/etc/hostguard/config.toml")]
    config: PathBuf,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Output findings as JSON lines
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Continuously check for new processes, sessions, and file changes
    Monitor {
        /// Seconds between polls
        #[arg(short, long)]
        interval: Option<u64>,
    },
    /// Scan for common persistence mechanisms
    Scan {
        /// Automatically remediate what the decision table allows
        #[arg(short, long)]
        auto: bool,
    },
    /// Lock down cron/at and enforce nologin shells
    Harden,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if args.json {
        subscriber.json().init();
    } else {
        subscriber.with_target(false).init();
    }

    let mut config = Config::load_or_default(&args.config);
    if args.json {
        config.general.log_format = LogFormat::Json;
    }

    info!("Config: {}", args.config.display());

    let probe: Arc<dyn SystemProbe> = Arc::new(HostProbe);

    match args.command {
        Command::Monitor { interval } => {
            if let Some(secs) = interval {
                config.monitor.interval_secs = secs;
            }
            run_monitor(config, probe).await
        }
        Command::Scan { auto } => run_scan(config, probe, auto),
        Command::Harden => hostguard::hardening::run(&config, probe.as_ref()),
    }
}

async fn run_monitor(config: Config, probe: Arc<dyn SystemProbe>) -> Result<()> {
    let (event_tx, event_rx) = mpsc::channel(1024);

    let handler = ResponseHandler::new(
        config.general.log_format,
        false,
        probe.clone(),
        ContentScanner::new(config.persistence.signatures.clone()),
    );
    let handler_task = tokio::spawn(async move {
        handler.run(event_rx).await;
    });

    let mut monitor = BaselineMonitor::new(config.monitor, probe, event_tx);
    let monitor_task = tokio::spawn(async move {
        if let Err(e) = monitor.run().await {
            error!("Monitor error: {}", e);
        }
    });

    info!("Monitoring. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    info!("Shutting down...");
    monitor_task.abort();
    handler_task.abort();

    Ok(())
}

fn run_scan(config: Config, probe: Arc<dyn SystemProbe>, auto: bool) -> Result<()> {
    info!("Starting persistence scan (auto-remediate: {})", auto);

    let scanner = PersistenceScanner::new(config.persistence, &config.whitelists, probe.clone());
    let handler = ResponseHandler::new(
        config.general.log_format,
        auto,
        probe,
        scanner.content_scanner().clone(),
    );

    let findings = scanner.scan_all();
    let count = findings.len();
    for finding in &findings {
        handler.handle(finding);
    }

    info!("Persistence scan complete: {} findings", count);
    Ok(())
}
