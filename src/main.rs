use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use esostatus::catalog::{Catalog, Megaserver};
use esostatus::config::Config;
use esostatus::error;
use esostatus::fetcher::{StatusFetcher, StatusSource};
use esostatus::models::ServerStatusSnapshot;
use esostatus::notifications::{SharedSettings, StatusEvent, StatusPublisher};
use esostatus::parser::{ParseReport, StatusParser, Verdict};
use esostatus::poller::StatusPoller;

#[derive(Parser)]
#[command(
    name = "esostatus",
    version,
    about = "Watch ESO megaserver status and report online/offline transitions",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json); overrides the config file
    #[arg(long, global = true)]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the status page until interrupted
    Watch {
        /// Disable change notifications
        #[arg(long, default_value = "false")]
        quiet: bool,
    },

    /// Fetch and parse the status page once
    Check {
        /// Print JSON instead of a table
        #[arg(long, default_value = "false")]
        json: bool,

        /// Restrict to these servers (label or code, e.g. PCEU)
        #[arg(short, long)]
        server: Vec<Megaserver>,
    },

    /// Parse a saved status page
    Parse {
        /// HTML file to parse
        file: PathBuf,

        /// Print JSON instead of a table
        #[arg(long, default_value = "false")]
        json: bool,

        /// Restrict to these servers (label or code, e.g. PCEU)
        #[arg(short, long)]
        server: Vec<Megaserver>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(format) = cli.log_format {
        config.logging.format = format;
    }

    setup_tracing(&config.logging.level, &config.logging.format, cli.verbose)?;

    match cli.command {
        Commands::Watch { quiet } => {
            tracing::info!(url = %config.source.url, quiet = %quiet, "Starting watch command");
            if quiet {
                config.notifications.enabled = false;
            }
            watch(config).await?;
        }

        Commands::Check { json, server } => {
            tracing::info!(url = %config.source.url, json = %json, "Starting check command");
            let fetcher = StatusFetcher::from_config(&config.source)?;
            let document = fetcher.fetch().await.context("Failed to fetch status page")?;
            report(&document, &catalog_for(&server), json)?;
        }

        Commands::Parse { file, json, server } => {
            tracing::info!(file = %file.display(), json = %json, "Starting parse command");
            report_file(&file, &catalog_for(&server), json)
                .with_context(|| format!("Failed to parse {}", file.display()))?;
        }
    }

    Ok(())
}

fn setup_tracing(level: &str, format: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("esostatus=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .or_else(|_| tracing_subscriber::EnvFilter::try_new(format!("esostatus={level},warn")))
            .context("Invalid log level")?
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}

fn catalog_for(servers: &[Megaserver]) -> Catalog {
    if servers.is_empty() {
        Catalog::full()
    } else {
        Catalog::only(servers)
    }
}

async fn watch(config: Config) -> Result<()> {
    let settings = SharedSettings::new(config.notifications.enabled);
    let publisher = StatusPublisher::new(settings);
    let mut events = publisher.subscribe();

    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(StatusEvent::Tray(tray)) => println!("[{}] {}", tray.state(), tray.tooltip()),
                Ok(StatusEvent::Notification(message)) => {
                    for line in message.lines() {
                        println!("  * {line}");
                    }
                }
                Ok(StatusEvent::Snapshot(snapshot)) => {
                    tracing::debug!(
                        checked_at = %snapshot.checked_at(),
                        servers = snapshot.len(),
                        "Snapshot received"
                    );
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Event printer fell behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let fetcher = StatusFetcher::from_config(&config.source)?;
    let handle = StatusPoller::from_config(fetcher, publisher, &config)?.spawn();

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    tracing::info!("Shutdown signal received");

    let poller = handle.shutdown().await.context("Poller task failed")?;
    drop(poller);
    printer.await.context("Event printer failed")?;

    Ok(())
}

fn report_file(file: &Path, catalog: &Catalog, json: bool) -> error::Result<()> {
    let document = std::fs::read_to_string(file)?;
    report(&document, catalog, json)
}

fn report(document: &str, catalog: &Catalog, json: bool) -> error::Result<()> {
    let parser = StatusParser::new()?;
    let report = parser.parse_report(document, catalog);
    let snapshot = ServerStatusSnapshot::build(report.statuses(), Utc::now());

    if json {
        print_json(&report, &snapshot)?;
    } else {
        print_table(&report, &snapshot);
    }

    Ok(())
}

fn print_json(report: &ParseReport, snapshot: &ServerStatusSnapshot) -> error::Result<()> {
    let output = serde_json::json!({
        "strategy": report.strategy,
        "overall": snapshot.overall_state(),
        "snapshot": snapshot,
        "indeterminate": report.indeterminate(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_table(report: &ParseReport, snapshot: &ServerStatusSnapshot) {
    for (server, verdict) in &report.verdicts {
        let state = match verdict {
            Verdict::Online => "Online",
            Verdict::Offline => "Offline",
            Verdict::Indeterminate => "unknown",
        };
        println!("{:<28} {state}", server.label());
    }
    println!();
    println!(
        "Overall: {} ({} strategy, checked {})",
        snapshot.overall_state(),
        report.strategy.as_str(),
        snapshot.checked_at().format("%Y-%m-%d %H:%M:%S UTC")
    );
}
