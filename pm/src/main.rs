//! pm - point-of-interest map registry sync
//!
//! CLI entry point: follow a registry feed, live or recorded, and report
//! what ends up on the map.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use clap::{CommandFactory, FromArgMatches};
use colored::Colorize;
use eyre::{Context, Result, eyre};
use futures::Stream;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use poimap::cli::{Cli, Command, OutputFormat, generate_after_help, get_log_path};
use poimap::config::Config;
use poimap::domain::BackendChangeEvent;
use poimap::events::{DiscardReason, EventBus, EventLogEntry, SyncEvent};
use poimap::render::MapModel;
use poimap::sync::{SyncEngine, SyncReport};
use poimap::transport::{DirectoryTransport, FeedError, FetchTransport, GatewayClient, open_jsonl_feed};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Note: Can't log params here since logging isn't initialized yet
    let log_path = get_log_path();
    let log_dir = log_path.parent().unwrap_or(Path::new("."));

    fs::create_dir_all(log_dir).context("Failed to create log directory")?;

    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Build command with after_help that shows config and log locations
    let cmd = Cli::command().after_help(generate_after_help());
    let cli = Cli::from_arg_matches(&cmd.get_matches())?;

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Watch { gateway, format } => cmd_watch(config, gateway, format).await,
        Command::Replay { events, data, format } => cmd_replay(config, &events, &data, format).await,
    }
}

async fn cmd_watch(mut config: Config, gateway: Option<String>, format: OutputFormat) -> Result<()> {
    debug!(?gateway, %format, "cmd_watch: called");
    if let Some(base_url) = gateway {
        config.gateway.base_url = base_url;
    }

    let client = Arc::new(GatewayClient::from_config(&config.gateway).context("Failed to create gateway client")?);
    let feed = client.event_feed().context("Failed to subscribe to registry feed")?;
    info!(url = %client.feed_url(), "Watching registry feed");

    run_engine(config, client, feed, format).await
}

async fn cmd_replay(config: Config, events: &Path, data: &Path, format: OutputFormat) -> Result<()> {
    debug!(events = %events.display(), data = %data.display(), %format, "cmd_replay: called");
    if !data.is_dir() {
        return Err(eyre!("Data directory not found: {}", data.display()));
    }

    let feed = open_jsonl_feed(events)
        .await
        .context(format!("Failed to open event log {}", events.display()))?;
    let transport = Arc::new(DirectoryTransport::new(data));

    run_engine(config, transport, feed, format).await
}

async fn run_engine<S>(config: Config, transport: Arc<dyn FetchTransport>, feed: S, format: OutputFormat) -> Result<()>
where
    S: Stream<Item = Result<BackendChangeEvent, FeedError>> + Send + 'static,
{
    let bus = EventBus::with_default_capacity();
    let printer = tokio::spawn(print_events(bus.subscribe(), format));

    let engine = SyncEngine::new(config.sync, MapModel::new(), transport, &bus);
    let handle = engine.handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, shutting down");
            let _ = handle.shutdown().await;
        }
    });

    let result = engine.run(feed).await;

    // All emitters are gone once the engine returns; this closes the bus
    drop(bus);
    printer.await.context("Event printer failed")?;

    let report = result.context("Sync engine failed")?;
    print_report(&report, format)
}

async fn print_events(mut rx: broadcast::Receiver<SyncEvent>, format: OutputFormat) {
    loop {
        match rx.recv().await {
            Ok(event) => match format {
                OutputFormat::Text => println!("{}", describe(&event)),
                OutputFormat::Json => match serde_json::to_string(&EventLogEntry::new(event)) {
                    Ok(line) => println!("{}", line),
                    Err(e) => warn!(error = %e, "print_events: failed to encode event"),
                },
            },
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(skipped = n, "print_events: lagged behind the engine");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn describe(event: &SyncEvent) -> String {
    match event {
        SyncEvent::EventReceived { event_type, backend_id } => {
            format!("{:>10} {} {}", "event".cyan(), event_type, backend_id)
        }
        SyncEvent::ProtocolViolation { event_type, backend_id } => format!(
            "{:>10} unrecognized event type '{}' for backend {}",
            "error".red().bold(),
            event_type,
            backend_id
        ),
        SyncEvent::FeedEnded { pending_fetches } => {
            format!("{:>10} feed ended, {} fetch(es) in flight", "feed".cyan(), pending_fetches)
        }
        SyncEvent::FeedFailed { message } => format!("{:>10} feed failed: {}", "error".red().bold(), message),
        SyncEvent::FetchStarted { backend_id, generation } => {
            format!("{:>10} {} (generation {})", "fetch".blue(), backend_id, generation)
        }
        SyncEvent::FetchCompleted {
            backend_id,
            generation,
            point_count,
        } => format!(
            "{:>10} {} (generation {}): {} point(s)",
            "fetched".blue(),
            backend_id,
            generation,
            point_count
        ),
        SyncEvent::FetchFailed {
            backend_id,
            generation,
            message,
        } => format!(
            "{:>10} {} (generation {}): {}",
            "failed".yellow(),
            backend_id,
            generation,
            message
        ),
        SyncEvent::FetchDiscarded {
            backend_id,
            generation,
            reason,
        } => {
            let reason = match reason {
                DiscardReason::Unregistered => "backend unregistered",
                DiscardReason::Superseded => "backend re-registered",
            };
            format!(
                "{:>10} {} (generation {}): {}",
                "discarded".yellow(),
                backend_id,
                generation,
                reason
            )
        }
        SyncEvent::OverlayAdded { key, backend_id } => {
            format!("{:>10} {} <- {}", "added".green(), key, backend_id)
        }
        SyncEvent::OverlayRemoved { key, backend_id } => {
            format!("{:>10} {} <- {}", "removed".magenta(), key, backend_id)
        }
    }
}

fn print_report(report: &SyncReport<MapModel>, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "snapshot": report.snapshot,
                "metrics": report.metrics,
                "map": report.renderer.view(),
            });
            println!("{}", serde_json::to_string_pretty(&json).context("Failed to encode report")?);
        }
        OutputFormat::Text => {
            let snapshot = &report.snapshot;
            println!();
            println!("{} ({})", "Backends".bold(), snapshot.backends.len());
            for registration in &snapshot.backends {
                println!(
                    "  {:<24} {:<24} generation {}",
                    registration.backend.id, registration.backend.display_name, registration.generation
                );
            }

            println!("{} ({})", "Overlays".bold(), snapshot.overlays.len());
            let layers: Vec<_> = report.renderer.displayed_layers().collect();
            for slot in &snapshot.overlays {
                println!("  {:<24} <- {}", slot.key, slot.backend_id);
            }
            let markers: usize = layers.iter().map(|l| l.markers.len()).sum();
            let skipped: usize = layers.iter().map(|l| l.skipped).sum();
            println!("{} {} marker(s), {} point(s) without a position", "Map".bold(), markers, skipped);

            let m = &report.metrics;
            println!(
                "{} {} event(s); fetches {} started, {} completed, {} failed, {} discarded",
                "Metrics".bold(),
                m.events_received,
                m.fetches_started,
                m.fetches_completed,
                m.fetches_failed,
                m.fetches_discarded
            );
        }
    }
    Ok(())
}
