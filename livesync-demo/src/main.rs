//! livesync demo
//!
//! Runs a scripted display cycle against an in-memory server: local edits
//! show up immediately, push notifications patch the snapshot, and a
//! visibility toggle forces a refresh that picks up unannounced changes.
//!
//! Usage:
//!   livesync-demo --topic todos --duration-secs 12

use anyhow::{Context, Result};
use clap::Parser;
use livesync_demo::{DemoApp, load_rows};
use livesync_sync::LiveSyncConfig;
use livesync_types::{JsonRecord, RecordId, UpdateId, UpdateKind};
use std::{path::PathBuf, time::Duration};
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "livesync-demo")]
#[command(about = "Simulated display cycle for livesync")]
struct Args {
    /// Path to a JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to a JSON array of seed rows
    #[arg(long)]
    seed: Option<PathBuf>,

    /// Realtime topic to subscribe to
    #[arg(short, long)]
    topic: Option<String>,

    /// Periodic refresh interval in milliseconds
    #[arg(long)]
    interval_ms: Option<i64>,

    /// How long optimistic edits stay visible, in milliseconds
    #[arg(long)]
    ttl_ms: Option<u64>,

    /// Seconds to run before shutting down
    #[arg(short, long, default_value = "12")]
    duration_secs: u64,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn load_config(args: &Args) -> Result<LiveSyncConfig> {
    let mut config = match &args.config {
        Some(path) => LiveSyncConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => LiveSyncConfig::default(),
    };
    if let Some(topic) = &args.topic {
        config.realtime.topic = topic.clone();
    }
    if let Some(interval_ms) = args.interval_ms {
        config.scheduler.interval_ms = interval_ms;
    }
    if let Some(ttl_ms) = args.ttl_ms {
        config.overlay.ttl_ms = ttl_ms;
    }
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn todo(id: i64, title: &str, done: bool) -> JsonRecord {
    JsonRecord::with_id(id).set("title", title).set("done", done)
}

fn render(app: &DemoApp) {
    let rows: Vec<String> = app
        .view()
        .into_iter()
        .map(|r| r.into_value().to_string())
        .collect();
    info!(
        pending = app.pending_count(),
        refreshes = app.refresh_count(),
        "View: [{}]",
        rows.join(", ")
    );
}

/// Advances the script by one step.
fn step(app: &DemoApp, tick: u64, edit: &mut Option<UpdateId>) {
    match tick {
        1 => {
            info!("Local edit: marking todo 1 done");
            let patch = JsonRecord::with_id(1).set("done", true);
            *edit = Some(app.local_change(UpdateKind::Update, patch));
        }
        2 => {
            info!("Local edit: creating todo 4");
            app.local_change(UpdateKind::Create, todo(4, "Water plants", false));
        }
        3 => {
            info!("Server confirms todo 1");
            let delivered = app.server_upsert(todo(1, "Buy milk", true));
            debug!(delivered, "Pushed update");
            if let Some(id) = edit.take() {
                app.confirm(&id);
            }
        }
        4 => {
            info!("Server deletes todo 2");
            app.server_delete(&RecordId::from(2_i64));
        }
        5 => {
            info!("Server renames todo 3 without notifying, then the window hides");
            app.server_upsert_silently(todo(3, "Call the bank today", false));
            app.set_visible(false);
        }
        6 => {
            info!("Window visible again");
            app.set_visible(true);
        }
        _ => {}
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { "debug" } else { "info" };
    // RUST_LOG wins over --verbose when set.
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    let config = load_config(&args)?;
    info!(
        topic = %config.realtime.topic,
        interval_ms = config.scheduler.interval_ms,
        ttl_ms = config.overlay.ttl_ms,
        "livesync demo starting..."
    );

    let seed = match &args.seed {
        Some(path) => load_rows(path)
            .with_context(|| format!("Failed to load seed rows from {}", path.display()))?,
        None => vec![
            todo(1, "Buy milk", false),
            todo(2, "Write report", false),
            todo(3, "Call the bank", false),
        ],
    };
    let mut app = DemoApp::start(&config, seed).context("Failed to start display cycle")?;
    if !app.is_subscribed() {
        warn!("Running without push notifications");
    }

    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    let mut edit = None;
    let mut tick = 0;
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                step(&app, tick, &mut edit);
                render(&app);
                tick += 1;
                if tick > args.duration_secs {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    app.shutdown();
    info!("livesync demo finished");
    Ok(())
}
