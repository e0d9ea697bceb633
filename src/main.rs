//! stagehand demo (v1)
//!
//! Wires a small application through the lifecycle:
//!
//! ```text
//!   config (TOML) ──▶ logging ──▶ Lifecycle
//!                                   │
//!                     heartbeat hook: OnStart spawns ticker
//!                                     OnStop  stops ticker
//!                                   │
//!   SIGINT/SIGTERM ──▶ run() ──▶ start → wait → stop ──▶ hook report
//! ```

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tokio::task::JoinHandle;

use stagehand::clock::{Clock, SystemClock};
use stagehand::config::{load_config, AppConfig};
use stagehand::lifecycle::{run, shutdown_signal, HookRecords};
use stagehand::observability::{init_logging, TracingLogger};
use stagehand::{Context, Hook, Lifecycle, Shutdown};

#[derive(Parser)]
#[command(name = "stagehand")]
#[command(about = "Run a demo application under lifecycle management", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Format of the hook timing report printed on exit
    #[arg(short, long, value_enum, default_value_t = Report::Text)]
    report: Report,

    /// Heartbeat interval of the demo component
    #[arg(long, default_value_t = 1000)]
    heartbeat_ms: u64,
}

#[derive(Clone, Copy, ValueEnum)]
enum Report {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    init_logging(&config.observability)?;

    tracing::info!(
        start_timeout = ?config.lifecycle.start_timeout(),
        stop_timeout = ?config.lifecycle.stop_timeout(),
        "stagehand v0.1.0 starting"
    );

    let clock = Arc::new(SystemClock);
    let lifecycle = Lifecycle::new(Arc::new(TracingLogger), clock.clone());
    lifecycle.append(heartbeat(clock, Duration::from_millis(cli.heartbeat_ms)));

    let result = run(&lifecycle, &config.lifecycle, shutdown_signal()).await;

    print_report(cli.report, "start", lifecycle.start_hook_records())?;
    print_report(cli.report, "stop", lifecycle.stop_hook_records())?;

    result?;
    tracing::info!("Shutdown complete");
    Ok(())
}

/// A component that logs a heartbeat until it is stopped.
fn heartbeat(clock: Arc<SystemClock>, interval: Duration) -> Hook {
    let shutdown = Shutdown::new();
    let task: Arc<Mutex<Option<JoinHandle<()>>>> = Arc::default();

    let start_shutdown = shutdown.clone();
    let start_task = task.clone();
    let stop_task = task;

    Hook::new()
        .on_start(move |_ctx: Context| {
            let clock = clock.clone();
            let mut stop = start_shutdown.subscribe();
            let handle = tokio::spawn(async move {
                let mut beats = 0u64;
                loop {
                    tokio::select! {
                        _ = clock.sleep(interval) => {
                            beats += 1;
                            tracing::info!(beats, "Heartbeat");
                        }
                        _ = stop.recv() => break,
                    }
                }
                tracing::debug!(beats, "Heartbeat stopped");
            });
            *start_task.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);
            async { Ok(()) }
        })
        .with_start_name("heartbeat::start")
        .on_stop(move |ctx: Context| {
            tracing::debug!(tasks = shutdown.receiver_count(), "Stopping heartbeat");
            shutdown.trigger();
            let handle = stop_task.lock().unwrap_or_else(|e| e.into_inner()).take();
            async move {
                let Some(handle) = handle else {
                    return Ok(());
                };
                tokio::select! {
                    joined = handle => joined.map_err(anyhow::Error::from),
                    _ = ctx.done() => Err(anyhow::anyhow!("heartbeat did not stop in time")),
                }
            }
        })
        .with_stop_name("heartbeat::stop")
}

/// Print hook timings, slowest first.
fn print_report(
    format: Report,
    phase: &str,
    mut records: HookRecords,
) -> Result<(), serde_json::Error> {
    records.sort_by_runtime();
    match format {
        Report::Text => {
            println!("{} hooks ({:?} total):", phase, records.total_runtime());
            if !records.is_empty() {
                println!("{}", records);
            }
        }
        Report::Json => {
            let report = serde_json::json!({ "phase": phase, "hooks": &records });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}
