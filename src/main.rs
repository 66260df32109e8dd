//! ProbeGuard - browser environment probe daemon
//!
//! Boots the headless execution context, wires the probe queues the way the
//! detection bootstrap does (an "events" queue for subscriptions, a "data"
//! queue for one-shot probes), and streams every payload to the log until
//! shutdown.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info, warn};

use probe_guard::config::AppConfig;
use probe_guard::context::headless::{spawn_clipboard_synthesizer, HeadlessContext};
use probe_guard::logging;
use probe_guard::probes::types::{Probe, ReadinessCallback, ReadinessPayload};
use probe_guard::probes::{ClipboardProbe, FontsProbe};
use probe_guard::queue::Queue;

#[derive(Parser)]
#[command(name = "probe-guard")]
#[command(about = "Browser environment probe daemon")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "PROBEGUARD_CONFIG")]
    config: Option<PathBuf>,
    /// Exit after this many seconds instead of waiting for ctrl-c
    #[arg(long)]
    run_for: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match AppConfig::load(cli.config.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("failed to load configuration ({}); falling back to defaults", e);
            AppConfig::default()
        }
    };

    let _log_guard = logging::init(&config)?;
    info!("Starting ProbeGuard v{}", env!("CARGO_PKG_VERSION"));

    if let Err(errors) = config.validate() {
        error!("Configuration validation failed:");
        for error in &errors {
            error!("  - {}", error);
        }
        anyhow::bail!("configuration validation failed");
    }

    let headless = HeadlessContext::new();
    let cx = headless.probe_context();
    let ready: ReadinessCallback = Arc::new(report);

    let mut event_queue = Queue::new("events", cx.clone(), ready.clone());
    if config.probes.clipboard.enabled {
        event_queue.add(Probe::event(ClipboardProbe::new()), config.probes.clipboard.delay())?;
    }

    let mut data_queue = Queue::new("data", cx, ready);
    if config.probes.fonts.enabled {
        data_queue.add(Probe::exec(FontsProbe::new()), config.probes.fonts.delay())?;
    }

    event_queue.start();
    data_queue.start();

    let synthesizer = config.probes.synthesizer.enabled.then(|| {
        spawn_clipboard_synthesizer(headless.document.clone(), config.probes.synthesizer.interval())
    });

    match cli.run_for {
        Some(secs) => {
            info!("Running for {}s", secs);
            tokio::time::sleep(Duration::from_secs(secs)).await;
        }
        None => {
            tokio::signal::ctrl_c().await?;
            info!("Shutdown signal received");
        }
    }

    if let Some(task) = synthesizer {
        task.abort();
    }
    event_queue.stop().await;
    data_queue.stop().await;
    info!("All probe queues stopped");

    Ok(())
}

/// Shared readiness callback: every probe in every queue reports through
/// here, discriminated by the payload's kind tag.
fn report(payload: ReadinessPayload) {
    match payload.kind() {
        Some("copy") => {
            let selection = payload
                .get("selection")
                .and_then(|v| v.as_str())
                .unwrap_or_default();
            info!(selection = %selection, "copy to clipboard");
        }
        Some("paste") => {
            let data = payload
                .get("data")
                .and_then(|v| v.as_str())
                .unwrap_or_default();
            info!(data = %data, "paste from clipboard");
        }
        Some("fonts") => {
            let count = payload.get("count").and_then(|v| v.as_u64()).unwrap_or(0);
            info!(count, "installed fonts enumerated");
        }
        Some("error") => {
            let rendered = serde_json::to_string(&payload).unwrap_or_default();
            warn!(payload = %rendered, "probe reported failure");
        }
        _ => {
            let rendered = serde_json::to_string(&payload).unwrap_or_default();
            info!(payload = %rendered, "probe payload");
        }
    }
}
