//! PMM Script Host CLI
//!
//! Runs the paper market making host with a strategy script attached. Lines
//! typed on stdin are script commands; `status` asks the script for its
//! status and `live` toggles live updates.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use clap::Parser;
use pmm_script_host::config::{HostConfig, SchedulingModel};
use pmm_script_host::host::PaperHost;
use pmm_script_host::telemetry::{init_metrics, init_tracing};
use script_engine::{
    HostSink, ScriptAdapter, ScriptBridge, ScriptDriver, ScriptRegistry, ScriptResult,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Script manifest to load, overriding the configuration
    #[arg(short, long)]
    script: Option<PathBuf>,

    /// Where the script runs
    #[arg(long, value_enum)]
    model: Option<SchedulingModel>,

    /// Stop after this many ticks
    #[arg(long)]
    ticks: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    let mut config = HostConfig::load(args.config.as_deref())?;
    if let Some(script) = args.script {
        config.script = Some(script);
    }
    if let Some(model) = args.model {
        config.model = model;
    }
    config.validate()?;

    init_tracing(&args.log_level, &config.log_dir)?;
    let metrics = init_metrics()?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        model = ?config.model,
        market = %config.market_info(),
        "starting script host"
    );

    let host = Arc::new(PaperHost::new(&config));
    let registry = ScriptRegistry::with_builtin();
    let mut driver = attach_script(&config, &registry, Arc::clone(&host))?;

    if let Err(err) = driver.start(config.market_info()) {
        warn!(error = %err, "script did not receive market info");
    }

    let mut ticker = tokio::time::interval(config.tick_interval());
    let mut commands = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut ticks = 0u64;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                run_tick(driver.as_mut(), &host);
                ticks += 1;

                if let Some(reason) = host.stop_reason() {
                    info!(reason = %reason, "script requested stop");
                    break;
                }
                if args.ticks.is_some_and(|limit| ticks >= limit) {
                    info!(ticks, "tick limit reached");
                    break;
                }
            }
            line = commands.next_line(), if stdin_open => match line {
                Ok(Some(line)) => run_command(driver.as_mut(), &line),
                Ok(None) => stdin_open = false,
                Err(err) => {
                    warn!(error = %err, "stdin closed");
                    stdin_open = false;
                }
            },
            _ = signal::ctrl_c() => {
                info!("received Ctrl+C, shutting down gracefully");
                break;
            }
        }
    }

    info!("shutting down script host");
    if let Err(err) = driver.shutdown() {
        error!(error = %err, "script did not shut down cleanly");
    }
    driver.link().live().shutdown().await;
    driver.pump();
    info!(metrics = %metrics.render(), "final bridge metrics");

    Ok(())
}

/// Builds the driver for the configured model. A script that fails to load
/// leaves the host running without one.
fn attach_script(
    config: &HostConfig,
    registry: &ScriptRegistry,
    host: Arc<PaperHost>,
) -> ScriptResult<Box<dyn ScriptDriver>> {
    let runtime = config.runtime();
    let sink: Arc<dyn HostSink> = host;

    let Some(path) = config.script.as_deref() else {
        info!("no script configured");
        return Ok(Box::new(ScriptAdapter::new(sink, runtime)?));
    };

    match config.model {
        SchedulingModel::InProcess => {
            let mut adapter = ScriptAdapter::new(Arc::clone(&sink), runtime)?;
            if let Err(err) = adapter.load(registry, path) {
                error!(path = %path.display(), error = %err, "failed to load script");
                sink.notify(&format!("Failed to load script: {err}"));
            }
            Ok(Box::new(adapter))
        }
        SchedulingModel::CrossProcess => {
            match ScriptBridge::load(registry, path, Arc::clone(&sink), runtime.clone()) {
                Ok(bridge) => Ok(Box::new(bridge)),
                Err(err) => {
                    error!(path = %path.display(), error = %err, "failed to load script");
                    sink.notify(&format!("Failed to load script: {err}"));
                    Ok(Box::new(ScriptAdapter::new(sink, runtime)?))
                }
            }
        }
    }
}

fn run_tick(driver: &mut dyn ScriptDriver, host: &PaperHost) {
    let tick = host.next_tick();
    for fill in tick.fills {
        if let Err(err) = driver.order_filled(fill) {
            warn!(error = %err, "fill not forwarded to script");
        }
    }
    if let Err(err) = driver.tick(tick.snapshot) {
        warn!(error = %err, "tick not forwarded to script");
    }
    if host.refresh_due(Instant::now()) {
        if let Err(err) = driver.order_refresh() {
            warn!(error = %err, "refresh notice not forwarded to script");
        }
    }
    driver.pump();
}

fn run_command(driver: &mut dyn ScriptDriver, line: &str) {
    let mut words = line.split_whitespace();
    let Some(cmd) = words.next() else {
        return;
    };
    let args: Vec<String> = words.map(str::to_string).collect();

    let result = if cmd == "status" {
        driver.status()
    } else {
        driver.command(cmd, args)
    };
    if let Err(err) = result {
        warn!(command = cmd, error = %err, "command failed");
    }
    driver.pump();
}
