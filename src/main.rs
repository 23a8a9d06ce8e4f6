//! Billing platform host.
//!
//! # Architecture Overview
//!
//! ```text
//!   platform.toml ──▶ config ──▶ Platform::build
//!                                   │
//!          ┌────────────────────────┼─────────────────────────┐
//!          ▼                        ▼                         ▼
//!   LifecycleCoordinator       RouteTable ◀── PluginHost   properties
//!   (startup / shutdown        + Dispatcher               (env, file,
//!    phases)                   (lazy init,                 watcher)
//!                               isolation)
//!
//!   startup-pre ─▶ startup-post ─▶ (signals: SIGHUP reload)
//!                                       │ SIGINT / SIGTERM
//!                                       ▼
//!                         shutdown-pre ─▶ shutdown-post
//! ```

use std::path::PathBuf;

use clap::Parser;

use billing_platform::config::{load_config, PlatformConfig};
use billing_platform::lifecycle::signals::next_signal;
use billing_platform::observability::{logging, metrics};
use billing_platform::Platform;

#[derive(Parser)]
#[command(name = "billing-platform")]
#[command(about = "Billing platform host: lifecycle phases and plugin routing", long_about = None)]
struct Cli {
    /// Platform configuration file (TOML). Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the effective configuration as JSON and exit.
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => PlatformConfig::default(),
    };

    if cli.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    logging::init_logging(&config.observability);
    tracing::info!("billing-platform v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        config = ?cli.config,
        failure_policy = ?config.lifecycle.failure_policy,
        conflict_policy = ?config.routing.conflict_policy,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let platform = Platform::builder(config).build()?;

    let failures: usize = platform.start().iter().map(|report| report.failures.len()).sum();
    if failures > 0 {
        tracing::warn!(failures, "Startup completed with handler failures");
    }
    tracing::info!(routes = platform.routes().len(), "Platform started");

    platform.run_until_shutdown(next_signal).await?;
    Ok(())
}
