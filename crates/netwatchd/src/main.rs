//! netwatchd — the netwatch connectivity watchdog daemon.
//!
//! Probes a list of internet endpoints on a fixed interval. After the first
//! failure it restarts the resolver and network services; after too many
//! consecutive failures it reboots the host.
//!
//! # Usage
//!
//! ```text
//! netwatchd -i 15m -r 5m -a 5 --address https://www.google.com,https://www.cloudflare.com
//! ```

mod cli;
mod shutdown;

use clap::Parser;
use netwatch_health::{DryRunRemediator, HttpProber, Remediator, SystemRemediator, Watchdog};
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = cli.load()?;

    init_tracing(settings.debug);

    let config = settings.config;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        dry_run = config.dry_run,
        "netwatchd starting"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(shutdown::listen(shutdown_tx));

    let prober = HttpProber::new()?;
    let units = config.units.clone();
    if config.dry_run {
        let watchdog = Watchdog::new(config, prober, DryRunRemediator::new(units));
        supervise(watchdog, shutdown_rx).await
    } else {
        let watchdog = Watchdog::new(config, prober, SystemRemediator::new(units));
        supervise(watchdog, shutdown_rx).await
    }
}

fn init_tracing(debug: bool) {
    let default = if debug {
        "info,netwatchd=debug,netwatch_health=debug,netwatch_core=debug"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .init();
}

/// Run the watchdog on its own task so a panic is logged instead of
/// tearing the process down silently.
async fn supervise<R>(
    mut watchdog: Watchdog<HttpProber, R>,
    shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()>
where
    R: Remediator + 'static,
{
    let handle = tokio::spawn(async move {
        watchdog.run(shutdown).await;
    });

    match handle.await {
        Ok(()) => {
            info!("netwatchd stopped");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "watchdog task terminated abnormally");
            Err(anyhow::anyhow!("watchdog task terminated abnormally: {e}"))
        }
    }
}
