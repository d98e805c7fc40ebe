//! Signal handling: SIGINT / SIGTERM request a graceful stop.

use tokio::sync::watch;
use tracing::{error, info};

/// Wait for a termination signal, then flip `shutdown` to `true`.
///
/// If the handlers cannot be installed the sender is kept alive forever so
/// the watchdog keeps running.
pub async fn listen(shutdown: watch::Sender<bool>) {
    match wait_for_signal().await {
        Ok(()) => {
            info!("shutdown signal received");
            let _ = shutdown.send(true);
        }
        Err(e) => {
            error!(error = %e, "failed to install signal handlers");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(unix)]
async fn wait_for_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut term = signal(SignalKind::terminate())?;
    tokio::select! {
        res = tokio::signal::ctrl_c() => res,
        _ = term.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
