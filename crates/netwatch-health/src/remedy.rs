//! Remediation actions: service restarts and reboot.
//!
//! The watchdog only sees the [`Remediator`] trait. [`SystemRemediator`]
//! drives systemd and the reboot syscall; [`DryRunRemediator`] logs what it
//! would have done.

use std::future::Future;

use netwatch_core::ServiceUnits;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::RemediationError;

/// OS capabilities the watchdog escalates through.
pub trait Remediator: Send + Sync {
    fn restart_name_resolution(&self) -> impl Future<Output = Result<(), RemediationError>> + Send;

    fn restart_network_manager(&self) -> impl Future<Output = Result<(), RemediationError>> + Send;

    /// Flush filesystems and restart the host. Returns only on failure or
    /// when the platform call is a no-op.
    fn reboot(&self) -> impl Future<Output = Result<(), RemediationError>> + Send;
}

/// Restarts systemd units with `systemctl` and reboots via `reboot(2)`.
#[derive(Debug, Clone)]
pub struct SystemRemediator {
    units: ServiceUnits,
}

impl SystemRemediator {
    pub fn new(units: ServiceUnits) -> Self {
        Self { units }
    }
}

impl Remediator for SystemRemediator {
    async fn restart_name_resolution(&self) -> Result<(), RemediationError> {
        systemctl_restart(&self.units.resolver).await
    }

    async fn restart_network_manager(&self) -> Result<(), RemediationError> {
        systemctl_restart(&self.units.network).await
    }

    async fn reboot(&self) -> Result<(), RemediationError> {
        warn!("!!! reboot called !!!");
        reboot_now()
    }
}

async fn systemctl_restart(unit: &str) -> Result<(), RemediationError> {
    let command = format!("systemctl restart {unit}");
    debug!(%command, "running");

    let output = Command::new("systemctl")
        .arg("restart")
        .arg(unit)
        .output()
        .await
        .map_err(|source| RemediationError::Spawn {
            command: command.clone(),
            source,
        })?;

    if output.status.success() {
        Ok(())
    } else {
        Err(RemediationError::CommandFailed {
            command,
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

#[cfg(target_os = "linux")]
fn reboot_now() -> Result<(), RemediationError> {
    // SAFETY: sync(2) takes no arguments and cannot fail.
    unsafe { libc::sync() };
    // SAFETY: RB_AUTOBOOT is a valid command; on success the call does not
    // return.
    let rc = unsafe { libc::reboot(libc::RB_AUTOBOOT) };
    if rc == 0 {
        Ok(())
    } else {
        Err(RemediationError::Reboot(std::io::Error::last_os_error()))
    }
}

#[cfg(not(target_os = "linux"))]
fn reboot_now() -> Result<(), RemediationError> {
    Err(RemediationError::Unsupported("reboot"))
}

/// Logs every action instead of performing it.
#[derive(Debug, Clone)]
pub struct DryRunRemediator {
    units: ServiceUnits,
}

impl DryRunRemediator {
    pub fn new(units: ServiceUnits) -> Self {
        Self { units }
    }
}

impl Remediator for DryRunRemediator {
    async fn restart_name_resolution(&self) -> Result<(), RemediationError> {
        warn!(unit = %self.units.resolver, "dry run: would restart service");
        Ok(())
    }

    async fn restart_network_manager(&self) -> Result<(), RemediationError> {
        warn!(unit = %self.units.network, "dry run: would restart service");
        Ok(())
    }

    async fn reboot(&self) -> Result<(), RemediationError> {
        warn!("dry run: would reboot system");
        Ok(())
    }
}
