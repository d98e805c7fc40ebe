//! Watchdog loop — sleeps, probes, and escalates.
//!
//! ```text
//! Waiting ── cancelled ──────▶ Stopped
//! Waiting ── timer elapses ──▶ Probing
//! Probing ── reachable ──────▶ Waiting   (failures = 0, interval = baseline)
//! Probing ── unreachable ────▶ Waiting   (failures += 1, interval = retry, escalate)
//! ```
//!
//! Cancellation is cooperative: it is observed while waiting for the timer
//! and again right before a probe starts. A probe or remediation already in
//! flight runs to completion.

use std::time::Duration;

use netwatch_core::{Escalation, WatchdogConfig, format_duration};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::probe::{EndpointProber, check_connectivity};
use crate::remedy::Remediator;

/// Mutable loop bookkeeping. Only the watchdog writes to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopState {
    consecutive_failures: u32,
    interval: Duration,
    baseline: Duration,
    retry: Duration,
}

impl LoopState {
    pub fn new(baseline: Duration, retry: Duration) -> Self {
        Self {
            consecutive_failures: 0,
            interval: baseline,
            baseline,
            retry,
        }
    }

    /// Reset the streak and go back to the baseline interval.
    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
        self.interval = self.baseline;
    }

    /// Extend the streak by one, switch to the retry interval, and return
    /// the new count.
    pub fn record_failure(&mut self) -> u32 {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.interval = self.retry;
        self.consecutive_failures
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Time to wait before the next probe.
    pub fn interval(&self) -> Duration {
        self.interval
    }
}

/// What a single tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// An endpoint answered.
    Reachable { endpoint: String },
    /// Every endpoint failed; `escalation` is the action that was taken.
    Unreachable { failures: u32, escalation: Escalation },
}

/// The connectivity watchdog.
pub struct Watchdog<P, R> {
    config: WatchdogConfig,
    prober: P,
    remediator: R,
    state: LoopState,
}

impl<P, R> Watchdog<P, R>
where
    P: EndpointProber,
    R: Remediator,
{
    pub fn new(config: WatchdogConfig, prober: P, remediator: R) -> Self {
        let state = LoopState::new(config.interval, config.retry_interval);
        Self {
            config,
            prober,
            remediator,
            state,
        }
    }

    pub fn config(&self) -> &WatchdogConfig {
        &self.config
    }

    pub fn state(&self) -> &LoopState {
        &self.state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.state.consecutive_failures()
    }

    pub fn interval(&self) -> Duration {
        self.state.interval()
    }

    /// Run until `shutdown` flips to `true` or its sender is dropped.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval = %format_duration(self.config.interval),
            retry_interval = %format_duration(self.config.retry_interval),
            attempts_allowed = self.config.policy.threshold,
            endpoints = %self.config.endpoints.join(","),
            "watchdog started"
        );

        loop {
            let interval = self.state.interval();
            if !wait_or_cancel(interval, &mut shutdown).await {
                break;
            }
            if *shutdown.borrow() {
                break;
            }

            info!(interval = %format_duration(interval), "interval passed");
            self.tick().await;
        }

        info!("watchdog stopped");
    }

    /// Probe once and react to the result.
    pub async fn tick(&mut self) -> TickOutcome {
        let result = check_connectivity(
            &self.prober,
            &self.config.endpoints,
            self.config.probe_timeout,
        )
        .await;

        match result {
            Ok(endpoint) => {
                self.state.record_success();
                info!(%endpoint, "network check passed");
                TickOutcome::Reachable { endpoint }
            }
            Err(failure) => {
                let failures = self.state.record_failure();
                info!(error = %failure, "network check failed");
                debug!(failures, "failed attempts");

                let escalation = self.config.policy.decide(failures);
                self.escalate(escalation, failures).await;
                TickOutcome::Unreachable {
                    failures,
                    escalation,
                }
            }
        }
    }

    async fn escalate(&self, escalation: Escalation, failures: u32) {
        if escalation.remediates() {
            self.restart_services().await;
        }
        if escalation.reboots() {
            info!(failures, "network check failed too many times, rebooting system");
            if let Err(e) = self.remediator.reboot().await {
                error!(error = %e, "failed to reboot");
            }
        }
    }

    /// First-level remediation. Failures are logged and otherwise ignored.
    async fn restart_services(&self) {
        let units = &self.config.units;

        match self.remediator.restart_name_resolution().await {
            Ok(()) => info!(unit = %units.resolver, "restarted name-resolution service"),
            Err(e) => warn!(unit = %units.resolver, error = %e, "failed to restart name-resolution service"),
        }

        tokio::time::sleep(self.config.remedy_pause).await;

        match self.remediator.restart_network_manager().await {
            Ok(()) => info!(unit = %units.network, "restarted network-management service"),
            Err(e) => warn!(unit = %units.network, error = %e, "failed to restart network-management service"),
        }
    }
}

/// Sleep for `interval` unless cancelled first. Returns `true` when the
/// timer elapsed.
async fn wait_or_cancel(interval: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    if *shutdown.borrow_and_update() {
        return false;
    }

    let sleep = tokio::time::sleep(interval);
    tokio::pin!(sleep);

    loop {
        tokio::select! {
            _ = &mut sleep => return true,
            changed = shutdown.changed() => {
                // A dropped sender also means stop.
                if changed.is_err() || *shutdown.borrow_and_update() {
                    debug!("watchdog cancelled while waiting");
                    return false;
                }
            }
        }
    }
}
