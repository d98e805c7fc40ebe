//! Watchdog configuration and the optional `netwatch.toml` file.
//!
//! Values are layered: built-in defaults, then the config file, then
//! whatever the command line sets explicitly. The result is validated once
//! and treated as immutable for the lifetime of the process.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::duration::parse_duration;
use crate::error::{ConfigError, ConfigResult};
use crate::policy::{EscalationPolicy, FirstFailure, ThresholdComparison};

pub const DEFAULT_ENDPOINTS: &str =
    "https://www.google.com,https://www.cloudflare.com,https://www.amazon.com";
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(15 * 60);
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_REMEDY_PAUSE: Duration = Duration::from_secs(5);

/// systemd units restarted on the first failure of a streak.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServiceUnits {
    /// Name-resolution service.
    pub resolver: String,
    /// Network-management service.
    pub network: String,
}

impl Default for ServiceUnits {
    fn default() -> Self {
        Self {
            resolver: "systemd-resolved".to_string(),
            network: "NetworkManager".to_string(),
        }
    }
}

/// Effective watchdog configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchdogConfig {
    /// Polling interval while healthy.
    pub interval: Duration,
    /// Polling interval after any failure.
    pub retry_interval: Duration,
    /// Endpoints probed in order; the first that answers wins.
    pub endpoints: Vec<String>,
    /// Budget for a single endpoint check.
    pub probe_timeout: Duration,
    /// Pause between the resolver restart and the network restart.
    pub remedy_pause: Duration,
    pub policy: EscalationPolicy,
    pub units: ServiceUnits,
    /// Log remediation actions instead of running them.
    pub dry_run: bool,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            retry_interval: DEFAULT_RETRY_INTERVAL,
            endpoints: parse_endpoints(DEFAULT_ENDPOINTS),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            remedy_pause: DEFAULT_REMEDY_PAUSE,
            policy: EscalationPolicy::default(),
            units: ServiceUnits::default(),
            dry_run: false,
        }
    }
}

impl WatchdogConfig {
    /// Overlay the values present in a config file.
    pub fn apply_file(&mut self, file: &FileConfig) -> ConfigResult<()> {
        if let Some(ref s) = file.interval {
            self.interval = parse_duration(s)?;
        }
        if let Some(ref s) = file.retry_interval {
            self.retry_interval = parse_duration(s)?;
        }
        if let Some(ref endpoints) = file.endpoints {
            self.endpoints = endpoints
                .iter()
                .map(|e| e.trim())
                .filter(|e| !e.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(ref s) = file.timeout {
            self.probe_timeout = parse_duration(s)?;
        }
        if let Some(ref s) = file.remedy_pause {
            self.remedy_pause = parse_duration(s)?;
        }
        if let Some(n) = file.attempts_allowed {
            self.policy.threshold = n;
        }
        if let Some(c) = file.threshold_comparison {
            self.policy.comparison = c;
        }
        if let Some(f) = file.first_failure {
            self.policy.first_failure = f;
        }
        if let Some(ref unit) = file.resolver_unit {
            self.units.resolver = unit.clone();
        }
        if let Some(ref unit) = file.network_unit {
            self.units.network = unit.clone();
        }
        if let Some(dry_run) = file.dry_run {
            self.dry_run = dry_run;
        }
        Ok(())
    }

    /// Reject values the watchdog cannot run with.
    ///
    /// An empty endpoint list is accepted: the prober reports it as a total
    /// failure every tick so the escalation ladder still runs.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.interval.is_zero() {
            return Err(invalid("interval", "must be greater than zero"));
        }
        if self.retry_interval.is_zero() {
            return Err(invalid("retry_interval", "must be greater than zero"));
        }
        if self.probe_timeout.is_zero() {
            return Err(invalid("timeout", "must be greater than zero"));
        }
        if self.policy.threshold == 0 {
            return Err(invalid("attempts_allowed", "must be at least 1"));
        }
        if self.units.resolver.trim().is_empty() {
            return Err(invalid("resolver_unit", "must not be empty"));
        }
        if self.units.network.trim().is_empty() {
            return Err(invalid("network_unit", "must not be empty"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}

/// Split a comma-separated endpoint list, trimming whitespace and dropping
/// blank entries.
pub fn parse_endpoints(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(str::to_string)
        .collect()
}

/// Contents of `netwatch.toml`. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub debug: Option<bool>,
    pub interval: Option<String>,
    pub retry_interval: Option<String>,
    pub endpoints: Option<Vec<String>>,
    pub timeout: Option<String>,
    pub remedy_pause: Option<String>,
    pub attempts_allowed: Option<u32>,
    pub threshold_comparison: Option<ThresholdComparison>,
    pub first_failure: Option<FirstFailure>,
    pub resolver_unit: Option<String>,
    pub network_unit: Option<String>,
    pub dry_run: Option<bool>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "config file loaded");
        Ok(config)
    }
}
