//! Command-line interface.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use netwatch_core::{
    FileConfig, FirstFailure, ThresholdComparison, WatchdogConfig, parse_duration,
    parse_endpoints,
};

#[derive(Debug, Parser)]
#[command(
    name = "netwatchd",
    version,
    about = "Connectivity watchdog: restarts network services, then reboots the host, when the internet stays unreachable"
)]
pub struct Cli {
    /// Show debug info. `DEBUG` accepts 1/0, yes/no, on/off, true/false.
    #[arg(
        long,
        env = "DEBUG",
        action = clap::ArgAction::SetTrue,
        value_parser = clap::builder::BoolishValueParser::new()
    )]
    pub dbg: bool,

    /// TOML config file. Flags given on the command line override it.
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Number of failed attempts allowed before reboot [default: 5].
    #[arg(short = 'a', long)]
    pub attempts_allowed: Option<u32>,

    /// Address list to check, comma separated
    /// [default: https://www.google.com,https://www.cloudflare.com,https://www.amazon.com].
    #[arg(long)]
    pub address: Option<String>,

    /// Interval between checks [default: 15m].
    #[arg(short = 'i', long, env = "INTERVAL", value_parser = parse_duration)]
    pub interval: Option<Duration>,

    /// Interval between checks after a failed attempt [default: 5m].
    #[arg(short = 'r', long, env = "RETRY_INTERVAL", value_parser = parse_duration)]
    pub retry_interval: Option<Duration>,

    /// Time budget for a single endpoint check [default: 30s].
    #[arg(long, value_parser = parse_duration)]
    pub timeout: Option<Duration>,

    /// Pause between restarting the resolver and the network manager [default: 5s].
    #[arg(long, value_parser = parse_duration)]
    pub remedy_pause: Option<Duration>,

    /// Reboot only once failures exceed the allowed attempts, not when they reach it.
    #[arg(long)]
    pub strict_threshold: bool,

    /// Also evaluate the reboot threshold on the first failure of a streak.
    #[arg(long)]
    pub fall_through: bool,

    /// Name-resolution systemd unit [default: systemd-resolved].
    #[arg(long)]
    pub resolver_unit: Option<String>,

    /// Network-management systemd unit [default: NetworkManager].
    #[arg(long)]
    pub network_unit: Option<String>,

    /// Log remediation actions instead of running them.
    #[arg(long)]
    pub dry_run: bool,
}

/// Everything the daemon needs after argument parsing.
#[derive(Debug)]
pub struct Settings {
    pub config: WatchdogConfig,
    pub debug: bool,
}

impl Cli {
    /// Layer defaults, the config file, and explicit flags, then validate.
    pub fn load(&self) -> anyhow::Result<Settings> {
        let mut config = WatchdogConfig::default();
        let mut debug = self.dbg;

        if let Some(ref path) = self.config {
            let file = FileConfig::from_file(path)?;
            config
                .apply_file(&file)
                .with_context(|| format!("invalid config file {}", path.display()))?;
            debug |= file.debug.unwrap_or(false);
        }

        if let Some(n) = self.attempts_allowed {
            config.policy.threshold = n;
        }
        if let Some(ref address) = self.address {
            config.endpoints = parse_endpoints(address);
        }
        if let Some(d) = self.interval {
            config.interval = d;
        }
        if let Some(d) = self.retry_interval {
            config.retry_interval = d;
        }
        if let Some(d) = self.timeout {
            config.probe_timeout = d;
        }
        if let Some(d) = self.remedy_pause {
            config.remedy_pause = d;
        }
        if self.strict_threshold {
            config.policy.comparison = ThresholdComparison::Strict;
        }
        if self.fall_through {
            config.policy.first_failure = FirstFailure::FallThrough;
        }
        if let Some(ref unit) = self.resolver_unit {
            config.units.resolver = unit.clone();
        }
        if let Some(ref unit) = self.network_unit {
            config.units.network = unit.clone();
        }
        if self.dry_run {
            config.dry_run = true;
        }

        config.validate()?;
        Ok(Settings { config, debug })
    }
}
