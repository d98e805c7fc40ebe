//! netwatch-core — shared types for the netwatch connectivity watchdog.
//!
//! Holds the immutable watchdog configuration, the escalation policy that
//! decides when to remediate or reboot, and the duration syntax shared by the
//! CLI and the TOML config file.

pub mod config;
pub mod duration;
pub mod error;
pub mod policy;

pub use config::{FileConfig, ServiceUnits, WatchdogConfig, parse_endpoints};
pub use duration::{format_duration, parse_duration};
pub use error::{ConfigError, ConfigResult};
pub use policy::{Escalation, EscalationPolicy, FirstFailure, ThresholdComparison};
