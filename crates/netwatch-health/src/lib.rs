//! netwatch-health — connectivity probing and escalation for netwatch.
//!
//! # Architecture
//!
//! ```text
//! Watchdog
//!   ├── LoopState (consecutive failures, effective interval)
//!   ├── check_connectivity() → first endpoint that answers
//!   │   └── EndpointProber (HttpProber: GET over TCP or rustls)
//!   └── EscalationPolicy → Remediator
//!       ├── restart name resolution, pause, restart network manager
//!       └── reboot
//! ```
//!
//! # Escalation
//!
//! The first failure of a streak restarts the resolver and network
//! services. Once the streak reaches the configured threshold every failing
//! tick asks for a reboot. A single successful probe resets the streak and
//! restores the baseline interval.

pub mod error;
pub mod probe;
pub mod remedy;
pub mod watchdog;

pub use error::{EndpointFailure, ProbeError, ProbeFailure, RemediationError};
pub use probe::{EndpointProber, HttpProber, check_connectivity};
pub use remedy::{DryRunRemediator, Remediator, SystemRemediator};
pub use watchdog::{LoopState, TickOutcome, Watchdog};
