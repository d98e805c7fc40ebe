//! Error types for probing and remediation.

use std::time::Duration;

use thiserror::Error;

/// Why a single endpoint could not be reached.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    #[error("invalid endpoint url: {0}")]
    InvalidUrl(String),

    #[error("unsupported url scheme: {0}")]
    UnsupportedScheme(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("tls error: {0}")]
    Tls(String),

    #[error("http error: {0}")]
    Http(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

/// One endpoint and the reason it failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointFailure {
    pub endpoint: String,
    pub error: ProbeError,
}

/// A full probing pass found no reachable endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeFailure {
    #[error("no endpoints configured")]
    NoEndpoints,

    #[error("all connection tests failed: {}", describe(.0))]
    AllFailed(Vec<EndpointFailure>),
}

fn describe(failures: &[EndpointFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{} ({})", f.endpoint, f.error))
        .collect::<Vec<_>>()
        .join(", ")
}

/// A remediation action did not complete.
#[derive(Debug, Error)]
pub enum RemediationError {
    #[error("failed to run {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("reboot failed: {0}")]
    Reboot(#[source] std::io::Error),

    #[error("{0} is not supported on this platform")]
    Unsupported(&'static str),
}
