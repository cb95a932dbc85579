use std::fmt;

/// Classified result of one HTTP probe.
///
/// Every probe produces exactly one of these; failures are values here, never
/// errors. `latency_ms` is always measured, failures included.
#[derive(Debug, Clone)]
pub struct ProbeOutcome {
    pub ok: bool,
    pub status_code: Option<u16>,
    pub latency_ms: u64,
    pub error: Option<String>,
}

impl ProbeOutcome {
    /// A probe that obtained a status code; `ok` reflects the acceptance rule.
    pub fn response(ok: bool, status_code: u16, latency_ms: u64) -> Self {
        Self {
            ok,
            status_code: Some(status_code),
            latency_ms,
            error: None,
        }
    }

    /// A probe that failed before any status code was obtained.
    pub fn failure(failure: &ProbeFailure, latency_ms: u64) -> Self {
        Self {
            ok: false,
            status_code: None,
            latency_ms,
            error: Some(failure.to_string()),
        }
    }
}

/// Transport-level probe failure, by category.
///
/// HTTP responses with error statuses are not failures; they carry a status
/// code and go through the acceptance rule instead.
#[derive(Debug)]
pub enum ProbeFailure {
    /// The request did not complete within the configured timeout.
    Timeout,
    /// DNS resolution, TCP connect, or TLS setup failed.
    Connect(String),
    /// The request could not be built or sent (bad method, bad header, ...).
    Request(String),
    /// Anything else that broke mid-exchange.
    Transport(String),
}

impl fmt::Display for ProbeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeFailure::Timeout => write!(f, "timeout: request exceeded the configured deadline"),
            ProbeFailure::Connect(message) => write!(f, "connect: {message}"),
            ProbeFailure::Request(message) => write!(f, "request: {message}"),
            ProbeFailure::Transport(message) => write!(f, "transport: {message}"),
        }
    }
}

impl From<reqwest::Error> for ProbeFailure {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProbeFailure::Timeout
        } else if err.is_connect() {
            ProbeFailure::Connect(err.to_string())
        } else if err.is_builder() || err.is_request() {
            ProbeFailure::Request(err.to_string())
        } else {
            ProbeFailure::Transport(err.to_string())
        }
    }
}
