use std::time::{Duration, Instant};

use anyhow::Result;
use reqwest::{Client, Method};

use super::types::{ProbeFailure, ProbeOutcome};
use crate::config::EndpointConfig;

/// Executes HTTP checks against configured endpoints.
pub struct Prober {
    client: Client,
}

impl Prober {
    pub fn new() -> Result<Self> {
        let client = Client::builder().build()?;
        Ok(Self { client })
    }

    /// Execute one check.
    ///
    /// Never fails past this boundary: transport errors become `ok = false`
    /// outcomes carrying a "category: message" diagnostic, and the elapsed
    /// wall-clock is measured on every path.
    pub async fn probe(&self, endpoint: &EndpointConfig) -> ProbeOutcome {
        let start = Instant::now();
        let result = self.execute(endpoint).await;
        let latency_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(status) => ProbeOutcome::response(
                is_accepted_status(status, endpoint.expected_statuses.as_deref()),
                status,
                latency_ms,
            ),
            Err(failure) => ProbeOutcome::failure(&failure, latency_ms),
        }
    }

    async fn execute(&self, endpoint: &EndpointConfig) -> Result<u16, ProbeFailure> {
        let method = Method::from_bytes(endpoint.method.as_bytes())
            .map_err(|_| ProbeFailure::Request(format!("invalid method '{}'", endpoint.method)))?;

        let mut request = self
            .client
            .request(method, &endpoint.url)
            .timeout(Duration::from_secs(endpoint.timeout_seconds));
        if let Some(headers) = &endpoint.headers {
            for (name, value) in headers {
                request = request.header(name.as_str(), value.as_str());
            }
        }

        let response = request.send().await?;
        Ok(response.status().as_u16())
    }
}

/// The system's single health decision: a non-empty accepted-status set wins;
/// otherwise anything in [200, 400) counts as healthy.
pub fn is_accepted_status(status: u16, expected: Option<&[u16]>) -> bool {
    match expected {
        Some(accepted) if !accepted.is_empty() => accepted.contains(&status),
        _ => (200..400).contains(&status),
    }
}
