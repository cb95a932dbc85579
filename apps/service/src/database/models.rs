use serde::Serialize;

/// One row of the `endpoints` table.
#[derive(Debug, Clone)]
pub struct EndpointRecord {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub method: String,
    pub interval_seconds: u64,
    pub timeout_seconds: u64,
    pub headers_json: Option<String>,
    pub expected_statuses_json: Option<String>,
    pub created_at: i64,
}

/// One recorded check, as returned by the last-check and history queries.
///
/// Serializes directly into the API wire format.
#[derive(Debug, Clone, Serialize)]
pub struct CheckRow {
    pub checked_at: i64,
    pub ok: bool,
    pub status_code: Option<u16>,
    pub latency_ms: Option<u64>,
    pub error: Option<String>,
}
