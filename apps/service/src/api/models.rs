use serde::Serialize;

use crate::database::models::CheckRow;

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub endpoints: Vec<EndpointStatus>,
    pub now: i64,
}

#[derive(Debug, Serialize)]
pub struct EndpointStatus {
    pub name: String,
    pub last: Option<CheckRow>,
    pub uptime_24h: UptimeWindow,
    pub uptime_all: UptimeWindow,
}

/// ok/total counts for a window; `pct` is absent when there is no data.
#[derive(Debug, Serialize)]
pub struct UptimeWindow {
    pub up: i64,
    pub total: i64,
    pub pct: Option<f64>,
}

impl UptimeWindow {
    pub fn new(up: i64, total: i64) -> Self {
        let pct =
            (total > 0).then(|| ((up as f64 / total as f64) * 100.0 * 100.0).round() / 100.0);
        Self { up, total, pct }
    }
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub name: String,
    pub history: Vec<CheckRow>,
}

#[derive(Debug, Serialize)]
pub struct CheckNowResponse {
    pub ok: bool,
}
