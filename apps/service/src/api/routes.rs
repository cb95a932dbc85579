use actix_web::{HttpResponse, Responder, get, post, web};
use serde::Deserialize;
use serde_json::Value;

use super::ApiContext;
use super::error::ApiError;
use super::models::{
    CheckNowResponse, EndpointStatus, HistoryResponse, StatusResponse, UptimeWindow,
};

const DEFAULT_HISTORY_LIMIT: i64 = 200;
const MAX_HISTORY_LIMIT: i64 = 2000;
const UPTIME_WINDOW_24H_SECONDS: i64 = 24 * 60 * 60;

/// Health check route.
/// The response status is enough; no body.
#[get("/")]
pub async fn health_route() -> impl Responder {
    HttpResponse::Ok()
}

/// Aggregate status per endpoint: last check plus 24-hour and all-time
/// uptime windows, sorted case-insensitively by name.
#[get("/api/status")]
pub async fn status_route(ctx: web::Data<ApiContext>) -> Result<HttpResponse, ApiError> {
    let now = chrono::Utc::now().timestamp();
    let since_24h = now - UPTIME_WINDOW_24H_SECONDS;

    let mut targets: Vec<(String, i64)> = ctx
        .monitor
        .endpoint_ids()
        .map(|ids| ids.iter().map(|(name, id)| (name.clone(), *id)).collect())
        .unwrap_or_default();
    targets.sort_by_key(|(name, _)| name.to_lowercase());

    let mut endpoints = Vec::with_capacity(targets.len());
    for (name, endpoint_id) in targets {
        let last = ctx.store.last_check(endpoint_id).await?;
        let (up_24h, total_24h) = ctx.store.uptime(endpoint_id, Some(since_24h)).await?;
        let (up_all, total_all) = ctx.store.uptime(endpoint_id, None).await?;
        endpoints.push(EndpointStatus {
            name,
            last,
            uptime_24h: UptimeWindow::new(up_24h, total_24h),
            uptime_all: UptimeWindow::new(up_all, total_all),
        });
    }

    Ok(HttpResponse::Ok().json(StatusResponse { endpoints, now }))
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    name: Option<String>,
    limit: Option<i64>,
}

/// Raw check history for one endpoint, newest first.
#[get("/api/history")]
pub async fn history_route(
    ctx: web::Data<ApiContext>,
    query: web::Query<HistoryQuery>,
) -> Result<HttpResponse, ApiError> {
    let name = query
        .name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or(ApiError::MissingName)?;
    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT) as usize;

    let endpoint_id = ctx
        .monitor
        .endpoint_id(name)
        .ok_or(ApiError::UnknownEndpoint)?;
    let history = ctx.store.history(endpoint_id, limit).await?;

    Ok(HttpResponse::Ok().json(HistoryResponse {
        name: name.to_string(),
        history,
    }))
}

/// Trigger one out-of-band check. Accepted means dispatched, not finished.
#[post("/api/check-now")]
pub async fn check_now_route(
    ctx: web::Data<ApiContext>,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    let document: Value = if body.is_empty() {
        Value::Object(serde_json::Map::new())
    } else {
        serde_json::from_slice(&body).map_err(|_| ApiError::InvalidBody)?
    };
    let name = document
        .get("name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or(ApiError::MissingName)?;

    if !ctx.monitor.check_now(name) {
        return Err(ApiError::UnknownEndpoint);
    }
    Ok(HttpResponse::Accepted().json(CheckNowResponse { ok: true }))
}
