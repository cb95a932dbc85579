use std::sync::Arc;
use std::time::Duration;

use actix_web::{App, test, web};
use serde_json::{Value, json};
use tempfile::{TempDir, tempdir};

use super::ApiContext;
use crate::config::EndpointConfig;
use crate::database::{LibsqlStore, Store, initialize_database};
use crate::monitoring::{Monitor, Prober, ProbeOutcome};
use crate::pool::LibsqlManager;

async fn test_store() -> (Arc<dyn Store>, TempDir) {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test.db");
    let db = libsql::Builder::new_local(db_path.to_str().unwrap())
        .build()
        .await
        .unwrap();
    let pool: crate::pool::LibsqlPool = deadpool::managed::Pool::builder(LibsqlManager::new(db))
        .build()
        .unwrap();

    let conn = pool.get().await.unwrap();
    initialize_database(&conn).await.unwrap();
    drop(conn);

    (Arc::new(LibsqlStore::new_from_pool(pool)), dir)
}

/// Endpoint pointing at a port nothing listens on; probes fail fast with a
/// connect error, which is all these handler tests need.
fn dead_endpoint(name: &str) -> EndpointConfig {
    EndpointConfig {
        name: name.to_string(),
        url: "http://127.0.0.1:1/".to_string(),
        method: "GET".to_string(),
        interval_seconds: 60,
        timeout_seconds: 2,
        headers: None,
        expected_statuses: None,
    }
}

async fn started_monitor(
    store: &Arc<dyn Store>,
    endpoints: Vec<EndpointConfig>,
) -> Arc<Monitor> {
    let monitor = Arc::new(Monitor::new(
        store.clone(),
        Prober::new().unwrap(),
        endpoints,
    ));
    monitor.start().await.unwrap();
    monitor
}

async fn wait_for_total(store: &Arc<dyn Store>, endpoint_id: i64, want: i64) {
    let deadline = std::time::Instant::now() + Duration::from_secs(3);
    loop {
        let (_, total) = store.uptime(endpoint_id, None).await.unwrap();
        if total >= want {
            return;
        }
        assert!(
            std::time::Instant::now() < deadline,
            "timed out waiting for {want} check row(s)"
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

macro_rules! api_app {
    ($store:expr, $monitor:expr) => {{
        let ctx = web::Data::new(ApiContext {
            store: $store.clone(),
            monitor: $monitor.clone(),
        });
        test::init_service(App::new().app_data(ctx).configure(super::routes)).await
    }};
}

#[actix_web::test]
async fn health_route_answers_ok() {
    let (store, _dir) = test_store().await;
    let monitor = started_monitor(&store, Vec::new()).await;
    let app = api_app!(store, monitor);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
    assert!(resp.status().is_success());
}

#[actix_web::test]
async fn status_is_empty_without_endpoints() {
    let (store, _dir) = test_store().await;
    let monitor = started_monitor(&store, Vec::new()).await;
    let app = api_app!(store, monitor);

    let resp =
        test::call_service(&app, test::TestRequest::get().uri("/api/status").to_request()).await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["endpoints"], json!([]));
    assert!(body["now"].is_i64());
}

#[actix_web::test]
async fn status_reports_last_check_and_uptime_windows() {
    let (store, _dir) = test_store().await;
    let monitor = started_monitor(&store, vec![dead_endpoint("alpha")]).await;
    let alpha = monitor.endpoint_id("alpha").unwrap();

    // Wait out the loop's first (failing) check, then add known rows on top.
    wait_for_total(&store, alpha, 1).await;
    let now = chrono::Utc::now().timestamp();
    store
        .insert_check(
            alpha,
            now + 60,
            &ProbeOutcome {
                ok: false,
                status_code: Some(500),
                latency_ms: 80,
                error: None,
            },
        )
        .await
        .unwrap();
    store
        .insert_check(
            alpha,
            now + 120,
            &ProbeOutcome {
                ok: true,
                status_code: Some(200),
                latency_ms: 42,
                error: None,
            },
        )
        .await
        .unwrap();

    let app = api_app!(store, monitor);
    let resp =
        test::call_service(&app, test::TestRequest::get().uri("/api/status").to_request()).await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;

    let endpoint = &body["endpoints"][0];
    assert_eq!(endpoint["name"], "alpha");
    assert_eq!(endpoint["last"]["ok"], json!(true));
    assert_eq!(endpoint["last"]["status_code"], json!(200));
    assert_eq!(endpoint["last"]["latency_ms"], json!(42));
    assert_eq!(endpoint["uptime_all"]["up"], json!(1));
    assert_eq!(endpoint["uptime_all"]["total"], json!(3));
    assert!(endpoint["uptime_all"]["pct"].is_f64());
    assert_eq!(endpoint["uptime_24h"]["total"], json!(3));
}

#[actix_web::test]
async fn status_sorts_names_case_insensitively() {
    let (store, _dir) = test_store().await;
    let monitor =
        started_monitor(&store, vec![dead_endpoint("alpha"), dead_endpoint("Beta")]).await;
    let app = api_app!(store, monitor);

    let resp =
        test::call_service(&app, test::TestRequest::get().uri("/api/status").to_request()).await;
    let body: Value = test::read_body_json(resp).await;

    let names: Vec<&str> = body["endpoints"]
        .as_array()
        .unwrap()
        .iter()
        .map(|endpoint| endpoint["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["alpha", "Beta"]);
}

#[actix_web::test]
async fn history_requires_a_name() {
    let (store, _dir) = test_store().await;
    let monitor = started_monitor(&store, Vec::new()).await;
    let app = api_app!(store, monitor);

    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri("/api/history").to_request(),
    )
    .await;
    assert_eq!(resp.status(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], json!("Missing 'name'"));
}

#[actix_web::test]
async fn history_rejects_unknown_names() {
    let (store, _dir) = test_store().await;
    let monitor = started_monitor(&store, Vec::new()).await;
    let app = api_app!(store, monitor);

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/history?name=missing")
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 404);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], json!("Unknown endpoint"));
}

#[actix_web::test]
async fn history_returns_newest_first_and_clamps_limit() {
    let (store, _dir) = test_store().await;
    let monitor = started_monitor(&store, vec![dead_endpoint("alpha")]).await;
    let alpha = monitor.endpoint_id("alpha").unwrap();
    wait_for_total(&store, alpha, 1).await;

    let now = chrono::Utc::now().timestamp();
    for (offset, status) in [(60, 201u16), (120, 202)] {
        store
            .insert_check(
                alpha,
                now + offset,
                &ProbeOutcome {
                    ok: true,
                    status_code: Some(status),
                    latency_ms: 10,
                    error: None,
                },
            )
            .await
            .unwrap();
    }

    let app = api_app!(store, monitor);
    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/history?name=alpha")
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["name"], json!("alpha"));
    assert_eq!(body["history"].as_array().unwrap().len(), 3);
    assert_eq!(body["history"][0]["status_code"], json!(202));

    // limit=1 keeps only the newest; limit=0 is clamped up to 1.
    for uri in ["/api/history?name=alpha&limit=1", "/api/history?name=alpha&limit=0"] {
        let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["history"].as_array().unwrap().len(), 1);
        assert_eq!(body["history"][0]["status_code"], json!(202));
    }
}

#[actix_web::test]
async fn check_now_rejects_bad_requests() {
    let (store, _dir) = test_store().await;
    let monitor = started_monitor(&store, Vec::new()).await;
    let app = api_app!(store, monitor);

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/check-now")
            .insert_header(("content-type", "application/json"))
            .set_payload("{not json")
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], json!("Invalid JSON body"));

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/check-now")
            .set_json(json!({}))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 400);

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/check-now")
            .set_json(json!({"name": "missing"}))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 404);
}

#[actix_web::test]
async fn check_now_dispatches_for_known_names() {
    let (store, _dir) = test_store().await;
    let monitor = started_monitor(&store, vec![dead_endpoint("alpha")]).await;
    let alpha = monitor.endpoint_id("alpha").unwrap();
    wait_for_total(&store, alpha, 1).await;

    let app = api_app!(store, monitor);
    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/check-now")
            .set_json(json!({"name": "alpha"}))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 202);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["ok"], json!(true));

    // The dispatched check lands shortly after, on top of the loop's first.
    wait_for_total(&store, alpha, 2).await;
}
