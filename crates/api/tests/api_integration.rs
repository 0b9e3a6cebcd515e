//! Integration tests for the API server.

use std::sync::Arc;
use std::sync::OnceLock;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use metrics_exporter_prometheus::PrometheusHandle;
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

fn setup() -> axum::Router {
    let (app, _) = setup_with_storage();
    app
}

fn setup_with_storage() -> (axum::Router, orchestrator::InMemoryStorageProvisioner) {
    let config = api::config::Config::default();
    let (state, storage) = api::create_default_state(&config);
    (api::create_app(state, get_metrics_handle()), storage)
}

fn provision_body(slug: &str) -> String {
    serde_json::to_string(&serde_json::json!({
        "tenant_name": "Acme Corp",
        "tenant_slug": slug,
        "plan": "premium",
        "admin_name": "Admin",
        "admin_email": "admin@acme.example"
    }))
    .unwrap()
}

async fn post_tenants(app: &axum::Router, body: String) -> (StatusCode, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/tenants")
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}

async fn get_json(app: &axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}

/// Polls the status endpoint until the job reaches a terminal state.
async fn wait_for_terminal(app: &axum::Router, job_id: &str) -> serde_json::Value {
    for _ in 0..500 {
        let (status, json) = get_json(app, &format!("/tenants/jobs/{job_id}")).await;
        assert_eq!(status, StatusCode::OK);
        let state = json["status"].as_str().unwrap().to_string();
        if state == "completed" || state == "failed" {
            return json;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("job never reached a terminal state");
}

#[tokio::test]
async fn test_health_check() {
    let app = setup();

    let (status, json) = get_json(&app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_full_provisioning_flow() {
    let app = setup();

    // Start
    let (status, started) = post_tenants(&app, provision_body("acme")).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(started["deduplicated"], false);
    let job_id = started["job_id"].as_str().unwrap().to_string();
    assert_eq!(
        started["status_url"],
        format!("/tenants/jobs/{job_id}").as_str()
    );

    // Poll to completion
    let terminal = wait_for_terminal(&app, &job_id).await;
    assert_eq!(terminal["status"], "completed");
    assert_eq!(terminal["progress"], 100);
    assert_eq!(terminal["slug"], "acme");

    // Fetch result
    let (status, result) = get_json(&app, &format!("/tenants/jobs/{job_id}/result")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["status"], "completed");
    assert_eq!(result["domain"], "acme.platform.local");
    assert_eq!(result["tenant"]["slug"], "acme");
    assert!(result["credentials"]["password"].as_str().is_some());
    assert!(result["next_steps"].as_array().is_some());
}

#[tokio::test]
async fn test_duplicate_request_returns_same_job() {
    let (app, storage) = setup_with_storage();
    let gate = storage.hold_on_create();

    let (_, first) = post_tenants(&app, provision_body("acme")).await;
    let (status, second) = post_tenants(&app, provision_body("acme")).await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(second["job_id"], first["job_id"]);
    assert_eq!(second["deduplicated"], true);

    gate.notify_one();
    let terminal = wait_for_terminal(&app, first["job_id"].as_str().unwrap()).await;
    assert_eq!(terminal["status"], "completed");
}

#[tokio::test]
async fn test_invalid_request_is_rejected_synchronously() {
    let app = setup();

    let (status, json) = post_tenants(&app, provision_body("Not A Slug!")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("tenant_slug"));
}

#[tokio::test]
async fn test_unknown_job_returns_not_found() {
    let app = setup();

    let fake = uuid::Uuid::new_v4();
    let (status, _) = get_json(&app, &format!("/tenants/jobs/{fake}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get_json(&app, &format!("/tenants/jobs/{fake}/result")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_job_id_is_a_bad_request() {
    let app = setup();

    let (status, _) = get_json(&app, "/tenants/jobs/not-a-uuid").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_check_slug() {
    let app = setup();

    let (status, json) = get_json(&app, "/tenants/check-slug?slug=acme").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["available"], true);

    // Provision the slug, then it is taken
    let (_, started) = post_tenants(&app, provision_body("acme")).await;
    wait_for_terminal(&app, started["job_id"].as_str().unwrap()).await;

    let (_, json) = get_json(&app, "/tenants/check-slug?slug=acme").await;
    assert_eq!(json["available"], false);
}

#[tokio::test]
async fn test_check_slug_rejects_bad_syntax() {
    let app = setup();

    let (status, json) = get_json(&app, "/tenants/check-slug?slug=Not%20Valid").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["available"], false);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = setup();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_progress_is_monotonic_over_http() {
    let app = setup();

    let (_, started) = post_tenants(&app, provision_body("acme")).await;
    let job_id = started["job_id"].as_str().unwrap().to_string();

    let mut last = 0u64;
    loop {
        let (_, json) = get_json(&app, &format!("/tenants/jobs/{job_id}")).await;
        let progress = json["progress"].as_u64().unwrap();
        assert!(progress >= last, "progress regressed: {progress} < {last}");
        last = progress;
        let state = json["status"].as_str().unwrap();
        if state == "completed" || state == "failed" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
}
