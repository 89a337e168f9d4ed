//! HTTP surface against a scripted job server

mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::Router;
use http::{header, Method, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use jobbridge::jenkins::models::BuildInfo;
use jobbridge::server::handlers::LIVENESS_TEXT;
use jobbridge::server::serve::router;
use jobbridge::server::state::ServerState;

use common::{app_state, trigger_body, FakeJenkins, GOOD_KEY};

fn app(fake: Arc<FakeJenkins>) -> Router {
    let state = app_state(fake);
    router(Arc::new(ServerState::new(state.jobs, state.analytics)))
}

fn json_request(method: Method, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, String) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8_lossy(&bytes).into_owned())
}

#[tokio::test]
async fn test_root_is_alive() {
    let request = Request::get("/").body(Body::empty()).unwrap();
    let (status, body) = send(app(Arc::new(FakeJenkins::default())), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, LIVENESS_TEXT);
}

#[tokio::test]
async fn test_acme_challenge_echoes_token() {
    let request = Request::get("/.well-known/acme-challenge/abc123")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app(Arc::new(FakeJenkins::default())), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "abc123");
}

#[tokio::test]
async fn test_version_reports_crate_version() {
    let request = Request::get("/version").body(Body::empty()).unwrap();
    let (status, body) = send(app(Arc::new(FakeJenkins::default())), request).await;
    assert_eq!(status, StatusCode::OK);
    let value: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(value["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_trigger_names_missing_fields() {
    let fake = Arc::new(FakeJenkins::default());
    let body = json!({ "auth_usr": "ci-bot", "job_type": "deployContainer" });
    let request = json_request(Method::POST, "/trigger_jenkins_job", &body);

    let (status, text) = send(app(fake.clone()), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(text.contains("auth_key, services"), "{}", text);
    assert_eq!(FakeJenkins::count(&fake.start_calls), 0);
}

#[tokio::test]
async fn test_trigger_rejects_unknown_job_type() {
    let fake = Arc::new(FakeJenkins::default());
    let request = json_request(Method::POST, "/trigger_jenkins_job", &trigger_body("deployLambda"));

    let (status, text) = send(app(fake.clone()), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(text.contains("deployLambda"));
    assert_eq!(FakeJenkins::count(&fake.start_calls), 0);
}

#[tokio::test]
async fn test_trigger_rejects_malformed_bodies() {
    let fake = Arc::new(FakeJenkins::default());

    let request = Request::post("/trigger_jenkins_job")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, _) = send(app(fake.clone()), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let request = json_request(Method::POST, "/trigger_jenkins_job", &json!(["a", "b"]));
    let (status, text) = send(app(fake.clone()), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(text.contains("JSON object"));
}

#[tokio::test]
async fn test_trigger_returns_job_id() {
    let fake = Arc::new(FakeJenkins::default().starts_immediately("77"));
    let body = trigger_body("deployContainer");
    let request = json_request(Method::POST, "/trigger_jenkins_job", &body);

    let (status, body) = send(app(fake.clone()), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "77");
}

#[tokio::test]
async fn test_run_returns_console() {
    let fake = Arc::new(
        FakeJenkins::default()
            .starts_immediately("9")
            .with_build_info(Vec::new(), Some(BuildInfo::finished("9", "SUCCESS"))),
    );
    let request = json_request(Method::POST, "/run_jenkins_job", &trigger_body("deployContainer"));

    let (status, body) = send(app(fake.clone()), request).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Finished"));
}

#[tokio::test]
async fn test_monitor_in_progress_is_202() {
    let fake = Arc::new(
        FakeJenkins::default().with_build_info(Vec::new(), Some(BuildInfo::in_progress("14"))),
    );
    let mut body = trigger_body("deployContainer");
    body["job_id"] = json!("14");
    let request = json_request(Method::GET, "/monitor_jenkins_job", &body);

    let (status, text) = send(app(fake.clone()), request).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert!(text.contains("14"));
    assert_eq!(FakeJenkins::count(&fake.start_calls), 0);
}

#[tokio::test]
async fn test_monitor_requires_job_id() {
    let fake = Arc::new(FakeJenkins::default());
    let body = trigger_body("deployContainer");
    let request = json_request(Method::GET, "/monitor_jenkins_job", &body);

    let (status, text) = send(app(fake.clone()), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(text.contains("job_id"));
}

#[tokio::test]
async fn test_legacy_build_form() {
    let fake = Arc::new(FakeJenkins {
        start_body: "queued".to_string(),
        ..Default::default()
    });
    let request = Request::post("/build")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(format!("job_id=deploy&auth_key={}", GOOD_KEY)))
        .unwrap();

    let (status, body) = send(app(fake.clone()), request).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, "queued");
    assert_eq!(FakeJenkins::count(&fake.start_calls), 1);
}

#[tokio::test]
async fn test_legacy_build_missing_field() {
    let fake = Arc::new(FakeJenkins::default());
    let request = Request::post("/build")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("job_id=deploy"))
        .unwrap();

    let (status, _) = send(app(fake.clone()), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(FakeJenkins::count(&fake.start_calls), 0);
}

#[tokio::test]
async fn test_analytics_without_gateway_is_500() {
    let request = Request::post("/analytics").body(Body::empty()).unwrap();
    let (status, body) = send(app(Arc::new(FakeJenkins::default())), request).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("not configured"));
}
