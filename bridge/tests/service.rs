//! Trigger, run and status flows through the job service

mod common;

use std::sync::Arc;

use http::StatusCode;
use serde_json::{json, Map, Value};
use tokio_test::{assert_err, assert_ok};

use jobbridge::app::state::AppState;
use jobbridge::errors::BridgeError;
use jobbridge::jenkins::models::{BuildInfo, RemoteStep};
use jobbridge::jobs::service::LEGACY_BUILD_USER;
use jobbridge::sanitize::{ShortKeyPolicy, INVALID_KEY_SENTINEL};

use common::{app_state, options, trigger_body, FakeJenkins, GOOD_KEY};

fn fields(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => panic!("not an object"),
    }
}

#[tokio::test]
async fn test_trigger_returns_discovered_id() {
    let fake = Arc::new(FakeJenkins::default().starts_immediately("42"));
    let state = app_state(fake.clone());

    let request = assert_ok!(state
        .jobs
        .parse_request(fields(trigger_body("deployContainer")), false));
    let outcome = state.jobs.trigger(&request).await;

    assert_eq!(outcome.status, StatusCode::OK);
    assert_eq!(outcome.body, "42");
    assert_eq!(outcome.job_id.as_deref(), Some("42"));
    assert_eq!(FakeJenkins::count(&fake.start_calls), 1);

    let started = fake.started.lock().unwrap().clone();
    assert!(started[0].ends_with("/job/DeployContainer/buildWithParameters?services=web"));
    assert!(started[0].contains("ci-bot:"));
}

#[tokio::test]
async fn test_trigger_terraform_job_path() {
    let fake = Arc::new(FakeJenkins::default().starts_immediately("3"));
    let state = app_state(fake.clone());

    let request = assert_ok!(state
        .jobs
        .parse_request(fields(trigger_body("runTerraform")), false));
    state.jobs.trigger(&request).await;

    let started = fake.started.lock().unwrap().clone();
    assert!(started[0].contains("/job/terraform/job/terraform_web/buildWithParameters?"));
}

#[tokio::test]
async fn test_sanitizer_strips_path_separators() {
    let fake = Arc::new(FakeJenkins::default().starts_immediately("1"));
    let state = app_state(fake.clone());

    let mut body = trigger_body("deployContainer");
    body["services"] = json!(" ../../web/ ");
    let request = assert_ok!(state.jobs.parse_request(fields(body), false));
    assert_eq!(request.services, "....web");
}

#[tokio::test]
async fn test_failed_health_check_skips_dispatch() {
    let fake = Arc::new(FakeJenkins {
        root_status: Some(StatusCode::BAD_GATEWAY),
        ..Default::default()
    });
    let state = app_state(fake.clone());

    let request = assert_ok!(state
        .jobs
        .parse_request(fields(trigger_body("deployContainer")), false));
    let outcome = state.jobs.trigger(&request).await;

    assert_eq!(outcome.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(FakeJenkins::count(&fake.start_calls), 0);
}

#[tokio::test]
async fn test_refused_connection_collects_diagnostics() {
    let fake = Arc::new(FakeJenkins {
        start_unreachable: true,
        ..Default::default()
    });
    let state = app_state(fake.clone());

    let request = assert_ok!(state
        .jobs
        .parse_request(fields(trigger_body("deployContainer")), false));
    let outcome = state.jobs.trigger(&request).await;

    assert_eq!(outcome.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(FakeJenkins::count(&fake.diagnose_calls), 1);
    assert_eq!(FakeJenkins::count(&fake.last_build_calls), 0);
    assert!(!outcome.body.contains(GOOD_KEY));
    assert!(!outcome.body.contains("no such host"));
}

#[tokio::test]
async fn test_rejected_start_is_500() {
    let fake = Arc::new(FakeJenkins {
        start_status: StatusCode::UNAUTHORIZED,
        start_body: format!("bad credential {}", GOOD_KEY),
        ..Default::default()
    });
    let state = app_state(fake.clone());

    let request = assert_ok!(state
        .jobs
        .parse_request(fields(trigger_body("deployContainer")), false));
    let outcome = state.jobs.trigger(&request).await;

    assert_eq!(outcome.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(outcome.body.contains("401"));
    assert!(!outcome.body.contains(GOOD_KEY));
    assert_eq!(FakeJenkins::count(&fake.last_build_calls), 0);
}

#[tokio::test]
async fn test_run_waits_for_completion() {
    let fake = Arc::new(
        FakeJenkins::default()
            .starts_immediately("8")
            .with_build_info(
                vec![
                    RemoteStep::Ready(BuildInfo::in_progress("8")),
                    RemoteStep::Ready(BuildInfo::finished("8", "SUCCESS")),
                ],
                None,
            ),
    );
    let state = app_state(fake.clone());

    let request = assert_ok!(state
        .jobs
        .parse_request(fields(trigger_body("deployContainer")), false));
    let outcome = state.jobs.run(&request).await;

    assert_eq!(outcome.status, StatusCode::OK);
    assert!(outcome.body.contains("Finished"));
    assert_eq!(FakeJenkins::count(&fake.build_info_calls), 2);
    assert_eq!(FakeJenkins::count(&fake.console_calls), 1);
}

#[tokio::test]
async fn test_run_skips_completion_when_discovery_fails() {
    let fake = Arc::new(FakeJenkins::default().with_last_build(
        vec![RemoteStep::Fatal(BridgeError::JobNotFound(
            "/job/DeployContainer".to_string(),
        ))],
        None,
    ));
    let state = app_state(fake.clone());

    let request = assert_ok!(state
        .jobs
        .parse_request(fields(trigger_body("deployContainer")), false));
    let outcome = state.jobs.run(&request).await;

    assert_eq!(outcome.status, StatusCode::NOT_FOUND);
    assert_eq!(FakeJenkins::count(&fake.build_info_calls), 0);
}

#[tokio::test]
async fn test_status_is_a_single_check() {
    let fake = Arc::new(
        FakeJenkins::default().with_build_info(Vec::new(), Some(BuildInfo::in_progress("5"))),
    );
    let state = app_state(fake.clone());

    let mut body = trigger_body("deployContainer");
    body["job_id"] = json!("5");
    let request = assert_ok!(state.jobs.parse_request(fields(body), true));
    let outcome = state.jobs.status(&request).await;

    assert_eq!(outcome.status, StatusCode::ACCEPTED);
    assert_eq!(FakeJenkins::count(&fake.build_info_calls), 1);
    assert_eq!(FakeJenkins::count(&fake.console_calls), 0);
    assert_eq!(FakeJenkins::count(&fake.start_calls), 0);
}

#[tokio::test]
async fn test_status_of_failed_build() {
    let fake = Arc::new(FakeJenkins::default().with_build_info(
        vec![RemoteStep::Ready(BuildInfo::finished("5", "FAILURE"))],
        None,
    ));
    let state = app_state(fake.clone());

    let mut body = trigger_body("deployContainer");
    body["job_id"] = json!(5);
    let request = assert_ok!(state.jobs.parse_request(fields(body), true));
    let outcome = state.jobs.status(&request).await;

    assert_eq!(outcome.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(outcome.body.contains("Finished"));
}

#[tokio::test]
async fn test_status_requires_job_id() {
    let state = app_state(Arc::new(FakeJenkins::default()));

    let err = assert_err!(state
        .jobs
        .parse_request(fields(trigger_body("deployContainer")), true));
    assert!(err.to_string().contains("job_id"));
}

#[tokio::test]
async fn test_short_key_is_rejected_by_default() {
    let fake = Arc::new(FakeJenkins::default());
    let state = app_state(fake.clone());

    let mut body = trigger_body("deployContainer");
    body["auth_key"] = json!("short");
    let err = assert_err!(state.jobs.parse_request(fields(body), false));
    assert!(matches!(err, BridgeError::InvalidCredential(_)));
    assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_short_key_substituted_under_policy() {
    let fake = Arc::new(FakeJenkins::default().starts_immediately("2"));
    let state = assert_ok!(AppState::with_api(
        &options(ShortKeyPolicy::Substitute),
        fake.clone()
    ));

    let mut body = trigger_body("deployContainer");
    body["auth_key"] = json!("short");
    let request = assert_ok!(state.jobs.parse_request(fields(body), false));
    state.jobs.trigger(&request).await;

    let started = fake.started.lock().unwrap().clone();
    assert!(started[0].contains(&format!("ci-bot:{}@", INVALID_KEY_SENTINEL)));
}

#[tokio::test]
async fn test_legacy_build_passes_remote_answer_through() {
    let fake = Arc::new(FakeJenkins {
        start_status: StatusCode::CREATED,
        start_body: "queued".to_string(),
        ..Default::default()
    });
    let state = app_state(fake.clone());

    let response = assert_ok!(state.jobs.trigger_plain(" deploy/ ", GOOD_KEY).await);
    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body, "queued");

    let started = fake.started.lock().unwrap().clone();
    assert!(started[0].ends_with("/job/deploy/build"));
    assert!(started[0].contains(&format!("{}:", LEGACY_BUILD_USER)));
    assert_eq!(FakeJenkins::count(&fake.last_build_calls), 0);
}

#[tokio::test]
async fn test_legacy_build_requires_both_fields() {
    let state = app_state(Arc::new(FakeJenkins::default()));
    let err = assert_err!(state.jobs.trigger_plain("deploy", " / ").await);
    assert!(matches!(err, BridgeError::Validation(_)));
}
