//! Integration tests for the REST API handlers.
//!
//! These drive the router through tower's `oneshot` against a mock engine,
//! verifying the HTTP contract the presentation layer depends on.

use autopod_api::create_router;
use autopod_core::{Config, Orchestrator};
use autopod_runtime::testing::InMemoryRuntime;
use autopod_runtime::ContainerRuntime;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use secrecy::SecretString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tempfile::TempDir;
use tower::ServiceExt;

fn test_app() -> (Router, Arc<InMemoryRuntime>, Arc<Orchestrator>, TempDir) {
    let tmp = TempDir::new().expect("Failed to create temp dir");
    let config = Config {
        data_dir: tmp.path().to_path_buf(),
        ..Config::default()
    };
    let runtime = Arc::new(InMemoryRuntime::new());
    let orchestrator = Arc::new(
        Orchestrator::with_runtime(config, Arc::clone(&runtime) as Arc<dyn ContainerRuntime>)
            .expect("Failed to create orchestrator"),
    );
    let app = create_router(Arc::clone(&orchestrator));
    (app, runtime, orchestrator, tmp)
}

async fn get(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&body).unwrap())
}

async fn post(app: Router, uri: &str, body: Option<serde_json::Value>) -> (StatusCode, serde_json::Value) {
    let request = match body {
        Some(json) => Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => Request::builder()
            .method("POST")
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    };
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

// ============================================================================
// System
// ============================================================================

#[tokio::test]
async fn test_health() {
    let (app, _runtime, _orchestrator, _tmp) = test_app();
    let (status, json) = get(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
}

#[tokio::test]
async fn test_list_containers_empty() {
    let (app, _runtime, _orchestrator, _tmp) = test_app();
    let (status, json) = get(app, "/api/containers").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["data"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_forced_sync_populates_status() {
    let (app, runtime, _orchestrator, _tmp) = test_app();
    runtime.insert("web", "running", "localhost/web:build-1");

    let (status, json) = post(app.clone(), "/api/sync", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["observed"], 1);

    let (_, json) = get(app, "/api/status").await;
    let rows = json["data"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["container_name"], "web");
    assert_eq!(rows[0]["status"], "running");
}

#[tokio::test]
async fn test_sync_failure_maps_to_bad_gateway() {
    let (app, runtime, _orchestrator, _tmp) = test_app();
    runtime.set_fail_list(true);

    let (status, json) = post(app, "/api/sync", None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["success"], false);
    assert!(json["error"].as_str().unwrap().contains("outage"));
}

// ============================================================================
// Container actions
// ============================================================================

async fn seeded_app() -> (Router, Arc<InMemoryRuntime>, Arc<Orchestrator>, TempDir) {
    let (app, runtime, orchestrator, tmp) = test_app();
    runtime.insert("web", "running", "localhost/web:build-1");
    orchestrator.synchronizer().sync_once().await.unwrap();
    (app, runtime, orchestrator, tmp)
}

#[tokio::test]
async fn test_action_unknown_container() {
    let (app, _runtime, _orchestrator, _tmp) = seeded_app().await;
    let (status, json) = post(app, "/api/containers/ghost/start", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn test_action_unknown_verb() {
    let (app, _runtime, _orchestrator, _tmp) = seeded_app().await;
    let (status, json) = post(app, "/api/containers/web/destroy", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("unknown container action"));
}

#[tokio::test]
async fn test_stop_is_idempotent_through_the_api() {
    let (app, runtime, _orchestrator, _tmp) = seeded_app().await;

    let (status, json) = post(app.clone(), "/api/containers/web/stop", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["no_op"], false);
    assert_eq!(json["data"]["status"], "stopped");

    let (status, json) = post(app, "/api/containers/web/stop", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["no_op"], true);
    assert_eq!(runtime.calls.stop.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_restart_requires_running_container() {
    let (app, _runtime, _orchestrator, _tmp) = seeded_app().await;
    post(app.clone(), "/api/containers/web/stop", None).await;

    let (status, json) = post(app, "/api/containers/web/restart", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn test_container_network_view() {
    let (app, runtime, orchestrator, _tmp) = test_app();
    runtime.run("localhost/web:build-1", "web").await.unwrap();
    orchestrator.synchronizer().sync_once().await.unwrap();

    let (status, json) = get(app, "/api/containers/web/network").await;
    assert_eq!(status, StatusCode::OK);
    let ports = json["data"]["ports"].as_array().unwrap();
    assert_eq!(ports.len(), 1);
    assert_eq!(ports[0]["container_port"], 8080);
    assert!(json["data"]["urls"][0]
        .as_str()
        .unwrap()
        .starts_with("http://"));
}

// ============================================================================
// Images
// ============================================================================

#[tokio::test]
async fn test_search_requires_query() {
    let (app, _runtime, _orchestrator, _tmp) = test_app();
    let (status, json) = get(app, "/api/images/search").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn test_image_pull_passthrough() {
    let (app, runtime, _orchestrator, _tmp) = test_app();
    let (status, json) = post(
        app,
        "/api/images/pull",
        Some(serde_json::json!({"image_name": "alpine:latest"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(runtime.calls.pull.load(Ordering::SeqCst), 1);
}

// ============================================================================
// Registry
// ============================================================================

#[tokio::test]
async fn test_check_login_defaults_to_logged_out() {
    let (app, _runtime, _orchestrator, _tmp) = test_app();
    let (status, json) = get(app, "/api/docker/check-login").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["logged_in"], false);
    assert!(json["data"]["username"].is_null());
}

#[tokio::test]
async fn test_push_without_login_is_unauthorized() {
    let (app, _runtime, _orchestrator, _tmp) = test_app();
    let (status, json) = post(
        app,
        "/api/docker/push",
        Some(serde_json::json!({"image_name": "demo"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn test_push_after_login_returns_tagged_name() {
    let (app, runtime, orchestrator, _tmp) = test_app();
    orchestrator.registry().seed_credential(
        "docker.io",
        "alice",
        SecretString::from("hunter2".to_string()),
    );

    let (status, json) = get(app.clone(), "/api/docker/check-login").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["logged_in"], true);
    assert_eq!(json["data"]["username"], "alice");

    let (status, json) = post(
        app,
        "/api/docker/push",
        Some(serde_json::json!({"image_name": "demo"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["tagged_name"], "docker.io/alice/demo:latest");
    assert_eq!(
        runtime.pushed_images(),
        vec!["docker.io/alice/demo:latest".to_string()]
    );
}

// ============================================================================
// Webhook
// ============================================================================

#[tokio::test]
async fn test_webhook_rejects_payload_without_clone_url() {
    let (app, _runtime, _orchestrator, _tmp) = test_app();
    let (status, json) = post(
        app,
        "/webhook",
        Some(serde_json::json!({"repository": {"name": "demo"}})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["status"], "error");
    assert!(json["message"].as_str().unwrap().contains("clone_url"));
}

/// Initializes a local repository to clone from, or `None` when git is
/// unavailable in the environment.
fn git_fixture_repo(dir: &Path) -> Option<PathBuf> {
    if std::process::Command::new("git")
        .arg("--version")
        .output()
        .is_err()
    {
        eprintln!("git unavailable, skipping");
        return None;
    }
    let repo = dir.join("src-repo");
    std::fs::create_dir_all(&repo).unwrap();
    let run = |args: &[&str]| {
        let output = std::process::Command::new("git")
            .args(args)
            .current_dir(&repo)
            .env("GIT_AUTHOR_NAME", "test")
            .env("GIT_AUTHOR_EMAIL", "test@localhost")
            .env("GIT_COMMITTER_NAME", "test")
            .env("GIT_COMMITTER_EMAIL", "test@localhost")
            .output()
            .unwrap();
        assert!(output.status.success(), "git {args:?} failed");
    };
    run(&["init", "--quiet"]);
    std::fs::write(repo.join("README.md"), "demo\n").unwrap();
    run(&["add", "."]);
    run(&["-c", "commit.gpgsign=false", "commit", "--quiet", "-m", "init"]);
    Some(repo)
}

#[tokio::test]
async fn test_webhook_deploys_repository_without_descriptor() {
    let (app, runtime, _orchestrator, tmp) = test_app();
    let Some(repo) = git_fixture_repo(tmp.path()) else {
        return;
    };

    let payload = serde_json::json!({
        "repository": {
            "clone_url": repo.to_str().unwrap(),
            "name": "demo",
        }
    });
    let (status, json) = post(app.clone(), "/webhook", Some(payload)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "success");
    assert_eq!(json["data"]["outcome"], "success");
    assert_eq!(json["data"]["resulting_container_name"], "demo");
    assert_eq!(runtime.built_tags(), vec!["demo:build-1".to_string()]);

    // The record is visible without waiting for the next sync tick.
    let (_, json) = get(app, "/api/containers").await;
    let records = json["data"].as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["name"], "demo");
    assert_eq!(records[0]["status"], "running");
}
