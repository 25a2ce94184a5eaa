#![allow(dead_code)]

use std::path::Path;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::ServiceExt;

use stagehand_orchestrator::api::{self, AppState};
use stagehand_orchestrator::catalog::Catalog;
use stagehand_orchestrator::config::{Config, RunnerConfig};
use stagehand_orchestrator::db;
use stagehand_orchestrator::engine::ExecutionEngine;

/// A playbook that prints to both streams and succeeds
pub const DEPLOY_SCRIPT: &str = r#"echo "PLAY [deploy] target=$2"
echo "deprecation warning" >&2
echo "PLAY RECAP ok=1"
exit 0
"#;

/// A playbook that fails with a non-zero exit code
pub const FAILING_SCRIPT: &str = r#"echo "TASK [broken]"
echo "fatal: unreachable" >&2
exit 3
"#;

/// A playbook that keeps running long enough to be observed mid-run
pub const SLOW_SCRIPT: &str = r#"echo "step 1"
sleep 1
echo "step 2"
sleep 1
echo "step 3"
"#;

/// A playbook that leaves a background process holding its output open
pub const BACKGROUND_SCRIPT: &str = r#"sleep 8 &
echo "done"
exit 0
"#;

/// Everything a test needs to drive the API
pub struct TestApp {
    pub router: Router,
    pub pool: SqlitePool,
    pub engine: ExecutionEngine,
    pub playbook_dir: TempDir,
}

/// In-memory job store with the schema applied
pub async fn test_pool() -> SqlitePool {
    let pool = db::create_pool("sqlite::memory:").await.unwrap();
    db::run_migrations(&pool).await.unwrap();
    pool
}

/// Runner that executes each playbook as a shell script
///
/// The playbook file becomes `$0`, so `--limit <host>` arrive as `$1 $2`.
pub fn shell_runner() -> RunnerConfig {
    RunnerConfig {
        program: "/bin/sh".to_string(),
        extra_args: vec!["-v".to_string()],
        inventory_path: None,
        ansible_config: None,
    }
}

/// Build the application router over a fresh playbook directory
pub async fn build_test_app(runner: RunnerConfig) -> TestApp {
    let playbook_dir = tempfile::tempdir().unwrap();
    build_test_app_in(playbook_dir, runner).await
}

pub async fn build_test_app_in(playbook_dir: TempDir, runner: RunnerConfig) -> TestApp {
    let config = Config::new(playbook_dir.path());
    let pool = test_pool().await;

    let catalog = Catalog::new(config.playbook_dir.clone(), config.playbook_extensions.clone());
    let engine = ExecutionEngine::new(pool.clone(), catalog.clone(), runner);
    let state = AppState::new(pool.clone(), catalog, engine.clone());

    TestApp {
        router: api::create_router(state, config.max_request_bytes),
        pool,
        engine,
        playbook_dir,
    }
}

pub fn write_playbook(dir: &Path, name: &str, contents: &str) {
    std::fs::write(dir.join(name), contents).unwrap();
}

// =============================================================================
// Request helpers
// =============================================================================

pub async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

pub async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    post_raw(app, uri, body.to_string()).await
}

pub async fn post_raw(app: &Router, uri: &str, body: impl Into<Body>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap();
    send(app, request).await
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

/// Submit a run and return the new job id
pub async fn submit(app: &Router, playbook: &str, hostname: &str) -> i64 {
    let (status, body) = post_json(
        app,
        "/api/execute",
        serde_json::json!({ "playbook": playbook, "hostname": hostname }),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED, "unexpected body: {body}");
    body["job_id"].as_i64().unwrap()
}

/// Poll the logs endpoint until the job reaches a terminal status
pub async fn wait_for_terminal(app: &Router, id: i64) -> Value {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(15);

    loop {
        let (status, body) = get(app, &format!("/api/jobs/{id}/logs")).await;
        assert_eq!(status, StatusCode::OK);

        if matches!(body["status"].as_str(), Some("success") | Some("failed")) {
            return body;
        }

        assert!(
            tokio::time::Instant::now() < deadline,
            "job {id} did not finish: {body}"
        );
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}
