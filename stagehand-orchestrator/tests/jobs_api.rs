//! End-to-end job lifecycle tests.
//!
//! Each playbook is a small shell script run by `/bin/sh`, standing in for
//! the real automation tool.

#![cfg(unix)]

mod common;

use std::collections::HashSet;
use std::time::Duration;

use axum::http::StatusCode;
use serde_json::json;

use common::*;

// ---------------------------------------------------------------------------
// Test: a successful run is recorded with its output and exit code
// ---------------------------------------------------------------------------

#[tokio::test]
async fn successful_run_records_output_and_exit_code() {
    let app = build_test_app(shell_runner()).await;
    write_playbook(app.playbook_dir.path(), "deploy.yml", DEPLOY_SCRIPT);

    let (status, body) = post_json(
        &app.router,
        "/api/execute",
        json!({ "playbook": "deploy.yml", "hostname": "web01" }),
    )
    .await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["job_id"], 1);
    assert_eq!(body["message"], "Job started");
    assert!(matches!(
        body["status"].as_str(),
        Some("pending") | Some("running")
    ));

    let logs = wait_for_terminal(&app.router, 1).await;

    assert_eq!(logs["status"], "success");
    assert_eq!(logs["exit_code"], 0);
    assert_eq!(logs["playbook_name"], "deploy.yml");
    assert_eq!(logs["target_host"], "web01");
    assert_eq!(logs["stdout"], "PLAY [deploy] target=web01\nPLAY RECAP ok=1\n");
    assert_eq!(logs["stderr"], "deprecation warning\n");
    assert!(logs["started_at"].is_string());
    assert!(logs["completed_at"].is_string());

    // Job details carry the same metadata without the output
    let (status, job) = get(&app.router, "/api/jobs/1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(job["status"], "success");
    assert_eq!(job["exit_code"], 0);
    assert!(job.get("stdout").is_none());
}

// ---------------------------------------------------------------------------
// Test: a non-zero exit code marks the job failed and keeps the code
// ---------------------------------------------------------------------------

#[tokio::test]
async fn non_zero_exit_marks_job_failed() {
    let app = build_test_app(shell_runner()).await;
    write_playbook(app.playbook_dir.path(), "broken.yaml", FAILING_SCRIPT);

    let id = submit(&app.router, "broken.yaml", "db01").await;
    let logs = wait_for_terminal(&app.router, id).await;

    assert_eq!(logs["status"], "failed");
    assert_eq!(logs["exit_code"], 3);
    assert_eq!(logs["stdout"], "TASK [broken]\n");
    assert_eq!(logs["stderr"], "fatal: unreachable\n");
}

// ---------------------------------------------------------------------------
// Test: unknown playbooks are rejected without creating a job
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_playbook_is_rejected_without_a_job() {
    let app = build_test_app(shell_runner()).await;
    write_playbook(app.playbook_dir.path(), "deploy.yml", DEPLOY_SCRIPT);

    for playbook in ["nonexistent.yml", "../deploy.yml", "deploy", ""] {
        let (status, body) = post_json(
            &app.router,
            "/api/execute",
            json!({ "playbook": playbook, "hostname": "web01" }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST, "playbook {playbook:?}");
        assert!(body["error"].as_str().unwrap().contains("not found"));
    }

    let (_, body) = get(&app.router, "/api/jobs").await;
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn invalid_target_is_rejected_without_a_job() {
    let app = build_test_app(shell_runner()).await;
    write_playbook(app.playbook_dir.path(), "deploy.yml", DEPLOY_SCRIPT);

    for hostname in ["", "   ", "--become", "web01\nweb02"] {
        let (status, body) = post_json(
            &app.router,
            "/api/execute",
            json!({ "playbook": "deploy.yml", "hostname": hostname }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST, "hostname {hostname:?}");
        assert!(body["error"].as_str().unwrap().starts_with("Invalid target host"));
    }

    let (_, body) = get(&app.router, "/api/jobs").await;
    assert_eq!(body["count"], 0);
}

// ---------------------------------------------------------------------------
// Test: a runner that cannot be launched still produces a terminal job
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_runner_fails_the_job_with_127() {
    let mut runner = shell_runner();
    runner.program = "/nonexistent/stagehand-runner".to_string();

    let app = build_test_app(runner).await;
    write_playbook(app.playbook_dir.path(), "deploy.yml", DEPLOY_SCRIPT);

    let id = submit(&app.router, "deploy.yml", "web01").await;
    let logs = wait_for_terminal(&app.router, id).await;

    assert_eq!(logs["status"], "failed");
    assert_eq!(logs["exit_code"], 127);
    assert_eq!(logs["stdout"], "");
    assert!(logs["stderr"].as_str().unwrap().contains("Failed to launch"));
    assert_eq!(logs["started_at"], logs["completed_at"]);
}

#[tokio::test]
async fn non_executable_runner_fails_the_job_with_126() {
    let playbook_dir = tempfile::tempdir().unwrap();
    write_playbook(playbook_dir.path(), "deploy.yml", DEPLOY_SCRIPT);

    // Written without any execute bit
    let program = playbook_dir.path().join("not-a-program");
    std::fs::write(&program, "#!/bin/sh\nexit 0\n").unwrap();

    let mut runner = shell_runner();
    runner.program = program.to_string_lossy().into_owned();
    let app = build_test_app_in(playbook_dir, runner).await;

    let id = submit(&app.router, "deploy.yml", "web01").await;
    let logs = wait_for_terminal(&app.router, id).await;

    assert_eq!(logs["status"], "failed");
    assert_eq!(logs["exit_code"], 126);
}

// ---------------------------------------------------------------------------
// Test: a background process holding the pipes does not keep the job running
// ---------------------------------------------------------------------------

#[tokio::test]
async fn job_finishes_when_runner_exits_despite_background_children() {
    let app = build_test_app(shell_runner()).await;
    write_playbook(app.playbook_dir.path(), "daemonize.yml", BACKGROUND_SCRIPT);

    let started = tokio::time::Instant::now();
    let id = submit(&app.router, "daemonize.yml", "web01").await;
    let logs = wait_for_terminal(&app.router, id).await;

    // The background `sleep 8` still holds stdout; the job must not wait for it
    assert!(
        started.elapsed() < Duration::from_secs(6),
        "job took {:?}",
        started.elapsed()
    );
    assert_eq!(logs["status"], "success");
    assert_eq!(logs["exit_code"], 0);
    assert_eq!(logs["stdout"], "done\n");
    assert!(logs["stderr"].as_str().unwrap().contains("Output capture stopped"));

    // Nothing is appended once the job is terminal
    tokio::time::sleep(Duration::from_millis(200)).await;
    let (_, again) = get(&app.router, &format!("/api/jobs/{id}/logs")).await;
    assert_eq!(again, logs);
}

// ---------------------------------------------------------------------------
// Test: output is visible while the job runs and frozen once it ends
// ---------------------------------------------------------------------------

#[tokio::test]
async fn logs_grow_while_running_and_freeze_after_completion() {
    let app = build_test_app(shell_runner()).await;
    write_playbook(app.playbook_dir.path(), "slow.yml", SLOW_SCRIPT);

    let id = submit(&app.router, "slow.yml", "web01").await;
    let uri = format!("/api/jobs/{id}/logs");

    // Wait for the first line to land while the process is still alive
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    let partial = loop {
        let (_, body) = get(&app.router, &uri).await;
        let stdout = body["stdout"].as_str().unwrap().to_string();
        if !stdout.is_empty() {
            assert_eq!(body["status"], "running");
            assert!(body["exit_code"].is_null());
            break stdout;
        }
        assert!(tokio::time::Instant::now() < deadline, "no output: {body}");
        tokio::time::sleep(Duration::from_millis(20)).await;
    };

    assert!(partial.starts_with("step 1\n"));
    assert!(partial.ends_with('\n'));

    let done = wait_for_terminal(&app.router, id).await;
    let final_stdout = done["stdout"].as_str().unwrap();

    assert_eq!(done["status"], "success");
    assert!(final_stdout.starts_with(&partial));
    assert_eq!(final_stdout, "step 1\nstep 2\nstep 3\n");

    tokio::time::sleep(Duration::from_millis(100)).await;
    let (_, again) = get(&app.router, &uri).await;
    assert_eq!(again, done);
}

// ---------------------------------------------------------------------------
// Test: concurrent submissions run independently with distinct ids
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_submissions_get_distinct_ids() {
    let app = build_test_app(shell_runner()).await;
    write_playbook(app.playbook_dir.path(), "deploy.yml", DEPLOY_SCRIPT);

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let router = app.router.clone();
            tokio::spawn(async move {
                let id = submit(&router, "deploy.yml", &format!("web{i:02}")).await;
                (i, id)
            })
        })
        .collect();

    let mut ids = HashSet::new();
    let mut submitted = Vec::new();
    for handle in handles {
        let (i, id) = handle.await.unwrap();
        assert!(ids.insert(id), "duplicate id {id}");
        submitted.push((i, id));
    }

    assert_eq!(ids, (1..=8).collect::<HashSet<i64>>());

    // Each job ran against its own host and captured only its own output
    for (i, id) in submitted {
        let logs = wait_for_terminal(&app.router, id).await;
        let host = format!("web{i:02}");
        assert_eq!(logs["status"], "success");
        assert_eq!(logs["target_host"], host.as_str());
        assert_eq!(
            logs["stdout"],
            format!("PLAY [deploy] target={host}\nPLAY RECAP ok=1\n")
        );
    }
}

// ---------------------------------------------------------------------------
// Test: listing and filtering jobs
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_jobs_newest_first_with_filters() {
    let app = build_test_app(shell_runner()).await;
    write_playbook(app.playbook_dir.path(), "deploy.yml", DEPLOY_SCRIPT);
    write_playbook(app.playbook_dir.path(), "broken.yml", FAILING_SCRIPT);

    let first = submit(&app.router, "deploy.yml", "web01").await;
    let second = submit(&app.router, "broken.yml", "web02").await;
    let third = submit(&app.router, "deploy.yml", "web03").await;
    for id in [first, second, third] {
        wait_for_terminal(&app.router, id).await;
    }

    let (status, body) = get(&app.router, "/api/jobs").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 3);
    let ids: Vec<i64> = body["jobs"]
        .as_array()
        .unwrap()
        .iter()
        .map(|job| job["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![third, second, first]);

    let (_, body) = get(&app.router, "/api/jobs?limit=1").await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["jobs"][0]["id"], third);

    let (_, body) = get(&app.router, "/api/jobs?status=failed").await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["jobs"][0]["id"], second);

    let (_, body) = get(&app.router, "/api/jobs?status=running").await;
    assert_eq!(body["count"], 0);
}

// ---------------------------------------------------------------------------
// Test: the engine can be driven directly and joined
// ---------------------------------------------------------------------------

#[tokio::test]
async fn tracked_submission_is_terminal_once_joined() {
    let app = build_test_app(shell_runner()).await;
    write_playbook(app.playbook_dir.path(), "deploy.yml", DEPLOY_SCRIPT);

    let (job, handle) = app.engine.submit_tracked("deploy.yml", " web01 ").await.unwrap();
    assert_eq!(job.target_host, "web01");

    handle.await.unwrap();

    let (_, logs) = get(&app.router, &format!("/api/jobs/{}/logs", job.id)).await;
    assert_eq!(logs["status"], "success");
    assert_eq!(logs["exit_code"], 0);
}
