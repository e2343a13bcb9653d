//! API integration tests
//!
//! Story creation, job polling and story retrieval through the HTTP router

mod common;

use std::sync::Arc;

use anyhow::Result;
use axum::http::{header, HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::{json, Value};
use tokio::sync::Notify;

use common::*;
use cyoa::generation::TemplateStoryGenerator;
use cyoa::server::app::{create_app, AppState};
use cyoa::services::{job_queue, JobWorker, LoggingJobObserver, StoryJobService};

#[tokio::test]
async fn test_health_endpoint() -> Result<()> {
    let (server, _db, _temp_file) = setup_test_server().await?;

    let response = server.get("/health").await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let body: Value = response.json();
    assert_eq!(body["service"], "cyoa-server");
    assert_eq!(body["status"], "healthy");
    assert!(body["version"].is_string());
    assert_eq!(body["database"], "ok");

    Ok(())
}

#[tokio::test]
async fn test_story_end_to_end() -> Result<()> {
    let (server, _db, _temp_file) = setup_test_server().await?;

    let response = server
        .post("/api/stories/create")
        .json(&json!({ "theme": "pirates" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let cookie = response.header(header::SET_COOKIE);
    let cookie = cookie.to_str()?;
    assert!(cookie.starts_with("session_id="));
    assert!(cookie.contains("HttpOnly"));

    let job: Value = response.json();
    let job_id = job["job_id"].as_str().unwrap().to_string();
    assert!(job["created_at"].is_string());
    assert!(job.get("story_id").is_none());
    assert!(job.get("error").is_none());

    let job = poll_until_terminal(&server, &job_id).await;
    assert_eq!(job["status"], "completed");
    assert!(job["completed_at"].is_string());
    assert!(job.get("error").is_none());
    let story_id = job["story_id"].as_i64().unwrap();

    let response = server
        .get(&format!("/api/stories/{}/complete", story_id))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let story: Value = response.json();
    assert_eq!(story["id"], story_id);
    assert_eq!(story["title"], "An Adventure of Pirates");
    assert!(story["session_id"].is_string());
    assert!(story["created_at"].is_string());

    let root = &story["root_node"];
    assert_eq!(root["is_ending"], false);
    let options = root["options"].as_array().unwrap();
    assert!(!options.is_empty());

    // Every option resolves inside all_nodes.
    let all_nodes = story["all_nodes"].as_object().unwrap();
    assert_eq!(all_nodes.len(), 7);
    for node in all_nodes.values() {
        for option in node["options"].as_array().unwrap() {
            let target = option["node_id"].as_i64().unwrap().to_string();
            assert!(all_nodes.contains_key(&target));
        }
        if node["is_ending"] == true {
            assert!(node["options"].as_array().unwrap().is_empty());
        }
        if node["is_winning_ending"] == true {
            assert_eq!(node["is_ending"], true);
        }
    }

    Ok(())
}

#[tokio::test]
async fn test_session_cookie_is_reused() -> Result<()> {
    let (server, _db, _temp_file) = setup_test_server().await?;
    let session = "1b4e28ba-2fa1-41d2-883f-0016d3cca427";

    let response = server
        .post("/api/stories/create")
        .add_header(
            header::COOKIE,
            HeaderValue::from_str(&format!("session_id={}", session))?,
        )
        .json(&json!({ "theme": "dragons" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert!(response
        .header(header::SET_COOKIE)
        .to_str()?
        .starts_with(&format!("session_id={};", session)));

    let job: Value = response.json();
    let job = poll_until_terminal(&server, job["job_id"].as_str().unwrap()).await;
    let story: Value = server
        .get(&format!("/api/stories/{}/complete", job["story_id"]))
        .await
        .json();
    assert_eq!(story["session_id"], session);

    Ok(())
}

#[tokio::test]
async fn test_generation_failure_surfaces_on_job() -> Result<()> {
    let (server, _db, _temp_file) =
        setup_test_server_with(Arc::new(FailingGenerator("model unavailable"))).await?;

    let job: Value = server
        .post("/api/stories/create")
        .json(&json!({ "theme": "pirates" }))
        .await
        .json();

    let job = poll_until_terminal(&server, job["job_id"].as_str().unwrap()).await;
    assert_eq!(job["status"], "failed");
    assert_eq!(job["error"], "LLM request failed: model unavailable");
    assert!(job["completed_at"].is_string());
    assert!(job.get("story_id").is_none());

    // No story was written for the failed job.
    let response = server.get("/api/stories/1/complete").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn test_invalid_generated_story_fails_job() -> Result<()> {
    let (server, _db, _temp_file) =
        setup_test_server_with(Arc::new(InvalidStoryGenerator)).await?;

    let job: Value = server
        .post("/api/stories/create")
        .json(&json!({ "theme": "broken" }))
        .await
        .json();

    let job = poll_until_terminal(&server, job["job_id"].as_str().unwrap()).await;
    assert_eq!(job["status"], "failed");
    assert!(job["error"]
        .as_str()
        .unwrap()
        .contains("ending at root offers options"));

    Ok(())
}

#[tokio::test]
async fn test_job_is_pending_until_worker_runs() -> Result<()> {
    let (db, temp_file) = setup_test_db().await?;

    // Queue without a running worker: nothing can move the job yet.
    let (queue, receiver) = job_queue();
    let jobs = StoryJobService::new(db.clone(), queue);
    let state = AppState::with_job_service(db.clone(), test_settings(&temp_file), jobs);
    let server = TestServer::new(create_app(state)?)?;

    let job: Value = server
        .post("/api/stories/create")
        .json(&json!({ "theme": "pirates" }))
        .await
        .json();
    assert_eq!(job["status"], "pending");
    let job_id = job["job_id"].as_str().unwrap().to_string();

    let polled: Value = server.get(&format!("/api/jobs/{}", job_id)).await.json();
    assert_eq!(polled["status"], "pending");
    assert!(polled.get("completed_at").is_none());

    // Start the worker with a generator held at a gate.
    let release = Arc::new(Notify::new());
    let worker = JobWorker::new(
        db.clone(),
        Arc::new(GatedGenerator {
            release: release.clone(),
        }),
        Arc::new(LoggingJobObserver),
        std::time::Duration::from_secs(30),
        1,
    );
    let _worker = worker.spawn(receiver);

    let mut status = String::new();
    for _ in 0..200 {
        let polled: Value = server.get(&format!("/api/jobs/{}", job_id)).await.json();
        status = polled["status"].as_str().unwrap_or_default().to_string();
        if status != "pending" {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert_eq!(status, "processing");

    release.notify_one();
    let job = poll_until_terminal(&server, &job_id).await;
    assert_eq!(job["status"], "completed");

    Ok(())
}

#[tokio::test]
async fn test_unknown_ids_return_404() -> Result<()> {
    let (server, _db, _temp_file) = setup_test_server().await?;

    let response = server.get("/api/jobs/does-not-exist").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["detail"], "Job not found");

    let response = server.get("/api/stories/9999/complete").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["detail"], "Story not found");

    // Integers beyond the id column's range are unknown stories too.
    for id in ["4294967296", "-4294967296"] {
        let response = server.get(&format!("/api/stories/{}/complete", id)).await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
        let body: Value = response.json();
        assert_eq!(body["detail"], "Story not found");
    }

    Ok(())
}

#[tokio::test]
async fn test_validation_errors_return_422() -> Result<()> {
    let (server, _db, _temp_file) = setup_test_server().await?;

    let response = server
        .post("/api/stories/create")
        .json(&json!({ "subject": "pirates" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = server
        .post("/api/stories/create")
        .json(&json!({ "theme": "   " }))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert_eq!(body["detail"], "theme must not be empty");

    let response = server.get("/api/stories/not-a-number/complete").await;
    assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = server.get("/api/stories/1.5/complete").await;
    assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

    Ok(())
}

#[cfg(feature = "openapi")]
#[tokio::test]
async fn test_openapi_document() -> Result<()> {
    let (server, _db, _temp_file) = setup_test_server().await?;

    let response = server.get("/api-docs/openapi.json").await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let doc: Value = response.json();
    assert!(doc["paths"]["/api/stories/create"]["post"].is_object());
    assert!(doc["paths"]["/api/jobs/{job_id}"]["get"].is_object());
    assert!(doc["components"]["schemas"]["StoryJobResponse"].is_object());

    Ok(())
}

#[tokio::test]
async fn test_generation_timeout_fails_job() -> Result<()> {
    let (db, temp_file) = setup_test_db().await?;
    let mut settings = test_settings(&temp_file);
    settings.generation_timeout = std::time::Duration::from_millis(100);

    let state = AppState::new(db, settings, Arc::new(HangingGenerator));
    let server = TestServer::new(create_app(state)?)?;

    let job: Value = server
        .post("/api/stories/create")
        .json(&json!({ "theme": "slow" }))
        .await
        .json();

    let job = poll_until_terminal(&server, job["job_id"].as_str().unwrap()).await;
    assert_eq!(job["status"], "failed");
    assert!(job["error"].as_str().unwrap().contains("timed out"));

    Ok(())
}

#[tokio::test]
async fn test_panicking_generator_fails_job() -> Result<()> {
    let (server, _db, _temp_file) = setup_test_server_with(Arc::new(PanickingGenerator)).await?;

    let job: Value = server
        .post("/api/stories/create")
        .json(&json!({ "theme": "chaos" }))
        .await
        .json();

    let job = poll_until_terminal(&server, job["job_id"].as_str().unwrap()).await;
    assert_eq!(job["status"], "failed");
    assert!(job["error"]
        .as_str()
        .unwrap()
        .starts_with("story generation aborted"));

    // The worker keeps serving after a panic.
    let job: Value = server
        .post("/api/stories/create")
        .json(&json!({ "theme": "chaos again" }))
        .await
        .json();
    let job = poll_until_terminal(&server, job["job_id"].as_str().unwrap()).await;
    assert_eq!(job["status"], "failed");

    Ok(())
}

#[tokio::test]
async fn test_custom_api_prefix() -> Result<()> {
    let (db, temp_file) = setup_test_db().await?;
    let mut settings = test_settings(&temp_file);
    settings.api_prefix = "/v2".to_string();

    let state = AppState::new(db, settings, Arc::new(TemplateStoryGenerator));
    let server = TestServer::new(create_app(state)?)?;

    let response = server.get("/v2/jobs/unknown").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    let response = server.get("/api/jobs/unknown").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    // Unrouted, so no handler produced a body.
    assert!(response.text().is_empty());

    #[cfg(feature = "openapi")]
    {
        let doc: Value = server.get("/api-docs/openapi.json").await.json();
        assert!(doc["paths"]["/v2/jobs/{job_id}"]["get"].is_object());
        assert!(doc["paths"]["/api/jobs/{job_id}"].is_null());
    }

    Ok(())
}
