//! Shared fixtures for the integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use axum_test::TestServer;
use serde_json::Value;
use sea_orm::{Database, DatabaseConnection};
use tempfile::NamedTempFile;
use tokio::sync::Notify;

use cyoa::config::Settings;
use cyoa::database::setup_database;
use cyoa::errors::GenerationError;
use cyoa::generation::{StoryGenerator, TemplateStoryGenerator};
use cyoa::server::app::{create_app, AppState};
use cyoa::story::{GeneratedNode, GeneratedOption, GeneratedStory};

/// Database on a temp file; keep the file alive for the test's duration.
pub async fn setup_test_db() -> Result<(DatabaseConnection, NamedTempFile)> {
    let temp_file = NamedTempFile::new()?;
    let db_url = format!("sqlite://{}?mode=rwc", temp_file.path().display());

    let db = Database::connect(&db_url).await?;
    setup_database(&db).await?;

    Ok((db, temp_file))
}

pub fn test_settings(temp_file: &NamedTempFile) -> Settings {
    Settings::for_database(format!("sqlite://{}?mode=rwc", temp_file.path().display()))
}

pub async fn setup_test_server_with(
    generator: Arc<dyn StoryGenerator>,
) -> Result<(TestServer, DatabaseConnection, NamedTempFile)> {
    let (db, temp_file) = setup_test_db().await?;
    let state = AppState::new(db.clone(), test_settings(&temp_file), generator);
    let server = TestServer::new(create_app(state)?)?;
    Ok((server, db, temp_file))
}

pub async fn setup_test_server() -> Result<(TestServer, DatabaseConnection, NamedTempFile)> {
    setup_test_server_with(Arc::new(TemplateStoryGenerator)).await
}

/// Polls `/api/jobs/{id}` until the job is terminal.
pub async fn poll_until_terminal(server: &TestServer, job_id: &str) -> Value {
    for _ in 0..200 {
        let body: Value = server.get(&format!("/api/jobs/{}", job_id)).await.json();
        match body["status"].as_str() {
            Some("completed") | Some("failed") => return body,
            _ => tokio::time::sleep(Duration::from_millis(25)).await,
        }
    }
    panic!("job {} never reached a terminal state", job_id);
}

pub struct FailingGenerator(pub &'static str);

#[async_trait]
impl StoryGenerator for FailingGenerator {
    fn name(&self) -> &str {
        "failing"
    }

    async fn generate(&self, _theme: &str) -> Result<GeneratedStory, GenerationError> {
        Err(GenerationError::Request(self.0.to_string()))
    }
}

/// Returns a story whose root is an ending with options.
pub struct InvalidStoryGenerator;

#[async_trait]
impl StoryGenerator for InvalidStoryGenerator {
    fn name(&self) -> &str {
        "invalid"
    }

    async fn generate(&self, _theme: &str) -> Result<GeneratedStory, GenerationError> {
        let mut root = GeneratedNode::branch(
            "start",
            vec![GeneratedOption::new("go", GeneratedNode::ending("won", true))],
        );
        root.is_ending = true;
        Ok(GeneratedStory {
            title: "Broken".into(),
            root_node: root,
        })
    }
}

/// Never returns.
pub struct HangingGenerator;

#[async_trait]
impl StoryGenerator for HangingGenerator {
    fn name(&self) -> &str {
        "hanging"
    }

    async fn generate(&self, _theme: &str) -> Result<GeneratedStory, GenerationError> {
        std::future::pending::<()>().await;
        unreachable!()
    }
}

pub struct PanickingGenerator;

#[async_trait]
impl StoryGenerator for PanickingGenerator {
    fn name(&self) -> &str {
        "panicking"
    }

    async fn generate(&self, _theme: &str) -> Result<GeneratedStory, GenerationError> {
        panic!("generator exploded");
    }
}

/// Waits for `release` before delegating to the template generator.
pub struct GatedGenerator {
    pub release: Arc<Notify>,
}

#[async_trait]
impl StoryGenerator for GatedGenerator {
    fn name(&self) -> &str {
        "gated"
    }

    async fn generate(&self, theme: &str) -> Result<GeneratedStory, GenerationError> {
        self.release.notified().await;
        TemplateStoryGenerator.generate(theme).await
    }
}
