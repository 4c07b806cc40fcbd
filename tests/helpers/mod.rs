//! Shared helpers for the end-to-end tests.
//!
//! The application is assembled exactly as the server binary does it, but
//! over the in-memory store and queue and inside a scratch directory.

#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tower::ServiceExt;

use deployhub::bootstrap;
use deployhub_core::config::AppConfig;
use deployhub_database::MemoryStore;
use deployhub_entity::deployment::Deployment;
use deployhub_queue::memory::MemoryTaskQueue;
use deployhub_worker::{DeploymentConsumer, MaintenanceRunner};

/// Multipart boundary used by [`TestApp::upload`].
const BOUNDARY: &str = "deployhub-test-boundary";

/// Test application context
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// Backing store, for direct manipulation
    pub store: Arc<MemoryStore>,
    /// Deployment queue
    pub queue: Arc<MemoryTaskQueue>,
    /// Queue consumer
    pub consumer: Arc<DeploymentConsumer>,
    /// Expiry cleanup runner
    pub expiry: MaintenanceRunner<Deployment>,
    /// Application config
    pub config: Arc<AppConfig>,
    _dir: tempfile::TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Parsed JSON body
    pub body: Value,
}

/// A running consumer and the means to stop it.
pub struct RunningConsumer {
    cancel: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl RunningConsumer {
    /// Signal cancellation and wait for the loop to drain.
    pub async fn stop(self) {
        let _ = self.cancel.send(true);
        self.handle.await.expect("consumer task panicked");
    }
}

impl TestApp {
    /// Create a new test application with default settings.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a new test application, adjusting the config first.
    pub async fn with_config(adjust: impl FnOnce(&mut AppConfig)) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");

        let mut config = AppConfig::default();
        config.storage.base_dir = dir.path().join("storage").to_string_lossy().to_string();
        config.gateway.config_dir = dir.path().join("gateway").to_string_lossy().to_string();
        config.gateway.domain = "example.com".to_string();
        config.queue.provider = "memory".to_string();
        adjust(&mut config);
        let config = Arc::new(config);

        let store = Arc::new(MemoryStore::new());
        let queue = Arc::new(MemoryTaskQueue::new());
        let components = bootstrap::assemble(config.clone(), store.clone(), store.clone(), queue.clone())
            .await
            .expect("Failed to assemble application");

        Self {
            router: deployhub_api::build_router(components.state),
            store,
            queue,
            consumer: Arc::new(components.consumer),
            expiry: components.expiry,
            config,
            _dir: dir,
        }
    }

    /// Start the queue consumer in the background.
    pub fn start_consumer(&self) -> RunningConsumer {
        let (cancel, rx) = watch::channel(false);
        let consumer = self.consumer.clone();
        let handle = tokio::spawn(async move { consumer.run(rx).await });
        RunningConsumer { cancel, handle }
    }

    /// Gateway file path of a project (nginx provider).
    pub fn gateway_file(&self, project_id: &str) -> PathBuf {
        PathBuf::from(&self.config.gateway.config_dir).join(format!("{project_id}.conf"))
    }

    /// Artifact directory of a deployment.
    pub fn artifact_dir(&self, project_id: &str, hash: &str) -> PathBuf {
        PathBuf::from(&self.config.storage.base_dir)
            .join("deployments")
            .join(project_id)
            .join(hash)
    }

    /// Send a JSON request
    pub async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let body_str = body
            .map(|b| serde_json::to_string(&b).expect("Failed to serialize body"))
            .unwrap_or_default();

        let req = Request::builder()
            .method(method)
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body_str))
            .expect("Failed to build request");

        self.send(req).await
    }

    /// Send a multipart upload. `fields` are plain text parts; `file` is
    /// `(file name, bytes)`.
    pub async fn upload(&self, fields: &[(&str, &str)], file: Option<(&str, Vec<u8>)>) -> TestResponse {
        let mut body = Vec::new();
        for (name, value) in fields {
            write!(
                body,
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .expect("write field");
        }
        if let Some((file_name, data)) = file {
            write!(
                body,
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .expect("write file header");
            body.extend_from_slice(&data);
            body.extend_from_slice(b"\r\n");
        }
        write!(body, "--{BOUNDARY}--\r\n").expect("write trailer");

        let req = Request::builder()
            .method("POST")
            .uri("/api/deployments/upload")
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .expect("Failed to build request");

        self.send(req).await
    }

    /// Create a project and return its id.
    pub async fn create_project(&self, name: &str) -> String {
        let response = self
            .request("POST", "/api/projects", Some(serde_json::json!({ "name": name })))
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        response.body["data"]["id"]
            .as_str()
            .expect("project id")
            .to_string()
    }

    /// Poll a deployment until it leaves `pending`, returning its JSON.
    pub async fn wait_until_processed(&self, deployment_id: &str) -> Value {
        for _ in 0..200 {
            let response = self
                .request("GET", &format!("/api/deployments/{deployment_id}"), None)
                .await;
            assert_eq!(response.status, StatusCode::OK);
            if response.body["data"]["status"] != "pending" {
                return response.body["data"].clone();
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        panic!("deployment {deployment_id} was never processed");
    }

    async fn send(&self, req: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("Failed to read body");

        let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

        TestResponse { status, body }
    }
}

/// Build a zip archive from `(path, contents)` pairs.
pub fn zip_archive(files: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (path, contents) in files {
        writer
            .start_file(*path, zip::write::SimpleFileOptions::default())
            .expect("start zip entry");
        writer.write_all(contents.as_bytes()).expect("write zip entry");
    }
    writer.finish().expect("finish zip").into_inner()
}
