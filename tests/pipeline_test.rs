//! End-to-end tests: upload, queue, processing, gateway output, expiry.

mod helpers;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use tokio::sync::watch;

use deployhub_core::traits::queue::TaskQueue;
use deployhub_core::types::DeploymentId;

use helpers::{TestApp, zip_archive};

fn site() -> Vec<u8> {
    zip_archive(&[
        ("index.html", "<h1>home</h1>"),
        ("assets/app.js", "console.log('hi')"),
    ])
}

async fn upload(app: &TestApp, project_id: &str, hash: &str, entry: &str) -> String {
    let response = app
        .upload(
            &[("project_id", project_id), ("hash", hash), ("entry_path", entry)],
            Some(("site.zip", site())),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
    assert_eq!(response.body["data"]["status"], "pending");
    response.body["data"]["id"]
        .as_str()
        .expect("deployment id")
        .to_string()
}

#[tokio::test]
async fn test_upload_becomes_ready_and_routed() {
    let app = TestApp::new().await;
    let project_id = app.create_project("Marketing Site").await;

    let consumer = app.start_consumer();
    let id = upload(&app, &project_id, "abc123", "index.html").await;
    let deployment = app.wait_until_processed(&id).await;
    consumer.stop().await;

    assert_eq!(deployment["status"], "ready");
    assert_eq!(
        deployment["public_url"],
        "http://abc123.marketing-site.example.com"
    );
    assert_eq!(deployment["entry_path"], "/index.html");

    let conf = std::fs::read_to_string(app.gateway_file(&project_id)).expect("gateway file");
    assert_eq!(conf.matches("server {").count(), 1);
    assert!(conf.contains("server_name abc123.marketing-site.example.com;"));
    assert!(app.artifact_dir(&project_id, "abc123").join("assets/app.js").is_file());
}

#[tokio::test]
async fn test_each_ready_deployment_gets_a_block() {
    let app = TestApp::new().await;
    let project_id = app.create_project("docs").await;

    let consumer = app.start_consumer();
    let first = upload(&app, &project_id, "v1", "index.html").await;
    let second = upload(&app, &project_id, "v2", "/").await;
    app.wait_until_processed(&first).await;
    app.wait_until_processed(&second).await;
    consumer.stop().await;

    let conf = std::fs::read_to_string(app.gateway_file(&project_id)).expect("gateway file");
    assert_eq!(conf.matches("server {").count(), 2);
    assert!(conf.contains("v1.docs.example.com"));
    assert!(conf.contains("v2.docs.example.com"));
}

#[tokio::test]
async fn test_missing_entry_path_marks_error() {
    let app = TestApp::new().await;
    let project_id = app.create_project("broken").await;

    let consumer = app.start_consumer();
    let id = upload(&app, &project_id, "abc", "missing.html").await;
    let deployment = app.wait_until_processed(&id).await;
    consumer.stop().await;

    assert_eq!(deployment["status"], "error");
    assert!(deployment["public_url"].is_null());
    assert!(!app.gateway_file(&project_id).exists());
}

#[tokio::test]
async fn test_malicious_archive_rejected_without_residue() {
    let app = TestApp::new().await;
    let project_id = app.create_project("hostile").await;

    let evil = zip_archive(&[("../escape.txt", "pwned")]);
    let response = app
        .upload(
            &[("project_id", project_id.as_str()), ("hash", "evil")],
            Some(("evil.zip", evil)),
        )
        .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.body["error"], "PATH_TRAVERSAL");
    assert!(!app.artifact_dir(&project_id, "evil").exists());
    assert_eq!(app.queue.len("deployments").await.unwrap(), 0);
}

#[tokio::test]
async fn test_expiry_removes_storage_and_route() {
    let app = TestApp::new().await;
    let project_id = app.create_project("short-lived").await;

    let consumer = app.start_consumer();
    let id = upload(&app, &project_id, "abc", "index.html").await;
    app.wait_until_processed(&id).await;
    consumer.stop().await;
    assert!(app.gateway_file(&project_id).exists());

    let deployment_id: DeploymentId = id.parse().expect("uuid");
    app.store
        .set_expires_at(deployment_id, Some(Utc::now() - Duration::hours(1)))
        .await
        .expect("set expiry");

    let (_tx, rx) = watch::channel(false);
    assert_eq!(app.expiry.run_once(&rx).await, 1);

    let response = app
        .request("GET", &format!("/api/deployments/{id}"), None)
        .await;
    assert_eq!(response.body["data"]["status"], "expired");
    assert!(!app.gateway_file(&project_id).exists());
    assert!(!app.artifact_dir(&project_id, "abc").exists());

    // Nothing left to expire.
    assert_eq!(app.expiry.run_once(&rx).await, 0);
}
