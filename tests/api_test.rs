//! HTTP surface tests: status codes, error bodies, project CRUD.

mod helpers;

use axum::http::StatusCode;
use serde_json::json;

use helpers::{TestApp, zip_archive};

#[tokio::test]
async fn test_health() {
    let app = TestApp::new().await;
    let response = app.request("GET", "/api/health", None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["status"], "ok");
    assert_eq!(response.body["data"]["queue"], true);
    assert_eq!(response.body["data"]["storage"], true);
}

#[tokio::test]
async fn test_project_crud() {
    let app = TestApp::new().await;
    let id = app.create_project("landing").await;

    let response = app.request("GET", &format!("/api/projects/{id}"), None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["name"], "landing");

    let response = app
        .request("PUT", &format!("/api/projects/{id}"), Some(json!({ "name": "landing-v2" })))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["name"], "landing-v2");

    let response = app.request("GET", "/api/projects?page=1&page_size=10", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["total_items"], 1);

    let response = app.request("DELETE", &format!("/api/projects/{id}"), None).await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);

    let response = app.request("GET", &format!("/api/projects/{id}"), None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["error"], "NOT_FOUND");
}

#[tokio::test]
async fn test_project_validation_and_conflict() {
    let app = TestApp::new().await;

    let response = app
        .request("POST", "/api/projects", Some(json!({ "name": "ab" })))
        .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.body["error"], "VALIDATION");

    app.create_project("taken").await;
    let response = app
        .request("POST", "/api/projects", Some(json!({ "name": "Taken" })))
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);

    // Different name, same host label.
    let response = app
        .request("POST", "/api/projects", Some(json!({ "name": "taken!!" })))
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.body["error"], "CONFLICT");
}

#[tokio::test]
async fn test_upload_requires_fields() {
    let app = TestApp::new().await;
    let project_id = app.create_project("site").await;

    let response = app
        .upload(&[("hash", "abc")], Some(("site.zip", zip_archive(&[("index.html", "x")]))))
        .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.body["message"], "project_id is required");

    let response = app
        .upload(&[("project_id", project_id.as_str()), ("hash", "abc")], None)
        .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.body["message"], "file is required");

    let response = app
        .upload(
            &[("project_id", "not-a-uuid"), ("hash", "abc")],
            Some(("site.zip", zip_archive(&[("index.html", "x")]))),
        )
        .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_upload_unknown_project() {
    let app = TestApp::new().await;
    let response = app
        .upload(
            &[
                ("project_id", "0190b7a4-3b1e-7cc4-9c2c-7f0b1d6e2a12"),
                ("hash", "abc"),
            ],
            Some(("site.zip", zip_archive(&[("index.html", "x")]))),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_upload_over_body_limit() {
    let app = TestApp::with_config(|c| c.storage.max_upload_size_bytes = 1024).await;
    let project_id = app.create_project("site").await;

    let response = app
        .upload(
            &[("project_id", project_id.as_str()), ("hash", "big")],
            Some(("site.zip", vec![0u8; 64 * 1024])),
        )
        .await;
    assert_eq!(response.status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_list_and_get_deployments() {
    let app = TestApp::new().await;
    let project_id = app.create_project("site").await;

    for hash in ["a1", "b2", "c3"] {
        let response = app
            .upload(
                &[("project_id", project_id.as_str()), ("hash", hash)],
                Some(("site.zip", zip_archive(&[("index.html", "x")]))),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED);
    }

    let response = app
        .request(
            "GET",
            &format!("/api/deployments?project_id={project_id}&status=pending&page_size=2"),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["total_items"], 3);
    assert_eq!(response.body["data"]["items"].as_array().map(Vec::len), Some(2));
    assert_eq!(response.body["data"]["has_next"], true);

    let response = app.request("GET", "/api/deployments?status=deleted", None).await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);

    let response = app.request("GET", "/api/deployments/not-a-uuid", None).await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);

    let response = app
        .request("GET", "/api/deployments/0190b7a4-3b1e-7cc4-9c2c-7f0b1d6e2a11", None)
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_refused_while_pending() {
    let app = TestApp::new().await;
    let project_id = app.create_project("busy").await;
    let response = app
        .upload(
            &[("project_id", project_id.as_str()), ("hash", "abc")],
            Some(("site.zip", zip_archive(&[("index.html", "x")]))),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);

    let response = app
        .request("DELETE", &format!("/api/projects/{project_id}"), None)
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
}
