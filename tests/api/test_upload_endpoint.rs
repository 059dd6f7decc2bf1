// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Router-level tests for POST /upload and GET /health

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use controlnet_relay::api::{create_app, AppState};
use controlnet_relay::config::RelayConfig;
use controlnet_relay::generation::{
    CompletionPoller, GenerationClient, GenerationStatus, PollPolicy, WorkflowDriver,
    WorkflowError,
};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use crate::common::multipart::{build_body, content_type, FormPart};
use crate::common::stub_provider::{StubBehaviour, StubProvider};
use crate::common::{job, FakeService, InstantSleeper};

fn app_with(service: Arc<FakeService>, upload_dir: &Path) -> Router {
    let config = RelayConfig {
        api_key: "test-key".to_string(),
        upload_dir: upload_dir.to_path_buf(),
        ..Default::default()
    };
    let poller = CompletionPoller::new(PollPolicy::default(), Arc::new(InstantSleeper::default()));
    let workflow = WorkflowDriver::new(service, poller);
    create_app(AppState::with_workflow(config, workflow))
}

fn upload_request(parts: &[FormPart<'_>]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/upload")
        .header(header::CONTENT_TYPE, content_type())
        .body(Body::from(build_body(parts)))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn stored_files(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}

const IMAGE_BYTES: &[u8] = b"\xFF\xD8\xFFtiny-jpeg";

// ============================================================================
// Success
// ============================================================================

#[tokio::test]
async fn test_upload_returns_generated_images() {
    let dir = tempfile::tempdir().unwrap();
    let service = Arc::new(FakeService::succeeding(&[
        "https://cdn/a.jpg",
        "https://cdn/b.jpg",
    ]));
    let app = app_with(service.clone(), dir.path());

    let response = app
        .oneshot(upload_request(&[
            FormPart::File {
                name: "image",
                filename: "portrait.jpg",
                bytes: IMAGE_BYTES,
            },
            FormPart::Text {
                name: "prompt",
                value: "oil painting of a lighthouse",
            },
        ]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(
        body,
        serde_json::json!({ "images": ["https://cdn/a.jpg", "https://cdn/b.jpg"] })
    );
    assert_eq!(service.calls()[0], "acquire:jpg");
    assert_eq!(stored_files(dir.path()), 0);
}

#[tokio::test]
async fn test_upload_accepts_prompt_before_image() {
    let dir = tempfile::tempdir().unwrap();
    let service = Arc::new(FakeService::succeeding(&["https://cdn/a.jpg"]));
    let app = app_with(service.clone(), dir.path());

    let response = app
        .oneshot(upload_request(&[
            FormPart::Text {
                name: "prompt",
                value: "sketch",
            },
            FormPart::Text {
                name: "unrelated",
                value: "ignored",
            },
            FormPart::File {
                name: "image",
                filename: "drawing.png",
                bytes: IMAGE_BYTES,
            },
        ]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(service.calls()[0], "acquire:png");
}

// ============================================================================
// Client errors
// ============================================================================

#[tokio::test]
async fn test_missing_image_is_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    let service = Arc::new(FakeService::succeeding(&["https://cdn/a.jpg"]));
    let app = app_with(service.clone(), dir.path());

    let response = app
        .oneshot(upload_request(&[FormPart::Text {
            name: "prompt",
            value: "anything",
        }]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await,
        serde_json::json!({ "error": "No image file uploaded" })
    );
    assert!(service.calls().is_empty());
}

#[tokio::test]
async fn test_empty_image_part_counts_as_missing() {
    let dir = tempfile::tempdir().unwrap();
    let service = Arc::new(FakeService::succeeding(&["https://cdn/a.jpg"]));
    let app = app_with(service.clone(), dir.path());

    let response = app
        .oneshot(upload_request(&[
            FormPart::File {
                name: "image",
                filename: "",
                bytes: b"",
            },
            FormPart::Text {
                name: "prompt",
                value: "anything",
            },
        ]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "No image file uploaded");
    assert_eq!(stored_files(dir.path()), 0);
}

#[tokio::test]
async fn test_missing_prompt_is_bad_request_and_removes_file() {
    let dir = tempfile::tempdir().unwrap();
    let service = Arc::new(FakeService::succeeding(&["https://cdn/a.jpg"]));
    let app = app_with(service.clone(), dir.path());

    let response = app
        .oneshot(upload_request(&[
            FormPart::File {
                name: "image",
                filename: "portrait.jpg",
                bytes: IMAGE_BYTES,
            },
            FormPart::Text {
                name: "prompt",
                value: "   ",
            },
        ]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await,
        serde_json::json!({ "error": "No prompt provided" })
    );
    assert!(service.calls().is_empty());
    assert_eq!(stored_files(dir.path()), 0);
}

#[tokio::test]
async fn test_missing_both_reports_image_first() {
    let dir = tempfile::tempdir().unwrap();
    let service = Arc::new(FakeService::succeeding(&[]));
    let app = app_with(service, dir.path());

    let response = app
        .oneshot(upload_request(&[FormPart::Text {
            name: "other",
            value: "x",
        }]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "No image file uploaded");
}

// ============================================================================
// Workflow failures
// ============================================================================

#[tokio::test]
async fn test_generation_failure_is_internal_error() {
    let dir = tempfile::tempdir().unwrap();
    let service = Arc::new(FakeService::succeeding(&[]).with_statuses(vec![Ok(job(
        GenerationStatus::Failed,
        &[],
        Some("NSFW content detected"),
    ))]));
    let app = app_with(service.clone(), dir.path());

    let response = app
        .oneshot(upload_request(&[
            FormPart::File {
                name: "image",
                filename: "portrait.jpg",
                bytes: IMAGE_BYTES,
            },
            FormPart::Text {
                name: "prompt",
                value: "prompt",
            },
        ]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let error = json_body(response).await["error"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(error.contains("NSFW content detected"));
    assert_eq!(service.query_count(), 1);
    assert_eq!(stored_files(dir.path()), 0);
}

#[tokio::test]
async fn test_upload_stage_failure_is_internal_error() {
    let dir = tempfile::tempdir().unwrap();
    let service = Arc::new(FakeService::succeeding(&[]).with_upload_error(
        WorkflowError::Upload {
            status: Some(403),
            message: "upstream returned 403 Forbidden: AccessDenied".to_string(),
        },
    ));
    let app = app_with(service, dir.path());

    let response = app
        .oneshot(upload_request(&[
            FormPart::File {
                name: "image",
                filename: "portrait.jpg",
                bytes: IMAGE_BYTES,
            },
            FormPart::Text {
                name: "prompt",
                value: "prompt",
            },
        ]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Error uploading image"));
    assert_eq!(stored_files(dir.path()), 0);
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_health_reports_ok() {
    let dir = tempfile::tempdir().unwrap();
    let app = app_with(Arc::new(FakeService::succeeding(&[])), dir.path());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_object());
}

// ============================================================================
// End to end through the real client
// ============================================================================

#[tokio::test]
async fn test_end_to_end_against_stub_provider() {
    let stub = StubProvider::spawn(StubBehaviour {
        statuses: vec![
            crate::common::stub_provider::status("PENDING", None),
            crate::common::stub_provider::complete_status(&[
                "https://cdn.example/final-1.jpg",
                "https://cdn.example/final-2.jpg",
            ]),
        ],
        ..Default::default()
    })
    .await;
    let dir = tempfile::tempdir().unwrap();
    let config = RelayConfig {
        api_key: "e2e-key".to_string(),
        api_base: stub.base_url.clone(),
        upload_dir: dir.path().to_path_buf(),
        poll_policy: PollPolicy {
            max_attempts: 5,
            interval: Duration::ZERO,
        },
        ..Default::default()
    };
    let client = Arc::new(GenerationClient::new(&config).unwrap());
    let workflow = WorkflowDriver::new(client, CompletionPoller::with_tokio(config.poll_policy));
    let app = create_app(AppState::with_workflow(config, workflow));

    let response = app
        .oneshot(upload_request(&[
            FormPart::File {
                name: "image",
                filename: "card.webp",
                bytes: IMAGE_BYTES,
            },
            FormPart::Text {
                name: "prompt",
                value: "trading card hero",
            },
        ]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await["images"],
        serde_json::json!([
            "https://cdn.example/final-1.jpg",
            "https://cdn.example/final-2.jpg"
        ])
    );

    let record = stub.record();
    assert_eq!(record.extensions, vec!["webp".to_string()]);
    assert_eq!(record.upload_file.map(|(_, bytes)| bytes), Some(IMAGE_BYTES.to_vec()));
    assert_eq!(record.generation_bodies[0]["prompt"], "trading card hero");
    assert_eq!(record.status_queries.len(), 2);
    assert_eq!(stored_files(dir.path()), 0);
}
