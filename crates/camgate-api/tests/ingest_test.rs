//! Upload API integration tests.
//!
//! Run with: `cargo test -p camgate-api --test ingest_test`

mod helpers;

use axum::http::StatusCode;
use bytes::Bytes;
use camgate_core::RejectionPolicy;
use camgate_storage::Storage;
use helpers::fixtures::{content_disposition, jpeg, png, NORTH_AUTH, SCRIPTED_AUTH, WRONG_AUTH};
use helpers::{api_path, setup_test_app, setup_test_app_with};
use serde_json::Value;

#[tokio::test]
async fn test_accepted_upload_is_archived_and_readable() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .post(&api_path("/images"))
        .add_header("Content-Disposition", content_disposition("12.jpg"))
        .add_header("Authorization", NORTH_AUTH)
        .add_header("Forwarded", "for=203.0.113.5;proto=https")
        .bytes(jpeg())
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert!(response.text().starts_with("Image received: 12_"));

    let entries = app.wait_for_entries(1).await;
    let entry = &entries[0];
    assert_eq!(entry.camera_id, "12");
    assert!(entry.is_fully_populated());
    let local_key = entry.original_local_path.as_deref().unwrap();
    assert_eq!(
        app.tiers.local.download(local_key).await.unwrap(),
        jpeg()
    );

    let replay = app.client().get(&api_path("/replay/12")).await;
    assert_eq!(replay.status_code(), StatusCode::OK);
    let body: Vec<Value> = replay.json();
    assert_eq!(body.len(), 1);
    assert_eq!(body[0]["camera_id"], "12");
}

#[tokio::test]
async fn test_wrong_address_is_rejected() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .post(&api_path("/images"))
        .add_header("Content-Disposition", content_disposition("12.jpg"))
        .add_header("Authorization", NORTH_AUTH)
        .add_header("Forwarded", "for=198.51.100.9")
        .bytes(jpeg())
        .await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["code"], "IP_MISMATCH");
    assert!(app.index.entries().is_empty());
}

#[tokio::test]
async fn test_address_from_x_forwarded_for() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .post(&api_path("/images"))
        .add_header("Content-Disposition", content_disposition("12.jpg"))
        .add_header("Authorization", NORTH_AUTH)
        .add_header("X-Forwarded-For", "203.0.113.5, 10.0.0.1")
        .bytes(jpeg())
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn test_malformed_filename_is_bad_request() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .post(&api_path("/images"))
        .add_header("Content-Disposition", content_disposition("12 .jpg"))
        .add_header("Authorization", NORTH_AUTH)
        .add_header("Forwarded", "for=203.0.113.5")
        .bytes(jpeg())
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "MALFORMED_FILENAME");
}

#[tokio::test]
async fn test_missing_authorization_is_credential_mismatch() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .post(&api_path("/images"))
        .add_header("Content-Disposition", content_disposition("open.jpg"))
        .add_header("Forwarded", "for=198.51.100.20")
        .bytes(jpeg())
        .await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["code"], "CREDENTIAL_MISMATCH");
}

#[tokio::test]
async fn test_scripted_upload_requires_https() {
    let app = setup_test_app().await;

    let secure = app
        .client()
        .post(&api_path("/images"))
        .add_header("Content-Disposition", content_disposition("99.jpg"))
        .add_header("Authorization", SCRIPTED_AUTH)
        .add_header("Forwarded", "for=192.0.2.17;proto=https")
        .bytes(jpeg())
        .await;
    assert_eq!(secure.status_code(), StatusCode::OK);

    let plain = app
        .client()
        .post(&api_path("/images"))
        .add_header("Content-Disposition", content_disposition("99.jpg"))
        .add_header("Authorization", SCRIPTED_AUTH)
        .add_header("Forwarded", "for=192.0.2.17;proto=http")
        .bytes(jpeg())
        .await;
    assert_eq!(plain.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = plain.json();
    assert_eq!(body["code"], "INSECURE_SCRIPTED_UPLOAD");
}

#[tokio::test]
async fn test_payload_checks() {
    let app = setup_test_app().await;
    let upload = |body: Bytes| {
        app.client()
            .post(&api_path("/images"))
            .add_header("Content-Disposition", content_disposition("open.jpg"))
            .add_header("Authorization", NORTH_AUTH)
            .bytes(body)
    };

    let response = upload(png()).await;
    assert_eq!(response.status_code(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

    let response = upload(Bytes::new()).await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let mut oversized = jpeg().to_vec();
    oversized.resize(128 * 1024, 0);
    let response = upload(Bytes::from(oversized)).await;
    assert_eq!(response.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_oversized_body_is_refused_before_authorization() {
    let app = setup_test_app().await;
    let mut oversized = jpeg().to_vec();
    oversized.resize(128 * 1024, 0);

    let response = app
        .client()
        .post(&api_path("/images"))
        .add_header("Content-Disposition", content_disposition("open.jpg"))
        .add_header("Authorization", WRONG_AUTH)
        .add_header("Content-Length", oversized.len().to_string())
        .bytes(Bytes::from(oversized))
        .await;

    assert_eq!(response.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
    let metrics: Value = app.client().get(&api_path("/metrics")).await.json();
    assert_eq!(metrics["auth"]["auth_failure"], 0);
}

#[tokio::test]
async fn test_disguised_policy_hides_rejections() {
    let app = setup_test_app_with(|config| {
        config.rejection_policy = RejectionPolicy::Disguised;
    })
    .await;

    let response = app
        .client()
        .post(&api_path("/images"))
        .add_header("Content-Disposition", content_disposition("open.jpg"))
        .add_header("Authorization", WRONG_AUTH)
        .bytes(jpeg())
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.text(), "OK");

    // Media type failures keep their status
    let response = app
        .client()
        .post(&api_path("/images"))
        .add_header("Content-Disposition", content_disposition("open.jpg"))
        .add_header("Authorization", NORTH_AUTH)
        .bytes(png())
        .await;
    assert_eq!(response.status_code(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

    let metrics: Value = app.client().get(&api_path("/metrics")).await.json();
    assert_eq!(metrics["auth"]["rejections"]["CREDENTIAL_MISMATCH"], 1);
    assert_eq!(metrics["auth"]["auth_failure"], 1);
}

#[tokio::test]
async fn test_publish_failure_fails_the_upload() {
    let app = setup_test_app_with(|config| {
        config.fanout.archiver_enabled = false;
    })
    .await;
    // A bound queue nobody consumes
    drop(app.background.exchange().bind("orphan"));

    let response = app
        .client()
        .post(&api_path("/images"))
        .add_header("Content-Disposition", content_disposition("open.jpg"))
        .add_header("Authorization", NORTH_AUTH)
        .bytes(jpeg())
        .await;

    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(body["code"], "PUBLISH_FAILED");

    let metrics: Value = app.client().get(&api_path("/metrics")).await.json();
    assert_eq!(metrics["auth"]["publish_failure"], 1);
    assert_eq!(metrics["auth"]["publish_success"], 0);
}

#[tokio::test]
async fn test_metrics_count_ip_checks() {
    let app = setup_test_app().await;

    for ip in ["203.0.113.5", "198.51.100.9"] {
        app.client()
            .post(&api_path("/images"))
            .add_header("Content-Disposition", content_disposition("12.jpg"))
            .add_header("Authorization", NORTH_AUTH)
            .add_header("Forwarded", format!("for={}", ip))
            .bytes(jpeg())
            .await;
    }

    let metrics: Value = app.client().get(&api_path("/metrics")).await.json();
    assert_eq!(metrics["auth"]["ip_success"], 1);
    assert_eq!(metrics["auth"]["ip_failure"], 1);
    assert_eq!(metrics["auth"]["publish_success"], 1);
    assert_eq!(metrics["credential_cache"]["loaded"], true);
}

#[tokio::test]
async fn test_shutdown_drains_archiver() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .post(&api_path("/images"))
        .add_header("Content-Disposition", content_disposition("open.jpg"))
        .add_header("Authorization", NORTH_AUTH)
        .bytes(jpeg())
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let index = app.index.clone();
    app.background.shutdown().await;
    assert_eq!(index.entries().len(), 1);
}

#[tokio::test]
async fn test_accepted_upload_is_relayed_to_ftp_target() {
    let app = setup_test_app_with(|config| {
        config.fanout.relay.enabled = true;
        config.fanout.relay.target_dir = "webcams".to_string();
    })
    .await;

    let response = app
        .client()
        .post(&api_path("/images"))
        .add_header("Content-Disposition", content_disposition("12.jpg"))
        .add_header("Authorization", NORTH_AUTH)
        .add_header("Forwarded", "for=203.0.113.5")
        .bytes(jpeg())
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let text = response.text();
    let filename = text.trim_start_matches("Image received: ");
    let relayed = app
        .wait_for_relayed(&format!("webcams/12/{}", filename))
        .await;
    assert_eq!(relayed, jpeg().to_vec());

    // Both subscribers received the image
    let entries = app.wait_for_entries(1).await;
    assert_eq!(entries[0].camera_id, "12");
}

#[tokio::test]
async fn test_relay_honours_camera_ftp_target() {
    let app = setup_test_app_with(|config| {
        config.fanout.relay.enabled = true;
    })
    .await;
    let mut cameras = helpers::fixtures::cameras();
    cameras[2].ftp_target_folder = Some("site/open".to_string());
    cameras[2].ftp_target_filename = Some("current.jpg".to_string());
    app.directory.set_cameras(cameras);
    app.state.auth.cache.refresh().await.unwrap();

    let response = app
        .client()
        .post(&api_path("/images"))
        .add_header("Content-Disposition", content_disposition("open.jpg"))
        .add_header("Authorization", NORTH_AUTH)
        .bytes(jpeg())
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let relayed = app.wait_for_relayed("site/open/current.jpg").await;
    assert_eq!(relayed, jpeg().to_vec());
}
