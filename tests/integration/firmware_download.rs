//! OTA firmware downloads.

use axum::http::{StatusCode, header};
use serde_json::json;

use crate::common::fixtures::{FIRMWARE_BYTES, FIRMWARE_NAME, Fleet};
use crate::common::http::{get, send};

#[tokio::test]
async fn test_exact_name_streams_binary() {
    let fleet = Fleet::new();
    let reply = get(&fleet.router(), &format!("/firmware/{FIRMWARE_NAME}")).await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body.as_ref(), FIRMWARE_BYTES);
    assert_eq!(
        reply.headers[header::CONTENT_DISPOSITION],
        format!("attachment; filename=\"{FIRMWARE_NAME}\"").as_str()
    );
}

#[tokio::test]
async fn test_downloads_are_counted() {
    let fleet = Fleet::new();
    let router = fleet.router();
    let uri = format!("/firmware/{FIRMWARE_NAME}");

    get(&router, &uri).await;
    get(&router, &uri).await;
    get(&router, "/firmware/rainmaker-1.1.0.bin").await;

    let stats = get(&router, "/api/stats").await.json();
    assert_eq!(stats["firmware_downloads"], 2);
}

#[tokio::test]
async fn test_other_names_are_refused() {
    let fleet = Fleet::new();
    let router = fleet.router();

    for uri in [
        "/firmware/rainmaker-1.1.0.bin",
        "/firmware/RAINMAKER-1.2.0.BIN",
        "/firmware/secret.txt",
        "/firmware/currentVersion.json",
        "/firmware/%2E%2E%2Fsecret.txt",
        "/firmware/..%2Fsecret.txt",
        "/firmware/firmware%2Frainmaker-1.2.0.bin",
        "/firmware/../secret.txt",
    ] {
        let reply = get(&router, uri).await;
        assert_eq!(reply.status, StatusCode::NOT_FOUND, "uri {uri}");
        assert_ne!(reply.body.as_ref(), b"do not serve", "uri {uri}");
    }
}

#[tokio::test]
async fn test_refusal_body_is_json_error() {
    let fleet = Fleet::new();
    let reply = get(&fleet.router(), "/firmware/secret.txt").await;
    assert_eq!(reply.json(), json!({"error": "File not found"}));
}

#[tokio::test]
async fn test_republished_descriptor_moves_the_gate() {
    let fleet = Fleet::new();
    let router = fleet.router();
    let next = fleet.path().join("firmware").join("rainmaker-1.3.0.bin");
    std::fs::write(next, b"next").unwrap();
    fleet.write_json(
        "currentVersion.json",
        &json!({"version": "1.3.0", "firmware_path": "firmware/rainmaker-1.3.0.bin"}),
    );

    let old = get(&router, &format!("/firmware/{FIRMWARE_NAME}")).await;
    assert_eq!(old.status, StatusCode::NOT_FOUND);

    let new = get(&router, "/firmware/rainmaker-1.3.0.bin").await;
    assert_eq!(new.status, StatusCode::OK);
    assert_eq!(new.body.as_ref(), b"next");
}

#[tokio::test]
async fn test_missing_descriptor_is_500() {
    let fleet = Fleet::new();
    fleet.remove("currentVersion.json");
    let reply = get(&fleet.router(), &format!("/firmware/{FIRMWARE_NAME}")).await;
    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_missing_binary_is_500() {
    let fleet = Fleet::new();
    std::fs::remove_file(fleet.path().join("firmware").join(FIRMWARE_NAME)).unwrap();
    let reply = get(&fleet.router(), &format!("/firmware/{FIRMWARE_NAME}")).await;
    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);

    let stats = get(&fleet.router(), "/api/stats").await.json();
    assert_eq!(stats["firmware_downloads"], 0);
}

#[tokio::test]
async fn test_head_is_not_a_download() {
    let fleet = Fleet::new();
    let router = fleet.router();
    let uri = format!("/firmware/{FIRMWARE_NAME}");

    let reply = send(&router, "HEAD", &uri, &[], None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.body.is_empty());

    let stats = get(&router, "/api/stats").await.json();
    assert_eq!(stats["firmware_downloads"], 0);
}

#[tokio::test]
async fn test_not_modified_is_not_a_download() {
    let fleet = Fleet::new();
    let router = fleet.router();
    let uri = format!("/firmware/{FIRMWARE_NAME}");

    let first = get(&router, &uri).await;
    let last_modified = first.headers[header::LAST_MODIFIED].to_str().unwrap();

    let reply = send(
        &router,
        "GET",
        &uri,
        &[("if-modified-since", last_modified)],
        None,
    )
    .await;
    assert_eq!(reply.status, StatusCode::NOT_MODIFIED);

    let stats = get(&router, "/api/stats").await.json();
    assert_eq!(stats["firmware_downloads"], 1);
}

#[tokio::test]
async fn test_unsatisfiable_range_is_not_a_download() {
    let fleet = Fleet::new();
    let router = fleet.router();
    let uri = format!("/firmware/{FIRMWARE_NAME}");

    let reply = send(&router, "GET", &uri, &[("range", "bytes=9999-")], None).await;
    assert_eq!(reply.status, StatusCode::RANGE_NOT_SATISFIABLE);

    let stats = get(&router, "/api/stats").await.json();
    assert_eq!(stats["firmware_downloads"], 0);
}

#[tokio::test]
async fn test_partial_content_is_a_download() {
    let fleet = Fleet::new();
    let router = fleet.router();
    let uri = format!("/firmware/{FIRMWARE_NAME}");

    let reply = send(&router, "GET", &uri, &[("range", "bytes=0-3")], None).await;
    assert_eq!(reply.status, StatusCode::PARTIAL_CONTENT);
    assert_eq!(reply.body.as_ref(), &FIRMWARE_BYTES[..4]);

    let stats = get(&router, "/api/stats").await.json();
    assert_eq!(stats["firmware_downloads"], 1);
}
