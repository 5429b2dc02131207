//! Endpoint behavior through the full router.

use axum::http::StatusCode;
use chrono::Duration;
use serde_json::json;

use crate::common::fixtures::{Fleet, MAC_M1, MAC_M2, sample_manifolds};
use crate::common::http::{get, get_with_mac, patch_json, send};
use crate::common::init_test_logging;

// ===== Liveness =====

#[tokio::test]
async fn test_index() {
    let fleet = Fleet::new();
    let reply = get(&fleet.router(), "/").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.text(), "Hello from Rainmaker");
}

// ===== GET /api/manifolds =====

#[tokio::test]
async fn test_zones_for_known_mac() {
    init_test_logging();
    let fleet = Fleet::new();
    let reply = get_with_mac(&fleet.router(), MAC_M2).await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(
        reply.json(),
        json!([
            {"zone": 1, "duration": 60},
            {"zone": 2, "duration": 90},
            {"zone": 3, "duration": 0}
        ])
    );
}

#[tokio::test]
async fn test_unknown_mac_is_404_not_500() {
    let fleet = Fleet::new();
    let reply = get_with_mac(&fleet.router(), "00:00:00:00:00:00").await;

    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.json(), json!({"error": "MAC address not found"}));
}

#[tokio::test]
async fn test_missing_mac_header_is_404() {
    let fleet = Fleet::new();
    let reply = get(&fleet.router(), "/api/manifolds").await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);

    let reply = get_with_mac(&fleet.router(), "").await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_mac_lookup_is_case_sensitive() {
    let fleet = Fleet::new();
    let reply = get_with_mac(&fleet.router(), &MAC_M1.to_lowercase()).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_missing_records_document_is_500() {
    let fleet = Fleet::new();
    fleet.remove("manifolds.json");
    let reply = get_with_mac(&fleet.router(), MAC_M1).await;

    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(reply.json(), json!({"error": "Internal Server Error"}));
}

#[tokio::test]
async fn test_corrupt_records_document_is_500() {
    let fleet = Fleet::new();
    fleet.write_raw("manifolds.json", "[{\"id\": ");
    let reply = get_with_mac(&fleet.router(), MAC_M1).await;
    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
}

// ===== PATCH /api/manifolds/{id} =====

#[tokio::test]
async fn test_patch_updates_only_zones() {
    init_test_logging();
    let fleet = Fleet::new();
    let router = fleet.router();

    let reply = patch_json(
        &router,
        "/api/manifolds/M1",
        &json!({"zones": [{"zone": 1, "duration": 600}]}),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(
        reply.json(),
        json!({"message": "Manifold data updated successfully"})
    );

    let mut expected = sample_manifolds();
    expected[0] = json!({
        "id": "M1",
        "macAddress": "AA:BB:CC:DD:EE:FF",
        "zones": [{"zone": 1, "duration": 600}]
    });
    assert_eq!(fleet.read_manifolds(), expected);

    let reply = get_with_mac(&router, MAC_M1).await;
    assert_eq!(reply.json(), json!([{"zone": 1, "duration": 600}]));
}

#[tokio::test]
async fn test_patch_cannot_clobber_identity() {
    let fleet = Fleet::new();
    let reply = patch_json(
        &fleet.router(),
        "/api/manifolds/M2",
        &json!({"id": "M9", "macAddress": "FF:FF:FF:FF:FF:FF", "zones": []}),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);

    let stored = fleet.read_manifolds();
    assert_eq!(stored[1]["id"], "M2");
    assert_eq!(stored[1]["macAddress"], MAC_M2);
    assert_eq!(stored[1]["site"], "greenhouse");
    assert_eq!(stored[1]["zones"], json!([]));
}

#[tokio::test]
async fn test_patch_twice_is_idempotent() {
    let fleet = Fleet::new();
    let router = fleet.router();
    let body = json!({"zones": [{"zone": 1, "duration": 45}, {"zone": 2, "duration": 15}]});

    patch_json(&router, "/api/manifolds/M2", &body).await;
    let after_first = fleet.read_manifolds();
    patch_json(&router, "/api/manifolds/M2", &body).await;
    assert_eq!(fleet.read_manifolds(), after_first);
}

#[tokio::test]
async fn test_patch_unknown_manifold_is_404() {
    let fleet = Fleet::new();
    let body = json!({"zones": []});
    let reply = patch_json(&fleet.router(), "/api/manifolds/M404", &body).await;

    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.json(), json!({"error": "Manifold not found"}));
    assert_eq!(fleet.read_manifolds(), sample_manifolds());
}

#[tokio::test]
async fn test_patch_malformed_is_400_and_not_persisted() {
    let fleet = Fleet::new();
    let router = fleet.router();

    let bodies: [&[u8]; 5] = [
        b"",
        b"{",
        br#"{"zones": "all of them"}"#,
        br#"{"zones": [{"zone": 1, "duration": -1}]}"#,
        br#"{"durations": [1, 2, 3]}"#,
    ];
    for body in bodies {
        let reply = send(&router, "PATCH", "/api/manifolds/M1", &[], Some(body)).await;
        assert_eq!(
            reply.status,
            StatusCode::BAD_REQUEST,
            "body {:?}",
            String::from_utf8_lossy(body)
        );
        assert!(reply.json()["error"].is_string());
    }
    assert_eq!(fleet.read_manifolds(), sample_manifolds());
}

#[tokio::test]
async fn test_patch_with_missing_document_is_500() {
    let fleet = Fleet::new();
    fleet.remove("manifolds.json");
    let reply = patch_json(&fleet.router(), "/api/manifolds/M1", &json!({"zones": []})).await;
    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
}

// ===== GET /api/getUpdate =====

#[tokio::test]
async fn test_get_update_returns_descriptor() {
    let fleet = Fleet::new();
    let reply = get(&fleet.router(), "/api/getUpdate").await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(
        reply.json(),
        json!({
            "version": "1.2.0",
            "firmware_path": "firmware/rainmaker-1.2.0.bin",
            "released": "2026-04-01"
        })
    );
}

#[tokio::test]
async fn test_get_update_unreadable_is_500() {
    let fleet = Fleet::new();
    fleet.write_raw("currentVersion.json", "not json");
    let reply = get(&fleet.router(), "/api/getUpdate").await;
    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(reply.json(), json!({"error": "Internal Server Error"}));
}

// ===== GET /api/nextrun =====

#[tokio::test]
async fn test_next_run_in_future() {
    let fleet = Fleet::new();
    fleet.write_next_run_in(Duration::milliseconds(10_500));
    let reply = get(&fleet.router(), "/api/nextrun").await;

    assert_eq!(reply.status, StatusCode::OK);
    let seconds: i64 = reply.text().parse().unwrap();
    assert!((9..=10).contains(&seconds), "got {seconds}");
}

#[tokio::test]
async fn test_next_run_in_past_is_negative() {
    let fleet = Fleet::new();
    fleet.write_next_run_in(Duration::minutes(-5));
    let reply = get(&fleet.router(), "/api/nextrun").await;

    assert_eq!(reply.status, StatusCode::OK);
    let seconds: i64 = reply.text().parse().unwrap();
    assert!((-302..=-300).contains(&seconds), "got {seconds}");
}

#[tokio::test]
async fn test_next_run_missing_is_500() {
    let fleet = Fleet::new();
    fleet.remove("nextRun.json");
    let reply = get(&fleet.router(), "/api/nextrun").await;
    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
}

// ===== GET /api/stats =====

#[tokio::test]
async fn test_stats_counts_requests() {
    let fleet = Fleet::new();
    let router = fleet.router();
    get(&router, "/").await;
    get_with_mac(&router, MAC_M1).await;

    let stats = get(&router, "/api/stats").await.json();
    assert_eq!(stats["firmware_downloads"], 0);
    assert_eq!(stats["requests"], 3);
    assert!(stats["started_at"].is_string());
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let fleet = Fleet::new();
    let reply = get(&fleet.router(), "/api/zones").await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}
