//! Request handlers.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use axum::{
    Json,
    body::{Body, Bytes},
    extract::{Path, Request, State},
    http::{HeaderMap, HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::{debug, error, info};

use super::{LIVENESS_TEXT, MAC_ADDRESS_HEADER, ServerState};
use crate::error::{RainError, Result};
use crate::firmware::FirmwareDescriptor;
use crate::store::{Zone, ZonesUpdate};

fn next_request(state: &ServerState, handler: &'static str) {
    let cnt = state.api_cnt.fetch_add(1, Ordering::Relaxed);
    debug!(request = cnt, handler, "Dispatching");
}

pub async fn get_index(State(state): State<Arc<ServerState>>) -> &'static str {
    next_request(&state, "get_index");
    LIVENESS_TEXT
}

/// Zones for the controller named by the `mac-address` header.
pub async fn get_manifold_zones(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Zone>>> {
    next_request(&state, "get_manifold_zones");

    let mac = headers
        .get(MAC_ADDRESS_HEADER)
        .and_then(|v| v.to_str().ok());
    let record = state.records.find_by_mac(mac).await?;
    info!(id = %record.id, mac = %record.mac_address, "Zone durations sent");
    Ok(Json(record.zones))
}

/// Replace the zones of one manifold.
///
/// The body is validated here rather than through the `Json` extractor so
/// that malformed input is a 400 with a reason.
pub async fn patch_manifold(
    State(state): State<Arc<ServerState>>,
    Path(manifold_id): Path<String>,
    body: Bytes,
) -> Result<Json<serde_json::Value>> {
    next_request(&state, "patch_manifold");

    let update = ZonesUpdate::from_slice(&body)?;
    state.records.update_zones(&manifold_id, &update).await?;
    Ok(Json(
        serde_json::json!({ "message": "Manifold data updated successfully" }),
    ))
}

/// The current firmware descriptor, metadata included.
pub async fn get_update(State(state): State<Arc<ServerState>>) -> Result<Json<FirmwareDescriptor>> {
    next_request(&state, "get_update");

    let descriptor = state.firmware.current_firmware().await?;
    info!(firmware = %descriptor.firmware_path, "Firmware descriptor delivered");
    Ok(Json(descriptor))
}

/// Stream the current firmware image if `filename` names it exactly.
pub async fn get_firmware(
    State(state): State<Arc<ServerState>>,
    Path(filename): Path<String>,
    request: Request,
) -> Result<Response> {
    next_request(&state, "get_firmware");

    let path = state.firmware.resolve_download(&filename).await?;
    tokio::fs::metadata(&path)
        .await
        .map_err(|e| RainError::store("open firmware", &path, e))?;

    let method = request.method().clone();
    let response = ServeFile::new(&path)
        .oneshot(request)
        .await
        .unwrap_or_else(|never| match never {});

    let status = response.status();
    let mut response = response.map(Body::new).into_response();
    if status.is_success() {
        if let Ok(value) = HeaderValue::from_str(&format!("attachment; filename=\"{filename}\"")) {
            response
                .headers_mut()
                .insert(header::CONTENT_DISPOSITION, value);
        }
    }

    if is_download(&method, status) {
        let total = state.firmware.record_download();
        info!(file = %filename, %status, downloads = total, "Firmware download started");
    } else if status.is_server_error() {
        error!(file = %filename, %status, "Problem serving firmware");
    } else {
        info!(file = %filename, %method, %status, "Firmware request answered without a body");
    }
    Ok(response)
}

/// A response carries firmware bytes only for GET with 200 or 206.
fn is_download(method: &Method, status: StatusCode) -> bool {
    *method == Method::GET && matches!(status, StatusCode::OK | StatusCode::PARTIAL_CONTENT)
}

/// Whole seconds until the next scheduled run, as plain text.
pub async fn get_next_run(State(state): State<Arc<ServerState>>) -> Result<String> {
    next_request(&state, "get_next_run");

    let seconds = state.schedule.seconds_until(Utc::now()).await?;
    info!(seconds, "Sleep interval sent");
    Ok(seconds.to_string())
}

/// Process-lifetime counters.
#[derive(Debug, Clone, Serialize)]
pub struct Stats {
    pub firmware_downloads: u64,
    pub requests: u64,
    pub started_at: DateTime<Utc>,
}

pub async fn get_stats(State(state): State<Arc<ServerState>>) -> Json<Stats> {
    next_request(&state, "get_stats");

    Json(Stats {
        firmware_downloads: state.firmware.downloads(),
        requests: state.api_cnt.load(Ordering::Relaxed),
        started_at: state.started_at,
    })
}
