//! HTTP API for the controller fleet.
//!
//! | Method | Path | Purpose |
//! |--------|------|---------|
//! | GET | `/` | Liveness text |
//! | GET | `/api/manifolds` | Zones for the device in the `mac-address` header |
//! | PATCH | `/api/manifolds/{manifold_id}` | Replace a manifold's zones |
//! | GET | `/api/getUpdate` | Current firmware descriptor |
//! | GET | `/firmware/{filename}` | Firmware binary download |
//! | GET | `/api/nextrun` | Seconds until the next scheduled run |
//! | GET | `/api/stats` | Download and request counters |

mod handlers;

use std::sync::Arc;
use std::sync::atomic::AtomicU64;

use axum::Router;
use axum::routing::get;
use chrono::{DateTime, Utc};
use tokio::net::TcpListener;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{Level, info, warn};

use crate::config::ResolvedPaths;
use crate::error::{RainError, Result};
use crate::firmware::FirmwareCatalog;
use crate::schedule::NextRunSchedule;
use crate::store::RecordStore;

pub use handlers::{
    Stats, get_firmware, get_index, get_manifold_zones, get_next_run, get_stats, get_update,
    patch_manifold,
};

/// Header carrying the controller's MAC address.
pub const MAC_ADDRESS_HEADER: &str = "mac-address";

/// Text served on `/`.
pub const LIVENESS_TEXT: &str = "Hello from Rainmaker";

/// Shared state handed to every handler.
#[derive(Debug)]
pub struct ServerState {
    pub records: RecordStore,
    pub firmware: FirmwareCatalog,
    pub schedule: NextRunSchedule,
    pub started_at: DateTime<Utc>,
    pub api_cnt: AtomicU64,
}

impl ServerState {
    /// Build state for the resolved document locations. Nothing is read yet.
    pub fn new(paths: &ResolvedPaths) -> Self {
        Self {
            records: RecordStore::new(&paths.manifolds),
            firmware: FirmwareCatalog::new(&paths.firmware),
            schedule: NextRunSchedule::new(&paths.next_run),
            started_at: Utc::now(),
            api_cnt: AtomicU64::new(0),
        }
    }

    /// Load the device records once, and check the other documents.
    ///
    /// Unreadable device records abort startup. A missing firmware
    /// descriptor or next-run document only produces a warning since the
    /// release process may publish them later.
    pub async fn startup_check(&self) -> Result<()> {
        self.records.verify().await?;

        match self.firmware.current_firmware().await {
            Ok(fw) => info!(firmware = ?fw.file_name(), "Firmware descriptor ready"),
            Err(e) => warn!(error = %e, "Firmware descriptor unavailable"),
        }
        match self.schedule.next_run().await {
            Ok(at) => info!(next_run = %at, "Next run scheduled"),
            Err(e) => warn!(error = %e, "Next run document unavailable"),
        }
        Ok(())
    }
}

/// Build the application router.
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/", get(get_index))
        .route("/api/manifolds", get(get_manifold_zones))
        .route(
            "/api/manifolds/{manifold_id}",
            axum::routing::patch(patch_manifold),
        )
        .route("/api/getUpdate", get(get_update))
        .route("/firmware/{filename}", get(get_firmware))
        .route("/api/nextrun", get(get_next_run))
        .route("/api/stats", get(get_stats))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

/// Bind the listener. `listen` is `host:port`; host names are resolved.
pub async fn bind_listener(listen: &str) -> Result<TcpListener> {
    TcpListener::bind(listen)
        .await
        .map_err(|e| RainError::ServerFailed {
            addr: listen.to_string(),
            reason: e.to_string(),
        })
}

/// Bind `listen` and serve until Ctrl-C.
pub async fn run_api_server(state: Arc<ServerState>, listen: &str) -> Result<()> {
    let listener = bind_listener(listen).await?;
    match listener.local_addr() {
        Ok(addr) => info!(%addr, listen = %listen, "API server listening"),
        Err(_) => info!(listen = %listen, "API server listening"),
    }

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}
