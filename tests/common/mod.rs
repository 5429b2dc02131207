//! Common test utilities for the Rainmaker server.
//!
//! - `fixtures`: Temporary data directories with the three persisted documents
//! - `http`: In-process request helpers for the axum router
#![allow(dead_code)]


use tracing_subscriber::EnvFilter;

pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
