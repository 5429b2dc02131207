//! Rainmaker - configuration and OTA firmware server for irrigation controllers.
//!
//! This library exposes the core functionality of the `rainmaker` binary for
//! use in tests and embedding.
//!
//! # Modules
//!
//! - `store`: Device records, MAC resolution and zone updates
//! - `firmware`: Firmware descriptor and download gating
//! - `schedule`: Next scheduled run
//! - `server`: HTTP API
//! - `config`: Settings file and document paths
//! - `error`: Error types with user-recoverable hints
//! - `logging`: Tracing subscriber setup
#![forbid(unsafe_code)]

pub mod cli;
pub mod config;
pub mod error;
pub mod firmware;
pub mod logging;
pub mod schedule;
pub mod server;
pub mod store;
