//! Configuration module for the Rainmaker server.
//!
//! Handles the TOML settings file, command-line overrides and the
//! resolution of persisted document locations.

mod path;
mod settings;

pub use path::{base_name, document_dir, home_dir, resolve_path};
pub use settings::{
    DEFAULT_CONFIG_FILE, DocumentPaths, LoggingSettings, Overrides, ResolvedPaths, Settings,
};
