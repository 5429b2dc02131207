//! Server settings loaded from a TOML file with CLI/environment overrides.
//!
//! # Example
//!
//! ```toml
//! bind = "0.0.0.0"
//! port = 3000
//! data_dir = "/var/lib/rainmaker"
//!
//! [documents]
//! manifolds = "manifolds.json"
//! firmware = "currentVersion.json"
//! next_run = "nextRun.json"
//!
//! [logging]
//! access_log = "logs.txt"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use super::path::{document_dir, resolve_path};
use crate::error::{RainError, Result};

/// Settings file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "rainmaker.toml";

/// Top-level server settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Address to bind the HTTP listener to: an IP literal or a host name.
    pub bind: String,
    /// TCP port to listen on.
    pub port: u16,
    /// Directory holding the persisted documents.
    pub data_dir: PathBuf,
    /// Document file names, relative to `data_dir`.
    pub documents: DocumentPaths,
    /// Log output settings.
    pub logging: LoggingSettings,

    /// Directory that a relative `data_dir` is resolved against.
    #[serde(skip)]
    base_dir: PathBuf,
}

/// Locations of the persisted JSON documents.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DocumentPaths {
    /// Array of device records.
    pub manifolds: PathBuf,
    /// Current firmware descriptor.
    pub firmware: PathBuf,
    /// Next scheduled run.
    pub next_run: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSettings {
    /// Append-only request log, relative to `data_dir`.
    pub access_log: Option<PathBuf>,
}

/// Values supplied on the command line or through the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub bind: Option<String>,
    pub port: Option<u16>,
    pub data_dir: Option<PathBuf>,
}

/// Fully resolved document locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    pub manifolds: PathBuf,
    pub firmware: PathBuf,
    pub next_run: PathBuf,
    pub access_log: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 3000,
            data_dir: PathBuf::from("."),
            documents: DocumentPaths::default(),
            logging: LoggingSettings::default(),
            base_dir: PathBuf::from("."),
        }
    }
}

impl Default for DocumentPaths {
    fn default() -> Self {
        Self {
            manifolds: PathBuf::from("manifolds.json"),
            firmware: PathBuf::from("currentVersion.json"),
            next_run: PathBuf::from("nextRun.json"),
        }
    }
}

impl Settings {
    /// Parse settings from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| RainError::ConfigParse(e.to_string()))
    }

    /// Load settings from `path`.
    ///
    /// Relative paths inside the file are resolved against the file's directory.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => RainError::ConfigNotFound {
                path: path.display().to_string(),
            },
            _ => RainError::store("read", path, e),
        })?;

        let mut settings: Self = toml::from_str(&text)
            .map_err(|e| RainError::ConfigParse(format!("{}: {e}", path.display())))?;
        settings.base_dir = document_dir(path).to_path_buf();
        info!(path = %path.display(), "Loaded settings file");
        Ok(settings)
    }

    /// Load from an explicit path, or from [`DEFAULT_CONFIG_FILE`] if it exists,
    /// or fall back to defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        let implicit = Path::new(DEFAULT_CONFIG_FILE);
        if implicit.is_file() {
            return Self::from_file(implicit);
        }
        debug!("No settings file, using defaults");
        Ok(Self::default())
    }

    /// Apply command-line and environment overrides.
    ///
    /// A `data_dir` given on the command line is relative to the working
    /// directory, not to the settings file.
    pub fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(bind) = &overrides.bind {
            self.bind.clone_from(bind);
        }
        if let Some(port) = overrides.port {
            self.port = port;
        }
        if let Some(data_dir) = &overrides.data_dir {
            self.data_dir.clone_from(data_dir);
            self.base_dir = PathBuf::from(".");
        }
    }

    /// `bind:port` string for the listener.
    pub fn listen_addr(&self) -> String {
        if self.bind.contains(':') && !self.bind.starts_with('[') {
            // bare IPv6 literal
            format!("[{}]:{}", self.bind, self.port)
        } else {
            format!("{}:{}", self.bind, self.port)
        }
    }

    /// Resolve every document path to its final location.
    pub fn resolve_paths(&self) -> Result<ResolvedPaths> {
        let data_dir = resolve_path(&self.data_dir, &self.base_dir)?;
        let access_log = self
            .logging
            .access_log
            .as_deref()
            .map(|p| resolve_path(p, &data_dir))
            .transpose()?;

        Ok(ResolvedPaths {
            manifolds: resolve_path(&self.documents.manifolds, &data_dir)?,
            firmware: resolve_path(&self.documents.firmware, &data_dir)?,
            next_run: resolve_path(&self.documents.next_run, &data_dir)?,
            access_log,
        })
    }
}
