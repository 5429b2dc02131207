//! Current firmware descriptor and OTA download gating.
//!
//! The descriptor document names the published firmware image. Downloads
//! are only served for the exact base name of that image, and the path
//! handed to the file server is always the descriptor's own path.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::config::{base_name, document_dir, resolve_path};
use crate::error::{RainError, Result};

/// Contents of the firmware descriptor document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FirmwareDescriptor {
    /// Location of the current firmware binary.
    pub firmware_path: String,
    /// Version metadata passed to clients untouched.
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

impl FirmwareDescriptor {
    /// Base name clients must request.
    pub fn file_name(&self) -> Option<&str> {
        base_name(Path::new(&self.firmware_path))
    }
}

/// Reader for the firmware descriptor, owner of the download counter.
#[derive(Debug)]
pub struct FirmwareCatalog {
    descriptor_path: PathBuf,
    downloads: AtomicU64,
}

impl FirmwareCatalog {
    pub fn new(descriptor_path: impl Into<PathBuf>) -> Self {
        Self {
            descriptor_path: descriptor_path.into(),
            downloads: AtomicU64::new(0),
        }
    }

    /// Location of the descriptor document.
    pub fn descriptor_path(&self) -> &Path {
        &self.descriptor_path
    }

    /// Read the currently published descriptor.
    pub async fn current_firmware(&self) -> Result<FirmwareDescriptor> {
        let path = &self.descriptor_path;
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| RainError::store("read", path, e))?;
        let descriptor: FirmwareDescriptor =
            serde_json::from_slice(&bytes).map_err(|e| RainError::corrupt(path, e))?;
        debug!(firmware_path = %descriptor.firmware_path, "Read firmware descriptor");
        Ok(descriptor)
    }

    /// Map a requested file name to the firmware image on disk.
    ///
    /// Succeeds only when `requested` equals the base name of the
    /// descriptor's `firmware_path`. Relative firmware paths are resolved
    /// against the descriptor's directory.
    pub async fn resolve_download(&self, requested: &str) -> Result<PathBuf> {
        let descriptor = self.current_firmware().await?;
        match descriptor.file_name() {
            Some(name) if !requested.is_empty() && name == requested => {
                let base = document_dir(&self.descriptor_path);
                resolve_path(Path::new(&descriptor.firmware_path), base)
            }
            current => {
                info!(requested = %requested, current = ?current, "Firmware download refused");
                Err(RainError::FirmwareNotFound {
                    filename: requested.to_string(),
                })
            }
        }
    }

    /// Count a completed download; returns the new total.
    pub fn record_download(&self) -> u64 {
        self.downloads.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Downloads served since the process started.
    pub fn downloads(&self) -> u64 {
        self.downloads.load(Ordering::Relaxed)
    }
}
