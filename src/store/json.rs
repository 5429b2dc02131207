//! JSON document backed record store.
//!
//! The whole collection is read on every lookup and rewritten on every
//! update. Writes go to a temporary file in the same directory that is then
//! renamed over the document, so readers see either the old or the new
//! collection and never a truncated one.

use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::resolver::{duplicates, resolve};
use super::schema::DeviceRecord;
use super::update::{ZonesUpdate, apply_zones};
use crate::error::{RainError, Result};

/// Device records persisted as a single JSON array.
#[derive(Debug)]
pub struct RecordStore {
    path: PathBuf,
    /// Serializes load-apply-save sequences.
    writer: Mutex<()>,
}

/// Integrity report for a loaded collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct StoreReport {
    pub records: usize,
    pub zones: usize,
    pub duplicate_ids: Vec<String>,
    pub duplicate_macs: Vec<String>,
}

impl StoreReport {
    /// Build a report for `records`.
    pub fn for_records(records: &[DeviceRecord]) -> Self {
        Self {
            records: records.len(),
            zones: records.iter().map(|r| r.zones.len()).sum(),
            duplicate_ids: owned(duplicates(records.iter().map(|r| r.id.as_str()))),
            duplicate_macs: owned(duplicates(records.iter().map(|r| r.mac_address.as_str()))),
        }
    }

    /// True when ids and MAC addresses are unique.
    pub fn is_consistent(&self) -> bool {
        self.duplicate_ids.is_empty() && self.duplicate_macs.is_empty()
    }
}

impl RecordStore {
    /// Create a store for the document at `path`. Nothing is read yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: Mutex::new(()),
        }
    }

    /// Location of the backing document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the collection once and report integrity problems.
    ///
    /// Used at startup: an unreadable or unparseable document is an error,
    /// duplicate ids or MAC addresses are logged as warnings.
    #[instrument(skip_all, fields(path = %self.path.display()))]
    pub async fn verify(&self) -> Result<StoreReport> {
        let records = self.load_all().await?;
        let report = StoreReport::for_records(&records);
        if !report.duplicate_ids.is_empty() {
            warn!(ids = ?report.duplicate_ids, "Device records contain duplicate ids");
        }
        if !report.duplicate_macs.is_empty() {
            warn!(macs = ?report.duplicate_macs, "Device records contain duplicate MAC addresses");
        }
        info!(
            records = report.records,
            zones = report.zones,
            "Device records loaded"
        );
        Ok(report)
    }

    /// Read and parse the full collection.
    pub async fn load_all(&self) -> Result<Vec<DeviceRecord>> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| RainError::store("read", &self.path, e))?;
        let records: Vec<DeviceRecord> =
            serde_json::from_slice(&bytes).map_err(|e| RainError::corrupt(&self.path, e))?;
        debug!(path = %self.path.display(), records = records.len(), "Loaded device records");
        Ok(records)
    }

    /// Replace the persisted collection with `records`.
    ///
    /// Callers that read before writing must hold the writer lock; use
    /// [`RecordStore::update_zones`] for updates.
    pub async fn save_all(&self, records: &[DeviceRecord]) -> Result<()> {
        let mut payload = serde_json::to_vec_pretty(records)
            .map_err(|e| RainError::Other(format!("Failed to encode device records: {e}")))?;
        payload.push(b'\n');

        let temp = TempFile::new(self.temp_path());
        write_synced(temp.path(), &payload)
            .await
            .map_err(|e| RainError::store("write", temp.path(), e))?;
        tokio::fs::rename(temp.path(), &self.path)
            .await
            .map_err(|e| RainError::store("replace", &self.path, e))?;
        temp.keep();

        debug!(path = %self.path.display(), records = records.len(), "Saved device records");
        Ok(())
    }

    /// Find the record for a device MAC address.
    pub async fn find_by_mac(&self, mac: Option<&str>) -> Result<DeviceRecord> {
        let records = self.load_all().await?;
        resolve(mac, &records).cloned()
    }

    /// Replace the zones of manifold `id` and persist the collection.
    #[instrument(skip_all, fields(id = %id))]
    pub async fn update_zones(&self, id: &str, update: &ZonesUpdate) -> Result<DeviceRecord> {
        let _guard = self.writer.lock().await;
        let records = self.load_all().await?;
        let (records, updated) = apply_zones(id, update, records)?;
        self.save_all(&records).await?;
        info!(id = %id, zones = updated.zones.len(), "Manifold data updated");
        Ok(updated)
    }

    /// Sibling path used for the in-progress write.
    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map_or_else(|| "records".into(), |n| n.to_string_lossy().into_owned());
        self.path
            .with_file_name(format!(".{name}.{}.tmp", Uuid::new_v4().simple()))
    }
}

fn owned(values: Vec<&str>) -> Vec<String> {
    values.into_iter().map(str::to_string).collect()
}

/// Removes the in-progress file unless [`TempFile::keep`] is called.
///
/// Also covers a save whose future is dropped mid-write.
struct TempFile {
    path: PathBuf,
    armed: bool,
}

impl TempFile {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    /// The file was renamed into place; nothing left to clean up.
    fn keep(mut self) {
        self.armed = false;
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        if self.armed && std::fs::remove_file(&self.path).is_ok() {
            debug!(path = %self.path.display(), "Removed abandoned temporary file");
        }
    }
}

async fn write_synced(path: &Path, payload: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(payload).await?;
    file.sync_all().await
}
