//! Device record types for the manifold configuration document.
//!
//! Unknown keys are carried through `extra` so a read-modify-write cycle
//! never drops data written by the provisioning tooling.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Configuration record of one manifold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    /// Stable manifold identifier.
    pub id: String,
    /// Hardware address the controller identifies itself with.
    #[serde(rename = "macAddress")]
    pub mac_address: String,
    /// Zones in physical order.
    pub zones: Vec<Zone>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DeviceRecord {
    /// Create a record with no extra fields.
    #[must_use]
    pub fn new(id: impl Into<String>, mac_address: impl Into<String>, zones: Vec<Zone>) -> Self {
        Self {
            id: id.into(),
            mac_address: mac_address.into(),
            zones,
            extra: Map::new(),
        }
    }

    /// Total irrigation time across all zones, in seconds.
    pub fn total_duration(&self) -> u64 {
        self.zones.iter().map(|z| z.duration).sum()
    }
}

/// One irrigation zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    /// Zone index.
    pub zone: u32,
    /// Run duration in seconds.
    pub duration: u64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Zone {
    #[must_use]
    pub fn new(zone: u32, duration: u64) -> Self {
        Self {
            zone,
            duration,
            extra: Map::new(),
        }
    }
}
