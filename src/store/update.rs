//! Validation and application of zone updates.

use serde_json::Value;
use tracing::{debug, warn};

use super::schema::{DeviceRecord, Zone};
use crate::error::{RainError, Result};

/// A validated replacement for a record's `zones`.
#[derive(Debug, Clone, PartialEq)]
pub struct ZonesUpdate {
    pub zones: Vec<Zone>,
}

impl ZonesUpdate {
    #[must_use]
    pub fn new(zones: Vec<Zone>) -> Self {
        Self { zones }
    }

    /// Validate a raw request body.
    ///
    /// The body must be a JSON object whose `zones` member is an array of
    /// objects with non-negative integer `zone` and `duration`. Any other
    /// top-level member is ignored.
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(RainError::InvalidInput("Request body is empty".to_string()));
        }
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| RainError::InvalidInput(format!("Request body is not valid JSON: {e}")))?;
        Self::from_value(value)
    }

    /// Validate an already parsed JSON value.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut body) = value else {
            return Err(RainError::InvalidInput(
                "Expected a JSON object with a \"zones\" array".to_string(),
            ));
        };
        let Some(zones) = body.remove("zones") else {
            return Err(RainError::InvalidInput("Missing \"zones\" array".to_string()));
        };
        let Value::Array(entries) = zones else {
            return Err(RainError::InvalidInput("\"zones\" must be an array".to_string()));
        };

        let zones = entries
            .into_iter()
            .enumerate()
            .map(|(index, entry)| {
                serde_json::from_value::<Zone>(entry)
                    .map_err(|e| RainError::InvalidInput(format!("zones[{index}]: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { zones })
    }
}

/// Replace the `zones` of the record with `id`.
///
/// Only the matched record's `zones` change; every other field and every
/// other record is returned untouched. Applying the same update twice yields
/// the same state. Returns the full collection and a copy of the updated
/// record.
pub fn apply_zones(
    id: &str,
    update: &ZonesUpdate,
    mut records: Vec<DeviceRecord>,
) -> Result<(Vec<DeviceRecord>, DeviceRecord)> {
    let mut positions = records
        .iter()
        .enumerate()
        .filter(|(_, r)| r.id == id)
        .map(|(i, _)| i);

    let Some(index) = positions.next() else {
        return Err(RainError::ManifoldNotFound { id: id.to_string() });
    };
    if positions.next().is_some() {
        warn!(id = %id, "Duplicate manifold id in device records, updating the first");
    }

    let record = &mut records[index];
    record.zones.clone_from(&update.zones);
    debug!(id = %id, zones = record.zones.len(), "Applied zone update");

    let updated = record.clone();
    Ok((records, updated))
}
