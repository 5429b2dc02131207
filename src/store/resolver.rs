//! MAC address to device record resolution.

use tracing::{debug, warn};

use super::schema::DeviceRecord;
use crate::error::{RainError, Result};

/// Find the record whose `macAddress` equals `mac` exactly.
///
/// Matching is case-sensitive. A missing or empty identifier never matches.
/// When several records share the address the first one in collection order
/// wins and the anomaly is logged.
pub fn resolve<'a>(mac: Option<&str>, records: &'a [DeviceRecord]) -> Result<&'a DeviceRecord> {
    let mac = mac.unwrap_or_default();
    if mac.is_empty() {
        debug!("Request carried no MAC address");
        return Err(RainError::MacNotFound { mac: String::new() });
    }

    let mut matches = records.iter().filter(|r| r.mac_address == mac);
    let Some(first) = matches.next() else {
        return Err(RainError::MacNotFound {
            mac: mac.to_string(),
        });
    };

    let others: Vec<&str> = matches.map(|r| r.id.as_str()).collect();
    if !others.is_empty() {
        warn!(
            mac = %mac,
            chosen = %first.id,
            ignored = ?others,
            "Duplicate MAC address in device records"
        );
    }

    Ok(first)
}

/// Values that occur more than once, in first-seen order.
pub fn duplicates<'a, I>(values: I) -> Vec<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = std::collections::HashSet::new();
    let mut dups: Vec<&str> = Vec::new();
    for value in values {
        if !seen.insert(value) && !dups.contains(&value) {
            dups.push(value);
        }
    }
    dups
}
