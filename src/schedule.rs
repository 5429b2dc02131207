//! Next scheduled irrigation run.
//!
//! Controllers deep-sleep between runs and ask how many seconds remain
//! until the next one. The target datetime lives in a small JSON document:
//!
//! ```json
//! { "datetime": "2026-05-01T06:00:00-07:00" }
//! ```

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RainError, Result};

/// Formats accepted for datetimes without an offset, read as server local time.
const LOCAL_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Contents of the next-run document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextRun {
    pub datetime: String,
}

/// Parse an ISO-8601 datetime.
///
/// - with an offset or `Z`: that exact instant
/// - date and time without offset: server local time
/// - date only: midnight UTC
pub fn parse_datetime(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in LOCAL_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Local
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc));
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Whole seconds from `now` until `target`, rounded toward negative infinity.
pub fn seconds_between(now: DateTime<Utc>, target: DateTime<Utc>) -> i64 {
    (target - now).num_milliseconds().div_euclid(1000)
}

/// Reader for the next-run document.
#[derive(Debug, Clone)]
pub struct NextRunSchedule {
    path: PathBuf,
}

impl NextRunSchedule {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the next scheduled run.
    pub async fn next_run(&self) -> Result<DateTime<Utc>> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| RainError::store("read", &self.path, e))?;
        let doc: NextRun =
            serde_json::from_slice(&bytes).map_err(|e| RainError::corrupt(&self.path, e))?;
        parse_datetime(&doc.datetime).ok_or_else(|| {
            RainError::corrupt(
                &self.path,
                format!("unrecognised datetime {:?}", doc.datetime),
            )
        })
    }

    /// Seconds from `now` until the next run; negative once it has passed.
    pub async fn seconds_until(&self, now: DateTime<Utc>) -> Result<i64> {
        let target = self.next_run().await?;
        let seconds = seconds_between(now, target);
        debug!(%target, seconds, "Computed time until next run");
        Ok(seconds)
    }
}
