//! Device configuration store.
//!
//! Resolves a controller's MAC address to its configuration record and
//! applies zone updates to the persisted collection.
//!
//! # Document Format
//!
//! ```json
//! [
//!   {
//!     "id": "M1",
//!     "macAddress": "AA:BB:CC:DD:EE:FF",
//!     "zones": [
//!       { "zone": 1, "duration": 300 },
//!       { "zone": 2, "duration": 120 }
//!     ]
//!   }
//! ]
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use rainmaker::store::{RecordStore, ZonesUpdate};
//!
//! let store = RecordStore::new("manifolds.json");
//! let record = store.find_by_mac(Some("AA:BB:CC:DD:EE:FF")).await?;
//!
//! let update = ZonesUpdate::from_slice(br#"{"zones":[{"zone":1,"duration":600}]}"#)?;
//! store.update_zones(&record.id, &update).await?;
//! ```

mod json;
mod resolver;
mod schema;
mod update;

pub use json::{RecordStore, StoreReport};
pub use resolver::{duplicates, resolve};
pub use schema::{DeviceRecord, Zone};
pub use update::{ZonesUpdate, apply_zones};
