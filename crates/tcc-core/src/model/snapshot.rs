// ── Poll snapshot ──

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::ids::DeviceId;
use super::reading::ThermostatReading;

/// Per-device result of a poll cycle.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceStatus {
    pub id: DeviceId,
    pub name: String,
    /// Last known reading; kept when a refresh fails.
    pub reading: Option<Arc<ThermostatReading>>,
    /// Refreshed this cycle and reported live by the portal.
    pub available: bool,
    /// Why the last refresh failed, if it did.
    pub last_error: Option<String>,
}

/// Device states as of one completed poll cycle.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Snapshot {
    pub devices: BTreeMap<DeviceId, DeviceStatus>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    pub fn get(&self, id: DeviceId) -> Option<&DeviceStatus> {
        self.devices.get(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn available_count(&self) -> usize {
        self.devices.values().filter(|d| d.available).count()
    }
}
