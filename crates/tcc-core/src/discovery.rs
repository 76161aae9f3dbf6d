// ── Device discovery ──

use std::sync::Arc;

use tracing::{info, warn};

use tcc_api::ComfortClient;

use crate::device::Thermostat;
use crate::error::CoreError;
use crate::model::LocationId;

/// A location on the account and the thermostats registered there.
#[derive(Debug)]
pub struct Location {
    pub id: LocationId,
    pub name: Option<String>,
    pub devices: Vec<Arc<Thermostat>>,
}

/// List every location and give each device an initial refresh.
///
/// A device whose first refresh fails is still registered (it shows up as
/// unavailable until a cycle reaches it), unless the failure concerns the
/// session itself, which is returned.
pub async fn discover(client: &Arc<ComfortClient>) -> Result<Vec<Location>, CoreError> {
    client.ensure_authenticated().await?;
    let entries = client.list_locations().await?;

    let mut locations = Vec::with_capacity(entries.len());
    for entry in entries {
        let location_id = LocationId::new(entry.location_id);
        let mut devices = Vec::with_capacity(entry.devices.len());

        for device_entry in &entry.devices {
            let device = Arc::new(Thermostat::new(Arc::clone(client), location_id, device_entry));
            match device.refresh().await {
                Ok(()) => {}
                Err(e) if e.is_session_error() => return Err(e.into()),
                Err(e) => warn!(device = %device.id(), error = %e, "initial refresh failed"),
            }
            devices.push(device);
        }

        info!(location = %location_id, devices = devices.len(), "discovered location");
        locations.push(Location {
            id: location_id,
            name: entry.name,
            devices,
        });
    }

    Ok(locations)
}
