// ── Thermostat handle ──
//
// One registered device. Holds the last reading in an `ArcSwapOption` so
// the poller, command paths and CLI can read it without locking while a
// refresh or command swaps in a new one.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use chrono::Utc;
use tracing::{debug, info};

use tcc_api::ComfortClient;
use tcc_api::models::{ControlChanges, DeviceEntry};

use crate::error::CoreError;
use crate::model::{DeviceId, FanMode, LocationId, SetpointRange, SystemMode, ThermostatReading};

/// `StatusHeat` / `StatusCool` value for a temporary hold, which is what
/// the portal's own UI sends with a setpoint change.
const HOLD_TEMPORARY: u8 = 1;

/// A thermostat registered on the account.
pub struct Thermostat {
    id: DeviceId,
    name: String,
    mac_id: Option<String>,
    location: LocationId,
    client: Arc<ComfortClient>,
    reading: ArcSwapOption<ThermostatReading>,
}

impl Thermostat {
    pub fn new(client: Arc<ComfortClient>, location: LocationId, entry: &DeviceEntry) -> Self {
        let id = DeviceId::new(entry.device_id);
        Self {
            id,
            name: entry.name.clone().unwrap_or_else(|| format!("Thermostat {id}")),
            mac_id: entry.mac_id.clone(),
            location,
            client,
            reading: ArcSwapOption::empty(),
        }
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn id(&self) -> DeviceId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mac_id(&self) -> Option<&str> {
        self.mac_id.as_deref()
    }

    pub fn location_id(&self) -> LocationId {
        self.location
    }

    /// Last known reading, if the device was ever refreshed.
    pub fn reading(&self) -> Option<Arc<ThermostatReading>> {
        self.reading.load_full()
    }

    pub fn is_alive(&self) -> bool {
        self.reading().is_some_and(|r| r.is_alive)
    }

    // ── Refresh ──────────────────────────────────────────────────────

    /// Pull live data. On failure the previous reading is left in place.
    pub async fn refresh(&self) -> Result<(), tcc_api::Error> {
        let data = self.client.thermostat_data(self.id.get()).await?;
        let reading = ThermostatReading::from_data(&data, Utc::now());
        debug!(
            device = %self.id,
            temperature = ?reading.current_temperature,
            mode = ?reading.system_mode,
            alive = reading.is_alive,
            "refreshed"
        );
        self.reading.store(Some(Arc::new(reading)));
        Ok(())
    }

    // ── Control ──────────────────────────────────────────────────────

    /// Set the heat setpoint (temporary hold).
    pub async fn set_setpoint_heat(&self, temperature: f64) -> Result<(), CoreError> {
        let reading = self.current_reading().await?;
        check_range("heat setpoint", temperature, reading.heat_range)?;

        let mut changes = ControlChanges::new(self.id.get());
        changes.heat_setpoint = Some(temperature);
        changes.status_heat = Some(HOLD_TEMPORARY);
        changes.status_cool = Some(HOLD_TEMPORARY);
        self.submit(changes).await
    }

    /// Set the cool setpoint (temporary hold).
    pub async fn set_setpoint_cool(&self, temperature: f64) -> Result<(), CoreError> {
        let reading = self.current_reading().await?;
        check_range("cool setpoint", temperature, reading.cool_range)?;

        let mut changes = ControlChanges::new(self.id.get());
        changes.cool_setpoint = Some(temperature);
        changes.status_heat = Some(HOLD_TEMPORARY);
        changes.status_cool = Some(HOLD_TEMPORARY);
        self.submit(changes).await
    }

    pub async fn set_system_mode(&self, mode: SystemMode) -> Result<(), CoreError> {
        let reading = self.current_reading().await?;
        if !reading.capabilities.supports_mode(mode) {
            return Err(self.unsupported(format!("system mode '{mode}'")));
        }

        let mut changes = ControlChanges::new(self.id.get());
        changes.system_switch = Some(mode.position());
        self.submit(changes).await
    }

    pub async fn set_fan_mode(&self, mode: FanMode) -> Result<(), CoreError> {
        let reading = self.current_reading().await?;
        if !reading.capabilities.supports_fan_mode(mode) {
            return Err(self.unsupported(format!("fan mode '{mode}'")));
        }

        let mut changes = ControlChanges::new(self.id.get());
        changes.fan_mode = Some(mode.index());
        self.submit(changes).await
    }

    /// The cached reading, refreshing first if there is none yet.
    async fn current_reading(&self) -> Result<Arc<ThermostatReading>, CoreError> {
        if let Some(reading) = self.reading() {
            return Ok(reading);
        }
        self.refresh().await?;
        self.reading().ok_or_else(|| CoreError::DeviceNotFound {
            identifier: self.id.to_string(),
        })
    }

    async fn submit(&self, changes: ControlChanges) -> Result<(), CoreError> {
        self.client.submit_control_changes(&changes).await?;
        info!(device = %self.id, "control change accepted");

        // Optimistic: reflect the accepted change until the next refresh.
        self.reading.rcu(|current| {
            current.as_ref().map(|r| {
                let mut next = ThermostatReading::clone(r);
                next.apply(&changes);
                Arc::new(next)
            })
        });
        Ok(())
    }

    fn unsupported(&self, operation: String) -> CoreError {
        CoreError::Unsupported {
            operation,
            device: format!("{} ({})", self.name, self.id),
        }
    }
}

fn check_range(setting: &str, value: f64, range: SetpointRange) -> Result<(), CoreError> {
    if range.contains(value) {
        return Ok(());
    }
    Err(CoreError::OutOfRange {
        setting: setting.to_owned(),
        value,
        min: range.min,
        max: range.max,
    })
}

impl std::fmt::Debug for Thermostat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Thermostat")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}
