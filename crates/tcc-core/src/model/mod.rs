// ── Thermostat domain model ──
//
// Typed views of what the portal reports. Wire types from tcc-api are
// translated once per refresh; everything downstream (poller, commands,
// CLI) works with these.

pub mod ids;
pub mod reading;
pub mod snapshot;

// ── Re-exports ──────────────────────────────────────────────────────

pub use ids::{DeviceId, LocationId};
pub use reading::{
    Capabilities, EquipmentStatus, FanMode, SetpointRange, SystemMode, TemperatureUnit,
    ThermostatReading,
};
pub use snapshot::{DeviceStatus, Snapshot};
