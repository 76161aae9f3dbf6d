// tcc-core: Thermostat model, polling orchestrator and commands on top of tcc-api.

pub mod command;
pub mod config;
pub mod controller;
pub mod device;
pub mod discovery;
pub mod error;
pub mod model;
pub mod poller;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::Command;
pub use config::{AccountConfig, CommandConfig, PollerConfig};
pub use controller::Controller;
pub use device::Thermostat;
pub use discovery::{Location, discover};
pub use error::CoreError;
pub use poller::{PollPhase, PollStatus, Poller};

pub use model::{
    Capabilities, DeviceId, DeviceStatus, EquipmentStatus, FanMode, LocationId, SetpointRange,
    Snapshot, SystemMode, TemperatureUnit, ThermostatReading,
};
