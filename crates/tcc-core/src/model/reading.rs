// ── Thermostat reading ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use tcc_api::models::{ControlChanges, LatestData, ThermostatData};

/// Setpoint limits the portal falls back to when a device omits them.
const DEFAULT_SETPOINT_MIN: f64 = 50.0;
const DEFAULT_SETPOINT_MAX: f64 = 90.0;

// ── Enums ────────────────────────────────────────────────────────────

/// Thermostat system switch.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SystemMode {
    #[serde(rename = "emheat")]
    #[strum(to_string = "emheat", serialize = "emergency-heat")]
    EmergencyHeat,
    Heat,
    Off,
    Cool,
    Auto,
}

impl SystemMode {
    /// Decode `SystemSwitchPosition`. Positions 4 and 5 are both auto.
    pub fn from_position(position: u8) -> Option<Self> {
        match position {
            0 => Some(Self::EmergencyHeat),
            1 => Some(Self::Heat),
            2 => Some(Self::Off),
            3 => Some(Self::Cool),
            4 | 5 => Some(Self::Auto),
            _ => None,
        }
    }

    /// Value for `SystemSwitch` in a control change.
    pub fn position(self) -> u8 {
        match self {
            Self::EmergencyHeat => 0,
            Self::Heat => 1,
            Self::Off => 2,
            Self::Cool => 3,
            Self::Auto => 4,
        }
    }
}

/// Fan switch.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum FanMode {
    Auto,
    On,
    Circulate,
    #[strum(
        to_string = "follow schedule",
        serialize = "follow-schedule",
        serialize = "schedule"
    )]
    FollowSchedule,
}

impl FanMode {
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Self::Auto),
            1 => Some(Self::On),
            2 => Some(Self::Circulate),
            3 => Some(Self::FollowSchedule),
            _ => None,
        }
    }

    /// Value for `FanMode` in a control change.
    pub fn index(self) -> u8 {
        match self {
            Self::Auto => 0,
            Self::On => 1,
            Self::Circulate => 2,
            Self::FollowSchedule => 3,
        }
    }
}

/// What the HVAC equipment is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EquipmentStatus {
    #[default]
    Off,
    Fan,
    Heat,
    Cool,
}

impl EquipmentStatus {
    /// `EquipmentOutputStatus` 0 means idle, which reads as "fan" while the
    /// blower runs.
    pub fn from_output(status: Option<u8>, fan_running: bool) -> Self {
        match status {
            Some(1) => Self::Heat,
            Some(2) => Self::Cool,
            _ if fan_running => Self::Fan,
            _ => Self::Off,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TemperatureUnit {
    #[default]
    Fahrenheit,
    Celsius,
}

impl TemperatureUnit {
    fn from_display_units(units: Option<&str>) -> Self {
        match units {
            Some(u) if u.eq_ignore_ascii_case("C") => Self::Celsius,
            _ => Self::Fahrenheit,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Fahrenheit => "°F",
            Self::Celsius => "°C",
        }
    }
}

// ── Capabilities and limits ──────────────────────────────────────────

/// Inclusive setpoint limits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SetpointRange {
    pub min: f64,
    pub max: f64,
}

impl SetpointRange {
    fn from_limits(min: Option<f64>, max: Option<f64>) -> Self {
        Self {
            min: min.unwrap_or(DEFAULT_SETPOINT_MIN),
            max: max.unwrap_or(DEFAULT_SETPOINT_MAX),
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

impl Default for SetpointRange {
    fn default() -> Self {
        Self::from_limits(None, None)
    }
}

/// What a thermostat lets you switch to.
///
/// Built from the `Switch*Allowed` / `fanMode*Allowed` flags. A missing flag
/// means "not allowed", except `off`, which every thermostat supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct Capabilities {
    pub heat: bool,
    pub cool: bool,
    pub auto: bool,
    pub off: bool,
    pub emergency_heat: bool,
    pub has_fan: bool,
    pub fan_auto: bool,
    pub fan_on: bool,
    pub fan_circulate: bool,
    pub fan_follow_schedule: bool,
    pub humidification: bool,
}

impl Capabilities {
    fn from_latest(latest: &LatestData) -> Self {
        let ui = &latest.ui_data;
        let fan = latest.fan_data.clone().unwrap_or_default();
        Self {
            heat: ui.switch_heat_allowed.unwrap_or(false),
            cool: ui.switch_cool_allowed.unwrap_or(false),
            auto: ui.switch_auto_allowed.unwrap_or(false),
            off: ui.switch_off_allowed.unwrap_or(true),
            emergency_heat: ui.switch_emergency_heat_allowed.unwrap_or(false),
            has_fan: latest.has_fan,
            fan_auto: fan.fan_mode_auto_allowed.unwrap_or(false),
            fan_on: fan.fan_mode_on_allowed.unwrap_or(false),
            fan_circulate: fan.fan_mode_circulate_allowed.unwrap_or(false),
            fan_follow_schedule: fan.fan_mode_follow_schedule_allowed.unwrap_or(false),
            humidification: latest.can_control_humidification,
        }
    }

    pub fn supports_mode(&self, mode: SystemMode) -> bool {
        match mode {
            SystemMode::EmergencyHeat => self.emergency_heat,
            SystemMode::Heat => self.heat,
            SystemMode::Off => self.off,
            SystemMode::Cool => self.cool,
            SystemMode::Auto => self.auto,
        }
    }

    pub fn supports_fan_mode(&self, mode: FanMode) -> bool {
        match mode {
            FanMode::Auto => self.fan_auto,
            FanMode::On => self.fan_on,
            FanMode::Circulate => self.fan_circulate,
            FanMode::FollowSchedule => self.fan_follow_schedule,
        }
    }

    pub fn system_modes(&self) -> Vec<SystemMode> {
        SystemMode::iter().filter(|m| self.supports_mode(*m)).collect()
    }

    pub fn fan_modes(&self) -> Vec<FanMode> {
        FanMode::iter().filter(|m| self.supports_fan_mode(*m)).collect()
    }
}

// ── Reading ──────────────────────────────────────────────────────────

/// One refresh worth of thermostat state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThermostatReading {
    /// `deviceLive && !communicationLost`.
    pub is_alive: bool,
    pub current_temperature: Option<f64>,
    pub current_humidity: Option<f64>,
    pub outdoor_temperature: Option<f64>,
    pub outdoor_humidity: Option<f64>,
    pub setpoint_heat: Option<f64>,
    pub setpoint_cool: Option<f64>,
    pub system_mode: Option<SystemMode>,
    pub fan_mode: Option<FanMode>,
    pub fan_running: bool,
    pub equipment_status: EquipmentStatus,
    pub unit: TemperatureUnit,
    pub heat_range: SetpointRange,
    pub cool_range: SetpointRange,
    pub capabilities: Capabilities,
    pub fetched_at: DateTime<Utc>,
}

impl ThermostatReading {
    pub fn from_data(data: &ThermostatData, fetched_at: DateTime<Utc>) -> Self {
        let latest = data.latest_data.clone().unwrap_or_default();
        let ui = &latest.ui_data;
        let fan = latest.fan_data.clone().unwrap_or_default();
        let fan_running = fan.fan_is_running.unwrap_or(false);

        Self {
            is_alive: data.is_alive(),
            current_temperature: ui.disp_temperature,
            current_humidity: ui
                .indoor_humidity
                .filter(|_| ui.indoor_humidity_sensor_available != Some(false)),
            outdoor_temperature: ui
                .outdoor_temperature
                .filter(|_| ui.outdoor_temperature_available == Some(true)),
            outdoor_humidity: ui
                .outdoor_humidity
                .filter(|_| ui.outdoor_humidity_available == Some(true)),
            setpoint_heat: ui.heat_setpoint,
            setpoint_cool: ui.cool_setpoint,
            system_mode: ui.system_switch_position.and_then(SystemMode::from_position),
            fan_mode: fan.fan_mode.and_then(FanMode::from_index),
            fan_running,
            equipment_status: EquipmentStatus::from_output(ui.equipment_output_status, fan_running),
            unit: TemperatureUnit::from_display_units(ui.display_units.as_deref()),
            heat_range: SetpointRange::from_limits(ui.heat_lower_setpt_limit, ui.heat_upper_setpt_limit),
            cool_range: SetpointRange::from_limits(ui.cool_lower_setpt_limit, ui.cool_upper_setpt_limit),
            capabilities: Capabilities::from_latest(&latest),
            fetched_at,
        }
    }

    /// The single setpoint that matters in the current mode: cool in cool
    /// mode, heat in heat/auto/emergency heat, none when off.
    pub fn target_temperature(&self) -> Option<f64> {
        match self.system_mode? {
            SystemMode::Cool => self.setpoint_cool,
            SystemMode::Heat | SystemMode::Auto | SystemMode::EmergencyHeat => self.setpoint_heat,
            SystemMode::Off => None,
        }
    }

    /// Limits for [`target_temperature`](Self::target_temperature).
    pub fn active_range(&self) -> SetpointRange {
        if self.system_mode == Some(SystemMode::Cool) {
            self.cool_range
        } else {
            self.heat_range
        }
    }

    /// Fold an accepted control change into the cached reading.
    pub(crate) fn apply(&mut self, changes: &ControlChanges) {
        if let Some(position) = changes.system_switch {
            self.system_mode = SystemMode::from_position(position);
        }
        if let Some(setpoint) = changes.heat_setpoint {
            self.setpoint_heat = Some(setpoint);
        }
        if let Some(setpoint) = changes.cool_setpoint {
            self.setpoint_cool = Some(setpoint);
        }
        if let Some(index) = changes.fan_mode {
            self.fan_mode = FanMode::from_index(index);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn reading(raw: serde_json::Value) -> ThermostatReading {
        let data: ThermostatData = serde_json::from_value(raw).unwrap();
        ThermostatReading::from_data(&data, Utc::now())
    }

    #[test]
    fn full_payload_is_typed() {
        let r = reading(json!({
            "success": true,
            "deviceLive": true,
            "communicationLost": false,
            "latestData": {
                "uiData": {
                    "DispTemperature": 21.5,
                    "DisplayUnits": "C",
                    "HeatSetpoint": 20.0,
                    "CoolSetpoint": 25.0,
                    "HeatLowerSetptLimit": 4.5,
                    "HeatUpperSetptLimit": 32.0,
                    "SystemSwitchPosition": 3,
                    "EquipmentOutputStatus": 2,
                    "IndoorHumidity": 45.0,
                    "OutdoorTemperature": 128.0,
                    "OutdoorTemperatureAvailable": false,
                    "SwitchHeatAllowed": true,
                    "SwitchCoolAllowed": true,
                    "SwitchAutoAllowed": false
                },
                "fanData": {"fanMode": 2, "fanIsRunning": true, "fanModeAutoAllowed": true, "fanModeCirculateAllowed": true},
                "hasFan": true
            }
        }));

        assert!(r.is_alive);
        assert_eq!(r.unit, TemperatureUnit::Celsius);
        assert_eq!(r.system_mode, Some(SystemMode::Cool));
        assert_eq!(r.fan_mode, Some(FanMode::Circulate));
        assert_eq!(r.equipment_status, EquipmentStatus::Cool);
        assert_eq!(r.current_humidity, Some(45.0));
        assert_eq!(r.outdoor_temperature, None);
        assert_eq!(r.target_temperature(), Some(25.0));
        assert_eq!(r.heat_range, SetpointRange { min: 4.5, max: 32.0 });
        assert_eq!(r.cool_range, SetpointRange::default());
        assert_eq!(
            r.capabilities.system_modes(),
            vec![SystemMode::Heat, SystemMode::Off, SystemMode::Cool]
        );
        assert_eq!(r.capabilities.fan_modes(), vec![FanMode::Auto, FanMode::Circulate]);
    }

    #[test]
    fn empty_payload_uses_defaults() {
        let r = reading(json!({"success": true}));
        assert!(!r.is_alive);
        assert_eq!(r.system_mode, None);
        assert_eq!(r.target_temperature(), None);
        assert_eq!(r.active_range(), SetpointRange { min: 50.0, max: 90.0 });
        assert!(r.capabilities.off);
        assert!(!r.capabilities.heat);
    }

    #[test]
    fn idle_equipment_reads_as_fan_when_blower_runs() {
        assert_eq!(EquipmentStatus::from_output(Some(0), true), EquipmentStatus::Fan);
        assert_eq!(EquipmentStatus::from_output(Some(0), false), EquipmentStatus::Off);
        assert_eq!(EquipmentStatus::from_output(Some(1), true), EquipmentStatus::Heat);
    }

    #[test]
    fn modes_round_trip_their_wire_positions() {
        for mode in SystemMode::iter() {
            assert_eq!(SystemMode::from_position(mode.position()), Some(mode));
        }
        assert_eq!(SystemMode::from_position(5), Some(SystemMode::Auto));
        assert_eq!(SystemMode::from_position(9), None);
        for mode in FanMode::iter() {
            assert_eq!(FanMode::from_index(mode.index()), Some(mode));
        }
    }

    #[test]
    fn modes_parse_from_user_input() {
        assert_eq!("EMHEAT".parse::<SystemMode>().unwrap(), SystemMode::EmergencyHeat);
        assert_eq!("cool".parse::<SystemMode>().unwrap(), SystemMode::Cool);
        assert_eq!("follow-schedule".parse::<FanMode>().unwrap(), FanMode::FollowSchedule);
        assert_eq!(FanMode::FollowSchedule.to_string(), "follow schedule");
        assert_eq!(SystemMode::EmergencyHeat.to_string(), "emheat");
        assert!("turbo".parse::<SystemMode>().is_err());
    }

    #[test]
    fn apply_updates_cached_state() {
        let mut r = reading(json!({"success": true, "latestData": {"uiData": {"SystemSwitchPosition": 1}}}));
        let mut changes = ControlChanges::new(1);
        changes.heat_setpoint = Some(70.0);
        changes.system_switch = Some(SystemMode::Auto.position());
        r.apply(&changes);
        assert_eq!(r.setpoint_heat, Some(70.0));
        assert_eq!(r.system_mode, Some(SystemMode::Auto));
    }
}
