// Portal wire types
//
// The portal speaks ASP.NET MVC JSON: PascalCase for the location list and
// the `uiData` block, camelCase for everything else. Almost every field is
// optional in practice, so readings use `Option` and the typed layer in
// tcc-core supplies defaults.

use serde::{Deserialize, Deserializer, Serialize};

// ── Locations ────────────────────────────────────────────────────────

/// One location from `GetLocationListData`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LocationEntry {
    #[serde(rename = "LocationID")]
    pub location_id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub devices: Vec<DeviceEntry>,
}

/// A device as listed under its location.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeviceEntry {
    #[serde(rename = "DeviceID")]
    pub device_id: i64,
    #[serde(rename = "MacID", default)]
    pub mac_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

// ── Thermostat data ──────────────────────────────────────────────────

/// Response of `CheckDataSession/{id}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThermostatData {
    #[serde(deserialize_with = "lenient_bool")]
    pub success: bool,
    #[serde(default)]
    pub device_live: bool,
    #[serde(default)]
    pub communication_lost: bool,
    #[serde(default)]
    pub latest_data: Option<LatestData>,
}

impl ThermostatData {
    /// The portal's own liveness rule.
    pub fn is_alive(&self) -> bool {
        self.device_live && !self.communication_lost
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestData {
    #[serde(default)]
    pub ui_data: UiData,
    #[serde(default)]
    pub fan_data: Option<FanData>,
    #[serde(default)]
    pub has_fan: bool,
    #[serde(default)]
    pub can_control_humidification: bool,
}

/// The `uiData` block: current state, setpoints, limits and the
/// `Switch*Allowed` capability flags.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct UiData {
    pub disp_temperature: Option<f64>,
    pub display_units: Option<String>,
    pub heat_setpoint: Option<f64>,
    pub cool_setpoint: Option<f64>,
    pub heat_lower_setpt_limit: Option<f64>,
    pub heat_upper_setpt_limit: Option<f64>,
    pub cool_lower_setpt_limit: Option<f64>,
    pub cool_upper_setpt_limit: Option<f64>,
    pub system_switch_position: Option<u8>,
    pub equipment_output_status: Option<u8>,
    pub status_heat: Option<u8>,
    pub status_cool: Option<u8>,
    pub indoor_humidity: Option<f64>,
    pub indoor_humidity_sensor_available: Option<bool>,
    pub outdoor_temperature: Option<f64>,
    pub outdoor_temperature_available: Option<bool>,
    pub outdoor_humidity: Option<f64>,
    pub outdoor_humidity_available: Option<bool>,
    pub switch_heat_allowed: Option<bool>,
    pub switch_cool_allowed: Option<bool>,
    pub switch_auto_allowed: Option<bool>,
    pub switch_off_allowed: Option<bool>,
    pub switch_emergency_heat_allowed: Option<bool>,
}

/// The `fanData` block.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FanData {
    pub fan_mode: Option<u8>,
    pub fan_is_running: Option<bool>,
    pub fan_mode_auto_allowed: Option<bool>,
    pub fan_mode_on_allowed: Option<bool>,
    pub fan_mode_circulate_allowed: Option<bool>,
    pub fan_mode_follow_schedule_allowed: Option<bool>,
}

// ── Control changes ──────────────────────────────────────────────────

/// Body of `SubmitControlScreenChanges`.
///
/// The portal expects every key present; unset fields go out as `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ControlChanges {
    #[serde(rename = "DeviceID")]
    pub device_id: i64,
    pub system_switch: Option<u8>,
    pub heat_setpoint: Option<f64>,
    pub cool_setpoint: Option<f64>,
    pub heat_next_period: Option<u32>,
    pub cool_next_period: Option<u32>,
    pub status_heat: Option<u8>,
    pub status_cool: Option<u8>,
    pub fan_mode: Option<u8>,
}

impl ControlChanges {
    pub fn new(device_id: i64) -> Self {
        Self {
            device_id,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitResponse {
    /// `true` only for `"success": 1` or `"success": true`.
    #[serde(default, deserialize_with = "accepted_flag")]
    pub success: bool,
}

/// Accept `true`/`false`, `1`/`0`, or null (false).
fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Bool(b)) => b,
        Some(serde_json::Value::Number(n)) => n.as_i64().is_some_and(|n| n != 0),
        _ => false,
    })
}

/// Strict acceptance flag: `1` or `true`; any other value is a rejection.
fn accepted_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Bool(b)) => b,
        Some(serde_json::Value::Number(n)) => n.as_i64() == Some(1),
        _ => false,
    })
}
