// Shared wiremock fixtures for the tcc-core integration tests.
#![allow(dead_code, clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tcc_api::models::DeviceEntry;
use tcc_api::{ClientConfig, ComfortClient, Credentials, RetryPolicy};
use tcc_core::{AccountConfig, LocationId, Thermostat};

pub const TINY: Duration = Duration::from_millis(1);

pub fn data_path(id: i64) -> String {
    format!("/portal/Device/CheckDataSession/{id}")
}

pub const SUBMIT_PATH: &str = "/portal/Device/SubmitControlScreenChanges";
pub const LOCATIONS_PATH: &str = "/portal/Location/GetLocationListData/";

pub fn client(server: &MockServer) -> Arc<ComfortClient> {
    let config = ClientConfig::default()
        .with_base_url(Url::parse(&server.uri()).unwrap())
        .with_retry(RetryPolicy::default().with_backoff_unit(TINY));
    let credentials = Credentials::new("user@example.com", "hunter2".to_string());
    Arc::new(ComfortClient::new(credentials, config).unwrap())
}

/// Like [`client`], but requests give up after `timeout`.
pub fn client_with_timeout(server: &MockServer, timeout: Duration) -> Arc<ComfortClient> {
    let mut config = ClientConfig::default()
        .with_base_url(Url::parse(&server.uri()).unwrap())
        .with_retry(RetryPolicy::default().with_backoff_unit(TINY));
    config.transport.timeout = timeout;
    let credentials = Credentials::new("user@example.com", "hunter2".to_string());
    Arc::new(ComfortClient::new(credentials, config).unwrap())
}

pub fn account(server: &MockServer) -> AccountConfig {
    let mut config = AccountConfig::new("user@example.com", "hunter2".to_string().into()).unwrap();
    config.url = Url::parse(&server.uri()).unwrap();
    config.backoff_unit = TINY;
    config.command.backoff_unit = TINY;
    config
}

pub fn thermostat(client: &Arc<ComfortClient>, id: i64, name: &str) -> Arc<Thermostat> {
    let entry = DeviceEntry {
        device_id: id,
        mac_id: None,
        name: Some(name.to_owned()),
    };
    Arc::new(Thermostat::new(Arc::clone(client), LocationId::new(1), &entry))
}

pub async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/portal"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("set-cookie", ".ASPXAUTH_TRUEHOME=token123; path=/"),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/portal"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
}

/// Live thermostat data in the given `SystemSwitchPosition`.
pub fn thermostat_body(position: u8, temperature: f64) -> Value {
    json!({
        "success": true,
        "deviceLive": true,
        "communicationLost": false,
        "latestData": {
            "uiData": {
                "DispTemperature": temperature,
                "DisplayUnits": "F",
                "HeatSetpoint": 68.0,
                "CoolSetpoint": 76.0,
                "HeatLowerSetptLimit": 40.0,
                "HeatUpperSetptLimit": 90.0,
                "CoolLowerSetptLimit": 50.0,
                "CoolUpperSetptLimit": 99.0,
                "SystemSwitchPosition": position,
                "EquipmentOutputStatus": 0,
                "SwitchHeatAllowed": true,
                "SwitchCoolAllowed": true,
                "SwitchAutoAllowed": true,
                "SwitchOffAllowed": true,
                "SwitchEmergencyHeatAllowed": false
            },
            "fanData": {
                "fanMode": 0,
                "fanIsRunning": false,
                "fanModeAutoAllowed": true,
                "fanModeOnAllowed": true,
                "fanModeCirculateAllowed": false,
                "fanModeFollowScheduleAllowed": false
            },
            "hasFan": true
        }
    })
}

pub async fn mount_data(server: &MockServer, id: i64, body: Value) {
    Mock::given(method("GET"))
        .and(path(data_path(id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}
