#![allow(clippy::unwrap_used)]
// Connect, discovery and device lookup through the controller.

mod common;

use serde_json::{Value, json};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tcc_core::{Command, Controller, CoreError, DeviceId, SystemMode};

use common::{LOCATIONS_PATH, SUBMIT_PATH, account, mount_data, mount_login, thermostat_body};

async fn mount_locations(server: &MockServer, first_page: Value) {
    Mock::given(method("POST"))
        .and(path(LOCATIONS_PATH))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(first_page))
        .with_priority(1)
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path(LOCATIONS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .with_priority(2)
        .mount(server)
        .await;
}

fn two_thermostats() -> Value {
    json!([
        {
            "LocationID": 100,
            "Name": "Home",
            "Devices": [
                {"DeviceID": 1, "MacID": "00D02D000001", "Name": "Hall"},
                {"DeviceID": 2, "MacID": "00D02D000002", "Name": "Upstairs"}
            ]
        }
    ])
}

#[tokio::test]
async fn test_connect_discovers_devices() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_locations(&server, two_thermostats()).await;
    mount_data(&server, 1, thermostat_body(1, 70.0)).await;
    mount_data(&server, 2, thermostat_body(3, 75.0)).await;

    let controller = Controller::new(account(&server)).unwrap();
    controller.connect().await.unwrap();

    let locations = controller.locations();
    assert_eq!(locations.len(), 1);
    assert_eq!(locations[0].name.as_deref(), Some("Home"));
    assert_eq!(controller.devices().len(), 2);

    // Discovery already refreshed each device once.
    let upstairs = controller.device("2").unwrap();
    assert_eq!(upstairs.name(), "Upstairs");
    assert_eq!(upstairs.mac_id(), Some("00D02D000002"));
    assert_eq!(upstairs.reading().unwrap().system_mode, Some(SystemMode::Cool));

    let hall = controller.device("hall").unwrap();
    assert_eq!(hall.id(), DeviceId::new(1));

    let err = controller.device("garage").unwrap_err();
    assert!(matches!(err, CoreError::DeviceNotFound { .. }));

    controller.shutdown().await;
}

#[tokio::test]
async fn test_device_with_failing_first_refresh_is_still_registered() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_locations(&server, two_thermostats()).await;
    mount_data(&server, 1, thermostat_body(1, 70.0)).await;
    mount_data(&server, 2, json!({"success": false})).await;

    let controller = Controller::new(account(&server)).unwrap();
    controller.connect().await.unwrap();

    assert_eq!(controller.devices().len(), 2);
    assert!(controller.device("2").unwrap().reading().is_none());

    let snapshot = controller.update().await.unwrap();
    assert!(snapshot.get(DeviceId::new(1)).unwrap().available);
    assert!(!snapshot.get(DeviceId::new(2)).unwrap().available);
}

#[tokio::test]
async fn test_empty_account_is_an_error() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_locations(&server, json!([{"LocationID": 100, "Name": "Home", "Devices": []}])).await;

    let controller = Controller::new(account(&server)).unwrap();
    let err = controller.connect().await.unwrap_err();

    assert!(matches!(err, CoreError::NoDevices), "got: {err:?}");
}

#[tokio::test]
async fn test_rejected_credentials_need_reauth() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/portal"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let controller = Controller::new(account(&server)).unwrap();
    let err = controller.connect().await.unwrap_err();

    assert!(err.requires_reauth(), "got: {err:?}");
}

#[tokio::test]
async fn test_not_connected() {
    let server = MockServer::start().await;

    let controller = Controller::new(account(&server)).unwrap();

    assert!(matches!(controller.update().await, Err(CoreError::NotConnected)));
    assert!(controller.snapshot().is_empty());
    assert!(controller.devices().is_empty());
}

#[tokio::test]
async fn test_set_credentials_logs_in_again() {
    let server = MockServer::start().await;
    mount_login(&server).await;

    let controller = Controller::new(account(&server)).unwrap();
    controller
        .set_credentials("other@example.com", "s3cret".to_string().into())
        .await
        .unwrap();

    let session = controller.client().session();
    assert!(session.is_authenticated());
    assert_eq!(session.username().await, "other@example.com");
}

#[tokio::test]
async fn test_execute_through_controller() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_locations(&server, two_thermostats()).await;
    mount_data(&server, 1, thermostat_body(2, 70.0)).await;
    mount_data(&server, 2, thermostat_body(2, 70.0)).await;
    Mock::given(method("POST"))
        .and(path(SUBMIT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": 1})))
        .expect(1)
        .mount(&server)
        .await;

    let controller = Controller::new(account(&server)).unwrap();
    controller.connect().await.unwrap();

    let hall = controller.device("Hall").unwrap();
    controller.execute(&hall, Command::TurnOn).await.unwrap();
}
