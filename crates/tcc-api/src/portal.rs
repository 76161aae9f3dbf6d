// Portal endpoints
//
// Inherent methods on `ComfortClient`, one per portal call the device model
// needs.

use std::collections::BTreeSet;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::client::ComfortClient;
use crate::error::Error;
use crate::models::{ControlChanges, LocationEntry, SubmitResponse, ThermostatData};

/// The location list is paged; the portal never serves more than this.
const LOCATION_PAGES: u32 = 4;

impl ComfortClient {
    /// List every location on the account with its devices.
    ///
    /// Pages are fetched without retry. A failure on the first page is
    /// returned; a failure on a later page ends pagination and the
    /// locations gathered so far are returned. Entries that don't parse
    /// are logged and skipped.
    pub async fn list_locations(&self) -> Result<Vec<LocationEntry>, Error> {
        let mut locations = Vec::new();
        let mut seen = BTreeSet::new();

        for page in 1..=LOCATION_PAGES {
            let path = format!("/portal/Location/GetLocationListData/?page={page}&filter=");
            let body = match self.send_once(Method::POST, &path, None).await {
                Ok(body) => body,
                Err(e) if page == 1 => return Err(e),
                Err(e) => {
                    warn!(page, error = %e, "location page failed, keeping earlier pages");
                    break;
                }
            };

            let Value::Array(entries) = body else {
                debug!(page, "location page was not a list, stopping");
                break;
            };
            if entries.is_empty() {
                break;
            }

            for raw in entries {
                let id = raw.get("LocationID").cloned().unwrap_or(Value::Null);
                match serde_json::from_value::<LocationEntry>(raw) {
                    Ok(entry) if seen.insert(entry.location_id) => locations.push(entry),
                    Ok(_) => {}
                    Err(e) => warn!(location = %id, error = %e, "skipping malformed location"),
                }
            }
        }

        debug!(count = locations.len(), "listed locations");
        Ok(locations)
    }

    /// Fetch live data for one thermostat.
    pub async fn thermostat_data(&self, device_id: i64) -> Result<ThermostatData, Error> {
        let path = format!(
            "/portal/Device/CheckDataSession/{device_id}?_={}",
            self.next_cache_buster()
        );
        let data: ThermostatData = parse(self.get_json(&path).await?, &path)?;
        if !data.success {
            return Err(Error::Api {
                message: format!("portal reported no data for device {device_id}"),
            });
        }
        Ok(data)
    }

    /// Submit a control change. Succeeds only when the portal answers
    /// `{"success": 1}` or `{"success": true}`.
    pub async fn submit_control_changes(&self, changes: &ControlChanges) -> Result<(), Error> {
        let path = "/portal/Device/SubmitControlScreenChanges";
        let payload = serde_json::to_value(changes).map_err(|e| Error::UnexpectedResponse {
            message: format!("could not encode control changes: {e}"),
        })?;
        let body = self.post_json(path, Some(&payload)).await?;

        let accepted = !body.is_null()
            && parse::<SubmitResponse>(body, path)?.success;
        if !accepted {
            return Err(Error::Api {
                message: format!("portal rejected settings for device {}", changes.device_id),
            });
        }
        debug!(device = changes.device_id, "control changes accepted");
        Ok(())
    }
}

fn parse<T: DeserializeOwned>(body: Value, path: &str) -> Result<T, Error> {
    serde_json::from_value(body).map_err(|e| Error::UnexpectedResponse {
        message: format!("unexpected payload from {path}: {e}"),
    })
}
