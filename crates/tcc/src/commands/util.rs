//! Shared helpers for command handlers.

use std::sync::Arc;

use tcc_core::{AccountConfig, Controller, Thermostat};

use crate::cli::GlobalOpts;
use crate::config;
use crate::error::CliError;

/// Build a controller from config + flags, log in and discover devices.
pub async fn connect(global: &GlobalOpts) -> Result<(Controller, String), CliError> {
    connect_with(global, |_| {}).await
}

/// [`connect`], adjusting the resolved account before the controller is built.
pub async fn connect_with(
    global: &GlobalOpts,
    adjust: impl FnOnce(&mut AccountConfig),
) -> Result<(Controller, String), CliError> {
    let (mut account, profile) = config::resolve_account(global)?;
    adjust(&mut account);
    tracing::debug!(url = %account.url, profile, "connecting");
    let controller = Controller::new(account).map_err(|e| CliError::from_core(e, &profile))?;
    controller
        .connect()
        .await
        .map_err(|e| CliError::from_core(e, &profile))?;
    Ok((controller, profile))
}

/// Resolve `--device`, defaulting to the only thermostat on the account.
pub fn resolve_device(controller: &Controller, identifier: Option<&str>) -> Result<Arc<Thermostat>, CliError> {
    if let Some(identifier) = identifier {
        return Ok(controller.device(identifier)?);
    }

    let mut devices = controller.devices();
    match devices.len() {
        0 => Err(CliError::NoDevices),
        1 => Ok(devices.remove(0)),
        n => Err(CliError::Validation {
            field: "device".into(),
            reason: format!("{n} thermostats on this account; pick one with --device"),
        }),
    }
}

/// `72.5°F`, or `-` when unknown.
pub fn temperature(value: Option<f64>, symbol: &str) -> String {
    value.map_or_else(|| "-".into(), |v| format!("{v:.1}{symbol}"))
}

/// `45%`, or `-` when unknown.
pub fn percent(value: Option<f64>) -> String {
    value.map_or_else(|| "-".into(), |v| format!("{v:.0}%"))
}

/// Display a value or `-`.
pub fn or_dash<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "-".into(), |v| v.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formatting_helpers() {
        assert_eq!(temperature(Some(72.04), "°F"), "72.0°F");
        assert_eq!(temperature(None, "°F"), "-");
        assert_eq!(percent(Some(44.6)), "45%");
        assert_eq!(or_dash::<u8>(None), "-");
        assert_eq!(or_dash(Some("heat")), "heat");
    }
}
