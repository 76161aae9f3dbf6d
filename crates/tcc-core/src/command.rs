// ── Command API ──
//
// User-issued control changes. Each command runs against one thermostat
// with its own bounded retry on top of the per-request retry in tcc-api,
// and the device is refreshed once the portal accepts it.

use std::fmt;

use tracing::{debug, error, warn};

use crate::config::CommandConfig;
use crate::device::Thermostat;
use crate::error::CoreError;
use crate::model::{FanMode, SystemMode};

/// A control change for one thermostat.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// `target` goes to the cool setpoint in cool mode and to the heat
    /// setpoint otherwise; `low` / `high` set heat / cool directly (auto).
    SetTemperature {
        target: Option<f64>,
        low: Option<f64>,
        high: Option<f64>,
    },
    SetSystemMode(SystemMode),
    SetFanMode(FanMode),
    /// Switch to heat.
    TurnOn,
    TurnOff,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SetTemperature { .. } => f.write_str("set temperature"),
            Self::SetSystemMode(mode) => write!(f, "set system mode to {mode}"),
            Self::SetFanMode(mode) => write!(f, "set fan mode to {mode}"),
            Self::TurnOn => f.write_str("turn on"),
            Self::TurnOff => f.write_str("turn off"),
        }
    }
}

/// Run `command` against `device`, retrying failed attempts with
/// exponential backoff. Validation failures are returned immediately.
pub async fn execute(device: &Thermostat, command: Command, config: &CommandConfig) -> Result<(), CoreError> {
    let policy = config.retry_policy();
    let attempts = policy.max_attempts.max(1);

    let mut attempt = 0;
    loop {
        match apply(device, command).await {
            Ok(()) => {
                if let Err(e) = device.refresh().await {
                    warn!(device = %device.id(), error = %e, "refresh after command failed");
                }
                return Ok(());
            }
            Err(e) if e.is_validation() => return Err(e),
            Err(e) => {
                warn!(
                    device = %device.id(),
                    attempt = attempt + 1,
                    max_attempts = attempts,
                    error = %e,
                    "failed to {command}"
                );
                if !policy.has_attempts_after(attempt) {
                    error!(device = %device.id(), "failed to {command} after {attempts} attempts");
                    return Err(e);
                }
                let backoff = policy.delay_for_attempt(attempt);
                debug!(backoff_ms = backoff.as_millis(), "waiting before retrying command");
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
        }
    }
}

async fn apply(device: &Thermostat, command: Command) -> Result<(), CoreError> {
    match command {
        Command::SetTemperature { target, low, high } => {
            if let Some(target) = target {
                let mode = device.reading().and_then(|r| r.system_mode);
                if mode == Some(SystemMode::Cool) {
                    device.set_setpoint_cool(target).await?;
                } else {
                    device.set_setpoint_heat(target).await?;
                }
            }
            if let Some(low) = low {
                device.set_setpoint_heat(low).await?;
            }
            if let Some(high) = high {
                device.set_setpoint_cool(high).await?;
            }
            Ok(())
        }
        Command::SetSystemMode(mode) => device.set_system_mode(mode).await,
        Command::SetFanMode(mode) => device.set_fan_mode(mode).await,
        Command::TurnOn => device.set_system_mode(SystemMode::Heat).await,
        Command::TurnOff => device.set_system_mode(SystemMode::Off).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_describe_themselves() {
        assert_eq!(Command::SetSystemMode(SystemMode::Cool).to_string(), "set system mode to cool");
        assert_eq!(
            Command::SetFanMode(FanMode::FollowSchedule).to_string(),
            "set fan mode to follow schedule"
        );
        assert_eq!(Command::TurnOff.to_string(), "turn off");
    }
}
