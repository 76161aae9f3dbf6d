//! `tcc set`, `tcc on`, `tcc off`: control changes.

use tcc_core::{Command, Controller, FanMode, SystemMode};

use crate::cli::{DeviceArg, FanArg, GlobalOpts, ModeArg, SetArgs, SetCommand};
use crate::error::CliError;

use super::util;

impl From<ModeArg> for SystemMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Emheat => Self::EmergencyHeat,
            ModeArg::Heat => Self::Heat,
            ModeArg::Off => Self::Off,
            ModeArg::Cool => Self::Cool,
            ModeArg::Auto => Self::Auto,
        }
    }
}

impl From<FanArg> for FanMode {
    fn from(mode: FanArg) -> Self {
        match mode {
            FanArg::Auto => Self::Auto,
            FanArg::On => Self::On,
            FanArg::Circulate => Self::Circulate,
            FanArg::FollowSchedule => Self::FollowSchedule,
        }
    }
}

pub async fn handle(controller: &Controller, args: SetArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let (device, command) = match args.command {
        SetCommand::Temperature { device, target, low, high } => {
            (device, Command::SetTemperature { target, low, high })
        }
        SetCommand::Mode { device, mode } => (device, Command::SetSystemMode(mode.into())),
        SetCommand::Fan { device, mode } => (device, Command::SetFanMode(mode.into())),
    };
    run(controller, &device, command, global).await
}

pub async fn turn_on(controller: &Controller, device: DeviceArg, global: &GlobalOpts) -> Result<(), CliError> {
    run(controller, &device, Command::TurnOn, global).await
}

pub async fn turn_off(controller: &Controller, device: DeviceArg, global: &GlobalOpts) -> Result<(), CliError> {
    run(controller, &device, Command::TurnOff, global).await
}

async fn run(
    controller: &Controller,
    device: &DeviceArg,
    command: Command,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let thermostat = util::resolve_device(controller, device.device.as_deref())?;
    tracing::debug!(device = %thermostat.id(), %command, "executing");
    controller.execute(&thermostat, command).await?;

    if !global.quiet {
        eprintln!("✓ {} ({}): {command}", thermostat.name(), thermostat.id());
    }
    Ok(())
}
