//! `tcc status`: one poll cycle, rendered.

use tabled::Tabled;

use tcc_core::{Controller, DeviceStatus, Snapshot};

use crate::cli::{GlobalOpts, StatusArgs};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
pub(super) struct StatusRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Temp")]
    temperature: String,
    #[tabled(rename = "Humidity")]
    humidity: String,
    #[tabled(rename = "Mode")]
    mode: String,
    #[tabled(rename = "Target")]
    target: String,
    #[tabled(rename = "Fan")]
    fan: String,
    #[tabled(rename = "Running")]
    running: String,
}

impl From<&DeviceStatus> for StatusRow {
    fn from(d: &DeviceStatus) -> Self {
        let r = d.reading.as_deref();
        let symbol = r.map_or("", |r| r.unit.symbol());
        Self {
            id: d.id.to_string(),
            name: d.name.clone(),
            state: output::availability(d.available),
            temperature: util::temperature(r.and_then(|r| r.current_temperature), symbol),
            humidity: util::percent(r.and_then(|r| r.current_humidity)),
            mode: util::or_dash(r.and_then(|r| r.system_mode)),
            target: util::temperature(r.and_then(tcc_core::ThermostatReading::target_temperature), symbol),
            fan: util::or_dash(r.and_then(|r| r.fan_mode)),
            running: util::or_dash(r.map(|r| r.equipment_status)),
        }
    }
}

pub(super) fn plain_line(d: &DeviceStatus) -> String {
    let r = d.reading.as_deref();
    format!(
        "{}\t{}\t{}\t{}",
        d.id,
        d.name,
        if d.available { "online" } else { "offline" },
        r.and_then(|r| r.current_temperature)
            .map_or_else(|| "-".into(), |t| t.to_string()),
    )
}

fn detail(d: &DeviceStatus) -> String {
    let mut lines = vec![
        format!("ID:          {}", d.id),
        format!("Name:        {}", d.name),
        format!("State:       {}", output::availability(d.available)),
    ];
    if let Some(ref err) = d.last_error {
        lines.push(format!("Last error:  {}", output::warning(err)));
    }

    let Some(r) = d.reading.as_deref() else {
        lines.push("Reading:     none yet".into());
        return lines.join("\n");
    };
    let sym = r.unit.symbol();
    lines.extend([
        format!("Temperature: {}", util::temperature(r.current_temperature, sym)),
        format!("Humidity:    {}", util::percent(r.current_humidity)),
        format!("Outdoor:     {} / {}", util::temperature(r.outdoor_temperature, sym), util::percent(r.outdoor_humidity)),
        format!("Mode:        {}", util::or_dash(r.system_mode)),
        format!(
            "Heat to:     {} ({}-{})",
            util::temperature(r.setpoint_heat, sym),
            r.heat_range.min,
            r.heat_range.max
        ),
        format!(
            "Cool to:     {} ({}-{})",
            util::temperature(r.setpoint_cool, sym),
            r.cool_range.min,
            r.cool_range.max
        ),
        format!("Fan:         {}", util::or_dash(r.fan_mode)),
        format!("Running:     {}", r.equipment_status),
        format!(
            "Modes:       {}",
            r.capabilities.system_modes().iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
        ),
        format!(
            "Fan modes:   {}",
            r.capabilities.fan_modes().iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
        ),
        format!("Fetched:     {}", r.fetched_at.format("%Y-%m-%d %H:%M:%S UTC")),
    ]);
    lines.join("\n")
}

/// Render a snapshot as a list in the selected format.
pub(super) fn render_snapshot(snapshot: &Snapshot, global: &GlobalOpts) -> Result<String, CliError> {
    let devices: Vec<&DeviceStatus> = snapshot.devices.values().collect();
    output::render_list(
        global.output,
        &devices,
        |d| StatusRow::from(*d),
        |d| plain_line(d),
    )
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(controller: &Controller, args: StatusArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let snapshot = controller.update().await?;

    let rendered = match args.device {
        Some(ref identifier) => {
            let device = util::resolve_device(controller, Some(identifier))?;
            let status = snapshot.get(device.id()).ok_or_else(|| CliError::NotFound {
                resource_type: "thermostat".into(),
                identifier: identifier.clone(),
            })?;
            output::render_single(global.output, status, detail, plain_line)?
        }
        None => render_snapshot(&snapshot, global)?,
    };

    output::print_output(&rendered, global.quiet);
    Ok(())
}
