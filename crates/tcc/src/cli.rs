//! Clap derive structures for the `tcc` CLI.
//!
//! Defines the command tree, global flags, and shared value enums.

use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// tcc -- Total Connect Comfort thermostats from the command line
#[derive(Debug, Parser)]
#[command(
    name = "tcc",
    version,
    about = "Monitor and control Honeywell Total Connect Comfort thermostats",
    long_about = "Talks to the Total Connect Comfort web portal on your behalf.\n\n\
        Logs in with your portal account, discovers every thermostat on it,\n\
        and keeps polling through portal outages and expired sessions.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Account profile to use
    #[arg(long, short = 'p', env = "TCC_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Portal URL (overrides profile)
    #[arg(long, env = "TCC_URL", global = true)]
    pub url: Option<String>,

    /// Portal account e-mail (overrides profile)
    #[arg(long, short = 'u', env = "TCC_USERNAME", global = true)]
    pub username: Option<String>,

    /// Portal account password
    #[arg(long, env = "TCC_PASSWORD", global = true, hide_env_values = true)]
    pub password: Option<String>,

    /// Output format
    #[arg(long, short = 'o', env = "TCC_OUTPUT", default_value = "table", global = true)]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "TCC_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Mode Enums ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// Emergency / auxiliary heat
    #[value(alias = "emergency-heat")]
    Emheat,
    Heat,
    Off,
    Cool,
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FanArg {
    Auto,
    On,
    Circulate,
    /// Follow the thermostat's schedule
    #[value(alias = "schedule")]
    FollowSchedule,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show current readings for every thermostat
    #[command(alias = "st", alias = "ls")]
    Status(StatusArgs),

    /// Poll continuously and print each cycle until interrupted
    Watch(WatchArgs),

    /// Change a thermostat setting
    Set(SetArgs),

    /// Switch a thermostat on (heat mode)
    On(DeviceArg),

    /// Switch a thermostat off
    Off(DeviceArg),

    /// Verify that the configured credentials can log in
    Check,

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Shared Arguments ─────────────────────────────────────────────────

/// Which thermostat to act on.
#[derive(Debug, Args)]
pub struct DeviceArg {
    /// Device ID or name (optional when the account has one thermostat)
    #[arg(long, short = 'd')]
    pub device: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  STATUS / WATCH
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Show one thermostat in detail instead of the overview table
    #[arg(long, short = 'd')]
    pub device: Option<String>,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Time between polls (e.g. "30s", "2m"; overrides profile)
    #[arg(long, short = 'i', value_parser = parse_interval)]
    pub interval: Option<Duration>,

    /// Stop after this many completed cycles
    #[arg(long, short = 'n')]
    pub count: Option<u32>,
}

fn parse_interval(raw: &str) -> Result<Duration, String> {
    let interval = humantime::parse_duration(raw).map_err(|e| e.to_string())?;
    if interval.is_zero() {
        return Err("interval must be greater than zero".into());
    }
    Ok(interval)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  SET
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct SetArgs {
    #[command(subcommand)]
    pub command: SetCommand,
}

#[derive(Debug, Subcommand)]
pub enum SetCommand {
    /// Set the target temperature (temporary hold)
    #[command(alias = "temp")]
    Temperature {
        #[command(flatten)]
        device: DeviceArg,

        /// Target temperature; applied to the cool setpoint in cool mode,
        /// the heat setpoint otherwise
        #[arg(required_unless_present_any = ["low", "high"])]
        target: Option<f64>,

        /// Heat setpoint (auto mode range low end)
        #[arg(long)]
        low: Option<f64>,

        /// Cool setpoint (auto mode range high end)
        #[arg(long)]
        high: Option<f64>,
    },

    /// Set the system mode
    Mode {
        #[command(flatten)]
        device: DeviceArg,

        mode: ModeArg,
    },

    /// Set the fan mode
    Fan {
        #[command(flatten)]
        device: DeviceArg,

        mode: FanArg,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current configuration (passwords masked)
    Show,

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Store the active profile's password in the system keyring
    SetPassword,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
