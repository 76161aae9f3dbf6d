//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and a distinct exit code per failure class.

use miette::Diagnostic;
use thiserror::Error;

use tcc_api::Error as ApiError;
use tcc_config::ConfigError;
use tcc_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const UNSUPPORTED: i32 = 5;
    pub const RATE_LIMITED: i32 = 6;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the portal: {reason}")]
    #[diagnostic(
        code(tcc::connection_failed),
        help(
            "The portal may be down or unreachable from here.\n\
             Try again later, or run with -vv to see each request."
        )
    )]
    ConnectionFailed { reason: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {reason}")]
    #[diagnostic(
        code(tcc::auth_failed),
        help(
            "Verify your portal e-mail and password.\n\
             Run: tcc config set-password --profile {profile}"
        )
    )]
    AuthFailed { profile: String, reason: String },

    #[error("Login temporarily refused until {retry_at}")]
    #[diagnostic(
        code(tcc::rate_limited),
        help("Too many failed logins in a row. Wait for the cooldown and try again.")
    )]
    RateLimited { retry_at: String },

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(tcc::no_credentials),
        help(
            "Configure credentials with: tcc config init\n\
             Or set TCC_USERNAME and TCC_PASSWORD."
        )
    )]
    NoCredentials { profile: String },

    // ── Devices ──────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(code(tcc::not_found), help("Run: tcc status to see available thermostats"))]
    NotFound { resource_type: String, identifier: String },

    #[error("No thermostats found on this account")]
    #[diagnostic(
        code(tcc::no_devices),
        help("Check that your thermostats are registered at the portal.")
    )]
    NoDevices,

    #[error("{operation} is not supported by {device}")]
    #[diagnostic(code(tcc::unsupported))]
    Unsupported { operation: String, device: String },

    // ── Portal ───────────────────────────────────────────────────────
    #[error("Portal error: {message}")]
    #[diagnostic(code(tcc::api_error))]
    Portal { message: String },

    #[error("Update failed: {reason} ({detail})")]
    #[diagnostic(code(tcc::update_failed))]
    UpdateFailed { reason: String, detail: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(tcc::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(tcc::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: tcc config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No configuration found")]
    #[diagnostic(
        code(tcc::no_config),
        help(
            "Create a config with: tcc config init\n\
             Expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error("Configuration error: {message}")]
    #[diagnostic(code(tcc::config))]
    Config { message: String },

    #[error("Could not render output: {message}")]
    #[diagnostic(code(tcc::output))]
    Output { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::RateLimited { .. } => exit_code::RATE_LIMITED,
            Self::NotFound { .. } | Self::NoDevices => exit_code::NOT_FOUND,
            Self::Unsupported { .. } => exit_code::UNSUPPORTED,
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    /// Like `From<CoreError>`, but names the profile in auth help text.
    pub fn from_core(err: CoreError, profile: &str) -> Self {
        match err {
            CoreError::Api(ApiError::Authentication { message }) => Self::AuthFailed {
                profile: profile.into(),
                reason: message,
            },
            CoreError::UpdateFailed {
                source: ApiError::Authentication { message },
                ..
            } => Self::AuthFailed {
                profile: profile.into(),
                reason: message,
            },
            other => Self::from(other),
        }
    }
}

// ── ApiError → CliError mapping ──────────────────────────────────────

impl From<ApiError> for CliError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Authentication { message } => Self::AuthFailed {
                profile: "default".into(),
                reason: message,
            },
            ApiError::RateLimited { retry_at } => Self::RateLimited {
                retry_at: retry_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            },
            e @ (ApiError::Connection { .. }
            | ApiError::ServiceUnavailable { .. }
            | ApiError::Unauthorized { .. }
            | ApiError::RetriesExhausted { .. }
            | ApiError::Tls(_)) => Self::ConnectionFailed { reason: e.to_string() },
            ApiError::InvalidUrl(e) => Self::Validation {
                field: "url".into(),
                reason: e.to_string(),
            },
            e @ (ApiError::UnexpectedResponse { .. } | ApiError::Api { .. }) => {
                Self::Portal { message: e.to_string() }
            }
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Api(e) => e.into(),

            CoreError::UpdateFailed { reason, source } => match source {
                e @ (ApiError::Authentication { .. } | ApiError::RateLimited { .. }) => e.into(),
                e if e.is_transient() => Self::ConnectionFailed {
                    reason: format!("{reason}: {e}"),
                },
                e => Self::UpdateFailed {
                    reason,
                    detail: e.to_string(),
                },
            },

            CoreError::NotConnected => Self::ConnectionFailed {
                reason: "not connected to the portal".into(),
            },

            CoreError::NoDevices => Self::NoDevices,

            CoreError::DeviceNotFound { identifier } => Self::NotFound {
                resource_type: "thermostat".into(),
                identifier,
            },

            CoreError::Unsupported { operation, device } => Self::Unsupported { operation, device },

            e @ CoreError::OutOfRange { .. } => Self::Validation {
                field: "temperature".into(),
                reason: e.to_string(),
            },

            CoreError::Config { message } => Self::Config { message },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::NoCredentials { profile } => Self::NoCredentials { profile },
            ConfigError::ProfileNotFound { name } => Self::ProfileNotFound {
                name,
                available: String::new(),
            },
            ConfigError::Core(e) => e.into(),
            ConfigError::Io(e) => Self::Io(e),
            other => Self::Config {
                message: other.to_string(),
            },
        }
    }
}
