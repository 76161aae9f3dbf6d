// ── Core error types ──
//
// Portal failures pass through untouched so callers can still match on the
// taxonomy; the core only adds what the device model and poller know about.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A portal failure, carried verbatim.
    #[error(transparent)]
    Api(#[from] tcc_api::Error),

    #[error("Not connected -- call connect() first")]
    NotConnected,

    // ── Data errors ──────────────────────────────────────────────────
    #[error("No thermostats found on this account")]
    NoDevices,

    #[error("Device not found: {identifier}")]
    DeviceNotFound { identifier: String },

    // ── Validation errors ────────────────────────────────────────────
    #[error("{operation} is not supported by {device}")]
    Unsupported { operation: String, device: String },

    #[error("{setting} {value} is outside the allowed range {min}-{max}")]
    OutOfRange {
        setting: String,
        value: f64,
        min: f64,
        max: f64,
    },

    // ── Polling ──────────────────────────────────────────────────────
    /// A poll cycle escalated instead of serving stale data.
    #[error("Update failed: {reason}")]
    UpdateFailed {
        reason: String,
        #[source]
        source: tcc_api::Error,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// The portal error underneath, if any.
    pub fn api_error(&self) -> Option<&tcc_api::Error> {
        match self {
            Self::Api(e) | Self::UpdateFailed { source: e, .. } => Some(e),
            _ => None,
        }
    }

    /// `true` when only new credentials can fix this.
    pub fn requires_reauth(&self) -> bool {
        self.api_error().is_some_and(tcc_api::Error::requires_reauth)
    }

    /// `true` for errors raised before anything was sent.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Unsupported { .. } | Self::OutOfRange { .. })
    }
}
