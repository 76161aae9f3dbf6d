use chrono::{DateTime, Utc};
use thiserror::Error;

/// Top-level error type for the `tcc-api` crate.
///
/// The first seven variants are the closed taxonomy every layer above
/// dispatches on. Match on the variant, never on the rendered message.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// Transport-level failure (timeout, DNS, connection reset), or a login
    /// handshake answered with an unexpected status.
    #[error("Connection error: {message}")]
    Connection { message: String },

    // ── Authentication ──────────────────────────────────────────────
    /// A fresh login was rejected outright (401, or no usable auth cookie).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// A request made under an established session came back 401/403.
    #[error("Unauthorized (HTTP {status}) -- session expired or revoked")]
    Unauthorized { status: u16 },

    /// Login attempted before the cooldown window elapsed.
    #[error("Rate limited on login -- next attempt allowed at {retry_at}")]
    RateLimited { retry_at: DateTime<Utc> },

    // ── Service ─────────────────────────────────────────────────────
    /// 500/502/503, or the portal bounced the request to another page.
    #[error("Service unavailable (HTTP {status})")]
    ServiceUnavailable { status: u16 },

    /// Any other non-success status, wrong content type, or unparseable body.
    #[error("Unexpected response: {message}")]
    UnexpectedResponse { message: String },

    /// The portal accepted the HTTP call but rejected the payload.
    #[error("API error: {message}")]
    Api { message: String },

    // ── Supporting ──────────────────────────────────────────────────
    /// Retries ran out without any classified error being recorded.
    #[error("Request failed after {attempts} attempt(s)")]
    RetriesExhausted { attempts: u32 },

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup or HTTP client construction failed.
    #[error("TLS error: {0}")]
    Tls(String),
}

impl Error {
    /// Returns `true` for failures the executor retries with backoff.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::ServiceUnavailable { .. })
    }

    /// Returns `true` for failures that concern the session as a whole
    /// rather than a single request.
    pub fn is_session_error(&self) -> bool {
        matches!(
            self,
            Self::Authentication { .. } | Self::Unauthorized { .. } | Self::RateLimited { .. }
        )
    }

    /// Returns `true` if the stored credentials were rejected and only new
    /// credentials can fix it.
    pub fn requires_reauth(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }

    /// Build a `Connection` error from a reqwest failure.
    pub(crate) fn transport(err: &reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            format!("request timed out: {err}")
        } else {
            err.to_string()
        };
        Self::Connection { message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_covers_connection_and_outage_only() {
        assert!(Error::Connection { message: "reset".into() }.is_transient());
        assert!(Error::ServiceUnavailable { status: 503 }.is_transient());
        assert!(!Error::Unauthorized { status: 401 }.is_transient());
        assert!(!Error::Api { message: "nope".into() }.is_transient());
    }

    #[test]
    fn session_errors() {
        assert!(Error::RateLimited { retry_at: Utc::now() }.is_session_error());
        assert!(Error::Unauthorized { status: 403 }.is_session_error());
        assert!(
            Error::Authentication {
                message: "bad".into()
            }
            .requires_reauth()
        );
        assert!(!Error::Unauthorized { status: 401 }.requires_reauth());
    }
}
