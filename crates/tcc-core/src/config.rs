// ── Runtime account configuration ──
//
// These types describe *how* to talk to one portal account. They carry
// credentials and tuning but never touch disk; the CLI builds an
// `AccountConfig` from its profile and hands it in.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use tcc_api::retry::{DEFAULT_BACKOFF_BASE, DEFAULT_MAX_ATTEMPTS};
use tcc_api::{ClientConfig, Credentials, RetryPolicy, TlsMode, TransportConfig};

use crate::error::CoreError;

/// Poll cycle tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerConfig {
    /// Time between cycles of the background polling task.
    pub interval: Duration,
    /// Transient cycle failures tolerated (serving stale data) before a
    /// failure escalates.
    pub error_threshold: u32,
    /// How many times a cycle is restarted after a recovery login.
    pub reauth_cycle_retries: u32,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            error_threshold: 5,
            reauth_cycle_retries: 1,
        }
    }
}

/// Caller-side retry for control commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandConfig {
    pub max_attempts: u32,
    /// Backoff after attempt `n` is `backoff_unit * 2^n`.
    pub backoff_unit: Duration,
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_unit: Duration::from_secs(1),
        }
    }
}

impl CommandConfig {
    pub(crate) fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts).with_backoff_unit(self.backoff_unit)
    }
}

/// Configuration for one portal account.
///
/// Built by the CLI, passed to `Controller`. Core never reads config files.
#[derive(Debug, Clone)]
pub struct AccountConfig {
    /// Portal root (e.g. `https://mytotalconnectcomfort.com`).
    pub url: Url,
    pub username: String,
    pub password: SecretString,
    /// Extra CA certificate to trust (intercepting proxies).
    pub ca_cert: Option<PathBuf>,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Attempts per portal request.
    pub max_attempts: u32,
    /// Unit of the per-request exponential backoff.
    pub backoff_unit: Duration,
    pub poller: PollerConfig,
    pub command: CommandConfig,
}

impl AccountConfig {
    pub fn new(username: impl Into<String>, password: SecretString) -> Result<Self, CoreError> {
        let url = Url::parse(tcc_api::DEFAULT_BASE_URL).map_err(|e| CoreError::Config {
            message: format!("invalid default portal URL: {e}"),
        })?;
        Ok(Self {
            url,
            username: username.into(),
            password,
            ca_cert: None,
            timeout: Duration::from_secs(30),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_unit: Duration::from_secs(1),
            poller: PollerConfig::default(),
            command: CommandConfig::default(),
        })
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.username.clone(), self.password.clone())
    }

    /// Translate into the API crate's client configuration.
    pub fn client_config(&self) -> Result<ClientConfig, CoreError> {
        if self.max_attempts == 0 {
            return Err(CoreError::Config {
                message: "max_attempts must be at least 1".into(),
            });
        }
        let tls = match &self.ca_cert {
            Some(path) => TlsMode::CustomCa(path.clone()),
            None => TlsMode::System,
        };
        let transport = TransportConfig {
            tls,
            timeout: self.timeout,
            cookie_jar: None,
        }
        .with_cookie_jar();
        let retry = RetryPolicy {
            max_attempts: self.max_attempts,
            backoff_base: DEFAULT_BACKOFF_BASE,
            backoff_unit: self.backoff_unit,
        };

        Ok(ClientConfig {
            base_url: self.url.clone(),
            transport,
            retry,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_portal_conventions() {
        let config = AccountConfig::new("me@example.com", SecretString::from("pw".to_string())).unwrap();
        assert_eq!(config.url.as_str(), "https://mytotalconnectcomfort.com/");
        assert_eq!(config.poller.error_threshold, 5);
        assert_eq!(config.poller.interval, Duration::from_secs(30));
        assert_eq!(config.command.max_attempts, 3);

        let client = config.client_config().unwrap();
        assert_eq!(client.retry.max_attempts, 3);
        assert!(client.transport.cookie_jar.is_some());
    }

    #[test]
    fn zero_attempts_rejected() {
        let mut config = AccountConfig::new("me@example.com", SecretString::from("pw".to_string())).unwrap();
        config.max_attempts = 0;
        assert!(matches!(config.client_config(), Err(CoreError::Config { .. })));
    }
}
