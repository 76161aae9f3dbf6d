//! Configuration for the tcc CLI.
//!
//! TOML profiles (one per portal account), credential resolution
//! (env + keyring + plaintext), and translation to
//! `tcc_core::AccountConfig`. The CLI layers its flag overrides on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use tcc_core::{AccountConfig, CoreError};

/// Keyring service name passwords are stored under.
pub const KEYRING_SERVICE: &str = "tcc";

/// Env var consulted for the account password.
pub const PASSWORD_ENV: &str = "TCC_PASSWORD";

/// Env var consulted for the account username.
pub const USERNAME_ENV: &str = "TCC_USERNAME";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{name}' not found in config")]
    ProfileNotFound { name: String },

    #[error("keyring error: {0}")]
    Keyring(String),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when `--profile` is not given.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named account profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Name of the profile to use: explicit choice, then `default_profile`.
    pub fn profile_name<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        requested
            .or(self.default_profile.as_deref())
            .unwrap_or("default")
    }

    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles.get(name).ok_or_else(|| ConfigError::ProfileNotFound { name: name.into() })
    }
}

/// Settings shared by every profile unless the profile overrides them.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// Request timeout (seconds).
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Seconds between poll cycles in `tcc watch`.
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
            poll_interval: default_poll_interval(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_poll_interval() -> u64 {
    30
}

/// One portal account.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Profile {
    /// Portal root. Defaults to the public portal.
    pub url: Option<String>,

    /// Account e-mail.
    pub username: Option<String>,

    /// Password (plaintext -- prefer keyring or env var).
    pub password: Option<String>,

    /// Environment variable name containing the password.
    pub password_env: Option<String>,

    /// Extra CA certificate to trust.
    pub ca_cert: Option<PathBuf>,

    /// Override request timeout (seconds).
    pub timeout: Option<u64>,

    /// Override poll interval (seconds).
    pub poll_interval: Option<u64>,

    /// Transient cycle failures tolerated before a poll is fatal.
    pub error_threshold: Option<u32>,

    /// Attempts per portal request.
    pub max_attempts: Option<u32>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "tcc", "tcc").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("tcc");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file (missing file = defaults) + `TCC_` env.
///
/// Nested keys use a double underscore: `TCC_DEFAULTS__TIMEOUT=60`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("TCC_").split("__").ignore(&["password", "username"]));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist or is broken.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution (without CLI flags) ───────────────────────

fn keyring_entry(profile_name: &str) -> Result<keyring::Entry, ConfigError> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/password"))
        .map_err(|e| ConfigError::Keyring(e.to_string()))
}

/// Store a profile's password in the system keyring.
pub fn store_password(profile_name: &str, password: &str) -> Result<(), ConfigError> {
    keyring_entry(profile_name)?
        .set_password(password)
        .map_err(|e| ConfigError::Keyring(e.to_string()))
}

fn keyring_password(profile_name: &str) -> Option<String> {
    keyring_entry(profile_name).ok()?.get_password().ok()
}

/// Resolve username + password for a profile.
///
/// Username: profile, then `TCC_USERNAME`. Password: the profile's
/// `password_env`, then `TCC_PASSWORD`, then the keyring, then plaintext.
pub fn resolve_credentials(profile: &Profile, profile_name: &str) -> Result<(String, SecretString), ConfigError> {
    resolve_credentials_with(
        profile,
        profile_name,
        |name| std::env::var(name).ok(),
        keyring_password,
    )
}

fn resolve_credentials_with(
    profile: &Profile,
    profile_name: &str,
    env: impl Fn(&str) -> Option<String>,
    keyring: impl Fn(&str) -> Option<String>,
) -> Result<(String, SecretString), ConfigError> {
    let no_credentials = || ConfigError::NoCredentials {
        profile: profile_name.into(),
    };

    let username = profile
        .username
        .clone()
        .or_else(|| env(USERNAME_ENV))
        .ok_or_else(no_credentials)?;

    // 1. Profile's password_env, then the global env var
    let from_env = profile
        .password_env
        .as_deref()
        .and_then(&env)
        .or_else(|| env(PASSWORD_ENV));
    if let Some(pw) = from_env {
        return Ok((username, SecretString::from(pw)));
    }

    // 2. Keyring
    if let Some(pw) = keyring(profile_name) {
        return Ok((username, SecretString::from(pw)));
    }

    // 3. Plaintext in config
    if let Some(ref pw) = profile.password {
        return Ok((username, SecretString::from(pw.clone())));
    }

    Err(no_credentials())
}

// ── Translation ─────────────────────────────────────────────────────

/// Build an `AccountConfig` from a profile and the global defaults -- no
/// CLI flag overrides.
pub fn profile_to_account_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<AccountConfig, ConfigError> {
    let (username, password) = resolve_credentials(profile, profile_name)?;
    build_account_config(profile, defaults, username, password)
}

/// Build an `AccountConfig` from a profile with credentials the caller
/// already resolved (e.g. from CLI flags).
pub fn build_account_config(
    profile: &Profile,
    defaults: &Defaults,
    username: String,
    password: SecretString,
) -> Result<AccountConfig, ConfigError> {
    let mut config = AccountConfig::new(username, password)?;

    if let Some(ref raw) = profile.url {
        config.url = raw.parse().map_err(|_| ConfigError::Validation {
            field: "url".into(),
            reason: format!("invalid URL: {raw}"),
        })?;
    }

    config.ca_cert.clone_from(&profile.ca_cert);
    config.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    config.poller.interval = Duration::from_secs(profile.poll_interval.unwrap_or(defaults.poll_interval));

    if let Some(threshold) = profile.error_threshold {
        config.poller.error_threshold = threshold;
    }
    if let Some(attempts) = profile.max_attempts {
        if attempts == 0 {
            return Err(ConfigError::Validation {
                field: "max_attempts".into(),
                reason: "must be at least 1".into(),
            });
        }
        config.max_attempts = attempts;
    }

    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    use super::*;

    fn profile() -> Profile {
        Profile {
            username: Some("me@example.com".into()),
            password: Some("plain".into()),
            ..Profile::default()
        }
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn password_from_profile_env_wins() {
        let mut p = profile();
        p.password_env = Some("HOME_PW".into());
        let env = |name: &str| match name {
            "HOME_PW" => Some("from-profile-env".to_owned()),
            PASSWORD_ENV => Some("from-global-env".to_owned()),
            _ => None,
        };

        let (user, pw) = resolve_credentials_with(&p, "home", env, |_| Some("from-keyring".into())).unwrap();
        assert_eq!(user, "me@example.com");
        assert_eq!(pw.expose_secret(), "from-profile-env");
    }

    #[test]
    fn keyring_beats_plaintext() {
        let (_, pw) = resolve_credentials_with(&profile(), "home", no_env, |name| {
            (name == "home").then(|| "from-keyring".to_owned())
        })
        .unwrap();
        assert_eq!(pw.expose_secret(), "from-keyring");

        let (_, pw) = resolve_credentials_with(&profile(), "home", no_env, |_| None).unwrap();
        assert_eq!(pw.expose_secret(), "plain");
    }

    #[test]
    fn username_falls_back_to_env() {
        let p = Profile {
            password: Some("plain".into()),
            ..Profile::default()
        };
        let env = |name: &str| (name == USERNAME_ENV).then(|| "env@example.com".to_owned());
        let (user, _) = resolve_credentials_with(&p, "home", env, |_| None).unwrap();
        assert_eq!(user, "env@example.com");
    }

    #[test]
    fn missing_credentials() {
        let p = Profile {
            username: Some("me@example.com".into()),
            ..Profile::default()
        };
        let err = resolve_credentials_with(&p, "home", no_env, |_| None).unwrap_err();
        assert!(matches!(err, ConfigError::NoCredentials { profile } if profile == "home"));

        let err = resolve_credentials_with(&Profile::default(), "home", no_env, |_| None).unwrap_err();
        assert!(matches!(err, ConfigError::NoCredentials { .. }));
    }

    #[test]
    fn translation_applies_overrides() {
        let p = Profile {
            url: Some("https://portal.test".into()),
            timeout: Some(10),
            error_threshold: Some(2),
            max_attempts: Some(4),
            ..profile()
        };
        let defaults = Defaults {
            poll_interval: 120,
            ..Defaults::default()
        };

        let config = build_account_config(&p, &defaults, "me@example.com".into(), "pw".to_owned().into()).unwrap();

        assert_eq!(config.url.as_str(), "https://portal.test/");
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.poller.interval, Duration::from_secs(120));
        assert_eq!(config.poller.error_threshold, 2);
        assert_eq!(config.max_attempts, 4);
    }

    #[test]
    fn translation_defaults_to_public_portal() {
        let config =
            build_account_config(&profile(), &Defaults::default(), "me@example.com".into(), "pw".to_owned().into())
                .unwrap();
        assert_eq!(config.url.as_str(), "https://mytotalconnectcomfort.com/");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.poller.error_threshold, 5);
    }

    #[test]
    fn translation_rejects_bad_values() {
        let bad_url = Profile {
            url: Some("not a url".into()),
            ..profile()
        };
        let err = build_account_config(&bad_url, &Defaults::default(), "u".into(), "p".to_owned().into()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { field, .. } if field == "url"));

        let zero = Profile {
            max_attempts: Some(0),
            ..profile()
        };
        let err = build_account_config(&zero, &Defaults::default(), "u".into(), "p".to_owned().into()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { field, .. } if field == "max_attempts"));
    }

    #[test]
    fn save_then_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config {
            default_profile: Some("home".into()),
            ..Config::default()
        };
        cfg.profiles.insert(
            "home".into(),
            Profile {
                password_env: Some("HOME_PW".into()),
                poll_interval: Some(60),
                ..profile()
            },
        );

        save_config_to(&cfg, &path).unwrap();
        let loaded = load_config_from(&path).unwrap();

        assert_eq!(loaded, cfg);
        assert_eq!(loaded.profile_name(None), "home");
        assert_eq!(loaded.profile_name(Some("cabin")), "cabin");
        assert!(loaded.profile("home").is_ok());
        assert!(matches!(loaded.profile("cabin"), Err(ConfigError::ProfileNotFound { .. })));
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(loaded.defaults, Defaults::default());
        assert!(loaded.profiles.is_empty());
    }
}
