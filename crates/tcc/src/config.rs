//! CLI configuration: thin wrapper around `tcc_config`.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides
//! (--url, --username, --password, --timeout).

use std::time::Duration;

use secrecy::SecretString;

use tcc_core::AccountConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use tcc_config::{
    Config, Defaults, Profile, config_path, load_config_or_default, save_config, store_password,
};

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    config.profile_name(global.profile.as_deref()).to_owned()
}

/// Build the `AccountConfig` for this invocation: profile (if any), then
/// flag and env overrides. Also returns the profile name for error help.
pub fn resolve_account(global: &GlobalOpts) -> Result<(AccountConfig, String), CliError> {
    let cfg = load_config_or_default();
    let profile_name = active_profile_name(global, &cfg);

    let mut account = match cfg.profiles.get(&profile_name) {
        Some(profile) => resolve_profile(profile, &profile_name, &cfg.defaults, global)?,
        None if global.username.is_none() && global.password.is_none() => {
            return Err(CliError::NoConfig {
                path: config_path().display().to_string(),
            });
        }
        None => resolve_profile(&Profile::default(), &profile_name, &cfg.defaults, global)?,
    };

    if let Some(ref raw) = global.url {
        account.url = raw.parse().map_err(|_| CliError::Validation {
            field: "url".into(),
            reason: format!("invalid URL: {raw}"),
        })?;
    }
    if let Some(secs) = global.timeout {
        account.timeout = Duration::from_secs(secs);
    }

    Ok((account, profile_name))
}

/// Profile + credential flags. A `--password` flag (or `TCC_PASSWORD`)
/// short-circuits the keyring / plaintext chain.
fn resolve_profile(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
    global: &GlobalOpts,
) -> Result<AccountConfig, CliError> {
    let username = global.username.clone().or_else(|| profile.username.clone());

    if let Some(ref password) = global.password {
        let username = username.ok_or_else(|| CliError::NoCredentials {
            profile: profile_name.into(),
        })?;
        let account = tcc_config::build_account_config(
            profile,
            defaults,
            username,
            SecretString::from(password.clone()),
        )?;
        return Ok(account);
    }

    let profile = Profile {
        username,
        ..profile.clone()
    };
    Ok(tcc_config::profile_to_account_config(&profile, profile_name, defaults)?)
}
