//! `tcc check`: log in once and report whether the credentials work.

use serde::Serialize;

use tcc_api::Error as ApiError;
use tcc_core::{Controller, CoreError};

use crate::cli::GlobalOpts;
use crate::config;
use crate::error::CliError;
use crate::output;

/// Outcome class of a login attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckResult {
    Ok,
    InvalidAuth,
    RateLimited,
    CannotConnect,
    Unknown,
}

impl CheckResult {
    fn classify(err: &ApiError) -> Self {
        match err {
            ApiError::Authentication { .. } | ApiError::Unauthorized { .. } => Self::InvalidAuth,
            ApiError::RateLimited { .. } => Self::RateLimited,
            e if e.is_transient()
                || matches!(
                    e,
                    ApiError::Tls(_) | ApiError::InvalidUrl(_) | ApiError::RetriesExhausted { .. }
                ) =>
            {
                Self::CannotConnect
            }
            _ => Self::Unknown,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::InvalidAuth => "invalid_auth",
            Self::RateLimited => "rate_limited",
            Self::CannotConnect => "cannot_connect",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Serialize)]
struct CheckReport {
    profile: String,
    url: String,
    username: String,
    result: CheckResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

fn detail(report: &CheckReport) -> String {
    let result = match report.result {
        CheckResult::Ok => output::success("ok"),
        other => output::warning(other.label()),
    };
    let mut lines = vec![
        format!("Profile:  {}", report.profile),
        format!("Portal:   {}", report.url),
        format!("Account:  {}", report.username),
        format!("Result:   {result}"),
    ];
    if let Some(ref message) = report.message {
        lines.push(format!("Detail:   {message}"));
    }
    lines.join("\n")
}

pub async fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let (account, profile) = config::resolve_account(global)?;
    let mut report = CheckReport {
        profile: profile.clone(),
        url: account.url.to_string(),
        username: account.username.clone(),
        result: CheckResult::Ok,
        message: None,
    };

    let controller = Controller::new(account).map_err(|e| CliError::from_core(e, &profile))?;
    let outcome = controller.client().login().await;

    if let Err(ref e) = outcome {
        tracing::debug!(error = %e, "credential check failed");
        report.result = CheckResult::classify(e);
        report.message = Some(e.to_string());
    }

    let rendered = output::render_single(global.output, &report, detail, |r| r.result.label().to_owned())?;
    output::print_output(&rendered, global.quiet);

    outcome.map_err(|e| CliError::from_core(CoreError::Api(e), &profile))
}
