// Response classification
//
// Every portal data call passes through `classify` exactly once, right after
// the transport returns. Precedence matters: a 200 with the wrong content
// type is not a success, and a redirect is an outage even though 3xx is
// nominally fine.

use reqwest::StatusCode;

use crate::error::Error;

const ACCEPTED_CONTENT_TYPES: [&str; 2] = ["application/json", "application/octet-stream"];

/// Map a raw status/content type to success or a taxonomy error.
pub(crate) fn classify(status: StatusCode, content_type: Option<&str>, path: &str) -> Result<(), Error> {
    if status == StatusCode::OK && content_type.is_some_and(is_accepted_content_type) {
        return Ok(());
    }

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(Error::Unauthorized {
            status: status.as_u16(),
        });
    }

    if matches!(
        status,
        StatusCode::INTERNAL_SERVER_ERROR | StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE
    ) || status.is_redirection()
    {
        return Err(Error::ServiceUnavailable {
            status: status.as_u16(),
        });
    }

    let message = if status.is_success() {
        format!(
            "{path} returned HTTP {status} with content type {}",
            content_type.unwrap_or("<none>")
        )
    } else {
        format!("{path} returned HTTP {status}")
    };
    Err(Error::UnexpectedResponse { message })
}

fn is_accepted_content_type(raw: &str) -> bool {
    let essence = raw.split(';').next().unwrap_or_default().trim();
    ACCEPTED_CONTENT_TYPES
        .iter()
        .any(|accepted| essence.eq_ignore_ascii_case(accepted))
}
