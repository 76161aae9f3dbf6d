use reqwest::header::{HeaderMap, SET_COOKIE};
use secrecy::SecretString;

/// Name of the portal's forms-authentication cookie.
pub const AUTH_COOKIE: &str = ".ASPXAUTH_TRUEHOME";

/// Username/password pair for the portal's form login.
///
/// Immutable once handed to a session. Replacing credentials means building
/// a new value and calling [`SessionManager::set_credentials`](crate::SessionManager::set_credentials).
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<SecretString>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// What a response said about the auth cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AuthCookie {
    /// No `Set-Cookie` for the auth cookie at all.
    Absent,
    /// The portal cleared the cookie (empty value). This is how it reports
    /// an outage during login.
    Cleared,
    /// A usable session token.
    Token(String),
}

/// Extract the auth cookie from raw `Set-Cookie` headers.
///
/// Parsed by hand because the portal emits an `expires` attribute the
/// cookie parser rejects, which would drop the cookie entirely. Only the
/// `name=value` pair is kept.
pub(crate) fn auth_cookie(headers: &HeaderMap) -> AuthCookie {
    let mut found = AuthCookie::Absent;
    for raw in headers.get_all(SET_COOKIE) {
        let Ok(raw) = raw.to_str() else { continue };
        let pair = raw.split(';').next().unwrap_or_default();
        let Some((name, value)) = pair.split_once('=') else {
            continue;
        };
        if name.trim() != AUTH_COOKIE {
            continue;
        }
        let value = value.trim().trim_matches('"');
        found = if value.is_empty() {
            AuthCookie::Cleared
        } else {
            AuthCookie::Token(value.to_owned())
        };
    }
    found
}

#[cfg(test)]
mod tests {
    use reqwest::header::HeaderValue;

    use super::*;

    fn headers(values: &[&str]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for v in values {
            map.append(SET_COOKIE, HeaderValue::from_str(v).expect("valid header"));
        }
        map
    }

    #[test]
    fn token_survives_malformed_expires() {
        let h = headers(&[
            "ASP.NET_SessionId=xyz; path=/; HttpOnly",
            ".ASPXAUTH_TRUEHOME=ABC123; expires=Mon, 01-Jan-0001 00:00:00 GMT+99; path=/",
        ]);
        assert_eq!(auth_cookie(&h), AuthCookie::Token("ABC123".into()));
    }

    #[test]
    fn empty_value_is_cleared() {
        let h = headers(&[".ASPXAUTH_TRUEHOME=; expires=Thu, 01-Jan-1970 00:00:00 GMT; path=/"]);
        assert_eq!(auth_cookie(&h), AuthCookie::Cleared);
    }

    #[test]
    fn other_cookies_only_is_absent() {
        let h = headers(&["ASP.NET_SessionId=xyz; path=/"]);
        assert_eq!(auth_cookie(&h), AuthCookie::Absent);
        assert_eq!(auth_cookie(&HeaderMap::new()), AuthCookie::Absent);
    }

    #[test]
    fn last_occurrence_wins() {
        let h = headers(&[".ASPXAUTH_TRUEHOME=first; path=/", ".ASPXAUTH_TRUEHOME=; path=/"]);
        assert_eq!(auth_cookie(&h), AuthCookie::Cleared);
    }
}
