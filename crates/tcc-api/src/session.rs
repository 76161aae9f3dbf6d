// Session manager
//
// Owns the credentials, the authenticated flag, the login rate-limit gate
// and the cookie jar the HTTP client reads from. Login handshakes are
// serialised behind one async mutex so concurrent 401s collapse into a
// single re-login; the authenticated flag and session generation are
// atomics so the already-authenticated fast path never waits.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use chrono::{DateTime, TimeDelta, Utc};
use reqwest::StatusCode;
use reqwest::cookie::Jar;
use reqwest::header::HeaderMap;
use secrecy::ExposeSecret;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

use crate::auth::{AUTH_COOKIE, AuthCookie, Credentials, auth_cookie};
use crate::error::Error;

/// Rejected or cookie-less logins tolerated before the cooldown kicks in.
pub const MAX_FAILED_LOGINS: u32 = 3;

/// Minutes login stays locked once [`MAX_FAILED_LOGINS`] is reached.
pub const LOGIN_COOLDOWN_MINUTES: i64 = 10;

const LOGIN_PATH: &str = "/portal";

/// Browser timezone offset the portal's login form posts (minutes).
const TIME_OFFSET: &str = "480";

struct SessionState {
    credentials: Credentials,
    next_login_allowed_at: DateTime<Utc>,
}

/// Authentication state for one portal account.
///
/// Shared by every request path (poll cycles and commands alike). See the
/// module notes for the locking discipline.
pub struct SessionManager {
    http: reqwest::Client,
    base_url: Url,
    jar: Arc<Jar>,
    authenticated: AtomicBool,
    /// Bumped on every successful login. Requests remember the generation
    /// they were sent under so a late 401 cannot tear down a newer session.
    generation: AtomicU64,
    null_cookie_count: AtomicU32,
    state: Mutex<SessionState>,
}

impl SessionManager {
    /// Create an unauthenticated session. `http` must have been built with
    /// `jar` as its cookie provider.
    pub fn new(http: reqwest::Client, base_url: Url, jar: Arc<Jar>, credentials: Credentials) -> Self {
        Self {
            http,
            base_url,
            jar,
            authenticated: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            null_cookie_count: AtomicU32::new(0),
            state: Mutex::new(SessionState {
                credentials,
                next_login_allowed_at: Utc::now(),
            }),
        }
    }

    // ── Accessors ────────────────────────────────────────────────────

    /// Whether the last known session is presumed valid.
    pub fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::Acquire)
    }

    /// Current session generation (0 until the first successful login).
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Consecutive logins that were rejected or came back without a cookie.
    pub fn null_cookie_count(&self) -> u32 {
        self.null_cookie_count.load(Ordering::Acquire)
    }

    /// Earliest instant `login()` will touch the network again.
    pub async fn next_login_allowed_at(&self) -> DateTime<Utc> {
        self.state.lock().await.next_login_allowed_at
    }

    pub async fn username(&self) -> String {
        self.state.lock().await.credentials.username.clone()
    }

    // ── State transitions ────────────────────────────────────────────

    /// Perform the login handshake unconditionally (subject to the rate
    /// limit gate).
    pub async fn login(&self) -> Result<(), Error> {
        let mut state = self.state.lock().await;
        self.login_locked(&mut state).await
    }

    /// Log in only if the session is not already presumed valid. Cheap
    /// enough to call before every request.
    pub async fn ensure_authenticated(&self) -> Result<(), Error> {
        if self.is_authenticated() {
            return Ok(());
        }
        let mut state = self.state.lock().await;
        // Another task may have finished a login while we waited.
        if self.is_authenticated() {
            return Ok(());
        }
        info!("not authenticated, logging in");
        self.login_locked(&mut state).await
    }

    /// Re-login after a request sent under `observed_generation` was
    /// rejected. If a newer session already exists the call is a no-op,
    /// which keeps concurrent 401s from stampeding the login endpoint.
    pub async fn reauthenticate(&self, observed_generation: u64) -> Result<(), Error> {
        let mut state = self.state.lock().await;
        if self.is_authenticated() && self.generation() != observed_generation {
            debug!("session already renewed by another request");
            return Ok(());
        }
        self.login_locked(&mut state).await
    }

    /// Mark the session dead after a 401/403 on a request sent under
    /// `observed_generation`.
    pub fn invalidate(&self, observed_generation: u64) {
        if self.generation() == observed_generation {
            self.authenticated.store(false, Ordering::Release);
        }
    }

    /// Replace the credentials wholesale. The current session is dropped;
    /// the rate-limit gate is left alone.
    pub async fn set_credentials(&self, credentials: Credentials) {
        let mut state = self.state.lock().await;
        state.credentials = credentials;
        self.null_cookie_count.store(0, Ordering::Release);
        self.authenticated.store(false, Ordering::Release);
    }

    /// Called after any successful data request.
    pub(crate) fn note_success(&self) {
        self.null_cookie_count.store(0, Ordering::Release);
    }

    /// Re-store a rotated auth cookie from a data response.
    pub(crate) fn absorb_cookies(&self, headers: &HeaderMap) {
        if let AuthCookie::Token(token) = auth_cookie(headers) {
            self.store_auth_cookie(&token);
        }
    }

    // ── Handshake ────────────────────────────────────────────────────

    async fn login_locked(&self, state: &mut SessionState) -> Result<(), Error> {
        let now = Utc::now();
        if now < state.next_login_allowed_at {
            let wait = state.next_login_allowed_at - now;
            warn!(wait_secs = wait.num_seconds(), "login refused by rate limit");
            return Err(Error::RateLimited {
                retry_at: state.next_login_allowed_at,
            });
        }

        self.authenticated.store(false, Ordering::Release);
        let url = self.base_url.join(LOGIN_PATH)?;
        let username = state.credentials.username.clone();

        debug!(user = %username, "logging in at {}", url);

        let form = [
            ("timeOffset", TIME_OFFSET),
            ("UserName", username.as_str()),
            ("Password", state.credentials.password.expose_secret()),
            ("RememberMe", "false"),
        ];
        let resp = self
            .http
            .post(url.clone())
            .form(&form)
            .send()
            .await
            .map_err(|e| Error::transport(&e))?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(self.reject(state, format!("login as {username} failed (HTTP 401)")));
        }
        if status != StatusCode::OK && !status.is_redirection() {
            warn!(%status, "connection error during login");
            return Err(Error::Connection {
                message: format!("login returned HTTP {status}"),
            });
        }

        match auth_cookie(resp.headers()) {
            AuthCookie::Token(token) => self.store_auth_cookie(&token),
            AuthCookie::Absent | AuthCookie::Cleared => {
                return Err(self.reject(
                    state,
                    format!("login returned HTTP {status} without an auth cookie -- portal may be down"),
                ));
            }
        }

        // Verify the session actually took.
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| Error::transport(&e))?;
        let status = resp.status();

        if auth_cookie(resp.headers()) == AuthCookie::Cleared {
            return Err(self.reject(
                state,
                format!("login verification cleared the auth cookie (HTTP {status})"),
            ));
        }
        if status == StatusCode::UNAUTHORIZED {
            return Err(self.reject(state, "login verification failed (HTTP 401)".into()));
        }
        if status != StatusCode::OK && !status.is_redirection() {
            warn!(%status, "connection error during login verification");
            return Err(Error::Connection {
                message: format!("login verification returned HTTP {status}"),
            });
        }

        self.null_cookie_count.store(0, Ordering::Release);
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.authenticated.store(true, Ordering::Release);
        info!(user = %username, "logged in");
        Ok(())
    }

    /// Record a rejected or cookie-less login and arm the cooldown once the
    /// threshold is reached.
    fn reject(&self, state: &mut SessionState, message: String) -> Error {
        self.authenticated.store(false, Ordering::Release);
        let failures = self.null_cookie_count.fetch_add(1, Ordering::AcqRel).saturating_add(1);
        if failures >= MAX_FAILED_LOGINS {
            state.next_login_allowed_at = Utc::now() + TimeDelta::minutes(LOGIN_COOLDOWN_MINUTES);
            warn!(
                failures,
                retry_at = %state.next_login_allowed_at,
                "too many failed logins, pausing login attempts"
            );
        }
        warn!(failures, "{message}");
        Error::Authentication { message }
    }

    fn store_auth_cookie(&self, token: &str) {
        self.jar
            .add_cookie_str(&format!("{AUTH_COOKIE}={token}; Path=/"), &self.base_url);
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("base_url", &self.base_url.as_str())
            .field("authenticated", &self.is_authenticated())
            .field("generation", &self.generation())
            .finish_non_exhaustive()
    }
}
