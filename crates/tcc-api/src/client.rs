// Portal HTTP client
//
// Wraps `reqwest::Client` with URL construction, the shared session, and
// the retry loop every data call goes through. Endpoint methods live in
// `portal.rs` as inherent methods so this module stays about transport
// mechanics.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use reqwest::Method;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::auth::Credentials;
use crate::classify::classify;
use crate::error::Error;
use crate::retry::RetryPolicy;
use crate::session::SessionManager;
use crate::transport::TransportConfig;

/// Production portal root.
pub const DEFAULT_BASE_URL: &str = "https://mytotalconnectcomfort.com";

/// First value of the data-session cache buster, mirroring the
/// millisecond timestamps the portal's frontend sends.
const CACHE_BUSTER_SEED: u64 = 1_700_000_000_000;

/// Everything needed to build a [`ComfortClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: Url,
    pub transport: TransportConfig,
    pub retry: RetryPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).unwrap_or_else(|_| unreachable!()),
            transport: TransportConfig::default(),
            retry: RetryPolicy::default(),
        }
    }
}

impl ClientConfig {
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Client for one portal account.
///
/// Every data call goes through [`request_with_retry`](Self::request_with_retry):
/// authenticate if needed, send, classify, then recover (re-login, backoff)
/// or give up with a taxonomy error.
pub struct ComfortClient {
    http: reqwest::Client,
    base_url: Url,
    session: SessionManager,
    retry: RetryPolicy,
    cache_buster: AtomicU64,
}

impl ComfortClient {
    /// Create a client from a `ClientConfig`.
    ///
    /// A cookie jar is created if the transport config doesn't carry one;
    /// the session cookie lives there.
    pub fn new(credentials: Credentials, config: ClientConfig) -> Result<Self, Error> {
        let transport = if config.transport.cookie_jar.is_some() {
            config.transport
        } else {
            config.transport.with_cookie_jar()
        };
        let jar = transport
            .cookie_jar
            .clone()
            .ok_or_else(|| Error::Tls("cookie jar missing from transport config".into()))?;
        let http = transport.build_client()?;
        let session = SessionManager::new(http.clone(), config.base_url.clone(), Arc::clone(&jar), credentials);

        Ok(Self {
            http,
            base_url: config.base_url,
            session,
            retry: config.retry,
            cache_buster: AtomicU64::new(CACHE_BUSTER_SEED),
        })
    }

    /// The portal root URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The shared session.
    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// The default retry policy.
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Shorthand for [`SessionManager::login`].
    pub async fn login(&self) -> Result<(), Error> {
        self.session.login().await
    }

    /// Shorthand for [`SessionManager::ensure_authenticated`].
    pub async fn ensure_authenticated(&self) -> Result<(), Error> {
        self.session.ensure_authenticated().await
    }

    pub(crate) fn next_cache_buster(&self) -> u64 {
        self.cache_buster.fetch_add(1, Ordering::Relaxed)
    }

    /// Build a full URL for a portal path (which may carry a query string).
    pub(crate) fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// GET with the default retry policy.
    pub async fn get_json(&self, path: &str) -> Result<Value, Error> {
        self.request_with_retry(Method::GET, path, None, self.retry.max_attempts)
            .await
    }

    /// POST with the default retry policy.
    pub async fn post_json(&self, path: &str, payload: Option<&Value>) -> Result<Value, Error> {
        self.request_with_retry(Method::POST, path, payload, self.retry.max_attempts)
            .await
    }

    /// Send one logical request with re-authentication and bounded retry.
    ///
    /// At most `max_attempts` data calls are made. `Unauthorized` triggers
    /// a single-flight re-login; `ServiceUnavailable` and `Connection` back
    /// off exponentially. `Authentication` / `RateLimited` from the initial
    /// login are returned at once; from a re-login after a 401/403 they are
    /// returned once no attempts remain. Anything else is returned
    /// immediately.
    pub async fn request_with_retry(
        &self,
        method: Method,
        path: &str,
        payload: Option<&Value>,
        max_attempts: u32,
    ) -> Result<Value, Error> {
        let url = self.url(path)?;
        let policy = RetryPolicy {
            max_attempts,
            ..self.retry
        };
        let mut last_error: Option<Error> = None;

        for attempt in 0..max_attempts {
            let more = policy.has_attempts_after(attempt);
            let shown = attempt.saturating_add(1);

            let err = match self.session.ensure_authenticated().await {
                Ok(()) => {
                    let generation = self.session.generation();
                    match self.attempt(&method, &url, payload).await {
                        Ok(value) => return Ok(value),
                        Err(Error::Unauthorized { status }) => {
                            warn!(attempt = shown, max_attempts, status, path, "session rejected, re-authenticating");
                            self.session.invalidate(generation);
                            match self.session.reauthenticate(generation).await {
                                Ok(()) => {
                                    last_error = Some(Error::Unauthorized { status });
                                    continue;
                                }
                                Err(login_err) => login_err,
                            }
                        }
                        Err(other) => other,
                    }
                }
                // A rejected or rate-limited login will not succeed on retry.
                Err(login_err @ (Error::Authentication { .. } | Error::RateLimited { .. })) => {
                    return Err(login_err);
                }
                Err(login_err) => login_err,
            };

            match err {
                Error::Authentication { .. } | Error::RateLimited { .. } => {
                    if !more {
                        return Err(err);
                    }
                    warn!(attempt = shown, max_attempts, error = %err, path, "login failed during request");
                }
                ref e if e.is_transient() => {
                    warn!(attempt = shown, max_attempts, error = %e, path, "transient failure");
                }
                other => return Err(other),
            }

            last_error = Some(err);
            if more {
                let backoff = policy.delay_for_attempt(attempt);
                info!(backoff_ms = backoff.as_millis(), path, "waiting before retry");
                tokio::time::sleep(backoff).await;
            }
        }

        error!(max_attempts, path, "all retry attempts failed");
        Err(last_error.unwrap_or(Error::RetriesExhausted {
            attempts: max_attempts,
        }))
    }

    /// One authenticated attempt with no retry. A 401/403 still marks the
    /// session dead so the next caller re-logs in.
    pub(crate) async fn send_once(
        &self,
        method: Method,
        path: &str,
        payload: Option<&Value>,
    ) -> Result<Value, Error> {
        let url = self.url(path)?;
        self.session.ensure_authenticated().await?;
        let generation = self.session.generation();
        let result = self.attempt(&method, &url, payload).await;
        if matches!(result, Err(Error::Unauthorized { .. })) {
            self.session.invalidate(generation);
        }
        result
    }

    /// Issue the call, classify, and parse the JSON body.
    async fn attempt(&self, method: &Method, url: &Url, payload: Option<&Value>) -> Result<Value, Error> {
        debug!("{method} {url}");

        let mut builder = self.http.request(method.clone(), url.clone());
        if let Some(body) = payload {
            builder = builder.json(body);
        }
        let resp = builder.send().await.map_err(|e| Error::transport(&e))?;

        let status = resp.status();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        self.session.absorb_cookies(resp.headers());

        classify(status, content_type.as_deref(), url.path())?;
        self.session.note_success();

        let body = resp.bytes().await.map_err(|e| Error::transport(&e))?;
        if body.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&body).map_err(|e| {
            let preview = String::from_utf8_lossy(&body[..body.len().min(200)]).into_owned();
            Error::UnexpectedResponse {
                message: format!("invalid JSON from {}: {e} (body preview: {preview:?})", url.path()),
            }
        })
    }
}

impl std::fmt::Debug for ComfortClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComfortClient")
            .field("base_url", &self.base_url.as_str())
            .field("session", &self.session)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}
