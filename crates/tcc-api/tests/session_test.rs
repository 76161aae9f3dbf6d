#![allow(clippy::unwrap_used)]
// Login handshake, rate-limit gate and session reuse, against wiremock.

use std::time::Duration;

use chrono::{TimeDelta, Utc};
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tcc_api::{ClientConfig, ComfortClient, Credentials, Error, RetryPolicy};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, ComfortClient) {
    let server = MockServer::start().await;
    let config = ClientConfig::default()
        .with_base_url(Url::parse(&server.uri()).unwrap())
        .with_retry(RetryPolicy::default().with_backoff_unit(Duration::from_millis(1)));
    let credentials = Credentials::new("user@example.com", "hunter2".to_string());
    let client = ComfortClient::new(credentials, config).unwrap();
    (server, client)
}

fn auth_cookie_response() -> ResponseTemplate {
    ResponseTemplate::new(302).insert_header("set-cookie", ".ASPXAUTH_TRUEHOME=token123; path=/; HttpOnly")
}

// ── Login ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_login_success_sets_session() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/portal"))
        .respond_with(auth_cookie_response())
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/portal"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client.login().await.unwrap();

    let session = client.session();
    assert!(session.is_authenticated());
    assert_eq!(session.generation(), 1);
    assert_eq!(session.null_cookie_count(), 0);
}

#[tokio::test]
async fn test_ensure_authenticated_after_login_makes_no_calls() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/portal"))
        .respond_with(auth_cookie_response())
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/portal"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client.login().await.unwrap();
    client.ensure_authenticated().await.unwrap();
    client.ensure_authenticated().await.unwrap();

    assert_eq!(client.session().generation(), 1);
}

#[tokio::test]
async fn test_login_401_is_authentication_error() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/portal"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let result = client.login().await;

    assert!(
        matches!(result, Err(Error::Authentication { .. })),
        "expected Authentication error, got: {result:?}"
    );
    assert!(!client.session().is_authenticated());
    assert_eq!(client.session().null_cookie_count(), 1);
}

#[tokio::test]
async fn test_login_server_error_is_connection_error() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/portal"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let result = client.login().await;

    assert!(
        matches!(result, Err(Error::Connection { .. })),
        "expected Connection error, got: {result:?}"
    );
    assert_eq!(client.session().null_cookie_count(), 0);
}

#[tokio::test]
async fn test_verification_clearing_cookie_is_rejection() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/portal"))
        .respond_with(auth_cookie_response())
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/portal"))
        .respond_with(
            ResponseTemplate::new(200).insert_header("set-cookie", ".ASPXAUTH_TRUEHOME=; path=/"),
        )
        .mount(&server)
        .await;

    let result = client.login().await;

    assert!(matches!(result, Err(Error::Authentication { .. })), "got: {result:?}");
    assert!(!client.session().is_authenticated());
}

// ── Rate limiting ───────────────────────────────────────────────────

#[tokio::test]
async fn test_three_cookieless_logins_arm_cooldown() {
    let (server, client) = setup().await;

    // 200 with no auth cookie: the portal's way of saying it is down.
    Mock::given(method("POST"))
        .and(path("/portal"))
        .respond_with(ResponseTemplate::new(200))
        .expect(3)
        .mount(&server)
        .await;

    for _ in 0..3 {
        let result = client.login().await;
        assert!(matches!(result, Err(Error::Authentication { .. })), "got: {result:?}");
    }
    assert_eq!(client.session().null_cookie_count(), 3);

    let allowed_at = client.session().next_login_allowed_at().await;
    assert!(allowed_at > Utc::now() + TimeDelta::minutes(9));

    // Fourth attempt is refused locally; `.expect(3)` checks no call went out.
    let result = client.login().await;
    match result {
        Err(Error::RateLimited { retry_at }) => assert_eq!(retry_at, allowed_at),
        other => panic!("expected RateLimited, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_rate_limited_request_makes_no_calls() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/portal"))
        .respond_with(ResponseTemplate::new(401))
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/portal/Device/CheckDataSession/1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    for _ in 0..3 {
        let _ = client.login().await;
    }

    let result = client.thermostat_data(1).await;
    assert!(matches!(result, Err(Error::RateLimited { .. })), "got: {result:?}");
}

#[tokio::test]
async fn test_set_credentials_drops_session() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/portal"))
        .respond_with(auth_cookie_response())
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/portal"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    client.login().await.unwrap();
    client
        .session()
        .set_credentials(Credentials::new("other@example.com", "pw".to_string()))
        .await;

    assert!(!client.session().is_authenticated());
    assert_eq!(client.session().username().await, "other@example.com");

    client.ensure_authenticated().await.unwrap();
    assert_eq!(client.session().generation(), 2);
}
