//! Token manager lifecycle tests against a mock identity provider.


use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use url::Url;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use xerosync::oauth::{CodeProvider, TokenManager};
use xerosync::{Error, SettingsStore};

/// Test double that hands out a canned authorization code.
struct CannedCode {
    code: &'static str,
    calls: AtomicUsize,
}

impl CannedCode {
    fn new(code: &'static str) -> Self {
        Self {
            code,
            calls: AtomicUsize::new(0),
        }
    }
}

impl CodeProvider for CannedCode {
    fn authorization_code(&self, authorize_url: &Url) -> xerosync::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        // The manager must always ask for a refresh token.
        assert!(
            authorize_url.as_str().contains("offline_access"),
            "authorize URL is missing the offline_access scope: {authorize_url}"
        );
        Ok(self.code.to_string())
    }
}

fn expires_in(seconds: i64) -> String {
    (OffsetDateTime::now_utc() + time::Duration::seconds(seconds))
        .format(&Rfc3339)
        .unwrap()
}

fn token_body(access: &str, refresh: &str) -> serde_json::Value {
    serde_json::json!({
        "access_token": access,
        "token_type": "bearer",
        "expires_in": 1800,
        "refresh_token": refresh,
    })
}

fn store_with(
    name: &str,
    access: &str,
    refresh: &str,
    expiration: &str,
) -> Result<(SettingsStore, std::path::PathBuf)> {
    let path = test_utils::temp_config_path(name);
    std::fs::write(&path, test_utils::config_json(access, refresh, expiration))?;
    Ok((SettingsStore::load(&path)?, path))
}

#[tokio::test]
async fn valid_token_is_reused_without_any_network_call() -> Result<()> {
    test_utils::do_setup();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/connect/token"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let (mut store, path) =
        store_with("reuse", "stored-access", "stored-refresh", &expires_in(600))?;

    let provider = CannedCode::new("unused");
    let token = TokenManager::new(&mut store, provider)
        .with_token_url(Url::parse(&format!("{}/connect/token", server.uri()))?)
        .ensure_valid_token()
        .await?;

    assert_eq!(token, "stored-access");

    std::fs::remove_file(path).ok();
    Ok(())
}

#[tokio::test]
async fn expiring_token_is_refreshed_exactly_once_and_persisted() -> Result<()> {
    test_utils::do_setup();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/connect/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(token_body("fresh-access", "rotated-refresh")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (mut store, path) =
        store_with("refresh", "stale-access", "stored-refresh", &expires_in(60))?;

    let provider = CannedCode::new("unused");
    let token = TokenManager::new(&mut store, provider)
        .with_token_url(Url::parse(&format!("{}/connect/token", server.uri()))?)
        .ensure_valid_token()
        .await?;

    assert_eq!(token, "fresh-access");

    // The new token state must have been written back before the token was
    // handed out.
    let persisted: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
    assert_eq!(persisted["Xero"]["AccessToken"], "fresh-access");
    assert_eq!(persisted["Xero"]["RefreshToken"], "rotated-refresh");
    assert_ne!(persisted["Xero"]["TokenExpiration"], "");

    std::fs::remove_file(path).ok();
    Ok(())
}

#[tokio::test]
async fn failed_refresh_falls_back_to_manual_authorization() -> Result<()> {
    test_utils::do_setup();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/connect/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(serde_json::json!({"error": "invalid_grant"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/connect/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=canned-code"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(token_body("manual-access", "manual-refresh")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (mut store, path) =
        store_with("fallback", "stale-access", "revoked-refresh", &expires_in(-60))?;

    let provider = CannedCode::new("canned-code");
    let token = {
        let mut manager = TokenManager::new(&mut store, provider)
            .with_token_url(Url::parse(&format!("{}/connect/token", server.uri()))?);
        manager.ensure_valid_token().await?
    };

    assert_eq!(token, "manual-access");
    let persisted: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
    assert_eq!(persisted["Xero"]["RefreshToken"], "manual-refresh");

    std::fs::remove_file(path).ok();
    Ok(())
}

#[tokio::test]
async fn missing_refresh_token_goes_straight_to_manual_flow() -> Result<()> {
    test_utils::do_setup();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/connect/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(token_body("first-access", "first-refresh")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (mut store, path) = store_with("first-auth", "", "", "")?;

    let provider = CannedCode::new("canned-code");
    let mut manager = TokenManager::new(&mut store, provider)
        .with_token_url(Url::parse(&format!("{}/connect/token", server.uri()))?);
    let token = manager.ensure_valid_token().await?;

    assert_eq!(token, "first-access");

    std::fs::remove_file(path).ok();
    Ok(())
}

#[tokio::test]
async fn failed_code_exchange_is_fatal() -> Result<()> {
    test_utils::do_setup();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/connect/token"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(serde_json::json!({"error": "invalid_client"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (mut store, path) = store_with("fatal", "", "", "")?;

    let provider = CannedCode::new("canned-code");
    let mut manager = TokenManager::new(&mut store, provider)
        .with_token_url(Url::parse(&format!("{}/connect/token", server.uri()))?);
    let err = manager.ensure_valid_token().await.unwrap_err();

    assert!(matches!(err, Error::AuthExchange(_)));

    std::fs::remove_file(path).ok();
    Ok(())
}

#[tokio::test]
async fn persistence_failure_does_not_abort_the_run() -> Result<()> {
    test_utils::do_setup();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/connect/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(token_body("fresh-access", "rotated-refresh")),
        )
        .expect(1)
        .mount(&server)
        .await;

    // Put the config inside a directory we delete after loading, so the
    // write-back has nowhere to land.
    let dir = test_utils::temp_config_path("doomed-dir");
    std::fs::create_dir(&dir)?;
    let path = dir.join("config.json");
    std::fs::write(
        &path,
        test_utils::config_json("stale-access", "stored-refresh", &expires_in(60)),
    )?;
    let mut store = SettingsStore::load(&path)?;
    std::fs::remove_dir_all(&dir)?;

    let provider = CannedCode::new("unused");
    let token = TokenManager::new(&mut store, provider)
        .with_token_url(Url::parse(&format!("{}/connect/token", server.uri()))?)
        .ensure_valid_token()
        .await?;

    // The write failed, but the in-memory token is still served.
    assert_eq!(token, "fresh-access");
    Ok(())
}
