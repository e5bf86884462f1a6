//! Tests for the OAuth connection lifecycle.

use rusqlite::Connection;
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::*;
use crate::store::init_schema;

const REDIRECT_URI: &str = "http://localhost:8787/callback";

fn unconfigured_manager() -> (ConnectionManager, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let conn = Connection::open(temp_dir.path().join("test.db")).unwrap();
    init_schema(&conn).unwrap();
    (ConnectionManager::new(SettingsStore::new(conn)), temp_dir)
}

fn configured_manager(base_url: &str) -> (ConnectionManager, TempDir) {
    let (manager, temp_dir) = unconfigured_manager();

    ConnectionSettings {
        client_id: "test_client".to_string(),
        client_secret: "test_secret".to_string(),
        api_base_url: base_url.to_string(),
        enabled: true,
        tls_verify: true,
    }
    .save(manager.store())
    .unwrap();

    (manager, temp_dir)
}

fn token_response(access: &str, refresh: &str, expires_in: i64) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "access_token": access,
        "refresh_token": refresh,
        "token_type": "Bearer",
        "expires_in": expires_in,
    }))
}

// ── predicates ───────────────────────────────────────────────────────

#[test]
fn is_configured_tracks_credentials() {
    let (manager, _dir) = unconfigured_manager();
    assert!(!manager.is_configured());

    let (manager, _dir) = configured_manager("https://api.kledo.example");
    assert!(manager.is_configured());
}

#[test]
fn is_connected_tracks_access_token() {
    let (manager, _dir) = configured_manager("https://api.kledo.example");
    assert!(!manager.is_connected());
    assert_eq!(manager.access_token(), None);

    manager
        .store()
        .store_token_set("token", "refresh", 0)
        .unwrap();
    assert!(manager.is_connected());
    assert_eq!(manager.access_token(), Some("token".to_string()));
}

// ── authorization URL ────────────────────────────────────────────────

#[test]
fn authorization_url_requires_configuration() {
    let (manager, _dir) = unconfigured_manager();

    let result = manager.authorization_url(REDIRECT_URI);
    assert!(matches!(result, Err(ConnectionError::NotConfigured)));
}

#[test]
fn authorization_url_embeds_state() {
    let (manager, _dir) = configured_manager("https://api.kledo.example/");

    let url = manager.authorization_url(REDIRECT_URI).unwrap();
    let state = manager
        .store()
        .get_transient(TRANSIENT_OAUTH_STATE)
        .unwrap()
        .expect("state transient should be stored");

    assert!(url.starts_with("https://api.kledo.example/oauth/authorize?"));
    assert!(url.contains("client_id=test_client"));
    assert!(url.contains("response_type=code"));
    assert!(url.contains(&format!(
        "redirect_uri={}",
        urlencoding::encode(REDIRECT_URI)
    )));
    assert!(url.contains(&format!("state={state}")));
}

#[test]
fn authorization_url_reuses_live_state() {
    let (manager, _dir) = configured_manager("https://api.kledo.example");

    let first = manager.authorization_url(REDIRECT_URI).unwrap();
    let second = manager.authorization_url(REDIRECT_URI).unwrap();

    assert_eq!(first, second);
}

#[test]
fn expired_state_is_replaced() {
    let (manager, _dir) = configured_manager("https://api.kledo.example");

    manager
        .store()
        .set_transient(TRANSIENT_OAUTH_STATE, "stale", -1)
        .unwrap();

    let url = manager.authorization_url(REDIRECT_URI).unwrap();
    assert!(!url.contains("state=stale"));
}

// ── code exchange ────────────────────────────────────────────────────

#[tokio::test]
async fn exchange_roundtrips_state_from_authorization_url() {
    let mock_server = MockServer::start().await;
    let (manager, _dir) = configured_manager(&mock_server.uri());

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("client_id=test_client"))
        .and(body_string_contains("code=authcode"))
        .respond_with(token_response("new_access", "new_refresh", 3600))
        .expect(1)
        .mount(&mock_server)
        .await;

    let url = manager.authorization_url(REDIRECT_URI).unwrap();
    let state = manager
        .store()
        .get_transient(TRANSIENT_OAUTH_STATE)
        .unwrap()
        .unwrap();
    assert!(url.contains(&format!("state={state}")));

    manager
        .exchange_code("authcode", &state, REDIRECT_URI)
        .await
        .unwrap();

    assert!(manager.is_connected());
    let tokens = manager.store().token_state().unwrap();
    assert_eq!(tokens.access_token, "new_access");
    assert_eq!(tokens.refresh_token, "new_refresh");
    assert!(tokens.expires_at.is_some());

    // The state was consumed; replaying the exchange must fail
    assert_eq!(
        manager
            .store()
            .get_transient(TRANSIENT_OAUTH_STATE)
            .unwrap(),
        None
    );
    let replay = manager.exchange_code("authcode", &state, REDIRECT_URI).await;
    assert!(matches!(replay, Err(ConnectionError::StateMismatch)));
}

#[tokio::test]
async fn exchange_rejects_mismatched_state() {
    let mock_server = MockServer::start().await;
    let (manager, _dir) = configured_manager(&mock_server.uri());

    // No token request may be attempted on a state mismatch
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(token_response("x", "y", 3600))
        .expect(0)
        .mount(&mock_server)
        .await;

    manager.authorization_url(REDIRECT_URI).unwrap();

    let result = manager
        .exchange_code("authcode", "wrong_state", REDIRECT_URI)
        .await;

    assert!(matches!(result, Err(ConnectionError::StateMismatch)));
    assert!(!manager.is_connected());
}

#[tokio::test]
async fn exchange_rejects_empty_code() {
    let (manager, _dir) = configured_manager("https://api.kledo.example");

    manager.authorization_url(REDIRECT_URI).unwrap();
    let state = manager
        .store()
        .get_transient(TRANSIENT_OAUTH_STATE)
        .unwrap()
        .unwrap();

    let result = manager.exchange_code("", &state, REDIRECT_URI).await;
    assert!(matches!(result, Err(ConnectionError::EmptyCode)));
}

#[tokio::test]
async fn failed_exchange_persists_nothing() {
    let mock_server = MockServer::start().await;
    let (manager, _dir) = configured_manager(&mock_server.uri());

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": "invalid_grant"
        })))
        .mount(&mock_server)
        .await;

    // Tokens from an earlier connection must survive the failed exchange
    manager
        .store()
        .store_token_set("old_access", "old_refresh", 1_700_000_000)
        .unwrap();

    manager.authorization_url(REDIRECT_URI).unwrap();
    let state = manager
        .store()
        .get_transient(TRANSIENT_OAUTH_STATE)
        .unwrap()
        .unwrap();

    let result = manager.exchange_code("badcode", &state, REDIRECT_URI).await;
    assert!(matches!(result, Err(ConnectionError::TokenExchangeFailed(_))));

    let tokens = manager.store().token_state().unwrap();
    assert_eq!(tokens.access_token, "old_access");
    assert_eq!(tokens.refresh_token, "old_refresh");
}

#[tokio::test]
async fn undecodable_exchange_response_is_an_error() {
    let mock_server = MockServer::start().await;
    let (manager, _dir) = configured_manager(&mock_server.uri());

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&mock_server)
        .await;

    manager.authorization_url(REDIRECT_URI).unwrap();
    let state = manager
        .store()
        .get_transient(TRANSIENT_OAUTH_STATE)
        .unwrap()
        .unwrap();

    let result = manager.exchange_code("authcode", &state, REDIRECT_URI).await;
    assert!(matches!(result, Err(ConnectionError::TokenExchangeFailed(_))));
    assert!(!manager.is_connected());
}

// ── refresh ──────────────────────────────────────────────────────────

#[tokio::test]
async fn refresh_without_stored_token_fails() {
    let (manager, _dir) = configured_manager("https://api.kledo.example");

    let result = manager.refresh_access_token().await;
    assert!(matches!(result, Err(ConnectionError::NoRefreshToken)));
}

#[tokio::test]
async fn refresh_overwrites_token_set() {
    let mock_server = MockServer::start().await;
    let (manager, _dir) = configured_manager(&mock_server.uri());

    manager
        .store()
        .store_token_set("old_access", "old_refresh", 100)
        .unwrap();

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=old_refresh"))
        .respond_with(token_response("new_access", "new_refresh", 3600))
        .expect(1)
        .mount(&mock_server)
        .await;

    manager.refresh_access_token().await.unwrap();

    let tokens = manager.store().token_state().unwrap();
    assert_eq!(tokens.access_token, "new_access");
    assert_eq!(tokens.refresh_token, "new_refresh");
}

#[tokio::test]
async fn failed_refresh_keeps_existing_tokens() {
    let mock_server = MockServer::start().await;
    let (manager, _dir) = configured_manager(&mock_server.uri());

    manager
        .store()
        .store_token_set("old_access", "old_refresh", 1_700_000_000)
        .unwrap();

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Server Error"))
        .mount(&mock_server)
        .await;

    let result = manager.refresh_access_token().await;
    assert!(matches!(result, Err(ConnectionError::RefreshFailed(_))));

    let tokens = manager.store().token_state().unwrap();
    assert_eq!(tokens.access_token, "old_access");
    assert_eq!(tokens.refresh_token, "old_refresh");
}

// ── disconnect ───────────────────────────────────────────────────────

#[test]
fn disconnect_clears_all_token_fields() {
    let (manager, _dir) = configured_manager("https://api.kledo.example");

    manager
        .store()
        .store_token_set("access", "refresh", 1_700_000_000)
        .unwrap();
    assert!(manager.is_connected());

    manager.disconnect().unwrap();

    assert!(!manager.is_connected());
    let tokens = manager.store().token_state().unwrap();
    assert_eq!(tokens.access_token, "");
    assert_eq!(tokens.refresh_token, "");
    assert_eq!(tokens.expires_at, None);
}

// ── expiry description ───────────────────────────────────────────────

#[test]
fn expiry_description_states() {
    let (manager, _dir) = configured_manager("https://api.kledo.example");

    // No expiry stored means the token never expires
    assert_eq!(manager.expiry_description(), "Does not expire");

    let store = manager.store();
    store.set_option("access_token", "token").unwrap();
    store.set_option("token_expires_at", "1000").unwrap();
    assert_eq!(manager.expiry_description(), "Expired");

    let future = Utc::now().timestamp() + 2 * 60 * 60;
    store
        .set_option("token_expires_at", &future.to_string())
        .unwrap();
    let description = manager.expiry_description();
    assert!(description.contains('('), "got: {description}");
    assert!(description.contains("hour"), "got: {description}");
}

#[test]
fn human_time_diff_units() {
    assert_eq!(human_time_diff(30), "less than a minute");
    assert_eq!(human_time_diff(60), "1 minute");
    assert_eq!(human_time_diff(5 * 60), "5 minutes");
    assert_eq!(human_time_diff(60 * 60), "1 hour");
    assert_eq!(human_time_diff(3 * 60 * 60), "3 hours");
    assert_eq!(human_time_diff(36 * 60 * 60), "1 day");
    assert_eq!(human_time_diff(5 * 24 * 60 * 60), "5 days");
}
