//! OAuth2 connection lifecycle against the Kledo identity endpoints.
//!
//! Owns the authorization-code dance: building the browser authorization URL
//! (with a short-lived CSRF state), exchanging the callback code for tokens,
//! refreshing, and disconnecting. Tokens live in the settings store; a failed
//! exchange or refresh leaves whatever was stored untouched.

use std::time::Duration;

use chrono::Utc;
use log::{debug, info, warn};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ConnectionError;
use crate::settings::ConnectionSettings;
use crate::store::{DbResult, SettingsStore, TokenState};

const TRANSIENT_OAUTH_STATE: &str = "oauth_state";
const STATE_TTL_SECS: i64 = 5 * 60;
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Token endpoint response for both grant types.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
}

/// Build the outbound HTTP client.
///
/// Certificate verification is only relaxed when the operator explicitly
/// disabled `tls_verify`.
pub(crate) fn http_client(tls_verify: bool) -> Client {
    let mut builder = Client::builder().timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS));

    if !tls_verify {
        warn!("TLS certificate verification is disabled for outbound calls");
        builder = builder.danger_accept_invalid_certs(true);
    }

    builder.build().unwrap_or_else(|_| Client::new())
}

/// Manages the OAuth connection to a single Kledo workspace.
///
/// Cheap to clone; clones share the settings store.
#[derive(Clone)]
pub struct ConnectionManager {
    store: SettingsStore,
    client: Client,
}

impl ConnectionManager {
    pub fn new(store: SettingsStore) -> Self {
        let tls_verify = ConnectionSettings::load(&store)
            .map(|s| s.tls_verify)
            .unwrap_or(true);
        let client = http_client(tls_verify);

        Self { store, client }
    }

    pub fn store(&self) -> &SettingsStore {
        &self.store
    }

    /// True when client id, client secret, and base URL are all set.
    pub fn is_configured(&self) -> bool {
        ConnectionSettings::load(&self.store)
            .map(|s| s.is_configured())
            .unwrap_or(false)
    }

    /// True when an access token is stored.
    pub fn is_connected(&self) -> bool {
        matches!(self.store.token_state(), Ok(tokens) if !tokens.access_token.is_empty())
    }

    /// The stored access token, or `None` when not connected.
    pub fn access_token(&self) -> Option<String> {
        match self.store.token_state() {
            Ok(tokens) if !tokens.access_token.is_empty() => Some(tokens.access_token),
            _ => None,
        }
    }

    /// Build the browser authorization URL.
    ///
    /// Reuses the current CSRF state if one is still live, otherwise creates
    /// a fresh one with a five-minute expiry. Pure construction; no network
    /// call happens here.
    pub fn authorization_url(&self, redirect_uri: &str) -> Result<String, ConnectionError> {
        let settings = ConnectionSettings::load(&self.store)?;
        if !settings.is_configured() {
            return Err(ConnectionError::NotConfigured);
        }

        let state = self.oauth_state()?;

        let params = [
            ("client_id", settings.client_id.as_str()),
            ("redirect_uri", redirect_uri),
            ("response_type", "code"),
            ("scope", ""),
            ("state", state.as_str()),
        ];
        let query = params
            .iter()
            .map(|(name, value)| format!("{name}={}", urlencoding::encode(value)))
            .collect::<Vec<_>>()
            .join("&");

        Ok(format!("{}/oauth/authorize?{}", settings.base_url(), query))
    }

    /// Exchange an authorization code for tokens.
    ///
    /// The presented state must match the stored CSRF state; a consumed or
    /// expired state never validates. Tokens are only persisted on a clean
    /// HTTP 200, after which the state is deleted so it cannot be replayed.
    pub async fn exchange_code(
        &self,
        code: &str,
        state: &str,
        redirect_uri: &str,
    ) -> Result<(), ConnectionError> {
        let settings = ConnectionSettings::load(&self.store)?;
        if !settings.is_configured() {
            return Err(ConnectionError::NotConfigured);
        }

        match self.store.get_transient(TRANSIENT_OAUTH_STATE)? {
            Some(expected) if expected == state => {}
            _ => return Err(ConnectionError::StateMismatch),
        }

        if code.is_empty() {
            return Err(ConnectionError::EmptyCode);
        }

        let token_url = format!("{}/oauth/token", settings.base_url());
        debug!("Exchanging authorization code at {token_url}");

        let response = self
            .client
            .post(&token_url)
            .form(&[
                ("grant_type", "authorization_code"),
                ("client_id", settings.client_id.as_str()),
                ("client_secret", settings.client_secret.as_str()),
                ("redirect_uri", redirect_uri),
                ("code", code),
            ])
            .send()
            .await
            .map_err(|e| ConnectionError::TokenExchangeFailed(e.to_string()))?;

        if response.status() != StatusCode::OK {
            return Err(ConnectionError::TokenExchangeFailed(format!(
                "token endpoint returned {}",
                response.status()
            )));
        }

        let tokens: TokenResponse = response
            .json()
            .await
            .map_err(|e| ConnectionError::TokenExchangeFailed(e.to_string()))?;

        self.store_tokens(&tokens)?;
        self.store.delete_transient(TRANSIENT_OAUTH_STATE)?;

        info!("Connected to Kledo (token expires in {}s)", tokens.expires_in);
        Ok(())
    }

    /// Obtain a new token set using the stored refresh token.
    ///
    /// Existing tokens survive a failed refresh.
    pub async fn refresh_access_token(&self) -> Result<(), ConnectionError> {
        let settings = ConnectionSettings::load(&self.store)?;
        if !settings.is_configured() {
            return Err(ConnectionError::NotConfigured);
        }

        let refresh_token = self.store.token_state()?.refresh_token;
        if refresh_token.is_empty() {
            return Err(ConnectionError::NoRefreshToken);
        }

        let token_url = format!("{}/oauth/token", settings.base_url());
        debug!("Refreshing access token at {token_url}");

        let response = self
            .client
            .post(&token_url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.as_str()),
                ("client_id", settings.client_id.as_str()),
                ("client_secret", settings.client_secret.as_str()),
                ("scope", ""),
            ])
            .send()
            .await
            .map_err(|e| ConnectionError::RefreshFailed(e.to_string()))?;

        if response.status() != StatusCode::OK {
            return Err(ConnectionError::RefreshFailed(format!(
                "token endpoint returned {}",
                response.status()
            )));
        }

        let tokens: TokenResponse = response
            .json()
            .await
            .map_err(|e| ConnectionError::RefreshFailed(e.to_string()))?;

        self.store_tokens(&tokens)?;

        info!("Refreshed access token (expires in {}s)", tokens.expires_in);
        Ok(())
    }

    /// Clear the stored token set. All three fields go in one transaction.
    pub fn disconnect(&self) -> Result<(), ConnectionError> {
        self.store.clear_tokens()?;
        info!("Disconnected from Kledo");
        Ok(())
    }

    /// Human-readable token expiry for the status display.
    ///
    /// An unset expiry means the token does not expire — that is the stored
    /// semantic, not an unknown.
    pub fn expiry_description(&self) -> String {
        let expires_at = match self.store.token_state() {
            Ok(TokenState {
                expires_at: Some(ts),
                ..
            }) => ts,
            _ => return "Does not expire".to_string(),
        };

        let now = Utc::now().timestamp();
        if now > expires_at {
            return "Expired".to_string();
        }

        let date = chrono::DateTime::from_timestamp(expires_at, 0)
            .map(|dt| dt.format("%Y-%m-%d").to_string())
            .unwrap_or_default();

        format!("{date} ({})", human_time_diff(expires_at - now))
    }

    /// Current CSRF state, creating a fresh five-minute transient if the
    /// previous one expired or was consumed.
    fn oauth_state(&self) -> DbResult<String> {
        if let Some(state) = self.store.get_transient(TRANSIENT_OAUTH_STATE)? {
            return Ok(state);
        }

        let state = Uuid::new_v4().simple().to_string();
        self.store
            .set_transient(TRANSIENT_OAUTH_STATE, &state, STATE_TTL_SECS)?;

        Ok(state)
    }

    fn store_tokens(&self, tokens: &TokenResponse) -> DbResult<()> {
        let expires_at = Utc::now().timestamp() + tokens.expires_in;
        self.store
            .store_token_set(&tokens.access_token, &tokens.refresh_token, expires_at)
    }
}

/// Coarse relative-time string ("5 minutes", "2 hours", "3 days").
fn human_time_diff(seconds: i64) -> String {
    let seconds = seconds.max(0);

    if seconds < 60 {
        "less than a minute".to_string()
    } else if seconds < 60 * 60 {
        plural(seconds / 60, "minute")
    } else if seconds < 60 * 60 * 24 {
        plural(seconds / (60 * 60), "hour")
    } else {
        plural(seconds / (60 * 60 * 24), "day")
    }
}

fn plural(count: i64, unit: &str) -> String {
    if count == 1 {
        format!("1 {unit}")
    } else {
        format!("{count} {unit}s")
    }
}

#[cfg(test)]
#[path = "connection_tests.rs"]
mod tests;
