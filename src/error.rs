//! Error types for kledo_sync

use thiserror::Error;

/// Errors from the OAuth connection lifecycle.
///
/// A failed exchange or refresh never changes the stored token state; callers
/// can match on the variant to decide which operator notice to raise.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// Client id, client secret, or API base URL is missing
    #[error("OAuth credentials are not configured")]
    NotConfigured,
    /// Presented state does not match the stored CSRF state
    #[error("state parameter does not match the stored value")]
    StateMismatch,
    /// Authorization callback arrived without a code
    #[error("authorization code is empty")]
    EmptyCode,
    /// Token endpoint rejected the authorization code or was unreachable
    #[error("token exchange failed: {0}")]
    TokenExchangeFailed(String),
    /// Token endpoint rejected the refresh token or was unreachable
    #[error("token refresh failed: {0}")]
    RefreshFailed(String),
    /// Refresh requested but no refresh token is stored
    #[error("no refresh token stored")]
    NoRefreshToken,
    /// Settings database operation failed
    #[error("settings storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

/// Errors from authenticated Kledo API calls.
///
/// A well-formed response carrying `success: false` is not an error here; the
/// endpoint wrappers return it as `Ok(None)` so callers can branch on it.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Call attempted without a stored access token; no HTTP request is made
    #[error("not connected to the Kledo API")]
    NotConnected,
    /// Network-level failure (DNS, connect, timeout)
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// Request body could not be encoded
    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),
    /// Settings database operation failed
    #[error("settings storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}
