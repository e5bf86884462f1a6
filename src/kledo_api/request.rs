//! Generic authenticated request plumbing.

use log::debug;
use reqwest::header::{HeaderMap, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Method, StatusCode};
use serde_json::Value;

use super::KledoApi;
use crate::error::ApiError;
use crate::settings::ConnectionSettings;

/// One API call in the making: endpoint path, method, query, and body.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    endpoint: String,
    method: Method,
    query: Vec<(String, String)>,
    body: Option<Value>,
}

impl ApiRequest {
    /// Start a GET request for the given endpoint path (no leading slash).
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            method: Method::GET,
            query: Vec::new(),
            body: None,
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Normalized API response.
///
/// The body is kept both raw and best-effort JSON-decoded; a body that fails
/// to decode leaves `json` as `None` rather than erroring.
#[derive(Debug)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub raw: String,
    pub json: Option<Value>,
}

impl ApiResponse {
    /// True for a well-formed response explicitly carrying `success: false`.
    ///
    /// This is the application-level failure signal, distinct from transport
    /// errors: callers get it as a normal value to branch on.
    pub fn is_logical_failure(&self) -> bool {
        self.json
            .as_ref()
            .and_then(|json| json.get("success"))
            .and_then(Value::as_bool)
            == Some(false)
    }
}

impl KledoApi {
    /// Perform one authenticated call.
    ///
    /// Fails with [`ApiError::NotConnected`] before any network activity when
    /// no access token is stored. Transport failures surface as
    /// [`ApiError::Transport`]; there is no retry.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let token = self.connection.access_token().ok_or(ApiError::NotConnected)?;

        let settings = ConnectionSettings::load(self.connection.store())?;
        let url = format!("{}/{}", settings.base_url(), request.endpoint);
        debug!("{} {}", request.method, url);

        let mut builder = self
            .client
            .request(request.method, &url)
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .header(ACCEPT, "application/json")
            .header(
                USER_AGENT,
                concat!("kledo-sync/", env!("CARGO_PKG_VERSION")),
            );

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;

        let status = response.status();
        let headers = response.headers().clone();
        let raw = response.text().await?;
        let json = serde_json::from_str(&raw).ok();

        debug!("Response status {status}, {} bytes", raw.len());

        Ok(ApiResponse {
            status,
            headers,
            raw,
            json,
        })
    }
}
