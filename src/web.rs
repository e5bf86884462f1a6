//! Admin and webhook HTTP surface.
//!
//! JSON endpoints for the operator flows (connect/callback/disconnect/refresh,
//! settings, notices, account and warehouse lookups) plus the order-completed
//! webhook that drives invoice sync.

use anyhow::Context;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::connection::ConnectionManager;
use crate::error::{ApiError, ConnectionError};
use crate::kledo_api::KledoApi;
use crate::models::Order;
use crate::notices::{Notice, NoticeHandler, NOTICE_ERROR, NOTICE_SUCCESS};
use crate::order_sync::OrderSync;
use crate::settings::{ConnectionSettings, InvoiceSettings};
use crate::store::SettingsStore;

const ACCOUNTS_PER_PAGE: u32 = 10;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: SettingsStore,
    pub connection: ConnectionManager,
    pub api: KledoApi,
    pub sync: OrderSync,
    pub notices: NoticeHandler,
    /// Public base URL of this service, used to build the OAuth redirect URI
    pub public_url: String,
}

impl AppState {
    pub fn new(store: SettingsStore, public_url: String) -> Self {
        let connection = ConnectionManager::new(store.clone());
        let api = KledoApi::new(connection.clone());
        let notices = NoticeHandler::new(store.clone());
        let sync = OrderSync::new(store.clone(), api.clone(), notices.clone());

        Self {
            store,
            connection,
            api,
            sync,
            notices,
            public_url,
        }
    }

    fn redirect_uri(&self) -> String {
        format!("{}/callback", self.public_url.trim_end_matches('/'))
    }
}

/// API response wrapper
#[derive(Serialize)]
pub struct ApiEnvelope<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiEnvelope<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Serialize)]
struct ConnectionStatus {
    configured: bool,
    connected: bool,
    token_expiry: String,
}

/// One entry for the admin lookup dropdowns.
#[derive(Debug, PartialEq, Serialize)]
pub struct SelectItem {
    pub id: String,
    pub text: String,
}

#[derive(Serialize)]
struct AccountLookup {
    items: Vec<SelectItem>,
    page: u64,
    per_page: u64,
    total: u64,
}

#[derive(Serialize)]
struct WarehouseLookup {
    items: Vec<SelectItem>,
}

#[derive(Serialize, Deserialize)]
pub struct SettingsPayload {
    pub connection: ConnectionSettings,
    pub invoice: InvoiceSettings,
}

#[derive(Deserialize)]
struct CallbackParams {
    #[serde(default)]
    code: String,
    #[serde(default)]
    state: String,
}

#[derive(Deserialize)]
struct AccountParams {
    #[serde(default)]
    keyword: String,
    #[serde(default = "default_page")]
    page: u32,
}

fn default_page() -> u32 {
    1
}

fn connection_status(connection: &ConnectionManager) -> ConnectionStatus {
    ConnectionStatus {
        configured: connection.is_configured(),
        connected: connection.is_connected(),
        token_expiry: connection.expiry_description(),
    }
}

/// GET / - connection status summary (also the landing spot after the OAuth
/// redirect hops)
async fn root_handler(State(state): State<AppState>) -> Json<ApiEnvelope<Value>> {
    let status = connection_status(&state.connection);
    Json(ApiEnvelope::ok(serde_json::json!({
        "service": "kledo-sync",
        "configured": status.configured,
        "connected": status.connected,
    })))
}

/// GET /status
async fn status_handler(State(state): State<AppState>) -> Json<ApiEnvelope<ConnectionStatus>> {
    Json(ApiEnvelope::ok(connection_status(&state.connection)))
}

/// GET /connect - send the operator's browser to the authorization page
async fn connect_handler(State(state): State<AppState>) -> Response {
    match state.connection.authorization_url(&state.redirect_uri()) {
        Ok(url) => Redirect::temporary(&url).into_response(),
        Err(e) => {
            log::warn!("Cannot start authorization: {e}");
            (
                StatusCode::CONFLICT,
                Json(ApiEnvelope::<()>::err(e.to_string())),
            )
                .into_response()
        }
    }
}

/// GET /callback?code=&state= - the redirect target the provider calls after
/// the operator authorizes the app
async fn callback_handler(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Redirect {
    let redirect_uri = state.redirect_uri();

    match state
        .connection
        .exchange_code(&params.code, &params.state, &redirect_uri)
        .await
    {
        Ok(()) => {
            add_notice(
                &state,
                "connected",
                NOTICE_SUCCESS,
                "Successfully connected to the Kledo app.",
            );
            Redirect::temporary("/?action=connected")
        }
        Err(ConnectionError::StateMismatch) => {
            add_notice(
                &state,
                "invalid_state",
                NOTICE_ERROR,
                "State parameter not valid. Please request a new token again.",
            );
            Redirect::temporary("/?action=invalid-state")
        }
        Err(e) => {
            log::error!("Authorization code exchange failed: {e}");
            add_notice(
                &state,
                "authorization_failed",
                NOTICE_ERROR,
                "There was a problem converting the authorization code. Please try again later.",
            );
            Redirect::temporary("/?action=error")
        }
    }
}

/// POST /disconnect
async fn disconnect_handler(State(state): State<AppState>) -> Response {
    match state.connection.disconnect() {
        Ok(()) => {
            add_notice(
                &state,
                "disconnected",
                NOTICE_SUCCESS,
                "Successfully disconnected the connection.",
            );
            Json(ApiEnvelope::ok("disconnected")).into_response()
        }
        Err(e) => {
            log::error!("Disconnect failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiEnvelope::<()>::err(e.to_string())),
            )
                .into_response()
        }
    }
}

/// POST /refresh
async fn refresh_handler(State(state): State<AppState>) -> Response {
    match state.connection.refresh_access_token().await {
        Ok(()) => {
            add_notice(
                &state,
                "token_refreshed",
                NOTICE_SUCCESS,
                "Successfully refreshed the access token.",
            );
            Json(ApiEnvelope::ok("refreshed")).into_response()
        }
        Err(e @ (ConnectionError::NoRefreshToken | ConnectionError::NotConfigured)) => (
            StatusCode::CONFLICT,
            Json(ApiEnvelope::<()>::err(e.to_string())),
        )
            .into_response(),
        Err(e) => {
            log::error!("Token refresh failed: {e}");
            add_notice(
                &state,
                "refresh_failed",
                NOTICE_ERROR,
                "There was a problem refreshing the access token. Please disconnect and request a new token.",
            );
            (
                StatusCode::BAD_GATEWAY,
                Json(ApiEnvelope::<()>::err(e.to_string())),
            )
                .into_response()
        }
    }
}

/// GET /api/accounts?keyword=&page= - payment-account lookup
async fn accounts_handler(
    State(state): State<AppState>,
    Query(params): Query<AccountParams>,
) -> Response {
    match state
        .api
        .accounts_suggestion(&params.keyword, params.page, ACCOUNTS_PER_PAGE)
        .await
    {
        Ok(Some(json)) => {
            let data = &json["data"];
            let items = account_items(data);
            let total = data["total"].as_u64().unwrap_or(items.len() as u64);
            Json(AccountLookup {
                items,
                page: data["current_page"].as_u64().unwrap_or(1),
                per_page: data["per_page"].as_u64().unwrap_or(u64::from(ACCOUNTS_PER_PAGE)),
                total,
            })
            .into_response()
        }
        Ok(None) => (
            StatusCode::BAD_GATEWAY,
            Json(ApiEnvelope::<()>::err("account lookup was rejected")),
        )
            .into_response(),
        Err(e) => api_error_response(e),
    }
}

/// GET /api/warehouses - warehouse lookup
async fn warehouses_handler(State(state): State<AppState>) -> Response {
    match state.api.warehouses().await {
        Ok(Some(json)) => Json(WarehouseLookup {
            items: warehouse_items(&json["data"]),
        })
        .into_response(),
        Ok(None) => (
            StatusCode::BAD_GATEWAY,
            Json(ApiEnvelope::<()>::err("warehouse lookup was rejected")),
        )
            .into_response(),
        Err(e) => api_error_response(e),
    }
}

/// GET /api/notices - drain pending operator notices
async fn notices_handler(
    State(state): State<AppState>,
) -> Result<Json<ApiEnvelope<Vec<Notice>>>, StatusCode> {
    match state.notices.take_notices() {
        Ok(notices) => Ok(Json(ApiEnvelope::ok(notices))),
        Err(e) => {
            log::error!("Could not read notices: {e}");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// GET /api/settings
async fn settings_get_handler(
    State(state): State<AppState>,
) -> Result<Json<ApiEnvelope<SettingsPayload>>, StatusCode> {
    let payload = SettingsPayload {
        connection: ConnectionSettings::load(&state.store).map_err(storage_error)?,
        invoice: InvoiceSettings::load(&state.store).map_err(storage_error)?,
    };

    Ok(Json(ApiEnvelope::ok(payload)))
}

/// PUT /api/settings
async fn settings_put_handler(
    State(state): State<AppState>,
    Json(payload): Json<SettingsPayload>,
) -> Result<Json<ApiEnvelope<&'static str>>, StatusCode> {
    payload.connection.save(&state.store).map_err(storage_error)?;
    payload.invoice.save(&state.store).map_err(storage_error)?;

    log::info!("Settings updated");
    Ok(Json(ApiEnvelope::ok("saved")))
}

/// POST /webhooks/order-completed - order event intake
///
/// Always acknowledges once the body parses; sync failures stay on this side
/// of the fence as logs and notices.
async fn order_completed_handler(
    State(state): State<AppState>,
    Json(order): Json<Order>,
) -> Json<ApiEnvelope<&'static str>> {
    log::debug!("Received order-completed event for order {}", order.id);
    state.sync.handle_order_completed(&order).await;

    Json(ApiEnvelope::ok("accepted"))
}

fn add_notice(state: &AppState, id: &str, class: &str, message: &str) {
    if let Err(e) = state.notices.add_notice(id, class, message) {
        log::error!("Could not store notice: {e}");
    }
}

fn storage_error(e: rusqlite::Error) -> StatusCode {
    log::error!("Settings storage error: {e}");
    StatusCode::INTERNAL_SERVER_ERROR
}

fn api_error_response(e: ApiError) -> Response {
    let status = match e {
        ApiError::NotConnected => StatusCode::CONFLICT,
        _ => StatusCode::BAD_GATEWAY,
    };
    (status, Json(ApiEnvelope::<()>::err(e.to_string()))).into_response()
}

/// Lookup rows come back as `data.data` with `name` and `ref_code`; the
/// dropdown value carries both as "CODE | Name".
fn account_items(data: &Value) -> Vec<SelectItem> {
    data["data"]
        .as_array()
        .map(|rows| {
            rows.iter()
                .filter_map(|row| {
                    let name = row["name"].as_str()?;
                    let code = row["ref_code"].as_str()?;
                    let value = format!("{code} | {name}");
                    Some(SelectItem {
                        id: value.clone(),
                        text: value,
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

fn warehouse_items(data: &Value) -> Vec<SelectItem> {
    data["data"]
        .as_array()
        .map(|rows| {
            rows.iter()
                .filter_map(|row| {
                    let name = row["name"].as_str()?;
                    Some(SelectItem {
                        id: name.to_string(),
                        text: name.to_string(),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Build the HTTP router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/status", get(status_handler))
        .route("/connect", get(connect_handler))
        .route("/callback", get(callback_handler))
        .route("/disconnect", post(disconnect_handler))
        .route("/refresh", post(refresh_handler))
        .route("/api/accounts", get(accounts_handler))
        .route("/api/warehouses", get(warehouses_handler))
        .route("/api/notices", get(notices_handler))
        .route(
            "/api/settings",
            get(settings_get_handler).put(settings_put_handler),
        )
        .route("/webhooks/order-completed", post(order_completed_handler))
        .with_state(state)
}

/// Start the HTTP server (async), shutting down cleanly on ctrl-c.
pub async fn serve(state: AppState, port: u16) -> anyhow::Result<()> {
    let app = create_router(state);
    let addr = format!("0.0.0.0:{port}");

    log::info!("kledo_sync listening on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    log::info!("Shutting down");
}
