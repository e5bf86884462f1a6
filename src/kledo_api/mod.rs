//! Kledo API client.
//!
//! Authenticated REST calls against the configured Kledo workspace: account
//! suggestions, warehouse listing, and invoice creation, all built on the
//! generic request plumbing in [`request`].

mod accounts;
mod invoices;
mod request;
mod warehouses;

pub use request::{ApiRequest, ApiResponse};

use reqwest::Client;

use crate::connection::{http_client, ConnectionManager};
use crate::settings::ConnectionSettings;

/// Client for authenticated Kledo API calls.
///
/// Every call is a fresh round trip; there is no response caching. Cheap to
/// clone; clones share the connection manager and its settings store.
#[derive(Clone)]
pub struct KledoApi {
    pub(crate) client: Client,
    pub(crate) connection: ConnectionManager,
}

impl KledoApi {
    pub fn new(connection: ConnectionManager) -> Self {
        let tls_verify = ConnectionSettings::load(connection.store())
            .map(|s| s.tls_verify)
            .unwrap_or(true);

        Self {
            client: http_client(tls_verify),
            connection,
        }
    }
}

#[cfg(test)]
#[path = "tests/mod.rs"]
mod tests;
