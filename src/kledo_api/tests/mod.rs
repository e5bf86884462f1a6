//! Unit tests for the Kledo API client.


use rusqlite::Connection;
use tempfile::TempDir;

use super::KledoApi;
use crate::connection::ConnectionManager;
use crate::settings::ConnectionSettings;
use crate::store::{init_schema, SettingsStore};

pub const TEST_TOKEN: &str = "test_token";

fn store_with_base(base_url: &str) -> (SettingsStore, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let conn = Connection::open(temp_dir.path().join("test.db")).unwrap();
    init_schema(&conn).unwrap();
    let store = SettingsStore::new(conn);

    ConnectionSettings {
        client_id: "test_client".to_string(),
        client_secret: "test_secret".to_string(),
        api_base_url: base_url.to_string(),
        enabled: true,
        tls_verify: true,
    }
    .save(&store)
    .unwrap();

    (store, temp_dir)
}

/// API client with a stored access token, pointed at the mock server.
pub fn connected_api(base_url: &str) -> (KledoApi, TempDir) {
    let (store, temp_dir) = store_with_base(base_url);
    store
        .store_token_set(TEST_TOKEN, "test_refresh", 0)
        .unwrap();

    (KledoApi::new(ConnectionManager::new(store)), temp_dir)
}

/// API client without any stored token.
pub fn disconnected_api(base_url: &str) -> (KledoApi, TempDir) {
    let (store, temp_dir) = store_with_base(base_url);
    (KledoApi::new(ConnectionManager::new(store)), temp_dir)
}
