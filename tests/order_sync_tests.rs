//! End-to-end tests for the order-completed sync boundary.
//!
//! Drives `OrderSync` through the public API against a mocked Kledo server,
//! asserting the no-retry/no-propagation contract with call-count checks.

use chrono::{TimeZone, Utc};
use rusqlite::Connection;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use kledo_sync::{
    init_schema, ConnectionManager, ConnectionSettings, KledoApi, NoticeHandler, Order, OrderItem,
    OrderSync, SettingsStore,
};

struct TestHarness {
    store: SettingsStore,
    sync: OrderSync,
    notices: NoticeHandler,
    _dir: TempDir,
}

fn harness(base_url: &str, enabled: bool, connected: bool) -> TestHarness {
    let dir = TempDir::new().unwrap();
    let conn = Connection::open(dir.path().join("test.db")).unwrap();
    init_schema(&conn).unwrap();
    let store = SettingsStore::new(conn);

    ConnectionSettings {
        client_id: "test_client".to_string(),
        client_secret: "test_secret".to_string(),
        api_base_url: base_url.to_string(),
        enabled,
        tls_verify: true,
    }
    .save(&store)
    .unwrap();

    if connected {
        store.store_token_set("test_token", "test_refresh", 0).unwrap();
    }

    let api = KledoApi::new(ConnectionManager::new(store.clone()));
    let notices = NoticeHandler::new(store.clone());
    let sync = OrderSync::new(store.clone(), api, notices.clone());

    TestHarness {
        store,
        sync,
        notices,
        _dir: dir,
    }
}

fn completed_order() -> Order {
    Order {
        id: 77,
        billing_first_name: "Jane".to_string(),
        billing_last_name: "Doe".to_string(),
        billing_email: "jane@example.com".to_string(),
        billing_address: "Jl. Sudirman 1".to_string(),
        billing_phone: String::new(),
        customer_note: String::new(),
        shipping_total: 0.0,
        total_discount: 0.0,
        total_tax: 5.0,
        date_created: Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap(),
        date_completed: Some(Utc.with_ymd_and_hms(2024, 3, 2, 8, 0, 0).unwrap()),
        items: vec![OrderItem {
            name: "Blue Mug".to_string(),
            sku: "MUG-BLU".to_string(),
            description: String::new(),
            quantity: 1,
            regular_price: 12.0,
            sale_price: None,
            image_url: None,
        }],
    }
}

#[tokio::test]
async fn disabled_integration_is_a_no_op() {
    let mock_server = MockServer::start().await;
    let h = harness(&mock_server.uri(), false, true);

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(0)
        .mount(&mock_server)
        .await;

    h.sync.handle_order_completed(&completed_order()).await;

    assert!(h.notices.take_notices().unwrap().is_empty());
}

#[tokio::test]
async fn completed_order_creates_invoice() {
    let mock_server = MockServer::start().await;
    let h = harness(&mock_server.uri(), true, true);

    Mock::given(method("POST"))
        .and(path("/woocommerce/invoice"))
        .and(body_partial_json(serde_json::json!({
            "contact_name": "Jane Doe",
            "ref_number": 77,
            "has_tax": "yes"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "data": { "id": 9001 }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    h.sync.handle_order_completed(&completed_order()).await;

    let notices = h.notices.take_notices().unwrap();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].id, "invoice_created");
}

#[tokio::test]
async fn logical_failure_is_swallowed_without_retry() {
    let mock_server = MockServer::start().await;
    let h = harness(&mock_server.uri(), true, true);

    // Exactly one attempt, even though the API rejects it
    Mock::given(method("POST"))
        .and(path("/woocommerce/invoice"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": false,
            "message": "Warehouse not found"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    h.sync.handle_order_completed(&completed_order()).await;

    let notices = h.notices.take_notices().unwrap();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].id, "invoice_sync_failed");
}

#[tokio::test]
async fn transport_failure_is_swallowed() {
    // Nothing listens here; the call fails at the network level
    let h = harness("http://127.0.0.1:1", true, true);

    h.sync.handle_order_completed(&completed_order()).await;

    let notices = h.notices.take_notices().unwrap();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].id, "invoice_sync_failed");
}

#[tokio::test]
async fn missing_connection_is_reported_not_thrown() {
    let mock_server = MockServer::start().await;
    let h = harness(&mock_server.uri(), true, false);

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(0)
        .mount(&mock_server)
        .await;

    h.sync.handle_order_completed(&completed_order()).await;

    let notices = h.notices.take_notices().unwrap();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].id, "invoice_sync_failed");

    // The order event is acknowledged regardless; nothing was stored that
    // would block a later manual re-send
    assert!(h.store.token_state().unwrap().access_token.is_empty());
}
