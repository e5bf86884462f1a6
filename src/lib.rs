//! Kledo Invoice Sync
//!
//! This library synchronizes completed store orders into the Kledo accounting
//! system as invoices: an OAuth2 connection manager, an authenticated API
//! client, the order → invoice payload mapping, and the HTTP surface for the
//! operator flows and the order-completed webhook.

pub mod connection;
pub mod error;
pub mod invoice_mapper;
pub mod kledo_api;
pub mod models;
pub mod notices;
pub mod order_sync;
pub mod settings;
pub mod store;
pub mod web;

pub use connection::ConnectionManager;
pub use error::{ApiError, ConnectionError};
pub use invoice_mapper::InvoiceMapper;
pub use kledo_api::{ApiRequest, ApiResponse, KledoApi};
pub use models::{InvoiceItem, InvoicePayload, Order, OrderItem};
pub use notices::{Notice, NoticeHandler};
pub use order_sync::OrderSync;
pub use settings::{ConnectionSettings, InvoiceSettings};
pub use store::{init_schema, SettingsStore};
