//! Order input and invoice payload types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A completed store order, as delivered by the commerce platform's
/// order-completed event. Read-only input; never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: u64,
    #[serde(default)]
    pub billing_first_name: String,
    #[serde(default)]
    pub billing_last_name: String,
    #[serde(default)]
    pub billing_email: String,
    #[serde(default)]
    pub billing_address: String,
    #[serde(default)]
    pub billing_phone: String,
    #[serde(default)]
    pub customer_note: String,
    #[serde(default)]
    pub shipping_total: f64,
    #[serde(default)]
    pub total_discount: f64,
    #[serde(default)]
    pub total_tax: f64,
    pub date_created: DateTime<Utc>,
    #[serde(default)]
    pub date_completed: Option<DateTime<Utc>>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
}

/// One purchased line item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub name: String,
    #[serde(default)]
    pub sku: String,
    #[serde(default)]
    pub description: String,
    pub quantity: u32,
    pub regular_price: f64,
    #[serde(default)]
    pub sale_price: Option<f64>,
    /// Product image URL, when the store has one
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Invoice creation payload for `POST woocommerce/invoice`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoicePayload {
    pub contact_name: String,
    pub contact_email: String,
    pub contact_address: String,
    pub contact_phone: String,
    pub ref_number_prefix: String,
    pub ref_number: u64,
    pub trans_date: String,
    pub due_date: String,
    pub memo: String,
    /// "yes" when the order carried any tax, else "no"
    pub has_tax: String,
    pub items: Vec<InvoiceItem>,
    pub warehouse: String,
    pub shipping_cost: f64,
    pub additional_discount_amount: f64,
    /// "yes" only when the configured invoice status is "paid"; the account
    /// code below is only meaningful in that case
    pub paid: String,
    pub paid_to_account_code: String,
    pub tags: Vec<String>,
}

/// One invoice line item.
///
/// `photo` is always present in the serialized payload: a URL when the store
/// has a product image, JSON `null` otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceItem {
    pub name: String,
    pub code: String,
    pub desc: String,
    pub qty: u32,
    pub regular_price: f64,
    pub sale_price: Option<f64>,
    pub photo: Option<String>,
    pub category_name: String,
}
