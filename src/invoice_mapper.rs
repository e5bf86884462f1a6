//! Order → invoice payload mapping.

use crate::models::{InvoiceItem, InvoicePayload, Order, OrderItem};
use crate::settings::InvoiceSettings;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Builds Kledo invoice payloads from completed orders.
///
/// Mapping is a pure structural transform: the same order and settings always
/// produce an identical payload. No I/O happens here.
pub struct InvoiceMapper {
    settings: InvoiceSettings,
}

impl InvoiceMapper {
    pub fn new(settings: InvoiceSettings) -> Self {
        Self { settings }
    }

    pub fn map_order(&self, order: &Order) -> InvoicePayload {
        InvoicePayload {
            contact_name: customer_name(order),
            contact_email: order.billing_email.clone(),
            contact_address: order.billing_address.clone(),
            contact_phone: order.billing_phone.clone(),
            ref_number_prefix: self.settings.invoice_prefix.clone(),
            ref_number: order.id,
            trans_date: order.date_created.format(DATE_FORMAT).to_string(),
            // Orders are synced on completion, but a missing completed date
            // falls back to the created date rather than failing the sync.
            due_date: order
                .date_completed
                .unwrap_or(order.date_created)
                .format(DATE_FORMAT)
                .to_string(),
            memo: order.customer_note.clone(),
            has_tax: yes_no(order.total_tax > 0.0),
            items: order.items.iter().map(map_item).collect(),
            warehouse: self.settings.warehouse.clone(),
            shipping_cost: order.shipping_total,
            additional_discount_amount: order.total_discount,
            paid: self.settings.paid_status().to_string(),
            paid_to_account_code: self.settings.payment_account_code(),
            tags: self.settings.tag_list(),
        }
    }
}

/// Trimmed "first last"; collapses to an empty string when both are absent.
fn customer_name(order: &Order) -> String {
    format!("{} {}", order.billing_first_name, order.billing_last_name)
        .trim()
        .to_string()
}

fn yes_no(value: bool) -> String {
    if value { "yes" } else { "no" }.to_string()
}

fn map_item(item: &OrderItem) -> InvoiceItem {
    InvoiceItem {
        name: item.name.clone(),
        code: item.sku.clone(),
        desc: item.description.clone(),
        qty: item.quantity,
        regular_price: item.regular_price,
        sale_price: item.sale_price,
        photo: item.image_url.clone(),
        category_name: "WooCommerce".to_string(),
    }
}

#[cfg(test)]
#[path = "invoice_mapper_tests.rs"]
mod tests;
