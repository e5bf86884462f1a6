//! Order-completed handling.
//!
//! One outbound invoice per completed order, handled inline with the event.
//! Failures are logged and queued as operator notices; they are never retried
//! and never propagate back to the event source, so order completion in the
//! store is unaffected.

use log::{debug, error, info};

use crate::invoice_mapper::InvoiceMapper;
use crate::kledo_api::KledoApi;
use crate::models::Order;
use crate::notices::{NoticeHandler, NOTICE_ERROR, NOTICE_SUCCESS};
use crate::settings::{ConnectionSettings, InvoiceSettings};
use crate::store::SettingsStore;

/// Listens for completed orders and creates the matching Kledo invoice.
#[derive(Clone)]
pub struct OrderSync {
    store: SettingsStore,
    api: KledoApi,
    notices: NoticeHandler,
}

impl OrderSync {
    pub fn new(store: SettingsStore, api: KledoApi, notices: NoticeHandler) -> Self {
        Self {
            store,
            api,
            notices,
        }
    }

    /// Handle one order-completed event.
    ///
    /// No-op while the integration is disabled. Never fails: every outcome is
    /// reduced to logs and notices.
    pub async fn handle_order_completed(&self, order: &Order) {
        let enabled = match ConnectionSettings::load(&self.store) {
            Ok(settings) => settings.enabled,
            Err(e) => {
                error!("Could not load connection settings: {e}");
                return;
            }
        };

        if !enabled {
            debug!("Invoice sync disabled, skipping order {}", order.id);
            return;
        }

        let invoice_settings = match InvoiceSettings::load(&self.store) {
            Ok(settings) => settings,
            Err(e) => {
                error!("Could not load invoice settings: {e}");
                return;
            }
        };

        let payload = InvoiceMapper::new(invoice_settings).map_order(order);

        match self.api.create_invoice(&payload).await {
            Ok(Some(_)) => {
                info!("Created Kledo invoice for order {}", order.id);
                self.notice(
                    "invoice_created",
                    NOTICE_SUCCESS,
                    &format!("Invoice for order {} was created in Kledo.", order.id),
                );
            }
            Ok(None) => {
                error!("Kledo rejected the invoice for order {}", order.id);
                self.notice(
                    "invoice_sync_failed",
                    NOTICE_ERROR,
                    &format!(
                        "Kledo rejected the invoice for order {}. Check the invoice settings.",
                        order.id
                    ),
                );
            }
            Err(e) => {
                error!("Invoice sync for order {} failed: {e}", order.id);
                self.notice(
                    "invoice_sync_failed",
                    NOTICE_ERROR,
                    &format!("Invoice sync for order {} failed: {e}", order.id),
                );
            }
        }
    }

    fn notice(&self, id: &str, class: &str, message: &str) {
        if let Err(e) = self.notices.add_notice(id, class, message) {
            error!("Could not store notice: {e}");
        }
    }
}
