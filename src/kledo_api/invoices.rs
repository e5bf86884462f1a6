//! Invoice creation.

use log::{debug, warn};
use reqwest::Method;
use serde_json::Value;

use super::{ApiRequest, KledoApi};
use crate::error::ApiError;
use crate::models::InvoicePayload;

impl KledoApi {
    /// Create an invoice from a mapped order payload.
    ///
    /// Returns `Ok(None)` when the API answers with `success: false`; the
    /// caller decides how to surface that.
    pub async fn create_invoice(
        &self,
        payload: &InvoicePayload,
    ) -> Result<Option<Value>, ApiError> {
        debug!(
            "Creating invoice {}{} for \"{}\"",
            payload.ref_number_prefix, payload.ref_number, payload.contact_name
        );

        let request = ApiRequest::new("woocommerce/invoice")
            .method(Method::POST)
            .body(serde_json::to_value(payload)?);

        let response = self.send(request).await?;

        if response.is_logical_failure() {
            warn!(
                "Invoice creation for order {} was rejected: {}",
                payload.ref_number, response.raw
            );
            return Ok(None);
        }

        Ok(response.json)
    }
}
