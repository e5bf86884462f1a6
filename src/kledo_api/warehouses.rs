//! Warehouse listing for the invoice warehouse lookup.

use log::warn;
use serde_json::Value;

use super::{ApiRequest, KledoApi};
use crate::error::ApiError;

impl KledoApi {
    /// Fetch the full warehouse list.
    ///
    /// Returns `Ok(None)` when the API answers with `success: false`.
    pub async fn warehouses(&self) -> Result<Option<Value>, ApiError> {
        let response = self.send(ApiRequest::new("finance/warehouses")).await?;

        if response.is_logical_failure() {
            warn!("Warehouse request was rejected: {}", response.raw);
            return Ok(None);
        }

        Ok(response.json)
    }
}
