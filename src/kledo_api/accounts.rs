//! Finance account suggestions for the payment-account lookup.

use log::warn;
use serde_json::Value;

use super::{ApiRequest, KledoApi};
use crate::error::ApiError;

/// Account categories offered as payment targets (cash and bank).
const ACCOUNT_CATEGORY_IDS: &str = "1,17";

impl KledoApi {
    /// Paginated account search.
    ///
    /// Returns `Ok(None)` when the API answers with `success: false`; only
    /// transport-level problems are errors.
    pub async fn accounts_suggestion(
        &self,
        search: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Option<Value>, ApiError> {
        let mut request = ApiRequest::new("finance/accounts/suggestionPerPage")
            .query("finance_account_category_ids", ACCOUNT_CATEGORY_IDS)
            .query("page", page.to_string())
            .query("per_page", per_page.to_string());

        if !search.trim().is_empty() {
            request = request.query("search", search);
        }

        let response = self.send(request).await?;

        if response.is_logical_failure() {
            warn!("Account suggestion request was rejected: {}", response.raw);
            return Ok(None);
        }

        Ok(response.json)
    }
}
