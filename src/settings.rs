//! Typed plugin settings loaded from the options store.
//!
//! Settings are persisted as individual named options so they can be updated
//! one screen at a time, but the rest of the code only ever sees these
//! validated structs.

use serde::{Deserialize, Serialize};

use crate::store::{DbResult, SettingsStore};

const OPT_CLIENT_ID: &str = "client_id";
const OPT_CLIENT_SECRET: &str = "client_secret";
const OPT_API_BASE_URL: &str = "api_base_url";
const OPT_ENABLE_SYNC: &str = "enable_sync";
const OPT_TLS_VERIFY: &str = "tls_verify";

const OPT_INVOICE_PREFIX: &str = "invoice_prefix";
const OPT_INVOICE_STATUS: &str = "invoice_status";
const OPT_PAYMENT_ACCOUNT: &str = "invoice_payment_account";
const OPT_WAREHOUSE: &str = "invoice_warehouse";
const OPT_TAGS: &str = "invoice_tags";

fn truthy(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "yes" | "true" | "1")
}

fn bool_option(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

/// OAuth credentials and connection behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionSettings {
    pub client_id: String,
    pub client_secret: String,
    pub api_base_url: String,
    /// Master switch for order-completed invoice sync
    pub enabled: bool,
    /// TLS certificate verification on outbound calls; on unless explicitly
    /// disabled
    pub tls_verify: bool,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            api_base_url: String::new(),
            enabled: false,
            tls_verify: true,
        }
    }
}

impl ConnectionSettings {
    pub fn load(store: &SettingsStore) -> DbResult<Self> {
        Ok(Self {
            client_id: store.get_option(OPT_CLIENT_ID)?.unwrap_or_default(),
            client_secret: store.get_option(OPT_CLIENT_SECRET)?.unwrap_or_default(),
            api_base_url: store.get_option(OPT_API_BASE_URL)?.unwrap_or_default(),
            enabled: store
                .get_option(OPT_ENABLE_SYNC)?
                .map(|v| truthy(&v))
                .unwrap_or(false),
            tls_verify: store
                .get_option(OPT_TLS_VERIFY)?
                .map(|v| truthy(&v))
                .unwrap_or(true),
        })
    }

    pub fn save(&self, store: &SettingsStore) -> DbResult<()> {
        store.set_option(OPT_CLIENT_ID, &self.client_id)?;
        store.set_option(OPT_CLIENT_SECRET, &self.client_secret)?;
        store.set_option(OPT_API_BASE_URL, &self.api_base_url)?;
        store.set_option(OPT_ENABLE_SYNC, bool_option(self.enabled))?;
        store.set_option(OPT_TLS_VERIFY, bool_option(self.tls_verify))
    }

    /// True when client id, client secret, and base URL are all present.
    pub fn is_configured(&self) -> bool {
        !self.client_id.is_empty()
            && !self.client_secret.is_empty()
            && !self.api_base_url.is_empty()
    }

    /// Base URL with any trailing slash stripped, ready for path joining.
    pub fn base_url(&self) -> &str {
        self.api_base_url.trim_end_matches('/')
    }
}

/// How created invoices are filled in.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InvoiceSettings {
    /// Reference-number prefix, combined with the order id
    pub invoice_prefix: String,
    /// "paid" or "unpaid"; compared case-insensitively
    pub invoice_status: String,
    /// Payment account as picked from the lookup, stored as "CODE | Name"
    pub payment_account: String,
    pub warehouse: String,
    /// Single comma-separated string, split into a list for the payload
    pub tags: String,
}

impl InvoiceSettings {
    pub fn load(store: &SettingsStore) -> DbResult<Self> {
        Ok(Self {
            invoice_prefix: store.get_option(OPT_INVOICE_PREFIX)?.unwrap_or_default(),
            invoice_status: store.get_option(OPT_INVOICE_STATUS)?.unwrap_or_default(),
            payment_account: store.get_option(OPT_PAYMENT_ACCOUNT)?.unwrap_or_default(),
            warehouse: store.get_option(OPT_WAREHOUSE)?.unwrap_or_default(),
            tags: store.get_option(OPT_TAGS)?.unwrap_or_default(),
        })
    }

    pub fn save(&self, store: &SettingsStore) -> DbResult<()> {
        store.set_option(OPT_INVOICE_PREFIX, &self.invoice_prefix)?;
        store.set_option(OPT_INVOICE_STATUS, &self.invoice_status)?;
        store.set_option(OPT_PAYMENT_ACCOUNT, &self.payment_account)?;
        store.set_option(OPT_WAREHOUSE, &self.warehouse)?;
        store.set_option(OPT_TAGS, &self.tags)
    }

    /// "yes" when the configured status is "paid" (any casing), else "no".
    pub fn paid_status(&self) -> &'static str {
        if self.invoice_status.eq_ignore_ascii_case("paid") {
            "yes"
        } else {
            "no"
        }
    }

    /// Account code extracted from the stored "CODE | Name" value.
    ///
    /// A value without a delimiter is used whole; an unset value yields an
    /// empty string. Never panics.
    pub fn payment_account_code(&self) -> String {
        self.payment_account
            .split('|')
            .next()
            .map(str::trim)
            .unwrap_or("")
            .to_string()
    }

    /// Tags split on commas, each trimmed. An unset value yields no tags.
    pub fn tag_list(&self) -> Vec<String> {
        if self.tags.trim().is_empty() {
            return Vec::new();
        }

        self.tags.split(',').map(|t| t.trim().to_string()).collect()
    }
}
