//! Operator-facing notices.
//!
//! Connection and sync problems never surface to the storefront; they are
//! queued here for the admin surface to pick up. Notices persist in the
//! options store until read, so they survive the redirect hop of the OAuth
//! flow, and reading drains them.

use serde::{Deserialize, Serialize};

use crate::store::{DbResult, SettingsStore};

const OPT_NOTICES: &str = "admin_notices";

pub const NOTICE_SUCCESS: &str = "notice-success";
pub const NOTICE_ERROR: &str = "notice-error";

/// One dismissible message for the operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    /// Stable identifier; adding a notice with an existing id replaces it
    pub id: String,
    /// "notice-success" or "notice-error"
    pub class: String,
    pub message: String,
}

/// Store-backed notice queue. Cheap to clone.
#[derive(Clone)]
pub struct NoticeHandler {
    store: SettingsStore,
}

impl NoticeHandler {
    pub fn new(store: SettingsStore) -> Self {
        Self { store }
    }

    /// Queue a notice, replacing any pending notice with the same id.
    pub fn add_notice(&self, id: &str, class: &str, message: &str) -> DbResult<()> {
        let mut notices = self.pending()?;
        notices.retain(|n| n.id != id);
        notices.push(Notice {
            id: id.to_string(),
            class: class.to_string(),
            message: message.to_string(),
        });

        self.save(&notices)
    }

    /// Read and clear all pending notices.
    pub fn take_notices(&self) -> DbResult<Vec<Notice>> {
        let notices = self.pending()?;
        if !notices.is_empty() {
            self.store.delete_option(OPT_NOTICES)?;
        }
        Ok(notices)
    }

    fn pending(&self) -> DbResult<Vec<Notice>> {
        let raw = self.store.get_option(OPT_NOTICES)?;
        Ok(raw
            .and_then(|value| serde_json::from_str(&value).ok())
            .unwrap_or_default())
    }

    fn save(&self, notices: &[Notice]) -> DbResult<()> {
        let encoded = serde_json::to_string(notices).unwrap_or_else(|_| "[]".to_string());
        self.store.set_option(OPT_NOTICES, &encoded)
    }
}
