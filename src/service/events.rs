//! Event ingress bindings (spec §6).
//!
//! The wider governance platform's event bus invokes these four operations
//! when APIs are created, updated, deleted, or change lifecycle status.
//! The bus itself, its event type strings, and how it maps them onto these
//! calls are all out of scope (spec §1) — the binding layer the host
//! platform owns does that mapping. This module only defines what the core
//! does once invoked.

use crate::core::errors::Result;
use crate::service::SignatureService;

/// Lifecycle states an API can carry. Only [`ApiLifecycleStatus::Published`]
/// triggers indexing (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiLifecycleStatus {
    /// Drafted but not yet published; not indexed.
    Created,
    /// Live and eligible for duplicate detection against.
    Published,
    /// Taken out of service; not indexed (existing entries are untouched
    /// by a status change alone — removal is a separate `on_api_delete`).
    Deprecated,
    /// Fully retired.
    Retired,
}

impl SignatureService {
    /// Invoked when a new API is created. Indexes it immediately.
    pub fn on_api_create(&self, spec_text: &str, api_id: &str, tenant: &str) -> Result<()> {
        self.index_api(spec_text, api_id, tenant)
    }

    /// Invoked when an existing API's specification changes.
    pub fn on_api_update(&self, spec_text: &str, api_id: &str, tenant: &str) -> Result<()> {
        self.update_api(spec_text, api_id, tenant)
    }

    /// Invoked when an API is deleted from the registry.
    pub fn on_api_delete(&self, api_id: &str, tenant: &str) -> Result<()> {
        self.remove_api(api_id, tenant)
    }

    /// Invoked on any lifecycle transition. Only a transition into
    /// [`ApiLifecycleStatus::Published`] triggers indexing (spec §6); every
    /// other status is a no-op from this core's perspective.
    pub fn on_api_lifecycle_change(
        &self,
        status: ApiLifecycleStatus,
        spec_text: &str,
        api_id: &str,
        tenant: &str,
    ) -> Result<()> {
        if status == ApiLifecycleStatus::Published {
            self.index_api(spec_text, api_id, tenant)
        } else {
            Ok(())
        }
    }
}
