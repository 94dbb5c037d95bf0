//! Process-wide singleton wrapper (spec §5, §9 Design Notes).
//!
//! The spec describes the Signature Service as "a process singleton,
//! lazily constructed with double-checked publication so that the first
//! call to `initialize()` is guaranteed to complete before any admission
//! query proceeds." Per the Design Notes in spec §9, the classic singleton
//! pattern itself is incidental — what matters is the lifecycle guarantee.
//! This wrapper reframes it as an explicit value behind a `once_cell`
//! double-checked-publication cell, built once by whichever thread gets
//! there first, with every other caller blocking on that same
//! construction rather than racing a second one.

use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::core::config::RulesetConfig;
use crate::core::errors::Result;
use crate::store::SignatureStore;

use super::SignatureService;

/// Holds at most one [`SignatureService`], constructed and hydrated
/// exactly once.
#[derive(Default)]
pub struct SignatureServiceCell {
    inner: OnceCell<Arc<SignatureService>>,
}

impl SignatureServiceCell {
    /// Build an empty cell.
    pub fn new() -> Self {
        Self {
            inner: OnceCell::new(),
        }
    }

    /// Return the shared service, constructing and hydrating it on first
    /// call. Every call after the first observes the same already-hydrated
    /// instance; `once_cell`'s `get_or_try_init` guarantees at most one
    /// thread runs the initializer even under concurrent callers.
    pub fn get_or_initialize(
        &self,
        config: &RulesetConfig,
        build_store: impl FnOnce() -> Result<SignatureStore>,
    ) -> Result<Arc<SignatureService>> {
        self.inner
            .get_or_try_init(|| {
                let store = build_store()?;
                let service = SignatureService::new(config, store);
                service.initialize()?;
                Ok(Arc::new(service))
            })
            .cloned()
    }

    /// Whether the service has already been constructed.
    pub fn is_initialized(&self) -> bool {
        self.inner.get().is_some()
    }
}
