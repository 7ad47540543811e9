//! Process-wide store registration.
//!
//! [`ActiveModel`](crate::active::ActiveModel) operations need a store without being handed
//! one. [`configure`] registers it once at startup; it cannot be replaced afterwards, and
//! every model operation run before it fails with [`ModelError::NotConfigured`].
//!
//! ```ignore
//! use docmodel::{memory::InMemoryStore, store::DocumentStore};
//!
//! docmodel::configure(DocumentStore::new(InMemoryStore::new()))?;
//! ```

use std::sync::OnceLock;

use tracing::info;

use crate::{
    error::{ModelError, ModelResult},
    store::{DynDocumentStore, IntoDynDocumentStore},
};

static STORE: OnceLock<DynDocumentStore> = OnceLock::new();

/// Registers the store every model operation uses.
///
/// # Errors
///
/// Returns [`ModelError::AlreadyConfigured`] if a store was registered before. The existing
/// store stays in place.
pub fn configure(store: impl IntoDynDocumentStore) -> ModelResult<()> {
    STORE
        .set(store.into_dyn())
        .map_err(|_| ModelError::AlreadyConfigured)?;

    info!("document store configured");

    Ok(())
}

/// The registered store.
///
/// # Errors
///
/// Returns [`ModelError::NotConfigured`] if [`configure`] has not been called.
pub fn store() -> ModelResult<&'static DynDocumentStore> {
    STORE.get().ok_or(ModelError::NotConfigured)
}

/// Returns `true` once a store has been registered.
pub fn is_configured() -> bool {
    STORE.get().is_some()
}
