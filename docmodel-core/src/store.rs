//! Main document store interface.
//!
//! A store owns one backend and hands out collection handles borrowing it:
//!
//! - [`DocumentStore`] - Typed store for a specific backend implementation
//! - [`DynDocumentStore`] - Dynamic dispatch store, used by the process-wide context
//!
//! # Example
//!
//! ```ignore
//! use docmodel::store::DocumentStore;
//!
//! let store = DocumentStore::new(backend);
//! let users = store.models::<User>();
//! let sonic = users.fetch("sonic").await?;
//! ```

use crate::{
    backend::{DynStoreBackend, StoreBackend},
    collection::{Collection, ModelCollection},
    error::StoreResult,
    model::Model,
};

/// A document store bound to a specific backend implementation.
#[derive(Debug)]
pub struct DocumentStore<B: StoreBackend> {
    backend: B,
}

impl<B: StoreBackend + 'static> DocumentStore<B> {
    /// Creates a new document store with the given backend.
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// The backend this store writes to.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Gets the model collection of `M`, named by `M::collection_name()`.
    pub fn models<M: Model>(&self) -> ModelCollection<'_, M> {
        ModelCollection::new(M::collection_name(), &self.backend)
    }

    /// Gets raw access to the collection with the given name.
    pub fn collection(&self, name: &str) -> Collection<'_> {
        Collection::new(name.to_string(), &self.backend)
    }

    /// Shuts down the store and releases backend resources.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails to shut down cleanly.
    pub async fn shutdown(self) -> StoreResult<()> {
        self.backend.shutdown().await
    }
}

/// A document store over a backend chosen at runtime.
#[derive(Debug)]
pub struct DynDocumentStore {
    backend: Box<dyn DynStoreBackend>,
}

impl DynDocumentStore {
    /// Creates a new dynamic document store with the given backend trait object.
    pub fn new(backend: Box<dyn DynStoreBackend>) -> Self {
        Self { backend }
    }

    /// Gets the model collection of `M`, named by `M::collection_name()`.
    pub fn models<M: Model>(&self) -> ModelCollection<'_, M> {
        ModelCollection::new(M::collection_name(), &*self.backend)
    }

    /// Gets raw access to the collection with the given name.
    pub fn collection(&self, name: &str) -> Collection<'_> {
        Collection::new(name.to_string(), &*self.backend)
    }

    /// Returns the backend as `B` if that is its concrete type.
    pub fn downcast_backend<B: StoreBackend + 'static>(&self) -> Option<&B> {
        self.backend.as_any().downcast_ref::<B>()
    }

    /// Shuts down the store and releases backend resources.
    pub async fn shutdown(self) -> StoreResult<()> {
        self.backend.shutdown_boxed().await
    }
}

/// Conversion trait for converting a document store into a dynamic owned store.
pub trait IntoDynDocumentStore {
    /// Converts this store into a dynamic owned store.
    fn into_dyn(self) -> DynDocumentStore;
}

impl<B: StoreBackend + 'static> IntoDynDocumentStore for DocumentStore<B> {
    fn into_dyn(self) -> DynDocumentStore {
        DynDocumentStore::new(Box::new(self.backend))
    }
}

impl IntoDynDocumentStore for DynDocumentStore {
    fn into_dyn(self) -> DynDocumentStore {
        self
    }
}
