//! Storage backend abstraction.
//!
//! The mapping layer owns no storage. Everything it persists goes through the four
//! primitives of [`StoreBackend`]: fetch one document, overwrite one document, delete one
//! document, and query a collection. Connection management, transport, authentication and
//! indexing all belong to the backend.
//!
//! # Traits
//!
//! - [`StoreBackend`]: The core trait for storage backends
//! - [`DynStoreBackend`]: A trait for dynamic dispatch over backend implementations
//! - [`StoreBackendBuilder`]: Factory trait for creating backend instances
//!
//! # Example
//!
//! ```ignore
//! use docmodel::backend::StoreBackend;
//! use bson::doc;
//!
//! let backend = MyBackendImpl::new();
//!
//! backend.set_document("users", "alice", doc! { "first_name": "Alice" }).await?;
//! let document = backend.get_document("users", "alice").await?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use async_trait::async_trait;
use bson::Document;
use std::{any::Any, fmt::Debug};

use crate::{error::StoreResult, query::Query};

/// Abstract interface for document storage backends.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; the mapping layer shares one backend between any
/// number of concurrent callers and never mutates or reconnects it.
///
/// # Document Shape
///
/// Documents are flat `field -> value` mappings. The key of a document is passed alongside
/// it and is never stored inside it. A filter on the pseudo-field
/// [`ID_FIELD`](crate::schema::ID_FIELD) refers to the key.
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Retrieves one document by key. Returns `Ok(None)` if it does not exist.
    async fn get_document(&self, collection: &str, id: &str) -> StoreResult<Option<Document>>;

    /// Stores a document under `id`, replacing any existing document in full.
    ///
    /// The collection is created implicitly if needed.
    async fn set_document(&self, collection: &str, id: &str, fields: Document) -> StoreResult<()>;

    /// Deletes a document by key. Deleting a missing document succeeds.
    async fn delete_document(&self, collection: &str, id: &str) -> StoreResult<()>;

    /// Returns the `(key, fields)` pairs matching every filter of `query`.
    ///
    /// The order of results is backend-defined unless `query.sort` is set.
    async fn query_documents(
        &self,
        collection: &str,
        query: &Query,
    ) -> StoreResult<Vec<(String, Document)>>;

    /// Cleanly shuts down the backend, releasing all resources.
    ///
    /// The default implementation is a no-op, but backends with external connections
    /// should override this.
    async fn shutdown(self) -> StoreResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

/// Object-safe counterpart of [`StoreBackend`], implemented for every backend.
#[async_trait]
pub trait DynStoreBackend: Send + Sync + Debug {
    async fn get_document(&self, collection: &str, id: &str) -> StoreResult<Option<Document>>;
    async fn set_document(&self, collection: &str, id: &str, fields: Document) -> StoreResult<()>;
    async fn delete_document(&self, collection: &str, id: &str) -> StoreResult<()>;
    async fn query_documents(
        &self,
        collection: &str,
        query: &Query,
    ) -> StoreResult<Vec<(String, Document)>>;
    async fn shutdown_boxed(self: Box<Self>) -> StoreResult<()>;

    fn as_any(&self) -> &dyn Any;
}

#[async_trait]
impl<B: StoreBackend + 'static> DynStoreBackend for B {
    async fn get_document(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        StoreBackend::get_document(self, collection, id).await
    }

    async fn set_document(&self, collection: &str, id: &str, fields: Document) -> StoreResult<()> {
        StoreBackend::set_document(self, collection, id, fields).await
    }

    async fn delete_document(&self, collection: &str, id: &str) -> StoreResult<()> {
        StoreBackend::delete_document(self, collection, id).await
    }

    async fn query_documents(
        &self,
        collection: &str,
        query: &Query,
    ) -> StoreResult<Vec<(String, Document)>> {
        StoreBackend::query_documents(self, collection, query).await
    }

    async fn shutdown_boxed(self: Box<Self>) -> StoreResult<()> {
        StoreBackend::shutdown(*self).await
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Factory for backends that need asynchronous setup (connecting, authenticating...).
#[async_trait]
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    async fn build(self) -> StoreResult<Self::Backend>;
}
