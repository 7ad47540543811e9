//! Collection handles for model and raw document operations.
//!
//! # Collection Types
//!
//! - [`ModelCollection`] - Typed operations for one record definition
//! - [`Collection`] - Raw document access to a named collection
//!
//! Both borrow the backend of the store that created them and hold no other state, so they
//! are cheap to create per call.
//!
//! # Example
//!
//! ```ignore
//! use bson::doc;
//!
//! let users = store.models::<User>();
//!
//! let mut user = users
//!     .make(doc! { "first_name": "Sonic", "last_name": "Brown" }, false)
//!     .await?;
//! user.occupation = Some("circus dog".to_string());
//! users.save(&mut user).await?;
//!
//! let dogs = users
//!     .query([("occupation", "circus dog")])?
//!     .get()
//!     .await?;
//! ```

use std::{marker::PhantomData, sync::Arc};

use bson::Document;
use tracing::debug;

use crate::{
    backend::DynStoreBackend,
    codec,
    error::{ModelError, ModelResult, StoreResult},
    identity,
    model::{Meta, Model},
    query::{IntoFilter, Query, QueryHandle},
    schema::Schema,
};

/// Typed operations on the collection of one record definition.
///
/// # Type Parameters
///
/// * `'a` - Lifetime of the backend reference
/// * `M` - The record definition
pub struct ModelCollection<'a, M: Model> {
    name: String,
    backend: &'a dyn DynStoreBackend,
    _marker: PhantomData<M>,
}

impl<'a, M: Model> std::fmt::Debug for ModelCollection<'a, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelCollection")
            .field("model", &M::model_name())
            .field("name", &self.name)
            .finish()
    }
}

impl<'a, M: Model> ModelCollection<'a, M> {
    pub(crate) fn new(name: String, backend: &'a dyn DynStoreBackend) -> Self {
        Self {
            name,
            backend,
            _marker: PhantomData,
        }
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns a handle to the same model stored under another collection name.
    pub fn with_collection(self, name: impl Into<String>) -> Self {
        Self::new(name.into(), self.backend)
    }

    /// The parsed schema of `M`.
    pub fn schema(&self) -> ModelResult<Arc<Schema>> {
        M::schema()
    }

    /// Creates an instance from field values, with a freshly generated id.
    ///
    /// With `persist` set the instance is saved before it is returned; otherwise it is
    /// transient and the store is not contacted.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Validation`] if a field is undeclared, mistyped or missing, and
    /// [`ModelError::Persistence`] if persisting fails.
    pub async fn make(&self, fields: Document, persist: bool) -> ModelResult<M> {
        self.make_with_id(identity::new_id(), fields, persist)
            .await
    }

    /// Creates an instance from field values under a caller-chosen id.
    ///
    /// Saving an instance whose id already exists overwrites the stored document.
    ///
    /// # Errors
    ///
    /// Same as [`make`](Self::make), plus [`ModelError::Validation`] for an unusable id.
    pub async fn make_with_id(
        &self,
        id: impl Into<String>,
        fields: Document,
        persist: bool,
    ) -> ModelResult<M> {
        let id = id.into();
        identity::validate_id(&id)?;

        let mut record = codec::instantiate::<M>(fields, Meta::with_id(id))?;
        if persist {
            self.save(&mut record).await?;
        }

        Ok(record)
    }

    /// Writes an instance to the store, overwriting any document under its id.
    ///
    /// A first save assigns an id if the instance has none and sets `created`; every save
    /// sets `updated`. The instance is only modified once the store accepted the write, so a
    /// failed save leaves it exactly as it was.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Encode`] if a field value does not match the schema, and
    /// [`ModelError::Persistence`] if the store write fails.
    pub async fn save(&self, record: &mut M) -> ModelResult<()> {
        let id = match record.meta().id() {
            Some(id) => id.to_string(),
            None => identity::new_id(),
        };
        identity::validate_id(&id)?;

        let now = identity::now();
        let created = record.meta().created().unwrap_or(now);
        let meta = Meta::saved(id.clone(), created, now);

        let mut staged = record.clone();
        *staged.meta_mut() = meta.clone();
        let document = codec::encode(&staged)?;

        self.backend
            .set_document(&self.name, &id, document)
            .await
            .map_err(|source| ModelError::persistence(&self.name, source))?;

        debug!(collection = %self.name, id = %id, "saved record");
        *record.meta_mut() = meta;

        Ok(())
    }

    /// Loads the instance stored under `id`. Returns `Ok(None)` if there is none.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Persistence`] if the store read fails and
    /// [`ModelError::Decode`] if the stored document does not fit the model.
    pub async fn fetch(&self, id: &str) -> ModelResult<Option<M>> {
        let document = self
            .backend
            .get_document(&self.name, id)
            .await
            .map_err(|source| ModelError::persistence(&self.name, source))?;

        document
            .map(|document| codec::decode(id, document))
            .transpose()
    }

    /// Loads the instance stored under `id`, failing with [`ModelError::NotFound`] if there
    /// is none.
    pub async fn fetch_required(&self, id: &str) -> ModelResult<M> {
        self.fetch(id)
            .await?
            .ok_or_else(|| ModelError::NotFound(id.to_string(), self.name.clone()))
    }

    /// Deletes the instance's document and marks it deleted.
    ///
    /// An instance that never received an id has nothing stored and is left untouched.
    /// Deleting a document that is already gone succeeds.
    pub async fn remove(&self, record: &mut M) -> ModelResult<()> {
        let Some(id) = record.meta().id().map(str::to_string) else {
            return Ok(());
        };

        self.delete(&id).await?;
        record.meta_mut().mark_deleted();

        Ok(())
    }

    /// Deletes the document stored under `id`. Deleting a missing document succeeds.
    pub async fn delete(&self, id: &str) -> ModelResult<()> {
        self.backend
            .delete_document(&self.name, id)
            .await
            .map_err(|source| ModelError::persistence(&self.name, source))?;

        debug!(collection = %self.name, id = %id, "deleted record");

        Ok(())
    }

    /// Builds a query over this collection from conjunctive filters.
    ///
    /// Filters are `(field, value)` equality pairs, `(field, op, value)` triples or
    /// [`Filter`](crate::query::Filter) values. Nothing is sent to the store until the
    /// returned handle is executed.
    ///
    /// # Errors
    ///
    /// Returns a query error for an unknown field or an unsupported operator.
    pub fn query<I, F>(&self, filters: I) -> ModelResult<QueryHandle<'a, M>>
    where
        I: IntoIterator<Item = F>,
        F: IntoFilter,
    {
        let schema = M::schema()?;
        let filters = filters
            .into_iter()
            .map(IntoFilter::into_filter)
            .collect::<Result<Vec<_>, _>>()?;

        let query = Query { filters, ..Query::new() };
        query.validate(&schema)?;

        Ok(QueryHandle::new(self.name.clone(), self.backend, schema, query))
    }

    /// A query matching every document in the collection.
    pub fn all(&self) -> ModelResult<QueryHandle<'a, M>> {
        Ok(QueryHandle::new(
            self.name.clone(),
            self.backend,
            M::schema()?,
            Query::new(),
        ))
    }
}

/// Raw document access to a named collection.
///
/// No schema is applied; documents go to and from the backend unchanged.
#[derive(Debug)]
pub struct Collection<'a> {
    name: String,
    backend: &'a dyn DynStoreBackend,
}

impl<'a> Collection<'a> {
    pub(crate) fn new(name: String, backend: &'a dyn DynStoreBackend) -> Self {
        Self { name, backend }
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Retrieves the document stored under `id`.
    pub async fn get(&self, id: &str) -> StoreResult<Option<Document>> {
        self.backend
            .get_document(&self.name, id)
            .await
    }

    /// Stores `document` under `id`, replacing any previous document.
    pub async fn set(&self, id: &str, document: Document) -> StoreResult<()> {
        self.backend
            .set_document(&self.name, id, document)
            .await
    }

    /// Deletes the document stored under `id`.
    pub async fn delete(&self, id: &str) -> StoreResult<()> {
        self.backend
            .delete_document(&self.name, id)
            .await
    }

    /// Runs `query` without validating it against any schema.
    pub async fn query(&self, query: &Query) -> StoreResult<Vec<(String, Document)>> {
        self.backend
            .query_documents(&self.name, query)
            .await
    }
}
