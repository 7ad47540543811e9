//! Model operations against the process-wide store.
//!
//! [`ActiveModel`] is implemented for every [`Model`] and forwards to the
//! [`ModelCollection`](crate::collection::ModelCollection) of the store registered with
//! [`configure`](crate::context::configure):
//!
//! ```ignore
//! use docmodel::prelude::*;
//!
//! let mut sonic = User::make(doc! { "first_name": "Sonic", "last_name": "Brown" }, false).await?;
//! sonic.occupation = Some("circus dog".to_string());
//! sonic.save().await?;
//!
//! let dogs = User::query([("occupation", "circus dog")])?.get().await?;
//! ```

use async_trait::async_trait;
use bson::Document;

use crate::{
    collection::ModelCollection,
    context,
    error::ModelResult,
    model::Model,
    query::{IntoFilter, QueryHandle},
};

fn collection<M: Model>() -> ModelResult<ModelCollection<'static, M>> {
    Ok(context::store()?.models::<M>())
}

/// Record operations bound to the configured store.
///
/// Every method fails with [`ModelError::NotConfigured`](crate::error::ModelError) when no
/// store has been registered.
#[async_trait]
pub trait ActiveModel: Model {
    /// Creates an instance with a generated id, saving it if `persist` is set.
    async fn make(fields: Document, persist: bool) -> ModelResult<Self>;

    /// Creates an instance under `id`, saving it if `persist` is set.
    async fn make_with_id(id: &str, fields: Document, persist: bool) -> ModelResult<Self>;

    /// Loads the instance stored under `id`, if any.
    async fn fetch(id: &str) -> ModelResult<Option<Self>>;

    /// Loads the instance stored under `id`, failing if there is none.
    async fn fetch_required(id: &str) -> ModelResult<Self>;

    /// Deletes the document stored under `id`.
    async fn delete(id: &str) -> ModelResult<()>;

    /// Builds a query from conjunctive filters. Performs no I/O.
    fn query<I, F>(filters: I) -> ModelResult<QueryHandle<'static, Self>>
    where
        I: IntoIterator<Item = F>,
        F: IntoFilter;

    /// Writes this instance to the store.
    async fn save(&mut self) -> ModelResult<()>;

    /// Deletes this instance's document and marks it deleted.
    async fn remove(&mut self) -> ModelResult<()>;
}

#[async_trait]
impl<M: Model> ActiveModel for M {
    async fn make(fields: Document, persist: bool) -> ModelResult<Self> {
        collection::<M>()?
            .make(fields, persist)
            .await
    }

    async fn make_with_id(id: &str, fields: Document, persist: bool) -> ModelResult<Self> {
        collection::<M>()?
            .make_with_id(id, fields, persist)
            .await
    }

    async fn fetch(id: &str) -> ModelResult<Option<Self>> {
        collection::<M>()?.fetch(id).await
    }

    async fn fetch_required(id: &str) -> ModelResult<Self> {
        collection::<M>()?
            .fetch_required(id)
            .await
    }

    async fn delete(id: &str) -> ModelResult<()> {
        collection::<M>()?.delete(id).await
    }

    fn query<I, F>(filters: I) -> ModelResult<QueryHandle<'static, Self>>
    where
        I: IntoIterator<Item = F>,
        F: IntoFilter,
    {
        collection::<M>()?.query(filters)
    }

    async fn save(&mut self) -> ModelResult<()> {
        collection::<M>()?.save(self).await
    }

    async fn remove(&mut self) -> ModelResult<()> {
        collection::<M>()?.remove(self).await
    }
}
