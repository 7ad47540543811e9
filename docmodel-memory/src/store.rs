//! In-memory storage implementation.
//!
//! Documents live in ordered maps per collection behind an async-aware read-write lock, so
//! queries without a sort return documents in key order.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use async_trait::async_trait;
use bson::{Bson, Document};
use mea::rwlock::RwLock;
use tracing::trace;

use docmodel_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    error::StoreResult,
    query::{Query, SortDirection},
    schema::ID_FIELD,
};

use crate::evaluator::{DocumentEvaluator, sort_order};

type CollectionMap = BTreeMap<String, Document>;
type StoreMap = HashMap<String, CollectionMap>;

/// Thread-safe in-memory document storage backend.
///
/// `InMemoryStore` is cloneable and uses an `Arc`-wrapped internal state. Clones share the
/// same underlying data.
///
/// Queries scan every document of the collection; there is no indexing.
///
/// # Example
///
/// ```ignore
/// use docmodel_memory::InMemoryStore;
/// use docmodel::backend::StoreBackend;
/// use bson::doc;
///
/// let store = InMemoryStore::new();
/// store.set_document("users", "alice", doc! { "name": "Alice" }).await?;
///
/// let alice = store.get_document("users", "alice").await?;
/// assert!(alice.is_some());
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    /// collection name -> (document key -> fields)
    store: Arc<RwLock<StoreMap>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory document store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder for constructing an `InMemoryStore`.
    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::default()
    }

    /// Number of documents stored in `collection`.
    pub async fn len(&self, collection: &str) -> usize {
        self.store
            .read()
            .await
            .get(collection)
            .map_or(0, BTreeMap::len)
    }

    /// Returns `true` if `collection` holds no documents.
    pub async fn is_empty(&self, collection: &str) -> bool {
        self.len(collection).await == 0
    }
}

#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn get_document(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        Ok(self
            .store
            .read()
            .await
            .get(collection)
            .and_then(|documents| documents.get(id))
            .cloned())
    }

    async fn set_document(&self, collection: &str, id: &str, fields: Document) -> StoreResult<()> {
        trace!(collection, id, "storing document");

        self.store
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), fields);

        Ok(())
    }

    async fn delete_document(&self, collection: &str, id: &str) -> StoreResult<()> {
        if let Some(documents) = self.store.write().await.get_mut(collection) {
            documents.remove(id);
        }

        Ok(())
    }

    async fn query_documents(
        &self,
        collection: &str,
        query: &Query,
    ) -> StoreResult<Vec<(String, Document)>> {
        let store = self.store.read().await;
        let Some(documents) = store.get(collection) else {
            return Ok(vec![]);
        };

        let mut matched = Vec::new();
        for (id, document) in documents {
            if DocumentEvaluator::new(id, document).matches(&query.filters)? {
                matched.push((id.clone(), document.clone()));
            }
        }

        if let Some(sort) = &query.sort {
            let value = |id: &str, document: &Document| -> Option<Bson> {
                if sort.field == ID_FIELD {
                    Some(Bson::String(id.to_string()))
                } else {
                    document.get(&sort.field).cloned()
                }
            };

            matched.sort_by(|(left_id, left), (right_id, right)| {
                let ordering = sort_order(
                    value(left_id, left).as_ref(),
                    value(right_id, right).as_ref(),
                );

                match sort.direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            });
        }

        Ok(matched
            .into_iter()
            .skip(query.offset.unwrap_or(0))
            .take(query.limit.unwrap_or(usize::MAX))
            .collect())
    }
}

/// Builder for constructing [`InMemoryStore`] instances.
#[derive(Default)]
pub struct InMemoryStoreBuilder {
    collections: Vec<(String, Vec<(String, Document)>)>,
}

impl InMemoryStoreBuilder {
    /// Seeds `collection` with documents before the store is handed out.
    pub fn with_documents(
        mut self,
        collection: impl Into<String>,
        documents: impl IntoIterator<Item = (String, Document)>,
    ) -> Self {
        self.collections
            .push((collection.into(), documents.into_iter().collect()));
        self
    }
}

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    async fn build(self) -> StoreResult<Self::Backend> {
        let store = InMemoryStore::new();

        {
            let mut map = store.store.write().await;
            for (collection, documents) in self.collections {
                map.entry(collection)
                    .or_default()
                    .extend(documents);
            }
        }

        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use bson::doc;
    use docmodel_core::query::Filter;

    use super::*;

    async fn seeded() -> InMemoryStore {
        InMemoryStore::builder()
            .with_documents(
                "books",
                [
                    ("b1".to_string(), doc! { "title": "Sirens of Titan", "year": 1959 }),
                    ("b2".to_string(), doc! { "title": "Cat's Cradle", "year": 1963 }),
                    ("b3".to_string(), doc! { "title": "Slapstick", "year": 1976 }),
                    ("b4".to_string(), doc! { "title": "Untitled" }),
                ],
            )
            .build()
            .await
            .unwrap()
    }

    fn ids(rows: &[(String, Document)]) -> Vec<&str> {
        rows.iter()
            .map(|(id, _)| id.as_str())
            .collect()
    }

    #[tokio::test]
    async fn set_overwrites_whole_document() {
        let store = InMemoryStore::new();

        store
            .set_document("users", "sonic", doc! { "first_name": "Sonic", "occupation": "dog" })
            .await
            .unwrap();
        store
            .set_document("users", "sonic", doc! { "first_name": "Sonic" })
            .await
            .unwrap();

        let stored = store
            .get_document("users", "sonic")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(stored, doc! { "first_name": "Sonic" });
        assert_eq!(store.len("users").await, 1);
    }

    #[tokio::test]
    async fn missing_documents_and_collections() {
        let store = InMemoryStore::new();

        assert_eq!(store.get_document("users", "nobody").await.unwrap(), None);
        assert!(store.delete_document("users", "nobody").await.is_ok());
        assert!(store.query_documents("users", &Query::new()).await.unwrap().is_empty());
        assert!(store.is_empty("users").await);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = seeded().await;

        store.delete_document("books", "b1").await.unwrap();
        store.delete_document("books", "b1").await.unwrap();

        assert_eq!(store.get_document("books", "b1").await.unwrap(), None);
        assert_eq!(store.len("books").await, 3);
    }

    #[tokio::test]
    async fn queries_filter_in_key_order() {
        let store = seeded().await;

        let query = Query::builder()
            .filter(Filter::gte("year", 1960))
            .build();
        let rows = store.query_documents("books", &query).await.unwrap();

        assert_eq!(ids(&rows), vec!["b2", "b3"]);
    }

    #[tokio::test]
    async fn queries_sort_and_page() {
        let store = seeded().await;

        let query = Query::builder()
            .sort("year", SortDirection::Desc)
            .offset(1)
            .limit(2)
            .build();
        let rows = store.query_documents("books", &query).await.unwrap();

        assert_eq!(ids(&rows), vec!["b2", "b1"]);
    }

    #[tokio::test]
    async fn sorting_places_nan_after_numbers() {
        let store = InMemoryStore::builder()
            .with_documents(
                "ratings",
                [
                    ("r1".to_string(), doc! { "score": 4.5 }),
                    ("r2".to_string(), doc! { "score": f64::NAN }),
                    ("r3".to_string(), doc! { "score": -1.0 }),
                    ("r4".to_string(), doc! { "score": 3 }),
                    ("r5".to_string(), doc! { "score": f64::NAN }),
                    ("r6".to_string(), doc! { "score": 0.5 }),
                ],
            )
            .build()
            .await
            .unwrap();

        let asc = Query::builder()
            .sort("score", SortDirection::Asc)
            .build();
        let rows = store.query_documents("ratings", &asc).await.unwrap();
        assert_eq!(ids(&rows), vec!["r3", "r6", "r4", "r1", "r2", "r5"]);

        let desc = Query::builder()
            .sort("score", SortDirection::Desc)
            .limit(3)
            .build();
        let rows = store.query_documents("ratings", &desc).await.unwrap();
        assert_eq!(ids(&rows), vec!["r2", "r5", "r1"]);
    }

    #[tokio::test]
    async fn clones_share_state() {
        let store = InMemoryStore::new();
        let clone = store.clone();

        store
            .set_document("users", "shadow", doc! { "first_name": "Shadow" })
            .await
            .unwrap();

        assert!(clone.get_document("users", "shadow").await.unwrap().is_some());
    }
}
