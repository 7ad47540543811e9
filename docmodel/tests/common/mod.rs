#![allow(dead_code)]

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use docmodel::{memory::InMemoryStore, prelude::*};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Model)]
pub struct User {
    #[serde(skip)]
    meta: Meta,
    pub first_name: String,
    pub last_name: String,
    pub occupation: Option<String>,
}

impl User {
    pub fn new(first_name: &str, last_name: &str) -> Self {
        Self {
            meta: Meta::default(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            occupation: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Model)]
pub struct Book {
    #[serde(skip)]
    meta: Meta,
    pub title: String,
    pub author: String,
    pub year: i32,
    pub pages: Option<i64>,
    #[serde(default)]
    pub in_print: bool,
}

pub fn book_fields(title: &str, year: i32) -> bson::Document {
    doc! { "title": title, "author": "Kurt Vonnegut", "year": year }
}

/// A backend whose every primitive fails.
#[derive(Debug, Default)]
pub struct FailingStore;

fn unreachable_store() -> StoreError {
    StoreError::Connection("store unreachable".to_string())
}

#[async_trait]
impl StoreBackend for FailingStore {
    async fn get_document(&self, _: &str, _: &str) -> Result<Option<bson::Document>, StoreError> {
        Err(unreachable_store())
    }

    async fn set_document(&self, _: &str, _: &str, _: bson::Document) -> Result<(), StoreError> {
        Err(unreachable_store())
    }

    async fn delete_document(&self, _: &str, _: &str) -> Result<(), StoreError> {
        Err(unreachable_store())
    }

    async fn query_documents(
        &self,
        _: &str,
        _: &Query,
    ) -> Result<Vec<(String, bson::Document)>, StoreError> {
        Err(unreachable_store())
    }
}

/// An in-memory backend that counts the primitives it serves.
#[derive(Debug, Clone, Default)]
pub struct CountingStore {
    inner: InMemoryStore,
    calls: Arc<AtomicUsize>,
}

impl CountingStore {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl StoreBackend for CountingStore {
    async fn get_document(&self, collection: &str, id: &str) -> Result<Option<bson::Document>, StoreError> {
        self.hit();
        self.inner.get_document(collection, id).await
    }

    async fn set_document(&self, collection: &str, id: &str, fields: bson::Document) -> Result<(), StoreError> {
        self.hit();
        self.inner.set_document(collection, id, fields).await
    }

    async fn delete_document(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.hit();
        self.inner.delete_document(collection, id).await
    }

    async fn query_documents(
        &self,
        collection: &str,
        query: &Query,
    ) -> Result<Vec<(String, bson::Document)>, StoreError> {
        self.hit();
        self.inner.query_documents(collection, query).await
    }
}
