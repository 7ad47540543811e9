use async_trait::async_trait;
use bson::{Bson, Document, doc};
use futures::TryStreamExt;
use mongodb::{
    Client, Collection as MongoCollection,
    error::{Error as MongoError, ErrorKind},
    options::{ClientOptions, FindOptions},
};
use tracing::{debug, info};

use docmodel_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    error::{StoreError, StoreResult},
    query::{Query, QueryVisitor, SortDirection},
};

use crate::query::{MONGO_ID_FIELD, MongoQueryTranslator, mongo_field};

fn store_error(err: MongoError) -> StoreError {
    match *err.kind {
        ErrorKind::Authentication { .. } | ErrorKind::ServerSelection { .. } | ErrorKind::Io(..) => {
            StoreError::Connection(err.to_string())
        }
        ErrorKind::Write(..) | ErrorKind::Command(..) => StoreError::Rejected(err.to_string()),
        _ => StoreError::Backend(err.to_string()),
    }
}

#[derive(Debug)]
pub struct MongoDbStore {
    client: Client,
    database: String,
}

impl MongoDbStore {
    pub fn new(client: Client, database: String) -> Self {
        Self { client, database }
    }

    pub fn builder(dsn: &str, database: &str) -> MongoDbStoreBuilder {
        MongoDbStoreBuilder::new(dsn, database)
    }

    fn get_collection(&self, collection_name: &str) -> MongoCollection<Document> {
        self.client
            .database(&self.database)
            .collection(collection_name)
    }

    fn prepare_document(id: &str, fields: Document) -> Document {
        std::iter::once((MONGO_ID_FIELD.to_string(), Bson::from(id)))
            .chain(fields)
            .collect()
    }

    fn restore_document(mut document: Document) -> StoreResult<(String, Document)> {
        let id = match document.remove(MONGO_ID_FIELD) {
            Some(Bson::String(id)) => id,
            Some(Bson::ObjectId(id)) => id.to_hex(),
            Some(other) => {
                return Err(StoreError::Serialization(format!(
                    "unsupported document key {other}"
                )));
            }
            None => return Err(StoreError::Serialization("document without key".into())),
        };

        Ok((id, document))
    }
}

#[async_trait]
impl StoreBackend for MongoDbStore {
    async fn get_document(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        self.get_collection(collection)
            .find_one(doc! { MONGO_ID_FIELD: id })
            .await
            .map_err(store_error)?
            .map(|document| Self::restore_document(document).map(|(_, fields)| fields))
            .transpose()
    }

    async fn set_document(&self, collection: &str, id: &str, fields: Document) -> StoreResult<()> {
        self.get_collection(collection)
            .replace_one(doc! { MONGO_ID_FIELD: id }, Self::prepare_document(id, fields))
            .upsert(true)
            .await
            .map_err(store_error)?;

        Ok(())
    }

    async fn delete_document(&self, collection: &str, id: &str) -> StoreResult<()> {
        self.get_collection(collection)
            .delete_one(doc! { MONGO_ID_FIELD: id })
            .await
            .map_err(store_error)?;

        Ok(())
    }

    async fn query_documents(
        &self,
        collection: &str,
        query: &Query,
    ) -> StoreResult<Vec<(String, Document)>> {
        let mut options = FindOptions::default();

        if let Some(limit) = query.limit {
            options.limit = Some(i64::try_from(limit).unwrap_or(i64::MAX));
        }
        if let Some(skip) = query.offset {
            options.skip = Some(skip as u64);
        }
        if let Some(sort) = &query.sort {
            options.sort = Some(doc! {
                mongo_field(&sort.field): match sort.direction {
                    SortDirection::Asc => 1,
                    SortDirection::Desc => -1,
                }
            })
        }

        let filter = MongoQueryTranslator.visit_filters(&query.filters)?;
        debug!(collection, filter = %filter, "running find");

        self.get_collection(collection)
            .find(filter)
            .with_options(options)
            .await
            .map_err(store_error)?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(store_error)?
            .into_iter()
            .map(Self::restore_document)
            .collect()
    }

    async fn shutdown(self) -> StoreResult<()> {
        self.client.shutdown().await;
        info!(database = %self.database, "mongodb client shut down");

        Ok(())
    }
}

pub struct MongoDbStoreBuilder {
    dsn: String,
    database: String,
}

impl MongoDbStoreBuilder {
    pub fn new(dsn: &str, database: &str) -> Self {
        Self {
            dsn: dsn.to_string(),
            database: database.to_string(),
        }
    }
}

#[async_trait]
impl StoreBackendBuilder for MongoDbStoreBuilder {
    type Backend = MongoDbStore;

    async fn build(self) -> StoreResult<Self::Backend> {
        let options = ClientOptions::parse(&self.dsn)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        let client =
            Client::with_options(options).map_err(|e| StoreError::Connection(e.to_string()))?;

        info!(database = %self.database, "connected to mongodb");

        Ok(MongoDbStore::new(client, self.database))
    }
}
