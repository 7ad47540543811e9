//! Error types and result types for model and store operations.
//!
//! Two layers of errors exist:
//!
//! - [`StoreError`] is what a [`StoreBackend`](crate::backend::StoreBackend) reports when one
//!   of its primitives fails (network, authentication, quota, unsupported query...).
//! - [`ModelError`] is what every public model operation returns. Store failures are carried
//!   inside it unmodified, tagged with the operation kind that hit them.
//!
//! Use [`ModelResult<T>`] as the return type for fallible model operations.

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Failure reported by a storage backend primitive.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backend could not be reached or the connection could not be set up.
    #[error("Connection error: {0}")]
    Connection(String),
    /// The backend refused the operation (permissions, quota, invalid key...).
    #[error("Operation rejected: {0}")]
    Rejected(String),
    /// The backend cannot execute the requested filter combination.
    #[error("Unsupported query: {0}")]
    UnsupportedQuery(String),
    /// A document could not be converted to or from the backend's wire format.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Any other backend failure.
    #[error("Backend error: {0}")]
    Backend(String),
}

/// A specialized `Result` type for backend primitives.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised while building or validating a query, or while executing it.
#[derive(Error, Debug)]
pub enum QueryError {
    /// The filter or sort references a field the model does not declare.
    #[error("Unknown field '{field}' for model {model}")]
    UnknownField {
        /// The offending field name.
        field: String,
        /// The model the query targets.
        model: String,
    },
    /// The filter operator is not one of `=`, `<`, `>`, `<=`, `>=`.
    #[error("Unsupported operator '{0}'")]
    UnsupportedOperator(String),
    /// The store failed while executing the query. No partial results are returned.
    #[error("Query on collection {collection} failed: {source}")]
    Store {
        /// The collection that was queried.
        collection: String,
        /// The underlying store failure.
        #[source]
        source: StoreError,
    },
}

/// Represents all possible errors returned by model operations.
///
/// Every public operation either succeeds completely or returns exactly one of these.
/// Schema and validation problems are always detected before the store is contacted.
#[derive(Error, Debug)]
pub enum ModelError {
    /// The record definition declares a field the mapping layer cannot store.
    #[error("Schema error in {model}: {reason}")]
    Schema {
        /// The record definition name.
        model: String,
        /// What is wrong with it.
        reason: String,
    },
    /// Field values supplied to `make`, or an identifier, are missing or mistyped.
    #[error("Validation error: {0}")]
    Validation(String),
    /// An instance could not be converted into a document.
    #[error("Encode error: {0}")]
    Encode(String),
    /// A stored document could not be converted into an instance.
    #[error("Decode error for document {id}: {reason}")]
    Decode {
        /// The key of the offending document.
        id: String,
        /// What is wrong with it.
        reason: String,
    },
    /// Query construction or execution failed.
    #[error(transparent)]
    Query(#[from] QueryError),
    /// A write or read against the store failed. Never retried.
    #[error("Persistence error in collection {collection}: {source}")]
    Persistence {
        /// The collection that was targeted.
        collection: String,
        /// The underlying store failure.
        #[source]
        source: StoreError,
    },
    /// The requested document does not exist.
    /// The first argument is the document ID, the second is the collection name.
    #[error("Document {0} not found in collection {1}")]
    NotFound(String, String),
    /// A model operation ran before [`configure`](crate::context::configure) was called.
    #[error("Document store is not configured; call docmodel::configure first")]
    NotConfigured,
    /// [`configure`](crate::context::configure) was called more than once.
    #[error("Document store is already configured")]
    AlreadyConfigured,
}

impl ModelError {
    /// Returns `true` if this error means the record is absent rather than that the
    /// operation failed.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ModelError::NotFound(..))
    }

    pub(crate) fn persistence(collection: &str, source: StoreError) -> Self {
        ModelError::Persistence {
            collection: collection.to_string(),
            source,
        }
    }
}

/// A specialized `Result` type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

impl From<BsonError> for ModelError {
    fn from(err: BsonError) -> Self {
        ModelError::Encode(err.to_string())
    }
}

impl From<SerdeJsonError> for ModelError {
    fn from(err: SerdeJsonError) -> Self {
        ModelError::Encode(err.to_string())
    }
}

impl From<BsonError> for StoreError {
    fn from(err: BsonError) -> Self {
        StoreError::Serialization(err.to_string())
    }
}
