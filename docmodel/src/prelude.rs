//! Convenient re-exports of commonly used types from docmodel.
//!
//! ```ignore
//! use docmodel::prelude::*;
//! ```
//!
//! This provides the `Model` derive and trait, the model operations, the store types, query
//! construction, the error types, and `doc!` with Serde's derives for writing definitions.

pub use bson::doc;
pub use serde::{Deserialize, Serialize};

pub use docmodel_core::{
    active::ActiveModel,
    backend::{StoreBackend, StoreBackendBuilder},
    codec::ModelExt,
    collection::{Collection, ModelCollection},
    error::{ModelError, ModelResult, QueryError, StoreError},
    identity::Timestamp,
    model::{Meta, Model, RecordState},
    query::{FieldOp, Filter, IntoFilter, Query, QueryHandle, SortDirection},
    store::{DocumentStore, DynDocumentStore, IntoDynDocumentStore},
};
pub use docmodel_macros::Model;
