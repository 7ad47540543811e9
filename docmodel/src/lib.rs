//! Main docmodel crate: typed records over key-addressed document stores.
//!
//! This crate is the primary entry point for users of the docmodel framework. It re-exports
//! the core types from the sub-crates, the `Model` derive and the available storage
//! backends.
//!
//! # Features
//!
//! - **Typed records** - Plain structs with Serde and `#[derive(Model)]`
//! - **Implicit identity** - Every record carries an `id` and `created` / `updated` timestamps
//! - **Validated queries** - Unknown fields and operators are rejected before the store is hit
//! - **Pluggable storage** - In-memory and MongoDB backends behind one four-method trait
//!
//! # Quick Start
//!
//! ```ignore
//! use docmodel::{prelude::*, memory::InMemoryStore};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize, Model)]
//! pub struct User {
//!     #[serde(skip)]
//!     meta: Meta,
//!     pub first_name: String,
//!     pub last_name: String,
//!     pub occupation: Option<String>,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     docmodel::configure(DocumentStore::new(InMemoryStore::new()))?;
//!
//!     let mut sonic = User::make(doc! { "first_name": "Sonic", "last_name": "Brown" }, false).await?;
//!     sonic.occupation = Some("circus dog".to_string());
//!     sonic.save().await?;
//!
//!     let dogs = User::query([("occupation", "circus dog")])?.get().await?;
//!     assert_eq!(dogs.len(), 1);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Explicit Stores
//!
//! The process-wide store is a convenience. Collections can also be taken from a store the
//! caller owns, which is what tests and multi-tenant services usually want:
//!
//! ```ignore
//! let store = DocumentStore::new(InMemoryStore::new());
//! let users = store.models::<User>();
//!
//! let sonic = users.make(doc! { "first_name": "Sonic", "last_name": "Brown" }, true).await?;
//! assert!(users.fetch(sonic.id().unwrap()).await?.is_some());
//! ```
//!
//! # Backends
//!
//! - [`memory`] - In-memory storage for development and testing
//! - `mongodb` - Persistent MongoDB backend (requires the `mongodb` feature)

#[allow(unused_extern_crates)]
extern crate self as docmodel;

pub mod prelude;

pub use docmodel_core::{
    active, backend, codec, collection, context, error, identity, model, naming, query, schema,
    store,
};

pub use docmodel_core::context::configure;
pub use docmodel_macros::Model;

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage backend implementations.
pub mod memory {
    pub use docmodel_memory::{InMemoryStore, InMemoryStoreBuilder};
}

/// MongoDB storage backend implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use docmodel_mongodb::{MongoDbStore, MongoDbStoreBuilder};
}
