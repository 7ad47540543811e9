//! MongoDB backend implementation for docmodel.
//!
//! Each model collection maps to a MongoDB collection of the same name in one database. The
//! document key is stored as `_id`; filters and sorts on `id` are rewritten to it.
//!
//! To use this backend, include the `mongodb` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! docmodel = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Example
//!
//! ```ignore
//! use docmodel::{backend::StoreBackendBuilder, mongodb::MongoDbStore, store::DocumentStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = MongoDbStore::builder("mongodb://localhost:27017", "my_database")
//!         .build()
//!         .await?;
//!     docmodel::configure(DocumentStore::new(backend))?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmodel_mongodb;

mod query;
pub mod store;

pub use store::{MongoDbStore, MongoDbStoreBuilder};
