//! A lightweight object-document mapping layer over key-addressed document stores.
//!
//! This crate is the core of the docmodel project and provides:
//!
//! - **Record definitions** ([`model`]) - The [`Model`](model::Model) trait and per-instance metadata
//! - **Field schemas** ([`schema`]) - Declared field types, parsed and cached per definition
//! - **Document codec** ([`codec`]) - Conversion between instances and documents
//! - **Identity** ([`identity`]) - Identifier generation and validation, and the record clock
//! - **Store backend abstraction** ([`backend`]) - The four primitives a storage engine provides
//! - **Queries** ([`query`]) - Conjunctive filters, validated before they reach the store
//! - **Collections interface** ([`collection`]) - Typed create, save, fetch, delete and query
//! - **Document store** ([`store`]) - Owns a backend and hands out collections
//! - **Process-wide store** ([`context`], [`active`]) - Model operations without passing a store around
//! - **Error handling** ([`error`]) - Error types and result types
//!
//! # Example
//!
//! ```ignore
//! use docmodel::prelude::*;
//!
//! #[derive(Debug, Clone, Serialize, Deserialize, Model)]
//! pub struct User {
//!     #[serde(skip)]
//!     meta: Meta,
//!     pub first_name: String,
//!     pub last_name: String,
//!     pub occupation: Option<String>,
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmodel_core;

pub mod active;
pub mod backend;
pub mod codec;
pub mod collection;
pub mod context;
pub mod error;
pub mod identity;
pub mod model;
pub mod naming;
pub mod query;
pub mod schema;
pub mod store;
