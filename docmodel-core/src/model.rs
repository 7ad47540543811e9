//! The record definition contract.
//!
//! Any struct implementing [`Model`] can be stored: it names itself, registers its declared
//! fields and carries a [`Meta`] value holding the implicit identity and timestamps.
//! `#[derive(Model)]` writes the implementation; a manual one looks like this:
//!
//! ```ignore
//! use docmodel::model::{Meta, Model};
//! use docmodel::schema::FieldDecl;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! pub struct User {
//!     #[serde(skip)]
//!     meta: Meta,
//!     pub first_name: String,
//!     pub occupation: Option<String>,
//! }
//!
//! impl Model for User {
//!     fn model_name() -> &'static str {
//!         "User"
//!     }
//!
//!     fn fields() -> Vec<FieldDecl> {
//!         vec![
//!             FieldDecl::new("first_name", "String", false),
//!             FieldDecl::new("occupation", "Option<String>", false),
//!         ]
//!     }
//!
//!     fn meta(&self) -> &Meta { &self.meta }
//!     fn meta_mut(&mut self) -> &mut Meta { &mut self.meta }
//! }
//! ```

use std::sync::Arc;

use serde::{Serialize, de::DeserializeOwned};

use crate::{
    error::ModelResult,
    identity::Timestamp,
    naming,
    schema::{FieldDecl, Schema},
};

/// Where an instance stands relative to the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RecordState {
    /// Constructed in memory and never saved.
    #[default]
    Transient,
    /// Saved to, or loaded from, the store.
    Persisted,
    /// Removed from the store. The value stays usable; saving it again re-creates the
    /// document under the same id.
    Deleted,
}

/// Identity and timestamps of a record instance.
///
/// Embedded in every record definition and excluded from serialization; the codec moves
/// these values in and out of documents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Meta {
    id: Option<String>,
    created: Option<Timestamp>,
    updated: Option<Timestamp>,
    state: RecordState,
}

impl Meta {
    /// Metadata for a transient instance with a caller-chosen key.
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn created(&self) -> Option<Timestamp> {
        self.created
    }

    pub fn updated(&self) -> Option<Timestamp> {
        self.updated
    }

    pub fn state(&self) -> RecordState {
        self.state
    }

    /// Sets the key the next save writes to.
    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = Some(id.into());
    }

    pub(crate) fn loaded(
        id: String,
        created: Option<Timestamp>,
        updated: Option<Timestamp>,
    ) -> Self {
        Self {
            id: Some(id),
            created,
            updated,
            state: RecordState::Persisted,
        }
    }

    pub(crate) fn saved(id: String, created: Timestamp, updated: Timestamp) -> Self {
        Self {
            id: Some(id),
            created: Some(created),
            updated: Some(updated),
            state: RecordState::Persisted,
        }
    }

    pub(crate) fn mark_deleted(&mut self) {
        self.state = RecordState::Deleted;
    }
}

/// A record definition: a typed struct whose declared fields form a document schema.
pub trait Model: Serialize + DeserializeOwned + Send + Sync + Clone + 'static {
    /// The record definition's name, normally the struct name.
    fn model_name() -> &'static str;

    /// The declared fields, excluding the implicit `id`, `created` and `updated`.
    fn fields() -> Vec<FieldDecl>;

    /// The instance's identity and timestamps.
    fn meta(&self) -> &Meta;

    /// Mutable access to the instance's identity and timestamps.
    fn meta_mut(&mut self) -> &mut Meta;

    /// The collection documents of this definition live in.
    ///
    /// Defaults to the snake-cased, pluralized model name (`BookReview` -> `book_reviews`).
    fn collection_name() -> String {
        naming::default_collection_name(Self::model_name())
    }

    /// The parsed, cached schema of this definition.
    fn schema() -> ModelResult<Arc<Schema>> {
        Schema::of::<Self>()
    }

    /// Shorthand for `self.meta().id()`.
    fn id(&self) -> Option<&str> {
        self.meta().id()
    }
}
