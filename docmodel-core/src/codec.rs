//! Conversion between record instances and documents.
//!
//! A document holds every declared field plus `created` and `updated`. The key is never
//! stored inside the document; it travels next to it.
//!
//! Decoding is tolerant of older documents so that record definitions can evolve without a
//! migration step:
//!
//! - missing `created` / `updated` decode as absent,
//! - timestamps stored as integer milliseconds are accepted,
//! - a `modified` field stands in for a missing `updated`,
//! - fields the definition no longer declares are ignored,
//! - optional fields and fields with a default may be missing.
//!
//! Removing a required field from old documents, or changing a field's type, still fails with
//! [`ModelError::Decode`].

use bson::{Bson, Document, de::deserialize_from_bson, ser::serialize_to_bson};
use serde_json::Value;
use tracing::warn;

use crate::{
    error::{ModelError, ModelResult},
    identity::Timestamp,
    model::{Meta, Model},
    schema::{CREATED_FIELD, ID_FIELD, RESERVED_FIELDS, Schema, UPDATED_FIELD, bson_type_name},
};

/// Field name older documents used for the modification time.
pub const LEGACY_UPDATED_FIELD: &str = "modified";

/// Converts an instance into its document.
///
/// # Errors
///
/// Returns [`ModelError::Encode`] if a declared field holds a value of the wrong type, a
/// required field is null, or the instance serializes fields the schema does not declare.
pub fn encode<M: Model>(record: &M) -> ModelResult<Document> {
    let schema = M::schema()?;
    let mut serialized = match serialize_to_bson(record)? {
        Bson::Document(document) => document,
        other => {
            return Err(ModelError::Encode(format!(
                "{} serialized to {} instead of a document",
                schema.model(),
                bson_type_name(&other)
            )));
        }
    };

    let mut document = Document::new();

    for field in schema.fields() {
        let value = serialized
            .remove(field.name())
            .unwrap_or(Bson::Null);

        if !field.accepts(&value) {
            return Err(ModelError::Encode(format!(
                "field '{}' of {} is declared as {}{} but holds {}",
                field.name(),
                schema.model(),
                if field.is_optional() { "optional " } else { "" },
                field.field_type(),
                bson_type_name(&value)
            )));
        }

        document.insert(field.name(), value);
    }

    if let Some(extra) = serialized.keys().next() {
        return Err(ModelError::Encode(format!(
            "{} serialized undeclared field '{extra}'",
            schema.model()
        )));
    }

    let meta = record.meta();
    if let Some(created) = meta.created() {
        document.insert(CREATED_FIELD, created);
    }
    if let Some(updated) = meta.updated() {
        document.insert(UPDATED_FIELD, updated);
    }

    Ok(document)
}

/// Builds an instance from a stored document and its key.
///
/// # Errors
///
/// Returns [`ModelError::Decode`] if a required field is missing or null, a timestamp
/// attribute has an unusable type, or the field values do not deserialize into `M`.
pub fn decode<M: Model>(id: impl Into<String>, mut document: Document) -> ModelResult<M> {
    let id = id.into();
    let schema = M::schema()?;
    let decode_error = |reason: String| ModelError::Decode { id: id.clone(), reason };

    let created = take_timestamp(&mut document, CREATED_FIELD).map_err(&decode_error)?;
    let updated = match take_timestamp(&mut document, UPDATED_FIELD).map_err(&decode_error)? {
        Some(updated) => Some(updated),
        None => take_timestamp(&mut document, LEGACY_UPDATED_FIELD).map_err(&decode_error)?,
    };

    if created.is_none() || updated.is_none() {
        warn!(
            model = schema.model(),
            id = %id,
            "decoding document without creation or modification time"
        );
    }

    let fields = declared_fields(&schema, document);

    for field in schema.fields() {
        if field.is_required() && matches!(fields.get(field.name()), None | Some(Bson::Null)) {
            return Err(decode_error(format!("required field '{}' is missing", field.name())));
        }
    }

    let mut record: M = deserialize_from_bson(Bson::Document(fields))
        .map_err(|err| decode_error(err.to_string()))?;
    *record.meta_mut() = Meta::loaded(id, created, updated);

    Ok(record)
}

/// Checks field values supplied for a new instance.
///
/// Every key must be a declared field, every required field must be present and non-null,
/// and every value must match its declared type.
pub fn validate_fields<M: Model>(fields: &Document) -> ModelResult<()> {
    let schema = M::schema()?;

    for (name, value) in fields {
        if RESERVED_FIELDS.contains(&name.as_str()) {
            return Err(ModelError::Validation(format!(
                "'{name}' is managed by {} and cannot be supplied",
                schema.model()
            )));
        }

        let field = schema.field(name).ok_or_else(|| {
            ModelError::Validation(format!("{} has no field '{name}'", schema.model()))
        })?;

        if !field.accepts(value) {
            return Err(ModelError::Validation(format!(
                "field '{name}' expects {} but got {}",
                field.field_type(),
                bson_type_name(value)
            )));
        }
    }

    for field in schema.fields() {
        if field.is_required() && matches!(fields.get(field.name()), None | Some(Bson::Null)) {
            return Err(ModelError::Validation(format!(
                "required field '{}' of {} was not supplied",
                field.name(),
                schema.model()
            )));
        }
    }

    Ok(())
}

/// Builds a transient instance from validated field values.
pub(crate) fn instantiate<M: Model>(fields: Document, meta: Meta) -> ModelResult<M> {
    validate_fields::<M>(&fields)?;

    let mut record: M = deserialize_from_bson(Bson::Document(fields))
        .map_err(|err| ModelError::Validation(err.to_string()))?;
    *record.meta_mut() = meta;

    Ok(record)
}

fn declared_fields(schema: &Schema, document: Document) -> Document {
    document
        .into_iter()
        .filter(|(name, _)| name != ID_FIELD && schema.field(name).is_some())
        .collect()
}

fn take_timestamp(document: &mut Document, field: &str) -> Result<Option<Timestamp>, String> {
    match document.remove(field) {
        None | Some(Bson::Null) => Ok(None),
        Some(Bson::DateTime(timestamp)) => Ok(Some(timestamp)),
        Some(Bson::Int64(millis)) => Ok(Some(Timestamp::from_millis(millis))),
        Some(Bson::Int32(millis)) => Ok(Some(Timestamp::from_millis(millis.into()))),
        Some(other) => Err(format!(
            "'{field}' must be a timestamp, found {}",
            bson_type_name(&other)
        )),
    }
}

/// Document conversions available on every model.
pub trait ModelExt: Model {
    /// Converts this instance to its stored document.
    fn to_document(&self) -> ModelResult<Document>;

    /// Converts this instance to JSON, including `id`.
    fn to_json(&self) -> ModelResult<Value>;

    /// Builds an instance from a stored document and its key.
    fn from_document(id: impl Into<String>, document: Document) -> ModelResult<Self>;
}

impl<M: Model> ModelExt for M {
    fn to_document(&self) -> ModelResult<Document> {
        encode(self)
    }

    fn to_json(&self) -> ModelResult<Value> {
        let mut document = encode(self)?;
        if let Some(id) = self.meta().id() {
            document.insert(ID_FIELD, id);
        }

        Ok(serde_json::to_value(&document)?)
    }

    fn from_document(id: impl Into<String>, document: Document) -> ModelResult<Self> {
        decode(id, document)
    }
}

#[cfg(test)]
mod tests {
    use bson::doc;
    use proptest::prelude::*;
    use serde::{Deserialize, Serialize};

    use super::*;
    use crate::{model::RecordState, schema::FieldDecl};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Book {
        #[serde(skip)]
        meta: Meta,
        title: String,
        author: String,
        year: i32,
        pages: Option<u32>,
        #[serde(default)]
        in_print: bool,
    }

    impl Model for Book {
        fn model_name() -> &'static str {
            "Book"
        }

        fn fields() -> Vec<FieldDecl> {
            vec![
                FieldDecl::new("title", "String", false),
                FieldDecl::new("author", "String", false),
                FieldDecl::new("year", "i32", false),
                FieldDecl::new("pages", "Option<u32>", false),
                FieldDecl::new("in_print", "bool", true),
            ]
        }

        fn meta(&self) -> &Meta {
            &self.meta
        }

        fn meta_mut(&mut self) -> &mut Meta {
            &mut self.meta
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Shelf {
        #[serde(skip)]
        meta: Meta,
        labels: Vec<String>,
    }

    impl Model for Shelf {
        fn model_name() -> &'static str {
            "Shelf"
        }

        fn fields() -> Vec<FieldDecl> {
            vec![FieldDecl::new("labels", "Vec<String>", false)]
        }

        fn meta(&self) -> &Meta {
            &self.meta
        }

        fn meta_mut(&mut self) -> &mut Meta {
            &mut self.meta
        }
    }

    macro_rules! test_model {
        ($ty:ident, [$(($name:literal, $type_name:literal, $default:literal)),* $(,)?]) => {
            impl Model for $ty {
                fn model_name() -> &'static str {
                    stringify!($ty)
                }

                fn fields() -> Vec<FieldDecl> {
                    vec![$(FieldDecl::new($name, $type_name, $default)),*]
                }

                fn meta(&self) -> &Meta {
                    &self.meta
                }

                fn meta_mut(&mut self) -> &mut Meta {
                    &mut self.meta
                }
            }
        };
    }

    /// Declares `year` as a string over an integer field.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct MisdeclaredBook {
        #[serde(skip)]
        meta: Meta,
        title: String,
        year: i32,
    }

    test_model!(MisdeclaredBook, [("title", "String", false), ("year", "String", false)]);

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Draft {
        #[serde(skip)]
        meta: Meta,
        #[serde(skip_serializing_if = "String::is_empty")]
        title: String,
    }

    test_model!(Draft, [("title", "String", false)]);

    /// Serializes `isbn` without declaring it.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Catalogued {
        #[serde(skip)]
        meta: Meta,
        title: String,
        isbn: String,
    }

    test_model!(Catalogued, [("title", "String", false)]);

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Reading {
        #[serde(skip)]
        meta: Meta,
        title: String,
        rating: f64,
        count: i64,
        pages: i32,
        note: Option<String>,
        taken: Option<Timestamp>,
        finished: bool,
    }

    test_model!(
        Reading,
        [
            ("title", "String", false),
            ("rating", "f64", false),
            ("count", "i64", false),
            ("pages", "i32", false),
            ("note", "Option<String>", false),
            ("taken", "Option<Timestamp>", false),
            ("finished", "bool", false),
        ]
    );

    fn sirens() -> Book {
        Book {
            meta: Meta::default(),
            title: "Sirens of Titan".to_string(),
            author: "Kurt Vonnegut".to_string(),
            year: 1959,
            pages: Some(319),
            in_print: true,
        }
    }

    #[test]
    fn encodes_declared_fields_and_timestamps() {
        let mut book = sirens();
        let stamp = Timestamp::from_millis(1_700_000_000_000);
        *book.meta_mut() = Meta::saved("100800604002".to_string(), stamp, stamp);

        let document = encode(&book).unwrap();
        let keys = document
            .keys()
            .map(String::as_str)
            .collect::<Vec<_>>();

        assert_eq!(keys, vec!["title", "author", "year", "pages", "in_print", "created", "updated"]);
        assert_eq!(document.get_str("title").unwrap(), "Sirens of Titan");
        assert_eq!(document.get_i32("year").unwrap(), 1959);
        assert!(matches!(document.get("pages"), Some(Bson::Int32(319) | Bson::Int64(319))));
        assert_eq!(document.get_datetime("created").unwrap(), &stamp);
        assert!(!document.contains_key("id"));
    }

    #[test]
    fn decode_reverses_encode() {
        let mut book = sirens();
        let stamp = Timestamp::from_millis(1_700_000_000_000);
        *book.meta_mut() = Meta::saved("100800604002".to_string(), stamp, stamp);

        let decoded: Book = decode("100800604002", encode(&book).unwrap()).unwrap();

        assert_eq!(decoded, book);
        assert_eq!(decoded.meta().id(), Some("100800604002"));
        assert_eq!(decoded.meta().state(), RecordState::Persisted);
    }

    #[test]
    fn decodes_legacy_documents() {
        let decoded: Book = decode(
            "legacy",
            doc! {
                "id": "legacy",
                "title": "Cat's Cradle",
                "author": "Kurt Vonnegut",
                "year": 1963,
                "publisher": "Holt, Rinehart and Winston",
                "collection_path": "Book",
            },
        )
        .unwrap();

        assert_eq!(decoded.title, "Cat's Cradle");
        assert_eq!(decoded.pages, None);
        assert!(!decoded.in_print);
        assert_eq!(decoded.meta().created(), None);
        assert_eq!(decoded.meta().updated(), None);
    }

    #[test]
    fn decodes_millisecond_timestamps_and_modified() {
        let decoded: Book = decode(
            "legacy",
            doc! {
                "title": "Slapstick",
                "author": "Kurt Vonnegut",
                "year": 1976,
                "created": 1_500_000_000_000_i64,
                "modified": 1_600_000_000_000_i64,
            },
        )
        .unwrap();

        assert_eq!(decoded.meta().created(), Some(Timestamp::from_millis(1_500_000_000_000)));
        assert_eq!(decoded.meta().updated(), Some(Timestamp::from_millis(1_600_000_000_000)));
    }

    #[test]
    fn decode_requires_required_fields() {
        let missing = decode::<Book>("b1", doc! { "title": "Timequake", "year": 1997 });
        assert!(matches!(missing, Err(ModelError::Decode { id, .. }) if id == "b1"));

        let null = decode::<Book>("b2", doc! { "title": "Timequake", "author": null, "year": 1997 });
        assert!(matches!(null, Err(ModelError::Decode { .. })));

        let bad_stamp = decode::<Book>(
            "b3",
            doc! { "title": "Timequake", "author": "KV", "year": 1997, "created": "yesterday" },
        );
        assert!(matches!(bad_stamp, Err(ModelError::Decode { .. })));
    }

    #[test]
    fn encode_rejects_unsupported_definitions() {
        let shelf = Shelf {
            meta: Meta::default(),
            labels: vec!["fiction".to_string()],
        };

        assert!(matches!(encode(&shelf), Err(ModelError::Schema { .. })));
    }

    #[test]
    fn encode_rejects_values_of_the_wrong_type() {
        let book = MisdeclaredBook {
            meta: Meta::default(),
            title: "Mother Night".to_string(),
            year: 1961,
        };

        let err = encode(&book).unwrap_err();
        assert!(matches!(err, ModelError::Encode(ref reason) if reason.contains("'year'")), "{err}");
    }

    #[test]
    fn encode_rejects_missing_required_values() {
        let draft = Draft {
            meta: Meta::default(),
            title: String::new(),
        };

        let err = encode(&draft).unwrap_err();
        assert!(matches!(err, ModelError::Encode(ref reason) if reason.contains("'title'")), "{err}");

        let titled = Draft {
            meta: Meta::default(),
            title: "Deadeye Dick".to_string(),
        };
        assert!(encode(&titled).is_ok());
    }

    #[test]
    fn encode_rejects_undeclared_fields() {
        let book = Catalogued {
            meta: Meta::default(),
            title: "Jailbird".to_string(),
            isbn: "0-440-15473-1".to_string(),
        };

        let err = encode(&book).unwrap_err();
        assert!(matches!(err, ModelError::Encode(ref reason) if reason.contains("'isbn'")), "{err}");
    }

    proptest! {
        #[test]
        fn decode_reverses_encode_for_any_values(
            id in "[a-z0-9][a-z0-9-]{0,23}",
            title in any::<String>(),
            rating in -1.0e12..1.0e12_f64,
            count in any::<i64>(),
            pages in any::<i32>(),
            note in proptest::option::of(any::<String>()),
            taken in proptest::option::of(-10_000_000_000_000_i64..10_000_000_000_000),
            finished in any::<bool>(),
            created in 0_i64..4_000_000_000_000,
            age in 0_i64..1_000_000_000,
        ) {
            let created = Timestamp::from_millis(created);
            let updated = Timestamp::from_millis(created.timestamp_millis() + age);
            let reading = Reading {
                meta: Meta::saved(id.clone(), created, updated),
                title,
                rating,
                count,
                pages,
                note,
                taken: taken.map(Timestamp::from_millis),
                finished,
            };

            let decoded: Reading = decode(id.as_str(), encode(&reading).unwrap()).unwrap();

            prop_assert_eq!(decoded, reading);
        }
    }

    #[test]
    fn validates_supplied_fields() {
        let ok = doc! { "title": "Galapagos", "author": "Kurt Vonnegut", "year": 1985 };
        assert!(validate_fields::<Book>(&ok).is_ok());

        let missing = doc! { "title": "Galapagos", "year": 1985 };
        assert!(matches!(validate_fields::<Book>(&missing), Err(ModelError::Validation(_))));

        let mistyped = doc! { "title": "Galapagos", "author": "Kurt Vonnegut", "year": "1985" };
        assert!(matches!(validate_fields::<Book>(&mistyped), Err(ModelError::Validation(_))));

        let unknown = doc! { "title": "Galapagos", "author": "Kurt Vonnegut", "year": 1985, "isbn": "x" };
        assert!(matches!(validate_fields::<Book>(&unknown), Err(ModelError::Validation(_))));

        let reserved = doc! { "title": "Galapagos", "author": "Kurt Vonnegut", "year": 1985, "id": "x" };
        assert!(matches!(validate_fields::<Book>(&reserved), Err(ModelError::Validation(_))));
    }

    #[test]
    fn json_includes_id() {
        let mut book = sirens();
        book.meta_mut().set_id("100800604002");

        let json = book.to_json().unwrap();

        assert_eq!(json["id"], "100800604002");
        assert_eq!(json["title"], "Sirens of Titan");
    }
}
