//! Field schemas for record definitions.
//!
//! A record definition registers its fields as a list of [`FieldDecl`]s, normally generated
//! by `#[derive(Model)]`. The declarations are parsed once per type into a [`Schema`], which
//! the codec and the query builder consult. Parsed schemas are cached process-wide.
//!
//! Supported field types are strings, numbers, booleans and timestamps, each optionally
//! wrapped in `Option<..>`:
//!
//! | Declared type | [`FieldType`] |
//! |---|---|
//! | `String` | `String` |
//! | `i8` .. `i64`, `u8` .. `u64`, `isize`, `usize`, `f32`, `f64` | `Number` |
//! | `bool` | `Boolean` |
//! | `Timestamp`, `bson::DateTime` | `Timestamp` |

use std::{
    any::TypeId,
    collections::{HashMap, HashSet},
    fmt,
    sync::{Arc, OnceLock},
};

use bson::Bson;
use parking_lot::RwLock;

use crate::{
    error::{ModelError, ModelResult},
    model::Model,
};

/// Name of the implicit identifier attribute. It is the document key, never a stored field.
pub const ID_FIELD: &str = "id";
/// Name of the implicit creation timestamp field.
pub const CREATED_FIELD: &str = "created";
/// Name of the implicit modification timestamp field.
pub const UPDATED_FIELD: &str = "updated";

/// Field names a record definition may not declare.
pub const RESERVED_FIELDS: [&str; 3] = [ID_FIELD, CREATED_FIELD, UPDATED_FIELD];

const NUMBER_TYPES: [&str; 12] = [
    "i8", "i16", "i32", "i64", "isize", "u8", "u16", "u32", "u64", "usize", "f32", "f64",
];

/// Raw registration of one declared field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDecl {
    /// The stored field name.
    pub name: &'static str,
    /// The declared Rust type, as written in the record definition.
    pub type_name: &'static str,
    /// Whether decoding may fill the field from its default when it is absent.
    pub has_default: bool,
}

impl FieldDecl {
    pub const fn new(name: &'static str, type_name: &'static str, has_default: bool) -> Self {
        Self { name, type_name, has_default }
    }
}

/// The primitive kinds a field can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Timestamp,
}

impl FieldType {
    /// Parses a declared Rust type into a field type and whether it is optional.
    ///
    /// Returns `None` if the type is outside the supported set.
    pub fn parse(type_name: &str) -> Option<(FieldType, bool)> {
        let compact = type_name
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>();

        if let Some(inner) = strip_option(&compact) {
            return FieldType::parse_plain(inner).map(|field_type| (field_type, true));
        }

        FieldType::parse_plain(&compact).map(|field_type| (field_type, false))
    }

    fn parse_plain(type_name: &str) -> Option<FieldType> {
        if type_name.contains('<') {
            return None;
        }

        let last = type_name
            .rsplit("::")
            .next()
            .unwrap_or(type_name);

        match last {
            "String" => Some(FieldType::String),
            "bool" => Some(FieldType::Boolean),
            "Timestamp" | "DateTime" => Some(FieldType::Timestamp),
            number if NUMBER_TYPES.contains(&number) => Some(FieldType::Number),
            _ => None,
        }
    }

    /// Returns `true` if `value` is a non-null value of this type.
    pub fn accepts(&self, value: &Bson) -> bool {
        matches!(
            (self, value),
            (FieldType::String, Bson::String(_))
                | (FieldType::Number, Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_))
                | (FieldType::Boolean, Bson::Boolean(_))
                | (FieldType::Timestamp, Bson::DateTime(_))
        )
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Timestamp => "timestamp",
        };

        f.write_str(name)
    }
}

fn strip_option(type_name: &str) -> Option<&str> {
    ["Option<", "std::option::Option<", "core::option::Option<"]
        .iter()
        .find_map(|prefix| type_name.strip_prefix(prefix))
        .and_then(|rest| rest.strip_suffix('>'))
}

/// Human-readable name of a BSON value's type, for error messages.
pub(crate) fn bson_type_name(value: &Bson) -> &'static str {
    match value {
        Bson::Null => "null",
        Bson::String(_) => "string",
        Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) => "number",
        Bson::Boolean(_) => "boolean",
        Bson::DateTime(_) => "timestamp",
        Bson::Array(_) => "array",
        Bson::Document(_) => "document",
        _ => "unsupported value",
    }
}

/// A parsed field of a record definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    name: String,
    field_type: FieldType,
    optional: bool,
    has_default: bool,
}

impl FieldSpec {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    /// Whether the field accepts null.
    pub fn is_optional(&self) -> bool {
        self.optional
    }

    /// Whether a document must carry a non-null value for this field.
    pub fn is_required(&self) -> bool {
        !self.optional && !self.has_default
    }

    /// Checks a value against this field. Null is accepted only for optional fields.
    pub fn accepts(&self, value: &Bson) -> bool {
        match value {
            Bson::Null => self.optional,
            other => self.field_type.accepts(other),
        }
    }
}

/// The ordered set of declared fields of one record definition.
///
/// The implicit `id`, `created` and `updated` attributes are not part of the field list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    model: String,
    fields: Vec<FieldSpec>,
}

impl Schema {
    /// Parses field declarations into a schema.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Schema`] if a field has an unsupported type, uses a reserved
    /// name, or is declared twice.
    pub fn from_decls(model: &str, decls: &[FieldDecl]) -> ModelResult<Schema> {
        let mut seen = HashSet::new();
        let mut fields = Vec::with_capacity(decls.len());

        for decl in decls {
            let schema_error = |reason: String| ModelError::Schema {
                model: model.to_string(),
                reason,
            };

            if RESERVED_FIELDS.contains(&decl.name) {
                return Err(schema_error(format!(
                    "field '{}' is reserved for record metadata",
                    decl.name
                )));
            }
            if !seen.insert(decl.name) {
                return Err(schema_error(format!("field '{}' is declared twice", decl.name)));
            }

            let (field_type, optional) = FieldType::parse(decl.type_name).ok_or_else(|| {
                schema_error(format!(
                    "field '{}' has unsupported type `{}`",
                    decl.name, decl.type_name
                ))
            })?;

            fields.push(FieldSpec {
                name: decl.name.to_string(),
                field_type,
                optional,
                has_default: decl.has_default,
            });
        }

        Ok(Schema { model: model.to_string(), fields })
    }

    /// Returns the cached schema of `M`, parsing it on first use.
    ///
    /// A definition that fails to parse is not cached; every call reports the error again.
    pub fn of<M: Model>() -> ModelResult<Arc<Schema>> {
        static REGISTRY: OnceLock<RwLock<HashMap<TypeId, Arc<Schema>>>> = OnceLock::new();

        let registry = REGISTRY.get_or_init(Default::default);
        let key = TypeId::of::<M>();

        if let Some(schema) = registry.read().get(&key) {
            return Ok(schema.clone());
        }

        let schema = Arc::new(Schema::from_decls(M::model_name(), &M::fields())?);

        Ok(registry
            .write()
            .entry(key)
            .or_insert(schema)
            .clone())
    }

    /// The record definition this schema describes.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Declared fields, in declaration order.
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Looks up a declared field by name.
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields
            .iter()
            .find(|field| field.name == name)
    }

    /// Returns `true` if `name` can appear in a filter: a declared field or one of the
    /// implicit attributes.
    pub fn is_queryable(&self, name: &str) -> bool {
        RESERVED_FIELDS.contains(&name) || self.field(name).is_some()
    }
}
