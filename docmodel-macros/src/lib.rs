//! Procedural macros for the docmodel project.

mod model;

use proc_macro::TokenStream;

/// Derives `docmodel::model::Model` for a struct with named fields.
///
/// Every field except the metadata field is registered as a declared field, under its serde
/// name. The metadata field is the one named `meta`, or the one marked `#[model(meta)]`; it
/// must have type `docmodel::model::Meta` and should carry `#[serde(skip)]`.
///
/// # Attributes
///
/// - `#[model(collection = "...")]` on the struct overrides the collection name.
/// - `#[model(default)]` or `#[serde(default)]` on a field lets documents omit it.
/// - `#[serde(skip)]` on a field leaves it out of the schema.
///
/// ```ignore
/// #[derive(Debug, Clone, Serialize, Deserialize, Model)]
/// #[model(collection = "library")]
/// pub struct Book {
///     #[serde(skip)]
///     meta: Meta,
///     pub title: String,
///     pub author: String,
///     pub year: Option<i32>,
/// }
/// ```
#[proc_macro_derive(Model, attributes(model))]
pub fn derive_model(input: TokenStream) -> TokenStream {
    model::derive_model(input)
}
