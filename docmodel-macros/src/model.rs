use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    Attribute, Data, DeriveInput, Field, Fields, Ident, LitStr, Token,
    meta::ParseNestedMeta,
};

pub fn derive_model(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as DeriveInput);

    expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let model_name = name.to_string();
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = named_fields(input)?;
    let container = ContainerAttrs::parse(&input.attrs)?;
    let meta_field = extract_meta_field(input, fields)?;

    let mut decls = Vec::new();
    for field in fields {
        let Some(ident) = &field.ident else { continue };
        if ident == &meta_field {
            continue;
        }

        let attrs = FieldAttrs::parse(&field.attrs)?;
        if attrs.skip {
            continue;
        }

        let stored = attrs.rename.unwrap_or_else(|| ident.to_string());
        let ty = &field.ty;
        let type_name = quote!(#ty)
            .to_string()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>();
        let has_default = attrs.default || container.default;

        decls.push(quote! {
            ::docmodel::schema::FieldDecl::new(#stored, #type_name, #has_default)
        });
    }

    let collection_name = container.collection.map(|collection| {
        quote! {
            fn collection_name() -> ::std::string::String {
                ::std::string::String::from(#collection)
            }
        }
    });

    Ok(quote! {
        impl #impl_generics ::docmodel::model::Model for #name #ty_generics #where_clause {
            fn model_name() -> &'static str {
                #model_name
            }

            fn fields() -> ::std::vec::Vec<::docmodel::schema::FieldDecl> {
                ::std::vec![#(#decls),*]
            }

            fn meta(&self) -> &::docmodel::model::Meta {
                &self.#meta_field
            }

            fn meta_mut(&mut self) -> &mut ::docmodel::model::Meta {
                &mut self.#meta_field
            }

            #collection_name
        }
    })
}

fn named_fields(input: &DeriveInput) -> syn::Result<&syn::punctuated::Punctuated<Field, Token![,]>> {
    match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => Ok(&fields.named),
            _ => Err(syn::Error::new_spanned(
                &input.ident,
                "Model derive: only structs with named fields are supported",
            )),
        },
        _ => Err(syn::Error::new_spanned(
            &input.ident,
            "Model derive: only structs are supported",
        )),
    }
}

/// The field marked `#[model(meta)]`, or else the field named `meta`.
fn extract_meta_field(
    input: &DeriveInput,
    fields: &syn::punctuated::Punctuated<Field, Token![,]>,
) -> syn::Result<Ident> {
    for field in fields {
        if FieldAttrs::parse(&field.attrs)?.meta {
            if let Some(ident) = &field.ident {
                return Ok(ident.clone());
            }
        }
    }

    fields
        .iter()
        .filter_map(|field| field.ident.as_ref())
        .find(|ident| *ident == "meta")
        .cloned()
        .ok_or_else(|| {
            syn::Error::new_spanned(
                &input.ident,
                "Model derive: add a `meta: docmodel::model::Meta` field marked #[serde(skip)], \
                 or mark one with #[model(meta)]",
            )
        })
}

#[derive(Default)]
struct ContainerAttrs {
    collection: Option<String>,
    default: bool,
}

impl ContainerAttrs {
    fn parse(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut parsed = Self::default();

        for attr in attrs {
            if attr.path().is_ident("model") {
                attr.parse_nested_meta(|meta| {
                    if meta.path.is_ident("collection") {
                        let value: LitStr = meta.value()?.parse()?;
                        parsed.collection = Some(value.value());
                        Ok(())
                    } else {
                        Err(meta.error("unknown model attribute, expected `collection`"))
                    }
                })?;
            } else if attr.path().is_ident("serde") {
                attr.parse_nested_meta(|meta| {
                    if meta.path.is_ident("default") {
                        parsed.default = true;
                    } else if meta.path.is_ident("rename_all") {
                        return Err(meta.error("Model derive: `rename_all` is not supported"));
                    }
                    skip_value(&meta)
                })?;
            }
        }

        Ok(parsed)
    }
}

#[derive(Default)]
struct FieldAttrs {
    meta: bool,
    skip: bool,
    default: bool,
    rename: Option<String>,
}

impl FieldAttrs {
    fn parse(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut parsed = Self::default();

        for attr in attrs {
            if attr.path().is_ident("model") {
                attr.parse_nested_meta(|meta| {
                    if meta.path.is_ident("meta") {
                        parsed.meta = true;
                    } else if meta.path.is_ident("default") {
                        parsed.default = true;
                    } else {
                        return Err(meta.error("unknown model attribute, expected `meta` or `default`"));
                    }
                    Ok(())
                })?;
            } else if attr.path().is_ident("serde") {
                attr.parse_nested_meta(|meta| {
                    if meta.path.is_ident("skip") {
                        parsed.skip = true;
                    } else if meta.path.is_ident("default") {
                        parsed.default = true;
                    } else if meta.path.is_ident("rename") && meta.input.peek(Token![=]) {
                        let value: LitStr = meta.value()?.parse()?;
                        parsed.rename = Some(value.value());
                        return Ok(());
                    }
                    skip_value(&meta)
                })?;
            }
        }

        Ok(parsed)
    }
}

/// Consumes the value of a serde option this derive does not interpret.
fn skip_value(meta: &ParseNestedMeta) -> syn::Result<()> {
    if meta.input.peek(Token![=]) {
        meta.value()?.parse::<syn::Expr>()?;
    } else if meta.input.peek(syn::token::Paren) {
        meta.parse_nested_meta(|inner| skip_value(&inner))?;
    }

    Ok(())
}
