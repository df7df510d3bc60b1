//! Proc macros for chronicle records.
//!
//! Provides `#[derive(Record)]` to generate the shared record trait
//! (collection, id, scope, display name, search text, foreign keys)
//! from field annotations.
//!
//! # Example
//!
//! ```ignore
//! #[derive(Record)]
//! #[record(collection = Characters, prefix = "char")]
//! struct Character {
//!     #[record(id)]
//!     id: EntityId,
//!     #[record(display, search)]
//!     name: String,
//!     #[record(category)]
//!     kind: String,
//!     #[record(reference)]
//!     location: Option<EntityId>,
//!     #[record(search)]
//!     tags: Vec<String>,
//!     #[record(scope)]
//!     campaign_id: EntityId,
//! }
//! ```

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, DeriveInput, Field, Ident, LitStr, Type};

/// Derive macro for `chronicle_core::Record`.
///
/// # Attributes
///
/// - `#[record(collection = Variant, prefix = "...")]` on the struct - the
///   `CollectionName` variant holding these records and the id prefix used
///   when minting new ids (defaults to the snake_case struct name)
/// - `#[record(id)]` - the `EntityId` field
/// - `#[record(scope)]` - the owning campaign id; omit for unscoped records
/// - `#[record(display)]` - the label shown for references (`AsRef<str>`);
///   `#[record(display = "method")]` calls a `&str`-returning method instead
/// - `#[record(category)]` - the categorical field used by type filters
/// - `#[record(search)]` - included in case-insensitive text search
///   (`String`, `Option<String>` or `Vec<String>`)
/// - `#[record(reference)]` - a foreign key (`EntityId`, `Option<EntityId>`
///   or `Vec<EntityId>`)
#[proc_macro_derive(Record, attributes(record))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_record(input)
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}

/// How a field's type is shaped, which decides the generated accessors.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Shape {
    Plain,
    Optional,
    Many,
}

#[derive(Default)]
struct FieldFlags {
    id: bool,
    scope: bool,
    display: bool,
    display_with: Option<Ident>,
    category: bool,
    search: bool,
    reference: bool,
}

struct StructOptions {
    collection: Ident,
    prefix: String,
}

fn expand_record(input: DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = &input.ident;
    let options = get_struct_options(&input)?;

    let fields = match &input.data {
        syn::Data::Struct(data) => match &data.fields {
            syn::Fields::Named(named) => &named.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "Record derive only supports structs with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "Record derive only supports structs",
            ))
        }
    };

    let mut id_field = None;
    let mut scope_field = None;
    let mut display_field = None;
    let mut display_with = None;
    let mut category_field = None;
    let mut search_tokens = Vec::new();
    let mut reference_tokens = Vec::new();
    let mut clear_tokens = Vec::new();

    for field in fields {
        let flags = get_field_flags(field)?;
        let ident = field
            .ident
            .as_ref()
            .ok_or_else(|| syn::Error::new_spanned(field, "expected a named field"))?;
        let name = ident.to_string();
        let shape = shape_of(&field.ty);

        if flags.id {
            set_once(&mut id_field, ident, field, "id")?;
        }
        if flags.scope {
            set_once(&mut scope_field, ident, field, "scope")?;
        }
        if flags.display {
            set_once(&mut display_field, ident, field, "display")?;
            display_with = flags.display_with.clone();
        }
        if flags.category {
            set_once(&mut category_field, ident, field, "category")?;
        }

        if flags.search {
            search_tokens.push(match shape {
                Shape::Many => quote! {
                    out.extend(self.#ident.iter().map(|value| value.as_str()));
                },
                Shape::Optional => quote! {
                    if let Some(value) = &self.#ident {
                        out.push(value.as_str());
                    }
                },
                Shape::Plain => quote! {
                    out.push(::core::convert::AsRef::<str>::as_ref(&self.#ident));
                },
            });
        }

        // The scope field is a foreign key into the campaigns collection too.
        if flags.reference || flags.scope {
            reference_tokens.push(match shape {
                Shape::Many => quote! {
                    out.extend(self.#ident.iter().map(|id| (#name, id)));
                },
                Shape::Optional => quote! {
                    if let Some(id) = &self.#ident {
                        out.push((#name, id));
                    }
                },
                Shape::Plain => quote! {
                    out.push((#name, &self.#ident));
                },
            });

            match shape {
                Shape::Many => clear_tokens.push(quote! {
                    if field == #name {
                        let before = self.#ident.len();
                        self.#ident.retain(|id| id != target);
                        changed |= self.#ident.len() != before;
                    }
                }),
                Shape::Optional => clear_tokens.push(quote! {
                    if field == #name && self.#ident.as_ref() == Some(target) {
                        self.#ident = None;
                        changed = true;
                    }
                }),
                // A required key cannot be cleared, only its record removed.
                Shape::Plain => {}
            }
        }
    }

    let id_field = id_field.ok_or_else(|| {
        syn::Error::new_spanned(&input.ident, "Record derive needs a #[record(id)] field")
    })?;
    let display_field = display_field.ok_or_else(|| {
        syn::Error::new_spanned(
            &input.ident,
            "Record derive needs a #[record(display)] field",
        )
    })?;

    let display_body = match &display_with {
        Some(method) => quote! { self.#display_field.#method() },
        None => quote! { ::core::convert::AsRef::<str>::as_ref(&self.#display_field) },
    };

    let scoped = scope_field.is_some();
    let scope_body = match &scope_field {
        Some(ident) => quote! { Some(&self.#ident) },
        None => quote! { None },
    };
    let category_body = match &category_field {
        Some(ident) => quote! { Some(::core::convert::AsRef::<str>::as_ref(&self.#ident)) },
        None => quote! { None },
    };

    let collection = &options.collection;
    let prefix = &options.prefix;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::chronicle_core::record::Record for #struct_name #ty_generics #where_clause {
            const COLLECTION: ::chronicle_core::record::CollectionName =
                ::chronicle_core::record::CollectionName::#collection;
            const ID_PREFIX: &'static str = #prefix;
            const SCOPED: bool = #scoped;

            fn id(&self) -> &::chronicle_core::id::EntityId {
                &self.#id_field
            }

            fn scope(&self) -> Option<&::chronicle_core::id::EntityId> {
                #scope_body
            }

            fn display_name(&self) -> &str {
                #display_body
            }

            fn category(&self) -> Option<&str> {
                #category_body
            }

            fn search_fields(&self) -> Vec<&str> {
                let mut out: Vec<&str> = Vec::new();
                #(#search_tokens)*
                out
            }

            fn references(&self) -> Vec<(&'static str, &::chronicle_core::id::EntityId)> {
                let mut out: Vec<(&'static str, &::chronicle_core::id::EntityId)> = Vec::new();
                #(#reference_tokens)*
                out
            }

            fn clear_reference(
                &mut self,
                field: &str,
                target: &::chronicle_core::id::EntityId,
            ) -> bool {
                let _ = (field, target);
                #[allow(unused_mut)]
                let mut changed = false;
                #(#clear_tokens)*
                changed
            }
        }
    })
}

fn set_once<'a>(
    slot: &mut Option<&'a Ident>,
    ident: &'a Ident,
    field: &Field,
    flag: &str,
) -> syn::Result<()> {
    if slot.is_some() {
        return Err(syn::Error::new_spanned(
            field,
            format!("only one field may be marked #[record({flag})]"),
        ));
    }
    *slot = Some(ident);
    Ok(())
}

fn get_struct_options(input: &DeriveInput) -> syn::Result<StructOptions> {
    let mut collection = None;
    let mut prefix = None;

    for attr in &input.attrs {
        if !attr.path().is_ident("record") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("collection") {
                collection = Some(meta.value()?.parse::<Ident>()?);
                Ok(())
            } else if meta.path.is_ident("prefix") {
                prefix = Some(meta.value()?.parse::<LitStr>()?.value());
                Ok(())
            } else {
                Err(meta.error("unsupported record attribute, expected `collection` or `prefix`"))
            }
        })?;
    }

    let collection = collection.ok_or_else(|| {
        syn::Error::new_spanned(
            &input.ident,
            "Record derive needs #[record(collection = Variant)]",
        )
    })?;

    // Default: convert struct name to snake_case
    let prefix = prefix.unwrap_or_else(|| to_snake_case(&input.ident.to_string()));

    Ok(StructOptions { collection, prefix })
}

fn get_field_flags(field: &Field) -> syn::Result<FieldFlags> {
    let mut flags = FieldFlags::default();
    for attr in &field.attrs {
        if !attr.path().is_ident("record") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            let flag = if meta.path.is_ident("id") {
                &mut flags.id
            } else if meta.path.is_ident("scope") {
                &mut flags.scope
            } else if meta.path.is_ident("display") {
                if meta.input.peek(syn::Token![=]) {
                    let method: LitStr = meta.value()?.parse()?;
                    flags.display_with = Some(method.parse()?);
                }
                &mut flags.display
            } else if meta.path.is_ident("category") {
                &mut flags.category
            } else if meta.path.is_ident("search") {
                &mut flags.search
            } else if meta.path.is_ident("reference") {
                &mut flags.reference
            } else {
                return Err(meta.error("unsupported record field attribute"));
            };
            *flag = true;
            Ok(())
        })?;
    }
    Ok(flags)
}

fn shape_of(ty: &Type) -> Shape {
    if let Type::Path(type_path) = ty {
        if let Some(segment) = type_path.path.segments.last() {
            if segment.ident == "Option" {
                return Shape::Optional;
            }
            if segment.ident == "Vec" {
                return Shape::Many;
            }
        }
    }
    Shape::Plain
}

fn to_snake_case(s: &str) -> String {
    let mut result = String::new();
    for (i, c) in s.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                result.push('_');
            }
            result.push(c.to_ascii_lowercase());
        } else {
            result.push(c);
        }
    }
    result
}
