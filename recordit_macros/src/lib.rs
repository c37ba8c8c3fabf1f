//! Procedural macros for the `recordit` active-record library.
//!
//! `#[derive(Entity)]` inspects a struct once, at compile time, and generates:
//! - an `Entity` impl carrying the type name, optional table/primary-key
//!   overrides, and the declaration-ordered field/column descriptor list;
//! - a field accessor used by the persistence path;
//! - a `FromRow` impl mapping a backend-neutral row back into the struct.

use proc_macro::TokenStream;
use quote::{quote, ToTokens};
use syn::{parse_macro_input, spanned::Spanned, Data, DeriveInput, Fields, Ident, LitStr, Type};

use inflections::Inflect;

// --- Helper Functions for Parsing ---

/// Helper to get the inner type of an `Option<T>`.
fn get_option_inner(ty: &Type) -> Option<&Type> {
    if let Type::Path(type_path) = ty {
        let path = &type_path.path;
        if path.segments.last().is_some_and(|s| s.ident == "Option") {
            if let Some(segment) = path.segments.last() {
                if let syn::PathArguments::AngleBracketed(args) = &segment.arguments {
                    if let Some(syn::GenericArgument::Type(inner_ty)) = args.args.first() {
                        return Some(inner_ty);
                    }
                }
            }
        }
    }
    None
}

/// Maps a field type onto a `FieldKind` variant name. `Option<T>` takes the kind of `T`.
fn field_kind(ty: &Type) -> &'static str {
    let scalar = get_option_inner(ty).unwrap_or(ty);
    let ty_str = scalar.to_token_stream().to_string().replace(' ', "");
    match ty_str.as_str() {
        "bool" => "Bool",
        "i8" => "I8",
        "i16" => "I16",
        "i32" => "I32",
        "i64" => "I64",
        "u8" => "U8",
        "u16" => "U16",
        "u32" => "U32",
        "f32" => "F32",
        "f64" => "F64",
        "char" => "Char",
        "String" | "std::string::String" | "::std::string::String" => "String",
        _ => "Unsupported",
    }
}

/// Basic validation of table and column names to avoid generating invalid SQL identifiers.
fn is_valid_ident(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|ch| ch == '_' || ch.is_ascii_alphanumeric())
}

/// Holds parsed metadata about a single struct field.
struct FieldMetadata {
    ident: Ident,
    name: String,
    column_name: String,
    kind: &'static str,
    is_id: bool,
    is_skipped: bool,
}

/// Parses all named fields from a `DeriveInput` struct.
fn parse_field_metadata(input: &DeriveInput) -> syn::Result<Vec<FieldMetadata>> {
    let fields = match &input.data {
        Data::Struct(s) => match &s.fields {
            Fields::Named(named) => named,
            _ => {
                return Err(syn::Error::new(
                    input.ident.span(),
                    "#[derive(Entity)] only supports structs with named fields.",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new(
                input.ident.span(),
                "#[derive(Entity)] can only be used on structs.",
            ))
        }
    };

    let mut out = Vec::with_capacity(fields.named.len());
    for field in &fields.named {
        let ident = field
            .ident
            .clone()
            .ok_or_else(|| syn::Error::new(field.span(), "expected a named field"))?;
        let raw = ident.to_string();
        let name = raw.strip_prefix("r#").unwrap_or(&raw).to_string();
        let mut column_name = name.to_snake_case();
        let mut is_id = false;
        let mut is_skipped = false;

        for attr in &field.attrs {
            if !attr.path().is_ident("fetch") {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("column") {
                    let s: LitStr = meta.value()?.parse()?;
                    column_name = s.value();
                    Ok(())
                } else if meta.path.is_ident("id") {
                    is_id = true;
                    Ok(())
                } else if meta.path.is_ident("skip") {
                    is_skipped = true;
                    Ok(())
                } else {
                    Err(meta.error("unknown #[fetch(...)] option; expected `column = \"...\"`, `id`, or `skip`"))
                }
            })?;
        }

        if !is_skipped && !is_valid_ident(&column_name) {
            return Err(syn::Error::new(
                field.span(),
                format!(
                    "Invalid column name `{}`. Use ASCII letters, digits, or `_`, starting with a letter or `_`.",
                    column_name
                ),
            ));
        }

        out.push(FieldMetadata {
            ident,
            name,
            column_name,
            kind: field_kind(&field.ty),
            is_id,
            is_skipped,
        });
    }
    Ok(out)
}

/// Parsed `#[entity(table = "...", pk = "...")]`.
#[derive(Default)]
struct EntityArgs {
    table: Option<String>,
    pk: Option<String>,
}

fn parse_entity_args(input: &DeriveInput) -> syn::Result<EntityArgs> {
    let mut args = EntityArgs::default();
    for attr in &input.attrs {
        if !attr.path().is_ident("entity") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table") {
                let s: LitStr = meta.value()?.parse()?;
                args.table = Some(s.value());
                Ok(())
            } else if meta.path.is_ident("pk") {
                let s: LitStr = meta.value()?.parse()?;
                args.pk = Some(s.value());
                Ok(())
            } else {
                Err(meta.error("unknown #[entity(...)] option; expected `table` or `pk`"))
            }
        })?;
    }
    for name in [&args.table, &args.pk].into_iter().flatten() {
        if !name.is_empty() && !is_valid_ident(name) {
            return Err(syn::Error::new(
                input.ident.span(),
                format!(
                    "Invalid identifier `{}`. Use ASCII letters, digits, or `_`, starting with a letter or `_`.",
                    name
                ),
            ));
        }
    }
    Ok(args)
}

fn option_tokens(value: Option<&str>) -> proc_macro2::TokenStream {
    match value {
        Some(v) => quote! { ::core::option::Option::Some(#v) },
        None => quote! { ::core::option::Option::None },
    }
}

// --- `Entity` derive macro ---

#[proc_macro_derive(Entity, attributes(entity, fetch))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_entity(&input) {
        Ok(ts) => ts.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

fn expand_entity(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let struct_name = &input.ident;
    let type_name = struct_name.to_string();
    let args = parse_entity_args(input)?;
    let fields_metadata = parse_field_metadata(input)?;

    let id_fields: Vec<_> = fields_metadata
        .iter()
        .filter(|f| f.is_id && !f.is_skipped)
        .collect();
    if id_fields.len() > 1 {
        return Err(syn::Error::new(
            struct_name.span(),
            format!(
                "At most one field may be marked with #[fetch(id)] (found {}).",
                id_fields.len()
            ),
        ));
    }

    // An explicit #[entity(pk)] wins over a #[fetch(id)] field.
    let pk = args
        .pk
        .as_deref()
        .or_else(|| id_fields.first().map(|f| f.column_name.as_str()));
    let table_tokens = option_tokens(args.table.as_deref());
    let pk_tokens = option_tokens(pk);

    let mapped: Vec<_> = fields_metadata.iter().filter(|f| !f.is_skipped).collect();

    let descriptors: Vec<_> = mapped
        .iter()
        .map(|f| {
            let name = &f.name;
            let column = &f.column_name;
            let kind = Ident::new(f.kind, f.ident.span());
            quote! {
                ::recordit_core::FieldDescriptor::new(#name, #column, ::recordit_core::FieldKind::#kind)
            }
        })
        .collect();

    let accessors: Vec<_> = mapped
        .iter()
        .filter(|f| f.kind != "Unsupported")
        .map(|f| {
            let name = &f.name;
            let ident = &f.ident;
            quote! {
                #name => ::core::option::Option::Some(::recordit_core::Value::from(
                    ::core::clone::Clone::clone(&self.#ident),
                ))
            }
        })
        .collect();

    let entity_impl = quote! {
        impl ::recordit_core::Entity for #struct_name {
            const TYPE_NAME: &'static str = #type_name;
            const TABLE: ::core::option::Option<&'static str> = #table_tokens;
            const PRIMARY_KEY: ::core::option::Option<&'static str> = #pk_tokens;
            const FIELDS: &'static [::recordit_core::FieldDescriptor] = &[#(#descriptors),*];

            fn field_value(&self, field: &str) -> ::core::option::Option<::recordit_core::Value> {
                match field {
                    #(#accessors,)*
                    _ => ::core::option::Option::None,
                }
            }
        }
    };

    // Skipped and unsupported fields are not read from rows; columns missing
    // from a narrowed projection fall back to the field type's default.
    let row_mappings: Vec<_> = fields_metadata
        .iter()
        .map(|f| {
            let ident = &f.ident;
            if f.is_skipped || f.kind == "Unsupported" {
                return quote! { #ident: ::core::default::Default::default() };
            }
            let col_name_lit = LitStr::new(&f.column_name, ident.span());
            quote! {
                #ident: row.try_get(#col_name_lit)?.unwrap_or_default()
            }
        })
        .collect();

    let from_row_impl = quote! {
        impl ::recordit_core::FromRow for #struct_name {
            fn from_row(row: &::recordit_core::Row) -> ::recordit_core::RecordResult<Self> {
                ::core::result::Result::Ok(#struct_name {
                    #(#row_mappings),*
                })
            }
        }
    };

    Ok(quote! {
        #entity_impl
        #from_row_impl
    })
}
