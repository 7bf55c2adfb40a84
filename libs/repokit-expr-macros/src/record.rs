use heck::{ToSnakeCase, ToUpperCamelCase};
use proc_macro2::{Span, TokenStream};
use proc_macro_error2::{abort, emit_error};
use quote::quote;
use syn::{
    Data, DeriveInput, Fields, GenericArgument, Ident, Lit, PathArguments, Type, spanned::Spanned,
};

const KINDS: &[&str] = &[
    "String",
    "I64",
    "F64",
    "Bool",
    "Uuid",
    "DateTimeUtc",
    "Date",
    "Time",
    "Decimal",
];

/// One registry entry
struct RecordFieldDef {
    field_ident: Ident,
    /// Logical name used in expressions
    name: String,
    kind: String,
    ty: Type,
    span: Span,
}

#[derive(Default)]
struct FieldAttrs {
    name: Option<String>,
    kind: Option<String>,
    skip: bool,
}

fn parse_field_attrs(field: &syn::Field) -> FieldAttrs {
    let mut attrs = FieldAttrs::default();

    for attr in &field.attrs {
        if !attr.path().is_ident("record") {
            continue;
        }

        let result = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                attrs.skip = true;
                return Ok(());
            }
            if meta.path.is_ident("name") || meta.path.is_ident("kind") {
                let lit: Lit = meta.value()?.parse()?;
                let Lit::Str(lit_str) = lit else {
                    emit_error!(meta.path.span(), "record attribute values must be string literals");
                    return Ok(());
                };
                if meta.path.is_ident("name") {
                    attrs.name = Some(lit_str.value());
                } else {
                    attrs.kind = Some(lit_str.value());
                }
                return Ok(());
            }
            Err(meta.error("unknown record attribute, expected `name`, `kind` or `skip`"))
        });

        if let Err(e) = result {
            emit_error!(attr.span(), "Failed to parse #[record] attribute: {}", e);
        }
    }

    attrs
}

/// Map a field type to a `FieldKind` variant name by its last path segment.
fn infer_kind(ty: &Type) -> Option<&'static str> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;

    if segment.ident == "Option" {
        let PathArguments::AngleBracketed(args) = &segment.arguments else {
            return None;
        };
        return args.args.iter().find_map(|arg| match arg {
            GenericArgument::Type(inner) => infer_kind(inner),
            _ => None,
        });
    }

    let kind = match segment.ident.to_string().as_str() {
        "String" => "String",
        "i8" | "i16" | "i32" | "i64" | "u8" | "u16" | "u32" | "u64" | "isize" | "usize" => "I64",
        "f32" | "f64" => "F64",
        "bool" => "Bool",
        "Uuid" => "Uuid",
        "DateTime" => "DateTimeUtc",
        "NaiveDate" => "Date",
        "NaiveTime" => "Time",
        "Decimal" | "BigDecimal" => "Decimal",
        _ => return None,
    };
    Some(kind)
}

pub fn expand_derive_record(input: &DeriveInput) -> TokenStream {
    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => abort!(input, "#[derive(Record)] requires a struct with named fields"),
        },
        _ => abort!(input, "#[derive(Record)] can only be applied to structs"),
    };

    if !input.generics.params.is_empty() {
        abort!(input.generics, "#[derive(Record)] does not support generic structs");
    }

    let mut defs = Vec::new();
    for field in fields {
        let Some(field_ident) = field.ident.clone() else {
            abort!(field, "#[derive(Record)] requires named fields");
        };
        let attrs = parse_field_attrs(field);
        if attrs.skip {
            continue;
        }

        let kind = match attrs.kind {
            Some(kind) if KINDS.contains(&kind.as_str()) => kind,
            Some(kind) => {
                emit_error!(
                    field.span(),
                    "unknown field kind `{}`, expected one of: {}",
                    kind,
                    KINDS.join(", ")
                );
                continue;
            }
            None => {
                if let Some(kind) = infer_kind(&field.ty) {
                    kind.to_owned()
                } else {
                    emit_error!(
                        field.ty.span(),
                        "cannot infer the field kind, add #[record(kind = \"...\")] or #[record(skip)]"
                    );
                    continue;
                }
            }
        };

        defs.push(RecordFieldDef {
            name: attrs.name.unwrap_or_else(|| field_ident.to_string()),
            field_ident,
            kind,
            ty: field.ty.clone(),
            span: field.span(),
        });
    }

    let struct_name = &input.ident;
    let vis = &input.vis;
    let field_enum_name = Ident::new(&format!("{struct_name}Field"), struct_name.span());
    let module_name = Ident::new(&struct_name.to_string().to_snake_case(), struct_name.span());

    let variants: Vec<Ident> = defs
        .iter()
        .map(|d| Ident::new(&d.field_ident.to_string().to_upper_camel_case(), d.span))
        .collect();

    let name_arms = defs.iter().zip(&variants).map(|(d, variant)| {
        let name = &d.name;
        quote! { #field_enum_name::#variant => #name }
    });

    let kind_arms = defs.iter().zip(&variants).map(|(d, variant)| {
        let kind = Ident::new(&d.kind, d.span);
        quote! { #field_enum_name::#variant => ::repokit_expr::schema::FieldKind::#kind }
    });

    let constructors = defs.iter().zip(&variants).map(|(d, variant)| {
        let fn_name = &d.field_ident;
        let ty = &d.ty;
        let doc = format!("Field reference for `{}`.", d.name);
        quote! {
            #[doc = #doc]
            #[must_use]
            pub fn #fn_name() -> ::repokit_expr::schema::FieldRef<super::#struct_name, #ty> {
                ::repokit_expr::schema::FieldRef::new(super::#field_enum_name::#variant)
            }
        }
    });

    // Empty enums match with no arms.
    let name_body = if variants.is_empty() {
        quote! { match *self {} }
    } else {
        quote! { match self { #(#name_arms,)* } }
    };
    let kind_body = if variants.is_empty() {
        quote! { match *self {} }
    } else {
        quote! { match self { #(#kind_arms,)* } }
    };

    quote! {
        #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
        #vis enum #field_enum_name {
            #(#variants,)*
        }

        impl ::repokit_expr::schema::RecordField for #field_enum_name {
            const FIELDS: &'static [Self] = &[
                #(#field_enum_name::#variants,)*
            ];

            fn name(&self) -> &'static str {
                #name_body
            }

            fn kind(&self) -> ::repokit_expr::schema::FieldKind {
                #kind_body
            }
        }

        impl ::repokit_expr::schema::Record for #struct_name {
            type Field = #field_enum_name;
        }

        #[allow(dead_code)]
        #vis mod #module_name {
            #[allow(unused_imports, clippy::wildcard_imports)]
            use super::*;

            #(#constructors)*
        }
    }
}
