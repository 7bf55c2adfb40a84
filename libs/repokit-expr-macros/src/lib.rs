//! # repokit-expr-macros
//!
//! Derive macro generating the static field registry of a record type, so
//! predicate expressions can name fields without runtime reflection.
//!
//! The generated code references `repokit-expr` types.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

use proc_macro::TokenStream;
use proc_macro_error2::proc_macro_error;
use syn::{DeriveInput, parse_macro_input};

mod record;

/// Derive the field registry of a record.
///
/// For `struct Customer` this generates:
/// - `CustomerField`: one variant per field, implementing `RecordField`
/// - `impl Record for Customer`
/// - `mod customer`: typed constructors such as
///   `customer::company() -> FieldRef<Customer, String>`
///
/// Field attributes:
/// - `#[record(name = "...")]` overrides the logical field name
/// - `#[record(kind = "...")]` sets the `FieldKind` explicitly
/// - `#[record(skip)]` leaves the field out of the registry
///
/// The kind is inferred from the field type when possible (`Option<T>` uses
/// the kind of `T`); other types need an explicit `kind`.
///
/// # Example
///
/// ```ignore
/// use repokit_expr_macros::Record;
///
/// #[derive(Record)]
/// pub struct Customer {
///     pub id: uuid::Uuid,
///     #[record(name = "company_name")]
///     pub company: String,
///     pub age: i64,
/// }
///
/// let filter = customer::company().starts_with("AC").and(customer::age().ge(18));
/// ```
#[proc_macro_derive(Record, attributes(record))]
#[proc_macro_error]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    record::expand_derive_record(&input).into()
}
