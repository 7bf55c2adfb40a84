//! Record schemas: the static field registry and typed field references.
//!
//! This module defines the compile-time replacement for property reflection:
//! - `RecordField`: enumerates a record's fields with their names and kinds
//! - `Record`: binds a record type to its field enum
//! - `FieldRef`: typed field reference used to build predicate expressions
//! - `IntoValue` / `IntoOperand`: conversions into literals and operands
//!
//! Implementations are normally generated with `#[derive(Record)]` from
//! `repokit-expr-macros`.

use std::fmt;
use std::marker::PhantomData;

use bigdecimal::{BigDecimal, FromPrimitive};

use crate::ast::{BinaryOp, Expr, Value};

/// Logical field types known to the registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldKind {
    String,
    I64,
    F64,
    Bool,
    Uuid,
    DateTimeUtc,
    Date,
    Time,
    Decimal,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::String => write!(f, "String"),
            FieldKind::I64 => write!(f, "I64"),
            FieldKind::F64 => write!(f, "F64"),
            FieldKind::Bool => write!(f, "Bool"),
            FieldKind::Uuid => write!(f, "Uuid"),
            FieldKind::DateTimeUtc => write!(f, "DateTimeUtc"),
            FieldKind::Date => write!(f, "Date"),
            FieldKind::Time => write!(f, "Time"),
            FieldKind::Decimal => write!(f, "Decimal"),
        }
    }
}

/// The set of fields of one record type.
///
/// # Example
///
/// ```
/// use repokit_expr::schema::{FieldKind, RecordField};
///
/// #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
/// enum CustomerField {
///     Id,
///     Company,
/// }
///
/// impl RecordField for CustomerField {
///     const FIELDS: &'static [Self] = &[Self::Id, Self::Company];
///
///     fn name(&self) -> &'static str {
///         match self {
///             Self::Id => "id",
///             Self::Company => "company",
///         }
///     }
///
///     fn kind(&self) -> FieldKind {
///         match self {
///             Self::Id => FieldKind::Uuid,
///             Self::Company => FieldKind::String,
///         }
///     }
/// }
///
/// assert_eq!(CustomerField::from_name("Company"), Some(CustomerField::Company));
/// assert_eq!(CustomerField::from_name("phone"), None);
/// ```
pub trait RecordField: Copy + Eq + std::hash::Hash + fmt::Debug + Send + Sync + 'static {
    /// All fields of the record.
    const FIELDS: &'static [Self];

    /// Logical name, as used in expressions and by query executors.
    fn name(&self) -> &'static str;

    fn kind(&self) -> FieldKind;

    /// Resolve a field by logical name, ignoring ASCII case.
    fn from_name(name: &str) -> Option<Self> {
        Self::FIELDS
            .iter()
            .copied()
            .find(|f| f.name().eq_ignore_ascii_case(name))
    }
}

/// A record type whose fields can appear in predicate expressions.
pub trait Record {
    type Field: RecordField;
}

/// Type-safe field reference bound to a record and the field's Rust type.
///
/// Equality and hashing only consider the underlying field; `T` exists to
/// gate operations at compile time (string methods need a text field).
pub struct FieldRef<R: Record, T> {
    field: R::Field,
    _phantom: PhantomData<fn() -> (R, T)>,
}

impl<R: Record, T> FieldRef<R, T> {
    /// Create a new typed field reference.
    #[must_use]
    pub const fn new(field: R::Field) -> Self {
        Self {
            field,
            _phantom: PhantomData,
        }
    }

    #[must_use]
    pub fn field(&self) -> R::Field {
        self.field
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.field.name()
    }

    /// Field read on the record parameter.
    #[must_use]
    pub fn expr(&self) -> Expr {
        Expr::field(self.name())
    }

    fn compare(self, op: BinaryOp, operand: impl IntoOperand) -> Expr {
        Expr::binary(op, self.expr(), operand)
    }

    /// `x.field == operand`
    #[must_use]
    pub fn eq(self, operand: impl IntoOperand) -> Expr {
        self.compare(BinaryOp::Eq, operand)
    }

    /// `x.field != operand`
    #[must_use]
    pub fn ne(self, operand: impl IntoOperand) -> Expr {
        self.compare(BinaryOp::Ne, operand)
    }

    /// `x.field > operand`
    #[must_use]
    pub fn gt(self, operand: impl IntoOperand) -> Expr {
        self.compare(BinaryOp::Gt, operand)
    }

    /// `x.field >= operand`
    #[must_use]
    pub fn ge(self, operand: impl IntoOperand) -> Expr {
        self.compare(BinaryOp::Ge, operand)
    }

    /// `x.field < operand`
    #[must_use]
    pub fn lt(self, operand: impl IntoOperand) -> Expr {
        self.compare(BinaryOp::Lt, operand)
    }

    /// `x.field <= operand`
    #[must_use]
    pub fn le(self, operand: impl IntoOperand) -> Expr {
        self.compare(BinaryOp::Le, operand)
    }
}

/// Marker for field types that support string methods.
pub trait TextField {}

impl TextField for String {}
impl TextField for Option<String> {}

/// String methods (only available for text fields).
impl<R: Record, T: TextField> FieldRef<R, T> {
    fn string_method(self, method: &str, operand: impl IntoOperand) -> Expr {
        Expr::method(self.expr(), method, vec![operand.into_operand()])
    }

    /// `x.field.starts_with(prefix)`
    #[must_use]
    pub fn starts_with(self, prefix: impl IntoOperand) -> Expr {
        self.string_method("starts_with", prefix)
    }

    /// `x.field.ends_with(suffix)`
    #[must_use]
    pub fn ends_with(self, suffix: impl IntoOperand) -> Expr {
        self.string_method("ends_with", suffix)
    }

    /// `x.field.contains(needle)`
    #[must_use]
    pub fn contains(self, needle: impl IntoOperand) -> Expr {
        self.string_method("contains", needle)
    }

    /// `x.field.equals(other)`
    #[must_use]
    pub fn equals(self, other: impl IntoOperand) -> Expr {
        self.string_method("equals", other)
    }
}

impl<R: Record, T> Clone for FieldRef<R, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R: Record, T> Copy for FieldRef<R, T> {}

impl<R: Record, T> fmt::Debug for FieldRef<R, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldRef")
            .field("field", &self.name())
            .finish()
    }
}

impl<R: Record, T> PartialEq for FieldRef<R, T> {
    fn eq(&self, other: &Self) -> bool {
        self.field == other.field
    }
}

impl<R: Record, T> Eq for FieldRef<R, T> {}

impl<R: Record, T> std::hash::Hash for FieldRef<R, T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.field.hash(state);
    }
}

/// Types that can be used as literal values in expressions.
pub trait IntoValue {
    fn into_value(self) -> Value;
}

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl IntoValue for bool {
    fn into_value(self) -> Value {
        Value::Bool(self)
    }
}

impl IntoValue for String {
    fn into_value(self) -> Value {
        Value::String(self)
    }
}

impl IntoValue for &str {
    fn into_value(self) -> Value {
        Value::String(self.to_owned())
    }
}

impl IntoValue for &String {
    fn into_value(self) -> Value {
        Value::String(self.clone())
    }
}

impl IntoValue for i32 {
    fn into_value(self) -> Value {
        Value::Number(self.into())
    }
}

impl IntoValue for i64 {
    fn into_value(self) -> Value {
        Value::Number(self.into())
    }
}

impl IntoValue for u32 {
    fn into_value(self) -> Value {
        Value::Number(self.into())
    }
}

impl IntoValue for u64 {
    fn into_value(self) -> Value {
        Value::Number(self.into())
    }
}

/// Non-finite floats have no decimal form and become `Null`.
impl IntoValue for f64 {
    fn into_value(self) -> Value {
        BigDecimal::from_f64(self).map_or(Value::Null, Value::Number)
    }
}

impl IntoValue for BigDecimal {
    fn into_value(self) -> Value {
        Value::Number(self)
    }
}

impl IntoValue for uuid::Uuid {
    fn into_value(self) -> Value {
        Value::Uuid(self)
    }
}

impl IntoValue for chrono::DateTime<chrono::Utc> {
    fn into_value(self) -> Value {
        Value::DateTime(self)
    }
}

impl IntoValue for chrono::NaiveDate {
    fn into_value(self) -> Value {
        Value::Date(self)
    }
}

impl IntoValue for chrono::NaiveTime {
    fn into_value(self) -> Value {
        Value::Time(self)
    }
}

impl<V: IntoValue> IntoValue for Option<V> {
    fn into_value(self) -> Value {
        self.map_or(Value::Null, IntoValue::into_value)
    }
}

impl<V: IntoValue> IntoValue for Vec<V> {
    fn into_value(self) -> Value {
        Value::List(self.into_iter().map(IntoValue::into_value).collect())
    }
}

/// Anything that can stand on the right-hand side of a comparison: a literal
/// value or a whole expression (captured variables, computed values).
pub trait IntoOperand {
    fn into_operand(self) -> Expr;
}

impl IntoOperand for Expr {
    fn into_operand(self) -> Expr {
        self
    }
}

impl<V: IntoValue> IntoOperand for V {
    fn into_operand(self) -> Expr {
        Expr::Constant(self.into_value())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::ast::Value;

    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    enum UserField {
        Name,
        Age,
    }

    impl RecordField for UserField {
        const FIELDS: &'static [Self] = &[Self::Name, Self::Age];

        fn name(&self) -> &'static str {
            match self {
                Self::Name => "name",
                Self::Age => "age",
            }
        }

        fn kind(&self) -> FieldKind {
            match self {
                Self::Name => FieldKind::String,
                Self::Age => FieldKind::I64,
            }
        }
    }

    struct User;

    impl Record for User {
        type Field = UserField;
    }

    const NAME: FieldRef<User, String> = FieldRef::new(UserField::Name);
    const AGE: FieldRef<User, i32> = FieldRef::new(UserField::Age);

    #[test]
    fn test_field_name_mapping() {
        assert_eq!(NAME.name(), "name");
        assert_eq!(AGE.name(), "age");
        assert_eq!(UserField::from_name("AGE"), Some(UserField::Age));
    }

    #[test]
    fn test_comparison_builds_binary_over_member() {
        let Expr::Binary { op, left, right } = AGE.ge(18) else {
            panic!("Expected Binary expression");
        };
        assert_eq!(op, BinaryOp::Ge);
        assert!(left.is_record_field());
        assert!(matches!(*right, Expr::Constant(Value::Number(_))));
    }

    #[test]
    fn test_string_method_builds_call() {
        let Expr::Call {
            target,
            method,
            args,
        } = NAME.starts_with("Jo")
        else {
            panic!("Expected Call expression");
        };
        assert_eq!(method, "starts_with");
        assert!(target.is_some_and(|t| t.is_record_field()));
        assert_eq!(args.len(), 1);
    }

    #[test]
    fn test_expression_operand_is_kept() {
        let expr = AGE.lt(Expr::captured("limit", || 65));
        let Expr::Binary { right, .. } = expr else {
            panic!("Expected Binary expression");
        };
        assert!(matches!(*right, Expr::Captured { .. }));
    }

    #[test]
    fn test_into_value_conversions() {
        assert_eq!(Some("a").into_value(), Value::String("a".to_owned()));
        assert_eq!(None::<i32>.into_value(), Value::Null);
        assert_eq!(f64::NAN.into_value(), Value::Null);
        assert_eq!(
            vec![1, 2].into_value(),
            Value::List(vec![Value::Number(1.into()), Value::Number(2.into())])
        );
    }

    #[test]
    fn test_field_ref_copy_and_eq() {
        let first = NAME;
        let second = first;
        assert_eq!(first, second);
        assert_eq!(format!("{first:?}"), "FieldRef { field: \"name\" }");
    }
}
