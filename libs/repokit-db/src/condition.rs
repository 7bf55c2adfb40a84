//! Translated predicate → `sea_orm::Condition` renderer.
//! Translation belongs to `repokit-expr`; this module only consumes its
//! `Predicate` trees.

use bigdecimal::{BigDecimal, ToPrimitive};
use repokit_expr::{
    FieldKind, FieldPredicate, GroupOperator, Operator, Predicate, RecordField, Value,
};
use rust_decimal::Decimal;
use sea_orm::{Condition, sea_query::Expr, sea_query::SimpleExpr};

use crate::entity::RecordEntity;
use crate::error::{RepoError, RepoResult};

/* ---------- coercion helpers ---------- */

fn bigdecimal_to_decimal(field: &'static str, bd: &BigDecimal) -> RepoResult<Decimal> {
    // Preserve precision via string.
    let s = bd.normalized().to_string();
    Decimal::from_str_exact(&s)
        .or_else(|_| s.parse::<Decimal>())
        .map_err(|_| RepoError::TypeMismatch {
            field,
            expected: FieldKind::Decimal,
            got: "out-of-range number",
        })
}

/// Convert a predicate value into the column's `SeaORM` value by field kind.
fn coerce<F: RecordField>(field: F, v: &Value) -> RepoResult<sea_orm::Value> {
    let name = field.name();
    let mismatch = |got: &'static str| RepoError::TypeMismatch {
        field: name,
        expected: field.kind(),
        got,
    };

    Ok(match (field.kind(), v) {
        (FieldKind::String, Value::String(s)) => sea_orm::Value::String(Some(Box::new(s.clone()))),

        (FieldKind::I64, Value::Number(n)) => {
            if !n.is_integer() {
                return Err(mismatch("fractional number"));
            }
            let i = n.to_i64().ok_or_else(|| mismatch("out-of-range number"))?;
            sea_orm::Value::BigInt(Some(i))
        }

        (FieldKind::F64, Value::Number(n)) => {
            let f = n.to_f64().ok_or_else(|| mismatch("out-of-range number"))?;
            sea_orm::Value::Double(Some(f))
        }

        (FieldKind::Decimal, Value::Number(n)) => {
            sea_orm::Value::Decimal(Some(Box::new(bigdecimal_to_decimal(name, n)?)))
        }

        (FieldKind::Bool, Value::Bool(b)) => sea_orm::Value::Bool(Some(*b)),

        (FieldKind::Uuid, Value::Uuid(u)) => sea_orm::Value::Uuid(Some(Box::new(*u))),

        (FieldKind::DateTimeUtc, Value::DateTime(dt)) => {
            sea_orm::Value::ChronoDateTimeUtc(Some(Box::new(*dt)))
        }
        (FieldKind::Date, Value::Date(d)) => sea_orm::Value::ChronoDate(Some(Box::new(*d))),
        (FieldKind::Time, Value::Time(t)) => sea_orm::Value::ChronoTime(Some(Box::new(*t))),

        (_, other) => return Err(mismatch(other.type_name())),
    })
}

fn coerce_many<F: RecordField>(field: F, items: &[Value]) -> RepoResult<Vec<sea_orm::Value>> {
    items.iter().map(|v| coerce(field, v)).collect()
}

/* ---------- Predicate → Condition ---------- */

/// Render a translated predicate as a `SeaORM` condition over `R`'s entity.
///
/// # Errors
/// - [`RepoError::UnmappedField`] when a field has no column
/// - [`RepoError::TypeMismatch`] when a value does not fit the field kind
/// - [`RepoError::InvalidOperand`] for `null` or list operands of ordering
///   operators and non-string `LIKE` patterns
pub fn predicate_to_condition<R: RecordEntity>(
    predicate: &Predicate<R::Field>,
) -> RepoResult<Condition> {
    Ok(match predicate {
        Predicate::Group(group) => {
            let mut cond = match group.op {
                GroupOperator::And => Condition::all(),
                GroupOperator::Or => Condition::any(),
            };
            for child in &group.predicates {
                cond = cond.add(predicate_to_condition::<R>(child)?);
            }
            cond
        }
        Predicate::Field(leaf) => {
            let cond = Condition::all().add(field_expr::<R>(leaf)?);
            if leaf.negated { cond.not() } else { cond }
        }
    })
}

fn field_expr<R: RecordEntity>(leaf: &FieldPredicate<R::Field>) -> RepoResult<SimpleExpr> {
    let name = leaf.field_name();
    let col = R::column(leaf.field).ok_or(RepoError::UnmappedField(name))?;
    let invalid = |got: &'static str| RepoError::InvalidOperand {
        field: name,
        op: leaf.op,
        got,
    };

    Ok(match (leaf.op, &leaf.value) {
        // null handling
        (Operator::Eq, Value::Null) => Expr::col(col).is_null(),
        (Operator::NotEq, Value::Null) => Expr::col(col).is_not_null(),

        // IN () is always false, NOT IN () always true
        (Operator::Eq, Value::List(items)) => {
            let vals = coerce_many(leaf.field, items)?;
            if vals.is_empty() {
                Expr::cust("1=0")
            } else {
                Expr::col(col).is_in(vals)
            }
        }
        (Operator::NotEq, Value::List(items)) => {
            let vals = coerce_many(leaf.field, items)?;
            if vals.is_empty() {
                Expr::cust("1=1")
            } else {
                Expr::col(col).is_not_in(vals)
            }
        }

        (Operator::Like, Value::String(pattern)) => {
            if leaf.field.kind() != FieldKind::String {
                return Err(RepoError::TypeMismatch {
                    field: name,
                    expected: FieldKind::String,
                    got: "non-string field",
                });
            }
            Expr::col(col).like(pattern.as_str())
        }
        (Operator::Like, other) => return Err(invalid(other.type_name())),

        (_, other @ (Value::Null | Value::List(_))) => return Err(invalid(other.type_name())),

        (op, value) => {
            let value = coerce(leaf.field, value)?;
            match op {
                Operator::Eq => Expr::col(col).eq(value),
                Operator::NotEq => Expr::col(col).ne(value),
                Operator::Gt => Expr::col(col).gt(value),
                Operator::Ge => Expr::col(col).gte(value),
                Operator::Lt => Expr::col(col).lt(value),
                Operator::Le => Expr::col(col).lte(value),
                Operator::Like => return Err(invalid(leaf.value.type_name())),
            }
        }
    })
}
