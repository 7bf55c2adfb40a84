//! Translated filter tree: field predicates and predicate groups.

use std::fmt;

use crate::ast::Value;
use crate::schema::RecordField;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Gt,
    Ge,
    Lt,
    Le,
    Like,
    NotEq,
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operator::Eq => write!(f, "eq"),
            Operator::Gt => write!(f, "gt"),
            Operator::Ge => write!(f, "ge"),
            Operator::Lt => write!(f, "lt"),
            Operator::Le => write!(f, "le"),
            Operator::Like => write!(f, "like"),
            Operator::NotEq => write!(f, "ne"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupOperator {
    And,
    Or,
}

impl fmt::Display for GroupOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupOperator::And => write!(f, "and"),
            GroupOperator::Or => write!(f, "or"),
        }
    }
}

/// Leaf of the filter tree: `field <op> value`, optionally negated.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldPredicate<F: RecordField> {
    pub field: F,
    pub op: Operator,
    pub value: Value,
    pub negated: bool,
}

impl<F: RecordField> FieldPredicate<F> {
    #[must_use]
    pub fn new(field: F, op: Operator, value: Value) -> Self {
        Self {
            field,
            op,
            value,
            negated: false,
        }
    }

    #[must_use]
    pub fn negate(mut self) -> Self {
        self.negated = !self.negated;
        self
    }

    /// Logical name of the field, as known to query executors.
    #[must_use]
    pub fn field_name(&self) -> &'static str {
        self.field.name()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PredicateGroup<F: RecordField> {
    pub op: GroupOperator,
    pub predicates: Vec<Predicate<F>>,
}

impl<F: RecordField> PredicateGroup<F> {
    #[must_use]
    pub fn new(op: GroupOperator, predicates: Vec<Predicate<F>>) -> Self {
        Self { op, predicates }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate<F: RecordField> {
    Field(FieldPredicate<F>),
    Group(PredicateGroup<F>),
}

impl<F: RecordField> Predicate<F> {
    #[must_use]
    pub fn field(field: F, op: Operator, value: Value) -> Self {
        Predicate::Field(FieldPredicate::new(field, op, value))
    }

    #[must_use]
    pub fn and(predicates: Vec<Predicate<F>>) -> Self {
        Predicate::Group(PredicateGroup::new(GroupOperator::And, predicates))
    }

    #[must_use]
    pub fn or(predicates: Vec<Predicate<F>>) -> Self {
        Predicate::Group(PredicateGroup::new(GroupOperator::Or, predicates))
    }

    /// Number of field predicates in the tree.
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        match self {
            Predicate::Field(_) => 1,
            Predicate::Group(group) => group.predicates.iter().map(Predicate::leaf_count).sum(),
        }
    }
}

impl<F: RecordField> From<FieldPredicate<F>> for Predicate<F> {
    fn from(value: FieldPredicate<F>) -> Self {
        Predicate::Field(value)
    }
}

impl<F: RecordField> From<PredicateGroup<F>> for Predicate<F> {
    fn from(value: PredicateGroup<F>) -> Self {
        Predicate::Group(value)
    }
}

impl<F: RecordField> fmt::Display for FieldPredicate<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            write!(f, "not ")?;
        }
        write!(f, "{} {} {}", self.field_name(), self.op, self.value)
    }
}

impl<F: RecordField> fmt::Display for Predicate<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Field(leaf) => write!(f, "{leaf}"),
            Predicate::Group(group) => {
                write!(f, "(")?;
                for (i, child) in group.predicates.iter().enumerate() {
                    if i > 0 {
                        write!(f, " {} ", group.op)?;
                    }
                    write!(f, "{child}")?;
                }
                write!(f, ")")
            }
        }
    }
}
