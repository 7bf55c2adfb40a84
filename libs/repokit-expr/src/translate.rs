//! Expression to predicate translation.
//!
//! The translator folds record-independent subexpressions first (see
//! [`crate::eval`]) and then walks the remaining tree, emitting a
//! [`FieldPredicate`] for every comparison or string method call on a record
//! field and a [`PredicateGroup`] for every `&&`/`||`.

use std::fmt;
use std::marker::PhantomData;

use tracing::{debug, trace};

use crate::ast::{BinaryOp, Expr, UnaryOp, Value};
use crate::config::{ExprConfig, Grouping};
use crate::errors::{TranslateError, TranslateResult};
use crate::eval::{normalize_method, partial_eval};
use crate::predicate::{FieldPredicate, GroupOperator, Operator, Predicate, PredicateGroup};
use crate::schema::{FieldKind, Record, RecordField};

/// Translates predicate expressions over `R` into filter trees.
///
/// Holds only configuration; every call builds its own traversal state, so a
/// single translator can be shared between threads.
pub struct ExprTranslator<R: Record> {
    config: ExprConfig,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> ExprTranslator<R> {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ExprConfig::default())
    }

    #[must_use]
    pub fn with_config(config: ExprConfig) -> Self {
        Self {
            config,
            _record: PhantomData,
        }
    }

    #[must_use]
    pub fn config(&self) -> &ExprConfig {
        &self.config
    }

    /// Translate a `record -> bool` expression.
    ///
    /// Returns a single field predicate when the expression holds exactly one
    /// comparison, a group otherwise.
    ///
    /// # Errors
    ///
    /// - [`TranslateError::Unsupported`] for constructs outside the supported
    ///   subset
    /// - [`TranslateError::TooDeep`] when the expression nests deeper than
    ///   `max_depth`
    /// - [`TranslateError::Evaluation`] when folding a constant subtree fails
    pub fn translate(&self, expr: &Expr) -> TranslateResult<Predicate<R::Field>> {
        let depth = expr.depth();
        if depth > self.config.max_depth {
            return Err(TranslateError::TooDeep {
                depth,
                limit: self.config.max_depth,
            });
        }

        trace!(expr = %expr, "translating expression");
        let folded = partial_eval(expr)?;

        let mut walk = Walk::<R::Field>::new(self.config.grouping);
        walk.visit(&folded)?;
        let predicate = walk.finish(&folded)?;

        debug!(predicate = %predicate, leaves = predicate.leaf_count(), "translated expression");
        Ok(predicate)
    }
}

impl<R: Record> Default for ExprTranslator<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record> Clone for ExprTranslator<R> {
    fn clone(&self) -> Self {
        Self::with_config(self.config.clone())
    }
}

impl<R: Record> fmt::Debug for ExprTranslator<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExprTranslator")
            .field("config", &self.config)
            .field("record", &std::any::type_name::<R>())
            .finish()
    }
}

/// Translate with the default configuration.
///
/// # Errors
///
/// See [`ExprTranslator::translate`].
pub fn to_predicate<R: Record>(expr: &Expr) -> TranslateResult<Predicate<R::Field>> {
    ExprTranslator::<R>::new().translate(expr)
}

enum Slot<F: RecordField> {
    Field(FieldPredicate<F>),
    Group(usize),
}

struct Frame<F: RecordField> {
    op: GroupOperator,
    slots: Vec<Slot<F>>,
}

impl<F: RecordField> Frame<F> {
    fn new(op: GroupOperator) -> Self {
        Self {
            op,
            slots: Vec::new(),
        }
    }
}

/// Per-call traversal state: an arena of groups (index 0 is the root) and the
/// stack of groups currently open.
struct Walk<F: RecordField> {
    grouping: Grouping,
    frames: Vec<Frame<F>>,
    open: Vec<usize>,
    first_connective: Option<GroupOperator>,
}

impl<F: RecordField> Walk<F> {
    fn new(grouping: Grouping) -> Self {
        Self {
            grouping,
            frames: vec![Frame::new(GroupOperator::And)],
            open: vec![0],
            first_connective: None,
        }
    }

    fn visit(&mut self, expr: &Expr) -> TranslateResult<()> {
        match expr {
            Expr::Binary { op, left, right } if op.is_logical() => {
                let group_op = if *op == BinaryOp::AndAlso {
                    GroupOperator::And
                } else {
                    GroupOperator::Or
                };
                let pushed = self.enter_group(group_op);
                self.visit(left)?;
                self.visit(right)?;
                if pushed {
                    self.open.pop();
                }
                Ok(())
            }
            Expr::Binary { op, left, right } => {
                let leaf = comparison::<F>(expr, *op, left, right)?;
                self.push_leaf(leaf);
                Ok(())
            }
            Expr::Unary {
                op: UnaryOp::Not,
                operand,
            } if matches!(**operand, Expr::Call { .. }) => {
                let leaf = method_call::<F>(operand)?.negate();
                self.push_leaf(leaf);
                Ok(())
            }
            Expr::Unary { .. } => Err(TranslateError::unsupported(
                expr,
                "negation is only supported on string method calls",
            )),
            Expr::Call { .. } => {
                let leaf = method_call::<F>(expr)?;
                self.push_leaf(leaf);
                Ok(())
            }
            Expr::Member { .. } => Err(TranslateError::unsupported(
                expr,
                "bare field reference outside a comparison",
            )),
            Expr::Constant(_) => Err(TranslateError::unsupported(
                expr,
                "bare literal outside a comparison",
            )),
            Expr::Param => Err(TranslateError::unsupported(
                expr,
                "bare record parameter outside a comparison",
            )),
            Expr::Captured { .. } => Err(TranslateError::unsupported(
                expr,
                "captured variable outside a comparison",
            )),
        }
    }

    /// Open the group for a `&&`/`||` node; returns whether a frame was pushed
    /// on the open stack and must be popped after the operands.
    fn enter_group(&mut self, op: GroupOperator) -> bool {
        let first = self.first_connective.is_none();
        if first {
            self.first_connective = Some(op);
        }

        match self.grouping {
            Grouping::Structural => {
                let current = self.current();
                if first {
                    // The first combinator is the root of the expression.
                    self.frames[current].op = op;
                    return false;
                }
                if self.frames[current].op == op {
                    return false;
                }
                let child = self.open_child(current, op);
                self.open.push(child);
                true
            }
            Grouping::FirstConnective => {
                // Groups always hang off the root; only leaves descend.
                self.open_child(0, op);
                false
            }
        }
    }

    fn open_child(&mut self, parent: usize, op: GroupOperator) -> usize {
        let child = self.frames.len();
        self.frames.push(Frame::new(op));
        self.frames[parent].slots.push(Slot::Group(child));
        child
    }

    fn current(&self) -> usize {
        self.open.last().copied().unwrap_or(0)
    }

    /// Follow the last slot of each group down to the deepest group.
    fn deepest(&self) -> usize {
        let mut idx = 0;
        while let Some(Slot::Group(child)) = self.frames[idx].slots.last() {
            idx = *child;
        }
        idx
    }

    fn push_leaf(&mut self, leaf: FieldPredicate<F>) {
        let target = match self.grouping {
            Grouping::Structural => self.current(),
            Grouping::FirstConnective => self.deepest(),
        };
        self.frames[target].slots.push(Slot::Field(leaf));
    }

    fn finish(mut self, expr: &Expr) -> TranslateResult<Predicate<F>> {
        self.frames[0].op = self.first_connective.unwrap_or(GroupOperator::And);
        let mut root = self.build(0);
        if root.predicates.is_empty() {
            return Err(TranslateError::unsupported(
                expr,
                "expression contains no field predicate",
            ));
        }
        if root.predicates.len() == 1
            && let Some(only) = root.predicates.pop()
        {
            return Ok(only);
        }
        Ok(Predicate::Group(root))
    }

    fn build(&mut self, idx: usize) -> PredicateGroup<F> {
        let slots = std::mem::take(&mut self.frames[idx].slots);
        let predicates = slots
            .into_iter()
            .map(|slot| match slot {
                Slot::Field(leaf) => Predicate::Field(leaf),
                Slot::Group(child) => Predicate::Group(self.build(child)),
            })
            .collect();
        PredicateGroup::new(self.frames[idx].op, predicates)
    }
}

/// Resolve a record field read (`x.<name>`) against the registry.
fn record_field<F: RecordField>(expr: &Expr) -> Option<TranslateResult<F>> {
    let Expr::Member { target, member } = expr else {
        return None;
    };
    if !matches!(**target, Expr::Param) {
        return None;
    }
    Some(F::from_name(member).ok_or_else(|| {
        TranslateError::unsupported(expr, format!("unknown field '{member}' on the record"))
    }))
}

fn comparison<F: RecordField>(
    node: &Expr,
    op: BinaryOp,
    left: &Expr,
    right: &Expr,
) -> TranslateResult<FieldPredicate<F>> {
    let Some(field) = record_field::<F>(left) else {
        return Err(TranslateError::unsupported(
            node,
            "left operand of a comparison must be a record field",
        ));
    };
    let field = field?;

    let value = match right {
        Expr::Constant(value) => value.clone(),
        other if other.is_record_field() => {
            return Err(TranslateError::unsupported(
                node,
                "field-to-field comparisons are not supported",
            ));
        }
        other => {
            return Err(TranslateError::unsupported(
                other,
                "right operand of a comparison must evaluate to a value",
            ));
        }
    };

    // Non-comparison operators such as `+` fall back to equality.
    let (operator, negated) = match op {
        BinaryOp::Ne => (Operator::Eq, true),
        BinaryOp::Gt => (Operator::Gt, false),
        BinaryOp::Ge => (Operator::Ge, false),
        BinaryOp::Lt => (Operator::Lt, false),
        BinaryOp::Le => (Operator::Le, false),
        BinaryOp::Eq
        | BinaryOp::AndAlso
        | BinaryOp::OrElse
        | BinaryOp::Add
        | BinaryOp::Sub
        | BinaryOp::Mul
        | BinaryOp::Div => (Operator::Eq, false),
    };

    let leaf = FieldPredicate::new(field, operator, value);
    Ok(if negated { leaf.negate() } else { leaf })
}

fn method_call<F: RecordField>(node: &Expr) -> TranslateResult<FieldPredicate<F>> {
    let Expr::Call {
        target,
        method,
        args,
    } = node
    else {
        return Err(TranslateError::unsupported(node, "expected a method call"));
    };

    let Some(target) = target else {
        return Err(TranslateError::unsupported(
            node,
            format!("function '{method}' cannot be translated"),
        ));
    };

    let Some(field) = record_field::<F>(target) else {
        return Err(TranslateError::unsupported(
            node,
            "method target must be a record field",
        ));
    };
    let field = field?;

    if field.kind() != FieldKind::String {
        return Err(TranslateError::unsupported(
            node,
            format!(
                "method '{method}' requires a text field, '{}' is {}",
                field.name(),
                field.kind()
            ),
        ));
    }

    let name = normalize_method(method);
    if !matches!(
        name.as_str(),
        "startswith" | "endswith" | "contains" | "equals"
    ) {
        return Err(TranslateError::unsupported(
            node,
            format!("method '{method}' is not supported"),
        ));
    }

    let [Expr::Constant(arg)] = args.as_slice() else {
        return Err(TranslateError::unsupported(
            node,
            format!("method '{method}' takes exactly one value argument"),
        ));
    };

    if name == "equals" {
        return Ok(FieldPredicate::new(field, Operator::Eq, arg.clone()));
    }

    let Value::String(pattern) = arg else {
        return Err(TranslateError::unsupported(
            node,
            format!("method '{method}' needs a string argument, got {}", arg.type_name()),
        ));
    };
    let pattern = match name.as_str() {
        "startswith" => format!("{pattern}%"),
        "endswith" => format!("%{pattern}"),
        _ => format!("%{pattern}%"),
    };
    Ok(FieldPredicate::new(
        field,
        Operator::Like,
        Value::String(pattern),
    ))
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    enum F {
        A,
        B,
        C,
        D,
    }

    impl RecordField for F {
        const FIELDS: &'static [Self] = &[Self::A, Self::B, Self::C, Self::D];

        fn name(&self) -> &'static str {
            match self {
                Self::A => "a",
                Self::B => "b",
                Self::C => "c",
                Self::D => "d",
            }
        }

        fn kind(&self) -> FieldKind {
            match self {
                Self::D => FieldKind::I64,
                _ => FieldKind::String,
            }
        }
    }

    struct Rec;

    impl Record for Rec {
        type Field = F;
    }

    fn eq(name: &str, value: i64) -> Expr {
        Expr::binary(BinaryOp::Eq, Expr::field(name), Expr::value(value))
    }

    fn leaf(field: F, value: i64) -> Predicate<F> {
        Predicate::field(field, Operator::Eq, Value::Number(value.into()))
    }

    fn legacy() -> ExprTranslator<Rec> {
        ExprTranslator::with_config(ExprConfig::default().with_grouping(Grouping::FirstConnective))
    }

    #[test]
    fn test_single_comparison_is_unwrapped() {
        let out = to_predicate::<Rec>(&eq("a", 1)).unwrap();
        assert_eq!(out, leaf(F::A, 1));
    }

    #[test]
    fn test_structural_mixed_chain() {
        let expr = eq("a", 1).and(eq("b", 2)).or(eq("c", 3));
        let out = to_predicate::<Rec>(&expr).unwrap();
        assert_eq!(
            out,
            Predicate::or(vec![
                Predicate::and(vec![leaf(F::A, 1), leaf(F::B, 2)]),
                leaf(F::C, 3),
            ])
        );
    }

    #[test]
    fn test_structural_right_nested_group() {
        let expr = eq("a", 1).and(eq("b", 2).or(eq("c", 3)));
        let out = to_predicate::<Rec>(&expr).unwrap();
        assert_eq!(
            out,
            Predicate::and(vec![
                leaf(F::A, 1),
                Predicate::or(vec![leaf(F::B, 2), leaf(F::C, 3)]),
            ])
        );
    }

    #[test]
    fn test_structural_flattens_same_operator() {
        let expr = eq("a", 1).and(eq("b", 2)).and(eq("c", 3));
        let out = to_predicate::<Rec>(&expr).unwrap();
        assert_eq!(
            out,
            Predicate::and(vec![leaf(F::A, 1), leaf(F::B, 2), leaf(F::C, 3)])
        );
    }

    #[test]
    fn test_first_connective_simple_and() {
        let expr = eq("a", 1).and(eq("b", 2));
        let out = legacy().translate(&expr).unwrap();
        assert_eq!(out, Predicate::and(vec![leaf(F::A, 1), leaf(F::B, 2)]));
    }

    #[test]
    fn test_first_connective_mixed_chain_keeps_legacy_shape() {
        let expr = eq("a", 1).and(eq("b", 2)).or(eq("c", 3));
        let out = legacy().translate(&expr).unwrap();
        assert_eq!(
            out,
            Predicate::or(vec![
                Predicate::or(vec![]),
                Predicate::and(vec![leaf(F::A, 1), leaf(F::B, 2), leaf(F::C, 3)]),
            ])
        );
    }

    #[test]
    fn test_first_connective_groups_attach_to_root() {
        let expr = eq("a", 1)
            .and(eq("b", 2))
            .or(eq("c", 3).and(eq("d", 4)));
        let out = legacy().translate(&expr).unwrap();
        assert_eq!(
            out,
            Predicate::or(vec![
                Predicate::or(vec![]),
                Predicate::and(vec![leaf(F::A, 1), leaf(F::B, 2)]),
                Predicate::and(vec![leaf(F::C, 3), leaf(F::D, 4)]),
            ])
        );
        assert_eq!(out.leaf_count(), 4);
    }

    #[test]
    fn test_not_equal_is_negated_eq() {
        let expr = Expr::binary(BinaryOp::Ne, Expr::field("d"), Expr::value(5));
        let Predicate::Field(out) = to_predicate::<Rec>(&expr).unwrap() else {
            panic!("Expected field predicate");
        };
        assert_eq!(out.op, Operator::Eq);
        assert!(out.negated);
    }

    #[test]
    fn test_arithmetic_operator_falls_back_to_eq() {
        let expr = Expr::binary(BinaryOp::Add, Expr::field("d"), Expr::value(5));
        assert_eq!(to_predicate::<Rec>(&expr).unwrap(), leaf(F::D, 5));
    }

    #[test]
    fn test_depth_limit() {
        let translator = ExprTranslator::<Rec>::with_config(ExprConfig::default().with_max_depth(3));
        let expr = eq("a", 1).and(eq("b", 2));
        let err = translator.translate(&expr).unwrap_err();
        assert!(matches!(err, TranslateError::TooDeep { depth: 4, limit: 3 }));
        assert!(err.node().is_none());
    }

    #[test]
    fn test_long_or_chain_fits_default_depth() {
        let expr = (1..70).fold(eq("a", 0), |acc, i| acc.or(eq("a", i)));
        let out = to_predicate::<Rec>(&expr).unwrap();
        let Predicate::Group(root) = out else {
            panic!("Expected group");
        };
        assert_eq!(root.op, GroupOperator::Or);
        assert_eq!(root.predicates.len(), 70);
    }

    #[test]
    fn test_bare_nodes_are_rejected() {
        for expr in [Expr::field("a"), Expr::value(true), Expr::Param] {
            let err = to_predicate::<Rec>(&expr).unwrap_err();
            assert!(matches!(err, TranslateError::Unsupported { .. }), "{expr}");
        }
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let err = to_predicate::<Rec>(&eq("zzz", 1)).unwrap_err();
        assert_eq!(err.node().map(ToString::to_string).as_deref(), Some("x.zzz"));
    }

    #[test]
    fn test_string_method_on_numeric_field_is_rejected() {
        let expr = Expr::method(Expr::field("d"), "contains", vec![Expr::value("1")]);
        assert!(to_predicate::<Rec>(&expr).is_err());
    }

    #[test]
    fn test_negation_of_comparison_is_rejected() {
        let err = to_predicate::<Rec>(&!eq("a", 1)).unwrap_err();
        assert!(matches!(err, TranslateError::Unsupported { .. }));
    }
}
