#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Translation of typed customer predicates into filter trees.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use figment::{Figment, providers::Serialized};
use repokit_expr::{
    BinaryOp, Expr, ExprConfig, ExprTranslator, FieldPredicate, Grouping, Operator, Predicate,
    TranslateError, Value, to_predicate,
};
use repokit_expr_macros::Record;

#[derive(Record)]
#[allow(dead_code)]
struct Customer {
    id: uuid::Uuid,
    first_name: String,
    last_name: String,
    company: String,
    phone: String,
    email: String,
    age: i64,
}

fn text(s: &str) -> Value {
    Value::String(s.to_owned())
}

fn leaf(field: CustomerField, op: Operator, value: Value) -> Predicate<CustomerField> {
    Predicate::field(field, op, value)
}

#[test]
fn comparison_becomes_field_predicate() {
    let expr = customer::age().ge(21);
    let out = to_predicate::<Customer>(&expr).unwrap();
    assert_eq!(
        out,
        leaf(CustomerField::Age, Operator::Ge, Value::Number(21.into()))
    );

    let Predicate::Field(leaf) = out else {
        panic!("Expected field predicate");
    };
    assert_eq!(leaf.field_name(), "age");
    assert!(!leaf.negated);
}

#[test]
fn every_comparison_operator_maps() {
    let cases = [
        (customer::age().eq(1), Operator::Eq),
        (customer::age().gt(1), Operator::Gt),
        (customer::age().ge(1), Operator::Ge),
        (customer::age().lt(1), Operator::Lt),
        (customer::age().le(1), Operator::Le),
    ];
    for (expr, op) in cases {
        let Predicate::Field(out) = to_predicate::<Customer>(&expr).unwrap() else {
            panic!("Expected field predicate for {expr}");
        };
        assert_eq!(out.op, op, "{expr}");
    }
}

#[test]
fn and_builds_and_group() {
    let expr = customer::company()
        .eq("ACME")
        .and(customer::email().equals("a@b.com"));
    let out = to_predicate::<Customer>(&expr).unwrap();
    assert_eq!(
        out,
        Predicate::and(vec![
            leaf(CustomerField::Company, Operator::Eq, text("ACME")),
            leaf(CustomerField::Email, Operator::Eq, text("a@b.com")),
        ])
    );
}

#[test]
fn or_builds_or_group() {
    let expr = customer::first_name()
        .eq("Ann")
        .or(customer::last_name().eq("Lee"));
    let Predicate::Group(group) = to_predicate::<Customer>(&expr).unwrap() else {
        panic!("Expected group");
    };
    assert_eq!(group.op, repokit_expr::GroupOperator::Or);
    assert_eq!(group.predicates.len(), 2);
}

#[test]
fn string_methods_become_like_patterns() {
    let cases = [
        (customer::company().starts_with("AC"), "AC%"),
        (customer::company().ends_with("ME"), "%ME"),
        (customer::company().contains("CM"), "%CM%"),
    ];
    for (expr, pattern) in cases {
        let out = to_predicate::<Customer>(&expr).unwrap();
        assert_eq!(
            out,
            leaf(CustomerField::Company, Operator::Like, text(pattern))
        );
    }
}

#[test]
fn equals_becomes_eq() {
    let out = to_predicate::<Customer>(&customer::company().equals("ACME")).unwrap();
    assert_eq!(
        out,
        leaf(CustomerField::Company, Operator::Eq, text("ACME"))
    );
}

#[test]
fn method_names_match_case_insensitively() {
    let expr = Expr::method(Expr::field("company"), "StartsWith", vec![Expr::value("AC")]);
    let out = to_predicate::<Customer>(&expr).unwrap();
    assert_eq!(
        out,
        leaf(CustomerField::Company, Operator::Like, text("AC%"))
    );
}

#[test]
fn negated_method_call_sets_negated() {
    let expr = !customer::email().starts_with("admin");
    let out = to_predicate::<Customer>(&expr).unwrap();
    let expected = FieldPredicate::new(CustomerField::Email, Operator::Like, text("admin%")).negate();
    assert_eq!(out, Predicate::Field(expected));
}

#[test]
fn not_equal_is_negated_equality() {
    let out = to_predicate::<Customer>(&customer::phone().ne("555")).unwrap();
    let expected = FieldPredicate::new(CustomerField::Phone, Operator::Eq, text("555")).negate();
    assert_eq!(out, Predicate::Field(expected));
}

#[test]
fn captured_variable_is_read_at_translation_time() {
    let limit = Arc::new(AtomicI64::new(18));
    let captured = Arc::clone(&limit);
    let expr = customer::age().gt(Expr::captured("limit", move || {
        captured.load(Ordering::SeqCst)
    }));

    limit.store(30, Ordering::SeqCst);
    let out = to_predicate::<Customer>(&expr).unwrap();
    assert_eq!(
        out,
        leaf(CustomerField::Age, Operator::Gt, Value::Number(30.into()))
    );

    limit.store(40, Ordering::SeqCst);
    let out = to_predicate::<Customer>(&expr).unwrap();
    assert_eq!(
        out,
        leaf(CustomerField::Age, Operator::Gt, Value::Number(40.into()))
    );
}

#[test]
fn computed_right_operand_is_folded() {
    let domain = String::from("acme.com");
    let expr = customer::email().ends_with(Expr::binary(
        BinaryOp::Add,
        Expr::value("@"),
        Expr::captured("domain", move || domain.clone()),
    ));
    let out = to_predicate::<Customer>(&expr).unwrap();
    assert_eq!(
        out,
        leaf(CustomerField::Email, Operator::Like, text("%@acme.com"))
    );
}

#[test]
fn function_over_field_is_unsupported() {
    let expr = Expr::binary(
        BinaryOp::Gt,
        Expr::function("abs", vec![Expr::field("age")]),
        Expr::value(5),
    );
    let err = to_predicate::<Customer>(&expr).unwrap_err();
    assert!(matches!(err, TranslateError::Unsupported { .. }));

    let bare = Expr::function("abs", vec![Expr::field("age")]);
    let err = to_predicate::<Customer>(&bare).unwrap_err();
    assert_eq!(err.node().map(ToString::to_string).as_deref(), Some("abs(x.age)"));
}

#[test]
fn field_to_field_comparison_is_unsupported() {
    let expr = customer::first_name().eq(Expr::field("last_name"));
    let err = to_predicate::<Customer>(&expr).unwrap_err();
    assert!(err.to_string().contains("field-to-field"), "{err}");
}

#[test]
fn unsupported_method_is_rejected() {
    let expr = Expr::method(Expr::field("company"), "to_upper", vec![]);
    assert!(matches!(
        to_predicate::<Customer>(&expr),
        Err(TranslateError::Unsupported { .. })
    ));
}

#[test]
fn non_string_pattern_is_rejected() {
    let expr = customer::company().contains(5);
    assert!(to_predicate::<Customer>(&expr).is_err());
}

#[test]
fn evaluation_failure_surfaces_as_evaluation_error() {
    let expr = customer::age().eq(Expr::binary(
        BinaryOp::Div,
        Expr::value(1),
        Expr::value(0),
    ));
    let err = to_predicate::<Customer>(&expr).unwrap_err();
    assert!(matches!(
        err,
        TranslateError::Evaluation(repokit_expr::EvalError::DivisionByZero)
    ));
}

#[test]
fn translation_is_idempotent() {
    let expr = customer::company()
        .starts_with("AC")
        .and(customer::age().lt(65))
        .or(customer::email().contains("@acme"));
    let first = to_predicate::<Customer>(&expr).unwrap();
    let second = to_predicate::<Customer>(&expr).unwrap();
    assert_eq!(first, second);
}

#[test]
fn structural_grouping_nests_mixed_chain() {
    let a = customer::company().eq("ACME");
    let b = customer::age().gt(18);
    let c = customer::email().ends_with("@acme.com");
    let out = to_predicate::<Customer>(&a.and(b).or(c)).unwrap();

    assert_eq!(
        out,
        Predicate::or(vec![
            Predicate::and(vec![
                leaf(CustomerField::Company, Operator::Eq, text("ACME")),
                leaf(CustomerField::Age, Operator::Gt, Value::Number(18.into())),
            ]),
            leaf(CustomerField::Email, Operator::Like, text("%@acme.com")),
        ])
    );
}

#[test]
fn first_connective_grouping_keeps_legacy_shape() {
    let translator = ExprTranslator::<Customer>::with_config(
        ExprConfig::default().with_grouping(Grouping::FirstConnective),
    );
    let a = customer::company().eq("ACME");
    let b = customer::age().gt(18);
    let c = customer::email().ends_with("@acme.com");
    let out = translator.translate(&a.and(b).or(c)).unwrap();

    assert_eq!(
        out,
        Predicate::or(vec![
            Predicate::or(vec![]),
            Predicate::and(vec![
                leaf(CustomerField::Company, Operator::Eq, text("ACME")),
                leaf(CustomerField::Age, Operator::Gt, Value::Number(18.into())),
                leaf(CustomerField::Email, Operator::Like, text("%@acme.com")),
            ]),
        ])
    );

    let d = customer::last_name().eq("Doe");
    let e = customer::first_name().starts_with("J");
    let out = translator
        .translate(&customer::company().eq("ACME").and(customer::age().gt(18)).or(d.and(e)))
        .unwrap();
    let Predicate::Group(root) = out else {
        panic!("Expected group");
    };
    assert_eq!(root.predicates.len(), 3);
    assert_eq!(root.predicates[0], Predicate::or(vec![]));
    assert_eq!(root.predicates[1].leaf_count(), 2);
    assert_eq!(root.predicates[2].leaf_count(), 2);
}

#[test]
fn translator_is_shareable_across_threads() {
    let translator = Arc::new(ExprTranslator::<Customer>::new());
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let translator = Arc::clone(&translator);
            std::thread::spawn(move || translator.translate(&customer::age().eq(i)).unwrap())
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap().leaf_count(), 1);
    }
}

#[test]
fn config_loads_from_figment() {
    let figment = Figment::new().merge(Serialized::defaults(serde_json::json!({
        "grouping": "first_connective",
        "max_depth": 16
    })));
    let config: ExprConfig = figment.extract().unwrap();
    assert_eq!(config.grouping, Grouping::FirstConnective);
    assert_eq!(config.max_depth, 16);

    let partial: ExprConfig = Figment::new()
        .merge(Serialized::defaults(serde_json::json!({ "max_depth": 8 })))
        .extract()
        .unwrap();
    assert_eq!(partial.grouping, Grouping::Structural);
}
