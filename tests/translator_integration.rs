//! End-to-end predicate compilation scenarios

use serde_json::json;

use krill::expr::Expr;
use krill::query::{self, Query, RangeOp, SortOrder};
use krill::schema::{DocumentSchema, FieldKind};
use krill::{KrillError, RelatedDocument};

fn account_schema() -> DocumentSchema {
    DocumentSchema::builder()
        .field("id", FieldKind::Str)
        .full_text_field("name", FieldKind::Str)
        .full_text_field("email", FieldKind::Str)
        .field("age", FieldKind::Int)
        .field("created", FieldKind::Date)
        .field("tags", FieldKind::StrList)
        .field("owner", FieldKind::Str)
        .field("deleted", FieldKind::Bool)
        .field("parent", FieldKind::Related)
        .field("phones", FieldKind::Collection)
        .field("phones.number", FieldKind::Str)
        .build()
}

#[test]
fn name_and_age_conjunction() {
    let predicate = Expr::parameter("x")
        .member("Name")
        .eq(Expr::constant("Bob"))
        .and(Expr::parameter("x").member("Age").gt(Expr::constant(21)));
    let compiled = query::compile(&predicate, &account_schema()).unwrap();
    assert_eq!(
        compiled,
        Query::term("name.keyword", "Bob").and(Query::NumericRange {
            field: "age".to_string(),
            op: RangeOp::Gt,
            bound: 21.0,
        })
    );
    assert_eq!(
        compiled.to_dsl(),
        json!({
            "bool": { "must": [
                { "term": { "name.keyword": { "value": "Bob" } } },
                { "range": { "age": { "gt": 21.0 } } }
            ] }
        })
    );
}

#[test]
fn literal_contains_deduplicates_elements() {
    let predicate = Expr::constant(vec!["red", "blue", "red"])
        .contains(Expr::parameter("x").member("Tags"));
    let compiled = query::compile(&predicate, &account_schema()).unwrap();
    assert_eq!(
        compiled,
        Query::term("tags.keyword", "red").or(Query::term("tags.keyword", "blue"))
    );
}

#[test]
fn null_comparison_negates_existence() {
    let predicate = Expr::parameter("x").member("Owner").eq(Expr::null());
    let compiled = query::compile(&predicate, &account_schema()).unwrap();
    assert_eq!(compiled, Query::not_exists("owner"));

    let negated = Expr::parameter("x").member("Owner").ne(Expr::null());
    let compiled = query::compile(&negated, &account_schema()).unwrap();
    assert_eq!(compiled, Query::not_exists("owner").not());
}

#[test]
fn mirrored_comparisons_compile_identically() {
    let schema = account_schema();
    let age = || Expr::parameter("x").member("Age");
    let pairs = [
        (age().gt(Expr::constant(21)), Expr::constant(21).lt(age())),
        (age().ge(Expr::constant(21)), Expr::constant(21).le(age())),
        (age().lt(Expr::constant(21)), Expr::constant(21).gt(age())),
        (age().le(Expr::constant(21)), Expr::constant(21).ge(age())),
    ];
    for (forward, mirrored) in pairs {
        assert_eq!(
            query::compile(&forward, &schema).unwrap(),
            query::compile(&mirrored, &schema).unwrap()
        );
    }
}

#[test]
fn compilation_is_deterministic_and_idempotent() {
    let schema = account_schema();
    let predicate = Expr::parameter("x")
        .member("Name")
        .to_lower()
        .eq(Expr::constant("BOB"))
        .or(Expr::parameter("x").member("Phones").any(
            "p",
            Expr::parameter("p")
                .member("Number")
                .eq(Expr::constant("555")),
        ));

    let first = query::compile(&predicate, &schema).unwrap();
    let second = query::compile(&predicate, &schema).unwrap();
    assert_eq!(first, second);

    // Pre-evaluating the tree does not change the outcome.
    let evaluated = krill::expr::eval::evaluate(&predicate).unwrap();
    assert_eq!(query::compile(&evaluated, &schema).unwrap(), first);
}

#[test]
fn related_document_identity() {
    let predicate = Expr::parameter("x")
        .member("Parent")
        .eq(Expr::constant(RelatedDocument::new("Note", "n-1")));
    let compiled = query::compile(&predicate, &account_schema()).unwrap();
    assert_eq!(
        compiled.to_dsl(),
        json!({
            "bool": { "must": [
                { "term": { "parent.documentType": { "value": "Note" } } },
                { "term": { "parent.id.keyword": { "value": "n-1" } } }
            ] }
        })
    );
}

#[test]
fn closed_subtrees_fold_before_translation() {
    // The right side is fully closed and folds to a single constant.
    let predicate = Expr::parameter("x")
        .member("Name")
        .eq(Expr::constant("BOB").to_lower());
    let compiled = query::compile(&predicate, &account_schema()).unwrap();
    assert_eq!(compiled, Query::term("name.keyword", "bob"));
}

#[test]
fn unsupported_shapes_fail_with_expression_text() {
    let schema = account_schema();

    let call = Expr::parameter("x")
        .member("Name")
        .call_named("starts_with", vec![Expr::constant("B")]);
    match query::compile(&call, &schema).unwrap_err() {
        KrillError::UnsupportedMethod { method, expression } => {
            assert_eq!(method, "starts_with");
            assert!(expression.contains("starts_with"));
        }
        other => panic!("expected UnsupportedMethod, got {other:?}"),
    }

    let conditional = Expr::Conditional {
        condition: Box::new(Expr::parameter("x").member("Deleted")),
        then_branch: Box::new(Expr::constant(true)),
        else_branch: Box::new(Expr::constant(false)),
    };
    match query::compile(&conditional, &schema).unwrap_err() {
        KrillError::UnsupportedNode { kind, .. } => assert_eq!(kind, "Conditional"),
        other => panic!("expected UnsupportedNode, got {other:?}"),
    }
}

#[test]
fn sort_for_rejects_both_directions() {
    let schema = account_schema();
    let selector = Expr::parameter("x").member("Created");
    let err =
        krill::query::sort::sort_for(Some(&selector), Some(&selector), &schema).unwrap_err();
    assert!(matches!(err, KrillError::ConflictingSort));

    let spec = krill::query::sort::sort_for(None, Some(&selector), &schema)
        .unwrap()
        .unwrap();
    assert_eq!(spec.field, "created");
    assert_eq!(spec.order, Some(SortOrder::Descending));
}
