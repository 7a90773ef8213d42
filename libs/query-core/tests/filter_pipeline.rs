//! End-to-end: user string -> sanitized native document -> merged -> AST.

use query_core::{
    merge_filters, to_expr, CompareOperator, Expr, FilterDocument, FilterParser, FilterSanitizer,
    SanitizeOptions,
};
use serde_json::{json, Value};

fn parser() -> FilterParser {
    FilterParser::new(FilterSanitizer::new(SanitizeOptions {
        allowed_fields: Some(
            ["name", "price", "tags", "categoryId"]
                .into_iter()
                .map(String::from)
                .collect(),
        ),
        protected_fields: ["isDeleted".to_string()].into_iter().collect(),
        max_depth: 5,
    }))
}

fn permanent() -> FilterDocument {
    match json!({"isDeleted": false}) {
        Value::Object(m) => m,
        _ => unreachable!(),
    }
}

#[test]
fn user_cannot_override_permanent_filter() {
    let p = parser();
    let advanced = p.parse(Some(r#"{"isDeleted": true, "price": {"gt": 5}}"#), true);
    let merged = merge_filters(
        &permanent(),
        &FilterDocument::new(),
        &advanced,
        &FilterDocument::new(),
    );

    assert_eq!(merged["isDeleted"], json!(false));
    let expr = to_expr(&merged).unwrap();
    let Expr::And(parts) = expr else {
        panic!("expected conjunction");
    };
    assert!(parts.contains(&Expr::eq("isDeleted", false)));
    assert!(parts.contains(&Expr::Compare {
        field: "price".into(),
        op: CompareOperator::Gt,
        value: json!(5)
    }));
}

#[test]
fn contextual_filter_wins_over_permanent() {
    let p = parser();
    let contextual = p.parse(Some(r#"{"isDeleted": true}"#), false);
    let merged = merge_filters(
        &permanent(),
        &FilterDocument::new(),
        &FilterDocument::new(),
        &contextual,
    );
    assert_eq!(to_expr(&merged).unwrap(), Expr::eq("isDeleted", true));
}

#[test]
fn disallowed_and_dangerous_content_never_reaches_the_ast() {
    let p = parser();
    let advanced = p.parse(
        Some(r#"{"$where": "1", "secret": 1, "$or": [{"name": {"startsWith": "Wid"}}, {"tags": {"in": ["sale"]}}]}"#),
        true,
    );
    let expr = to_expr(&advanced).unwrap();
    assert_eq!(
        expr,
        Expr::Or(vec![
            Expr::Regex {
                field: "name".into(),
                pattern: "^Wid".into(),
                options: "i".into()
            },
            Expr::In {
                field: "tags".into(),
                values: vec![json!("sale")]
            },
        ])
    );
}

#[test]
fn over_deep_subtree_is_dropped_and_siblings_survive() {
    let nested = |levels: usize| (0..levels).fold(json!({"name": "x"}), |acc, _| json!({"$and": [acc]}));
    let p = parser();

    let raw = json!({"price": 3, "$or": [nested(7)]}).to_string();
    let advanced = p.parse(Some(&raw), true);
    assert_eq!(Value::Object(advanced.clone()), json!({"price": 3}));
    assert_eq!(to_expr(&advanced).unwrap(), Expr::eq("price", 3));

    let raw = json!({"price": 3, "$or": [nested(3)]}).to_string();
    let advanced = p.parse(Some(&raw), true);
    assert_eq!(Value::Object(advanced), json!({"price": 3, "$or": [nested(3)]}));
}
