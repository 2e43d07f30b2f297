mod common;

use common::*;
use rust_decimal_macros::dec;
use serde_json::json;
use treepath::{JsonNode, PathError};
use treepath_support::{EvaluationError, Value};

fn evaluation_error(result: Result<treepath_support::Collection, PathError>) -> EvaluationError {
    match result {
        Err(PathError::EvaluationError { source, .. }) => source,
        other => panic!("expected an evaluation error, got {:?}", other),
    }
}

// --- Literals ---

#[test]
fn test_literals() {
    assert_eq!(values(&eval_empty("true").unwrap()), vec![Value::Boolean(true)]);
    assert_eq!(values(&eval_empty("'hello'").unwrap()), vec![string("hello")]);
    assert_eq!(values(&eval_empty("123").unwrap()), vec![Value::Integer(123)]);
    assert_eq!(values(&eval_empty("-5").unwrap()), vec![Value::Integer(-5)]);
    assert_eq!(values(&eval_empty("123.45").unwrap()), vec![Value::Decimal(dec!(123.45))]);
    assert_eq!(
        values(&eval_empty("5 'mg'").unwrap()),
        vec![Value::Quantity(dec!(5), "mg".to_string())]
    );
    assert_eq!(strings(&eval_empty("@2015-02").unwrap()), vec!["2015-02"]);
    assert_eq!(strings(&eval_empty("@T14:34").unwrap()), vec!["14:34"]);
    assert!(eval_empty("{}").unwrap().is_empty());
}

#[test]
fn test_string_escapes() {
    assert_eq!(values(&eval_empty(r"'it\'s'").unwrap()), vec![string("it's")]);
    assert_eq!(values(&eval_empty(r"'\u0041\tB'").unwrap()), vec![string("A\tB")]);
}

// --- Navigation ---

#[test]
fn test_member_navigation_flattens() {
    let order = order_record();
    assert_eq!(strings(&eval("item.name", &order).unwrap()), vec!["pen", "ink", "pad"]);
    assert_eq!(strings(&eval("item.tag", &order).unwrap()), vec!["office", "cheap", "office"]);
    assert_eq!(strings(&eval("customer.name", &order).unwrap()), vec!["Ada"]);
}

#[test]
fn test_type_name_prefix_is_skipped() {
    let order = order_record();
    assert_eq!(strings(&eval("Order.id", &order).unwrap()), vec!["o-1"]);
    assert!(eval("Invoice.id", &order).unwrap().is_empty());
}

#[test]
fn test_missing_member_is_empty() {
    let order = order_record();
    assert!(eval("shipping.address", &order).unwrap().is_empty());
}

#[test]
fn test_indexer() {
    let order = order_record();
    assert_eq!(strings(&eval("item[1].name", &order).unwrap()), vec!["ink"]);
    assert!(eval("item[7]", &order).unwrap().is_empty());
    assert!(eval("item[-1]", &order).unwrap().is_empty());
    assert!(eval("item[{}]", &order).unwrap().is_empty());
    assert!(matches!(
        evaluation_error(eval("item['a']", &order)),
        EvaluationError::InvalidIndex(_)
    ));
    assert!(matches!(
        evaluation_error(eval("item[(1 | 2)]", &order)),
        EvaluationError::SingletonEvaluationError(_)
    ));
}

// --- Arithmetic ---

#[test]
fn test_arithmetic() {
    assert_eq!(values(&eval_empty("2 + 3 * 4").unwrap()), vec![Value::Integer(14)]);
    assert_eq!(values(&eval_empty("(2 + 3) * 4").unwrap()), vec![Value::Integer(20)]);
    assert_eq!(values(&eval_empty("7 / 2").unwrap()), vec![Value::Decimal(dec!(3.5))]);
    assert_eq!(values(&eval_empty("7 div 2").unwrap()), vec![Value::Integer(3)]);
    assert_eq!(values(&eval_empty("7 mod 2").unwrap()), vec![Value::Integer(1)]);
    assert_eq!(values(&eval_empty("2 + 3.5").unwrap()), vec![Value::Decimal(dec!(5.5))]);
    assert_eq!(values(&eval_empty("'a' + 'b'").unwrap()), vec![string("ab")]);
    assert_eq!(values(&eval_empty("'a' & {}").unwrap()), vec![string("a")]);
}

#[test]
fn test_structured_operands_are_not_empty() {
    let order = order_record();
    assert!(eval("customer & 'x'", &order).unwrap().is_empty());
    assert!(eval("'x' & customer", &order).unwrap().is_empty());
    assert!(eval("customer + 1", &order).unwrap().is_empty());
    assert_eq!(values(&eval("missing & 'x'", &order).unwrap()), vec![string("x")]);
    assert_eq!(values(&eval("customer.name & '!'", &order).unwrap()), vec![string("Ada!")]);
}

#[test]
fn test_arithmetic_faults_are_empty() {
    assert!(eval_empty("1 / 0").unwrap().is_empty());
    assert!(eval_empty("1 + {}").unwrap().is_empty());
    assert!(eval_empty("1 + 'a'").unwrap().is_empty());
    assert!(eval_empty("9223372036854775807 + 1").unwrap().is_empty());
    assert!(eval_empty("-'a'").unwrap().is_empty());
}

#[test]
fn test_multi_element_operand_is_an_error() {
    assert!(matches!(
        evaluation_error(eval_empty("(1 | 2) + 1")),
        EvaluationError::SingletonEvaluationError(_)
    ));
}

#[test]
fn test_quantity_arithmetic() {
    assert_eq!(
        values(&eval_empty("5 'mg' + 3 'mg'").unwrap()),
        vec![Value::Quantity(dec!(8), "mg".to_string())]
    );
    assert_eq!(boolean("1 'g' + 500 'mg' = 1.5 'g'"), Some(true));
}

#[test]
fn test_temporal_arithmetic() {
    assert_eq!(boolean("@2024-01-31 + 1 month = @2024-02-29"), Some(true));
    assert_eq!(boolean("1 month + @2024-01-31 = @2024-02-29"), Some(true));
    assert_eq!(boolean("@2024-03-01 - 1 day = @2024-02-29"), Some(true));
    assert_eq!(boolean("@T10:00 + 90 minutes = @T11:30"), Some(true));
    assert_eq!(boolean("@2024-03-31 - 1 month = @2024-02-29"), Some(true));
    assert_eq!(boolean("1 month - @2024-03-31 = @2024-02-29"), Some(true));
}

// --- Comparison and equality ---

#[test]
fn test_inequality() {
    assert_eq!(boolean("1 < 2"), Some(true));
    assert_eq!(boolean("2.5 >= 2"), Some(true));
    assert_eq!(boolean("'abc' < 'abd'"), Some(true));
    assert_eq!(boolean("@2024-01-01 < @2024-02-01"), Some(true));
    assert_eq!(boolean("1 < 'a'"), Some(false));
    assert_eq!(boolean("{} < 1"), Some(false));
}

#[test]
fn test_equality() {
    assert_eq!(boolean("1 = 1.0"), Some(true));
    assert_eq!(boolean("'a' != 'b'"), Some(true));
    assert_eq!(boolean("(1 | 2) = (1 | 2)"), Some(true));
    assert_eq!(boolean("(1 | 2) = (2 | 1)"), Some(false));
    assert_eq!(boolean("1 ~ 1"), Some(true));
    assert!(eval_empty("{} = 1").unwrap().is_empty());
}

#[test]
fn test_tree_nodes_compare_by_value() {
    let order = order_record();
    assert_eq!(
        eval("item.where(price > 2).name", &order).map(|c| strings(&c)).unwrap(),
        vec!["ink", "pad"]
    );
    assert_eq!(
        eval("item[0].active = true", &order).unwrap().as_boolean(),
        Some(true)
    );
}

// --- Collections ---

#[test]
fn test_union_removes_duplicates_in_first_seen_order() {
    assert_eq!(
        values(&eval_empty("(3 | 1 | 3 | 2 | 1)").unwrap()),
        vec![Value::Integer(3), Value::Integer(1), Value::Integer(2)]
    );
}

#[test]
fn test_membership() {
    assert_eq!(boolean("1 in (1 | 2)"), Some(true));
    assert_eq!(boolean("(1 | 2) contains 3"), Some(false));
    assert_eq!(boolean("{} in (1 | 2)"), Some(true));
}

// --- Functions ---

#[test]
fn test_where_select_and_index() {
    let order = order_record();
    assert_eq!(
        strings(&eval("item.where(qty > 1).name", &order).unwrap()),
        vec!["pen", "pad"]
    );
    assert_eq!(
        values(&eval("item.select(qty * 2)", &order).unwrap()),
        vec![Value::Integer(4), Value::Integer(2), Value::Integer(8)]
    );
    assert_eq!(
        values(&eval("item.select($index)", &order).unwrap()),
        vec![Value::Integer(0), Value::Integer(1), Value::Integer(2)]
    );
    assert_eq!(
        strings(&eval("item.where($index > 0).name", &order).unwrap()),
        vec!["ink", "pad"]
    );
    assert!(eval("$total", &order).unwrap().is_empty());
}

#[test]
fn test_this_inside_iteration() {
    assert_eq!(
        values(&eval_empty("(1 | 2 | 3).where($this > 1).select($this * 10)").unwrap()),
        vec![Value::Integer(20), Value::Integer(30)]
    );
}

#[test]
fn test_exists_and_all() {
    let order = order_record();
    assert_eq!(eval("item.exists()", &order).unwrap().as_boolean(), Some(true));
    assert_eq!(eval("item.exists(qty > 3)", &order).unwrap().as_boolean(), Some(true));
    assert_eq!(eval("item.exists(qty > 9)", &order).unwrap().as_boolean(), Some(false));
    assert_eq!(eval("item.all(qty > 0)", &order).unwrap().as_boolean(), Some(true));
    assert_eq!(eval("item.active.all()", &order).unwrap().as_boolean(), Some(false));
    assert_eq!(eval("{}.all(false)", &order).unwrap().as_boolean(), Some(true));
}

#[test]
fn test_all_fails_only_on_false_criteria() {
    let order = order_record();
    assert_eq!(eval("item.all(missing)", &order).unwrap().as_boolean(), Some(true));
    assert_eq!(eval("item.all(name)", &order).unwrap().as_boolean(), Some(true));
    assert_eq!(eval("item.all(active)", &order).unwrap().as_boolean(), Some(false));
}

#[test]
fn test_iif_evaluates_only_the_selected_branch() {
    assert_eq!(values(&eval_empty("iif(true, 'a', 'b'.frobnicate())").unwrap()), vec![string("a")]);
    assert_eq!(values(&eval_empty("iif({}, 'a', 'b')").unwrap()), vec![string("b")]);
    assert!(eval_empty("iif(false, 'a')").unwrap().is_empty());
    assert!(matches!(
        evaluation_error(eval_empty("iif('x', 1, 2)")),
        EvaluationError::InvalidArgument(_)
    ));
}

#[test]
fn test_repeat_follows_projection_until_exhausted() {
    let tree = JsonNode::root(json!({
        "resourceType": "Part",
        "name": "root",
        "part": [
            { "name": "a", "part": [{ "name": "a1" }, { "name": "a2" }] },
            { "name": "b" }
        ]
    }));
    assert_eq!(
        strings(&eval("repeat(part).name", &tree).unwrap()),
        vec!["a", "b", "a1", "a2"]
    );
}

#[test]
fn test_standard_functions() {
    let order = order_record();
    assert_eq!(values(&eval("item.count()", &order).unwrap()), vec![Value::Integer(3)]);
    assert_eq!(strings(&eval("item.tag.distinct()", &order).unwrap()), vec!["office", "cheap"]);
    assert_eq!(strings(&eval("item.name.first()", &order).unwrap()), vec!["pen"]);
    assert_eq!(strings(&eval("item.name.last()", &order).unwrap()), vec!["pad"]);
    assert_eq!(strings(&eval("item.name.tail()", &order).unwrap()), vec!["ink", "pad"]);
    assert_eq!(strings(&eval("item.name.skip(1).take(1)", &order).unwrap()), vec!["ink"]);
    assert_eq!(strings(&eval("item.name.join(', ')", &order).unwrap()), vec!["pen, ink, pad"]);
    assert_eq!(values(&eval("item.qty.sum()", &order).unwrap()), vec![Value::Integer(7)]);
    assert_eq!(strings(&eval("customer.name.upper()", &order).unwrap()), vec!["ADA"]);
    assert_eq!(strings(&eval("'abcdef'.substring(1, 3)", &order).unwrap()), vec!["bcd"]);
    assert_eq!(values(&eval("'42'.toInteger() + 1", &order).unwrap()), vec![Value::Integer(43)]);
    assert!(eval("'forty'.toInteger()", &order).unwrap().is_empty());
    assert_eq!(
        strings(&eval("'a-b-c'.replaceMatches('-', '+')", &order).unwrap()),
        vec!["a+b+c"]
    );
    assert_eq!(strings(&eval("'hi'.encode('base64')", &order).unwrap()), vec!["aGk="]);
}

#[test]
fn test_function_errors() {
    assert!(matches!(
        evaluation_error(eval_empty("'a'.frobnicate()")),
        EvaluationError::UnsupportedFunction(_)
    ));
    assert!(matches!(
        evaluation_error(eval_empty("'a'.upper(1)")),
        EvaluationError::InvalidArity(_)
    ));
    assert!(matches!(
        evaluation_error(eval_empty("where()")),
        EvaluationError::InvalidArity(_)
    ));
    assert!(matches!(
        evaluation_error(eval_empty("(1 | 2).single()")),
        EvaluationError::SingletonEvaluationError(_)
    ));
}

// --- Constants ---

#[test]
fn test_external_constants() {
    let order = order_record();
    assert_eq!(strings(&eval("%context.id", &order).unwrap()), vec!["o-1"]);
    assert_eq!(strings(&eval("%ucum", &order).unwrap()), vec!["http://unitsofmeasure.org"]);
    assert!(eval("%undefined", &order).unwrap().is_empty());
}

#[test]
fn test_resource_constants_reach_the_root() {
    let order = order_record();
    assert_eq!(
        strings(&eval("item.select(%resource.id)", &order).unwrap()),
        vec!["o-1", "o-1", "o-1"]
    );
    assert_eq!(
        strings(&eval("item.where(name = 'ink').select(%rootResource.customer.name)", &order).unwrap()),
        vec!["Ada"]
    );
    assert!(eval_empty("%resource").unwrap().is_empty());
}

#[test]
fn test_parse_errors() {
    for text in ["1 +", "item.where(", "'unterminated", "1 2"] {
        assert!(
            matches!(eval_empty(text), Err(PathError::ParseError { .. })),
            "expected parse error for '{}'",
            text
        );
    }
}
