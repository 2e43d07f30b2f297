mod common;

use std::sync::Arc;
use std::thread;

use common::{order_record, strings};
use parking_lot::Mutex;
use serde_json::json;
use treepath::parser::Expression;
use treepath::{
    EngineConfig, EvaluationContext, EvaluationListener, JsonNode, PathEngine, PathError,
};
use treepath_support::{Collection, Node, Value};

fn private_engine() -> PathEngine {
    PathEngine::with_config(EngineConfig::default().with_expression_cache_capacity(2))
}

#[test]
fn test_repeated_evaluation_reuses_compiled_expression() {
    let engine = private_engine();
    let order = order_record();
    assert!(!engine.cache().is_compiled("item.count()"));

    engine.evaluate_tree(order.clone(), "item.count()").unwrap();
    let first = engine.compile("item.count()").unwrap();
    engine.evaluate_tree(order, "item.count()").unwrap();
    let second = engine.compile("item.count()").unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(engine.cache().expression_count(), 1);
}

#[test]
fn test_expression_cache_is_bounded() {
    let engine = private_engine();
    let mut context = EvaluationContext::new_empty();
    for text in ["1", "2", "3", "4"] {
        engine.evaluate(&mut context, text).unwrap();
    }
    assert_eq!(engine.cache().expression_count(), 2);
    assert!(engine.cache().is_compiled("4"));
    assert!(!engine.cache().is_compiled("1"));
}

#[test]
fn test_engines_from_new_share_the_global_cache() {
    let a = PathEngine::new();
    let b = PathEngine::new();
    assert!(Arc::ptr_eq(a.cache(), b.cache()));
    assert!(!Arc::ptr_eq(a.cache(), private_engine().cache()));
}

#[test]
fn test_concurrent_evaluation_on_shared_engine() {
    let engine = Arc::new(PathEngine::new());
    let handles: Vec<_> = (0..8i64)
        .map(|n| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                let record = JsonNode::root(json!({ "resourceType": "Counter", "value": n }));
                engine
                    .evaluate_tree(record, "value * 2 + 1")
                    .unwrap()
                    .singleton_value()
            })
        })
        .collect();
    for (n, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.join().unwrap(), Some(Value::Integer(n as i64 * 2 + 1)));
    }
}

#[test]
fn test_batch_keeps_input_order() {
    let engine = PathEngine::new();
    let records: Vec<Node> = (0..20)
        .map(|i| JsonNode::root(json!({ "resourceType": "Row", "id": format!("r{}", i) })))
        .collect();
    let results = engine.evaluate_batch("id", &records).unwrap();
    let ids: Vec<String> = results
        .into_iter()
        .flat_map(|result| strings(&result.unwrap()))
        .collect();
    let expected: Vec<String> = (0..20).map(|i| format!("r{}", i)).collect();
    assert_eq!(ids, expected);
}

#[test]
fn test_batch_reports_errors_per_record() {
    let engine = PathEngine::new();
    let records = vec![
        JsonNode::root(json!({ "v": 1 })),
        JsonNode::root(json!({ "v": [1, 2] })),
    ];
    let results = engine.evaluate_batch("v + 1", &records).unwrap();
    assert_eq!(results[0].as_ref().unwrap().singleton_value(), Some(Value::Integer(2)));
    assert!(matches!(results[1], Err(PathError::EvaluationError { .. })));

    assert!(matches!(
        engine.evaluate_batch("v +", &records),
        Err(PathError::ParseError { .. })
    ));
}

#[test]
fn test_trace_records_named_outputs() {
    let engine = PathEngine::new();
    let mut context = EvaluationContext::new(order_record());
    let result = engine
        .evaluate(&mut context, "item.trace('items', name).where(qty > 3).trace('big').name")
        .unwrap();
    assert_eq!(strings(&result), vec!["pad"]);

    let traces = context.get_trace_outputs();
    assert_eq!(traces.len(), 2);
    assert_eq!(traces[0].0, "items");
    assert_eq!(strings(&traces[0].1), vec!["pen", "ink", "pad"]);
    assert_eq!(traces[1].0, "big");
    assert_eq!(traces[1].1.len(), 1);

    context.clear_trace_outputs();
    assert!(context.get_trace_outputs().is_empty());
}

#[test]
fn test_trace_projection_sees_the_whole_input() {
    let engine = PathEngine::new();
    let mut context = EvaluationContext::new(order_record());
    engine
        .evaluate(&mut context, "item.trace('count', count()).name")
        .unwrap();
    let traces = context.get_trace_outputs();
    assert_eq!(traces.len(), 1);
    assert_eq!(traces[0].1.singleton_value(), Some(Value::Integer(3)));
}

#[test]
fn test_member_names_go_through_identifier_cache() {
    let engine = private_engine();
    engine.evaluate_tree(order_record(), "customer.name").unwrap();
    assert_eq!(engine.cache().identifier_count(), 2);
    engine.evaluate_tree(order_record(), "customer.`name`").unwrap();
    assert_eq!(engine.cache().identifier_count(), 3);
}

#[derive(Default)]
struct RecordingListener {
    events: Mutex<Vec<String>>,
}

impl EvaluationListener for RecordingListener {
    fn before_evaluation(&self, _expression: &Expression, input: &Collection) {
        self.events.lock().push(format!("before:{}", input.len()));
    }

    fn after_evaluation(&self, _expression: &Expression, result: &Collection) {
        self.events.lock().push(format!("after:{}", result.len()));
    }
}

#[test]
fn test_listener_sees_every_node() {
    let listener = Arc::new(RecordingListener::default());
    let mut context = EvaluationContext::new_empty();
    context.add_listener(listener.clone());

    let result = PathEngine::new().evaluate(&mut context, "1 + 2").unwrap();
    assert_eq!(result.singleton_value(), Some(Value::Integer(3)));

    let events = listener.events.lock().clone();
    assert_eq!(events.len(), 6);
    assert_eq!(events.first().map(String::as_str), Some("before:0"));
    assert_eq!(events.last().map(String::as_str), Some("after:1"));
}

#[test]
fn test_external_constants_survive_evaluation() {
    let engine = PathEngine::new();
    let mut context = EvaluationContext::new_empty();
    context.set_external_constant("limit", 10i64);
    context.set_external_constant("names", vec!["a", "b"]);

    let result = engine.evaluate(&mut context, "%names.count() < %limit").unwrap();
    assert_eq!(result.as_boolean(), Some(true));
    assert!(context.has_external_constant("limit"));
    assert!(context.has_external_constant("context"));
    assert_eq!(context.unset_external_constant("limit").map(|c| c.len()), Some(1));
}
