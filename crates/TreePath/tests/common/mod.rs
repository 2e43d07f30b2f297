#![allow(dead_code)]

use serde_json::json;
use treepath::{EvaluationContext, JsonNode, PathEngine, PathResult};
use treepath_support::{Collection, Node, Value};

/// An order record used across the integration tests.
pub fn order_record() -> Node {
    JsonNode::root(json!({
        "resourceType": "Order",
        "id": "o-1",
        "active": true,
        "placed": "2024-03-01",
        "customer": { "name": "Ada", "tier": "gold" },
        "item": [
            { "name": "pen", "qty": 2, "price": 1.5, "active": true, "tag": ["office", "cheap"] },
            { "name": "ink", "qty": 1, "price": 12.25, "active": false },
            { "name": "pad", "qty": 4, "price": 3, "active": true, "tag": ["office"] }
        ]
    }))
}

pub fn eval(expression: &str, root: &Node) -> PathResult<Collection> {
    PathEngine::new().evaluate_tree(root.clone(), expression)
}

/// Evaluates without a data tree.
pub fn eval_empty(expression: &str) -> PathResult<Collection> {
    let mut context = EvaluationContext::new_empty();
    PathEngine::new().evaluate(&mut context, expression)
}

pub fn values(collection: &Collection) -> Vec<Value> {
    collection
        .iter()
        .filter_map(|node| node.value().map(|v| v.into_owned()))
        .collect()
}

pub fn strings(collection: &Collection) -> Vec<String> {
    values(collection).iter().map(|v| v.to_string()).collect()
}

pub fn boolean(expression: &str) -> Option<bool> {
    eval_empty(expression)
        .unwrap_or_else(|e| panic!("'{}' failed: {}", expression, e))
        .as_boolean()
}

pub fn string(s: &str) -> Value {
    Value::String(s.to_string())
}
