//! JSON data trees and JSON rendering of results.
//!
//! [`JsonNode`] exposes a `serde_json::Value` through the [`TreeNode`] contract:
//!
//! - an object's type is its `resourceType` member, or `Object` when absent; the
//!   `resourceType` member itself is not a child
//! - array members flatten into repeated children with the member's name
//! - primitives become leaves carrying a `System` value
//! - `null` members are skipped
//!
//! Children are built once per node, on first access.

use std::str::FromStr;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde_json::{Map, json};
use treepath_support::{Collection, Node, TreeNode, TypeInfoResult, Value, ucum};

use crate::type_resolver::DEFAULT_MODEL_NAMESPACE;

const RESOURCE_TYPE: &str = "resourceType";
const OBJECT_TYPE: &str = "Object";

#[derive(Debug)]
pub struct JsonNode {
    name: String,
    namespace: Arc<str>,
    json: serde_json::Value,
    value: Option<Value>,
    children: OnceCell<Vec<Node>>,
}

impl JsonNode {
    /// Wraps `json` as the root of a tree in the default model namespace.
    pub fn root(json: serde_json::Value) -> Node {
        Self::root_in(DEFAULT_MODEL_NAMESPACE, json)
    }

    pub fn root_in(namespace: &str, json: serde_json::Value) -> Node {
        let name = json
            .get(RESOURCE_TYPE)
            .and_then(|t| t.as_str())
            .unwrap_or_default()
            .to_string();
        Node::tree(Self::new(name, Arc::from(namespace), json))
    }

    fn new(name: String, namespace: Arc<str>, json: serde_json::Value) -> Self {
        let value = primitive_value(&json);
        Self {
            name,
            namespace,
            json,
            value,
            children: OnceCell::new(),
        }
    }

    pub fn json(&self) -> &serde_json::Value {
        &self.json
    }

    fn build_children(&self) -> Vec<Node> {
        let mut children = Vec::new();
        if let serde_json::Value::Object(members) = &self.json {
            for (key, member) in members {
                if key != RESOURCE_TYPE {
                    self.push_member(key, member, &mut children);
                }
            }
        }
        children
    }

    fn push_member(&self, key: &str, member: &serde_json::Value, out: &mut Vec<Node>) {
        match member {
            serde_json::Value::Null => {}
            serde_json::Value::Array(items) => {
                for item in items {
                    self.push_member(key, item, out);
                }
            }
            _ => out.push(Node::tree(Self::new(
                key.to_string(),
                Arc::clone(&self.namespace),
                member.clone(),
            ))),
        }
    }
}

impl TreeNode for JsonNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn type_info(&self) -> TypeInfoResult {
        if let Some(value) = &self.value {
            return value.type_info();
        }
        let type_name = self
            .json
            .get(RESOURCE_TYPE)
            .and_then(|t| t.as_str())
            .unwrap_or(OBJECT_TYPE);
        TypeInfoResult::new(&self.namespace, type_name)
    }

    fn children(&self) -> Vec<Node> {
        self.children.get_or_init(|| self.build_children()).clone()
    }

    fn value(&self) -> Option<Value> {
        self.value.clone()
    }
}

fn primitive_value(json: &serde_json::Value) -> Option<Value> {
    match json {
        serde_json::Value::Bool(b) => Some(Value::Boolean(*b)),
        serde_json::Value::String(s) => Some(Value::String(s.clone())),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Some(Value::Integer(i)),
            None => {
                let text = n.to_string();
                Decimal::from_str(&text)
                    .or_else(|_| Decimal::from_scientific(&text))
                    .ok()
                    .map(Value::Decimal)
            }
        },
        _ => None,
    }
}

/// Converts JSON into a collection: arrays flatten, `null` is empty, objects
/// become [`JsonNode`] trees and primitives become values.
pub fn json_to_collection(json: serde_json::Value) -> Collection {
    match json {
        serde_json::Value::Null => Collection::empty(),
        serde_json::Value::Array(items) => items
            .into_iter()
            .flat_map(|item| json_to_collection(item).to_vec())
            .collect(),
        serde_json::Value::Object(_) => Collection::singleton(JsonNode::root(json)),
        primitive => primitive_value(&primitive)
            .map(Collection::singleton)
            .unwrap_or_default(),
    }
}

/// Renders a quantity the way a FHIR `Quantity` looks, adding the UCUM system
/// and code only for valid UCUM units.
pub fn quantity_to_json(value: &Decimal, unit: &str) -> serde_json::Value {
    let numeric_value = value
        .to_f64()
        .unwrap_or_else(|| value.to_string().parse::<f64>().unwrap_or(0.0));

    if ucum::validate_unit(unit) {
        json!({
            "value": numeric_value,
            "unit": unit,
            "system": "http://unitsofmeasure.org",
            "code": unit
        })
    } else {
        json!({
            "value": numeric_value,
            "unit": unit
        })
    }
}

pub fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Boolean(b) => json!(b),
        Value::String(s) => json!(s),
        Value::Integer(i) => json!(i),
        Value::Decimal(d) => d
            .to_f64()
            .map(|f| json!(f))
            .unwrap_or_else(|| json!(d.to_string())),
        Value::Date(_) | Value::DateTime(_) | Value::Time(_) => json!(value.to_string()),
        Value::Quantity(v, unit) => quantity_to_json(v, unit),
    }
}

/// Renders any result node. Tree nodes without a value are rebuilt as objects
/// from their children; repeated child names become arrays.
pub fn node_to_json(node: &Node) -> serde_json::Value {
    if let Some(value) = node.value() {
        return value_to_json(&value);
    }
    let mut object = Map::new();
    let type_info = node.type_info();
    if type_info.name != OBJECT_TYPE {
        object.insert(RESOURCE_TYPE.to_string(), json!(type_info.name));
    }
    for child in node.children() {
        let key = child.name().unwrap_or_default().to_string();
        let rendered = node_to_json(&child);
        match object.get_mut(&key) {
            Some(serde_json::Value::Array(items)) => items.push(rendered),
            Some(existing) => {
                let first = existing.take();
                *existing = json!([first, rendered]);
            }
            None => {
                object.insert(key, rendered);
            }
        }
    }
    serde_json::Value::Object(object)
}

pub fn collection_to_json(collection: &Collection) -> serde_json::Value {
    serde_json::Value::Array(collection.iter().map(node_to_json).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order() -> Node {
        JsonNode::root(json!({
            "resourceType": "Order",
            "id": "o-1",
            "total": 12.5,
            "note": null,
            "item": [
                { "name": "pen", "qty": 2 },
                { "name": "ink", "qty": 1 }
            ]
        }))
    }

    #[test]
    fn test_object_type_and_children() {
        let root = order();
        assert_eq!(root.name(), Some("Order"));
        assert_eq!(root.type_info(), TypeInfoResult::new("Model", "Order"));

        let names: Vec<String> = root
            .children()
            .iter()
            .filter_map(|c| c.name().map(str::to_string))
            .collect();
        assert_eq!(names, vec!["id", "item", "item", "total"]);
    }

    #[test]
    fn test_primitive_leaves_carry_values() {
        let root = order();
        let total = root
            .children()
            .into_iter()
            .find(|c| c.name() == Some("total"))
            .unwrap();
        assert_eq!(total.value().map(|v| v.into_owned()), Some(Value::Decimal(Decimal::new(125, 1))));
        assert_eq!(total.type_info(), TypeInfoResult::system("Decimal"));

        let item = root
            .children()
            .into_iter()
            .find(|c| c.name() == Some("item"))
            .unwrap();
        assert_eq!(item.type_info(), TypeInfoResult::new("Model", "Object"));
    }

    #[test]
    fn test_json_to_collection_flattens() {
        let collection = json_to_collection(json!([1, [2, null], "a"]));
        assert_eq!(collection.len(), 3);
        assert_eq!(collection.get(2).and_then(|n| n.value()).map(|v| v.into_owned()), Some(Value::String("a".to_string())));
    }

    #[test]
    fn test_node_to_json_round_trips_shape() {
        let rendered = node_to_json(&order());
        assert_eq!(rendered["resourceType"], "Order");
        assert_eq!(rendered["item"].as_array().map(Vec::len), Some(2));
        assert_eq!(rendered["item"][1]["name"], "ink");
        assert!(rendered.get("note").is_none());
    }

    #[test]
    fn test_quantity_json() {
        let q = quantity_to_json(&Decimal::new(15, 1), "mg");
        assert_eq!(q["system"], "http://unitsofmeasure.org");
        let q = quantity_to_json(&Decimal::new(42, 0), "widgets");
        assert!(q.get("system").is_none());
    }
}
