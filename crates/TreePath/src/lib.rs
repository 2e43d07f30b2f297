//! # Path Expression Engine
//!
//! This crate evaluates path expressions against hierarchical data trees. An
//! expression navigates named children, filters and projects collections, does
//! arithmetic and comparisons over typed values, and checks types against a
//! pluggable type model. Every sub-expression yields an ordered collection; the
//! empty collection stands for "unknown" and propagates through most operators.
//!
//! ## Overview
//!
//! - **Navigate trees** with member paths (e.g., `item.name`)
//! - **Filter and project** collections (e.g., `item.where(qty > 1).select(name)`)
//! - **Compute** with integers, decimals, quantities and partial-precision dates
//! - **Check types** with `is`, `as` and `ofType` against a [`TypeResolver`]
//! - **Extend** the function set through a [`FunctionRegistry`]
//!
//! ## Architecture
//!
//! - **Parser** (`parser.rs`): text to an immutable expression tree
//! - **Cache** (`cache.rs`): bounded caches for compiled expressions, identifiers
//!   and literals
//! - **Context** (`context.rs`): data tree root, `%name` constants, trace log,
//!   listeners
//! - **Evaluator** (`evaluator.rs`): walks the expression tree
//! - **Registry** (`registry.rs`, `standard_functions.rs`): named functions with
//!   eagerly evaluated arguments
//! - **Type resolution** (`type_resolver.rs`): type names, base types, assignability
//! - **Engine** (`engine.rs`): the entry point tying these together
//! - **JSON trees** (`json_tree.rs`): a [`TreeNode`](treepath_support::TreeNode)
//!   implementation over `serde_json`, and JSON rendering of results
//!
//! ## Usage Examples
//!
//! ```rust
//! use serde_json::json;
//! use treepath::{JsonNode, PathEngine};
//! use treepath_support::Value;
//!
//! let order = JsonNode::root(json!({
//!     "resourceType": "Order",
//!     "item": [
//!         { "name": "pen", "qty": 2 },
//!         { "name": "ink", "qty": 1 }
//!     ]
//! }));
//!
//! let engine = PathEngine::new();
//! let names = engine.evaluate_tree(order.clone(), "item.where(qty > 1).name").unwrap();
//! assert_eq!(names.singleton_value(), Some(Value::String("pen".to_string())));
//!
//! let total = engine.evaluate_tree(order, "item.qty.sum()").unwrap();
//! assert_eq!(total.singleton_value(), Some(Value::Integer(3)));
//! ```
//!
//! ## Error Handling
//!
//! Malformed text is a [`PathError::ParseError`]. Semantic violations during
//! evaluation, such as a multi-element operand where one is required or a call to
//! an unknown function, are a [`PathError::EvaluationError`] carrying the
//! expression text. Most type mismatches are not errors: they yield empty.

mod control_functions;

pub mod cache;
pub mod cli;
pub mod context;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod json_tree;
pub mod parser;
pub mod registry;
pub mod standard_functions;
pub mod type_resolver;

pub use cache::{CacheConfig, ExpressionCache};
pub use context::{EvaluationContext, EvaluationListener};
pub use engine::{EngineConfig, PathEngine};
pub use error::{PathError, PathResult};
pub use json_tree::{JsonNode, collection_to_json, json_to_collection};
pub use registry::{FunctionDescriptor, FunctionRegistry, StandardFunctionRegistry};
pub use type_resolver::{SchemaTypeResolver, TypeResolver};

use treepath_support::Collection;

/// Evaluates `expression` against the context's tree root with a default engine.
///
/// # Examples
///
/// ```rust
/// use treepath::{EvaluationContext, evaluate_expression};
/// use treepath_support::Value;
///
/// let mut context = EvaluationContext::new_empty();
/// let result = evaluate_expression("(1 | 2 | 2).count()", &mut context).unwrap();
/// assert_eq!(result.singleton_value(), Some(Value::Integer(2)));
/// ```
pub fn evaluate_expression(
    expression: &str,
    context: &mut EvaluationContext,
) -> PathResult<Collection> {
    PathEngine::new().evaluate(context, expression)
}
