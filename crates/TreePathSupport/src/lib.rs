//! # Path Expression Support Types
//!
//! This crate provides the value and node model that the path expression engine
//! evaluates over. It is kept separate from the engine so that hosts exposing their
//! own data trees only need to depend on the types defined here.
//!
//! ## Overview
//!
//! - [`Value`] - the primitive value domains (boolean, string, integer, decimal,
//!   date, date-time, time, quantity) with comparability, ordering and equality
//! - [`Node`] / [`TreeNode`] - a result element, either a bare value or a position
//!   inside a host data tree
//! - [`Collection`] - the ordered, immutable result of every sub-expression
//! - [`EvaluationError`] - hard evaluation failures
//! - [`IntoCollection`] - conversions from Rust values into collections
//!
//! ## Usage Example
//!
//! ```rust
//! use treepath_support::{Collection, IntoCollection, Value};
//!
//! let numbers = vec![1i64, 2, 3].to_collection();
//! assert_eq!(numbers.len(), 3);
//!
//! let single = "hello".to_collection();
//! assert_eq!(single.singleton_value(), Some(Value::String("hello".to_string())));
//! assert!(Collection::empty().is_empty());
//! ```

pub mod date_time;
pub mod evaluation_error;
pub mod node;
pub mod traits;
pub mod type_info;
pub mod ucum;
pub mod value;

pub use date_time::{CalendarUnit, PrecisionDate, PrecisionDateTime, PrecisionTime, TemporalPrecision};
pub use evaluation_error::EvaluationError;
pub use node::{Collection, Node, TreeNode};
pub use traits::IntoCollection;
pub use type_info::{SYSTEM_NAMESPACE, TypeInfoResult};
pub use value::Value;
