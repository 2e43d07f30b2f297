use rust_decimal::Decimal;

use crate::node::{Collection, Node};
use crate::value::Value;

/// Conversion of Rust values into result collections.
///
/// Used by function implementations to build their results and by hosts to
/// seed external constants.
///
/// # Examples
///
/// ```rust
/// use treepath_support::{IntoCollection, Value};
///
/// let constant = 42i64.to_collection();
/// assert_eq!(constant.singleton_value(), Some(Value::Integer(42)));
///
/// let missing: Option<String> = None;
/// assert!(missing.to_collection().is_empty());
/// ```
pub trait IntoCollection {
    fn to_collection(&self) -> Collection;
}

// === IntoCollection Implementations ===

impl IntoCollection for bool {
    fn to_collection(&self) -> Collection {
        Collection::singleton(Value::Boolean(*self))
    }
}

impl IntoCollection for i64 {
    fn to_collection(&self) -> Collection {
        Collection::singleton(Value::Integer(*self))
    }
}

impl IntoCollection for i32 {
    fn to_collection(&self) -> Collection {
        Collection::singleton(Value::Integer(i64::from(*self)))
    }
}

impl IntoCollection for Decimal {
    fn to_collection(&self) -> Collection {
        Collection::singleton(Value::Decimal(*self))
    }
}

impl IntoCollection for String {
    fn to_collection(&self) -> Collection {
        Collection::singleton(Value::String(self.clone()))
    }
}

impl IntoCollection for &str {
    fn to_collection(&self) -> Collection {
        Collection::singleton(Value::String((*self).to_string()))
    }
}

impl IntoCollection for Value {
    fn to_collection(&self) -> Collection {
        Collection::singleton(self.clone())
    }
}

impl IntoCollection for Node {
    fn to_collection(&self) -> Collection {
        Collection::singleton(self.clone())
    }
}

impl IntoCollection for Collection {
    fn to_collection(&self) -> Collection {
        self.clone()
    }
}

/// `None` is the empty collection.
impl<T: IntoCollection> IntoCollection for Option<T> {
    fn to_collection(&self) -> Collection {
        match self {
            Some(value) => value.to_collection(),
            None => Collection::empty(),
        }
    }
}

/// Flattens the element collections in order.
impl<T: IntoCollection> IntoCollection for Vec<T> {
    fn to_collection(&self) -> Collection {
        self.iter()
            .flat_map(|item| item.to_collection().to_vec())
            .collect()
    }
}
