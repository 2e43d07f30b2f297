//! # Type Information
//!
//! Type descriptors for values and tree nodes. Every type lives in a namespace:
//! [`SYSTEM_NAMESPACE`] holds the primitive value kinds, every other namespace belongs
//! to the host data model.

use std::fmt;

/// Namespace reserved for primitive value types.
pub const SYSTEM_NAMESPACE: &str = "System";

/// Namespace-qualified type identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeInfoResult {
    pub namespace: String,
    pub name: String,
}

impl TypeInfoResult {
    pub fn new(namespace: &str, name: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }

    /// Creates a type in the `System` namespace.
    pub fn system(name: &str) -> Self {
        Self::new(SYSTEM_NAMESPACE, name)
    }

    pub fn is_system(&self) -> bool {
        self.namespace == SYSTEM_NAMESPACE
    }
}

impl fmt::Display for TypeInfoResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.namespace, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualified_display() {
        assert_eq!(TypeInfoResult::system("String").to_string(), "System.String");
        assert_eq!(TypeInfoResult::new("Model", "Record").to_string(), "Model.Record");
        assert!(TypeInfoResult::system("Integer").is_system());
        assert!(!TypeInfoResult::new("Model", "Integer").is_system());
    }
}
