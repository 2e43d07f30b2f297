//! # Function Registry
//!
//! Functions that do not need lazy, per-element argument evaluation are looked up
//! by name in a [`FunctionRegistry`]. The evaluator checks the call's arity against
//! the descriptor, evaluates every argument once in the current context, and hands
//! the results to [`FunctionDescriptor::apply`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use treepath_support::{Collection, EvaluationError};

use crate::context::EvaluationContext;
use crate::standard_functions;

pub type FunctionResult = Result<Collection, EvaluationError>;

/// Signature of a registered function: `(context, current input, evaluated arguments)`.
pub type FunctionImpl =
    dyn Fn(&EvaluationContext, &Collection, &[Collection]) -> FunctionResult + Send + Sync;

#[derive(Clone)]
pub struct FunctionDescriptor {
    name: String,
    min_arity: usize,
    max_arity: usize,
    apply: Arc<FunctionImpl>,
}

impl FunctionDescriptor {
    pub fn new<F>(name: &str, min_arity: usize, max_arity: usize, apply: F) -> Self
    where
        F: Fn(&EvaluationContext, &Collection, &[Collection]) -> FunctionResult
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.to_string(),
            min_arity,
            max_arity,
            apply: Arc::new(apply),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn min_arity(&self) -> usize {
        self.min_arity
    }

    pub fn max_arity(&self) -> usize {
        self.max_arity
    }

    pub fn accepts_arity(&self, arity: usize) -> bool {
        (self.min_arity..=self.max_arity).contains(&arity)
    }

    pub fn apply(
        &self,
        context: &EvaluationContext,
        input: &Collection,
        arguments: &[Collection],
    ) -> FunctionResult {
        (self.apply)(context, input, arguments)
    }
}

impl fmt::Debug for FunctionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionDescriptor")
            .field("name", &self.name)
            .field("min_arity", &self.min_arity)
            .field("max_arity", &self.max_arity)
            .finish()
    }
}

pub trait FunctionRegistry: Send + Sync {
    fn lookup(&self, name: &str) -> Option<&FunctionDescriptor>;
}

/// Name-keyed registry, pre-populated with the standard functions by [`new`](Self::new).
///
/// ```rust
/// use treepath::registry::{FunctionDescriptor, FunctionRegistry, StandardFunctionRegistry};
/// use treepath_support::IntoCollection;
///
/// let registry = StandardFunctionRegistry::new().with_function(FunctionDescriptor::new(
///     "answer",
///     0,
///     0,
///     |_, _, _| Ok(42i64.to_collection()),
/// ));
/// assert!(registry.lookup("answer").is_some());
/// assert!(registry.lookup("count").is_some());
/// ```
#[derive(Clone, Default)]
pub struct StandardFunctionRegistry {
    functions: HashMap<String, FunctionDescriptor>,
}

impl StandardFunctionRegistry {
    pub fn new() -> Self {
        let mut registry = Self::empty();
        standard_functions::register_standard_functions(&mut registry);
        registry
    }

    pub fn empty() -> Self {
        Self {
            functions: HashMap::new(),
        }
    }

    /// Adds `descriptor`, replacing any function of the same name.
    pub fn register(&mut self, descriptor: FunctionDescriptor) {
        self.functions
            .insert(descriptor.name().to_string(), descriptor);
    }

    pub fn with_function(mut self, descriptor: FunctionDescriptor) -> Self {
        self.register(descriptor);
        self
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl FunctionRegistry for StandardFunctionRegistry {
    fn lookup(&self, name: &str) -> Option<&FunctionDescriptor> {
        self.functions.get(name)
    }
}

impl fmt::Debug for StandardFunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.functions.keys().collect();
        names.sort();
        f.debug_struct("StandardFunctionRegistry")
            .field("functions", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use treepath_support::{IntoCollection, Value};

    #[test]
    fn test_arity_bounds() {
        let descriptor = FunctionDescriptor::new("f", 1, 2, |_, input, _| Ok(input.clone()));
        assert!(!descriptor.accepts_arity(0));
        assert!(descriptor.accepts_arity(1));
        assert!(descriptor.accepts_arity(2));
        assert!(!descriptor.accepts_arity(3));
    }

    #[test]
    fn test_register_replaces_existing() {
        let mut registry = StandardFunctionRegistry::empty();
        registry.register(FunctionDescriptor::new("f", 0, 0, |_, _, _| {
            Ok(1i64.to_collection())
        }));
        registry.register(FunctionDescriptor::new("f", 0, 0, |_, _, _| {
            Ok(2i64.to_collection())
        }));
        assert_eq!(registry.len(), 1);

        let context = EvaluationContext::new_empty();
        let result = registry
            .lookup("f")
            .unwrap()
            .apply(&context, &Collection::empty(), &[])
            .unwrap();
        assert_eq!(result.singleton_value(), Some(Value::Integer(2)));
    }

    #[test]
    fn test_standard_registry_is_populated() {
        let registry = StandardFunctionRegistry::new();
        for name in ["count", "first", "upper", "toInteger", "matches", "encode"] {
            assert!(registry.lookup(name).is_some(), "missing {}", name);
        }
        assert!(registry.lookup("where").is_none());
    }
}
