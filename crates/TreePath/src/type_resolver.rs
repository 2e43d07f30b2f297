//! # Type Resolution
//!
//! The evaluator does not know the host schema. It asks a [`TypeResolver`] to turn
//! type identifiers into [`TypeInfoResult`]s, to walk inheritance, and to decide
//! assignability for `is`, `as` and `ofType`.
//!
//! [`SchemaTypeResolver`] is a table-driven implementation: one model namespace
//! with a `name -> base` inheritance map, plus the built-in `System` types.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use treepath_support::{SYSTEM_NAMESPACE, TypeInfoResult};

/// Root type of every namespace.
pub const ANY_TYPE: &str = "Any";

pub const DEFAULT_MODEL_NAMESPACE: &str = "Model";

static SYSTEM_TYPES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    let mut s = HashSet::new();
    s.insert(ANY_TYPE);
    s.insert("Boolean");
    s.insert("String");
    s.insert("Integer");
    s.insert("Decimal");
    s.insert("Date");
    s.insert("DateTime");
    s.insert("Time");
    s.insert("Quantity");
    s
});

pub fn is_system_type(name: &str) -> bool {
    SYSTEM_TYPES.contains(name)
}

pub trait TypeResolver: Send + Sync {
    /// Resolves a possibly namespace-qualified type identifier.
    fn resolve(&self, identifier: &str) -> Option<TypeInfoResult>;

    /// The direct base type, or None at the root of a hierarchy.
    fn base_type(&self, type_info: &TypeInfoResult) -> Option<TypeInfoResult>;

    /// Names of `type_info` and all of its ancestors, excluding the namespace
    /// root `Any`. Empty for `System` types.
    fn ancestor_names(&self, type_info: &TypeInfoResult) -> HashSet<String> {
        let mut names = HashSet::new();
        if type_info.is_system() {
            return names;
        }
        let mut current = Some(type_info.clone());
        while let Some(ty) = current {
            if ty.name == ANY_TYPE || !names.insert(ty.name.clone()) {
                break;
            }
            current = self.base_type(&ty);
        }
        names
    }

    /// Whether a node of type `candidate` is an instance of `target`.
    ///
    /// A type is assignable to itself and to the `Any` of its own namespace;
    /// otherwise the candidate's base chain is searched for `target`.
    fn is_assignable_from(&self, target: &TypeInfoResult, candidate: &TypeInfoResult) -> bool {
        if target == candidate {
            return true;
        }
        if target.name == ANY_TYPE && target.namespace == candidate.namespace {
            return true;
        }
        let mut seen = HashSet::new();
        let mut current = self.base_type(candidate);
        while let Some(ty) = current {
            if &ty == target {
                return true;
            }
            if !seen.insert(ty.clone()) {
                break;
            }
            current = self.base_type(&ty);
        }
        false
    }
}

/// Table-driven resolver for a single model namespace.
///
/// ```rust
/// use treepath::type_resolver::{SchemaTypeResolver, TypeResolver};
///
/// let resolver = SchemaTypeResolver::new("Model")
///     .with_type("Resource", None)
///     .with_type("Order", Some("Resource"));
/// let order = resolver.resolve("Order").unwrap();
/// let resource = resolver.resolve("Model.Resource").unwrap();
/// assert!(resolver.is_assignable_from(&resource, &order));
/// assert!(resolver.ancestor_names(&order).contains("Resource"));
/// ```
#[derive(Debug, Clone)]
pub struct SchemaTypeResolver {
    namespace: String,
    bases: HashMap<String, Option<String>>,
    open: bool,
}

impl Default for SchemaTypeResolver {
    fn default() -> Self {
        Self::new(DEFAULT_MODEL_NAMESPACE)
    }
}

impl SchemaTypeResolver {
    pub fn new(namespace: &str) -> Self {
        let mut bases = HashMap::new();
        bases.insert(ANY_TYPE.to_string(), None);
        Self {
            namespace: namespace.to_string(),
            bases,
            open: false,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Registers `name` with the given base, which defaults to `Any`.
    pub fn register_type(&mut self, name: &str, base: Option<&str>) {
        self.bases.insert(
            name.to_string(),
            Some(base.unwrap_or(ANY_TYPE).to_string()),
        );
    }

    pub fn with_type(mut self, name: &str, base: Option<&str>) -> Self {
        self.register_type(name, base);
        self
    }

    /// Resolve unknown identifiers as model types deriving from `Any` instead of
    /// rejecting them. Useful for schemaless trees such as plain JSON.
    pub fn open(mut self) -> Self {
        self.open = true;
        self
    }

    fn model_type(&self, name: &str) -> Option<TypeInfoResult> {
        (self.open || self.bases.contains_key(name))
            .then(|| TypeInfoResult::new(&self.namespace, name))
    }

    fn system_type(name: &str) -> Option<TypeInfoResult> {
        is_system_type(name).then(|| TypeInfoResult::system(name))
    }
}

impl TypeResolver for SchemaTypeResolver {
    fn resolve(&self, identifier: &str) -> Option<TypeInfoResult> {
        match identifier.split_once('.') {
            Some((namespace, name)) if namespace == SYSTEM_NAMESPACE => Self::system_type(name),
            Some((namespace, name)) if namespace == self.namespace => self.model_type(name),
            Some(_) => None,
            None if self.bases.contains_key(identifier) => self.model_type(identifier),
            None => Self::system_type(identifier).or_else(|| self.model_type(identifier)),
        }
    }

    fn base_type(&self, type_info: &TypeInfoResult) -> Option<TypeInfoResult> {
        if type_info.name == ANY_TYPE {
            return None;
        }
        if type_info.is_system() {
            return Some(TypeInfoResult::system(ANY_TYPE));
        }
        if type_info.namespace != self.namespace {
            return None;
        }
        match self.bases.get(&type_info.name) {
            Some(Some(base)) => Some(TypeInfoResult::new(&self.namespace, base)),
            Some(None) => None,
            None if self.open => Some(TypeInfoResult::new(&self.namespace, ANY_TYPE)),
            None => None,
        }
    }
}
