//! # Evaluation Context
//!
//! Holds the data tree an expression is evaluated against, the table of named
//! external constants (`%name`), the log of `trace()` outputs, and any
//! registered evaluation listeners.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use treepath_support::{Collection, IntoCollection, Node};

use crate::parser::Expression;

/// Constant holding the collection an evaluation started from.
pub const CONTEXT_CONSTANT: &str = "context";
/// Constants seeded with the tree root by [`EvaluationContext::new`].
pub const RESOURCE_CONSTANT: &str = "resource";
pub const ROOT_RESOURCE_CONSTANT: &str = "rootResource";

const UCUM_SYSTEM: &str = "http://unitsofmeasure.org";
const LOINC_SYSTEM: &str = "http://loinc.org";
const SNOMED_SYSTEM: &str = "http://snomed.info/sct";
const EXTENSION_PREFIX: &str = "http://hl7.org/fhir/StructureDefinition/";
const VALUE_SET_PREFIX: &str = "http://hl7.org/fhir/ValueSet/";

/// Hooks invoked around the evaluation of every expression node.
pub trait EvaluationListener: Send + Sync {
    fn before_evaluation(&self, _expression: &Expression, _input: &Collection) {}

    fn after_evaluation(&self, _expression: &Expression, _result: &Collection) {}
}

pub struct EvaluationContext {
    tree_root: Option<Node>,
    external_constants: HashMap<String, Collection>,
    listeners: Vec<Arc<dyn EvaluationListener>>,
    /// `(name, collection)` pairs recorded by `trace()`, in call order.
    pub trace_outputs: Arc<Mutex<Vec<(String, Collection)>>>,
}

impl EvaluationContext {
    /// Creates a context over the tree rooted at `root`.
    pub fn new(root: Node) -> Self {
        Self::with_root(Some(root))
    }

    /// Creates a context with no data tree.
    pub fn new_empty() -> Self {
        Self::with_root(None)
    }

    fn with_root(tree_root: Option<Node>) -> Self {
        let mut external_constants = HashMap::new();
        if let Some(root) = &tree_root {
            for name in [RESOURCE_CONSTANT, ROOT_RESOURCE_CONSTANT] {
                external_constants.insert(name.to_string(), Collection::singleton(root.clone()));
            }
        }
        Self {
            tree_root,
            external_constants,
            listeners: Vec::new(),
            trace_outputs: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn tree_root(&self) -> Option<&Node> {
        self.tree_root.as_ref()
    }

    /// Looks up `%name`. Unknown names yield the empty collection.
    ///
    /// `%ucum`, `%loinc` and `%sct` are fixed and cannot be overridden. After the
    /// explicitly set constants come `%ext-<name>` (extension definitions) and
    /// `%vs-<name>` (value sets).
    pub fn get_external_constant(&self, name: &str) -> Collection {
        if let Some(system) = reserved_system(name) {
            return system.to_collection();
        }
        if let Some(value) = self.external_constants.get(name) {
            return value.clone();
        }
        if let Some(extension) = name.strip_prefix("ext-") {
            format!("{}{}", EXTENSION_PREFIX, extension).to_collection()
        } else if let Some(value_set) = name.strip_prefix("vs-") {
            format!("{}{}", VALUE_SET_PREFIX, value_set).to_collection()
        } else {
            Collection::empty()
        }
    }

    pub fn set_external_constant(&mut self, name: &str, value: impl IntoCollection) {
        self.external_constants
            .insert(name.to_string(), value.to_collection());
    }

    pub fn has_external_constant(&self, name: &str) -> bool {
        reserved_system(name).is_some() || self.external_constants.contains_key(name)
    }

    pub fn unset_external_constant(&mut self, name: &str) -> Option<Collection> {
        self.external_constants.remove(name)
    }

    pub fn add_listener(&mut self, listener: Arc<dyn EvaluationListener>) {
        self.listeners.push(listener);
    }

    pub fn listeners(&self) -> &[Arc<dyn EvaluationListener>] {
        &self.listeners
    }

    pub(crate) fn record_trace(&self, name: &str, collection: Collection) {
        self.trace_outputs.lock().push((name.to_string(), collection));
    }

    pub fn get_trace_outputs(&self) -> Vec<(String, Collection)> {
        self.trace_outputs.lock().clone()
    }

    pub fn clear_trace_outputs(&self) {
        self.trace_outputs.lock().clear();
    }
}

fn reserved_system(name: &str) -> Option<&'static str> {
    match name {
        "ucum" => Some(UCUM_SYSTEM),
        "loinc" => Some(LOINC_SYSTEM),
        "sct" => Some(SNOMED_SYSTEM),
        _ => None,
    }
}

impl fmt::Debug for EvaluationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvaluationContext")
            .field("tree_root", &self.tree_root)
            .field("external_constants", &self.external_constants)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
