//! Path expression evaluation engine.
//!
//! [`PathEngine`] ties the collaborators together: the expression cache, the
//! [`TypeResolver`] and the [`FunctionRegistry`]. The engine itself holds no
//! per-evaluation state; each call builds a fresh [`Evaluator`], so one engine can
//! be shared by many threads.
//!
//! ## What an evaluation does
//! - Compiles the expression text through the cache.
//! - Sets `%context` to the initial collection, and `%now`, `%today` and
//!   `%timeOfDay` to the current local time.
//! - Walks the compiled tree with the initial collection as `$this`.
//! - Wraps any hard error together with the expression text.

use std::sync::Arc;

use chrono::Local;
use once_cell::sync::Lazy;
use rayon::prelude::*;
use tracing::debug;
use treepath_support::{
    Collection, Node, PrecisionDate, PrecisionDateTime, PrecisionTime, TemporalPrecision, Value,
};

use crate::cache::{
    CacheConfig, DEFAULT_EXPRESSION_CACHE_CAPACITY, DEFAULT_IDENTIFIER_CACHE_CAPACITY,
    DEFAULT_LITERAL_CACHE_CAPACITY, ExpressionCache,
};
use crate::context::{CONTEXT_CONSTANT, EvaluationContext};
use crate::error::{PathError, PathResult};
use crate::evaluator::Evaluator;
use crate::parser::Expression;
use crate::registry::{FunctionRegistry, StandardFunctionRegistry};
use crate::type_resolver::{SchemaTypeResolver, TypeResolver};

static STANDARD_REGISTRY: Lazy<Arc<StandardFunctionRegistry>> =
    Lazy::new(|| Arc::new(StandardFunctionRegistry::new()));

/// Cache sizing for an engine that owns its cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    pub expression_cache_capacity: usize,
    pub identifier_cache_capacity: usize,
    pub literal_cache_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            expression_cache_capacity: DEFAULT_EXPRESSION_CACHE_CAPACITY,
            identifier_cache_capacity: DEFAULT_IDENTIFIER_CACHE_CAPACITY,
            literal_cache_capacity: DEFAULT_LITERAL_CACHE_CAPACITY,
        }
    }
}

impl EngineConfig {
    pub fn with_expression_cache_capacity(mut self, capacity: usize) -> Self {
        self.expression_cache_capacity = capacity;
        self
    }

    pub fn with_identifier_cache_capacity(mut self, capacity: usize) -> Self {
        self.identifier_cache_capacity = capacity;
        self
    }

    pub fn with_literal_cache_capacity(mut self, capacity: usize) -> Self {
        self.literal_cache_capacity = capacity;
        self
    }

    fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            expression_capacity: self.expression_cache_capacity,
            identifier_capacity: self.identifier_cache_capacity,
            literal_capacity: self.literal_cache_capacity,
        }
    }
}

/// ```rust
/// use treepath::{EvaluationContext, PathEngine};
/// use treepath_support::Value;
///
/// let engine = PathEngine::new();
/// let mut context = EvaluationContext::new_empty();
/// context.set_external_constant("limit", 10i64);
/// let result = engine.evaluate(&mut context, "%limit * 2").unwrap();
/// assert_eq!(result.singleton_value(), Some(Value::Integer(20)));
/// ```
#[derive(Clone)]
pub struct PathEngine {
    cache: Arc<ExpressionCache>,
    type_resolver: Arc<dyn TypeResolver>,
    registry: Arc<dyn FunctionRegistry>,
}

impl Default for PathEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PathEngine {
    /// An engine backed by the process-wide expression cache.
    pub fn new() -> Self {
        Self::with_cache(ExpressionCache::global())
    }

    /// An engine with a private cache sized by `config`.
    pub fn with_config(config: EngineConfig) -> Self {
        Self::with_cache(Arc::new(ExpressionCache::with_config(config.cache_config())))
    }

    fn with_cache(cache: Arc<ExpressionCache>) -> Self {
        let registry: Arc<dyn FunctionRegistry> = STANDARD_REGISTRY.clone();
        Self {
            cache,
            type_resolver: Arc::new(SchemaTypeResolver::default()),
            registry,
        }
    }

    pub fn with_type_resolver(mut self, type_resolver: Arc<dyn TypeResolver>) -> Self {
        self.type_resolver = type_resolver;
        self
    }

    pub fn with_function_registry(mut self, registry: Arc<dyn FunctionRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn cache(&self) -> &Arc<ExpressionCache> {
        &self.cache
    }

    pub fn compile(&self, expression: &str) -> PathResult<Arc<Expression>> {
        self.cache.compile(expression)
    }

    /// Evaluates against the context's tree root, or against nothing when the
    /// context has no tree.
    pub fn evaluate(
        &self,
        context: &mut EvaluationContext,
        expression: &str,
    ) -> PathResult<Collection> {
        let input = context
            .tree_root()
            .cloned()
            .map(Collection::singleton)
            .unwrap_or_default();
        self.evaluate_collection(context, expression, input)
    }

    pub fn evaluate_node(
        &self,
        context: &mut EvaluationContext,
        expression: &str,
        node: Node,
    ) -> PathResult<Collection> {
        self.evaluate_collection(context, expression, Collection::singleton(node))
    }

    pub fn evaluate_collection(
        &self,
        context: &mut EvaluationContext,
        expression: &str,
        input: Collection,
    ) -> PathResult<Collection> {
        let compiled = self.compile(expression)?;
        self.evaluate_compiled(context, expression, &compiled, input)
    }

    /// Evaluates against `root` in a fresh context.
    pub fn evaluate_tree(&self, root: Node, expression: &str) -> PathResult<Collection> {
        let mut context = EvaluationContext::new(root);
        self.evaluate(&mut context, expression)
    }

    /// Compiles `expression` once and evaluates it against every root in
    /// parallel, each in its own context. Results keep the order of `roots`.
    pub fn evaluate_batch(
        &self,
        expression: &str,
        roots: &[Node],
    ) -> PathResult<Vec<PathResult<Collection>>> {
        let compiled = self.compile(expression)?;
        debug!(expression, records = roots.len(), "evaluating batch");
        Ok(roots
            .par_iter()
            .map(|root| {
                let mut context = EvaluationContext::new(root.clone());
                let input = Collection::singleton(root.clone());
                self.evaluate_compiled(&mut context, expression, &compiled, input)
            })
            .collect())
    }

    fn evaluate_compiled(
        &self,
        context: &mut EvaluationContext,
        text: &str,
        expression: &Expression,
        input: Collection,
    ) -> PathResult<Collection> {
        set_evaluation_constants(context, &input);
        let mut evaluator = Evaluator::new(
            context,
            self.type_resolver.as_ref(),
            self.registry.as_ref(),
            &self.cache,
        );
        evaluator
            .evaluate(expression, input)
            .map_err(|source| PathError::EvaluationError {
                expression: text.to_string(),
                source,
            })
    }
}

fn set_evaluation_constants(context: &mut EvaluationContext, input: &Collection) {
    let now = Local::now();
    let offset_minutes = now.offset().local_minus_utc() / 60;
    let naive = now.naive_local();

    context.set_external_constant(CONTEXT_CONSTANT, input.clone());
    context.set_external_constant(
        "now",
        Value::DateTime(PrecisionDateTime::from_naive(
            naive,
            TemporalPrecision::Millisecond,
            Some(offset_minutes),
        )),
    );
    context.set_external_constant(
        "today",
        Value::Date(PrecisionDate::from_naive(naive.date(), TemporalPrecision::Day)),
    );
    context.set_external_constant(
        "timeOfDay",
        Value::Time(PrecisionTime::from_naive(
            naive.time(),
            TemporalPrecision::Millisecond,
        )),
    );
}
