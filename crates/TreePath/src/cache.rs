//! # Expression Cache
//!
//! Bounded, thread-safe caches shared by every evaluation:
//!
//! - compiled expressions keyed by their full source text
//! - singleton collections for literal tokens, keyed by the literal's source text
//! - singleton collections for identifier tokens, keyed by the identifier's source text
//!
//! The workload these serve is the same few expressions evaluated against many
//! records, often from several threads at once. Each cache is an LRU map behind
//! its own `parking_lot` mutex. Parsing happens outside the lock, so two threads
//! missing on the same text may both parse it; the results are identical.

use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tracing::debug;
use treepath_support::{Collection, Value};

use crate::error::{PathError, PathResult};
use crate::parser::{self, Expression};

pub const DEFAULT_EXPRESSION_CACHE_CAPACITY: usize = 512;
pub const DEFAULT_IDENTIFIER_CACHE_CAPACITY: usize = 2048;
pub const DEFAULT_LITERAL_CACHE_CAPACITY: usize = 128;

static GLOBAL_CACHE: Lazy<Arc<ExpressionCache>> = Lazy::new(|| Arc::new(ExpressionCache::new()));

/// LRU map holding at most `capacity` entries. A capacity of zero keeps one.
pub(crate) fn bounded<K: Hash + Eq, V>(capacity: usize) -> LruCache<K, V> {
    LruCache::new(NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN))
}

/// Capacities of the three caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    pub expression_capacity: usize,
    pub identifier_capacity: usize,
    pub literal_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            expression_capacity: DEFAULT_EXPRESSION_CACHE_CAPACITY,
            identifier_capacity: DEFAULT_IDENTIFIER_CACHE_CAPACITY,
            literal_capacity: DEFAULT_LITERAL_CACHE_CAPACITY,
        }
    }
}

#[derive(Debug)]
pub struct ExpressionCache {
    expressions: Mutex<LruCache<String, Arc<Expression>>>,
    identifiers: Mutex<LruCache<String, Collection>>,
    literals: Mutex<LruCache<String, Collection>>,
}

impl Default for ExpressionCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ExpressionCache {
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    pub fn with_config(config: CacheConfig) -> Self {
        Self {
            expressions: Mutex::new(bounded(config.expression_capacity)),
            identifiers: Mutex::new(bounded(config.identifier_capacity)),
            literals: Mutex::new(bounded(config.literal_capacity)),
        }
    }

    /// Process-wide cache used by engines that do not bring their own.
    pub fn global() -> Arc<ExpressionCache> {
        Arc::clone(&GLOBAL_CACHE)
    }

    /// Returns the compiled form of `text`, parsing it on a cache miss.
    ///
    /// Parse failures are not cached.
    pub fn compile(&self, text: &str) -> PathResult<Arc<Expression>> {
        if let Some(expression) = self.expressions.lock().get(text) {
            return Ok(Arc::clone(expression));
        }

        debug!(expression = text, "compiling expression");
        let expression = parser::parse(text).map_err(|message| PathError::ParseError {
            expression: text.to_string(),
            message,
        })?;
        let expression = Arc::new(expression);
        self.expressions
            .lock()
            .put(text.to_string(), Arc::clone(&expression));
        Ok(expression)
    }

    /// Singleton string collection holding the name of an identifier token.
    /// Surrounding back-ticks are removed from delimited identifiers.
    pub fn identifier(&self, source: &str) -> Collection {
        let mut identifiers = self.identifiers.lock();
        if let Some(collection) = identifiers.get(source) {
            return collection.clone();
        }
        let name = source
            .strip_prefix('`')
            .and_then(|s| s.strip_suffix('`'))
            .unwrap_or(source);
        let collection = Collection::singleton(Value::String(name.to_string()));
        identifiers.put(source.to_string(), collection.clone());
        collection
    }

    /// Collection for a literal token, built by `build` on a cache miss.
    pub fn literal<F>(&self, source: &str, build: F) -> Collection
    where
        F: FnOnce() -> Collection,
    {
        let mut literals = self.literals.lock();
        if let Some(collection) = literals.get(source) {
            return collection.clone();
        }
        let collection = build();
        literals.put(source.to_string(), collection.clone());
        collection
    }

    pub fn expression_count(&self) -> usize {
        self.expressions.lock().len()
    }

    pub fn identifier_count(&self) -> usize {
        self.identifiers.lock().len()
    }

    pub fn literal_count(&self) -> usize {
        self.literals.lock().len()
    }

    pub fn is_compiled(&self, text: &str) -> bool {
        self.expressions.lock().contains(text)
    }

    pub fn clear(&self) {
        self.expressions.lock().clear();
        self.identifiers.lock().clear();
        self.literals.lock().clear();
    }
}
