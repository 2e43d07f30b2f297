//! # Nodes and Collections
//!
//! Every sub-expression evaluates to a [`Collection`]: an ordered, immutable
//! sequence of [`Node`]s. A node is either a bare [`Value`] produced by the
//! expression itself (a literal, an arithmetic result) or a position inside the
//! host data tree, reached through the [`TreeNode`] trait.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::evaluation_error::EvaluationError;
use crate::type_info::TypeInfoResult;
use crate::value::Value;

/// The contract a host data tree implements so expressions can navigate it.
///
/// Children are returned in document order. Repeating fields appear as several
/// children sharing one name. A node that represents a primitive leaf also
/// reports its [`Value`].
pub trait TreeNode: fmt::Debug + Send + Sync {
    fn name(&self) -> &str;

    fn type_info(&self) -> TypeInfoResult;

    fn children(&self) -> Vec<Node>;

    fn value(&self) -> Option<Value> {
        None
    }
}

/// A single element of a result collection.
#[derive(Debug, Clone)]
pub enum Node {
    Value(Value),
    Tree(Arc<dyn TreeNode>),
}

impl Node {
    /// Wraps a host tree node.
    pub fn tree<T: TreeNode + 'static>(node: T) -> Node {
        Node::Tree(Arc::new(node))
    }

    /// Field name of a tree node. Bare values have none.
    pub fn name(&self) -> Option<&str> {
        match self {
            Node::Value(_) => None,
            Node::Tree(tree) => Some(tree.name()),
        }
    }

    pub fn type_info(&self) -> TypeInfoResult {
        match self {
            Node::Value(value) => value.type_info(),
            Node::Tree(tree) => tree.type_info(),
        }
    }

    /// The primitive value carried by this node, if any.
    pub fn value(&self) -> Option<Cow<'_, Value>> {
        match self {
            Node::Value(value) => Some(Cow::Borrowed(value)),
            Node::Tree(tree) => tree.value().map(Cow::Owned),
        }
    }

    pub fn has_value(&self) -> bool {
        self.value().is_some()
    }

    pub fn children(&self) -> Vec<Node> {
        match self {
            Node::Value(_) => Vec::new(),
            Node::Tree(tree) => tree.children(),
        }
    }

    /// All nodes below this one, depth first, in document order.
    pub fn descendants(&self) -> Vec<Node> {
        let mut result = Vec::new();
        let mut pending: Vec<Node> = self.children().into_iter().rev().collect();
        while let Some(node) = pending.pop() {
            pending.extend(node.children().into_iter().rev());
            result.push(node);
        }
        result
    }

    pub fn is_comparable_to(&self, other: &Node) -> bool {
        match (self.value(), other.value()) {
            (Some(l), Some(r)) => l.is_comparable_to(&r),
            _ => false,
        }
    }

    /// Orders two comparable nodes by their values.
    pub fn compare_to(&self, other: &Node) -> Result<Ordering, EvaluationError> {
        match (self.value(), other.value()) {
            (Some(l), Some(r)) => l.compare_to(&r),
            _ => Err(EvaluationError::InvalidOperation(format!(
                "Cannot compare {} with {}",
                self.type_info(),
                other.type_info()
            ))),
        }
    }

    /// Structural equality.
    ///
    /// Nodes carrying values are equal when their values are. Tree nodes without a
    /// value are equal when name, type and children all match.
    pub fn equals(&self, other: &Node) -> bool {
        if let (Node::Tree(l), Node::Tree(r)) = (self, other) {
            if Arc::ptr_eq(l, r) {
                return true;
            }
        }
        match (self.value(), other.value()) {
            (Some(l), Some(r)) => l.equals(&r),
            (None, None) => {
                if self.name() != other.name() || self.type_info() != other.type_info() {
                    return false;
                }
                let left = self.children();
                let right = other.children();
                left.len() == right.len() && left.iter().zip(&right).all(|(l, r)| l.equals(r))
            }
            _ => false,
        }
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl From<Value> for Node {
    fn from(value: Value) -> Self {
        Node::Value(value)
    }
}

/// Ordered, immutable sequence of nodes. Cloning is cheap.
///
/// The empty collection represents "unknown" and is distinct from `false`.
#[derive(Debug, Clone, Default)]
pub struct Collection {
    items: Arc<[Node]>,
}

impl Collection {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn singleton(node: impl Into<Node>) -> Self {
        Self {
            items: Arc::from(vec![node.into()]),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_singleton(&self) -> bool {
        self.items.len() == 1
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Node> {
        self.items.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Node> {
        self.items.get(index)
    }

    pub fn as_slice(&self) -> &[Node] {
        &self.items
    }

    /// The only element, when there is exactly one.
    pub fn singleton_node(&self) -> Option<&Node> {
        match &*self.items {
            [node] => Some(node),
            _ => None,
        }
    }

    /// The value of the only element, when there is exactly one and it has a value.
    pub fn singleton_value(&self) -> Option<Value> {
        self.singleton_node()
            .and_then(|node| node.value().map(Cow::into_owned))
    }

    /// `Some` when the collection is a single boolean.
    pub fn as_boolean(&self) -> Option<bool> {
        self.singleton_node()
            .and_then(|node| node.value())
            .and_then(|value| value.as_boolean())
    }

    pub fn contains_node(&self, node: &Node) -> bool {
        self.items.iter().any(|item| item.equals(node))
    }

    /// Whether every element of `other` occurs in this collection.
    pub fn contains_all(&self, other: &Collection) -> bool {
        other.iter().all(|node| self.contains_node(node))
    }

    /// Elements of both collections with duplicates removed, in first-seen order.
    pub fn union(&self, other: &Collection) -> Collection {
        let mut items: Vec<Node> = Vec::with_capacity(self.len() + other.len());
        for node in self.iter().chain(other.iter()) {
            if !items.iter().any(|seen| seen.equals(node)) {
                items.push(node.clone());
            }
        }
        items.into()
    }

    /// Elements with duplicates removed, in first-seen order.
    pub fn distinct(&self) -> Collection {
        self.union(&Collection::empty())
    }

    pub fn to_vec(&self) -> Vec<Node> {
        self.items.to_vec()
    }
}

impl PartialEq for Collection {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other.iter()).all(|(l, r)| l.equals(r))
    }
}

impl From<Vec<Node>> for Collection {
    fn from(items: Vec<Node>) -> Self {
        Self {
            items: Arc::from(items),
        }
    }
}

impl FromIterator<Node> for Collection {
    fn from_iter<I: IntoIterator<Item = Node>>(iter: I) -> Self {
        iter.into_iter().collect::<Vec<_>>().into()
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = &'a Node;
    type IntoIter = std::slice::Iter<'a, Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, node) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match (node.value(), node.name()) {
                (Some(value), _) => write!(f, "{}", value)?,
                (None, Some(name)) => write!(f, "<{}: {}>", name, node.type_info())?,
                (None, None) => write!(f, "<{}>", node.type_info())?,
            }
        }
        write!(f, "]")
    }
}
