//! # Expression Evaluator
//!
//! A tree-walking interpreter over the parsed [`Expression`]. An [`Evaluator`] owns
//! the stack of "current" collections (the top is `$this`) and is created afresh for
//! every top-level evaluation, so nothing here is shared between threads.
//!
//! ## Empty propagation
//!
//! The empty collection stands for "unknown". Operators that have no defined
//! result for their operands evaluate to empty rather than failing: mismatched
//! arithmetic kinds, division by zero, overflow, an out-of-range index. Hard errors
//! ([`EvaluationError`]) are reserved for semantic violations such as an unknown
//! function or an unresolvable type.

use std::cmp::Ordering;

use rust_decimal::Decimal;
use tracing::trace;
use treepath_support::{
    CalendarUnit, Collection, EvaluationError, IntoCollection, Node, TypeInfoResult, Value, ucum,
};

use crate::cache::ExpressionCache;
use crate::context::EvaluationContext;
use crate::control_functions::ControlFunction;
use crate::parser::{
    AdditiveOp, EqualityOp, Expression, Identifier, InequalityOp, Invocation, Literal,
    LiteralTerm, MembershipOp, MultiplicativeOp, OrOp, PolarityOp, Term, TypeOp,
};
use crate::registry::FunctionRegistry;
use crate::type_resolver::TypeResolver;

pub(crate) fn arity_error(arity: usize, function: &str) -> EvaluationError {
    EvaluationError::InvalidArity(format!(
        "Unexpected number of arguments: {} for function: '{}'",
        arity, function
    ))
}

pub(crate) fn singleton_error(len: usize) -> EvaluationError {
    EvaluationError::SingletonEvaluationError(format!(
        "Input collection has {} items, but only 1 is allowed",
        len
    ))
}

struct Frame {
    input: Collection,
    index: Option<usize>,
}

pub struct Evaluator<'a> {
    context: &'a EvaluationContext,
    type_resolver: &'a dyn TypeResolver,
    registry: &'a dyn FunctionRegistry,
    cache: &'a ExpressionCache,
    stack: Vec<Frame>,
}

impl<'a> Evaluator<'a> {
    pub fn new(
        context: &'a EvaluationContext,
        type_resolver: &'a dyn TypeResolver,
        registry: &'a dyn FunctionRegistry,
        cache: &'a ExpressionCache,
    ) -> Self {
        Self {
            context,
            type_resolver,
            registry,
            cache,
            stack: Vec::new(),
        }
    }

    /// Evaluates `expression` with `input` as the initial `$this`.
    pub fn evaluate(
        &mut self,
        expression: &Expression,
        input: Collection,
    ) -> Result<Collection, EvaluationError> {
        self.with_frame(input, None, |evaluator| evaluator.visit(expression))
    }

    pub fn context(&self) -> &'a EvaluationContext {
        self.context
    }

    pub(crate) fn type_resolver(&self) -> &'a dyn TypeResolver {
        self.type_resolver
    }

    /// The current `$this` collection.
    pub(crate) fn this(&self) -> Collection {
        self.stack
            .last()
            .map(|frame| frame.input.clone())
            .unwrap_or_default()
    }

    /// `$index` of the innermost iteration in progress.
    fn current_index(&self) -> Option<usize> {
        self.stack.iter().rev().find_map(|frame| frame.index)
    }

    fn with_frame<T>(
        &mut self,
        input: Collection,
        index: Option<usize>,
        f: impl FnOnce(&mut Self) -> T,
    ) -> T {
        self.stack.push(Frame { input, index });
        let result = f(self);
        self.stack.pop();
        result
    }

    /// Evaluates `expression` with the single element `item` as `$this` and
    /// `index` as `$index`.
    pub(crate) fn evaluate_for_item(
        &mut self,
        expression: &Expression,
        item: &Node,
        index: usize,
    ) -> Result<Collection, EvaluationError> {
        self.with_frame(Collection::singleton(item.clone()), Some(index), |evaluator| {
            evaluator.visit(expression)
        })
    }

    pub(crate) fn visit(&mut self, expression: &Expression) -> Result<Collection, EvaluationError> {
        let context = self.context;
        let listeners = context.listeners();
        if !listeners.is_empty() {
            let input = self.this();
            for listener in listeners {
                listener.before_evaluation(expression, &input);
            }
        }

        let result = self.dispatch(expression)?;

        for listener in listeners {
            listener.after_evaluation(expression, &result);
        }
        Ok(result)
    }

    fn dispatch(&mut self, expression: &Expression) -> Result<Collection, EvaluationError> {
        match expression {
            Expression::Term(term) => self.visit_term(term),
            Expression::Invocation(base, invocation) => {
                let input = self.visit(base)?;
                self.with_frame(input, None, |evaluator| evaluator.invoke(invocation))
            }
            Expression::Indexer(base, index) => self.visit_indexer(base, index),
            Expression::Polarity(op, operand) => {
                let operand = self.visit(operand)?;
                Ok(polarity(*op, &operand))
            }
            Expression::Multiplicative(left, op, right) => {
                let left = scalar(&self.visit(left)?)?;
                let right = scalar(&self.visit(right)?)?;
                let (Some(left), Some(right)) = (left, right) else {
                    return Ok(Collection::empty());
                };
                Ok(multiplicative(*op, left, right))
            }
            Expression::Additive(left, op, right) => {
                let left = scalar(&self.visit(left)?)?;
                let right = scalar(&self.visit(right)?)?;
                let (Some(left), Some(right)) = (left, right) else {
                    return Ok(Collection::empty());
                };
                Ok(additive(*op, left, right))
            }
            Expression::Type(operand, op, specifier) => {
                let input = self.visit(operand)?;
                let target = self.resolve_type(&specifier.qualified_name())?;
                match op {
                    TypeOp::Is => self.is_type(&input, &target),
                    TypeOp::As => Ok(self.filter_by_type(&input, &target)),
                }
            }
            Expression::Union(left, right) => {
                let left = self.visit(left)?;
                let right = self.visit(right)?;
                Ok(left.union(&right))
            }
            Expression::Inequality(left, op, right) => {
                let left = self.visit(left)?;
                let right = self.visit(right)?;
                Ok(inequality(*op, &left, &right)?.to_collection())
            }
            Expression::Equality(left, op, right) => {
                let left = self.visit(left)?;
                let right = self.visit(right)?;
                Ok(equality(*op, &left, &right))
            }
            Expression::Membership(left, op, right) => {
                let left = self.visit(left)?;
                let right = self.visit(right)?;
                let contained = match op {
                    MembershipOp::In => right.contains_all(&left),
                    MembershipOp::Contains => left.contains_all(&right),
                };
                Ok(contained.to_collection())
            }
            Expression::And(left, right) => self.visit_and(left, right),
            Expression::Or(left, OrOp::Or, right) => self.visit_or(left, right),
            Expression::Or(left, OrOp::Xor, right) => {
                let left = self.visit(left)?.as_boolean();
                let right = self.visit(right)?.as_boolean();
                Ok(match (left, right) {
                    (Some(l), Some(r)) => (l != r).to_collection(),
                    _ => Collection::empty(),
                })
            }
            Expression::Implies(left, right) => {
                let left = self.visit(left)?;
                let right = self.visit(right)?.as_boolean();
                Ok(match (left.as_boolean(), right) {
                    (Some(l), Some(r)) => (!l || r).to_collection(),
                    (None, Some(true)) if left.is_empty() => true.to_collection(),
                    _ => Collection::empty(),
                })
            }
        }
    }

    fn visit_term(&mut self, term: &Term) -> Result<Collection, EvaluationError> {
        match term {
            Term::Invocation(invocation) => self.invoke(invocation),
            Term::Literal(literal) => Ok(self.literal(literal)),
            Term::ExternalConstant(name) => Ok(self.context.get_external_constant(name)),
            Term::Parenthesized(inner) => self.visit(inner),
        }
    }

    fn literal(&self, literal: &LiteralTerm) -> Collection {
        if matches!(literal.literal, Literal::Null) {
            return Collection::empty();
        }
        self.cache.literal(&literal.source, || {
            literal.literal.to_value().to_collection()
        })
    }

    /// Applies `invocation` to the current `$this`.
    fn invoke(&mut self, invocation: &Invocation) -> Result<Collection, EvaluationError> {
        match invocation {
            Invocation::Member(identifier) => Ok(self.navigate(identifier)),
            Invocation::Function(identifier, arguments) => {
                self.call_function(&identifier.name, arguments)
            }
            Invocation::This => Ok(self.this()),
            Invocation::Index => Ok(self
                .current_index()
                .and_then(|index| i64::try_from(index).ok())
                .to_collection()),
            Invocation::Total => Ok(Collection::empty()),
        }
    }

    /// Member navigation. A singleton whose own type, or one of its ancestors, is
    /// named by the segment is returned unchanged (`Order.item` on an `Order`).
    fn navigate(&self, identifier: &Identifier) -> Collection {
        let name = self.identifier_name(identifier);
        let input = self.this();
        if let Some(node) = input.singleton_node() {
            if self
                .type_resolver
                .ancestor_names(&node.type_info())
                .contains(&name)
            {
                return input;
            }
        }
        input
            .iter()
            .flat_map(|node| {
                node.children()
                    .into_iter()
                    .filter(|child| child.name() == Some(name.as_str()))
            })
            .collect()
    }

    fn visit_indexer(
        &mut self,
        base: &Expression,
        index: &Expression,
    ) -> Result<Collection, EvaluationError> {
        let items = self.visit(base)?;
        let index = self.visit(index)?;
        let position = match index.len() {
            0 => return Ok(Collection::empty()),
            1 => match index.singleton_value() {
                Some(Value::Integer(i)) => i,
                other => {
                    return Err(EvaluationError::InvalidIndex(format!(
                        "Index must be an integer, found {}",
                        other.as_ref().map_or("a tree node", Value::type_name)
                    )));
                }
            },
            n => return Err(singleton_error(n)),
        };
        Ok(usize::try_from(position)
            .ok()
            .and_then(|position| items.get(position))
            .cloned()
            .map(Collection::singleton)
            .unwrap_or_default())
    }

    fn visit_and(
        &mut self,
        left: &Expression,
        right: &Expression,
    ) -> Result<Collection, EvaluationError> {
        let left = self.visit(left)?.as_boolean();
        if left == Some(false) {
            return Ok(false.to_collection());
        }
        let right = self.visit(right)?.as_boolean();
        if right == Some(false) {
            return Ok(false.to_collection());
        }
        Ok(match (left, right) {
            (Some(true), Some(true)) => true.to_collection(),
            _ => Collection::empty(),
        })
    }

    fn visit_or(
        &mut self,
        left: &Expression,
        right: &Expression,
    ) -> Result<Collection, EvaluationError> {
        let left = self.visit(left)?.as_boolean();
        if left == Some(true) {
            return Ok(true.to_collection());
        }
        let right = self.visit(right)?.as_boolean();
        if right == Some(true) {
            return Ok(true.to_collection());
        }
        Ok(match (left, right) {
            (Some(false), Some(false)) => false.to_collection(),
            _ => Collection::empty(),
        })
    }

    fn call_function(
        &mut self,
        name: &str,
        arguments: &[Expression],
    ) -> Result<Collection, EvaluationError> {
        trace!(function = name, arity = arguments.len(), "invoking function");
        if let Some(control) = ControlFunction::from_name(name) {
            return control.call(self, arguments);
        }

        let registry = self.registry;
        let descriptor = registry.lookup(name).ok_or_else(|| {
            EvaluationError::UnsupportedFunction(format!("Function: '{}' not found", name))
        })?;
        if !descriptor.accepts_arity(arguments.len()) {
            return Err(arity_error(arguments.len(), name));
        }
        let input = self.this();
        let evaluated = arguments
            .iter()
            .map(|argument| self.visit(argument))
            .collect::<Result<Vec<_>, _>>()?;
        descriptor.apply(self.context, &input, &evaluated)
    }

    // === Types ===

    pub(crate) fn resolve_type(&self, name: &str) -> Result<TypeInfoResult, EvaluationError> {
        self.type_resolver.resolve(name).ok_or_else(|| {
            EvaluationError::InvalidTypeSpecifier(format!(
                "Argument '{}' cannot be resolved to a valid type identifier",
                name
            ))
        })
    }

    /// Type name written as a function argument: `ofType(Item)`,
    /// `is(System.String)` or `as('Integer')`.
    pub(crate) fn type_argument_name(&self, argument: &Expression) -> Option<String> {
        match argument {
            Expression::Term(Term::Invocation(Invocation::Member(identifier))) => {
                Some(self.identifier_name(identifier))
            }
            Expression::Invocation(base, Invocation::Member(identifier)) => Some(format!(
                "{}.{}",
                self.type_argument_name(base)?,
                self.identifier_name(identifier)
            )),
            Expression::Term(Term::Literal(LiteralTerm {
                literal: Literal::String(name),
                ..
            })) => Some(name.clone()),
            _ => None,
        }
    }

    fn identifier_name(&self, identifier: &Identifier) -> String {
        match self.cache.identifier(&identifier.source).singleton_value() {
            Some(Value::String(name)) => name,
            _ => identifier.name.clone(),
        }
    }

    /// Whether the node's own type is `target` or derives from it.
    pub(crate) fn is_instance(&self, node: &Node, target: &TypeInfoResult) -> bool {
        self.type_resolver
            .is_assignable_from(target, &node.type_info())
    }

    /// Conversion check used by `as` and `ofType`. System targets are matched
    /// against the node's value, so a model leaf carrying a string is a `String`.
    fn converts_to(&self, node: &Node, target: &TypeInfoResult) -> bool {
        if target.is_system() {
            return node
                .value()
                .is_some_and(|value| self.type_resolver.is_assignable_from(target, &value.type_info()));
        }
        self.is_instance(node, target)
    }

    pub(crate) fn is_type(
        &self,
        input: &Collection,
        target: &TypeInfoResult,
    ) -> Result<Collection, EvaluationError> {
        match input.len() {
            0 => Ok(false.to_collection()),
            1 => Ok(input
                .iter()
                .any(|node| self.is_instance(node, target))
                .to_collection()),
            n => Err(singleton_error(n)),
        }
    }

    pub(crate) fn filter_by_type(&self, input: &Collection, target: &TypeInfoResult) -> Collection {
        input
            .iter()
            .filter(|node| self.converts_to(node, target))
            .cloned()
            .collect()
    }
}

// === Operators ===

/// Reduces an operand to its single value. `Some(None)` is an empty operand and
/// `None` a tree node without a value, which no arithmetic operator accepts.
fn scalar(operand: &Collection) -> Result<Option<Option<Value>>, EvaluationError> {
    match operand.len() {
        0 => Ok(Some(None)),
        1 => Ok(operand.singleton_value().map(Some)),
        n => Err(singleton_error(n)),
    }
}

fn polarity(op: PolarityOp, operand: &Collection) -> Collection {
    let negated = match (op, operand.singleton_value()) {
        (PolarityOp::Plus, Some(value)) if value.is_numeric() => Some(value),
        (PolarityOp::Minus, Some(Value::Integer(i))) => i.checked_neg().map(Value::Integer),
        (PolarityOp::Minus, Some(Value::Decimal(d))) => Some(Value::Decimal(-d)),
        _ => None,
    };
    negated.to_collection()
}

fn multiplicative(op: MultiplicativeOp, left: Option<Value>, right: Option<Value>) -> Collection {
    let (Some(left), Some(right)) = (left, right) else {
        return Collection::empty();
    };
    let result = match (op, &left, &right) {
        (MultiplicativeOp::Multiply, Value::Integer(l), Value::Integer(r)) => {
            l.checked_mul(*r).map(Value::Integer)
        }
        (MultiplicativeOp::Div, Value::Integer(l), Value::Integer(r)) => {
            l.checked_div(*r).map(Value::Integer)
        }
        (MultiplicativeOp::Mod, Value::Integer(l), Value::Integer(r)) => {
            l.checked_rem(*r).map(Value::Integer)
        }
        (op, l, r) if l.is_numeric() && r.is_numeric() => {
            decimal_multiplicative(op, l.to_decimal(), r.to_decimal())
        }
        _ => None,
    };
    result.to_collection()
}

fn decimal_multiplicative(
    op: MultiplicativeOp,
    left: Option<Decimal>,
    right: Option<Decimal>,
) -> Option<Value> {
    let (left, right) = (left?, right?);
    match op {
        MultiplicativeOp::Multiply => left.checked_mul(right).map(Value::Decimal),
        MultiplicativeOp::Divide => left.checked_div(right).map(|d| Value::Decimal(d.normalize())),
        MultiplicativeOp::Div => {
            let quotient = left.checked_div(right)?.trunc();
            i64::try_from(quotient).ok().map(Value::Integer)
        }
        MultiplicativeOp::Mod => left.checked_rem(right).map(Value::Decimal),
    }
}

fn additive(op: AdditiveOp, left: Option<Value>, right: Option<Value>) -> Collection {
    let result = match (op, left, right) {
        (AdditiveOp::Concatenate, left, right) => concatenate(left, right),
        (AdditiveOp::Add, Some(Value::String(l)), Some(Value::String(r))) => {
            Some(Value::String(l + &r))
        }
        (op, Some(Value::Integer(l)), Some(Value::Integer(r))) => {
            let sum = if op == AdditiveOp::Subtract {
                l.checked_sub(r)
            } else {
                l.checked_add(r)
            };
            sum.map(Value::Integer)
        }
        (op, Some(l), Some(r)) if l.is_numeric() && r.is_numeric() => l
            .to_decimal()
            .zip(r.to_decimal())
            .and_then(|(l, r)| {
                if op == AdditiveOp::Subtract {
                    l.checked_sub(r)
                } else {
                    l.checked_add(r)
                }
            })
            .map(Value::Decimal),
        (op, Some(Value::Quantity(lv, lu)), Some(Value::Quantity(rv, ru))) => {
            quantity_additive(op == AdditiveOp::Subtract, lv, &lu, rv, &ru)
        }
        (op, Some(temporal), Some(Value::Quantity(amount, unit))) if temporal.is_temporal() => {
            shift_temporal(&temporal, amount, &unit, op == AdditiveOp::Subtract)
        }
        (op, Some(Value::Quantity(amount, unit)), Some(temporal)) if temporal.is_temporal() => {
            shift_temporal(&temporal, amount, &unit, op == AdditiveOp::Subtract)
        }
        _ => None,
    };
    result.to_collection()
}

/// `&` treats an empty side as the empty string. Non-string operands give None.
fn concatenate(left: Option<Value>, right: Option<Value>) -> Option<Value> {
    let text = |value: Option<Value>| match value {
        None => Some(String::new()),
        Some(Value::String(s)) => Some(s),
        Some(_) => None,
    };
    Some(Value::String(text(left)? + &text(right)?))
}

fn quantity_additive(
    subtract: bool,
    left_value: Decimal,
    left_unit: &str,
    right_value: Decimal,
    right_unit: &str,
) -> Option<Value> {
    if left_unit == right_unit {
        let value = if subtract {
            left_value.checked_sub(right_value)?
        } else {
            left_value.checked_add(right_value)?
        };
        return Some(Value::Quantity(value, left_unit.to_string()));
    }
    ucum::add_quantities(left_value, left_unit, right_value, right_unit, subtract)
        .map(|(value, unit)| Value::Quantity(value, unit))
}

/// Calendar arithmetic. Fractional seconds are applied as milliseconds, other
/// fractional amounts are truncated.
fn shift_temporal(temporal: &Value, amount: Decimal, unit: &str, subtract: bool) -> Option<Value> {
    let mut unit = CalendarUnit::parse(unit)?;
    let mut amount = amount;
    if unit == CalendarUnit::Second && amount.fract() != Decimal::ZERO {
        unit = CalendarUnit::Millisecond;
        amount = amount.checked_mul(Decimal::from(1000))?;
    }
    let mut whole = i64::try_from(amount.trunc()).ok()?;
    if subtract {
        whole = whole.checked_neg()?;
    }
    match temporal {
        Value::Date(d) => d.add_calendar(whole, unit).map(Value::Date),
        Value::DateTime(dt) => dt.add_calendar(whole, unit).map(Value::DateTime),
        Value::Time(t) => t.add_calendar(whole, unit).map(Value::Time),
        _ => None,
    }
}

/// `false` unless both sides are single comparable nodes.
fn inequality(
    op: InequalityOp,
    left: &Collection,
    right: &Collection,
) -> Result<bool, EvaluationError> {
    let (Some(left), Some(right)) = (left.singleton_node(), right.singleton_node()) else {
        return Ok(false);
    };
    if !left.is_comparable_to(right) {
        return Ok(false);
    }
    let ordering = left.compare_to(right)?;
    Ok(match op {
        InequalityOp::Less => ordering == Ordering::Less,
        InequalityOp::LessOrEqual => ordering != Ordering::Greater,
        InequalityOp::Greater => ordering == Ordering::Greater,
        InequalityOp::GreaterOrEqual => ordering != Ordering::Less,
    })
}

/// Order-sensitive collection equality. `~` and `!~` share the same comparison.
fn equality(op: EqualityOp, left: &Collection, right: &Collection) -> Collection {
    if left.is_empty() || right.is_empty() {
        return Collection::empty();
    }
    let equal = left == right;
    match op {
        EqualityOp::Equal | EqualityOp::Equivalent => equal,
        EqualityOp::NotEqual | EqualityOp::NotEquivalent => !equal,
    }
    .to_collection()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use treepath_support::PrecisionDate;

    fn int(i: i64) -> Option<Value> {
        Some(Value::Integer(i))
    }

    #[test]
    fn test_integer_arithmetic_stays_integral() {
        assert_eq!(
            additive(AdditiveOp::Add, int(2), int(3)).singleton_value(),
            int(5)
        );
        assert_eq!(
            multiplicative(MultiplicativeOp::Div, int(7), int(2)).singleton_value(),
            int(3)
        );
        assert_eq!(
            multiplicative(MultiplicativeOp::Mod, int(7), int(2)).singleton_value(),
            int(1)
        );
        assert_eq!(
            multiplicative(MultiplicativeOp::Divide, int(7), int(2)).singleton_value(),
            Some(Value::Decimal(dec!(3.5)))
        );
    }

    #[test]
    fn test_faults_become_empty() {
        assert!(multiplicative(MultiplicativeOp::Divide, int(1), int(0)).is_empty());
        assert!(multiplicative(MultiplicativeOp::Div, int(1), int(0)).is_empty());
        assert!(multiplicative(MultiplicativeOp::Mod, int(1), int(0)).is_empty());
        assert!(additive(AdditiveOp::Add, int(i64::MAX), int(1)).is_empty());
        assert!(polarity(PolarityOp::Minus, &i64::MIN.to_collection()).is_empty());
        assert!(additive(AdditiveOp::Add, int(1), Some(Value::String("a".into()))).is_empty());
    }

    #[test]
    fn test_concatenation_treats_empty_as_empty_string() {
        let text = |s: &str| Some(Value::String(s.to_string()));
        assert_eq!(
            additive(AdditiveOp::Concatenate, text("a"), None).singleton_value(),
            text("a")
        );
        assert_eq!(
            additive(AdditiveOp::Concatenate, None, None).singleton_value(),
            text("")
        );
        assert!(additive(AdditiveOp::Add, text("a"), None).is_empty());
        assert!(additive(AdditiveOp::Concatenate, text("a"), int(1)).is_empty());
    }

    #[test]
    fn test_temporal_arithmetic_is_symmetric() {
        let date = Some(Value::Date(PrecisionDate::parse("@2024-01-31").unwrap()));
        let month = Some(Value::Quantity(dec!(1), "month".to_string()));
        let expected = Some(Value::Date(PrecisionDate::parse("@2024-02-29").unwrap()));
        assert_eq!(
            additive(AdditiveOp::Add, date.clone(), month.clone()).singleton_value(),
            expected
        );
        assert_eq!(
            additive(AdditiveOp::Add, month.clone(), date.clone()).singleton_value(),
            expected
        );
        let earlier = Some(Value::Date(PrecisionDate::parse("@2023-12-31").unwrap()));
        assert_eq!(
            additive(AdditiveOp::Subtract, date.clone(), month.clone()).singleton_value(),
            earlier
        );
        assert_eq!(
            additive(AdditiveOp::Subtract, month, date).singleton_value(),
            earlier
        );
    }

    #[test]
    fn test_scalar_separates_empty_from_valueless_node() {
        assert_eq!(scalar(&Collection::empty()), Ok(Some(None)));
        assert_eq!(scalar(&1i64.to_collection()), Ok(Some(int(1))));
        let structured = crate::json_tree::JsonNode::root(serde_json::json!({ "a": 1 }));
        assert_eq!(scalar(&Collection::singleton(structured)), Ok(None));
    }

    #[test]
    fn test_quantity_addition_with_same_unit() {
        let left = Some(Value::Quantity(dec!(2), "widget".to_string()));
        let right = Some(Value::Quantity(dec!(3), "widget".to_string()));
        assert_eq!(
            additive(AdditiveOp::Add, left, right).singleton_value(),
            Some(Value::Quantity(dec!(5), "widget".to_string()))
        );
    }

    #[test]
    fn test_inequality_on_incomparable_is_false() {
        let result = inequality(
            InequalityOp::Less,
            &1i64.to_collection(),
            &"a".to_collection(),
        );
        assert_eq!(result, Ok(false));
        let result = inequality(InequalityOp::Less, &Collection::empty(), &1i64.to_collection());
        assert_eq!(result, Ok(false));
    }

    #[test]
    fn test_equality_propagates_empty() {
        assert!(equality(EqualityOp::Equal, &Collection::empty(), &1i64.to_collection()).is_empty());
        assert_eq!(
            equality(EqualityOp::NotEquivalent, &1i64.to_collection(), &2i64.to_collection())
                .as_boolean(),
            Some(true)
        );
    }
}
