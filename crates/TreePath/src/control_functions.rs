//! # Control-Flow Functions
//!
//! Functions whose arguments are not evaluated up front. `where`, `select`, `all`,
//! `exists` and `repeat` evaluate their argument once per input element, with that
//! element as `$this` and its position as `$index`. `iif` evaluates only the branch
//! its criterion selects. `is`, `as` and `ofType` read their argument as a type name
//! rather than evaluating it.

use tracing::trace;
use treepath_support::{Collection, EvaluationError, IntoCollection, Node};

use crate::evaluator::{Evaluator, arity_error, singleton_error};
use crate::parser::Expression;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ControlFunction {
    All,
    Where,
    Select,
    Exists,
    Iif,
    Is,
    As,
    OfType,
    Trace,
    Repeat,
}

impl ControlFunction {
    pub(crate) fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "all" => ControlFunction::All,
            "where" => ControlFunction::Where,
            "select" => ControlFunction::Select,
            "exists" => ControlFunction::Exists,
            "iif" => ControlFunction::Iif,
            "is" => ControlFunction::Is,
            "as" => ControlFunction::As,
            "ofType" => ControlFunction::OfType,
            "trace" => ControlFunction::Trace,
            "repeat" => ControlFunction::Repeat,
            _ => return None,
        })
    }

    fn name(self) -> &'static str {
        match self {
            ControlFunction::All => "all",
            ControlFunction::Where => "where",
            ControlFunction::Select => "select",
            ControlFunction::Exists => "exists",
            ControlFunction::Iif => "iif",
            ControlFunction::Is => "is",
            ControlFunction::As => "as",
            ControlFunction::OfType => "ofType",
            ControlFunction::Trace => "trace",
            ControlFunction::Repeat => "repeat",
        }
    }

    fn arity(self) -> (usize, usize) {
        match self {
            ControlFunction::All | ControlFunction::Exists => (0, 1),
            ControlFunction::Iif => (2, 3),
            ControlFunction::Trace => (1, 2),
            _ => (1, 1),
        }
    }

    pub(crate) fn call(
        self,
        evaluator: &mut Evaluator<'_>,
        arguments: &[Expression],
    ) -> Result<Collection, EvaluationError> {
        let (min, max) = self.arity();
        if !(min..=max).contains(&arguments.len()) {
            return Err(arity_error(arguments.len(), self.name()));
        }
        let input = evaluator.this();
        match self {
            ControlFunction::All => all(evaluator, &input, arguments.first()),
            ControlFunction::Where => {
                Ok(filter_matching(evaluator, &input, &arguments[0])?.into())
            }
            ControlFunction::Select => select(evaluator, &input, &arguments[0]),
            ControlFunction::Exists => match arguments.first() {
                None => Ok((!input.is_empty()).to_collection()),
                Some(criteria) => {
                    let matching = filter_matching(evaluator, &input, criteria)?;
                    Ok((!matching.is_empty()).to_collection())
                }
            },
            ControlFunction::Iif => iif(evaluator, arguments),
            ControlFunction::Is => {
                // An unknown type name is simply not matched here.
                let target = evaluator
                    .type_argument_name(&arguments[0])
                    .and_then(|name| evaluator.type_resolver().resolve(&name));
                match target {
                    Some(target) => evaluator.is_type(&input, &target),
                    None if input.len() > 1 => Err(singleton_error(input.len())),
                    None => Ok(false.to_collection()),
                }
            }
            ControlFunction::As | ControlFunction::OfType => {
                let name = evaluator.type_argument_name(&arguments[0]).ok_or_else(|| {
                    EvaluationError::InvalidTypeSpecifier(format!(
                        "Argument of '{}' is not a type identifier",
                        self.name()
                    ))
                })?;
                let target = evaluator.resolve_type(&name)?;
                Ok(evaluator.filter_by_type(&input, &target))
            }
            ControlFunction::Trace => trace_function(evaluator, &input, arguments),
            ControlFunction::Repeat => repeat(evaluator, &input, &arguments[0]),
        }
    }
}

/// Elements for which `criteria` evaluates to `true`.
fn filter_matching(
    evaluator: &mut Evaluator<'_>,
    input: &Collection,
    criteria: &Expression,
) -> Result<Vec<Node>, EvaluationError> {
    let mut matching = Vec::new();
    for (index, item) in input.iter().enumerate() {
        let result = evaluator.evaluate_for_item(criteria, item, index)?;
        if result.as_boolean() == Some(true) {
            matching.push(item.clone());
        }
    }
    Ok(matching)
}

/// With a criterion, only an element whose criterion is `false` fails; an empty
/// or non-boolean criterion does not. Without one, every element must be `true`.
fn all(
    evaluator: &mut Evaluator<'_>,
    input: &Collection,
    criteria: Option<&Expression>,
) -> Result<Collection, EvaluationError> {
    for (index, item) in input.iter().enumerate() {
        let fails = match criteria {
            Some(criteria) => {
                evaluator.evaluate_for_item(criteria, item, index)?.as_boolean() == Some(false)
            }
            None => item.value().and_then(|value| value.as_boolean()) != Some(true),
        };
        if fails {
            return Ok(false.to_collection());
        }
    }
    Ok(true.to_collection())
}

fn select(
    evaluator: &mut Evaluator<'_>,
    input: &Collection,
    projection: &Expression,
) -> Result<Collection, EvaluationError> {
    let mut projected = Vec::new();
    for (index, item) in input.iter().enumerate() {
        projected.extend(evaluator.evaluate_for_item(projection, item, index)?.to_vec());
    }
    Ok(projected.into())
}

fn iif(
    evaluator: &mut Evaluator<'_>,
    arguments: &[Expression],
) -> Result<Collection, EvaluationError> {
    let criterion = evaluator.visit(&arguments[0])?;
    let selected = match (criterion.len(), criterion.as_boolean()) {
        (0, _) => false,
        (1, Some(b)) => b,
        _ => {
            return Err(EvaluationError::InvalidArgument(
                "'iif' function criterion must evaluate to a boolean or empty".to_string(),
            ));
        }
    };
    if selected {
        evaluator.visit(&arguments[1])
    } else if let Some(otherwise) = arguments.get(2) {
        evaluator.visit(otherwise)
    } else {
        Ok(Collection::empty())
    }
}

/// Records the input under `name` and returns it unchanged. A projection is
/// evaluated once against the whole input and recorded instead.
fn trace_function(
    evaluator: &mut Evaluator<'_>,
    input: &Collection,
    arguments: &[Expression],
) -> Result<Collection, EvaluationError> {
    let name = match evaluator.visit(&arguments[0])?.singleton_value() {
        Some(value) => value.to_string(),
        None => String::new(),
    };
    let traced = match arguments.get(1) {
        Some(projection) => evaluator.visit(projection)?,
        None => input.clone(),
    };
    trace!(name = name.as_str(), collection = %traced, "trace");
    evaluator.context().record_trace(&name, traced);
    Ok(input.clone())
}

/// Applies `projection` to the input, then to every newly reached element, until
/// nothing new appears. The input itself is not part of the result.
fn repeat(
    evaluator: &mut Evaluator<'_>,
    input: &Collection,
    projection: &Expression,
) -> Result<Collection, EvaluationError> {
    let mut reached: Vec<Node> = Vec::new();
    let mut frontier = input.to_vec();
    while !frontier.is_empty() {
        let mut next = Vec::new();
        for (index, item) in frontier.iter().enumerate() {
            for node in evaluator.evaluate_for_item(projection, item, index)?.iter() {
                if !reached.iter().any(|seen| seen.equals(node)) {
                    reached.push(node.clone());
                    next.push(node.clone());
                }
            }
        }
        frontier = next;
    }
    Ok(reached.into())
}
