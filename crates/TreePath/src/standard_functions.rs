//! # Standard Functions
//!
//! The ordinary functions installed by [`StandardFunctionRegistry::new`]. Each one
//! receives its arguments already evaluated, so none of them can see `$this`.
//!
//! - existence: `empty()`, `count()`, `not()`, `hasValue()`, `distinct()`,
//!   `isDistinct()`, `allTrue()`, `anyTrue()`, `allFalse()`, `anyFalse()`
//! - subsetting: `first()`, `last()`, `tail()`, `skip()`, `take()`, `single()`,
//!   `intersect()`, `exclude()`, `combine()`, `union()`
//! - navigation: `children()`, `descendants()`
//! - conversion: `toString()`, `toInteger()`, `toDecimal()`, `toBoolean()`
//! - strings: `length()`, `upper()`, `lower()`, `startsWith()`, `endsWith()`,
//!   `contains()`, `indexOf()`, `substring()`, `matches()`, `replace()`,
//!   `replaceMatches()`, `join()`
//! - math: `abs()`, `sum()`
//! - encoding: `encode()`, `decode()`

use std::borrow::Cow;
use std::str::FromStr;

use base64::Engine as _;
use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use lru::LruCache;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use rust_decimal::Decimal;
use treepath_support::{Collection, EvaluationError, IntoCollection, Node, Value};

use crate::cache;
use crate::context::EvaluationContext;
use crate::registry::{FunctionDescriptor, FunctionResult, StandardFunctionRegistry};

type StandardFunction = fn(&EvaluationContext, &Collection, &[Collection]) -> FunctionResult;

const REGEX_CACHE_CAPACITY: usize = 64;

static REGEX_CACHE: Lazy<Mutex<LruCache<String, Regex>>> =
    Lazy::new(|| Mutex::new(cache::bounded(REGEX_CACHE_CAPACITY)));

const STANDARD_FUNCTIONS: &[(&str, usize, usize, StandardFunction)] = &[
    ("empty", 0, 0, empty_function),
    ("count", 0, 0, count_function),
    ("not", 0, 0, not_function),
    ("hasValue", 0, 0, has_value_function),
    ("distinct", 0, 0, distinct_function),
    ("isDistinct", 0, 0, is_distinct_function),
    ("allTrue", 0, 0, all_true_function),
    ("anyTrue", 0, 0, any_true_function),
    ("allFalse", 0, 0, all_false_function),
    ("anyFalse", 0, 0, any_false_function),
    ("first", 0, 0, first_function),
    ("last", 0, 0, last_function),
    ("tail", 0, 0, tail_function),
    ("skip", 1, 1, skip_function),
    ("take", 1, 1, take_function),
    ("single", 0, 0, single_function),
    ("intersect", 1, 1, intersect_function),
    ("exclude", 1, 1, exclude_function),
    ("combine", 1, 1, combine_function),
    ("union", 1, 1, union_function),
    ("children", 0, 0, children_function),
    ("descendants", 0, 0, descendants_function),
    ("toString", 0, 0, to_string_function),
    ("toInteger", 0, 0, to_integer_function),
    ("toDecimal", 0, 0, to_decimal_function),
    ("toBoolean", 0, 0, to_boolean_function),
    ("length", 0, 0, length_function),
    ("upper", 0, 0, upper_function),
    ("lower", 0, 0, lower_function),
    ("startsWith", 1, 1, starts_with_function),
    ("endsWith", 1, 1, ends_with_function),
    ("contains", 1, 1, contains_function),
    ("indexOf", 1, 1, index_of_function),
    ("substring", 1, 2, substring_function),
    ("matches", 1, 1, matches_function),
    ("replace", 2, 2, replace_function),
    ("replaceMatches", 2, 2, replace_matches_function),
    ("join", 0, 1, join_function),
    ("abs", 0, 0, abs_function),
    ("sum", 0, 0, sum_function),
    ("encode", 1, 1, encode_function),
    ("decode", 1, 1, decode_function),
];

pub fn register_standard_functions(registry: &mut StandardFunctionRegistry) {
    for &(name, min_arity, max_arity, apply) in STANDARD_FUNCTIONS {
        registry.register(FunctionDescriptor::new(name, min_arity, max_arity, apply));
    }
}

// === Argument helpers ===

fn singleton_error(len: usize) -> EvaluationError {
    EvaluationError::SingletonEvaluationError(format!(
        "Input collection has {} items, but only 1 is allowed",
        len
    ))
}

/// The value of a singleton input. Empty input, or a tree node without a value,
/// gives None.
fn input_value(input: &Collection) -> Result<Option<Value>, EvaluationError> {
    match input.len() {
        0 => Ok(None),
        1 => Ok(input.singleton_value()),
        n => Err(singleton_error(n)),
    }
}

fn string_input(input: &Collection, function: &str) -> Result<Option<String>, EvaluationError> {
    match input_value(input)? {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(other) => Err(EvaluationError::TypeError(format!(
            "Expected String input for function '{}', found {}",
            function,
            other.type_name()
        ))),
    }
}

fn collection_argument(arguments: &[Collection], index: usize) -> Collection {
    arguments.get(index).cloned().unwrap_or_default()
}

fn argument_value(arguments: &[Collection], index: usize) -> Result<Option<Value>, EvaluationError> {
    match arguments.get(index) {
        Some(argument) => input_value(argument),
        None => Ok(None),
    }
}

fn string_argument(
    arguments: &[Collection],
    index: usize,
    function: &str,
) -> Result<Option<String>, EvaluationError> {
    match argument_value(arguments, index)? {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(other) => Err(EvaluationError::TypeError(format!(
            "Expected String argument for function '{}', found {}",
            function,
            other.type_name()
        ))),
    }
}

fn integer_argument(
    arguments: &[Collection],
    index: usize,
    function: &str,
) -> Result<Option<i64>, EvaluationError> {
    match argument_value(arguments, index)? {
        None => Ok(None),
        Some(Value::Integer(i)) => Ok(Some(i)),
        Some(other) => Err(EvaluationError::TypeError(format!(
            "Expected Integer argument for function '{}', found {}",
            function,
            other.type_name()
        ))),
    }
}

fn boolean_items(input: &Collection, function: &str) -> Result<Vec<bool>, EvaluationError> {
    input
        .iter()
        .map(|node| {
            node.value()
                .and_then(|value| value.as_boolean())
                .ok_or_else(|| {
                    EvaluationError::TypeError(format!(
                        "Function '{}' expects a collection of Booleans",
                        function
                    ))
                })
        })
        .collect()
}

fn cached_regex(pattern: &str) -> Result<Regex, EvaluationError> {
    if let Some(regex) = REGEX_CACHE.lock().get(pattern) {
        return Ok(regex.clone());
    }
    let regex = Regex::new(pattern)
        .map_err(|e| EvaluationError::InvalidRegex(format!("Invalid regex pattern: {}", e)))?;
    REGEX_CACHE.lock().put(pattern.to_string(), regex.clone());
    Ok(regex)
}

// === Existence ===

fn empty_function(_: &EvaluationContext, input: &Collection, _: &[Collection]) -> FunctionResult {
    Ok(input.is_empty().to_collection())
}

fn count_function(_: &EvaluationContext, input: &Collection, _: &[Collection]) -> FunctionResult {
    Ok((input.len() as i64).to_collection())
}

/// Boolean negation. Empty and non-Boolean inputs give empty.
fn not_function(_: &EvaluationContext, input: &Collection, _: &[Collection]) -> FunctionResult {
    Ok(input_value(input)?
        .and_then(|value| value.as_boolean())
        .map(|b| !b)
        .to_collection())
}

fn has_value_function(
    _: &EvaluationContext,
    input: &Collection,
    _: &[Collection],
) -> FunctionResult {
    Ok((input.is_singleton() && input.iter().all(Node::has_value)).to_collection())
}

fn distinct_function(
    _: &EvaluationContext,
    input: &Collection,
    _: &[Collection],
) -> FunctionResult {
    Ok(input.distinct())
}

fn is_distinct_function(
    _: &EvaluationContext,
    input: &Collection,
    _: &[Collection],
) -> FunctionResult {
    Ok((input.distinct().len() == input.len()).to_collection())
}

fn all_true_function(_: &EvaluationContext, input: &Collection, _: &[Collection]) -> FunctionResult {
    Ok(boolean_items(input, "allTrue")?.iter().all(|b| *b).to_collection())
}

fn any_true_function(_: &EvaluationContext, input: &Collection, _: &[Collection]) -> FunctionResult {
    Ok(boolean_items(input, "anyTrue")?.iter().any(|b| *b).to_collection())
}

fn all_false_function(
    _: &EvaluationContext,
    input: &Collection,
    _: &[Collection],
) -> FunctionResult {
    Ok(boolean_items(input, "allFalse")?.iter().all(|b| !*b).to_collection())
}

fn any_false_function(
    _: &EvaluationContext,
    input: &Collection,
    _: &[Collection],
) -> FunctionResult {
    Ok(boolean_items(input, "anyFalse")?.iter().any(|b| !*b).to_collection())
}

// === Subsetting ===

fn first_function(_: &EvaluationContext, input: &Collection, _: &[Collection]) -> FunctionResult {
    Ok(input.iter().take(1).cloned().collect())
}

fn last_function(_: &EvaluationContext, input: &Collection, _: &[Collection]) -> FunctionResult {
    Ok(input.as_slice().last().cloned().into_iter().collect())
}

fn tail_function(_: &EvaluationContext, input: &Collection, _: &[Collection]) -> FunctionResult {
    Ok(input.iter().skip(1).cloned().collect())
}

fn skip_function(
    _: &EvaluationContext,
    input: &Collection,
    arguments: &[Collection],
) -> FunctionResult {
    let Some(count) = integer_argument(arguments, 0, "skip")? else {
        return Ok(Collection::empty());
    };
    let count = usize::try_from(count).unwrap_or(0);
    Ok(input.iter().skip(count).cloned().collect())
}

fn take_function(
    _: &EvaluationContext,
    input: &Collection,
    arguments: &[Collection],
) -> FunctionResult {
    let Some(count) = integer_argument(arguments, 0, "take")? else {
        return Ok(Collection::empty());
    };
    let count = usize::try_from(count).unwrap_or(0);
    Ok(input.iter().take(count).cloned().collect())
}

fn single_function(_: &EvaluationContext, input: &Collection, _: &[Collection]) -> FunctionResult {
    match input.len() {
        0 | 1 => Ok(input.clone()),
        n => Err(singleton_error(n)),
    }
}

/// Elements present in both collections, without duplicates, in input order.
fn intersect_function(
    _: &EvaluationContext,
    input: &Collection,
    arguments: &[Collection],
) -> FunctionResult {
    let other = collection_argument(arguments, 0);
    let mut items: Vec<Node> = Vec::new();
    for node in input {
        if other.contains_node(node) && !items.iter().any(|existing| existing.equals(node)) {
            items.push(node.clone());
        }
    }
    Ok(Collection::from(items))
}

fn exclude_function(
    _: &EvaluationContext,
    input: &Collection,
    arguments: &[Collection],
) -> FunctionResult {
    let other = collection_argument(arguments, 0);
    Ok(input
        .iter()
        .filter(|node| !other.contains_node(node))
        .cloned()
        .collect())
}

fn combine_function(
    _: &EvaluationContext,
    input: &Collection,
    arguments: &[Collection],
) -> FunctionResult {
    let other = collection_argument(arguments, 0);
    Ok(input.iter().chain(other.iter()).cloned().collect())
}

fn union_function(
    _: &EvaluationContext,
    input: &Collection,
    arguments: &[Collection],
) -> FunctionResult {
    Ok(input.union(&collection_argument(arguments, 0)))
}

// === Navigation ===

fn children_function(
    _: &EvaluationContext,
    input: &Collection,
    _: &[Collection],
) -> FunctionResult {
    Ok(input.iter().flat_map(Node::children).collect())
}

fn descendants_function(
    _: &EvaluationContext,
    input: &Collection,
    _: &[Collection],
) -> FunctionResult {
    Ok(input.iter().flat_map(Node::descendants).collect())
}

// === Conversion ===

fn to_string_function(
    _: &EvaluationContext,
    input: &Collection,
    _: &[Collection],
) -> FunctionResult {
    Ok(input_value(input)?
        .map(|value| value.to_string())
        .to_collection())
}

fn to_integer_function(
    _: &EvaluationContext,
    input: &Collection,
    _: &[Collection],
) -> FunctionResult {
    let converted = match input_value(input)? {
        Some(Value::Integer(i)) => Some(i),
        Some(Value::Boolean(b)) => Some(i64::from(b)),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    Ok(converted.to_collection())
}

fn to_decimal_function(
    _: &EvaluationContext,
    input: &Collection,
    _: &[Collection],
) -> FunctionResult {
    let converted = match input_value(input)? {
        Some(Value::Integer(i)) => Some(Decimal::from(i)),
        Some(Value::Decimal(d)) => Some(d),
        Some(Value::Boolean(b)) => Some(if b { Decimal::ONE } else { Decimal::ZERO }),
        Some(Value::String(s)) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    };
    Ok(converted.to_collection())
}

fn to_boolean_function(
    _: &EvaluationContext,
    input: &Collection,
    _: &[Collection],
) -> FunctionResult {
    let converted = match input_value(input)? {
        Some(Value::Boolean(b)) => Some(b),
        Some(Value::Integer(1)) => Some(true),
        Some(Value::Integer(0)) => Some(false),
        Some(Value::Decimal(d)) if d == Decimal::ONE => Some(true),
        Some(Value::Decimal(d)) if d.is_zero() => Some(false),
        Some(Value::String(s)) => match s.to_lowercase().as_str() {
            "true" | "t" | "yes" | "y" | "1" | "1.0" => Some(true),
            "false" | "f" | "no" | "n" | "0" | "0.0" => Some(false),
            _ => None,
        },
        _ => None,
    };
    Ok(converted.to_collection())
}

// === Strings ===

fn length_function(_: &EvaluationContext, input: &Collection, _: &[Collection]) -> FunctionResult {
    Ok(string_input(input, "length")?
        .map(|s| s.chars().count() as i64)
        .to_collection())
}

fn upper_function(_: &EvaluationContext, input: &Collection, _: &[Collection]) -> FunctionResult {
    Ok(string_input(input, "upper")?
        .map(|s| s.to_uppercase())
        .to_collection())
}

fn lower_function(_: &EvaluationContext, input: &Collection, _: &[Collection]) -> FunctionResult {
    Ok(string_input(input, "lower")?
        .map(|s| s.to_lowercase())
        .to_collection())
}

/// Applies `test` to the string input and the first string argument. Either one
/// missing gives empty.
fn string_predicate<F>(
    input: &Collection,
    arguments: &[Collection],
    function: &str,
    test: F,
) -> FunctionResult
where
    F: FnOnce(&str, &str) -> bool,
{
    let subject = string_input(input, function)?;
    let argument = string_argument(arguments, 0, function)?;
    Ok(match (subject, argument) {
        (Some(subject), Some(argument)) => test(&subject, &argument).to_collection(),
        _ => Collection::empty(),
    })
}

fn starts_with_function(
    _: &EvaluationContext,
    input: &Collection,
    arguments: &[Collection],
) -> FunctionResult {
    string_predicate(input, arguments, "startsWith", |s, prefix| s.starts_with(prefix))
}

fn ends_with_function(
    _: &EvaluationContext,
    input: &Collection,
    arguments: &[Collection],
) -> FunctionResult {
    string_predicate(input, arguments, "endsWith", |s, suffix| s.ends_with(suffix))
}

fn contains_function(
    _: &EvaluationContext,
    input: &Collection,
    arguments: &[Collection],
) -> FunctionResult {
    string_predicate(input, arguments, "contains", |s, part| s.contains(part))
}

fn matches_function(
    _: &EvaluationContext,
    input: &Collection,
    arguments: &[Collection],
) -> FunctionResult {
    let subject = string_input(input, "matches")?;
    let pattern = string_argument(arguments, 0, "matches")?;
    let (Some(subject), Some(pattern)) = (subject, pattern) else {
        return Ok(Collection::empty());
    };
    Ok(cached_regex(&pattern)?.is_match(&subject).to_collection())
}

/// Character index of the first occurrence, or -1.
fn index_of_function(
    _: &EvaluationContext,
    input: &Collection,
    arguments: &[Collection],
) -> FunctionResult {
    let subject = string_input(input, "indexOf")?;
    let part = string_argument(arguments, 0, "indexOf")?;
    let (Some(subject), Some(part)) = (subject, part) else {
        return Ok(Collection::empty());
    };
    let index = subject
        .find(&part)
        .map(|byte_index| subject[..byte_index].chars().count() as i64)
        .unwrap_or(-1);
    Ok(index.to_collection())
}

/// `substring(start [, length])` over characters. A start outside the string
/// gives empty.
fn substring_function(
    _: &EvaluationContext,
    input: &Collection,
    arguments: &[Collection],
) -> FunctionResult {
    let Some(subject) = string_input(input, "substring")? else {
        return Ok(Collection::empty());
    };
    let Some(start) = integer_argument(arguments, 0, "substring")? else {
        return Ok(Collection::empty());
    };
    let chars: Vec<char> = subject.chars().collect();
    let Ok(start) = usize::try_from(start) else {
        return Ok(Collection::empty());
    };
    if start >= chars.len() {
        return Ok(Collection::empty());
    }
    let length = match integer_argument(arguments, 1, "substring")? {
        Some(length) => usize::try_from(length).unwrap_or(0),
        None => chars.len() - start,
    };
    let result: String = chars[start..].iter().take(length).collect();
    Ok(result.to_collection())
}

fn replace_function(
    _: &EvaluationContext,
    input: &Collection,
    arguments: &[Collection],
) -> FunctionResult {
    let subject = string_input(input, "replace")?;
    let pattern = string_argument(arguments, 0, "replace")?;
    let substitution = string_argument(arguments, 1, "replace")?;
    Ok(match (subject, pattern, substitution) {
        (Some(subject), Some(pattern), Some(substitution)) => {
            subject.replace(&pattern, &substitution).to_collection()
        }
        _ => Collection::empty(),
    })
}

fn replace_matches_function(
    _: &EvaluationContext,
    input: &Collection,
    arguments: &[Collection],
) -> FunctionResult {
    let subject = string_input(input, "replaceMatches")?;
    let pattern = string_argument(arguments, 0, "replaceMatches")?;
    let substitution = string_argument(arguments, 1, "replaceMatches")?;
    let (Some(subject), Some(pattern), Some(substitution)) = (subject, pattern, substitution)
    else {
        return Ok(Collection::empty());
    };
    let regex = cached_regex(&pattern)?;
    Ok(regex
        .replace_all(&subject, substitution.as_str())
        .into_owned()
        .to_collection())
}

/// Concatenates a collection of strings with an optional separator.
fn join_function(
    _: &EvaluationContext,
    input: &Collection,
    arguments: &[Collection],
) -> FunctionResult {
    if input.is_empty() {
        return Ok(Collection::empty());
    }
    let separator = string_argument(arguments, 0, "join")?.unwrap_or_default();
    let parts = input
        .iter()
        .map(|node| match node.value().as_deref() {
            Some(Value::String(s)) => Ok(s.clone()),
            _ => Err(EvaluationError::TypeError(
                "Function 'join' expects a collection of Strings".to_string(),
            )),
        })
        .collect::<Result<Vec<String>, EvaluationError>>()?;
    Ok(parts.join(&separator).to_collection())
}

// === Math ===

fn abs_function(_: &EvaluationContext, input: &Collection, _: &[Collection]) -> FunctionResult {
    Ok(match input_value(input)? {
        None => Collection::empty(),
        Some(Value::Integer(i)) => i.checked_abs().to_collection(),
        Some(Value::Decimal(d)) => d.abs().to_collection(),
        Some(Value::Quantity(value, unit)) => Collection::singleton(Value::Quantity(value.abs(), unit)),
        Some(other) => {
            return Err(EvaluationError::TypeError(format!(
                "Expected numeric input for function 'abs', found {}",
                other.type_name()
            )));
        }
    })
}

/// Sum of a numeric collection. Integers stay integral until a decimal appears.
/// Overflow gives empty.
fn sum_function(_: &EvaluationContext, input: &Collection, _: &[Collection]) -> FunctionResult {
    let mut total = Value::Integer(0);
    for node in input {
        let value = node.value().map(Cow::into_owned);
        total = match (total, value) {
            (Value::Integer(acc), Some(Value::Integer(i))) => match acc.checked_add(i) {
                Some(sum) => Value::Integer(sum),
                None => return Ok(Collection::empty()),
            },
            (acc, Some(value)) if value.is_numeric() => {
                let sum = acc
                    .to_decimal()
                    .zip(value.to_decimal())
                    .and_then(|(l, r)| l.checked_add(r));
                match sum {
                    Some(sum) => Value::Decimal(sum),
                    None => return Ok(Collection::empty()),
                }
            }
            (_, other) => {
                return Err(EvaluationError::TypeError(format!(
                    "Expected numeric input for function 'sum', found {}",
                    other.as_ref().map_or("a tree node", Value::type_name)
                )));
            }
        };
    }
    Ok(total.to_collection())
}

// === Encoding ===

fn unknown_encoding(format: &str) -> EvaluationError {
    EvaluationError::InvalidArgument(format!(
        "Unsupported encoding '{}', expected one of: base64, urlbase64, hex",
        format
    ))
}

fn encode_function(
    _: &EvaluationContext,
    input: &Collection,
    arguments: &[Collection],
) -> FunctionResult {
    let subject = string_input(input, "encode")?;
    let format = string_argument(arguments, 0, "encode")?;
    let (Some(subject), Some(format)) = (subject, format) else {
        return Ok(Collection::empty());
    };
    let encoded = match format.as_str() {
        "base64" => STANDARD.encode(subject.as_bytes()),
        "urlbase64" => URL_SAFE.encode(subject.as_bytes()),
        "hex" => hex::encode(subject.as_bytes()),
        other => return Err(unknown_encoding(other)),
    };
    Ok(encoded.to_collection())
}

/// Inverse of `encode`. Input that does not decode to UTF-8 text gives empty.
fn decode_function(
    _: &EvaluationContext,
    input: &Collection,
    arguments: &[Collection],
) -> FunctionResult {
    let subject = string_input(input, "decode")?;
    let format = string_argument(arguments, 0, "decode")?;
    let (Some(subject), Some(format)) = (subject, format) else {
        return Ok(Collection::empty());
    };
    let bytes = match format.as_str() {
        "base64" => STANDARD.decode(subject.as_bytes()).ok(),
        "urlbase64" => URL_SAFE.decode(subject.as_bytes()).ok(),
        "hex" => hex::decode(subject.as_bytes()).ok(),
        other => return Err(unknown_encoding(other)),
    };
    Ok(bytes
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .to_collection())
}
