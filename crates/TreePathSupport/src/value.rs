//! # Primitive Values
//!
//! [`Value`] is the closed set of primitive domains a path expression computes
//! with. Besides construction it defines the three relations the evaluator relies
//! on: comparability, ordering and language-level equality.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;

use crate::date_time::{PrecisionDate, PrecisionDateTime, PrecisionTime, TemporalPrecision};
use crate::evaluation_error::EvaluationError;
use crate::type_info::TypeInfoResult;
use crate::ucum;

/// A primitive value.
///
/// `PartialEq` is structural: `Integer(1)` and `Decimal(1.0)` are different values,
/// although decimals that differ only in scale compare equal. The expression
/// language's `=` is [`Value::equals`], which promotes numbers and converts units.
#[derive(Debug, Clone)]
pub enum Value {
    Boolean(bool),
    String(String),
    Integer(i64),
    Decimal(Decimal),
    Date(PrecisionDate),
    DateTime(PrecisionDateTime),
    Time(PrecisionTime),
    /// Magnitude and UCUM unit (or calendar keyword).
    Quantity(Decimal, String),
}

impl Value {
    /// Builds a numeric value from literal text.
    ///
    /// The text becomes an `Integer` when it converts exactly to `i64`, and a
    /// `Decimal` otherwise: `"5"` is an integer, `"5.0"` a decimal.
    pub fn from_number_literal(text: &str) -> Option<Value> {
        match text.parse::<i64>() {
            Ok(i) => Some(Value::Integer(i)),
            Err(_) => Decimal::from_str(text).ok().map(Value::Decimal),
        }
    }

    /// Builds a quantity, defaulting an absent unit to the unity unit `'1'`.
    pub fn quantity(value: Decimal, unit: Option<&str>) -> Value {
        Value::Quantity(value, unit.unwrap_or("1").to_string())
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Boolean(_) => "Boolean",
            Value::String(_) => "String",
            Value::Integer(_) => "Integer",
            Value::Decimal(_) => "Decimal",
            Value::Date(_) => "Date",
            Value::DateTime(_) => "DateTime",
            Value::Time(_) => "Time",
            Value::Quantity(_, _) => "Quantity",
        }
    }

    /// The `System` type of this value.
    pub fn type_info(&self) -> TypeInfoResult {
        TypeInfoResult::system(self.type_name())
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Decimal(_))
    }

    pub fn is_temporal(&self) -> bool {
        matches!(self, Value::Date(_) | Value::DateTime(_) | Value::Time(_))
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric value promoted to decimal.
    pub fn to_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Integer(i) => Some(Decimal::from(*i)),
            Value::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    pub fn temporal_precision(&self) -> Option<TemporalPrecision> {
        match self {
            Value::Date(d) => Some(d.precision()),
            Value::DateTime(dt) => Some(dt.precision()),
            Value::Time(t) => Some(t.precision()),
            _ => None,
        }
    }

    fn ordering(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Integer(l), Value::Integer(r)) => Some(l.cmp(r)),
            (l, r) if l.is_numeric() && r.is_numeric() => {
                Some(l.to_decimal()?.cmp(&r.to_decimal()?))
            }
            (Value::String(l), Value::String(r)) => Some(l.cmp(r)),
            (Value::Date(l), Value::Date(r)) => l.compare(r),
            (Value::DateTime(l), Value::DateTime(r)) => l.compare(r),
            (Value::Date(l), Value::DateTime(r)) => PrecisionDateTime::from_date(l).compare(r),
            (Value::DateTime(l), Value::Date(r)) => l.compare(&PrecisionDateTime::from_date(r)),
            (Value::Time(l), Value::Time(r)) => l.compare(r),
            (Value::Quantity(lv, lu), Value::Quantity(rv, ru)) => {
                ucum::compare_quantities(*lv, lu, *rv, ru)
            }
            _ => None,
        }
    }

    /// Whether an ordering between the two values is defined.
    ///
    /// Numbers compare with numbers, strings with strings, temporal values when
    /// their precisions leave no ambiguity, and quantities with dimensionally
    /// compatible units. Booleans have no ordering.
    pub fn is_comparable_to(&self, other: &Value) -> bool {
        self.ordering(other).is_some()
    }

    /// Orders two comparable values.
    ///
    /// Calling this on values that are not [comparable](Value::is_comparable_to)
    /// is an error.
    pub fn compare_to(&self, other: &Value) -> Result<Ordering, EvaluationError> {
        self.ordering(other).ok_or_else(|| {
            EvaluationError::InvalidOperation(format!(
                "Cannot compare {} with {}",
                self.type_name(),
                other.type_name()
            ))
        })
    }

    /// Equality as used by `=`, membership and union.
    pub fn equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Boolean(l), Value::Boolean(r)) => l == r,
            (Value::String(l), Value::String(r)) => l == r,
            (Value::Quantity(lv, lu), Value::Quantity(rv, ru)) if lu == ru => lv == rv,
            _ => self.ordering(other) == Some(Ordering::Equal),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Boolean(l), Value::Boolean(r)) => l == r,
            (Value::String(l), Value::String(r)) => l == r,
            (Value::Integer(l), Value::Integer(r)) => l == r,
            (Value::Decimal(l), Value::Decimal(r)) => l.normalize() == r.normalize(),
            (Value::Date(l), Value::Date(r)) => l == r,
            (Value::DateTime(l), Value::DateTime(r)) => l == r,
            (Value::Time(l), Value::Time(r)) => l == r,
            (Value::Quantity(lv, lu), Value::Quantity(rv, ru)) => {
                lv.normalize() == rv.normalize() && lu == ru
            }
            _ => false,
        }
    }
}

impl Eq for Value {}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Boolean(b) => write!(f, "{}", b),
            Value::String(s) => write!(f, "{}", s),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Decimal(d) => write!(f, "{}", d),
            Value::Date(d) => write!(f, "{}", d),
            Value::DateTime(dt) => write!(f, "{}", dt),
            Value::Time(t) => write!(f, "{}", t),
            Value::Quantity(value, unit) => write!(f, "{} '{}'", value, unit),
        }
    }
}
