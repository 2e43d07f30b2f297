//! UCUM support for quantity values.
//!
//! Quantities with identical units are handled directly. Otherwise the right-hand
//! quantity is converted into the left-hand unit through `octofhir-ucum`, provided
//! the two units measure the same dimension.

use std::cmp::Ordering;
use std::str::FromStr;

use octofhir_ucum::fhir::{FhirError, FhirQuantity, convert_quantity};
use octofhir_ucum::{is_comparable, validate};
use rust_decimal::Decimal;

/// Maps calendar duration keywords to their UCUM codes.
pub fn calendar_to_ucum_unit(unit: &str) -> &str {
    match unit {
        "year" | "years" => "a",
        "month" | "months" => "mo",
        "week" | "weeks" => "wk",
        "day" | "days" => "d",
        "hour" | "hours" => "h",
        "minute" | "minutes" => "min",
        "second" | "seconds" => "s",
        "millisecond" | "milliseconds" => "ms",
        _ => unit,
    }
}

/// Validates a UCUM unit expression. Calendar keywords are always valid.
pub fn validate_unit(unit: &str) -> bool {
    calendar_to_ucum_unit(unit) != unit || validate(unit).is_ok()
}

/// Checks if two units have the same dimension.
pub fn units_are_comparable(unit1: &str, unit2: &str) -> bool {
    let unit1 = calendar_to_ucum_unit(unit1);
    let unit2 = calendar_to_ucum_unit(unit2);
    unit1 == unit2 || is_comparable(unit1, unit2).unwrap_or(false)
}

/// Converts a value from one unit to another.
pub fn convert_units(value: Decimal, from_unit: &str, to_unit: &str) -> Result<Decimal, String> {
    let from_unit = calendar_to_ucum_unit(from_unit);
    let to_unit = calendar_to_ucum_unit(to_unit);
    if from_unit == to_unit {
        return Ok(value);
    }

    let value_f64 = value
        .to_string()
        .parse::<f64>()
        .map_err(|e| format!("Failed to convert value to f64: {}", e))?;
    let source = FhirQuantity::with_ucum_code(value_f64, from_unit);

    match convert_quantity(&source, to_unit) {
        Ok(converted) => {
            // Conversion factors go through f64; round away representation noise.
            let rounded = (converted.value * 1e10).round() / 1e10;
            Decimal::try_from(rounded)
                .or_else(|_| Decimal::from_str(&format!("{:.10}", rounded)))
                .map(|d| d.normalize())
                .map_err(|e| format!("Failed to convert result to Decimal: {}", e))
        }
        Err(FhirError::UcumError(e)) => Err(format!("UCUM conversion error: {}", e)),
        Err(e) => Err(format!("Conversion error: {}", e)),
    }
}

/// Orders two quantities, converting the right one into the left unit.
/// Returns None when the units are not comparable.
pub fn compare_quantities(
    left_value: Decimal,
    left_unit: &str,
    right_value: Decimal,
    right_unit: &str,
) -> Option<Ordering> {
    if !units_are_comparable(left_unit, right_unit) {
        return None;
    }
    let right_value = convert_units(right_value, right_unit, left_unit).ok()?;
    Some(left_value.cmp(&right_value))
}

/// Adds (or subtracts) two quantities, expressing the result in the left unit.
pub fn add_quantities(
    left_value: Decimal,
    left_unit: &str,
    right_value: Decimal,
    right_unit: &str,
    subtract: bool,
) -> Option<(Decimal, String)> {
    if !units_are_comparable(left_unit, right_unit) {
        return None;
    }
    let right_value = convert_units(right_value, right_unit, left_unit).ok()?;
    let value = if subtract {
        left_value.checked_sub(right_value)?
    } else {
        left_value.checked_add(right_value)?
    };
    Some((value, left_unit.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_calendar_keywords_map_to_ucum() {
        assert_eq!(calendar_to_ucum_unit("years"), "a");
        assert_eq!(calendar_to_ucum_unit("day"), "d");
        assert_eq!(calendar_to_ucum_unit("mg"), "mg");
        assert!(validate_unit("weeks"));
        assert!(validate_unit("mg"));
    }

    #[test]
    fn test_units_are_comparable() {
        assert!(units_are_comparable("g", "mg"));
        assert!(units_are_comparable("m", "cm"));
        assert!(units_are_comparable("days", "d"));
        assert!(!units_are_comparable("g", "m"));
    }

    #[test]
    fn test_compare_and_add_quantities() {
        assert_eq!(
            compare_quantities(Decimal::from(1), "m", Decimal::from(50), "cm"),
            Some(Ordering::Greater)
        );
        assert_eq!(compare_quantities(Decimal::from(1), "g", Decimal::from(1), "m"), None);

        let (value, unit) =
            add_quantities(Decimal::from(2), "mg", Decimal::from(3), "mg", true).unwrap();
        assert_eq!(value, Decimal::from(-1));
        assert_eq!(unit, "mg");
    }
}
