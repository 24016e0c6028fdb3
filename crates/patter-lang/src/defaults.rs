//! Default registration: the types, converters and comparators every
//! engine starts with.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::engine::Engine;
use crate::types::{Arithmetic, Relation, Value};

/// Marker for the `object` any-type.
pub struct Object;

/// The default numeric value: integers where possible, decimals
/// otherwise. Underscores are accepted inside digit runs.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum Number {
    Integer(i64),
    Decimal(f64),
}

impl Number {
    fn integer_pattern() -> &'static Regex {
        static PATTERN: OnceLock<Regex> = OnceLock::new();
        PATTERN.get_or_init(|| Regex::new("^-?[0-9]+$").expect("valid integer pattern"))
    }

    fn decimal_pattern() -> &'static Regex {
        static PATTERN: OnceLock<Regex> = OnceLock::new();
        PATTERN.get_or_init(|| Regex::new(r"^-?[0-9]+\.[0-9]+$").expect("valid decimal pattern"))
    }

    /// Parses a number literal, or `None` if `s` is not one.
    pub fn parse(s: &str) -> Option<Number> {
        if s.starts_with('_') || s.ends_with('_') {
            return None;
        }
        let digits = s.replace('_', "");
        if Self::decimal_pattern().is_match(&digits) {
            digits.parse().ok().map(Number::Decimal)
        } else if Self::integer_pattern().is_match(&digits) {
            digits.parse().ok().map(Number::Integer)
        } else {
            None
        }
    }

    pub fn as_f64(self) -> f64 {
        match self {
            Number::Integer(i) => i as f64,
            Number::Decimal(d) => d,
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Integer(i) => write!(f, "{}", i),
            Number::Decimal(d) => write!(f, "{}", d),
        }
    }
}

struct NumberArithmetic;

impl Arithmetic for NumberArithmetic {
    fn add(&self, value: &Value, difference: &Value) -> Option<Value> {
        let a = *value.downcast_ref::<Number>()?;
        let b = *difference.downcast_ref::<Number>()?;
        let sum = match (a, b) {
            (Number::Integer(x), Number::Integer(y)) => match x.checked_add(y) {
                Some(sum) => Number::Integer(sum),
                None => Number::Decimal(x as f64 + y as f64),
            },
            _ => Number::Decimal(a.as_f64() + b.as_f64()),
        };
        Some(Value::new(sum))
    }

    fn difference(&self, first: &Value, second: &Value) -> Option<Value> {
        let a = *first.downcast_ref::<Number>()?;
        let b = *second.downcast_ref::<Number>()?;
        let difference = match (a, b) {
            (Number::Integer(x), Number::Integer(y)) => match x.checked_sub(y) {
                Some(diff) => Number::Integer(diff.abs()),
                None => Number::Decimal((x as f64 - y as f64).abs()),
            },
            _ => Number::Decimal((a.as_f64() - b.as_f64()).abs()),
        };
        Some(Value::new(difference))
    }
}

/// Registers the default types, converters and comparators. Called by
/// [`Engine::new`]; the parser relies on `object` and `boolean` being
/// present.
pub fn register(engine: &mut Engine) {
    let types = engine.types_mut();

    types.new_type::<Object>("object", "objects").any().register();

    types
        .new_type::<bool>("boolean", "booleans")
        .literal_parser(|s| {
            if s.eq_ignore_ascii_case("true") {
                Some(Value::new(true))
            } else if s.eq_ignore_ascii_case("false") {
                Some(Value::new(false))
            } else {
                None
            }
        })
        .display(|value| value.downcast_ref::<bool>().map_or_else(String::new, bool::to_string))
        .register();

    types
        .new_type::<Number>("number", "numbers")
        .literal_parser(|s| Number::parse(s).map(Value::new))
        .display(|value| {
            value
                .downcast_ref::<Number>()
                .map_or_else(String::new, Number::to_string)
        })
        .arithmetic(NumberArithmetic)
        .register();

    types
        .new_type::<String>("string", "strings")
        .display(|value| value.downcast_ref::<String>().cloned().unwrap_or_default())
        .register();

    let converters = engine.converters_mut();
    converters.register::<Number, String, _>(|n| Some(n.to_string()));
    converters.register::<bool, String, _>(|b| Some(b.to_string()));

    engine.comparators_mut().register::<Number, Number, _>(|a, b| {
        a.as_f64()
            .partial_cmp(&b.as_f64())
            .map(Relation::from_ordering)
            .or(Some(Relation::NotEqual))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_integers_and_decimals() {
        assert_eq!(Number::parse("5"), Some(Number::Integer(5)));
        assert_eq!(Number::parse("-12"), Some(Number::Integer(-12)));
        assert_eq!(Number::parse("2.5"), Some(Number::Decimal(2.5)));
        assert_eq!(Number::parse("1_000"), Some(Number::Integer(1000)));
    }

    #[test]
    fn rejects_non_numbers() {
        assert_eq!(Number::parse(""), None);
        assert_eq!(Number::parse("five"), None);
        assert_eq!(Number::parse("_5"), None);
        assert_eq!(Number::parse("5_"), None);
        assert_eq!(Number::parse("1."), None);
        assert_eq!(Number::parse("5 "), None);
    }

    #[test]
    fn arithmetic_table() {
        let arithmetic = NumberArithmetic;
        let sum = arithmetic
            .add(&Value::new(Number::Integer(2)), &Value::new(Number::Integer(3)))
            .unwrap();
        assert_eq!(sum.downcast_ref::<Number>(), Some(&Number::Integer(5)));

        let diff = arithmetic
            .difference(&Value::new(Number::Integer(2)), &Value::new(Number::Integer(7)))
            .unwrap();
        assert_eq!(diff.downcast_ref::<Number>(), Some(&Number::Integer(5)));
    }

    #[test]
    fn default_engine_has_core_types() {
        let engine = Engine::new();
        assert!(engine.types().by_name("object").unwrap().is_any());
        assert!(engine.types().by_name("boolean").is_some());
        assert!(engine.types().by_name("number").is_some());
        assert!(engine.types().by_name("string").is_some());
    }

    #[test]
    fn default_converters_and_comparators() {
        let engine = Engine::new();
        let as_string = engine
            .converters()
            .convert(&Value::new(Number::Integer(7)), std::any::TypeId::of::<String>())
            .unwrap();
        assert_eq!(as_string.downcast_ref::<String>().map(String::as_str), Some("7"));

        let relation = engine
            .comparators()
            .compare(&Value::new(Number::Integer(1)), &Value::new(Number::Decimal(1.5)));
        assert_eq!(relation, Some(Relation::Smaller));
    }
}
