//! Opaque identifiers and write targets.

use std::fmt;

use repokit_db::Value;

/// A caller-supplied identifier: a primary key, a slug or an external id.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Identifier {
    Integer(i64),
    Text(String),
}

impl Identifier {
    /// The identifier coerced for primary key comparison.
    pub fn as_key(&self) -> i64 {
        match self {
            Identifier::Integer(value) => *value,
            Identifier::Text(value) => coerce_int(value),
        }
    }

    /// The identifier as given, for slug and external id comparison.
    pub fn raw_value(&self) -> Value {
        match self {
            Identifier::Integer(value) => Value::Integer(*value),
            Identifier::Text(value) => Value::Text(value.clone()),
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Integer(value) => write!(f, "{}", value),
            Identifier::Text(value) => write!(f, "{}", value),
        }
    }
}

impl From<i64> for Identifier {
    fn from(value: i64) -> Self {
        Identifier::Integer(value)
    }
}

impl From<i32> for Identifier {
    fn from(value: i32) -> Self {
        Identifier::Integer(value.into())
    }
}

impl From<u32> for Identifier {
    fn from(value: u32) -> Self {
        Identifier::Integer(value.into())
    }
}

impl From<&str> for Identifier {
    fn from(value: &str) -> Self {
        Identifier::Text(value.to_string())
    }
}

impl From<String> for Identifier {
    fn from(value: String) -> Self {
        Identifier::Text(value)
    }
}

impl From<&String> for Identifier {
    fn from(value: &String) -> Self {
        Identifier::Text(value.clone())
    }
}

/// Parses the leading integer of `value`.
///
/// Leading whitespace and one sign are accepted, parsing stops at the first
/// non-digit, no digits yields `0`, and out-of-range values saturate.
///
/// ```rust
/// use repokit_core::identifier::coerce_int;
///
/// assert_eq!(coerce_int("42abc"), 42);
/// assert_eq!(coerce_int("  -7"), -7);
/// assert_eq!(coerce_int("widget-a"), 0);
/// ```
pub fn coerce_int(value: &str) -> i64 {
    let mut chars = value.trim_start().chars().peekable();

    let negative = match chars.peek() {
        Some('-') => {
            chars.next();
            true
        }
        Some('+') => {
            chars.next();
            false
        }
        _ => false,
    };

    let mut result: i64 = 0;
    while let Some(digit) = chars.next().and_then(|c| c.to_digit(10)) {
        let digit = i64::from(digit);
        result = if negative {
            result.saturating_mul(10).saturating_sub(digit)
        } else {
            result.saturating_mul(10).saturating_add(digit)
        };
    }
    result
}

/// The target of an update or delete: a record already in hand, or an
/// identifier to resolve.
#[derive(Clone, Debug)]
pub enum Target<R> {
    Record(R),
    Identifier(Identifier),
}

impl<R> Target<R> {
    pub fn record(record: R) -> Self {
        Target::Record(record)
    }

    pub fn id(identifier: impl Into<Identifier>) -> Self {
        Target::Identifier(identifier.into())
    }
}

impl<R> From<Identifier> for Target<R> {
    fn from(identifier: Identifier) -> Self {
        Target::Identifier(identifier)
    }
}

impl<R> From<i64> for Target<R> {
    fn from(value: i64) -> Self {
        Target::Identifier(value.into())
    }
}

impl<R> From<&str> for Target<R> {
    fn from(value: &str) -> Self {
        Target::Identifier(value.into())
    }
}

impl<R> From<String> for Target<R> {
    fn from(value: String) -> Self {
        Target::Identifier(value.into())
    }
}
