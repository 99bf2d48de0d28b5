//! Operator values and the coercion rules shared by comparison and logical
//! operators.

use core::fmt;
use std::cmp::Ordering;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::element::DateTimeValue;

/// Value an element resolves to for operator evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptValue {
    Null,
    Bool(bool),
    Int(i64),
    Decimal(Decimal),
    Double(f64),
    Text(String),
    DateTime(DateTimeValue),
    /// A present array, tuple or object with its semantic item count.
    Collection(usize),
}

impl ScriptValue {
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Boolean: its value. Text: non-empty and not `"false"`. Numbers:
    /// non-zero and not NaN. Collections and dates: true. Null: false.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::Decimal(d) => !d.is_zero(),
            Self::Double(f) => *f != 0.0 && !f.is_nan(),
            Self::Text(s) => !s.is_empty() && !s.eq_ignore_ascii_case("false"),
            Self::DateTime(_) | Self::Collection(_) => true,
        }
    }
}

impl fmt::Display for ScriptValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Decimal(d) => write!(f, "{d}"),
            Self::Double(d) => write!(f, "{d}"),
            Self::Text(s) => f.write_str(s),
            Self::DateTime(dt) => write!(f, "{dt}"),
            Self::Collection(n) => write!(f, "[{n}]"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum NumKind {
    Int(i64),
    Dec(Decimal),
    Double(f64),
}

impl NumKind {
    fn to_f64(self) -> f64 {
        match self {
            #[allow(clippy::cast_precision_loss)]
            Self::Int(i) => i as f64,
            Self::Dec(d) => d.to_f64().unwrap_or(f64::NAN),
            Self::Double(f) => f,
        }
    }

    fn to_decimal(self) -> Option<Decimal> {
        match self {
            Self::Int(i) => Some(Decimal::from(i)),
            Self::Dec(d) => Some(d),
            Self::Double(f) => Decimal::from_f64_retain(f),
        }
    }
}

fn classify(v: &ScriptValue) -> Option<NumKind> {
    match v {
        ScriptValue::Int(i) => Some(NumKind::Int(*i)),
        ScriptValue::Decimal(d) => Some(NumKind::Dec(*d)),
        ScriptValue::Double(f) => Some(NumKind::Double(*f)),
        _ => None,
    }
}

/// Promote two numbers to their common kind: double wins over decimal,
/// decimal over integer.
fn unify_numeric(a: NumKind, b: NumKind) -> (NumKind, NumKind) {
    match (a, b) {
        (NumKind::Int(_), NumKind::Int(_)) => (a, b),
        (NumKind::Double(_), _) | (_, NumKind::Double(_)) => {
            (NumKind::Double(a.to_f64()), NumKind::Double(b.to_f64()))
        }
        _ => match (a.to_decimal(), b.to_decimal()) {
            (Some(x), Some(y)) => (NumKind::Dec(x), NumKind::Dec(y)),
            _ => (NumKind::Double(a.to_f64()), NumKind::Double(b.to_f64())),
        },
    }
}

fn compare_numeric(a: NumKind, b: NumKind) -> Option<Ordering> {
    match unify_numeric(a, b) {
        (NumKind::Int(x), NumKind::Int(y)) => Some(x.cmp(&y)),
        (NumKind::Dec(x), NumKind::Dec(y)) => Some(x.cmp(&y)),
        (x, y) => x.to_f64().partial_cmp(&y.to_f64()),
    }
}

/// Ordering of two non-null values. Numbers compare after promotion,
/// dates chronologically, booleans `false < true`, anything else by the
/// ordinal order of its text.
pub fn compare(a: &ScriptValue, b: &ScriptValue) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (classify(a), classify(b)) {
        return compare_numeric(x, y);
    }
    match (a, b) {
        (ScriptValue::Null, _) | (_, ScriptValue::Null) => None,
        (ScriptValue::DateTime(x), ScriptValue::DateTime(y)) => x.chronological_cmp(y),
        (ScriptValue::Bool(x), ScriptValue::Bool(y)) => Some(x.cmp(y)),
        _ => Some(a.to_string().cmp(&b.to_string())),
    }
}

/// Equality with null only equal to null.
pub fn values_equal(a: &ScriptValue, b: &ScriptValue) -> bool {
    match (a, b) {
        (ScriptValue::Null, ScriptValue::Null) => true,
        (ScriptValue::Null, _) | (_, ScriptValue::Null) => false,
        _ => compare(a, b) == Some(Ordering::Equal),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ScriptValue::Int(10), ScriptValue::Decimal(Decimal::new(100, 1)), Some(Ordering::Equal))]
    #[case(ScriptValue::Int(4), ScriptValue::Double(4.5), Some(Ordering::Less))]
    #[case(ScriptValue::Text("b".into()), ScriptValue::Text("a".into()), Some(Ordering::Greater))]
    #[case(ScriptValue::Text("B".into()), ScriptValue::Text("a".into()), Some(Ordering::Less))]
    #[case(ScriptValue::Null, ScriptValue::Int(1), None)]
    fn ordering(#[case] a: ScriptValue, #[case] b: ScriptValue, #[case] expected: Option<Ordering>) {
        assert_eq!(compare(&a, &b), expected);
    }

    #[rstest]
    #[case(ScriptValue::Text("False".into()), false)]
    #[case(ScriptValue::Text("no".into()), true)]
    #[case(ScriptValue::Text(String::new()), false)]
    #[case(ScriptValue::Double(f64::NAN), false)]
    #[case(ScriptValue::Decimal(Decimal::ZERO), false)]
    #[case(ScriptValue::Collection(0), true)]
    #[case(ScriptValue::Null, false)]
    fn truthiness(#[case] v: ScriptValue, #[case] expected: bool) {
        assert_eq!(v.is_truthy(), expected);
    }

    #[test]
    fn null_equals_only_null() {
        assert!(values_equal(&ScriptValue::Null, &ScriptValue::Null));
        assert!(!values_equal(&ScriptValue::Null, &ScriptValue::Text(String::new())));
        assert!(values_equal(&ScriptValue::Int(1), &ScriptValue::Text("1".into())));
    }
}
