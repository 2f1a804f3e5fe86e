//! Literal values with exact arithmetic.

use crate::sort::Sort;
use kinduct_syntax::{format_integer, format_rational, parse_expr, ExprKind};
use num::{BigInt, BigRational, Signed, Zero};
use std::fmt;

/// A literal value. Reals are exact rationals.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Bool(bool),
    Int(BigInt),
    Real(BigRational),
}

impl Value {
    pub fn int(n: i64) -> Self {
        Value::Int(BigInt::from(n))
    }

    pub fn real(numer: i64, denom: i64) -> Self {
        Value::Real(BigRational::new(numer.into(), denom.into()))
    }

    pub fn sort(&self) -> Sort {
        match self {
            Value::Bool(_) => Sort::Bool,
            Value::Int(_) => Sort::Int,
            Value::Real(_) => Sort::Real,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Numeric view as a rational; `None` for booleans.
    pub fn as_rational(&self) -> Option<BigRational> {
        match self {
            Value::Int(n) => Some(BigRational::from_integer(n.clone())),
            Value::Real(r) => Some(r.clone()),
            Value::Bool(_) => None,
        }
    }

    pub fn is_zero(&self) -> bool {
        match self {
            Value::Int(n) => n.is_zero(),
            Value::Real(r) => r.is_zero(),
            Value::Bool(_) => false,
        }
    }

    /// The same number as a `Real`. Booleans are returned unchanged.
    pub fn to_real(&self) -> Value {
        match self {
            Value::Int(n) => Value::Real(BigRational::from_integer(n.clone())),
            other => other.clone(),
        }
    }

    /// Equality that compares `Int` and `Real` numerically.
    pub fn semantic_eq(&self, other: &Value) -> bool {
        match (self.as_rational(), other.as_rational()) {
            (Some(a), Some(b)) => a == b,
            _ => self == other,
        }
    }

    /// Read a value printed in SMT-LIB notation, e.g. `(- 5)` or
    /// `(/ 1.0 3.0)`, as solvers print model values.
    pub fn parse_smt(text: &str) -> Option<Value> {
        let expr = parse_expr(text.trim()).ok()?;
        from_expr(&expr.kind)
    }
}

fn from_expr(kind: &ExprKind) -> Option<Value> {
    match kind {
        ExprKind::Numeral(n) => Some(Value::Int(n.clone())),
        ExprKind::Decimal(r) => Some(Value::Real(r.clone())),
        ExprKind::Symbol(s) if s == "true" => Some(Value::Bool(true)),
        ExprKind::Symbol(s) if s == "false" => Some(Value::Bool(false)),
        ExprKind::App { head, args } => match (head.name.as_str(), args.as_slice()) {
            ("-", [arg]) => match from_expr(&arg.kind)? {
                Value::Int(n) => Some(Value::Int(-n)),
                Value::Real(r) => Some(Value::Real(-r)),
                Value::Bool(_) => None,
            },
            ("/", [numer, denom]) => {
                let numer = from_expr(&numer.kind)?.as_rational()?;
                let denom = from_expr(&denom.kind)?.as_rational()?;
                if denom.is_zero() {
                    return None;
                }
                Some(Value::Real(numer / denom))
            }
            _ => None,
        },
        _ => None,
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", format_integer(n)),
            Value::Real(r) => write!(f, "{}", format_rational(r)),
        }
    }
}

/// Negate a numeric value.
pub(crate) fn negate(value: &Value) -> Option<Value> {
    match value {
        Value::Int(n) => Some(Value::Int(-n)),
        Value::Real(r) => Some(Value::Real(-r)),
        Value::Bool(_) => None,
    }
}

/// Absolute value of a numeric value.
pub(crate) fn absolute(value: &Value) -> Option<Value> {
    match value {
        Value::Int(n) => Some(Value::Int(n.abs())),
        Value::Real(r) => Some(Value::Real(r.abs())),
        Value::Bool(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_smt_values() {
        assert_eq!(Value::parse_smt("5"), Some(Value::int(5)));
        assert_eq!(Value::parse_smt("(- 5)"), Some(Value::int(-5)));
        assert_eq!(Value::parse_smt("true"), Some(Value::Bool(true)));
        assert_eq!(Value::parse_smt("2.0"), Some(Value::real(2, 1)));
        assert_eq!(Value::parse_smt("(/ 1.0 3.0)"), Some(Value::real(1, 3)));
        assert_eq!(Value::parse_smt("(- (/ 1.0 3.0))"), Some(Value::real(-1, 3)));
        assert_eq!(Value::parse_smt("(root-obj (+ (^ x 2) (- 2)) 1)"), None);
    }

    #[test]
    fn test_display_reparses() {
        for value in [
            Value::int(-12),
            Value::real(7, 4),
            Value::real(-2, 3),
            Value::Bool(false),
        ] {
            assert_eq!(Value::parse_smt(&value.to_string()), Some(value));
        }
    }

    #[test]
    fn test_semantic_eq() {
        assert!(Value::int(2).semantic_eq(&Value::real(4, 2)));
        assert!(!Value::int(2).semantic_eq(&Value::real(5, 2)));
        assert_ne!(Value::int(2), Value::real(2, 1));
    }
}
