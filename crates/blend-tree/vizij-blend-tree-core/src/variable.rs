//! Blend-tree variables and their cross-type comparison.
//!
//! Variables are a closed set of kinds. Comparison is one function matching on
//! the pair of tags:
//! - `Float` and `Int` compare numerically with each other.
//! - A `Vector` compared with a number uses its length.
//! - Two vectors are equal when their components are equal; ordering uses
//!   their lengths.
//! - `Bool` only compares with `Bool` (`false < true`).
//!
//! Any other pairing yields `false` for every operator.

use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum VariableKind {
    Float,
    Bool,
    Int,
    Vector,
}

#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data")]
pub enum VariableValue {
    Float(f32),
    Bool(bool),
    Int(i32),
    Vector([f32; 3]),
}

impl VariableValue {
    #[inline]
    pub fn kind(&self) -> VariableKind {
        match self {
            VariableValue::Float(_) => VariableKind::Float,
            VariableValue::Bool(_) => VariableKind::Bool,
            VariableValue::Int(_) => VariableKind::Int,
            VariableValue::Vector(_) => VariableKind::Vector,
        }
    }

    /// Numeric view used by comparisons: vectors collapse to their length.
    /// `None` for booleans.
    #[inline]
    pub fn as_scalar(&self) -> Option<f32> {
        match *self {
            VariableValue::Float(f) => Some(f),
            VariableValue::Int(i) => Some(i as f32),
            VariableValue::Vector(v) => Some(length3(v)),
            VariableValue::Bool(_) => None,
        }
    }
}

#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum CompareOp {
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

#[inline]
fn length3(v: [f32; 3]) -> f32 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

fn apply_ord<T: PartialOrd>(lhs: T, op: CompareOp, rhs: T) -> bool {
    match op {
        CompareOp::Equal => lhs == rhs,
        CompareOp::NotEqual => lhs != rhs,
        CompareOp::Less => lhs < rhs,
        CompareOp::LessEqual => lhs <= rhs,
        CompareOp::Greater => lhs > rhs,
        CompareOp::GreaterEqual => lhs >= rhs,
    }
}

/// Compares two variable values with `op`. Total: incompatible kinds are `false`.
pub fn compare(lhs: &VariableValue, op: CompareOp, rhs: &VariableValue) -> bool {
    use VariableValue::*;
    match (*lhs, *rhs) {
        (Bool(a), Bool(b)) => apply_ord(a, op, b),
        (Bool(_), _) | (_, Bool(_)) => false,
        (Int(a), Int(b)) => apply_ord(a, op, b),
        (Vector(a), Vector(b)) => match op {
            CompareOp::Equal => a == b,
            CompareOp::NotEqual => a != b,
            _ => apply_ord(length3(a), op, length3(b)),
        },
        (a, b) => match (a.as_scalar(), b.as_scalar()) {
            (Some(x), Some(y)) => apply_ord(x, op, y),
            _ => false,
        },
    }
}

/// Declared variable: name for build-time lookup plus the value a fresh
/// runtime starts from.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct VariableDecl {
    pub name: String,
    pub default: VariableValue,
}

#[cfg(test)]
mod tests {
    use super::*;
    use VariableValue::*;

    #[test]
    fn numbers_compare_across_float_and_int() {
        assert!(compare(&Float(2.0), CompareOp::Equal, &Int(2)));
        assert!(compare(&Int(1), CompareOp::Less, &Float(1.5)));
        assert!(compare(&Int(3), CompareOp::GreaterEqual, &Int(3)));
        assert!(!compare(&Float(0.5), CompareOp::Greater, &Int(1)));
    }

    #[test]
    fn vectors_compare_by_length_against_numbers() {
        let v = Vector([3.0, 4.0, 0.0]);
        assert!(compare(&v, CompareOp::Equal, &Float(5.0)));
        assert!(compare(&Int(4), CompareOp::Less, &v));
        assert!(compare(&v, CompareOp::Greater, &Float(4.5)));
    }

    #[test]
    fn vectors_equal_componentwise_but_order_by_length() {
        let a = Vector([1.0, 0.0, 0.0]);
        let b = Vector([0.0, 1.0, 0.0]);
        assert!(!compare(&a, CompareOp::Equal, &b));
        assert!(compare(&a, CompareOp::LessEqual, &b));
        assert!(compare(&a, CompareOp::GreaterEqual, &b));
        assert!(compare(&a, CompareOp::Equal, &a));
    }

    #[test]
    fn bool_only_compares_with_bool() {
        assert!(compare(&Bool(true), CompareOp::Equal, &Bool(true)));
        assert!(compare(&Bool(false), CompareOp::Less, &Bool(true)));
        assert!(!compare(&Bool(true), CompareOp::Equal, &Int(1)));
        assert!(!compare(&Float(1.0), CompareOp::NotEqual, &Bool(false)));
    }
}
