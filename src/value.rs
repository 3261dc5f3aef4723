//! The ClassAd value lattice: `Value` and its operator families.
//!
//! `Value` is a single tagged union. Undefined and Error are ordinary variants of it,
//! not exceptions, so every operator below is a total, exhaustive function over the
//! eight variants rather than a `Result`-returning one. See the truth tables in the
//! module-level doc comments on each operator group for the exact propagation rules.

use std::fmt;
use std::sync::Arc;

use crate::ast::{BinaryOp, UnaryOp};
use crate::record::Record;

/// A runtime ClassAd value.
///
/// `Undefined` and `Error` are first-class members of this union, not out-of-band
/// failure signals: every operator implementation below is total over all eight
/// variants and never panics.
#[derive(Debug, Clone)]
pub enum Value {
    Int(i64),
    Real(f64),
    Str(Arc<str>),
    Bool(bool),
    List(Vec<Value>),
    Record(Record),
    Undefined,
    Error,
}

impl Value {
    pub fn str(s: impl Into<Arc<str>>) -> Value {
        Value::Str(s.into())
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Real(_))
    }

    /// Numeric value as `f64`, for code paths that don't care about the Int/Real split.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Real(r) => Some(*r),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    /// Structural equality, used by tests and by AST/value comparisons that are not
    /// the language-level `==`/`is` operators (those are `equality`/`meta_equal` below).
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Real(a), Value::Real(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Record(a), Value::Record(b)) => a == b,
            (Value::Undefined, Value::Undefined) => true,
            (Value::Error, Value::Error) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{i}"),
            Value::Real(r) => write!(f, "{r:?}"),
            Value::Str(s) => write!(f, "\"{}\"", escape_string(s)),
            Value::Bool(b) => write!(f, "{b}"),
            Value::List(items) => {
                write!(f, "{{")?;
                for (i, v) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "}}")
            }
            Value::Record(r) => write!(f, "{r}"),
            Value::Undefined => write!(f, "undefined"),
            Value::Error => write!(f, "error"),
        }
    }
}

fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out
}

// region:    --- Arithmetic

/// `+ - * /` over numeric pairs; Undefined/Error propagate; anything else is Error.
/// Division by zero is Error, not a panic or an infinity.
pub fn arithmetic(op: BinaryOp, lhs: &Value, rhs: &Value) -> Value {
    if let (Value::Error, _) | (_, Value::Error) = (lhs, rhs) {
        return Value::Error;
    }
    if let (Value::Undefined, _) | (_, Value::Undefined) = (lhs, rhs) {
        return Value::Undefined;
    }
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => match op {
            BinaryOp::Add => Value::Int(a.wrapping_add(*b)),
            BinaryOp::Sub => Value::Int(a.wrapping_sub(*b)),
            BinaryOp::Mul => Value::Int(a.wrapping_mul(*b)),
            BinaryOp::Div => {
                if *b == 0 {
                    Value::Error
                } else {
                    Value::Int(a.wrapping_div(*b))
                }
            }
            _ => Value::Error,
        },
        (a, b) if a.is_numeric() && b.is_numeric() => {
            let (x, y) = (a.as_f64().unwrap(), b.as_f64().unwrap());
            match op {
                BinaryOp::Add => Value::Real(x + y),
                BinaryOp::Sub => Value::Real(x - y),
                BinaryOp::Mul => Value::Real(x * y),
                BinaryOp::Div => {
                    if y == 0.0 {
                        Value::Error
                    } else {
                        Value::Real(x / y)
                    }
                }
                _ => Value::Error,
            }
        }
        _ => Value::Error,
    }
}

// endregion: --- Arithmetic

// region:    --- Comparison

/// `< <= > >=`. Numeric pairs compare by value; Undefined/Error propagate; anything
/// else (including a String/String pair — ClassAd has no ordered string comparison) is
/// Error.
pub fn ordered_compare(op: BinaryOp, lhs: &Value, rhs: &Value) -> Value {
    if let (Value::Error, _) | (_, Value::Error) = (lhs, rhs) {
        return Value::Error;
    }
    if let (Value::Undefined, _) | (_, Value::Undefined) = (lhs, rhs) {
        return Value::Undefined;
    }
    match (lhs.as_f64(), rhs.as_f64()) {
        (Some(a), Some(b)) => {
            let result = match op {
                BinaryOp::Lt => a < b,
                BinaryOp::Le => a <= b,
                BinaryOp::Gt => a > b,
                BinaryOp::Ge => a >= b,
                _ => return Value::Error,
            };
            Value::Bool(result)
        }
        _ => Value::Error,
    }
}

/// `== !=`, the three-valued equality: numeric cross-compares by value, strings
/// compare case-insensitively, Bool compares by value; Undefined/Error propagate;
/// any other mismatched pair is Error.
pub fn equality(op: BinaryOp, lhs: &Value, rhs: &Value) -> Value {
    if let (Value::Error, _) | (_, Value::Error) = (lhs, rhs) {
        return Value::Error;
    }
    if let (Value::Undefined, _) | (_, Value::Undefined) = (lhs, rhs) {
        return Value::Undefined;
    }
    let eq = match (lhs, rhs) {
        (a, b) if a.is_numeric() && b.is_numeric() => a.as_f64() == b.as_f64(),
        (Value::Str(a), Value::Str(b)) => a.eq_ignore_ascii_case(b),
        (Value::Bool(a), Value::Bool(b)) => a == b,
        _ => return Value::Error,
    };
    Value::Bool(if op == BinaryOp::Eq { eq } else { !eq })
}

/// `is` / `isnt` (`=?=` / `=!=`): total, Bool-only identity. Strings compare
/// case-sensitively here, unlike `==`. Never yields Undefined or Error.
pub fn meta_equal(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => a == b,
        (Value::Real(a), Value::Real(b)) => a.to_bits() == b.to_bits() || a == b,
        (Value::Str(a), Value::Str(b)) => a.as_ref() == b.as_ref(),
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::List(a), Value::List(b)) => {
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| meta_equal(x, y))
        }
        (Value::Record(a), Value::Record(b)) => a == b,
        (Value::Undefined, Value::Undefined) => true,
        (Value::Error, Value::Error) => true,
        _ => false,
    }
}

// endregion: --- Comparison

// region:    --- Logical

/// `&&`: see the truth table in SPEC_FULL.md §4.1. Non-Bool operands (other than
/// Undefined/Error, already handled) are Error.
pub fn logical_and(lhs: &Value, rhs: &Value) -> Value {
    match lhs {
        Value::Error => Value::Error,
        Value::Bool(false) => Value::Bool(false),
        Value::Bool(true) => match rhs {
            Value::Bool(_) | Value::Undefined | Value::Error => rhs.clone(),
            _ => Value::Error,
        },
        Value::Undefined => match rhs {
            Value::Bool(false) => Value::Bool(false),
            Value::Bool(true) | Value::Undefined => Value::Undefined,
            Value::Error => Value::Error,
            _ => Value::Error,
        },
        _ => Value::Error,
    }
}

/// `||`: dual of `&&`, identity on `true`.
pub fn logical_or(lhs: &Value, rhs: &Value) -> Value {
    match lhs {
        Value::Error => Value::Error,
        Value::Bool(true) => Value::Bool(true),
        Value::Bool(false) => match rhs {
            Value::Bool(_) | Value::Undefined | Value::Error => rhs.clone(),
            _ => Value::Error,
        },
        Value::Undefined => match rhs {
            Value::Bool(true) => Value::Bool(true),
            Value::Bool(false) | Value::Undefined => Value::Undefined,
            Value::Error => Value::Error,
            _ => Value::Error,
        },
        _ => Value::Error,
    }
}

// endregion: --- Logical

// region:    --- Unary

pub fn unary(op: UnaryOp, operand: &Value) -> Value {
    match (op, operand) {
        (_, Value::Undefined) => Value::Undefined,
        (_, Value::Error) => Value::Error,
        (UnaryOp::Not, Value::Bool(b)) => Value::Bool(!b),
        (UnaryOp::Not, _) => Value::Error,
        (UnaryOp::Neg, Value::Int(i)) => Value::Int(-i),
        (UnaryOp::Neg, Value::Real(r)) => Value::Real(-r),
        (UnaryOp::Neg, _) => Value::Error,
    }
}

// endregion: --- Unary

// region:    --- Binary dispatch

/// Single entry point used by the evaluator for every `Binary` AST node: one
/// exhaustive match keyed on the operator, delegating to the family functions above.
/// This is the "no double dispatch" table called for in SPEC_FULL.md §9.
pub fn binary(op: BinaryOp, lhs: Value, rhs: Value) -> Value {
    match op {
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
            arithmetic(op, &lhs, &rhs)
        }
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            ordered_compare(op, &lhs, &rhs)
        }
        BinaryOp::Eq | BinaryOp::Ne => equality(op, &lhs, &rhs),
        BinaryOp::Is => Value::Bool(meta_equal(&lhs, &rhs)),
        BinaryOp::Isnt => Value::Bool(!meta_equal(&lhs, &rhs)),
        BinaryOp::And => logical_and(&lhs, &rhs),
        BinaryOp::Or => logical_or(&lhs, &rhs),
    }
}

// endregion: --- Binary dispatch
