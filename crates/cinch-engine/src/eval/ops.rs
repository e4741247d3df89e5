//! Arithmetic, comparison and builtin operators on concrete atoms.

use cinch_core::value::{atoms_equal, compare_atoms};
use cinch_core::Value;

use crate::expr::{BinaryOp, Builtin, UnaryOp};

/// An operand is not yet known well enough to evaluate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Incomplete;

pub(crate) type EvalResult = Result<Value, Incomplete>;

fn require_atom(value: &Value) -> Result<(), Incomplete> {
    if value.is_atom() {
        Ok(())
    } else {
        Err(Incomplete)
    }
}

pub(crate) fn unary(op: UnaryOp, operand: &Value) -> EvalResult {
    require_atom(operand)?;
    let result = match (op, operand) {
        (UnaryOp::Neg, Value::Int(v)) => v
            .checked_neg()
            .map(Value::Int)
            .unwrap_or_else(|| Value::bottom("integer overflow")),
        (UnaryOp::Neg, Value::Float(v)) => Value::Float(-v),
        (UnaryOp::Not, Value::Bool(v)) => Value::Bool(!v),
        _ => Value::bottom(format!("invalid operand {} to '{}'", operand, op)),
    };
    Ok(result)
}

pub(crate) fn binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> EvalResult {
    require_atom(lhs)?;
    require_atom(rhs)?;

    let result = match op {
        BinaryOp::Add => match (lhs, rhs) {
            (Value::String(a), Value::String(b)) => Value::String(format!("{}{}", a, b)),
            _ => arithmetic(op, lhs, rhs, i64::checked_add, |a, b| a + b),
        },
        BinaryOp::Sub => arithmetic(op, lhs, rhs, i64::checked_sub, |a, b| a - b),
        BinaryOp::Mul => arithmetic(op, lhs, rhs, i64::checked_mul, |a, b| a * b),
        BinaryOp::Div => match (lhs.as_f64(), rhs.as_f64()) {
            (Some(_), Some(b)) if b == 0.0 => Value::bottom("division by zero"),
            (Some(a), Some(b)) => Value::Float(a / b),
            _ => invalid(op, lhs, rhs),
        },
        BinaryOp::Eq => Value::Bool(atoms_equal(lhs, rhs)),
        BinaryOp::Ne => Value::Bool(!atoms_equal(lhs, rhs)),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            match compare_atoms(lhs, rhs) {
                Some(ordering) => Value::Bool(match op {
                    BinaryOp::Lt => ordering.is_lt(),
                    BinaryOp::Le => ordering.is_le(),
                    BinaryOp::Gt => ordering.is_gt(),
                    _ => ordering.is_ge(),
                }),
                None => invalid(op, lhs, rhs),
            }
        }
        BinaryOp::And | BinaryOp::Or => match (lhs, rhs) {
            (Value::Bool(a), Value::Bool(b)) => Value::Bool(if op == BinaryOp::And {
                *a && *b
            } else {
                *a || *b
            }),
            _ => invalid(op, lhs, rhs),
        },
    };
    Ok(result)
}

fn arithmetic(
    op: BinaryOp,
    lhs: &Value,
    rhs: &Value,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Value {
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => int_op(*a, *b)
            .map(Value::Int)
            .unwrap_or_else(|| Value::bottom(format!("integer overflow in {} {} {}", a, op, b))),
        _ => match (lhs.as_f64(), rhs.as_f64()) {
            (Some(a), Some(b)) => Value::Float(float_op(a, b)),
            _ => invalid(op, lhs, rhs),
        },
    }
}

/// `div` and `mod` on integers, using Euclidean division.
pub(crate) fn integer_division(builtin: Builtin, lhs: &Value, rhs: &Value) -> EvalResult {
    require_atom(lhs)?;
    require_atom(rhs)?;
    let result = match (lhs, rhs) {
        (Value::Int(_), Value::Int(0)) => Value::bottom("division by zero"),
        (Value::Int(a), Value::Int(b)) => {
            let result = if builtin == Builtin::Mod {
                a.checked_rem_euclid(*b)
            } else {
                a.checked_div_euclid(*b)
            };
            result
                .map(Value::Int)
                .unwrap_or_else(|| Value::bottom("integer overflow"))
        }
        _ => Value::bottom(format!(
            "invalid arguments {} and {} to {}",
            lhs,
            rhs,
            builtin.name()
        )),
    };
    Ok(result)
}

fn invalid(op: BinaryOp, lhs: &Value, rhs: &Value) -> Value {
    Value::bottom(format!(
        "invalid operands {} and {} to '{}'",
        lhs, rhs, op
    ))
}
