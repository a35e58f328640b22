//! Arithmetic and bitwise operators.
//!
//! Operands arrive sign-extended to 64 bits and results are returned
//! unwrapped; truncation to the instruction's width happens when the
//! result is written back to the tape.

use crate::config::OverflowPolicy;
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// A two-operand operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    And,
    Or,
    Xor,
    Nor,
}

/// Errors raised while evaluating an operator.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ArithError {
    #[error("division by zero: {dividend} / 0")]
    DivisionByZero { dividend: i64 },

    /// The quotient is not an integer. Only raised under
    /// [`OverflowPolicy::Trap`], where the legacy machine refused to store
    /// fractional or undefined results.
    #[error("attempted to write non-integer value: {dividend} / {divisor}")]
    NonIntegerValue { dividend: i64, divisor: i64 },
}

/// Evaluate `lhs <op> rhs`.
pub fn evaluate(op: BinaryOp, lhs: i64, rhs: i64, policy: OverflowPolicy) -> Result<i64, ArithError> {
    let value = match op {
        BinaryOp::Add => lhs.wrapping_add(rhs),
        BinaryOp::Sub => lhs.wrapping_sub(rhs),
        BinaryOp::Mul => lhs.wrapping_mul(rhs),
        BinaryOp::Div => divide(lhs, rhs, policy)?,
        BinaryOp::Mod => remainder(lhs, rhs, policy)?,
        BinaryOp::And => lhs & rhs,
        BinaryOp::Or => lhs | rhs,
        BinaryOp::Xor => lhs ^ rhs,
        BinaryOp::Nor => !(lhs | rhs),
    };
    Ok(value)
}

/// Bitwise complement.
#[inline]
pub fn not(value: i64) -> i64 {
    !value
}

/// Truncating division.
pub fn divide(lhs: i64, rhs: i64, policy: OverflowPolicy) -> Result<i64, ArithError> {
    match policy {
        OverflowPolicy::Wrap => {
            if rhs == 0 {
                return Err(ArithError::DivisionByZero { dividend: lhs });
            }
            Ok(lhs.wrapping_div(rhs))
        }
        OverflowPolicy::Trap => {
            if rhs == 0 || lhs.wrapping_rem(rhs) != 0 {
                return Err(ArithError::NonIntegerValue { dividend: lhs, divisor: rhs });
            }
            Ok(lhs.wrapping_div(rhs))
        }
    }
}

/// Remainder with the sign of the dividend.
pub fn remainder(lhs: i64, rhs: i64, policy: OverflowPolicy) -> Result<i64, ArithError> {
    if rhs == 0 {
        return Err(match policy {
            OverflowPolicy::Wrap => ArithError::DivisionByZero { dividend: lhs },
            OverflowPolicy::Trap => ArithError::NonIntegerValue { dividend: lhs, divisor: rhs },
        });
    }
    Ok(lhs.wrapping_rem(rhs))
}
