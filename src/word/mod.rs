//! Fixed-width two's-complement words.
//!
//! Tape cells are bytes, but instructions operate on values that span
//! one, two or four consecutive cells:
//! - [`Width`] - the operand width and its byte (de)composition
//! - [`arith`] - width-agnostic arithmetic and bitwise operators

mod width;
pub mod arith;

pub use width::Width;
pub use arith::{BinaryOp, ArithError};
