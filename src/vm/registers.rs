//! Engine registers.
//!
//! The machine exposes only two scalar registers, plus three page-offset
//! registers that extend the 8-bit operands:
//! - `ip`: address of the row being executed
//! - `next`: address of the row to execute afterwards (`ip + 4` unless a
//!   branch or halt overrides it)
//! - pages A, B, C: one multiplier per operand channel

use std::fmt;
use crate::config::PAGE_SIZE;
use serde::{Serialize, Deserialize};

/// `next` value written by the halt instruction.
pub const HALT: i64 = -1;

/// An operand channel. Each opcode routes its operands through fixed
/// channels (see [`crate::vm::decode::INSTRUCTION_SET`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    A,
    B,
    C,
}

/// The three page-offset registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PageOffsets {
    pub a: u8,
    pub b: u8,
    pub c: u8,
}

impl PageOffsets {
    pub const fn new(a: u8, b: u8, c: u8) -> Self {
        Self { a, b, c }
    }

    /// Offset register for a channel.
    #[inline]
    pub const fn get(&self, channel: Channel) -> u8 {
        match channel {
            Channel::A => self.a,
            Channel::B => self.b,
            Channel::C => self.c,
        }
    }

    /// Effective address: `raw + page * 256`.
    #[inline]
    pub fn translate(&self, raw: i64, channel: Channel) -> i64 {
        raw + self.get(channel) as i64 * PAGE_SIZE as i64
    }
}

impl fmt::Display for PageOffsets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.a, self.b, self.c)
    }
}

/// The register file.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Registers {
    /// Address of the current row.
    pub ip: usize,
    /// Address of the row to run after the current one.
    pub next: i64,
    /// Page offsets for channels A, B and C.
    pub pages: PageOffsets,
}

impl Registers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepare for a run starting at `entry`.
    pub fn reset(&mut self, entry: usize) {
        self.ip = entry;
        self.next = entry as i64;
        self.pages = PageOffsets::default();
    }

    /// Default successor of the current row.
    pub fn advance(&mut self) {
        self.next = self.ip as i64 + 4;
    }

    /// Branch to an absolute address.
    pub fn jump(&mut self, target: i64) {
        self.next = target;
    }

    /// Request a stop after the current row.
    pub fn halt(&mut self) {
        self.next = HALT;
    }

    /// Whether the last row executed was a halt.
    pub fn is_halted(&self) -> bool {
        self.next == HALT
    }
}
