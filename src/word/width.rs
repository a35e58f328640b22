//! Operand widths.
//!
//! Values are stored little-endian, low byte first. Reading a value back
//! at the width it was written reproduces it modulo 2^(8·width), for both
//! the signed and the unsigned interpretation.

use std::fmt;
use serde::{Serialize, Deserialize};

/// The width of an instruction's memory operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Width {
    /// One cell (8 bits).
    #[default]
    Byte,
    /// Two cells (16 bits).
    Short,
    /// Four cells (32 bits).
    Word,
}

impl Width {
    /// All widths, narrowest first.
    pub const ALL: [Width; 3] = [Width::Byte, Width::Short, Width::Word];

    /// Number of tape cells covered by a value of this width.
    #[inline]
    pub const fn bytes(self) -> usize {
        match self {
            Width::Byte => 1,
            Width::Short => 2,
            Width::Word => 4,
        }
    }

    /// Number of bits in a value of this width.
    #[inline]
    pub const fn bits(self) -> u32 {
        self.bytes() as u32 * 8
    }

    /// Mask covering every bit of the width.
    #[inline]
    pub const fn mask(self) -> u64 {
        (1u64 << self.bits()) - 1
    }

    /// Largest magnitude allowed by the legacy symmetric range check.
    ///
    /// The original byte machine held values in -127..=127; wider cells
    /// follow the same shape.
    #[inline]
    pub const fn symmetric_limit(self) -> i64 {
        (1i64 << (self.bits() - 1)) - 1
    }

    /// Opcode bank that selects this width (see [`crate::vm::decode`]).
    #[inline]
    pub const fn bank(self) -> u8 {
        match self {
            Width::Byte => 0,
            Width::Short => 1,
            Width::Word => 2,
        }
    }

    /// Width selected by an opcode bank.
    pub const fn from_bank(bank: u8) -> Option<Self> {
        match bank {
            0 => Some(Width::Byte),
            1 => Some(Width::Short),
            2 => Some(Width::Word),
            _ => None,
        }
    }

    /// Mnemonic suffix: the width in bytes, omitted for single cells.
    pub const fn suffix(self) -> &'static str {
        match self {
            Width::Byte => "",
            Width::Short => "2",
            Width::Word => "4",
        }
    }

    /// Reinterpret a raw unsigned value as two's complement.
    ///
    /// Bits above the width are ignored.
    pub fn to_signed(self, raw: u64) -> i64 {
        let raw = raw & self.mask();
        let sign = 1u64 << (self.bits() - 1);
        if raw & sign != 0 {
            -(((!raw) & (sign - 1)) as i64 + 1)
        } else {
            raw as i64
        }
    }

    /// Truncate a value to this width, keeping the chosen interpretation.
    pub fn wrap(self, value: i64, signed: bool) -> i64 {
        let raw = value as u64 & self.mask();
        if signed {
            self.to_signed(raw)
        } else {
            raw as i64
        }
    }

    /// Split a value into its stored bytes, low byte first.
    pub fn to_bytes(self, value: i64) -> Vec<u8> {
        (0..self.bytes())
            .map(|i| (value >> (8 * i)) as u8)
            .collect()
    }

    /// Join little-endian bytes into a raw unsigned value.
    pub fn from_bytes(bytes: &[u8]) -> u64 {
        bytes
            .iter()
            .rev()
            .fold(0u64, |acc, &byte| (acc << 8) | byte as u64)
    }
}

impl fmt::Display for Width {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-bit", self.bits())
    }
}
