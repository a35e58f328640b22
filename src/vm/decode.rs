//! Instruction set and decoder.
//!
//! Every instruction occupies one row of four cells:
//! `[opcode, a, b, c]`. The low five bits of the opcode select the
//! operation; the bank above them selects the operand width:
//!
//! | Bank | Offset | Width  | Mnemonic suffix |
//! |------|--------|--------|-----------------|
//! | 0    | +0     | 8-bit  | (none)          |
//! | 1    | +32    | 16-bit | `2`             |
//! | 2    | +64    | 32-bit | `4`             |
//!
//! Only operations marked `widened` in [`INSTRUCTION_SET`] exist in banks
//! 1 and 2.

use std::fmt;
use crate::vm::registers::Channel;
use crate::word::Width;
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Opcode bits that select the operation.
const OP_MASK: u8 = 0x1f;

/// Distance between width banks.
const BANK_STRIDE: u8 = 32;

/// A base operation, numbered by its 8-bit opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Op {
    Nop = 0,
    Add = 1,
    Sub = 2,
    Mul = 3,
    Div = 4,
    Mod = 5,
    And = 6,
    Or = 7,
    Not = 8,
    Xor = 9,
    Nor = 10,
    End = 11,
    Prn = 12,
    Prs = 13,
    Jmp = 14,
    Jz = 15,
    Jnz = 16,
    Js = 17,
    Jns = 18,
    Pag = 19,
}

/// How an instruction uses one of its operand bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operand {
    /// Ignored.
    Unused,
    /// Address written by the instruction, paged through the channel.
    Dest(Channel),
    /// Address read by the instruction, paged through the channel.
    Source(Channel),
    /// Raw value, never paged.
    Literal,
}

/// Static description of one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpInfo {
    pub op: Op,
    pub mnemonic: &'static str,
    /// Leading operands the canonical listing renders without parentheses.
    pub bare: usize,
    /// Whether 16- and 32-bit variants exist.
    pub widened: bool,
    pub operands: [Operand; 3],
    /// Channel that pages a branch target after it is loaded.
    pub resolve: Option<Channel>,
}

use Channel::{A, B, C};
use Operand::{Dest, Literal, Source, Unused};

const fn binary(op: Op, mnemonic: &'static str) -> OpInfo {
    OpInfo {
        op,
        mnemonic,
        bare: 3,
        widened: true,
        operands: [Dest(A), Source(B), Source(C)],
        resolve: None,
    }
}

const fn branch(op: Op, mnemonic: &'static str, conditional: bool) -> OpInfo {
    OpInfo {
        op,
        mnemonic,
        bare: if conditional { 2 } else { 1 },
        widened: true,
        operands: [Source(A), if conditional { Source(B) } else { Unused }, Unused],
        resolve: Some(C),
    }
}

const fn bare(op: Op, mnemonic: &'static str) -> OpInfo {
    OpInfo {
        op,
        mnemonic,
        bare: 0,
        widened: false,
        operands: [Unused, Unused, Unused],
        resolve: None,
    }
}

/// The instruction set, indexed by base opcode.
pub static INSTRUCTION_SET: [OpInfo; 20] = [
    bare(Op::Nop, "NOP"),
    binary(Op::Add, "ADD"),
    binary(Op::Sub, "SUB"),
    binary(Op::Mul, "MUL"),
    binary(Op::Div, "DIV"),
    binary(Op::Mod, "MOD"),
    binary(Op::And, "AND"),
    binary(Op::Or, "OR"),
    OpInfo {
        op: Op::Not,
        mnemonic: "NOT",
        bare: 3,
        widened: true,
        operands: [Dest(A), Source(B), Unused],
        resolve: None,
    },
    binary(Op::Xor, "XOR"),
    binary(Op::Nor, "NOR"),
    bare(Op::End, "END"),
    OpInfo {
        op: Op::Prn,
        mnemonic: "PRN",
        bare: 1,
        widened: true,
        operands: [Source(A), Unused, Unused],
        resolve: None,
    },
    OpInfo {
        op: Op::Prs,
        mnemonic: "PRS",
        bare: 2,
        widened: false,
        operands: [Source(A), Literal, Unused],
        resolve: None,
    },
    branch(Op::Jmp, "JMP", false),
    branch(Op::Jz, "JZ", true),
    branch(Op::Jnz, "JNZ", true),
    branch(Op::Js, "JS", true),
    branch(Op::Jns, "JNS", true),
    OpInfo {
        op: Op::Pag,
        mnemonic: "PAG",
        bare: 3,
        widened: false,
        operands: [Literal, Literal, Literal],
        resolve: None,
    },
];

impl Op {
    /// Look up an operation by base opcode.
    pub fn from_code(code: u8) -> Option<Self> {
        INSTRUCTION_SET.get(code as usize).map(|info| info.op)
    }

    /// Base opcode.
    #[inline]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Table entry for this operation.
    #[inline]
    pub fn info(self) -> &'static OpInfo {
        &INSTRUCTION_SET[self as usize]
    }
}

/// An operation at a specific width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Opcode {
    pub op: Op,
    pub width: Width,
}

impl Opcode {
    /// Combine an operation and a width, if that variant exists.
    pub fn new(op: Op, width: Width) -> Option<Self> {
        if width != Width::Byte && !op.info().widened {
            return None;
        }
        Some(Self { op, width })
    }

    /// Decode an opcode byte.
    pub fn decode(byte: u8) -> Option<Self> {
        let width = Width::from_bank(byte / BANK_STRIDE)?;
        let op = Op::from_code(byte & OP_MASK)?;
        Self::new(op, width)
    }

    /// Encode back to an opcode byte.
    pub fn encode(self) -> u8 {
        self.width.bank() * BANK_STRIDE + self.op.code()
    }

    /// Mnemonic including the width suffix, e.g. `ADD2`.
    pub fn mnemonic(self) -> String {
        format!("{}{}", self.op.info().mnemonic, self.width.suffix())
    }
}

impl From<Op> for Opcode {
    fn from(op: Op) -> Self {
        Self { op, width: Width::Byte }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.mnemonic())
    }
}

/// Four raw cells: an opcode byte and three operand bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Row {
    pub opcode: u8,
    pub a: u8,
    pub b: u8,
    pub c: u8,
}

impl Row {
    /// Number of cells in a row.
    pub const SIZE: usize = 4;

    pub const fn new(opcode: u8, a: u8, b: u8, c: u8) -> Self {
        Self { opcode, a, b, c }
    }

    /// Build a row from up to four cells, zero-filling the rest.
    pub fn from_slice(cells: &[u8]) -> Self {
        let mut bytes = [0u8; Self::SIZE];
        for (slot, &cell) in bytes.iter_mut().zip(cells) {
            *slot = cell;
        }
        Self::from(bytes)
    }

    /// Cells in tape order.
    pub const fn to_bytes(self) -> [u8; 4] {
        [self.opcode, self.a, self.b, self.c]
    }

    /// The three operand bytes, `a` first.
    pub const fn operands(self) -> [u8; 3] {
        [self.a, self.b, self.c]
    }
}

impl From<[u8; 4]> for Row {
    fn from(bytes: [u8; 4]) -> Self {
        Self::new(bytes[0], bytes[1], bytes[2], bytes[3])
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} {}", self.opcode, self.a, self.b, self.c)
    }
}

/// A decoded row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub opcode: Opcode,
    pub a: u8,
    pub b: u8,
    pub c: u8,
}

impl Instruction {
    /// Build an instruction; a bare [`Op`] means its 8-bit variant.
    pub fn new(opcode: impl Into<Opcode>, a: u8, b: u8, c: u8) -> Self {
        Self { opcode: opcode.into(), a, b, c }
    }

    /// Table entry for the instruction's operation.
    #[inline]
    pub fn info(&self) -> &'static OpInfo {
        self.opcode.op.info()
    }

    /// Operand width selected by the opcode bank.
    #[inline]
    pub fn width(&self) -> Width {
        self.opcode.width
    }
}

/// Decode a row.
pub fn decode(row: Row) -> Result<Instruction, DecodeError> {
    let opcode = Opcode::decode(row.opcode).ok_or(DecodeError::InvalidOpcode(row.opcode))?;
    Ok(Instruction { opcode, a: row.a, b: row.b, c: row.c })
}

/// Encode an instruction as a row.
pub fn encode(instr: &Instruction) -> Row {
    Row::new(instr.opcode.encode(), instr.a, instr.b, instr.c)
}

/// Encode a sequence of instructions into a tape image.
pub fn assemble(program: &[Instruction]) -> Vec<u8> {
    program.iter().flat_map(|instr| encode(instr).to_bytes()).collect()
}

/// Errors that can occur during instruction decoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("invalid opcode: {0}")]
    InvalidOpcode(u8),
}
