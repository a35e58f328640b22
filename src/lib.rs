//! # Tape VM
//!
//! A small virtual machine that executes a byte tape.
//!
//! Programs and data share one linear memory of byte cells. Instructions
//! are four-cell rows `[opcode, a, b, c]` operating on signed 8, 16 and
//! 32-bit little-endian values, with three page-offset registers that
//! extend the 8-bit operands to the whole tape.
//!
//! ```
//! use tape::vm::{Engine, Exit, Instruction, Op};
//! use tape::vm::decode::assemble;
//!
//! let image = assemble(&[
//!     Instruction::new(Op::Prn, 9, 0, 0),
//!     Instruction::new(Op::End, 0, 0, 0),
//!     Instruction::new(Op::Nop, 42, 0, 0),
//! ]);
//!
//! let mut engine = Engine::new();
//! engine.load_program(&image).unwrap();
//!
//! let mut out = Vec::new();
//! let summary = engine.run(&mut out).unwrap();
//! assert_eq!(summary.exit, Exit::Halted);
//! assert_eq!(out, b"42");
//! ```

pub mod word;
pub mod config;
pub mod vm;
pub mod text;

// Re-export commonly used types
pub use word::{Width, BinaryOp, ArithError};
pub use config::{MachineConfig, OverflowPolicy, ConfigError};
pub use vm::{Engine, Exit, Fault, RunSummary, TapeError, Tape, Instruction, Op, Opcode, Row};
pub use text::{TapeFile, TapeFileError, Diff, load_tape, save_tape, format_tape};
