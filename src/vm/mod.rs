//! The tape machine.
//!
//! This module implements the complete execution core:
//! - a byte-addressable tape (4096 cells by default) with 8/16/32-bit access
//! - `ip`/`next` registers and three page-offset registers
//! - a 20-operation instruction set with width variants
//! - a nine-row execution history for postmortems

pub mod memory;
pub mod registers;
pub mod decode;
pub mod history;
pub mod execute;

pub use memory::{Tape, MemoryError};
pub use registers::{Registers, PageOffsets, Channel};
pub use decode::{Instruction, Op, Opcode, Row, DecodeError};
pub use history::{History, HistoryEntry, WriteEffect};
pub use execute::{Engine, Exit, Fault, Flow, RunSummary, TapeError};
