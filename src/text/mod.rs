//! Text representation of tapes.
//!
//! This module provides:
//! - The canonical formatter (tape image → one annotated line per row)
//! - The tape file loader and saver
//! - A line diff between a stored file and its canonical rendering

pub mod format;
pub mod tape_file;
pub mod diff;

pub use format::{format_instruction, format_row, format_tape, render};
pub use tape_file::{TapeFile, TapeFileError, load_tape, save_tape};
pub use diff::{diff, Diff, Edit};
