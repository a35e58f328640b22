//! Canonical tape formatter.
//!
//! Every row renders as
//! `AAAA HHHHHHHH [BBB BBB BBB BBB] SSSS | MNEMONIC operands`:
//! decimal address, hex bytes, zero-padded decimal bytes, printable ASCII
//! and the decoded instruction. Operands the instruction does not use are
//! wrapped in parentheses.

use std::fmt::Write;
use crate::vm::decode::{Opcode, Row};

/// Render the mnemonic column of a row. Unknown opcodes render as an
/// empty string.
pub fn format_instruction(row: Row) -> String {
    let opcode = match Opcode::decode(row.opcode) {
        Some(opcode) => opcode,
        None => return String::new(),
    };
    let bare = opcode.op.info().bare;

    let mut text = format!("{:<4}", opcode.mnemonic());
    for (i, operand) in row.operands().iter().enumerate() {
        if i > 0 {
            text.push(' ');
        }
        text.push(if i == bare { '(' } else { ' ' });
        let _ = write!(text, "{:>3}", operand);
    }
    text.push(if bare < 3 { ')' } else { ' ' });
    text
}

/// Render one row at `address`.
pub fn format_row(address: usize, row: Row) -> String {
    let bytes = row.to_bytes();

    let hex: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
    let decimal: Vec<String> = bytes.iter().map(|b| format!("{:03}", b)).collect();
    let ascii: String = bytes.iter()
        .map(|&b| if (32..=126).contains(&b) { b as char } else { '.' })
        .collect();

    [
        format!("{:04}", address),
        hex,
        format!("[{}]", decimal.join(" ")),
        ascii,
        "|".to_string(),
        format_instruction(row),
    ].join(" ")
}

/// Render a tape image up to its last non-zero row.
pub fn format_tape(image: &[u8]) -> Vec<String> {
    let end = match image.iter().rposition(|&cell| cell != 0) {
        Some(last) => (last + 1).next_multiple_of(Row::SIZE),
        None => return Vec::new(),
    };

    (0..end)
        .step_by(Row::SIZE)
        .map(|address| {
            let stop = (address + Row::SIZE).min(image.len());
            format_row(address, Row::from_slice(&image[address..stop]))
        })
        .collect()
}

/// Render a tape image as a document with a trailing newline.
pub fn render(image: &[u8]) -> String {
    let mut text = String::new();
    for line in format_tape(image) {
        text.push_str(&line);
        text.push('\n');
    }
    text
}
