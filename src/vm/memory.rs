//! Tape memory.
//!
//! A fixed run of byte cells, zero-initialized. Every access is bounds
//! checked before any cell is touched, so a failed write leaves the tape
//! unchanged.

use crate::config::{OverflowPolicy, TAPE_SIZE};
use crate::word::Width;
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Byte-addressable tape.
#[derive(Clone, Serialize, Deserialize)]
pub struct Tape {
    cells: Vec<u8>,
    policy: OverflowPolicy,
}

impl Tape {
    /// Create a zeroed tape.
    pub fn new(capacity: usize, policy: OverflowPolicy) -> Self {
        Self {
            cells: vec![0; capacity],
            policy,
        }
    }

    /// Number of cells.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.cells.len()
    }

    /// How writes treat values outside the width's range.
    pub fn policy(&self) -> OverflowPolicy {
        self.policy
    }

    /// Raw cell contents.
    pub fn as_bytes(&self) -> &[u8] {
        &self.cells
    }

    /// Whether an address names a cell.
    #[inline]
    pub fn contains(&self, address: i64) -> bool {
        address >= 0 && (address as u64) < self.cells.len() as u64
    }

    /// Resolve `len` cells starting at `address` to a slice range, or the
    /// first address that falls off the tape.
    fn span(&self, address: i64, len: usize) -> Result<std::ops::Range<usize>, i64> {
        if address < 0 {
            return Err(address);
        }
        let end = address.saturating_add(len as i64);
        let capacity = self.cells.len() as i64;
        if end > capacity {
            return Err(address.max(capacity));
        }
        Ok(address as usize..end as usize)
    }

    /// Read `width` little-endian cells at `address`.
    pub fn read(&self, address: i64, signed: bool, width: Width) -> Result<i64, MemoryError> {
        let range = self.span(address, width.bytes())
            .map_err(MemoryError::OutOfBoundsRead)?;
        let raw = Width::from_bytes(&self.cells[range]);
        Ok(width.wrap(raw as i64, signed))
    }

    /// Borrow `len` consecutive cells.
    pub fn bytes(&self, address: i64, len: usize) -> Result<&[u8], MemoryError> {
        if len == 0 {
            return Ok(&[]);
        }
        let range = self.span(address, len)
            .map_err(MemoryError::OutOfBoundsRead)?;
        Ok(&self.cells[range])
    }

    /// Store `value` in `width` cells at `address`, truncating to the
    /// width. Returns the bytes actually stored.
    pub fn write(&mut self, address: i64, value: i64, width: Width) -> Result<Vec<u8>, MemoryError> {
        let range = self.span(address, width.bytes())
            .map_err(MemoryError::OutOfBoundsWrite)?;

        if self.policy == OverflowPolicy::Trap && value.unsigned_abs() > width.symmetric_limit() as u64 {
            return Err(MemoryError::Overflow { address, value });
        }

        let bytes = width.to_bytes(value);
        self.cells[range].copy_from_slice(&bytes);
        Ok(bytes)
    }

    /// Zero every cell.
    pub fn clear(&mut self) {
        self.cells.fill(0);
    }

    /// Replace the tape contents with a program image. Cells past the
    /// image are zeroed.
    pub fn load(&mut self, image: &[u8]) -> Result<(), MemoryError> {
        if image.len() > self.cells.len() {
            return Err(MemoryError::ProgramTooLarge {
                size: image.len(),
                capacity: self.cells.len(),
            });
        }

        self.clear();
        self.cells[..image.len()].copy_from_slice(image);
        Ok(())
    }
}

impl Default for Tape {
    fn default() -> Self {
        Self::new(TAPE_SIZE, OverflowPolicy::Wrap)
    }
}

impl std::fmt::Debug for Tape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let non_zero = self.cells.iter().filter(|&&cell| cell != 0).count();

        f.debug_struct("Tape")
            .field("non_zero_cells", &non_zero)
            .field("total_cells", &self.cells.len())
            .field("policy", &self.policy)
            .finish()
    }
}

/// Errors that can occur during tape access.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum MemoryError {
    #[error("attempted read out of bounds: {0}")]
    OutOfBoundsRead(i64),

    #[error("attempted write out of bounds: {0}")]
    OutOfBoundsWrite(i64),

    #[error("attempted write of overflow {value} at {address}")]
    Overflow { address: i64, value: i64 },

    #[error("program size {size} exceeds tape capacity {capacity}")]
    ProgramTooLarge { size: usize, capacity: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_write_byte() {
        let mut tape = Tape::default();
        let stored = tape.write(10, 42, Width::Byte).unwrap();
        assert_eq!(stored, vec![42]);
        assert_eq!(tape.read(10, false, Width::Byte).unwrap(), 42);
    }

    #[test]
    fn test_signed_reads() {
        let mut tape = Tape::default();
        tape.write(0, -1, Width::Byte).unwrap();
        assert_eq!(tape.read(0, true, Width::Byte).unwrap(), -1);
        assert_eq!(tape.read(0, false, Width::Byte).unwrap(), 255);

        tape.write(4, -300, Width::Short).unwrap();
        assert_eq!(tape.read(4, true, Width::Short).unwrap(), -300);
        assert_eq!(tape.as_bytes()[4..6], [0xd4, 0xfe]);
    }

    #[test]
    fn test_write_wraps() {
        let mut tape = Tape::default();
        let stored = tape.write(0, 128, Width::Byte).unwrap();
        assert_eq!(stored, vec![0x80]);
        assert_eq!(tape.read(0, true, Width::Byte).unwrap(), -128);

        tape.write(8, 1 << 32, Width::Word).unwrap();
        assert_eq!(tape.read(8, false, Width::Word).unwrap(), 0);
    }

    #[test]
    fn test_bounds() {
        let tape = Tape::default();
        assert_eq!(tape.read(-1, false, Width::Byte), Err(MemoryError::OutOfBoundsRead(-1)));
        assert_eq!(tape.read(4096, false, Width::Byte), Err(MemoryError::OutOfBoundsRead(4096)));
        assert_eq!(tape.read(4095, false, Width::Short), Err(MemoryError::OutOfBoundsRead(4096)));
        assert!(tape.read(4095, false, Width::Byte).is_ok());
    }

    #[test]
    fn test_failed_write_leaves_tape_untouched() {
        let mut tape = Tape::default();
        tape.write(4094, 7, Width::Short).unwrap();

        let err = tape.write(4094, -1, Width::Word).unwrap_err();
        assert_eq!(err, MemoryError::OutOfBoundsWrite(4096));
        assert_eq!(tape.as_bytes()[4094..], [7, 0]);

        assert_eq!(tape.write(-1, 1, Width::Byte), Err(MemoryError::OutOfBoundsWrite(-1)));
    }

    #[test]
    fn test_trap_policy() {
        let mut tape = Tape::new(256, OverflowPolicy::Trap);
        assert!(tape.write(0, 127, Width::Byte).is_ok());
        assert!(tape.write(0, -127, Width::Byte).is_ok());
        assert_eq!(
            tape.write(1, 200, Width::Byte),
            Err(MemoryError::Overflow { address: 1, value: 200 })
        );
        assert_eq!(
            tape.write(1, -128, Width::Byte),
            Err(MemoryError::Overflow { address: 1, value: -128 })
        );
        assert_eq!(tape.as_bytes()[1], 0);

        // bounds take precedence over the range check
        assert_eq!(tape.write(300, 500, Width::Byte), Err(MemoryError::OutOfBoundsWrite(300)));
    }

    #[test]
    fn test_bytes() {
        let mut tape = Tape::default();
        tape.load(b"HELLO").unwrap();
        assert_eq!(tape.bytes(1, 3).unwrap(), b"ELL");
        assert_eq!(tape.bytes(5000, 0).unwrap(), b"");
        assert_eq!(tape.bytes(4090, 10), Err(MemoryError::OutOfBoundsRead(4096)));
    }

    #[test]
    fn test_load_program() {
        let mut tape = Tape::new(8, OverflowPolicy::Wrap);
        tape.write(6, 9, Width::Byte).unwrap();
        tape.load(&[1, 2, 3]).unwrap();
        assert_eq!(tape.as_bytes(), &[1, 2, 3, 0, 0, 0, 0, 0]);

        let err = tape.load(&[0; 9]).unwrap_err();
        assert_eq!(err, MemoryError::ProgramTooLarge { size: 9, capacity: 8 });
    }
}
