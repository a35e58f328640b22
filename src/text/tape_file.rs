//! Tape file format.
//!
//! A tape file is a canonical dump (see [`crate::text::format`]) that may
//! have been edited by hand:
//! - Only the bracketed decimal quadruple of each line is loaded
//! - Lines starting with `#` are comments
//! - Blank lines are ignored
//!
//! Everything else on a line is annotation. Annotations that no longer
//! agree with the bytes are reported as a [`Diff`] against the canonical
//! rendering.

use std::path::Path;
use crate::text::diff::{self, Diff};
use crate::text::format::{format_tape, render};
use crate::vm::decode::Row;
use thiserror::Error;

/// A loaded tape file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TapeFile {
    /// Program image, one row per data line.
    pub image: Vec<u8>,
    /// Non-blank source lines, comments included.
    pub lines: Vec<String>,
}

impl TapeFile {
    /// Parse tape file text for a tape of `capacity` cells.
    pub fn parse(text: &str, capacity: usize) -> Result<Self, TapeFileError> {
        let mut file = TapeFile::default();

        for (line_num, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            file.lines.push(line.to_string());

            if line.starts_with('#') {
                continue;
            }

            let row = match parse_quadruple(line) {
                Ok(Some(row)) => row,
                Ok(None) => continue,
                Err(message) => {
                    return Err(TapeFileError::Parse { line: line_num + 1, message });
                }
            };

            if file.image.len() + Row::SIZE > capacity {
                return Err(TapeFileError::ProgramTooLarge {
                    size: file.image.len() + Row::SIZE,
                    capacity,
                });
            }
            file.image.extend_from_slice(&row.to_bytes());
        }

        Ok(file)
    }

    /// Wrap a raw image. The lines are its canonical rendering.
    pub fn from_image(image: Vec<u8>) -> Self {
        let lines = format_tape(&image);
        Self { image, lines }
    }

    /// Canonical rendering of the loaded image.
    pub fn canonical(&self) -> Vec<String> {
        format_tape(&self.image)
    }

    /// Compare the source lines against the canonical rendering.
    pub fn diff(&self) -> Diff {
        diff::diff(&self.canonical(), &self.lines)
    }

    /// Fail with [`TapeFileError::CompilationMismatch`] unless the file is
    /// canonical.
    pub fn verify(&self) -> Result<(), TapeFileError> {
        let diff = self.diff();
        if diff.is_clean() {
            Ok(())
        } else {
            Err(TapeFileError::CompilationMismatch { diff })
        }
    }

    /// Source lines with every mismatch replaced by its canonical form.
    pub fn repair(&self) -> Vec<String> {
        self.diff().apply(&self.lines)
    }
}

/// Read the `[d d d d]` group of a line. `Ok(None)` if the line carries
/// no group at all.
fn parse_quadruple(line: &str) -> Result<Option<Row>, String> {
    let start = match line.find('[') {
        Some(start) => start,
        None => return Ok(None),
    };
    let end = line[start..].find(']')
        .map(|end| start + end)
        .ok_or_else(|| "unterminated '['".to_string())?;

    let fields: Vec<&str> = line[start + 1..end].split_whitespace().collect();
    if fields.len() != Row::SIZE {
        return Err(format!("expected 4 cells, found {}", fields.len()));
    }

    let mut bytes = [0u8; Row::SIZE];
    for (slot, field) in bytes.iter_mut().zip(&fields) {
        if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
            return Err(format!("invalid cell '{}'", field));
        }
        *slot = match field.parse::<u8>() {
            Ok(value) => value,
            Err(_) => return Err(format!("cell value {} exceeds 255", field)),
        };
    }

    Ok(Some(Row::from(bytes)))
}

/// Load a tape file from disk. Paths ending in `.bin` are read as raw
/// images.
pub fn load_tape<P: AsRef<Path>>(path: P, capacity: usize) -> Result<TapeFile, TapeFileError> {
    let path = path.as_ref();

    if path.extension().is_some_and(|ext| ext == "bin") {
        let image = std::fs::read(path)
            .map_err(|e| TapeFileError::Io(e.to_string()))?;
        if image.len() > capacity {
            return Err(TapeFileError::ProgramTooLarge { size: image.len(), capacity });
        }
        return Ok(TapeFile::from_image(image));
    }

    let text = std::fs::read_to_string(path)
        .map_err(|e| TapeFileError::Io(e.to_string()))?;
    TapeFile::parse(&text, capacity)
}

/// Write the canonical dump of `image` to disk.
pub fn save_tape<P: AsRef<Path>>(path: P, image: &[u8]) -> Result<(), TapeFileError> {
    std::fs::write(path.as_ref(), render(image))
        .map_err(|e| TapeFileError::Io(e.to_string()))
}

/// Errors that can occur during tape file operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TapeFileError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("program size {size} exceeds tape capacity {capacity}")]
    ProgramTooLarge { size: usize, capacity: usize },

    #[error("compilation failed: your program may behave inconsistently\n{diff}")]
    CompilationMismatch { diff: Diff },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TAPE_SIZE;

    const PROGRAM: &str = "\
0000 0c080000 [012 008 000 000] .... | PRN    8 (  0    0)
0004 0b000000 [011 000 000 000] .... | END (  0    0    0)
0008 14000000 [020 000 000 000] .... | 
";

    #[test]
    fn test_parse_canonical_file() {
        let file = TapeFile::parse(PROGRAM, TAPE_SIZE).unwrap();
        assert_eq!(file.image, vec![12, 8, 0, 0, 11, 0, 0, 0, 20, 0, 0, 0]);
        assert_eq!(file.lines.len(), 3);
        assert!(file.verify().is_ok());
    }

    #[test]
    fn test_roundtrip_through_canonical_text() {
        let image: Vec<u8> = vec![1, 10, 11, 12, 13, 65, 66, 0, 255, 0, 7, 1];
        let text = render(&image);
        let file = TapeFile::parse(&text, TAPE_SIZE).unwrap();
        assert_eq!(file.image, image);
        assert_eq!(file.canonical(), file.lines);
    }

    #[test]
    fn test_comments_and_blank_lines() {
        let text = format!("# countdown\n\n{}\n   \n# trailer\n", PROGRAM.trim_end());
        let file = TapeFile::parse(&text, TAPE_SIZE).unwrap();
        assert_eq!(file.image.len(), 12);
        assert_eq!(file.lines.len(), 5);
        assert!(file.diff().is_clean());
    }

    #[test]
    fn test_annotation_mismatch_and_repair() {
        let edited = PROGRAM.replace("[011 000 000 000] .... | END", "[001 004 005 006] .... | END");
        let file = TapeFile::parse(&edited, TAPE_SIZE).unwrap();

        let err = file.verify().unwrap_err();
        match &err {
            TapeFileError::CompilationMismatch { diff } => assert_eq!(diff.mismatches, 1),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().starts_with("compilation failed: your program may behave inconsistently\nDiff (1 lines):"));

        let repaired = file.repair();
        let reparsed = TapeFile::parse(&repaired.join("\n"), TAPE_SIZE).unwrap();
        assert_eq!(reparsed.image, file.image);
        assert!(reparsed.diff().is_clean());
    }

    #[test]
    fn test_lines_without_quadruple_are_not_loaded() {
        let text = format!("{}stray annotation\n", PROGRAM);
        let file = TapeFile::parse(&text, TAPE_SIZE).unwrap();
        assert_eq!(file.image.len(), 12);
        assert_eq!(file.diff().mismatches, 1);
        assert_eq!(file.repair(), file.canonical());
    }

    #[test]
    fn test_parse_errors() {
        let err = TapeFile::parse("0000 [001 300 000 000]", TAPE_SIZE).unwrap_err();
        assert_eq!(err, TapeFileError::Parse {
            line: 1,
            message: "cell value 300 exceeds 255".into(),
        });

        let err = TapeFile::parse("# c\n0000 [001 002 003]", TAPE_SIZE).unwrap_err();
        assert!(matches!(err, TapeFileError::Parse { line: 2, .. }));

        let err = TapeFile::parse("[1 2 x 4]", TAPE_SIZE).unwrap_err();
        assert!(matches!(err, TapeFileError::Parse { line: 1, .. }));

        let err = TapeFile::parse("[1 2 3 4", TAPE_SIZE).unwrap_err();
        assert!(matches!(err, TapeFileError::Parse { line: 1, .. }));
    }

    #[test]
    fn test_program_too_large() {
        let err = TapeFile::parse(PROGRAM, 8).unwrap_err();
        assert_eq!(err, TapeFileError::ProgramTooLarge { size: 12, capacity: 8 });
    }

    #[test]
    fn test_from_image() {
        let file = TapeFile::from_image(vec![11, 0, 0, 0]);
        assert_eq!(file.lines, vec!["0000 0b000000 [011 000 000 000] .... | END (  0    0    0)"]);
        assert!(file.verify().is_ok());
    }

    #[test]
    fn test_save_and_load() {
        let dir = std::env::temp_dir().join(format!("tape-file-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let text_path = dir.join("program.tape");
        save_tape(&text_path, &[12, 8, 0, 0, 11, 0, 0, 0]).unwrap();
        let saved = std::fs::read_to_string(&text_path).unwrap();
        assert!(saved.ends_with(")\n"));
        let file = load_tape(&text_path, TAPE_SIZE).unwrap();
        assert_eq!(file.image, vec![12, 8, 0, 0, 11, 0, 0, 0]);
        assert!(file.verify().is_ok());

        let bin_path = dir.join("program.bin");
        std::fs::write(&bin_path, [11u8, 0, 0, 0, 9]).unwrap();
        let file = load_tape(&bin_path, TAPE_SIZE).unwrap();
        assert_eq!(file.image, vec![11, 0, 0, 0, 9]);
        assert!(matches!(load_tape(&bin_path, 4), Err(TapeFileError::ProgramTooLarge { .. })));

        assert!(matches!(load_tape(dir.join("missing.tape"), TAPE_SIZE), Err(TapeFileError::Io(_))));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
