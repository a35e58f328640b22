//! Line diff between a stored tape file and its canonical rendering.
//!
//! The two documents are walked in lockstep, so a single altered row
//! yields exactly one remove/add pair. Comment lines (`#`) in the stored
//! document never match or mismatch anything; they are stepped over and
//! survive repair untouched.

use std::fmt;
use serde::{Serialize, Deserialize};

/// One positional edit. `index` is the splice position in the document
/// being repaired at the moment the edit is applied, edits applied in
/// order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Edit {
    /// Delete the stored line at `index`.
    Remove { index: usize, line: String },
    /// Insert the canonical line at `index`.
    Add { index: usize, line: String },
}

impl Edit {
    /// Splice position of the edit.
    pub fn index(&self) -> usize {
        match self {
            Edit::Remove { index, .. } | Edit::Add { index, .. } => *index,
        }
    }
}

impl fmt::Display for Edit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Edit::Remove { line, .. } => write!(f, "-{}", line),
            Edit::Add { line, .. } => write!(f, "+{}", line),
        }
    }
}

/// Result of comparing two documents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diff {
    /// Mismatched line pairs plus unmatched lines on either side.
    pub mismatches: usize,
    /// Edits that turn the stored document into the canonical one.
    pub edits: Vec<Edit>,
}

impl Diff {
    /// Whether the documents agree line for line.
    pub fn is_clean(&self) -> bool {
        self.mismatches == 0
    }

    /// Apply the edits to `lines`, producing the repaired document.
    pub fn apply(&self, lines: &[String]) -> Vec<String> {
        let mut repaired = lines.to_vec();
        for edit in &self.edits {
            match edit {
                Edit::Remove { index, .. } => {
                    if *index < repaired.len() {
                        repaired.remove(*index);
                    }
                }
                Edit::Add { index, line } => {
                    let at = (*index).min(repaired.len());
                    repaired.insert(at, line.trim().to_string());
                }
            }
        }
        repaired
    }
}

impl fmt::Display for Diff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Diff ({} lines):", self.mismatches)?;
        for edit in &self.edits {
            writeln!(f, "{}", edit)?;
        }
        Ok(())
    }
}

fn is_comment(line: &str) -> bool {
    line.starts_with('#')
}

/// Compare the `canonical` rendering against the `stored` lines.
pub fn diff(canonical: &[String], stored: &[String]) -> Diff {
    let mut result = Diff::default();
    let mut a = 0;
    let mut b = 0;

    while a < canonical.len() && b < stored.len() {
        if is_comment(&stored[b]) {
            b += 1;
            continue;
        }

        if canonical[a].trim() != stored[b].trim() {
            result.mismatches += 1;
            result.edits.push(Edit::Remove { index: b, line: stored[b].clone() });
            result.edits.push(Edit::Add { index: b, line: canonical[a].clone() });
        }

        a += 1;
        b += 1;
    }

    // Surplus stored lines. Each removal shifts the rest down by one.
    let mut removed = 0;
    for (index, line) in stored.iter().enumerate().skip(b) {
        if is_comment(line) {
            continue;
        }
        result.mismatches += 1;
        result.edits.push(Edit::Remove { index: index - removed, line: line.clone() });
        removed += 1;
    }

    // Missing canonical lines, appended after the stored document.
    let mut at = stored.len().max(b);
    for line in &canonical[a..] {
        result.mismatches += 1;
        result.edits.push(Edit::Add { index: at, line: line.clone() });
        at += 1;
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(text: &[&str]) -> Vec<String> {
        text.iter().map(|line| line.to_string()).collect()
    }

    #[test]
    fn test_identical_documents() {
        let doc = lines(&["one", "two", "three"]);
        let result = diff(&doc, &doc);
        assert!(result.is_clean());
        assert!(result.edits.is_empty());
    }

    #[test]
    fn test_whitespace_is_ignored() {
        let canonical = lines(&["ADD    1    2    3 "]);
        let stored = lines(&["  ADD    1    2    3"]);
        assert!(diff(&canonical, &stored).is_clean());
    }

    #[test]
    fn test_single_altered_line() {
        let canonical = lines(&["one", "two", "three"]);
        let stored = lines(&["one", "TWO", "three"]);

        let result = diff(&canonical, &stored);
        assert_eq!(result.mismatches, 1);
        assert_eq!(result.edits, vec![
            Edit::Remove { index: 1, line: "TWO".into() },
            Edit::Add { index: 1, line: "two".into() },
        ]);
        assert_eq!(result.apply(&stored), canonical);
    }

    #[test]
    fn test_surplus_stored_lines() {
        let canonical = lines(&["one"]);
        let stored = lines(&["one", "two", "# note", "three"]);

        let result = diff(&canonical, &stored);
        assert_eq!(result.mismatches, 2);
        assert_eq!(result.edits[0].index(), 1);
        assert_eq!(result.edits[1].index(), 2);
        assert_eq!(result.apply(&stored), lines(&["one", "# note"]));
    }

    #[test]
    fn test_missing_lines_are_appended() {
        let canonical = lines(&["one", "two", "three"]);
        let stored = lines(&["one"]);

        let result = diff(&canonical, &stored);
        assert_eq!(result.mismatches, 2);
        assert_eq!(result.apply(&stored), canonical);
    }

    #[test]
    fn test_comments_are_transparent() {
        let canonical = lines(&["one", "two"]);
        let stored = lines(&["# header", "one", "# between", "two"]);
        assert!(diff(&canonical, &stored).is_clean());

        let altered = lines(&["# header", "one", "# between", "2"]);
        let result = diff(&canonical, &altered);
        assert_eq!(result.mismatches, 1);
        assert_eq!(result.apply(&altered), stored);
    }

    #[test]
    fn test_display() {
        let result = diff(&lines(&["a"]), &lines(&["b"]));
        assert_eq!(result.to_string(), "Diff (1 lines):\n-b\n+a\n");
    }
}
