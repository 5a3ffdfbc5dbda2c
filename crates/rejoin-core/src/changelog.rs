//! Human-readable record of accepted merges.

use crate::error::{RejoinError, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// One accepted merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeLogEntry {
    /// Relative path of the file that holds the merged paragraph.
    pub file: String,
    pub text_a: String,
    pub text_b: String,
    pub merged: String,
}

impl ChangeLogEntry {
    fn render(&self) -> String {
        format!(
            "[{}]\nOriginal 1: {}\nOriginal 2: {}\nMerged: {}\n",
            self.file, self.text_a, self.text_b, self.merged
        )
    }
}

/// Render entries as blank-line-separated blocks.
#[must_use]
pub fn render_log(entries: &[ChangeLogEntry]) -> String {
    entries
        .iter()
        .map(ChangeLogEntry::render)
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Write the rendered log to `path`.
///
/// # Errors
///
/// Returns [`RejoinError::Persistence`] if the file cannot be written.
pub fn write_log(path: &Path, entries: &[ChangeLogEntry]) -> Result<()> {
    std::fs::write(path, render_log(entries)).map_err(|err| RejoinError::persistence(path, err))
}

/// `out/book.epub` → `out/book_log.txt`
#[must_use]
pub fn log_path_for(archive: &Path) -> PathBuf {
    let stem = archive
        .file_stem()
        .map_or_else(|| "rejoin".into(), |s| s.to_string_lossy().into_owned());
    archive.with_file_name(format!("{stem}_log.txt"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(file: &str, a: &str, b: &str) -> ChangeLogEntry {
        ChangeLogEntry {
            file: file.to_string(),
            text_a: a.to_string(),
            text_b: b.to_string(),
            merged: format!("{a} {b}"),
        }
    }

    #[test]
    fn blocks_are_separated_by_a_blank_line() {
        let log = render_log(&[
            entry("OEBPS/ch1.xhtml", "The sky was", "blue."),
            entry("OEBPS/ch2.xhtml", "She", "left."),
        ]);
        assert_eq!(
            log,
            "[OEBPS/ch1.xhtml]\nOriginal 1: The sky was\nOriginal 2: blue.\nMerged: The sky was blue.\n\
             \n\n\
             [OEBPS/ch2.xhtml]\nOriginal 1: She\nOriginal 2: left.\nMerged: She left.\n"
        );
    }

    #[test]
    fn empty_log_renders_empty() {
        assert_eq!(render_log(&[]), "");
    }

    #[test]
    fn log_path_sits_next_to_archive() {
        assert_eq!(
            log_path_for(Path::new("/out/My Book.epub")),
            PathBuf::from("/out/My Book_log.txt")
        );
        assert_eq!(log_path_for(Path::new("fixed")), PathBuf::from("fixed_log.txt"));
    }

    #[test]
    fn write_log_persists_rendered_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book_log.txt");
        let entries = [entry("a.xhtml", "x", "y")];
        write_log(&path, &entries).unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), render_log(&entries));
    }
}
