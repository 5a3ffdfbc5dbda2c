//! Load, review, and save one book.

use crate::archive;
use crate::changelog::{log_path_for, write_log};
use crate::config::Config;
use crate::error::{RejoinError, Result};
use crate::index::DocumentIndex;
use crate::lock::WorkspaceLock;
use crate::session::{Current, Session, SessionState};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

const LOCK_TIMEOUT: Duration = Duration::from_millis(500);

/// Outcome of [`Editor::save`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaveReport {
    pub archive: PathBuf,
    pub log: PathBuf,
    /// Change-log entries written.
    pub changes: usize,
    /// Dirty working files written before packing.
    pub flushed: usize,
}

/// A loaded book with its review session.
///
/// Holds the working-directory lock until dropped.
#[derive(Debug)]
pub struct Editor {
    source: PathBuf,
    workdir: PathBuf,
    session: Session,
    _lock: WorkspaceLock,
}

impl Editor {
    /// Extract `path` into the configured working directory and start a session.
    ///
    /// # Errors
    ///
    /// Returns [`RejoinError::Lock`] if another editor owns the working
    /// directory, [`RejoinError::ArchiveFormat`] for an unusable archive, or
    /// [`RejoinError::Markup`] for an unparseable chapter file.
    pub fn load(path: &Path, config: &Config) -> Result<Self> {
        let workdir = config.session.resolved_workdir();
        let lock = WorkspaceLock::acquire(&workdir, LOCK_TIMEOUT)?;

        archive::extract(path, &workdir)?;
        let index = DocumentIndex::build(&workdir, &config.scan)?;
        let session = Session::new(index, config.session.persist);

        info!(
            source = %path.display(),
            suggestions = session.suggestions().len(),
            "book loaded"
        );
        Ok(Self {
            source: path.to_path_buf(),
            workdir,
            session,
            _lock: lock,
        })
    }

    #[must_use]
    pub fn source(&self) -> &Path {
        &self.source
    }

    #[must_use]
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    /// # Errors
    ///
    /// See [`Session::current`].
    pub fn current(&self) -> Result<Current> {
        self.session.current()
    }

    /// # Errors
    ///
    /// See [`Session::accept`].
    pub fn accept(&mut self, edited: &str) -> Result<()> {
        self.session.accept(edited)
    }

    /// # Errors
    ///
    /// See [`Session::skip`].
    pub fn skip(&mut self) -> Result<()> {
        self.session.skip()
    }

    /// # Errors
    ///
    /// See [`Session::back`].
    pub fn back(&mut self) -> Result<()> {
        self.session.back()
    }

    /// Write pending files, pack the working tree to `dest`, and write the
    /// change log next to it.
    ///
    /// # Errors
    ///
    /// Returns [`RejoinError::Persistence`] if any file cannot be written.
    pub fn save(&mut self, dest: &Path) -> Result<SaveReport> {
        let flushed = self.session.flush()?;

        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|err| RejoinError::persistence(parent, err))?;
        }
        archive::export(&self.workdir, dest)?;

        let log = log_path_for(dest);
        write_log(&log, self.session.changelog())?;

        let report = SaveReport {
            archive: dest.to_path_buf(),
            log,
            changes: self.session.changelog().len(),
            flushed,
        };
        info!(
            archive = %report.archive.display(),
            log = %report.log.display(),
            changes = report.changes,
            "book saved"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PersistMode, SessionConfig};
    use std::fs::File;
    use std::io::Write;
    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    fn epub(path: &Path, chapter: &str) {
        let mut writer = ZipWriter::new(File::create(path).unwrap());
        writer
            .start_file("mimetype", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"application/epub+zip").unwrap();
        writer
            .start_file("OEBPS/ch1.xhtml", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(chapter.as_bytes()).unwrap();
        writer.finish().unwrap();
    }

    fn config(workdir: &Path, persist: PersistMode) -> Config {
        Config {
            session: SessionConfig {
                persist,
                workdir: Some(workdir.to_path_buf()),
            },
            ..Config::default()
        }
    }

    #[test]
    fn load_accept_save_writes_archive_and_log() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("book.epub");
        epub(&input, "<html><body><p>He said</p><p>hello.</p></body></html>");

        let cfg = config(&dir.path().join("work"), PersistMode::Deferred);
        let mut editor = Editor::load(&input, &cfg).unwrap();
        assert_eq!(editor.state(), SessionState::Active);
        assert_eq!(editor.source(), input.as_path());
        assert!(editor.workdir().join("OEBPS/ch1.xhtml").is_file());
        editor.accept("He said hello.").unwrap();

        let report = editor.save(&dir.path().join("out/fixed.epub")).unwrap();
        assert_eq!(report.changes, 1);
        assert_eq!(report.flushed, 1);
        assert_eq!(report.log, dir.path().join("out/fixed_log.txt"));
        let log = std::fs::read_to_string(&report.log).unwrap();
        assert!(log.starts_with("[OEBPS/ch1.xhtml]\nOriginal 1: He said\n"));
        assert!(report.archive.exists());
    }

    #[test]
    fn second_editor_on_same_workdir_is_locked_out() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("book.epub");
        epub(&input, "<p>x</p>");

        let cfg = config(&dir.path().join("work"), PersistMode::Immediate);
        let first = Editor::load(&input, &cfg).unwrap();
        let err = Editor::load(&input, &cfg).unwrap_err();
        assert!(matches!(err, RejoinError::Lock(_)));

        drop(first);
        assert!(Editor::load(&input, &cfg).is_ok());
    }

    #[test]
    fn bad_archive_fails_load() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("book.epub");
        std::fs::write(&input, "nope").unwrap();

        let cfg = config(&dir.path().join("work"), PersistMode::Immediate);
        let err = Editor::load(&input, &cfg).unwrap_err();
        assert!(matches!(err, RejoinError::ArchiveFormat { .. }));
    }
}
