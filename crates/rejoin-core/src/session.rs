//! Review session over a fixed queue of merge suggestions.
//!
//! The session owns the [`DocumentIndex`] and walks the suggestions in order.
//! Every forward decision pushes one [`UndoRecord`]; [`Session::back`] pops
//! one and applies its exact inverse:
//!
//! | record    | forward                 | inverse                          |
//! |-----------|-------------------------|----------------------------------|
//! | `Applied` | mutate `i`, remove `i+1`| revert `i`, reinsert `i+1`       |
//! | `Skipped` | nothing                 | nothing                          |
//!
//! # Chained suggestions
//!
//! Suggestions are computed once, so two can overlap: `(0, 1)` and `(1, 2)`.
//! Once the first is accepted, paragraph 1 is a tombstone. The second then
//! targets the nearest live paragraph before it (the one that absorbed 1), so
//! accepting both yields a single paragraph.
//!
//! # Persistence
//!
//! In [`PersistMode::Immediate`] touched files are written before
//! accept/back return. The cursor and history are updated first, so a
//! [`RejoinError::Persistence`] leaves the in-memory session ahead of disk.
//! In [`PersistMode::Deferred`] files are only marked dirty and written by
//! [`Session::flush`].

use crate::changelog::ChangeLogEntry;
use crate::config::PersistMode;
use crate::detect::{Suggestion, detect};
use crate::error::{RejoinError, Result};
use crate::index::{DocumentIndex, FileId};
use crate::markup::NodeId;
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// A suggestion is waiting for a decision.
    Active,
    /// Every suggestion has been decided.
    Done,
}

/// One forward decision, with what is needed to reverse it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoRecord {
    Applied {
        position: usize,
        /// Paragraph that received the merged text. Equals `position` unless
        /// an earlier merge absorbed it.
        target: usize,
        text_a: String,
        text_b: String,
        merged: String,
        replaced: Vec<NodeId>,
    },
    Skipped {
        position: usize,
    },
}

/// The pending suggestion as presented to a reviewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Current {
    /// 1-based.
    pub ordinal: usize,
    pub total: usize,
    pub position: usize,
    pub file: String,
    pub text_a: String,
    pub text_b: String,
    pub proposed: String,
}

#[derive(Debug)]
pub struct Session {
    index: DocumentIndex,
    suggestions: Vec<Suggestion>,
    cursor: usize,
    history: Vec<UndoRecord>,
    changelog: Vec<ChangeLogEntry>,
    persist: PersistMode,
    dirty: BTreeSet<FileId>,
}

impl Session {
    /// Run detection over `index` and start a session at the first suggestion.
    #[must_use]
    pub fn new(index: DocumentIndex, persist: PersistMode) -> Self {
        let suggestions = detect(&index.texts());
        info!(suggestions = suggestions.len(), "review session started");
        Self {
            index,
            suggestions,
            cursor: 0,
            history: Vec::new(),
            changelog: Vec::new(),
            persist,
            dirty: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        if self.cursor < self.suggestions.len() {
            SessionState::Active
        } else {
            SessionState::Done
        }
    }

    #[must_use]
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    #[must_use]
    pub fn suggestions(&self) -> &[Suggestion] {
        &self.suggestions
    }

    #[must_use]
    pub fn history(&self) -> &[UndoRecord] {
        &self.history
    }

    #[must_use]
    pub fn changelog(&self) -> &[ChangeLogEntry] {
        &self.changelog
    }

    #[must_use]
    pub const fn index(&self) -> &DocumentIndex {
        &self.index
    }

    /// Files written on the next [`Self::flush`].
    #[must_use]
    pub const fn dirty_files(&self) -> &BTreeSet<FileId> {
        &self.dirty
    }

    /// Number of accepted decisions still in history.
    #[must_use]
    pub fn accepted(&self) -> usize {
        self.history
            .iter()
            .filter(|r| matches!(r, UndoRecord::Applied { .. }))
            .count()
    }

    /// The suggestion at the cursor.
    ///
    /// # Errors
    ///
    /// Returns [`RejoinError::InvalidState`] once the session is done.
    pub fn current(&self) -> Result<Current> {
        let suggestion = self.pending("view")?;
        let target = self.target_of(suggestion.position)?;
        let first = &self.index.entry(target)?.text;
        Ok(Current {
            ordinal: self.cursor + 1,
            total: self.suggestions.len(),
            position: suggestion.position,
            file: self.index.file_name_of(target)?.to_string(),
            text_a: suggestion.text_a.clone(),
            text_b: suggestion.text_b.clone(),
            proposed: format!("{first} {}", suggestion.text_b),
        })
    }

    /// Merge the pending pair using `edited` as the combined text.
    ///
    /// # Errors
    ///
    /// Returns [`RejoinError::InvalidState`] when done, a markup error if the
    /// tree cannot be edited (nothing is changed), or
    /// [`RejoinError::Persistence`] if writing fails after the merge.
    pub fn accept(&mut self, edited: &str) -> Result<()> {
        let position = self.pending("accept")?.position;
        let second = position + 1;
        let target = self.target_of(position)?;
        let text_a = self.index.entry(target)?.text.clone();
        let text_b = self.index.entry(second)?.text.clone();
        let first_file = self.index.entry(target)?.file;
        let second_file = self.index.entry(second)?.file;

        let replaced = self.index.mutate(target, edited)?;
        if let Err(err) = self.index.remove(second) {
            self.index.revert(target, &text_a, replaced)?;
            return Err(err);
        }

        self.changelog.push(ChangeLogEntry {
            file: self.index.file_name_of(target)?.to_string(),
            text_a: text_a.clone(),
            text_b: text_b.clone(),
            merged: edited.to_string(),
        });
        self.history.push(UndoRecord::Applied {
            position,
            target,
            text_a,
            text_b,
            merged: edited.to_string(),
            replaced,
        });
        self.cursor += 1;
        info!(position, target, cursor = self.cursor, "accepted merge");

        self.touch(&[first_file, second_file])
    }

    /// Leave the pending pair as it is.
    ///
    /// # Errors
    ///
    /// Returns [`RejoinError::InvalidState`] when done.
    pub fn skip(&mut self) -> Result<()> {
        let position = self.pending("skip")?.position;
        self.history.push(UndoRecord::Skipped { position });
        self.cursor += 1;
        debug!(position, cursor = self.cursor, "skipped suggestion");
        Ok(())
    }

    /// Undo the most recent decision. The change log keeps its entry.
    ///
    /// # Errors
    ///
    /// Returns [`RejoinError::InvalidState`] with no history, a markup error
    /// if the tree cannot be restored, or [`RejoinError::Persistence`].
    pub fn back(&mut self) -> Result<()> {
        let Some(record) = self.history.last().cloned() else {
            return Err(RejoinError::InvalidState {
                op: "back",
                reason: "no decision to undo",
            });
        };

        let touched = match record {
            UndoRecord::Skipped { position } => {
                debug!(position, cursor = self.cursor - 1, "undid skip");
                None
            }
            UndoRecord::Applied {
                position,
                target,
                text_a,
                text_b,
                replaced,
                ..
            } => {
                let second = position + 1;
                self.index.revert(target, &text_a, replaced)?;
                self.index.reinsert(second, &text_b, target)?;
                info!(position, target, cursor = self.cursor - 1, "undid merge");
                Some([self.index.entry(target)?.file, self.index.entry(second)?.file])
            }
        };

        self.history.pop();
        self.cursor -= 1;
        touched.map_or(Ok(()), |files| self.touch(&files))
    }

    /// Write every dirty file. Returns how many were written.
    ///
    /// # Errors
    ///
    /// Returns [`RejoinError::Persistence`] on the first failed write; files
    /// not yet written stay dirty.
    pub fn flush(&mut self) -> Result<usize> {
        let mut written = 0;
        while let Some(&file) = self.dirty.first() {
            self.index.persist(file)?;
            self.dirty.remove(&file);
            written += 1;
        }
        if written > 0 {
            debug!(written, "flushed dirty files");
        }
        Ok(written)
    }

    fn pending(&self, op: &'static str) -> Result<&Suggestion> {
        self.suggestions
            .get(self.cursor)
            .ok_or(RejoinError::InvalidState {
                op,
                reason: "every suggestion has been decided",
            })
    }

    /// Nearest live paragraph at or before `position`.
    fn target_of(&self, position: usize) -> Result<usize> {
        let entries = self.index.entries();
        (0..=position)
            .rev()
            .find(|&i| entries.get(i).is_some_and(|e| !e.is_tombstoned()))
            .ok_or(RejoinError::UnknownParagraph(position))
    }

    fn touch(&mut self, files: &[FileId]) -> Result<()> {
        let mut unique: Vec<FileId> = files.to_vec();
        unique.dedup();
        match self.persist {
            PersistMode::Immediate => {
                for file in unique {
                    if let Err(err) = self.index.persist(file) {
                        warn!(error = %err, "working file left behind in-memory state");
                        self.dirty.insert(file);
                        return Err(err);
                    }
                }
                Ok(())
            }
            PersistMode::Deferred => {
                self.dirty.extend(unique);
                Ok(())
            }
        }
    }
}
