//! Flat, ordered index of paragraph-like blocks across a book's markup files.
//!
//! Files are visited in lexicographic order of their path relative to the
//! extracted root; within a file, blocks appear in document order. The same
//! order is used for detection and for mutation, so index `i` always names
//! the same logical paragraph.
//!
//! Slots are never renumbered. Removing a paragraph tombstones its entry
//! (empty text, node detached) and keeps the slot so later indices stay
//! valid.

use crate::config::ScanConfig;
use crate::error::{RejoinError, Result};
use crate::markup::{Document, MarkupError, NodeId, Slot};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Position of a markup file in [`DocumentIndex::files`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FileId(usize);

/// One markup file and its live tree.
#[derive(Debug)]
pub struct MarkupFile {
    /// Path relative to the extracted root, `/`-separated.
    pub rel_path: String,
    path: PathBuf,
    doc: Document,
}

impl MarkupFile {
    /// Absolute path of the working copy.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub const fn document(&self) -> &Document {
        &self.doc
    }
}

/// A paragraph slot in the global sequence.
#[derive(Debug, Clone)]
pub struct ParagraphEntry {
    pub index: usize,
    /// Stripped text; empty once tombstoned.
    pub text: String,
    pub file: FileId,
    pub node: NodeId,
    /// Where the node sat before it was removed.
    detached: Option<Slot>,
}

impl ParagraphEntry {
    #[must_use]
    pub const fn is_tombstoned(&self) -> bool {
        self.detached.is_some()
    }
}

#[derive(Debug)]
pub struct DocumentIndex {
    root: PathBuf,
    files: Vec<MarkupFile>,
    entries: Vec<ParagraphEntry>,
}

impl DocumentIndex {
    /// Parse every markup file under `root` and index its blocks.
    ///
    /// # Errors
    ///
    /// Returns [`RejoinError::Markup`] if a markup file is not UTF-8 or does
    /// not tokenize, and [`RejoinError::Io`] if the tree cannot be walked.
    pub fn build(root: &Path, scan: &ScanConfig) -> Result<Self> {
        let mut paths = Vec::new();
        collect_markup_files(root, &scan.extensions, &mut paths)?;

        let mut files: Vec<MarkupFile> = paths
            .into_iter()
            .map(|path| load_file(relative_name(root, &path), path))
            .collect::<Result<_>>()?;
        files.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));

        let mut entries = Vec::new();
        for (file_idx, file) in files.iter().enumerate() {
            let before = entries.len();
            for node in file.doc.select(&scan.block_tags, scan.leaf_blocks_only) {
                let text = file.doc.stripped_text(node);
                if text.is_empty() {
                    continue;
                }
                entries.push(ParagraphEntry {
                    index: entries.len(),
                    text,
                    file: FileId(file_idx),
                    node,
                    detached: None,
                });
            }
            debug!(
                file = %file.rel_path,
                paragraphs = entries.len() - before,
                "indexed markup file"
            );
        }

        info!(
            root = %root.display(),
            files = files.len(),
            paragraphs = entries.len(),
            "document index built"
        );

        Ok(Self {
            root: root.to_path_buf(),
            files,
            entries,
        })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn entries(&self) -> &[ParagraphEntry] {
        &self.entries
    }

    /// Current text of every slot, tombstones included as empty strings.
    #[must_use]
    pub fn texts(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.text.as_str()).collect()
    }

    #[must_use]
    pub fn files(&self) -> &[MarkupFile] {
        &self.files
    }

    /// # Errors
    ///
    /// Returns [`RejoinError::UnknownParagraph`] for an out-of-range index.
    pub fn entry(&self, index: usize) -> Result<&ParagraphEntry> {
        self.entries
            .get(index)
            .ok_or(RejoinError::UnknownParagraph(index))
    }

    /// Markup file by id.
    ///
    /// # Panics
    ///
    /// Ids only come from this index, so an unknown id is a logic error.
    #[must_use]
    pub fn file(&self, id: FileId) -> &MarkupFile {
        &self.files[id.0]
    }

    /// Relative path of the file owning paragraph `index`.
    ///
    /// # Errors
    ///
    /// Returns [`RejoinError::UnknownParagraph`] for an out-of-range index.
    pub fn file_name_of(&self, index: usize) -> Result<&str> {
        let entry = self.entry(index)?;
        Ok(self.file(entry.file).rel_path.as_str())
    }

    /// Replace the text of paragraph `index`, keeping the element in place.
    ///
    /// Returns the element's previous children for [`Self::revert`].
    ///
    /// # Errors
    ///
    /// Returns [`RejoinError::UnknownParagraph`] or a markup error.
    pub fn mutate(&mut self, index: usize, text: &str) -> Result<Vec<NodeId>> {
        let (file, node) = self.locate(index)?;
        let previous = self.with_doc(file, |doc| doc.replace_text(node, text))?;
        self.entries[index].text = text.to_string();
        Ok(previous)
    }

    /// Exact inverse of [`Self::mutate`]: put the original children back.
    ///
    /// # Errors
    ///
    /// Returns [`RejoinError::UnknownParagraph`] or a markup error.
    pub fn revert(&mut self, index: usize, text: &str, children: Vec<NodeId>) -> Result<()> {
        let (file, node) = self.locate(index)?;
        self.with_doc(file, |doc| doc.restore_children(node, children))?;
        self.entries[index].text = text.to_string();
        Ok(())
    }

    /// Detach paragraph `index` from its parent and tombstone the entry.
    ///
    /// Returns where the element sat; the entry remembers it for
    /// [`Self::reinsert`].
    ///
    /// # Errors
    ///
    /// Returns [`RejoinError::UnknownParagraph`] or a markup error if the
    /// paragraph is already removed.
    pub fn remove(&mut self, index: usize) -> Result<Slot> {
        let (file, node) = self.locate(index)?;
        let slot = self.with_doc(file, |doc| doc.detach(node))?;
        let entry = &mut self.entries[index];
        entry.text.clear();
        entry.detached = Some(slot);
        Ok(slot)
    }

    /// Restore tombstoned paragraph `index` with `text`.
    ///
    /// The element goes back into the slot it was removed from. If that slot
    /// is gone, a fresh element with the same tag is created and attached as
    /// the next sibling of paragraph `after`.
    ///
    /// # Errors
    ///
    /// Returns [`RejoinError::InvalidState`] if paragraph `index` was not
    /// removed, [`RejoinError::UnknownParagraph`] for bad indices, or a
    /// markup error if neither placement is possible.
    pub fn reinsert(&mut self, index: usize, text: &str, after: usize) -> Result<()> {
        let (file, node) = self.locate(index)?;
        let (after_file, anchor) = self.locate(after)?;
        let Some(slot) = self.entries[index].detached else {
            return Err(RejoinError::InvalidState {
                op: "reinsert",
                reason: "paragraph is not removed",
            });
        };

        let restored = {
            let doc = &mut self.files[file.0].doc;
            doc.attach(node, slot).is_ok()
        };

        let node = if restored {
            let doc = &mut self.files[file.0].doc;
            if doc.stripped_text(node) != text.trim() {
                doc.replace_text(node, text)
                    .map_err(|err| markup_error(&self.files[file.0].path, &err))?;
            }
            node
        } else {
            debug!(index, after, "removed slot is gone, creating a new element");
            let tag = self.files[file.0]
                .doc
                .tag_name(node)
                .unwrap_or("p")
                .to_string();
            let doc = &mut self.files[after_file.0].doc;
            let created = doc.create_element(&tag, text);
            doc.insert_after(anchor, created)
                .map_err(|err| markup_error(&self.files[after_file.0].path, &err))?;
            created
        };

        let entry = &mut self.entries[index];
        entry.node = node;
        entry.text = text.to_string();
        entry.detached = None;
        if !restored {
            entry.file = after_file;
        }
        Ok(())
    }

    /// Serialize file `id` and write it to its working path.
    ///
    /// # Errors
    ///
    /// Returns [`RejoinError::Persistence`] if the write fails.
    pub fn persist(&self, id: FileId) -> Result<()> {
        let file = self.file(id);
        fs::write(&file.path, file.doc.serialize())
            .map_err(|err| RejoinError::persistence(&file.path, err))?;
        debug!(file = %file.rel_path, "persisted markup file");
        Ok(())
    }

    fn locate(&self, index: usize) -> Result<(FileId, NodeId)> {
        let entry = self.entry(index)?;
        Ok((entry.file, entry.node))
    }

    fn with_doc<T>(
        &mut self,
        file: FileId,
        f: impl FnOnce(&mut Document) -> Result<T, MarkupError>,
    ) -> Result<T> {
        let file = &mut self.files[file.0];
        f(&mut file.doc).map_err(|err| markup_error(&file.path, &err))
    }
}

fn markup_error(path: &Path, err: &MarkupError) -> RejoinError {
    RejoinError::Markup {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}

fn load_file(rel_path: String, path: PathBuf) -> Result<MarkupFile> {
    let bytes = fs::read(&path)?;
    let source = String::from_utf8(bytes).map_err(|err| RejoinError::Markup {
        path: path.clone(),
        message: format!("not valid UTF-8: {err}"),
    })?;
    let doc = Document::parse(&source).map_err(|err| markup_error(&path, &err))?;
    Ok(MarkupFile {
        rel_path,
        path,
        doc,
    })
}

fn collect_markup_files(dir: &Path, extensions: &[String], out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_markup_files(&path, extensions, out)?;
        } else if has_extension(&path, extensions) {
            out.push(path);
        }
    }
    Ok(())
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|want| want.eq_ignore_ascii_case(ext)))
}

/// `root/OEBPS/Text/ch1.xhtml` → `OEBPS/Text/ch1.xhtml`
pub(crate) fn relative_name(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, body: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, body).unwrap();
    }

    fn book() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "OEBPS/ch2.xhtml",
            "<html><body>\n<p>Next, she</p>\n<p>left early.</p>\n</body></html>",
        );
        write(
            dir.path(),
            "OEBPS/ch1.xhtml",
            "<html><body>\n<p class=\"x\">The sky was</p>\n<p>blue that day.</p>\n<p>  </p>\n</body></html>",
        );
        write(dir.path(), "OEBPS/styles.css", "p { margin: 0 }");
        write(dir.path(), "OEBPS/nav.html", "<html><body><nav/></body></html>");
        dir
    }

    #[test]
    fn build_orders_files_lexicographically_and_skips_empty_blocks() {
        let dir = book();
        let index = DocumentIndex::build(dir.path(), &ScanConfig::default()).unwrap();
        assert_eq!(
            index.texts(),
            vec!["The sky was", "blue that day.", "Next, she", "left early."]
        );
        assert_eq!(index.file_name_of(0).unwrap(), "OEBPS/ch1.xhtml");
        assert_eq!(index.file_name_of(2).unwrap(), "OEBPS/ch2.xhtml");
        assert_eq!(index.files().len(), 3);
        for (i, entry) in index.entries().iter().enumerate() {
            assert_eq!(entry.index, i);
        }
    }

    #[test]
    fn mutate_and_remove_keep_slots() {
        let dir = book();
        let mut index = DocumentIndex::build(dir.path(), &ScanConfig::default()).unwrap();
        index.mutate(0, "The sky was blue that day.").unwrap();
        index.remove(1).unwrap();

        assert_eq!(
            index.texts(),
            vec!["The sky was blue that day.", "", "Next, she", "left early."]
        );
        assert!(index.entry(1).unwrap().is_tombstoned());
        let file = index.file(index.entry(0).unwrap().file);
        assert_eq!(
            file.document().serialize(),
            "<html><body>\n<p class=\"x\">The sky was blue that day.</p>\n\n<p>  </p>\n</body></html>"
        );
    }

    #[test]
    fn revert_and_reinsert_restore_exact_tree() {
        let dir = book();
        let mut index = DocumentIndex::build(dir.path(), &ScanConfig::default()).unwrap();
        let file = index.entry(0).unwrap().file;
        let before = index.file(file).document().serialize();

        let children = index.mutate(0, "merged").unwrap();
        index.remove(1).unwrap();
        index.revert(0, "The sky was", children).unwrap();
        index.reinsert(1, "blue that day.", 0).unwrap();

        assert_eq!(index.file(file).document().serialize(), before);
        assert!(!index.entry(1).unwrap().is_tombstoned());
        assert_eq!(index.texts()[..2], ["The sky was", "blue that day."]);
    }

    #[test]
    fn reinsert_requires_a_removed_paragraph() {
        let dir = book();
        let mut index = DocumentIndex::build(dir.path(), &ScanConfig::default()).unwrap();
        let err = index.reinsert(1, "blue that day.", 0).unwrap_err();
        assert!(matches!(err, RejoinError::InvalidState { op: "reinsert", .. }));
    }

    #[test]
    fn removing_twice_is_a_markup_error() {
        let dir = book();
        let mut index = DocumentIndex::build(dir.path(), &ScanConfig::default()).unwrap();
        index.remove(1).unwrap();
        assert!(matches!(index.remove(1), Err(RejoinError::Markup { .. })));
    }

    #[test]
    fn unknown_index_is_reported() {
        let dir = book();
        let mut index = DocumentIndex::build(dir.path(), &ScanConfig::default()).unwrap();
        assert!(matches!(
            index.mutate(99, "x"),
            Err(RejoinError::UnknownParagraph(99))
        ));
    }

    #[test]
    fn persist_writes_serialized_tree() {
        let dir = book();
        let mut index = DocumentIndex::build(dir.path(), &ScanConfig::default()).unwrap();
        index.mutate(2, "Next, she left early.").unwrap();
        index.remove(3).unwrap();
        let file = index.entry(2).unwrap().file;
        index.persist(file).unwrap();

        let on_disk = fs::read_to_string(dir.path().join("OEBPS/ch2.xhtml")).unwrap();
        assert_eq!(
            on_disk,
            "<html><body>\n<p>Next, she left early.</p>\n\n</body></html>"
        );
    }

    #[test]
    fn non_utf8_markup_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bad.xhtml"), [0x3c, 0x70, 0x3e, 0xff, 0xfe]).unwrap();
        let err = DocumentIndex::build(dir.path(), &ScanConfig::default()).unwrap_err();
        assert!(matches!(err, RejoinError::Markup { .. }));
    }

    #[test]
    fn configured_tags_and_extensions_are_honored() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.htm", "<body><blockquote>quoted</blockquote><p>para</p></body>");
        let scan = ScanConfig {
            block_tags: vec!["blockquote".to_string()],
            extensions: vec!["htm".to_string()],
            leaf_blocks_only: true,
        };
        let index = DocumentIndex::build(dir.path(), &scan).unwrap();
        assert_eq!(index.texts(), vec!["quoted"]);
    }

    #[test]
    fn relative_names_use_forward_slashes() {
        let root = Path::new("/work");
        assert_eq!(
            relative_name(root, Path::new("/work/OEBPS/Text/ch1.xhtml")),
            "OEBPS/Text/ch1.xhtml"
        );
    }
}
