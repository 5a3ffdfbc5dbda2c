//! Editable markup tree for XHTML/HTML chapter files.
//!
//! The tree is an arena of nodes addressed by [`NodeId`]. Every node keeps
//! the exact source bytes it was parsed from, so a document that has not
//! been edited serializes back to its input byte-for-byte. Edits only ever
//! replace an element's children or move whole elements, which keeps the
//! untouched parts of a file verbatim.
//!
//! Detached nodes stay in the arena. That is what lets a merge be undone
//! exactly: the removed paragraph and the replaced children of the kept
//! paragraph are re-attached rather than rebuilt.
//!
//! # Parsing
//!
//! Tokenizing is delegated to `quick-xml` with end-name checking disabled
//! and unmatched end tags allowed.
//! HTML void elements (`<br>`, `<img>`, ...) never open a scope, and a
//! mismatched end tag closes the innermost open element with that name.
//! Stray end tags are kept as opaque nodes. End tags match their start tag
//! ignoring ASCII case, as HTML does.
//!
//! # Entities
//!
//! Text decodes numeric references and every HTML5 named entity. A
//! reference that still cannot be resolved is kept as a literal token, and
//! written back as-is rather than escaped a second time.

use quick_xml::Reader;
use quick_xml::escape::resolve_html5_entity;
use quick_xml::events::Event;
use std::borrow::Cow;

/// Handle to a node inside one [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Where a detached node used to live, for exact re-attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub parent: NodeId,
    pub position: usize,
}

/// Errors from parsing or editing a markup tree.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MarkupError {
    #[error("malformed markup at byte {offset}: {message}")]
    Parse { offset: usize, message: String },

    #[error("node {0:?} is not an element")]
    NotAnElement(NodeId),

    #[error("node {0:?} is not attached to the document")]
    Detached(NodeId),
}

#[derive(Debug, Clone)]
struct Element {
    /// Qualified name as written (`p`, `xhtml:p`).
    name: String,
    /// Start tag exactly as written, including `<` and `>`.
    open: String,
    /// End tag exactly as written. `None` for self-closing, void, or
    /// implicitly closed elements.
    close: Option<String>,
    self_closing: bool,
}

impl Element {
    fn local_name(&self) -> &str {
        self.name.rsplit(':').next().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone)]
enum NodeKind {
    Root,
    Element(Element),
    /// Character data, still escaped.
    Text(String),
    /// Full `<![CDATA[...]]>` section.
    CData(String),
    /// Comments, declarations, processing instructions, doctype, stray end tags.
    Opaque(String),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A parsed markup file.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    bom: bool,
}

const ROOT: NodeId = NodeId(0);

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

impl Document {
    fn empty(bom: bool) -> Self {
        Self {
            nodes: vec![Node {
                kind: NodeKind::Root,
                parent: None,
                children: Vec::new(),
            }],
            bom,
        }
    }

    /// Parse a markup file.
    ///
    /// # Errors
    ///
    /// Returns [`MarkupError::Parse`] when the tokenizer rejects the input.
    pub fn parse(source: &str) -> Result<Self, MarkupError> {
        let (bom, body) = source
            .strip_prefix('\u{feff}')
            .map_or((false, source), |rest| (true, rest));

        let mut reader = Reader::from_str(body);
        let config = reader.config_mut();
        config.trim_text(false);
        config.check_end_names = false;
        config.allow_unmatched_ends = true;
        config.expand_empty_elements = false;

        let mut doc = Self::empty(bom);
        let mut open: Vec<NodeId> = vec![ROOT];

        loop {
            let start = offset(&reader);
            let event = reader.read_event().map_err(|err| MarkupError::Parse {
                offset: offset(&reader),
                message: err.to_string(),
            })?;
            let end = offset(&reader);
            let raw = body.get(start..end).ok_or_else(|| MarkupError::Parse {
                offset: start,
                message: "event span is not on a character boundary".to_string(),
            })?;
            let parent = open.last().copied().unwrap_or(ROOT);

            match event {
                Event::Start(tag) => {
                    let name = String::from_utf8_lossy(tag.name().as_ref()).into_owned();
                    let void = is_void(&name);
                    let id = doc.push(
                        parent,
                        NodeKind::Element(Element {
                            name,
                            open: raw.to_owned(),
                            close: None,
                            self_closing: false,
                        }),
                    );
                    if !void {
                        open.push(id);
                    }
                }
                Event::Empty(tag) => {
                    let name = String::from_utf8_lossy(tag.name().as_ref()).into_owned();
                    doc.push(
                        parent,
                        NodeKind::Element(Element {
                            name,
                            open: raw.to_owned(),
                            close: None,
                            self_closing: true,
                        }),
                    );
                }
                Event::End(tag) => {
                    let name = String::from_utf8_lossy(tag.name().as_ref()).into_owned();
                    let depth = open
                        .iter()
                        .rposition(|&id| {
                            doc.element(id)
                                .is_some_and(|el| el.name.eq_ignore_ascii_case(&name))
                        });
                    match depth {
                        Some(depth) => {
                            let id = open[depth];
                            open.truncate(depth);
                            if let Some(el) = doc.element_mut(id) {
                                el.close = Some(raw.to_owned());
                            }
                        }
                        None => {
                            tracing::debug!(tag = %name, offset = start, "stray end tag kept verbatim");
                            doc.push(parent, NodeKind::Opaque(raw.to_owned()));
                        }
                    }
                }
                Event::Text(_) => {
                    doc.push(parent, NodeKind::Text(raw.to_owned()));
                }
                Event::CData(_) => {
                    doc.push(parent, NodeKind::CData(raw.to_owned()));
                }
                Event::Eof => break,
                _ => {
                    doc.push(parent, NodeKind::Opaque(raw.to_owned()));
                }
            }
        }

        Ok(doc)
    }

    fn push(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = self.alloc(kind);
        self.nodes[id.0].parent = Some(parent);
        self.nodes[parent.0].children.push(id);
        id
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    fn element(&self, id: NodeId) -> Option<&Element> {
        match self.node(id).map(|n| &n.kind) {
            Some(NodeKind::Element(el)) => Some(el),
            _ => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match self.nodes.get_mut(id.0).map(|n| &mut n.kind) {
            Some(NodeKind::Element(el)) => Some(el),
            _ => None,
        }
    }

    /// Qualified tag name of an element node.
    #[must_use]
    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|el| el.name.as_str())
    }

    /// All attached elements whose local name is in `tags` (ASCII
    /// case-insensitive), in document pre-order.
    ///
    /// With `leaf_only`, an element that has a matching descendant is
    /// left out so nested blocks are not reported twice.
    #[must_use]
    pub fn select<S: AsRef<str>>(&self, tags: &[S], leaf_only: bool) -> Vec<NodeId> {
        let mut found = Vec::new();
        self.collect_matches(ROOT, tags, leaf_only, &mut found);
        found
    }

    /// Returns whether the subtree under `id` contains a match (excluding `id`).
    fn collect_matches<S: AsRef<str>>(
        &self,
        id: NodeId,
        tags: &[S],
        leaf_only: bool,
        found: &mut Vec<NodeId>,
    ) -> bool {
        let matches_self = self.element(id).is_some_and(|el| {
            tags.iter()
                .any(|t| t.as_ref().eq_ignore_ascii_case(el.local_name()))
        });

        let slot = found.len();
        if matches_self {
            found.push(id);
        }

        let mut nested = false;
        if let Some(node) = self.node(id) {
            for &child in &node.children {
                nested |= self.collect_matches(child, tags, leaf_only, found);
            }
        }

        if matches_self && nested && leaf_only {
            found.remove(slot);
            if self.has_direct_text(id) {
                tracing::debug!(
                    tag = self.tag_name(id).unwrap_or_default(),
                    "container with its own text skipped in favour of nested blocks"
                );
            }
        }
        matches_self || nested
    }

    fn has_direct_text(&self, id: NodeId) -> bool {
        self.node(id).is_some_and(|node| {
            node.children.iter().any(|&child| {
                matches!(
                    self.node(child).map(|n| &n.kind),
                    Some(NodeKind::Text(raw)) if !decode_text(raw).trim().is_empty()
                )
            })
        })
    }

    /// Decoded text of every text and CDATA node under `id`, concatenated.
    #[must_use]
    pub fn text(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    /// [`Self::text`] with surrounding whitespace removed.
    #[must_use]
    pub fn stripped_text(&self, id: NodeId) -> String {
        self.text(id).trim().to_string()
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.node(id) else {
            return;
        };
        match &node.kind {
            NodeKind::Text(raw) => out.push_str(&decode_text(raw)),
            NodeKind::CData(raw) => out.push_str(cdata_body(raw)),
            NodeKind::Root | NodeKind::Element(_) => {
                for &child in &node.children {
                    self.collect_text(child, out);
                }
            }
            NodeKind::Opaque(_) => {}
        }
    }

    /// Replace everything inside element `id` with a single text node.
    ///
    /// Returns the children that were detached, in order, so they can be
    /// put back with [`Self::restore_children`].
    ///
    /// # Errors
    ///
    /// Returns [`MarkupError::NotAnElement`] if `id` is not an element.
    pub fn replace_text(&mut self, id: NodeId, text: &str) -> Result<Vec<NodeId>, MarkupError> {
        let el = self.element_mut(id).ok_or(MarkupError::NotAnElement(id))?;
        if el.self_closing {
            el.open = reopen_tag(&el.open);
            el.close = Some(format!("</{}>", el.name));
            el.self_closing = false;
        }

        let previous = std::mem::take(&mut self.nodes[id.0].children);
        for &child in &previous {
            self.nodes[child.0].parent = None;
        }
        self.push(id, NodeKind::Text(escape_text(text)));
        Ok(previous)
    }

    /// Put back children previously returned by [`Self::replace_text`].
    ///
    /// # Errors
    ///
    /// Returns [`MarkupError::NotAnElement`] if `id` is not an element.
    pub fn restore_children(
        &mut self,
        id: NodeId,
        children: Vec<NodeId>,
    ) -> Result<(), MarkupError> {
        if self.element(id).is_none() {
            return Err(MarkupError::NotAnElement(id));
        }
        let current = std::mem::take(&mut self.nodes[id.0].children);
        for child in current {
            self.nodes[child.0].parent = None;
        }
        for &child in &children {
            self.nodes[child.0].parent = Some(id);
        }
        self.nodes[id.0].children = children;
        Ok(())
    }

    /// Detach `id` from its parent, returning the slot it occupied.
    ///
    /// # Errors
    ///
    /// Returns [`MarkupError::Detached`] if the node has no parent.
    pub fn detach(&mut self, id: NodeId) -> Result<Slot, MarkupError> {
        let parent = self
            .node(id)
            .and_then(|n| n.parent)
            .ok_or(MarkupError::Detached(id))?;
        let siblings = &mut self.nodes[parent.0].children;
        let position = siblings
            .iter()
            .position(|&c| c == id)
            .ok_or(MarkupError::Detached(id))?;
        siblings.remove(position);
        self.nodes[id.0].parent = None;
        Ok(Slot { parent, position })
    }

    /// Re-attach a detached node at a previously recorded slot.
    ///
    /// The position is clamped to the parent's current child count.
    ///
    /// # Errors
    ///
    /// Returns [`MarkupError::Detached`] if the slot's parent is itself no
    /// longer part of the document.
    pub fn attach(&mut self, id: NodeId, slot: Slot) -> Result<(), MarkupError> {
        if !self.is_attached(slot.parent) {
            return Err(MarkupError::Detached(slot.parent));
        }
        let siblings = &mut self.nodes[slot.parent.0].children;
        let position = slot.position.min(siblings.len());
        siblings.insert(position, id);
        self.nodes[id.0].parent = Some(slot.parent);
        Ok(())
    }

    /// Attach `id` as the next sibling of `anchor`.
    ///
    /// # Errors
    ///
    /// Returns [`MarkupError::Detached`] if `anchor` has no parent.
    pub fn insert_after(&mut self, anchor: NodeId, id: NodeId) -> Result<(), MarkupError> {
        let parent = self
            .node(anchor)
            .and_then(|n| n.parent)
            .ok_or(MarkupError::Detached(anchor))?;
        let position = self.nodes[parent.0]
            .children
            .iter()
            .position(|&c| c == anchor)
            .ok_or(MarkupError::Detached(anchor))?;
        self.attach(
            id,
            Slot {
                parent,
                position: position + 1,
            },
        )
    }

    /// Create a detached `<name>text</name>` element.
    pub fn create_element(&mut self, name: &str, text: &str) -> NodeId {
        let id = self.alloc(NodeKind::Element(Element {
            name: name.to_string(),
            open: format!("<{name}>"),
            close: Some(format!("</{name}>")),
            self_closing: false,
        }));
        self.push(id, NodeKind::Text(escape_text(text)));
        id
    }

    /// Whether `id` is reachable from the document root.
    #[must_use]
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == ROOT {
                return true;
            }
            match self.node(current).and_then(|n| n.parent) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// Serialize the attached tree. Untouched regions are emitted verbatim.
    #[must_use]
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        if self.bom {
            out.push('\u{feff}');
        }
        self.write_node(ROOT, &mut out);
        out
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.node(id) else {
            return;
        };
        match &node.kind {
            NodeKind::Root => self.write_children(node, out),
            NodeKind::Element(el) => {
                out.push_str(&el.open);
                self.write_children(node, out);
                if let Some(close) = &el.close {
                    out.push_str(close);
                }
            }
            NodeKind::Text(raw) | NodeKind::CData(raw) | NodeKind::Opaque(raw) => {
                out.push_str(raw);
            }
        }
    }

    fn write_children(&self, node: &Node, out: &mut String) {
        for &child in &node.children {
            self.write_node(child, out);
        }
    }
}

fn offset(reader: &Reader<&[u8]>) -> usize {
    usize::try_from(reader.buffer_position()).unwrap_or(usize::MAX)
}

fn is_void(name: &str) -> bool {
    VOID_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(name))
}

/// `<p class="x"/>` → `<p class="x">`
fn reopen_tag(open: &str) -> String {
    let inner = open
        .trim_end_matches('>')
        .trim_end_matches('/')
        .trim_end();
    format!("{inner}>")
}

fn cdata_body(raw: &str) -> &str {
    raw.strip_prefix("<![CDATA[")
        .and_then(|s| s.strip_suffix("]]>"))
        .unwrap_or(raw)
}

/// Decode character and entity references in raw text.
///
/// Unresolvable references stay verbatim; a bare `&` stays a literal `&`.
fn decode_text(raw: &str) -> Cow<'_, str> {
    if !raw.contains('&') {
        return Cow::Borrowed(raw);
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        match reference_at(tail) {
            Some((len, Some(decoded))) => {
                out.push_str(&decoded);
                rest = &tail[len..];
            }
            Some((len, None)) => {
                out.push_str(&tail[..len]);
                rest = &tail[len..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

/// Escape text for writing inside an element.
///
/// `&` is escaped except where it starts a reference [`decode_text`] keeps
/// verbatim, so such tokens survive an edit unchanged.
fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for (i, c) in text.char_indices() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' if matches!(reference_at(&text[i..]), Some((_, None))) => out.push('&'),
            '&' => out.push_str("&amp;"),
            _ => out.push(c),
        }
    }
    out
}

const MAX_REFERENCE_LEN: usize = 40;

/// For `tail` starting with `&`: the byte length of a well-formed reference
/// (`&name;`, `&#123;`, `&#x1F;`) and its replacement, if it resolves.
/// `None` when `tail` does not start with a well-formed reference.
fn reference_at(tail: &str) -> Option<(usize, Option<String>)> {
    let body = tail.strip_prefix('&')?;
    let semi = body.bytes().take(MAX_REFERENCE_LEN).position(|b| b == b';')?;
    let name = &body[..semi];
    let resolved = if let Some(number) = name.strip_prefix('#') {
        let (digits, radix) = match number.strip_prefix(['x', 'X']) {
            Some(hex) => (hex, 16),
            None => (number, 10),
        };
        if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
            return None;
        }
        u32::from_str_radix(digits, radix)
            .ok()
            .and_then(char::from_u32)
            .map(String::from)
    } else {
        let mut chars = name.chars();
        if !chars.next().is_some_and(|c| c.is_ascii_alphabetic())
            || !chars.all(|c| c.is_ascii_alphanumeric())
        {
            return None;
        }
        resolve_html5_entity(name).map(str::to_string)
    };
    Some((semi + 2, resolved))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHAPTER: &str = "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
<!DOCTYPE html>\n\
<html xmlns=\"http://www.w3.org/1999/xhtml\">\n\
<head><title>One</title></head>\n\
<body>\n\
  <p class=\"first\">The sky <em>was</em></p>\n\
  <p>blue that day.</p>\n\
  <!-- note -->\n\
  <div><p>Next, she left.</p></div>\n\
</body>\n\
</html>\n";

    #[test]
    fn unedited_document_round_trips_exactly() {
        let doc = Document::parse(CHAPTER).unwrap();
        assert_eq!(doc.serialize(), CHAPTER);
    }

    #[test]
    fn byte_order_mark_is_preserved() {
        let src = "\u{feff}<p>hi</p>";
        let doc = Document::parse(src).unwrap();
        assert_eq!(doc.serialize(), src);
        let blocks = doc.select(&["p"], true);
        assert_eq!(doc.stripped_text(blocks[0]), "hi");
    }

    #[test]
    fn select_returns_blocks_in_document_order() {
        let doc = Document::parse(CHAPTER).unwrap();
        let blocks = doc.select(&["p", "div"], true);
        let texts: Vec<String> = blocks.iter().map(|&id| doc.stripped_text(id)).collect();
        assert_eq!(texts, vec!["The sky was", "blue that day.", "Next, she left."]);
    }

    #[test]
    fn select_without_leaf_filter_reports_containers() {
        let doc = Document::parse(CHAPTER).unwrap();
        let blocks = doc.select(&["p", "div"], false);
        assert_eq!(blocks.len(), 4);
        assert_eq!(doc.tag_name(blocks[2]), Some("div"));
        assert_eq!(doc.tag_name(blocks[3]), Some("p"));
    }

    #[test]
    fn text_decodes_entities_and_cdata() {
        let doc = Document::parse("<p>Tom &amp; Jerry&nbsp;<![CDATA[<ok>]]> &#x41;</p>").unwrap();
        let p = doc.select(&["p"], true)[0];
        assert_eq!(doc.text(p), "Tom & Jerry\u{a0}<ok> A");
    }

    #[test]
    fn html_named_entities_decode() {
        let doc =
            Document::parse("<p>Tom &amp; Jerry at the caf&eacute; near l&agrave;&hellip;</p>")
                .unwrap();
        let p = doc.select(&["p"], true)[0];
        assert_eq!(doc.text(p), "Tom & Jerry at the caf\u{e9} near l\u{e0}\u{2026}");
    }

    #[test]
    fn unknown_entity_stays_a_token_and_the_rest_decodes() {
        let doc = Document::parse("<p>caf&unknown; &amp; l&agrave; &#xZZ; AT&T</p>").unwrap();
        let p = doc.select(&["p"], true)[0];
        assert_eq!(doc.text(p), "caf&unknown; & l\u{e0} &#xZZ; AT&T");
    }

    #[test]
    fn edited_text_is_not_escaped_twice() {
        let mut doc = Document::parse("<body><p>caf&eacute; &amp; &mystery;</p></body>").unwrap();
        let p = doc.select(&["p"], true)[0];
        let text = doc.stripped_text(p);
        doc.replace_text(p, &format!("{text} then")).unwrap();
        assert_eq!(
            doc.serialize(),
            "<body><p>caf\u{e9} &amp; &mystery; then</p></body>"
        );
        assert_eq!(doc.text(p), "caf\u{e9} & &mystery; then");
    }

    #[test]
    fn end_tags_close_regardless_of_case() {
        let src = "<html><body><P>The sky was</p><p>blue that day.</P></body></html>";
        let doc = Document::parse(src).unwrap();
        let texts: Vec<String> = doc
            .select(&["p"], true)
            .iter()
            .map(|&id| doc.stripped_text(id))
            .collect();
        assert_eq!(texts, vec!["The sky was", "blue that day."]);
        assert_eq!(doc.serialize(), src);
    }

    #[test]
    fn replace_text_escapes_and_keeps_attributes() {
        let mut doc = Document::parse("<body><p class=\"a\">x <b>y</b></p></body>").unwrap();
        let p = doc.select(&["p"], true)[0];
        let old = doc.replace_text(p, "a < b & c").unwrap();
        assert_eq!(old.len(), 2);
        assert_eq!(doc.serialize(), "<body><p class=\"a\">a &lt; b &amp; c</p></body>");
        assert_eq!(doc.text(p), "a < b & c");
    }

    #[test]
    fn restore_children_undoes_replace_text() {
        let src = "<body><p class=\"a\">x <b>y</b></p></body>";
        let mut doc = Document::parse(src).unwrap();
        let p = doc.select(&["p"], true)[0];
        let old = doc.replace_text(p, "merged").unwrap();
        doc.restore_children(p, old).unwrap();
        assert_eq!(doc.serialize(), src);
    }

    #[test]
    fn replace_text_opens_self_closing_element() {
        let mut doc = Document::parse("<body><p class=\"x\" /></body>").unwrap();
        let p = doc.select(&["p"], false)[0];
        doc.replace_text(p, "now filled").unwrap();
        assert_eq!(doc.serialize(), "<body><p class=\"x\">now filled</p></body>");
    }

    #[test]
    fn detach_and_attach_restore_exact_position() {
        let src = "<body>\n<p>a</p>\n<p>b</p>\n<p>c</p>\n</body>";
        let mut doc = Document::parse(src).unwrap();
        let blocks = doc.select(&["p"], true);
        let slot = doc.detach(blocks[1]).unwrap();
        assert!(!doc.is_attached(blocks[1]));
        assert_eq!(doc.serialize(), "<body>\n<p>a</p>\n\n<p>c</p>\n</body>");
        doc.attach(blocks[1], slot).unwrap();
        assert_eq!(doc.serialize(), src);
    }

    #[test]
    fn detaching_twice_is_an_error() {
        let mut doc = Document::parse("<body><p>a</p></body>").unwrap();
        let p = doc.select(&["p"], true)[0];
        doc.detach(p).unwrap();
        assert_eq!(doc.detach(p), Err(MarkupError::Detached(p)));
    }

    #[test]
    fn insert_after_places_new_sibling() {
        let mut doc = Document::parse("<body><p>a</p><p>c</p></body>").unwrap();
        let first = doc.select(&["p"], true)[0];
        let created = doc.create_element("p", "b & more");
        doc.insert_after(first, created).unwrap();
        assert_eq!(
            doc.serialize(),
            "<body><p>a</p><p>b &amp; more</p><p>c</p></body>"
        );
    }

    #[test]
    fn void_elements_do_not_swallow_siblings() {
        let src = "<body><p>one<br>two</p><p>three</p></body>";
        let doc = Document::parse(src).unwrap();
        let blocks = doc.select(&["p"], true);
        assert_eq!(blocks.len(), 2);
        assert_eq!(doc.stripped_text(blocks[0]), "onetwo");
        assert_eq!(doc.serialize(), src);
    }

    #[test]
    fn stray_end_tag_is_kept_verbatim() {
        let src = "<body><p>a</p></span><p>b</p></body>";
        let doc = Document::parse(src).unwrap();
        assert_eq!(doc.select(&["p"], true).len(), 2);
        assert_eq!(doc.serialize(), src);
    }

    #[test]
    fn mixed_container_yields_only_nested_blocks() {
        let doc = Document::parse("<body><div>The sky was <p>blue</p></div><div><p>x</p></div></body>")
            .unwrap();
        let blocks = doc.select(&["p", "div"], true);
        assert_eq!(blocks.len(), 2);
        assert!(blocks.iter().all(|&id| doc.tag_name(id) == Some("p")));

        let all = doc.select(&["div"], false);
        assert!(doc.has_direct_text(all[0]));
        assert!(!doc.has_direct_text(all[1]));
    }

    #[test]
    fn namespaced_and_uppercase_tags_match() {
        let doc = Document::parse("<x:body><x:p>a</x:p><P>b</P></x:body>").unwrap();
        assert_eq!(doc.select(&["p"], true).len(), 2);
    }
}
