//! # Document Model
//!
//! A small arena DOM: every node lives in one `Vec`, addressed by [`NodeId`].
//! Parent/child links are ids, so moving a subtree is a couple of vector edits
//! and walking up the tree is a plain loop.
//!
//! ```text
//! Document
//! ├── nodes: Vec<Option<Node>>   // None = discarded slot
//! └── root: NodeId               // the #document node
//!       └── <html>
//!             ├── <head>
//!             └── <body>
//! ```
//!
//! Parsing goes through html5ever (via `scraper`), so fetched markup gets the
//! same error recovery a browser applies. Script elements that come out of the
//! parser, a clone or an import are flagged as already started: they never
//! execute. Only a script made with [`Document::create_element`] is runnable.

use std::fmt::Write as _;

use scraper::Html;

/// Handle to a node inside one [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct ElementData {
    pub name: String,
    pub attrs: Vec<Attribute>,
    /// Set for scripts that must not run when inserted.
    pub already_started: bool,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Document,
    Doctype(String),
    Element(ElementData),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind,
}

/// A detached copy of a subtree, in preorder. `parent` indexes into the same vec.
struct Fragment {
    entries: Vec<(Option<usize>, NodeKind)>,
}

#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Option<Node>>,
    /// Slots emptied by `discard`, handed out again by `alloc`.
    free: Vec<usize>,
    root: NodeId,
}

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "xmp", "iframe", "noembed", "noframes"];

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// An empty `<html><head></head><body></body></html>` document.
    pub fn new() -> Self {
        let mut doc = Self::bare();
        let html = doc.create_element("html");
        let head = doc.create_element("head");
        let body = doc.create_element("body");
        doc.append_child(doc.root, html);
        doc.append_child(html, head);
        doc.append_child(html, body);
        doc
    }

    fn bare() -> Self {
        Document {
            nodes: vec![Some(Node {
                parent: None,
                children: Vec::new(),
                kind: NodeKind::Document,
            })],
            free: Vec::new(),
            root: NodeId(0),
        }
    }

    /// Parses a full HTML document.
    pub fn parse(source: &str) -> Self {
        let parsed = Html::parse_document(source);
        let mut doc = Self::bare();

        let mut stack = vec![(parsed.tree.root(), doc.root)];
        while let Some((src, dst)) = stack.pop() {
            for child in src.children() {
                let kind = match child.value() {
                    scraper::Node::Element(el) => NodeKind::Element(ElementData {
                        name: el.name().to_string(),
                        attrs: el
                            .attrs()
                            .map(|(name, value)| Attribute {
                                name: name.to_string(),
                                value: value.to_string(),
                            })
                            .collect(),
                        already_started: el.name() == "script",
                    }),
                    scraper::Node::Text(text) => {
                        let content: &str = text;
                        NodeKind::Text(content.to_string())
                    }
                    scraper::Node::Comment(comment) => {
                        let content: &str = comment;
                        NodeKind::Comment(content.to_string())
                    }
                    scraper::Node::Doctype(doctype) => {
                        NodeKind::Doctype(doctype.name().to_string())
                    }
                    _ => continue,
                };
                let id = doc.alloc(kind);
                doc.append_child(dst, id);
                stack.push((child, id));
            }
        }
        doc
    }

    // ========================================================================
    // Arena plumbing
    // ========================================================================

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let node = Some(Node {
            parent: None,
            children: Vec::new(),
            kind,
        });
        match self.free.pop() {
            Some(index) => {
                self.nodes[index] = node;
                NodeId(index)
            }
            None => {
                self.nodes.push(node);
                NodeId(self.nodes.len() - 1)
            }
        }
    }

    /// Number of slots the arena holds, live or free.
    pub fn capacity(&self) -> usize {
        self.nodes.len()
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0).and_then(Option::as_mut)
    }

    fn element(&self, id: NodeId) -> Option<&ElementData> {
        match self.node(id).map(|n| &n.kind) {
            Some(NodeKind::Element(el)) => Some(el),
            _ => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        match self.node_mut(id).map(|n| &mut n.kind) {
            Some(NodeKind::Element(el)) => Some(el),
            _ => None,
        }
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.node(id).map(|n| &n.kind)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|child| self.element(*child).is_some())
            .collect()
    }

    /// `id`, then its parent, and so on up to the root.
    pub fn ancestors_inclusive(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.node(id).map(|_| id), move |current| self.parent(*current))
    }

    /// Every node below `id` in document order, `id` itself excluded.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        out
    }

    pub fn document_element(&self) -> Option<NodeId> {
        self.element_children(self.root).into_iter().next()
    }

    pub fn head(&self) -> Option<NodeId> {
        self.child_element_named(self.document_element()?, "head")
    }

    pub fn body(&self) -> Option<NodeId> {
        self.child_element_named(self.document_element()?, "body")
    }

    fn child_element_named(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.element_children(parent)
            .into_iter()
            .find(|child| self.tag_name(*child) == Some(name))
    }

    /// True when walking up from `id` reaches the document node.
    pub fn is_connected(&self, id: NodeId) -> bool {
        self.ancestors_inclusive(id).any(|n| n == self.root)
    }

    pub fn get_element_by_id(&self, value: &str) -> Option<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .find(|n| self.attr(*n, "id") == Some(value))
    }

    pub fn title(&self) -> Option<String> {
        self.descendants(self.root)
            .into_iter()
            .find(|n| self.tag_name(*n) == Some("title"))
            .map(|n| self.text_content(n).trim().to_string())
    }

    // ========================================================================
    // Element data
    // ========================================================================

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|el| el.name.as_str())
    }

    pub fn is_element_named(&self, id: NodeId, name: &str) -> bool {
        self.tag_name(id) == Some(name)
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?
            .attrs
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        self.attr(id, name).is_some()
    }

    pub fn attributes(&self, id: NodeId) -> &[Attribute] {
        self.element(id).map(|el| el.attrs.as_slice()).unwrap_or(&[])
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        let Some(el) = self.element_mut(id) else {
            return;
        };
        match el.attrs.iter_mut().find(|a| a.name == name) {
            Some(existing) => existing.value = value.to_string(),
            None => el.attrs.push(Attribute {
                name: name.to_string(),
                value: value.to_string(),
            }),
        }
    }

    pub fn already_started(&self, id: NodeId) -> bool {
        self.element(id).is_some_and(|el| el.already_started)
    }

    pub fn mark_started(&mut self, id: NodeId) {
        if let Some(el) = self.element_mut(id) {
            el.already_started = true;
        }
    }

    /// Concatenated text of every text node below `id`.
    pub fn text_content(&self, id: NodeId) -> String {
        if let Some(NodeKind::Text(text)) = self.kind(id) {
            return text.clone();
        }
        self.descendants(id)
            .into_iter()
            .filter_map(|n| match self.kind(n) {
                Some(NodeKind::Text(text)) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.alloc(NodeKind::Element(ElementData {
            name: name.to_ascii_lowercase(),
            attrs: Vec::new(),
            already_started: false,
        }))
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.alloc(NodeKind::Text(text.to_string()))
    }

    /// Unlinks `id` from its parent. The subtree stays allocated.
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        if let Some(p) = self.node_mut(parent) {
            p.children.retain(|c| *c != id);
        }
        if let Some(n) = self.node_mut(id) {
            n.parent = None;
        }
    }

    /// Moves `child` (detaching it first) to the end of `parent`'s children.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if parent == child || self.node(parent).is_none() || self.node(child).is_none() {
            return;
        }
        self.detach(child);
        if let Some(p) = self.node_mut(parent) {
            p.children.push(child);
        }
        if let Some(c) = self.node_mut(child) {
            c.parent = Some(parent);
        }
    }

    /// Puts `new` where `old` is. Does nothing if `old` has no parent.
    pub fn replace_with(&mut self, old: NodeId, new: NodeId) {
        if old == new || self.node(new).is_none() {
            return;
        }
        let Some(parent) = self.parent(old) else {
            return;
        };
        self.detach(new);
        if let Some(p) = self.node_mut(parent)
            && let Some(slot) = p.children.iter_mut().find(|c| **c == old)
        {
            *slot = new;
        }
        if let Some(o) = self.node_mut(old) {
            o.parent = None;
        }
        if let Some(n) = self.node_mut(new) {
            n.parent = Some(parent);
        }
    }

    /// Detaches `id` and frees its whole subtree for reuse. Old ids into it
    /// must not be used again: a later `alloc` may hand the slot to a new node.
    pub fn discard(&mut self, id: NodeId) {
        if id == self.root {
            return;
        }
        self.detach(id);
        let mut doomed = self.descendants(id);
        doomed.push(id);
        for n in doomed {
            if let Some(slot) = self.nodes.get_mut(n.0)
                && slot.take().is_some()
            {
                self.free.push(n.0);
            }
        }
    }

    // ========================================================================
    // Cloning
    // ========================================================================

    fn extract(&self, id: NodeId) -> Option<Fragment> {
        self.node(id)?;
        let mut entries = Vec::new();
        let mut stack = vec![(id, None)];
        while let Some((current, parent)) = stack.pop() {
            let Some(node) = self.node(current) else {
                continue;
            };
            let mut kind = node.kind.clone();
            if let NodeKind::Element(el) = &mut kind
                && el.name == "script"
            {
                el.already_started = true;
            }
            entries.push((parent, kind));
            let index = entries.len() - 1;
            for child in node.children.iter().rev() {
                stack.push((*child, Some(index)));
            }
        }
        Some(Fragment { entries })
    }

    fn insert_fragment(&mut self, fragment: Fragment) -> Option<NodeId> {
        let mut ids: Vec<NodeId> = Vec::with_capacity(fragment.entries.len());
        for (parent, kind) in fragment.entries {
            let id = self.alloc(kind);
            if let Some(parent) = parent.and_then(|p| ids.get(p).copied()) {
                self.append_child(parent, id);
            }
            ids.push(id);
        }
        ids.first().copied()
    }

    /// Deep clone of `id` inside this document, returned detached.
    pub fn clone_node(&mut self, id: NodeId) -> Option<NodeId> {
        let fragment = self.extract(id)?;
        self.insert_fragment(fragment)
    }

    /// Deep copy of `id` from `source` into this document, returned detached.
    pub fn import_node(&mut self, source: &Document, id: NodeId) -> Option<NodeId> {
        let fragment = source.extract(id)?;
        self.insert_fragment(fragment)
    }

    // ========================================================================
    // Serialization
    // ========================================================================

    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.serialize_into(id, &mut out);
        out
    }

    pub fn to_html(&self) -> String {
        self.outer_html(self.root)
    }

    fn serialize_into(&self, id: NodeId, out: &mut String) {
        enum Step {
            Open(NodeId),
            Close(NodeId),
        }

        let mut stack = vec![Step::Open(id)];
        while let Some(step) = stack.pop() {
            match step {
                Step::Open(current) => {
                    let Some(kind) = self.kind(current) else {
                        continue;
                    };
                    match kind {
                        NodeKind::Document => {}
                        NodeKind::Doctype(name) => {
                            let _ = write!(out, "<!DOCTYPE {name}>");
                        }
                        NodeKind::Comment(text) => {
                            let _ = write!(out, "<!--{text}-->");
                        }
                        NodeKind::Text(text) => {
                            let raw = self
                                .parent(current)
                                .and_then(|p| self.tag_name(p))
                                .is_some_and(|name| RAW_TEXT_ELEMENTS.contains(&name));
                            if raw {
                                out.push_str(text);
                            } else {
                                out.push_str(&escape(text, false));
                            }
                        }
                        NodeKind::Element(el) => {
                            out.push('<');
                            out.push_str(&el.name);
                            for attr in &el.attrs {
                                let value = escape(&attr.value, true);
                                let _ = write!(out, " {}=\"{}\"", attr.name, value);
                            }
                            out.push('>');
                            if VOID_ELEMENTS.contains(&el.name.as_str()) {
                                continue;
                            }
                            stack.push(Step::Close(current));
                        }
                    }
                    for child in self.children(current).iter().rev() {
                        stack.push(Step::Open(*child));
                    }
                }
                Step::Close(current) => {
                    if let Some(name) = self.tag_name(current) {
                        let _ = write!(out, "</{name}>");
                    }
                }
            }
        }
    }
}

fn escape(text: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            '"' if attribute => out.push_str("&quot;"),
            '<' if !attribute => out.push_str("&lt;"),
            '>' if !attribute => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Structural equality in the `isEqualNode` sense: same kind, name, attribute
/// set (order ignored) and pairwise-equal children. Works across documents.
pub fn nodes_equal(a_doc: &Document, a: NodeId, b_doc: &Document, b: NodeId) -> bool {
    let mut pending = vec![(a, b)];
    while let Some((x, y)) = pending.pop() {
        let (Some(nx), Some(ny)) = (a_doc.node(x), b_doc.node(y)) else {
            return false;
        };
        let same = match (&nx.kind, &ny.kind) {
            (NodeKind::Document, NodeKind::Document) => true,
            (NodeKind::Doctype(p), NodeKind::Doctype(q)) => p == q,
            (NodeKind::Text(p), NodeKind::Text(q)) => p == q,
            (NodeKind::Comment(p), NodeKind::Comment(q)) => p == q,
            (NodeKind::Element(p), NodeKind::Element(q)) => {
                p.name == q.name
                    && p.attrs.len() == q.attrs.len()
                    && p.attrs.iter().all(|attr| q.attrs.contains(attr))
            }
            _ => false,
        };
        if !same || nx.children.len() != ny.children.len() {
            return false;
        }
        pending.extend(nx.children.iter().copied().zip(ny.children.iter().copied()));
    }
    true
}
