//! # Headless Window
//!
//! An in-memory [`Window`]: a history stack, a scroll offset, a log of
//! executed scripts and a switchable view-transition capability. It backs the
//! CLI and the tests; nothing is rendered.

use std::collections::HashSet;

use serde_json::Value;

use crate::dom::{Document, NodeId};
use crate::scripts::Script;
use crate::window::{ScrollBehavior, Window};

/// Where the last scroll request went.
#[derive(Debug, Clone, PartialEq)]
pub enum ScrollTarget {
    Offset(f64),
    Element {
        id: Option<String>,
        behavior: ScrollBehavior,
    },
}

#[derive(Debug, Clone)]
struct Entry {
    url: String,
    state: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct HeadlessWindow {
    entries: Vec<Entry>,
    index: usize,
    scroll_y: f64,
    last_scroll: Option<ScrollTarget>,
    executed: Vec<Script>,
    history_supported: bool,
    transitions_supported: bool,
    transitions: usize,
    offscreen: HashSet<String>,
}

impl HeadlessWindow {
    pub fn new(url: &str) -> Self {
        Self {
            entries: vec![Entry {
                url: url.to_string(),
                state: None,
            }],
            index: 0,
            scroll_y: 0.0,
            last_scroll: None,
            executed: Vec::new(),
            history_supported: true,
            transitions_supported: false,
            transitions: 0,
            offscreen: HashSet::new(),
        }
    }

    /// A window whose host has no history API.
    pub fn without_history(mut self) -> Self {
        self.history_supported = false;
        self
    }

    pub fn with_view_transitions(mut self) -> Self {
        self.transitions_supported = true;
        self
    }

    /// Links whose raw href equals `href` report as outside the viewport.
    pub fn mark_offscreen(&mut self, href: &str) {
        self.offscreen.insert(href.to_string());
    }

    pub fn executed(&self) -> &[Script] {
        &self.executed
    }

    pub fn last_scroll(&self) -> Option<&ScrollTarget> {
        self.last_scroll.as_ref()
    }

    pub fn history_len(&self) -> usize {
        self.entries.len()
    }

    pub fn history_index(&self) -> usize {
        self.index
    }

    pub fn transitions_run(&self) -> usize {
        self.transitions
    }
}

impl Window for HeadlessWindow {
    fn location(&self) -> String {
        self.entries[self.index].url.clone()
    }

    fn supports_history(&self) -> bool {
        self.history_supported
    }

    fn history_state(&self) -> Option<Value> {
        self.entries[self.index].state.clone()
    }

    fn push_state(&mut self, state: Value, url: &str) {
        self.entries.truncate(self.index + 1);
        self.entries.push(Entry {
            url: url.to_string(),
            state: Some(state),
        });
        self.index = self.entries.len() - 1;
    }

    fn replace_state(&mut self, state: Value, url: &str) {
        self.entries[self.index] = Entry {
            url: url.to_string(),
            state: Some(state),
        };
    }

    fn traverse(&mut self, delta: i32) -> bool {
        let target = self.index as i64 + i64::from(delta);
        if delta == 0 || target < 0 || target >= self.entries.len() as i64 {
            return false;
        }
        self.index = target as usize;
        true
    }

    fn scroll_y(&self) -> f64 {
        self.scroll_y
    }

    fn scroll_to(&mut self, y: f64) {
        self.scroll_y = y;
        self.last_scroll = Some(ScrollTarget::Offset(y));
    }

    fn scroll_into_view(&mut self, document: &Document, node: NodeId, behavior: ScrollBehavior) {
        self.last_scroll = Some(ScrollTarget::Element {
            id: document.attr(node, "id").map(str::to_string),
            behavior,
        });
    }

    fn execute_script(&mut self, script: &Script) {
        self.executed.push(script.clone());
    }

    fn supports_view_transitions(&self) -> bool {
        self.transitions_supported
    }

    fn end_view_transition(&mut self) {
        self.transitions += 1;
    }

    fn is_in_viewport(&self, document: &Document, node: NodeId) -> bool {
        document
            .attr(node, "href")
            .is_none_or(|href| !self.offscreen.contains(href))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_push_truncates_forward_entries() {
        let mut window = HeadlessWindow::new("https://s.test/1");
        window.push_state(json!({}), "https://s.test/2");
        window.push_state(json!({}), "https://s.test/3");
        assert!(window.traverse(-2));
        window.push_state(json!({}), "https://s.test/4");

        assert_eq!(window.history_len(), 2);
        assert_eq!(window.location(), "https://s.test/4");
        assert!(!window.traverse(1));
    }

    #[test]
    fn test_traverse_out_of_range_is_refused() {
        let mut window = HeadlessWindow::new("https://s.test/1");
        assert!(!window.traverse(-1));
        assert!(!window.traverse(0));
        assert_eq!(window.history_index(), 0);
    }

    #[test]
    fn test_scroll_into_view_records_target() {
        let doc = Document::parse(r#"<html><body><h2 id="faq">FAQ</h2></body></html>"#);
        let mut window = HeadlessWindow::new("https://s.test/");
        let heading = doc.get_element_by_id("faq").unwrap();

        window.scroll_into_view(&doc, heading, ScrollBehavior::Smooth);

        assert_eq!(
            window.last_scroll(),
            Some(&ScrollTarget::Element {
                id: Some("faq".to_string()),
                behavior: ScrollBehavior::Smooth
            })
        );
    }
}
