//! # Host Window
//!
//! Everything the router needs from its host besides the document itself:
//! the history stack, scrolling, script execution, view transitions and
//! viewport visibility. A browser binding implements this over the real
//! window; [`crate::headless::HeadlessWindow`] implements it in memory.

use serde_json::Value;

use crate::dom::{Document, NodeId};
use crate::scripts::Script;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollBehavior {
    Instant,
    Smooth,
}

pub trait Window: Send {
    /// Current location href.
    fn location(&self) -> String;

    /// False when the host has no history API. The router then disables itself.
    fn supports_history(&self) -> bool {
        true
    }

    /// State object of the current history entry.
    fn history_state(&self) -> Option<Value>;

    fn push_state(&mut self, state: Value, url: &str);

    fn replace_state(&mut self, state: Value, url: &str);

    /// Moves `delta` entries through history.
    ///
    /// Returns true when the location changed synchronously and the router
    /// should replay it as a popstate. Hosts that fire popstate themselves
    /// return false and forward the event to `Router::on_popstate`.
    fn traverse(&mut self, delta: i32) -> bool;

    fn scroll_y(&self) -> f64;

    fn scroll_to(&mut self, y: f64);

    fn scroll_into_view(&mut self, document: &Document, node: NodeId, behavior: ScrollBehavior);

    /// Runs a freshly inserted script with full page privilege.
    fn execute_script(&mut self, script: &Script);

    fn supports_view_transitions(&self) -> bool {
        false
    }

    /// Snapshot the current rendering before a transitioned update.
    fn begin_view_transition(&mut self) {}

    /// The transitioned update is done; animate to the new rendering.
    fn end_view_transition(&mut self) {}

    /// Whether `node` is fully inside the viewport.
    fn is_in_viewport(&self, _document: &Document, _node: NodeId) -> bool {
        true
    }
}
