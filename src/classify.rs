//! # Event Classification
//!
//! Maps raw input events to a [`RouteChange`]. Stateless apart from the
//! two side effects a browser would see: `preventDefault()` on intercepted
//! clicks, and `target="_blank"` on cross-origin anchors.

use log::debug;

use crate::COLD_ATTR;
use crate::dom::{Document, NodeId};
use crate::error::RouterError;
use crate::url;

/// What a navigation-triggering event asks the router to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteChange {
    Noop,
    /// Same-page jump to an element id.
    Scroll { anchor_id: String },
    /// Cross-document navigation from a click or `Router::go`.
    Link {
        next: String,
        prev: Option<String>,
        anchor_id: Option<String>,
    },
    /// History back/forward landed on `next`.
    Popstate {
        next: String,
        anchor_id: Option<String>,
    },
}

impl RouteChange {
    pub fn kind(&self) -> &'static str {
        match self {
            RouteChange::Noop => "noop",
            RouteChange::Scroll { .. } => "scroll",
            RouteChange::Link { .. } => "link",
            RouteChange::Popstate { .. } => "popstate",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub alt: bool,
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
}

impl Modifiers {
    pub fn any(&self) -> bool {
        self.alt || self.ctrl || self.meta || self.shift
    }
}

#[derive(Debug, Clone)]
pub struct ClickEvent {
    pub target: NodeId,
    pub modifiers: Modifiers,
    default_prevented: bool,
}

impl ClickEvent {
    pub fn new(target: NodeId) -> Self {
        Self {
            target,
            modifiers: Modifiers::default(),
            default_prevented: false,
        }
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }
}

/// Nearest `<a>` at or above `node`, found by walking parent links to the root.
pub fn enclosing_anchor(doc: &Document, node: NodeId) -> Option<NodeId> {
    doc.ancestors_inclusive(node)
        .find(|candidate| doc.is_element_named(*candidate, "a"))
}

/// Classifies a click on `event.target` while the page sits at `location`.
pub fn click(doc: &mut Document, location: &str, event: &mut ClickEvent) -> RouteChange {
    if event.modifiers.any() {
        return RouteChange::Noop;
    }

    let Some(anchor) = enclosing_anchor(doc, event.target) else {
        return RouteChange::Noop;
    };
    let Some(href) = doc.attr(anchor, "href").map(str::to_string) else {
        return RouteChange::Noop;
    };

    let resolved = match url::resolve(&href, Some(location)) {
        Ok(resolved) => resolved,
        Err(e) => {
            debug!("leaving unresolvable link to the browser: {e}");
            return RouteChange::Noop;
        }
    };

    if !url::same_origin(&resolved.target, location) {
        doc.set_attr(anchor, "target", "_blank");
        return RouteChange::Noop;
    }

    if doc.has_attr(anchor, COLD_ATTR) {
        return RouteChange::Noop;
    }

    event.prevent_default();

    if let Some(anchor_id) = href.strip_prefix('#') {
        return RouteChange::Scroll {
            anchor_id: anchor_id.to_string(),
        };
    }

    let prev = url::resolve(location, None)
        .map(|r| r.target)
        .unwrap_or_else(|_| location.to_string());

    RouteChange::Link {
        next: resolved.target,
        prev: Some(prev),
        anchor_id: resolved.anchor_id,
    }
}

/// Classifies a history traversal that landed on `location`.
pub fn popstate(location: &str) -> Result<RouteChange, RouterError> {
    let resolved = url::resolve(location, None)?;
    Ok(RouteChange::Popstate {
        next: resolved.target,
        anchor_id: resolved.anchor_id,
    })
}
