//! Kindling library exports
//!
//! Client-side navigation for server-rendered pages: intercept link clicks
//! and history traversal, fetch the next document, and reconcile it into
//! the live one instead of reloading.

pub mod classify;
pub mod config;
pub mod dom;
pub mod error;
pub mod events;
pub mod headless;
pub mod history;
pub mod merge;
pub mod prefetch;
pub mod progress;
pub mod router;
pub mod scripts;
pub mod url;
pub mod window;

#[cfg(test)]
pub mod test_support;

/// Element attribute: keep the live instance across navigations (needs a stable `id`).
pub const PRESERVE_ATTR: &str = "kindling-preserve";
/// Head `<script>` attribute: re-run it after every navigation.
pub const RELOAD_ATTR: &str = "data-reload";
/// Anchor attribute: never intercept or prefetch this link.
pub const COLD_ATTR: &str = "data-cold";

pub use classify::{ClickEvent, Modifiers, RouteChange};
pub use config::RouterOptions;
pub use dom::{Document, NodeId};
pub use error::RouterError;
pub use events::{FetchProgress, RouterEvent};
pub use headless::HeadlessWindow;
pub use prefetch::PrefetchMode;
pub use router::{NAVIGATION_HEADER, Router, RouterSlot, RouterState};
pub use window::{ScrollBehavior, Window};
