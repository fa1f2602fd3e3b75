//! Test utilities shared across the crate.
//!
//! This module is only compiled during tests (`#[cfg(test)]`).

use tokio::sync::broadcast;

use crate::config::RouterOptions;
use crate::dom::Document;
use crate::events::RouterEvent;
use crate::headless::HeadlessWindow;
use crate::router::Router;

/// A router over `html`, sitting at `url`, with default options.
pub fn test_router(html: &str, url: &str) -> Router<HeadlessWindow> {
    Router::new(
        Document::parse(html),
        HeadlessWindow::new(url),
        RouterOptions::default(),
    )
}

/// Everything emitted so far, without waiting.
pub fn drain_events(rx: &mut broadcast::Receiver<RouterEvent>) -> Vec<RouterEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
