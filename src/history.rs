//! # History Bookkeeping
//!
//! The router keeps its own record (`url` + `scroll`) inside each history
//! entry's state object, under a private key, so state written by the page
//! itself survives alongside it.
//!
//! ```json
//! { "page": "whatever the app stored", "__kindling": { "url": "...", "scroll": 480.0 } }
//! ```

use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::window::Window;

const STATE_KEY: &str = "__kindling";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub url: String,
    pub scroll: f64,
}

/// Stores the current url and scroll offset into the current entry (replace, not push).
pub fn record_departure(window: &mut dyn Window) {
    let url = window.location();
    let entry = HistoryEntry {
        url: url.clone(),
        scroll: window.scroll_y(),
    };

    let mut state = match window.history_state() {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    };
    match serde_json::to_value(&entry) {
        Ok(value) => {
            state.insert(STATE_KEY.to_string(), value);
        }
        Err(e) => {
            warn!("Failed to encode history entry for {url}: {e}");
            return;
        }
    }
    window.replace_state(Value::Object(state), &url);
}

/// Records the departure, then pushes a new entry for `url`.
pub fn push(window: &mut dyn Window, url: &str) {
    record_departure(window);

    let mut state = Map::new();
    let entry = HistoryEntry {
        url: url.to_string(),
        scroll: 0.0,
    };
    if let Ok(value) = serde_json::to_value(&entry) {
        state.insert(STATE_KEY.to_string(), value);
    }
    window.push_state(Value::Object(state), url);
}

/// The router's record for the current entry, if it wrote one.
pub fn current_entry(window: &dyn Window) -> Option<HistoryEntry> {
    let state = window.history_state()?;
    serde_json::from_value(state.get(STATE_KEY)?.clone()).ok()
}

/// Scroll offset recorded for the current entry.
pub fn saved_scroll(window: &dyn Window) -> Option<f64> {
    current_entry(window).map(|entry| entry.scroll)
}
