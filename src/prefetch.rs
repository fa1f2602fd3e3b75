//! # Prefetch Hints
//!
//! Warms likely next pages by dropping `<link rel="prefetch">` hints into the
//! head. Which links get a hint, and when, depends on [`PrefetchMode`]:
//!
//! - `visible`: every qualifying link the window reports as on screen
//! - `hover`: qualifying links are armed; the first pointer-enter hints
//! - `none`: nothing
//!
//! Every hinted URL lands in an append-only set, so a URL is hinted at most
//! once per router.

use std::collections::{HashMap, HashSet};

use clap::ValueEnum;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::COLD_ATTR;
use crate::dom::{Document, NodeId};
use crate::url;
use crate::window::Window;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PrefetchMode {
    Visible,
    Hover,
    #[default]
    None,
}

impl std::str::FromStr for PrefetchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "visible" => Ok(PrefetchMode::Visible),
            "hover" => Ok(PrefetchMode::Hover),
            "none" | "" => Ok(PrefetchMode::None),
            other => Err(format!("unknown prefetch mode: {other}")),
        }
    }
}

#[derive(Debug, Default)]
pub struct Prefetcher {
    prefetched: HashSet<String>,
    /// Hover mode: link node → absolute url, disarmed on first pointer-enter.
    armed: HashMap<NodeId, String>,
}

impl Prefetcher {
    pub fn is_prefetched(&self, url: &str) -> bool {
        self.prefetched.contains(url)
    }

    pub fn prefetched_count(&self) -> usize {
        self.prefetched.len()
    }

    /// Links worth prefetching: `<a>`/`<area>` pointing same-origin, without
    /// a fragment, not at the current page, not cold and not yet hinted.
    pub fn candidates(&self, doc: &Document, location: &str) -> Vec<(NodeId, String)> {
        let here = url::resolve(location, None)
            .map(|r| r.target)
            .unwrap_or_else(|_| location.to_string());

        doc.descendants(doc.root())
            .into_iter()
            .filter(|node| doc.is_element_named(*node, "a") || doc.is_element_named(*node, "area"))
            .filter(|node| !doc.has_attr(*node, COLD_ATTR))
            .filter_map(|node| {
                let href = doc.attr(node, "href")?;
                let target = url::resolve(href, Some(&here)).ok()?.target;
                let qualifies = url::same_origin(&target, &here)
                    && !target.contains('#')
                    && target != here
                    && !self.prefetched.contains(&target);
                qualifies.then_some((node, target))
            })
            .collect()
    }

    /// One prefetch pass. Returns how many links were hinted (visible) or armed (hover).
    pub fn run(&mut self, mode: PrefetchMode, doc: &mut Document, window: &dyn Window) -> usize {
        let candidates = match mode {
            PrefetchMode::None => return 0,
            _ => self.candidates(doc, &window.location()),
        };

        match mode {
            PrefetchMode::Visible => {
                let mut hinted = 0;
                for (node, target) in candidates {
                    if window.is_in_viewport(doc, node) && self.create_hint(doc, &target) {
                        hinted += 1;
                    }
                }
                hinted
            }
            PrefetchMode::Hover => {
                self.armed = candidates.into_iter().collect();
                self.armed.len()
            }
            PrefetchMode::None => 0,
        }
    }

    /// Forgets armed links. Their node ids die with the body they came from.
    pub fn disarm(&mut self) {
        self.armed.clear();
    }

    /// Pointer entered `node`. Hints the armed link it belongs to, once.
    pub fn pointer_enter(&mut self, doc: &mut Document, node: NodeId) -> bool {
        let link = doc
            .ancestors_inclusive(node)
            .find(|candidate| self.armed.contains_key(candidate));
        let Some(target) = link.and_then(|link| self.armed.remove(&link)) else {
            return false;
        };
        self.create_hint(doc, &target)
    }

    /// Appends `<link rel="prefetch" href=… as="document">` and records the url.
    fn create_hint(&mut self, doc: &mut Document, target: &str) -> bool {
        if self.prefetched.contains(target) {
            return false;
        }
        let Some(head) = doc.head() else {
            return false;
        };

        let link = doc.create_element("link");
        doc.set_attr(link, "rel", "prefetch");
        doc.set_attr(link, "href", target);
        doc.set_attr(link, "as", "document");
        doc.append_child(head, link);

        self.prefetched.insert(target.to_string());
        debug!("prefetch hint added for {target}");
        true
    }
}
