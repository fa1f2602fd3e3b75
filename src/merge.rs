//! # Document Merge
//!
//! Folds a freshly fetched document into the live one.
//!
//! ## Head
//!
//! Only the head's direct element children are compared, minus prefetch
//! hints (those belong to the router). Two cursors walk the old and next
//! lists:
//!
//! ```text
//! old:  [title A] [meta]          next: [title B] [meta]
//!          ▲                               ▲
//!   equal?          → advance both
//!   old in fresh?   → drop it from fresh, advance old
//!   next in stale?  → drop it from stale, advance next
//!   otherwise       → old to stale, next to fresh, advance both
//! ```
//!
//! Stale nodes are removed, fresh ones appended in order. A node matched by
//! structure is left alone, so a stylesheet shared by both pages is never
//! reloaded. A pure reorder of nodes whose content also changed is not detected.
//!
//! ## Body
//!
//! The body is swapped wholesale. Elements carrying [`PRESERVE_ATTR`] survive
//! when the incoming page has an element with the same marker and `id`: a clone
//! of the live element takes that element's place before the swap.

use log::debug;

use crate::PRESERVE_ATTR;
use crate::dom::{Document, NodeId, nodes_equal};

/// Result of diffing two head child lists.
/// `stale` ids belong to the live document, `fresh` ids to the next one.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct HeadPartition {
    pub stale: Vec<NodeId>,
    pub fresh: Vec<NodeId>,
}

/// What a head merge did to the live document.
#[derive(Debug, Default)]
pub struct HeadMerge {
    pub removed: usize,
    /// Live ids of the appended nodes, in append order.
    pub added: Vec<NodeId>,
}

/// Direct element children of `<head>`, prefetch hints excluded.
pub fn head_nodes_without_prefetch(doc: &Document) -> Vec<NodeId> {
    let Some(head) = doc.head() else {
        return Vec::new();
    };
    doc.element_children(head)
        .into_iter()
        .filter(|node| doc.attr(*node, "rel") != Some("prefetch"))
        .collect()
}

/// Two-cursor partition of `old` (in `live`) against `next` (in `next_doc`).
pub fn partition(
    live: &Document,
    old: &[NodeId],
    next_doc: &Document,
    next: &[NodeId],
) -> HeadPartition {
    let mut stale: Vec<NodeId> = Vec::new();
    let mut fresh: Vec<NodeId> = Vec::new();
    let (mut old_mark, mut next_mark) = (0, 0);

    while old_mark < old.len() || next_mark < next.len() {
        let old_node = old.get(old_mark).copied();
        let next_node = next.get(next_mark).copied();

        if let (Some(o), Some(n)) = (old_node, next_node)
            && nodes_equal(live, o, next_doc, n)
        {
            old_mark += 1;
            next_mark += 1;
            continue;
        }

        if let Some(o) = old_node
            && let Some(i) = fresh.iter().position(|f| nodes_equal(next_doc, *f, live, o))
        {
            fresh.remove(i);
            old_mark += 1;
            continue;
        }

        if let Some(n) = next_node
            && let Some(i) = stale.iter().position(|s| nodes_equal(live, *s, next_doc, n))
        {
            stale.remove(i);
            next_mark += 1;
            continue;
        }

        stale.extend(old_node);
        fresh.extend(next_node);
        old_mark += 1;
        next_mark += 1;
    }

    HeadPartition { stale, fresh }
}

/// Diffs the heads of `live` and `next` and applies the result to `live`.
pub fn merge_head(live: &mut Document, next: &Document) -> HeadMerge {
    let old_nodes = head_nodes_without_prefetch(live);
    let next_nodes = head_nodes_without_prefetch(next);
    let HeadPartition { stale, fresh } = partition(live, &old_nodes, next, &next_nodes);

    let removed = stale.len();
    for node in stale {
        live.discard(node);
    }

    let mut added = Vec::with_capacity(fresh.len());
    if let Some(head) = live.head() {
        for node in fresh {
            if let Some(copy) = live.import_node(next, node) {
                live.append_child(head, copy);
                added.push(copy);
            }
        }
    }

    debug!("head merge: removed={removed}, added={}", added.len());
    HeadMerge { removed, added }
}

/// Replaces the live body with `next`'s body, carrying preserved elements over.
/// Returns how many preserved elements found a counterpart.
pub fn replace_body(live: &mut Document, next: &mut Document) -> usize {
    let (Some(live_body), Some(next_body)) = (live.body(), next.body()) else {
        return 0;
    };

    let mut kept = 0;
    let preserved: Vec<NodeId> = live
        .descendants(live_body)
        .into_iter()
        .filter(|node| live.has_attr(*node, PRESERVE_ATTR))
        .collect();

    for node in preserved {
        let id = live.attr(node, "id").unwrap_or("");
        let counterpart = next.descendants(next_body).into_iter().find(|candidate| {
            next.has_attr(*candidate, PRESERVE_ATTR) && next.attr(*candidate, "id") == Some(id)
        });
        let Some(counterpart) = counterpart else {
            debug!("preserved element #{id} has no counterpart, dropping");
            continue;
        };
        if let Some(clone) = next.import_node(live, node) {
            next.replace_with(counterpart, clone);
            next.discard(counterpart);
            kept += 1;
        }
    }

    if let Some(incoming) = live.import_node(next, next_body) {
        live.replace_with(live_body, incoming);
        live.discard(live_body);
    }
    kept
}
