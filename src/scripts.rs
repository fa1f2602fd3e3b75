//! # Script Reactivation
//!
//! Scripts that arrive through parsing or cloning are inert. To run them, each
//! one is rebuilt as a brand-new `<script>` with the same attributes and
//! text, put in the old one's place, and handed to the script runtime.
//!
//! Head scripts only rerun when marked with [`RELOAD_ATTR`]; body scripts
//! always rerun. Head scripts go first, each group in document order.

use log::debug;

use crate::RELOAD_ATTR;
use crate::dom::{Attribute, Document, NodeId};

/// A script as handed to the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    pub attributes: Vec<Attribute>,
    pub text: String,
}

impl Script {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    pub fn src(&self) -> Option<&str> {
        self.attr("src")
    }
}

/// Scripts due for re-execution, in execution order.
pub fn scripts_to_rerun(doc: &Document) -> Vec<NodeId> {
    let is_script = |node: &NodeId| doc.is_element_named(*node, "script");

    let head = doc
        .head()
        .map(|head| doc.descendants(head))
        .unwrap_or_default()
        .into_iter()
        .filter(|node| is_script(node) && doc.has_attr(*node, RELOAD_ATTR));
    let body = doc
        .body()
        .map(|body| doc.descendants(body))
        .unwrap_or_default()
        .into_iter()
        .filter(|node| is_script(node));

    head.chain(body).collect()
}

/// Replaces every due script with a fresh copy and runs it through `execute`.
/// Returns the number of scripts executed.
pub fn run_scripts(doc: &mut Document, mut execute: impl FnMut(&Script)) -> usize {
    let mut ran = 0;
    for old in scripts_to_rerun(doc) {
        let script = Script {
            attributes: doc.attributes(old).to_vec(),
            text: doc.text_content(old),
        };

        let fresh = doc.create_element("script");
        for attr in &script.attributes {
            doc.set_attr(fresh, &attr.name, &attr.value);
        }
        if !script.text.is_empty() {
            let text = doc.create_text(&script.text);
            doc.append_child(fresh, text);
        }
        doc.replace_with(old, fresh);
        doc.discard(old);

        if doc.already_started(fresh) || !doc.is_connected(fresh) {
            continue;
        }
        doc.mark_started(fresh);
        debug!("running script src={:?}", script.src());
        execute(&script);
        ran += 1;
    }
    ran
}
