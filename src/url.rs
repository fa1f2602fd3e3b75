//! # URL Resolution
//!
//! Turns a possibly-relative href into an absolute URL string and pulls the
//! in-page anchor id out of it.
//!
//! The anchor id is the first `#word` run anywhere in the normalized URL, so a
//! `#` that survives inside a query string can be picked up instead of the
//! real fragment. Callers live with that.

use std::sync::OnceLock;

use regex::Regex;
use reqwest::Url;

use crate::error::RouterError;

/// An absolute navigation target plus its anchor id (without the `#`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedUrl {
    pub target: String,
    pub anchor_id: Option<String>,
}

fn anchor_pattern() -> &'static Regex {
    static ANCHOR_RE: OnceLock<Regex> = OnceLock::new();
    // Normalized URLs are percent-encoded ASCII, so Unicode \w and \b agree with ASCII.
    ANCHOR_RE.get_or_init(|| Regex::new(r"#([\w'-]+)\b").expect("anchor regex compiles"))
}

/// Parses `href`, joining it onto `base` when one is given.
pub fn parse(href: &str, base: Option<&str>) -> Result<Url, RouterError> {
    let invalid = |input: &str, e: &dyn std::fmt::Display| RouterError::InvalidUrl {
        input: input.to_string(),
        message: e.to_string(),
    };

    match base {
        Some(base) => {
            let base_url = Url::parse(base).map_err(|e| invalid(base, &e))?;
            base_url.join(href).map_err(|e| invalid(href, &e))
        }
        None => Url::parse(href).map_err(|e| invalid(href, &e)),
    }
}

/// Resolves `href` against `base` and extracts the anchor id.
pub fn resolve(href: &str, base: Option<&str>) -> Result<ResolvedUrl, RouterError> {
    let target = parse(href, base)?.to_string();
    let anchor_id = anchor_id(&target);
    Ok(ResolvedUrl { target, anchor_id })
}

/// First `#id` match in `url`, without the leading `#`.
pub fn anchor_id(url: &str) -> Option<String> {
    anchor_pattern()
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// True when both URLs parse and share scheme, host and port.
pub fn same_origin(a: &str, b: &str) -> bool {
    match (Url::parse(a), Url::parse(b)) {
        (Ok(a), Ok(b)) => a.origin() == b.origin(),
        _ => false,
    }
}
