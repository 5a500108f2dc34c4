//! Link extraction and markup stripping for fetched pages.

use lazy_static::lazy_static;
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use url::Url;

lazy_static! {
    static ref LINK_SEL: Selector = Selector::parse("a[href]").expect("valid selector");
}

// Elements whose content never reaches the index.
const SKIPPED: [&str; 7] = ["head", "script", "style", "noscript", "svg", "iframe", "template"];

/// `url` without its fragment; the key used for visited-set membership.
pub fn canonicalize(url: &Url) -> Url {
    let mut canonical = url.clone();
    canonical.set_fragment(None);
    canonical
}

/// Absolute, canonical http(s) targets of every `<a href>` in `html`,
/// resolved against `base`, deduplicated in document order.
pub fn extract_links(html: &str, base: &Url) -> Vec<Url> {
    let doc = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut links = Vec::new();
    for a in doc.select(&LINK_SEL) {
        let Some(href) = a.value().attr("href") else { continue };
        let href = href.trim();
        if href.is_empty() || href.starts_with('#') {
            continue;
        }
        let Ok(target) = base.join(href) else { continue };
        if !matches!(target.scheme(), "http" | "https") {
            continue;
        }
        let target = canonicalize(&target);
        if seen.insert(target.as_str().to_string()) {
            links.push(target);
        }
    }
    links
}

/// Visible text of `html`: tags, comments and the contents of non-content
/// elements removed, character entities decoded, text nodes joined by spaces.
pub fn strip_html(html: &str) -> String {
    let doc = Html::parse_document(html);
    let mut parts = Vec::new();
    collect_text(doc.root_element(), &mut parts);
    parts.join(" ")
}

fn collect_text(element: ElementRef<'_>, parts: &mut Vec<String>) {
    if SKIPPED.contains(&element.value().name()) {
        return;
    }
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    parts.push(trimmed.to_string());
                }
            }
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    collect_text(child, parts);
                }
            }
            _ => {}
        }
    }
}
