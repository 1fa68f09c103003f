//! Visible-text and link extraction from HTML documents.

use scraper::{Html, Node, Selector};
use url::Url;

/// Elements whose text content is never rendered.
const HIDDEN_TAGS: &[&str] = &["head", "script", "style", "noscript", "template", "svg"];

/// Extract the human-visible text of an HTML document.
///
/// Each text node is whitespace-collapsed; non-empty nodes are joined by newlines.
pub fn visible_text(html: &str) -> String {
    let doc = Html::parse_document(html);
    let mut parts: Vec<String> = Vec::new();

    for node in doc.root_element().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };

        let hidden = node.ancestors().any(|ancestor| {
            matches!(ancestor.value(), Node::Element(el) if HIDDEN_TAGS.contains(&el.name()))
        });
        if hidden {
            continue;
        }

        let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if !collapsed.is_empty() {
            parts.push(collapsed);
        }
    }

    parts.join("\n")
}

/// Extract all anchor targets from a document, resolved against `base_url`.
///
/// Anchors, `javascript:` and `mailto:` targets are skipped; fragments are stripped.
pub fn extract_links(doc: &Html, base_url: &Url) -> Vec<Url> {
    let Ok(link_sel) = Selector::parse("a[href]") else {
        return Vec::new();
    };
    let mut links = Vec::new();

    for el in doc.select(&link_sel) {
        let Some(href) = el.value().attr("href") else {
            continue;
        };
        let href = href.trim();
        if href.is_empty()
            || href.starts_with('#')
            || href.starts_with("javascript:")
            || href.starts_with("mailto:")
            || href.starts_with("tel:")
        {
            continue;
        }

        if let Ok(mut resolved) = base_url.join(href) {
            resolved.set_fragment(None);
            links.push(resolved);
        }
    }

    links
}
