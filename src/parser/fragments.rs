use std::sync::LazyLock;

use regex::Regex;

use crate::model::Item;

/// "1、", "12、", "三、" at the very start of a fragment.
static NUMBERED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9一二三四五六七八九十]+、").unwrap());
static ANCHOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<a href="([^"]+)">([^<]+)</a>"#).unwrap());

/// One sibling element between a heading and the next one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    /// Inner markup, trimmed.
    pub inner: String,
    /// Outer markup, verbatim.
    pub outer: String,
}

impl Fragment {
    pub fn new(inner: &str, outer: impl Into<String>) -> Self {
        Fragment {
            inner: inner.trim().to_string(),
            outer: outer.into(),
        }
    }
}

pub fn is_numbered(markup: &str) -> bool {
    NUMBERED_RE.is_match(markup)
}

/// Group fragments into items. A numbered fragment opens a new item; anything
/// else is appended to the open item. Fragments seen before the first
/// numbered one each become a standalone item without title/href.
pub fn classify_fragments(fragments: &[Fragment]) -> Vec<Item> {
    let (items, _) = fragments
        .iter()
        .fold((Vec::new(), false), |(mut items, open), fragment| {
            let markup = fragment.inner.as_str();
            if is_numbered(markup) {
                items.push(open_item(markup));
                return (items, true);
            }
            match (open, items.last_mut()) {
                (true, Some(current)) => current.content.push_str(markup),
                _ => items.push(Item {
                    content: markup.to_string(),
                    ..Default::default()
                }),
            }
            (items, open)
        });
    items
}

/// Provisional title/href come from the first anchor anywhere in the markup;
/// both are empty strings when there is none.
fn open_item(markup: &str) -> Item {
    let (title, href) = match ANCHOR_RE.captures(markup) {
        Some(caps) => (caps[2].to_string(), caps[1].to_string()),
        None => (String::new(), String::new()),
    };
    Item {
        title: Some(title),
        href: Some(href),
        content: markup.to_string(),
        ..Default::default()
    }
}
