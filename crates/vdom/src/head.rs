//! Out-of-band document metadata and its keyed differ.
//!
//! Head entries form a flat collection keyed by a derived string. The differ is
//! the children algorithm without the tree: same key updates in place, a key
//! only in `new` is added, a key only in `old` is removed.

use std::collections::HashMap;
use std::fmt::Write;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HeadContent {
    Meta { name: String, content: String },
    MetaProperty { property: String, content: String },
    Link { rel: String, href: String },
    Script { src: String },
    Base { href: String },
}

impl HeadContent {
    pub fn meta(name: impl Into<String>, content: impl Into<String>) -> Self {
        HeadContent::Meta {
            name: name.into(),
            content: content.into(),
        }
    }

    pub fn property(property: impl Into<String>, content: impl Into<String>) -> Self {
        HeadContent::MetaProperty {
            property: property.into(),
            content: content.into(),
        }
    }

    pub fn link(rel: impl Into<String>, href: impl Into<String>) -> Self {
        HeadContent::Link {
            rel: rel.into(),
            href: href.into(),
        }
    }

    pub fn script(src: impl Into<String>) -> Self {
        HeadContent::Script { src: src.into() }
    }

    pub fn base(href: impl Into<String>) -> Self {
        HeadContent::Base { href: href.into() }
    }

    pub fn key(&self) -> String {
        match self {
            HeadContent::Meta { name, .. } => format!("meta:{name}"),
            HeadContent::MetaProperty { property, .. } => format!("property:{property}"),
            HeadContent::Link { rel, href } => format!("link:{rel}:{href}"),
            HeadContent::Script { src } => format!("script:{src}"),
            HeadContent::Base { .. } => "base".to_string(),
        }
    }

    /// HTML form of the entry, tagged with its key so a surface can find it again.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        let key = escape_html(&self.key());
        let _ = match self {
            HeadContent::Meta { name, content } => write!(
                out,
                "<meta name=\"{}\" content=\"{}\" data-head-key=\"{key}\">",
                escape_html(name),
                escape_html(content)
            ),
            HeadContent::MetaProperty { property, content } => write!(
                out,
                "<meta property=\"{}\" content=\"{}\" data-head-key=\"{key}\">",
                escape_html(property),
                escape_html(content)
            ),
            HeadContent::Link { rel, href } => write!(
                out,
                "<link rel=\"{}\" href=\"{}\" data-head-key=\"{key}\">",
                escape_html(rel),
                escape_html(href)
            ),
            HeadContent::Script { src } => write!(
                out,
                "<script src=\"{}\" data-head-key=\"{key}\"></script>",
                escape_html(src)
            ),
            HeadContent::Base { href } => write!(
                out,
                "<base href=\"{}\" data-head-key=\"{key}\">",
                escape_html(href)
            ),
        };
        out
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HeadPatch {
    Add(HeadContent),
    Update(HeadContent),
    Remove(HeadContent),
}

impl HeadPatch {
    pub fn content(&self) -> &HeadContent {
        match self {
            HeadPatch::Add(c) | HeadPatch::Update(c) | HeadPatch::Remove(c) => c,
        }
    }
}

/// Adds and updates come in `new` order, followed by removals in `old` order.
pub fn diff_head(old: &[HeadContent], new: &[HeadContent]) -> Vec<HeadPatch> {
    let mut remaining: HashMap<String, &HeadContent> =
        old.iter().map(|entry| (entry.key(), entry)).collect();

    let mut patches = Vec::new();
    for entry in new {
        match remaining.remove(&entry.key()) {
            Some(previous) => {
                if previous != entry {
                    patches.push(HeadPatch::Update(entry.clone()));
                }
            }
            None => patches.push(HeadPatch::Add(entry.clone())),
        }
    }
    for entry in old {
        if remaining.remove(&entry.key()).is_some() {
            patches.push(HeadPatch::Remove(entry.clone()));
        }
    }
    patches
}

pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn changed_meta_is_one_update() {
        let patches = diff_head(
            &[HeadContent::meta("description", "A")],
            &[HeadContent::meta("description", "B")],
        );
        assert_eq!(
            patches,
            vec![HeadPatch::Update(HeadContent::meta("description", "B"))]
        );
    }

    #[test]
    fn new_link_is_one_add() {
        let patches = diff_head(&[], &[HeadContent::link("canonical", "/x")]);
        assert_eq!(
            patches,
            vec![HeadPatch::Add(HeadContent::link("canonical", "/x"))]
        );
    }

    #[test]
    fn dropped_link_is_one_remove() {
        let patches = diff_head(&[HeadContent::link("canonical", "/x")], &[]);
        assert_eq!(
            patches,
            vec![HeadPatch::Remove(HeadContent::link("canonical", "/x"))]
        );
    }

    #[test]
    fn unchanged_entries_emit_nothing() {
        let head = vec![
            HeadContent::meta("description", "A"),
            HeadContent::property("og:title", "Home"),
            HeadContent::base("/"),
        ];
        assert!(diff_head(&head, &head).is_empty());
    }

    #[test]
    fn link_key_includes_href() {
        let patches = diff_head(
            &[HeadContent::link("canonical", "/x")],
            &[HeadContent::link("canonical", "/y")],
        );
        assert_eq!(
            patches,
            vec![
                HeadPatch::Add(HeadContent::link("canonical", "/y")),
                HeadPatch::Remove(HeadContent::link("canonical", "/x")),
            ]
        );
    }

    #[test]
    fn keys_follow_variant_scheme() {
        assert_eq!(HeadContent::meta("author", "x").key(), "meta:author");
        assert_eq!(HeadContent::property("og:type", "x").key(), "property:og:type");
        assert_eq!(HeadContent::link("icon", "/f.ico").key(), "link:icon:/f.ico");
        assert_eq!(HeadContent::script("/app.js").key(), "script:/app.js");
        assert_eq!(HeadContent::base("/root/").key(), "base");
    }

    #[test]
    fn html_escapes_values() {
        let html = HeadContent::meta("description", "a \"quoted\" <b>").to_html();
        assert!(html.contains("content=\"a &quot;quoted&quot; &lt;b&gt;\""));
        assert!(html.contains("data-head-key=\"meta:description\""));
    }
}
