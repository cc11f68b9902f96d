//! Custom tag scanner.
//!
//! Splits markup into a flat node list of text runs and matched template
//! tags of one [`TagFamily`]. Matching is single-pass and non-recursive:
//! the first closing tag with the same name ends a match, so a tag nested
//! inside a same-named tag is not supported.
//!
//! ```text
//! "<p>a</p><x-c-Card title="t">body</x-c-Card>tail"
//!     │
//!     └── split(.., TagFamily::Component)
//!           ├── Text("<p>a</p>")
//!           ├── Tag { name: "Card", attrs: " title=\"t\"", inner: "body" }
//!           └── Text("tail")
//! ```

use regex::Regex;
use rustc_hash::FxHashMap;
use std::{ops::Range, sync::LazyLock};

/// `<x-use "Name">`
static RE_USE_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)<x-use\s+"([^"]+)"\s*>"#).unwrap());

/// `<x-content-KEY attrs>`
static RE_CONTENT_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<x-content-([a-z0-9_\-]+)(\s+[^>]*)?>").unwrap());

/// `<x-c-Name attrs>` or `<x-c-Name attrs />`
static RE_COMPONENT_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<x-c-([a-z0-9_\-]+)(\s+[^>]*|\s*/)?>").unwrap());

static RE_JS_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<x-js(\s[^>]*|/)?>").unwrap());

static RE_CSS_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<x-css(\s[^>]*|/)?>").unwrap());

static RE_LIST_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<x-f-list(\s[^>]*|/)?>").unwrap());

/// `key="value"` or `key='value'`
static RE_ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([a-zA-Z_][a-zA-Z0-9_:\-]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap()
});

/// Parsed tag attributes, keyed by attribute name.
pub type Attributes = FxHashMap<String, String>;

/// The template tag kinds the build understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagFamily {
    /// `<x-use "Name">...</x-use>`
    Use,
    /// `<x-content-KEY>...</x-content-KEY>`
    Content,
    /// `<x-c-Name>...</x-c-Name>`
    Component,
    /// `<x-js>...</x-js>` or `<x-js />`
    Js,
    /// `<x-css>...</x-css>` or `<x-css />`
    Css,
    /// `<x-f-list>...</x-f-list>`
    List,
}

impl TagFamily {
    fn open_pattern(self) -> &'static Regex {
        match self {
            Self::Use => &RE_USE_OPEN,
            Self::Content => &RE_CONTENT_OPEN,
            Self::Component => &RE_COMPONENT_OPEN,
            Self::Js => &RE_JS_OPEN,
            Self::Css => &RE_CSS_OPEN,
            Self::List => &RE_LIST_OPEN,
        }
    }

    /// Families whose tag name carries a user-chosen suffix.
    const fn has_suffix(self) -> bool {
        matches!(self, Self::Content | Self::Component)
    }

    /// Families that may be written as `<tag ... />`.
    const fn allows_self_closing(self) -> bool {
        matches!(self, Self::Component | Self::Js | Self::Css)
    }

    const fn prefix(self) -> &'static str {
        match self {
            Self::Use => "x-use",
            Self::Content => "x-content-",
            Self::Component => "x-c-",
            Self::Js => "x-js",
            Self::Css => "x-css",
            Self::List => "x-f-list",
        }
    }
}

/// One matched template tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag<'a> {
    /// Byte range of the whole match (opening tag through closing tag).
    pub span: Range<usize>,
    /// Layout name for `x-use`, suffix for `x-content-*`/`x-c-*`, empty otherwise.
    pub name: &'a str,
    /// Raw attribute string of the opening tag (self-closing `/` removed).
    pub attrs: &'a str,
    /// Markup between the opening and closing tag.
    pub inner: &'a str,
    pub self_closing: bool,
}

impl Tag<'_> {
    pub fn attributes(&self) -> Attributes {
        parse_attributes(self.attrs)
    }
}

/// A piece of scanned markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node<'a> {
    Text(&'a str),
    Tag(Tag<'a>),
}

/// Find every tag of `family` in document order.
pub fn find_tags(markup: &str, family: TagFamily) -> Vec<Tag<'_>> {
    let lower = markup.to_ascii_lowercase();
    let pattern = family.open_pattern();
    let mut tags = Vec::new();
    let mut pos = 0;

    while let Some(caps) = pattern.captures_at(markup, pos) {
        let open = caps.get(0).map_or(0..0, |m| m.range());
        let (name, raw_attrs) = match family {
            TagFamily::Use => (caps.get(1).map_or("", |m| m.as_str()), ""),
            _ if family.has_suffix() => (
                caps.get(1).map_or("", |m| m.as_str()),
                caps.get(2).map_or("", |m| m.as_str()),
            ),
            _ => ("", caps.get(1).map_or("", |m| m.as_str())),
        };

        let trimmed = raw_attrs.trim_end();
        if family.allows_self_closing() && trimmed.ends_with('/') {
            tags.push(Tag {
                span: open.clone(),
                name,
                attrs: &trimmed[..trimmed.len() - 1],
                inner: "",
                self_closing: true,
            });
            pos = open.end;
            continue;
        }

        let close_name = if family.has_suffix() {
            format!("{}{}", family.prefix(), name.to_ascii_lowercase())
        } else {
            family.prefix().to_string()
        };

        match find_closing(&lower, open.end, &close_name) {
            Some(close) => {
                tags.push(Tag {
                    span: open.start..close.end,
                    name,
                    attrs: raw_attrs,
                    inner: &markup[open.end..close.start],
                    self_closing: false,
                });
                pos = close.end;
            }
            // Unclosed: not a match, keep scanning after the opening tag.
            None => pos = open.end,
        }
    }

    tags
}

/// Split markup into text runs and tags of `family`.
pub fn split(markup: &str, family: TagFamily) -> Vec<Node<'_>> {
    split_at_tags(markup, find_tags(markup, family))
}

/// Split markup around an ordered, non-overlapping selection of tags.
pub fn split_at_tags<'a>(markup: &'a str, tags: Vec<Tag<'a>>) -> Vec<Node<'a>> {
    let mut nodes = Vec::new();
    let mut last = 0;

    for tag in tags {
        if tag.span.start > last {
            nodes.push(Node::Text(&markup[last..tag.span.start]));
        }
        last = tag.span.end;
        nodes.push(Node::Tag(tag));
    }
    if last < markup.len() {
        nodes.push(Node::Text(&markup[last..]));
    }

    nodes
}

/// Rebuild markup from a node list, mapping every tag through `render`.
pub fn render<'a>(nodes: &[Node<'a>], mut tag_markup: impl FnMut(&Tag<'a>) -> String) -> String {
    let mut out = String::new();
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Tag(tag) => out.push_str(&tag_markup(tag)),
        }
    }
    out
}

/// Parse `key="value"` / `key='value'` pairs. Anything else is dropped.
pub fn parse_attributes(attrs: &str) -> Attributes {
    RE_ATTRIBUTE
        .captures_iter(attrs)
        .map(|caps| {
            let key = caps[1].to_string();
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .map_or(String::new(), |m| m.as_str().to_string());
            (key, value)
        })
        .collect()
}

/// Locate `</name\s*>` in an ASCII-lowercased haystack, starting at `from`.
pub(crate) fn find_closing(lower: &str, from: usize, name: &str) -> Option<Range<usize>> {
    let needle = format!("</{name}");
    let mut search = from;

    while let Some(found) = lower[search..].find(&needle) {
        let start = search + found;
        let after = start + needle.len();
        let rest = &lower[after..];
        let ws = rest.len() - rest.trim_start().len();

        if rest[ws..].starts_with('>') {
            return Some(start..after + ws + 1);
        }
        search = after;
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_use_tags() {
        let html = r#"<x-use "Base"><x-content-main>hi</x-content-main></x-use>"#;
        let tags = find_tags(html, TagFamily::Use);

        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].name, "Base");
        assert_eq!(tags[0].inner, "<x-content-main>hi</x-content-main>");
        assert_eq!(tags[0].span, 0..html.len());
    }

    #[test]
    fn test_find_component_with_attrs() {
        let html = r#"a<x-c-Card title="Hello" size='lg'>body</x-c-Card>b"#;
        let tags = find_tags(html, TagFamily::Component);

        assert_eq!(tags.len(), 1);
        let attrs = tags[0].attributes();
        assert_eq!(tags[0].name, "Card");
        assert_eq!(attrs.get("title").map(String::as_str), Some("Hello"));
        assert_eq!(attrs.get("size").map(String::as_str), Some("lg"));
        assert_eq!(tags[0].inner, "body");
    }

    #[test]
    fn test_closing_tag_is_case_insensitive() {
        let html = "<x-content-Main>x</X-CONTENT-main >";
        let tags = find_tags(html, TagFamily::Content);
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].inner, "x");
        assert_eq!(tags[0].span.end, html.len());
    }

    #[test]
    fn test_nested_same_name_ends_at_first_close() {
        let html = "<x-c-Box>a<x-c-Box>b</x-c-Box>c</x-c-Box>";
        let tags = find_tags(html, TagFamily::Component);

        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].inner, "a<x-c-Box>b");
    }

    #[test]
    fn test_different_names_do_not_close_each_other() {
        let html = "<x-content-a>1</x-content-ab><x-content-a>2</x-content-a>";
        let tags = find_tags(html, TagFamily::Content);

        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].inner, "1</x-content-ab><x-content-a>2");
    }

    #[test]
    fn test_unclosed_tag_is_not_a_match() {
        let tags = find_tags("<x-c-Lonely>never closed", TagFamily::Component);
        assert!(tags.is_empty());
    }

    #[test]
    fn test_self_closing_forms() {
        let html = r#"<x-js location="footer"/><x-css /><x-c-Icon name="star" /><x-c-Rule/>"#;

        let js = find_tags(html, TagFamily::Js);
        assert_eq!(js.len(), 1);
        assert!(js[0].self_closing);
        assert_eq!(js[0].attributes().get("location").map(String::as_str), Some("footer"));

        let css = find_tags(html, TagFamily::Css);
        assert_eq!(css.len(), 1);
        assert!(css[0].self_closing);

        let icons = find_tags(html, TagFamily::Component);
        assert_eq!(icons.len(), 2);
        assert_eq!(icons[1].name, "Rule");
        assert!(icons[1].attributes().is_empty());
        assert_eq!(icons[0].name, "Icon");
        assert_eq!(icons[0].attributes().get("name").map(String::as_str), Some("star"));
    }

    #[test]
    fn test_paired_js_with_body() {
        let html = "<x-js>console.log(1)</x-js >";
        let tags = find_tags(html, TagFamily::Js);
        assert_eq!(tags.len(), 1);
        assert!(!tags[0].self_closing);
        assert_eq!(tags[0].inner, "console.log(1)");
    }

    #[test]
    fn test_fixed_names_do_not_match_longer_names() {
        assert!(find_tags("<x-jsx>a</x-jsx>", TagFamily::Js).is_empty());
        assert!(find_tags("<x-js-extra>a</x-js-extra>", TagFamily::Js).is_empty());
        assert!(find_tags("<x-css-theme/>", TagFamily::Css).is_empty());
        assert!(find_tags("<x-f-list-x>a</x-f-list-x>", TagFamily::List).is_empty());

        let js = find_tags(r#"<x-js/><x-js location="a" />"#, TagFamily::Js);
        assert_eq!(js.len(), 2);
        assert!(js.iter().all(|tag| tag.self_closing));
        assert_eq!(js[1].attributes().get("location").map(String::as_str), Some("a"));
    }

    #[test]
    fn test_split_and_render_roundtrip_text() {
        let html = "head<x-f-list use=\"Row\">none</x-f-list>tail";
        let nodes = split(html, TagFamily::List);

        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[0], Node::Text("head"));
        assert_eq!(nodes[2], Node::Text("tail"));

        let out = render(&nodes, |tag| tag.inner.to_uppercase());
        assert_eq!(out, "headNONEtail");
    }

    #[test]
    fn test_parse_attributes_drops_malformed() {
        let attrs = parse_attributes(r#" a="1" b='two' broken=three c = "x y" flag "#);

        assert_eq!(attrs.len(), 3);
        assert_eq!(attrs["a"], "1");
        assert_eq!(attrs["b"], "two");
        assert_eq!(attrs["c"], "x y");
        assert!(!attrs.contains_key("broken"));
        assert!(!attrs.contains_key("flag"));
    }

    #[test]
    fn test_parse_attributes_empty_value() {
        let attrs = parse_attributes(r#"alt="""#);
        assert_eq!(attrs.get("alt").map(String::as_str), Some(""));
    }
}
