//! Asset placement: `<x-js>`/`<x-css>` expansion and location hoisting.
//!
//! # Phase 1: expansion (layout and component compile)
//!
//! ```text
//! <x-js>body</x-js>                  → <script>body</script>
//! <x-js location="inline" />         → <script>{Name.js contents}</script>
//! <x-js />                           → <script src="Name.js"></script>
//! <x-css location="header-10" />     → <link rel="stylesheet" href="Name.css" data-x-location="header-10" />
//! ```
//!
//! # Phase 2: hoisting (composed page)
//!
//! Elements carrying `data-x-location="header|footer[-weight]"` are removed
//! from their position, their `src`/`href` is copied to
//! `public/assets/{js|css}/` and rewritten, and they are re-injected before
//! `</head>` / `</body>` ordered by `(weight, document order)`.

use super::{
    BuildError, Compiler, Triad,
    staleness::{mtime, sync_file},
};
use crate::{
    config::join_url,
    template::{Tag, TagFamily, render, split, tag::find_closing},
};
use regex::{Captures, Regex};
use std::{fs, path::Path, sync::LazyLock};

/// Weight of a location without an explicit `-N` suffix.
const DEFAULT_WEIGHT: u32 = 100;

const INDENT: &str = "    ";

/// Elements that never have a closing tag.
const VOID_ELEMENTS: &[&str] = &["link", "meta", "img", "input", "br", "hr", "source", "base"];

static RE_LOCATED_OPEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<([a-z][a-z0-9:\-]*)\b[^>]*?\sdata-x-location\s*=\s*"([^"]*)"[^>]*>"#)
        .unwrap()
});

static RE_LOCATION_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)\s+data-x-location\s*=\s*"[^"]*""#).unwrap());

static RE_LOCATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(header|footer)(?:-(\d+))?$").unwrap());

static RE_SRC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)\bsrc\s*=\s*"([^"]+)""#).unwrap());

static RE_HREF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)\bhref\s*=\s*"([^"]+)""#).unwrap());

static RE_STYLESHEET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)\brel\s*=\s*"stylesheet""#).unwrap());

static RE_EXTERNAL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^(?:https?:)?//").unwrap());

// ============================================================================
// Phase 1: expansion
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AssetKind {
    Js,
    Css,
}

impl AssetKind {
    const fn family(self) -> TagFamily {
        match self {
            Self::Js => TagFamily::Js,
            Self::Css => TagFamily::Css,
        }
    }

    /// Sub-directory under `public/assets/`.
    const fn dir(self) -> &'static str {
        match self {
            Self::Js => "js",
            Self::Css => "css",
        }
    }

    fn inline(self, data: &str, body: &str) -> String {
        match self {
            Self::Js => format!("<script{data}>{body}</script>"),
            Self::Css => format!("<style{data}>{body}</style>"),
        }
    }

    fn linked(self, data: &str, file: &str) -> String {
        let file = escape_attr(file);
        match self {
            Self::Js => format!(r#"<script src="{file}"{data}></script>"#),
            Self::Css => format!(r#"<link rel="stylesheet" href="{file}"{data} />"#),
        }
    }
}

/// Expand every `<x-js>`/`<x-css>` tag against the sidecars of `triad`.
pub(super) fn expand_asset_tags(html: &str, triad: &Triad) -> String {
    let html = expand_kind(html, AssetKind::Js, &triad.js);
    expand_kind(&html, AssetKind::Css, &triad.css)
}

fn expand_kind(html: &str, kind: AssetKind, sidecar: &Path) -> String {
    let nodes = split(html, kind.family());
    render(&nodes, |tag| expand_tag(tag, kind, sidecar))
}

fn expand_tag(tag: &Tag, kind: AssetKind, sidecar: &Path) -> String {
    let attrs = tag.attributes();
    let location = attrs.get("location").map_or("", |l| l.trim());
    let is_inline_location = location.eq_ignore_ascii_case("inline");
    let has_body = !tag.inner.trim().is_empty();

    let data = if location.is_empty() || is_inline_location {
        String::new()
    } else {
        format!(r#" data-x-location="{}""#, escape_attr(location))
    };

    if is_inline_location || (location.is_empty() && has_body) {
        let body = if has_body {
            tag.inner.to_string()
        } else {
            fs::read_to_string(sidecar).unwrap_or_else(|_| {
                BuildError::missing("inline asset", sidecar).report();
                String::new()
            })
        };
        return kind.inline(&data, &body);
    }

    if !sidecar.is_file() {
        BuildError::missing("linked asset", sidecar).report();
        return String::new();
    }
    let file = sidecar
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    kind.linked(&data, &file)
}

fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

// ============================================================================
// Phase 2: hoisting
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Region {
    Header,
    Footer,
}

#[derive(Debug)]
struct Hoisted {
    markup: String,
    weight: u32,
    order: usize,
}

/// Parse `header`, `footer-20`, ... into a region and weight.
fn parse_location(value: &str) -> Option<(Region, u32)> {
    let value = value.trim().to_ascii_lowercase();
    let caps = RE_LOCATION.captures(&value)?;
    let region = if &caps[1] == "header" {
        Region::Header
    } else {
        Region::Footer
    };
    let weight = match caps.get(2) {
        Some(w) => w.as_str().parse().ok()?,
        None => DEFAULT_WEIGHT,
    };
    Some((region, weight))
}

/// Byte range of the element opening at `open`, including its closing tag.
fn element_end(html: &str, lower: &str, open: &regex::Match, tag: &str) -> usize {
    if open.as_str().ends_with("/>") || VOID_ELEMENTS.contains(&tag) {
        return open.end();
    }
    find_closing(lower, open.end(), tag).map_or(open.end(), |close| close.end.min(html.len()))
}

impl Compiler<'_> {
    /// Move location-tagged elements into the page head and footer.
    ///
    /// Without a `layout_dir` the markers are only stripped.
    pub(super) fn apply_location_hoisting(
        &mut self,
        html: &str,
        layout_dir: Option<&Path>,
    ) -> String {
        let lower = html.to_ascii_lowercase();
        if !lower.contains("data-x-location") {
            return html.to_string();
        }
        let Some(layout_dir) = layout_dir else {
            return RE_LOCATION_ATTR.replace_all(html, "").into_owned();
        };

        let mut out = String::with_capacity(html.len());
        let mut header = Vec::new();
        let mut footer = Vec::new();
        let mut order = 0;
        let mut pos = 0;

        while let Some(caps) = RE_LOCATED_OPEN.captures_at(html, pos) {
            let Some(open) = caps.get(0) else { break };
            let tag = caps[1].to_ascii_lowercase();
            let end = element_end(html, &lower, &open, &tag);

            out.push_str(&html[pos..open.start()]);
            let sanitized = RE_LOCATION_ATTR.replace_all(&html[open.start()..end], "");

            match parse_location(&caps[2]) {
                Some((region, weight)) => {
                    let markup = self.rewrite_asset_refs(&sanitized, &tag, layout_dir);
                    let item = Hoisted {
                        markup: markup.trim().to_string(),
                        weight,
                        order,
                    };
                    order += 1;
                    match region {
                        Region::Header => header.push(item),
                        Region::Footer => footer.push(item),
                    }
                }
                None => out.push_str(&sanitized),
            }
            pos = end;
        }
        out.push_str(&html[pos..]);

        let out = inject(&out, header, "</head>");
        inject(&out, footer, "</body>")
    }

    fn rewrite_asset_refs(&mut self, markup: &str, tag: &str, layout_dir: &Path) -> String {
        let (pattern, attr, kind) = match tag {
            "script" => (&*RE_SRC, "src", AssetKind::Js),
            "link" if RE_STYLESHEET.is_match(markup) => (&*RE_HREF, "href", AssetKind::Css),
            _ => return markup.to_string(),
        };

        pattern
            .replacen(markup, 1, |caps: &Captures| {
                match self.publish_asset(&caps[1], kind, layout_dir) {
                    Some(url) => format!(r#"{attr}="{url}""#),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }

    /// Copy a referenced asset under `public/assets/` and return its URL.
    fn publish_asset(
        &mut self,
        reference: &str,
        kind: AssetKind,
        layout_dir: &Path,
    ) -> Option<String> {
        let reference = reference.trim();
        if reference.is_empty() || RE_EXTERNAL.is_match(reference) {
            return None;
        }
        let normalized = reference.trim_start_matches(['.', '/', '\\']);
        let file_name = Path::new(normalized).file_name()?.to_str()?.to_ascii_lowercase();

        let paths = &self.ctx.paths;
        let roots = [
            layout_dir.to_path_buf(),
            paths.built_views(),
            paths.built_components(),
        ];
        let Some(source) = roots
            .iter()
            .map(|root| root.join(normalized))
            .find(|candidate| candidate.is_file())
        else {
            BuildError::missing("hoisted asset", reference).report();
            return None;
        };

        let dest = paths.assets_dir(kind.dir()).join(&file_name);
        self.copy_asset_once(&source, &dest)?;

        Some(join_url(&self.ctx.base_url, &["assets", kind.dir(), &file_name]))
    }

    /// Copy at most once per invocation, even under force.
    fn copy_asset_once(&mut self, source: &Path, dest: &Path) -> Option<()> {
        let key = format!("asset:{}", dest.display());
        let force = self.ctx.force && !self.compiled.contains(&key);
        match sync_file(source, dest, force) {
            Ok(_) => {
                self.compiled.insert(key);
                Some(())
            }
            Err(err) => {
                err.report();
                // A stale copy still serves the page.
                mtime(dest).map(|_| ())
            }
        }
    }
}

/// Insert hoisted markup right before `closing` or append it.
fn inject(html: &str, mut items: Vec<Hoisted>, closing: &str) -> String {
    if items.is_empty() {
        return html.to_string();
    }
    items.sort_by_key(|item| (item.weight, item.order));

    let lines: Vec<String> = items.iter().map(|item| indent(&item.markup)).collect();
    let injection = format!("\n{}\n", lines.join("\n"));

    match html.to_ascii_lowercase().find(closing) {
        Some(at) => format!("{}{injection}{}", &html[..at], &html[at..]),
        None => format!("{html}{injection}"),
    }
}

fn indent(markup: &str) -> String {
    markup
        .trim()
        .lines()
        .map(|line| format!("{INDENT}{line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::fixture::{Site, set_mtime};

    fn triad(site: &Site, name: &str) -> Triad {
        Triad::of_dir(&site.ctx.paths.views().join(name)).unwrap()
    }

    #[test]
    fn test_expand_inline_body() {
        let site = Site::new();
        let out = expand_asset_tags("<x-js>let a = 1;</x-js>", &triad(&site, "Base"));
        assert_eq!(out, "<script>let a = 1;</script>");
    }

    #[test]
    fn test_expand_inline_location_reads_sidecar() {
        let site = Site::new();
        site.view("Base", "");
        site.write("layouts/views/Base/Base.css", "body{}");
        let out = expand_asset_tags(r#"<x-css location="INLINE" />"#, &triad(&site, "Base"));
        assert_eq!(out, "<style>body{}</style>");
    }

    #[test]
    fn test_expand_inline_missing_sidecar_is_empty() {
        let site = Site::new();
        let out = expand_asset_tags(r#"<x-js location="inline"/>"#, &triad(&site, "Base"));
        assert_eq!(out, "<script></script>");
    }

    #[test]
    fn test_expand_linked_with_location() {
        let site = Site::new();
        site.view("Base", "");
        site.write("layouts/views/Base/Base.js", "x()");
        site.write("layouts/views/Base/Base.css", "a{}");
        let html = r#"<x-js location="footer-5"></x-js><x-css location="header" />"#;
        let out = expand_asset_tags(html, &triad(&site, "Base"));
        assert_eq!(
            out,
            concat!(
                r#"<script src="Base.js" data-x-location="footer-5"></script>"#,
                r#"<link rel="stylesheet" href="Base.css" data-x-location="header" />"#,
            )
        );
    }

    #[test]
    fn test_expand_linked_missing_sidecar_is_omitted() {
        let site = Site::new();
        let out = expand_asset_tags("a<x-js />b", &triad(&site, "Base"));
        assert_eq!(out, "ab");
    }

    #[test]
    fn test_parse_location() {
        assert_eq!(parse_location("header"), Some((Region::Header, 100)));
        assert_eq!(parse_location("Footer-7"), Some((Region::Footer, 7)));
        assert_eq!(parse_location("inline"), None);
        assert_eq!(parse_location("header-x"), None);
        assert_eq!(parse_location("sidebar"), None);
    }

    #[test]
    fn test_hoisting_order_by_weight_then_document_order() {
        let site = Site::new();
        let dir = site.ctx.paths.views().join("Base");
        let html = concat!(
            "<html><head><title>t</title></head><body>",
            r#"<style data-x-location="header-10">.a{}</style>"#,
            r#"<style data-x-location="header-5">.b{}</style>"#,
            r#"<style data-x-location="header-5">.c{}</style>"#,
            "</body></html>",
        );

        let mut compiler = Compiler::new(&site.ctx);
        let out = compiler.apply_location_hoisting(html, Some(&dir));

        let expected_head = concat!(
            "<head><title>t</title>\n",
            "    <style>.b{}</style>\n",
            "    <style>.c{}</style>\n",
            "    <style>.a{}</style>\n",
            "</head>",
        );
        assert!(out.contains(expected_head), "{out}");
        assert!(out.contains("<body></body>"));
    }

    #[test]
    fn test_unparseable_location_stays_in_place() {
        let site = Site::new();
        let dir = site.ctx.paths.views().join("Base");
        let html = r#"<body><p>x</p><style data-x-location="aside">.a{}</style></body>"#;

        let mut compiler = Compiler::new(&site.ctx);
        let out = compiler.apply_location_hoisting(html, Some(&dir));
        assert_eq!(out, "<body><p>x</p><style>.a{}</style></body>");
    }

    #[test]
    fn test_without_layout_dir_only_strips() {
        let site = Site::new();
        let html = r#"<head></head><script src="a.js" data-x-location="header"></script>"#;
        let mut compiler = Compiler::new(&site.ctx);
        let out = compiler.apply_location_hoisting(html, None);
        assert_eq!(out, r#"<head></head><script src="a.js"></script>"#);
    }

    #[test]
    fn test_hoisted_assets_are_copied_and_rewritten() {
        let mut site = Site::new();
        site.ctx.base_url = "https://x.dev".into();
        site.view("Base", "");
        site.write("layouts/views/Base/Base.js", "run()");
        site.write("layouts/built/components/Card.css", ".card{}");
        let dir = site.ctx.paths.views().join("Base");

        let html = concat!(
            "<html><head></head><body>",
            r#"<script src="Base.js" data-x-location="footer"></script>"#,
            r#"<link rel="stylesheet" href="Card.css" data-x-location="header" />"#,
            r#"<script src="https://cdn.x/lib.js" data-x-location="footer-1"></script>"#,
            "</body></html>",
        );
        let mut compiler = Compiler::new(&site.ctx);
        let out = compiler.apply_location_hoisting(html, Some(&dir));

        assert!(out.contains(
            r#"    <link rel="stylesheet" href="https://x.dev/assets/css/card.css" />"#
        ));
        let footer = concat!(
            "\n",
            r#"    <script src="https://cdn.x/lib.js"></script>"#,
            "\n",
            r#"    <script src="https://x.dev/assets/js/base.js"></script>"#,
            "\n</body>",
        );
        assert!(out.contains(footer), "{out}");
        assert_eq!(site.read("public/assets/js/base.js"), "run()");
        assert_eq!(site.read("public/assets/css/card.css"), ".card{}");
    }

    #[test]
    fn test_hoisted_copy_skipped_when_fresh() {
        let site = Site::new();
        site.view("Base", "");
        let src = site.write("layouts/views/Base/Base.js", "new()");
        let dest = site.write("public/assets/js/base.js", "old()");
        set_mtime(&src, 100);
        set_mtime(&dest, 200);
        let dir = site.ctx.paths.views().join("Base");
        let html = r#"<script src="Base.js" data-x-location="footer"></script>"#;

        let out = Compiler::new(&site.ctx).apply_location_hoisting(html, Some(&dir));
        assert!(out.contains(r#"src="/assets/js/base.js""#), "{out}");
        assert_eq!(site.read("public/assets/js/base.js"), "old()");

        let forced = site.forced();
        Compiler::new(&forced).apply_location_hoisting(html, Some(&dir));
        assert_eq!(site.read("public/assets/js/base.js"), "new()");
    }

    #[test]
    fn test_inject_appends_without_closing_tag() {
        let items = vec![Hoisted {
            markup: "<script></script>".into(),
            weight: 100,
            order: 0,
        }];
        assert_eq!(inject("<p>x</p>", items, "</body>"), "<p>x</p>\n    <script></script>\n");
    }
}
