//! Markdown documents to HTML pages.
//!
//! ```text
//! content/blog/post.md
//!     │ front matter ── layout ──► resolve() ──► built/views/<Layout>.html
//!     ▼
//! {{params}} → unwrap slots → <x-md> ← markdown body → hoisting
//!     │
//!     ├── <x-f-list> with items ──► public/blog/post.html, post-2.html, ...
//!     └── otherwise             ──► public/blog/post.html
//! ```

use super::{
    BuildError, Compiler,
    document::Document,
    staleness::{ensure_dir, write_if_changed},
};
use crate::{
    log,
    template::{TagFamily, apply_params, find_tags, render, split, unwrap_slots},
};
use regex::{NoExpand, Regex};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::LazyLock,
};
use walkdir::WalkDir;

/// `<x-md></x-md>`, `<x-md/>` or `<x-md />`
static RE_MARKDOWN_SLOT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<x-md\s*(?:/>|>\s*</x-md\s*>)").unwrap());

impl Compiler<'_> {
    /// Build every markdown document under the content root.
    ///
    /// Returns the number of pages produced.
    pub fn build_documents(&mut self) -> usize {
        collect_markdown(&self.ctx.paths.content)
            .iter()
            .map(|path| self.build_page(path))
            .sum()
    }

    /// Build one document, reporting instead of propagating failures.
    pub fn build_page(&mut self, path: &Path) -> usize {
        self.build_document(path).unwrap_or_else(|err| {
            err.report();
            0
        })
    }

    /// Compose, render and write one document. Returns the page count.
    pub fn build_document(&mut self, path: &Path) -> Result<usize, BuildError> {
        let mut doc = Document::load(path)?;
        let layout = doc
            .get("layout")
            .map(str::to_string)
            .ok_or_else(|| BuildError::MissingLayout(path.to_path_buf()))?;
        let layout_dir = self
            .layout_dir(&layout)
            .ok_or_else(|| BuildError::missing("layout", self.ctx.paths.views().join(&layout)))?;
        let Some(built) = self.build_layout(&layout_dir) else {
            return Ok(0);
        };
        let template = fs::read_to_string(&built).map_err(|err| BuildError::io(&built, err))?;

        doc.front_matter
            .entry("base_url".to_string())
            .or_insert_with(|| self.ctx.base_url.clone());

        let html = apply_params(&template, &doc.front_matter);
        let html = unwrap_slots(&html);
        let body = self.markdown.to_html(&doc.body);
        let html = RE_MARKDOWN_SLOT.replace(&html, NoExpand(&body)).into_owned();
        let html = self.apply_location_hoisting(&html, Some(&layout_dir));

        let output = self.output_path(&doc)?;
        if let Some(parent) = output.parent() {
            ensure_dir(parent)?;
        }

        let pages = self.build_archive(&doc, &html, &output);
        if pages > 0 {
            return Ok(pages);
        }

        let html = unwrap_lists(&html);
        if write_if_changed(&output, &html)? {
            log!("page"; "{}", self.public_display(&output));
        }
        Ok(1)
    }

    /// Destination of a document under the public root.
    pub(super) fn output_path(&self, doc: &Document) -> Result<PathBuf, BuildError> {
        let stem = doc
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let rel = resolve_output_name(doc.get("file"), &stem)?;
        let dir = doc
            .path
            .parent()
            .map_or_else(|| self.ctx.paths.public.clone(), |d| self.ctx.paths.public_dir_for(d));
        Ok(dir.join(rel))
    }

    /// Path relative to the public root, for log lines.
    pub(super) fn public_display(&self, path: &Path) -> String {
        path.strip_prefix(&self.ctx.paths.public)
            .unwrap_or(path)
            .display()
            .to_string()
    }
}

/// Relative output file for a `file` front-matter value.
///
/// Defaults to `<stem>.html`; a trailing `/` appends the default name; any
/// `..` segment is rejected.
pub(super) fn resolve_output_name(file: Option<&str>, stem: &str) -> Result<PathBuf, BuildError> {
    let default = format!("{stem}.html");
    let raw = file.map(str::trim).filter(|f| !f.is_empty()).unwrap_or(&default);

    let mut name = raw.replace('\\', "/");
    if name.ends_with('/') {
        name.push_str(&default);
    }

    let mut rel = PathBuf::new();
    for part in name.split('/') {
        match part {
            "" | "." => {}
            ".." => return Err(BuildError::PathTraversal(raw.to_string())),
            part => rel.push(part),
        }
    }
    if rel.as_os_str().is_empty() {
        rel.push(default);
    }
    Ok(rel)
}

/// Replace every `<x-f-list>` by its fallback content.
pub(super) fn unwrap_lists(html: &str) -> String {
    if find_tags(html, TagFamily::List).is_empty() {
        return html.to_string();
    }
    let nodes = split(html, TagFamily::List);
    render(&nodes, |list| list.inner.to_string())
}

/// Markdown files under `root`, sorted, hidden entries excluded.
pub(crate) fn collect_markdown(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'))
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(|p| is_markdown(p))
        .collect()
}

pub(crate) fn is_markdown(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("md"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::fixture::{Site, set_mtime};
    use crate::compiler::staleness::mtime;

    const BASE: &str = concat!(
        "<html><head><title>{{use-title|Untitled}}</title></head>",
        "<body><x-content-main><x-md></x-md></x-content-main>",
        "<x-js location=\"footer\" /></body></html>",
    );

    #[test]
    fn test_resolve_output_name() {
        let name = |file: Option<&str>| resolve_output_name(file, "post");
        assert_eq!(name(None).unwrap(), PathBuf::from("post.html"));
        assert_eq!(name(Some("  ")).unwrap(), PathBuf::from("post.html"));
        assert_eq!(name(Some("/index.html")).unwrap(), PathBuf::from("index.html"));
        assert_eq!(name(Some("docs/")).unwrap(), PathBuf::from("docs/post.html"));
        assert_eq!(name(Some("a\\.\\b.html")).unwrap(), PathBuf::from("a/b.html"));
        assert!(matches!(
            name(Some("../../etc/x.html")),
            Err(BuildError::PathTraversal(_))
        ));
    }

    #[test]
    fn test_build_document_end_to_end() {
        let site = Site::new();
        site.view("Base", BASE);
        site.write("layouts/views/Base/Base.js", "run()");
        let md = site.write(
            "content/blog/hello.md",
            "---\nlayout: base\nuse-title: Hello\n---\nline one\nline two\n",
        );

        let pages = Compiler::new(&site.ctx).build_document(&md).unwrap();
        assert_eq!(pages, 1);

        let html = site.read("public/blog/hello.html");
        assert!(html.contains("<title>Hello</title>"));
        assert!(html.contains("<p>line one<br />\nline two</p>"));
        assert!(html.contains("\n    <script src=\"/assets/js/base.js\"></script>\n</body>"));
        assert!(!html.contains("x-md"));
        assert_eq!(site.read("public/assets/js/base.js"), "run()");
    }

    #[test]
    fn test_base_url_defaults_from_config() {
        let mut site = Site::new();
        site.ctx.base_url = "https://x.dev".into();
        site.view("Base", r#"<a href="{{base_url}}/">home</a><x-md/>"#);
        let md = site.write("content/a.md", "---\nlayout: Base\n---\n");
        let other = site.write("content/b.md", "---\nlayout: Base\nbase_url: /local\n---\n");

        let mut compiler = Compiler::new(&site.ctx);
        compiler.build_document(&md).unwrap();
        compiler.build_document(&other).unwrap();
        assert!(site.read("public/a.html").starts_with(r#"<a href="https://x.dev/">"#));
        assert!(site.read("public/b.html").starts_with(r#"<a href="/local/">"#));
    }

    #[test]
    fn test_document_without_layout_is_skipped() {
        let site = Site::new();
        let md = site.write("content/a.md", "# no front matter");
        let err = Compiler::new(&site.ctx).build_document(&md).unwrap_err();
        assert!(matches!(err, BuildError::MissingLayout(_)));
        assert_eq!(Compiler::new(&site.ctx).build_page(&md), 0);
        assert!(!site.ctx.paths.public.join("a.html").exists());
    }

    #[test]
    fn test_document_with_unknown_layout_is_skipped() {
        let site = Site::new();
        let md = site.write("content/a.md", "---\nlayout: Ghost\n---\n");
        let err = Compiler::new(&site.ctx).build_document(&md).unwrap_err();
        assert!(err.is_gap());
    }

    #[test]
    fn test_path_traversal_is_rejected() {
        let site = Site::new();
        site.view("Base", "<x-md/>");
        let md = site.write("content/a.md", "---\nlayout: Base\nfile: ../escape.html\n---\n");
        let err = Compiler::new(&site.ctx).build_document(&md).unwrap_err();
        assert!(matches!(err, BuildError::PathTraversal(_)));
        assert!(!site.root().join("escape.html").exists());
    }

    #[test]
    fn test_unfilled_list_falls_back() {
        let site = Site::new();
        site.view("Base", r#"<ul><x-f-list use="Item">nothing yet</x-f-list></ul>"#);
        site.component("Item", "<li>{{title}}</li>");
        let md = site.write("content/index.md", "---\nlayout: Base\n---\n");

        assert_eq!(Compiler::new(&site.ctx).build_document(&md).unwrap(), 1);
        assert_eq!(site.read("public/index.html"), "<ul>nothing yet</ul>");
    }

    #[test]
    fn test_unchanged_page_is_not_rewritten() {
        let site = Site::new();
        site.view("Base", "<main><x-md></x-md></main>");
        let md = site.write("content/a.md", "---\nlayout: Base\n---\ntext");
        Compiler::new(&site.ctx).build_document(&md).unwrap();

        let out = site.ctx.paths.public.join("a.html");
        set_mtime(&out, 100);
        Compiler::new(&site.ctx).build_document(&md).unwrap();
        assert_eq!(mtime(&out), Some(crate::compiler::fixture::at(100)));
    }

    struct Shout;

    impl crate::compiler::MarkdownConverter for Shout {
        fn to_html(&self, body: &str) -> String {
            body.trim().to_uppercase()
        }
    }

    #[test]
    fn test_custom_markdown_converter() {
        let site = Site::new();
        site.view("Base", "<p><x-md /></p>");
        let md = site.write("content/a.md", "---\nlayout: Base\n---\nquiet $1");

        Compiler::with_markdown(&site.ctx, Box::new(Shout)).build_document(&md).unwrap();
        assert_eq!(site.read("public/a.html"), "<p>QUIET $1</p>");
    }

    #[test]
    fn test_collect_markdown_skips_hidden() {
        let site = Site::new();
        site.write("content/b.md", "");
        site.write("content/a/c.MD", "");
        site.write("content/.drafts/d.md", "");
        site.write("content/.e.md", "");
        site.write("content/f.txt", "");

        let found = collect_markdown(&site.ctx.paths.content);
        let names: Vec<_> = found
            .iter()
            .map(|p| p.strip_prefix(&site.ctx.paths.content).unwrap().to_path_buf())
            .collect();
        assert_eq!(names, vec![PathBuf::from("a/c.MD"), PathBuf::from("b.md")]);
    }
}
