//! Layout resolution and compilation.
//!
//! ```text
//! resolve("Post")
//!     │
//!     ├── find layouts/views/<post> (case-insensitive)
//!     ├── resolve used layouts + components first ──► dependency mtimes
//!     ├── fresh? ──► sync sidecars, return built/views/Post.html
//!     └── stale:
//!           read Post.html
//!             → compose_layout   (<x-use> + slots, then components)
//!             → expand <x-js>/<x-css>
//!             → write built/views/Post.html, sync sidecars
//! ```
//!
//! A layout's sources are its own triad plus the compiled artifacts of every
//! layout it uses and every component it includes, so editing a base layout
//! invalidates the layouts built on top of it.

use super::{
    BuildError, Compiler, Triad,
    assets::expand_asset_tags,
    find_dir, list_dirs, read_source,
    staleness::{ensure_dir, is_stale, mtime},
};
use crate::{
    log,
    template::{Tag, TagFamily, fill_slots, find_tags, render, split},
};
use rustc_hash::FxHashSet;
use std::{
    fs,
    path::{Path, PathBuf},
    time::SystemTime,
};

impl Compiler<'_> {
    /// Compile every layout directory. Returns how many are available.
    pub fn build_layouts(&mut self) -> usize {
        list_dirs(&self.ctx.paths.views())
            .iter()
            .filter(|dir| self.build_layout(dir).is_some())
            .count()
    }

    /// Source directory of layout `name`.
    pub(super) fn layout_dir(&self, name: &str) -> Option<PathBuf> {
        find_dir(&self.ctx.paths.views(), name)
    }

    /// Compiled HTML path of layout `name`, compiling it when stale.
    pub fn resolve(&mut self, name: &str) -> Option<PathBuf> {
        let Some(dir) = self.layout_dir(name) else {
            BuildError::missing("layout", self.ctx.paths.views().join(name)).report();
            return None;
        };
        self.build_layout(&dir)
    }

    /// Compile one layout directory into `built/views/`.
    pub fn build_layout(&mut self, dir: &Path) -> Option<PathBuf> {
        let triad = Triad::of_dir(dir)?;
        let key = format!("layout:{}", triad.name.to_ascii_lowercase());
        let built_dir = self.ctx.paths.built_views();
        let built = triad.built_in(&built_dir);

        if self.compiled.contains(&key) {
            return Some(built.html);
        }
        if !triad.html.is_file() {
            BuildError::missing("layout html", &triad.html).report();
            return None;
        }
        let source = read_source(&triad.html)?;

        if !self.enter(&key) {
            log!("warn"; "layout `{}` uses itself", triad.name);
            return None;
        }
        let compiled = self.compile_layout(&triad, &built, &source);
        self.leave();

        if compiled {
            self.compiled.insert(key);
            Some(built.html)
        } else {
            None
        }
    }

    fn compile_layout(&mut self, triad: &Triad, built: &Triad, source: &str) -> bool {
        let mut sources = triad.mtimes();
        sources.extend(self.layout_dependencies(source));

        let Some(built_dir) = built.html.parent() else {
            return false;
        };
        if let Err(err) = ensure_dir(built_dir) {
            err.report();
            return false;
        }

        if is_stale(&sources, mtime(&built.html), self.ctx.force) {
            log!("layout"; "{}", triad.name);
            let html = self.compose_layout(source);
            let html = expand_asset_tags(&html, triad);
            if let Err(err) = fs::write(&built.html, html) {
                BuildError::io(&built.html, err).report();
                return false;
            }
        }
        self.sync_sidecars(triad, built);
        true
    }

    /// Compiled timestamps of used layouts and included components.
    fn layout_dependencies(&mut self, source: &str) -> Vec<SystemTime> {
        let mut seen = FxHashSet::default();
        let used: Vec<String> = find_tags(source, TagFamily::Use)
            .into_iter()
            .map(|usage| usage.name.to_string())
            .filter(|name| seen.insert(name.to_ascii_lowercase()))
            .collect();

        let mut times: Vec<SystemTime> = used
            .iter()
            .filter_map(|name| self.resolve(name))
            .filter_map(|path| mtime(&path))
            .collect();
        times.extend(self.component_dependencies(source));
        times
    }

    /// Substitute every `<x-use>` usage, then include components.
    pub(super) fn compose_layout(&mut self, html: &str) -> String {
        let nodes = split(html, TagFamily::Use);
        let composed = render(&nodes, |usage| self.expand_use(usage));
        self.include_components(&composed)
    }

    fn expand_use(&mut self, usage: &Tag) -> String {
        let Some(path) = self.resolve(usage.name) else {
            return String::new();
        };
        match fs::read_to_string(&path) {
            Ok(used) if !used.trim().is_empty() => fill_slots(&used, usage.inner),
            _ => {
                BuildError::missing("compiled layout", path).report();
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::compiler::Compiler;
    use crate::compiler::fixture::{Site, at, set_mtime};
    use crate::compiler::staleness::mtime;
    use std::fs;

    const BASE: &str = "<html><head></head><body><x-content-main><p>F</p></x-content-main><x-content-foot>(c)</x-content-foot></body></html>";

    #[test]
    fn test_resolve_composes_used_layout() {
        let site = Site::new();
        site.view("Base", BASE);
        site.view(
            "Post",
            r#"<x-use "base"><x-content-main><article><x-md></x-md></article></x-content-main><x-content-foot> </x-content-foot></x-use>"#,
        );

        let built = Compiler::new(&site.ctx).resolve("post").unwrap();
        assert_eq!(built, site.ctx.paths.built_views().join("Post.html"));
        assert_eq!(
            site.read("layouts/built/views/Post.html"),
            "<html><head></head><body><article><x-md></x-md></article>(c)</body></html>"
        );
        // the used layout is compiled along the way
        assert_eq!(site.read("layouts/built/views/Base.html"), BASE);
    }

    #[test]
    fn test_missing_layout() {
        let site = Site::new();
        assert!(Compiler::new(&site.ctx).resolve("Nope").is_none());
    }

    #[test]
    fn test_missing_used_layout_drops_usage() {
        let site = Site::new();
        site.view("Post", r#"a<x-use "Ghost"><x-content-main>x</x-content-main></x-use>b"#);
        Compiler::new(&site.ctx).resolve("Post").unwrap();
        assert_eq!(site.read("layouts/built/views/Post.html"), "ab");
    }

    #[test]
    fn test_components_included_after_composition() {
        let site = Site::new();
        site.view("Base", BASE);
        site.component("Nav", "<nav>{{active|home}}</nav>");
        site.view(
            "Page",
            r#"<x-use "Base"><x-content-main><x-c-Nav active="blog"></x-c-Nav></x-content-main></x-use>"#,
        );

        Compiler::new(&site.ctx).resolve("Page").unwrap();
        assert_eq!(
            site.read("layouts/built/views/Page.html"),
            "<html><head></head><body><nav>blog</nav>(c)</body></html>"
        );
    }

    #[test]
    fn test_fresh_layout_syncs_sidecars_only() {
        let site = Site::new();
        let html = site.view("Base", "<p>v1</p>");
        Compiler::new(&site.ctx).build_layouts();

        let built = site.ctx.paths.built_views().join("Base.html");
        fs::write(&html, "<p>v2</p>").unwrap();
        set_mtime(&html, 100);
        set_mtime(&built, 200);
        site.write("layouts/views/Base/Base.js", "go()");
        set_mtime(&site.ctx.paths.views().join("Base/Base.js"), 150);

        Compiler::new(&site.ctx).build_layouts();
        assert_eq!(site.read("layouts/built/views/Base.html"), "<p>v1</p>");
        assert_eq!(mtime(&built), Some(at(200)));
        assert_eq!(site.read("layouts/built/views/Base.js"), "go()");
    }

    #[test]
    fn test_newer_sidecar_recompiles_layout() {
        let site = Site::new();
        let html = site.view("Base", "<x-js location=\"inline\" />");
        let js = site.write("layouts/views/Base/Base.js", "one()");
        Compiler::new(&site.ctx).build_layouts();
        assert_eq!(site.read("layouts/built/views/Base.html"), "<script>one()</script>");

        let built = site.ctx.paths.built_views().join("Base.html");
        set_mtime(&html, 100);
        set_mtime(&built, 200);
        fs::write(&js, "two()").unwrap();
        set_mtime(&js, 300);

        Compiler::new(&site.ctx).build_layouts();
        assert_eq!(site.read("layouts/built/views/Base.html"), "<script>two()</script>");
    }

    #[test]
    fn test_changed_base_layout_invalidates_child() {
        let site = Site::new();
        let base = site.view("Base", BASE);
        let post = site.view("Post", r#"<x-use "Base"></x-use>"#);
        Compiler::new(&site.ctx).build_layouts();

        let built_base = site.ctx.paths.built_views().join("Base.html");
        let built_post = site.ctx.paths.built_views().join("Post.html");
        set_mtime(&post, 100);
        set_mtime(&built_post, 200);
        set_mtime(&built_base, 150);
        fs::write(&base, "<main><x-content-main>new</x-content-main></main>").unwrap();
        set_mtime(&base, 300);

        Compiler::new(&site.ctx).build_layouts();
        assert_eq!(site.read("layouts/built/views/Post.html"), "<main>new</main>");
    }

    #[test]
    fn test_force_recompiles() {
        let site = Site::new();
        let html = site.view("Base", "<p>v1</p>");
        Compiler::new(&site.ctx).build_layouts();

        let built = site.ctx.paths.built_views().join("Base.html");
        fs::write(&html, "<p>v2</p>").unwrap();
        set_mtime(&html, 100);
        set_mtime(&built, 200);

        Compiler::new(&site.forced()).build_layouts();
        assert_eq!(site.read("layouts/built/views/Base.html"), "<p>v2</p>");
    }

    #[test]
    fn test_cyclic_layouts_terminate() {
        let site = Site::new();
        site.view("A", r#"a<x-use "B"></x-use>"#);
        site.view("B", r#"b<x-use "A"></x-use>"#);

        let mut compiler = Compiler::new(&site.ctx);
        assert!(compiler.resolve("A").is_some());
        assert_eq!(site.read("layouts/built/views/B.html"), "b");
        assert_eq!(site.read("layouts/built/views/A.html"), "ab");
    }
}
