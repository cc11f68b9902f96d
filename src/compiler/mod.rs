//! Template composition and incremental build engine.
//!
//! - **layout**: `<x-use>` inheritance and layout compilation
//! - **component**: `<x-c-*>` inclusion and component compilation
//! - **assets**: `<x-js>`/`<x-css>` expansion and header/footer hoisting
//! - **staleness**: the stale/fresh rule shared by every cached artifact
//! - **pages**: markdown documents to HTML pages
//! - **archive**: `<x-f-list>` pagination over sibling documents
//! - **watch**: change classification and rebuild plans
//!
//! # Build Flow
//!
//! ```text
//! build_components() ──► build_layouts() ──► build_document() per .md
//!        │                     │                     │
//!        ▼                     ▼                     ▼
//!  built/components/     built/views/         public/**/*.html
//! ```
//!
//! All state of one build invocation lives in a [`Compiler`] borrowing a
//! [`BuildContext`]; nothing is global.

mod archive;
mod assets;
mod component;
mod document;
mod error;
mod layout;
mod markdown;
mod pages;
mod staleness;
pub mod watch;

pub use error::BuildError;
pub use markdown::{CommonMark, MarkdownConverter};

use crate::config::{SitePaths, SiteConfig};
use rustc_hash::FxHashSet;
use staleness::{mtimes, sync_file};
use std::{
    fs,
    path::{Path, PathBuf},
    time::SystemTime,
};

// ============================================================================
// Build context
// ============================================================================

/// Settings of one build invocation.
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub paths: SitePaths,
    /// Site base URL without trailing slash; empty for root-relative URLs.
    pub base_url: String,
    /// Regenerate every artifact regardless of freshness.
    pub force: bool,
}

impl BuildContext {
    pub fn from_config(config: &SiteConfig, force: bool) -> Self {
        Self {
            paths: config.paths(),
            base_url: config.base_url().to_string(),
            force,
        }
    }
}

// ============================================================================
// Compiler
// ============================================================================

/// Per-invocation build state.
pub struct Compiler<'a> {
    ctx: &'a BuildContext,
    markdown: Box<dyn MarkdownConverter>,
    /// Layouts and components currently being compiled (cycle guard).
    compiling: Vec<String>,
    /// Components currently being included (cycle guard).
    including: Vec<String>,
    /// Artifacts already compiled by this invocation.
    compiled: FxHashSet<String>,
}

impl<'a> Compiler<'a> {
    pub fn new(ctx: &'a BuildContext) -> Self {
        Self::with_markdown(ctx, Box::new(CommonMark))
    }

    pub fn with_markdown(ctx: &'a BuildContext, markdown: Box<dyn MarkdownConverter>) -> Self {
        Self {
            ctx,
            markdown,
            compiling: Vec::new(),
            including: Vec::new(),
            compiled: FxHashSet::default(),
        }
    }

    /// Enter a compile scope. `false` when `key` is already on the stack.
    fn enter(&mut self, key: &str) -> bool {
        if self.compiling.iter().any(|k| k == key) {
            return false;
        }
        self.compiling.push(key.to_string());
        true
    }

    fn leave(&mut self) {
        self.compiling.pop();
    }

    /// Copy the CSS/JS sidecars of `source` next to its compiled HTML.
    fn sync_sidecars(&self, source: &Triad, built: &Triad) {
        for (src, dst) in [(&source.css, &built.css), (&source.js, &built.js)] {
            if let Err(err) = sync_file(src, dst, self.ctx.force) {
                err.report();
            }
        }
    }
}

// ============================================================================
// Shared helpers
// ============================================================================

/// The `Name.html`/`Name.css`/`Name.js` files of a layout or component.
#[derive(Debug, Clone)]
struct Triad {
    name: String,
    html: PathBuf,
    css: PathBuf,
    js: PathBuf,
}

impl Triad {
    /// Triad of a source directory named after its files.
    fn of_dir(dir: &Path) -> Option<Self> {
        let name = dir.file_name()?.to_str()?;
        Some(Self::in_dir(dir, name))
    }

    fn in_dir(dir: &Path, name: &str) -> Self {
        Self {
            name: name.to_string(),
            html: dir.join(format!("{name}.html")),
            css: dir.join(format!("{name}.css")),
            js: dir.join(format!("{name}.js")),
        }
    }

    /// Where this triad lands once compiled into `built_dir`.
    fn built_in(&self, built_dir: &Path) -> Self {
        Self::in_dir(built_dir, &self.name)
    }

    fn mtimes(&self) -> Vec<SystemTime> {
        mtimes([self.html.as_path(), self.css.as_path(), self.js.as_path()])
    }
}

/// Read a source or artifact file, reporting failures.
fn read_source(path: &Path) -> Option<String> {
    fs::read_to_string(path)
        .map_err(|err| BuildError::io(path, err).report())
        .ok()
}

/// Find a sub-directory of `root` by name, exact match first, then
/// ASCII case-insensitive.
fn find_dir(root: &Path, name: &str) -> Option<PathBuf> {
    let name = name.trim();
    if name.is_empty() || name.contains(['/', '\\']) || matches!(name, "." | "..") {
        return None;
    }

    let direct = root.join(name);
    if direct.is_dir() {
        return Some(direct);
    }

    list_dirs(root).into_iter().find(|dir| {
        dir.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.eq_ignore_ascii_case(name))
    })
}

/// Non-hidden sub-directories of `root`, sorted.
fn list_dirs(root: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(root) else {
        return Vec::new();
    };
    let mut dirs: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_ok_and(|t| t.is_dir()))
        .filter(|e| !e.file_name().to_string_lossy().starts_with('.'))
        .map(|e| e.path())
        .collect();
    dirs.sort();
    dirs
}

// ============================================================================
// Test fixtures
// ============================================================================
