//! Change classification and rebuild plans for watch mode.
//!
//! The filesystem side lives in [`crate::watch`]; this module only turns a
//! list of changes into the smallest rebuild that covers them.
//!
//! # Classification (first match wins)
//!
//! | Change                              | Action                           |
//! |-------------------------------------|----------------------------------|
//! | path no longer exists               | full                             |
//! | content root, `.md`                 | rebuild that document            |
//! | content root, other file            | full                             |
//! | `layouts/views/<L>/..`              | rebuild layout `<L>`, then full  |
//! | `layouts/components/<C>/..`         | rebuild component `<C>`, then full |
//! | anything else                       | full                             |
//!
//! A full build supersedes the queued document rebuilds.

use super::{Compiler, pages::is_markdown};
use crate::config::{SitePaths, path_is_within};
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub kind: ChangeKind,
    pub path: PathBuf,
}

impl Change {
    pub fn new(kind: ChangeKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }
}

/// What one change set requires, in execution order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RebuildPlan {
    pub layouts: Vec<PathBuf>,
    pub components: Vec<PathBuf>,
    pub markdown: Vec<PathBuf>,
    pub full: bool,
}

fn push_unique(queue: &mut Vec<PathBuf>, path: PathBuf) {
    if !queue.contains(&path) {
        queue.push(path);
    }
}

/// Top-level directory under `root` that contains `path`.
///
/// Files sitting directly in `root` belong to no directory.
fn owning_dir(path: &Path, root: &Path) -> Option<PathBuf> {
    let rel = path.strip_prefix(root).ok()?;
    let mut parts = rel.components();
    let first = match parts.next()? {
        Component::Normal(name) => name,
        _ => return None,
    };
    parts.next()?;
    Some(root.join(first))
}

/// Classify `changes` into a rebuild plan.
///
/// `exists` is queried once per change; it is a parameter so planning stays
/// independent of the real filesystem.
pub fn plan(changes: &[Change], paths: &SitePaths, exists: impl Fn(&Path) -> bool) -> RebuildPlan {
    let views = paths.views();
    let components = paths.components();
    let mut plan = RebuildPlan::default();

    for change in changes {
        let path = &change.path;

        if change.kind == ChangeKind::Removed || !exists(path) {
            plan.full = true;
        } else if path_is_within(path, &paths.content) {
            if is_markdown(path) {
                push_unique(&mut plan.markdown, path.clone());
            } else {
                plan.full = true;
            }
        } else if path_is_within(path, &views) {
            if let Some(dir) = owning_dir(path, &views) {
                push_unique(&mut plan.layouts, dir);
            }
            plan.full = true;
        } else if path_is_within(path, &components) {
            if let Some(dir) = owning_dir(path, &components) {
                push_unique(&mut plan.components, dir);
            }
            plan.full = true;
        } else {
            plan.full = true;
        }
    }

    plan
}

impl Compiler<'_> {
    /// Run a plan. Returns the number of pages produced.
    pub fn execute(&mut self, plan: &RebuildPlan) -> usize {
        for dir in &plan.layouts {
            self.build_layout(dir);
        }
        for dir in &plan.components {
            self.build_component(dir);
        }

        if plan.full {
            self.build_components();
            self.build_layouts();
            self.build_documents()
        } else {
            plan.markdown.iter().map(|path| self.build_page(path)).sum()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::fixture::Site;

    fn paths() -> SitePaths {
        SitePaths::new("/s/content", "/s/layouts", "/s/public", "/s/cache")
    }

    fn modified(path: &str) -> Change {
        Change::new(ChangeKind::Modified, path)
    }

    #[test]
    fn test_single_markdown_change_is_targeted() {
        let plan = plan(&[modified("/s/content/blog/a.md")], &paths(), |_| true);
        assert!(!plan.full);
        assert_eq!(plan.markdown, [PathBuf::from("/s/content/blog/a.md")]);
        assert!(plan.layouts.is_empty() && plan.components.is_empty());
    }

    #[test]
    fn test_removed_file_forces_full_build() {
        let changes = [Change::new(ChangeKind::Removed, "/s/content/a.md")];
        assert!(plan(&changes, &paths(), |_| true).full);

        let changes = [modified("/s/layouts/views/Base/Base.html")];
        assert!(plan(&changes, &paths(), |_| false).full);
    }

    #[test]
    fn test_other_content_files_force_full_build() {
        let plan = plan(&[modified("/s/content/img/logo.png")], &paths(), |_| true);
        assert!(plan.full);
        assert!(plan.markdown.is_empty());
    }

    #[test]
    fn test_layout_and_component_changes() {
        let changes = [
            modified("/s/layouts/views/Base/Base.css"),
            modified("/s/layouts/views/Base/Base.html"),
            modified("/s/layouts/components/Card/Card.html"),
            modified("/s/layouts/views/stray.html"),
        ];
        let plan = plan(&changes, &paths(), |_| true);
        assert!(plan.full);
        assert_eq!(plan.layouts, [PathBuf::from("/s/layouts/views/Base")]);
        assert_eq!(plan.components, [PathBuf::from("/s/layouts/components/Card")]);
    }

    #[test]
    fn test_markdown_queue_is_deduplicated() {
        let changes = [
            Change::new(ChangeKind::Created, "/s/content/a.md"),
            modified("/s/content/b.md"),
            modified("/s/content/a.md"),
        ];
        let plan = plan(&changes, &paths(), |_| true);
        assert_eq!(
            plan.markdown,
            [PathBuf::from("/s/content/a.md"), PathBuf::from("/s/content/b.md")]
        );
    }

    #[test]
    fn test_paths_outside_roots_force_full_build() {
        let plan = plan(&[modified("/s/avex.toml")], &paths(), |_| true);
        assert!(plan.full);
    }

    #[test]
    fn test_execute_targeted_markdown() {
        let site = Site::new();
        site.view("Base", "<x-md/>");
        let a = site.write("content/a.md", "---\nlayout: Base\n---\nA");
        site.write("content/b.md", "---\nlayout: Base\n---\nB");

        let plan = RebuildPlan {
            markdown: vec![a],
            ..Default::default()
        };
        assert_eq!(Compiler::new(&site.ctx).execute(&plan), 1);
        assert!(site.ctx.paths.public.join("a.html").exists());
        assert!(!site.ctx.paths.public.join("b.html").exists());
    }

    #[test]
    fn test_execute_full_supersedes_queue() {
        let site = Site::new();
        site.view("Base", "<x-md/>");
        let a = site.write("content/a.md", "---\nlayout: Base\n---\nA");
        site.write("content/b.md", "---\nlayout: Base\n---\nB");

        let plan = RebuildPlan {
            markdown: vec![a],
            full: true,
            ..Default::default()
        };
        assert_eq!(Compiler::new(&site.ctx).execute(&plan), 2);
        assert!(site.ctx.paths.public.join("b.html").exists());
    }
}
