//! Centralized path resolution for source roots, compiled artifacts and URLs.
//!
//! # Layout
//!
//! ```text
//! SitePaths
//!     │
//!     ├── content               → /abs/content
//!     ├── layouts               → /abs/layouts
//!     │     ├── views()              → layouts/views/<Layout>/<Layout>.{html,css,js}
//!     │     ├── components()         → layouts/components/<Name>/<Name>.{html,css,js}
//!     │     └── built()              → layouts/built
//!     │           ├── built_views()       → compiled layouts
//!     │           └── built_components()  → compiled components
//!     ├── public                → /abs/public
//!     │     └── assets_dir("js") → public/assets/js
//!     └── cache                 → /abs/storage/cache
//! ```

use std::path::{Path, PathBuf};

/// Absolute roots of one site, resolved once per build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitePaths {
    pub content: PathBuf,
    pub layouts: PathBuf,
    pub public: PathBuf,
    pub cache: PathBuf,
}

impl SitePaths {
    pub fn new(
        content: impl Into<PathBuf>,
        layouts: impl Into<PathBuf>,
        public: impl Into<PathBuf>,
        cache: impl Into<PathBuf>,
    ) -> Self {
        Self {
            content: content.into(),
            layouts: layouts.into(),
            public: public.into(),
            cache: cache.into(),
        }
    }

    /// Layout source directories.
    pub fn views(&self) -> PathBuf {
        self.layouts.join("views")
    }

    /// Component source directories.
    pub fn components(&self) -> PathBuf {
        self.layouts.join("components")
    }

    /// Root of every compiled artifact. Excluded from watching.
    pub fn built(&self) -> PathBuf {
        self.layouts.join("built")
    }

    pub fn built_views(&self) -> PathBuf {
        self.built().join("views")
    }

    pub fn built_components(&self) -> PathBuf {
        self.built().join("components")
    }

    /// Destination of hoisted assets: `public/assets/<kind>`.
    pub fn assets_dir(&self, kind: &str) -> PathBuf {
        self.public.join("assets").join(kind)
    }

    /// Mirror a content directory into the public tree.
    ///
    /// Directories outside the content root map to the public root.
    pub fn public_dir_for(&self, content_dir: &Path) -> PathBuf {
        match content_dir.strip_prefix(&self.content) {
            Ok(rel) => self.public.join(rel),
            Err(_) => self.public.clone(),
        }
    }
}

/// Check whether `path` is `root` or lies below it.
pub fn path_is_within(path: &Path, root: &Path) -> bool {
    !root.as_os_str().is_empty() && path.starts_with(root)
}

/// Join a base URL and path segments with single slashes.
///
/// An empty base yields a root-relative URL.
///
/// ```ignore
/// join_url("https://x.dev/", &["blog", "post.html"]) // → "https://x.dev/blog/post.html"
/// join_url("", &["", "post.html"])                    // → "/post.html"
/// ```
pub fn join_url(base: &str, segments: &[&str]) -> String {
    let mut url = base.trim_end_matches('/').to_string();
    for segment in segments {
        for part in segment.split(['/', '\\']).filter(|p| !p.is_empty()) {
            url.push('/');
            url.push_str(part);
        }
    }
    url
}
