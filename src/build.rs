//! Site building orchestration.
//!
//! # Architecture
//!
//! ```text
//! build_site()
//!     │
//!     ├── BuildContext::from_config()  ── paths, base URL, force (one invocation)
//!     │
//!     ├── build_components() ──► layouts/built/components/
//!     ├── build_layouts()    ──► layouts/built/views/
//!     └── build_documents()  ──► public/**/*.html
//! ```
//!
//! A failing artifact is reported and skipped; the build itself only fails
//! when the output directory cannot be created.

use crate::{
    compiler::{BuildContext, Compiler},
    config::SiteConfig,
    log,
};
use anyhow::{Context, Result};
use std::fs;

/// Build the entire site. Returns the number of pages produced.
pub fn build_site(config: &SiteConfig, force: bool) -> Result<usize> {
    let ctx = BuildContext::from_config(config, force);
    build_with(&ctx)
}

/// Build with an explicit context.
pub fn build_with(ctx: &BuildContext) -> Result<usize> {
    let public = &ctx.paths.public;
    fs::create_dir_all(public)
        .with_context(|| format!("Failed to create output directory {}", public.display()))?;

    if ctx.force {
        log!("build"; "forced rebuild");
    }

    let mut compiler = Compiler::new(ctx);
    let components = compiler.build_components();
    let layouts = compiler.build_layouts();
    let pages = compiler.build_documents();

    log!("build"; "{components} components, {layouts} layouts");
    log!("build"; "done ({pages} pages)");
    Ok(pages)
}
