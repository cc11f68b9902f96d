//! Component compilation and inclusion.
//!
//! ```text
//! <x-c-Card title="Hi">              built/components/Card.html
//!   <x-content-body>..</x-content-body>        │
//! </x-c-Card>                                  ▼
//!        │                      {{title}} params from attributes
//!        │                                     │
//!        └──────── slots ──────────────────────┤
//!                                              ▼
//!                                   nested <x-c-*> included again
//! ```
//!
//! Components never inherit (`<x-use>` is not resolved inside them) but may
//! include other components.

use super::{
    BuildError, Compiler, Triad,
    assets::expand_asset_tags,
    find_dir, list_dirs, read_source,
    staleness::{ensure_dir, is_stale, mtime},
};
use crate::{
    log,
    template::{Tag, TagFamily, apply_params, fill_slots, find_tags, render, split},
};
use rustc_hash::FxHashSet;
use std::{
    fs,
    path::{Path, PathBuf},
    time::SystemTime,
};

impl Compiler<'_> {
    /// Compile every component directory. Returns how many are available.
    pub fn build_components(&mut self) -> usize {
        list_dirs(&self.ctx.paths.components())
            .iter()
            .filter(|dir| self.build_component(dir).is_some())
            .count()
    }

    /// Compiled HTML of component `name`, compiling it first when stale.
    pub(super) fn ensure_component(&mut self, name: &str) -> Option<PathBuf> {
        let root = self.ctx.paths.components();
        let Some(dir) = find_dir(&root, name) else {
            BuildError::missing("component", root.join(name)).report();
            return None;
        };
        self.build_component(&dir)
    }

    /// Compile one component directory into `built/components/`.
    pub fn build_component(&mut self, dir: &Path) -> Option<PathBuf> {
        let triad = Triad::of_dir(dir)?;
        let key = format!("component:{}", triad.name.to_ascii_lowercase());
        let built_dir = self.ctx.paths.built_components();
        let built = triad.built_in(&built_dir);

        if self.compiled.contains(&key) {
            return Some(built.html);
        }
        if !triad.html.is_file() {
            BuildError::missing("component html", &triad.html).report();
            return None;
        }
        let source = read_source(&triad.html)?;

        if !self.enter(&key) {
            log!("warn"; "component `{}` includes itself", triad.name);
            return None;
        }
        let mut sources = triad.mtimes();
        sources.extend(self.component_dependencies(&source));
        self.leave();

        if let Err(err) = ensure_dir(&built_dir) {
            err.report();
            return None;
        }

        if is_stale(&sources, mtime(&built.html), self.ctx.force) {
            log!("component"; "{}", triad.name);
            let html = expand_asset_tags(&source, &triad);
            if let Err(err) = fs::write(&built.html, html) {
                BuildError::io(&built.html, err).report();
                return None;
            }
        }
        self.sync_sidecars(&triad, &built);

        self.compiled.insert(key);
        Some(built.html)
    }

    /// Compiled timestamps of the components used by `html`, built first.
    pub(super) fn component_dependencies(&mut self, html: &str) -> Vec<SystemTime> {
        let mut seen = FxHashSet::default();
        let names: Vec<String> = find_tags(html, TagFamily::Component)
            .into_iter()
            .map(|usage| usage.name.to_string())
            .filter(|name| seen.insert(name.to_ascii_lowercase()))
            .collect();

        names
            .iter()
            .filter_map(|name| self.ensure_component(name))
            .filter_map(|path| mtime(&path))
            .collect()
    }

    /// Replace every `<x-c-*>` usage in `html` by the composed component.
    pub(super) fn include_components(&mut self, html: &str) -> String {
        let nodes = split(html, TagFamily::Component);
        render(&nodes, |usage| self.include_usage(usage))
    }

    fn include_usage(&mut self, usage: &Tag) -> String {
        let key = usage.name.to_ascii_lowercase();
        if self.including.contains(&key) {
            log!("warn"; "component `{}` includes itself, usage dropped", usage.name);
            return String::new();
        }

        let Some(path) = self.ensure_component(usage.name) else {
            return String::new();
        };
        let html = match fs::read_to_string(&path) {
            Ok(html) if !html.trim().is_empty() => html,
            _ => {
                BuildError::missing("compiled component", path).report();
                return String::new();
            }
        };

        let html = apply_params(&html, &usage.attributes());
        let html = fill_slots(&html, usage.inner);

        self.including.push(key);
        let html = self.include_components(&html);
        self.including.pop();
        html
    }
}
