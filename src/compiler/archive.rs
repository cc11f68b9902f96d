//! Archive pagination over sibling documents.
//!
//! ```text
//! <x-f-list use="PostItem" itemsperpage="20" orderby="timestamp desc">
//!   fallback
//! </x-f-list>
//!
//! siblings with use-* keys ──► sort ──► chunks of 20 ──► index.html
//!                                                        index-2.html
//!                                                        index-3.html
//! ```
//!
//! Each item renders the component with `{{FILE}}` set to the sibling's URL
//! and `{{field}}` set from its `use-field` front-matter keys.

use super::{
    BuildError, Compiler,
    document::Document,
    pages::{is_markdown, resolve_output_name, unwrap_lists},
    staleness::write_if_changed,
};
use crate::{
    config::join_url,
    log,
    template::{TagFamily, apply_params, find_tags, replace_token, unwrap_slots},
};
use rustc_hash::FxHashMap;
use std::{
    fs,
    path::{Path, PathBuf},
    time::SystemTime,
};

const DEFAULT_ITEMS_PER_PAGE: usize = 20;
const DEFAULT_ORDER_BY: &str = "timestamp desc";

/// One sibling document projected for a listing.
#[derive(Debug, Clone)]
pub struct ArchiveItem {
    /// Sibling file name, the stable ordering key.
    pub name: String,
    pub timestamp: SystemTime,
    pub url: String,
    pub fields: FxHashMap<String, String>,
}

/// Requested `orderby="field dir"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortOrder {
    pub by_timestamp: bool,
    pub ascending: bool,
}

impl SortOrder {
    pub fn parse(value: &str) -> Self {
        let mut parts = value.split_whitespace();
        let field = parts.next().unwrap_or_default();
        let direction = parts.next().unwrap_or_default();
        Self {
            by_timestamp: field.eq_ignore_ascii_case("timestamp"),
            ascending: direction.eq_ignore_ascii_case("asc"),
        }
    }
}

/// Sort items; ties always fall back to ascending file name.
pub fn sort_items(items: &mut [ArchiveItem], order: SortOrder) {
    items.sort_by(|a, b| {
        let primary = if order.by_timestamp {
            a.timestamp.cmp(&b.timestamp)
        } else {
            a.name.cmp(&b.name)
        };
        let primary = if order.ascending {
            primary
        } else {
            primary.reverse()
        };
        primary.then_with(|| a.name.cmp(&b.name))
    });
}

/// Split items into pages of `per_page`. No items means no pages.
pub fn paginate<T>(items: &[T], per_page: usize) -> Vec<&[T]> {
    items.chunks(per_page.max(1)).collect()
}

/// `itemsperpage` value, defaulting when missing, malformed or below 1.
fn items_per_page(value: Option<&String>) -> usize {
    value
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|n| *n >= 1)
        .unwrap_or(DEFAULT_ITEMS_PER_PAGE)
}

/// File name of page `index` (0-based): `base.html`, `base-2.html`, ...
fn page_name(basename: &str, index: usize) -> String {
    match index {
        0 => format!("{basename}.html"),
        k => format!("{basename}-{}.html", k + 1),
    }
}

impl Compiler<'_> {
    /// Paginate the first `<x-f-list>` of `html`.
    ///
    /// Returns how many pages are in place; a page that fails to write is
    /// reported and skipped.
    pub(super) fn build_archive(&mut self, doc: &Document, html: &str, output: &Path) -> usize {
        let lists = find_tags(html, TagFamily::List);
        let Some(list) = lists.first() else {
            return 0;
        };
        if lists.len() > 1 {
            log!(
                "warn";
                "{} has {} lists, only the first is paginated",
                doc.path.display(),
                lists.len()
            );
        }

        let attrs = list.attributes();
        let Some(component) = attrs.get("use").map(|c| c.trim()).filter(|c| !c.is_empty()) else {
            log!("warn"; "list in {} has no `use` component", doc.path.display());
            return 0;
        };
        let Some(component_path) = self.ensure_component(component) else {
            return 0;
        };
        let item_html = match fs::read_to_string(&component_path) {
            Ok(text) if !text.trim().is_empty() => text,
            _ => {
                BuildError::missing("compiled component", component_path).report();
                return 0;
            }
        };

        let mut items = self.collect_items(doc);
        let order = SortOrder::parse(attrs.get("orderby").map_or(DEFAULT_ORDER_BY, String::as_str));
        sort_items(&mut items, order);

        let basename = output
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .and_then(|n| n.split('.').next().map(str::to_string))
            .unwrap_or_default();
        let dir = output.parent().unwrap_or(&self.ctx.paths.public);

        let per_page = items_per_page(attrs.get("itemsperpage"));
        let mut written = 0;
        for (index, page) in paginate(&items, per_page).iter().enumerate() {
            let listing: String = page
                .iter()
                .map(|item| {
                    let html = replace_token(&item_html, "FILE", &item.url);
                    unwrap_slots(&apply_params(&html, &item.fields))
                })
                .collect();
            let html = format!(
                "{}{listing}{}",
                &html[..list.span.start],
                unwrap_lists(&html[list.span.end..])
            );

            let path = dir.join(page_name(&basename, index));
            match write_if_changed(&path, &html) {
                Ok(changed) => {
                    if changed {
                        log!("archive"; "{}", self.public_display(&path));
                    }
                    written += 1;
                }
                Err(err) => err.report(),
            }
        }

        written
    }

    /// Sibling documents of `doc` that carry `use-*` keys.
    fn collect_items(&self, doc: &Document) -> Vec<ArchiveItem> {
        let Some(dir) = doc.path.parent() else {
            return Vec::new();
        };
        let Ok(entries) = fs::read_dir(dir) else {
            return Vec::new();
        };

        let rel_dir = self
            .ctx
            .paths
            .public_dir_for(dir)
            .strip_prefix(&self.ctx.paths.public)
            .map(|p| p.to_string_lossy().replace('\\', "/"))
            .unwrap_or_default();

        let mut siblings: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_ok_and(|t| t.is_file()))
            .filter(|e| !e.file_name().to_string_lossy().starts_with('.'))
            .map(|e| e.path())
            .filter(|p| is_markdown(p) && *p != doc.path)
            .collect();
        siblings.sort();

        siblings
            .iter()
            .filter_map(|path| self.archive_item(path, &rel_dir))
            .collect()
    }

    fn archive_item(&self, path: &Path, rel_dir: &str) -> Option<ArchiveItem> {
        let sibling = Document::load(path).map_err(|err| err.report()).ok()?;
        let fields = sibling.archive_fields();
        if fields.is_empty() {
            return None;
        }

        let name = path.file_name()?.to_string_lossy().into_owned();
        let stem = path.file_stem()?.to_string_lossy().into_owned();
        let file = resolve_output_name(sibling.get("file"), &stem)
            .map_err(|err| err.report())
            .ok()?;
        let file = file.to_string_lossy().replace('\\', "/");

        let meta = fs::metadata(path).ok()?;
        let timestamp = meta
            .created()
            .or_else(|_| meta.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);

        Some(ArchiveItem {
            name,
            timestamp,
            url: join_url(&self.ctx.base_url, &[rel_dir, &file]),
            fields,
        })
    }
}
