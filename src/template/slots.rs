//! Content-block (slot) substitution.
//!
//! A template declares `<x-content-KEY>fallback</x-content-KEY>`; the usage
//! that includes it may carry a block with the same key. For every declared
//! block exactly one of the two survives:
//!
//! ```text
//! fill present and not blank ──► fill
//! otherwise                  ──► fallback
//! ```
//!
//! Blocks that sit inside a nested `<x-c-*>` usage belong to that usage and
//! are neither placeholders nor fills at this level.

use super::tag::{Node, Tag, TagFamily, find_tags, render, split_at_tags};
use rustc_hash::FxHashMap;

/// Content blocks of `markup` that are not inside a component usage.
fn own_blocks(markup: &str) -> Vec<Tag<'_>> {
    let usages = find_tags(markup, TagFamily::Component);
    find_tags(markup, TagFamily::Content)
        .into_iter()
        .filter(|block| {
            !usages.iter().any(|usage| {
                usage.span.start <= block.span.start && block.span.end <= usage.span.end
            })
        })
        .collect()
}

/// Fill blocks supplied by a usage, keyed by lowercased name. Last one wins.
fn collect_fills(usage_inner: &str) -> FxHashMap<String, &str> {
    own_blocks(usage_inner)
        .into_iter()
        .map(|block| (block.name.to_ascii_lowercase(), block.inner))
        .collect()
}

/// Substitute the blocks of `usage_inner` into the placeholders of `template`.
pub fn fill_slots(template: &str, usage_inner: &str) -> String {
    let fills = collect_fills(usage_inner);
    let nodes: Vec<Node> = split_at_tags(template, own_blocks(template));

    render(&nodes, |block| {
        match fills.get(&block.name.to_ascii_lowercase()) {
            Some(fill) if !fill.trim().is_empty() => (*fill).to_string(),
            _ => block.inner.to_string(),
        }
    })
}

/// Replace every remaining placeholder by its fallback content.
pub fn unwrap_slots(html: &str) -> String {
    fill_slots(html, "")
}
