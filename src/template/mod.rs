//! Template language shared by layouts, components and pages.
//!
//! - **tag**: custom tag scanner and attribute parser
//! - **params**: `{{param|default}}` tokens
//! - **slots**: `<x-content-*>` fill/fallback substitution

pub mod params;
pub mod slots;
pub mod tag;

pub use params::{apply_params, replace_token};
pub use slots::{fill_slots, unwrap_slots};
pub use tag::{Tag, TagFamily, find_tags, render, split};
