//! `{{param}}` / `{{param|default}}` token substitution.
//!
//! | Token             | Param present | Param absent        |
//! |-------------------|---------------|---------------------|
//! | `{{p}}`           | value         | token kept verbatim |
//! | `{{p\|fallback}}` | value         | `fallback`          |
//!
//! Substituted values are inserted literally; tokens appearing inside a
//! value are never expanded again.

use regex::{Captures, Regex};
use std::{collections::HashMap, hash::BuildHasher, sync::LazyLock};

static RE_PARAM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([a-zA-Z_][a-zA-Z0-9_:\-]*)\s*(?:\|\s*([^}]*))?\}\}").unwrap()
});

/// Replace every param token in `html` using `params`.
pub fn apply_params<S: BuildHasher>(html: &str, params: &HashMap<String, String, S>) -> String {
    RE_PARAM
        .replace_all(html, |caps: &Captures| {
            if let Some(value) = params.get(&caps[1]) {
                return value.clone();
            }
            match caps.get(2) {
                Some(default) => default.as_str().trim_end().to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Replace a single literal token such as `{{FILE}}`.
pub fn replace_token(html: &str, token: &str, value: &str) -> String {
    html.replace(&format!("{{{{{token}}}}}"), value)
}
