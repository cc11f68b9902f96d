//! Content documents: front matter and body.
//!
//! ```text
//! ---
//! layout: Post
//! file: "hello.html"
//! use-title: Hello
//! ---
//! # Markdown body
//! ```

use super::BuildError;
use regex::Regex;
use rustc_hash::FxHashMap;
use std::{
    fs,
    path::{Path, PathBuf},
    sync::LazyLock,
};

static RE_FRONT_MATTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^---[ \t]*\r?\n(.*?)\r?\n---[ \t]*(?:\r?\n|$)").unwrap());

/// Prefix of front-matter keys projected into archive listings.
pub const ARCHIVE_PREFIX: &str = "use-";

pub type FrontMatter = FxHashMap<String, String>;

#[derive(Debug, Clone)]
pub struct Document {
    pub path: PathBuf,
    pub front_matter: FrontMatter,
    pub body: String,
}

impl Document {
    pub fn load(path: &Path) -> Result<Self, BuildError> {
        let text = fs::read_to_string(path).map_err(|err| BuildError::io(path, err))?;
        Ok(Self::parse(path, &text))
    }

    pub fn parse(path: &Path, text: &str) -> Self {
        let (front_matter, body) = split_front_matter(text);
        Self {
            path: path.to_path_buf(),
            front_matter,
            body: body.to_string(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.front_matter
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// `use-*` keys with the prefix stripped.
    pub fn archive_fields(&self) -> FxHashMap<String, String> {
        self.front_matter
            .iter()
            .filter_map(|(key, value)| {
                key.strip_prefix(ARCHIVE_PREFIX)
                    .map(|field| (field.to_string(), value.clone()))
            })
            .collect()
    }
}

/// Split a leading `---` block from the body.
pub fn split_front_matter(text: &str) -> (FrontMatter, &str) {
    let Some(caps) = RE_FRONT_MATTER.captures(text) else {
        return (FrontMatter::default(), text);
    };
    let block = caps.get(1).map_or("", |m| m.as_str());
    let body = &text[caps.get(0).map_or(0, |m| m.end())..];
    (parse_block(block), body)
}

fn parse_block(block: &str) -> FrontMatter {
    block
        .lines()
        .filter_map(|line| line.split_once(':'))
        .filter_map(|(key, value)| {
            let key = key.trim();
            let value = value.trim_matches([' ', '\t', '\r', '\n', '"', '\'']);
            (!key.is_empty()).then(|| (key.to_string(), value.to_string()))
        })
        .collect()
}
