//! Markdown body conversion.

use pulldown_cmark::{Event, Options, Parser, html};

/// Converts a document body to an HTML fragment.
pub trait MarkdownConverter {
    fn to_html(&self, body: &str) -> String;
}

/// CommonMark with tables, footnotes, strikethrough and task lists.
///
/// Soft line breaks are kept as `<br />`.
#[derive(Debug, Default, Clone, Copy)]
pub struct CommonMark;

impl MarkdownConverter for CommonMark {
    fn to_html(&self, body: &str) -> String {
        let options = Options::ENABLE_TABLES
            | Options::ENABLE_FOOTNOTES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_TASKLISTS;

        let parser = Parser::new_ext(body, options).map(|event| match event {
            Event::SoftBreak => Event::HardBreak,
            other => other,
        });

        let mut out = String::with_capacity(body.len() * 3 / 2);
        html::push_html(&mut out, parser);
        out
    }
}
