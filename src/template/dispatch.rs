//! The widget registry.
//!
//! Names are matched case-sensitively and in full: `file` does not resolve
//! to `filename`, nor `filesx` to `files`. The table must stay in ASCII order
//! for the binary search.

use super::widgets::{self, ExpansionContext};
use std::io::{self, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Widget {
    Content,
    Date,
    FileAlt,
    FileDesc,
    FileHref,
    FileIcon,
    FileName,
    Files,
    FileSize,
    News,
    NewsName,
    Now,
    Pwd,
    Root,
    Title,
}

pub const REGISTRY: &[(&str, Widget)] = &[
    ("content", Widget::Content),
    ("date", Widget::Date),
    ("filealt", Widget::FileAlt),
    ("filedesc", Widget::FileDesc),
    ("filehref", Widget::FileHref),
    ("fileicon", Widget::FileIcon),
    ("filename", Widget::FileName),
    ("files", Widget::Files),
    ("filesize", Widget::FileSize),
    ("htmlcontent", Widget::Content),
    ("news", Widget::News),
    ("newsname", Widget::NewsName),
    ("now", Widget::Now),
    ("pwd", Widget::Pwd),
    ("root", Widget::Root),
    ("title", Widget::Title),
];

/// Resolve an invocation name. `None` for anything not in [`REGISTRY`].
pub fn lookup(name: &str) -> Option<Widget> {
    // Byte order: a proper prefix sorts before the longer name, so prefixes
    // never compare equal.
    REGISTRY
        .binary_search_by(|(symbol, _)| symbol.as_bytes().cmp(name.as_bytes()))
        .ok()
        .map(|i| REGISTRY[i].1)
}

impl Widget {
    /// Run the widget. `true` asks for the enclosing body to be expanded
    /// again.
    pub fn invoke(self, ctx: &mut ExpansionContext<'_>, out: &mut dyn Write) -> io::Result<bool> {
        match self {
            Widget::Content => widgets::content(ctx, out),
            Widget::Date => widgets::date(ctx, out),
            Widget::FileAlt => widgets::file_alt(ctx, out),
            Widget::FileDesc => widgets::file_desc(ctx, out),
            Widget::FileHref => widgets::file_href(ctx, out),
            Widget::FileIcon => widgets::file_icon(ctx, out),
            Widget::FileName => widgets::file_name(ctx, out),
            Widget::Files => widgets::files(ctx, out),
            Widget::FileSize => widgets::file_size(ctx, out),
            Widget::News => widgets::news(ctx, out),
            Widget::NewsName => widgets::news_name(ctx, out),
            Widget::Now => widgets::now(ctx, out),
            Widget::Pwd => widgets::pwd(ctx, out),
            Widget::Root => widgets::root(ctx, out),
            Widget::Title => widgets::title(ctx, out),
        }
    }
}
