//! Widget handlers and the context they share.
//!
//! Every handler has the same shape: it reads the [`ExpansionContext`],
//! writes to the output and answers whether the enclosing body should be
//! expanded again. Only `files`, `pwd` and `root` ever answer `true`.
//!
//! Handlers that need a directory (or a news item) write nothing when the
//! context has none, as when a feed's head or tail is expanded.
//!
//! Sidecar files are read relative to the directory of the current
//! snapshot. A missing sidecar is normal; any other read failure is logged
//! and the widget writes whatever it had.

use crate::config::ConventionsConfig;
use crate::directory::{Cursor, DirectorySnapshot, DirectoryTree, SnapshotId};
use crate::naming;
use crate::news::NewsItem;
use chrono::{DateTime, Utc};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;
use tracing::warn;

const PARENT_DIR: &str = "..";
const SEPARATOR: &str = "/";

/// Everything a widget may look at or change during one expansion.
pub struct ExpansionContext<'a> {
    conventions: &'a ConventionsConfig,
    now: DateTime<Utc>,
    directory: Option<(&'a mut DirectoryTree, SnapshotId)>,
    news: Option<&'a NewsItem>,
    /// `..` steps still owed by the current `root` walk.
    root_steps: usize,
    /// The handler being called is repeating a body, not starting one.
    repeating: bool,
}

impl<'a> ExpansionContext<'a> {
    pub fn new(conventions: &'a ConventionsConfig, now: DateTime<Utc>) -> Self {
        Self {
            conventions,
            now,
            directory: None,
            news: None,
            root_steps: 0,
            repeating: false,
        }
    }

    pub fn with_directory(mut self, tree: &'a mut DirectoryTree, id: SnapshotId) -> Self {
        self.directory = Some((tree, id));
        self
    }

    pub fn with_news(mut self, news: &'a NewsItem) -> Self {
        self.news = Some(news);
        self
    }

    pub(crate) fn set_repeating(&mut self, repeating: bool) {
        self.repeating = repeating;
    }

    pub fn has_directory(&self) -> bool {
        self.directory.is_some()
    }

    fn snapshot(&self) -> Option<&DirectorySnapshot> {
        let (tree, id) = self.directory.as_ref()?;
        tree.get(*id).ok()
    }

    fn snapshot_mut(&mut self) -> Option<&mut DirectorySnapshot> {
        let (tree, id) = self.directory.as_mut()?;
        tree.get_mut(*id).ok()
    }

    fn levels_below_root(&self) -> usize {
        self.directory
            .as_ref()
            .map_or(0, |(tree, id)| tree.levels_below_root(*id))
    }
}

/// Copy at most `max_lines` lines of `path` to `out`.
///
/// Returns `Ok(false)` when the file could not be opened. Output errors are
/// returned; input errors are logged.
fn copy_lines(path: &Path, out: &mut dyn Write, max_lines: usize, report_missing: bool) -> io::Result<bool> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) => {
            if report_missing || e.kind() != io::ErrorKind::NotFound {
                warn!("{}: {e}", path.display());
            }
            return Ok(false);
        }
    };
    let mut reader = BufReader::new(file);
    let mut line = Vec::new();
    for _ in 0..max_lines {
        line.clear();
        match reader.read_until(b'\n', &mut line) {
            Ok(0) => break,
            Ok(_) => out.write_all(&line)?,
            Err(e) => {
                warn!("{}: {e}", path.display());
                break;
            }
        }
    }
    Ok(true)
}

/// First line of `path`, without its line ending.
fn first_line(path: &Path) -> Option<String> {
    let file = File::open(path)
        .map_err(|e| warn!("{}: {e}", path.display()))
        .ok()?;
    let mut line = String::new();
    BufReader::new(file)
        .read_line(&mut line)
        .map_err(|e| warn!("{}: {e}", path.display()))
        .ok()?;
    let end = line.find(['\n', '\r']).unwrap_or(line.len());
    line.truncate(end);
    Some(line)
}

/// `content.d` of the current directory, or `index.d` when there is none.
pub fn content(ctx: &mut ExpansionContext<'_>, out: &mut dyn Write) -> io::Result<bool> {
    let Some(snapshot) = ctx.snapshot() else {
        return Ok(false);
    };
    let conventions = ctx.conventions;
    let dir = snapshot.path();
    if !copy_lines(&dir.join(&conventions.directory_content), out, conventions.max_lines, false)? {
        copy_lines(&dir.join(&conventions.directory_description), out, conventions.max_lines, false)?;
    }
    Ok(false)
}

/// ISO 8601 date of the news item.
pub fn date(ctx: &mut ExpansionContext<'_>, out: &mut dyn Write) -> io::Result<bool> {
    if let Some(news) = ctx.news {
        write!(out, "{}", news.date)?;
    }
    Ok(false)
}

pub fn file_alt(ctx: &mut ExpansionContext<'_>, out: &mut dyn Write) -> io::Result<bool> {
    if let Some(snapshot) = ctx.snapshot() {
        let alt = if snapshot.is_selected_directory() { "Dir" } else { "File" };
        out.write_all(alt.as_bytes())?;
    }
    Ok(false)
}

/// Description sidecar of the selected entry: `<dir>/index.d` or `<file>.d`.
pub fn file_desc(ctx: &mut ExpansionContext<'_>, out: &mut dyn Write) -> io::Result<bool> {
    let Some(snapshot) = ctx.snapshot() else {
        return Ok(false);
    };
    let Some(entry) = snapshot.selected() else {
        return Ok(false);
    };
    let conventions = ctx.conventions;
    let path = naming::description_path(snapshot.path(), &entry.name, entry.is_dir, conventions);
    copy_lines(&path, out, conventions.max_lines, false)?;
    Ok(false)
}

/// The href of a `.link` entry, otherwise the entry name.
pub fn file_href(ctx: &mut ExpansionContext<'_>, out: &mut dyn Write) -> io::Result<bool> {
    let Some(snapshot) = ctx.snapshot() else {
        return Ok(false);
    };
    let Some(entry) = snapshot.selected() else {
        return Ok(false);
    };
    let href = if naming::is_link(&entry.name, ctx.conventions) {
        first_line(&snapshot.path().join(&entry.name))
    } else {
        None
    };
    out.write_all(href.as_deref().unwrap_or(&entry.name).as_bytes())?;
    Ok(false)
}

/// The entry's own icon if it has one, else the generic icon at the root.
pub fn file_icon(ctx: &mut ExpansionContext<'_>, out: &mut dyn Write) -> io::Result<bool> {
    let conventions = ctx.conventions;
    let Some((icon, has_own, is_dir)) = ctx.snapshot().and_then(|snapshot| {
        let entry = snapshot.selected()?;
        let icon = naming::icon_name(&entry.name, conventions);
        let has_own = snapshot.path().join(&icon).is_file();
        Some((icon, has_own, entry.is_dir))
    }) else {
        return Ok(false);
    };
    if has_own {
        out.write_all(icon.as_bytes())?;
        return Ok(false);
    }

    // The site root is not necessarily the server root, so climb relatively.
    for _ in 0..ctx.levels_below_root() {
        write!(out, "{PARENT_DIR}{SEPARATOR}")?;
    }
    out.write_all(naming::generic_icon(is_dir, conventions).as_bytes())?;
    Ok(false)
}

pub fn file_name(ctx: &mut ExpansionContext<'_>, out: &mut dyn Write) -> io::Result<bool> {
    if let Some(snapshot) = ctx.snapshot() {
        out.write_all(snapshot.selected_name().as_bytes())?;
    }
    Ok(false)
}

/// Select the next entry; repeat while there is one.
pub fn files(ctx: &mut ExpansionContext<'_>, _out: &mut dyn Write) -> io::Result<bool> {
    let repeating = ctx.repeating;
    let Some(snapshot) = ctx.snapshot_mut() else {
        return Ok(false);
    };
    // A nested `@(files)` already ran the cycle out; restarting would loop forever.
    if repeating && snapshot.cursor() == Cursor::Unset {
        return Ok(false);
    }
    Ok(snapshot.advance())
}

/// ` (N KB)` for plain files.
pub fn file_size(ctx: &mut ExpansionContext<'_>, out: &mut dyn Write) -> io::Result<bool> {
    if let Some(entry) = ctx.snapshot().and_then(DirectorySnapshot::selected)
        && !entry.is_dir
    {
        write!(out, " ({} KB)", entry.size_kb)?;
    }
    Ok(false)
}

/// The file the news item announces, verbatim.
pub fn news(ctx: &mut ExpansionContext<'_>, out: &mut dyn Write) -> io::Result<bool> {
    if let Some(news) = ctx.news {
        copy_lines(&news.target, out, ctx.conventions.max_lines, true)?;
    }
    Ok(false)
}

pub fn news_name(ctx: &mut ExpansionContext<'_>, out: &mut dyn Write) -> io::Result<bool> {
    if let Some(news) = ctx.news {
        out.write_all(news.name.as_bytes())?;
    }
    Ok(false)
}

/// Current time, UTC, ISO 8601.
pub fn now(ctx: &mut ExpansionContext<'_>, out: &mut dyn Write) -> io::Result<bool> {
    write!(out, "{}", ctx.now.format("%Y-%m-%dT%H:%M:%SZ"))?;
    Ok(false)
}

/// One directory name per repetition, root to leaf: `@(pwd){/}`.
///
/// Every invocation starts a fresh walk, so a body-less `@(pwd)` (which
/// prints only the first segment) leaves nothing behind for the next one.
pub fn pwd(ctx: &mut ExpansionContext<'_>, out: &mut dyn Write) -> io::Result<bool> {
    let repeating = ctx.repeating;
    let Some((tree, id)) = ctx.directory.as_mut() else {
        return Ok(false);
    };
    if !repeating {
        tree.mark_path_to_root(*id);
    }
    match tree.next_path_segment(*id) {
        Some(segment) => {
            out.write_all(segment.as_bytes())?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// `..` once per level below the root: `@(root){/}`.
pub fn root(ctx: &mut ExpansionContext<'_>, out: &mut dyn Write) -> io::Result<bool> {
    if !ctx.repeating {
        ctx.root_steps = ctx.levels_below_root();
    }
    if ctx.root_steps == 0 {
        return Ok(false);
    }
    ctx.root_steps -= 1;
    out.write_all(PARENT_DIR.as_bytes())?;
    Ok(true)
}

pub fn title(ctx: &mut ExpansionContext<'_>, out: &mut dyn Write) -> io::Result<bool> {
    if let Some(news) = ctx.news {
        out.write_all(news.title.as_bytes())?;
    }
    Ok(false)
}
