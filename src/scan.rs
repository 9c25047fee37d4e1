//! Read-only walk of the content tree.
//!
//! Visits the same directories with the same listing rules as
//! [`generate`](crate::generate), but writes nothing. Used by `check` to show
//! what a build would list, and to catch template mistakes before they end up
//! in a site.
//!
//! ```text
//! content/
//! ├── .index.html          # template, never listed
//! ├── make-index.toml      # config, never listed
//! ├── index.d              # description of content/ itself
//! ├── album/
//! │   ├── index.d          # description of album/, shown by @(filedesc)
//! │   └── beach.jpg
//! ├── beach.jpg.d          # hidden sidecar
//! ├── story.html
//! ├── story.html.news      # announces story.html in the news feed
//! └── draft.txt            # hidden: draft.txt.d exists and is empty
//! ```

use crate::config::{self, SiteConfig};
use crate::directory::{DirectoryError, DirectoryTree, SnapshotId};
use crate::naming::{self, Inclusion};
use crate::news;
use crate::template::{self, parser};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),
}

#[derive(Debug, Serialize)]
pub struct ScanReport {
    pub templates: Vec<TemplateStatus>,
    /// Parents before children, in listing order.
    pub directories: Vec<ScannedDirectory>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub news: Vec<ScannedNews>,
    pub config: SiteConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct TemplateStatus {
    pub template: String,
    pub output: String,
    pub present: bool,
    /// Split into head, body and tail.
    pub sections: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unknown_widgets: Vec<String>,
    /// Has an `@(` with no closing `)`.
    pub unterminated: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScannedDirectory {
    /// Breadcrumb from the root, `a/b/`; empty for the root.
    pub path: String,
    /// Directories first, then files.
    pub entries: Vec<ScannedEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScannedEntry {
    pub name: String,
    pub is_dir: bool,
    pub size_kb: u64,
    /// First line of the entry's description sidecar.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScannedNews {
    pub path: String,
    pub date: String,
    pub title: String,
    pub target_exists: bool,
}

pub fn scan(root: &Path) -> Result<ScanReport, ScanError> {
    let config = config::load_config(root)?;

    let templates = [
        (&config.templates.index, &config.outputs.index, false),
        (&config.templates.sitemap, &config.outputs.sitemap, true),
        (&config.templates.newsfeed, &config.outputs.newsfeed, true),
    ]
    .into_iter()
    .map(|(name, output, sectioned)| check_template(root, name, output, sectioned))
    .collect::<Result<Vec<_>, _>>()?;

    let mut report = ScanReport {
        templates,
        directories: Vec::new(),
        news: Vec::new(),
        config,
    };
    let mut tree = DirectoryTree::new();
    let config = report.config.clone();
    scan_directory(&mut tree, None, root, &config, &mut report)?;
    Ok(report)
}

fn check_template(
    root: &Path,
    name: &str,
    output: &str,
    sectioned: bool,
) -> Result<TemplateStatus, ScanError> {
    let path = root.join(name);
    let source = match fs::read_to_string(&path) {
        Ok(source) => Some(source),
        Err(e) if e.kind() == io::ErrorKind::NotFound => None,
        Err(source) => return Err(ScanError::Io { path, source }),
    };
    let (unknown_widgets, unterminated) = source
        .as_deref()
        .map(invocation_problems)
        .unwrap_or_default();
    Ok(TemplateStatus {
        template: name.to_string(),
        output: output.to_string(),
        present: source.is_some(),
        sections: sectioned
            && source
                .as_deref()
                .is_some_and(|s| parser::find_separators(s).len() == 2),
        unknown_widgets,
        unterminated,
    })
}

/// Widget names that resolve to nothing, and whether some `@(` is never
/// closed. Names are listed once, in order of appearance.
fn invocation_problems(source: &str) -> (Vec<String>, bool) {
    let mut unknown: Vec<String> = Vec::new();
    let mut rest = source;
    while let Some(at) = rest.find("@(") {
        let after = &rest[at + 2..];
        let Some(close) = after.find(')') else {
            return (unknown, true);
        };
        let name = &after[..close];
        if template::lookup(name).is_none() && !unknown.iter().any(|n| n == name) {
            unknown.push(name.to_string());
        }
        rest = &after[close + 1..];
    }
    (unknown, false)
}

fn scan_directory(
    tree: &mut DirectoryTree,
    parent: Option<SnapshotId>,
    dir: &Path,
    config: &SiteConfig,
    report: &mut ScanReport,
) -> Result<(), ScanError> {
    let conventions = &config.conventions;
    let mut news_sidecars = Vec::new();
    let entered = tree.enter(parent, dir, |_, name| {
        match naming::classify_entry(dir, name, config) {
            Inclusion::Include => true,
            Inclusion::Exclude => false,
            Inclusion::News => {
                news_sidecars.push(name.to_string());
                false
            }
        }
    });
    let id = match entered {
        Ok(id) => id,
        Err(e) if parent.is_some() => {
            warn!("{e}; skipped");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let path = tree.path_string(id);
    let snapshot = tree.get(id)?;
    let entries = snapshot
        .directories()
        .iter()
        .chain(snapshot.files())
        .map(|entry| ScannedEntry {
            name: entry.name.clone(),
            is_dir: entry.is_dir,
            size_kb: entry.size_kb,
            description: first_line(&naming::description_path(
                dir,
                &entry.name,
                entry.is_dir,
                conventions,
            )),
        })
        .collect();
    report.directories.push(ScannedDirectory {
        path: path.clone(),
        entries,
    });

    for sidecar in &news_sidecars {
        match news::read_news(dir, sidecar, conventions) {
            Ok(item) => report.news.push(ScannedNews {
                path: format!("{path}{}", item.name),
                date: item.date.to_string(),
                title: item.title,
                target_exists: item.target.is_file(),
            }),
            Err(e) => warn!("{e}"),
        }
    }

    tree.get_mut(id)?.reset_cursor();
    while tree.advance(id) {
        let Some(name) = tree
            .get(id)?
            .selected()
            .filter(|entry| entry.is_dir)
            .map(|entry| entry.name.clone())
        else {
            break;
        };
        scan_directory(tree, Some(id), &dir.join(name), config, report)?;
    }
    tree.leave(id);
    Ok(())
}

fn first_line(path: &Path) -> Option<String> {
    let text = fs::read_to_string(path).ok()?;
    text.lines().next().map(|line| line.trim_end().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{build_tree, write_file};
    use tempfile::TempDir;

    fn entry_names(dir: &ScannedDirectory) -> Vec<&str> {
        dir.entries.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn lists_directories_then_files() {
        let tmp = TempDir::new().unwrap();
        build_tree(tmp.path(), &["Zoo/", "apple/", "b.txt", "A.txt"]);

        let report = scan(tmp.path()).unwrap();

        assert_eq!(report.directories.len(), 3);
        assert_eq!(entry_names(&report.directories[0]), ["apple", "Zoo", "A.txt", "b.txt"]);
        assert_eq!(report.directories[1].path, "apple/");
        assert_eq!(report.directories[2].path, "Zoo/");
    }

    #[test]
    fn applies_listing_rules() {
        let tmp = TempDir::new().unwrap();
        build_tree(
            tmp.path(),
            &["index.html", "draft.txt", "shown.txt", ".index.html", "make-index.toml"],
        );
        write_file(tmp.path(), "draft.txt.d", "");
        write_file(tmp.path(), "shown.txt.d", "A shown file\nmore\n");
        write_file(tmp.path(), "shown.txt.d.jpeg", "");

        let report = scan(tmp.path()).unwrap();
        let root = &report.directories[0];

        assert_eq!(entry_names(root), ["shown.txt"]);
        assert_eq!(root.entries[0].description.as_deref(), Some("A shown file"));
    }

    #[test]
    fn collects_news() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "sub/post.html", "x");
        write_file(tmp.path(), "sub/post.html.news", "2024-02-03\nPosted\n");
        write_file(tmp.path(), "gone.html.news", "2024-02-04\nGone\n");

        let report = scan(tmp.path()).unwrap();

        assert_eq!(report.news.len(), 2);
        assert_eq!(report.news[0].path, "gone.html");
        assert!(!report.news[0].target_exists);
        assert_eq!(report.news[1].path, "sub/post.html");
        assert_eq!(report.news[1].date, "2024-02-03");
        assert_eq!(report.news[1].title, "Posted");
        assert!(report.news[1].target_exists);
    }

    #[test]
    fn reports_template_status() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), ".index.html", "@(files){@(filenme)} @(nope) @(filenme)");
        write_file(tmp.path(), ".sitemap.xml", "<a>\n~\n@(pwd){/}\n~\n</a>\n");

        let report = scan(tmp.path()).unwrap();
        let [index, sitemap, newsfeed] = &report.templates[..] else {
            panic!("expected three templates");
        };

        assert!(index.present);
        assert!(!index.sections);
        assert_eq!(index.unknown_widgets, ["filenme", "nope"]);
        assert!(sitemap.present && sitemap.sections);
        assert!(sitemap.unknown_widgets.is_empty());
        assert!(!newsfeed.present);
        assert_eq!(newsfeed.output, "newsfeed.rss");
    }

    #[test]
    fn reports_unterminated_invocation() {
        let (unknown, unterminated) = invocation_problems("ok @(files){x} broken @(file");
        assert!(unknown.is_empty());
        assert!(unterminated);
    }

    #[test]
    fn uses_configured_names() {
        let tmp = TempDir::new().unwrap();
        write_file(
            tmp.path(),
            "make-index.toml",
            "[outputs]\nindex = \"index.htm\"\n",
        );
        build_tree(tmp.path(), &["index.htm", "index.html"]);

        let report = scan(tmp.path()).unwrap();

        assert_eq!(report.config.outputs.index, "index.htm");
        assert_eq!(entry_names(&report.directories[0]), ["index.html"]);
    }

    #[test]
    fn invalid_config_is_an_error() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "make-index.toml", "[conventions]\nmax_lines = 0\n");
        assert!(matches!(scan(tmp.path()), Err(ScanError::Config(_))));
    }
}
