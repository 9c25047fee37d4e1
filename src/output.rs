//! CLI output formatting for `check` and `build`.
//!
//! Directories are shown as a tree, indented one level per path segment,
//! each entry prefixed with its position in the listing, the same position
//! `@(files)` visits it at.
//!
//! # Output Format
//!
//! ## Check
//!
//! ```text
//! Templates
//!     .index.html → index.html
//!     .sitemap.xml → sitemap.xml (head, body, tail)
//!     .newsfeed.rss (missing)
//!
//! Directories
//! / (1 directory, 2 files)
//!     001 album/
//!         Holiday photos
//!     002 notes.txt (1 KB)
//!     003 story.html (4 KB)
//!     album/ (0 directories, 1 file)
//!         001 beach.jpg (120 KB)
//!
//! News
//!     2024-05-01 story.html: We moved
//! ```
//!
//! ## Build
//!
//! ```text
//! / → index.html (1 directory, 2 files)
//!     album/ → album/index.html (0 directories, 1 file)
//!
//! News
//!     2024-05-01 story.html: We moved
//!
//! Wrote sitemap.xml
//! Generated 2 indexes, 1 news item
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::generate::GenerateReport;
use crate::scan::ScanReport;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Depth of a breadcrumb path: `""` is 0, `a/b/` is 2.
fn path_depth(path: &str) -> usize {
    path.matches('/').count()
}

/// `/` for the root, the breadcrumb itself otherwise.
fn display_path(path: &str) -> &str {
    if path.is_empty() { "/" } else { path }
}

fn plural(n: usize, one: &str, many: &str) -> String {
    format!("{} {}", n, if n == 1 { one } else { many })
}

fn counts(directories: usize, files: usize) -> String {
    format!(
        "({}, {})",
        plural(directories, "directory", "directories"),
        plural(files, "file", "files")
    )
}

/// Truncate text to `max` characters, appending `...` if truncated.
fn truncate_desc(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

// ============================================================================
// Check
// ============================================================================

/// Format `check` output: template status, the listing tree and news items.
pub fn format_scan_output(report: &ScanReport) -> Vec<String> {
    let mut lines = Vec::new();

    lines.push("Templates".to_string());
    for status in &report.templates {
        if !status.present {
            lines.push(format!("    {} (missing)", status.template));
            continue;
        }
        let sections = if status.sections {
            " (head, body, tail)"
        } else {
            ""
        };
        lines.push(format!(
            "    {} \u{2192} {}{}",
            status.template, status.output, sections
        ));
        for name in &status.unknown_widgets {
            lines.push(format!("        unknown widget: @({})", name));
        }
        if status.unterminated {
            lines.push("        unterminated @( copied as text".to_string());
        }
    }

    lines.push(String::new());
    lines.push("Directories".to_string());
    for dir in &report.directories {
        let depth = path_depth(&dir.path);
        let dirs = dir.entries.iter().filter(|e| e.is_dir).count();
        lines.push(format!(
            "{}{} {}",
            indent(depth),
            display_path(&dir.path),
            counts(dirs, dir.entries.len() - dirs)
        ));
        let entry_indent = indent(depth + 1);
        for (i, entry) in dir.entries.iter().enumerate() {
            let line = if entry.is_dir {
                format!("{}{} {}/", entry_indent, format_index(i + 1), entry.name)
            } else {
                format!(
                    "{}{} {} ({} KB)",
                    entry_indent,
                    format_index(i + 1),
                    entry.name,
                    entry.size_kb
                )
            };
            lines.push(line);
            if let Some(desc) = entry.description.as_deref() {
                let truncated = truncate_desc(desc.trim(), 60);
                if !truncated.is_empty() {
                    lines.push(format!("{}    {}", entry_indent, truncated));
                }
            }
        }
    }

    if !report.news.is_empty() {
        lines.push(String::new());
        lines.push("News".to_string());
        for item in &report.news {
            lines.push(format!("    {} {}: {}", item.date, item.path, item.title));
            if !item.target_exists {
                lines.push("        (missing target)".to_string());
            }
        }
    }

    lines
}

/// Print check output to stdout.
pub fn print_scan_output(report: &ScanReport) {
    for line in format_scan_output(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Build
// ============================================================================

/// Format `build` output: one line per directory, then news, outputs and
/// template diagnostics.
pub fn format_generate_output(report: &GenerateReport, index_name: &str) -> Vec<String> {
    let mut lines = Vec::new();

    for dir in &report.directories {
        let target = if dir.index {
            format!(" \u{2192} {}{}", dir.path, index_name)
        } else {
            String::new()
        };
        lines.push(format!(
            "{}{}{} {}",
            indent(path_depth(&dir.path)),
            display_path(&dir.path),
            target,
            counts(dir.directories, dir.files)
        ));
    }

    if !report.news.is_empty() {
        lines.push(String::new());
        lines.push("News".to_string());
        for item in &report.news {
            lines.push(format!("    {} {}: {}", item.date, item.path, item.title));
        }
    }

    if !report.diagnostics.is_empty() {
        lines.push(String::new());
        lines.push("Diagnostics".to_string());
        for diagnostic in &report.diagnostics {
            lines.push(format!("    {}: {}", diagnostic.template, diagnostic.message));
        }
    }

    lines.push(String::new());
    if !report.outputs.is_empty() {
        let names: Vec<String> = report
            .outputs
            .iter()
            .map(|p| {
                p.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| p.display().to_string())
            })
            .collect();
        lines.push(format!("Wrote {}", names.join(", ")));
    }
    let indexes = report.directories.iter().filter(|d| d.index).count();
    lines.push(format!(
        "Generated {}, {}",
        plural(indexes, "index", "indexes"),
        plural(report.news.len(), "news item", "news items")
    ));

    lines
}

/// Print build output to stdout.
pub fn print_generate_output(report: &GenerateReport, index_name: &str) {
    for line in format_generate_output(report, index_name) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
