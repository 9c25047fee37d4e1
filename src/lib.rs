//! # make-index
//!
//! A content manager for tree-shaped file collections, such as photo
//! galleries or document archives. The filesystem is the data source.
//! Templates in the content root are expanded against every directory below
//! it, producing an `index.html` per directory, one site map and one news
//! feed.
//!
//! # Pipeline
//!
//! ```text
//! make-index.toml  →  config    (stock defaults + sparse overrides)
//! content/         →  generate  (depth-first walk, every output written)
//! content/         →  scan      (same walk, read-only report for `check`)
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`directory`] | Sorted snapshot of one directory with a cursor and breadcrumb marks |
//! | [`template`] | The `@(name){body}` macro language: parser, widget registry, widgets |
//! | [`naming`] | Sidecar conventions (`.d`, `.news`, `.link`, icons) and the listing rules |
//! | [`news`] | `.news` sidecar parsing |
//! | [`config`] | `make-index.toml` loading, merging and validation |
//! | [`generate`] | The walk that writes every output |
//! | [`scan`] | The same walk, read-only, for `check` |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## One Iteration Construct
//!
//! The template language has no loops or conditionals. `@(files){...}`
//! repeats its body because the `files` widget answers "again" while the
//! directory cursor still selects an entry. Breadcrumbs (`@(pwd)`,
//! `@(root)`) work the same way, one path segment per repetition.
//!
//! ## Snapshots in an Arena
//!
//! Each directory on the current path is a [`directory::DirectorySnapshot`]
//! in a [`directory::DirectoryTree`]. Children refer to parents by index,
//! and a snapshot is dropped as soon as its directory has been written. The
//! walk uses explicit paths and never changes the working directory.
//!
//! ## Diagnostics, Not Errors
//!
//! A malformed template never stops a build. Every anomaly is logged and
//! collected into the report printed at the end. A build stops only on an
//! invalid config or on I/O failures at the root and the site-wide outputs.

pub mod config;
pub mod directory;
pub mod generate;
pub mod naming;
pub mod news;
pub mod output;
pub mod scan;
pub mod template;

#[cfg(test)]
pub(crate) mod test_helpers;
