//! Site generation.
//!
//! Reads the templates from the content root, then walks the tree depth
//! first, writing every output as it goes.
//!
//! ## Outputs
//!
//! - **Index** (`index.html` in every directory): the whole index template,
//!   expanded against that directory.
//! - **Site map** (`sitemap.xml` in the root): the head once, the body once
//!   per directory, the tail once.
//! - **News feed** (`newsfeed.rss` in the root): the head once, the body once
//!   per `.news` sidecar, the tail once.
//!
//! A missing template turns its output off. Heads and tails are expanded
//! with no directory in context, so directory widgets write nothing there.
//!
//! ## Walk
//!
//! ```text
//! for each directory, parents before children:
//!     snapshot the listing (sidecars, templates, index.html filtered out)
//!     one news-feed body per .news sidecar found
//!     index.html
//!     one site-map body
//!     recurse into each listed subdirectory, in listing order
//! ```
//!
//! The site map and news feed stay open for the whole walk. At the end each
//! one walks past its body with output suppressed, expands its tail and is
//! flushed.
//!
//! Template anomalies never stop the run; they are collected into the
//! [`GenerateReport`].

use crate::config::{ConfigError, SiteConfig};
use crate::directory::{DirectoryError, DirectoryTree, SnapshotId};
use crate::naming::{self, Inclusion};
use crate::news::{self, NewsItem};
use crate::template::{Expansion, ExpansionContext, ParserState, SectionLayout};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),
    #[error("no templates in {root}; create at least one of {expected}")]
    NoTemplates { root: PathBuf, expected: String },
}

/// What a run produced.
#[derive(Debug, Default, Serialize)]
pub struct GenerateReport {
    /// Every directory visited, parents before children.
    pub directories: Vec<DirectoryReport>,
    pub news: Vec<NewsReport>,
    /// Site map and news feed files written in the root.
    pub outputs: Vec<PathBuf>,
    pub diagnostics: Vec<TemplateDiagnostic>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectoryReport {
    /// Breadcrumb from the root, `a/b/`; empty for the root itself.
    pub path: String,
    pub directories: usize,
    pub files: usize,
    /// `true` if an index was written into this directory.
    pub index: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewsReport {
    /// Announced file, relative to the root.
    pub path: String,
    pub date: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateDiagnostic {
    pub template: String,
    pub message: String,
}

/// Load `make-index.toml` from `root`, then [`generate`].
pub fn build(root: &Path, now: DateTime<Utc>) -> Result<GenerateReport, GenerateError> {
    let config = crate::config::load_config(root)?;
    generate(root, &config, now)
}

/// Generate every output under `root`.
///
/// `now` is what `@(now)` prints, fixed for the whole run.
pub fn generate(
    root: &Path,
    config: &SiteConfig,
    now: DateTime<Utc>,
) -> Result<GenerateReport, GenerateError> {
    let mut generator = Generator::open(root, config, now)?;
    generator.visit(None, root)?;
    generator.finish()
}

/// A template, named for diagnostics.
struct Template {
    name: String,
    parser: ParserState,
}

impl Template {
    fn new(name: &str, parser: ParserState) -> Self {
        Self {
            name: name.to_string(),
            parser,
        }
    }

    /// Expand and move any diagnostics into `report`. Diagnostics already
    /// seen are not repeated, since bodies are expanded many times.
    fn expand(
        &mut self,
        ctx: &mut ExpansionContext<'_>,
        out: &mut dyn Write,
        suppressed: bool,
        report: &mut GenerateReport,
    ) -> io::Result<Expansion> {
        let result = self.parser.expand(ctx, out, suppressed);
        for diagnostic in self.parser.take_diagnostics() {
            let diagnostic = TemplateDiagnostic {
                template: self.name.clone(),
                message: diagnostic.to_string(),
            };
            if !report.diagnostics.contains(&diagnostic) {
                report.diagnostics.push(diagnostic);
            }
        }
        result
    }
}

/// A site-wide output: one file, open for the whole walk.
struct Feed {
    template: Template,
    path: PathBuf,
    out: BufWriter<File>,
}

impl Feed {
    fn create(template: Template, path: PathBuf) -> Result<Self, GenerateError> {
        let file = File::create(&path).map_err(|source| GenerateError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(Self {
            template,
            path,
            out: BufWriter::new(file),
        })
    }

    fn has_sections(&self) -> bool {
        self.template.parser.layout() == SectionLayout::HeadBodyTail
    }

    fn io_error(&self, source: io::Error) -> GenerateError {
        GenerateError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn expand(
        &mut self,
        ctx: &mut ExpansionContext<'_>,
        suppressed: bool,
        report: &mut GenerateReport,
    ) -> Result<Expansion, GenerateError> {
        self.template
            .expand(ctx, &mut self.out, suppressed, report)
            .map_err(|source| self.io_error(source))
    }

    fn head(
        &mut self,
        ctx: &mut ExpansionContext<'_>,
        report: &mut GenerateReport,
    ) -> Result<(), GenerateError> {
        if self.has_sections() {
            self.expand(ctx, false, report)?;
        }
        Ok(())
    }

    /// Expand the body, then rewind so the next call replays it.
    fn body(
        &mut self,
        ctx: &mut ExpansionContext<'_>,
        report: &mut GenerateReport,
    ) -> Result<(), GenerateError> {
        self.expand(ctx, false, report)?;
        self.template.parser.rewind();
        Ok(())
    }

    /// Skip the body, expand the tail and flush.
    fn finish(
        mut self,
        ctx: &mut ExpansionContext<'_>,
        report: &mut GenerateReport,
    ) -> Result<PathBuf, GenerateError> {
        if self.has_sections() {
            self.expand(ctx, true, report)?;
            self.expand(ctx, false, report)?;
        }
        self.out.flush().map_err(|source| self.io_error(source))?;
        info!("wrote {}", self.path.display());
        Ok(self.path)
    }
}

struct Generator<'c> {
    config: &'c SiteConfig,
    now: DateTime<Utc>,
    index: Option<Template>,
    sitemap: Option<Feed>,
    newsfeed: Option<Feed>,
    tree: DirectoryTree,
    report: GenerateReport,
}

impl<'c> Generator<'c> {
    /// Read the templates, create the site-wide outputs and expand their heads.
    fn open(root: &Path, config: &'c SiteConfig, now: DateTime<Utc>) -> Result<Self, GenerateError> {
        let templates = &config.templates;
        let outputs = &config.outputs;

        // The index is expanded whole in every directory, `~` lines included.
        let index = read_template(root, &templates.index)?.map(|source| {
            Template::new(
                &templates.index,
                ParserState::with_layout(source, SectionLayout::BodyOnly),
            )
        });
        let sitemap = match read_template(root, &templates.sitemap)? {
            Some(source) => Some(Feed::create(
                Template::new(&templates.sitemap, ParserState::new(source)),
                root.join(&outputs.sitemap),
            )?),
            None => None,
        };
        let newsfeed = match read_template(root, &templates.newsfeed)? {
            Some(source) => Some(Feed::create(
                Template::new(&templates.newsfeed, ParserState::new(source)),
                root.join(&outputs.newsfeed),
            )?),
            None => None,
        };

        if index.is_none() && sitemap.is_none() && newsfeed.is_none() {
            return Err(GenerateError::NoTemplates {
                root: root.to_path_buf(),
                expected: format!(
                    "{}, {} or {}",
                    templates.index, templates.sitemap, templates.newsfeed
                ),
            });
        }

        let mut generator = Self {
            config,
            now,
            index,
            sitemap,
            newsfeed,
            tree: DirectoryTree::new(),
            report: GenerateReport::default(),
        };
        let mut ctx = ExpansionContext::new(&config.conventions, now);
        for feed in [&mut generator.sitemap, &mut generator.newsfeed]
            .into_iter()
            .flatten()
        {
            feed.head(&mut ctx, &mut generator.report)?;
        }
        Ok(generator)
    }

    /// Write everything for `dir`, then recurse into its subdirectories.
    ///
    /// An unreadable subdirectory is logged and skipped; an unreadable root
    /// is an error.
    fn visit(&mut self, parent: Option<SnapshotId>, dir: &Path) -> Result<(), GenerateError> {
        let config = self.config;
        let mut news_sidecars = Vec::new();
        let entered = self.tree.enter(parent, dir, |_, name| {
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

        let path = self.tree.path_string(id);
        info!("entering /{path}");

        for sidecar in &news_sidecars {
            match news::read_news(dir, sidecar, &config.conventions) {
                Ok(item) => self.write_news(id, &path, &item)?,
                Err(e) => warn!("{e}"),
            }
        }

        let index = self.write_index(id, dir);
        if let Some(feed) = self.sitemap.as_mut() {
            let mut ctx = ExpansionContext::new(&config.conventions, self.now)
                .with_directory(&mut self.tree, id);
            feed.body(&mut ctx, &mut self.report)?;
        }

        let snapshot = self.tree.get_mut(id)?;
        self.report.directories.push(DirectoryReport {
            path,
            directories: snapshot.directories().len(),
            files: snapshot.files().len(),
            index,
        });

        // Directories come first in the cursor order; stop at the first file.
        snapshot.reset_cursor();
        while self.tree.advance(id) {
            let Some(name) = self
                .tree
                .get(id)?
                .selected()
                .filter(|entry| entry.is_dir)
                .map(|entry| entry.name.clone())
            else {
                break;
            };
            self.visit(Some(id), &dir.join(name))?;
        }
        self.tree.get_mut(id)?.reset_cursor();
        self.tree.leave(id);
        Ok(())
    }

    fn write_news(&mut self, id: SnapshotId, path: &str, item: &NewsItem) -> Result<(), GenerateError> {
        self.report.news.push(NewsReport {
            path: format!("{path}{}", item.name),
            date: item.date.to_string(),
            title: item.title.clone(),
        });
        if let Some(feed) = self.newsfeed.as_mut() {
            let mut ctx = ExpansionContext::new(&self.config.conventions, self.now)
                .with_directory(&mut self.tree, id)
                .with_news(item);
            feed.body(&mut ctx, &mut self.report)?;
        }
        Ok(())
    }

    /// Write `index.html` into `dir`. Failures are logged, not fatal.
    fn write_index(&mut self, id: SnapshotId, dir: &Path) -> bool {
        let Some(index) = self.index.as_mut() else {
            return false;
        };
        let path = dir.join(&self.config.outputs.index);
        let file = match File::create(&path) {
            Ok(file) => file,
            Err(e) => {
                warn!("{}: {e}", path.display());
                return false;
            }
        };
        let mut out = BufWriter::new(file);
        let mut ctx = ExpansionContext::new(&self.config.conventions, self.now)
            .with_directory(&mut self.tree, id);
        index.parser.rewind();
        let written = index
            .expand(&mut ctx, &mut out, false, &mut self.report)
            .and_then(|_| out.flush());
        match written {
            Ok(()) => {
                debug!("wrote {}", path.display());
                true
            }
            Err(e) => {
                warn!("{}: {e}", path.display());
                false
            }
        }
    }

    /// Expand the tails, close the site-wide outputs and hand back the report.
    fn finish(mut self) -> Result<GenerateReport, GenerateError> {
        let mut ctx = ExpansionContext::new(&self.config.conventions, self.now);
        for feed in [self.sitemap.take(), self.newsfeed.take()].into_iter().flatten() {
            let path = feed.finish(&mut ctx, &mut self.report)?;
            self.report.outputs.push(path);
        }
        Ok(self.report)
    }
}

/// Contents of the template `name` in `root`; `None` if it does not exist.
fn read_template(root: &Path, name: &str) -> Result<Option<String>, GenerateError> {
    let path = root.join(name);
    match fs::read_to_string(&path) {
        Ok(source) => {
            debug!("read {} ({} bytes)", path.display(), source.len());
            Ok(Some(source))
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            info!("to use it, create the template {}", path.display());
            Ok(None)
        }
        Err(source) => Err(GenerateError::Io { path, source }),
    }
}
