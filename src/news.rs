//! News sidecars.
//!
//! `story.html.news` announces `story.html`. Its first line is an ISO 8601
//! date, its second line the headline:
//!
//! ```text
//! 2024-05-01
//! We moved the archive
//! ```
//!
//! A malformed date is logged and whatever parsed is kept; month and day
//! are clamped into range. A missing headline is empty.

use crate::config::ConventionsConfig;
use crate::naming;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum NewsError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{0} is not a news file")]
    NotNews(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewsDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl NewsDate {
    pub fn new(year: i32, month: u32, day: u32) -> Self {
        Self {
            year,
            month: month.clamp(1, 12),
            day: day.clamp(1, 31),
        }
    }
}

impl Default for NewsDate {
    fn default() -> Self {
        Self::new(1970, 1, 1)
    }
}

impl fmt::Display for NewsDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewsItem {
    /// The `.news` file itself.
    pub sidecar: PathBuf,
    /// Name of the announced file, the sidecar name minus its suffix.
    pub name: String,
    pub target: PathBuf,
    pub date: NewsDate,
    pub title: String,
}

/// Read `dir/<sidecar_name>`.
pub fn read_news(
    dir: &Path,
    sidecar_name: &str,
    conventions: &ConventionsConfig,
) -> Result<NewsItem, NewsError> {
    let name = naming::news_target(sidecar_name, conventions)
        .ok_or_else(|| NewsError::NotNews(sidecar_name.to_string()))?;
    let sidecar = dir.join(sidecar_name);
    let text = fs::read_to_string(&sidecar).map_err(|source| NewsError::Io {
        path: sidecar.clone(),
        source,
    })?;
    let (date, title) = parse_news(&text);
    let date = date.unwrap_or_else(|partial| {
        warn!(
            "{}: error parsing ISO 8601 date, <YYYY-MM-DD>",
            sidecar.display()
        );
        partial
    });
    info!("news <{name}>, '{title}' {date}");
    Ok(NewsItem {
        target: dir.join(name),
        name: name.to_string(),
        sidecar,
        date,
        title,
    })
}

/// Date and headline from a sidecar's text. `Err` carries the date built
/// from whichever components did parse.
pub fn parse_news(text: &str) -> (Result<NewsDate, NewsDate>, String) {
    let mut lines = text.lines();
    let date = parse_date(lines.next().unwrap_or(""));
    let title = lines.next().unwrap_or("").trim_end_matches('\r').to_string();
    (date, title)
}

fn parse_date(line: &str) -> Result<NewsDate, NewsDate> {
    let fallback = NewsDate::default();
    let mut parts = line.trim().splitn(3, '-');
    let year = parts.next().and_then(|p| p.trim().parse::<i32>().ok());
    let month = parts.next().and_then(|p| p.trim().parse::<u32>().ok());
    let day = parts.next().and_then(|p| p.trim().parse::<u32>().ok());
    // Components after the first failure are not read.
    let year_ok = year.is_some();
    let month_ok = year_ok && month.is_some();
    let day_ok = month_ok && day.is_some();
    let date = NewsDate::new(
        year.unwrap_or(fallback.year),
        if month_ok { month.unwrap_or(fallback.month) } else { fallback.month },
        if day_ok { day.unwrap_or(fallback.day) } else { fallback.day },
    );
    if day_ok { Ok(date) } else { Err(date) }
}
